// This file is part of marsh, an extended POSIX shell.
// Copyright (C) 2024 WATANABE Yuki
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Redirection semantics
//!
//! To perform redirections, wrap an [`Env`] in a [`RedirGuard`] and call
//! [`perform_redir`](RedirGuard::perform_redir). The guard saves a backing
//! copy of every file descriptor it modifies at [`MIN_INTERNAL_FD`] or
//! above with the close-on-exec flag set. When the guard is dropped, the
//! saved descriptors are restored, so the file descriptor table differs
//! from its pre-state only while the redirections are in effect. Call
//! [`preserve_redirs`](RedirGuard::preserve_redirs) to make the effects
//! permanent instead, as the `exec` built-in does.
//!
//! Here-document contents are written to a pipe when they fit the pipe
//! buffer, and spilled to an anonymous temporary file otherwise.

use crate::expansion;
use crate::expansion::expand_text;
use crate::expansion::expand_word;
use crate::Handle;
use marsh_env::option::{Clobber, State};
use marsh_env::semantics::ExitStatus;
use marsh_env::system::Errno;
use marsh_env::system::Fd;
use marsh_env::system::OfdAccess;
use marsh_env::system::OpenFlag;
use marsh_env::system::Mode;
use marsh_env::system::System;
use marsh_env::system::SystemEx;
use marsh_env::system::MIN_INTERNAL_FD;
use marsh_env::Env;
use marsh_syntax::source::pretty::{Annotation, AnnotationType, MessageBase};
use marsh_syntax::source::Location;
use marsh_syntax::syntax::Redir;
use marsh_syntax::syntax::RedirBody;
use marsh_syntax::syntax::RedirOp;
use enumset::EnumSet;
use std::borrow::Cow;
use std::ffi::CString;
use std::ops::ControlFlow::Continue;
use std::ops::Deref;
use std::ops::DerefMut;
use thiserror::Error;

/// Largest here-document written through a pipe
///
/// POSIX guarantees a pipe capacity of at least 512 bytes; contents larger
/// than this conservative bound go through a temporary file so that the
/// shell does not block writing to the pipe before the child reads it.
const HERE_DOC_PIPE_LIMIT: usize = 512;

/// Record of saving an open file description in another file descriptor
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct SavedFd {
    /// File descriptor by which the original open file description was
    /// previously accessible
    original: Fd,
    /// Temporary file descriptor that remembers the original open file
    /// description, or `None` if the original was closed
    save: Option<Fd>,
}

/// Types of errors that may occur in the redirection
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum ErrorCause {
    /// Expansion error in the operand word
    #[error(transparent)]
    Expansion(#[from] expansion::ErrorCause),

    /// Pathname containing a nul byte
    #[error("pathname contains a nul byte")]
    NulByte,

    /// The target file descriptor could not be modified.
    #[error("cannot redirect file descriptor {0}: {1}")]
    FdNotOverwritten(Fd, Errno),

    /// Use of a file descriptor reserved by the shell
    #[error("file descriptor {0} is reserved by the shell")]
    ReservedFd(Fd),

    /// Error while opening a file
    #[error("cannot open file `{}`: {}", .0.to_string_lossy(), .1)]
    OpenFile(CString, Errno),

    /// Operand of `<&` or `>&` that is not a valid file descriptor
    #[error("`{0}` is not a valid file descriptor")]
    MalformedFd(String),

    /// `<&` applied to an unreadable file descriptor
    #[error("file descriptor {0} is not readable")]
    UnreadableFd(Fd),

    /// `>&` applied to an unwritable file descriptor
    #[error("file descriptor {0} is not writable")]
    UnwritableFd(Fd),

    /// Error preparing the content of a here-document
    #[error("cannot prepare here-document: {0}")]
    HereDocSetup(Errno),
}

/// Explanation of a redirection error
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("{cause}")]
pub struct Error {
    pub cause: ErrorCause,
    pub location: Location,
}

impl From<expansion::Error> for Error {
    fn from(error: expansion::Error) -> Self {
        Error {
            cause: error.cause.into(),
            location: error.location,
        }
    }
}

impl MessageBase for Error {
    fn message_title(&self) -> Cow<str> {
        "error in a redirection".into()
    }

    fn main_annotation(&self) -> Annotation<'_> {
        Annotation::new(
            AnnotationType::Error,
            self.cause.to_string().into(),
            &self.location,
        )
    }
}

impl Handle for Error {
    /// Prints the error message and sets the exit status to 1.
    fn handle(&self, env: &mut Env) -> crate::Result {
        env.print_message(self);
        env.exit_status = ExitStatus::FAILURE;
        Continue(())
    }
}

/// Result of redirection
pub type Result<T> = std::result::Result<T, Error>;

/// Intermediate state of a redirected file descriptor
#[derive(Debug)]
enum FdSpec {
    /// File descriptor specifically opened for the redirection
    Owned(Fd),
    /// Existing file descriptor
    Borrowed(Fd),
    /// Close the target file descriptor.
    Close,
}

impl FdSpec {
    fn as_fd(&self) -> Option<Fd> {
        match self {
            &FdSpec::Owned(fd) | &FdSpec::Borrowed(fd) => Some(fd),
            &FdSpec::Close => None,
        }
    }

    fn close(self, env: &mut Env) {
        if let FdSpec::Owned(fd) = self {
            _ = env.system.close(fd);
        }
    }
}

/// `Env` wrapper for performing redirections
///
/// This is an RAII-style wrapper of [`Env`] in which redirections are
/// performed. A `RedirGuard` keeps track of file descriptors affected by
/// redirections so that they can be restored to the state before the
/// redirections.
///
/// There are two ways to finish a `RedirGuard`: [`undo_redirs`]
/// (Self::undo_redirs), which restores the file descriptors (and also runs
/// when the guard is dropped), and [`preserve_redirs`]
/// (Self::preserve_redirs), which makes the effects permanent.
#[derive(Debug)]
pub struct RedirGuard<'e> {
    /// Environment in which redirections are performed
    env: &'e mut Env,
    /// Records of file descriptors that have been modified by redirections
    saved_fds: Vec<SavedFd>,
}

impl Deref for RedirGuard<'_> {
    type Target = Env;
    fn deref(&self) -> &Env {
        self.env
    }
}

impl DerefMut for RedirGuard<'_> {
    fn deref_mut(&mut self) -> &mut Env {
        self.env
    }
}

impl Drop for RedirGuard<'_> {
    fn drop(&mut self) {
        self.undo_redirs()
    }
}

impl<'e> RedirGuard<'e> {
    /// Creates a new `RedirGuard`.
    pub fn new(env: &'e mut Env) -> Self {
        let saved_fds = Vec::new();
        RedirGuard { env, saved_fds }
    }

    /// Saves the open file description at `target_fd` so that it can be
    /// restored later.
    fn save_fd(&mut self, target_fd: Fd, location: &Location) -> Result<()> {
        let save = match self.env.system.dup(target_fd, MIN_INTERNAL_FD, true) {
            Ok(save_fd) => Some(save_fd),
            Err(Errno::EBADF) => None,
            Err(errno) => {
                return Err(Error {
                    cause: ErrorCause::FdNotOverwritten(target_fd, errno),
                    location: location.clone(),
                })
            }
        };
        self.saved_fds.push(SavedFd {
            original: target_fd,
            save,
        });
        Ok(())
    }

    /// Performs a redirection.
    ///
    /// If successful, this function saves a backing copy of the file
    /// descriptor affected by the redirection, and returns the exit status
    /// of the last command substitution performed during the redirection,
    /// if any.
    pub fn perform_redir(&mut self, redir: &Redir) -> Result<Option<ExitStatus>> {
        let target_fd = redir.fd_or_default();
        let operand_location = redir.body.operand().location.clone();

        // Refuse to overwrite an internal file descriptor.
        if let Ok(true) = self.env.system.get_cloexec(target_fd) {
            return Err(Error {
                cause: ErrorCause::ReservedFd(target_fd),
                location: operand_location,
            });
        }

        self.save_fd(target_fd, &operand_location)?;

        let (spec, exit_status, extra_err_and_out) = match &redir.body {
            RedirBody::Normal { operator, operand } => {
                let (field, exit_status) = expand_word(self.env, operand)?;
                let (spec, extra) = self.open_normal(*operator, field.value, &operand_location)?;
                (spec, exit_status, extra)
            }
            RedirBody::HereDoc(here_doc) => {
                let content = here_doc.content.get().cloned().unwrap_or_default();
                let (content, exit_status) = expand_text(self.env, &content)?;
                let fd = self.here_doc_fd(content.as_bytes(), &operand_location)?;
                (FdSpec::Owned(fd), exit_status, false)
            }
        };

        self.assign_fd(spec, target_fd, &operand_location)?;

        // `&>` also redirects the standard error to the same file.
        if extra_err_and_out {
            self.save_fd(Fd::STDERR, &operand_location)?;
            if let Err(errno) = self.env.system.dup2(Fd::STDOUT, Fd::STDERR) {
                return Err(Error {
                    cause: ErrorCause::FdNotOverwritten(Fd::STDERR, errno),
                    location: operand_location,
                });
            }
        }

        Ok(exit_status)
    }

    /// Moves a prepared file descriptor to the target.
    fn assign_fd(&mut self, spec: FdSpec, target_fd: Fd, location: &Location) -> Result<()> {
        if let Some(fd) = spec.as_fd() {
            if fd != target_fd {
                let result = self.env.system.dup2(fd, target_fd);
                spec.close(self.env);
                if let Err(errno) = result {
                    return Err(Error {
                        cause: ErrorCause::FdNotOverwritten(target_fd, errno),
                        location: location.clone(),
                    });
                }
            }
        } else {
            _ = self.env.system.close(target_fd);
        }
        Ok(())
    }

    /// Opens the file for a normal redirection.
    ///
    /// The second return value tells whether the standard error should also
    /// be redirected (`&>` and `&>>`).
    fn open_normal(
        &mut self,
        operator: RedirOp,
        operand: String,
        location: &Location,
    ) -> Result<(FdSpec, bool)> {
        use RedirOp::*;
        match operator {
            FileIn => Ok((
                self.open_file(operand, OfdAccess::ReadOnly, EnumSet::empty(), location)?,
                false,
            )),
            FileInOut => Ok((
                self.open_file(
                    operand,
                    OfdAccess::ReadWrite,
                    OpenFlag::Create.into(),
                    location,
                )?,
                false,
            )),
            FileOut if self.env.options.get(Clobber) == State::Off => {
                Ok((self.open_file_noclobber(operand, location)?, false))
            }
            FileOut | FileClobber => Ok((
                self.open_file(
                    operand,
                    OfdAccess::WriteOnly,
                    OpenFlag::Create | OpenFlag::Truncate,
                    location,
                )?,
                false,
            )),
            FileAppend => Ok((
                self.open_file(
                    operand,
                    OfdAccess::WriteOnly,
                    OpenFlag::Create | OpenFlag::Append,
                    location,
                )?,
                false,
            )),
            ErrAndOut => Ok((
                self.open_file(
                    operand,
                    OfdAccess::WriteOnly,
                    OpenFlag::Create | OpenFlag::Truncate,
                    location,
                )?,
                true,
            )),
            ErrAndOutAppend => Ok((
                self.open_file(
                    operand,
                    OfdAccess::WriteOnly,
                    OpenFlag::Create | OpenFlag::Append,
                    location,
                )?,
                true,
            )),
            FdIn => Ok((self.copy_fd(operand, true, location)?, false)),
            FdOut => Ok((self.copy_fd(operand, false, location)?, false)),
            HereString => {
                let mut content = operand;
                content.push('\n');
                let fd = self.here_doc_fd(content.as_bytes(), location)?;
                Ok((FdSpec::Owned(fd), false))
            }
        }
    }

    fn open_file(
        &mut self,
        path: String,
        access: OfdAccess,
        flags: EnumSet<OpenFlag>,
        location: &Location,
    ) -> Result<FdSpec> {
        let c_path = CString::new(path).map_err(|_| Error {
            cause: ErrorCause::NulByte,
            location: location.clone(),
        })?;
        match self.env.system.open(&c_path, access, flags, Mode::default()) {
            Ok(fd) => Ok(FdSpec::Owned(fd)),
            Err(errno) => Err(Error {
                cause: ErrorCause::OpenFile(c_path, errno),
                location: location.clone(),
            }),
        }
    }

    /// Opens a file for writing with the `noclobber` behavior.
    fn open_file_noclobber(&mut self, path: String, location: &Location) -> Result<FdSpec> {
        let c_path = CString::new(path).map_err(|_| Error {
            cause: ErrorCause::NulByte,
            location: location.clone(),
        })?;

        match self.env.system.open(
            &c_path,
            OfdAccess::WriteOnly,
            OpenFlag::Create | OpenFlag::Exclusive,
            Mode::default(),
        ) {
            Ok(fd) => Ok(FdSpec::Owned(fd)),
            Err(Errno::EEXIST) => {
                // The file exists: writing is only allowed if it is not a
                // regular file (e.g. /dev/null).
                if self.env.system.is_regular_file(&c_path) {
                    Err(Error {
                        cause: ErrorCause::OpenFile(c_path, Errno::EEXIST),
                        location: location.clone(),
                    })
                } else {
                    match self.env.system.open(
                        &c_path,
                        OfdAccess::WriteOnly,
                        EnumSet::empty(),
                        Mode::default(),
                    ) {
                        Ok(fd) => Ok(FdSpec::Owned(fd)),
                        Err(errno) => Err(Error {
                            cause: ErrorCause::OpenFile(c_path, errno),
                            location: location.clone(),
                        }),
                    }
                }
            }
            Err(errno) => Err(Error {
                cause: ErrorCause::OpenFile(c_path, errno),
                location: location.clone(),
            }),
        }
    }

    /// Parses the target of `<&` and `>&`.
    fn copy_fd(&mut self, operand: String, readable: bool, location: &Location) -> Result<FdSpec> {
        if operand == "-" {
            return Ok(FdSpec::Close);
        }

        let fd = match operand.parse() {
            Ok(number) => Fd(number),
            Err(_) => {
                return Err(Error {
                    cause: ErrorCause::MalformedFd(operand),
                    location: location.clone(),
                })
            }
        };

        let valid = if readable {
            self.env.system.is_fd_readable(fd)
        } else {
            self.env.system.is_fd_writable(fd)
        };
        match valid {
            Ok(true) => (),
            _ => {
                let cause = if readable {
                    ErrorCause::UnreadableFd(fd)
                } else {
                    ErrorCause::UnwritableFd(fd)
                };
                return Err(Error {
                    cause,
                    location: location.clone(),
                });
            }
        }

        // An internal file descriptor must not be exposed.
        if let Ok(true) = self.env.system.get_cloexec(fd) {
            return Err(Error {
                cause: ErrorCause::ReservedFd(fd),
                location: location.clone(),
            });
        }

        Ok(FdSpec::Borrowed(fd))
    }

    /// Opens a readable file descriptor that yields the given content.
    fn here_doc_fd(&mut self, content: &[u8], location: &Location) -> Result<Fd> {
        let error = |errno: Errno| Error {
            cause: ErrorCause::HereDocSetup(errno),
            location: location.clone(),
        };

        if content.len() <= HERE_DOC_PIPE_LIMIT {
            let (reader, writer) = self.env.system.pipe().map_err(error)?;
            self.env.system.write_all(writer, content).map_err(error)?;
            self.env.system.close(writer).map_err(error)?;
            Ok(reader)
        } else {
            let fd = self.env.system.open_tmpfile().map_err(error)?;
            self.env.system.write_all(fd, content).map_err(error)?;
            self.env.system.rewind(fd).map_err(error)?;
            Ok(fd)
        }
    }

    /// Performs redirections.
    ///
    /// This is a convenience function for [performing
    /// redirection](Self::perform_redir) for each iterator item.
    ///
    /// If a redirection fails, the remainders are ignored, but the effects
    /// of the preceding redirections remain (and are undone when the guard
    /// finishes).
    pub fn perform_redirs<'a, I>(&mut self, redirs: I) -> Result<Option<ExitStatus>>
    where
        I: IntoIterator<Item = &'a Redir>,
    {
        let mut exit_status = None;
        for redir in redirs {
            let new_exit_status = self.perform_redir(redir)?;
            exit_status = new_exit_status.or(exit_status);
        }
        Ok(exit_status)
    }

    /// Undoes the effect of the redirections.
    ///
    /// This function restores the file descriptors affected by redirections
    /// to the original state and closes the backing file descriptors.
    pub fn undo_redirs(&mut self) {
        for SavedFd { original, save } in self.saved_fds.drain(..).rev() {
            match save {
                Some(save) => {
                    _ = self.env.system.dup2(save, original);
                    _ = self.env.system.close(save);
                }
                None => {
                    _ = self.env.system.close(original);
                }
            }
        }
    }

    /// Makes the redirections permanent.
    ///
    /// This function closes the backing file descriptors without restoring
    /// the original state.
    pub fn preserve_redirs(&mut self) {
        for SavedFd { save, .. } in self.saved_fds.drain(..) {
            if let Some(save) = save {
                _ = self.env.system.close(save);
            }
        }
    }
}
