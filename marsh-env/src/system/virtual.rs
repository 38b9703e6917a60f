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

//! System simulated in memory
//!
//! The virtual system provides an in-memory file system and file descriptor
//! table so that file and redirection semantics can be unit-tested without
//! touching the real system. It does not simulate processes: `fork`,
//! `execve` and `wait` fail with `ENOSYS`/`ECHILD`, so anything that spawns
//! real children is covered by integration tests against the real system
//! instead.

use super::Disposition;
use super::Errno;
use super::Fd;
use super::Fork;
use super::Mode;
use super::OfdAccess;
use super::OpenFlag;
use super::Pid;
use super::Result;
use super::System;
use super::Times;
use super::WaitStatus;
use crate::signal;
use enumset::EnumSet;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::collections::VecDeque;
use std::convert::Infallible;
use std::ffi::c_int;
use std::ffi::CStr;
use std::ffi::CString;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

/// File in the virtual file system
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct INode {
    /// File content
    pub content: Vec<u8>,
    /// Whether the file is executable
    pub is_executable: bool,
    /// Modification time in seconds since the epoch
    pub mtime: i64,
}

impl INode {
    /// Creates a regular file with the given content.
    pub fn new<B: Into<Vec<u8>>>(content: B) -> INode {
        INode {
            content: content.into(),
            is_executable: false,
            mtime: 0,
        }
    }
}

/// Open file description
#[derive(Clone, Debug)]
enum OpenFileDescription {
    /// Open regular file
    File {
        inode: Rc<RefCell<INode>>,
        offset: usize,
        access: OfdAccess,
        append: bool,
    },
    /// Reading end of a pipe
    PipeReader { buffer: Rc<RefCell<VecDeque<u8>>> },
    /// Writing end of a pipe
    PipeWriter { buffer: Rc<RefCell<VecDeque<u8>>> },
}

/// Entry in the file descriptor table
#[derive(Clone, Debug)]
struct FdBody {
    description: Rc<RefCell<OpenFileDescription>>,
    cloexec: bool,
}

/// State of the virtual system, shared among clones
#[derive(Clone, Debug, Default)]
pub struct SystemState {
    /// Files keyed by absolute path
    pub file_system: HashMap<PathBuf, Rc<RefCell<INode>>>,
    /// Signal dispositions set with `sigaction`
    pub dispositions: HashMap<c_int, Disposition>,
    /// Signals sent with `kill`
    pub sent_signals: Vec<(Pid, Option<signal::Number>)>,
    /// Pending caught signals
    pub pending_signals: Vec<signal::Number>,
    /// Value returned from `epoch_time`
    pub now: i64,
}

/// Implementation of `System` simulated in memory
#[derive(Clone, Debug)]
pub struct VirtualSystem {
    /// Mutable system state
    ///
    /// The state is shared by reference so that tests can inspect and
    /// prepare it while the system is in use.
    pub state: Rc<RefCell<SystemState>>,
    /// Open file descriptors
    ///
    /// The table is shared by reference among clones so that a test can
    /// inspect the table while the system is in use by an environment.
    fds: Rc<RefCell<BTreeMap<c_int, FdBody>>>,
    /// Process ID of the simulated process
    pub process_id: Pid,
    /// Working directory
    cwd: PathBuf,
}

impl Default for VirtualSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualSystem {
    /// Creates a virtual system with stdin, stdout, and stderr open.
    pub fn new() -> VirtualSystem {
        let mut system = VirtualSystem {
            state: Rc::new(RefCell::new(SystemState::default())),
            fds: Rc::new(RefCell::new(BTreeMap::new())),
            process_id: Pid(2),
            cwd: PathBuf::from("/"),
        };

        for (fd, path) in [(0, "/dev/stdin"), (1, "/dev/stdout"), (2, "/dev/stderr")] {
            let inode = Rc::new(RefCell::new(INode::default()));
            system
                .state
                .borrow_mut()
                .file_system
                .insert(PathBuf::from(path), Rc::clone(&inode));
            let access = if fd == 0 {
                OfdAccess::ReadOnly
            } else {
                OfdAccess::WriteOnly
            };
            system.fds.borrow_mut().insert(
                fd,
                FdBody {
                    description: Rc::new(RefCell::new(OpenFileDescription::File {
                        inode,
                        offset: 0,
                        access,
                        append: false,
                    })),
                    cloexec: false,
                },
            );
        }

        system
    }

    /// Returns the content of the file at the given path.
    pub fn file_content(&self, path: &str) -> Option<Vec<u8>> {
        let state = self.state.borrow();
        let inode = state.file_system.get(&PathBuf::from(path))?;
        let content = inode.borrow().content.clone();
        Some(content)
    }

    /// Returns the bytes written to the standard output.
    pub fn stdout_content(&self) -> Vec<u8> {
        self.file_content("/dev/stdout").unwrap_or_default()
    }

    /// Returns the bytes written to the standard error.
    pub fn stderr_content(&self) -> Vec<u8> {
        self.file_content("/dev/stderr").unwrap_or_default()
    }

    /// Prepares the standard input with the given content.
    pub fn set_stdin<B: Into<Vec<u8>>>(&mut self, content: B) {
        let state = self.state.borrow_mut();
        if let Some(inode) = state.file_system.get(&PathBuf::from("/dev/stdin")) {
            inode.borrow_mut().content = content.into();
        }
    }

    /// Returns a snapshot of the file descriptor table for comparison.
    ///
    /// Two snapshots are equal if and only if the same descriptors are open
    /// and each refers to the same open file description.
    #[must_use]
    pub fn fd_snapshot(&self) -> Vec<(c_int, usize, bool)> {
        self.fds
            .borrow()
            .iter()
            .map(|(&fd, body)| (fd, Rc::as_ptr(&body.description) as usize, body.cloexec))
            .collect()
    }

    fn next_fd_from(&self, min: c_int) -> c_int {
        let fds = self.fds.borrow();
        let mut candidate = min;
        while fds.contains_key(&candidate) {
            candidate += 1;
        }
        candidate
    }

    fn body(&self, fd: Fd) -> Result<FdBody> {
        self.fds.borrow().get(&fd.0).cloned().ok_or(Errno::EBADF)
    }
}

impl System for VirtualSystem {
    fn open(
        &mut self,
        path: &CStr,
        access: OfdAccess,
        flags: EnumSet<OpenFlag>,
        _mode: Mode,
    ) -> Result<Fd> {
        let path = PathBuf::from(path.to_str().map_err(|_| Errno::EINVAL)?);

        let inode = {
            let mut state = self.state.borrow_mut();
            match state.file_system.get(&path) {
                Some(inode) => {
                    if flags.contains(OpenFlag::Exclusive) {
                        return Err(Errno::EEXIST);
                    }
                    if flags.contains(OpenFlag::Truncate) {
                        inode.borrow_mut().content.clear();
                    }
                    Rc::clone(inode)
                }
                None => {
                    if !flags.contains(OpenFlag::Create) {
                        return Err(Errno::ENOENT);
                    }
                    let inode = Rc::new(RefCell::new(INode::default()));
                    state.file_system.insert(path, Rc::clone(&inode));
                    inode
                }
            }
        };

        let fd = self.next_fd_from(0);
        self.fds.borrow_mut().insert(
            fd,
            FdBody {
                description: Rc::new(RefCell::new(OpenFileDescription::File {
                    inode,
                    offset: 0,
                    access,
                    append: flags.contains(OpenFlag::Append),
                })),
                cloexec: flags.contains(OpenFlag::Cloexec),
            },
        );
        Ok(Fd(fd))
    }

    fn open_tmpfile(&mut self) -> Result<Fd> {
        let inode = Rc::new(RefCell::new(INode::default()));
        let fd = self.next_fd_from(0);
        self.fds.borrow_mut().insert(
            fd,
            FdBody {
                description: Rc::new(RefCell::new(OpenFileDescription::File {
                    inode,
                    offset: 0,
                    access: OfdAccess::ReadWrite,
                    append: false,
                })),
                cloexec: false,
            },
        );
        Ok(Fd(fd))
    }

    fn close(&mut self, fd: Fd) -> Result<()> {
        self.fds.borrow_mut().remove(&fd.0);
        Ok(())
    }

    fn dup(&mut self, from: Fd, min_fd: Fd, cloexec: bool) -> Result<Fd> {
        let body = self.body(from)?;
        let fd = self.next_fd_from(min_fd.0);
        self.fds.borrow_mut().insert(
            fd,
            FdBody {
                description: body.description,
                cloexec,
            },
        );
        Ok(Fd(fd))
    }

    fn dup2(&mut self, from: Fd, to: Fd) -> Result<Fd> {
        let body = self.body(from)?;
        self.fds.borrow_mut().insert(
            to.0,
            FdBody {
                description: body.description,
                cloexec: false,
            },
        );
        Ok(to)
    }

    fn pipe(&mut self) -> Result<(Fd, Fd)> {
        let buffer = Rc::new(RefCell::new(VecDeque::new()));
        let reader = self.next_fd_from(0);
        self.fds.borrow_mut().insert(
            reader,
            FdBody {
                description: Rc::new(RefCell::new(OpenFileDescription::PipeReader {
                    buffer: Rc::clone(&buffer),
                })),
                cloexec: false,
            },
        );
        let writer = self.next_fd_from(0);
        self.fds.borrow_mut().insert(
            writer,
            FdBody {
                description: Rc::new(RefCell::new(OpenFileDescription::PipeWriter { buffer })),
                cloexec: false,
            },
        );
        Ok((Fd(reader), Fd(writer)))
    }

    fn read(&mut self, fd: Fd, buffer: &mut [u8]) -> Result<usize> {
        let description = Rc::clone(&self.body(fd)?.description);
        let mut description = description.borrow_mut();
        match &mut *description {
            OpenFileDescription::File {
                inode,
                offset,
                access,
                ..
            } => {
                if *access == OfdAccess::WriteOnly {
                    return Err(Errno::EBADF);
                }
                let inode = inode.borrow();
                let available = inode.content.len().saturating_sub(*offset);
                let count = available.min(buffer.len());
                buffer[..count].copy_from_slice(&inode.content[*offset..*offset + count]);
                *offset += count;
                Ok(count)
            }
            OpenFileDescription::PipeReader { buffer: pipe } => {
                let mut pipe = pipe.borrow_mut();
                let count = pipe.len().min(buffer.len());
                for byte in buffer.iter_mut().take(count) {
                    *byte = pipe.pop_front().unwrap();
                }
                Ok(count)
            }
            OpenFileDescription::PipeWriter { .. } => Err(Errno::EBADF),
        }
    }

    fn write(&mut self, fd: Fd, buffer: &[u8]) -> Result<usize> {
        let description = Rc::clone(&self.body(fd)?.description);
        let mut description = description.borrow_mut();
        match &mut *description {
            OpenFileDescription::File {
                inode,
                offset,
                access,
                append,
            } => {
                if *access == OfdAccess::ReadOnly {
                    return Err(Errno::EBADF);
                }
                let mut inode = inode.borrow_mut();
                if *append {
                    *offset = inode.content.len();
                }
                let end = *offset + buffer.len();
                if inode.content.len() < end {
                    inode.content.resize(end, 0);
                }
                inode.content[*offset..end].copy_from_slice(buffer);
                *offset = end;
                Ok(buffer.len())
            }
            OpenFileDescription::PipeWriter { buffer: pipe } => {
                pipe.borrow_mut().extend(buffer.iter().copied());
                Ok(buffer.len())
            }
            OpenFileDescription::PipeReader { .. } => Err(Errno::EBADF),
        }
    }

    fn rewind(&mut self, fd: Fd) -> Result<()> {
        let description = Rc::clone(&self.body(fd)?.description);
        let mut description = description.borrow_mut();
        match &mut *description {
            OpenFileDescription::File { offset, .. } => {
                *offset = 0;
                Ok(())
            }
            _ => Err(Errno::EINVAL),
        }
    }

    fn get_cloexec(&self, fd: Fd) -> Result<bool> {
        Ok(self.body(fd)?.cloexec)
    }

    fn set_cloexec(&mut self, fd: Fd, cloexec: bool) -> Result<()> {
        match self.fds.borrow_mut().get_mut(&fd.0) {
            Some(body) => {
                body.cloexec = cloexec;
                Ok(())
            }
            None => Err(Errno::EBADF),
        }
    }

    fn validate_fd(&self, fd: Fd) -> bool {
        self.fds.borrow().contains_key(&fd.0)
    }

    fn is_fd_readable(&self, fd: Fd) -> Result<bool> {
        match &*self.body(fd)?.description.borrow() {
            OpenFileDescription::File { access, .. } => Ok(*access != OfdAccess::WriteOnly),
            OpenFileDescription::PipeReader { .. } => Ok(true),
            OpenFileDescription::PipeWriter { .. } => Ok(false),
        }
    }

    fn is_fd_writable(&self, fd: Fd) -> Result<bool> {
        match &*self.body(fd)?.description.borrow() {
            OpenFileDescription::File { access, .. } => Ok(*access != OfdAccess::ReadOnly),
            OpenFileDescription::PipeReader { .. } => Ok(false),
            OpenFileDescription::PipeWriter { .. } => Ok(true),
        }
    }

    fn isatty(&self, _fd: Fd) -> bool {
        false
    }

    fn is_regular_file(&self, path: &CStr) -> bool {
        let Ok(path) = path.to_str() else { return false };
        self.state
            .borrow()
            .file_system
            .contains_key(&PathBuf::from(path))
    }

    fn is_directory(&self, path: &CStr) -> bool {
        let Ok(path) = path.to_str() else { return false };
        let prefix = if path.ends_with('/') {
            path.to_owned()
        } else {
            format!("{path}/")
        };
        self.state
            .borrow()
            .file_system
            .keys()
            .any(|file| file.to_str().is_some_and(|file| file.starts_with(&prefix)))
    }

    fn is_executable_file(&self, path: &CStr) -> bool {
        let Ok(path) = path.to_str() else { return false };
        self.state
            .borrow()
            .file_system
            .get(&PathBuf::from(path))
            .is_some_and(|inode| inode.borrow().is_executable)
    }

    fn file_exists(&self, path: &CStr) -> bool {
        self.is_regular_file(path) || self.is_directory(path)
    }

    fn file_id_and_mtime(&self, path: &CStr) -> Result<(u64, u64, i64)> {
        let path = path.to_str().map_err(|_| Errno::EINVAL)?;
        let state = self.state.borrow();
        let inode = state
            .file_system
            .get(&PathBuf::from(path))
            .ok_or(Errno::ENOENT)?;
        let id = Rc::as_ptr(inode) as u64;
        let mtime = inode.borrow().mtime;
        Ok((0, id, mtime))
    }

    fn file_size(&self, path: &CStr) -> Result<u64> {
        let path = path.to_str().map_err(|_| Errno::EINVAL)?;
        let state = self.state.borrow();
        let inode = state
            .file_system
            .get(&PathBuf::from(path))
            .ok_or(Errno::ENOENT)?;
        let len = inode.borrow().content.len() as u64;
        Ok(len)
    }

    unsafe fn fork(&mut self) -> Result<Fork> {
        Err(Errno::ENOSYS)
    }

    fn execve(
        &mut self,
        _path: &CStr,
        _args: &[CString],
        _envs: &[CString],
    ) -> Result<Infallible> {
        Err(Errno::ENOSYS)
    }

    fn exit(&mut self, exit_status: c_int) -> ! {
        panic!("exit({exit_status}) called in the virtual system")
    }

    fn wait(&mut self, _pid: Option<Pid>, _no_hang: bool, _untraced: bool) -> Result<WaitStatus> {
        Err(Errno::ECHILD)
    }

    fn kill(&mut self, pid: Pid, signal: Option<signal::Number>) -> Result<()> {
        self.state.borrow_mut().sent_signals.push((pid, signal));
        Ok(())
    }

    fn getpid(&self) -> Pid {
        self.process_id
    }

    fn getppid(&self) -> Pid {
        Pid(1)
    }

    fn getpgrp(&self) -> Pid {
        self.process_id
    }

    fn setpgid(&mut self, _pid: Pid, _pgid: Pid) -> Result<()> {
        Ok(())
    }

    fn tcgetpgrp(&self, _fd: Fd) -> Result<Pid> {
        Ok(self.process_id)
    }

    fn tcsetpgrp(&mut self, _fd: Fd, _pgid: Pid) -> Result<()> {
        Ok(())
    }

    fn signal_number_from_name(&self, name: signal::Name) -> Option<signal::Number> {
        // The virtual system uses the same numbering as the real system on
        // the build platform.
        use signal::Name::*;
        let raw = match name {
            Abrt => libc::SIGABRT,
            Alrm => libc::SIGALRM,
            Bus => libc::SIGBUS,
            Chld => libc::SIGCHLD,
            Cont => libc::SIGCONT,
            Fpe => libc::SIGFPE,
            Hup => libc::SIGHUP,
            Ill => libc::SIGILL,
            Int => libc::SIGINT,
            Kill => libc::SIGKILL,
            Pipe => libc::SIGPIPE,
            Quit => libc::SIGQUIT,
            Segv => libc::SIGSEGV,
            Stop => libc::SIGSTOP,
            Term => libc::SIGTERM,
            Tstp => libc::SIGTSTP,
            Ttin => libc::SIGTTIN,
            Ttou => libc::SIGTTOU,
            Urg => libc::SIGURG,
            Usr1 => libc::SIGUSR1,
            Usr2 => libc::SIGUSR2,
            Winch => libc::SIGWINCH,
            Xcpu => libc::SIGXCPU,
            Xfsz => libc::SIGXFSZ,
        };
        signal::Number::from_raw(raw)
    }

    fn signal_name_from_number(&self, number: signal::Number) -> signal::Name {
        use strum::IntoEnumIterator;
        signal::Name::iter()
            .find(|&name| self.signal_number_from_name(name) == Some(number))
            .unwrap_or(signal::Name::Term)
    }

    fn sigaction(&mut self, signal: signal::Number, action: Disposition) -> Result<Disposition> {
        let mut state = self.state.borrow_mut();
        let old = state
            .dispositions
            .insert(signal.as_raw(), action)
            .unwrap_or_default();
        Ok(old)
    }

    fn caught_signals(&mut self) -> Vec<signal::Number> {
        std::mem::take(&mut self.state.borrow_mut().pending_signals)
    }

    fn read_dir(&self, path: &CStr) -> Result<Vec<String>> {
        let path = path.to_str().map_err(|_| Errno::EINVAL)?;
        let prefix = if path.ends_with('/') {
            path.to_owned()
        } else {
            format!("{path}/")
        };
        let state = self.state.borrow();
        let mut names: Vec<String> = state
            .file_system
            .keys()
            .filter_map(|file| {
                let rest = file.to_str()?.strip_prefix(&prefix)?;
                let name = rest.split('/').next()?;
                if name.is_empty() {
                    None
                } else {
                    Some(name.to_owned())
                }
            })
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    fn getcwd(&self) -> Result<PathBuf> {
        Ok(self.cwd.clone())
    }

    fn chdir(&mut self, path: &CStr) -> Result<()> {
        let path = path.to_str().map_err(|_| Errno::EINVAL)?;
        self.cwd = PathBuf::from(path);
        Ok(())
    }

    fn home_dir_of_user(&self, _name: &str) -> Option<PathBuf> {
        None
    }

    fn times(&self) -> Result<Times> {
        Ok(Times::default())
    }

    fn monotonic_clock(&self) -> Duration {
        Duration::ZERO
    }

    fn epoch_time(&self) -> i64 {
        self.state.borrow().now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    fn c(path: &str) -> CString {
        CString::new(path).unwrap()
    }

    #[test]
    fn open_write_and_read_back() {
        let mut system = VirtualSystem::new();
        let fd = system
            .open(
                &c("/file"),
                OfdAccess::WriteOnly,
                OpenFlag::Create | OpenFlag::Truncate,
                Mode::default(),
            )
            .unwrap();
        system.write(fd, b"hello").unwrap();
        system.close(fd).unwrap();

        assert_eq!(system.file_content("/file").unwrap(), b"hello");

        let fd = system
            .open(
                &c("/file"),
                OfdAccess::ReadOnly,
                EnumSet::empty(),
                Mode::default(),
            )
            .unwrap();
        let mut buffer = [0; 16];
        let count = system.read(fd, &mut buffer).unwrap();
        assert_eq!(&buffer[..count], b"hello");
    }

    #[test]
    fn open_missing_file_fails() {
        let mut system = VirtualSystem::new();
        let result = system.open(
            &c("/missing"),
            OfdAccess::ReadOnly,
            EnumSet::empty(),
            Mode::default(),
        );
        assert_eq!(result, Err(Errno::ENOENT));
    }

    #[test]
    fn exclusive_create_fails_on_existing_file() {
        let mut system = VirtualSystem::new();
        let fd = system
            .open(
                &c("/file"),
                OfdAccess::WriteOnly,
                OpenFlag::Create | OpenFlag::Exclusive,
                Mode::default(),
            )
            .unwrap();
        system.close(fd).unwrap();
        let result = system.open(
            &c("/file"),
            OfdAccess::WriteOnly,
            OpenFlag::Create | OpenFlag::Exclusive,
            Mode::default(),
        );
        assert_eq!(result, Err(Errno::EEXIST));
    }

    #[test]
    fn append_mode() {
        let mut system = VirtualSystem::new();
        let fd = system
            .open(
                &c("/log"),
                OfdAccess::WriteOnly,
                OpenFlag::Create.into(),
                Mode::default(),
            )
            .unwrap();
        system.write(fd, b"one").unwrap();
        system.close(fd).unwrap();

        let fd = system
            .open(
                &c("/log"),
                OfdAccess::WriteOnly,
                OpenFlag::Create | OpenFlag::Append,
                Mode::default(),
            )
            .unwrap();
        system.write(fd, b"two").unwrap();
        assert_eq!(system.file_content("/log").unwrap(), b"onetwo");
    }

    #[test]
    fn dup_shares_open_file_description() {
        let mut system = VirtualSystem::new();
        let fd = system
            .open(
                &c("/file"),
                OfdAccess::WriteOnly,
                OpenFlag::Create.into(),
                Mode::default(),
            )
            .unwrap();
        let copy = system.dup(fd, Fd(10), false).unwrap();
        assert!(copy.0 >= 10);
        system.write(fd, b"a").unwrap();
        system.write(copy, b"b").unwrap();
        assert_eq!(system.file_content("/file").unwrap(), b"ab");
    }

    #[test]
    fn dup2_overwrites_target() {
        let mut system = VirtualSystem::new();
        let fd = system
            .open(
                &c("/file"),
                OfdAccess::WriteOnly,
                OpenFlag::Create.into(),
                Mode::default(),
            )
            .unwrap();
        system.dup2(fd, Fd(1)).unwrap();
        system.write(Fd(1), b"out").unwrap();
        assert_eq!(system.file_content("/file").unwrap(), b"out");
    }

    #[test]
    fn fd_snapshot_detects_changes() {
        let mut system = VirtualSystem::new();
        let before = system.fd_snapshot();
        let fd = system
            .open(
                &c("/file"),
                OfdAccess::WriteOnly,
                OpenFlag::Create.into(),
                Mode::default(),
            )
            .unwrap();
        assert_ne!(system.fd_snapshot(), before);
        system.close(fd).unwrap();
        assert_eq!(system.fd_snapshot(), before);
    }

    #[test]
    fn stdin_can_be_prepared() {
        let mut system = VirtualSystem::new();
        system.set_stdin("input\n");
        let mut buffer = [0; 16];
        let count = system.read(Fd::STDIN, &mut buffer).unwrap();
        assert_eq!(&buffer[..count], b"input\n");
    }
}
