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

//! [System] and related types
//!
//! The `System` trait is the interface between the shell and the underlying
//! operating system. All system calls the shell performs go through a
//! `System` instance, so that the calls can be intercepted: [`RealSystem`]
//! performs actual system calls, and [`VirtualSystem`] simulates a subset of
//! them in memory for testing.

use crate::signal;
use enumset::EnumSet;
use enumset::EnumSetType;
use std::convert::Infallible;
use std::ffi::c_int;
use std::ffi::CStr;
use std::ffi::CString;
use std::fmt;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

mod id;
pub mod real;
pub mod r#virtual;

pub use self::id::Pid;
pub use self::real::RealSystem;
pub use self::r#virtual::VirtualSystem;

/// Error value for system calls
///
/// This is a thin wrapper around the raw `errno` value.
#[derive(Clone, Copy, Eq, Hash, PartialEq)]
pub struct Errno(pub c_int);

impl std::error::Error for Errno {}

impl Errno {
    pub const EACCES: Errno = Errno(libc::EACCES);
    pub const EBADF: Errno = Errno(libc::EBADF);
    pub const ECHILD: Errno = Errno(libc::ECHILD);
    pub const EEXIST: Errno = Errno(libc::EEXIST);
    pub const EINTR: Errno = Errno(libc::EINTR);
    pub const EINVAL: Errno = Errno(libc::EINVAL);
    pub const EIO: Errno = Errno(libc::EIO);
    pub const EISDIR: Errno = Errno(libc::EISDIR);
    pub const ENOENT: Errno = Errno(libc::ENOENT);
    pub const ENOEXEC: Errno = Errno(libc::ENOEXEC);
    pub const ENOSYS: Errno = Errno(libc::ENOSYS);
    pub const ENOTDIR: Errno = Errno(libc::ENOTDIR);
    pub const EPIPE: Errno = Errno(libc::EPIPE);
    pub const ERANGE: Errno = Errno(libc::ERANGE);
    pub const ESRCH: Errno = Errno(libc::ESRCH);
    pub const EXDEV: Errno = Errno(libc::EXDEV);

    /// Returns the current `errno` value of the calling thread.
    #[must_use]
    pub fn last() -> Errno {
        Errno(errno::errno().0)
    }

    /// Returns a human-readable description of the error.
    #[must_use]
    pub fn desc(&self) -> String {
        errno::Errno(self.0).to_string()
    }
}

impl fmt::Debug for Errno {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Errno({}: {})", self.0, self.desc())
    }
}

impl fmt::Display for Errno {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.desc().fmt(f)
    }
}

impl From<std::io::Error> for Errno {
    fn from(error: std::io::Error) -> Errno {
        Errno(error.raw_os_error().unwrap_or(libc::EIO))
    }
}

/// Result of system calls
pub type Result<T> = std::result::Result<T, Errno>;

/// File descriptor
pub use marsh_syntax::syntax::Fd;

/// Minimum file descriptor the shell uses for internal purposes
///
/// POSIX requires file descriptors 0 through 9 to be freely usable by the
/// user, so the shell moves its internal file descriptors to 10 or above and
/// sets the close-on-exec flag on them.
pub const MIN_INTERNAL_FD: Fd = Fd(10);

/// Access mode of an open file description
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum OfdAccess {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

/// Flags for opening a file
#[derive(Debug, EnumSetType, Hash)]
pub enum OpenFlag {
    /// Create the file if it does not exist.
    Create,
    /// Fail if the file exists (used with `Create`).
    Exclusive,
    /// Truncate the file to zero length.
    Truncate,
    /// Write at the end of the file.
    Append,
    /// Set the close-on-exec flag on the new file descriptor.
    Cloexec,
}

/// File permission bits for newly created files
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Mode(pub u32);

impl Default for Mode {
    fn default() -> Mode {
        Mode(0o666)
    }
}

/// How a signal is handled
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum Disposition {
    /// Perform the default action for the signal.
    #[default]
    Default,
    /// Ignore the signal.
    Ignore,
    /// Catch the signal, remembering its delivery for
    /// [`caught_signals`](System::caught_signals).
    Catch,
}

/// Result of a `fork` call
#[derive(Debug)]
pub enum Fork {
    /// This process is the parent of the new child process.
    Parent {
        /// Process ID of the child
        child: Pid,
    },
    /// This process is the new child process.
    Child,
}

/// Status of a process reported by `wait`
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum WaitStatus {
    /// The process exited with an exit status.
    Exited(Pid, c_int),
    /// The process was killed by a signal.
    Signaled(Pid, signal::Number, bool),
    /// The process was stopped by a signal.
    Stopped(Pid, signal::Number),
    /// The process resumed execution.
    Continued(Pid),
    /// There was no process to report.
    StillAlive,
}

impl WaitStatus {
    /// Returns the process ID of the reported process, if any.
    #[must_use]
    pub fn pid(&self) -> Option<Pid> {
        match *self {
            WaitStatus::Exited(pid, _)
            | WaitStatus::Signaled(pid, _, _)
            | WaitStatus::Stopped(pid, _)
            | WaitStatus::Continued(pid) => Some(pid),
            WaitStatus::StillAlive => None,
        }
    }
}

/// CPU time consumed by the shell and its children, in seconds
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Times {
    pub self_user: f64,
    pub self_system: f64,
    pub children_user: f64,
    pub children_system: f64,
}

/// Interface to the underlying operating system
///
/// See the [module documentation](self) for an overview.
pub trait System: fmt::Debug {
    /// Opens a file.
    fn open(
        &mut self,
        path: &CStr,
        access: OfdAccess,
        flags: EnumSet<OpenFlag>,
        mode: Mode,
    ) -> Result<Fd>;

    /// Opens an anonymous temporary file, returning a readable and writable
    /// file descriptor.
    fn open_tmpfile(&mut self) -> Result<Fd>;

    /// Closes a file descriptor.
    ///
    /// Closing an already closed file descriptor is not an error.
    fn close(&mut self, fd: Fd) -> Result<()>;

    /// Duplicates a file descriptor to the lowest available descriptor not
    /// less than `min_fd`.
    fn dup(&mut self, from: Fd, min_fd: Fd, cloexec: bool) -> Result<Fd>;

    /// Duplicates a file descriptor to the given descriptor.
    fn dup2(&mut self, from: Fd, to: Fd) -> Result<Fd>;

    /// Opens an unnamed pipe, returning the reading and writing ends.
    fn pipe(&mut self) -> Result<(Fd, Fd)>;

    /// Reads from a file descriptor.
    fn read(&mut self, fd: Fd, buffer: &mut [u8]) -> Result<usize>;

    /// Writes to a file descriptor.
    fn write(&mut self, fd: Fd, buffer: &[u8]) -> Result<usize>;

    /// Repositions the file offset to the beginning of the file.
    fn rewind(&mut self, fd: Fd) -> Result<()>;

    /// Returns whether the close-on-exec flag is set on a file descriptor.
    fn get_cloexec(&self, fd: Fd) -> Result<bool>;

    /// Sets the close-on-exec flag on a file descriptor.
    fn set_cloexec(&mut self, fd: Fd, cloexec: bool) -> Result<()>;

    /// Tests whether a file descriptor is open.
    fn validate_fd(&self, fd: Fd) -> bool;

    /// Tests whether a file descriptor refers to a readable open file
    /// description.
    fn is_fd_readable(&self, fd: Fd) -> Result<bool>;

    /// Tests whether a file descriptor refers to a writable open file
    /// description.
    fn is_fd_writable(&self, fd: Fd) -> Result<bool>;

    /// Tests whether a file descriptor refers to a terminal.
    fn isatty(&self, fd: Fd) -> bool;

    /// Tests whether a regular file exists at the path.
    fn is_regular_file(&self, path: &CStr) -> bool;

    /// Tests whether a directory exists at the path.
    fn is_directory(&self, path: &CStr) -> bool;

    /// Tests whether an executable regular file exists at the path.
    fn is_executable_file(&self, path: &CStr) -> bool;

    /// Tests whether any file exists at the path.
    fn file_exists(&self, path: &CStr) -> bool;

    /// Returns the metadata of the file at the path.
    ///
    /// The result contains the modification time in seconds since the epoch
    /// and the device/inode pair, used by the `-nt`, `-ot` and `-ef` file
    /// comparisons.
    fn file_id_and_mtime(&self, path: &CStr) -> Result<(u64, u64, i64)>;

    /// Returns the size in bytes of the file at the path.
    ///
    /// This is used by the `-s` file test.
    fn file_size(&self, path: &CStr) -> Result<u64>;

    /// Creates a new child process.
    ///
    /// This function returns [`Fork::Parent`] in the calling process and
    /// [`Fork::Child`] in the new process.
    ///
    /// # Safety
    ///
    /// In a multi-threaded program, the child process may only call
    /// async-signal-safe functions. The shell is single-threaded.
    unsafe fn fork(&mut self) -> Result<Fork>;

    /// Replaces the current process image.
    fn execve(&mut self, path: &CStr, args: &[CString], envs: &[CString])
        -> Result<Infallible>;

    /// Terminates the current process immediately.
    fn exit(&mut self, exit_status: c_int) -> !;

    /// Waits for a child process to change state.
    ///
    /// If `pid` is `None`, waits for any child. With `no_hang`, returns
    /// [`WaitStatus::StillAlive`] instead of blocking.
    fn wait(&mut self, pid: Option<Pid>, no_hang: bool, untraced: bool) -> Result<WaitStatus>;

    /// Sends a signal to a process or process group.
    fn kill(&mut self, pid: Pid, signal: Option<signal::Number>) -> Result<()>;

    /// Returns the process ID of the current process.
    fn getpid(&self) -> Pid;

    /// Returns the process ID of the parent process.
    fn getppid(&self) -> Pid;

    /// Returns the process group ID of the current process.
    fn getpgrp(&self) -> Pid;

    /// Sets the process group ID of a process.
    fn setpgid(&mut self, pid: Pid, pgid: Pid) -> Result<()>;

    /// Returns the foreground process group of the terminal.
    fn tcgetpgrp(&self, fd: Fd) -> Result<Pid>;

    /// Sets the foreground process group of the terminal.
    fn tcsetpgrp(&mut self, fd: Fd, pgid: Pid) -> Result<()>;

    /// Converts a signal name to a number.
    fn signal_number_from_name(&self, name: signal::Name) -> Option<signal::Number>;

    /// Converts a signal number to a name.
    fn signal_name_from_number(&self, number: signal::Number) -> signal::Name;

    /// Sets the disposition for a signal, returning the previous one.
    fn sigaction(&mut self, signal: signal::Number, action: Disposition) -> Result<Disposition>;

    /// Returns the signals that have been caught since the last call.
    ///
    /// Signals whose disposition is [`Disposition::Catch`] are remembered
    /// when delivered; this function drains and returns them.
    fn caught_signals(&mut self) -> Vec<signal::Number>;

    /// Returns the names of the entries of a directory.
    ///
    /// The result does not include `.` and `..`. This is used by pathname
    /// expansion.
    fn read_dir(&self, path: &CStr) -> Result<Vec<String>>;

    /// Returns the current working directory.
    fn getcwd(&self) -> Result<PathBuf>;

    /// Changes the working directory.
    fn chdir(&mut self, path: &CStr) -> Result<()>;

    /// Returns the home directory of the named user.
    fn home_dir_of_user(&self, name: &str) -> Option<PathBuf>;

    /// Returns the consumed CPU times.
    fn times(&self) -> Result<Times>;

    /// Returns the time elapsed since an arbitrary fixed point in the past.
    fn monotonic_clock(&self) -> Duration;

    /// Returns the current time in seconds since the Unix epoch.
    fn epoch_time(&self) -> i64;
}

/// Extension methods for `System`
pub trait SystemEx: System {
    /// Writes the whole buffer to a file descriptor, retrying on partial
    /// writes and `EINTR`.
    fn write_all(&mut self, fd: Fd, mut buffer: &[u8]) -> Result<usize> {
        let len = buffer.len();
        while !buffer.is_empty() {
            match self.write(fd, buffer) {
                Ok(count) => buffer = &buffer[count..],
                Err(Errno::EINTR) => (),
                Err(error) => return Err(error),
            }
        }
        Ok(len)
    }

    /// Moves a file descriptor to [`MIN_INTERNAL_FD`] or above and sets the
    /// close-on-exec flag on it.
    fn move_fd_internal(&mut self, from: Fd) -> Result<Fd> {
        if from >= MIN_INTERNAL_FD && self.get_cloexec(from)? {
            return Ok(from);
        }
        let new = self.dup(from, MIN_INTERNAL_FD, true)?;
        _ = self.close(from);
        Ok(new)
    }
}

impl<T: System + ?Sized> SystemEx for T {}

/// Converts a `Path` to a `CString`, failing with `EINVAL` on interior nul
/// bytes.
pub fn path_to_c_string(path: &Path) -> Result<CString> {
    use std::os::unix::ffi::OsStrExt;
    CString::new(path.as_os_str().as_bytes()).map_err(|_| Errno::EINVAL)
}

/// System shared by reference
///
/// A `SharedSystem` is a reference-counted wrapper of a [`System`] instance.
/// It implements `System` itself by delegation, so the environment and the
/// input function reading the command source can operate on the same file
/// descriptor table. Cloning a `SharedSystem` clones the reference, not the
/// underlying system.
#[derive(Clone, Debug)]
pub struct SharedSystem(pub std::rc::Rc<std::cell::RefCell<Box<dyn System>>>);

impl SharedSystem {
    /// Creates a new shared system.
    pub fn new(system: Box<dyn System>) -> SharedSystem {
        SharedSystem(std::rc::Rc::new(std::cell::RefCell::new(system)))
    }
}

impl System for SharedSystem {
    fn open(
        &mut self,
        path: &CStr,
        access: OfdAccess,
        flags: EnumSet<OpenFlag>,
        mode: Mode,
    ) -> Result<Fd> {
        self.0.borrow_mut().open(path, access, flags, mode)
    }
    fn open_tmpfile(&mut self) -> Result<Fd> {
        self.0.borrow_mut().open_tmpfile()
    }
    fn close(&mut self, fd: Fd) -> Result<()> {
        self.0.borrow_mut().close(fd)
    }
    fn dup(&mut self, from: Fd, min_fd: Fd, cloexec: bool) -> Result<Fd> {
        self.0.borrow_mut().dup(from, min_fd, cloexec)
    }
    fn dup2(&mut self, from: Fd, to: Fd) -> Result<Fd> {
        self.0.borrow_mut().dup2(from, to)
    }
    fn pipe(&mut self) -> Result<(Fd, Fd)> {
        self.0.borrow_mut().pipe()
    }
    fn read(&mut self, fd: Fd, buffer: &mut [u8]) -> Result<usize> {
        self.0.borrow_mut().read(fd, buffer)
    }
    fn write(&mut self, fd: Fd, buffer: &[u8]) -> Result<usize> {
        self.0.borrow_mut().write(fd, buffer)
    }
    fn rewind(&mut self, fd: Fd) -> Result<()> {
        self.0.borrow_mut().rewind(fd)
    }
    fn get_cloexec(&self, fd: Fd) -> Result<bool> {
        self.0.borrow().get_cloexec(fd)
    }
    fn set_cloexec(&mut self, fd: Fd, cloexec: bool) -> Result<()> {
        self.0.borrow_mut().set_cloexec(fd, cloexec)
    }
    fn validate_fd(&self, fd: Fd) -> bool {
        self.0.borrow().validate_fd(fd)
    }
    fn is_fd_readable(&self, fd: Fd) -> Result<bool> {
        self.0.borrow().is_fd_readable(fd)
    }
    fn is_fd_writable(&self, fd: Fd) -> Result<bool> {
        self.0.borrow().is_fd_writable(fd)
    }
    fn isatty(&self, fd: Fd) -> bool {
        self.0.borrow().isatty(fd)
    }
    fn is_regular_file(&self, path: &CStr) -> bool {
        self.0.borrow().is_regular_file(path)
    }
    fn is_directory(&self, path: &CStr) -> bool {
        self.0.borrow().is_directory(path)
    }
    fn is_executable_file(&self, path: &CStr) -> bool {
        self.0.borrow().is_executable_file(path)
    }
    fn file_exists(&self, path: &CStr) -> bool {
        self.0.borrow().file_exists(path)
    }
    fn file_id_and_mtime(&self, path: &CStr) -> Result<(u64, u64, i64)> {
        self.0.borrow().file_id_and_mtime(path)
    }
    fn file_size(&self, path: &CStr) -> Result<u64> {
        self.0.borrow().file_size(path)
    }
    unsafe fn fork(&mut self) -> Result<Fork> {
        self.0.borrow_mut().fork()
    }
    fn execve(
        &mut self,
        path: &CStr,
        args: &[CString],
        envs: &[CString],
    ) -> Result<Infallible> {
        self.0.borrow_mut().execve(path, args, envs)
    }
    fn exit(&mut self, exit_status: std::ffi::c_int) -> ! {
        self.0.borrow_mut().exit(exit_status)
    }
    fn wait(&mut self, pid: Option<Pid>, no_hang: bool, untraced: bool) -> Result<WaitStatus> {
        self.0.borrow_mut().wait(pid, no_hang, untraced)
    }
    fn kill(&mut self, pid: Pid, signal: Option<crate::signal::Number>) -> Result<()> {
        self.0.borrow_mut().kill(pid, signal)
    }
    fn getpid(&self) -> Pid {
        self.0.borrow().getpid()
    }
    fn getppid(&self) -> Pid {
        self.0.borrow().getppid()
    }
    fn getpgrp(&self) -> Pid {
        self.0.borrow().getpgrp()
    }
    fn setpgid(&mut self, pid: Pid, pgid: Pid) -> Result<()> {
        self.0.borrow_mut().setpgid(pid, pgid)
    }
    fn tcgetpgrp(&self, fd: Fd) -> Result<Pid> {
        self.0.borrow().tcgetpgrp(fd)
    }
    fn tcsetpgrp(&mut self, fd: Fd, pgid: Pid) -> Result<()> {
        self.0.borrow_mut().tcsetpgrp(fd, pgid)
    }
    fn signal_number_from_name(&self, name: crate::signal::Name) -> Option<crate::signal::Number> {
        self.0.borrow().signal_number_from_name(name)
    }
    fn signal_name_from_number(&self, number: crate::signal::Number) -> crate::signal::Name {
        self.0.borrow().signal_name_from_number(number)
    }
    fn sigaction(
        &mut self,
        signal: crate::signal::Number,
        action: Disposition,
    ) -> Result<Disposition> {
        self.0.borrow_mut().sigaction(signal, action)
    }
    fn caught_signals(&mut self) -> Vec<crate::signal::Number> {
        self.0.borrow_mut().caught_signals()
    }
    fn read_dir(&self, path: &CStr) -> Result<Vec<String>> {
        self.0.borrow().read_dir(path)
    }
    fn getcwd(&self) -> Result<PathBuf> {
        self.0.borrow().getcwd()
    }
    fn chdir(&mut self, path: &CStr) -> Result<()> {
        self.0.borrow_mut().chdir(path)
    }
    fn home_dir_of_user(&self, name: &str) -> Option<PathBuf> {
        self.0.borrow().home_dir_of_user(name)
    }
    fn times(&self) -> Result<Times> {
        self.0.borrow().times()
    }
    fn monotonic_clock(&self) -> Duration {
        self.0.borrow().monotonic_clock()
    }
    fn epoch_time(&self) -> i64 {
        self.0.borrow().epoch_time()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errno_description_is_not_empty() {
        assert!(!Errno::ENOENT.desc().is_empty());
    }

    #[test]
    fn wait_status_pid() {
        let pid = Pid(42);
        assert_eq!(WaitStatus::Exited(pid, 0).pid(), Some(pid));
        assert_eq!(WaitStatus::StillAlive.pid(), None);
    }

    #[test]
    fn write_all_retries_partial_writes() {
        let mut system = VirtualSystem::new();
        let (reader, writer) = system.pipe().unwrap();
        system.write_all(writer, b"hello").unwrap();
        let mut buffer = [0; 8];
        let count = system.read(reader, &mut buffer).unwrap();
        assert_eq!(&buffer[..count], b"hello");
    }
}
