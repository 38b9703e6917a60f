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

//! Implementation of `System` that actually interacts with the system
//!
//! All system calls are performed directly with the C library. Signal
//! catching is implemented with a process-wide atomic bit set written from
//! the signal handler and drained at safe points by
//! [`caught_signals`](super::System::caught_signals).

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
use std::convert::Infallible;
use std::ffi::c_int;
use std::ffi::CStr;
use std::ffi::CString;
use std::os::unix::io::IntoRawFd;
use std::path::PathBuf;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::Instant;
use std::time::SystemTime;

/// Set of signals caught by the process-wide signal handler
///
/// Bit N-1 is set when signal N has been delivered.
static CAUGHT_SIGNALS: AtomicU64 = AtomicU64::new(0);

/// Signal handler that remembers the delivered signal.
///
/// This function only performs an async-signal-safe atomic store; all
/// meaningful work happens later when the shell examines the caught signals
/// at a safe point.
extern "C" fn catch_signal(signal: c_int) {
    if (1..=64).contains(&signal) {
        CAUGHT_SIGNALS.fetch_or(1 << (signal - 1), Ordering::Relaxed);
    }
}

fn result_of(value: c_int) -> Result<c_int> {
    if value < 0 {
        Err(Errno::last())
    } else {
        Ok(value)
    }
}

/// Implementation of `System` by real system calls
#[derive(Debug)]
pub struct RealSystem {
    /// Reference point for the monotonic clock
    start: Instant,
}

impl RealSystem {
    /// Creates an instance of `RealSystem`.
    ///
    /// # Safety
    ///
    /// The `RealSystem` manipulates process-wide signal dispositions, so at
    /// most one instance should exist in a process.
    pub unsafe fn new() -> RealSystem {
        RealSystem {
            start: Instant::now(),
        }
    }
}

impl System for RealSystem {
    fn open(
        &mut self,
        path: &CStr,
        access: OfdAccess,
        flags: EnumSet<OpenFlag>,
        mode: Mode,
    ) -> Result<Fd> {
        let mut bits = match access {
            OfdAccess::ReadOnly => libc::O_RDONLY,
            OfdAccess::WriteOnly => libc::O_WRONLY,
            OfdAccess::ReadWrite => libc::O_RDWR,
        };
        for flag in flags {
            bits |= match flag {
                OpenFlag::Create => libc::O_CREAT,
                OpenFlag::Exclusive => libc::O_EXCL,
                OpenFlag::Truncate => libc::O_TRUNC,
                OpenFlag::Append => libc::O_APPEND,
                OpenFlag::Cloexec => libc::O_CLOEXEC,
            };
        }
        let fd = result_of(unsafe { libc::open(path.as_ptr(), bits, mode.0 as libc::c_uint) })?;
        Ok(Fd(fd))
    }

    fn open_tmpfile(&mut self) -> Result<Fd> {
        match tempfile::tempfile() {
            Ok(file) => Ok(Fd(file.into_raw_fd())),
            Err(error) => Err(error.into()),
        }
    }

    fn close(&mut self, fd: Fd) -> Result<()> {
        match result_of(unsafe { libc::close(fd.0) }) {
            Ok(_) => Ok(()),
            Err(Errno::EBADF) => Ok(()),
            Err(error) => Err(error),
        }
    }

    fn dup(&mut self, from: Fd, min_fd: Fd, cloexec: bool) -> Result<Fd> {
        let command = if cloexec {
            libc::F_DUPFD_CLOEXEC
        } else {
            libc::F_DUPFD
        };
        let fd = result_of(unsafe { libc::fcntl(from.0, command, min_fd.0) })?;
        Ok(Fd(fd))
    }

    fn dup2(&mut self, from: Fd, to: Fd) -> Result<Fd> {
        loop {
            match result_of(unsafe { libc::dup2(from.0, to.0) }) {
                Ok(fd) => return Ok(Fd(fd)),
                Err(Errno::EINTR) => (),
                Err(error) => return Err(error),
            }
        }
    }

    fn pipe(&mut self) -> Result<(Fd, Fd)> {
        let mut fds = [0; 2];
        result_of(unsafe { libc::pipe(fds.as_mut_ptr()) })?;
        Ok((Fd(fds[0]), Fd(fds[1])))
    }

    fn read(&mut self, fd: Fd, buffer: &mut [u8]) -> Result<usize> {
        let count = unsafe { libc::read(fd.0, buffer.as_mut_ptr().cast(), buffer.len()) };
        if count < 0 {
            Err(Errno::last())
        } else {
            Ok(count as usize)
        }
    }

    fn write(&mut self, fd: Fd, buffer: &[u8]) -> Result<usize> {
        let count = unsafe { libc::write(fd.0, buffer.as_ptr().cast(), buffer.len()) };
        if count < 0 {
            Err(Errno::last())
        } else {
            Ok(count as usize)
        }
    }

    fn rewind(&mut self, fd: Fd) -> Result<()> {
        let result = unsafe { libc::lseek(fd.0, 0, libc::SEEK_SET) };
        if result < 0 {
            Err(Errno::last())
        } else {
            Ok(())
        }
    }

    fn get_cloexec(&self, fd: Fd) -> Result<bool> {
        let flags = result_of(unsafe { libc::fcntl(fd.0, libc::F_GETFD) })?;
        Ok(flags & libc::FD_CLOEXEC != 0)
    }

    fn set_cloexec(&mut self, fd: Fd, cloexec: bool) -> Result<()> {
        let flags = result_of(unsafe { libc::fcntl(fd.0, libc::F_GETFD) })?;
        let flags = if cloexec {
            flags | libc::FD_CLOEXEC
        } else {
            flags & !libc::FD_CLOEXEC
        };
        result_of(unsafe { libc::fcntl(fd.0, libc::F_SETFD, flags) })?;
        Ok(())
    }

    fn validate_fd(&self, fd: Fd) -> bool {
        unsafe { libc::fcntl(fd.0, libc::F_GETFL) >= 0 }
    }

    fn is_fd_readable(&self, fd: Fd) -> Result<bool> {
        let flags = result_of(unsafe { libc::fcntl(fd.0, libc::F_GETFL) })?;
        let access = flags & libc::O_ACCMODE;
        Ok(access == libc::O_RDONLY || access == libc::O_RDWR)
    }

    fn is_fd_writable(&self, fd: Fd) -> Result<bool> {
        let flags = result_of(unsafe { libc::fcntl(fd.0, libc::F_GETFL) })?;
        let access = flags & libc::O_ACCMODE;
        Ok(access == libc::O_WRONLY || access == libc::O_RDWR)
    }

    fn isatty(&self, fd: Fd) -> bool {
        unsafe { libc::isatty(fd.0) == 1 }
    }

    fn is_regular_file(&self, path: &CStr) -> bool {
        let mut stat = std::mem::MaybeUninit::<libc::stat>::uninit();
        unsafe {
            libc::stat(path.as_ptr(), stat.as_mut_ptr()) == 0
                && stat.assume_init().st_mode & libc::S_IFMT == libc::S_IFREG
        }
    }

    fn is_directory(&self, path: &CStr) -> bool {
        let mut stat = std::mem::MaybeUninit::<libc::stat>::uninit();
        unsafe {
            libc::stat(path.as_ptr(), stat.as_mut_ptr()) == 0
                && stat.assume_init().st_mode & libc::S_IFMT == libc::S_IFDIR
        }
    }

    fn is_executable_file(&self, path: &CStr) -> bool {
        self.is_regular_file(path) && unsafe { libc::access(path.as_ptr(), libc::X_OK) == 0 }
    }

    fn file_exists(&self, path: &CStr) -> bool {
        unsafe { libc::access(path.as_ptr(), libc::F_OK) == 0 }
    }

    fn file_id_and_mtime(&self, path: &CStr) -> Result<(u64, u64, i64)> {
        let mut stat = std::mem::MaybeUninit::<libc::stat>::uninit();
        result_of(unsafe { libc::stat(path.as_ptr(), stat.as_mut_ptr()) })?;
        let stat = unsafe { stat.assume_init() };
        Ok((stat.st_dev as u64, stat.st_ino as u64, stat.st_mtime as i64))
    }

    fn file_size(&self, path: &CStr) -> Result<u64> {
        let mut stat = std::mem::MaybeUninit::<libc::stat>::uninit();
        result_of(unsafe { libc::stat(path.as_ptr(), stat.as_mut_ptr()) })?;
        let stat = unsafe { stat.assume_init() };
        Ok(stat.st_size.max(0) as u64)
    }

    unsafe fn fork(&mut self) -> Result<Fork> {
        let pid = result_of(libc::fork())?;
        if pid == 0 {
            Ok(Fork::Child)
        } else {
            Ok(Fork::Parent { child: Pid(pid) })
        }
    }

    fn execve(
        &mut self,
        path: &CStr,
        args: &[CString],
        envs: &[CString],
    ) -> Result<Infallible> {
        let arg_ptrs: Vec<_> = args
            .iter()
            .map(|arg| arg.as_ptr())
            .chain([std::ptr::null()])
            .collect();
        let env_ptrs: Vec<_> = envs
            .iter()
            .map(|env| env.as_ptr())
            .chain([std::ptr::null()])
            .collect();
        unsafe {
            libc::execve(path.as_ptr(), arg_ptrs.as_ptr(), env_ptrs.as_ptr());
        }
        Err(Errno::last())
    }

    fn exit(&mut self, exit_status: c_int) -> ! {
        unsafe { libc::_exit(exit_status) }
    }

    fn wait(&mut self, pid: Option<Pid>, no_hang: bool, untraced: bool) -> Result<WaitStatus> {
        let mut status = 0;
        let mut flags = 0;
        if no_hang {
            flags |= libc::WNOHANG;
        }
        if untraced {
            flags |= libc::WUNTRACED;
        }
        let target = pid.map_or(-1, |pid| pid.0);
        let pid = result_of(unsafe { libc::waitpid(target, &mut status, flags) })?;
        if pid == 0 {
            return Ok(WaitStatus::StillAlive);
        }
        let pid = Pid(pid);

        if libc::WIFEXITED(status) {
            Ok(WaitStatus::Exited(pid, libc::WEXITSTATUS(status)))
        } else if libc::WIFSIGNALED(status) {
            let signal = signal::Number::from_raw(libc::WTERMSIG(status)).ok_or(Errno::EINVAL)?;
            Ok(WaitStatus::Signaled(pid, signal, libc::WCOREDUMP(status)))
        } else if libc::WIFSTOPPED(status) {
            let signal = signal::Number::from_raw(libc::WSTOPSIG(status)).ok_or(Errno::EINVAL)?;
            Ok(WaitStatus::Stopped(pid, signal))
        } else {
            Ok(WaitStatus::Continued(pid))
        }
    }

    fn kill(&mut self, pid: Pid, signal: Option<signal::Number>) -> Result<()> {
        let signal = signal.map_or(0, |signal| signal.as_raw());
        result_of(unsafe { libc::kill(pid.0, signal) })?;
        Ok(())
    }

    fn getpid(&self) -> Pid {
        Pid(unsafe { libc::getpid() })
    }

    fn getppid(&self) -> Pid {
        Pid(unsafe { libc::getppid() })
    }

    fn getpgrp(&self) -> Pid {
        Pid(unsafe { libc::getpgrp() })
    }

    fn setpgid(&mut self, pid: Pid, pgid: Pid) -> Result<()> {
        result_of(unsafe { libc::setpgid(pid.0, pgid.0) })?;
        Ok(())
    }

    fn tcgetpgrp(&self, fd: Fd) -> Result<Pid> {
        let pgid = result_of(unsafe { libc::tcgetpgrp(fd.0) })?;
        Ok(Pid(pgid))
    }

    fn tcsetpgrp(&mut self, fd: Fd, pgid: Pid) -> Result<()> {
        result_of(unsafe { libc::tcsetpgrp(fd.0, pgid.0) })?;
        Ok(())
    }

    fn signal_number_from_name(&self, name: signal::Name) -> Option<signal::Number> {
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
        let handler = match action {
            Disposition::Default => libc::SIG_DFL,
            Disposition::Ignore => libc::SIG_IGN,
            Disposition::Catch => catch_signal as extern "C" fn(c_int) as usize as libc::sighandler_t,
        };

        unsafe {
            let mut new: libc::sigaction = std::mem::zeroed();
            new.sa_sigaction = handler;
            libc::sigemptyset(&mut new.sa_mask);
            // No SA_RESTART: blocking reads must return EINTR so that traps
            // run at the next safe point.
            new.sa_flags = 0;

            let mut old: libc::sigaction = std::mem::zeroed();
            result_of(libc::sigaction(signal.as_raw(), &new, &mut old))?;

            Ok(if old.sa_sigaction == libc::SIG_IGN {
                Disposition::Ignore
            } else if old.sa_sigaction == libc::SIG_DFL {
                Disposition::Default
            } else {
                Disposition::Catch
            })
        }
    }

    fn caught_signals(&mut self) -> Vec<signal::Number> {
        let bits = CAUGHT_SIGNALS.swap(0, Ordering::Relaxed);
        (1..=64)
            .filter(|number| bits & (1 << (number - 1)) != 0)
            .filter_map(signal::Number::from_raw)
            .collect()
    }

    fn read_dir(&self, path: &CStr) -> Result<Vec<String>> {
        let path = std::str::from_utf8(path.to_bytes()).map_err(|_| Errno::EINVAL)?;
        let entries = std::fs::read_dir(path).map_err(Errno::from)?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(Errno::from)?;
            if let Ok(name) = entry.file_name().into_string() {
                names.push(name);
            }
        }
        Ok(names)
    }

    fn getcwd(&self) -> Result<PathBuf> {
        std::env::current_dir().map_err(Into::into)
    }

    fn chdir(&mut self, path: &CStr) -> Result<()> {
        result_of(unsafe { libc::chdir(path.as_ptr()) })?;
        Ok(())
    }

    fn home_dir_of_user(&self, name: &str) -> Option<PathBuf> {
        use std::os::unix::ffi::OsStringExt;
        let name = CString::new(name).ok()?;
        let passwd = unsafe { libc::getpwnam(name.as_ptr()) };
        if passwd.is_null() {
            return None;
        }
        let dir = unsafe { CStr::from_ptr((*passwd).pw_dir) };
        Some(PathBuf::from(std::ffi::OsString::from_vec(
            dir.to_bytes().to_vec(),
        )))
    }

    fn times(&self) -> Result<Times> {
        let ticks_per_second = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
        if ticks_per_second <= 0 {
            return Err(Errno::last());
        }
        let ticks_per_second = ticks_per_second as f64;

        let mut tms = std::mem::MaybeUninit::<libc::tms>::uninit();
        let result = unsafe { libc::times(tms.as_mut_ptr()) };
        if result == -1 {
            return Err(Errno::last());
        }
        let tms = unsafe { tms.assume_init() };
        Ok(Times {
            self_user: tms.tms_utime as f64 / ticks_per_second,
            self_system: tms.tms_stime as f64 / ticks_per_second,
            children_user: tms.tms_cutime as f64 / ticks_per_second,
            children_system: tms.tms_cstime as f64 / ticks_per_second,
        })
    }

    fn monotonic_clock(&self) -> Duration {
        self.start.elapsed()
    }

    fn epoch_time(&self) -> i64 {
        match SystemTime::now().duration_since(SystemTime::UNIX_EPOCH) {
            Ok(duration) => duration.as_secs() as i64,
            Err(error) => -(error.duration().as_secs() as i64),
        }
    }
}
