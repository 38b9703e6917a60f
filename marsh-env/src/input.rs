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

//! Input functions that read from the system
//!
//! This module implements the [`Input`] trait of the syntax crate on top of
//! the [`System`] interface, so that the parser can read commands from a
//! file descriptor. The shell's `Env` is shared with the reader through
//! `Rc<RefCell<...>>`-free plumbing: the reader owns a clone of the system
//! handle, which is cheap because system handles are small.

use crate::system::Errno;
use crate::system::Fd;
use crate::system::System;
use marsh_syntax::input::Context;
use marsh_syntax::input::Input;
use marsh_syntax::input::Result;

/// Input function that reads lines from a file descriptor
///
/// The reader reads one byte at a time so that it does not consume input
/// beyond the current line, which matters when the shell and its children
/// share the input stream, e.g. when running a script from standard input.
#[derive(Debug)]
pub struct FdReader<S: System> {
    system: S,
    fd: Fd,
    /// Whether an end-of-file condition has been seen
    at_eof: bool,
}

impl<S: System> FdReader<S> {
    /// Creates a new reader for the given file descriptor.
    pub fn new(system: S, fd: Fd) -> Self {
        FdReader {
            system,
            fd,
            at_eof: false,
        }
    }
}

impl<S: System> Input for FdReader<S> {
    fn next_line(&mut self, _context: &Context) -> Result {
        if self.at_eof {
            return Ok(String::new());
        }

        let mut line = Vec::new();
        loop {
            let mut byte = [0; 1];
            match self.system.read(self.fd, &mut byte) {
                Ok(0) => {
                    self.at_eof = true;
                    break;
                }
                Ok(_) => {
                    line.push(byte[0]);
                    if byte[0] == b'\n' {
                        break;
                    }
                }
                // A signal arrived while reading; the pending trap runs at
                // the next safe point, so just retry the read.
                Err(Errno::EINTR) => continue,
                Err(errno) => {
                    return Err(std::io::Error::from_raw_os_error(errno.0));
                }
            }
        }

        String::from_utf8(line).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::VirtualSystem;

    #[test]
    fn reads_lines_one_at_a_time() {
        let mut system = VirtualSystem::new();
        system.set_stdin("one\ntwo\nthree");
        let mut reader = FdReader::new(system, Fd::STDIN);
        let context = Context::default();

        assert_eq!(reader.next_line(&context).unwrap(), "one\n");
        assert_eq!(reader.next_line(&context).unwrap(), "two\n");
        assert_eq!(reader.next_line(&context).unwrap(), "three");
        assert_eq!(reader.next_line(&context).unwrap(), "");
        assert_eq!(reader.next_line(&context).unwrap(), "");
    }

    #[test]
    fn empty_input() {
        let system = VirtualSystem::new();
        let mut reader = FdReader::new(system, Fd::STDIN);
        let context = Context::default();
        assert_eq!(reader.next_line(&context).unwrap(), "");
    }
}
