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

//! Trap conditions

use crate::signal;
use std::fmt;

/// Condition under which a trap action is executed
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Condition {
    /// When the shell exits
    Exit,
    /// When a command returns a non-zero exit status
    Err,
    /// Before every simple command
    Debug,
    /// When a function or sourced script returns
    Return,
    /// When the signal is delivered to the shell
    Signal(signal::Number),
}

impl Condition {
    /// Returns the name of a pseudo-signal condition, if this is one.
    #[must_use]
    pub fn pseudo_signal_name(&self) -> Option<&'static str> {
        match self {
            Condition::Exit => Some("EXIT"),
            Condition::Err => Some("ERR"),
            Condition::Debug => Some("DEBUG"),
            Condition::Return => Some("RETURN"),
            Condition::Signal(_) => None,
        }
    }
}

impl From<signal::Number> for Condition {
    fn from(number: signal::Number) -> Condition {
        Condition::Signal(number)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Signal(number) => number.fmt(f),
            _ => self.pseudo_signal_name().unwrap().fmt(f),
        }
    }
}
