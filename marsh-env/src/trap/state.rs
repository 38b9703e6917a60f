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

//! Trap actions and states

use crate::system::Errno;
use marsh_syntax::source::Location;
use std::rc::Rc;
use thiserror::Error;

/// Action taken when a trap condition occurs
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum Action {
    /// Perform the default action for the condition.
    #[default]
    Default,
    /// Ignore the condition.
    Ignore,
    /// Execute the command string.
    ///
    /// The string is reference-counted so that running the trap does not
    /// clone the command text.
    Command(Rc<str>),
}

/// State of a trap action for one condition
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TrapState {
    /// Action taken when the condition occurs
    pub action: Action,
    /// Location of the simple command that set this trap
    pub origin: Location,
    /// Whether the condition has occurred but the action has not yet run
    pub pending: bool,
}

/// Error setting a trap action
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum SetActionError {
    /// Setting a trap for a signal that was ignored on shell startup
    ///
    /// A non-interactive shell cannot trap such signals.
    #[error("the signal has been ignored since the shell started")]
    InitiallyIgnored,
    /// `SIGKILL` cannot be caught or ignored.
    #[error("SIGKILL cannot be trapped")]
    SIGKILL,
    /// `SIGSTOP` cannot be caught or ignored.
    #[error("SIGSTOP cannot be trapped")]
    SIGSTOP,
    /// Error in the underlying system call
    #[error("{0}")]
    SystemError(Errno),
}

impl From<Errno> for SetActionError {
    fn from(errno: Errno) -> SetActionError {
        SetActionError::SystemError(errno)
    }
}
