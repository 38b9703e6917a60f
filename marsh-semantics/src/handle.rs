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

//! Converting errors to diverts

use marsh_env::Env;

/// Error handler
///
/// An implementor of this trait can handle an error that occurred during
/// command execution: typically by printing an error message to the standard
/// error, setting the exit status, and deciding whether the error interrupts
/// the shell.
pub trait Handle {
    /// Handles the error.
    #[must_use = "the result indicates whether the shell should divert"]
    fn handle(&self, env: &mut Env) -> crate::Result;
}
