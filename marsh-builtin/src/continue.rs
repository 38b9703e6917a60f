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

//! Continue built-in
//!
//! The **`continue`** built-in skips to the next iteration of a loop.
//!
//! # Syntax
//!
//! ```sh
//! continue [n]
//! ```
//!
//! # Semantics
//!
//! `continue n` resumes the *n*th innermost enclosing loop with its next
//! iteration. It is an error if there is no enclosing loop. If *n* exceeds
//! the number of enclosing loops, the outermost loop is continued.
//!
//! Part of the implementation is shared with the break built-in.

use crate::common::report_error;
use crate::r#break::parse_count;
use marsh_env::builtin::Result;
use marsh_env::semantics::Divert;
use marsh_env::semantics::ExitStatus;
use marsh_env::semantics::Field;
use marsh_env::Env;
use std::ops::ControlFlow::Break;

/// Entry point for executing the `continue` built-in
pub fn main(env: &mut Env, args: Vec<Field>) -> Result {
    let count = match parse_count(&args) {
        Ok(count) => count,
        Err(message) => return report_error(env, &message),
    };

    let max = env.stack.loop_count(count);
    if max == 0 {
        return report_error(env, "not in a loop");
    }
    let count = count.min(max);

    Result::with_exit_status_and_divert(
        ExitStatus::SUCCESS,
        Break(Divert::Continue { count: count - 1 }),
    )
}
