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

//! Return built-in
//!
//! The **`return`** built-in returns from a function or a sourced script.
//!
//! # Syntax
//!
//! ```sh
//! return [n]
//! ```
//!
//! # Semantics
//!
//! The return divert unwinds to the nearest enclosing function call or
//! sourced-script boundary, where the exit status becomes *n* (or the
//! current `$?` if omitted). Using `return` outside any function or sourced
//! script is an error.

use crate::common::report_error;
use marsh_env::builtin::Result;
use marsh_env::semantics::Divert;
use marsh_env::semantics::ExitStatus;
use marsh_env::semantics::Field;
use marsh_env::stack::Frame;
use marsh_env::Env;
use std::ops::ControlFlow::Break;

/// Entry point for executing the `return` built-in
pub fn main(env: &mut Env, args: Vec<Field>) -> Result {
    let exit_status = match &args[..] {
        [] => None,
        [status] => match status.value.parse() {
            Ok(status) => Some(ExitStatus(status)),
            Err(_) => {
                return report_error(env, &format!("{}: not a valid exit status", status.value))
            }
        },
        [_, extra, ..] => {
            return report_error(env, &format!("unexpected operand `{}`", extra.value))
        }
    };

    let in_returnable_context = env
        .stack
        .iter()
        .any(|frame| matches!(frame, Frame::Function { .. } | Frame::DotScript));
    if !in_returnable_context {
        return report_error(env, "not in a function or sourced script");
    }

    Result::with_exit_status_and_divert(
        exit_status.unwrap_or(env.exit_status),
        Break(Divert::Return(exit_status)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn return_in_function_diverts() {
        let mut env = Env::new_virtual();
        let env = &mut env.push_frame(Frame::Function {
            name: Field::dummy("f"),
        });
        let result = main(env, Field::dummies(["42"]));
        assert_eq!(
            result.divert(),
            Break(Divert::Return(Some(ExitStatus(42))))
        );
    }

    #[test]
    fn return_without_operand_keeps_exit_status() {
        let mut env = Env::new_virtual();
        env.exit_status = ExitStatus(7);
        let env = &mut env.push_frame(Frame::DotScript);
        let result = main(env, vec![]);
        assert_eq!(result.exit_status(), ExitStatus(7));
        assert_eq!(result.divert(), Break(Divert::Return(None)));
    }

    #[test]
    fn return_at_top_level_is_an_error() {
        let mut env = Env::new_virtual();
        let result = main(&mut env, vec![]);
        assert_eq!(result.exit_status(), ExitStatus::FAILURE);
    }
}
