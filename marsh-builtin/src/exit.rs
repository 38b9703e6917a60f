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

//! Exit built-in
//!
//! The **`exit`** built-in exits the shell.
//!
//! # Syntax
//!
//! ```sh
//! exit [n]
//! ```
//!
//! # Semantics
//!
//! The shell exits with exit status *n*, running the EXIT trap if one is
//! set. Without *n*, the exit status is the current `$?`; inside a trap, it
//! is the value `$?` had when the trap started.

use crate::common::report_error;
use marsh_env::builtin::Result;
use marsh_env::semantics::Divert;
use marsh_env::semantics::ExitStatus;
use marsh_env::semantics::Field;
use marsh_env::Env;
use marsh_semantics::trap::exit_status_before_trap;
use std::ops::ControlFlow::Break;

/// Entry point for executing the `exit` built-in
pub fn main(env: &mut Env, args: Vec<Field>) -> Result {
    let exit_status = match &args[..] {
        [] => None,
        [status] => match status.value.parse() {
            Ok(status) => Some(ExitStatus(status)),
            Err(_) => {
                // POSIX: a non-numeric operand is an error with status 2,
                // and the shell exits anyway.
                let result =
                    report_error(env, &format!("{}: not a valid exit status", status.value));
                return Result::with_exit_status_and_divert(
                    result.exit_status(),
                    Break(Divert::Exit(Some(ExitStatus::ERROR))),
                );
            }
        },
        [_, extra, ..] => {
            return report_error(env, &format!("unexpected operand `{}`", extra.value))
        }
    };

    let exit_status = exit_status.or_else(|| exit_status_before_trap(env));
    Result::with_exit_status_and_divert(
        exit_status.unwrap_or(env.exit_status),
        Break(Divert::Exit(exit_status)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_with_operand() {
        let mut env = Env::new_virtual();
        let result = main(&mut env, Field::dummies(["3"]));
        assert_eq!(result.divert(), Break(Divert::Exit(Some(ExitStatus(3)))));
    }

    #[test]
    fn exit_without_operand_propagates_current_status() {
        let mut env = Env::new_virtual();
        env.exit_status = ExitStatus(5);
        let result = main(&mut env, vec![]);
        assert_eq!(result.exit_status(), ExitStatus(5));
        assert_eq!(result.divert(), Break(Divert::Exit(None)));
    }

    #[test]
    fn exit_in_trap_uses_pre_trap_status() {
        use marsh_env::stack::Frame;
        use marsh_env::trap::Condition;
        let mut env = Env::new_virtual();
        env.exit_status = ExitStatus(0);
        let env = &mut env.push_frame(Frame::Trap {
            condition: Condition::Exit,
            previous_exit_status: ExitStatus(9),
        });
        let result = main(env, vec![]);
        assert_eq!(
            result.divert(),
            Break(Divert::Exit(Some(ExitStatus(9))))
        );
    }
}
