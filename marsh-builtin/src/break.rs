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

//! Break built-in
//!
//! The **`break`** built-in terminates the execution of a loop.
//!
//! # Syntax
//!
//! ```sh
//! break [n]
//! ```
//!
//! # Semantics
//!
//! `break n` quits the execution of the *n*th innermost `for`, `while`, or
//! `until` loop. The specified loop must lexically enclose the break
//! command. It is an error if there is no enclosing loop. If *n* is greater
//! than the number of enclosing loops, the built-in exits the outermost one;
//! the break never propagates past a function call or subshell boundary.
//!
//! # Implementation notes
//!
//! A successful invocation returns a result whose divert is
//! `Break(Divert::Break { count: n - 1 })`. Each enclosing loop decrements
//! the count until the target loop handles it.

use crate::common::report_error;
use marsh_env::builtin::Result;
use marsh_env::semantics::Divert;
use marsh_env::semantics::ExitStatus;
use marsh_env::semantics::Field;
use marsh_env::Env;
use std::ops::ControlFlow::Break;

/// Parses the operand of the break and continue built-ins.
pub(crate) fn parse_count(args: &[Field]) -> std::result::Result<usize, String> {
    match args {
        [] => Ok(1),
        [count] => match count.value.parse() {
            Ok(0) => Err(format!("{}: count must be positive", count.value)),
            Ok(count) => Ok(count),
            Err(_) => Err(format!("{}: not a positive integer", count.value)),
        },
        [_, extra, ..] => Err(format!("unexpected operand `{}`", extra.value)),
    }
}

/// Entry point for executing the `break` built-in
pub fn main(env: &mut Env, args: Vec<Field>) -> Result {
    let count = match parse_count(&args) {
        Ok(count) => count,
        Err(message) => return report_error(env, &message),
    };

    let max = env.stack.loop_count(count);
    if max == 0 {
        return report_error(env, "not in a loop");
    }
    // Break the outermost loop when the count exceeds the nest level.
    let count = count.min(max);

    Result::with_exit_status_and_divert(
        ExitStatus::SUCCESS,
        Break(Divert::Break { count: count - 1 }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_parsing() {
        assert_eq!(parse_count(&[]), Ok(1));
        assert_eq!(parse_count(&Field::dummies(["3"])), Ok(3));
        assert!(parse_count(&Field::dummies(["0"])).is_err());
        assert!(parse_count(&Field::dummies(["x"])).is_err());
        assert!(parse_count(&Field::dummies(["1", "2"])).is_err());
    }

    #[test]
    fn break_outside_loop_is_an_error() {
        let mut env = Env::new_virtual();
        let result = main(&mut env, vec![]);
        assert_eq!(result.exit_status(), ExitStatus::FAILURE);
    }

    #[test]
    fn break_in_loop_diverts() {
        let mut env = Env::new_virtual();
        let env = &mut env.push_frame(marsh_env::stack::Frame::Loop);
        let result = main(env, vec![]);
        assert_eq!(result.divert(), Break(Divert::Break { count: 0 }));
    }

    #[test]
    fn break_count_is_clamped_to_nest_level() {
        let mut env = Env::new_virtual();
        let mut env = env.push_frame(marsh_env::stack::Frame::Loop);
        let env = &mut env.push_frame(marsh_env::stack::Frame::Loop);
        let result = main(env, Field::dummies(["10"]));
        assert_eq!(result.divert(), Break(Divert::Break { count: 1 }));
    }
}
