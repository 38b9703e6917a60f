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

//! Common helpers for implementing built-ins

use marsh_env::builtin::Result;
use marsh_env::semantics::Divert;
use marsh_env::semantics::ExitStatus;
use marsh_env::stack::Frame;
use marsh_env::system::Fd;
use marsh_env::system::SystemEx;
use marsh_env::Env;
use std::ops::ControlFlow::Break;

/// Writes a string to the standard output.
///
/// On a write error, reports the error and returns a failure result in
/// `Err`.
pub fn output(env: &mut Env, content: &str) -> std::result::Result<(), Result> {
    match env.system.write_all(Fd::STDOUT, content.as_bytes()) {
        Ok(_) => Ok(()),
        Err(errno) => {
            env.print_error(&format!("cannot print to the standard output: {errno}"));
            Err(Result::new(ExitStatus::FAILURE))
        }
    }
}

/// Reports an error message and returns a failure result.
///
/// The message is prefixed with the name of the currently executing
/// built-in, taken from the [stack](Env::stack).
pub fn report_error(env: &mut Env, message: &str) -> Result {
    report_error_with_exit_status(env, message, ExitStatus::FAILURE)
}

/// Reports an error message and returns a result with the given exit
/// status.
pub fn report_error_with_exit_status(
    env: &mut Env,
    message: &str,
    exit_status: ExitStatus,
) -> Result {
    let builtin_name = current_builtin_name(env);
    let message = match &builtin_name {
        Some(name) => format!("{name}: {message}"),
        None => message.to_owned(),
    };
    env.print_error(&message);

    // An error in a special built-in interrupts a non-interactive shell.
    let is_special = matches!(
        env.stack.iter().rev().find(|frame| matches!(frame, Frame::Builtin { .. })),
        Some(Frame::Builtin { is_special: true, .. })
    );
    if is_special && !env.is_interactive() {
        Result::with_exit_status_and_divert(exit_status, Break(Divert::Interrupt(None)))
    } else {
        Result::new(exit_status)
    }
}

/// Returns the name of the currently executing built-in.
#[must_use]
pub fn current_builtin_name(env: &Env) -> Option<String> {
    env.stack.iter().rev().find_map(|frame| match frame {
        Frame::Builtin { name, .. } => Some(name.value.clone()),
        _ => None,
    })
}

/// Splits an operand of the form `name=value`.
///
/// Returns `(name, None)` if the operand has no `=`.
#[must_use]
pub fn split_assignment(operand: &str) -> (&str, Option<&str>) {
    match operand.split_once('=') {
        Some((name, value)) => (name, Some(value)),
        None => (operand, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splitting_assignments() {
        assert_eq!(split_assignment("a=b"), ("a", Some("b")));
        assert_eq!(split_assignment("a="), ("a", Some("")));
        assert_eq!(split_assignment("abc"), ("abc", None));
        assert_eq!(split_assignment("a=b=c"), ("a", Some("b=c")));
    }
}
