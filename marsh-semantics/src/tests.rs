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

//! Stub built-ins for unit tests

use itertools::Itertools;
use marsh_env::builtin::Builtin;
use marsh_env::builtin::Type;
use marsh_env::semantics::Divert;
use marsh_env::semantics::ExitStatus;
use marsh_env::semantics::Field;
use marsh_env::system::Fd;
use marsh_env::system::SystemEx;
use marsh_env::Env;
use std::ops::ControlFlow::Break;

/// Returns a built-in that prints its arguments to the standard output.
pub fn echo_builtin() -> Builtin {
    fn execute(env: &mut Env, args: Vec<Field>) -> marsh_env::builtin::Result {
        let line = format!("{}\n", args.iter().format(" "));
        _ = env.system.write_all(Fd::STDOUT, line.as_bytes());
        Default::default()
    }
    Builtin::new(Type::Mandatory, execute)
}

/// Returns a built-in that mimics the return built-in.
///
/// With `-n`, the built-in sets the exit status without diverting.
pub fn return_builtin() -> Builtin {
    fn execute(_env: &mut Env, args: Vec<Field>) -> marsh_env::builtin::Result {
        let mut args = args.iter().peekable();
        let no_divert = args.next_if(|field| field.value == "-n").is_some();
        let exit_status = args
            .next()
            .and_then(|arg| arg.value.parse().ok())
            .map(ExitStatus);

        if no_divert {
            marsh_env::builtin::Result::new(exit_status.unwrap_or_default())
        } else {
            marsh_env::builtin::Result::with_exit_status_and_divert(
                exit_status.unwrap_or_default(),
                Break(Divert::Return(exit_status)),
            )
        }
    }
    Builtin::new(Type::Special, execute)
}

/// Returns a built-in that mimics the break built-in.
pub fn break_builtin() -> Builtin {
    fn execute(_env: &mut Env, args: Vec<Field>) -> marsh_env::builtin::Result {
        let count: usize = args
            .first()
            .and_then(|arg| arg.value.parse().ok())
            .unwrap_or(1);
        marsh_env::builtin::Result::with_exit_status_and_divert(
            ExitStatus::SUCCESS,
            Break(Divert::Break { count: count - 1 }),
        )
    }
    Builtin::new(Type::Special, execute)
}

/// Returns a built-in that mimics the continue built-in.
pub fn continue_builtin() -> Builtin {
    fn execute(_env: &mut Env, args: Vec<Field>) -> marsh_env::builtin::Result {
        let count: usize = args
            .first()
            .and_then(|arg| arg.value.parse().ok())
            .unwrap_or(1);
        marsh_env::builtin::Result::with_exit_status_and_divert(
            ExitStatus::SUCCESS,
            Break(Divert::Continue { count: count - 1 }),
        )
    }
    Builtin::new(Type::Special, execute)
}
