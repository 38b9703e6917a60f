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

//! Exec built-in
//!
//! The **`exec`** built-in replaces the shell process with an external
//! utility, or, without operands, makes its redirections permanent in the
//! current shell.
//!
//! # Syntax
//!
//! ```sh
//! exec [command [argument...]]
//! ```
//!
//! # Semantics
//!
//! With operands, the named utility replaces the shell without creating a
//! new process; on failure, a non-interactive shell exits with 127 (not
//! found) or 126 (not executable). Without operands, the built-in succeeds
//! and any redirections applied to it outlive the built-in.

use crate::common::report_error_with_exit_status;
use marsh_env::builtin::Result;
use marsh_env::semantics::Divert;
use marsh_env::semantics::ExitStatus;
use marsh_env::semantics::Field;
use marsh_env::system::Errno;
use marsh_env::system::System;
use marsh_env::Env;
use marsh_semantics::command_search::search_path;
use std::ffi::CString;
use std::ops::ControlFlow::Break;

/// Entry point for executing the `exec` built-in
pub fn main(env: &mut Env, args: Vec<Field>) -> Result {
    if args.is_empty() {
        let mut result = Result::new(ExitStatus::SUCCESS);
        result.retain_redirs();
        return result;
    }

    let name = &args[0].value;
    let path = if name.contains('/') {
        CString::new(name.as_str()).ok()
    } else {
        search_path(env, name)
    };
    let Some(path) = path else {
        let result = report_error_with_exit_status(
            env,
            &format!("{name}: command not found"),
            ExitStatus::NOT_FOUND,
        );
        return exec_failure(env, result);
    };

    let c_args: Vec<CString> = args
        .iter()
        .filter_map(|field| CString::new(field.value.clone()).ok())
        .collect();
    let envs = env.export_env().to_vec();
    let errno = match env.system.execve(&path, &c_args, &envs) {
        Err(errno) => errno,
        Ok(never) => match never {},
    };

    let exit_status = match errno {
        Errno::ENOENT | Errno::ENOTDIR => ExitStatus::NOT_FOUND,
        _ => ExitStatus::NOEXEC,
    };
    let result =
        report_error_with_exit_status(env, &format!("cannot execute {name}: {errno}"), exit_status);
    exec_failure(env, result)
}

/// Makes an exec failure exit a non-interactive shell.
fn exec_failure(env: &mut Env, mut result: Result) -> Result {
    if !env.is_interactive() {
        result.set_divert(Break(Divert::Exit(Some(result.exit_status()))));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exec_without_operands_retains_redirections() {
        let mut env = Env::new_virtual();
        let result = main(&mut env, vec![]);
        assert_eq!(result.exit_status(), ExitStatus::SUCCESS);
        assert!(result.should_retain_redirs());
    }

    #[test]
    fn exec_of_missing_command_exits_noninteractively() {
        let mut env = Env::new_virtual();
        let result = main(&mut env, Field::dummies(["nosuch"]));
        assert_eq!(result.exit_status(), ExitStatus::NOT_FOUND);
        assert_eq!(
            result.divert(),
            Break(Divert::Exit(Some(ExitStatus::NOT_FOUND)))
        );
    }
}
