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

//! Cd built-in
//!
//! The **`cd`** built-in changes the working directory.
//!
//! # Syntax
//!
//! ```sh
//! cd [directory]
//! cd -
//! ```
//!
//! # Semantics
//!
//! Without an operand, the target is `$HOME`. The operand `-` selects
//! `$OLDPWD` and prints the new directory. On success, `PWD` and `OLDPWD`
//! are updated; the export environment cache is patched in place for these
//! two names.

use crate::common::output;
use crate::common::report_error;
use marsh_env::builtin::Result;
use marsh_env::semantics::Field;
use marsh_env::system::System;
use marsh_env::variable;
use marsh_env::variable::Scope;
use marsh_env::Env;
use std::ffi::CString;

/// Entry point for executing the `cd` built-in
pub fn main(env: &mut Env, args: Vec<Field>) -> Result {
    let mut print_new_dir = false;
    let target = match &args[..] {
        [] => match env.variables.get_scalar(variable::HOME) {
            Some(home) => home.to_owned(),
            None => return report_error(env, "HOME is not set"),
        },
        [dir] if dir.value == "-" => match env.variables.get_scalar(variable::OLDPWD) {
            Some(oldpwd) => {
                print_new_dir = true;
                oldpwd.to_owned()
            }
            None => return report_error(env, "OLDPWD is not set"),
        },
        [dir] => dir.value.clone(),
        [_, extra, ..] => {
            return report_error(env, &format!("unexpected operand `{}`", extra.value))
        }
    };

    let old_pwd = env
        .variables
        .get_scalar(variable::PWD)
        .map(str::to_owned)
        .or_else(|| {
            env.system
                .getcwd()
                .ok()
                .map(|path| path.to_string_lossy().into_owned())
        });

    let Ok(c_target) = CString::new(target.clone()) else {
        return report_error(env, "invalid directory name");
    };
    if let Err(errno) = env.system.chdir(&c_target) {
        return report_error(env, &format!("{target}: {errno}"));
    }

    let new_pwd = env
        .system
        .getcwd()
        .map(|path| path.to_string_lossy().into_owned())
        .unwrap_or(target);

    if let Some(old_pwd) = old_pwd {
        _ = env
            .variables
            .get_or_new(variable::OLDPWD, Scope::Global)
            .assign(old_pwd, None);
        env.update_export_env_slot(variable::OLDPWD);
    }
    _ = env
        .variables
        .get_or_new(variable::PWD, Scope::Global)
        .assign(new_pwd.clone(), None);
    env.update_export_env_slot(variable::PWD);

    if print_new_dir {
        if let Err(result) = output(env, &format!("{new_pwd}\n")) {
            return result;
        }
    }
    Default::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use marsh_env::semantics::ExitStatus;

    #[test]
    fn changing_directory_updates_pwd() {
        let mut env = Env::new_virtual();
        env.variables
            .get_or_new(variable::PWD, Scope::Global)
            .assign("/", None)
            .unwrap();
        let result = main(&mut env, Field::dummies(["/tmp"]));
        assert_eq!(result.exit_status(), ExitStatus::SUCCESS);
        assert_eq!(env.variables.get_scalar(variable::PWD), Some("/tmp"));
        assert_eq!(env.variables.get_scalar(variable::OLDPWD), Some("/"));
    }

    #[test]
    fn cd_without_operand_uses_home() {
        let mut env = Env::new_virtual();
        env.variables
            .get_or_new(variable::HOME, Scope::Global)
            .assign("/home/user", None)
            .unwrap();
        main(&mut env, vec![]);
        assert_eq!(
            env.variables.get_scalar(variable::PWD),
            Some("/home/user")
        );
    }

    #[test]
    fn cd_minus_returns_to_oldpwd() {
        let mut env = Env::new_virtual();
        env.variables
            .get_or_new(variable::OLDPWD, Scope::Global)
            .assign("/previous", None)
            .unwrap();
        main(&mut env, Field::dummies(["-"]));
        assert_eq!(
            env.variables.get_scalar(variable::PWD),
            Some("/previous")
        );
    }

    #[test]
    fn cd_without_home_fails() {
        let mut env = Env::new_virtual();
        let result = main(&mut env, vec![]);
        assert_eq!(result.exit_status(), ExitStatus::FAILURE);
    }
}
