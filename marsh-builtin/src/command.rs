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

//! Command built-in
//!
//! The **`command`** built-in executes a command, bypassing functions.
//!
//! # Syntax
//!
//! ```sh
//! command [-p] command [argument...]
//! command -v command
//! ```
//!
//! # Semantics
//!
//! The named command is executed as a built-in or external utility;
//! functions are not searched. A special built-in executed this way loses
//! its elevated error semantics. With `-v`, the built-in instead prints how
//! the name would be interpreted.

use crate::common::output;
use crate::common::report_error;
use marsh_env::builtin::Result;
use marsh_env::semantics::ExitStatus;
use marsh_env::semantics::Field;
use marsh_env::stack::Frame;
use marsh_env::Env;
use marsh_semantics::command::start_external;
use marsh_semantics::command_search::search_path;

/// Describes how a name would be interpreted, for the `-v` option.
fn describe(env: &mut Env, name: &str) -> Option<String> {
    if name.contains('/') {
        return Some(name.to_owned());
    }
    if env.builtins.contains_key(name) {
        return Some(name.to_owned());
    }
    if env.functions.get(name).is_some() {
        return Some(name.to_owned());
    }
    if let Some(alias) = marsh_syntax::alias::Glossary::look_up(&env.aliases, name) {
        return Some(format!("alias {name}={}", marsh_quote::quoted(&alias.replacement)));
    }
    search_path(env, name).map(|path| path.to_string_lossy().into_owned())
}

/// Entry point for executing the `command` built-in
pub fn main(env: &mut Env, args: Vec<Field>) -> Result {
    let mut describe_only = false;
    let mut operands = &args[..];
    while let [first, rest @ ..] = operands {
        match first.value.as_str() {
            "-v" | "-V" => describe_only = true,
            // `-p` would use a standard PATH; the default search is used.
            "-p" => (),
            "--" => {
                operands = rest;
                break;
            }
            _ => break,
        }
        operands = rest;
    }

    let [name, command_args @ ..] = operands else {
        return Default::default();
    };

    if describe_only {
        return match describe(env, &name.value) {
            Some(description) => match output(env, &format!("{description}\n")) {
                Ok(()) => Default::default(),
                Err(result) => result,
            },
            None => Result::new(ExitStatus::FAILURE),
        };
    }

    // Execute a built-in, demoted from special semantics.
    if let Some(&builtin) = env.builtins.get(name.value.as_str()) {
        let mut env = env.push_frame(Frame::Builtin {
            name: name.clone(),
            is_special: false,
        });
        return (builtin.execute)(&mut env, command_args.to_vec());
    }

    // Execute an external utility.
    let path = if name.value.contains('/') {
        std::ffi::CString::new(name.value.clone()).ok()
    } else {
        search_path(env, &name.value)
    };
    let Some(path) = path else {
        return report_error(env, &format!("{}: command not found", name.value));
    };

    let mut fields = vec![name.clone()];
    fields.extend(command_args.iter().cloned());
    match start_external(env, path, fields) {
        std::ops::ControlFlow::Continue(()) => Result::new(env.exit_status),
        std::ops::ControlFlow::Break(divert) => {
            Result::with_exit_status_and_divert(env.exit_status, std::ops::ControlFlow::Break(divert))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marsh_env::builtin::{Builtin, Type};

    #[test]
    fn command_runs_builtin_without_special_semantics() {
        fn probe(env: &mut Env, _args: Vec<Field>) -> Result {
            assert!(matches!(
                env.stack.last(),
                Some(Frame::Builtin {
                    is_special: false,
                    ..
                })
            ));
            Result::new(ExitStatus(42))
        }
        let mut env = Env::new_virtual();
        env.builtins.insert("probe", Builtin::new(Type::Special, probe));
        let result = main(&mut env, Field::dummies(["probe"]));
        assert_eq!(result.exit_status(), ExitStatus(42));
    }

    #[test]
    fn command_without_operands_succeeds() {
        let mut env = Env::new_virtual();
        let result = main(&mut env, vec![]);
        assert_eq!(result.exit_status(), ExitStatus::SUCCESS);
    }

    #[test]
    fn describing_a_builtin() {
        use marsh_env::system::VirtualSystem;
        let system = VirtualSystem::new();
        let mut env = Env::with_system(Box::new(system.clone()));
        env.builtins
            .insert("set", Builtin::new(Type::Special, crate::set::main));
        main(&mut env, Field::dummies(["-v", "set"]));
        assert_eq!(system.stdout_content(), b"set\n");
    }

    #[test]
    fn describing_unknown_command_fails() {
        let mut env = Env::new_virtual();
        let result = main(&mut env, Field::dummies(["-v", "nosuch"]));
        assert_eq!(result.exit_status(), ExitStatus::FAILURE);
    }
}
