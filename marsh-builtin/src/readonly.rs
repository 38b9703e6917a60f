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

//! Readonly built-in
//!
//! The **`readonly`** built-in makes variables read-only.
//!
//! # Syntax
//!
//! ```sh
//! readonly [name[=value]...]
//! readonly -p
//! ```

use crate::common::output;
use crate::common::report_error;
use crate::common::split_assignment;
use marsh_env::builtin::Result;
use marsh_env::semantics::Field;
use marsh_env::variable::is_valid_name;
use marsh_env::variable::Scope;
use marsh_env::variable::Value;
use marsh_env::Env;
use marsh_quote::quoted;

fn print_readonly(env: &mut Env) -> Result {
    let mut lines = Vec::new();
    for (name, variable) in env.variables.iter(Scope::Global) {
        if !variable.is_read_only() || !is_valid_name(name) {
            continue;
        }
        match &variable.value {
            Some(Value::Scalar(value)) => {
                lines.push(format!("readonly {name}={}\n", quoted(value)))
            }
            _ => lines.push(format!("readonly {name}\n")),
        }
    }
    lines.sort();
    let text = lines.concat();
    match output(env, &text) {
        Ok(()) => Default::default(),
        Err(result) => result,
    }
}

/// Entry point for executing the `readonly` built-in
pub fn main(env: &mut Env, args: Vec<Field>) -> Result {
    let mut operands = &args[..];
    while let [first, rest @ ..] = operands {
        match first.value.as_str() {
            "-p" => return print_readonly(env),
            "--" => {
                operands = rest;
                break;
            }
            _ => break,
        }
    }

    if operands.is_empty() {
        return print_readonly(env);
    }

    for operand in operands {
        let (name, value) = split_assignment(&operand.value);
        if !is_valid_name(name) {
            return report_error(env, &format!("{name}: not a valid name"));
        }
        let name = name.to_owned();
        let mut variable = env.get_or_create_variable(name.clone(), Scope::Global);
        if let Some(value) = value {
            if variable.assign(value.to_owned(), operand.origin.clone()).is_err() {
                drop(variable);
                return report_error(
                    env,
                    &format!("{name}: cannot assign to read-only variable"),
                );
            }
        }
        variable.make_read_only(operand.origin.clone());
        drop(variable);
        env.notify_assignment(&name);
    }
    Default::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use marsh_env::semantics::ExitStatus;

    #[test]
    fn making_a_variable_read_only() {
        let mut env = Env::new_virtual();
        main(&mut env, Field::dummies(["x=1"]));
        let variable = env.variables.get("x").unwrap();
        assert!(variable.is_read_only());
        assert_eq!(variable.value, Some(Value::scalar("1")));
    }

    #[test]
    fn assignment_to_read_only_fails() {
        let mut env = Env::new_virtual();
        main(&mut env, Field::dummies(["x=1"]));
        let result = main(&mut env, Field::dummies(["x=2"]));
        assert_eq!(result.exit_status(), ExitStatus::FAILURE);
        assert_eq!(env.variables.get_scalar("x"), Some("1"));
    }
}
