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

//! Export built-in
//!
//! The **`export`** built-in marks variables for export to the environment
//! of subsequently executed commands.
//!
//! # Syntax
//!
//! ```sh
//! export [-fn] [name[=value]...]
//! export -p
//! ```
//!
//! # Semantics
//!
//! Each operand names a variable to be exported, optionally assigning a
//! value. With `-n`, the export attribute is removed instead. With `-f`,
//! the operands name functions. With `-p` (or no operands), the exported
//! variables are printed in a reusable form.

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

fn print_exports(env: &mut Env) -> Result {
    let mut lines = Vec::new();
    for (name, variable) in env.variables.iter(Scope::Global) {
        if !variable.is_exported || !is_valid_name(name) {
            continue;
        }
        match &variable.value {
            Some(Value::Scalar(value)) => {
                lines.push(format!("export {name}={}\n", quoted(value)))
            }
            _ => lines.push(format!("export {name}\n")),
        }
    }
    lines.sort();
    let text = lines.concat();
    match output(env, &text) {
        Ok(()) => Default::default(),
        Err(result) => result,
    }
}

/// Entry point for executing the `export` built-in
pub fn main(env: &mut Env, args: Vec<Field>) -> Result {
    let mut export = true;
    let mut functions = false;
    let mut operands = &args[..];

    while let [first, rest @ ..] = operands {
        match first.value.as_str() {
            "-p" => return print_exports(env),
            "-n" => export = false,
            "-f" => functions = true,
            "--" => {
                operands = rest;
                break;
            }
            _ => break,
        }
        operands = rest;
    }

    if operands.is_empty() {
        return print_exports(env);
    }

    for operand in operands {
        if functions {
            // Exporting a function toggles its export attribute.
            let Some(function) = env.functions.get(&operand.value) else {
                return report_error(env, &format!("{}: no such function", operand.value));
            };
            let mut function = (**function).clone();
            function.is_exported = export;
            _ = env.functions.unset(&function.name);
            _ = env.functions.define(function);
            env.invalidate_export_env();
            continue;
        }

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
        variable.export(export);
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
    fn exporting_existing_variable() {
        let mut env = Env::new_virtual();
        env.variables
            .get_or_new("x", Scope::Global)
            .assign("1", None)
            .unwrap();
        main(&mut env, Field::dummies(["x"]));
        assert!(env.variables.get("x").unwrap().is_exported);
    }

    #[test]
    fn exporting_with_assignment() {
        let mut env = Env::new_virtual();
        main(&mut env, Field::dummies(["x=value"]));
        let variable = env.variables.get("x").unwrap();
        assert!(variable.is_exported);
        assert_eq!(variable.value, Some(Value::scalar("value")));
    }

    #[test]
    fn unexporting() {
        let mut env = Env::new_virtual();
        main(&mut env, Field::dummies(["x=1"]));
        main(&mut env, Field::dummies(["-n", "x"]));
        assert!(!env.variables.get("x").unwrap().is_exported);
    }

    #[test]
    fn invalid_name_is_an_error() {
        let mut env = Env::new_virtual();
        let result = main(&mut env, Field::dummies(["1bad=x"]));
        assert_eq!(result.exit_status(), ExitStatus::FAILURE);
    }
}
