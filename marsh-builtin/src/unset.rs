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

//! Unset built-in
//!
//! The **`unset`** built-in removes variables or functions.
//!
//! # Syntax
//!
//! ```sh
//! unset [-fv] name...
//! ```
//!
//! # Semantics
//!
//! With `-v` (the default), each named variable is unset; it is an error to
//! unset a read-only variable. With `-f`, each named function is unset.
//! Unsetting a name that is not set is not an error.

use crate::common::report_error;
use marsh_env::builtin::Result;
use marsh_env::semantics::Field;
use marsh_env::variable::Scope;
use marsh_env::Env;

/// Entry point for executing the `unset` built-in
pub fn main(env: &mut Env, args: Vec<Field>) -> Result {
    let mut functions = false;
    let mut operands = &args[..];

    while let [first, rest @ ..] = operands {
        match first.value.as_str() {
            "-f" => functions = true,
            "-v" => functions = false,
            "--" => {
                operands = rest;
                break;
            }
            _ => break,
        }
        operands = rest;
    }

    for operand in operands {
        if functions {
            if env.functions.unset(&operand.value).is_err() {
                return report_error(
                    env,
                    &format!("{}: cannot unset read-only function", operand.value),
                );
            }
            env.invalidate_export_env();
        } else {
            let name = operand.value.clone();
            match env.variables.unset(&name, Scope::Global) {
                Ok(_) => (),
                Err(_) => {
                    return report_error(
                        env,
                        &format!("{name}: cannot unset read-only variable"),
                    )
                }
            }
            env.notify_assignment(&name);
        }
    }
    Default::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use marsh_env::semantics::ExitStatus;
    use marsh_syntax::source::Location;

    #[test]
    fn unsetting_a_variable() {
        let mut env = Env::new_virtual();
        env.variables
            .get_or_new("x", Scope::Global)
            .assign("1", None)
            .unwrap();
        let result = main(&mut env, Field::dummies(["x"]));
        assert_eq!(result.exit_status(), ExitStatus::SUCCESS);
        assert_eq!(env.variables.get("x"), None);
    }

    #[test]
    fn unsetting_nonexistent_variable_succeeds() {
        let mut env = Env::new_virtual();
        let result = main(&mut env, Field::dummies(["nosuch"]));
        assert_eq!(result.exit_status(), ExitStatus::SUCCESS);
    }

    #[test]
    fn unsetting_read_only_variable_fails() {
        let mut env = Env::new_virtual();
        let mut variable = env.variables.get_or_new("r", Scope::Global);
        variable.assign("1", None).unwrap();
        variable.make_read_only(Location::dummy("ro"));
        let result = main(&mut env, Field::dummies(["r"]));
        assert_eq!(result.exit_status(), ExitStatus::FAILURE);
        assert!(env.variables.get("r").is_some());
    }

    #[test]
    fn unsetting_a_function() {
        use marsh_env::function::Function;
        let mut env = Env::new_virtual();
        let body: marsh_syntax::syntax::FullCompoundCommand = "{ :; }".parse().unwrap();
        env.functions
            .define(Function::new("f", body, Location::dummy("f")))
            .unwrap();
        main(&mut env, Field::dummies(["-f", "f"]));
        assert_eq!(env.functions.get("f"), None);
    }
}
