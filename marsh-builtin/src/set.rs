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

//! Set built-in
//!
//! The **`set`** built-in modifies shell options and positional parameters.
//!
//! # Syntax
//!
//! ```sh
//! set
//! set [-abCefmnuvx] [+abCefmnuvx] [-o option] [+o option] [--] [operand...]
//! ```
//!
//! # Semantics
//!
//! Without arguments, all variables are printed as assignments that can be
//! sourced back into a shell to reproduce the variable environment. With
//! option arguments, the named options are turned on (`-`) or off (`+`).
//! Remaining operands replace the positional parameters; a lone `--` with
//! no operands clears them.

use crate::common::output;
use crate::common::report_error;
use itertools::Itertools;
use marsh_env::builtin::Result;
use marsh_env::option::{canonicalize, State};
use marsh_env::semantics::Field;
use marsh_env::variable::Scope;
use marsh_env::variable::Value;
use marsh_env::Env;
use marsh_quote::quoted;

/// Prints all variables as reusable assignments.
fn print_variables(env: &mut Env) -> Result {
    let mut lines = Vec::new();
    for (name, variable) in env.variables.iter(Scope::Global) {
        if !marsh_env::variable::is_valid_name(name) {
            continue;
        }
        match &variable.value {
            Some(Value::Scalar(value)) => {
                lines.push(format!("{name}={}\n", quoted(value)));
            }
            Some(value @ (Value::Indexed(_) | Value::Assoc(_))) => {
                lines.push(format!(
                    "{name}=({})\n",
                    value.iter_values().map(quoted).format(" ")
                ));
            }
            None => (),
        }
    }
    lines.sort();
    let text = lines.concat();
    match output(env, &text) {
        Ok(()) => Default::default(),
        Err(result) => result,
    }
}

/// Entry point for executing the `set` built-in
pub fn main(env: &mut Env, args: Vec<Field>) -> Result {
    if args.is_empty() {
        return print_variables(env);
    }

    let mut args = args.into_iter().peekable();
    let mut set_params = false;

    while let Some(arg) = args.peek() {
        let value = arg.value.clone();
        match value.as_str() {
            "--" => {
                args.next();
                set_params = true;
                break;
            }
            "-o" | "+o" => {
                let state = if value == "-o" { State::On } else { State::Off };
                args.next();
                let Some(name) = args.next() else {
                    return print_options(env, state == State::Off);
                };
                let canonical = canonicalize(&name.value);
                match canonical.parse::<marsh_env::option::Option>() {
                    Ok(option) if option.is_modifiable() => env.options.set(option, state),
                    Ok(_) => {
                        return report_error(
                            env,
                            &format!("{}: option cannot be changed", name.value),
                        )
                    }
                    Err(_) => {
                        return report_error(env, &format!("{}: no such option", name.value))
                    }
                }
            }
            _ if value.len() >= 2 && (value.starts_with('-') || value.starts_with('+')) => {
                let enable = value.starts_with('-');
                for letter in value[1..].chars() {
                    let Some((option, on_state)) = marsh_env::option::Option::from_short_name(letter)
                    else {
                        return report_error(env, &format!("-{letter}: no such option"));
                    };
                    if !option.is_modifiable() {
                        return report_error(
                            env,
                            &format!("-{letter}: option cannot be changed"),
                        );
                    }
                    let state = if enable { on_state } else { !on_state };
                    env.options.set(option, state);
                }
                args.next();
            }
            _ => {
                set_params = true;
                break;
            }
        }
    }

    let operands: Vec<Field> = args.collect();
    if set_params || !operands.is_empty() {
        let params = env.variables.positional_params_mut();
        params.values = operands.iter().map(|field| field.value.clone()).collect();
        params.last_modified_location = operands.first().map(|field| field.origin.clone());
    }

    Default::default()
}

/// Prints the current option settings.
fn print_options(env: &mut Env, reusable: bool) -> Result {
    let mut text = String::new();
    for (option, state) in env.options.iter() {
        if reusable {
            let sign = if state == State::On { "-o" } else { "+o" };
            text.push_str(&format!("set {sign} {option}\n"));
        } else {
            text.push_str(&format!("{option:16}{state}\n"));
        }
    }
    match output(env, &text) {
        Ok(()) => Default::default(),
        Err(result) => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marsh_env::option::{ErrExit, PipeFail};
    use marsh_env::semantics::ExitStatus;
    use marsh_env::system::VirtualSystem;

    #[test]
    fn short_options() {
        let mut env = Env::new_virtual();
        main(&mut env, Field::dummies(["-e"]));
        assert_eq!(env.options.get(ErrExit), State::On);
        main(&mut env, Field::dummies(["+e"]));
        assert_eq!(env.options.get(ErrExit), State::Off);
    }

    #[test]
    fn long_options() {
        let mut env = Env::new_virtual();
        main(&mut env, Field::dummies(["-o", "pipefail"]));
        assert_eq!(env.options.get(PipeFail), State::On);
        main(&mut env, Field::dummies(["+o", "pipefail"]));
        assert_eq!(env.options.get(PipeFail), State::Off);
    }

    #[test]
    fn unknown_option_is_an_error() {
        let mut env = Env::new_virtual();
        let result = main(&mut env, Field::dummies(["-o", "nosuch"]));
        assert_eq!(result.exit_status(), ExitStatus::FAILURE);
    }

    #[test]
    fn setting_positional_parameters() {
        let mut env = Env::new_virtual();
        main(&mut env, Field::dummies(["a", "b", "c"]));
        assert_eq!(env.variables.positional_params().values, ["a", "b", "c"]);

        main(&mut env, Field::dummies(["--"]));
        assert_eq!(
            env.variables.positional_params().values,
            [] as [&str; 0]
        );
    }

    #[test]
    fn options_and_parameters_together() {
        let mut env = Env::new_virtual();
        main(&mut env, Field::dummies(["-e", "--", "-x"]));
        assert_eq!(env.options.get(ErrExit), State::On);
        assert_eq!(env.variables.positional_params().values, ["-x"]);
    }

    #[test]
    fn printing_variables_is_sourceable() {
        let system = VirtualSystem::new();
        let mut env = Env::with_system(Box::new(system.clone()));
        env.variables
            .get_or_new("greeting", Scope::Global)
            .assign("hello world", None)
            .unwrap();
        main(&mut env, vec![]);
        let out = String::from_utf8(system.stdout_content()).unwrap();
        assert!(out.contains("greeting='hello world'\n"), "{out:?}");
    }
}
