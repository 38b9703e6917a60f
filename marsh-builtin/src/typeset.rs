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

//! Typeset built-in
//!
//! The **`typeset`** built-in, also available as `declare` and `local`,
//! declares variables with attributes.
//!
//! # Syntax
//!
//! ```sh
//! typeset [-gnprxiluaA] [+nxilu] [name[=value]...]
//! typeset -f [-trx] [name...]
//! ```
//!
//! # Options
//!
//! - `-a` declares an indexed array, `-A` an associative array.
//! - `-f` makes the operands name functions rather than variables.
//! - `-i` sets the integer attribute: assigned values are evaluated as
//!   arithmetic expressions.
//! - `-l`/`-u` convert assigned values to lower/upper case.
//! - `-n` makes the variable a name reference; the assigned value must be a
//!   valid variable name.
//! - `-r` makes the variable read-only; `-x` exports it.
//! - `-t` (with `-f`) gives the function the trace attribute, which makes
//!   it inherit the caller's `DEBUG`, `ERR`, and `RETURN` traps.
//! - `-g` forces the global scope even inside a function.
//! - `-p` prints the named variables (or all) with their attributes, in a
//!   form that reproduces them when evaluated.
//! - A `+` prefix clears the corresponding attribute.
//!
//! Invoked as `local`, the built-in requires a function context.
//!
//! # Declaration semantics
//!
//! Inside a function, variables are declared in the local scope unless `-g`
//! is given, matching the behavior of `local`.

use crate::common::output;
use crate::common::report_error;
use crate::common::split_assignment;
use marsh_env::builtin::Result;
use marsh_env::semantics::Field;
use marsh_env::stack::Frame;
use marsh_env::variable::is_valid_name;
use marsh_env::variable::CaseTransform;
use marsh_env::variable::Scope;
use marsh_env::variable::Value;
use marsh_env::variable::Variable;
use marsh_env::Env;
use marsh_quote::quoted;
use marsh_syntax::source::Location;

#[derive(Clone, Copy, Default)]
struct Attributes {
    indexed_array: bool,
    assoc_array: bool,
    functions: bool,
    integer: Option<bool>,
    nameref: Option<bool>,
    read_only: bool,
    export: Option<bool>,
    lower: Option<bool>,
    upper: Option<bool>,
    trace: Option<bool>,
    global: bool,
    print: bool,
}

fn parse_attributes(operands: &mut &[Field]) -> std::result::Result<Attributes, String> {
    let mut attributes = Attributes::default();
    while let [first, rest @ ..] = *operands {
        let value = first.value.as_str();
        let (enable, letters) = if let Some(letters) = value.strip_prefix('-') {
            (true, letters)
        } else if let Some(letters) = value.strip_prefix('+') {
            (false, letters)
        } else {
            break;
        };
        if letters.is_empty() || letters == "-" && !enable {
            break;
        }
        if value == "--" {
            *operands = rest;
            break;
        }
        for letter in letters.chars() {
            match letter {
                'a' => attributes.indexed_array = enable,
                'A' => attributes.assoc_array = enable,
                'f' => attributes.functions = enable,
                'i' => attributes.integer = Some(enable),
                'n' => attributes.nameref = Some(enable),
                'r' => attributes.read_only = enable,
                'x' => attributes.export = Some(enable),
                'l' => attributes.lower = Some(enable),
                'u' => attributes.upper = Some(enable),
                't' => attributes.trace = Some(enable),
                'g' => attributes.global = enable,
                'p' => attributes.print = enable,
                _ => return Err(format!("-{letter}: no such option")),
            }
        }
        *operands = rest;
    }
    Ok(attributes)
}

/// Formats the `declare` option string of a variable.
fn attribute_flags(variable: &Variable) -> String {
    let mut flags = String::new();
    match &variable.value {
        Some(Value::Indexed(_)) => flags.push('a'),
        Some(Value::Assoc(_)) => flags.push('A'),
        _ => (),
    }
    if variable.is_integer {
        flags.push('i');
    }
    if variable.is_nameref {
        flags.push('n');
    }
    if variable.is_read_only() {
        flags.push('r');
    }
    if variable.is_exported {
        flags.push('x');
    }
    match variable.case_transform {
        Some(CaseTransform::Lower) => flags.push('l'),
        Some(CaseTransform::Upper) => flags.push('u'),
        _ => (),
    }
    if flags.is_empty() {
        flags.push('-');
    }
    flags
}

/// Prints one variable in a reusable form.
fn print_variable(name: &str, variable: &Variable) -> String {
    let flags = attribute_flags(variable);
    match &variable.value {
        None => format!("typeset -{flags} {name}\n"),
        Some(Value::Scalar(value)) => {
            format!("typeset -{flags} {name}={}\n", quoted(value))
        }
        Some(Value::Indexed(values)) => {
            let mut elements = String::new();
            for (index, value) in values {
                elements.push_str(&format!("[{index}]={} ", quoted(value)));
            }
            format!("typeset -{flags} {name}=({})\n", elements.trim_end())
        }
        Some(Value::Assoc(values)) => {
            let mut elements = String::new();
            for (key, value) in values {
                elements.push_str(&format!("[{}]={} ", quoted(key), quoted(value)));
            }
            format!("typeset -{flags} {name}=({})\n", elements.trim_end())
        }
    }
}

fn print_variables(env: &mut Env, operands: &[Field]) -> Result {
    let mut lines = Vec::new();
    if operands.is_empty() {
        for (name, variable) in env.variables.iter(Scope::Global) {
            if is_valid_name(name) {
                lines.push(print_variable(name, variable));
            }
        }
        lines.sort();
    } else {
        for operand in operands {
            match env.variables.get(operand.value.as_str()) {
                Some(variable) => lines.push(print_variable(&operand.value, variable)),
                None => {
                    let message = format!("{}: not found", operand.value);
                    return report_error(env, &message);
                }
            }
        }
    }
    let text = lines.concat();
    match output(env, &text) {
        Ok(()) => Default::default(),
        Err(result) => result,
    }
}

/// Executes the typeset built-in with the given scope preference.
fn typeset(env: &mut Env, args: Vec<Field>, force_local: bool) -> Result {
    let mut operands = &args[..];
    let attributes = match parse_attributes(&mut operands) {
        Ok(attributes) => attributes,
        Err(message) => return report_error(env, &message),
    };

    if attributes.functions {
        return typeset_functions(env, operands, &attributes);
    }

    if attributes.print {
        return print_variables(env, operands);
    }

    let in_function = env
        .stack
        .iter()
        .any(|frame| matches!(frame, Frame::Function { .. }));
    if force_local && !in_function {
        return report_error(env, "can only be used in a function");
    }
    let scope = if attributes.global {
        Scope::Global
    } else if in_function {
        Scope::Local
    } else {
        Scope::Global
    };

    if operands.is_empty() && !attributes.print {
        return print_variables(env, operands);
    }

    for operand in operands {
        let (name, value) = split_assignment(&operand.value);
        if !is_valid_name(name) {
            return report_error(env, &format!("{name}: not a valid name"));
        }

        // A nameref target must itself be a valid variable name; in
        // particular, an array element is not a valid nameref target.
        if attributes.nameref == Some(true) {
            if let Some(target) = value {
                if !is_valid_name(target) {
                    return report_error(
                        env,
                        &format!("{target}: not a valid name reference target"),
                    );
                }
                if target == name {
                    return report_error(
                        env,
                        &format!("{name}: name reference cannot refer to itself"),
                    );
                }
            }
        }

        let name = name.to_owned();
        let value = value.map(str::to_owned);
        let origin = operand.origin.clone();

        // The integer attribute evaluates the value as arithmetic.
        let value = match (value, attributes.integer) {
            (Some(value), Some(true)) => match eval_integer(env, &value, &origin) {
                Ok(value) => Some(value),
                Err(message) => return report_error(env, &message),
            },
            (value, _) => value,
        };

        let mut variable = env.get_or_create_variable(name.clone(), scope);

        if let Some(enable) = attributes.integer {
            variable.set_integer(enable);
        }
        if let Some(enable) = attributes.nameref {
            variable.set_nameref(enable);
        }
        if let Some(enable) = attributes.export {
            variable.export(enable);
        }
        if attributes.lower == Some(true) {
            variable.set_case_transform(Some(CaseTransform::Lower));
        } else if attributes.upper == Some(true) {
            variable.set_case_transform(Some(CaseTransform::Upper));
        } else if attributes.lower == Some(false) || attributes.upper == Some(false) {
            variable.set_case_transform(None);
        }

        let assignment = match value {
            Some(value) => Some(Value::Scalar(value)),
            None if attributes.indexed_array && variable.value.is_none() => {
                Some(Value::Indexed(Default::default()))
            }
            None if attributes.assoc_array && variable.value.is_none() => {
                Some(Value::Assoc(Default::default()))
            }
            None => None,
        };
        if let Some(new_value) = assignment {
            if variable.assign(new_value, origin.clone()).is_err() {
                drop(variable);
                return report_error(
                    env,
                    &format!("{name}: cannot assign to read-only variable"),
                );
            }
        }

        // The read-only attribute is set after the assignment so that the
        // assignment itself succeeds.
        if attributes.read_only {
            variable.make_read_only(origin);
        }
        drop(variable);
        env.notify_assignment(&name);
    }
    Default::default()
}

/// Applies attributes to functions (`typeset -f`).
///
/// With `-t`, the named functions are given (or, with `+t`, stripped of)
/// the trace attribute; `-x`/`+x` control the export attribute and `-r`
/// makes the functions read-only. With `-p` or no attribute changes, the
/// function definitions are printed instead.
fn typeset_functions(env: &mut Env, operands: &[Field], attributes: &Attributes) -> Result {
    let print = attributes.print
        || attributes.trace.is_none() && attributes.export.is_none() && !attributes.read_only;

    if print {
        let mut lines = Vec::new();
        if operands.is_empty() {
            for function in env.functions.iter() {
                lines.push(format!("{}() {}\n", function.name, function.body));
            }
            lines.sort();
        } else {
            for operand in operands {
                match env.functions.get(&operand.value) {
                    Some(function) => {
                        lines.push(format!("{}() {}\n", function.name, function.body))
                    }
                    None => {
                        let message = format!("{}: no such function", operand.value);
                        return report_error(env, &message);
                    }
                }
            }
        }
        let text = lines.concat();
        return match output(env, &text) {
            Ok(()) => Default::default(),
            Err(result) => result,
        };
    }

    for operand in operands {
        let Some(function) = env.functions.get(&operand.value) else {
            return report_error(env, &format!("{}: no such function", operand.value));
        };
        let mut function = (**function).clone();
        if let Some(enable) = attributes.trace {
            function.is_traced = enable;
        }
        if let Some(enable) = attributes.export {
            function.is_exported = enable;
        }
        if attributes.read_only {
            function.read_only_location = Some(operand.origin.clone());
        }
        if env.functions.unset(&function.name).is_err() {
            return report_error(
                env,
                &format!("{}: cannot modify read-only function", operand.value),
            );
        }
        _ = env.functions.define(function);
        env.invalidate_export_env();
    }
    Default::default()
}

/// Evaluates the value of an integer-attributed assignment.
fn eval_integer(env: &mut Env, value: &str, origin: &Location) -> std::result::Result<String, String> {
    match marsh_semantics::expansion::eval_arith(env, value, origin) {
        Ok(number) => Ok(number.to_string()),
        Err(error) => Err(error.to_string()),
    }
}

/// Entry point for executing the `typeset` built-in
pub fn main(env: &mut Env, args: Vec<Field>) -> Result {
    typeset(env, args, false)
}

/// Entry point for executing the `local` built-in
pub fn local_main(env: &mut Env, args: Vec<Field>) -> Result {
    typeset(env, args, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use marsh_env::semantics::ExitStatus;
    use marsh_env::variable::Context;

    #[test]
    fn declaring_with_value() {
        let mut env = Env::new_virtual();
        main(&mut env, Field::dummies(["x=1"]));
        assert_eq!(env.variables.get_scalar("x"), Some("1"));
    }

    #[test]
    fn integer_attribute() {
        let mut env = Env::new_virtual();
        main(&mut env, Field::dummies(["-i", "n=2*3"]));
        let variable = env.variables.get("n").unwrap();
        assert!(variable.is_integer);
        assert_eq!(variable.value, Some(Value::scalar("6")));
    }

    #[test]
    fn case_attributes() {
        let mut env = Env::new_virtual();
        main(&mut env, Field::dummies(["-u", "x=abc"]));
        assert_eq!(env.variables.get_scalar("x"), Some("ABC"));

        main(&mut env, Field::dummies(["-l", "y=ABC"]));
        assert_eq!(env.variables.get_scalar("y"), Some("abc"));
    }

    #[test]
    fn nameref_attribute() {
        let mut env = Env::new_virtual();
        main(&mut env, Field::dummies(["-n", "r=target"]));
        let variable = env.variables.get("r").unwrap();
        assert!(variable.is_nameref);
        assert_eq!(variable.value, Some(Value::scalar("target")));
    }

    #[test]
    fn nameref_to_array_element_is_rejected() {
        let mut env = Env::new_virtual();
        let result = main(&mut env, Field::dummies(["-n", "r=a[2]"]));
        assert_eq!(result.exit_status(), ExitStatus::FAILURE);
        assert_eq!(env.variables.get("r"), None);
    }

    #[test]
    fn read_only_attribute() {
        let mut env = Env::new_virtual();
        main(&mut env, Field::dummies(["-r", "x=1"]));
        assert!(env.variables.get("x").unwrap().is_read_only());
    }

    #[test]
    fn array_declaration() {
        let mut env = Env::new_virtual();
        main(&mut env, Field::dummies(["-a", "a"]));
        assert_eq!(
            env.variables.get("a").unwrap().value,
            Some(Value::Indexed(Default::default()))
        );

        main(&mut env, Field::dummies(["-A", "m"]));
        assert_eq!(
            env.variables.get("m").unwrap().value,
            Some(Value::Assoc(Default::default()))
        );
    }

    #[test]
    fn local_requires_function_context() {
        let mut env = Env::new_virtual();
        let result = local_main(&mut env, Field::dummies(["x=1"]));
        assert_eq!(result.exit_status(), ExitStatus::FAILURE);
    }

    #[test]
    fn local_declares_in_function_scope() {
        let mut env = Env::new_virtual();
        env.variables
            .get_or_new("x", Scope::Global)
            .assign("global", None)
            .unwrap();

        {
            let mut env = env.push_context(Context::default());
            let mut env = env.push_frame(Frame::Function {
                name: Field::dummy("f"),
            });
            local_main(&mut env, Field::dummies(["x=local"]));
            assert_eq!(env.variables.get_scalar("x"), Some("local"));
        }
        assert_eq!(env.variables.get_scalar("x"), Some("global"));
    }

    #[test]
    fn function_trace_attribute() {
        use marsh_env::function::Function;
        let mut env = Env::new_virtual();
        let body: marsh_syntax::syntax::FullCompoundCommand = "{ :; }".parse().unwrap();
        env.functions
            .define(Function::new("f", body, Location::dummy("f")))
            .unwrap();

        main(&mut env, Field::dummies(["-ft", "f"]));
        assert!(env.functions.get("f").unwrap().is_traced);

        main(&mut env, Field::dummies(["+t", "-f", "f"]));
        assert!(!env.functions.get("f").unwrap().is_traced);
    }

    #[test]
    fn function_attributes_on_unknown_function_fail() {
        let mut env = Env::new_virtual();
        let result = main(&mut env, Field::dummies(["-ft", "nosuch"]));
        assert_eq!(result.exit_status(), ExitStatus::FAILURE);
    }

    #[test]
    fn printing_variables() {
        use marsh_env::system::VirtualSystem;
        let system = VirtualSystem::new();
        let mut env = Env::with_system(Box::new(system.clone()));
        main(&mut env, Field::dummies(["-i", "n=1"]));
        main(&mut env, Field::dummies(["-p", "n"]));
        let out = String::from_utf8(system.stdout_content()).unwrap();
        assert_eq!(out, "typeset -i n=1\n");
    }
}
