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

//! Assignment semantics
//!
//! This module implements the execution of [assignment](Assign) words in
//! simple commands: the value is expanded to a single field (or an array),
//! namerefs are resolved, the integer and case-transformation attributes are
//! applied, and the special-name assignment hooks run afterwards.

use crate::expansion;
use crate::expansion::expand_text;
use crate::expansion::expand_value;
use crate::expansion::eval_arith;
use marsh_env::semantics::ExitStatus;
use marsh_env::variable::NamerefResolution;
use marsh_env::variable::Scope;
use marsh_env::variable::Value;
use marsh_env::Env;
use marsh_syntax::source::Location;
use marsh_syntax::source::pretty::{Annotation, AnnotationType, MessageBase};
use marsh_syntax::syntax::Assign;
use std::borrow::Cow;
use thiserror::Error;

/// Types of errors that may occur in assignments
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum ErrorCause {
    /// Expansion error in the value
    #[error(transparent)]
    Expansion(#[from] expansion::ErrorCause),

    /// Assignment to a read-only variable
    #[error("cannot assign to read-only variable `{name}`")]
    ReadOnly {
        /// Variable name
        name: String,
    },

    /// Array element assignment with an invalid subscript
    #[error("invalid array index")]
    InvalidIndex,

    /// Subscript assignment to a scalar variable
    #[error("cannot index a scalar variable")]
    NotAnArray,
}

/// Explanation of an assignment failure
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("{cause}")]
pub struct Error {
    pub cause: ErrorCause,
    pub location: Location,
}

impl From<expansion::Error> for Error {
    fn from(error: expansion::Error) -> Error {
        Error {
            cause: ErrorCause::Expansion(error.cause),
            location: error.location,
        }
    }
}

impl MessageBase for Error {
    fn message_title(&self) -> Cow<str> {
        "error in an assignment".into()
    }

    fn main_annotation(&self) -> Annotation<'_> {
        Annotation::new(
            AnnotationType::Error,
            self.cause.to_string().into(),
            &self.location,
        )
    }
}

/// Result of assignment
pub type Result<T = ()> = std::result::Result<T, Error>;

impl crate::Handle for Error {
    /// Prints the error message and sets the exit status to 1.
    fn handle(&self, env: &mut Env) -> crate::Result {
        env.print_message(self);
        env.exit_status = ExitStatus::FAILURE;
        std::ops::ControlFlow::Continue(())
    }
}

/// Performs an assignment.
///
/// The variable is created or updated in the given scope. The result is the
/// exit status of the last command substitution performed in the value, if
/// any.
pub fn perform_assignment(
    env: &mut Env,
    assign: &Assign,
    scope: Scope,
    export: bool,
) -> Result<Option<ExitStatus>> {
    let name = match env.variables.resolve_nameref(&assign.name) {
        NamerefResolution::Resolved(name) => name.into_owned(),
        NamerefResolution::OverBound(name) => {
            let name = name.into_owned();
            env.print_error(&format!("warning: {name}: circular name reference"));
            name
        }
    };

    let (value, exit_status) = expand_value(env, &assign.value)?;

    // Evaluate the index, if any, before looking up the variable.
    let index = match &assign.index {
        None => None,
        Some(text) => Some(expand_text(env, text)?.0),
    };

    // The integer attribute evaluates scalar values as arithmetic.
    let is_integer = env
        .variables
        .get(name.as_str())
        .is_some_and(|variable| variable.is_integer);
    let value = if is_integer {
        match value {
            Value::Scalar(expression) => {
                let result = eval_arith(env, &expression, &assign.location)?;
                Value::Scalar(result.to_string())
            }
            value => value,
        }
    } else {
        value
    };

    let location = assign.location.clone();
    let mut variable = env.get_or_create_variable(name.clone(), scope);

    let new_value = match index {
        None => {
            if assign.append {
                match (variable.value.clone(), value) {
                    (Some(Value::Scalar(mut old)), Value::Scalar(new)) => {
                        old.push_str(&new);
                        Value::Scalar(old)
                    }
                    (Some(Value::Indexed(mut old)), Value::Indexed(new)) => {
                        let mut next = old.keys().next_back().map_or(0, |&last| last + 1);
                        for (_, element) in new {
                            old.insert(next, element);
                            next += 1;
                        }
                        Value::Indexed(old)
                    }
                    (None, new) => new,
                    (Some(old), Value::Scalar(new)) => {
                        // Appending a scalar to an array appends to the
                        // first element.
                        let mut old = old;
                        match &mut old {
                            Value::Indexed(values) => {
                                values.entry(0).or_default().push_str(&new);
                            }
                            Value::Assoc(values) => {
                                values
                                    .entry("0".to_owned())
                                    .or_default()
                                    .push_str(&new);
                            }
                            Value::Scalar(_) => unreachable!(),
                        }
                        old
                    }
                    (Some(_), new) => new,
                }
            } else {
                value
            }
        }
        Some(index) => {
            let element = match value {
                Value::Scalar(value) => value,
                Value::Indexed(_) | Value::Assoc(_) => {
                    return Err(Error {
                        cause: ErrorCause::InvalidIndex,
                        location,
                    })
                }
            };

            let mut current = match variable.value.clone() {
                None => Value::Indexed(Default::default()),
                Some(value @ (Value::Indexed(_) | Value::Assoc(_))) => value,
                Some(Value::Scalar(old)) => {
                    // Subscript assignment to a scalar makes it an indexed
                    // array with the old value at index 0.
                    let mut values = std::collections::BTreeMap::new();
                    values.insert(0, old);
                    Value::Indexed(values)
                }
            };

            match &mut current {
                Value::Indexed(values) => {
                    drop(variable);
                    let index = eval_arith(env, &index, &location).map_err(|_| Error {
                        cause: ErrorCause::InvalidIndex,
                        location: location.clone(),
                    })?;
                    let index = u64::try_from(index).map_err(|_| Error {
                        cause: ErrorCause::InvalidIndex,
                        location: location.clone(),
                    })?;
                    match values.get_mut(&index) {
                        Some(slot) if assign.append => slot.push_str(&element),
                        _ => {
                            values.insert(index, element);
                        }
                    }
                    variable = env.get_or_create_variable(name.clone(), scope);
                }
                Value::Assoc(values) => {
                    match values.get_mut(&index) {
                        Some(slot) if assign.append => slot.push_str(&element),
                        _ => {
                            values.insert(index, element);
                        }
                    }
                }
                Value::Scalar(_) => unreachable!(),
            }
            current
        }
    };

    match variable.assign(new_value, location.clone()) {
        Ok(_) => (),
        Err(_) => {
            return Err(Error {
                cause: ErrorCause::ReadOnly { name },
                location,
            })
        }
    }
    if export {
        variable.export(true);
    }
    drop(variable);

    env.notify_assignment(&name);
    Ok(exit_status)
}

/// Performs assignments, returning the last command substitution status.
pub fn perform_assignments(
    env: &mut Env,
    assigns: &[Assign],
    scope: Scope,
    export: bool,
) -> Result<Option<ExitStatus>> {
    let mut exit_status = None;
    for assign in assigns {
        let new_status = perform_assignment(env, assign, scope, export)?;
        exit_status = new_status.or(exit_status);
    }
    Ok(exit_status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use marsh_syntax::syntax::SimpleCommand;

    fn assigns_of(command: &str) -> Vec<Assign> {
        let command: SimpleCommand = {
            let parsed: marsh_syntax::syntax::Command = command.parse().unwrap();
            match parsed {
                marsh_syntax::syntax::Command::Simple(simple) => simple,
                other => panic!("not a simple command: {other:?}"),
            }
        };
        command.assigns
    }

    #[test]
    fn scalar_assignment() {
        let mut env = Env::new_virtual();
        let assigns = assigns_of("x=value");
        perform_assignments(&mut env, &assigns, Scope::Global, false).unwrap();
        assert_eq!(env.variables.get_scalar("x"), Some("value"));
    }

    #[test]
    fn append_assignment() {
        let mut env = Env::new_virtual();
        let assigns = assigns_of("x=abc");
        perform_assignments(&mut env, &assigns, Scope::Global, false).unwrap();
        let assigns = assigns_of("x+=def");
        perform_assignments(&mut env, &assigns, Scope::Global, false).unwrap();
        assert_eq!(env.variables.get_scalar("x"), Some("abcdef"));
    }

    #[test]
    fn array_assignment() {
        let mut env = Env::new_virtual();
        let assigns = assigns_of("a=(1 2 3)");
        perform_assignments(&mut env, &assigns, Scope::Global, false).unwrap();
        assert_eq!(
            env.variables.get("a").unwrap().value,
            Some(Value::array(["1", "2", "3"]))
        );
    }

    #[test]
    fn array_element_assignment() {
        let mut env = Env::new_virtual();
        let assigns = assigns_of("a=(x y)");
        perform_assignments(&mut env, &assigns, Scope::Global, false).unwrap();
        let assigns = assigns_of("a[5]=z");
        perform_assignments(&mut env, &assigns, Scope::Global, false).unwrap();
        let Some(Value::Indexed(values)) = &env.variables.get("a").unwrap().value else {
            panic!()
        };
        assert_eq!(values.get(&5).unwrap(), "z");
        assert_eq!(values.len(), 3);
    }

    #[test]
    fn array_append_extends() {
        let mut env = Env::new_virtual();
        let assigns = assigns_of("a=(1 2)");
        perform_assignments(&mut env, &assigns, Scope::Global, false).unwrap();
        let assigns = assigns_of("a+=(3)");
        perform_assignments(&mut env, &assigns, Scope::Global, false).unwrap();
        assert_eq!(
            env.variables.get("a").unwrap().value,
            Some(Value::array(["1", "2", "3"]))
        );
    }

    #[test]
    fn integer_attribute_evaluates_value() {
        let mut env = Env::new_virtual();
        env.variables
            .get_or_new("n", Scope::Global)
            .set_integer(true);
        let assigns = assigns_of("n=1+2");
        perform_assignments(&mut env, &assigns, Scope::Global, false).unwrap();
        assert_eq!(env.variables.get_scalar("n"), Some("3"));
    }

    #[test]
    fn readonly_assignment_fails() {
        let mut env = Env::new_virtual();
        let mut variable = env.variables.get_or_new("r", Scope::Global);
        variable.assign("old", None).unwrap();
        variable.make_read_only(Location::dummy("ro"));

        let assigns = assigns_of("r=new");
        let error = perform_assignments(&mut env, &assigns, Scope::Global, false).unwrap_err();
        assert_eq!(
            error.cause,
            ErrorCause::ReadOnly {
                name: "r".to_owned()
            }
        );
    }

    #[test]
    fn nameref_assignment_goes_to_target() {
        let mut env = Env::new_virtual();
        env.variables
            .get_or_new("v", Scope::Global)
            .assign("hi", None)
            .unwrap();
        let mut r = env.variables.get_or_new("r", Scope::Global);
        r.assign("v", None).unwrap();
        r.set_nameref(true);

        let assigns = assigns_of("r=bye");
        perform_assignments(&mut env, &assigns, Scope::Global, false).unwrap();
        assert_eq!(env.variables.get_scalar("v"), Some("bye"));
        // The nameref itself still points to `v`.
        assert_eq!(env.variables.get_scalar("r"), Some("v"));
    }
}
