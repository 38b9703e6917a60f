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

//! Word expansion
//!
//! Word expansion turns [words](Word) into [fields](Field). The expansion
//! proceeds in phases:
//!
//! 1. The _initial expansion_ resolves tilde expansions, parameter
//!    expansions, command substitutions, and arithmetic expansions into
//!    [attributed characters](attr::AttrChar) that remember their origin and
//!    quotation.
//! 2. _Field splitting_ splits the result at unquoted `$IFS` characters that
//!    came from an expansion.
//! 3. _Pathname expansion_ matches unquoted patterns against the file
//!    system (when globbing is enabled).
//! 4. _Quote removal_ drops the quotation marks.
//!
//! [`expand_words`] performs all phases and is used for command words.
//! [`expand_word`] expands to a single field, skipping splitting and
//! globbing, as is done for assignment values and redirection operands.
//! [`expand_text`] expands a [`Text`], as is done for here-document
//! contents.

use crate::Handle;
use marsh_env::semantics::ExitStatus;
use marsh_env::semantics::Field;
use marsh_env::system::Errno;
use marsh_env::Env;
use marsh_syntax::source::pretty::Annotation;
use marsh_syntax::source::pretty::AnnotationType;
use marsh_syntax::source::pretty::MessageBase;
use marsh_syntax::source::Location;
use marsh_syntax::syntax::Text;
use marsh_syntax::syntax::Word;
use std::borrow::Cow;
use std::ops::ControlFlow::{Break, Continue};
use thiserror::Error;

pub mod attr;
mod glob;
mod initial;
mod quote_removal;
mod split;

use self::attr::AttrChar;

/// Types of errors that may occur in the word expansion
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum ErrorCause {
    /// Expansion of an unset parameter with the `Unset` option off
    #[error("unset parameter")]
    UnsetParameter {
        /// Parameter name
        name: String,
    },

    /// Expansion of an unset or empty parameter with a `?` switch
    #[error("{message}")]
    VacantExpansion {
        /// Parameter name
        name: String,
        /// Message configured in the switch, or the default message
        message: String,
    },

    /// Error in an arithmetic expansion
    #[error("arithmetic error: {0}")]
    Arith(#[from] marsh_arith::Error),

    /// Error setting up a command substitution
    #[error("cannot perform the command substitution: {0}")]
    CommandSubst(Errno),

    /// Assignment to a parameter that cannot be assigned (`${1:=x}`)
    #[error("cannot assign to this parameter")]
    NonassignableParameter {
        /// Parameter name
        name: String,
    },

    /// Assignment to a read-only variable in a `=` switch
    #[error("cannot assign to read-only variable `{name}`")]
    ReadOnlyVariable {
        /// Variable name
        name: String,
    },

    /// Invalid array subscript
    #[error("invalid array index")]
    InvalidIndex,

    /// Pattern that cannot be compiled
    #[error("invalid pattern")]
    InvalidPattern,
}

/// Explanation of an expansion failure
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("{cause}")]
pub struct Error {
    pub cause: ErrorCause,
    pub location: Location,
}

impl MessageBase for Error {
    fn message_title(&self) -> Cow<str> {
        "error expanding a word".into()
    }

    fn main_annotation(&self) -> Annotation<'_> {
        Annotation::new(
            AnnotationType::Error,
            self.cause.to_string().into(),
            &self.location,
        )
    }
}

/// Result of word expansion
pub type Result<T> = std::result::Result<T, Error>;

impl Handle for Error {
    /// Prints the error message and sets the exit status.
    ///
    /// An expansion error interrupts the current command with exit status 2,
    /// per the error taxonomy: local recovery at the executor loop unless
    /// the shell is non-interactive, in which case the interrupt unwinds to
    /// the top level.
    fn handle(&self, env: &mut Env) -> crate::Result {
        env.print_message(self);
        env.exit_status = ExitStatus::ERROR;
        if env.is_interactive() {
            Break(marsh_env::semantics::Divert::Interrupt(None))
        } else {
            Break(marsh_env::semantics::Divert::Exit(None))
        }
    }
}

/// Environment adapter for the arithmetic evaluator
struct ArithEnv<'a> {
    env: &'a mut Env,
    location: &'a Location,
}

impl marsh_arith::Env for ArithEnv<'_> {
    fn get_variable(&self, name: &str) -> Option<String> {
        use marsh_env::variable::NamerefResolution::*;
        let name = match self.env.variables.resolve_nameref(name) {
            Resolved(name) | OverBound(name) => name.into_owned(),
        };
        let variable = self.env.variables.get(name.as_str())?;
        let context = self.env.quirk_context();
        match variable.expand(self.location, &context) {
            marsh_env::variable::Expansion::Unset => None,
            marsh_env::variable::Expansion::Scalar(value) => Some(value.into_owned()),
            marsh_env::variable::Expansion::Array(values) => values.first().cloned(),
        }
    }

    fn assign_variable(&mut self, name: &str, value: String) -> std::result::Result<(), String> {
        use marsh_env::variable::NamerefResolution::*;
        let name = match self.env.variables.resolve_nameref(name) {
            Resolved(name) | OverBound(name) => name.into_owned(),
        };
        let mut variable = self
            .env
            .get_or_create_variable(name.clone(), marsh_env::variable::Scope::Global);
        match variable.assign(value, self.location.clone()) {
            Ok(_) => {
                self.env.notify_assignment(&name);
                Ok(())
            }
            Err(error) => Err(error.to_string()),
        }
    }
}

/// Evaluates an arithmetic expression string in the environment.
pub fn eval_arith(env: &mut Env, expression: &str, location: &Location) -> Result<i64> {
    let mut arith_env = ArithEnv { env, location };
    marsh_arith::eval(expression, &mut arith_env).map_err(|error| Error {
        cause: ErrorCause::Arith(error),
        location: location.clone(),
    })
}

/// Expands words to fields, performing all expansion phases.
///
/// The result contains the expanded fields and the exit status of the last
/// command substitution performed, if any.
pub fn expand_words(env: &mut Env, words: &[Word]) -> Result<(Vec<Field>, Option<ExitStatus>)> {
    let mut phrases = Vec::new();
    let mut expander = initial::Expander::new(env);
    for word in words {
        let phrase = expander.expand_word(word)?;
        phrases.push((phrase, word.location.clone()));
    }
    let exit_status = expander.take_last_command_subst_exit_status();
    drop(expander);

    let ifs = env
        .variables
        .get_scalar(marsh_env::variable::IFS)
        .unwrap_or(marsh_env::variable::IFS_INITIAL_VALUE)
        .to_owned();
    let glob_on = env.options.get(marsh_env::option::Glob) == marsh_env::option::State::On;

    let mut result = Vec::new();
    for (phrase, location) in phrases {
        for field in split::split(phrase, &ifs) {
            if glob_on {
                result.extend(glob::glob_field(env, field, location.clone()));
            } else {
                result.push(Field {
                    value: quote_removal::strip(&field),
                    origin: location.clone(),
                });
            }
        }
    }
    Ok((result, exit_status))
}

/// Expands a word to a single field.
///
/// Field splitting and pathname expansion are not performed. If the word
/// expands to more than one field (e.g. `"$@"`), the fields are joined with
/// spaces.
pub fn expand_word(env: &mut Env, word: &Word) -> Result<(Field, Option<ExitStatus>)> {
    let mut expander = initial::Expander::new(env);
    let phrase = expander.expand_word(word)?;
    let exit_status = expander.take_last_command_subst_exit_status();
    let value = join_fields(phrase);
    Ok((
        Field {
            value,
            origin: word.location.clone(),
        },
        exit_status,
    ))
}

/// Expands a text to a string.
///
/// This is used for here-document contents and array subscripts.
pub fn expand_text(env: &mut Env, text: &Text) -> Result<(String, Option<ExitStatus>)> {
    let mut expander = initial::Expander::new(env);
    let mut chars = Vec::new();
    expander.expand_text(text, true, &mut chars)?;
    let exit_status = expander.take_last_command_subst_exit_status();
    Ok((chars.iter().map(|c| c.value).collect(), exit_status))
}

/// Creates an expander for attribute-level expansion.
///
/// This is used by the pattern-matching helpers, which need the character
/// attributes to decide which pattern characters are quoted.
pub(crate) fn attr_expander(env: &mut Env) -> initial::Expander<'_> {
    initial::Expander::new(env)
}

/// Joins the fields of a phrase with spaces, removing quotes.
fn join_fields(phrase: Vec<Vec<AttrChar>>) -> String {
    let mut result = String::new();
    for (i, field) in phrase.iter().enumerate() {
        if i > 0 {
            result.push(' ');
        }
        result.push_str(&quote_removal::strip(field));
    }
    result
}

/// Expands an assignment value.
///
/// A scalar value expands to a single field; an array value expands each
/// word with splitting and globbing like command words.
pub fn expand_value(
    env: &mut Env,
    value: &marsh_syntax::syntax::Value,
) -> Result<(marsh_env::variable::Value, Option<ExitStatus>)> {
    match value {
        marsh_syntax::syntax::Value::Scalar(word) => {
            let (field, exit_status) = expand_word(env, word)?;
            Ok((marsh_env::variable::Value::Scalar(field.value), exit_status))
        }
        marsh_syntax::syntax::Value::Array(words) => {
            let (fields, exit_status) = expand_words(env, words)?;
            Ok((
                marsh_env::variable::Value::array(fields.into_iter().map(|field| field.value)),
                exit_status,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marsh_env::variable::Scope;

    fn word(s: &str) -> Word {
        s.parse().unwrap()
    }

    #[test]
    fn expanding_literals() {
        let mut env = Env::new_virtual();
        let (fields, exit_status) = expand_words(&mut env, &[word("hello")]).unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].value, "hello");
        assert_eq!(exit_status, None);
    }

    #[test]
    fn expanding_parameters() {
        let mut env = Env::new_virtual();
        env.variables
            .get_or_new("x", Scope::Global)
            .assign("value", None)
            .unwrap();
        let (field, _) = expand_word(&mut env, &word("$x")).unwrap();
        assert_eq!(field.value, "value");
    }

    #[test]
    fn field_splitting_of_expansions() {
        let mut env = Env::new_virtual();
        env.variables
            .get_or_new("x", Scope::Global)
            .assign("a b  c", None)
            .unwrap();
        let (fields, _) = expand_words(&mut env, &[word("$x")]).unwrap();
        let values: Vec<_> = fields.iter().map(|f| f.value.as_str()).collect();
        assert_eq!(values, ["a", "b", "c"]);
    }

    #[test]
    fn quoted_expansions_are_not_split() {
        let mut env = Env::new_virtual();
        env.variables
            .get_or_new("x", Scope::Global)
            .assign("a b", None)
            .unwrap();
        let (fields, _) = expand_words(&mut env, &[word("\"$x\"")]).unwrap();
        let values: Vec<_> = fields.iter().map(|f| f.value.as_str()).collect();
        assert_eq!(values, ["a b"]);
    }

    #[test]
    fn literals_are_not_split() {
        let mut env = Env::new_virtual();
        let (fields, _) = expand_words(&mut env, &[word("a\\ b")]).unwrap();
        let values: Vec<_> = fields.iter().map(|f| f.value.as_str()).collect();
        assert_eq!(values, ["a b"]);
    }

    #[test]
    fn arithmetic_expansion() {
        let mut env = Env::new_virtual();
        let (field, _) = expand_word(&mut env, &word("$((2+3))")).unwrap();
        assert_eq!(field.value, "5");
    }

    #[test]
    fn unset_parameter_expands_empty_by_default() {
        let mut env = Env::new_virtual();
        let (field, _) = expand_word(&mut env, &word("$nosuch")).unwrap();
        assert_eq!(field.value, "");
    }

    #[test]
    fn unset_parameter_fails_with_option_off() {
        use marsh_env::option::{State, Unset};
        let mut env = Env::new_virtual();
        env.options.set(Unset, State::Off);
        let error = expand_word(&mut env, &word("$nosuch")).unwrap_err();
        assert_eq!(
            error.cause,
            ErrorCause::UnsetParameter {
                name: "nosuch".to_owned()
            }
        );
    }

    #[test]
    fn expanding_assignment_values() {
        let mut env = Env::new_virtual();
        let value = marsh_syntax::syntax::Value::Scalar(word("a\\ b"));
        let (value, _) = expand_value(&mut env, &value).unwrap();
        assert_eq!(value, marsh_env::variable::Value::scalar("a b"));

        let value = marsh_syntax::syntax::Value::Array(vec![word("x"), word("y")]);
        let (value, _) = expand_value(&mut env, &value).unwrap();
        assert_eq!(value, marsh_env::variable::Value::array(["x", "y"]));
    }
}
