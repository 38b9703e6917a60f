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

//! Definition of errors returned by the lexer and parser

use crate::source::pretty::Annotation;
use crate::source::pretty::AnnotationType;
use crate::source::pretty::MessageBase;
use crate::source::Location;
use std::borrow::Cow;
use std::rc::Rc;
use thiserror::Error;

/// Types of syntax errors
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[non_exhaustive]
pub enum SyntaxError {
    /// A single quotation lacks a closing `'`.
    #[error("the single quote is not closed")]
    UnclosedSingleQuote {
        /// Location of the opening `'`
        opening_location: Location,
    },
    /// A double quotation lacks a closing `"`.
    #[error("the double quote is not closed")]
    UnclosedDoubleQuote {
        /// Location of the opening `"`
        opening_location: Location,
    },
    /// A dollar-single quotation lacks a closing `'`.
    #[error("the dollar single quote is not closed")]
    UnclosedDollarSingleQuote {
        /// Location of the opening `$'`
        opening_location: Location,
    },
    /// A backquote command substitution lacks a closing `` ` ``.
    #[error("the backquote is not closed")]
    UnclosedBackquote {
        /// Location of the opening backquote
        opening_location: Location,
    },
    /// A command substitution lacks a closing `)`.
    #[error("the command substitution is not closed")]
    UnclosedCommandSubstitution {
        /// Location of the opening `$(`
        opening_location: Location,
    },
    /// A parameter expansion lacks a closing `}`.
    #[error("the parameter expansion is not closed")]
    UnclosedParam {
        /// Location of the opening `${`
        opening_location: Location,
    },
    /// A parameter expansion lacks a name.
    #[error("the parameter name is missing")]
    EmptyParam,
    /// An invalid character follows `:` in a parameter expansion.
    #[error("not a valid parameter expansion modifier")]
    InvalidModifier,
    /// An array subscript lacks a closing `]`.
    #[error("the array index is not closed")]
    UnclosedArrayIndex,
    /// An arithmetic expansion lacks a closing `))`.
    #[error("the arithmetic expansion is not closed")]
    UnclosedArith {
        /// Location of the opening `((`
        opening_location: Location,
    },
    /// A here-document operator is missing its delimiter token.
    #[error("the here-document operator is missing its delimiter")]
    MissingHereDocDelimiter,
    /// A here-document operator is missing its content.
    #[error("content of the here-document is missing")]
    MissingHereDocContent,
    /// A here-document content is not closed by the delimiter.
    #[error("the here-document content is not closed")]
    UnclosedHereDocContent {
        /// Location of the delimiter word of the here-document operator
        redir_op_location: Location,
    },
    /// The file descriptor of a redirection is too large.
    #[error("the file descriptor is too large")]
    FdOutOfRange,
    /// A redirection operator is missing its operand.
    #[error("the redirection operator is missing its operand")]
    MissingRedirOperand,
    /// An array assignment value is not closed by `)`.
    #[error("the array assignment value is not closed")]
    UnclosedArrayValue {
        /// Location of the opening `(`
        opening_location: Location,
    },
    /// A grouping is not closed.
    #[error("the grouping is not closed")]
    UnclosedGrouping {
        /// Location of the opening `{`
        opening_location: Location,
    },
    /// A grouping contains no command.
    #[error("the grouping is missing its content")]
    EmptyGrouping,
    /// A subshell is not closed.
    #[error("the subshell is not closed")]
    UnclosedSubshell {
        /// Location of the opening `(`
        opening_location: Location,
    },
    /// A subshell contains no command.
    #[error("the subshell is missing its content")]
    EmptySubshell,
    /// A `do` clause is not closed.
    #[error("the `do` clause is not closed")]
    UnclosedDoClause {
        /// Location of the opening `do`
        opening_location: Location,
    },
    /// A `do` clause contains no command.
    #[error("the `do` clause is missing its content")]
    EmptyDoClause,
    /// A `for` loop is missing its variable name.
    #[error("the `for` loop is missing its variable name")]
    MissingForName,
    /// A `for` loop variable name is not a valid word.
    #[error("the variable name is not valid")]
    InvalidForName,
    /// A value of a `for` loop is not a valid word.
    #[error("the operand is not a valid word")]
    InvalidForValue,
    /// A `for` loop is missing its `do` clause.
    #[error("the `for` loop is missing its `do` clause")]
    MissingForBody {
        /// Location of the `for` keyword
        opening_location: Location,
    },
    /// An arithmetic `for` loop is missing `((` after `for`.
    #[error("the arithmetic `for` loop is missing its expressions")]
    InvalidArithFor,
    /// A `while` loop is missing its `do` clause.
    #[error("the `while` loop is missing its `do` clause")]
    UnclosedWhileClause {
        /// Location of the `while` keyword
        opening_location: Location,
    },
    /// An `until` loop is missing its `do` clause.
    #[error("the `until` loop is missing its `do` clause")]
    UnclosedUntilClause {
        /// Location of the `until` keyword
        opening_location: Location,
    },
    /// An `if` command is missing its `then` clause.
    #[error("the `if` command is missing its `then` clause")]
    IfMissingThen {
        /// Location of the `if` keyword
        if_location: Location,
    },
    /// An `if` command is missing its `fi`.
    #[error("the `if` command is not closed")]
    UnclosedIf {
        /// Location of the `if` keyword
        if_location: Location,
    },
    /// An `elif` clause is missing its `then` clause.
    #[error("the `elif` clause is missing its `then` clause")]
    ElifMissingThen {
        /// Location of the `elif` keyword
        elif_location: Location,
    },
    /// A `case` command is missing its subject word.
    #[error("the `case` command is missing its subject")]
    MissingCaseSubject,
    /// A `case` command subject is not a valid word.
    #[error("the `case` command subject is not a valid word")]
    InvalidCaseSubject,
    /// A `case` command is missing the `in` keyword.
    #[error("the `case` command is missing `in`")]
    MissingIn {
        /// Location of the `case` keyword
        opening_location: Location,
    },
    /// A `case` command is not closed by `esac`.
    #[error("the `case` command is not closed")]
    UnclosedCase {
        /// Location of the `case` keyword
        opening_location: Location,
    },
    /// A pattern list of a `case` item is not closed by `)`.
    #[error("the pattern list is not properly closed by a `)`")]
    UnclosedPatternList,
    /// A pattern is missing in a `case` item.
    #[error("a pattern is missing in the `case` command")]
    MissingPattern,
    /// A pattern is not a valid word token.
    #[error("the pattern is not a valid word token")]
    InvalidPattern,
    /// The first pattern of a `case` item is `esac`.
    #[error("`esac` cannot be used as a pattern in this position")]
    EsacAsPattern,
    /// A conditional expression (`[[ ... ]]`) is not closed.
    #[error("the conditional expression is not closed")]
    UnclosedCond {
        /// Location of the opening `[[`
        opening_location: Location,
    },
    /// A conditional expression contains an unexpected token.
    #[error("invalid conditional expression")]
    InvalidCond,
    /// A `(` token is not matched by a `)`.
    #[error("unmatched parenthesis")]
    UnmatchedParenthesis,
    /// A `coproc` keyword is missing its command.
    #[error("the coprocess command is missing")]
    MissingCoprocCommand,
    /// A function definition is missing its body.
    #[error("the function body is missing")]
    MissingFunctionBody,
    /// A function body is not a compound command.
    #[error("the function body must be a compound command")]
    InvalidFunctionBody,
    /// An unquoted token is missing after `!`.
    #[error("a command is missing after `!`")]
    MissingCommandAfterBang,
    /// A command is missing after `|`.
    #[error("a command is missing after `|`")]
    MissingCommandAfterBar,
    /// A command is missing after `&&` or `||`.
    #[error("a command is missing after the operator")]
    MissingCommandAfterOperator,
    /// A `!` appears after another `!`.
    #[error("a double negation is not allowed")]
    DoubleNegation,
    /// A redundant token is found where a separator or end of input is
    /// expected.
    #[error("the command is not properly separated")]
    MissingSeparator,
    /// The `in` keyword is expected but something else is found.
    #[error("an unexpected token is found where `in` is expected")]
    InvalidIn,
}

/// Types of errors that may happen in parsing
#[derive(Clone, Debug, Error)]
pub enum ErrorCause {
    /// Error in an underlying input function
    #[error("cannot read commands: {0}")]
    Io(#[from] Rc<std::io::Error>),
    /// Syntax error
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
}

impl PartialEq for ErrorCause {
    fn eq(&self, other: &ErrorCause) -> bool {
        match (self, other) {
            (ErrorCause::Io(e1), ErrorCause::Io(e2)) => e1.kind() == e2.kind(),
            (ErrorCause::Syntax(e1), ErrorCause::Syntax(e2)) => e1 == e2,
            _ => false,
        }
    }
}

impl Eq for ErrorCause {}

impl From<std::io::Error> for ErrorCause {
    fn from(error: std::io::Error) -> ErrorCause {
        ErrorCause::Io(Rc::new(error))
    }
}

/// Explanation of a failure in parsing
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("{cause}")]
pub struct Error {
    pub cause: ErrorCause,
    pub location: Location,
}

impl MessageBase for Error {
    fn message_title(&self) -> Cow<str> {
        "syntax error".into()
    }

    fn main_annotation(&self) -> Annotation<'_> {
        Annotation::new(
            AnnotationType::Error,
            self.cause.to_string().into(),
            &self.location,
        )
    }

    fn additional_annotations<'a, T: Extend<Annotation<'a>>>(&'a self, results: &mut T) {
        use SyntaxError::*;
        let (label, location): (Cow<str>, &Location) = match &self.cause {
            ErrorCause::Io(_) => return,
            ErrorCause::Syntax(e) => match e {
                UnclosedSingleQuote { opening_location }
                | UnclosedDoubleQuote { opening_location }
                | UnclosedDollarSingleQuote { opening_location }
                | UnclosedBackquote { opening_location }
                | UnclosedCommandSubstitution { opening_location }
                | UnclosedParam { opening_location }
                | UnclosedArith { opening_location }
                | UnclosedArrayValue { opening_location }
                | UnclosedGrouping { opening_location }
                | UnclosedSubshell { opening_location }
                | UnclosedDoClause { opening_location }
                | MissingForBody { opening_location }
                | UnclosedWhileClause { opening_location }
                | UnclosedUntilClause { opening_location }
                | MissingIn { opening_location }
                | UnclosedCase { opening_location }
                | UnclosedCond { opening_location } => {
                    ("the construct started here".into(), opening_location)
                }
                UnclosedHereDocContent { redir_op_location } => (
                    "the here-document delimiter was specified here".into(),
                    redir_op_location,
                ),
                IfMissingThen { if_location } | UnclosedIf { if_location } => {
                    ("the `if` command started here".into(), if_location)
                }
                ElifMissingThen { elif_location } => {
                    ("the `elif` clause started here".into(), elif_location)
                }
                _ => return,
            },
        };
        results.extend([Annotation::new(AnnotationType::Info, label, location)]);
    }
}

/// Entire result of parsing
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_cause_equality() {
        let e1 = ErrorCause::from(SyntaxError::EmptyParam);
        let e2 = ErrorCause::from(SyntaxError::EmptyParam);
        assert_eq!(e1, e2);

        let io1 = ErrorCause::from(std::io::Error::from(std::io::ErrorKind::NotFound));
        let io2 = ErrorCause::from(std::io::Error::from(std::io::ErrorKind::NotFound));
        assert_eq!(io1, io2);
        assert_ne!(io1, e1);
    }

    #[test]
    fn error_display() {
        let error = Error {
            cause: SyntaxError::EmptyParam.into(),
            location: Location::dummy("${}"),
        };
        assert_eq!(error.to_string(), "the parameter name is missing");
    }
}
