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

//! This crate implements shell arithmetic, the language of `$((...))`.
//!
//! The [`eval`] function evaluates an expression string and returns the
//! result. Variables are read and written through the [`Env`] trait, which
//! the shell implements on its variable engine.
//!
//! The expression language is the C-like integer arithmetic required by POSIX,
//! extended with the common additions: `++`/`--`, comma, conditional,
//! compound assignment, and the `BASE#VALUE` integer notation. All arithmetic
//! is signed 64-bit with silent wrap-around on overflow. A variable whose
//! value is not a plain number is evaluated recursively as an expression,
//! with a fixed recursion bound.
//!
//! ```
//! # use std::collections::HashMap;
//! let mut env = HashMap::new();
//! assert_eq!(marsh_arith::eval("2 + 3 * 4", &mut env), Ok(14));
//! assert_eq!(marsh_arith::eval("x = 7", &mut env), Ok(7));
//! assert_eq!(env["x"], "7");
//! ```

mod env;
mod eval;
mod token;

pub use env::Env;

use thiserror::Error;

/// Error during evaluation of an arithmetic expression
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    /// Malformed integer constant
    #[error("invalid number `{0}`")]
    InvalidNumber(String),

    /// Character that cannot start a token
    #[error("invalid character `{0}`")]
    InvalidCharacter(char),

    /// Token found where it cannot appear
    #[error("unexpected `{0}`")]
    UnexpectedToken(String),

    /// Expression ended where an operand was expected
    #[error("missing operand")]
    MissingOperand,

    /// `?` without a matching `:`
    #[error("`?` without matching `:`")]
    MissingColon,

    /// `(` without a matching `)`
    #[error("unclosed parenthesis")]
    UnclosedParenthesis,

    /// Assignment or increment applied to a non-variable
    #[error("assignment to a non-variable")]
    AssignmentToNonVariable,

    /// Division or remainder by zero
    #[error("division by zero")]
    DivisionByZero,

    /// Variable values kept expanding to further expressions
    #[error("recursion limit exceeded expanding variable `{0}`")]
    RecursionTooDeep(String),

    /// The environment rejected a variable assignment.
    #[error("{0}")]
    AssignVariable(String),
}

/// Evaluates an arithmetic expression.
pub fn eval<E: Env>(expression: &str, env: &mut E) -> Result<i64, Error> {
    eval::Evaluator::new(expression, env).run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::collections::HashMap;

    fn ok(expression: &str) -> i64 {
        let mut env = HashMap::new();
        eval(expression, &mut env).unwrap()
    }

    #[test]
    fn constants_and_precedence() {
        assert_eq!(ok(""), 0);
        assert_eq!(ok("42"), 42);
        assert_eq!(ok("1 + 2 * 3"), 7);
        assert_eq!(ok("(1 + 2) * 3"), 9);
        assert_eq!(ok("10 - 4 - 3"), 3);
        assert_eq!(ok("7 / 2"), 3);
        assert_eq!(ok("7 % 4"), 3);
        assert_eq!(ok("-7 / 2"), -3);
        assert_eq!(ok("1 << 4 | 1"), 17);
        assert_eq!(ok("6 & 3 ^ 1"), 3);
    }

    #[test]
    fn comparisons_and_logic() {
        assert_eq!(ok("1 < 2"), 1);
        assert_eq!(ok("2 <= 1"), 0);
        assert_eq!(ok("3 == 3"), 1);
        assert_eq!(ok("3 != 3"), 0);
        assert_eq!(ok("2 && 3"), 1);
        assert_eq!(ok("0 || 5"), 1);
        assert_eq!(ok("0 || 0"), 0);
        assert_eq!(ok("!5"), 0);
        assert_eq!(ok("~0"), -1);
    }

    #[test]
    fn conditional_operator() {
        assert_eq!(ok("1 ? 10 : 20"), 10);
        assert_eq!(ok("0 ? 10 : 20"), 20);
        assert_eq!(ok("1 ? 0 ? 1 : 2 : 3"), 2);
    }

    #[test]
    fn short_circuit_skips_side_effects() {
        let mut env = HashMap::new();
        env.insert("x".to_owned(), "1".to_owned());
        assert_eq!(eval("0 && (x = 9)", &mut env), Ok(0));
        assert_eq!(eval("1 || (x = 9)", &mut env), Ok(1));
        assert_eq!(eval("0 ? x = 9 : 5", &mut env), Ok(5));
        assert_eq!(env["x"], "1");
        // Division by zero in a skipped branch is not an error.
        assert_eq!(eval("1 ? 2 : 1 / 0", &mut env), Ok(2));
    }

    #[test]
    fn variables() {
        let mut env = HashMap::new();
        env.insert("a".to_owned(), "6".to_owned());
        assert_eq!(eval("a * 7", &mut env), Ok(42));
        assert_eq!(eval("unset_variable", &mut env), Ok(0));
        assert_eq!(eval("b = a + 1", &mut env), Ok(7));
        assert_eq!(env["b"], "7");
        assert_eq!(eval("b += 3", &mut env), Ok(10));
        assert_eq!(env["b"], "10");
    }

    #[test]
    fn recursive_variable_values() {
        let mut env = HashMap::new();
        env.insert("x".to_owned(), "1 + 2".to_owned());
        assert_eq!(eval("x * 2", &mut env), Ok(6));

        env.insert("loop".to_owned(), "loop + 1".to_owned());
        assert_matches!(
            eval("loop", &mut env),
            Err(Error::RecursionTooDeep(name)) if name == "loop"
        );
    }

    #[test]
    fn increment_and_decrement() {
        let mut env = HashMap::new();
        env.insert("i".to_owned(), "5".to_owned());
        assert_eq!(eval("i++", &mut env), Ok(5));
        assert_eq!(env["i"], "6");
        assert_eq!(eval("++i", &mut env), Ok(7));
        assert_eq!(env["i"], "7");
        assert_eq!(eval("i--", &mut env), Ok(7));
        assert_eq!(env["i"], "6");
        assert_eq!(eval("--i", &mut env), Ok(5));
        assert_eq!(env["i"], "5");
    }

    #[test]
    fn comma_operator() {
        let mut env = HashMap::new();
        assert_eq!(eval("a = 1, b = 2, a + b", &mut env), Ok(3));
    }

    #[test]
    fn division_by_zero() {
        let mut env = HashMap::new();
        assert_eq!(eval("1 / 0", &mut env), Err(Error::DivisionByZero));
        assert_eq!(eval("1 % 0", &mut env), Err(Error::DivisionByZero));
    }

    #[test]
    fn assignment_to_non_variable() {
        let mut env = HashMap::new();
        assert_eq!(eval("1 = 2", &mut env), Err(Error::AssignmentToNonVariable));
        assert_eq!(eval("++3", &mut env), Err(Error::AssignmentToNonVariable));
        assert_eq!(
            eval("(a) = 2", &mut env),
            Err(Error::AssignmentToNonVariable)
        );
    }

    #[test]
    fn syntax_errors() {
        let mut env = HashMap::new();
        assert_eq!(eval("(1", &mut env), Err(Error::UnclosedParenthesis));
        assert_eq!(eval("1 ? 2", &mut env), Err(Error::MissingColon));
        assert_eq!(eval("+", &mut env), Err(Error::MissingOperand));
        assert_matches!(eval("1 2", &mut env), Err(Error::UnexpectedToken(_)));
    }

    #[test]
    fn overflow_wraps() {
        assert_eq!(ok("9223372036854775807 + 1"), i64::MIN);
        assert_eq!(ok("-9223372036854775807 - 2"), i64::MAX);
    }
}
