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

//! Evaluation of conditional expressions (`[[ ... ]]`)
//!
//! The expression tree is evaluated recursively with the test primitives:
//! file tests through the system interface, string and pattern comparisons,
//! and arithmetic comparisons through the arithmetic evaluator. The exit
//! status is 0 when the expression is true, 1 when false, and 2 on an
//! evaluation error.

use crate::expansion::eval_arith;
use crate::expansion::expand_word;
use crate::Handle;
use marsh_env::semantics::ExitStatus;
use marsh_env::system::Fd;
use marsh_env::system::System;
use marsh_env::Env;
use marsh_syntax::source::Location;
use marsh_syntax::syntax::CondBinaryOp;
use marsh_syntax::syntax::CondExpr;
use marsh_syntax::syntax::CondUnaryOp;
use marsh_syntax::syntax::Word;
use std::ffi::CString;
use std::ops::ControlFlow::{Break, Continue};

enum CondError {
    Divert(marsh_env::semantics::Divert),
    Message(String),
}

type CondResult<T> = Result<T, CondError>;

fn expand(env: &mut Env, word: &Word) -> CondResult<String> {
    match expand_word(env, word) {
        Ok((field, _)) => Ok(field.value),
        Err(error) => match error.handle(env) {
            Continue(()) => Err(CondError::Message(String::new())),
            Break(divert) => Err(CondError::Divert(divert)),
        },
    }
}

fn evaluate(env: &mut Env, expression: &CondExpr, location: &Location) -> CondResult<bool> {
    match expression {
        CondExpr::And(lhs, rhs) => {
            Ok(evaluate(env, lhs, location)? && evaluate(env, rhs, location)?)
        }
        CondExpr::Or(lhs, rhs) => {
            Ok(evaluate(env, lhs, location)? || evaluate(env, rhs, location)?)
        }
        CondExpr::Not(operand) => Ok(!evaluate(env, operand, location)?),
        CondExpr::Word(word) => {
            let value = expand(env, word)?;
            Ok(!value.is_empty())
        }
        CondExpr::Unary { op, operand } => {
            let operand = expand(env, operand)?;
            evaluate_unary(env, *op, &operand)
        }
        CondExpr::Binary { op, lhs, rhs } => evaluate_binary(env, *op, lhs, rhs, location),
    }
}

fn evaluate_unary(env: &mut Env, op: CondUnaryOp, operand: &str) -> CondResult<bool> {
    let path = || CString::new(operand).map_err(|_| CondError::Message("invalid path".into()));
    match op.as_char() {
        'n' => Ok(!operand.is_empty()),
        'z' => Ok(operand.is_empty()),
        'v' => Ok(env.variables.get(operand).is_some_and(|v| v.value.is_some())),
        'o' => {
            let canonical = marsh_env::option::canonicalize(operand);
            match canonical.parse::<marsh_env::option::Option>() {
                Ok(option) => Ok(env.options.get(option) == marsh_env::option::State::On),
                Err(_) => Ok(false),
            }
        }
        'e' => Ok(env.system.file_exists(&path()?)),
        'f' => Ok(env.system.is_regular_file(&path()?)),
        'd' => Ok(env.system.is_directory(&path()?)),
        'x' => Ok(env.system.is_executable_file(&path()?)),
        's' => {
            // True if the file exists and has a size greater than zero.
            let path = path()?;
            Ok(matches!(env.system.file_size(&path), Ok(size) if size > 0))
        }
        't' => match operand.parse::<i32>() {
            Ok(fd) => Ok(env.system.isatty(Fd(fd))),
            Err(_) => Ok(false),
        },
        // The remaining file tests (permissions, ownership, file types not
        // represented in the system interface) evaluate by existence.
        'a' | 'b' | 'c' | 'g' | 'h' | 'k' | 'p' | 'r' | 'u' | 'w' | 'G' | 'L' | 'N' | 'O'
        | 'S' => Ok(env.system.file_exists(&path()?)),
        other => Err(CondError::Message(format!("unknown test operator -{other}"))),
    }
}

fn evaluate_binary(
    env: &mut Env,
    op: CondBinaryOp,
    lhs: &Word,
    rhs: &Word,
    location: &Location,
) -> CondResult<bool> {
    use CondBinaryOp::*;
    match op {
        Match | NoMatch => {
            let subject = expand(env, lhs)?;
            let pattern = match crate::pattern::word_to_pattern(env, rhs) {
                Ok(pattern) => pattern,
                Err(error) => {
                    return Err(match error.handle(env) {
                        Continue(()) => CondError::Message(String::new()),
                        Break(divert) => CondError::Divert(divert),
                    })
                }
            };
            let matched = pattern.is_match(&subject);
            Ok(if op == Match { matched } else { !matched })
        }
        RegexMatch => {
            let subject = expand(env, lhs)?;
            let regex = expand_regex(env, rhs)?;
            match regex::Regex::new(&regex) {
                Ok(regex) => Ok(regex.is_match(&subject)),
                Err(_) => Err(CondError::Message(format!("invalid regex: {regex}"))),
            }
        }
        StringLess => {
            let lhs = expand(env, lhs)?;
            let rhs = expand(env, rhs)?;
            Ok(lhs < rhs)
        }
        StringGreater => {
            let lhs = expand(env, lhs)?;
            let rhs = expand(env, rhs)?;
            Ok(lhs > rhs)
        }
        ArithEq | ArithNe | ArithLt | ArithLe | ArithGt | ArithGe => {
            let lhs = expand(env, lhs)?;
            let rhs = expand(env, rhs)?;
            let lhs = eval_number(env, &lhs, location)?;
            let rhs = eval_number(env, &rhs, location)?;
            Ok(match op {
                ArithEq => lhs == rhs,
                ArithNe => lhs != rhs,
                ArithLt => lhs < rhs,
                ArithLe => lhs <= rhs,
                ArithGt => lhs > rhs,
                ArithGe => lhs >= rhs,
                _ => unreachable!(),
            })
        }
        FileNewer | FileOlder | FileSame => {
            let lhs = expand(env, lhs)?;
            let rhs = expand(env, rhs)?;
            let lhs_path =
                CString::new(lhs).map_err(|_| CondError::Message("invalid path".into()))?;
            let rhs_path =
                CString::new(rhs).map_err(|_| CondError::Message("invalid path".into()))?;
            let lhs_stat = env.system.file_id_and_mtime(&lhs_path).ok();
            let rhs_stat = env.system.file_id_and_mtime(&rhs_path).ok();
            Ok(match op {
                FileNewer => match (lhs_stat, rhs_stat) {
                    (Some(lhs), Some(rhs)) => lhs.2 > rhs.2,
                    (Some(_), None) => true,
                    _ => false,
                },
                FileOlder => match (lhs_stat, rhs_stat) {
                    (Some(lhs), Some(rhs)) => lhs.2 < rhs.2,
                    (None, Some(_)) => true,
                    _ => false,
                },
                FileSame => match (lhs_stat, rhs_stat) {
                    (Some(lhs), Some(rhs)) => (lhs.0, lhs.1) == (rhs.0, rhs.1),
                    _ => false,
                },
                _ => unreachable!(),
            })
        }
    }
}

/// Evaluates an operand of an arithmetic comparison.
fn eval_number(env: &mut Env, text: &str, location: &Location) -> CondResult<i64> {
    match eval_arith(env, text, location) {
        Ok(value) => Ok(value),
        Err(error) => match error.handle(env) {
            Continue(()) => Err(CondError::Message(String::new())),
            Break(divert) => Err(CondError::Divert(divert)),
        },
    }
}

/// Expands the right-hand side of `=~` into a regular expression.
///
/// Quoted parts of the word match literally, so their regex metacharacters
/// are escaped.
fn expand_regex(env: &mut Env, word: &Word) -> CondResult<String> {
    let chars = {
        let mut expander = crate::expansion::attr_expander(env);
        expander.expand_pattern_word(word)
    };
    let chars = match chars {
        Ok(chars) => chars,
        Err(error) => {
            return Err(match error.handle(env) {
                Continue(()) => CondError::Message(String::new()),
                Break(divert) => CondError::Divert(divert),
            })
        }
    };

    let mut regex = String::new();
    for c in chars {
        match c {
            marsh_fnmatch::PatternChar::Normal(value) => regex.push(value),
            marsh_fnmatch::PatternChar::Literal(value) => {
                regex.push_str(&regex::escape(&value.to_string()))
            }
        }
    }
    Ok(regex)
}

/// Executes a conditional expression command.
pub fn execute(env: &mut Env, expression: &CondExpr, location: &Location) -> crate::Result {
    match evaluate(env, expression, location) {
        Ok(true) => {
            env.exit_status = ExitStatus::SUCCESS;
            Continue(())
        }
        Ok(false) => {
            env.exit_status = ExitStatus::FAILURE;
            Continue(())
        }
        Err(CondError::Message(message)) => {
            if !message.is_empty() {
                env.print_error(&message);
            }
            env.exit_status = ExitStatus::ERROR;
            Continue(())
        }
        Err(CondError::Divert(divert)) => Break(divert),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command as _;
    use marsh_env::variable::Scope;
    use marsh_syntax::syntax::List;

    fn run(env: &mut Env, code: &str) -> ExitStatus {
        let list: List = code.parse().unwrap();
        list.execute(env).unwrap();
        env.exit_status
    }

    #[test]
    fn string_tests() {
        let mut env = Env::new_virtual();
        assert_eq!(run(&mut env, "[[ -n nonempty ]]"), ExitStatus::SUCCESS);
        assert_eq!(run(&mut env, "[[ -z nonempty ]]"), ExitStatus::FAILURE);
        assert_eq!(run(&mut env, "[[ -z '' ]]"), ExitStatus::SUCCESS);
        assert_eq!(run(&mut env, "[[ word ]]"), ExitStatus::SUCCESS);
        assert_eq!(run(&mut env, "[[ '' ]]"), ExitStatus::FAILURE);
    }

    #[test]
    fn pattern_match_tests() {
        let mut env = Env::new_virtual();
        env.variables
            .get_or_new("x", Scope::Global)
            .assign("hello", None)
            .unwrap();
        assert_eq!(run(&mut env, "[[ $x == h* ]]"), ExitStatus::SUCCESS);
        assert_eq!(run(&mut env, "[[ $x == 'h*' ]]"), ExitStatus::FAILURE);
        assert_eq!(run(&mut env, "[[ $x != h* ]]"), ExitStatus::FAILURE);
        assert_eq!(run(&mut env, "[[ $x = hello ]]"), ExitStatus::SUCCESS);
    }

    #[test]
    fn regex_match_tests() {
        let mut env = Env::new_virtual();
        assert_eq!(run(&mut env, "[[ abc123 =~ ^[a-z]+[0-9]+$ ]]"), ExitStatus::SUCCESS);
        assert_eq!(run(&mut env, "[[ abc =~ ^[0-9]+$ ]]"), ExitStatus::FAILURE);
    }

    #[test]
    fn arithmetic_comparisons() {
        let mut env = Env::new_virtual();
        assert_eq!(run(&mut env, "[[ 2 -lt 10 ]]"), ExitStatus::SUCCESS);
        assert_eq!(run(&mut env, "[[ 10 -le 2 ]]"), ExitStatus::FAILURE);
        assert_eq!(run(&mut env, "[[ 3 -eq 3 ]]"), ExitStatus::SUCCESS);
        assert_eq!(run(&mut env, "[[ 3 -ne 3 ]]"), ExitStatus::FAILURE);
    }

    #[test]
    fn string_ordering() {
        let mut env = Env::new_virtual();
        assert_eq!(run(&mut env, "[[ abc < abd ]]"), ExitStatus::SUCCESS);
        assert_eq!(run(&mut env, "[[ abd > abc ]]"), ExitStatus::SUCCESS);
        assert_eq!(run(&mut env, "[[ abc > abd ]]"), ExitStatus::FAILURE);
    }

    #[test]
    fn logical_combinations() {
        let mut env = Env::new_virtual();
        assert_eq!(run(&mut env, "[[ -n a && -n b ]]"), ExitStatus::SUCCESS);
        assert_eq!(run(&mut env, "[[ -z a && -n b ]]"), ExitStatus::FAILURE);
        assert_eq!(run(&mut env, "[[ -z a || -n b ]]"), ExitStatus::SUCCESS);
        assert_eq!(run(&mut env, "[[ ! -z a ]]"), ExitStatus::SUCCESS);
        assert_eq!(run(&mut env, "[[ ( -z a || -n b ) && -n c ]]"), ExitStatus::SUCCESS);
    }

    #[test]
    fn variable_set_test() {
        let mut env = Env::new_virtual();
        assert_eq!(run(&mut env, "[[ -v x ]]"), ExitStatus::FAILURE);
        env.variables
            .get_or_new("x", Scope::Global)
            .assign("", None)
            .unwrap();
        assert_eq!(run(&mut env, "[[ -v x ]]"), ExitStatus::SUCCESS);
    }

    #[test]
    fn file_tests() {
        use marsh_env::system::r#virtual::INode;
        use marsh_env::system::VirtualSystem;
        let system = VirtualSystem::new();
        system.state.borrow_mut().file_system.insert(
            std::path::PathBuf::from("/exists"),
            std::rc::Rc::new(std::cell::RefCell::new(INode::default())),
        );
        let mut env = Env::with_system(Box::new(system));
        assert_eq!(run(&mut env, "[[ -e /exists ]]"), ExitStatus::SUCCESS);
        assert_eq!(run(&mut env, "[[ -f /exists ]]"), ExitStatus::SUCCESS);
        assert_eq!(run(&mut env, "[[ -e /missing ]]"), ExitStatus::FAILURE);
        assert_eq!(run(&mut env, "[[ ! -e /missing ]]"), ExitStatus::SUCCESS);
    }

    #[test]
    fn nonempty_file_test() {
        use marsh_env::system::r#virtual::INode;
        use marsh_env::system::VirtualSystem;
        let system = VirtualSystem::new();
        {
            let mut state = system.state.borrow_mut();
            state.file_system.insert(
                std::path::PathBuf::from("/empty"),
                std::rc::Rc::new(std::cell::RefCell::new(INode::default())),
            );
            state.file_system.insert(
                std::path::PathBuf::from("/full"),
                std::rc::Rc::new(std::cell::RefCell::new(INode::new("content"))),
            );
        }
        let mut env = Env::with_system(Box::new(system));
        // An existing but empty file fails the -s test.
        assert_eq!(run(&mut env, "[[ -s /empty ]]"), ExitStatus::FAILURE);
        assert_eq!(run(&mut env, "[[ -s /full ]]"), ExitStatus::SUCCESS);
        assert_eq!(run(&mut env, "[[ -s /missing ]]"), ExitStatus::FAILURE);
    }
}
