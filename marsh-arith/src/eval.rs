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

//! Expression parser and evaluator
//!
//! The evaluator is a recursive-descent parser that computes values as it
//! parses. Short-circuit operators (`&&`, `||`, `?:`) parse their unselected
//! operands with an `active` flag turned off, which suppresses variable
//! access, assignment, and value errors in the skipped branch while still
//! enforcing the syntax.

use crate::token::{Operator, Token, Tokens};
use crate::Env;
use crate::Error;

/// Maximum depth of recursive variable evaluation
const MAX_VARIABLE_RECURSION: usize = 64;

/// Intermediate evaluation result
///
/// Besides the numeric value, the result remembers the variable name when the
/// expression was a bare identifier, so that the caller can use it as an
/// assignment target.
#[derive(Clone, Debug)]
struct Value {
    number: i64,
    lvalue: Option<String>,
}

impl Value {
    fn number(number: i64) -> Self {
        Value {
            number,
            lvalue: None,
        }
    }
}

/// Evaluates an expression string with a recursion allowance.
pub(crate) fn eval_str<E: Env>(source: &str, env: &mut E, depth: usize) -> Result<i64, Error> {
    let mut evaluator = Evaluator {
        tokens: Tokens::new(source),
        env,
        depth,
    };
    evaluator.run()
}

pub struct Evaluator<'s, 'e, E: Env> {
    tokens: Tokens<'s>,
    env: &'e mut E,
    depth: usize,
}

impl<'s, 'e, E: Env> Evaluator<'s, 'e, E> {
    pub fn new(source: &'s str, env: &'e mut E) -> Self {
        Evaluator {
            tokens: Tokens::new(source),
            env,
            depth: MAX_VARIABLE_RECURSION,
        }
    }

    /// Evaluates the whole expression.
    ///
    /// An empty expression evaluates to zero, matching the behavior of
    /// `$(( ))` with an empty body.
    pub fn run(&mut self) -> Result<i64, Error> {
        if self.tokens.peek()?.is_none() {
            return Ok(0);
        }
        let value = self.comma(true)?;
        match self.tokens.next()? {
            None => Ok(value.number),
            Some(token) => Err(Error::UnexpectedToken(describe(&token))),
        }
    }

    /// Reads a variable, evaluating its value recursively.
    ///
    /// An unset variable and an empty value evaluate to zero.
    fn read_variable(&mut self, name: &str, active: bool) -> Result<i64, Error> {
        if !active {
            return Ok(0);
        }
        if self.depth == 0 {
            return Err(Error::RecursionTooDeep(name.to_owned()));
        }
        let Some(value) = self.env.get_variable(name) else {
            return Ok(0);
        };
        let value = value.trim();
        if value.is_empty() {
            return Ok(0);
        }
        if let Ok(number) = value.parse() {
            return Ok(number);
        }

        // The value is itself an expression; evaluate it recursively.
        eval_str(value, self.env, self.depth - 1)
    }

    fn assign(&mut self, name: &str, number: i64, active: bool) -> Result<(), Error> {
        if !active {
            return Ok(());
        }
        self.env
            .assign_variable(name, number.to_string())
            .map_err(Error::AssignVariable)
    }

    fn comma(&mut self, active: bool) -> Result<Value, Error> {
        let mut value = self.assignment(active)?;
        while let Some(Token::Operator(Operator::Comma)) = self.tokens.peek()? {
            self.tokens.next()?;
            value = self.assignment(active)?;
        }
        Ok(value)
    }

    fn assignment(&mut self, active: bool) -> Result<Value, Error> {
        use Operator::*;
        let value = self.conditional(active)?;

        let op = match self.tokens.peek()? {
            Some(Token::Operator(
                op @ (Equal | AsteriskEqual | SlashEqual | PercentEqual | PlusEqual | MinusEqual
                | LessLessEqual | GreaterGreaterEqual | AmpersandEqual | CaretEqual | BarEqual),
            )) => *op,
            _ => return Ok(value),
        };
        self.tokens.next()?;

        let Some(name) = value.lvalue else {
            return Err(Error::AssignmentToNonVariable);
        };
        let rhs = self.assignment(active)?.number;
        let number = match op {
            Equal => rhs,
            AsteriskEqual => value.number.wrapping_mul(rhs),
            SlashEqual => self.divide(value.number, rhs, active)?,
            PercentEqual => self.remainder(value.number, rhs, active)?,
            PlusEqual => value.number.wrapping_add(rhs),
            MinusEqual => value.number.wrapping_sub(rhs),
            LessLessEqual => value.number.wrapping_shl(rhs as u32),
            GreaterGreaterEqual => value.number.wrapping_shr(rhs as u32),
            AmpersandEqual => value.number & rhs,
            CaretEqual => value.number ^ rhs,
            BarEqual => value.number | rhs,
            _ => unreachable!("non-assignment operator {op:?}"),
        };
        self.assign(&name, number, active)?;
        Ok(Value::number(number))
    }

    fn conditional(&mut self, active: bool) -> Result<Value, Error> {
        let condition = self.logical_or(active)?;
        match self.tokens.peek()? {
            Some(Token::Operator(Operator::Question)) => (),
            _ => return Ok(condition),
        }
        self.tokens.next()?;

        let select_then = condition.number != 0;
        let then = self.assignment(active && select_then)?;
        match self.tokens.next()? {
            Some(Token::Operator(Operator::Colon)) => (),
            _ => return Err(Error::MissingColon),
        }
        let r#else = self.conditional(active && !select_then)?;
        let number = if select_then {
            then.number
        } else {
            r#else.number
        };
        Ok(Value::number(number))
    }

    fn logical_or(&mut self, active: bool) -> Result<Value, Error> {
        let mut value = self.logical_and(active)?;
        let mut known_true = value.number != 0;
        while let Some(Token::Operator(Operator::BarBar)) = self.tokens.peek()? {
            self.tokens.next()?;
            let rhs = self.logical_and(active && !known_true)?;
            known_true = known_true || rhs.number != 0;
            value = Value::number(known_true.into());
        }
        Ok(value)
    }

    fn logical_and(&mut self, active: bool) -> Result<Value, Error> {
        let mut value = self.bit_or(active)?;
        let mut known_false = value.number == 0;
        let mut any = false;
        while let Some(Token::Operator(Operator::AmpersandAmpersand)) = self.tokens.peek()? {
            self.tokens.next()?;
            any = true;
            let rhs = self.bit_or(active && !known_false)?;
            known_false = known_false || rhs.number == 0;
        }
        if any {
            value = Value::number((!known_false).into());
        }
        Ok(value)
    }

    fn bit_or(&mut self, active: bool) -> Result<Value, Error> {
        let mut value = self.bit_xor(active)?;
        while let Some(Token::Operator(Operator::Bar)) = self.tokens.peek()? {
            self.tokens.next()?;
            let rhs = self.bit_xor(active)?;
            value = Value::number(value.number | rhs.number);
        }
        Ok(value)
    }

    fn bit_xor(&mut self, active: bool) -> Result<Value, Error> {
        let mut value = self.bit_and(active)?;
        while let Some(Token::Operator(Operator::Caret)) = self.tokens.peek()? {
            self.tokens.next()?;
            let rhs = self.bit_and(active)?;
            value = Value::number(value.number ^ rhs.number);
        }
        Ok(value)
    }

    fn bit_and(&mut self, active: bool) -> Result<Value, Error> {
        let mut value = self.equality(active)?;
        while let Some(Token::Operator(Operator::Ampersand)) = self.tokens.peek()? {
            self.tokens.next()?;
            let rhs = self.equality(active)?;
            value = Value::number(value.number & rhs.number);
        }
        Ok(value)
    }

    fn equality(&mut self, active: bool) -> Result<Value, Error> {
        use Operator::*;
        let mut value = self.relational(active)?;
        loop {
            let equal = match self.tokens.peek()? {
                Some(Token::Operator(EqualEqual)) => true,
                Some(Token::Operator(BangEqual)) => false,
                _ => return Ok(value),
            };
            self.tokens.next()?;
            let rhs = self.relational(active)?;
            value = Value::number(((value.number == rhs.number) == equal).into());
        }
    }

    fn relational(&mut self, active: bool) -> Result<Value, Error> {
        use Operator::*;
        let mut value = self.shift(active)?;
        loop {
            let op = match self.tokens.peek()? {
                Some(Token::Operator(op @ (Less | LessEqual | Greater | GreaterEqual))) => *op,
                _ => return Ok(value),
            };
            self.tokens.next()?;
            let rhs = self.shift(active)?;
            let result = match op {
                Less => value.number < rhs.number,
                LessEqual => value.number <= rhs.number,
                Greater => value.number > rhs.number,
                GreaterEqual => value.number >= rhs.number,
                _ => unreachable!(),
            };
            value = Value::number(result.into());
        }
    }

    fn shift(&mut self, active: bool) -> Result<Value, Error> {
        use Operator::*;
        let mut value = self.additive(active)?;
        loop {
            let op = match self.tokens.peek()? {
                Some(Token::Operator(op @ (LessLess | GreaterGreater))) => *op,
                _ => return Ok(value),
            };
            self.tokens.next()?;
            let rhs = self.additive(active)?;
            let result = match op {
                LessLess => value.number.wrapping_shl(rhs.number as u32),
                GreaterGreater => value.number.wrapping_shr(rhs.number as u32),
                _ => unreachable!(),
            };
            value = Value::number(result);
        }
    }

    fn additive(&mut self, active: bool) -> Result<Value, Error> {
        use Operator::*;
        let mut value = self.multiplicative(active)?;
        loop {
            let op = match self.tokens.peek()? {
                Some(Token::Operator(op @ (Plus | Minus))) => *op,
                _ => return Ok(value),
            };
            self.tokens.next()?;
            let rhs = self.multiplicative(active)?;
            let result = match op {
                Plus => value.number.wrapping_add(rhs.number),
                Minus => value.number.wrapping_sub(rhs.number),
                _ => unreachable!(),
            };
            value = Value::number(result);
        }
    }

    fn multiplicative(&mut self, active: bool) -> Result<Value, Error> {
        use Operator::*;
        let mut value = self.unary(active)?;
        loop {
            let op = match self.tokens.peek()? {
                Some(Token::Operator(op @ (Asterisk | Slash | Percent))) => *op,
                _ => return Ok(value),
            };
            self.tokens.next()?;
            let rhs = self.unary(active)?;
            let result = match op {
                Asterisk => value.number.wrapping_mul(rhs.number),
                Slash => self.divide(value.number, rhs.number, active)?,
                Percent => self.remainder(value.number, rhs.number, active)?,
                _ => unreachable!(),
            };
            value = Value::number(result);
        }
    }

    fn divide(&mut self, lhs: i64, rhs: i64, active: bool) -> Result<i64, Error> {
        if !active {
            return Ok(0);
        }
        if rhs == 0 {
            return Err(Error::DivisionByZero);
        }
        Ok(lhs.wrapping_div(rhs))
    }

    fn remainder(&mut self, lhs: i64, rhs: i64, active: bool) -> Result<i64, Error> {
        if !active {
            return Ok(0);
        }
        if rhs == 0 {
            return Err(Error::DivisionByZero);
        }
        Ok(lhs.wrapping_rem(rhs))
    }

    fn unary(&mut self, active: bool) -> Result<Value, Error> {
        use Operator::*;
        let op = match self.tokens.peek()? {
            Some(Token::Operator(op @ (Plus | Minus | Bang | Tilde | PlusPlus | MinusMinus))) => {
                *op
            }
            _ => return self.postfix(active),
        };
        self.tokens.next()?;

        match op {
            Plus => Ok(Value::number(self.unary(active)?.number)),
            Minus => Ok(Value::number(self.unary(active)?.number.wrapping_neg())),
            Bang => Ok(Value::number((self.unary(active)?.number == 0).into())),
            Tilde => Ok(Value::number(!self.unary(active)?.number)),
            PlusPlus | MinusMinus => {
                let operand = self.unary(active)?;
                let Some(name) = operand.lvalue else {
                    return Err(Error::AssignmentToNonVariable);
                };
                let delta = if op == PlusPlus { 1 } else { -1 };
                let number = operand.number.wrapping_add(delta);
                self.assign(&name, number, active)?;
                Ok(Value::number(number))
            }
            _ => unreachable!(),
        }
    }

    fn postfix(&mut self, active: bool) -> Result<Value, Error> {
        use Operator::*;
        let mut value = self.primary(active)?;
        loop {
            let op = match self.tokens.peek()? {
                Some(Token::Operator(op @ (PlusPlus | MinusMinus))) => *op,
                _ => return Ok(value),
            };
            let Some(name) = value.lvalue.clone() else {
                // Not an lvalue; leave `++`/`--` for the caller, which will
                // report it as an unexpected token if it cannot be one.
                return Ok(value);
            };
            self.tokens.next()?;
            let delta = if op == PlusPlus { 1 } else { -1 };
            self.assign(&name, value.number.wrapping_add(delta), active)?;
            value = Value::number(value.number);
        }
    }

    fn primary(&mut self, active: bool) -> Result<Value, Error> {
        match self.tokens.next()? {
            Some(Token::Number(number)) => Ok(Value::number(number)),
            Some(Token::Identifier(name)) => {
                let number = self.read_variable(&name, active)?;
                Ok(Value {
                    number,
                    lvalue: Some(name),
                })
            }
            Some(Token::Operator(Operator::OpenParen)) => {
                let value = self.comma(active)?;
                match self.tokens.next()? {
                    Some(Token::Operator(Operator::CloseParen)) => Ok(Value {
                        number: value.number,
                        lvalue: None,
                    }),
                    _ => Err(Error::UnclosedParenthesis),
                }
            }
            Some(token) => Err(Error::UnexpectedToken(describe(&token))),
            None => Err(Error::MissingOperand),
        }
    }
}

fn describe(token: &Token) -> String {
    match token {
        Token::Number(number) => number.to_string(),
        Token::Identifier(name) => name.clone(),
        Token::Operator(op) => op.as_str().to_owned(),
    }
}
