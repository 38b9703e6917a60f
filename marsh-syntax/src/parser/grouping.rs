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

//! Syntax parser for grouping, subshell, and arithmetic commands

use super::core::Parser;
use super::error::Error;
use super::error::Result;
use super::error::SyntaxError;
use super::lex::Keyword;
use super::lex::Operator;
use super::lex::TokenId;
use crate::syntax::CompoundCommand;
use std::rc::Rc;

impl Parser<'_, '_> {
    /// Parses a grouping (`{ ... ; }`).
    ///
    /// The next token must be the opening `{`.
    pub fn grouping(&mut self) -> Result<CompoundCommand> {
        let open = self.take_token_raw()?;
        debug_assert_eq!(open.id, TokenId::Token(Some(Keyword::OpenBrace)));

        let list = self.maybe_compound_list()?;

        let close = self.take_token_raw()?;
        if close.id != TokenId::Token(Some(Keyword::CloseBrace)) {
            let opening_location = open.word.location;
            return Err(Error {
                cause: SyntaxError::UnclosedGrouping { opening_location }.into(),
                location: close.word.location,
            });
        }

        // An empty grouping is not allowed.
        if list.0.is_empty() {
            return Err(Error {
                cause: SyntaxError::EmptyGrouping.into(),
                location: open.word.location,
            });
        }

        Ok(CompoundCommand::Grouping(list))
    }

    /// Parses a subshell (`( ... )`).
    ///
    /// The next token must be the opening `(`.
    pub fn subshell(&mut self) -> Result<CompoundCommand> {
        let open = self.take_token_raw()?;
        debug_assert_eq!(open.id, TokenId::Operator(Operator::OpenParen));
        let location = open.word.location;

        let list = self.maybe_compound_list()?;

        let close = self.take_token_raw()?;
        if close.id != TokenId::Operator(Operator::CloseParen) {
            return Err(Error {
                cause: SyntaxError::UnclosedSubshell {
                    opening_location: location,
                }
                .into(),
                location: close.word.location,
            });
        }

        if list.0.is_empty() {
            return Err(Error {
                cause: SyntaxError::EmptySubshell.into(),
                location,
            });
        }

        Ok(CompoundCommand::Subshell {
            body: Rc::new(list),
            location,
        })
    }

    /// Parses an arithmetic command (`(( ... ))`), if the input really is
    /// one.
    ///
    /// The next token must be an `(` operator. If the `(` is not directly
    /// followed by another `(`, or if no matching `))` is found, this
    /// function rewinds and returns `Ok(None)`, in which case the input
    /// should be parsed as a subshell.
    pub fn arithmetic_command(&mut self) -> Result<Option<CompoundCommand>> {
        let index = self.peek_token()?.index;
        let location = self.peek_token()?.word.location.clone();

        // The two parentheses must be adjacent.
        self.rewind_to(index);
        if self.lexer.peek_char()? != Some('(') {
            return Ok(None);
        }
        self.lexer.consume_char();
        if self.lexer.peek_char()? != Some('(') {
            self.rewind_to(index);
            return Ok(None);
        }
        self.lexer.consume_char();

        match self.raw_arith_content()? {
            Some(expression) => Ok(Some(CompoundCommand::Arithmetic {
                expression,
                location,
            })),
            None => {
                self.rewind_to(index);
                Ok(None)
            }
        }
    }

    /// Reads the raw text up to the matching `))`.
    ///
    /// Returns `None` if the end of input is reached before the `))`.
    pub(super) fn raw_arith_content(&mut self) -> Result<Option<String>> {
        let mut content = String::new();
        let mut depth = 0usize;
        loop {
            match self.lexer.peek_char()? {
                Some('(') => {
                    self.lexer.consume_char();
                    depth += 1;
                    content.push('(');
                }
                Some(')') if depth > 0 => {
                    self.lexer.consume_char();
                    depth -= 1;
                    content.push(')');
                }
                Some(')') => {
                    self.lexer.consume_char();
                    if self.lexer.peek_char()? == Some(')') {
                        self.lexer.consume_char();
                        return Ok(Some(content));
                    }
                    return Ok(None);
                }
                Some(c) => {
                    self.lexer.consume_char();
                    content.push(c);
                }
                None => return Ok(None),
            }
        }
    }
}
