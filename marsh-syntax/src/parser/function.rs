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

//! Syntax parser for function definitions

use super::core::Parser;
use super::error::Error;
use super::error::Result;
use super::error::SyntaxError;
use super::lex::Keyword;
use super::lex::Operator;
use super::lex::TokenId;
use crate::syntax::FunctionDefinition;
use crate::syntax::Word;
use std::rc::Rc;

impl Parser<'_, '_> {
    /// Parses the body of a function definition.
    fn function_body(&mut self) -> Result<Rc<crate::syntax::FullCompoundCommand>> {
        self.newline_list()?;
        match self.full_compound_command()? {
            Some(body) => Ok(Rc::new(body)),
            None => {
                let token = self.peek_token()?;
                let cause = if token.id == TokenId::EndOfInput {
                    SyntaxError::MissingFunctionBody
                } else {
                    SyntaxError::InvalidFunctionBody
                };
                let location = token.word.location.clone();
                Err(Error {
                    cause: cause.into(),
                    location,
                })
            }
        }
    }

    /// Parses the `()` pair of a function definition.
    fn function_parens(&mut self) -> Result<()> {
        let open = self.take_token_raw()?;
        debug_assert_eq!(open.id, TokenId::Operator(Operator::OpenParen));
        let close = self.take_token_raw()?;
        if close.id != TokenId::Operator(Operator::CloseParen) {
            return Err(Error {
                cause: SyntaxError::UnmatchedParenthesis.into(),
                location: close.word.location,
            });
        }
        Ok(())
    }

    /// Parses a function definition that starts with the `function` keyword.
    ///
    /// The next token must be the `function` reserved word. Both
    /// `function name compound-command` and `function name() compound-command`
    /// are accepted.
    pub fn function_definition(&mut self) -> Result<FunctionDefinition> {
        let keyword = self.take_token_raw()?;
        debug_assert_eq!(keyword.id, TokenId::Token(Some(Keyword::Function)));

        let name = self.take_token_raw()?;
        match name.id {
            TokenId::Token(_) => (),
            _ => {
                return Err(Error {
                    cause: SyntaxError::MissingFunctionBody.into(),
                    location: name.word.location,
                })
            }
        }

        if self.peek_token()?.id == TokenId::Operator(Operator::OpenParen) {
            self.function_parens()?;
        }

        let body = self.function_body()?;
        Ok(FunctionDefinition {
            has_keyword: true,
            name: name.word,
            body,
        })
    }

    /// Parses the rest of a function definition of the form `name()`.
    ///
    /// The name word must have been consumed by the simple-command parser;
    /// the next token must be the opening `(`.
    pub(super) fn short_function_definition(&mut self, name: Word) -> Result<FunctionDefinition> {
        self.function_parens()?;
        let body = self.function_body()?;
        Ok(FunctionDefinition {
            has_keyword: false,
            name,
            body,
        })
    }
}
