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

//! Part of the lexer that composes whole tokens

use super::core::Lexer;
use super::core::Token;
use super::core::TokenId;
use super::core::WordContext;
use super::core::WordLexer;
use super::is_token_delimiter_char;
use crate::parser::error::Error;
use crate::parser::error::Result;
use crate::parser::error::SyntaxError;
use crate::syntax::Fd;
use crate::syntax::TextUnit;
use crate::syntax::Word;
use crate::syntax::WordUnit::Unquoted;
use std::rc::Rc;

impl Lexer<'_> {
    /// Parses an `IO_NUMBER` token, if the digits at the current position
    /// are immediately followed by `<` or `>`.
    fn io_number(&mut self) -> Result<Option<Token>> {
        let index = self.index();

        let mut digits = String::new();
        while let Some(c) = self.consume_char_if(|c| c.is_ascii_digit())? {
            digits.push(c.value);
        }
        if digits.is_empty() {
            return Ok(None);
        }

        if !matches!(self.peek_char()?, Some('<' | '>')) {
            self.rewind(index);
            return Ok(None);
        }
        let Ok(fd) = digits.parse() else {
            self.rewind(index);
            return Ok(None);
        };

        let location = self.location_range(index..self.index());
        let units = digits
            .chars()
            .map(|c| Unquoted(TextUnit::Literal(c)))
            .collect();
        let word = Word { units, location };
        let id = TokenId::IoNumber(Fd(fd));
        Ok(Some(Token { word, id, index }))
    }

    /// Parses a process substitution (`<(...)` or `>(...)`) as the start of
    /// a word token.
    fn proc_subst_word(&mut self) -> Result<Option<Token>> {
        let index = self.index();

        let read = match self.peek_char()? {
            Some('<') => true,
            Some('>') => false,
            _ => return Ok(None),
        };
        let opening_location = self.location()?;
        self.consume_char();
        if self.peek_char()? != Some('(') {
            self.rewind(index);
            return Ok(None);
        }
        self.consume_char();

        let content = self.inner_program()?;
        if !self.skip_if(|c| c == ')')? {
            let cause = SyntaxError::UnclosedCommandSubstitution { opening_location }.into();
            let location = self.location()?;
            return Err(Error { cause, location });
        }
        let location = self.location_range(index..self.index());
        let unit = Unquoted(TextUnit::ProcSubst {
            content: Rc::from(content),
            read,
            location,
        });

        // The process substitution may be followed by more word units.
        let mut lexer = WordLexer {
            lexer: self,
            context: WordContext::Word,
        };
        let rest = lexer.word(is_token_delimiter_char)?;

        let mut units = vec![unit];
        units.extend(rest.units);
        let location = self.location_range(index..self.index());
        let word = Word { units, location };
        let id = TokenId::Token(None);
        Ok(Some(Token { word, id, index }))
    }

    /// Parses a token.
    ///
    /// Blanks and comments at the current position must have been skipped by
    /// the caller (see
    /// [`skip_blanks_and_comment`](Lexer::skip_blanks_and_comment)).
    pub fn token(&mut self) -> Result<Token> {
        let index = self.index();

        if self.peek_char()?.is_none() {
            let location = self.location()?;
            let word = Word {
                units: vec![],
                location,
            };
            let id = TokenId::EndOfInput;
            return Ok(Token { word, id, index });
        }

        if let Some(token) = self.io_number()? {
            return Ok(token);
        }
        if let Some(token) = self.proc_subst_word()? {
            return Ok(token);
        }
        if let Some(token) = self.operator()? {
            return Ok(token);
        }

        let mut lexer = WordLexer {
            lexer: self,
            context: WordContext::Word,
        };
        let mut word = lexer.word(is_token_delimiter_char)?;
        word.parse_tilde_front();

        let keyword = word
            .to_string_if_literal()
            .and_then(|literal| literal.parse().ok());
        let id = TokenId::Token(keyword);
        Ok(Token { word, id, index })
    }
}
