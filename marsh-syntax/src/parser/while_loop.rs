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

//! Syntax parser for while and until loops

use super::core::Parser;
use super::error::Error;
use super::error::Result;
use super::error::SyntaxError;
use super::lex::Keyword;
use super::lex::TokenId;
use crate::source::Location;
use crate::syntax::CompoundCommand;
use crate::syntax::List;

impl Parser<'_, '_> {
    /// Parses a `do` clause, the part between `do` and `done`.
    ///
    /// `opening_location` is the location of the token that started the
    /// enclosing construct; it is used in error messages.
    pub(super) fn do_clause(&mut self, opening_location: &Location) -> Result<List> {
        let open = self.take_token_raw()?;
        if open.id != TokenId::Token(Some(Keyword::Do)) {
            return Err(Error {
                cause: SyntaxError::MissingForBody {
                    opening_location: opening_location.clone(),
                }
                .into(),
                location: open.word.location,
            });
        }
        let do_location = open.word.location;

        let body = self.maybe_compound_list()?;

        let close = self.take_token_raw()?;
        if close.id != TokenId::Token(Some(Keyword::Done)) {
            return Err(Error {
                cause: SyntaxError::UnclosedDoClause {
                    opening_location: do_location,
                }
                .into(),
                location: close.word.location,
            });
        }

        if body.0.is_empty() {
            return Err(Error {
                cause: SyntaxError::EmptyDoClause.into(),
                location: do_location,
            });
        }

        Ok(body)
    }

    /// Parses a while loop.
    ///
    /// The next token must be the `while` reserved word.
    pub fn while_loop(&mut self) -> Result<CompoundCommand> {
        let token = self.take_token_raw()?;
        debug_assert_eq!(token.id, TokenId::Token(Some(Keyword::While)));
        let opening_location = token.word.location;

        let condition = self.maybe_compound_list()?;
        if condition.0.is_empty() {
            let location = self.peek_token()?.word.location.clone();
            return Err(Error {
                cause: SyntaxError::UnclosedWhileClause { opening_location }.into(),
                location,
            });
        }

        let body = self.do_clause(&opening_location)?;

        Ok(CompoundCommand::While { condition, body })
    }

    /// Parses an until loop.
    ///
    /// The next token must be the `until` reserved word.
    pub fn until_loop(&mut self) -> Result<CompoundCommand> {
        let token = self.take_token_raw()?;
        debug_assert_eq!(token.id, TokenId::Token(Some(Keyword::Until)));
        let opening_location = token.word.location;

        let condition = self.maybe_compound_list()?;
        if condition.0.is_empty() {
            let location = self.peek_token()?.word.location.clone();
            return Err(Error {
                cause: SyntaxError::UnclosedUntilClause { opening_location }.into(),
                location,
            });
        }

        let body = self.do_clause(&opening_location)?;

        Ok(CompoundCommand::Until { condition, body })
    }
}

#[cfg(test)]
mod tests {
    use super::super::lex::Lexer;
    use super::*;
    use crate::source::Source;
    use assert_matches::assert_matches;

    fn parse(source: &str) -> Result<Option<CompoundCommand>> {
        let mut lexer = Lexer::from_memory(source, Source::Unknown);
        let mut parser = Parser::new(&mut lexer);
        parser.compound_command()
    }

    #[test]
    fn while_loop() {
        let command = parse("while a; do b; done").unwrap().unwrap();
        assert_matches!(command, CompoundCommand::While { condition, body } => {
            assert_eq!(condition.to_string(), "a");
            assert_eq!(body.to_string(), "b");
        });
    }

    #[test]
    fn until_loop() {
        let command = parse("until a; do b; done").unwrap().unwrap();
        assert_matches!(command, CompoundCommand::Until { condition, body } => {
            assert_eq!(condition.to_string(), "a");
            assert_eq!(body.to_string(), "b");
        });
    }

    #[test]
    fn multiline_loop() {
        let command = parse("while a\nb\ndo\nc\ndone").unwrap().unwrap();
        assert_matches!(command, CompoundCommand::While { condition, body } => {
            assert_eq!(condition.0.len(), 2);
            assert_eq!(body.to_string(), "c");
        });
    }

    #[test]
    fn unclosed_do() {
        let error = parse("while a; do b;").unwrap_err();
        assert_matches!(
            error.cause,
            super::super::error::ErrorCause::Syntax(SyntaxError::UnclosedDoClause { .. })
        );
    }

    #[test]
    fn empty_do_clause() {
        let error = parse("while a; do done").unwrap_err();
        assert_eq!(error.cause, SyntaxError::EmptyDoClause.into());
    }
}
