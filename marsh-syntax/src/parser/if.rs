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

//! Syntax parser for the if command

use super::core::Parser;
use super::error::Error;
use super::error::Result;
use super::error::SyntaxError;
use super::lex::Keyword;
use super::lex::TokenId;
use crate::syntax::CompoundCommand;
use crate::syntax::ElifThen;

impl Parser<'_, '_> {
    /// Parses an if command.
    ///
    /// The next token must be the `if` reserved word.
    pub fn if_command(&mut self) -> Result<CompoundCommand> {
        let if_token = self.take_token_raw()?;
        debug_assert_eq!(if_token.id, TokenId::Token(Some(Keyword::If)));
        let if_location = if_token.word.location;

        let condition = self.maybe_compound_list()?;

        let then = self.take_token_raw()?;
        if then.id != TokenId::Token(Some(Keyword::Then)) {
            return Err(Error {
                cause: SyntaxError::IfMissingThen { if_location }.into(),
                location: then.word.location,
            });
        }
        let body = self.maybe_compound_list()?;

        let mut elifs = Vec::new();
        let r#else = loop {
            let next = self.take_token_raw()?;
            match next.id {
                TokenId::Token(Some(Keyword::Elif)) => {
                    let condition = self.maybe_compound_list()?;
                    let then = self.take_token_raw()?;
                    if then.id != TokenId::Token(Some(Keyword::Then)) {
                        return Err(Error {
                            cause: SyntaxError::ElifMissingThen {
                                elif_location: next.word.location,
                            }
                            .into(),
                            location: then.word.location,
                        });
                    }
                    let body = self.maybe_compound_list()?;
                    elifs.push(ElifThen { condition, body });
                }
                TokenId::Token(Some(Keyword::Else)) => {
                    let body = self.maybe_compound_list()?;
                    let fi = self.take_token_raw()?;
                    if fi.id != TokenId::Token(Some(Keyword::Fi)) {
                        return Err(Error {
                            cause: SyntaxError::UnclosedIf { if_location }.into(),
                            location: fi.word.location,
                        });
                    }
                    break Some(body);
                }
                TokenId::Token(Some(Keyword::Fi)) => break None,
                _ => {
                    return Err(Error {
                        cause: SyntaxError::UnclosedIf { if_location }.into(),
                        location: next.word.location,
                    })
                }
            }
        };

        Ok(CompoundCommand::If {
            condition,
            body,
            elifs,
            r#else,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::lex::Lexer;
    use super::*;
    use crate::source::Source;
    use assert_matches::assert_matches;

    fn parse(source: &str) -> Result<CompoundCommand> {
        let mut lexer = Lexer::from_memory(source, Source::Unknown);
        let mut parser = Parser::new(&mut lexer);
        parser.if_command()
    }

    #[test]
    fn minimal_if() {
        let command = parse("if a; then b; fi").unwrap();
        assert_matches!(command, CompoundCommand::If { condition, body, elifs, r#else } => {
            assert_eq!(condition.to_string(), "a");
            assert_eq!(body.to_string(), "b");
            assert_eq!(elifs, []);
            assert_eq!(r#else, None);
        });
    }

    #[test]
    fn if_with_elifs_and_else() {
        let command = parse("if a; then b; elif c; then d; elif e; then f; else g; fi").unwrap();
        assert_matches!(command, CompoundCommand::If { elifs, r#else, .. } => {
            assert_eq!(elifs.len(), 2);
            assert_eq!(elifs[0].condition.to_string(), "c");
            assert_eq!(elifs[1].body.to_string(), "f");
            assert_eq!(r#else.unwrap().to_string(), "g");
        });
    }

    #[test]
    fn if_multiline() {
        let command = parse("if a\nthen\nb\nfi").unwrap();
        assert_matches!(command, CompoundCommand::If { condition, body, .. } => {
            assert_eq!(condition.to_string(), "a");
            assert_eq!(body.to_string(), "b");
        });
    }

    #[test]
    fn missing_then() {
        let error = parse("if a; fi").unwrap_err();
        assert_matches!(
            error.cause,
            super::super::error::ErrorCause::Syntax(SyntaxError::IfMissingThen { .. })
        );
    }

    #[test]
    fn unclosed_if() {
        let error = parse("if a; then b;").unwrap_err();
        assert_matches!(
            error.cause,
            super::super::error::ErrorCause::Syntax(SyntaxError::UnclosedIf { .. })
        );
    }
}
