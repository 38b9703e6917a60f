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

//! Syntax parser for for and select loops

use super::core::Parser;
use super::error::Error;
use super::error::Result;
use super::error::SyntaxError;
use super::lex::Keyword;
use super::lex::Operator;
use super::lex::TokenId;
use crate::source::Location;
use crate::syntax::CompoundCommand;
use crate::syntax::Word;

impl Parser<'_, '_> {
    /// Parses the optional `in words...` clause of a for or select loop.
    ///
    /// Returns `None` if there is no `in` keyword, in which case the loop
    /// iterates over the positional parameters.
    fn in_clause(&mut self) -> Result<Option<Vec<Word>>> {
        // An optional newline may precede `in` or `do`.
        loop {
            match self.peek_token()?.id {
                TokenId::Operator(Operator::Newline) => {
                    self.take_token_raw()?;
                    self.here_doc_contents()?;
                }
                TokenId::Operator(Operator::Semicolon) => {
                    // `for x; do ...` iterates over "$@"
                    self.take_token_raw()?;
                    return Ok(None);
                }
                TokenId::Token(Some(Keyword::In)) => break,
                _ => return Ok(None),
            }
        }
        self.take_token_raw()?;

        let mut words = Vec::new();
        loop {
            let token = self.take_token_auto(&[])?;
            match token.id {
                TokenId::Token(_) => words.push(token.word),
                TokenId::Operator(Operator::Semicolon) => break,
                TokenId::Operator(Operator::Newline) => {
                    self.here_doc_contents()?;
                    break;
                }
                _ => {
                    return Err(Error {
                        cause: SyntaxError::InvalidForValue.into(),
                        location: token.word.location,
                    })
                }
            }
        }
        Ok(Some(words))
    }

    /// Parses the name and body parts shared by for and select loops.
    fn for_loop_tail(
        &mut self,
        opening_location: Location,
    ) -> Result<(Word, Option<Vec<Word>>, crate::syntax::List)> {
        let name = self.take_token_raw()?;
        match name.id {
            TokenId::Token(_) => (),
            _ => {
                return Err(Error {
                    cause: SyntaxError::MissingForName.into(),
                    location: name.word.location,
                })
            }
        }
        if name.word.to_string_if_literal().is_none() {
            return Err(Error {
                cause: SyntaxError::InvalidForName.into(),
                location: name.word.location,
            });
        }

        let values = self.in_clause()?;
        let body = self.do_clause(&opening_location)?;
        Ok((name.word, values, body))
    }

    /// Parses a for loop.
    ///
    /// The next token must be the `for` reserved word. Both the POSIX
    /// `for name [in words]` form and the arithmetic
    /// `for ((init; cond; step))` form are recognized.
    pub fn for_loop(&mut self) -> Result<CompoundCommand> {
        let token = self.take_token_raw()?;
        debug_assert_eq!(token.id, TokenId::Token(Some(Keyword::For)));
        let opening_location = token.word.location;

        if let Some(command) = self.arith_for_loop(&opening_location)? {
            return Ok(command);
        }

        let (name, values, body) = self.for_loop_tail(opening_location)?;
        Ok(CompoundCommand::For { name, values, body })
    }

    /// Parses a select loop.
    ///
    /// The next token must be the `select` reserved word.
    pub fn select_loop(&mut self) -> Result<CompoundCommand> {
        let token = self.take_token_raw()?;
        debug_assert_eq!(token.id, TokenId::Token(Some(Keyword::Select)));
        let opening_location = token.word.location;

        let (name, values, body) = self.for_loop_tail(opening_location)?;
        Ok(CompoundCommand::Select { name, values, body })
    }

    /// Parses an arithmetic for loop, if the `for` keyword is followed by
    /// `((`.
    fn arith_for_loop(&mut self, opening_location: &Location) -> Result<Option<CompoundCommand>> {
        match self.peek_token()?.id {
            TokenId::Operator(Operator::OpenParen) => (),
            _ => return Ok(None),
        }
        let index = self.peek_token()?.index;

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

        let Some(content) = self.raw_arith_content()? else {
            return Err(Error {
                cause: SyntaxError::InvalidArithFor.into(),
                location: opening_location.clone(),
            });
        };

        // Split the content into the three expressions at top-level
        // semicolons.
        let mut parts = vec![String::new()];
        let mut depth = 0usize;
        for c in content.chars() {
            match c {
                '(' => depth += 1,
                ')' => depth = depth.saturating_sub(1),
                ';' if depth == 0 => {
                    parts.push(String::new());
                    continue;
                }
                _ => (),
            }
            parts.last_mut().unwrap().push(c);
        }
        if parts.len() != 3 {
            return Err(Error {
                cause: SyntaxError::InvalidArithFor.into(),
                location: opening_location.clone(),
            });
        }
        let step = parts.pop().unwrap().trim().to_owned();
        let condition = parts.pop().unwrap().trim().to_owned();
        let init = parts.pop().unwrap().trim().to_owned();

        // An optional separator may follow before `do`.
        loop {
            match self.peek_token()?.id {
                TokenId::Operator(Operator::Newline) => {
                    self.take_token_raw()?;
                    self.here_doc_contents()?;
                }
                TokenId::Operator(Operator::Semicolon) => {
                    self.take_token_raw()?;
                }
                _ => break,
            }
        }

        let body = self.do_clause(opening_location)?;
        Ok(Some(CompoundCommand::ArithFor {
            init,
            condition,
            step,
            body,
            location: opening_location.clone(),
        }))
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
    fn for_with_values() {
        let command = parse("for i in 1 2 3; do echo $i; done").unwrap().unwrap();
        assert_matches!(command, CompoundCommand::For { name, values, body } => {
            assert_eq!(name.to_string(), "i");
            let values = values.unwrap();
            assert_eq!(values.len(), 3);
            assert_eq!(body.to_string(), "echo $i");
        });
    }

    #[test]
    fn for_without_values() {
        let command = parse("for i do echo $i; done").unwrap().unwrap();
        assert_matches!(command, CompoundCommand::For { values, .. } => {
            assert_eq!(values, None);
        });

        let command = parse("for i; do echo $i; done").unwrap().unwrap();
        assert_matches!(command, CompoundCommand::For { values, .. } => {
            assert_eq!(values, None);
        });
    }

    #[test]
    fn for_with_empty_values() {
        let command = parse("for i in; do :; done").unwrap().unwrap();
        assert_matches!(command, CompoundCommand::For { values, .. } => {
            assert_eq!(values, Some(vec![]));
        });
    }

    #[test]
    fn for_multiline_in() {
        let command = parse("for i\nin a b\ndo :; done").unwrap().unwrap();
        assert_matches!(command, CompoundCommand::For { values, .. } => {
            assert_eq!(values.unwrap().len(), 2);
        });
    }

    #[test]
    fn select_loop() {
        let command = parse("select x in a b; do echo $x; done").unwrap().unwrap();
        assert_matches!(command, CompoundCommand::Select { name, values, .. } => {
            assert_eq!(name.to_string(), "x");
            assert_eq!(values.unwrap().len(), 2);
        });
    }

    #[test]
    fn arithmetic_for() {
        let command = parse("for ((i = 0; i < 5; i++)) do echo $i; done")
            .unwrap()
            .unwrap();
        assert_matches!(command, CompoundCommand::ArithFor { init, condition, step, body, .. } => {
            assert_eq!(init, "i = 0");
            assert_eq!(condition, "i < 5");
            assert_eq!(step, "i++");
            assert_eq!(body.to_string(), "echo $i");
        });
    }

    #[test]
    fn arithmetic_for_with_semicolon_before_do() {
        let command = parse("for ((;;)); do break; done").unwrap().unwrap();
        assert_matches!(command, CompoundCommand::ArithFor { init, condition, step, .. } => {
            assert_eq!(init, "");
            assert_eq!(condition, "");
            assert_eq!(step, "");
        });
    }

    #[test]
    fn missing_name() {
        let error = parse("for ; do :; done").unwrap_err();
        assert_eq!(error.cause, SyntaxError::MissingForName.into());
    }
}
