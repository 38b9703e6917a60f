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

//! Syntax parser for commands

use super::core::Parser;
use super::core::Rec;
use super::error::Error;
use super::error::Result;
use super::error::SyntaxError;
use super::lex::Keyword;
use super::lex::Operator;
use super::lex::TokenId;
use crate::syntax::Command;
use crate::syntax::CoprocCommand;
use crate::syntax::SimpleCommand;
use std::rc::Rc;

impl Parser<'_, '_> {
    /// Parses a coprocess command.
    ///
    /// The next token must be the `coproc` reserved word. The word after
    /// `coproc` names the coprocess if it is followed by a compound command;
    /// otherwise, the coprocess runs a simple command with the default name.
    fn coproc(&mut self) -> Result<Command> {
        let keyword = self.take_token_raw()?;
        debug_assert_eq!(keyword.id, TokenId::Token(Some(Keyword::Coproc)));
        let keyword_location = keyword.word.location;

        // A compound command directly after `coproc` is unnamed.
        if let Some(compound) = self.full_compound_command()? {
            return Ok(Command::Coproc(CoprocCommand {
                name: None,
                body: Rc::new(Command::Compound(compound)),
            }));
        }

        // Remember the next word; it may be the coprocess name.
        let token = match self.peek_token()?.id {
            TokenId::Token(None) => self.take_token_raw()?,
            _ => {
                return Err(Error {
                    cause: SyntaxError::MissingCoprocCommand.into(),
                    location: keyword_location,
                })
            }
        };

        if let Some(compound) = self.full_compound_command()? {
            let name = token.word.to_string_if_literal();
            match name {
                Some(name) => {
                    return Ok(Command::Coproc(CoprocCommand {
                        name: Some(name),
                        body: Rc::new(Command::Compound(compound)),
                    }))
                }
                None => {
                    return Err(Error {
                        cause: SyntaxError::MissingCoprocCommand.into(),
                        location: token.word.location,
                    })
                }
            }
        }

        // Not a named coprocess: re-parse from the remembered word as a
        // simple command.
        self.rewind_to(token.index);
        let simple = loop {
            match self.simple_command()? {
                Rec::AliasSubstituted => continue,
                Rec::Parsed(Some(simple)) => break simple,
                Rec::Parsed(None) => {
                    return Err(Error {
                        cause: SyntaxError::MissingCoprocCommand.into(),
                        location: keyword_location,
                    })
                }
            }
        };
        Ok(Command::Coproc(CoprocCommand {
            name: None,
            body: Rc::new(Command::Simple(simple)),
        }))
    }

    /// Converts a one-word simple command to a function definition if the
    /// word is followed by `()`.
    fn maybe_short_function(&mut self, simple: SimpleCommand) -> Result<Command> {
        let is_candidate = simple.assigns.is_empty()
            && simple.redirs.is_empty()
            && simple.words.len() == 1
            && !simple.first_word_is_keyword()
            && self.peek_token()?.id == TokenId::Operator(Operator::OpenParen);
        if !is_candidate {
            return Ok(Command::Simple(simple));
        }

        let name = simple.words.into_iter().next().unwrap();
        let function = self.short_function_definition(name)?;
        Ok(Command::Function(function))
    }

    /// Parses a command.
    ///
    /// If there is no valid command at the current position, this function
    /// returns `Ok(Rec::Parsed(None))`.
    pub fn command(&mut self) -> Result<Rec<Option<Command>>> {
        match self.peek_token()?.id {
            TokenId::Token(Some(Keyword::Function)) => {
                let function = self.function_definition()?;
                return Ok(Rec::Parsed(Some(Command::Function(function))));
            }
            TokenId::Token(Some(Keyword::Coproc)) => {
                let coproc = self.coproc()?;
                return Ok(Rec::Parsed(Some(coproc)));
            }
            _ => (),
        }

        if let Some(compound) = self.full_compound_command()? {
            return Ok(Rec::Parsed(Some(Command::Compound(compound))));
        }

        match self.simple_command()? {
            Rec::AliasSubstituted => Ok(Rec::AliasSubstituted),
            Rec::Parsed(None) => Ok(Rec::Parsed(None)),
            Rec::Parsed(Some(simple)) => {
                let command = self.maybe_short_function(simple)?;
                Ok(Rec::Parsed(Some(command)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::lex::Lexer;
    use super::*;
    use crate::source::Source;
    use assert_matches::assert_matches;

    fn parse(source: &str) -> Result<Option<Command>> {
        let mut lexer = Lexer::from_memory(source, Source::Unknown);
        let mut parser = Parser::new(&mut lexer);
        loop {
            match parser.command()? {
                Rec::AliasSubstituted => continue,
                Rec::Parsed(command) => return Ok(command),
            }
        }
    }

    #[test]
    fn simple_command() {
        let command = parse("echo hello").unwrap().unwrap();
        assert_matches!(command, Command::Simple(simple) => {
            assert_eq!(simple.words.len(), 2);
        });
    }

    #[test]
    fn compound_command() {
        let command = parse("{ echo; }").unwrap().unwrap();
        assert_matches!(command, Command::Compound(_));
    }

    #[test]
    fn no_command() {
        assert_eq!(parse(";").unwrap(), None);
        assert_eq!(parse("").unwrap(), None);
    }

    #[test]
    fn clause_delimiter_is_not_a_command() {
        // `fi` at a command position is not consumed by `command`.
        let mut lexer = Lexer::from_memory("fi", Source::Unknown);
        let mut parser = Parser::new(&mut lexer);
        // The simple command parser treats the keyword as a word, which is
        // prevented by the list parser peeking first; here we just check the
        // token is still tagged as a keyword.
        let token = parser.peek_token().unwrap();
        assert_eq!(token.id, TokenId::Token(Some(Keyword::Fi)));
    }

    #[test]
    fn unnamed_coproc_with_simple_command() {
        let command = parse("coproc cat file").unwrap().unwrap();
        assert_matches!(command, Command::Coproc(coproc) => {
            assert_eq!(coproc.name, None);
            assert_matches!(&*coproc.body, Command::Simple(simple) => {
                assert_eq!(simple.words.len(), 2);
            });
        });
    }

    #[test]
    fn named_coproc_with_compound_command() {
        let command = parse("coproc NAME { cat; }").unwrap().unwrap();
        assert_matches!(command, Command::Coproc(coproc) => {
            assert_eq!(coproc.name.as_deref(), Some("NAME"));
            assert_matches!(&*coproc.body, Command::Compound(_));
        });
    }

    #[test]
    fn unnamed_coproc_with_compound_command() {
        let command = parse("coproc { cat; }").unwrap().unwrap();
        assert_matches!(command, Command::Coproc(coproc) => {
            assert_eq!(coproc.name, None);
            assert_matches!(&*coproc.body, Command::Compound(_));
        });
    }
}
