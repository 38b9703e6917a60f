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

//! Implementations of `FromStr` for the syntax types
//!
//! Parsing a string with these implementations produces an AST with
//! [unknown](crate::source::Source::Unknown) source locations.

use super::core::Parser;
use super::core::Rec;
use super::error::Error;
use super::error::SyntaxError;
use super::lex::is_token_delimiter_char;
use super::lex::Lexer;
use super::lex::TokenId;
use super::lex::WordContext;
use super::lex::WordLexer;
use crate::source::Source;
use crate::syntax::Command;
use crate::syntax::CompoundCommand;
use crate::syntax::FullCompoundCommand;
use crate::syntax::List;
use crate::syntax::Pipeline;
use crate::syntax::Word;
use std::str::FromStr;

/// Polls the parser function, converting an unexpected trailing token to a
/// `MissingSeparator` error.
fn finish<T>(parser: &mut Parser, result: T) -> Result<T, Error> {
    let token = parser.peek_token()?;
    if token.id != TokenId::EndOfInput {
        return Err(Error {
            cause: SyntaxError::MissingSeparator.into(),
            location: token.word.location.clone(),
        });
    }
    parser.ensure_no_unread_here_doc()?;
    Ok(result)
}

impl FromStr for Word {
    type Err = Error;
    fn from_str(s: &str) -> Result<Word, Error> {
        let mut lexer = Lexer::from_memory(s, Source::Unknown);
        let mut word_lexer = WordLexer {
            lexer: &mut lexer,
            context: WordContext::Word,
        };
        word_lexer.word(is_token_delimiter_char)
    }
}

impl FromStr for List {
    type Err = Error;
    fn from_str(s: &str) -> Result<List, Error> {
        let mut lexer = Lexer::from_memory(s, Source::Unknown);
        let mut parser = Parser::new(&mut lexer);
        let list = parser.maybe_compound_list()?;
        finish(&mut parser, list)
    }
}

impl FromStr for Pipeline {
    type Err = Error;
    fn from_str(s: &str) -> Result<Pipeline, Error> {
        let mut lexer = Lexer::from_memory(s, Source::Unknown);
        let mut parser = Parser::new(&mut lexer);
        loop {
            match parser.pipeline()? {
                Rec::AliasSubstituted => (),
                Rec::Parsed(None) => {
                    let location = parser.peek_token()?.word.location.clone();
                    return Err(Error {
                        cause: SyntaxError::MissingSeparator.into(),
                        location,
                    });
                }
                Rec::Parsed(Some(pipeline)) => return finish(&mut parser, pipeline),
            }
        }
    }
}

impl FromStr for Command {
    type Err = Error;
    fn from_str(s: &str) -> Result<Command, Error> {
        let mut lexer = Lexer::from_memory(s, Source::Unknown);
        let mut parser = Parser::new(&mut lexer);
        loop {
            match parser.command()? {
                Rec::AliasSubstituted => (),
                Rec::Parsed(None) => {
                    let location = parser.peek_token()?.word.location.clone();
                    return Err(Error {
                        cause: SyntaxError::MissingSeparator.into(),
                        location,
                    });
                }
                Rec::Parsed(Some(command)) => return finish(&mut parser, command),
            }
        }
    }
}

impl FromStr for FullCompoundCommand {
    type Err = Error;
    fn from_str(s: &str) -> Result<FullCompoundCommand, Error> {
        let mut lexer = Lexer::from_memory(s, Source::Unknown);
        let mut parser = Parser::new(&mut lexer);
        match parser.full_compound_command()? {
            Some(command) => finish(&mut parser, command),
            None => {
                let location = parser.peek_token()?.word.location.clone();
                Err(Error {
                    cause: SyntaxError::MissingSeparator.into(),
                    location,
                })
            }
        }
    }
}

impl FromStr for CompoundCommand {
    type Err = Error;
    fn from_str(s: &str) -> Result<CompoundCommand, Error> {
        let full: FullCompoundCommand = s.parse()?;
        Ok(full.command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_from_str() {
        let word: Word = "foo".parse().unwrap();
        assert_eq!(word.to_string(), "foo");

        let word: Word = "'a b'".parse().unwrap();
        assert_eq!(word.to_string(), "'a b'");
    }

    #[test]
    fn list_from_str() {
        let list: List = "a; b& c".parse().unwrap();
        assert_eq!(list.0.len(), 3);
    }

    #[test]
    fn list_from_str_with_here_doc() {
        let list: List = "cat <<END\nfoo\nEND\n".parse().unwrap();
        assert_eq!(list.0.len(), 1);
    }

    #[test]
    fn command_from_str() {
        let command: Command = "{ a; }".parse().unwrap();
        assert!(matches!(command, Command::Compound(_)));
    }

    #[test]
    fn compound_command_from_str() {
        let command: CompoundCommand = "if a; then b; fi".parse().unwrap();
        assert!(matches!(command, CompoundCommand::If { .. }));
    }

    #[test]
    fn trailing_garbage_is_an_error() {
        let result: Result<List, Error> = "a)".parse();
        assert_eq!(
            result.unwrap_err().cause,
            SyntaxError::MissingSeparator.into()
        );
    }
}
