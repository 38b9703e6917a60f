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

//! Syntax parser for command lists

use super::core::Parser;
use super::core::Rec;
use super::error::Error;
use super::error::Result;
use super::error::SyntaxError;
use super::lex::Operator;
use super::lex::TokenId;
use crate::syntax::AndOr;
use crate::syntax::AndOrList;
use crate::syntax::Item;
use crate::syntax::List;
use std::rc::Rc;

impl Parser<'_, '_> {
    /// Parses an and-or list.
    ///
    /// If there is no valid and-or list at the current position, the result
    /// is `Ok(Rec::Parsed(None))`.
    pub fn and_or_list(&mut self) -> Result<Rec<Option<AndOrList>>> {
        let first = match self.pipeline()? {
            Rec::AliasSubstituted => return Ok(Rec::AliasSubstituted),
            Rec::Parsed(None) => return Ok(Rec::Parsed(None)),
            Rec::Parsed(Some(first)) => first,
        };

        let mut rest = Vec::new();
        loop {
            let and_or = match self.peek_token()?.id {
                TokenId::Operator(Operator::AndAnd) => AndOr::AndThen,
                TokenId::Operator(Operator::BarBar) => AndOr::OrElse,
                _ => break,
            };
            let operator = self.take_token_raw()?;
            self.newline_list()?;

            let next = loop {
                match self.pipeline()? {
                    Rec::AliasSubstituted => (),
                    Rec::Parsed(Some(next)) => break next,
                    Rec::Parsed(None) => {
                        return Err(Error {
                            cause: SyntaxError::MissingCommandAfterOperator.into(),
                            location: operator.word.location,
                        })
                    }
                }
            };
            rest.push((and_or, next));
        }

        Ok(Rec::Parsed(Some(AndOrList { first, rest })))
    }

    /// Parses a list within a single command line.
    ///
    /// And-or lists are separated by `;` and `&`. Newlines do not separate
    /// items in this function; use
    /// [`maybe_compound_list`](Self::maybe_compound_list) for multi-line
    /// lists.
    pub fn list(&mut self) -> Result<List> {
        let mut items = Vec::new();
        loop {
            let and_or = loop {
                match self.and_or_list()? {
                    Rec::AliasSubstituted => (),
                    Rec::Parsed(and_or) => break and_or,
                }
            };
            let Some(and_or) = and_or else { break };
            let and_or = Rc::new(and_or);

            match self.peek_token()?.id {
                TokenId::Operator(Operator::Semicolon) => {
                    self.take_token_raw()?;
                    items.push(Item {
                        and_or,
                        async_flag: None,
                    });
                }
                TokenId::Operator(Operator::And) => {
                    let token = self.take_token_raw()?;
                    items.push(Item {
                        and_or,
                        async_flag: Some(token.word.location),
                    });
                }
                _ => {
                    items.push(Item {
                        and_or,
                        async_flag: None,
                    });
                    break;
                }
            }
        }
        Ok(List(items))
    }

    /// Parses an optional compound list.
    ///
    /// A compound list is a sequence of and-or lists separated by `;`, `&`,
    /// and newlines, as found in the bodies of compound commands. Parsing
    /// stops (without consuming the token) when a token is reached that
    /// cannot start a command: a closing keyword like `fi` or `done`, a
    /// closing operator like `)` or `;;`, or the end of input.
    pub fn maybe_compound_list(&mut self) -> Result<List> {
        let mut items = Vec::new();
        loop {
            self.newline_list()?;

            match self.peek_token()?.id {
                TokenId::EndOfInput => break,
                TokenId::Operator(
                    Operator::CloseParen
                    | Operator::SemicolonSemicolon
                    | Operator::SemicolonAnd
                    | Operator::SemicolonSemicolonAnd,
                ) => break,
                TokenId::Token(Some(keyword)) if keyword.is_clause_delimiter() => break,
                _ => (),
            }

            let and_or = loop {
                match self.and_or_list()? {
                    Rec::AliasSubstituted => (),
                    Rec::Parsed(and_or) => break and_or,
                }
            };
            let Some(and_or) = and_or else { break };
            let and_or = Rc::new(and_or);

            match self.peek_token()?.id {
                TokenId::Operator(Operator::Semicolon) => {
                    self.take_token_raw()?;
                    items.push(Item {
                        and_or,
                        async_flag: None,
                    });
                }
                TokenId::Operator(Operator::And) => {
                    let token = self.take_token_raw()?;
                    items.push(Item {
                        and_or,
                        async_flag: Some(token.word.location),
                    });
                }
                TokenId::Operator(Operator::Newline) => {
                    self.take_token_raw()?;
                    self.here_doc_contents()?;
                    items.push(Item {
                        and_or,
                        async_flag: None,
                    });
                }
                _ => {
                    items.push(Item {
                        and_or,
                        async_flag: None,
                    });
                    break;
                }
            }
        }
        Ok(List(items))
    }

    /// Parses a complete command line, which is an optional list followed by
    /// a newline or the end of input.
    ///
    /// Returns `None` when the input has ended. An empty line yields an
    /// empty list.
    pub fn command_line(&mut self) -> Result<Option<List>> {
        match self.peek_token()?.id {
            TokenId::EndOfInput => {
                self.take_token_raw()?;
                return Ok(None);
            }
            TokenId::Operator(Operator::Newline) => {
                self.take_token_raw()?;
                self.here_doc_contents()?;
                return Ok(Some(List::default()));
            }
            _ => (),
        }

        let list = self.list()?;

        let next = self.take_token_raw()?;
        match next.id {
            TokenId::Operator(Operator::Newline) => self.here_doc_contents()?,
            TokenId::EndOfInput => self.ensure_no_unread_here_doc()?,
            _ => {
                return Err(Error {
                    cause: SyntaxError::MissingSeparator.into(),
                    location: next.word.location,
                })
            }
        }

        Ok(Some(list))
    }
}

#[cfg(test)]
mod tests {
    use super::super::lex::Lexer;
    use super::*;
    use crate::source::Source;
    use assert_matches::assert_matches;

    fn parse_line(source: &str) -> Result<Option<List>> {
        let mut lexer = Lexer::from_memory(source, Source::Unknown);
        let mut parser = Parser::new(&mut lexer);
        parser.command_line()
    }

    #[test]
    fn and_or_list_with_operators() {
        let list = parse_line("a && b || c\n").unwrap().unwrap();
        assert_eq!(list.0.len(), 1);
        let and_or = &list.0[0].and_or;
        assert_eq!(and_or.rest.len(), 2);
        assert_eq!(and_or.rest[0].0, AndOr::AndThen);
        assert_eq!(and_or.rest[1].0, AndOr::OrElse);
    }

    #[test]
    fn and_or_continues_on_next_line() {
        let list = parse_line("a &&\n\nb\n").unwrap().unwrap();
        assert_eq!(list.0[0].and_or.rest.len(), 1);
    }

    #[test]
    fn sequential_and_async_items() {
        let list = parse_line("a; b& c\n").unwrap().unwrap();
        assert_eq!(list.0.len(), 3);
        assert!(list.0[0].async_flag.is_none());
        assert!(list.0[1].async_flag.is_some());
        assert!(list.0[2].async_flag.is_none());
    }

    #[test]
    fn empty_line() {
        let list = parse_line("\n").unwrap().unwrap();
        assert_eq!(list.0, []);
    }

    #[test]
    fn end_of_input() {
        assert_eq!(parse_line("").unwrap(), None);
    }

    #[test]
    fn missing_separator() {
        let error = parse_line("a)\n").unwrap_err();
        assert_eq!(error.cause, SyntaxError::MissingSeparator.into());
    }

    #[test]
    fn here_doc_contents_read_at_newline() {
        let list = parse_line("cat <<END\nfoo\nEND\n").unwrap().unwrap();
        assert_eq!(list.0.len(), 1);
        let and_or = &list.0[0].and_or;
        assert_matches!(&*and_or.first.commands[0], crate::syntax::Command::Simple(simple) => {
            assert_matches!(&simple.redirs[0].body, crate::syntax::RedirBody::HereDoc(here_doc) => {
                assert_eq!(here_doc.content.get().unwrap().to_string(), "foo\n");
            });
        });
    }

    #[test]
    fn missing_here_doc_content() {
        let error = parse_line("cat <<END").unwrap_err();
        assert_eq!(error.cause, SyntaxError::MissingHereDocContent.into());
    }

    #[test]
    fn compound_list_stops_at_clause_delimiter() {
        let mut lexer = Lexer::from_memory("a; b; done", Source::Unknown);
        let mut parser = Parser::new(&mut lexer);
        let list = parser.maybe_compound_list().unwrap();
        assert_eq!(list.0.len(), 2);
        let token = parser.peek_token().unwrap();
        assert_eq!(
            token.id,
            TokenId::Token(Some(super::super::lex::Keyword::Done))
        );
    }

    #[test]
    fn compound_list_with_newlines() {
        let mut lexer = Lexer::from_memory("a\nb\nc\n)", Source::Unknown);
        let mut parser = Parser::new(&mut lexer);
        let list = parser.maybe_compound_list().unwrap();
        assert_eq!(list.0.len(), 3);
    }
}
