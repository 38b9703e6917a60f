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

//! Syntax parser for redirections

use super::core::Parser;
use super::error::Error;
use super::error::Result;
use super::error::SyntaxError;
use super::lex::Operator;
use super::lex::TokenId;
use crate::syntax::Fd;
use crate::syntax::HereDoc;
use crate::syntax::Redir;
use crate::syntax::RedirBody;
use crate::syntax::RedirOp;
use std::cell::OnceCell;
use std::rc::Rc;

/// Converts a redirection operator token to a `RedirOp`, if applicable.
fn redir_op(operator: Operator) -> Option<RedirOp> {
    use Operator::*;
    match operator {
        Less => Some(RedirOp::FileIn),
        LessGreater => Some(RedirOp::FileInOut),
        Greater => Some(RedirOp::FileOut),
        GreaterGreater => Some(RedirOp::FileAppend),
        GreaterBar => Some(RedirOp::FileClobber),
        LessAnd => Some(RedirOp::FdIn),
        GreaterAnd => Some(RedirOp::FdOut),
        LessLessLess => Some(RedirOp::HereString),
        AndGreater => Some(RedirOp::ErrAndOut),
        AndGreaterGreater => Some(RedirOp::ErrAndOutAppend),
        _ => None,
    }
}

impl Parser<'_, '_> {
    /// Parses the operand word of a redirection.
    fn redir_operand(&mut self) -> Result<crate::syntax::Word> {
        let operand = self.take_token_auto(&[])?;
        match operand.id {
            TokenId::Token(_) => Ok(operand.word),
            TokenId::IoNumber(_) => Ok(operand.word),
            TokenId::Operator(_) | TokenId::EndOfInput => Err(Error {
                cause: SyntaxError::MissingRedirOperand.into(),
                location: operand.word.location,
            }),
        }
    }

    /// Parses a here-document operator's delimiter and registers the
    /// here-document for later content parsing.
    fn here_doc_body(&mut self, remove_tabs: bool) -> Result<RedirBody> {
        let delimiter = self.take_token_auto(&[])?;
        match delimiter.id {
            TokenId::Token(_) => (),
            _ => {
                return Err(Error {
                    cause: SyntaxError::MissingHereDocDelimiter.into(),
                    location: delimiter.word.location,
                })
            }
        }

        let here_doc = Rc::new(HereDoc {
            delimiter: delimiter.word,
            remove_tabs,
            content: OnceCell::new(),
        });
        self.memorize_unread_here_doc(Rc::clone(&here_doc));
        Ok(RedirBody::HereDoc(here_doc))
    }

    /// Parses a redirection.
    ///
    /// If the current token is not a redirection operator (optionally
    /// preceded by an `IO_NUMBER` token), the result is `Ok(None)`.
    pub fn redirection(&mut self) -> Result<Option<Redir>> {
        // Possible IO_NUMBER prefix
        let fd = match self.peek_token()?.id {
            TokenId::IoNumber(fd) => {
                self.take_token_raw()?;
                Some(fd)
            }
            _ => None,
        };

        let operator = match self.peek_token()?.id {
            TokenId::Operator(operator) => Some(operator),
            _ => None,
        };

        match operator {
            Some(Operator::LessLess | Operator::LessLessDash) => {
                let operator = operator.unwrap();
                self.take_token_raw()?;
                let remove_tabs = operator == Operator::LessLessDash;
                let body = self.here_doc_body(remove_tabs)?;
                Ok(Some(Redir { fd, body }))
            }
            Some(operator) if redir_op(operator).is_some() => {
                self.take_token_raw()?;
                let operator = redir_op(operator).unwrap();
                let operand = self.redir_operand()?;
                Ok(Some(Redir {
                    fd,
                    body: RedirBody::Normal { operator, operand },
                }))
            }
            _ => {
                if fd.is_some() {
                    // The token after an IO_NUMBER is not a redirection
                    // operator; this only happens with a process
                    // substitution directly following the digits.
                    let location = self.peek_token()?.word.location.clone();
                    return Err(Error {
                        cause: SyntaxError::MissingRedirOperand.into(),
                        location,
                    });
                }
                Ok(None)
            }
        }
    }

    /// Parses as many redirections as possible.
    pub fn redirections(&mut self) -> Result<Vec<Redir>> {
        let mut redirs = Vec::new();
        while let Some(redir) = self.redirection()? {
            redirs.push(redir);
        }
        Ok(redirs)
    }
}

#[cfg(test)]
mod tests {
    use super::super::lex::Lexer;
    use super::*;
    use crate::source::Source;
    use assert_matches::assert_matches;

    fn parse_redir(source: &str) -> Option<Redir> {
        let mut lexer = Lexer::from_memory(source, Source::Unknown);
        let mut parser = Parser::new(&mut lexer);
        parser.redirection().unwrap()
    }

    #[test]
    fn file_redirections() {
        let redir = parse_redir("<input").unwrap();
        assert_eq!(redir.fd, None);
        assert_matches!(redir.body, RedirBody::Normal { operator, operand } => {
            assert_eq!(operator, RedirOp::FileIn);
            assert_eq!(operand.to_string(), "input");
        });

        let redir = parse_redir(">>log").unwrap();
        assert_matches!(redir.body, RedirBody::Normal { operator, .. } => {
            assert_eq!(operator, RedirOp::FileAppend);
        });

        let redir = parse_redir("2>errors").unwrap();
        assert_eq!(redir.fd, Some(Fd(2)));

        let redir = parse_redir("&>both").unwrap();
        assert_matches!(redir.body, RedirBody::Normal { operator, .. } => {
            assert_eq!(operator, RedirOp::ErrAndOut);
        });
    }

    #[test]
    fn fd_copy() {
        let redir = parse_redir("2>&1").unwrap();
        assert_eq!(redir.fd, Some(Fd(2)));
        assert_matches!(redir.body, RedirBody::Normal { operator, operand } => {
            assert_eq!(operator, RedirOp::FdOut);
            assert_eq!(operand.to_string(), "1");
        });

        let redir = parse_redir("<&-").unwrap();
        assert_matches!(redir.body, RedirBody::Normal { operator, operand } => {
            assert_eq!(operator, RedirOp::FdIn);
            assert_eq!(operand.to_string(), "-");
        });
    }

    #[test]
    fn here_string() {
        let redir = parse_redir("<<<word").unwrap();
        assert_matches!(redir.body, RedirBody::Normal { operator, operand } => {
            assert_eq!(operator, RedirOp::HereString);
            assert_eq!(operand.to_string(), "word");
        });
    }

    #[test]
    fn here_doc_operator() {
        let mut lexer = Lexer::from_memory("<<END\nbody\nEND\n", Source::Unknown);
        let mut parser = Parser::new(&mut lexer);
        let redir = parser.redirection().unwrap().unwrap();
        assert_matches!(&redir.body, RedirBody::HereDoc(here_doc) => {
            assert_eq!(here_doc.delimiter.to_string(), "END");
            assert!(!here_doc.remove_tabs);
        });

        // Content is read after the newline token.
        let newline = parser.take_token_raw().unwrap();
        assert_eq!(newline.id, TokenId::Operator(Operator::Newline));
        parser.here_doc_contents().unwrap();
        assert_matches!(&redir.body, RedirBody::HereDoc(here_doc) => {
            assert_eq!(here_doc.content.get().unwrap().to_string(), "body\n");
        });
    }

    #[test]
    fn here_doc_with_tab_removal() {
        let mut lexer = Lexer::from_memory("<<-END\n\tbody\n\tEND\n", Source::Unknown);
        let mut parser = Parser::new(&mut lexer);
        let redir = parser.redirection().unwrap().unwrap();
        let newline = parser.take_token_raw().unwrap();
        assert_eq!(newline.id, TokenId::Operator(Operator::Newline));
        parser.here_doc_contents().unwrap();
        assert_matches!(&redir.body, RedirBody::HereDoc(here_doc) => {
            assert!(here_doc.remove_tabs);
            assert_eq!(here_doc.content.get().unwrap().to_string(), "body\n");
        });
    }

    #[test]
    fn not_a_redirection() {
        assert_eq!(parse_redir("word"), None);
        assert_eq!(parse_redir(";"), None);
    }

    #[test]
    fn missing_operand() {
        let mut lexer = Lexer::from_memory("< ;", Source::Unknown);
        let mut parser = Parser::new(&mut lexer);
        let error = parser.redirection().unwrap_err();
        assert_eq!(error.cause, SyntaxError::MissingRedirOperand.into());
    }

    #[test]
    fn missing_here_doc_delimiter() {
        let mut lexer = Lexer::from_memory("<< \n", Source::Unknown);
        let mut parser = Parser::new(&mut lexer);
        let error = parser.redirection().unwrap_err();
        assert_eq!(error.cause, SyntaxError::MissingHereDocDelimiter.into());
    }

    #[test]
    fn multiple_redirections() {
        let mut lexer = Lexer::from_memory("<a >b 2>&1 x", Source::Unknown);
        let mut parser = Parser::new(&mut lexer);
        let redirs = parser.redirections().unwrap();
        assert_eq!(redirs.len(), 3);
    }
}
