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

//! Syntax parser for pipelines

use super::core::Parser;
use super::core::Rec;
use super::error::Error;
use super::error::Result;
use super::error::SyntaxError;
use super::lex::Keyword;
use super::lex::Operator;
use super::lex::TokenId;
use crate::source::Location;
use crate::syntax::Command;
use crate::syntax::Fd;
use crate::syntax::Pipeline;
use crate::syntax::Redir;
use crate::syntax::RedirBody;
use crate::syntax::RedirOp;
use crate::syntax::TextUnit;
use crate::syntax::TimeFormat;
use crate::syntax::Word;
use crate::syntax::WordUnit::Unquoted;
use std::rc::Rc;

/// Appends an implicit `2>&1` redirection to the command.
///
/// This desugars the `|&` pipe operator: `a |& b` behaves exactly like
/// `a 2>&1 | b`.
fn add_stderr_redir(command: &mut Command, location: Location) {
    let operand = Word {
        units: vec![Unquoted(TextUnit::Literal('1'))],
        location: location.clone(),
    };
    let redir = Redir {
        fd: Some(Fd(2)),
        body: RedirBody::Normal {
            operator: RedirOp::FdOut,
            operand,
        },
    };

    match command {
        Command::Simple(simple) => Rc::make_mut(&mut simple.redirs).push(redir),
        Command::Compound(compound) => compound.redirs.push(redir),
        Command::Function(function) => {
            Rc::make_mut(&mut function.body).redirs.push(redir);
        }
        Command::Coproc(coproc) => {
            add_stderr_redir(Rc::make_mut(&mut coproc.body), location);
        }
    }
}

/// Tests whether the word is the given literal option string.
fn is_literal_option(word: &Word, option: &str) -> bool {
    word.to_string_if_literal().as_deref() == Some(option)
}

impl Parser<'_, '_> {
    /// Parses an optional `time` prefix of a pipeline.
    fn time_prefix(&mut self) -> Result<Option<TimeFormat>> {
        if self.peek_token()?.id != TokenId::Token(Some(Keyword::Time)) {
            return Ok(None);
        }
        self.take_token_raw()?;

        let mut format = TimeFormat::Default;
        if let TokenId::Token(None) = self.peek_token()?.id {
            if is_literal_option(&self.peek_token()?.word, "-p") {
                self.take_token_raw()?;
                format = TimeFormat::Posix;
            }
        }
        // `--` terminates the options of the `time` keyword.
        if let TokenId::Token(None) = self.peek_token()?.id {
            if is_literal_option(&self.peek_token()?.word, "--") {
                self.take_token_raw()?;
            }
        }
        Ok(Some(format))
    }

    /// Parses a pipeline.
    ///
    /// If there is no valid pipeline at the current position, the result is
    /// `Ok(Rec::Parsed(None))`.
    pub fn pipeline(&mut self) -> Result<Rec<Option<Pipeline>>> {
        let time = self.time_prefix()?;

        // Parse the `!` prefix
        let negation = if self.peek_token()?.id == TokenId::Token(Some(Keyword::Bang)) {
            let bang = self.take_token_raw()?;
            if self.peek_token()?.id == TokenId::Token(Some(Keyword::Bang)) {
                return Err(Error {
                    cause: SyntaxError::DoubleNegation.into(),
                    location: self.peek_token()?.word.location.clone(),
                });
            }
            Some(bang.word.location)
        } else {
            None
        };

        // Parse the first command
        let first = loop {
            match self.command()? {
                Rec::AliasSubstituted => {
                    if time.is_none() && negation.is_none() {
                        return Ok(Rec::AliasSubstituted);
                    }
                }
                Rec::Parsed(first) => break first,
            }
        };
        let Some(first) = first else {
            if let Some(location) = negation {
                return Err(Error {
                    cause: SyntaxError::MissingCommandAfterBang.into(),
                    location,
                });
            }
            // A lone `time` is a valid pipeline timing nothing.
            return Ok(Rec::Parsed(time.map(|time| Pipeline {
                commands: vec![],
                negation: false,
                time: Some(time),
            })));
        };

        // Parse the rest of the pipeline
        let mut commands = vec![Rc::new(first)];
        loop {
            let (bar_location, pipe_stderr) = match self.peek_token()?.id {
                TokenId::Operator(Operator::Bar) => {
                    let token = self.take_token_raw()?;
                    (token.word.location, false)
                }
                TokenId::Operator(Operator::BarAnd) => {
                    let token = self.take_token_raw()?;
                    (token.word.location, true)
                }
                _ => break,
            };

            if pipe_stderr {
                let last = commands.last_mut().unwrap();
                add_stderr_redir(Rc::make_mut(last), bar_location.clone());
            }

            self.newline_list()?;

            let next = loop {
                match self.command()? {
                    Rec::AliasSubstituted => (),
                    Rec::Parsed(Some(next)) => break next,
                    Rec::Parsed(None) => {
                        return Err(Error {
                            cause: SyntaxError::MissingCommandAfterBar.into(),
                            location: bar_location,
                        })
                    }
                }
            };
            commands.push(Rc::new(next));
        }

        Ok(Rec::Parsed(Some(Pipeline {
            commands,
            negation: negation.is_some(),
            time,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::super::lex::Lexer;
    use super::*;
    use crate::source::Source;
    use assert_matches::assert_matches;

    fn parse(source: &str) -> Result<Option<Pipeline>> {
        let mut lexer = Lexer::from_memory(source, Source::Unknown);
        let mut parser = Parser::new(&mut lexer);
        loop {
            match parser.pipeline()? {
                Rec::AliasSubstituted => continue,
                Rec::Parsed(pipeline) => return Ok(pipeline),
            }
        }
    }

    #[test]
    fn single_command() {
        let pipeline = parse("echo x").unwrap().unwrap();
        assert_eq!(pipeline.commands.len(), 1);
        assert!(!pipeline.negation);
        assert_eq!(pipeline.time, None);
    }

    #[test]
    fn multi_command_pipeline() {
        let pipeline = parse("a | b | c").unwrap().unwrap();
        assert_eq!(pipeline.commands.len(), 3);
    }

    #[test]
    fn pipeline_continues_on_next_line() {
        let pipeline = parse("a |\n\nb").unwrap().unwrap();
        assert_eq!(pipeline.commands.len(), 2);
    }

    #[test]
    fn negation() {
        let pipeline = parse("! a").unwrap().unwrap();
        assert!(pipeline.negation);
    }

    #[test]
    fn double_negation_is_an_error() {
        let error = parse("! ! a").unwrap_err();
        assert_eq!(error.cause, SyntaxError::DoubleNegation.into());
    }

    #[test]
    fn missing_command_after_bang() {
        let error = parse("! ;").unwrap_err();
        assert_eq!(error.cause, SyntaxError::MissingCommandAfterBang.into());
    }

    #[test]
    fn missing_command_after_bar() {
        let error = parse("a | ;").unwrap_err();
        assert_eq!(error.cause, SyntaxError::MissingCommandAfterBar.into());
    }

    #[test]
    fn time_prefix() {
        let pipeline = parse("time a | b").unwrap().unwrap();
        assert_eq!(pipeline.time, Some(TimeFormat::Default));
        assert_eq!(pipeline.commands.len(), 2);

        let pipeline = parse("time -p a").unwrap().unwrap();
        assert_eq!(pipeline.time, Some(TimeFormat::Posix));

        let pipeline = parse("time -- -p").unwrap().unwrap();
        assert_eq!(pipeline.time, Some(TimeFormat::Default));
        assert_eq!(pipeline.commands.len(), 1);
    }

    #[test]
    fn lone_time() {
        let pipeline = parse("time").unwrap().unwrap();
        assert_eq!(pipeline.time, Some(TimeFormat::Default));
        assert_eq!(pipeline.commands, []);
    }

    #[test]
    fn time_with_negation() {
        let pipeline = parse("time ! a").unwrap().unwrap();
        assert_eq!(pipeline.time, Some(TimeFormat::Default));
        assert!(pipeline.negation);
    }

    #[test]
    fn stderr_pipe() {
        let pipeline = parse("a |& b").unwrap().unwrap();
        assert_eq!(pipeline.commands.len(), 2);
        assert_matches!(&*pipeline.commands[0], Command::Simple(simple) => {
            assert_eq!(simple.redirs.len(), 1);
            assert_eq!(simple.redirs[0].fd, Some(Fd(2)));
            assert_matches!(&simple.redirs[0].body, RedirBody::Normal { operator, operand } => {
                assert_eq!(*operator, RedirOp::FdOut);
                assert_eq!(operand.to_string(), "1");
            });
        });
    }
}
