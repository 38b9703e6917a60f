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

//! Syntax parser for the shell language
//!
//! This module provides a recursive-descent parser that composes the
//! [AST](crate::syntax) from tokens produced by the [lexer](lex). The parser
//! is a set of mutually recursive functions on the [`Parser`] struct, one per
//! grammatical construct.
//!
//! To parse a whole command line as the shell's read-eval loop does, create a
//! [`Lexer`](lex::Lexer) with an [input](crate::input) object, wrap it in a
//! `Parser`, and call [`command_line`](Parser::command_line) repeatedly:
//!
//! ```
//! use marsh_syntax::parser::lex::Lexer;
//! use marsh_syntax::parser::Parser;
//! use marsh_syntax::source::Source;
//!
//! let mut lexer = Lexer::from_memory("echo $?; exit\n", Source::Unknown);
//! let mut parser = Parser::new(&mut lexer);
//! let line = parser.command_line().unwrap().unwrap();
//! assert_eq!(line.to_string(), "echo $?; exit");
//! ```
//!
//! The parser performs alias substitution on candidate command words when
//! configured with a [glossary](crate::alias::Glossary); see
//! [`Config`](Config) and [`Rec`].
//!
//! Syntax errors are reported as [`Error`] values that carry an
//! [`ErrorCause`] and the [location](crate::source::Location) of the
//! offending token, from which the shell renders an annotated message. After
//! an error, the parser instance should be discarded; the shell resets by
//! creating a new parser (and, interactively, a new lexer) so that parsing
//! can resume in a known-good state on the next line.

pub mod lex;

mod case;
mod command;
mod compound_command;
mod cond;
mod core;
mod error;
mod for_loop;
mod from_str;
mod function;
mod grouping;
mod r#if;
mod list;
mod pipeline;
mod redir;
mod simple_command;
mod while_loop;

pub use self::core::Config;
pub use self::core::Parser;
pub use self::core::Rec;
pub use self::error::Error;
pub use self::error::ErrorCause;
pub use self::error::Result;
pub use self::error::SyntaxError;
