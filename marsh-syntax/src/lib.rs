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

//! This crate provides a parser for the shell command language with the
//! common interactive extensions.
//!
//! The crate consists of four main modules:
//!
//! - [`syntax`] defines the abstract syntax tree (AST) of the language,
//! - [`parser`] parses source code into ASTs,
//! - [`source`] describes where source code fragments come from, and
//! - [`alias`] defines aliases, which the parser substitutes while parsing.
//!
//! The [`input`] module defines the interface through which the parser pulls
//! lines of source code.

pub mod alias;
pub mod input;
pub mod parser;
pub mod source;
pub mod syntax;
