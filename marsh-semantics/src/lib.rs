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

//! Semantics of the shell language
//!
//! This crate defines the standard semantics for the shell language. The
//! core of the semantics is command execution and word expansion. A command
//! is executed by calling [`Command::execute`](command::Command::execute) on
//! the parsed AST; a word is expanded by the functions in [`expansion`].
//!
//! A [`ReadEvalLoop`] reads, parses, and executes commands from an input,
//! which is how both scripts and the interactive session are run.

pub mod assign;
pub mod command;
pub mod command_search;
pub mod expansion;
pub mod pattern;
pub mod redir;
pub mod trap;
pub mod xtrace;

#[doc(no_inline)]
pub use marsh_env::semantics::*;

mod handle;
pub use handle::Handle;

pub mod runner;
pub use runner::ReadEvalLoop;

#[cfg(test)]
pub(crate) mod tests;
