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

//! Lexical analyzer
//!
//! The [`Lexer`] reads characters from an [input](crate::input) object and
//! provides [`Token`]s to the parser. The lexer is context-sensitive: many of
//! its functions are invoked by the parser in specific grammatical positions,
//! e.g., [`here_doc_content`](Lexer::here_doc_content) after a newline
//! terminating a command with a pending here-document operator.

mod arith;
mod braced_param;
mod core;
mod dollar;
mod dollar_single;
mod heredoc;
mod keyword;
mod misc;
mod op;
mod text;
mod token;
mod word;

pub use self::core::is_blank;
pub use self::core::Lexer;
pub use self::core::Token;
pub use self::core::TokenId;
pub use self::core::WordContext;
pub use self::core::WordLexer;
pub use self::dollar::is_name_char;
pub use self::dollar::is_name_start_char;
pub use self::keyword::Keyword;
pub use self::keyword::ParseKeywordError;
pub use self::op::is_operator_char;
pub use self::op::is_token_delimiter_char;
pub use self::op::Operator;
pub use self::op::Trie;
