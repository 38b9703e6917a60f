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

//! Part of the lexer that parses operators

use super::core::is_blank;
use super::core::Lexer;
use super::core::Token;
use super::core::TokenId;
use crate::parser::error::Result;
use crate::syntax::TextUnit;
use crate::syntax::Word;
use crate::syntax::WordUnit;
use std::fmt;

/// Operator token identifier
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Operator {
    /// Newline
    Newline,
    /// `&`
    And,
    /// `&&`
    AndAnd,
    /// `&>`
    AndGreater,
    /// `&>>`
    AndGreaterGreater,
    /// `(`
    OpenParen,
    /// `)`
    CloseParen,
    /// `;`
    Semicolon,
    /// `;;`
    SemicolonSemicolon,
    /// `;&`
    SemicolonAnd,
    /// `;;&`
    SemicolonSemicolonAnd,
    /// `<`
    Less,
    /// `<&`
    LessAnd,
    /// `<<`
    LessLess,
    /// `<<-`
    LessLessDash,
    /// `<<<`
    LessLessLess,
    /// `<>`
    LessGreater,
    /// `>`
    Greater,
    /// `>&`
    GreaterAnd,
    /// `>>`
    GreaterGreater,
    /// `>|`
    GreaterBar,
    /// `|`
    Bar,
    /// `|&`
    BarAnd,
    /// `||`
    BarBar,
}

impl Operator {
    /// Returns the source form of the operator.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        use Operator::*;
        match self {
            Newline => "\n",
            And => "&",
            AndAnd => "&&",
            AndGreater => "&>",
            AndGreaterGreater => "&>>",
            OpenParen => "(",
            CloseParen => ")",
            Semicolon => ";",
            SemicolonSemicolon => ";;",
            SemicolonAnd => ";&",
            SemicolonSemicolonAnd => ";;&",
            Less => "<",
            LessAnd => "<&",
            LessLess => "<<",
            LessLessDash => "<<-",
            LessLessLess => "<<<",
            LessGreater => "<>",
            Greater => ">",
            GreaterAnd => ">&",
            GreaterGreater => ">>",
            GreaterBar => ">|",
            Bar => "|",
            BarAnd => "|&",
            BarBar => "||",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trie data structure that defines a set of operator tokens
///
/// This struct represents a node of the trie. A node is a sorted array of
/// [`Edge`]s.
#[derive(Copy, Clone, Debug)]
pub struct Trie(&'static [Edge]);

/// Edge of a [`Trie`]
#[derive(Copy, Clone, Debug)]
pub struct Edge {
    /// Character value of this edge
    pub key: char,
    /// Final operator token that is delimited after taking this edge if
    /// there are no longer matches
    pub value: Option<Operator>,
    /// Sub-trie containing values for keys that have the common prefix
    pub next: Trie,
}

impl Trie {
    /// Tests if this trie is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Finds an edge for the given key.
    #[must_use]
    pub fn edge(&self, key: char) -> Option<&Edge> {
        self.0
            .binary_search_by_key(&key, |edge| edge.key)
            .ok()
            .map(|i| &self.0[i])
    }
}

const NONE: Trie = Trie(&[]);

/// Trie containing all the operators
pub const OPERATORS: Trie = Trie(&[
    Edge {
        key: '\n',
        value: Some(Operator::Newline),
        next: NONE,
    },
    Edge {
        key: '&',
        value: Some(Operator::And),
        next: AND,
    },
    Edge {
        key: '(',
        value: Some(Operator::OpenParen),
        next: NONE,
    },
    Edge {
        key: ')',
        value: Some(Operator::CloseParen),
        next: NONE,
    },
    Edge {
        key: ';',
        value: Some(Operator::Semicolon),
        next: SEMICOLON,
    },
    Edge {
        key: '<',
        value: Some(Operator::Less),
        next: LESS,
    },
    Edge {
        key: '>',
        value: Some(Operator::Greater),
        next: GREATER,
    },
    Edge {
        key: '|',
        value: Some(Operator::Bar),
        next: BAR,
    },
]);

/// Trie of the operators that start with `&`
const AND: Trie = Trie(&[
    Edge {
        key: '&',
        value: Some(Operator::AndAnd),
        next: NONE,
    },
    Edge {
        key: '>',
        value: Some(Operator::AndGreater),
        next: AND_GREATER,
    },
]);

/// Trie of the operators that start with `&>`
const AND_GREATER: Trie = Trie(&[Edge {
    key: '>',
    value: Some(Operator::AndGreaterGreater),
    next: NONE,
}]);

/// Trie of the operators that start with `;`
const SEMICOLON: Trie = Trie(&[
    Edge {
        key: '&',
        value: Some(Operator::SemicolonAnd),
        next: NONE,
    },
    Edge {
        key: ';',
        value: Some(Operator::SemicolonSemicolon),
        next: SEMICOLON_SEMICOLON,
    },
]);

/// Trie of the operators that start with `;;`
const SEMICOLON_SEMICOLON: Trie = Trie(&[Edge {
    key: '&',
    value: Some(Operator::SemicolonSemicolonAnd),
    next: NONE,
}]);

/// Trie of the operators that start with `<`
const LESS: Trie = Trie(&[
    Edge {
        key: '&',
        value: Some(Operator::LessAnd),
        next: NONE,
    },
    Edge {
        key: '<',
        value: Some(Operator::LessLess),
        next: LESS_LESS,
    },
    Edge {
        key: '>',
        value: Some(Operator::LessGreater),
        next: NONE,
    },
]);

/// Trie of the operators that start with `<<`
const LESS_LESS: Trie = Trie(&[
    Edge {
        key: '-',
        value: Some(Operator::LessLessDash),
        next: NONE,
    },
    Edge {
        key: '<',
        value: Some(Operator::LessLessLess),
        next: NONE,
    },
]);

/// Trie of the operators that start with `>`
const GREATER: Trie = Trie(&[
    Edge {
        key: '&',
        value: Some(Operator::GreaterAnd),
        next: NONE,
    },
    Edge {
        key: '>',
        value: Some(Operator::GreaterGreater),
        next: NONE,
    },
    Edge {
        key: '|',
        value: Some(Operator::GreaterBar),
        next: NONE,
    },
]);

/// Trie of the operators that start with `|`
const BAR: Trie = Trie(&[
    Edge {
        key: '&',
        value: Some(Operator::BarAnd),
        next: NONE,
    },
    Edge {
        key: '|',
        value: Some(Operator::BarBar),
        next: NONE,
    },
]);

/// Tests whether the given character is the first character of an operator.
#[must_use]
pub fn is_operator_char(c: char) -> bool {
    OPERATORS.edge(c).is_some()
}

/// Tests whether the given character delimits a normal word token.
#[must_use]
pub fn is_token_delimiter_char(c: char) -> bool {
    is_operator_char(c) || is_blank(c)
}

impl Lexer<'_> {
    /// Parses an operator that matches a key in the given trie, if any.
    fn operator_tail(&mut self, trie: Trie) -> Result<Option<Operator>> {
        if trie.is_empty() {
            return Ok(None);
        }

        let index = self.index();
        let Some(c) = self.peek_char()? else {
            return Ok(None);
        };
        let Some(edge) = trie.edge(c) else {
            return Ok(None);
        };
        self.consume_char();

        if let Some(op) = self.operator_tail(edge.next)? {
            return Ok(Some(op));
        }

        match edge.value {
            Some(op) => Ok(Some(op)),
            None => {
                self.rewind(index);
                Ok(None)
            }
        }
    }

    /// Parses an operator token.
    pub fn operator(&mut self) -> Result<Option<Token>> {
        let index = self.index();
        let Some(operator) = self.operator_tail(OPERATORS)? else {
            return Ok(None);
        };

        let end = self.index();
        let location = self.location_range(index..end);
        let units = operator
            .as_str()
            .chars()
            .map(|c| WordUnit::Unquoted(TextUnit::Literal(c)))
            .collect();
        let word = Word { units, location };
        let id = TokenId::Operator(operator);
        Ok(Some(Token { word, id, index }))
    }
}
