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

//! Source code that is parsed by the parser
//!
//! This module contains items representing information about the source code
//! from which ASTs originate. [`Source`] identifies the origin of source code
//! fragments. A [`Code`] is a block of the source code along with a `Source`
//! instance. A [`Location`] specifies a range of characters within a `Code`.
//! Locations are attached to many AST nodes and are used in error messages.

use crate::alias::Alias;
use std::cell::RefCell;
use std::num::NonZeroU64;
use std::ops::Range;
use std::rc::Rc;

/// Origin of source code
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Source {
    /// Source code of unknown origin
    ///
    /// This variant should not be used in the normal operation of the shell.
    /// It is useful in tests and in ASTs parsed with `FromStr`.
    Unknown,

    /// Standard input
    Stdin,

    /// Command string specified with the `-c` option on startup
    CommandString,

    /// File specified on startup or in the dot built-in
    CommandFile {
        /// Path to the file
        path: String,
    },

    /// Alias substitution
    ///
    /// This applies to a code fragment that replaced another as a result of
    /// alias substitution.
    Alias {
        /// Position of the original word that was replaced
        original: Location,
        /// Definition of the alias that was substituted
        alias: Rc<Alias>,
    },

    /// Command substitution
    CommandSubst {
        /// Position of the command substitution in the source code
        original: Location,
    },

    /// Trap command
    Trap {
        /// Trap condition name, such as `EXIT` or `TERM`
        condition: String,
        /// Position of the simple command that has set this trap command
        origin: Location,
    },

    /// Command string executed by the eval built-in
    Eval {
        /// Position of the word that was evaluated
        original: Location,
    },

    /// Arithmetic expansion
    Arith {
        /// Position of the arithmetic expansion in the source code
        original: Location,
    },

    /// Value of a variable
    VariableValue {
        /// Name of the variable
        name: String,
    },
}

impl Source {
    /// Tests if this source is alias substitution for the given name.
    ///
    /// Returns true if `self` is `Source::Alias` with the name or such an
    /// original, recursively.
    #[must_use]
    pub fn is_alias_for(&self, name: &str) -> bool {
        if let Source::Alias { original, alias } = self {
            alias.name == name || original.code.source.is_alias_for(name)
        } else {
            false
        }
    }

    /// Returns a label that describes the source, shown in error messages.
    #[must_use]
    pub fn label(&self) -> &str {
        use Source::*;
        match self {
            Unknown => "<?>",
            Stdin => "<stdin>",
            CommandString => "<command_string>",
            CommandFile { path } => path,
            Alias { .. } => "<alias>",
            CommandSubst { .. } => "<command_substitution>",
            Trap { condition, .. } => condition,
            Eval { .. } => "<eval>",
            Arith { .. } => "<arith>",
            VariableValue { name } => name,
        }
    }
}

/// Block of source code
///
/// The code value is mutably shared between the input function and the lexer:
/// the input function appends lines to the value as they are read, and the
/// lexer scans characters in it. The `Code` instance is shared by all the
/// [`Location`]s pointing into it.
#[derive(Debug)]
pub struct Code {
    /// Content of the code, possibly containing multiple lines
    pub value: RefCell<String>,

    /// Line number of the first line of the code, counted from 1
    pub start_line_number: NonZeroU64,

    /// Origin of this code
    pub source: Rc<Source>,
}

impl Code {
    /// Computes the line number of the character at the given index.
    ///
    /// The index is a character index, not a byte index. Line numbers are
    /// counted from `start_line_number`.
    #[must_use]
    pub fn line_number(&self, char_index: usize) -> NonZeroU64 {
        let newlines = self
            .value
            .borrow()
            .chars()
            .take(char_index)
            .filter(|c| *c == '\n')
            .count();
        let newlines = u64::try_from(newlines).unwrap_or(u64::MAX);
        self.start_line_number.saturating_add(newlines)
    }
}

/// `Code`s are compared by reference, not by content, because a code block is
/// a shared buffer whose identity is what matters for location equality.
impl PartialEq for Code {
    fn eq(&self, other: &Code) -> bool {
        std::ptr::eq(self, other)
    }
}

impl Eq for Code {}

/// Position of a character or range of characters in the source code
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Location {
    /// Code that contains the character
    pub code: Rc<Code>,

    /// Character position in the code, counted from 0
    ///
    /// The range is in characters, not bytes. The range may be empty for a
    /// position that points between characters, e.g., the end of input.
    pub range: Range<usize>,
}

impl Location {
    /// Creates a dummy location whose code value is the given string.
    ///
    /// The `start_line_number` will be 1 and the `source` will be `Unknown`.
    /// The range will cover the whole string.
    #[must_use]
    pub fn dummy<S: Into<String>>(value: S) -> Location {
        fn with_value(value: String) -> Location {
            let range = 0..value.chars().count();
            let code = Rc::new(Code {
                value: RefCell::new(value),
                start_line_number: NonZeroU64::new(1).unwrap(),
                source: Rc::new(Source::Unknown),
            });
            Location { code, range }
        }
        with_value(value.into())
    }
}

/// Character with source description
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SourceChar {
    /// Character value
    pub value: char,
    /// Location of this character in source code
    pub location: Location,
}

/// Creates an iterator of [source char](SourceChar)s from a string.
///
/// `index_offset` will be the index of the first source char's location.
/// For each succeeding char, the index will be incremented by one.
pub fn source_chars<'a>(
    s: &'a str,
    code: &'a Rc<Code>,
    index_offset: usize,
) -> impl Iterator<Item = SourceChar> + 'a {
    s.chars().enumerate().map(move |(i, value)| SourceChar {
        value,
        location: Location {
            code: Rc::clone(code),
            range: index_offset + i..index_offset + i + 1,
        },
    })
}

pub mod pretty;
