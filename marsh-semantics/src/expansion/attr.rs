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

//! Attributed characters
//!
//! The initial expansion produces a string of characters with attributes
//! that the later phases consume: field splitting only splits characters
//! that [came from an expansion](Origin::SoftExpansion) and are not quoted,
//! pathname expansion treats quoted characters as literal pattern
//! characters, and quote removal drops [quoting](AttrChar::is_quoting)
//! characters. The parser's intent recorded in the word flags is only ever
//! consumed here, never modified.

/// Origin of an attributed character
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Origin {
    /// The character appeared literally in the source word.
    Literal,

    /// The character resulted from a parameter expansion, command
    /// substitution, or arithmetic expansion.
    ///
    /// Such characters are subject to field splitting and pathname
    /// expansion.
    SoftExpansion,

    /// The character resulted from an expansion whose result must be
    /// retained intact, e.g. tilde expansion.
    HardExpansion,
}

/// Character with expansion attributes
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AttrChar {
    /// Character value
    pub value: char,
    /// Where the character came from
    pub origin: Origin,
    /// Whether the character is quoted by another character
    pub is_quoted: bool,
    /// Whether the character quotes other characters
    ///
    /// Quoting characters (quotation marks and backslashes) are removed in
    /// the quote removal phase.
    pub is_quoting: bool,
}

impl AttrChar {
    /// Creates a literal, unquoted, non-quoting character.
    #[must_use]
    pub fn plain(value: char) -> AttrChar {
        AttrChar {
            value,
            origin: Origin::Literal,
            is_quoted: false,
            is_quoting: false,
        }
    }
}

/// Field of attributed characters
pub type AttrField = Vec<AttrChar>;

/// Sequence of fields produced by the initial expansion
///
/// Most words expand to a phrase of exactly one field, but `"$@"` and
/// friends may produce any number of fields.
pub type Phrase = Vec<AttrField>;

/// Appends a string of expanded characters to the field.
pub fn extend_soft(field: &mut AttrField, value: &str, is_quoted: bool) {
    field.extend(value.chars().map(|value| AttrChar {
        value,
        origin: Origin::SoftExpansion,
        is_quoted,
        is_quoting: false,
    }));
}

/// Appends a string of hard-expanded characters to the field.
pub fn extend_hard(field: &mut AttrField, value: &str) {
    field.extend(value.chars().map(|value| AttrChar {
        value,
        origin: Origin::HardExpansion,
        is_quoted: false,
        is_quoting: false,
    }));
}
