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

//! Field splitting
//!
//! Field splitting applies to unquoted characters that resulted from an
//! expansion ([`Origin::SoftExpansion`]). Characters in `$IFS` separate
//! fields; IFS whitespace is stripped at field boundaries and adjacent IFS
//! whitespace counts as a single separator, while a non-whitespace IFS
//! character always delimits a field, possibly producing an empty one.

use super::attr::AttrChar;
use super::attr::AttrField;
use super::attr::Origin;
use super::attr::Phrase;

fn is_ifs_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n')
}

/// Tests whether the character is subject to splitting.
fn splits(c: &AttrChar, ifs: &str) -> bool {
    c.origin == Origin::SoftExpansion && !c.is_quoted && !c.is_quoting && ifs.contains(c.value)
}

/// Splits the fields of a phrase at `$IFS` characters.
pub fn split(phrase: Phrase, ifs: &str) -> Vec<AttrField> {
    let mut result = Vec::new();
    for field in phrase {
        split_field(field, ifs, &mut result);
    }
    result
}

fn split_field(field: AttrField, ifs: &str, result: &mut Vec<AttrField>) {
    let mut current = AttrField::new();
    let mut current_has_content = false;

    for c in field {
        if splits(&c, ifs) {
            if is_ifs_whitespace(c.value) {
                if current_has_content {
                    result.push(std::mem::take(&mut current));
                    current_has_content = false;
                }
            } else {
                // A non-whitespace separator always terminates a field,
                // producing an empty field for adjacent separators.
                result.push(std::mem::take(&mut current));
                current_has_content = false;
            }
        } else {
            current.push(c);
            current_has_content = true;
        }
    }

    if current_has_content {
        result.push(current);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn soft(s: &str) -> AttrField {
        s.chars()
            .map(|value| AttrChar {
                value,
                origin: Origin::SoftExpansion,
                is_quoted: false,
                is_quoting: false,
            })
            .collect()
    }

    fn literal(s: &str) -> AttrField {
        s.chars().map(AttrChar::plain).collect()
    }

    fn values(fields: &[AttrField]) -> Vec<String> {
        fields
            .iter()
            .map(|field| field.iter().map(|c| c.value).collect())
            .collect()
    }

    #[test]
    fn splitting_on_whitespace() {
        let fields = split(vec![soft("  a b  c ")], " \t\n");
        assert_eq!(values(&fields), ["a", "b", "c"]);
    }

    #[test]
    fn empty_expansion_yields_no_fields() {
        let fields = split(vec![soft("")], " \t\n");
        assert_eq!(values(&fields), [] as [String; 0]);
    }

    #[test]
    fn literal_chars_are_not_split() {
        let fields = split(vec![literal("a b")], " \t\n");
        assert_eq!(values(&fields), ["a b"]);
    }

    #[test]
    fn quoted_expansion_is_not_split() {
        let mut field = soft("a b");
        for c in &mut field {
            c.is_quoted = true;
        }
        let fields = split(vec![field], " \t\n");
        assert_eq!(values(&fields), ["a b"]);
    }

    #[test]
    fn non_whitespace_separator_keeps_empty_fields() {
        let fields = split(vec![soft("a::b")], ":");
        assert_eq!(values(&fields), ["a", "", "b"]);
    }

    #[test]
    fn mixed_fields_from_phrase() {
        let fields = split(vec![soft("a b"), soft("c")], " ");
        assert_eq!(values(&fields), ["a", "b", "c"]);
    }

    #[test]
    fn trailing_non_whitespace_separator_is_dropped() {
        let fields = split(vec![soft("a:")], ":");
        assert_eq!(values(&fields), ["a"]);
    }
}
