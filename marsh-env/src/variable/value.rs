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

//! Variable values

use indexmap::IndexMap;
use std::collections::BTreeMap;

/// Value of a variable
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Value {
    /// Single string
    Scalar(String),

    /// Possibly sparse array of strings with numeric keys
    ///
    /// Indexed arrays iterate in index order.
    Indexed(BTreeMap<u64, String>),

    /// Array of strings with string keys
    ///
    /// Associative arrays iterate in insertion order.
    Assoc(IndexMap<String, String>),
}

pub use Value::*;

impl Value {
    /// Creates a scalar value.
    #[must_use]
    pub fn scalar<S: Into<String>>(value: S) -> Value {
        Scalar(value.into())
    }

    /// Creates an indexed array value with consecutive indices from 0.
    #[must_use]
    pub fn array<I, S>(values: I) -> Value
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Indexed(
            values
                .into_iter()
                .enumerate()
                .map(|(i, value)| (i as u64, value.into()))
                .collect(),
        )
    }

    /// Returns the "length" of the value.
    ///
    /// For a scalar, the length is the number of characters.
    /// For arrays, it is the number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Scalar(value) => value.chars().count(),
            Indexed(values) => values.len(),
            Assoc(values) => values.len(),
        }
    }

    /// Tests whether the [length](Self::len) is zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the scalar string value, if this is a scalar.
    #[must_use]
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Scalar(value) => Some(value),
            Indexed(_) | Assoc(_) => None,
        }
    }

    /// Returns an iterator over the element values.
    ///
    /// A scalar yields its single value.
    pub fn iter_values(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        match self {
            Scalar(value) => Box::new(std::iter::once(value.as_str())),
            Indexed(values) => Box::new(values.values().map(String::as_str)),
            Assoc(values) => Box::new(values.values().map(String::as_str)),
        }
    }
}

impl From<String> for Value {
    fn from(value: String) -> Value {
        Scalar(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Value {
        Scalar(value.to_owned())
    }
}

impl From<Vec<String>> for Value {
    fn from(values: Vec<String>) -> Value {
        Value::array(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_length_in_characters() {
        assert_eq!(Value::scalar("").len(), 0);
        assert_eq!(Value::scalar("abc").len(), 3);
        assert_eq!(Value::scalar("héllo").len(), 5);
    }

    #[test]
    fn array_indices() {
        let value = Value::array(["a", "b", "c"]);
        assert_eq!(value.len(), 3);
        let Indexed(map) = &value else { panic!() };
        assert_eq!(map.get(&0).unwrap(), "a");
        assert_eq!(map.get(&2).unwrap(), "c");
    }

    #[test]
    fn iter_values_order() {
        let mut map = BTreeMap::new();
        map.insert(5, "five".to_owned());
        map.insert(1, "one".to_owned());
        let value = Indexed(map);
        let values: Vec<_> = value.iter_values().collect();
        assert_eq!(values, ["one", "five"]);
    }

    #[test]
    fn assoc_preserves_insertion_order() {
        let mut map = IndexMap::new();
        map.insert("z".to_owned(), "1".to_owned());
        map.insert("a".to_owned(), "2".to_owned());
        let value = Assoc(map);
        let values: Vec<_> = value.iter_values().collect();
        assert_eq!(values, ["1", "2"]);
    }
}
