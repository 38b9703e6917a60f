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

//! Type definitions for functions
//!
//! This module provides data types for defining shell functions.

use marsh_syntax::source::Location;
use marsh_syntax::syntax::FullCompoundCommand;
use std::borrow::Borrow;
use std::collections::HashSet;
use std::hash::Hash;
use std::hash::Hasher;
use std::rc::Rc;
use thiserror::Error;

/// Definition of a function
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Function {
    /// String that identifies the function
    pub name: String,

    /// Command that is executed when the function is called
    ///
    /// The body is wrapped in `Rc` so that defining a function does not
    /// clone the command tree: the function set shares it with the AST. A
    /// simple command that calls the function clones the `Rc` and retains
    /// it until the call finishes, so the function can safely redefine or
    /// unset itself while executing.
    pub body: Rc<FullCompoundCommand>,

    /// Location of the function definition command that defined this
    /// function
    pub origin: Location,

    /// Optional location where this function was made read-only
    ///
    /// If this function is not read-only, `read_only_location` is `None`.
    pub read_only_location: Option<Location>,

    /// Whether the function is exported to the environment of executed
    /// programs (`export -f`)
    pub is_exported: bool,

    /// Whether the function has the trace attribute (`typeset -ft`)
    ///
    /// A traced function inherits the caller's `DEBUG`, `ERR`, and `RETURN`
    /// traps; in an untraced function those traps revert to their defaults
    /// for the duration of the call.
    pub is_traced: bool,
}

impl Function {
    /// Creates a new function.
    ///
    /// The `read_only_location` is set to `None`.
    #[inline]
    #[must_use]
    pub fn new<N: Into<String>, B: Into<Rc<FullCompoundCommand>>>(
        name: N,
        body: B,
        origin: Location,
    ) -> Self {
        Function {
            name: name.into(),
            body: body.into(),
            origin,
            read_only_location: None,
            is_exported: false,
            is_traced: false,
        }
    }

    /// Makes the function read-only.
    #[inline]
    #[must_use]
    pub fn make_read_only(mut self, location: Location) -> Self {
        self.read_only_location = Some(location);
        self
    }

    /// Gives the function the trace attribute.
    #[inline]
    #[must_use]
    pub fn trace(mut self) -> Self {
        self.is_traced = true;
        self
    }

    /// Whether this function is read-only or not.
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        self.read_only_location.is_some()
    }
}

/// Wrapper of [`Function`] for inserting into a hash set
///
/// The `Hash` and `PartialEq` implementations for `HashEntry` only compare
/// the names of the functions.
#[derive(Clone, Debug)]
struct HashEntry(Rc<Function>);

impl PartialEq for HashEntry {
    fn eq(&self, other: &HashEntry) -> bool {
        self.0.name == other.0.name
    }
}

impl Eq for HashEntry {}

impl Hash for HashEntry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.name.hash(state)
    }
}

impl Borrow<str> for HashEntry {
    fn borrow(&self) -> &str {
        &self.0.name
    }
}

/// Error redefining a read-only function
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("cannot redefine read-only function `{}`", .existing.name)]
pub struct DefineError {
    /// Existing read-only function
    pub existing: Rc<Function>,
    /// New function that tried to redefine the existing function
    pub new: Rc<Function>,
}

/// Collection of functions
#[derive(Clone, Debug, Default)]
pub struct FunctionSet {
    entries: HashSet<HashEntry>,
}

impl FunctionSet {
    /// Creates an empty function set.
    #[must_use]
    pub fn new() -> FunctionSet {
        Default::default()
    }

    /// Returns the function with the given name, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Rc<Function>> {
        self.entries.get(name).map(|entry| &entry.0)
    }

    /// Defines a function, replacing any existing function of the same name.
    ///
    /// Fails if the existing function is read-only.
    pub fn define<F: Into<Rc<Function>>>(&mut self, function: F) -> Result<(), DefineError> {
        let function = function.into();
        if let Some(existing) = self.entries.get(&*function.name) {
            if existing.0.is_read_only() {
                return Err(DefineError {
                    existing: Rc::clone(&existing.0),
                    new: function,
                });
            }
        }
        self.entries.replace(HashEntry(function));
        Ok(())
    }

    /// Removes the function with the given name, if any.
    ///
    /// Fails if the function is read-only.
    pub fn unset(&mut self, name: &str) -> Result<Option<Rc<Function>>, DefineError> {
        if let Some(existing) = self.entries.get(name) {
            if existing.0.is_read_only() {
                return Err(DefineError {
                    existing: Rc::clone(&existing.0),
                    new: Rc::clone(&existing.0),
                });
            }
        }
        Ok(self.entries.take(name).map(|entry| entry.0))
    }

    /// Returns an iterator over the functions.
    ///
    /// The order of iterated functions is unspecified.
    pub fn iter(&self) -> impl Iterator<Item = &Rc<Function>> {
        self.entries.iter().map(|entry| &entry.0)
    }

    /// Returns the number of functions in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the set contains no functions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_function(name: &str) -> Function {
        let body: FullCompoundCommand = "{ :; }".parse().unwrap();
        Function::new(name, body, Location::dummy(name))
    }

    #[test]
    fn define_and_get() {
        let mut set = FunctionSet::new();
        assert_eq!(set.get("f"), None);

        set.define(dummy_function("f")).unwrap();
        assert_eq!(set.get("f").unwrap().name, "f");
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn redefining_replaces() {
        let mut set = FunctionSet::new();
        set.define(dummy_function("f")).unwrap();
        let other = Function {
            origin: Location::dummy("other"),
            ..dummy_function("f")
        };
        set.define(other).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("f").unwrap().origin, Location::dummy("other"));
    }

    #[test]
    fn redefining_read_only_fails() {
        let mut set = FunctionSet::new();
        set.define(dummy_function("f").make_read_only(Location::dummy("ro")))
            .unwrap();
        let error = set.define(dummy_function("f")).unwrap_err();
        assert_eq!(error.existing.name, "f");
    }

    #[test]
    fn unsetting() {
        let mut set = FunctionSet::new();
        set.define(dummy_function("f")).unwrap();
        let removed = set.unset("f").unwrap().unwrap();
        assert_eq!(removed.name, "f");
        assert_eq!(set.get("f"), None);
        assert_eq!(set.unset("f").unwrap(), None);
    }

    #[test]
    fn unsetting_read_only_fails() {
        let mut set = FunctionSet::new();
        set.define(dummy_function("f").make_read_only(Location::dummy("ro")))
            .unwrap();
        assert!(set.unset("f").is_err());
    }
}
