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

//! Defining aliases
//!
//! This module provides data structures for defining aliases in the shell
//! execution environment. Alias substitution is performed by the parser when
//! a command word matches the name of a defined alias; the alias record
//! itself does not carry any "being expanded" state because recursion is
//! prevented by examining the provenance of the substituted characters (see
//! [`Source::Alias`](crate::source::Source::Alias)).

use crate::source::Location;
use std::borrow::Borrow;
use std::collections::HashSet;
use std::hash::Hash;
use std::hash::Hasher;
use std::rc::Rc;

/// Name-value pair that defines an alias
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Alias {
    /// Name of the alias that is matched against a command word by the syntax
    /// parser
    pub name: String,
    /// String that substitutes part of the source code when it is found to
    /// match the alias name
    pub replacement: String,
    /// Whether this alias is a global alias or not
    ///
    /// A global alias is substituted anywhere in the command line, not just
    /// in the command word position.
    pub global: bool,
    /// Position of the word in the simple command that invoked the alias
    /// built-in to define this alias
    pub origin: Location,
}

/// Wrapper of [`Alias`] for inserting into a hash set
///
/// A `HashEntry` wraps an `Alias` in `Rc` so that the alias definition can be
/// referred to even after the definition is removed. The `Hash` and
/// `PartialEq` implementations for `HashEntry` compare only names.
#[derive(Clone, Debug, Eq)]
pub struct HashEntry(pub Rc<Alias>);

impl HashEntry {
    /// Convenience method for creating a new alias definition as `HashEntry`
    pub fn new(name: String, replacement: String, global: bool, origin: Location) -> HashEntry {
        HashEntry(Rc::new(Alias {
            name,
            replacement,
            global,
            origin,
        }))
    }
}

impl PartialEq for HashEntry {
    fn eq(&self, other: &HashEntry) -> bool {
        self.0.name == other.0.name
    }
}

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

/// Collection of aliases
pub type AliasSet = HashSet<HashEntry>;

/// Interface used by the parser to look up aliases
///
/// The parser only needs read access to alias definitions; the shell
/// environment implements this trait on its alias set.
pub trait Glossary {
    /// Returns the alias definition with the given name, if any.
    fn look_up(&self, name: &str) -> Option<Rc<Alias>>;

    /// Returns whether the glossary contains no aliases.
    ///
    /// This is used by the parser to skip alias processing entirely.
    fn is_empty(&self) -> bool;
}

impl Glossary for AliasSet {
    fn look_up(&self, name: &str) -> Option<Rc<Alias>> {
        self.get(name).map(|entry| Rc::clone(&entry.0))
    }

    fn is_empty(&self) -> bool {
        HashSet::is_empty(self)
    }
}

/// Glossary that contains no aliases
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct EmptyGlossary;

impl Glossary for EmptyGlossary {
    fn look_up(&self, _name: &str) -> Option<Rc<Alias>> {
        None
    }

    fn is_empty(&self) -> bool {
        true
    }
}
