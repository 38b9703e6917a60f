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

//! Module that defines the main `Variable` type

use super::Quirk;
use super::Value;
use marsh_syntax::source::Location;
use std::ops::Deref;
use thiserror::Error;

/// Case transformation applied to values on assignment
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CaseTransform {
    /// Convert the whole value to upper case.
    Upper,
    /// Convert the whole value to lower case.
    Lower,
    /// Capitalize the first character of the value.
    Capitalize,
}

impl CaseTransform {
    /// Applies the transformation to a string.
    #[must_use]
    pub fn apply(self, value: &str) -> String {
        match self {
            CaseTransform::Upper => value.to_uppercase(),
            CaseTransform::Lower => value.to_lowercase(),
            CaseTransform::Capitalize => {
                let mut chars = value.chars();
                match chars.next() {
                    None => String::new(),
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                }
            }
        }
    }
}

/// Definition of a variable
///
/// The methods of `Variable` are designed to be used in a method chain, but
/// you usually don't create a `Variable` instance directly. Instead, use
/// [`VariableSet::get_or_new`](super::VariableSet::get_or_new) or
/// [`Env::get_or_create_variable`](crate::Env::get_or_create_variable) to
/// create a variable in a variable set and obtain a mutable reference to it
/// ([`VariableRefMut`]), which allows you to modify the variable.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Variable {
    /// Value of the variable
    ///
    /// The value is `None` if the variable has been declared without
    /// assignment, or unset while keeping its attributes in a local context.
    pub value: Option<Value>,

    /// Optional location where this variable was assigned
    ///
    /// If the current variable value originates from an assignment performed
    /// in the shell session, `last_assigned_location` is the location of the
    /// assignment. Otherwise, `last_assigned_location` is `None`.
    pub last_assigned_location: Option<Location>,

    /// Whether this variable is exported or not
    ///
    /// An exported variable is also referred to as an _environment variable_.
    pub is_exported: bool,

    /// Optional location where this variable was made read-only
    ///
    /// If this variable is not read-only, `read_only_location` is `None`.
    /// Otherwise, `read_only_location` is the location of the simple command
    /// that executed the `readonly` built-in that made this variable
    /// read-only.
    pub read_only_location: Option<Location>,

    /// Whether the variable was imported from the environment on startup
    pub is_imported: bool,

    /// Whether assignments to this variable are evaluated as arithmetic
    /// expressions (`declare -i`)
    pub is_integer: bool,

    /// Whether this variable is a name reference (`declare -n`)
    ///
    /// A name reference holds the name of another variable; reads and writes
    /// resolve through it transparently.
    pub is_nameref: bool,

    /// Case transformation applied on assignment (`declare -l`/`-u`)
    pub case_transform: Option<CaseTransform>,

    /// Special characteristics of the variable
    ///
    /// See [`Quirk`] and [`expand`](Self::expand) for details.
    pub quirk: Option<Quirk>,
}

impl Variable {
    /// Creates a new scalar variable from a string.
    ///
    /// The returned variable's other fields are defaulted.
    #[must_use]
    pub fn new<S: Into<String>>(value: S) -> Self {
        Variable {
            value: Some(Value::scalar(value)),
            ..Default::default()
        }
    }

    /// Creates a new array variable.
    #[must_use]
    pub fn new_array<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Variable {
            value: Some(Value::array(values)),
            ..Default::default()
        }
    }

    /// Sets the `is_exported` flag.
    ///
    /// This is a convenience function for doing `self.is_exported = true` in
    /// a method chain.
    #[inline]
    #[must_use]
    pub fn export(mut self) -> Self {
        self.is_exported = true;
        self
    }

    /// Marks the variable imported from the environment.
    #[inline]
    #[must_use]
    pub fn imported(mut self) -> Self {
        self.is_imported = true;
        self
    }

    /// Makes the variable read-only.
    #[inline]
    #[must_use]
    pub fn make_read_only(mut self, location: Location) -> Self {
        self.read_only_location = Some(location);
        self
    }

    /// Whether this variable is read-only or not.
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        self.read_only_location.is_some()
    }
}

/// Error that occurs when assigning a value to a read-only variable
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("cannot assign to read-only variable")]
pub struct AssignError {
    /// Value that was being assigned
    pub new_value: Value,
    /// Location of the failed assignment
    pub assigned_location: Option<Location>,
    /// Location where the variable was made read-only
    pub read_only_location: Location,
}

/// Managed mutable reference to a variable
///
/// This type allows you to mutate a variable in a variable set while
/// maintaining the invariants of the variable set.
#[derive(Debug, Eq, PartialEq)]
pub struct VariableRefMut<'a>(&'a mut Variable);

impl<'a> From<&'a mut Variable> for VariableRefMut<'a> {
    fn from(variable: &'a mut Variable) -> Self {
        VariableRefMut(variable)
    }
}

impl Deref for VariableRefMut<'_> {
    type Target = Variable;

    fn deref(&self) -> &Variable {
        self.0
    }
}

impl VariableRefMut<'_> {
    /// Assigns a value to this variable.
    ///
    /// The `value` and `location` operands are set to the `value` and
    /// `last_assigned_location` fields of this variable, respectively.
    /// If the variable has a [case transformation](CaseTransform), it is
    /// applied to scalar values. If successful, this function returns the
    /// previous value and location.
    ///
    /// This function fails if this variable is read-only. In that case, the
    /// error contains the given operands as well as the location where this
    /// variable was made read-only.
    ///
    /// Assigning a value drops any [`Quirk`] the variable had, so that e.g.
    /// `RANDOM=` makes the variable an ordinary variable thereafter is *not*
    /// the standard behavior; the caller decides whether to keep the quirk
    /// by reinstalling it (see the special-name assignment hooks).
    #[inline]
    pub fn assign<V: Into<Value>, L: Into<Option<Location>>>(
        &mut self,
        value: V,
        location: L,
    ) -> Result<(Option<Value>, Option<Location>), AssignError> {
        self.assign_impl(value.into(), location.into())
    }

    fn assign_impl(
        &mut self,
        mut value: Value,
        location: Option<Location>,
    ) -> Result<(Option<Value>, Option<Location>), AssignError> {
        if let Some(read_only_location) = self.0.read_only_location.clone() {
            return Err(AssignError {
                new_value: value,
                assigned_location: location,
                read_only_location,
            });
        }

        if let Some(transform) = self.0.case_transform {
            if let Value::Scalar(scalar) = &value {
                value = Value::Scalar(transform.apply(scalar));
            }
        }

        let old_value = std::mem::replace(&mut self.0.value, Some(value));
        let old_location = std::mem::replace(&mut self.0.last_assigned_location, location);
        Ok((old_value, old_location))
    }

    /// Removes the value of this variable, keeping its attributes.
    pub fn unset_value(&mut self) {
        self.0.value = None;
    }

    /// Sets whether this variable is exported or not.
    pub fn export(&mut self, is_exported: bool) {
        self.0.is_exported = is_exported;
    }

    /// Sets whether this variable was imported from the environment.
    pub fn import(&mut self, is_imported: bool) {
        self.0.is_imported = is_imported;
    }

    /// Makes this variable read-only.
    ///
    /// The `location` operand is set to the `read_only_location` field of
    /// this variable unless this variable is already read-only.
    pub fn make_read_only(&mut self, location: Location) {
        self.0.read_only_location.get_or_insert(location);
    }

    /// Sets the integer attribute of this variable.
    pub fn set_integer(&mut self, is_integer: bool) {
        self.0.is_integer = is_integer;
    }

    /// Sets the nameref attribute of this variable.
    pub fn set_nameref(&mut self, is_nameref: bool) {
        self.0.is_nameref = is_nameref;
    }

    /// Sets the case transformation of this variable.
    pub fn set_case_transform(&mut self, transform: Option<CaseTransform>) {
        self.0.case_transform = transform;
    }

    /// Sets the quirk of this variable.
    ///
    /// This function overwrites any existing quirk of this variable.
    pub fn set_quirk(&mut self, quirk: Option<Quirk>) {
        self.0.quirk = quirk;
    }
}
