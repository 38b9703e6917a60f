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

//! Items for shell variables
//!
//! A [`Variable`] is a named parameter that can be assigned and exported. It
//! is defined in a context of a variable set. A [`VariableSet`] is a stack of
//! contexts that can be pushed and popped. Each context has a map of
//! name-variable pairs that effectively manages the variables.
//!
//! # Variable sets and contexts
//!
//! The variable set is a component of the shell environment
//! ([`Env`](crate::Env)). It contains a non-empty stack of contexts. The
//! first context in the stack is called the _base context_, and it is always
//! present. Other contexts can be pushed and popped on a last-in-first-out
//! basis.
//!
//! Each context is a map of name-variable pairs. Variables in a context hide
//! those with the same name in lower contexts. You cannot access such hidden
//! variables until the hiding variables are removed or the context
//! containing them is popped.
//!
//! There are two types of [`Context`]s: regular and volatile. A regular
//! context is the default context type and may have positional parameters.
//! A volatile context is used for holding temporary variables when executing
//! a built-in or function. The context types and [`Scope`] affect the
//! behavior of variable assignment. The base context is always a regular
//! context.
//!
//! # Name references
//!
//! A variable with the nameref attribute holds the name of another variable.
//! [`VariableSet::resolve_nameref`] follows chains of namerefs with a fixed
//! hop bound; on overflow, the caller reports a warning once and resolves
//! the last name in the global scope without further indirection.

use crate::semantics::Field;
use itertools::Itertools;
use marsh_syntax::source::Location;
use std::borrow::Borrow;
use std::borrow::Cow;
use std::collections::hash_map::Entry::{Occupied, Vacant};
use std::collections::HashMap;
use std::ffi::CString;
use std::fmt::Write;
use std::hash::Hash;
use std::iter::FusedIterator;
use thiserror::Error;

mod value;

pub use self::value::Value::{self, Assoc, Indexed, Scalar};

mod main;

pub use self::main::AssignError;
pub use self::main::CaseTransform;
pub use self::main::Variable;
pub use self::main::VariableRefMut;

mod quirk;

pub use self::quirk::Expansion;
pub use self::quirk::Quirk;
pub use self::quirk::QuirkContext;

mod constants;

pub use self::constants::*;

mod guard;

pub use self::guard::ContextGuard;
pub use self::guard::EnvContextGuard;

/// Maximum number of hops followed when resolving a nameref chain
pub const NAMEREF_MAX_HOPS: usize = 8;

/// Prefix of the names that encode exported functions in the environment
pub const FUNCTION_PREFIX: &str = "MARSH_FUNC_";
/// Suffix of the names that encode exported functions in the environment
pub const FUNCTION_SUFFIX: &str = "%%";

#[derive(Clone, Debug, Eq, PartialEq)]
struct VariableInContext {
    variable: Variable,
    context_index: usize,
}

/// Positional parameters
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PositionalParams {
    /// Values of positional parameters
    pub values: Vec<String>,
    /// Location of the last modification of positional parameters
    pub last_modified_location: Option<Location>,
}

impl PositionalParams {
    /// Creates a `PositionalParams` instance from fields.
    pub fn from_fields<I>(fields: I) -> Self
    where
        I: IntoIterator<Item = Field>,
    {
        let fields = fields.into_iter();
        let mut last_modified_location = None;
        let values = fields
            .map(|field| {
                last_modified_location.get_or_insert(field.origin);
                field.value
            })
            .collect();
        Self {
            values,
            last_modified_location,
        }
    }
}

/// Variable context
///
/// This enum defines the type of a context. The context type affects the
/// behavior of variable [assignment](VariableRefMut::assign). A regular
/// context is the default context type and may have positional parameters. A
/// volatile context is used for holding temporary variables when executing a
/// built-in or function.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Context {
    /// Context for normal assignments
    ///
    /// The base context is a regular context. Every function invocation also
    /// creates a regular context for local assignments and positional
    /// parameters.
    Regular { positional_params: PositionalParams },

    /// Context for temporary assignments
    ///
    /// A volatile context is used for holding temporary variables when
    /// executing a built-in or function.
    Volatile,
}

impl Default for Context {
    fn default() -> Self {
        Context::Regular {
            positional_params: Default::default(),
        }
    }
}

/// Choice of a context in which a variable is assigned or searched for
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Scope {
    Global,
    Local,
    Volatile,
}

/// Error that occurs when unsetting a read-only variable
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("cannot unset read-only variable `{name}`")]
pub struct UnsetError<'a> {
    /// Variable name
    pub name: &'a str,
    /// Location where the existing variable was made read-only
    pub read_only_location: &'a Location,
}

/// Result of nameref resolution
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum NamerefResolution<'a> {
    /// The chain resolved to the name.
    Resolved(Cow<'a, str>),
    /// The hop bound was exceeded.
    ///
    /// The caller should warn once and resolve the name in the global scope
    /// without following any further nameref.
    OverBound(Cow<'a, str>),
}

/// Collection of variables
///
/// See the [module documentation](self) for details.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VariableSet {
    /// Hash map containing all variables
    ///
    /// The value of a hash map entry is a stack of variables defined in
    /// contexts, sorted in the ascending order of the context index.
    ///
    /// Having the variables of all the contexts in this single hash map makes
    /// the variable search faster than having a separate hash map for each
    /// context.
    all_variables: HashMap<String, Vec<VariableInContext>>,

    /// Stack of contexts
    ///
    /// The stack can never be empty since the base context is always the
    /// first item.
    contexts: Vec<Context>,
}

impl Default for VariableSet {
    fn default() -> Self {
        VariableSet {
            all_variables: Default::default(),
            contexts: vec![Context::default()],
        }
    }
}

/// Iterator of variables
///
/// [`VariableSet::iter`] returns this iterator.
#[derive(Clone, Debug)]
pub struct Iter<'a> {
    inner: std::collections::hash_map::Iter<'a, String, Vec<VariableInContext>>,
    min_context_index: usize,
}

impl VariableSet {
    /// Creates an empty variable set.
    #[must_use]
    pub fn new() -> VariableSet {
        Default::default()
    }

    /// Gets a reference to the variable with the specified name.
    ///
    /// If variables with the same name are defined in multiple contexts, the
    /// one in the topmost context is returned.
    #[must_use]
    pub fn get<N>(&self, name: &N) -> Option<&Variable>
    where
        String: Borrow<N>,
        N: Hash + Eq + ?Sized,
    {
        Some(&self.all_variables.get(name)?.last()?.variable)
    }

    /// Computes the index of the topmost regular context.
    fn index_of_topmost_regular_context(contexts: &[Context]) -> usize {
        contexts
            .iter()
            .rposition(|context| matches!(context, Context::Regular { .. }))
            .expect("base context has gone")
    }

    /// Computes the index of the context that matches the specified scope.
    fn index_of_context(scope: Scope, contexts: &[Context]) -> usize {
        match scope {
            Scope::Global => 0,
            Scope::Local => Self::index_of_topmost_regular_context(contexts),
            Scope::Volatile => Self::index_of_topmost_regular_context(contexts) + 1,
        }
    }

    /// Gets a mutable reference to the variable with the specified name,
    /// creating a defaulted one if none exists.
    ///
    /// The `scope` parameter determines the context the variable is searched
    /// for or created in:
    ///
    /// - `Global`: like [`get`](Self::get), but a variable found in a
    ///   volatile context is moved down to the topmost regular context that
    ///   contains the variable, or to the base context.
    /// - `Local`: only the topmost regular context and any volatile contexts
    ///   above it are considered; a new variable is created in the topmost
    ///   regular context.
    /// - `Volatile`: the topmost context must be volatile; a new variable is
    ///   created there, cloning any visible variable of the same name.
    #[inline]
    pub fn get_or_new<S: Into<String>>(&mut self, name: S, scope: Scope) -> VariableRefMut {
        self.get_or_new_impl(name.into(), scope)
    }

    fn get_or_new_impl(&mut self, name: String, scope: Scope) -> VariableRefMut {
        let stack = match self.all_variables.entry(name) {
            Vacant(vacant) => vacant.insert(Vec::new()),
            Occupied(occupied) => occupied.into_mut(),
        };
        let context_index = match scope {
            Scope::Global => 0,
            Scope::Local => Self::index_of_topmost_regular_context(&self.contexts),
            Scope::Volatile => self.contexts.len() - 1,
        };

        match scope {
            Scope::Global | Scope::Local => 'branch: {
                let mut removed_volatile_variable = None;

                // Search the stack for a variable to return, and add one if
                // not found. If a variable is in a volatile context,
                // temporarily move it to removed_volatile_variable and put
                // it in the target context before returning it.
                while let Some(var) = stack.last_mut() {
                    if var.context_index < context_index {
                        break;
                    }
                    match self.contexts[var.context_index] {
                        Context::Regular { .. } => {
                            if let Some(removed_volatile_variable) = removed_volatile_variable {
                                var.variable = removed_volatile_variable;
                            }
                            break 'branch;
                        }
                        Context::Volatile => {
                            removed_volatile_variable.get_or_insert(stack.pop().unwrap().variable);
                        }
                    }
                }

                stack.push(VariableInContext {
                    variable: removed_volatile_variable.unwrap_or_default(),
                    context_index,
                });
            }

            Scope::Volatile => {
                assert_eq!(
                    self.contexts[context_index],
                    Context::Volatile,
                    "no volatile context to store the variable",
                );
                if let Some(var) = stack.last() {
                    if var.context_index != context_index {
                        stack.push(VariableInContext {
                            variable: var.variable.clone(),
                            context_index,
                        });
                    }
                } else {
                    stack.push(VariableInContext {
                        variable: Variable::default(),
                        context_index,
                    });
                }
            }
        }

        VariableRefMut::from(&mut stack.last_mut().unwrap().variable)
    }

    /// Gets the value of the specified scalar variable.
    ///
    /// If the variable is unset or an array, this method returns `None`.
    ///
    /// Note that this function does not apply any [`Quirk`] the variable may
    /// have. Use [`Variable::expand`] to apply quirks.
    #[must_use]
    pub fn get_scalar<N>(&self, name: &N) -> Option<&str>
    where
        String: Borrow<N>,
        N: Hash + Eq + ?Sized,
    {
        self.get(name)?.value.as_ref()?.as_scalar()
    }

    /// Resolves a possible nameref chain starting at the given name.
    ///
    /// If the named variable does not have the nameref attribute, the name
    /// itself is returned. Chains longer than [`NAMEREF_MAX_HOPS`] result in
    /// [`NamerefResolution::OverBound`].
    #[must_use]
    pub fn resolve_nameref<'a>(&self, name: &'a str) -> NamerefResolution<'a> {
        let mut current = Cow::Borrowed(name);
        for _ in 0..NAMEREF_MAX_HOPS {
            match self.get(current.as_ref()) {
                Some(variable) if variable.is_nameref => {
                    match variable.value.as_ref().and_then(Value::as_scalar) {
                        Some(target) if !target.is_empty() => {
                            current = Cow::Owned(target.to_owned());
                        }
                        _ => return NamerefResolution::Resolved(current),
                    }
                }
                _ => return NamerefResolution::Resolved(current),
            }
        }
        NamerefResolution::OverBound(current)
    }

    /// Unsets a variable.
    ///
    /// If successful, the return value is the previous value. If the
    /// specified variable is read-only, this function fails with
    /// [`UnsetError`].
    ///
    /// The behavior of unsetting depends on the `scope`:
    ///
    /// - `Global`: the variable is removed from all contexts.
    /// - `Local`: the variable is removed from the topmost regular context
    ///   and any volatile context above it. If the variable is local to the
    ///   current function, its attributes are kept with the value unset so
    ///   that a later assignment reuses them.
    /// - `Volatile`: the variable is removed from volatile contexts above
    ///   the topmost regular context.
    pub fn unset<'a>(
        &'a mut self,
        name: &'a str,
        scope: Scope,
    ) -> Result<Option<Variable>, UnsetError<'a>> {
        let index = Self::index_of_context(scope, &self.contexts);
        let Some(stack) = self.all_variables.get_mut(name) else {
            return Ok(None);
        };

        if let Some(read_only_position) = stack[..]
            .iter()
            .rposition(|vic| vic.context_index >= index && vic.variable.is_read_only())
        {
            let read_only_location = &stack[read_only_position].variable.read_only_location;
            return Err(UnsetError {
                name,
                read_only_location: read_only_location.as_ref().unwrap(),
            });
        }

        let start = stack
            .iter()
            .position(|vic| vic.context_index >= index)
            .unwrap_or(stack.len());
        Ok(stack.drain(start..).next_back().map(|vic| vic.variable))
    }

    /// Returns an iterator of visible variables.
    ///
    /// The `scope` parameter chooses variables returned by the iterator:
    ///
    /// - `Global`: all variables
    /// - `Local`: variables in the topmost regular context or above
    /// - `Volatile`: variables above the topmost regular context
    ///
    /// In all cases, the iterator ignores variables hidden by another.
    /// The order of iterated variables is unspecified.
    pub fn iter(&self, scope: Scope) -> Iter {
        Iter {
            inner: self.all_variables.iter(),
            min_context_index: Self::index_of_context(scope, &self.contexts),
        }
    }

    /// Returns environment variables in a new vector of C strings.
    ///
    /// The result contains a `NAME=VALUE` entry for every exported variable
    /// with a valid name and a value. Array values are joined with colons.
    #[must_use]
    pub fn env_c_strings(&self) -> Vec<CString> {
        self.all_variables
            .iter()
            .filter_map(|(name, vars)| {
                let var = &vars.last()?.variable;
                let value = var.value.as_ref().filter(|_| var.is_exported)?;
                if !is_valid_name(name) {
                    return None;
                }
                let mut result = name.clone();
                result.push('=');
                match value {
                    Scalar(value) => result.push_str(value),
                    Indexed(_) | Assoc(_) => {
                        write!(result, "{}", value.iter_values().format(":")).ok()?
                    }
                }
                CString::new(result).ok()
            })
            .collect()
    }

    /// Imports environment variables from an iterator.
    ///
    /// This function assigns the values to the variable set, overwriting
    /// existing variables. The variables are marked exported and imported.
    pub fn extend_env<I, K, V>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in vars {
            let mut var = self.get_or_new(name, Scope::Global);
            if var.assign(value.into(), None).is_ok() {
                var.export(true);
                var.import(true);
            }
        }
    }

    /// Initializes default variables.
    ///
    /// This function assigns the following variables to `self`:
    ///
    /// - `IFS=' \t\n'`
    /// - `OPTIND=1`
    /// - `PS1='$ '`, `PS2='> '`, `PS4='+ '`
    /// - `LINENO`, `RANDOM`, `SECONDS`, `EPOCHSECONDS` (dynamic)
    ///
    /// The `seed` parameter seeds the `RANDOM` generator.
    pub fn init(&mut self, seed: u32) {
        const VARIABLES: &[(&str, &str)] = &[
            (IFS, IFS_INITIAL_VALUE),
            (OPTIND, OPTIND_INITIAL_VALUE),
            (PS1, PS1_INITIAL_VALUE),
            (PS2, PS2_INITIAL_VALUE),
            (PS4, PS4_INITIAL_VALUE),
        ];
        for &(name, value) in VARIABLES {
            self.get_or_new(name, Scope::Global)
                .assign(value, None)
                .ok();
        }

        self.get_or_new(LINENO, Scope::Global)
            .set_quirk(Some(Quirk::LineNumber));
        self.get_or_new(RANDOM, Scope::Global)
            .set_quirk(Some(Quirk::random(seed)));
        self.get_or_new(SECONDS, Scope::Global)
            .set_quirk(Some(Quirk::seconds(0)));
        self.get_or_new(EPOCHSECONDS, Scope::Global)
            .set_quirk(Some(Quirk::EpochSeconds));
    }

    /// Returns a reference to the positional parameters.
    ///
    /// Every regular context starts with an empty array of positional
    /// parameters, and volatile contexts cannot have positional parameters.
    /// This function returns a reference to the positional parameters of the
    /// topmost regular context.
    #[must_use]
    pub fn positional_params(&self) -> &PositionalParams {
        self.contexts
            .iter()
            .rev()
            .find_map(|context| match context {
                Context::Regular { positional_params } => Some(positional_params),
                Context::Volatile => None,
            })
            .expect("base context has gone")
    }

    /// Returns a mutable reference to the positional parameters.
    #[must_use]
    pub fn positional_params_mut(&mut self) -> &mut PositionalParams {
        self.contexts
            .iter_mut()
            .rev()
            .find_map(|context| match context {
                Context::Regular { positional_params } => Some(positional_params),
                Context::Volatile => None,
            })
            .expect("base context has gone")
    }

    pub(crate) fn push_context_impl(&mut self, context: Context) {
        self.contexts.push(context);
    }

    pub(crate) fn pop_context_impl(&mut self) {
        debug_assert!(!self.contexts.is_empty());
        assert_ne!(self.contexts.len(), 1, "cannot pop the base context");
        self.contexts.pop();
        self.all_variables.retain(|_, stack| {
            if let Some(vic) = stack.last() {
                if vic.context_index >= self.contexts.len() {
                    stack.pop();
                }
            }
            !stack.is_empty()
        })
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a str, &'a Variable);

    fn next(&mut self) -> Option<(&'a str, &'a Variable)> {
        loop {
            let next = self.inner.next()?;
            if let Some(variable) = next.1.last() {
                if variable.context_index >= self.min_context_index {
                    return Some((next.0, &variable.variable));
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let (_min, max) = self.inner.size_hint();
        (0, max)
    }
}

impl FusedIterator for Iter<'_> {}

/// Tests whether the given string is a valid variable name.
#[must_use]
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name
            .chars()
            .all(|c| c == '_' || c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_variable_in_global_scope() {
        let mut set = VariableSet::new();
        set.push_context_impl(Context::default());
        set.push_context_impl(Context::Volatile);

        let mut var = set.get_or_new("foo", Scope::Global);

        assert_eq!(*var, Variable::default());
        var.assign("VALUE", None).unwrap();
        set.pop_context_impl();
        set.pop_context_impl();
        // The global variable still exists.
        assert_eq!(set.get("foo").unwrap().value, Some(Value::scalar("VALUE")));
    }

    #[test]
    fn local_variables_are_popped_with_context() {
        let mut set = VariableSet::new();
        set.push_context_impl(Context::default());

        let mut var = set.get_or_new("foo", Scope::Local);
        var.assign("INNER", None).unwrap();
        assert_eq!(set.get("foo").unwrap().value, Some(Value::scalar("INNER")));

        set.pop_context_impl();
        assert_eq!(set.get("foo"), None);
    }

    #[test]
    fn local_variable_shadows_global() {
        let mut set = VariableSet::new();
        let mut var = set.get_or_new("x", Scope::Global);
        var.assign("global", None).unwrap();

        set.push_context_impl(Context::default());
        let mut var = set.get_or_new("x", Scope::Local);
        var.assign("local", None).unwrap();
        assert_eq!(set.get("x").unwrap().value, Some(Value::scalar("local")));

        // A global-scope assignment from inside the function finds the local.
        let mut var = set.get_or_new("x", Scope::Global);
        assert_eq!(var.value, Some(Value::scalar("local")));
        var.assign("updated", None).unwrap();

        set.pop_context_impl();
        assert_eq!(set.get("x").unwrap().value, Some(Value::scalar("global")));
    }

    #[test]
    fn volatile_variable_does_not_survive_context() {
        let mut set = VariableSet::new();
        set.push_context_impl(Context::Volatile);
        let mut var = set.get_or_new("foo", Scope::Volatile);
        var.assign("VOLATILE", None).unwrap();
        assert_eq!(
            set.get("foo").unwrap().value,
            Some(Value::scalar("VOLATILE"))
        );
        set.pop_context_impl();
        assert_eq!(set.get("foo"), None);
    }

    #[test]
    fn volatile_clone_does_not_modify_original() {
        let mut set = VariableSet::new();
        let mut var = set.get_or_new("foo", Scope::Global);
        var.assign("VALUE", None).unwrap();
        set.push_context_impl(Context::Volatile);

        let mut var = set.get_or_new("foo", Scope::Volatile);
        var.export(true);
        assert!(set.get("foo").unwrap().is_exported);

        set.pop_context_impl();
        assert!(!set.get("foo").unwrap().is_exported);
    }

    #[test]
    fn global_assignment_moves_volatile_variable_down() {
        let mut set = VariableSet::new();
        set.push_context_impl(Context::Volatile);
        let mut var = set.get_or_new("foo", Scope::Volatile);
        var.assign("TEMP", None).unwrap();

        let var = set.get_or_new("foo", Scope::Global);
        assert_eq!(var.value, Some(Value::scalar("TEMP")));

        set.pop_context_impl();
        assert_eq!(set.get("foo").unwrap().value, Some(Value::scalar("TEMP")));
    }

    #[test]
    fn unset_global() {
        let mut set = VariableSet::new();
        set.get_or_new("foo", Scope::Global)
            .assign("VALUE", None)
            .unwrap();
        let old = set.unset("foo", Scope::Global).unwrap().unwrap();
        assert_eq!(old.value, Some(Value::scalar("VALUE")));
        assert_eq!(set.get("foo"), None);
    }

    #[test]
    fn unset_readonly_fails() {
        let mut set = VariableSet::new();
        let mut var = set.get_or_new("foo", Scope::Global);
        var.assign("VALUE", None).unwrap();
        var.make_read_only(Location::dummy("readonly"));
        let error = set.unset("foo", Scope::Global).unwrap_err();
        assert_eq!(error.name, "foo");
    }

    #[test]
    fn unset_local_does_not_touch_global() {
        let mut set = VariableSet::new();
        set.get_or_new("foo", Scope::Global)
            .assign("GLOBAL", None)
            .unwrap();
        set.push_context_impl(Context::default());
        set.get_or_new("foo", Scope::Local)
            .assign("LOCAL", None)
            .unwrap();

        set.unset("foo", Scope::Local).unwrap();
        assert_eq!(set.get("foo").unwrap().value, Some(Value::scalar("GLOBAL")));
    }

    #[test]
    fn nameref_resolution() {
        let mut set = VariableSet::new();
        let mut var = set.get_or_new("r", Scope::Global);
        var.assign("v", None).unwrap();
        var.set_nameref(true);

        assert_eq!(
            set.resolve_nameref("r"),
            NamerefResolution::Resolved(Cow::Owned("v".to_owned()))
        );
        assert_eq!(
            set.resolve_nameref("v"),
            NamerefResolution::Resolved(Cow::Borrowed("v"))
        );
    }

    #[test]
    fn nameref_chain() {
        let mut set = VariableSet::new();
        let mut var = set.get_or_new("a", Scope::Global);
        var.assign("b", None).unwrap();
        var.set_nameref(true);
        let mut var = set.get_or_new("b", Scope::Global);
        var.assign("c", None).unwrap();
        var.set_nameref(true);

        assert_eq!(
            set.resolve_nameref("a"),
            NamerefResolution::Resolved(Cow::Owned("c".to_owned()))
        );
    }

    #[test]
    fn nameref_cycle_is_bounded() {
        let mut set = VariableSet::new();
        let mut var = set.get_or_new("x", Scope::Global);
        var.assign("y", None).unwrap();
        var.set_nameref(true);
        let mut var = set.get_or_new("y", Scope::Global);
        var.assign("x", None).unwrap();
        var.set_nameref(true);

        assert!(matches!(
            set.resolve_nameref("x"),
            NamerefResolution::OverBound(_)
        ));
    }

    #[test]
    fn env_c_strings_contains_exported_only() {
        let mut set = VariableSet::new();
        let mut var = set.get_or_new("FOO", Scope::Global);
        var.assign("1", None).unwrap();
        var.export(true);
        set.get_or_new("BAR", Scope::Global)
            .assign("2", None)
            .unwrap();

        let strings = set.env_c_strings();
        assert_eq!(strings, [CString::new("FOO=1").unwrap()]);
    }

    #[test]
    fn env_c_strings_skips_invalid_names() {
        let mut set = VariableSet::new();
        let mut var = set.get_or_new("1BAD", Scope::Global);
        var.assign("x", None).unwrap();
        var.export(true);
        assert_eq!(set.env_c_strings(), []);
    }

    #[test]
    fn env_c_strings_joins_arrays_with_colons() {
        let mut set = VariableSet::new();
        let mut var = set.get_or_new("A", Scope::Global);
        var.assign(Value::array(["x", "y"]), None).unwrap();
        var.export(true);
        assert_eq!(set.env_c_strings(), [CString::new("A=x:y").unwrap()]);
    }

    #[test]
    fn positional_params_per_context() {
        let mut set = VariableSet::new();
        set.positional_params_mut().values = vec!["1".to_owned()];
        set.push_context_impl(Context::default());
        assert_eq!(set.positional_params().values, [] as [String; 0]);
        set.positional_params_mut().values = vec!["a".to_owned(), "b".to_owned()];
        set.pop_context_impl();
        assert_eq!(set.positional_params().values, ["1"]);
    }

    #[test]
    fn valid_names() {
        assert!(is_valid_name("foo"));
        assert!(is_valid_name("_x9"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("9x"));
        assert!(!is_valid_name("a-b"));
    }
}
