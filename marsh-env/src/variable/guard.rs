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

//! Guards that ensure contexts are popped correctly

use super::Context;
use super::VariableSet;
use crate::Env;
use std::ops::Deref;
use std::ops::DerefMut;

/// RAII-style guard that pops a variable context when dropped
///
/// The guard is created by [`VariableSet::push_context`] and allows access to
/// the borrowed variable set through `Deref`.
#[derive(Debug)]
#[must_use = "The context is popped when the guard is dropped"]
pub struct ContextGuard<'a> {
    set: &'a mut VariableSet,
}

impl VariableSet {
    /// Pushes a new context onto the stack.
    ///
    /// This function returns a guard that will pop the context when dropped.
    pub fn push_context(&mut self, context: Context) -> ContextGuard<'_> {
        self.push_context_impl(context);
        ContextGuard { set: self }
    }
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        self.set.pop_context_impl()
    }
}

impl Deref for ContextGuard<'_> {
    type Target = VariableSet;
    fn deref(&self) -> &VariableSet {
        self.set
    }
}

impl DerefMut for ContextGuard<'_> {
    fn deref_mut(&mut self) -> &mut VariableSet {
        self.set
    }
}

/// RAII-style guard that pops a variable context of an environment
///
/// The guard is created by [`Env::push_context`] and implements
/// `DerefMut<Target = Env>`, so the whole environment remains accessible
/// while the context is in effect.
#[derive(Debug)]
#[must_use = "The context is popped when the guard is dropped"]
pub struct EnvContextGuard<'a> {
    env: &'a mut Env,
}

impl Env {
    /// Pushes a new variable context onto the stack.
    ///
    /// This function is equivalent to `self.variables.push_context(context)`,
    /// but returns a guard that allows re-borrowing the `Env`.
    pub fn push_context(&mut self, context: Context) -> EnvContextGuard<'_> {
        self.variables.push_context_impl(context);
        EnvContextGuard { env: self }
    }
}

impl Drop for EnvContextGuard<'_> {
    fn drop(&mut self) {
        self.env.variables.pop_context_impl()
    }
}

impl Deref for EnvContextGuard<'_> {
    type Target = Env;
    fn deref(&self) -> &Env {
        self.env
    }
}

impl DerefMut for EnvContextGuard<'_> {
    fn deref_mut(&mut self) -> &mut Env {
        self.env
    }
}

#[cfg(test)]
mod tests {
    use super::super::Scope;
    use super::super::Value;
    use super::*;

    #[test]
    fn context_guard_pops_on_drop() {
        let mut set = VariableSet::new();
        {
            let mut guard = set.push_context(Context::default());
            guard
                .get_or_new("foo", Scope::Local)
                .assign("local", None)
                .unwrap();
            assert_eq!(
                guard.get("foo").unwrap().value,
                Some(Value::scalar("local"))
            );
        }
        assert_eq!(set.get("foo"), None);
    }
}
