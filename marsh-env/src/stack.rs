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

//! Runtime execution context stack
//!
//! The ["stack"](Stack) traces the state of execution context at runtime.
//! For example, when entering a subshell, the executor pushes
//! `Frame::Subshell` to the stack. By examining the stack, commands executed
//! in the subshell can detect that they are inside the subshell.
//!
//! This module provides guards to ensure stack frames are pushed and popped
//! correctly. The push function returns a guard that will pop the frame when
//! dropped. Implementing `Deref` and `DerefMut`, the guard allows access to
//! the borrowed stack or environment.

use crate::semantics::ExitStatus;
use crate::semantics::Field;
use crate::trap::Condition;
use crate::Env;
use std::ops::Deref;
use std::ops::DerefMut;

/// Element of the runtime execution context stack
#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    /// For, while, or until loop
    Loop,

    /// Function call
    Function {
        /// Name of the called function
        name: Field,
    },

    /// Subshell
    Subshell,

    /// Context where the `ErrExit` option is ignored
    ///
    /// This frame is pushed when executing negated commands, the condition
    /// part of and-or lists, and the conditions of the `if`, `while`, and
    /// `until` commands.
    Condition,

    /// Built-in utility
    Builtin {
        /// Name of the built-in
        name: Field,

        /// Whether the utility acts as a special built-in
        ///
        /// This value determines whether an error in the built-in interrupts
        /// the shell. This will be false if a special built-in is executed
        /// through the `command` built-in.
        is_special: bool,
    },

    /// Trap handler
    Trap {
        /// Condition that triggered the trap
        condition: Condition,
        /// Exit status saved just before entering the trap
        previous_exit_status: ExitStatus,
    },

    /// Script sourced with the dot built-in
    DotScript,
}

/// Runtime execution context stack
///
/// You can access the inner vector of the stack via the `Deref`
/// implementation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Stack {
    inner: Vec<Frame>,
}

impl Deref for Stack {
    type Target = Vec<Frame>;
    fn deref(&self) -> &Vec<Frame> {
        &self.inner
    }
}

/// RAII-style guard that makes sure a stack frame is popped properly
///
/// The guard object is created by [`Stack::push`].
#[derive(Debug)]
#[must_use = "The frame is popped when the guard is dropped"]
pub struct StackFrameGuard<'a> {
    stack: &'a mut Stack,
}

impl Stack {
    /// Pushes a new frame to the stack.
    ///
    /// This function returns a frame guard that will pop the frame when
    /// dropped.
    #[inline]
    pub fn push(&mut self, frame: Frame) -> StackFrameGuard<'_> {
        self.inner.push(frame);
        StackFrameGuard { stack: self }
    }

    /// Returns the number of enclosing loops.
    ///
    /// This function returns the number of lexically enclosing `for`,
    /// `while`, and `until` loops in the current execution environment. That
    /// is, the result is the count of `Frame::Loop`s pushed after the last
    /// subshell or function-call frame: a `break` must not break loops of a
    /// calling function or a parent shell environment.
    ///
    /// The function stops counting when `max_count` is reached. Pass
    /// `usize::MAX` to count all loops.
    #[must_use]
    pub fn loop_count(&self, max_count: usize) -> usize {
        self.inner
            .iter()
            .rev()
            .take_while(|frame| {
                !matches!(frame, Frame::Subshell | Frame::Function { .. })
            })
            .filter(|frame| matches!(frame, Frame::Loop))
            .take(max_count)
            .count()
    }

    /// Tests whether the current context is in a trap handler, with no
    /// intervening subshell.
    #[must_use]
    pub fn in_trap(&self) -> bool {
        self.inner
            .iter()
            .rev()
            .take_while(|frame| !matches!(frame, Frame::Subshell))
            .any(|frame| matches!(frame, Frame::Trap { .. }))
    }

    /// Returns the name of the innermost function call frame, if any.
    #[must_use]
    pub fn current_function_name(&self) -> Option<&Field> {
        self.inner.iter().rev().find_map(|frame| match frame {
            Frame::Function { name } => Some(name),
            _ => None,
        })
    }
}

/// When the guard is dropped, the stack frame that was pushed when creating
/// the guard is popped.
impl Drop for StackFrameGuard<'_> {
    fn drop(&mut self) {
        self.stack.inner.pop().unwrap();
    }
}

impl Deref for StackFrameGuard<'_> {
    type Target = Stack;
    fn deref(&self) -> &Stack {
        self.stack
    }
}

impl DerefMut for StackFrameGuard<'_> {
    fn deref_mut(&mut self) -> &mut Stack {
        self.stack
    }
}

/// RAII-style guard that makes sure a stack frame is popped properly
///
/// The guard object is created by [`Env::push_frame`].
#[derive(Debug)]
#[must_use = "The frame is popped when the guard is dropped"]
pub struct EnvFrameGuard<'a> {
    env: &'a mut Env,
}

impl Env {
    /// Pushes a new frame to the runtime execution context stack.
    ///
    /// This function is equivalent to `self.stack.push(frame)`, but returns
    /// an `EnvFrameGuard` that allows re-borrowing the `Env`.
    #[inline]
    pub fn push_frame(&mut self, frame: Frame) -> EnvFrameGuard<'_> {
        self.stack.inner.push(frame);
        EnvFrameGuard { env: self }
    }
}

/// When the guard is dropped, the stack frame that was pushed when creating
/// the guard is popped.
impl Drop for EnvFrameGuard<'_> {
    fn drop(&mut self) {
        self.env.stack.inner.pop().unwrap();
    }
}

impl Deref for EnvFrameGuard<'_> {
    type Target = Env;
    fn deref(&self) -> &Env {
        self.env
    }
}

impl DerefMut for EnvFrameGuard<'_> {
    fn deref_mut(&mut self) -> &mut Env {
        self.env
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loop_count_empty() {
        let stack = Stack::default();
        assert_eq!(stack.loop_count(usize::MAX), 0);
    }

    #[test]
    fn loop_count_with_loops() {
        let mut stack = Stack::default();
        let mut stack = stack.push(Frame::Loop);
        assert_eq!(stack.loop_count(usize::MAX), 1);
        let mut stack = stack.push(Frame::Condition);
        assert_eq!(stack.loop_count(usize::MAX), 1);
        let stack = stack.push(Frame::Loop);
        assert_eq!(stack.loop_count(usize::MAX), 2);
        assert_eq!(stack.loop_count(1), 1);
    }

    #[test]
    fn loop_count_stops_at_subshell() {
        let mut stack = Stack::default();
        let mut stack = stack.push(Frame::Loop);
        let mut stack = stack.push(Frame::Subshell);
        assert_eq!(stack.loop_count(usize::MAX), 0);
        let stack = stack.push(Frame::Loop);
        assert_eq!(stack.loop_count(usize::MAX), 1);
    }

    #[test]
    fn loop_count_stops_at_function_call() {
        let mut stack = Stack::default();
        let mut stack = stack.push(Frame::Loop);
        let stack = stack.push(Frame::Function {
            name: Field::dummy("f"),
        });
        assert_eq!(stack.loop_count(usize::MAX), 0);
    }

    #[test]
    fn in_trap_detection() {
        let mut stack = Stack::default();
        assert!(!stack.in_trap());
        let mut stack = stack.push(Frame::Trap {
            condition: Condition::Exit,
            previous_exit_status: ExitStatus::SUCCESS,
        });
        assert!(stack.in_trap());
        let stack = stack.push(Frame::Subshell);
        assert!(!stack.in_trap());
    }
}
