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

//! Type definitions for built-in utilities
//!
//! This module provides data types for defining built-in utilities.
//!
//! Note that concrete implementations of built-ins are not included in the
//! `marsh-env` crate. For implementations of specific built-ins like `cd`
//! and `export`, see the `marsh-builtin` crate.

use crate::semantics::Divert;
use crate::semantics::ExitStatus;
use crate::semantics::Field;
use crate::Env;
use std::ops::ControlFlow::{self, Continue};

/// Types of built-in utilities
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Type {
    /// Special built-in
    ///
    /// Special built-in utilities are defined in POSIX XCU section 2.14.
    /// They are treated differently from other built-ins: they are found in
    /// the first stage of command search without the `$PATH` search and
    /// cannot be overridden by functions, their variable assignments
    /// persist, and many of their errors interrupt a non-interactive shell.
    Special,

    /// Standard utility that can be used without `$PATH` search
    ///
    /// Mandatory built-ins are found regardless of whether there is a
    /// corresponding external utility in `$PATH`, but they can be
    /// overridden by functions.
    Mandatory,

    /// Non-portable built-in that can be used without `$PATH` search
    ///
    /// Elective built-ins are like mandatory built-ins, but their behavior
    /// is not specified by POSIX.
    Elective,
}

/// Result of built-in utility execution
///
/// The result type contains an exit status and optional flags that may
/// affect the behavior of the shell following the built-in execution.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[must_use]
pub struct Result {
    exit_status: ExitStatus,
    divert: ControlFlow<Divert>,
    retain_redirs: bool,
}

impl Result {
    /// Creates a new result with the given exit status.
    pub const fn new(exit_status: ExitStatus) -> Self {
        Self {
            exit_status,
            divert: Continue(()),
            retain_redirs: false,
        }
    }

    /// Creates a new result with an exit status and a divert.
    pub const fn with_exit_status_and_divert(
        exit_status: ExitStatus,
        divert: ControlFlow<Divert>,
    ) -> Self {
        Self {
            exit_status,
            divert,
            retain_redirs: false,
        }
    }

    /// Returns the exit status of this result.
    #[must_use]
    pub const fn exit_status(&self) -> ExitStatus {
        self.exit_status
    }

    /// Sets the exit status of this result.
    pub fn set_exit_status(&mut self, exit_status: ExitStatus) {
        self.exit_status = exit_status
    }

    /// Returns an optional [`Divert`] to be taken.
    #[must_use]
    pub const fn divert(&self) -> ControlFlow<Divert> {
        self.divert
    }

    /// Sets the divert of this result.
    pub fn set_divert(&mut self, divert: ControlFlow<Divert>) {
        self.divert = divert
    }

    /// Returns whether the built-in's redirections should outlive the
    /// built-in execution.
    ///
    /// This is true only for a successful `exec` built-in.
    #[must_use]
    pub const fn should_retain_redirs(&self) -> bool {
        self.retain_redirs
    }

    /// Makes the built-in's redirections outlive the built-in execution.
    pub fn retain_redirs(&mut self) {
        self.retain_redirs = true
    }
}

impl Default for Result {
    fn default() -> Self {
        Self::new(ExitStatus::SUCCESS)
    }
}

/// Entry point of a built-in utility
///
/// The function takes the environment and the command-line arguments (not
/// including the command name) and returns a [`Result`].
pub type Main = fn(&mut Env, Vec<Field>) -> Result;

/// Definition of a built-in utility
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Builtin {
    /// Type of the built-in
    pub r#type: Type,
    /// Function that executes the built-in
    pub execute: Main,
    /// Whether operands of the form `name=value` are treated like variable
    /// assignments in expansion
    ///
    /// This is true for declaration utilities like `export` and `typeset`,
    /// whose `name=value` operands are expanded without field splitting and
    /// pathname expansion.
    pub is_declaration_utility: bool,
}

impl Builtin {
    /// Creates a built-in definition with defaults.
    pub const fn new(r#type: Type, execute: Main) -> Self {
        Builtin {
            r#type,
            execute,
            is_declaration_utility: false,
        }
    }
}
