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

//! Interface between the evaluator and the shell variable engine

/// Variable accessor used during evaluation
///
/// The evaluator reads and writes shell variables through this trait. The
/// shell implements it on its variable engine; tests can use a plain
/// `HashMap`-backed implementation.
pub trait Env {
    /// Returns the value of the named variable, or `None` if unset.
    fn get_variable(&self, name: &str) -> Option<String>;

    /// Assigns a value to the named variable.
    ///
    /// The value is the decimal representation of the evaluated result. An
    /// implementation may reject the assignment, e.g. for a read-only
    /// variable; the message is reported verbatim to the user.
    fn assign_variable(&mut self, name: &str, value: String) -> Result<(), String>;
}

impl Env for std::collections::HashMap<String, String> {
    fn get_variable(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }

    fn assign_variable(&mut self, name: &str, value: String) -> Result<(), String> {
        self.insert(name.to_owned(), value);
        Ok(())
    }
}
