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

//! Prompting input decorator
//!
//! The interactive shell prints `$PS1` before the first line of a command
//! and `$PS2` before continuation lines. This module wraps another input
//! function and writes the prompt to the standard error before delegating.
//! Line editing and history are outside the scope of this shell; the
//! prompts work with plain line input.

use marsh_env::system::Fd;
use marsh_env::system::SharedSystem;
use marsh_env::system::SystemEx;
use marsh_syntax::input::Context;
use marsh_syntax::input::Input;
use marsh_syntax::input::Result;

/// Default primary prompt, used when `PS1` is not accessible
const DEFAULT_PS1: &str = "$ ";
/// Default secondary prompt
const DEFAULT_PS2: &str = "> ";

/// Input function that prints a prompt before reading
pub struct PromptingReader<T> {
    system: SharedSystem,
    inner: T,
}

impl<T> PromptingReader<T> {
    pub fn new(system: SharedSystem, inner: T) -> Self {
        PromptingReader { system, inner }
    }
}

impl<T: Input> Input for PromptingReader<T> {
    fn next_line(&mut self, context: &Context) -> Result {
        let prompt = if context.is_first_line {
            DEFAULT_PS1
        } else {
            DEFAULT_PS2
        };
        _ = self.system.write_all(Fd::STDERR, prompt.as_bytes());
        self.inner.next_line(context)
    }
}
