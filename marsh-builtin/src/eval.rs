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

//! Eval built-in
//!
//! The **`eval`** built-in concatenates its arguments with spaces and
//! executes the result as a shell command.

use itertools::Itertools;
use marsh_env::builtin::Result;
use marsh_env::semantics::ExitStatus;
use marsh_env::semantics::Field;
use marsh_env::Env;
use marsh_semantics::runner::run_command_string;
use marsh_syntax::source::Source;
use std::ops::ControlFlow::{Break, Continue};
use std::rc::Rc;

/// Entry point for executing the `eval` built-in
pub fn main(env: &mut Env, args: Vec<Field>) -> Result {
    if args.is_empty() {
        return Result::new(ExitStatus::SUCCESS);
    }

    let origin = args[0].origin.clone();
    let code = args.iter().map(|field| &field.value).format(" ").to_string();
    let source = Rc::new(Source::Eval { original: origin });

    match run_command_string(env, &code, source) {
        Continue(()) => Result::new(env.exit_status),
        Break(divert) => Result::with_exit_status_and_divert(env.exit_status, Break(divert)),
    }
}
