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

//! Times built-in
//!
//! The **`times`** built-in prints the accumulated user and system times
//! for the shell and its children.

use crate::common::output;
use crate::common::report_error;
use marsh_env::builtin::Result;
use marsh_env::semantics::Field;
use marsh_env::system::System;
use marsh_env::Env;

fn format_time(seconds: f64) -> String {
    let minutes = (seconds / 60.0) as u64;
    format!("{}m{:.6}s", minutes, seconds % 60.0)
}

/// Entry point for executing the `times` built-in
pub fn main(env: &mut Env, _args: Vec<Field>) -> Result {
    let times = match env.system.times() {
        Ok(times) => times,
        Err(errno) => return report_error(env, &format!("cannot get times: {errno}")),
    };
    let text = format!(
        "{} {}\n{} {}\n",
        format_time(times.self_user),
        format_time(times.self_system),
        format_time(times.children_user),
        format_time(times.children_system),
    );
    match output(env, &text) {
        Ok(()) => Default::default(),
        Err(result) => result,
    }
}
