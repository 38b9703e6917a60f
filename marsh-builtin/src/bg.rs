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

//! Bg built-in
//!
//! The **`bg`** built-in resumes a stopped job in the background.
//!
//! # Syntax
//!
//! ```sh
//! bg [job_id]
//! ```

use crate::common::output;
use crate::common::report_error;
use crate::fg::find_job;
use marsh_env::builtin::Result;
use marsh_env::job::ProcessState;
use marsh_env::semantics::Field;
use marsh_env::signal;
use marsh_env::system::Pid;
use marsh_env::system::System;
use marsh_env::Env;

/// Entry point for executing the `bg` built-in
pub fn main(env: &mut Env, args: Vec<Field>) -> Result {
    if !env.controls_jobs() {
        return report_error(env, "job control is not enabled");
    }

    let index = match find_job(env, &args) {
        Ok(index) => index,
        Err(message) => return report_error(env, &message),
    };
    let job = env.jobs.get(index).unwrap();
    let pid = job.pid;
    let pgid = job.pgid;
    let name = job.name.clone();

    let cont = env.system.signal_number_from_name(signal::Name::Cont);
    if let Some(cont) = cont {
        _ = env.system.kill(Pid(-pgid.0), Some(cont));
    }
    env.jobs.update_state(pid, ProcessState::Running);

    if let Err(result) = output(env, &format!("[{}] {name}\n", index + 1)) {
        return result;
    }
    Default::default()
}
