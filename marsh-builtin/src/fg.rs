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

//! Fg built-in
//!
//! The **`fg`** built-in resumes a job in the foreground.
//!
//! # Syntax
//!
//! ```sh
//! fg [job_id]
//! ```
//!
//! # Semantics
//!
//! The job (default: the current job) is sent `SIGCONT`, given the
//! terminal if job control is active, and waited for. The exit status is
//! that of the job.

use crate::common::output;
use crate::common::report_error;
use marsh_env::builtin::Result;
use marsh_env::job::ProcessState;
use marsh_env::semantics::Field;
use marsh_env::signal;
use marsh_env::system::Pid;
use marsh_env::system::System;
use marsh_env::Env;

/// Resolves the job operand of the fg and bg built-ins.
pub(crate) fn find_job(env: &Env, args: &[Field]) -> std::result::Result<usize, String> {
    match args {
        [] => env
            .jobs
            .current_job()
            .ok_or_else(|| "no current job".to_owned()),
        [id] => env
            .jobs
            .find_by_id(&id.value)
            .ok_or_else(|| format!("{}: no such job", id.value)),
        [_, extra, ..] => Err(format!("unexpected operand `{}`", extra.value)),
    }
}

/// Entry point for executing the `fg` built-in
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

    if let Err(result) = output(env, &format!("{name}\n")) {
        return result;
    }

    if let Some(tty) = env.tty {
        _ = env.system.tcsetpgrp(tty, pgid);
    }
    let cont = env.system.signal_number_from_name(signal::Name::Cont);
    if let Some(cont) = cont {
        _ = env.system.kill(Pid(-pgid.0), Some(cont));
    }

    let exit_status = match env.wait_for_subshell(pid) {
        Ok(state @ (ProcessState::Exited(_) | ProcessState::Signaled { .. })) => {
            env.jobs.update_state(pid, state);
            env.jobs.remove(index);
            state.to_exit_status()
        }
        Ok(state) => {
            env.jobs.update_state(pid, state);
            state.to_exit_status()
        }
        Err(errno) => {
            return report_error(env, &format!("cannot wait for the job: {errno}"));
        }
    };

    if let Some(tty) = env.tty {
        let own_group = env.system.getpgrp();
        _ = env.system.tcsetpgrp(tty, own_group);
    }

    Result::new(exit_status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use marsh_env::semantics::ExitStatus;

    #[test]
    fn fg_without_job_control_fails() {
        let mut env = Env::new_virtual();
        let result = main(&mut env, vec![]);
        assert_eq!(result.exit_status(), ExitStatus::FAILURE);
    }

    #[test]
    fn finding_jobs() {
        use marsh_env::job::Job;
        let mut env = Env::new_virtual();
        assert!(find_job(&env, &[]).is_err());
        let index = env.jobs.add(Job::new(Pid(5)));
        assert_eq!(find_job(&env, &[]), Ok(index));
        assert_eq!(find_job(&env, &Field::dummies(["%1"])), Ok(index));
        assert!(find_job(&env, &Field::dummies(["%9"])).is_err());
    }
}
