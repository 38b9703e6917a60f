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

//! Wait built-in
//!
//! The **`wait`** built-in waits for asynchronous jobs to finish.
//!
//! # Syntax
//!
//! ```sh
//! wait [pid_or_job_id...]
//! ```
//!
//! # Semantics
//!
//! Without operands, the built-in waits for all known jobs and succeeds.
//! With operands, it waits for each named process or `%`-prefixed job; the
//! exit status is that of the last operand. Waiting for an unknown process
//! yields 127.

use crate::common::report_error;
use marsh_env::builtin::Result;
use marsh_env::job::ProcessState;
use marsh_env::semantics::ExitStatus;
use marsh_env::semantics::Field;
use marsh_env::system::Pid;
use marsh_env::Env;

/// Waits for one job, returning its final exit status.
fn wait_for_job(env: &mut Env, index: usize) -> ExitStatus {
    let Some(job) = env.jobs.get(index) else {
        return ExitStatus::NOT_FOUND;
    };
    if !job.state.is_alive() {
        let exit_status = job.state.to_exit_status();
        env.jobs.remove(index);
        return exit_status;
    }
    let pid = job.pid;
    match env.wait_for_subshell(pid) {
        Ok(state) => {
            env.jobs.update_state(pid, state);
            if !state.is_alive() {
                env.jobs.remove(index);
            }
            state.to_exit_status()
        }
        Err(_) => ExitStatus::NOT_FOUND,
    }
}

/// Entry point for executing the `wait` built-in
pub fn main(env: &mut Env, args: Vec<Field>) -> Result {
    if args.is_empty() {
        let indices: Vec<usize> = env.jobs.iter().map(|(index, _)| index).collect();
        for index in indices {
            wait_for_job(env, index);
        }
        return Default::default();
    }

    let mut exit_status = ExitStatus::SUCCESS;
    for operand in &args {
        let index = if operand.value.starts_with('%') {
            env.jobs.find_by_id(&operand.value)
        } else {
            match operand.value.parse() {
                Ok(pid) => env.jobs.find_by_pid(Pid(pid)),
                Err(_) => {
                    return report_error(
                        env,
                        &format!("{}: not a valid job specification", operand.value),
                    )
                }
            }
        };
        exit_status = match index {
            Some(index) => wait_for_job(env, index),
            None => ExitStatus::NOT_FOUND,
        };
    }
    Result::new(exit_status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use marsh_env::job::Job;

    #[test]
    fn waiting_for_finished_job() {
        let mut env = Env::new_virtual();
        let mut job = Job::new(Pid(100));
        job.state = ProcessState::Exited(ExitStatus(7));
        let index = env.jobs.add(job);
        assert_eq!(wait_for_job(&mut env, index), ExitStatus(7));
        assert!(env.jobs.is_empty());
    }

    #[test]
    fn waiting_for_unknown_pid_yields_127() {
        let mut env = Env::new_virtual();
        let result = main(&mut env, Field::dummies(["9999"]));
        assert_eq!(result.exit_status(), ExitStatus::NOT_FOUND);
    }

    #[test]
    fn wait_without_jobs_succeeds() {
        let mut env = Env::new_virtual();
        let result = main(&mut env, vec![]);
        assert_eq!(result.exit_status(), ExitStatus::SUCCESS);
    }
}
