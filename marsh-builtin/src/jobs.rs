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

//! Jobs built-in
//!
//! The **`jobs`** built-in reports the status of jobs. Finished jobs are
//! removed from the job list once reported.

use crate::common::output;
use marsh_env::builtin::Result;
use marsh_env::semantics::Field;
use marsh_env::Env;

/// Entry point for executing the `jobs` built-in
pub fn main(env: &mut Env, _args: Vec<Field>) -> Result {
    env.update_job_states();

    let current = env.jobs.current_job();
    let mut lines = Vec::new();
    for (index, job) in env.jobs.iter() {
        let mark = if Some(index) == current { '+' } else { '-' };
        lines.push(format!(
            "[{}] {} {:10} {}\n",
            index + 1,
            mark,
            job.state.to_string(),
            job.name,
        ));
    }
    let text = lines.concat();

    // Mark everything reported.
    let indices: Vec<usize> = env.jobs.iter().map(|(index, _)| index).collect();
    for index in indices {
        if let Some(job) = env.jobs.get_mut(index) {
            job.state_changed = false;
        }
    }
    env.jobs.remove_finished();

    match output(env, &text) {
        Ok(()) => Default::default(),
        Err(result) => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marsh_env::job::Job;
    use marsh_env::job::ProcessState;
    use marsh_env::semantics::ExitStatus;
    use marsh_env::system::Pid;
    use marsh_env::system::VirtualSystem;

    #[test]
    fn reporting_jobs() {
        let system = VirtualSystem::new();
        let mut env = Env::with_system(Box::new(system.clone()));
        let mut job = Job::new(Pid(10));
        job.name = "sleep 10&".to_owned();
        env.jobs.add(job);

        main(&mut env, vec![]);
        let out = String::from_utf8(system.stdout_content()).unwrap();
        assert!(out.starts_with("[1] + Running"), "{out:?}");
        assert!(out.contains("sleep 10&"), "{out:?}");
    }

    #[test]
    fn finished_jobs_are_removed_after_reporting() {
        let mut env = Env::new_virtual();
        let index = env.jobs.add(Job::new(Pid(10)));
        env.jobs.get_mut(index).unwrap().state = ProcessState::Exited(ExitStatus(0));

        main(&mut env, vec![]);
        assert!(env.jobs.is_empty());
    }
}
