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

//! Type definitions for job management
//!
//! A [`Job`] represents a command that was executed asynchronously or
//! suspended, and the [`JobList`] is the indexed collection of them. Jobs
//! are assigned small numbers when added; the `%`-prefixed job IDs accepted
//! by the job control built-ins are resolved with [`JobList::find_by_id`].

use crate::semantics::ExitStatus;
use crate::signal;
use crate::system::Pid;
use crate::system::WaitStatus;
use slab::Slab;
use std::fmt;

/// State of a process in a job
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProcessState {
    /// The process is running.
    Running,
    /// The process was stopped by a signal.
    Stopped(signal::Number),
    /// The process exited with an exit status.
    Exited(ExitStatus),
    /// The process was killed by a signal.
    Signaled {
        signal: signal::Number,
        core_dump: bool,
    },
}

impl ProcessState {
    /// Whether the process is still alive (running or stopped).
    #[must_use]
    pub fn is_alive(&self) -> bool {
        matches!(self, ProcessState::Running | ProcessState::Stopped(_))
    }

    /// Converts the state to the exit status it yields in `$?`.
    ///
    /// A stopped or signaled process yields 128 plus the signal number.
    #[must_use]
    pub fn to_exit_status(self) -> ExitStatus {
        match self {
            ProcessState::Running => ExitStatus::SUCCESS,
            ProcessState::Exited(exit_status) => exit_status,
            ProcessState::Stopped(signal) | ProcessState::Signaled { signal, .. } => {
                ExitStatus::from(signal)
            }
        }
    }

    /// Converts a [`WaitStatus`] to a `ProcessState`, if possible.
    #[must_use]
    pub fn from_wait_status(status: WaitStatus) -> Option<ProcessState> {
        match status {
            WaitStatus::Exited(_, exit_status) => {
                Some(ProcessState::Exited(ExitStatus(exit_status)))
            }
            WaitStatus::Signaled(_, signal, core_dump) => {
                Some(ProcessState::Signaled { signal, core_dump })
            }
            WaitStatus::Stopped(_, signal) => Some(ProcessState::Stopped(signal)),
            WaitStatus::Continued(_) => Some(ProcessState::Running),
            WaitStatus::StillAlive => None,
        }
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessState::Running => "Running".fmt(f),
            ProcessState::Stopped(signal) => write!(f, "Stopped(SIG{signal})"),
            ProcessState::Exited(exit_status) if exit_status.is_successful() => "Done".fmt(f),
            ProcessState::Exited(exit_status) => write!(f, "Done({exit_status})"),
            ProcessState::Signaled { signal, core_dump } => {
                write!(f, "Killed(SIG{signal})")?;
                if *core_dump {
                    " (core dumped)".fmt(f)?;
                }
                Ok(())
            }
        }
    }
}

/// Set of processes executing a pipeline
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub struct Job {
    /// Process ID of the principal process of the job
    pub pid: Pid,

    /// Process group ID of the job
    ///
    /// When job control is active, the job runs in its own process group
    /// whose leader is the first process of the pipeline.
    pub pgid: Pid,

    /// Whether the job is job-controlled
    pub job_controlled: bool,

    /// Current state of the job
    pub state: ProcessState,

    /// Whether the state has changed since it was last reported
    pub state_changed: bool,

    /// String representation of this job
    pub name: String,
}

impl Job {
    /// Creates a new job instance in the running state.
    #[must_use]
    pub fn new(pid: Pid) -> Self {
        Job {
            pid,
            pgid: pid,
            job_controlled: false,
            state: ProcessState::Running,
            state_changed: true,
            name: String::new(),
        }
    }
}

/// Collection of jobs
#[derive(Clone, Debug, Default)]
pub struct JobList {
    jobs: Slab<Job>,

    /// Index of the current job (`%%`)
    current_job: Option<usize>,

    /// Process ID of the most recently executed asynchronous command (`$!`)
    last_async_pid: Option<Pid>,
}

impl JobList {
    /// Creates an empty job list.
    #[must_use]
    pub fn new() -> JobList {
        Default::default()
    }

    /// Adds a job to the list and returns its index.
    ///
    /// The new job becomes the current job.
    pub fn add(&mut self, job: Job) -> usize {
        let index = self.jobs.insert(job);
        self.current_job = Some(index);
        index
    }

    /// Removes a job from the list.
    pub fn remove(&mut self, index: usize) -> Option<Job> {
        let job = self.jobs.try_remove(index);
        if self.current_job == Some(index) {
            self.current_job = self.jobs.iter().map(|(index, _)| index).next_back();
        }
        job
    }

    /// Returns a reference to the job at the given index.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Job> {
        self.jobs.get(index)
    }

    /// Returns a mutable reference to the job at the given index.
    #[must_use]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Job> {
        self.jobs.get_mut(index)
    }

    /// Returns the index of the current job.
    #[must_use]
    pub fn current_job(&self) -> Option<usize> {
        self.current_job
    }

    /// Finds a job by its process ID.
    #[must_use]
    pub fn find_by_pid(&self, pid: Pid) -> Option<usize> {
        self.jobs
            .iter()
            .find(|(_, job)| job.pid == pid)
            .map(|(index, _)| index)
    }

    /// Resolves a job ID of the form `%n`, `%%`, `%+`, `%-`, or `%name`.
    #[must_use]
    pub fn find_by_id(&self, id: &str) -> Option<usize> {
        let id = id.strip_prefix('%').unwrap_or(id);
        match id {
            "" | "%" | "+" => self.current_job,
            "-" => self
                .jobs
                .iter()
                .filter(|&(index, _)| Some(index) != self.current_job)
                .map(|(index, _)| index)
                .next_back(),
            _ => {
                if let Ok(number) = id.parse::<usize>() {
                    let index = number.checked_sub(1)?;
                    if self.jobs.contains(index) {
                        Some(index)
                    } else {
                        None
                    }
                } else {
                    self.jobs
                        .iter()
                        .find(|(_, job)| job.name.starts_with(id))
                        .map(|(index, _)| index)
                }
            }
        }
    }

    /// Updates the state of the job containing the given process.
    ///
    /// Returns the index of the updated job, if any.
    pub fn update_state(&mut self, pid: Pid, state: ProcessState) -> Option<usize> {
        let index = self.find_by_pid(pid)?;
        let job = &mut self.jobs[index];
        if job.state != state {
            job.state = state;
            job.state_changed = true;
        }
        Some(index)
    }

    /// Removes jobs that have finished and been reported.
    pub fn remove_finished(&mut self) {
        let finished: Vec<usize> = self
            .jobs
            .iter()
            .filter(|(_, job)| !job.state.is_alive() && !job.state_changed)
            .map(|(index, _)| index)
            .collect();
        for index in finished {
            self.remove(index);
        }
    }

    /// Returns an iterator over the jobs with their indices.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (usize, &Job)> {
        self.jobs.iter()
    }

    /// Returns the number of jobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Returns whether the list contains no jobs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Returns the process ID of the most recently executed asynchronous
    /// command, used for the special parameter `$!`.
    #[must_use]
    pub fn last_async_pid(&self) -> Option<Pid> {
        self.last_async_pid
    }

    /// Sets the process ID of the most recently executed asynchronous
    /// command.
    pub fn set_last_async_pid(&mut self, pid: Pid) {
        self.last_async_pid = Some(pid);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_ids_count_from_one() {
        let mut list = JobList::new();
        let i1 = list.add(Job::new(Pid(10)));
        let i2 = list.add(Job::new(Pid(20)));
        assert_eq!(list.find_by_id("%1"), Some(i1));
        assert_eq!(list.find_by_id("%2"), Some(i2));
        assert_eq!(list.find_by_id("%3"), None);
    }

    #[test]
    fn current_and_previous_job() {
        let mut list = JobList::new();
        let i1 = list.add(Job::new(Pid(10)));
        let i2 = list.add(Job::new(Pid(20)));
        assert_eq!(list.find_by_id("%%"), Some(i2));
        assert_eq!(list.find_by_id("%+"), Some(i2));
        assert_eq!(list.find_by_id("%-"), Some(i1));
    }

    #[test]
    fn find_by_name_prefix() {
        let mut list = JobList::new();
        let mut job = Job::new(Pid(10));
        job.name = "sleep 100".to_owned();
        let index = list.add(job);
        assert_eq!(list.find_by_id("%sleep"), Some(index));
        assert_eq!(list.find_by_id("%nosuch"), None);
    }

    #[test]
    fn update_state_marks_change() {
        let mut list = JobList::new();
        let index = list.add(Job::new(Pid(10)));
        list.get_mut(index).unwrap().state_changed = false;

        let updated = list.update_state(Pid(10), ProcessState::Exited(ExitStatus(0)));
        assert_eq!(updated, Some(index));
        let job = list.get(index).unwrap();
        assert_eq!(job.state, ProcessState::Exited(ExitStatus(0)));
        assert!(job.state_changed);
    }

    #[test]
    fn remove_finished_keeps_unreported() {
        let mut list = JobList::new();
        let index = list.add(Job::new(Pid(10)));
        list.update_state(Pid(10), ProcessState::Exited(ExitStatus(0)));
        // Not yet reported
        list.remove_finished();
        assert_eq!(list.len(), 1);

        list.get_mut(index).unwrap().state_changed = false;
        list.remove_finished();
        assert_eq!(list.len(), 0);
    }

    #[test]
    fn last_async_pid() {
        let mut list = JobList::new();
        assert_eq!(list.last_async_pid(), None);
        list.set_last_async_pid(Pid(42));
        assert_eq!(list.last_async_pid(), Some(Pid(42)));
    }

    #[test]
    fn process_state_exit_statuses() {
        assert_eq!(
            ProcessState::Exited(ExitStatus(3)).to_exit_status(),
            ExitStatus(3)
        );
        let signal = signal::Number::from_raw(15).unwrap();
        assert_eq!(
            ProcessState::Signaled {
                signal,
                core_dump: false
            }
            .to_exit_status(),
            ExitStatus(143)
        );
    }
}
