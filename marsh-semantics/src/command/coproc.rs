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

//! Implementation of coprocess semantics
//!
//! A coprocess runs asynchronously with two pipes attached: the shell
//! writes to the coprocess's standard input and reads from its standard
//! output. The file descriptors are published in an array variable named
//! after the coprocess (`COPROC` by default): element 0 is the read end and
//! element 1 is the write end. The coprocess's process ID is stored in
//! `NAME_PID` and becomes `$!`.

use super::Command;
use marsh_env::job::Job;
use marsh_env::semantics::ExitStatus;
use marsh_env::system::Fd;
use marsh_env::system::System;
use marsh_env::variable::Scope;
use marsh_env::variable::Value;
use marsh_env::Env;
use marsh_syntax::syntax;
use std::ops::ControlFlow::Continue;
use std::rc::Rc;

/// Default name of a coprocess
const DEFAULT_NAME: &str = "COPROC";

impl Command for syntax::CoprocCommand {
    fn execute(&self, env: &mut Env) -> crate::Result {
        let name = self.name.as_deref().unwrap_or(DEFAULT_NAME).to_owned();

        let (to_child_reader, to_child_writer) = match env.system.pipe() {
            Ok(pipe) => pipe,
            Err(errno) => {
                env.print_error(&format!("cannot open a pipe for the coprocess: {errno}"));
                env.exit_status = ExitStatus::NOEXEC;
                return Continue(());
            }
        };
        let (from_child_reader, from_child_writer) = match env.system.pipe() {
            Ok(pipe) => pipe,
            Err(errno) => {
                _ = env.system.close(to_child_reader);
                _ = env.system.close(to_child_writer);
                env.print_error(&format!("cannot open a pipe for the coprocess: {errno}"));
                env.exit_status = ExitStatus::NOEXEC;
                return Continue(());
            }
        };

        let body = Rc::clone(&self.body);
        let job_control = env.controls_jobs();
        let result = env.start_subshell(
            move |env| {
                _ = env.system.dup2(to_child_reader, Fd::STDIN);
                _ = env.system.dup2(from_child_writer, Fd::STDOUT);
                _ = env.system.close(to_child_reader);
                _ = env.system.close(to_child_writer);
                _ = env.system.close(from_child_reader);
                _ = env.system.close(from_child_writer);
                body.execute(env)
            },
            !job_control,
        );

        _ = env.system.close(to_child_reader);
        _ = env.system.close(from_child_writer);

        match result {
            Ok(pid) => {
                // Publish the pipe ends: [0] is for reading from the
                // coprocess, [1] for writing to it.
                let value = Value::array([
                    from_child_reader.0.to_string(),
                    to_child_writer.0.to_string(),
                ]);
                _ = env
                    .variables
                    .get_or_new(name.clone(), Scope::Global)
                    .assign(value, None);
                _ = env
                    .variables
                    .get_or_new(format!("{name}_PID"), Scope::Global)
                    .assign(pid.to_string(), None);

                let mut job = Job::new(pid);
                job.name = format!("coproc {name}");
                env.jobs.add(job);
                env.jobs.set_last_async_pid(pid);
                env.exit_status = ExitStatus::SUCCESS;
                Continue(())
            }
            Err(errno) => {
                _ = env.system.close(to_child_writer);
                _ = env.system.close(from_child_reader);
                env.print_error(&format!("cannot start the coprocess: {errno}"));
                env.exit_status = ExitStatus::NOEXEC;
                Continue(())
            }
        }
    }
}
