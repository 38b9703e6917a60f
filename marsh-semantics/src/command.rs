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

//! Command execution
//!
//! The [`Command`] trait is implemented for every node of the command tree:
//! executing a node recursively executes its children, orchestrating
//! expansion, redirection, and process management on the way. The result is
//! a [`crate::Result`], whose `Break` arm carries a [`Divert`] representing
//! `break`, `continue`, `return`, `exit`, or an interrupt.

use crate::trap::run_err_trap;
use crate::trap::run_pending_traps;
use marsh_env::job::Job;
use marsh_env::semantics::Divert;
use marsh_env::semantics::ExitStatus;
use marsh_env::stack::Frame;
use marsh_env::system::Errno;
use marsh_env::system::Fd;
use marsh_env::system::Mode;
use marsh_env::system::OfdAccess;
use marsh_env::system::System;
use marsh_env::Env;
use marsh_syntax::syntax;
use std::ffi::CString;
use std::ops::ControlFlow::{Break, Continue};
use std::rc::Rc;

mod compound_command;
mod coproc;
mod function_definition;
mod pipeline;
mod simple_command;

pub use self::pipeline::execute_pipeline;
pub use self::simple_command::start_external;

/// Execution of a command tree node
pub trait Command {
    /// Executes the command, updating `env.exit_status`.
    fn execute(&self, env: &mut Env) -> crate::Result;
}

/// Executes the list, item by item.
///
/// Pending traps run between items, which are the shell's safe points.
impl Command for syntax::List {
    fn execute(&self, env: &mut Env) -> crate::Result {
        for item in &self.0 {
            item.execute(env)?;
            run_pending_traps(env)?;
        }
        Continue(())
    }
}

/// Executes the and-or list, synchronously or asynchronously.
impl Command for syntax::Item {
    fn execute(&self, env: &mut Env) -> crate::Result {
        match &self.async_flag {
            None => {
                self.and_or.execute(env)?;
                run_err_trap(env)?;
                env.apply_errexit()
            }
            Some(_) => execute_async(env, &self.and_or),
        }
    }
}

/// Starts asynchronous execution of an and-or list.
///
/// The list runs in a subshell. Without job control, the subshell ignores
/// `SIGINT` and `SIGQUIT` and reads its standard input from `/dev/null`.
/// The job is registered in the job list and its process ID becomes `$!`.
fn execute_async(env: &mut Env, and_or: &Rc<syntax::AndOrList>) -> crate::Result {
    let job_control = env.controls_jobs();
    let and_or_child = Rc::clone(and_or);
    let result = env.start_subshell(
        move |env| {
            if !job_control {
                redirect_stdin_to_dev_null(env);
            }
            and_or_child.execute(env)
        },
        !job_control,
    );

    match result {
        Ok(pid) => {
            if job_control {
                _ = env.system.setpgid(pid, pid);
            }
            let mut job = Job::new(pid);
            job.job_controlled = job_control;
            job.name = and_or.to_string();
            env.jobs.add(job);
            env.jobs.set_last_async_pid(pid);
            env.exit_status = ExitStatus::SUCCESS;
            Continue(())
        }
        Err(errno) => {
            env.print_error(&format!("cannot start an asynchronous command: {errno}"));
            env.exit_status = ExitStatus::NOEXEC;
            Continue(())
        }
    }
}

/// Redirects the standard input to `/dev/null`, ignoring errors.
fn redirect_stdin_to_dev_null(env: &mut Env) {
    let Ok(path) = CString::new("/dev/null") else {
        return;
    };
    match env.system.open(
        &path,
        OfdAccess::ReadOnly,
        Default::default(),
        Mode::default(),
    ) {
        Ok(fd) => {
            if fd != Fd::STDIN {
                _ = env.system.dup2(fd, Fd::STDIN);
                _ = env.system.close(fd);
            }
        }
        Err(Errno { .. }) => (),
    }
}

/// Executes the pipelines, applying `&&`/`||` short-circuiting.
///
/// Every pipeline other than the last runs in a [`Frame::Condition`]
/// context, so the `ErrExit` option does not apply to it.
impl Command for syntax::AndOrList {
    fn execute(&self, env: &mut Env) -> crate::Result {
        if self.rest.is_empty() {
            return self.first.execute(env);
        }

        {
            let mut env = env.push_frame(Frame::Condition);
            self.first.execute(&mut env)?;
        }

        for (index, (and_or, pipeline)) in self.rest.iter().enumerate() {
            let success = env.exit_status.is_successful();
            let run = match and_or {
                syntax::AndOr::AndThen => success,
                syntax::AndOr::OrElse => !success,
            };
            if !run {
                continue;
            }
            if index + 1 < self.rest.len() {
                let mut env = env.push_frame(Frame::Condition);
                pipeline.execute(&mut env)?;
            } else {
                pipeline.execute(env)?;
            }
        }
        Continue(())
    }
}

/// Executes the command.
impl Command for syntax::Command {
    fn execute(&self, env: &mut Env) -> crate::Result {
        match self {
            syntax::Command::Simple(command) => command.execute(env),
            syntax::Command::Compound(command) => command.execute(env),
            syntax::Command::Function(command) => command.execute(env),
            syntax::Command::Coproc(command) => command.execute(env),
        }
    }
}

/// Helper for applying a `Divert` produced by executing a loop body.
///
/// Returns `Some(flow)` when the loop must stop with the given flow, or
/// `None` when the loop continues.
pub(crate) fn loop_body_divert(result: crate::Result) -> Option<crate::Result> {
    match result {
        Continue(()) => None,
        Break(Divert::Break { count: 0 }) => Some(Continue(())),
        Break(Divert::Break { count }) => Some(Break(Divert::Break { count: count - 1 })),
        Break(Divert::Continue { count: 0 }) => None,
        Break(Divert::Continue { count }) => Some(Break(Divert::Continue { count: count - 1 })),
        other => Some(other),
    }
}

pub(crate) use loop_body_divert as handle_loop_divert;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::echo_builtin;
    use crate::tests::return_builtin;
    use marsh_env::system::VirtualSystem;

    fn run(env: &mut Env, code: &str) -> crate::Result {
        let list: syntax::List = code.parse().unwrap();
        list.execute(env)
    }

    #[test]
    fn and_or_short_circuit() {
        let system = VirtualSystem::new();
        let mut env = Env::with_system(Box::new(system.clone()));
        env.builtins.insert("echo", echo_builtin());
        env.builtins.insert("return", return_builtin());

        run(&mut env, "return -n 1 && echo skipped").unwrap();
        assert_eq!(system.stdout_content(), b"");

        run(&mut env, "return -n 1 || echo reached").unwrap();
        assert_eq!(system.stdout_content(), b"reached\n");

        run(&mut env, "return -n 0 && echo and").unwrap();
        assert_eq!(system.stdout_content(), b"reached\nand\n");
    }

    #[test]
    fn and_or_chains() {
        let mut env = Env::new_virtual();
        env.builtins.insert("return", return_builtin());
        run(&mut env, "return -n 1 || return -n 2 || return -n 3").unwrap();
        assert_eq!(env.exit_status, ExitStatus(3));
    }

    #[test]
    fn errexit_on_final_pipeline_only() {
        use marsh_env::option::{ErrExit, State};
        let mut env = Env::new_virtual();
        env.builtins.insert("return", return_builtin());
        env.options.set(ErrExit, State::On);

        // A failing condition does not exit the shell.
        let result = run(&mut env, "return -n 1 || return -n 0");
        assert_eq!(result, Continue(()));

        // A failing final command does.
        let result = run(&mut env, "return -n 1");
        assert_eq!(result, Break(Divert::Exit(None)));
        assert_eq!(env.exit_status, ExitStatus(1));
    }

    #[test]
    fn loop_divert_counting() {
        assert_eq!(loop_body_divert(Continue(())), None);
        assert_eq!(
            loop_body_divert(Break(Divert::Break { count: 0 })),
            Some(Continue(()))
        );
        assert_eq!(
            loop_body_divert(Break(Divert::Break { count: 2 })),
            Some(Break(Divert::Break { count: 1 }))
        );
        assert_eq!(loop_body_divert(Break(Divert::Continue { count: 0 })), None);
        assert_eq!(
            loop_body_divert(Break(Divert::Continue { count: 1 })),
            Some(Break(Divert::Continue { count: 0 }))
        );
        assert_eq!(
            loop_body_divert(Break(Divert::Exit(None))),
            Some(Break(Divert::Exit(None)))
        );
    }
}
