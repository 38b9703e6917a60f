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

//! Implementation of pipeline semantics
//!
//! If a pipeline contains one command, it is executed in the current shell
//! execution environment. With more commands, every command runs in a
//! subshell with its standard output connected to the standard input of the
//! next command via a pipe; with the `LastPipe` option on and job control
//! off, the final command instead runs in the current environment.
//!
//! The exit status of the pipeline is that of the last command, or, with
//! the `PipeFail` option on, the status of the rightmost command that
//! failed. `PIPESTATUS` is updated to the statuses of all the commands.
//! If the pipeline starts with `!`, the exit status is inverted.
//!
//! With job control on, the first command's process becomes the leader of a
//! new process group that the remaining commands join, and the group is
//! given the terminal while the pipeline runs in the foreground.

use super::Command;
use marsh_env::job::ProcessState;
use marsh_env::option::{LastPipe, Monitor, PipeFail, State};
use marsh_env::semantics::Divert;
use marsh_env::semantics::ExitStatus;
use marsh_env::stack::Frame;
use marsh_env::system::Errno;
use marsh_env::system::Fd;
use marsh_env::system::Pid;
use marsh_env::system::System;
use marsh_env::system::SystemEx;
use marsh_env::variable;
use marsh_env::variable::Scope;
use marsh_env::variable::Value;
use marsh_env::Env;
use marsh_syntax::syntax;
use marsh_syntax::syntax::TimeFormat;
use std::ops::ControlFlow::{Break, Continue};
use std::rc::Rc;

impl Command for syntax::Pipeline {
    fn execute(&self, env: &mut Env) -> crate::Result {
        match self.time {
            None => execute_with_negation(env, self),
            Some(format) => execute_timed(env, self, format),
        }
    }
}

fn execute_with_negation(env: &mut Env, pipeline: &syntax::Pipeline) -> crate::Result {
    if !pipeline.negation {
        return execute_pipeline(env, &pipeline.commands);
    }

    {
        let mut env = env.push_frame(Frame::Condition);
        execute_pipeline(&mut env, &pipeline.commands)?;
    }
    env.exit_status = if env.exit_status.is_successful() {
        ExitStatus::FAILURE
    } else {
        ExitStatus::SUCCESS
    };
    Continue(())
}

/// Runs the pipeline with resource-usage sampling and prints the timing.
fn execute_timed(
    env: &mut Env,
    pipeline: &syntax::Pipeline,
    format: TimeFormat,
) -> crate::Result {
    let wall_start = env.system.monotonic_clock();
    let times_start = env.system.times().unwrap_or_default();

    let result = execute_with_negation(env, pipeline);

    let wall = env.system.monotonic_clock().saturating_sub(wall_start);
    let times_end = env.system.times().unwrap_or_default();
    let user = times_end.self_user - times_start.self_user + times_end.children_user
        - times_start.children_user;
    let system_time = times_end.self_system - times_start.self_system
        + times_end.children_system
        - times_start.children_system;

    let report = match format {
        TimeFormat::Posix => format!(
            "real {:.2}\nuser {:.2}\nsys {:.2}\n",
            wall.as_secs_f64(),
            user,
            system_time,
        ),
        TimeFormat::Default => format!(
            "\nreal\t{}m{:.3}s\nuser\t{}m{:.3}s\nsys\t{}m{:.3}s\n",
            wall.as_secs() / 60,
            wall.as_secs_f64() % 60.0,
            (user / 60.0) as u64,
            user % 60.0,
            (system_time / 60.0) as u64,
            system_time % 60.0,
        ),
    };
    _ = env.system.write_all(Fd::STDERR, report.as_bytes());

    result
}

/// Records `PIPESTATUS` after a pipeline.
fn set_pipe_status(env: &mut Env, statuses: &[ExitStatus]) {
    let value = Value::array(statuses.iter().map(ExitStatus::to_string));
    let mut variable = env.variables.get_or_new(variable::PIPESTATUS, Scope::Global);
    _ = variable.assign(value, None);
}

/// Computes the pipeline's exit status from the element statuses.
fn pipeline_exit_status(env: &Env, statuses: &[ExitStatus]) -> ExitStatus {
    if env.options.get(PipeFail) == State::On {
        statuses
            .iter()
            .rev()
            .find(|status| !status.is_successful())
            .copied()
            .unwrap_or(ExitStatus::SUCCESS)
    } else {
        statuses.last().copied().unwrap_or(ExitStatus::SUCCESS)
    }
}

/// Executes the commands of a pipeline.
pub fn execute_pipeline(env: &mut Env, commands: &[Rc<syntax::Command>]) -> crate::Result {
    match commands.len() {
        0 => {
            env.exit_status = ExitStatus::SUCCESS;
            Continue(())
        }
        1 => {
            let result = commands[0].execute(env);
            let status = env.exit_status;
            set_pipe_status(env, &[status]);
            result
        }
        _ => execute_multi_command_pipeline(env, commands),
    }
}

/// Set of pipe file descriptors that connect commands
#[derive(Clone, Copy, Default)]
struct PipeSet {
    read_previous: Option<Fd>,
    /// Reader and writer to the next command
    next: Option<(Fd, Fd)>,
}

impl PipeSet {
    /// Updates the pipe set for the next command.
    ///
    /// Closes FDs that are no longer necessary and opens a new pipe if
    /// there is a next command.
    fn shift(&mut self, env: &mut Env, has_next: bool) -> Result<(), Errno> {
        if let Some(fd) = self.read_previous {
            _ = env.system.close(fd);
        }

        if let Some((reader, writer)) = self.next {
            _ = env.system.close(writer);
            self.read_previous = Some(reader);
        } else {
            self.read_previous = None;
        }

        self.next = None;
        if has_next {
            self.next = Some(env.system.pipe()?);
        }

        Ok(())
    }

    /// Moves the pipe FDs to stdin/stdout and closes the FDs that are no
    /// longer necessary.
    fn move_to_stdin_stdout(mut self, env: &mut Env) -> Result<(), Errno> {
        if let Some((reader, writer)) = self.next {
            env.system.close(reader)?;
            if writer != Fd::STDOUT {
                if self.read_previous == Some(Fd::STDOUT) {
                    self.read_previous = Some(env.system.dup(Fd::STDOUT, Fd(0), false)?);
                }
                env.system.dup2(writer, Fd::STDOUT)?;
                env.system.close(writer)?;
            }
        }
        if let Some(reader) = self.read_previous {
            if reader != Fd::STDIN {
                env.system.dup2(reader, Fd::STDIN)?;
                env.system.close(reader)?;
            }
        }
        Ok(())
    }
}

fn pipe_error(env: &mut Env, errno: Errno) -> crate::Result {
    env.print_error(&format!("cannot connect pipes in the pipeline: {errno}"));
    Break(Divert::Interrupt(Some(ExitStatus::NOEXEC)))
}

fn execute_multi_command_pipeline(
    env: &mut Env,
    commands: &[Rc<syntax::Command>],
) -> crate::Result {
    let job_control = env.controls_jobs();
    let run_last_in_shell = env.options.get(LastPipe) == State::On && !job_control;

    let mut pipes = PipeSet::default();
    let mut pids = Vec::new();
    let mut group_leader: Option<Pid> = None;

    let forked_count = if run_last_in_shell {
        commands.len() - 1
    } else {
        commands.len()
    };

    for (index, command) in commands.iter().take(forked_count).enumerate() {
        let has_next = index + 1 < commands.len();
        if let Err(errno) = pipes.shift(env, has_next) {
            return pipe_error(env, errno);
        }

        let command = Rc::clone(command);
        let pipes_for_child = pipes;
        let leader = group_leader;
        let result = env.start_subshell(
            move |env| {
                if job_control {
                    let pgid = leader.unwrap_or(Pid(0));
                    _ = env.system.setpgid(Pid(0), pgid);
                }
                match pipes_for_child.move_to_stdin_stdout(env) {
                    Ok(()) => (),
                    Err(errno) => return pipe_error(env, errno),
                }
                command.execute(env)
            },
            false,
        );

        match result {
            Ok(pid) => {
                if job_control {
                    let pgid = group_leader.unwrap_or(pid);
                    _ = env.system.setpgid(pid, pgid);
                    group_leader.get_or_insert(pid);
                }
                pids.push(pid);
            }
            Err(errno) => {
                env.print_error(&format!("cannot start a pipeline command: {errno}"));
                return Break(Divert::Interrupt(Some(ExitStatus::NOEXEC)));
            }
        }
    }

    // Give the terminal to the pipeline's process group.
    let tty_handoff = match (job_control, env.tty, group_leader) {
        (true, Some(tty), Some(leader)) => {
            _ = env.system.tcsetpgrp(tty, leader);
            Some(tty)
        }
        _ => None,
    };

    let mut last_in_shell_result = Continue(());
    if run_last_in_shell {
        // Run the final command in the current shell with its input
        // connected to the pipe.
        if let Err(errno) = pipes.shift(env, false) {
            return pipe_error(env, errno);
        }
        let saved_stdin = env.system.dup(Fd::STDIN, marsh_env::system::MIN_INTERNAL_FD, true);
        if let Some(reader) = pipes.read_previous.take() {
            _ = env.system.dup2(reader, Fd::STDIN);
            _ = env.system.close(reader);
        }

        last_in_shell_result = commands.last().unwrap().execute(env);

        if let Ok(saved) = saved_stdin {
            _ = env.system.dup2(saved, Fd::STDIN);
            _ = env.system.close(saved);
        }
    } else if let Err(errno) = pipes.shift(env, false) {
        return pipe_error(env, errno);
    }

    // Collect the exit statuses of all elements.
    let mut statuses = Vec::with_capacity(commands.len());
    for pid in pids {
        match env.wait_for_subshell(pid) {
            Ok(ProcessState::Stopped(signal)) => {
                statuses.push(ExitStatus::from(signal));
            }
            Ok(state) => statuses.push(state.to_exit_status()),
            Err(_) => statuses.push(ExitStatus::NOEXEC),
        }
    }
    if run_last_in_shell {
        statuses.push(env.exit_status);
    }

    if let Some(tty) = tty_handoff {
        let own_group = env.system.getpgrp();
        _ = env.system.tcsetpgrp(tty, own_group);
    }

    env.exit_status = pipeline_exit_status(env, &statuses);
    set_pipe_status(env, &statuses);

    last_in_shell_result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipe_fail_status_selection() {
        let mut env = Env::new_virtual();
        let statuses = [ExitStatus(1), ExitStatus(0)];
        assert_eq!(pipeline_exit_status(&env, &statuses), ExitStatus(0));

        env.options.set(PipeFail, State::On);
        assert_eq!(pipeline_exit_status(&env, &statuses), ExitStatus(1));

        let all_success = [ExitStatus(0), ExitStatus(0)];
        assert_eq!(pipeline_exit_status(&env, &all_success), ExitStatus(0));
    }

    #[test]
    fn pipe_status_variable_updated() {
        let mut env = Env::new_virtual();
        set_pipe_status(&mut env, &[ExitStatus(0), ExitStatus(3)]);
        let variable = env.variables.get(variable::PIPESTATUS).unwrap();
        assert_eq!(variable.value, Some(Value::array(["0", "3"])));
    }
}
