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

//! Entry points of the marsh executable
//!
//! This crate wires the workspace together: it parses the command line,
//! imports the environment, sources the startup files, and runs the
//! read-eval loop over the selected input.

pub use marsh_builtin as builtin;
pub use marsh_env as env;
pub use marsh_semantics as semantics;
#[doc(no_inline)]
pub use marsh_syntax::{alias, parser, source, syntax};

mod prompt;
mod startup;

use marsh_env::input::FdReader;
use marsh_env::semantics::Divert;
use marsh_env::semantics::ExitStatus;
use marsh_env::system::Fd;
use marsh_env::system::RealSystem;
use marsh_env::system::System;
use marsh_env::system::SystemEx;
use marsh_env::Env;
use marsh_semantics::trap::run_exit_trap;
use marsh_syntax::parser::lex::Lexer;
use marsh_syntax::source::Source;
use prompt::PromptingReader;
use startup::import_environment;
use startup::source_startup_files;
use startup::Invocation;
use startup::Work;
use std::num::NonZeroU64;
use std::ops::ControlFlow::{Break, Continue};
use std::process::ExitCode;
use std::rc::Rc;

fn run_with_lexer(env: &mut Env, lexer: &mut Lexer) -> marsh_env::semantics::Result {
    marsh_semantics::ReadEvalLoop::new(env, lexer).run()
}

fn run(env: &mut Env, invocation: &Invocation) -> marsh_env::semantics::Result {
    match &invocation.work {
        Work::CommandString(command) => {
            let mut lexer = Lexer::new(
                Box::new(marsh_syntax::input::Memory::new(command)),
                NonZeroU64::new(1).unwrap(),
                Rc::new(Source::CommandString),
            );
            run_with_lexer(env, &mut lexer)
        }
        Work::File(path) => {
            let c_path = match std::ffi::CString::new(path.clone()) {
                Ok(c_path) => c_path,
                Err(_) => {
                    env.print_error("invalid script path");
                    return Break(Divert::Exit(Some(ExitStatus::NOT_FOUND)));
                }
            };
            let fd = match env.system.open(
                &c_path,
                marsh_env::system::OfdAccess::ReadOnly,
                Default::default(),
                marsh_env::system::Mode::default(),
            ) {
                Ok(fd) => fd,
                Err(errno) => {
                    env.print_error(&format!("cannot open {path}: {errno}"));
                    return Break(Divert::Exit(Some(ExitStatus::NOT_FOUND)));
                }
            };
            let fd = match env.system.move_fd_internal(fd) {
                Ok(fd) => fd,
                Err(_) => fd,
            };
            let reader = FdReader::new(env.system.clone(), fd);
            let mut lexer = Lexer::new(
                Box::new(reader),
                NonZeroU64::new(1).unwrap(),
                Rc::new(Source::CommandFile { path: path.clone() }),
            );
            let result = run_with_lexer(env, &mut lexer);
            _ = env.system.close(fd);
            result
        }
        Work::Stdin => {
            let reader = FdReader::new(env.system.clone(), Fd::STDIN);
            if env.is_interactive() {
                let reader = PromptingReader::new(env.system.clone(), reader);
                let mut lexer = Lexer::new(
                    Box::new(reader),
                    NonZeroU64::new(1).unwrap(),
                    Rc::new(Source::Stdin),
                );
                run_interactive(env, &mut lexer)
            } else {
                let mut lexer = Lexer::new(
                    Box::new(reader),
                    NonZeroU64::new(1).unwrap(),
                    Rc::new(Source::Stdin),
                );
                run_with_lexer(env, &mut lexer)
            }
        }
    }
}

/// Runs the interactive loop, reaping jobs between commands.
fn run_interactive(env: &mut Env, lexer: &mut Lexer) -> marsh_env::semantics::Result {
    loop {
        env.update_job_states();
        match run_with_lexer(env, lexer) {
            Continue(()) => return Continue(()),
            Break(Divert::Interrupt(exit_status)) => {
                if let Some(exit_status) = exit_status {
                    env.exit_status = exit_status;
                }
            }
            Break(divert) => return Break(divert),
        }
    }
}

/// Entry point of the shell
///
/// This function sets up the environment per the invocation, runs the
/// selected input to completion, runs the EXIT trap, and returns the exit
/// status as the process exit code.
pub fn bin_main() -> ExitCode {
    // SAFETY: This is the only instance of RealSystem in the process.
    let system = unsafe { RealSystem::new() };
    let mut env = Env::with_system(Box::new(system));

    env.builtins.extend(marsh_builtin::BUILTINS.iter().cloned());

    let invocation = match Invocation::from_args(std::env::args()) {
        Ok(invocation) => invocation,
        Err(message) => {
            env.arg0 = std::env::args().next().unwrap_or_else(|| "marsh".to_owned());
            env.print_error(&message);
            return ExitCode::from(2);
        }
    };

    startup::initialize(&mut env, &invocation);
    import_environment(&mut env);
    source_startup_files(&mut env, &invocation);

    let result = run(&mut env, &invocation);
    let mut exit_status = env.exit_status;
    match result {
        Continue(()) => {
            run_exit_trap(&mut env);
        }
        Break(Divert::Abort(status)) => {
            exit_status = status.unwrap_or(exit_status);
        }
        Break(divert) => {
            exit_status = divert.exit_status().unwrap_or(exit_status);
            env.exit_status = exit_status;
            run_exit_trap(&mut env);
        }
    }

    ExitCode::from(exit_status.0 as u8)
}
