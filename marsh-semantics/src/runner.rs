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

//! Read-eval loop
//!
//! The [`ReadEvalLoop`] reads, parses, and executes commands from an input.
//! One complete command line is parsed and executed at a time, with pending
//! traps running between lines.
//!
//! A syntax error prints an annotated message and resets the parser to a
//! known-good state: non-interactively, the shell exits with status 2;
//! interactively, the rest of the line is discarded and the loop continues
//! with the next line.

use crate::command::Command;
use crate::trap::run_pending_traps;
use marsh_env::semantics::Divert;
use marsh_env::semantics::ExitStatus;
use marsh_env::Env;
use marsh_syntax::parser::lex::Lexer;
use marsh_syntax::parser::Parser;
use marsh_syntax::source::Source;
use std::num::NonZeroU64;
use std::ops::ControlFlow::{Break, Continue};
use std::rc::Rc;

/// Read-eval loop over a lexer
#[derive(Debug)]
pub struct ReadEvalLoop<'a, 'b> {
    env: &'a mut Env,
    lexer: &'a mut Lexer<'b>,
}

impl<'a, 'b> ReadEvalLoop<'a, 'b> {
    /// Creates a new read-eval loop.
    pub fn new(env: &'a mut Env, lexer: &'a mut Lexer<'b>) -> Self {
        ReadEvalLoop { env, lexer }
    }

    /// Runs the loop until the end of input or a divert.
    ///
    /// The exit status of the last executed command remains in
    /// `env.exit_status`; if the input contains no commands, the exit
    /// status is set to zero.
    pub fn run(self) -> crate::Result {
        let mut executed = false;

        loop {
            run_pending_traps(self.env)?;

            let parse_result = {
                let aliases = self.env.aliases.clone();
                let mut parser = Parser::config().aliases(&aliases).input(self.lexer);
                parser.command_line()
            };

            let list = match parse_result {
                Ok(Some(list)) => list,
                Ok(None) => break,
                Err(error) => {
                    self.env.print_message(&error);
                    self.env.exit_status = ExitStatus::ERROR;
                    if self.env.is_interactive() {
                        // Discard the rest of the line and resume parsing in
                        // a known-good state.
                        _ = self.lexer.line();
                        continue;
                    }
                    return Break(Divert::Exit(Some(ExitStatus::ERROR)));
                }
            };

            if !list.0.is_empty() {
                executed = true;
            }
            match list.execute(self.env) {
                Continue(()) => (),
                Break(Divert::Interrupt(exit_status)) if self.env.is_interactive() => {
                    if let Some(exit_status) = exit_status {
                        self.env.exit_status = exit_status;
                    }
                }
                Break(divert) => return Break(divert),
            }
        }

        if !executed {
            self.env.exit_status = ExitStatus::SUCCESS;
        }
        Continue(())
    }
}

/// Parses and executes a command string.
///
/// This function is used wherever the shell executes dynamically produced
/// code: command substitutions, the `eval` built-in, and trap commands. The
/// given source identifies the origin in error messages.
pub fn run_command_string(env: &mut Env, code: &str, source: Rc<Source>) -> crate::Result {
    let mut lexer = Lexer::new(
        Box::new(marsh_syntax::input::Memory::new(code)),
        NonZeroU64::new(1).unwrap(),
        source,
    );
    ReadEvalLoop::new(env, &mut lexer).run()
}
