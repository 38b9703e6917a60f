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

//! Running trap commands
//!
//! Traps run at safe points: between commands in a list, between lines of
//! the read-eval loop, and around function returns. A signal handler only
//! records the delivered signal; [`run_pending_traps`] later picks it up and
//! executes the corresponding trap command in a [`Frame::Trap`] context.
//! A trap does not run inside itself: the pending flag is cleared before
//! execution, and the trap frame suppresses recursive execution of the same
//! condition.

use crate::runner::run_command_string;
use marsh_env::semantics::ExitStatus;
use marsh_env::stack::Frame;
use marsh_env::trap::Action;
use marsh_env::trap::Condition;
use marsh_env::Env;
use marsh_syntax::source::Source;
use std::ops::ControlFlow::{Break, Continue};
use std::rc::Rc;

/// Runs a trap command string in a trap context.
fn run_trap(env: &mut Env, condition: Condition, command: Rc<str>) -> crate::Result {
    let previous_exit_status = env.exit_status;
    let source = Rc::new(Source::Trap {
        condition: condition.to_string(),
        origin: marsh_syntax::source::Location::dummy(command.to_string()),
    });

    let mut env = env.push_frame(Frame::Trap {
        condition,
        previous_exit_status,
    });
    let result = run_command_string(&mut env, &command, source);

    // The exit status of the trap command does not replace `$?` unless the
    // trap diverted.
    match result {
        Continue(()) => {
            env.exit_status = previous_exit_status;
            Continue(())
        }
        Break(divert) => Break(divert),
    }
}

/// Tests whether a trap for the given condition is already in progress.
///
/// The search stops at a subshell boundary, where traps have been reset.
fn in_trap_for(env: &Env, condition: Condition) -> bool {
    env.stack
        .iter()
        .rev()
        .take_while(|frame| !matches!(frame, Frame::Subshell))
        .any(|frame| matches!(frame, Frame::Trap { condition: c, .. } if *c == condition))
}

/// Runs the trap commands for signals that have been caught.
///
/// This function is called at safe points between commands. Signals caught
/// inside a trap are deferred to the next safe point outside it.
pub fn run_pending_traps(env: &mut Env) -> crate::Result {
    env.poll_signals();

    if env.stack.in_trap() {
        // A trap does not run inside another trap.
        return Continue(());
    }

    while let Some((signal, state)) = env.traps.take_caught_signal() {
        if let Action::Command(command) = state.action {
            run_trap(env, Condition::Signal(signal), command)?;
        }
    }
    Continue(())
}

/// Runs the EXIT trap, if one is set.
///
/// The trap action is taken out of the trap set before running so that an
/// `exit` inside the trap does not run the trap again.
pub fn run_exit_trap(env: &mut Env) {
    let Some(command) = env.traps.get_command(Condition::Exit) else {
        return;
    };
    let mut system = env.system.clone();
    _ = env
        .traps
        .unset_action(&mut system, Condition::Exit);
    _ = run_trap(env, Condition::Exit, command);
}

/// Runs the ERR trap if the exit status is a failure and the context is not
/// a condition.
///
/// The trap does not run inside itself.
pub fn run_err_trap(env: &mut Env) -> crate::Result {
    if env.exit_status.is_successful() {
        return Continue(());
    }
    if env.stack.contains(&Frame::Condition) {
        return Continue(());
    }
    if in_trap_for(env, Condition::Err) {
        return Continue(());
    }
    let Some(command) = env.traps.get_command(Condition::Err) else {
        return Continue(());
    };
    run_trap(env, Condition::Err, command)
}

/// Runs the RETURN trap on a function or sourced-script return.
///
/// The trap does not run inside itself.
pub fn run_return_trap(env: &mut Env) {
    if in_trap_for(env, Condition::Return) {
        return;
    }
    let Some(command) = env.traps.get_command(Condition::Return) else {
        return;
    };
    _ = run_trap(env, Condition::Return, command);
}

/// Runs the DEBUG trap before a simple command.
///
/// The trap does not run inside itself, so the commands making up the trap
/// action do not trigger it again.
pub fn run_debug_trap(env: &mut Env) {
    if in_trap_for(env, Condition::Debug) {
        return;
    }
    let Some(command) = env.traps.get_command(Condition::Debug) else {
        return;
    };
    _ = run_trap(env, Condition::Debug, command);
}

/// Restores the exit status recorded when entering the current trap.
///
/// The `exit` built-in without an operand inside a trap must use the exit
/// status from before the trap, which this function retrieves.
#[must_use]
pub fn exit_status_before_trap(env: &Env) -> Option<ExitStatus> {
    env.stack.iter().rev().find_map(|frame| match frame {
        Frame::Trap {
            previous_exit_status,
            ..
        } => Some(*previous_exit_status),
        _ => None,
    })
}
