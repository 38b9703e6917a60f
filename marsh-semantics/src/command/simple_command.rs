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

//! Implementation of simple command semantics
//!
//! Executing a simple command expands its words and then dispatches on the
//! [command search](crate::command_search) result:
//!
//! - With no resulting field, the assignments are performed in the current
//!   context and the exit status is that of the last command substitution.
//! - A built-in runs in the current shell environment, with its assignments
//!   in a volatile context (except for special built-ins, whose assignments
//!   persist per POSIX).
//! - A function call pushes a new regular variable context and positional
//!   parameters, and runs the function body.
//! - An external utility runs in a forked child; the child applies the
//!   redirections and assignments and then `execve`s, exiting with 127 if
//!   the utility was not found and 126 if it could not be executed.

use super::Command;
use crate::assign::perform_assignments;
use crate::command_search::search;
use crate::command_search::Target;
use crate::expansion::expand_words;
use crate::redir::RedirGuard;
use crate::trap::run_debug_trap;
use crate::trap::run_return_trap;
use crate::xtrace::trace_fields;
use crate::Handle;
use marsh_env::builtin::Builtin;
use marsh_env::builtin::Type;
use marsh_env::function::Function;
use marsh_env::job::ProcessState;
use marsh_env::semantics::Divert;
use marsh_env::semantics::ExitStatus;
use marsh_env::semantics::Field;
use marsh_env::stack::Frame;
use marsh_env::option;
use marsh_env::system::Errno;
use marsh_env::system::System;
use marsh_env::variable;
use marsh_env::variable::Context;
use marsh_env::variable::PositionalParams;
use marsh_env::variable::Scope;
use marsh_env::variable::Value;
use marsh_env::Env;
use marsh_syntax::source::Location;
use marsh_syntax::syntax;
use std::ffi::CString;
use std::ops::ControlFlow::{Break, Continue};
use std::rc::Rc;

impl Command for syntax::SimpleCommand {
    fn execute(&self, env: &mut Env) -> crate::Result {
        run_debug_trap(env);

        let (fields, exit_status) = match expand_words(env, &self.words) {
            Ok(result) => result,
            Err(error) => return error.handle(env),
        };

        if fields.is_empty() {
            execute_absent_target(env, self, exit_status)
        } else {
            trace_fields(env, &fields);
            execute_with_target(env, self, fields)
        }
    }
}

/// Executes a simple command that has no command word.
fn execute_absent_target(
    env: &mut Env,
    command: &syntax::SimpleCommand,
    exit_status: Option<ExitStatus>,
) -> crate::Result {
    let mut env = RedirGuard::new(env);
    let redir_exit_status = match env.perform_redirs(&*command.redirs) {
        Ok(exit_status) => exit_status,
        Err(error) => {
            error.handle(&mut env)?;
            return Continue(());
        }
    };

    // Assignments persist in the current context.
    let assign_exit_status =
        match perform_assignments(&mut env, &command.assigns, Scope::Global, false) {
            Ok(exit_status) => exit_status,
            Err(error) => {
                error.handle(&mut env)?;
                return Continue(());
            }
        };

    env.exit_status = assign_exit_status
        .or(redir_exit_status)
        .or(exit_status)
        .unwrap_or(ExitStatus::SUCCESS);
    Continue(())
}

/// Executes a simple command with a command word.
fn execute_with_target(
    env: &mut Env,
    command: &syntax::SimpleCommand,
    fields: Vec<Field>,
) -> crate::Result {
    let name = fields[0].clone();

    // A leading `%job` word resumes the job in the foreground.
    if name.value.starts_with('%') && env.controls_jobs() {
        if let Some(&builtin) = env.builtins.get("fg") {
            return run_job_shorthand(env, builtin, fields);
        }
    }

    match search(env, &name.value) {
        Some(Target::Builtin(builtin)) => execute_builtin(env, command, builtin, fields),
        Some(Target::Function(function)) => execute_function(env, command, function, fields),
        Some(Target::External { path }) => execute_external(env, command, path, fields),
        None => {
            env.print_error(&format!("{}: command not found", name.value));
            env.exit_status = ExitStatus::NOT_FOUND;
            Continue(())
        }
    }
}

/// Runs the `fg` built-in for a `%job` command word.
fn run_job_shorthand(env: &mut Env, builtin: Builtin, fields: Vec<Field>) -> crate::Result {
    let name = Field {
        value: "fg".to_owned(),
        origin: fields[0].origin.clone(),
    };
    let (exit_status, divert, _) = run_builtin(env, builtin, name, fields, false);
    env.exit_status = exit_status;
    divert
}

/// Executes a built-in utility.
fn execute_builtin(
    env: &mut Env,
    command: &syntax::SimpleCommand,
    builtin: Builtin,
    mut fields: Vec<Field>,
) -> crate::Result {
    let name = fields.remove(0);
    let is_special = builtin.r#type == Type::Special;

    let mut env = RedirGuard::new(env);
    if let Err(error) = env.perform_redirs(&*command.redirs) {
        error.handle(&mut env)?;
        return if is_special {
            // A redirection error on a special built-in interrupts a
            // non-interactive shell.
            special_builtin_error(&mut env)
        } else {
            Continue(())
        };
    }

    let result = if is_special {
        // Assignments on a special built-in persist.
        if let Err(error) = perform_assignments(&mut env, &command.assigns, Scope::Global, false) {
            error.handle(&mut env)?;
            return special_builtin_error(&mut env);
        }
        run_builtin(&mut env, builtin, name, fields, is_special)
    } else {
        // Assignments on a regular built-in are temporary and exported.
        let mut env = env.push_context(Context::Volatile);
        if let Err(error) = perform_assignments(&mut env, &command.assigns, Scope::Volatile, true)
        {
            error.handle(&mut env)?;
            return Continue(());
        }
        run_builtin(&mut env, builtin, name, fields, is_special)
    };

    let (exit_status, divert, retain_redirs) = result;
    env.exit_status = exit_status;
    if retain_redirs {
        env.preserve_redirs();
    }
    divert
}

fn run_builtin(
    env: &mut Env,
    builtin: Builtin,
    name: Field,
    fields: Vec<Field>,
    is_special: bool,
) -> (ExitStatus, crate::Result, bool) {
    let mut env = env.push_frame(Frame::Builtin { name, is_special });
    let result = (builtin.execute)(&mut env, fields);
    (
        result.exit_status(),
        result.divert(),
        result.should_retain_redirs(),
    )
}

/// Interrupts the shell after an error in a special built-in, per POSIX.
fn special_builtin_error(env: &mut Env) -> crate::Result {
    if env.is_interactive() {
        Continue(())
    } else {
        Break(Divert::Interrupt(None))
    }
}

/// Calls a function.
///
/// A function call pushes a regular variable context holding the new
/// positional parameters and a [`Frame::Function`], updates `FUNCNAME`, and
/// executes the function body cloned from the function definition. A
/// `return` divert is caught here; the RETURN trap runs in the function's
/// context just before it is popped.
fn execute_function(
    env: &mut Env,
    command: &syntax::SimpleCommand,
    function: Rc<Function>,
    mut fields: Vec<Field>,
) -> crate::Result {
    let name = fields.remove(0);

    let mut env = RedirGuard::new(env);
    if let Err(error) = env.perform_redirs(&*command.redirs) {
        error.handle(&mut env)?;
        return Continue(());
    }

    // Temporary assignments for the duration of the call
    let mut env = env.push_context(Context::Volatile);
    if let Err(error) = perform_assignments(&mut env, &command.assigns, Scope::Volatile, true) {
        error.handle(&mut env)?;
        return Continue(());
    }

    let positional_params = PositionalParams {
        values: fields.iter().map(|field| field.value.clone()).collect(),
        last_modified_location: Some(name.origin.clone()),
    };
    let mut env = env.push_context(Context::Regular { positional_params });

    let saved_stack = push_call_stack_frame(&mut env, &function, &name.origin);

    // An untraced function does not inherit the DEBUG, ERR, and RETURN
    // traps; they revert to their defaults for the duration of the call.
    let traced =
        function.is_traced || env.options.get(option::FuncTrace) == option::State::On;
    let saved_traps = if traced {
        Vec::new()
    } else {
        env.traps.take_function_local_traps()
    };

    let result = {
        let mut env = env.push_frame(Frame::Function { name });
        let result = function.body.execute(&mut env);
        run_return_trap(&mut env);
        result
    };

    env.traps.restore_function_local_traps(saved_traps);
    pop_call_stack_frame(&mut env, saved_stack);

    match result {
        Break(Divert::Return(exit_status)) => {
            if let Some(exit_status) = exit_status {
                env.exit_status = exit_status;
            }
            Continue(())
        }
        other => other,
    }
}

/// Values of the call-stack arrays saved across a function call
struct CallStackFrame {
    funcname: Option<Value>,
    bash_source: Option<Value>,
    bash_lineno: Option<Value>,
}

/// Prepends an element to a saved array value, yielding the pushed value.
fn prepend_frame(saved: &Option<Value>, first: String) -> Value {
    let mut values = vec![first];
    if let Some(Value::Indexed(old)) = saved {
        values.extend(old.values().cloned());
    }
    Value::array(values)
}

fn assign_stack_variable(env: &mut Env, name: &str, value: Value) {
    _ = env
        .variables
        .get_or_new(name.to_owned(), Scope::Global)
        .assign(value, None);
}

/// Pushes a frame on the `FUNCNAME`, `BASH_SOURCE`, and `BASH_LINENO`
/// arrays.
///
/// The three arrays are synchronized stacks describing the call chain:
/// element 0 of `FUNCNAME` is the called function, element 0 of
/// `BASH_SOURCE` names the source that defined it, and element 0 of
/// `BASH_LINENO` is the line number of the call. The previous values are
/// returned so that [`pop_call_stack_frame`] can restore them.
fn push_call_stack_frame(
    env: &mut Env,
    function: &Function,
    call_origin: &Location,
) -> CallStackFrame {
    let value_of = |env: &Env, name: &str| {
        env.variables
            .get(name)
            .and_then(|variable| variable.value.clone())
    };
    let saved = CallStackFrame {
        funcname: value_of(env, variable::FUNCNAME),
        bash_source: value_of(env, variable::BASH_SOURCE),
        bash_lineno: value_of(env, variable::BASH_LINENO),
    };

    let source = function.origin.code.source.label().to_owned();
    let line = call_origin
        .code
        .line_number(call_origin.range.start)
        .to_string();

    assign_stack_variable(
        env,
        variable::FUNCNAME,
        prepend_frame(&saved.funcname, function.name.clone()),
    );
    assign_stack_variable(
        env,
        variable::BASH_SOURCE,
        prepend_frame(&saved.bash_source, source),
    );
    assign_stack_variable(
        env,
        variable::BASH_LINENO,
        prepend_frame(&saved.bash_lineno, line),
    );
    saved
}

/// Pops the frame pushed by [`push_call_stack_frame`].
fn pop_call_stack_frame(env: &mut Env, saved: CallStackFrame) {
    for (name, value) in [
        (variable::FUNCNAME, saved.funcname),
        (variable::BASH_SOURCE, saved.bash_source),
        (variable::BASH_LINENO, saved.bash_lineno),
    ] {
        match value {
            Some(value) => assign_stack_variable(env, name, value),
            None => {
                _ = env.variables.unset(name, Scope::Global);
            }
        }
    }
}

/// Replaces the current process with an external utility.
///
/// This function only returns if the `execve` call failed, in which case
/// the result is a `Divert::Exit` with status 127 (not found) or 126 (not
/// executable). It is meant to run in a forked child.
pub(crate) fn exec_in_child(env: &mut Env, path: &CString, fields: &[Field]) -> crate::Result {
    let args: Vec<CString> = fields
        .iter()
        .filter_map(|field| CString::new(field.value.clone()).ok())
        .collect();
    let envs = env.export_env().to_vec();
    let errno = match env.system.execve(path, &args, &envs) {
        Err(errno) => errno,
        Ok(never) => match never {},
    };

    let name = &fields[0].value;
    let exit_status = match errno {
        Errno::ENOENT | Errno::ENOTDIR => {
            env.print_error(&format!("{name}: command not found"));
            ExitStatus::NOT_FOUND
        }
        errno => {
            env.print_error(&format!("cannot execute {name}: {errno}"));
            ExitStatus::NOEXEC
        }
    };
    Break(Divert::Exit(Some(exit_status)))
}

/// Waits for a forked child and reflects its state in the exit status.
fn wait_and_set_status(env: &mut Env, pid: marsh_env::system::Pid, name: &str) -> crate::Result {
    match env.wait_for_subshell(pid) {
        Ok(ProcessState::Stopped(signal)) => {
            env.exit_status = ExitStatus::from(signal);
            Continue(())
        }
        Ok(state) => {
            env.exit_status = state.to_exit_status();
            Continue(())
        }
        Err(errno) => {
            env.print_error(&format!("cannot wait for {name}: {errno}"));
            env.exit_status = ExitStatus::NOEXEC;
            Continue(())
        }
    }
}

/// Runs an external utility in a forked child and waits for it.
///
/// No redirections or assignments are applied beyond those already in
/// effect. This is the execution path of the `command` built-in.
pub fn start_external(env: &mut Env, path: CString, fields: Vec<Field>) -> crate::Result {
    let fields_for_child = fields.clone();
    let result = env.start_subshell(
        move |env| exec_in_child(env, &path, &fields_for_child),
        false,
    );
    match result {
        Ok(pid) => wait_and_set_status(env, pid, &fields[0].value),
        Err(errno) => {
            env.print_error(&format!("cannot execute {}: {errno}", fields[0].value));
            env.exit_status = ExitStatus::NOEXEC;
            Continue(())
        }
    }
}

/// Executes an external utility.
fn execute_external(
    env: &mut Env,
    command: &syntax::SimpleCommand,
    path: CString,
    fields: Vec<Field>,
) -> crate::Result {
    let redirs = Rc::clone(&command.redirs);
    let assigns = command.assigns.clone();
    let fields_for_child = fields.clone();
    let path_for_child = path.clone();

    let result = env.start_subshell(
        move |env| {
            // In the child, the redirections and assignments need no undo.
            let mut env_guard = RedirGuard::new(env);
            if let Err(error) = env_guard.perform_redirs(&*redirs) {
                error.handle(&mut env_guard)?;
                env_guard.preserve_redirs();
                return Break(Divert::Exit(Some(ExitStatus::FAILURE)));
            }
            env_guard.preserve_redirs();
            drop(env_guard);

            if let Err(error) = perform_assignments(env, &assigns, Scope::Global, true) {
                error.handle(env)?;
                return Break(Divert::Exit(Some(ExitStatus::FAILURE)));
            }

            exec_in_child(env, &path_for_child, &fields_for_child)
        },
        false,
    );

    match result {
        Ok(pid) => wait_and_set_status(env, pid, &fields[0].value),
        Err(errno) => {
            env.print_error(&format!("cannot execute {}: {errno}", fields[0].value));
            env.exit_status = ExitStatus::NOEXEC;
            Continue(())
        }
    }
}
