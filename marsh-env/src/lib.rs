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

//! This crate defines the shell execution environment.
//!
//! A shell execution environment is a collection of data that may affect or
//! be affected by the execution of commands. The environment consists of
//! application-managed parts and system-managed parts. Application-managed
//! parts, like [function](function)s and [variable](variable)s, are
//! implemented in pure Rust in this crate and can be manipulated
//! independently of the underlying system. System-managed parts, like the
//! file descriptor table and the process table, are accessed through the
//! [`System`](system::System) trait.
//!
//! The [`Env`] struct owns all of the environment, and is passed by mutable
//! reference throughout the executor. Signal handlers do not touch it
//! directly; they only record delivered signals in the system layer, and
//! the executor drains them at safe points via [`Env::poll_signals`].

pub mod builtin;
pub mod function;
pub mod input;
pub mod job;
pub mod option;
pub mod semantics;
pub mod signal;
pub mod stack;
pub mod system;
pub mod trap;
pub mod variable;

use self::builtin::Builtin;
use self::function::FunctionSet;
use self::job::JobList;
use self::job::ProcessState;
use self::option::{Monitor, OptionSet, State};
use self::semantics::Divert;
use self::semantics::ExitStatus;
use self::stack::Frame;
use self::stack::Stack;
use self::system::Errno;
use self::system::Fd;
use self::system::Fork;
use self::system::Pid;
use self::system::SharedSystem;
use self::system::System;
use self::system::SystemEx;
use self::trap::TrapSet;
use self::variable::Quirk;
use self::variable::QuirkContext;
use self::variable::Scope;
use self::variable::VariableRefMut;
use self::variable::VariableSet;
use marsh_syntax::alias::AliasSet;
use marsh_syntax::source::pretty::Message;
use marsh_syntax::source::pretty::MessageBase;
use std::collections::HashMap;
use std::ffi::CString;
use std::ops::ControlFlow::{Break, Continue};
use std::rc::Rc;

/// Whole shell execution environment
///
/// The shell execution environment consists of application-managed parts and
/// system-managed parts. Application-managed parts are directly implemented
/// in the `Env` instance. System-managed parts are accessed through
/// [`Env::system`].
#[derive(Debug)]
pub struct Env {
    /// Aliases defined in the environment
    pub aliases: AliasSet,

    /// Name under which the shell was invoked, used for `$0`
    pub arg0: String,

    /// Built-in utilities available in the environment
    pub builtins: HashMap<&'static str, Builtin>,

    /// Exit status of the last executed command (`$?`)
    pub exit_status: ExitStatus,

    /// Functions defined in the environment
    pub functions: FunctionSet,

    /// Jobs managed in the environment
    pub jobs: JobList,

    /// Process ID of the main shell process
    ///
    /// This value does not change even in subshells, so `$$` expands to the
    /// same value everywhere.
    pub main_pid: Pid,

    /// Shell options
    pub options: OptionSet,

    /// Runtime execution context stack
    pub stack: Stack,

    /// Traps defined in the environment
    pub traps: TrapSet,

    /// File descriptor connected to the controlling terminal, if known
    pub tty: Option<Fd>,

    /// Variables and positional parameters defined in the environment
    pub variables: VariableSet,

    /// Cache of `$PATH` command search results
    ///
    /// The cache is flushed when `PATH` is assigned to.
    pub command_paths: HashMap<String, CString>,

    /// Cached environment array for `execve`
    ///
    /// The cache is regenerated whenever it is taken while dirty; any
    /// mutation of exported variables or functions must call
    /// [`invalidate_export_env`](Self::invalidate_export_env).
    export_env: Option<Rc<Vec<CString>>>,

    /// Interface to the system-managed parts of the environment
    pub system: SharedSystem,
}

impl Env {
    /// Creates a new environment with the given system.
    pub fn with_system(system: Box<dyn System>) -> Env {
        let system = SharedSystem::new(system);
        let main_pid = system.getpid();
        Env {
            aliases: AliasSet::default(),
            arg0: String::new(),
            builtins: HashMap::new(),
            exit_status: ExitStatus::SUCCESS,
            functions: FunctionSet::new(),
            jobs: JobList::new(),
            main_pid,
            options: OptionSet::default(),
            stack: Stack::default(),
            traps: TrapSet::default(),
            tty: None,
            variables: VariableSet::new(),
            command_paths: HashMap::new(),
            export_env: None,
            system,
        }
    }

    /// Creates a new environment with a virtual system, for testing.
    pub fn new_virtual() -> Env {
        Env::with_system(Box::new(system::VirtualSystem::new()))
    }

    /// Returns whether the shell is interactive.
    #[must_use]
    pub fn is_interactive(&self) -> bool {
        self.options.get(option::Interactive) == State::On
    }

    /// Returns whether job control is active.
    #[must_use]
    pub fn controls_jobs(&self) -> bool {
        self.options.get(Monitor) == State::On
    }

    /// Returns a mutable reference to the named variable, creating it if it
    /// does not exist.
    ///
    /// This function applies the `AllExport` option: with the option on, the
    /// returned variable is marked exported.
    pub fn get_or_create_variable<S: Into<String>>(
        &mut self,
        name: S,
        scope: Scope,
    ) -> VariableRefMut {
        let all_export = self.options.get(option::AllExport) == State::On;
        let mut variable = self.variables.get_or_new(name, scope);
        if all_export {
            variable.export(true);
        }
        variable
    }

    /// Builds the [`QuirkContext`] for expanding dynamic variables.
    #[must_use]
    pub fn quirk_context(&self) -> QuirkContext {
        QuirkContext {
            monotonic_seconds: self.system.monotonic_clock().as_secs() as i64,
            epoch_seconds: self.system.epoch_time(),
        }
    }

    /// Performs the side effects of assigning to a special variable name.
    ///
    /// A fixed list of names has a post-assignment hook: `PATH` flushes the
    /// command location cache, `RANDOM` reseeds the generator, `SECONDS`
    /// rebases the timer. Unrecognized names cost one comparison chain.
    /// This function also invalidates the export environment cache.
    pub fn notify_assignment(&mut self, name: &str) {
        self.invalidate_export_env();
        match name {
            variable::PATH => self.command_paths.clear(),
            variable::RANDOM => {
                let seed = self
                    .variables
                    .get_scalar(variable::RANDOM)
                    .and_then(|value| value.parse().ok());
                if let Some(seed) = seed {
                    let mut variable = self.variables.get_or_new(variable::RANDOM, Scope::Global);
                    variable.set_quirk(Some(Quirk::random(seed)));
                }
            }
            variable::SECONDS => {
                let now = self.system.monotonic_clock().as_secs() as i64;
                let base: i64 = self
                    .variables
                    .get_scalar(variable::SECONDS)
                    .and_then(|value| value.parse().ok())
                    .unwrap_or(0);
                let mut variable = self.variables.get_or_new(variable::SECONDS, Scope::Global);
                variable.set_quirk(Some(Quirk::seconds(now - base)));
            }
            _ => (),
        }
    }

    /// Invalidates the cached environment array.
    pub fn invalidate_export_env(&mut self) {
        self.export_env = None;
    }

    /// Returns the environment array for `execve`, rebuilding it if dirty.
    ///
    /// The array contains a `NAME=VALUE` entry for every exported variable
    /// and an encoded entry for every exported function.
    pub fn export_env(&mut self) -> Rc<Vec<CString>> {
        if let Some(cache) = &self.export_env {
            return Rc::clone(cache);
        }

        let mut entries = self.variables.env_c_strings();
        for function in self.functions.iter() {
            if function.is_exported {
                let encoded = format!(
                    "{}{}{}=() {{ {}; }}",
                    variable::FUNCTION_PREFIX,
                    function.name,
                    variable::FUNCTION_SUFFIX,
                    function.body.command,
                );
                if let Ok(entry) = CString::new(encoded) {
                    entries.push(entry);
                }
            }
        }

        let cache = Rc::new(entries);
        self.export_env = Some(Rc::clone(&cache));
        cache
    }

    /// Replaces a single `NAME=` entry of the export environment cache.
    ///
    /// This is a narrow optimization for names like `PWD` and `OLDPWD` that
    /// the shell reassigns frequently: the cache slot is replaced in place
    /// instead of regenerating the whole array.
    pub fn update_export_env_slot(&mut self, name: &str) {
        let Some(cache) = &mut self.export_env else {
            return;
        };
        let Some(value) = self.variables.get_scalar(name) else {
            return;
        };
        let Ok(new_entry) = CString::new(format!("{name}={value}")) else {
            return;
        };
        let prefix = format!("{name}=");
        let entries = Rc::make_mut(cache);
        if let Some(slot) = entries
            .iter_mut()
            .find(|entry| entry.to_bytes().starts_with(prefix.as_bytes()))
        {
            *slot = new_entry;
        } else {
            entries.push(new_entry);
        }
    }

    /// Drains signals caught by the signal handler and marks the
    /// corresponding traps pending.
    ///
    /// Returns the drained signals.
    pub fn poll_signals(&mut self) -> Vec<signal::Number> {
        let signals = self.system.caught_signals();
        for &signal in &signals {
            self.traps.catch_signal(signal);
        }
        signals
    }

    /// Tests whether the `ErrExit` option applies to the current state.
    ///
    /// The result is a `Break(Divert::Exit(None))` if the option is on, the
    /// exit status is non-zero, and the current context is not a condition
    /// context. Otherwise, the result is `Continue(())`.
    pub fn apply_errexit(&self) -> semantics::Result {
        if self.options.get(option::ErrExit) == State::On
            && !self.exit_status.is_successful()
            && !self.stack.contains(&Frame::Condition)
        {
            Break(Divert::Exit(None))
        } else {
            Continue(())
        }
    }

    /// Prints an error message to the standard error.
    ///
    /// The message is prefixed with the shell name.
    pub fn print_error(&mut self, message: &str) {
        let text = format!("{}: {}", self.arg0, message);
        _ = self.system.write_all(Fd::STDERR, text.as_bytes());
        if !text.ends_with('\n') {
            _ = self.system.write_all(Fd::STDERR, b"\n");
        }
    }

    /// Renders an error as an annotated snippet and prints it to the
    /// standard error.
    pub fn print_message<E: MessageBase>(&mut self, error: &E) {
        let message = Message::from(error);
        let text = format!("{message}\n");
        _ = self.system.write_all(Fd::STDERR, text.as_bytes());
    }

    /// Starts a subshell.
    ///
    /// This function forks a child process. In the child, the traps are
    /// [reset](TrapSet::enter_subshell), a [`Frame::Subshell`] is pushed, the
    /// job list is cleared, and then `f` runs; the child exits with the
    /// resulting exit status and never returns from this function. In the
    /// parent, the child's process ID is returned immediately.
    ///
    /// If `ignore_interrupts` is true, the subshell ignores `SIGINT` and
    /// `SIGQUIT`, as POSIX requires of asynchronous commands executed
    /// without job control.
    pub fn start_subshell<F>(&mut self, f: F, ignore_interrupts: bool) -> Result<Pid, Errno>
    where
        F: FnOnce(&mut Env) -> semantics::Result,
    {
        match unsafe { self.system.fork() }? {
            Fork::Parent { child } => Ok(child),
            Fork::Child => {
                let divert = self.run_as_subshell(f, ignore_interrupts);
                let status = match divert {
                    Continue(()) => self.exit_status,
                    Break(divert) => divert.exit_status().unwrap_or(self.exit_status),
                };
                self.system.exit(status.0)
            }
        }
    }

    fn run_as_subshell<F>(&mut self, f: F, ignore_interrupts: bool) -> semantics::Result
    where
        F: FnOnce(&mut Env) -> semantics::Result,
    {
        {
            let mut system = self.system.clone();
            self.traps.enter_subshell(&mut system, ignore_interrupts);
        }
        self.jobs = JobList::new();
        let mut env = self.push_frame(Frame::Subshell);
        f(&mut env)
    }

    /// Waits for a subshell to finish or stop.
    ///
    /// Signals caught while waiting are [polled](Self::poll_signals) so that
    /// the caller can run pending traps after the wait.
    pub fn wait_for_subshell(&mut self, pid: Pid) -> Result<ProcessState, Errno> {
        loop {
            match self.system.wait(Some(pid), false, true) {
                Ok(status) => {
                    if let Some(state) = ProcessState::from_wait_status(status) {
                        if status.pid() == Some(pid) && !matches!(state, ProcessState::Running) {
                            return Ok(state);
                        }
                    }
                }
                Err(Errno::EINTR) => {
                    self.poll_signals();
                }
                Err(errno) => return Err(errno),
            }
        }
    }

    /// Reaps finished asynchronous jobs without blocking.
    ///
    /// Updates the job list with the observed state changes.
    pub fn update_job_states(&mut self) {
        loop {
            match self.system.wait(None, true, true) {
                Ok(status) => {
                    let Some(pid) = status.pid() else { break };
                    if let Some(state) = ProcessState::from_wait_status(status) {
                        self.jobs.update_state(pid, state);
                    }
                }
                Err(_) => break,
            }
        }
    }
}
