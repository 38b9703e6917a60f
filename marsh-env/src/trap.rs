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

//! Signal and other event handling settings
//!
//! The trap is a mechanism of the shell that allows you to configure event
//! handlers for specific situations. A [`TrapSet`] is a mapping from
//! [`Condition`]s to [`Action`]s. When the mapping is modified, it updates
//! the corresponding signal disposition in the underlying system through a
//! [`SignalSystem`] implementor.
//!
//! `TrapSet` manages two kinds of signal handling configuration. One is
//! user-defined traps, which the user explicitly configures with the trap
//! built-in. The other is internal dispositions, which the shell implicitly
//! installs to implement its own behavior, e.g. catching `SIGCHLD` or
//! ignoring `SIGQUIT` in an interactive shell. `TrapSet` merges the two into
//! a single [`Disposition`] for each signal.
//!
//! No signal disposition is involved for conditions other than signals; for
//! them the trap set serves only as a storage of action settings.

mod cond;
mod state;

pub use self::cond::Condition;
pub use self::state::{Action, SetActionError, TrapState};
use crate::signal;
use crate::system::{Disposition, Errno};
use marsh_syntax::source::Location;
use std::collections::BTreeMap;
use std::collections::BTreeSet;

/// System interface for signal handling configuration
pub trait SignalSystem {
    /// Returns the name of a signal from its number.
    #[must_use]
    fn signal_name_from_number(&self, number: signal::Number) -> signal::Name;

    /// Returns the signal number from its name, if supported.
    #[must_use]
    fn signal_number_from_name(&self, name: signal::Name) -> Option<signal::Number>;

    /// Sets how a signal is handled, returning the previous disposition.
    fn set_disposition(
        &mut self,
        signal: signal::Number,
        disposition: Disposition,
    ) -> Result<Disposition, Errno>;
}

impl<T: crate::system::System + ?Sized> SignalSystem for T {
    fn signal_name_from_number(&self, number: signal::Number) -> signal::Name {
        crate::system::System::signal_name_from_number(self, number)
    }

    fn signal_number_from_name(&self, name: signal::Name) -> Option<signal::Number> {
        crate::system::System::signal_number_from_name(self, name)
    }

    fn set_disposition(
        &mut self,
        signal: signal::Number,
        disposition: Disposition,
    ) -> Result<Disposition, Errno> {
        self.sigaction(signal, disposition)
    }
}

/// Collection of event handling settings
///
/// See the [module documentation](self) for details.
#[derive(Clone, Debug, Default)]
pub struct TrapSet {
    /// User-defined traps
    traps: BTreeMap<Condition, TrapState>,

    /// Trap states remembered on entering a subshell
    parent_states: BTreeMap<Condition, TrapState>,

    /// Signals that were ignored when the shell started
    initially_ignored: BTreeSet<signal::Number>,

    /// Signals the shell has probed the initial disposition of
    probed: BTreeSet<signal::Number>,

    /// Signals with an internal disposition installed by the shell
    internal_dispositions: BTreeMap<signal::Number, Disposition>,
}

impl TrapSet {
    /// Returns the current trap state for a condition.
    ///
    /// The first element of the returned pair is the currently configured
    /// trap action, and the second is the action that was set before the
    /// shell last [entered a subshell](Self::enter_subshell).
    #[must_use]
    pub fn get_state<C: Into<Condition>>(
        &self,
        cond: C,
    ) -> (Option<&TrapState>, Option<&TrapState>) {
        let cond = cond.into();
        (self.traps.get(&cond), self.parent_states.get(&cond))
    }

    /// Returns the command string of the trap for a condition, if any.
    #[must_use]
    pub fn get_command<C: Into<Condition>>(&self, cond: C) -> Option<std::rc::Rc<str>> {
        match self.traps.get(&cond.into()) {
            Some(TrapState {
                action: Action::Command(command),
                ..
            }) => Some(std::rc::Rc::clone(command)),
            _ => None,
        }
    }

    /// Computes the disposition for a signal, merging the user trap and any
    /// internal disposition.
    fn disposition_for(&self, number: signal::Number) -> Disposition {
        let user = match self.traps.get(&Condition::Signal(number)) {
            Some(TrapState {
                action: Action::Command(_),
                ..
            }) => Disposition::Catch,
            Some(TrapState {
                action: Action::Ignore,
                ..
            }) => Disposition::Ignore,
            _ => Disposition::Default,
        };
        match self.internal_dispositions.get(&number) {
            Some(Disposition::Catch) => Disposition::Catch,
            Some(Disposition::Ignore) if user == Disposition::Default => Disposition::Ignore,
            _ => user,
        }
    }

    /// Applies the merged disposition of a signal to the system, probing the
    /// initial disposition on first touch.
    fn apply_disposition<S: SignalSystem + ?Sized>(
        &mut self,
        system: &mut S,
        number: signal::Number,
    ) -> Result<(), Errno> {
        let disposition = self.disposition_for(number);
        let old = system.set_disposition(number, disposition)?;
        if self.probed.insert(number) && old == Disposition::Ignore {
            self.initially_ignored.insert(number);
        }
        Ok(())
    }

    /// Sets a trap action for a condition.
    ///
    /// If the condition is a signal, this function installs the
    /// corresponding signal disposition in the system.
    ///
    /// If `override_ignore` is `false`, you cannot set a trap for a signal
    /// that has been ignored since the shell startup. An interactive shell
    /// should set `override_ignore` to `true` to bypass this restriction.
    ///
    /// You can never set a trap for `SIGKILL` or `SIGSTOP`.
    ///
    /// This function clears all parent states remembered when [entering a
    /// subshell](Self::enter_subshell).
    pub fn set_action<S: SignalSystem + ?Sized, C: Into<Condition>>(
        &mut self,
        system: &mut S,
        cond: C,
        action: Action,
        origin: Location,
        override_ignore: bool,
    ) -> Result<(), SetActionError> {
        let cond = cond.into();

        if let Condition::Signal(number) = cond {
            match system.signal_name_from_number(number) {
                signal::Name::Kill => return Err(SetActionError::SIGKILL),
                signal::Name::Stop => return Err(SetActionError::SIGSTOP),
                _ => {}
            }

            if !override_ignore {
                // Probe the initial disposition before the first change.
                if !self.probed.contains(&number) {
                    self.apply_disposition(system, number)?;
                }
                if self.initially_ignored.contains(&number) {
                    return Err(SetActionError::InitiallyIgnored);
                }
            }
        }

        self.parent_states.clear();
        self.traps.insert(
            cond,
            TrapState {
                action,
                origin,
                pending: false,
            },
        );

        if let Condition::Signal(number) = cond {
            self.apply_disposition(system, number)?;
        }
        Ok(())
    }

    /// Removes the trap action for a condition, restoring the default.
    pub fn unset_action<S: SignalSystem + ?Sized, C: Into<Condition>>(
        &mut self,
        system: &mut S,
        cond: C,
    ) -> Result<(), SetActionError> {
        let cond = cond.into();
        self.parent_states.clear();
        self.traps.remove(&cond);
        if let Condition::Signal(number) = cond {
            self.apply_disposition(system, number)?;
        }
        Ok(())
    }

    /// Returns an iterator over the configured trap actions.
    ///
    /// Each item is the condition, the current state, and the state
    /// remembered before the last subshell entry.
    pub fn iter(
        &self,
    ) -> impl Iterator<Item = (&Condition, Option<&TrapState>, Option<&TrapState>)> {
        let conditions: BTreeSet<&Condition> =
            self.traps.keys().chain(self.parent_states.keys()).collect();
        conditions.into_iter().map(move |cond| {
            (
                cond,
                self.traps.get(cond),
                self.parent_states.get(cond),
            )
        })
    }

    /// Updates trap states on entering a subshell.
    ///
    /// POSIX requires that traps other than `Action::Ignore` be reset when
    /// entering a subshell. The trap set remembers the original trap states
    /// as parent states, which can be examined with
    /// [`get_state`](Self::get_state) until the next trap modification.
    ///
    /// If `ignore_sigint_sigquit` is true, the dispositions for `SIGINT`
    /// and `SIGQUIT` are set to ignore, as is done for asynchronous commands
    /// without job control.
    ///
    /// Errors from the system are ignored.
    pub fn enter_subshell<S: SignalSystem + ?Sized>(
        &mut self,
        system: &mut S,
        ignore_sigint_sigquit: bool,
    ) {
        self.parent_states = std::mem::take(&mut self.traps);
        // Ignored traps survive the subshell.
        for (&cond, state) in &self.parent_states {
            if state.action == Action::Ignore {
                self.traps.insert(
                    cond,
                    TrapState {
                        action: Action::Ignore,
                        origin: state.origin.clone(),
                        pending: false,
                    },
                );
            }
        }

        // Clear internal dispositions except for SIGCHLD.
        self.internal_dispositions
            .retain(|&number, _| system.signal_name_from_number(number) == signal::Name::Chld);

        // Restore the dispositions of previously trapped signals.
        for (&cond, _) in &self.parent_states.clone() {
            if let Condition::Signal(number) = cond {
                _ = self.apply_disposition(system, number);
            }
        }

        if ignore_sigint_sigquit {
            for name in [signal::Name::Int, signal::Name::Quit] {
                if let Some(number) = system.signal_number_from_name(name) {
                    self.internal_dispositions
                        .insert(number, Disposition::Ignore);
                    _ = self.apply_disposition(system, number);
                }
            }
        }
    }

    /// Sets the `pending` flag of the trap state for the specified signal.
    ///
    /// This function does nothing if no command trap has been
    /// [set](Self::set_action) for the signal.
    pub fn catch_signal(&mut self, signal: signal::Number) {
        if let Some(state) = self.traps.get_mut(&Condition::Signal(signal)) {
            if matches!(state.action, Action::Command(_)) {
                state.pending = true;
            }
        }
    }

    /// Returns a signal condition that has been caught, clearing its
    /// `pending` flag.
    ///
    /// If there is more than one caught signal, it is unspecified which one
    /// of them is returned. If there is no caught signal, `None` is
    /// returned.
    pub fn take_caught_signal(&mut self) -> Option<(signal::Number, TrapState)> {
        self.traps.iter_mut().find_map(|(&cond, state)| {
            if state.pending {
                state.pending = false;
                if let Condition::Signal(signal) = cond {
                    return Some((signal, state.clone()));
                }
            }
            None
        })
    }

    /// Removes the `DEBUG`, `ERR`, and `RETURN` traps for a function call.
    ///
    /// An untraced function does not inherit these traps; the executor takes
    /// them out before running the function body and puts them back with
    /// [`restore_function_local_traps`](Self::restore_function_local_traps)
    /// afterwards. No signal dispositions are involved since the conditions
    /// are pseudo-signals, and the parent states remembered for subshells
    /// are left untouched.
    #[must_use = "the taken traps must be restored after the call"]
    pub fn take_function_local_traps(&mut self) -> Vec<(Condition, TrapState)> {
        [Condition::Debug, Condition::Err, Condition::Return]
            .into_iter()
            .filter_map(|cond| self.traps.remove(&cond).map(|state| (cond, state)))
            .collect()
    }

    /// Reinstates traps taken by
    /// [`take_function_local_traps`](Self::take_function_local_traps).
    ///
    /// A trap set for the same condition inside the function is overwritten
    /// by the caller's state.
    pub fn restore_function_local_traps(&mut self, saved: Vec<(Condition, TrapState)>) {
        for (cond, state) in saved {
            self.traps.insert(cond, state);
        }
    }

    /// Installs the internal disposition that catches `SIGCHLD`.
    ///
    /// The shell needs to catch `SIGCHLD` to notice state changes of its
    /// child processes while waiting for input.
    pub fn enable_sigchld_handler<S: SignalSystem + ?Sized>(
        &mut self,
        system: &mut S,
    ) -> Result<(), Errno> {
        self.set_internal_disposition(system, signal::Name::Chld, Disposition::Catch)
    }

    /// Installs the internal dispositions for an interactive shell.
    ///
    /// `SIGINT` is caught and `SIGTERM` and `SIGQUIT` are ignored so that
    /// the interactive shell survives them.
    pub fn enable_terminator_handlers<S: SignalSystem + ?Sized>(
        &mut self,
        system: &mut S,
    ) -> Result<(), Errno> {
        self.set_internal_disposition(system, signal::Name::Int, Disposition::Catch)?;
        self.set_internal_disposition(system, signal::Name::Term, Disposition::Ignore)?;
        self.set_internal_disposition(system, signal::Name::Quit, Disposition::Ignore)
    }

    /// Installs the internal dispositions for a job-controlling shell.
    ///
    /// The stop signals are ignored so that the shell itself is not
    /// suspended.
    pub fn enable_stopper_handlers<S: SignalSystem + ?Sized>(
        &mut self,
        system: &mut S,
    ) -> Result<(), Errno> {
        self.set_internal_disposition(system, signal::Name::Tstp, Disposition::Ignore)?;
        self.set_internal_disposition(system, signal::Name::Ttin, Disposition::Ignore)?;
        self.set_internal_disposition(system, signal::Name::Ttou, Disposition::Ignore)
    }

    fn set_internal_disposition<S: SignalSystem + ?Sized>(
        &mut self,
        system: &mut S,
        name: signal::Name,
        disposition: Disposition,
    ) -> Result<(), Errno> {
        let Some(number) = system.signal_number_from_name(name) else {
            return Ok(());
        };
        self.internal_dispositions.insert(number, disposition);
        self.apply_disposition(system, number)
    }
}
