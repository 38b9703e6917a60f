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

//! Kill built-in
//!
//! The **`kill`** built-in sends a signal to processes or jobs.
//!
//! # Syntax
//!
//! ```sh
//! kill [-signal] pid_or_job_id...
//! kill -l
//! ```

use crate::common::output;
use crate::common::report_error;
use marsh_env::builtin::Result;
use marsh_env::semantics::Field;
use marsh_env::signal;
use marsh_env::system::Pid;
use marsh_env::system::System;
use marsh_env::Env;
use strum::IntoEnumIterator;

fn parse_signal(env: &Env, option: &str) -> Option<signal::Number> {
    if let Ok(number) = option.parse::<i32>() {
        return signal::Number::from_raw(number);
    }
    let name: signal::Name = option.parse().ok()?;
    env.system.signal_number_from_name(name)
}

fn list_signals(env: &mut Env) -> Result {
    let text: String = signal::Name::iter()
        .map(|name| format!("{}\n", name.as_str()))
        .collect();
    match output(env, &text) {
        Ok(()) => Default::default(),
        Err(result) => result,
    }
}

/// Entry point for executing the `kill` built-in
pub fn main(env: &mut Env, args: Vec<Field>) -> Result {
    let mut signal = env.system.signal_number_from_name(signal::Name::Term);
    let mut operands = &args[..];

    if let [first, rest @ ..] = operands {
        match first.value.as_str() {
            "-l" => return list_signals(env),
            "--" => operands = rest,
            option => {
                if let Some(stripped) = option.strip_prefix('-') {
                    let Some(parsed) = parse_signal(env, stripped) else {
                        return report_error(env, &format!("{option}: no such signal"));
                    };
                    signal = Some(parsed);
                    operands = rest;
                }
            }
        }
    }

    if operands.is_empty() {
        return report_error(env, "operand is missing");
    }

    for operand in operands {
        let pid = if operand.value.starts_with('%') {
            match env.jobs.find_by_id(&operand.value) {
                Some(index) => {
                    let job = env.jobs.get(index).unwrap();
                    if job.job_controlled {
                        Pid(-job.pgid.0)
                    } else {
                        job.pid
                    }
                }
                None => {
                    return report_error(env, &format!("{}: no such job", operand.value))
                }
            }
        } else {
            match operand.value.parse() {
                Ok(pid) => Pid(pid),
                Err(_) => {
                    return report_error(
                        env,
                        &format!("{}: not a valid process ID", operand.value),
                    )
                }
            }
        };

        if let Err(errno) = env.system.kill(pid, signal) {
            return report_error(env, &format!("cannot send the signal: {errno}"));
        }
    }
    Default::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use marsh_env::semantics::ExitStatus;
    use marsh_env::system::VirtualSystem;

    #[test]
    fn killing_a_pid_sends_sigterm_by_default() {
        let system = VirtualSystem::new();
        let mut env = Env::with_system(Box::new(system.clone()));
        let result = main(&mut env, Field::dummies(["123"]));
        assert_eq!(result.exit_status(), ExitStatus::SUCCESS);

        let state = system.state.borrow();
        let term = env.system.signal_number_from_name(signal::Name::Term);
        assert_eq!(state.sent_signals, [(Pid(123), term)]);
    }

    #[test]
    fn killing_with_a_named_signal() {
        let system = VirtualSystem::new();
        let mut env = Env::with_system(Box::new(system.clone()));
        main(&mut env, Field::dummies(["-USR1", "5"]));
        let state = system.state.borrow();
        let usr1 = env.system.signal_number_from_name(signal::Name::Usr1);
        assert_eq!(state.sent_signals, [(Pid(5), usr1)]);
    }

    #[test]
    fn missing_operand_is_an_error() {
        let mut env = Env::new_virtual();
        let result = main(&mut env, vec![]);
        assert_eq!(result.exit_status(), ExitStatus::FAILURE);
    }
}
