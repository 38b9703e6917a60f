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

//! Trap built-in
//!
//! The **`trap`** built-in sets and prints trap actions.
//!
//! # Syntax
//!
//! ```sh
//! trap
//! trap action condition...
//! trap - condition...
//! ```
//!
//! # Semantics
//!
//! Conditions are signal names (with or without the `SIG` prefix), signal
//! numbers, or the pseudo-signals `EXIT`, `ERR`, `DEBUG`, and `RETURN`. The
//! action `-` resets the conditions to their defaults, an empty action
//! ignores them, and any other action is a command string executed when the
//! condition occurs. Without arguments, the configured traps are printed in
//! a reusable form. A numeric first operand is taken as a condition with
//! the default action, as in `trap 2`.

use crate::common::output;
use crate::common::report_error;
use marsh_env::builtin::Result;
use marsh_env::semantics::Field;
use marsh_env::signal;
use marsh_env::system::System;
use marsh_env::trap::Action;
use marsh_env::trap::Condition;
use marsh_env::Env;
use marsh_quote::quoted;
use std::rc::Rc;

/// Parses a condition operand.
fn parse_condition(env: &Env, operand: &str) -> Option<Condition> {
    match operand {
        "EXIT" | "0" => return Some(Condition::Exit),
        "ERR" => return Some(Condition::Err),
        "DEBUG" => return Some(Condition::Debug),
        "RETURN" => return Some(Condition::Return),
        _ => (),
    }
    if let Ok(number) = operand.parse::<i32>() {
        return signal::Number::from_raw(number).map(Condition::Signal);
    }
    let name: signal::Name = operand.parse().ok()?;
    env.system
        .signal_number_from_name(name)
        .map(Condition::Signal)
}

/// Formats a condition for display.
fn condition_name(env: &Env, condition: &Condition) -> String {
    match condition {
        Condition::Signal(number) => env
            .system
            .signal_name_from_number(*number)
            .as_str()
            .to_owned(),
        other => other.pseudo_signal_name().unwrap().to_owned(),
    }
}

fn print_traps(env: &mut Env) -> Result {
    let mut lines = Vec::new();
    for (condition, state, _parent) in env.traps.iter() {
        let Some(state) = state else { continue };
        let action = match &state.action {
            Action::Default => continue,
            Action::Ignore => String::new(),
            Action::Command(command) => command.to_string(),
        };
        lines.push(format!(
            "trap -- {} {}\n",
            quoted(&action),
            condition_name(env, condition),
        ));
    }
    let text = lines.concat();
    match output(env, &text) {
        Ok(()) => Default::default(),
        Err(result) => result,
    }
}

/// Entry point for executing the `trap` built-in
pub fn main(env: &mut Env, args: Vec<Field>) -> Result {
    let mut operands = &args[..];
    if let [first, rest @ ..] = operands {
        if first.value == "--" {
            operands = rest;
        }
    }

    // A numeric first operand makes all operands conditions to reset.
    let (action_field, conditions) = match operands {
        [] => return print_traps(env),
        [first, ..] if first.value.parse::<u32>().is_ok() => (None, operands),
        [action, conditions @ ..] => (Some(action), conditions),
    };

    let action = match action_field {
        None => Action::Default,
        Some(field) => match field.value.as_str() {
            "-" => Action::Default,
            "" => Action::Ignore,
            command => Action::Command(Rc::from(command)),
        },
    };

    if conditions.is_empty() {
        return report_error(env, "missing condition operand");
    }

    let override_ignore = env.is_interactive();
    for condition in conditions {
        let Some(parsed) = parse_condition(env, &condition.value) else {
            return report_error(env, &format!("{}: no such condition", condition.value));
        };
        let mut system = env.system.clone();
        let result = env.traps.set_action(
            &mut system,
            parsed,
            action.clone(),
            condition.origin.clone(),
            override_ignore,
        );
        if let Err(error) = result {
            return report_error(env, &format!("{}: {error}", condition.value));
        }
    }
    Default::default()
}
