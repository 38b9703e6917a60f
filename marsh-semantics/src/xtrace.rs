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

//! Execution tracing
//!
//! When the `XTrace` option is on, the shell prints the expanded words of
//! each executed command to the standard error, prefixed with the value of
//! `$PS4`.

use itertools::Itertools;
use marsh_env::option::{State, XTrace};
use marsh_env::semantics::Field;
use marsh_env::system::Fd;
use marsh_env::system::SystemEx;
use marsh_env::variable;
use marsh_env::Env;
use marsh_quote::quoted;

/// Tests whether tracing is enabled.
#[must_use]
pub fn tracing(env: &Env) -> bool {
    env.options.get(XTrace) == State::On
}

fn prefix(env: &Env) -> String {
    env.variables
        .get_scalar(variable::PS4)
        .unwrap_or(variable::PS4_INITIAL_VALUE)
        .to_owned()
}

/// Prints the expanded fields of a command being executed.
pub fn trace_fields(env: &mut Env, fields: &[Field]) {
    if !tracing(env) {
        return;
    }
    let line = format!(
        "{}{}\n",
        prefix(env),
        fields
            .iter()
            .map(|field| quoted(&field.value))
            .format(" ")
    );
    _ = env.system.write_all(Fd::STDERR, line.as_bytes());
}

/// Prints an assignment being performed.
pub fn trace_assignment(env: &mut Env, name: &str, value: &str) {
    if !tracing(env) {
        return;
    }
    let line = format!("{}{}={}\n", prefix(env), name, quoted(value));
    _ = env.system.write_all(Fd::STDERR, line.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use marsh_env::system::VirtualSystem;

    #[test]
    fn no_trace_by_default() {
        let system = VirtualSystem::new();
        let mut env = Env::with_system(Box::new(system.clone()));
        trace_fields(&mut env, &Field::dummies(["echo", "x"]));
        assert_eq!(system.stderr_content(), b"");
    }

    #[test]
    fn tracing_fields_with_ps4() {
        let system = VirtualSystem::new();
        let mut env = Env::with_system(Box::new(system.clone()));
        env.options.set(XTrace, State::On);
        trace_fields(&mut env, &Field::dummies(["echo", "a b"]));
        assert_eq!(system.stderr_content(), b"+ echo 'a b'\n");
    }

    #[test]
    fn tracing_assignments() {
        let system = VirtualSystem::new();
        let mut env = Env::with_system(Box::new(system.clone()));
        env.options.set(XTrace, State::On);
        trace_assignment(&mut env, "x", "1");
        assert_eq!(system.stderr_content(), b"+ x=1\n");
    }
}
