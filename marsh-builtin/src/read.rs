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

//! Read built-in
//!
//! The **`read`** built-in reads a line from the standard input into
//! variables.
//!
//! # Syntax
//!
//! ```sh
//! read [-r] [name...]
//! ```
//!
//! # Semantics
//!
//! The line is split into fields on `$IFS` like word expansion results;
//! each field is assigned to the corresponding variable, with the last
//! variable receiving the remaining fields joined. Without names, the whole
//! line goes to `REPLY`. Without `-r`, a backslash escapes the next
//! character and a backslash-newline pair continues the line. The exit
//! status is non-zero when end of input is reached before a line is read.

use crate::common::report_error;
use marsh_env::builtin::Result;
use marsh_env::semantics::ExitStatus;
use marsh_env::semantics::Field;
use marsh_env::system::Errno;
use marsh_env::system::Fd;
use marsh_env::system::System;
use marsh_env::variable;
use marsh_env::variable::Scope;
use marsh_env::Env;

/// Reads one logical line, processing backslashes unless `raw`.
///
/// Each returned character carries a flag telling whether it was escaped by
/// a backslash, which protects it from field splitting. Returns `None` at
/// end of input with nothing read.
fn read_chars(env: &mut Env, raw: bool) -> Option<Vec<(char, bool)>> {
    let mut line = Vec::new();
    let mut escaped = false;
    let mut any = false;
    loop {
        let mut byte = [0; 1];
        match env.system.read(Fd::STDIN, &mut byte) {
            Ok(0) => break,
            Ok(_) => {
                any = true;
                let c = byte[0] as char;
                if escaped {
                    escaped = false;
                    if c != '\n' {
                        line.push((c, true));
                    }
                    // A backslash-newline pair reads the next line.
                    continue;
                }
                match c {
                    '\\' if !raw => escaped = true,
                    '\n' => break,
                    c => line.push((c, false)),
                }
            }
            Err(Errno::EINTR) => continue,
            Err(_) => break,
        }
    }
    if any {
        Some(line)
    } else {
        None
    }
}

/// Entry point for executing the `read` built-in
pub fn main(env: &mut Env, args: Vec<Field>) -> Result {
    let mut raw = false;
    let mut operands = &args[..];
    while let [first, rest @ ..] = operands {
        match first.value.as_str() {
            "-r" => raw = true,
            "--" => {
                operands = rest;
                break;
            }
            _ => break,
        }
        operands = rest;
    }

    for operand in operands {
        if !variable::is_valid_name(&operand.value) {
            return report_error(env, &format!("{}: not a valid name", operand.value));
        }
    }

    let Some(chars) = read_chars(env, raw) else {
        return Result::new(ExitStatus::FAILURE);
    };

    let ifs = env
        .variables
        .get_scalar(variable::IFS)
        .unwrap_or(variable::IFS_INITIAL_VALUE)
        .to_owned();
    let is_separator =
        |&(c, escaped): &(char, bool)| !escaped && ifs.contains(c);
    let is_ws_separator =
        |&&(c, escaped): &&(char, bool)| !escaped && c.is_whitespace() && ifs.contains(c);

    if operands.is_empty() {
        let line: String = chars.iter().map(|&(c, _)| c).collect();
        _ = env
            .variables
            .get_or_new(variable::REPLY, Scope::Global)
            .assign(line, None);
        return Default::default();
    }

    // Split into at most as many fields as there are variables.
    let mut fields: Vec<String> = Vec::new();
    let mut rest: &[(char, bool)] = &chars;
    while !rest.is_empty() && is_ws_separator(&&rest[0]) {
        rest = &rest[1..];
    }
    while fields.len() + 1 < operands.len() {
        match rest.iter().position(is_separator) {
            Some(index) => {
                fields.push(rest[..index].iter().map(|&(c, _)| c).collect());
                rest = &rest[index + 1..];
                while !rest.is_empty() && is_ws_separator(&&rest[0]) {
                    rest = &rest[1..];
                }
            }
            None => break,
        }
    }
    let mut last = rest;
    while let [head @ .., tail] = last {
        if is_ws_separator(&tail) {
            last = head;
        } else {
            break;
        }
    }
    fields.push(last.iter().map(|&(c, _)| c).collect());

    for (operand, value) in operands.iter().zip(
        fields
            .iter()
            .cloned()
            .chain(std::iter::repeat(String::new())),
    ) {
        let name = operand.value.clone();
        let mut variable = env.get_or_create_variable(name.clone(), Scope::Global);
        if variable.assign(value, operand.origin.clone()).is_err() {
            drop(variable);
            return report_error(
                env,
                &format!("{name}: cannot assign to read-only variable"),
            );
        }
        drop(variable);
        env.notify_assignment(&name);
    }
    Default::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use marsh_env::system::VirtualSystem;

    fn env_with_stdin(content: &str) -> Env {
        let mut system = VirtualSystem::new();
        system.set_stdin(content);
        Env::with_system(Box::new(system))
    }

    #[test]
    fn reading_into_reply() {
        let mut env = env_with_stdin("hello world\n");
        let result = main(&mut env, vec![]);
        assert_eq!(result.exit_status(), ExitStatus::SUCCESS);
        assert_eq!(env.variables.get_scalar("REPLY"), Some("hello world"));
    }

    #[test]
    fn splitting_into_variables() {
        let mut env = env_with_stdin("one two three four\n");
        main(&mut env, Field::dummies(["a", "b"]));
        assert_eq!(env.variables.get_scalar("a"), Some("one"));
        assert_eq!(env.variables.get_scalar("b"), Some("two three four"));
    }

    #[test]
    fn missing_fields_are_empty() {
        let mut env = env_with_stdin("one\n");
        main(&mut env, Field::dummies(["a", "b"]));
        assert_eq!(env.variables.get_scalar("a"), Some("one"));
        assert_eq!(env.variables.get_scalar("b"), Some(""));
    }

    #[test]
    fn end_of_input_fails() {
        let mut env = env_with_stdin("");
        let result = main(&mut env, vec![]);
        assert_eq!(result.exit_status(), ExitStatus::FAILURE);
    }

    #[test]
    fn backslash_escapes_separator() {
        let mut env = env_with_stdin("a\\ b c\n");
        main(&mut env, Field::dummies(["x", "y"]));
        assert_eq!(env.variables.get_scalar("x"), Some("a b"));
        assert_eq!(env.variables.get_scalar("y"), Some("c"));
    }

    #[test]
    fn raw_mode_keeps_backslashes() {
        let mut env = env_with_stdin("a\\nb\n");
        main(&mut env, Field::dummies(["-r", "x"]));
        assert_eq!(env.variables.get_scalar("x"), Some("a\\nb"));
    }
}
