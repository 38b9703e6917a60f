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

//! Echo built-in
//!
//! The **`echo`** built-in prints its arguments separated by spaces and
//! terminated by a newline.
//!
//! # Options
//!
//! - `-n` suppresses the trailing newline.
//! - `-e` enables backslash escape interpretation; `-E` disables it (the
//!   default).

use crate::common::output;
use itertools::Itertools;
use marsh_env::builtin::Result;
use marsh_env::semantics::Field;
use marsh_env::Env;

fn decode_escapes(input: &str) -> (String, bool) {
    let mut result = String::new();
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('a') => result.push('\u{7}'),
            Some('b') => result.push('\u{8}'),
            Some('c') => return (result, true),
            Some('e') => result.push('\u{1B}'),
            Some('f') => result.push('\u{C}'),
            Some('n') => result.push('\n'),
            Some('r') => result.push('\r'),
            Some('t') => result.push('\t'),
            Some('v') => result.push('\u{B}'),
            Some('\\') => result.push('\\'),
            Some('0') => {
                let mut value = 0u32;
                let mut digits = 0;
                let mut rest = chars.clone();
                while digits < 3 {
                    match rest.next() {
                        Some(c) if c.is_digit(8) => {
                            value = value * 8 + c.to_digit(8).unwrap();
                            digits += 1;
                            chars = rest.clone();
                        }
                        _ => break,
                    }
                }
                result.push(value as u8 as char);
            }
            Some(other) => {
                result.push('\\');
                result.push(other);
            }
            None => result.push('\\'),
        }
    }
    (result, false)
}

/// Entry point for executing the `echo` built-in
pub fn main(env: &mut Env, args: Vec<Field>) -> Result {
    let mut newline = true;
    let mut escapes = false;
    let mut operands = &args[..];

    // Option parsing stops at the first non-option argument.
    while let [first, rest @ ..] = operands {
        match first.value.as_str() {
            "-n" => newline = false,
            "-e" => escapes = true,
            "-E" => escapes = false,
            _ => break,
        }
        operands = rest;
    }

    let mut line = operands.iter().map(|field| &field.value).format(" ").to_string();
    let mut suppress_rest = false;
    if escapes {
        (line, suppress_rest) = decode_escapes(&line);
    }
    if newline && !suppress_rest {
        line.push('\n');
    }

    match output(env, &line) {
        Ok(()) => Default::default(),
        Err(result) => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marsh_env::system::VirtualSystem;

    fn run(args: &[&str]) -> Vec<u8> {
        let system = VirtualSystem::new();
        let mut env = Env::with_system(Box::new(system.clone()));
        main(&mut env, Field::dummies(args.iter().copied()));
        system.stdout_content()
    }

    #[test]
    fn plain_arguments() {
        assert_eq!(run(&["hello", "world"]), b"hello world\n");
        assert_eq!(run(&[]), b"\n");
    }

    #[test]
    fn suppressing_newline() {
        assert_eq!(run(&["-n", "x"]), b"x");
    }

    #[test]
    fn escape_interpretation() {
        assert_eq!(run(&["-e", r"a\tb"]), b"a\tb\n");
        assert_eq!(run(&["-e", r"x\ny"]), b"x\ny\n");
        assert_eq!(run(&[r"a\tb"]), b"a\\tb\n");
        assert_eq!(run(&["-e", r"stop\chere"]), b"stop");
    }
}
