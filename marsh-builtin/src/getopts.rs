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

//! Getopts built-in
//!
//! The **`getopts`** built-in parses option arguments.
//!
//! # Syntax
//!
//! ```sh
//! getopts optstring name [argument...]
//! ```
//!
//! # Semantics
//!
//! One option is parsed per invocation, with the position kept in `OPTIND`
//! (and, for clustered options, an internal offset variable). The parsed
//! option letter is stored in *name* and its argument, if the optstring
//! declares one with `:`, in `OPTARG`. At the end of the options the exit
//! status is non-zero and *name* is set to `?`.

use crate::common::report_error;
use marsh_env::builtin::Result;
use marsh_env::semantics::ExitStatus;
use marsh_env::semantics::Field;
use marsh_env::variable;
use marsh_env::variable::Scope;
use marsh_env::Env;

/// Hidden variable keeping the in-word offset of clustered options
const OFFSET_VAR: &str = "MARSH_GETOPTS_OFFSET";

fn set_scalar(env: &mut Env, name: &str, value: &str) {
    _ = env
        .variables
        .get_or_new(name.to_owned(), Scope::Global)
        .assign(value.to_owned(), None);
}

fn get_number(env: &Env, name: &str) -> usize {
    env.variables
        .get_scalar(name)
        .and_then(|value| value.parse().ok())
        .unwrap_or(1)
}

fn finish(env: &mut Env, name: &str) -> Result {
    set_scalar(env, name, "?");
    _ = env.variables.unset(variable::OPTARG, Scope::Global);
    _ = env.variables.unset(OFFSET_VAR, Scope::Global);
    Result::new(ExitStatus::FAILURE)
}

/// Entry point for executing the `getopts` built-in
pub fn main(env: &mut Env, args: Vec<Field>) -> Result {
    let [optstring, name, rest @ ..] = &args[..] else {
        return report_error(env, "optstring and name operands are required");
    };
    let optstring = optstring.value.clone();
    let name = name.value.clone();
    if !variable::is_valid_name(&name) {
        return report_error(env, &format!("{name}: not a valid name"));
    }

    let arguments: Vec<String> = if rest.is_empty() {
        env.variables.positional_params().values.clone()
    } else {
        rest.iter().map(|field| field.value.clone()).collect()
    };

    // OPTIND counts arguments from 1; the offset counts characters within a
    // clustered option word.
    let optind = get_number(env, variable::OPTIND);
    let mut offset = env
        .variables
        .get_scalar(OFFSET_VAR)
        .and_then(|value| value.parse().ok())
        .unwrap_or(1usize);

    let Some(argument) = arguments.get(optind - 1) else {
        return finish(env, &name);
    };
    if !argument.starts_with('-') || argument == "-" {
        return finish(env, &name);
    }
    if argument == "--" {
        set_scalar(env, variable::OPTIND, &(optind + 1).to_string());
        return finish(env, &name);
    }

    let letters: Vec<char> = argument.chars().collect();
    let letter = match letters.get(offset) {
        Some(&letter) => letter,
        None => {
            // End of the cluster: move to the next argument.
            set_scalar(env, variable::OPTIND, &(optind + 1).to_string());
            set_scalar(env, OFFSET_VAR, "1");
            return main(
                env,
                {
                    let mut again = vec![
                        Field::dummy(optstring),
                        Field::dummy(name),
                    ];
                    again.extend(rest.iter().cloned());
                    again
                },
            );
        }
    };

    let takes_argument = optstring
        .chars()
        .zip(optstring.chars().skip(1).chain([' ']))
        .any(|(c, next)| c == letter && next == ':');
    let known = optstring.chars().any(|c| c == letter && c != ':');

    offset += 1;
    if !known {
        set_scalar(env, &name, "?");
        set_scalar(env, variable::OPTARG, &letter.to_string());
        advance(env, &letters, offset, optind);
        return Default::default();
    }

    if takes_argument {
        let (value, new_optind) = if letters.len() > offset {
            (letters[offset..].iter().collect::<String>(), optind + 1)
        } else {
            match arguments.get(optind) {
                Some(value) => (value.clone(), optind + 2),
                None => {
                    set_scalar(env, &name, "?");
                    set_scalar(env, variable::OPTARG, &letter.to_string());
                    set_scalar(env, variable::OPTIND, &(optind + 1).to_string());
                    set_scalar(env, OFFSET_VAR, "1");
                    return Default::default();
                }
            }
        };
        set_scalar(env, &name, &letter.to_string());
        set_scalar(env, variable::OPTARG, &value);
        set_scalar(env, variable::OPTIND, &new_optind.to_string());
        set_scalar(env, OFFSET_VAR, "1");
        return Default::default();
    }

    set_scalar(env, &name, &letter.to_string());
    _ = env.variables.unset(variable::OPTARG, Scope::Global);
    advance(env, &letters, offset, optind);
    Default::default()
}

/// Records the next parsing position after a non-argument option.
fn advance(env: &mut Env, letters: &[char], offset: usize, optind: usize) {
    if offset >= letters.len() {
        set_scalar(env, variable::OPTIND, &(optind + 1).to_string());
        set_scalar(env, OFFSET_VAR, "1");
    } else {
        set_scalar(env, OFFSET_VAR, &offset.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn getopts(env: &mut Env, optstring: &str, args: &[&str]) -> (ExitStatus, String) {
        let mut fields = vec![Field::dummy(optstring), Field::dummy("opt")];
        fields.extend(args.iter().copied().map(Field::dummy));
        let result = main(env, fields);
        let letter = env
            .variables
            .get_scalar("opt")
            .unwrap_or_default()
            .to_owned();
        (result.exit_status(), letter)
    }

    #[test]
    fn parsing_simple_options() {
        let mut env = Env::new_virtual();
        let (status, letter) = getopts(&mut env, "ab", &["-a", "-b", "x"]);
        assert_eq!((status, letter.as_str()), (ExitStatus::SUCCESS, "a"));
        let (status, letter) = getopts(&mut env, "ab", &["-a", "-b", "x"]);
        assert_eq!((status, letter.as_str()), (ExitStatus::SUCCESS, "b"));
        let (status, _) = getopts(&mut env, "ab", &["-a", "-b", "x"]);
        assert_eq!(status, ExitStatus::FAILURE);
        assert_eq!(env.variables.get_scalar("OPTIND"), Some("3"));
    }

    #[test]
    fn option_with_argument() {
        let mut env = Env::new_virtual();
        let (status, letter) = getopts(&mut env, "o:", &["-o", "value", "x"]);
        assert_eq!((status, letter.as_str()), (ExitStatus::SUCCESS, "o"));
        assert_eq!(env.variables.get_scalar("OPTARG"), Some("value"));
        assert_eq!(env.variables.get_scalar("OPTIND"), Some("3"));
    }

    #[test]
    fn option_with_attached_argument() {
        let mut env = Env::new_virtual();
        let (status, letter) = getopts(&mut env, "o:", &["-ovalue"]);
        assert_eq!((status, letter.as_str()), (ExitStatus::SUCCESS, "o"));
        assert_eq!(env.variables.get_scalar("OPTARG"), Some("value"));
    }

    #[test]
    fn clustered_options() {
        let mut env = Env::new_virtual();
        let (_, letter) = getopts(&mut env, "ab", &["-ab"]);
        assert_eq!(letter, "a");
        let (_, letter) = getopts(&mut env, "ab", &["-ab"]);
        assert_eq!(letter, "b");
        let (status, _) = getopts(&mut env, "ab", &["-ab"]);
        assert_eq!(status, ExitStatus::FAILURE);
    }

    #[test]
    fn unknown_option_sets_question_mark() {
        let mut env = Env::new_virtual();
        let (status, letter) = getopts(&mut env, "a", &["-z"]);
        assert_eq!((status, letter.as_str()), (ExitStatus::SUCCESS, "?"));
    }

    #[test]
    fn end_of_options() {
        let mut env = Env::new_virtual();
        let (status, letter) = getopts(&mut env, "a", &["operand"]);
        assert_eq!((status, letter.as_str()), (ExitStatus::FAILURE, "?"));
    }
}
