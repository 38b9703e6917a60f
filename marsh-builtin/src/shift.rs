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

//! Shift built-in
//!
//! The **`shift`** built-in removes positional parameters.
//!
//! # Syntax
//!
//! ```sh
//! shift [n]
//! ```
//!
//! # Semantics
//!
//! The first *n* (default 1) positional parameters are removed and the
//! remaining parameters are renumbered. It is an error if *n* is greater
//! than the number of positional parameters.

use crate::common::report_error;
use marsh_env::builtin::Result;
use marsh_env::semantics::Field;
use marsh_env::Env;

/// Entry point for executing the `shift` built-in
pub fn main(env: &mut Env, args: Vec<Field>) -> Result {
    let count: usize = match &args[..] {
        [] => 1,
        [count] => match count.value.parse() {
            Ok(count) => count,
            Err(_) => {
                return report_error(
                    env,
                    &format!("{}: not a non-negative integer", count.value),
                )
            }
        },
        [_, extra, ..] => {
            return report_error(env, &format!("unexpected operand `{}`", extra.value))
        }
    };

    let len = env.variables.positional_params().values.len();
    if count > len {
        return report_error(
            env,
            &format!("cannot shift {count} parameters, only {len} available"),
        );
    }
    env.variables.positional_params_mut().values.drain(..count);
    Default::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use marsh_env::semantics::ExitStatus;

    #[test]
    fn shifting_one() {
        let mut env = Env::new_virtual();
        env.variables.positional_params_mut().values =
            vec!["a".to_owned(), "b".to_owned(), "c".to_owned()];
        let result = main(&mut env, vec![]);
        assert_eq!(result.exit_status(), ExitStatus::SUCCESS);
        assert_eq!(env.variables.positional_params().values, ["b", "c"]);
    }

    #[test]
    fn shifting_many() {
        let mut env = Env::new_virtual();
        env.variables.positional_params_mut().values =
            vec!["a".to_owned(), "b".to_owned(), "c".to_owned()];
        main(&mut env, Field::dummies(["3"]));
        assert_eq!(env.variables.positional_params().values, [] as [&str; 0]);
    }

    #[test]
    fn shifting_too_many_is_an_error() {
        let mut env = Env::new_virtual();
        env.variables.positional_params_mut().values = vec!["a".to_owned()];
        let result = main(&mut env, Field::dummies(["2"]));
        assert_eq!(result.exit_status(), ExitStatus::FAILURE);
        assert_eq!(env.variables.positional_params().values, ["a"]);
    }
}
