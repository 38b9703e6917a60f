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

//! Unalias built-in
//!
//! The **`unalias`** built-in removes alias definitions.
//!
//! # Syntax
//!
//! ```sh
//! unalias name...
//! unalias -a
//! ```

use crate::common::report_error;
use marsh_env::builtin::Result;
use marsh_env::semantics::Field;
use marsh_env::Env;

/// Entry point for executing the `unalias` built-in
pub fn main(env: &mut Env, args: Vec<Field>) -> Result {
    match &args[..] {
        [] => report_error(env, "operand is missing"),
        [all] if all.value == "-a" => {
            env.aliases.clear();
            Default::default()
        }
        names => {
            for name in names {
                if env.aliases.take(name.value.as_str()).is_none() {
                    return report_error(env, &format!("{}: no such alias", name.value));
                }
            }
            Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marsh_env::semantics::ExitStatus;
    use marsh_syntax::alias::HashEntry;
    use marsh_syntax::source::Location;

    fn define(env: &mut Env, name: &str, replacement: &str) {
        env.aliases.insert(HashEntry::new(
            name.to_owned(),
            replacement.to_owned(),
            false,
            Location::dummy(name),
        ));
    }

    #[test]
    fn removing_an_alias() {
        let mut env = Env::new_virtual();
        define(&mut env, "ll", "ls -l");
        let result = main(&mut env, Field::dummies(["ll"]));
        assert_eq!(result.exit_status(), ExitStatus::SUCCESS);
        assert!(env.aliases.is_empty());
    }

    #[test]
    fn removing_all_aliases() {
        let mut env = Env::new_virtual();
        define(&mut env, "a", "1");
        define(&mut env, "b", "2");
        main(&mut env, Field::dummies(["-a"]));
        assert!(env.aliases.is_empty());
    }

    #[test]
    fn removing_unknown_alias_is_an_error() {
        let mut env = Env::new_virtual();
        let result = main(&mut env, Field::dummies(["nosuch"]));
        assert_eq!(result.exit_status(), ExitStatus::FAILURE);
    }
}
