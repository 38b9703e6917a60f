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

//! Type built-in
//!
//! The **`type`** built-in describes how a command name would be
//! interpreted.

use crate::common::output;
use crate::common::report_error;
use marsh_env::builtin::Result;
use marsh_env::semantics::Field;
use marsh_env::Env;
use marsh_semantics::command_search::search_path;
use marsh_syntax::alias::Glossary;

fn describe(env: &mut Env, name: &str) -> Option<String> {
    if let Some(alias) = env.aliases.look_up(name) {
        return Some(format!(
            "{name} is aliased to `{}'",
            alias.replacement
        ));
    }
    if env.functions.get(name).is_some() {
        return Some(format!("{name} is a function"));
    }
    if env.builtins.contains_key(name) {
        return Some(format!("{name} is a shell builtin"));
    }
    search_path(env, name).map(|path| format!("{name} is {}", path.to_string_lossy()))
}

/// Entry point for executing the `type` built-in
pub fn main(env: &mut Env, args: Vec<Field>) -> Result {
    for operand in &args {
        match describe(env, &operand.value) {
            Some(description) => {
                if let Err(result) = output(env, &format!("{description}\n")) {
                    return result;
                }
            }
            None => {
                return report_error(env, &format!("{}: not found", operand.value));
            }
        }
    }
    Default::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use marsh_env::builtin::{Builtin, Type};
    use marsh_env::semantics::ExitStatus;
    use marsh_env::system::VirtualSystem;

    #[test]
    fn describing_a_builtin() {
        let system = VirtualSystem::new();
        let mut env = Env::with_system(Box::new(system.clone()));
        env.builtins
            .insert("set", Builtin::new(Type::Special, crate::set::main));
        main(&mut env, Field::dummies(["set"]));
        assert_eq!(system.stdout_content(), b"set is a shell builtin\n");
    }

    #[test]
    fn unknown_name_fails() {
        let mut env = Env::new_virtual();
        let result = main(&mut env, Field::dummies(["nosuch"]));
        assert_eq!(result.exit_status(), ExitStatus::FAILURE);
    }
}
