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

//! Implementation of function definition semantics

use super::Command;
use crate::expansion::expand_word;
use crate::Handle;
use marsh_env::function::Function;
use marsh_env::semantics::ExitStatus;
use marsh_env::Env;
use marsh_syntax::syntax;
use std::ops::ControlFlow::Continue;
use std::rc::Rc;

/// Executes the function definition command.
///
/// The function name is expanded to a single field and the function is
/// registered in the environment. The body is shared with the AST, not
/// cloned; a command calling the function retains the shared body so that
/// the function can be redefined while it is executing.
impl Command for syntax::FunctionDefinition {
    fn execute(&self, env: &mut Env) -> crate::Result {
        let name = match expand_word(env, &self.name) {
            Ok((field, _)) => field,
            Err(error) => return error.handle(env),
        };

        let function = Function::new(name.value, Rc::clone(&self.body), name.origin);
        match env.functions.define(function) {
            Ok(()) => {
                env.invalidate_export_env();
                env.exit_status = ExitStatus::SUCCESS;
            }
            Err(error) => {
                env.print_error(&error.to_string());
                env.exit_status = ExitStatus::ERROR;
            }
        }
        Continue(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marsh_syntax::source::Location;

    fn definition(code: &str) -> syntax::FunctionDefinition {
        let command: syntax::Command = code.parse().unwrap();
        match command {
            syntax::Command::Function(function) => function,
            other => panic!("not a function definition: {other:?}"),
        }
    }

    #[test]
    fn defining_a_function() {
        let mut env = Env::new_virtual();
        let result = definition("f() { echo body; }").execute(&mut env);
        assert_eq!(result, Continue(()));
        assert_eq!(env.exit_status, ExitStatus::SUCCESS);
        let function = env.functions.get("f").unwrap();
        assert_eq!(function.name, "f");
        assert_eq!(function.body.to_string(), "{ echo body; }");
    }

    #[test]
    fn redefining_a_function() {
        let mut env = Env::new_virtual();
        definition("f() { echo one; }").execute(&mut env).unwrap();
        definition("f() { echo two; }").execute(&mut env).unwrap();
        let function = env.functions.get("f").unwrap();
        assert_eq!(function.body.to_string(), "{ echo two; }");
    }

    #[test]
    fn read_only_function_cannot_be_redefined() {
        let mut env = Env::new_virtual();
        let body: syntax::FullCompoundCommand = "{ :; }".parse().unwrap();
        env.functions
            .define(
                Function::new("f", body, Location::dummy("f"))
                    .make_read_only(Location::dummy("ro")),
            )
            .unwrap();

        let result = definition("f() { echo new; }").execute(&mut env);
        assert_eq!(result, Continue(()));
        assert_eq!(env.exit_status, ExitStatus::ERROR);
    }
}
