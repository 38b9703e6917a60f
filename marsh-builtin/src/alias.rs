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

//! Alias built-in
//!
//! The **`alias`** built-in defines and prints aliases.
//!
//! # Syntax
//!
//! ```sh
//! alias [name[=value]...]
//! ```
//!
//! # Semantics
//!
//! An operand with `=` defines an alias; one without prints the named
//! alias. Without operands, all aliases are printed in a reusable form.

use crate::common::output;
use crate::common::report_error;
use crate::common::split_assignment;
use marsh_env::builtin::Result;
use marsh_env::semantics::Field;
use marsh_env::Env;
use marsh_quote::quoted;
use marsh_syntax::alias::HashEntry;

fn format_alias(name: &str, replacement: &str) -> String {
    format!("alias {name}={}\n", quoted(replacement))
}

fn print_all(env: &mut Env) -> Result {
    let mut lines: Vec<String> = env
        .aliases
        .iter()
        .map(|entry| format_alias(&entry.0.name, &entry.0.replacement))
        .collect();
    lines.sort();
    let text = lines.concat();
    match output(env, &text) {
        Ok(()) => Default::default(),
        Err(result) => result,
    }
}

/// Entry point for executing the `alias` built-in
pub fn main(env: &mut Env, args: Vec<Field>) -> Result {
    if args.is_empty() {
        return print_all(env);
    }

    for arg in args {
        let (name, value) = split_assignment(&arg.value);
        match value {
            Some(replacement) => {
                if name.is_empty() {
                    return report_error(env, "alias name is missing");
                }
                env.aliases.replace(HashEntry::new(
                    name.to_owned(),
                    replacement.to_owned(),
                    false,
                    arg.origin.clone(),
                ));
            }
            None => {
                let line = match env.aliases.get(name) {
                    Some(entry) => format_alias(&entry.0.name, &entry.0.replacement),
                    None => return report_error(env, &format!("{name}: no such alias")),
                };
                if let Err(result) = output(env, &line) {
                    return result;
                }
            }
        }
    }
    Default::default()
}
