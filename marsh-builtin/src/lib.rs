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

//! Implementations of built-in utilities
//!
//! Each built-in is implemented in its own module as a function of the
//! command-line arguments returning a
//! [`Result`](marsh_env::builtin::Result). The [`BUILTINS`] table collects
//! them for installation into an environment with
//! `env.builtins.extend(BUILTINS.iter().cloned())`; the executor dispatches
//! through that table after command search.

pub mod alias;
pub mod bg;
pub mod r#break;
pub mod cd;
pub mod colon;
pub mod command;
pub mod common;
pub mod r#continue;
pub mod echo;
pub mod eval;
pub mod exec;
pub mod exit;
pub mod export;
pub mod r#false;
pub mod fg;
pub mod getopts;
pub mod jobs;
pub mod kill;
pub mod pwd;
pub mod read;
pub mod readonly;
pub mod r#return;
pub mod set;
pub mod shift;
pub mod source;
pub mod times;
pub mod trap;
pub mod r#true;
pub mod r#type;
pub mod typeset;
pub mod unalias;
pub mod unset;
pub mod wait;

use marsh_env::builtin::Builtin;
use marsh_env::builtin::Type::{Elective, Mandatory, Special};

/// Creates a declaration-utility built-in definition.
const fn decl(r#type: marsh_env::builtin::Type, execute: marsh_env::builtin::Main) -> Builtin {
    let mut builtin = Builtin::new(r#type, execute);
    builtin.is_declaration_utility = true;
    builtin
}

/// All the built-ins implemented in this crate, sorted by name
pub const BUILTINS: &[(&str, Builtin)] = &[
    (".", Builtin::new(Special, source::main)),
    (":", Builtin::new(Special, colon::main)),
    ("alias", Builtin::new(Mandatory, alias::main)),
    ("bg", Builtin::new(Mandatory, bg::main)),
    ("break", Builtin::new(Special, r#break::main)),
    ("cd", Builtin::new(Mandatory, cd::main)),
    ("command", Builtin::new(Mandatory, command::main)),
    ("continue", Builtin::new(Special, r#continue::main)),
    ("declare", decl(Elective, typeset::main)),
    ("echo", Builtin::new(Elective, echo::main)),
    ("eval", Builtin::new(Special, eval::main)),
    ("exec", Builtin::new(Special, exec::main)),
    ("exit", Builtin::new(Special, exit::main)),
    ("export", decl(Special, export::main)),
    ("false", Builtin::new(Mandatory, r#false::main)),
    ("fg", Builtin::new(Mandatory, fg::main)),
    ("getopts", Builtin::new(Mandatory, getopts::main)),
    ("jobs", Builtin::new(Mandatory, jobs::main)),
    ("kill", Builtin::new(Mandatory, kill::main)),
    ("local", decl(Elective, typeset::local_main)),
    ("pwd", Builtin::new(Mandatory, pwd::main)),
    ("read", Builtin::new(Mandatory, read::main)),
    ("readonly", decl(Special, readonly::main)),
    ("return", Builtin::new(Special, r#return::main)),
    ("set", Builtin::new(Special, set::main)),
    ("shift", Builtin::new(Special, shift::main)),
    ("source", Builtin::new(Elective, source::main)),
    ("times", Builtin::new(Special, times::main)),
    ("trap", Builtin::new(Special, trap::main)),
    ("true", Builtin::new(Mandatory, r#true::main)),
    ("type", Builtin::new(Mandatory, r#type::main)),
    ("typeset", decl(Elective, typeset::main)),
    ("unalias", Builtin::new(Mandatory, unalias::main)),
    ("unset", Builtin::new(Special, unset::main)),
    ("wait", Builtin::new(Mandatory, wait::main)),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_sorted_by_name() {
        for pair in BUILTINS.windows(2) {
            assert!(pair[0].0 < pair[1].0, "{} >= {}", pair[0].0, pair[1].0);
        }
    }

    #[test]
    fn special_builtins_match_posix() {
        for (name, builtin) in BUILTINS {
            let is_special = matches!(
                *name,
                "." | ":"
                    | "break"
                    | "continue"
                    | "eval"
                    | "exec"
                    | "exit"
                    | "export"
                    | "readonly"
                    | "return"
                    | "set"
                    | "shift"
                    | "times"
                    | "trap"
                    | "unset"
            );
            assert_eq!(
                builtin.r#type == Special,
                is_special,
                "type of {name} is wrong"
            );
        }
    }
}
