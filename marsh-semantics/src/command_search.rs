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

//! Command search
//!
//! This module implements the command search, which determines the target of
//! a simple command execution: a special built-in is found first, then a
//! function, then another built-in, and finally an external utility found in
//! `$PATH`. Search results for external utilities are remembered in the
//! environment's command hash, which is flushed when `PATH` is assigned to.

use marsh_env::builtin::Builtin;
use marsh_env::builtin::Type;
use marsh_env::function::Function;
use marsh_env::system::System;
use marsh_env::variable;
use marsh_env::Env;
use std::ffi::CString;
use std::rc::Rc;

/// Target of a command search
#[derive(Clone, Debug)]
pub enum Target {
    /// Built-in utility
    Builtin(Builtin),
    /// Function
    Function(Rc<Function>),
    /// External utility
    External {
        /// Path to the utility
        path: CString,
    },
}

/// Searches for the target of a command name.
///
/// Returns `None` if nothing is found, in which case the command fails with
/// exit status 127.
pub fn search(env: &mut Env, name: &str) -> Option<Target> {
    // A slash in the name bypasses the search.
    if name.contains('/') {
        let path = CString::new(name).ok()?;
        return Some(Target::External { path });
    }

    if let Some(&builtin) = env.builtins.get(name) {
        if builtin.r#type == Type::Special {
            return Some(Target::Builtin(builtin));
        }

        if let Some(function) = env.functions.get(name) {
            return Some(Target::Function(Rc::clone(function)));
        }

        return Some(Target::Builtin(builtin));
    }

    if let Some(function) = env.functions.get(name) {
        return Some(Target::Function(Rc::clone(function)));
    }

    search_path(env, name).map(|path| Target::External { path })
}

/// Searches `$PATH` for an executable regular file with the given name.
///
/// Successful results are cached in [`Env::command_paths`].
pub fn search_path(env: &mut Env, name: &str) -> Option<CString> {
    if let Some(path) = env.command_paths.get(name) {
        return Some(path.clone());
    }

    let path_value = env
        .variables
        .get_scalar(variable::PATH)
        .unwrap_or("")
        .to_owned();
    for dir in path_value.split(':') {
        let dir = if dir.is_empty() { "." } else { dir };
        let candidate = format!("{dir}/{name}");
        let Ok(c_path) = CString::new(candidate) else {
            continue;
        };
        if env.system.is_executable_file(&c_path) {
            env.command_paths.insert(name.to_owned(), c_path.clone());
            return Some(c_path);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use marsh_env::system::r#virtual::INode;
    use marsh_env::system::VirtualSystem;
    use marsh_env::variable::Scope;
    use std::cell::RefCell;
    use std::path::PathBuf;

    fn executable(system: &VirtualSystem, path: &str) {
        let mut inode = INode::default();
        inode.is_executable = true;
        system
            .state
            .borrow_mut()
            .file_system
            .insert(PathBuf::from(path), Rc::new(RefCell::new(inode)));
    }

    fn dummy_builtin(r#type: Type) -> Builtin {
        fn execute(
            _env: &mut Env,
            _args: Vec<marsh_env::semantics::Field>,
        ) -> marsh_env::builtin::Result {
            Default::default()
        }
        Builtin::new(r#type, execute)
    }

    fn dummy_function(name: &str) -> Function {
        let body: marsh_syntax::syntax::FullCompoundCommand = "{ :; }".parse().unwrap();
        Function::new(name, body, marsh_syntax::source::Location::dummy(name))
    }

    #[test]
    fn special_builtin_beats_function() {
        let mut env = Env::new_virtual();
        env.builtins.insert("set", dummy_builtin(Type::Special));
        env.functions.define(dummy_function("set")).unwrap();

        assert_matches!(search(&mut env, "set"), Some(Target::Builtin(builtin)) => {
            assert_eq!(builtin.r#type, Type::Special);
        });
    }

    #[test]
    fn function_beats_mandatory_builtin() {
        let mut env = Env::new_virtual();
        env.builtins.insert("cd", dummy_builtin(Type::Mandatory));
        env.functions.define(dummy_function("cd")).unwrap();

        assert_matches!(search(&mut env, "cd"), Some(Target::Function(function)) => {
            assert_eq!(function.name, "cd");
        });
    }

    #[test]
    fn external_from_path() {
        let system = VirtualSystem::new();
        executable(&system, "/bin/ls");
        let mut env = Env::with_system(Box::new(system));
        env.variables
            .get_or_new(variable::PATH, Scope::Global)
            .assign("/usr/bin:/bin", None)
            .unwrap();

        assert_matches!(search(&mut env, "ls"), Some(Target::External { path }) => {
            assert_eq!(path, CString::new("/bin/ls").unwrap());
        });
        // The result is now cached.
        assert_eq!(
            env.command_paths.get("ls"),
            Some(&CString::new("/bin/ls").unwrap())
        );
    }

    #[test]
    fn slash_bypasses_search() {
        let mut env = Env::new_virtual();
        assert_matches!(search(&mut env, "./script"), Some(Target::External { path }) => {
            assert_eq!(path, CString::new("./script").unwrap());
        });
    }

    #[test]
    fn nothing_found() {
        let mut env = Env::new_virtual();
        assert_matches!(search(&mut env, "nosuch"), None);
    }
}
