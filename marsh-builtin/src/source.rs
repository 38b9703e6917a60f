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

//! Dot (source) built-in
//!
//! The **`.`** built-in, also known as `source`, reads and executes
//! commands from a file in the current shell environment.
//!
//! # Syntax
//!
//! ```sh
//! . file
//! source file
//! ```
//!
//! # Semantics
//!
//! If the file name contains no slash, it is searched for in `$PATH`; if
//! not found there, the current directory is tried. The commands run in the
//! current environment, so variable assignments and function definitions
//! persist. A `return` in the sourced file returns from the `.` built-in.

use crate::common::report_error;
use marsh_env::builtin::Result;
use marsh_env::semantics::Divert;
use marsh_env::semantics::Field;
use marsh_env::stack::Frame;
use marsh_env::system::Errno;
use marsh_env::system::System;
use marsh_env::system::SystemEx;
use marsh_env::Env;
use marsh_semantics::command_search::search_path;
use marsh_semantics::runner::run_command_string;
use marsh_semantics::trap::run_return_trap;
use marsh_syntax::source::Source;
use std::ffi::CString;
use std::ops::ControlFlow::{Break, Continue};
use std::rc::Rc;

/// Locates the file to source.
fn find_file(env: &mut Env, name: &str) -> Option<CString> {
    if name.contains('/') {
        return CString::new(name).ok();
    }
    if let Some(path) = search_path(env, name) {
        return Some(path);
    }
    // Fall back to the current directory.
    let path = CString::new(name).ok()?;
    if env.system.file_exists(&path) {
        Some(path)
    } else {
        None
    }
}

/// Reads the whole content of a file.
fn read_file(env: &mut Env, path: &CString) -> std::result::Result<String, Errno> {
    let fd = env.system.open(
        path,
        marsh_env::system::OfdAccess::ReadOnly,
        Default::default(),
        marsh_env::system::Mode::default(),
    )?;
    let fd = match env.system.move_fd_internal(fd) {
        Ok(fd) => fd,
        Err(errno) => {
            _ = env.system.close(fd);
            return Err(errno);
        }
    };

    let mut content = Vec::new();
    let mut buffer = [0; 4096];
    loop {
        match env.system.read(fd, &mut buffer) {
            Ok(0) => break,
            Ok(count) => content.extend_from_slice(&buffer[..count]),
            Err(Errno::EINTR) => continue,
            Err(errno) => {
                _ = env.system.close(fd);
                return Err(errno);
            }
        }
    }
    _ = env.system.close(fd);
    Ok(String::from_utf8_lossy(&content).into_owned())
}

/// Entry point for executing the `.` built-in
pub fn main(env: &mut Env, args: Vec<Field>) -> Result {
    let file = match &args[..] {
        [file, ..] => file,
        [] => return report_error(env, "file operand is missing"),
    };

    let Some(path) = find_file(env, &file.value) else {
        return report_error(env, &format!("{}: file not found", file.value));
    };

    let code = match read_file(env, &path) {
        Ok(code) => code,
        Err(errno) => {
            return report_error(env, &format!("cannot read {}: {errno}", file.value))
        }
    };

    let source = Rc::new(Source::CommandFile {
        path: file.value.clone(),
    });

    let result = {
        let mut env = env.push_frame(Frame::DotScript);
        let result = run_command_string(&mut env, &code, source);
        run_return_trap(&mut env);
        result
    };

    match result {
        Continue(()) => Result::new(env.exit_status),
        Break(Divert::Return(exit_status)) => {
            if let Some(exit_status) = exit_status {
                env.exit_status = exit_status;
            }
            Result::new(env.exit_status)
        }
        Break(divert) => Result::with_exit_status_and_divert(env.exit_status, Break(divert)),
    }
}
