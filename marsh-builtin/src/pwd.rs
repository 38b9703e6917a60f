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

//! Pwd built-in
//!
//! The **`pwd`** built-in prints the working directory.

use crate::common::output;
use crate::common::report_error;
use marsh_env::builtin::Result;
use marsh_env::semantics::Field;
use marsh_env::system::System;
use marsh_env::Env;

/// Entry point for executing the `pwd` built-in
pub fn main(env: &mut Env, _args: Vec<Field>) -> Result {
    let path = match env.system.getcwd() {
        Ok(path) => path,
        Err(errno) => {
            return report_error(env, &format!("cannot determine working directory: {errno}"))
        }
    };
    let line = format!("{}\n", path.to_string_lossy());
    match output(env, &line) {
        Ok(()) => Default::default(),
        Err(result) => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marsh_env::system::VirtualSystem;

    #[test]
    fn printing_working_directory() {
        let system = VirtualSystem::new();
        let mut env = Env::with_system(Box::new(system.clone()));
        main(&mut env, vec![]);
        assert_eq!(system.stdout_content(), b"/\n");
    }
}
