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

//! Variable name and initial value constants

/// Name of the variable that separates fields (`IFS`)
pub const IFS: &str = "IFS";
/// Initial value of `IFS`
pub const IFS_INITIAL_VALUE: &str = " \t\n";

/// Name of the variable holding the next option index for `getopts`
pub const OPTIND: &str = "OPTIND";
/// Initial value of `OPTIND`
pub const OPTIND_INITIAL_VALUE: &str = "1";

/// Name of the variable holding the option argument of `getopts`
pub const OPTARG: &str = "OPTARG";

/// Name of the primary prompt variable
pub const PS1: &str = "PS1";
/// Initial value of `PS1`
pub const PS1_INITIAL_VALUE: &str = "$ ";

/// Name of the secondary prompt variable
pub const PS2: &str = "PS2";
/// Initial value of `PS2`
pub const PS2_INITIAL_VALUE: &str = "> ";

/// Name of the execution trace prompt variable
pub const PS4: &str = "PS4";
/// Initial value of `PS4`
pub const PS4_INITIAL_VALUE: &str = "+ ";

/// Name of the variable holding the current line number (`LINENO`)
pub const LINENO: &str = "LINENO";

/// Name of the pseudo-random number variable (`RANDOM`)
pub const RANDOM: &str = "RANDOM";

/// Name of the shell timer variable (`SECONDS`)
pub const SECONDS: &str = "SECONDS";

/// Name of the epoch time variable (`EPOCHSECONDS`)
pub const EPOCHSECONDS: &str = "EPOCHSECONDS";

/// Name of the command search path variable (`PATH`)
pub const PATH: &str = "PATH";

/// Name of the home directory variable (`HOME`)
pub const HOME: &str = "HOME";

/// Name of the working directory variable (`PWD`)
pub const PWD: &str = "PWD";

/// Name of the previous working directory variable (`OLDPWD`)
pub const OLDPWD: &str = "OLDPWD";

/// Name of the parent process ID variable (`PPID`)
pub const PPID: &str = "PPID";

/// Name of the pipeline status array variable (`PIPESTATUS`)
pub const PIPESTATUS: &str = "PIPESTATUS";

/// Name of the function call stack array variable (`FUNCNAME`)
pub const FUNCNAME: &str = "FUNCNAME";

/// Name of the source file call stack array variable (`BASH_SOURCE`)
///
/// The array is synchronized with [`FUNCNAME`]: element *i* names the
/// source that defined the function in `FUNCNAME[i]`.
pub const BASH_SOURCE: &str = "BASH_SOURCE";

/// Name of the call line number stack array variable (`BASH_LINENO`)
///
/// The array is synchronized with [`FUNCNAME`]: element *i* is the line
/// number at which the function in `FUNCNAME[i]` was called.
pub const BASH_LINENO: &str = "BASH_LINENO";

/// Name of the variable holding the `select` reply (`REPLY`)
pub const REPLY: &str = "REPLY";

/// Name of the variable selecting the `time` output format (`TIMEFORMAT`)
pub const TIMEFORMAT: &str = "TIMEFORMAT";

/// Name of the environment file variable read by interactive shells (`ENV`)
pub const ENV: &str = "ENV";
