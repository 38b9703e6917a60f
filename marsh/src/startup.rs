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

//! Shell startup: invocation parsing, environment import, and startup files

use marsh_env::function::Function;
use marsh_env::option;
use marsh_env::option::State::{Off, On};
use marsh_env::system::Fd;
use marsh_env::system::System;
use marsh_env::variable;
use marsh_env::variable::Scope;
use marsh_env::Env;
use marsh_syntax::source::Location;
use marsh_syntax::syntax::FullCompoundCommand;

/// What the shell was asked to run
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Work {
    /// Command string given with `-c`
    CommandString(String),
    /// Script file named as an operand
    File(String),
    /// Commands read from the standard input
    Stdin,
}

/// Parsed command line of the shell itself
#[derive(Clone, Debug)]
pub struct Invocation {
    /// Name the shell was invoked under (`$0`)
    pub arg0: String,
    /// What to execute
    pub work: Work,
    /// Positional parameters
    pub params: Vec<String>,
    /// Whether `-i` was given
    pub interactive: Option<bool>,
    /// Whether the shell is a login shell (`-l` or a leading `-` in `$0`)
    pub login: bool,
    /// Option settings from short flags and `-o`/`+o`
    pub option_settings: Vec<(option::Option, option::State)>,
}

impl Invocation {
    /// Parses the shell's own command line.
    pub fn from_args<I: IntoIterator<Item = String>>(args: I) -> Result<Invocation, String> {
        let mut args = args.into_iter();
        let arg0 = args.next().unwrap_or_else(|| "marsh".to_owned());
        let login = arg0.starts_with('-');

        let mut invocation = Invocation {
            arg0,
            work: Work::Stdin,
            params: Vec::new(),
            interactive: None,
            login,
            option_settings: Vec::new(),
        };
        let mut command_string = None;
        let mut read_stdin = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-c" => {
                    command_string = Some(());
                    invocation
                        .option_settings
                        .push((option::CmdLine, On));
                }
                "-s" => {
                    read_stdin = true;
                    invocation.option_settings.push((option::Stdin, On));
                }
                "-i" => invocation.interactive = Some(true),
                "+i" => invocation.interactive = Some(false),
                "-l" | "--login" => invocation.login = true,
                "-o" | "+o" => {
                    let state = if arg == "-o" { On } else { Off };
                    let Some(name) = args.next() else {
                        return Err("option name is missing after -o".to_owned());
                    };
                    let canonical = option::canonicalize(&name);
                    match canonical.parse() {
                        Ok(option) => invocation.option_settings.push((option, state)),
                        Err(_) => return Err(format!("{name}: no such option")),
                    }
                }
                "--" => break,
                "-" => break,
                _ if arg.starts_with("--") => {
                    let canonical = option::canonicalize(&arg[2..]);
                    match canonical.parse() {
                        Ok(option) => invocation.option_settings.push((option, On)),
                        Err(_) => return Err(format!("{arg}: no such option")),
                    }
                }
                _ if (arg.starts_with('-') || arg.starts_with('+')) && arg.len() > 1 => {
                    let enable = arg.starts_with('-');
                    for letter in arg[1..].chars() {
                        let Some((option, on_state)) = option::Option::from_short_name(letter)
                        else {
                            return Err(format!("-{letter}: no such option"));
                        };
                        let state = if enable { on_state } else { !on_state };
                        invocation.option_settings.push((option, state));
                    }
                }
                _ => {
                    // The first operand is the script file (or the value of
                    // `$0` with -c).
                    invocation.params.push(arg);
                    break;
                }
            }
        }
        invocation.params.extend(args);

        if command_string.is_some() {
            let mut params = invocation.params.drain(..);
            let Some(command) = params.next() else {
                drop(params);
                return Err("command string is missing after -c".to_owned());
            };
            let mut rest: Vec<String> = params.collect();
            invocation.work = Work::CommandString(command);
            if !rest.is_empty() {
                invocation.arg0 = rest.remove(0);
            }
            invocation.params = rest;
        } else if read_stdin || invocation.params.is_empty() {
            invocation.work = Work::Stdin;
        } else {
            let file = invocation.params.remove(0);
            invocation.arg0 = file.clone();
            invocation.work = Work::File(file);
        }

        Ok(invocation)
    }
}

/// Applies the invocation to a fresh environment.
pub fn initialize(env: &mut Env, invocation: &Invocation) {
    env.arg0 = invocation.arg0.clone();
    env.variables.positional_params_mut().values = invocation.params.clone();

    for &(option, state) in &invocation.option_settings {
        env.options.set(option, state);
    }
    if invocation.login {
        env.options.set(option::Login, On);
    }

    // The shell is interactive when reading commands from a terminal, or
    // when told so explicitly.
    let interactive = invocation.interactive.unwrap_or_else(|| {
        invocation.work == Work::Stdin
            && env.system.isatty(Fd::STDIN)
            && env.system.isatty(Fd::STDERR)
    });
    if interactive {
        env.options.set(option::Interactive, On);
        env.options.set(option::Monitor, On);
        env.tty = Some(Fd::STDERR);

        let mut system = env.system.clone();
        _ = env.traps.enable_terminator_handlers(&mut system);
        _ = env.traps.enable_stopper_handlers(&mut system);
    }
    {
        let mut system = env.system.clone();
        _ = env.traps.enable_sigchld_handler(&mut system);
    }

    // Default variables
    let seed = env.main_pid.as_raw() as u32 ^ env.system.epoch_time() as u32;
    env.variables.init(seed);
    let ppid = env.system.getppid();
    _ = env
        .variables
        .get_or_new(variable::PPID, Scope::Global)
        .assign(ppid.to_string(), None);
    if let Ok(pwd) = env.system.getcwd() {
        let mut variable = env.variables.get_or_new(variable::PWD, Scope::Global);
        _ = variable.assign(pwd.to_string_lossy().into_owned(), None);
        variable.export(true);
    }
}

/// Imports environment variables, decoding exported functions.
///
/// A variable named `MARSH_FUNC_name%%` whose value looks like a function
/// body (`() { ... }`) defines an exported function instead of a variable.
/// Such definitions are skipped if the decoded name is not a valid function
/// name.
pub fn import_environment(env: &mut Env) {
    for (name, value) in std::env::vars() {
        let function_name = name
            .strip_prefix(variable::FUNCTION_PREFIX)
            .and_then(|rest| rest.strip_suffix(variable::FUNCTION_SUFFIX));
        if let Some(function_name) = function_name {
            if !variable::is_valid_name(function_name) {
                continue;
            }
            let Some(body_text) = value.strip_prefix("() ") else {
                continue;
            };
            let Ok(body) = body_text.parse::<FullCompoundCommand>() else {
                continue;
            };
            let mut function = Function::new(
                function_name,
                body,
                Location::dummy(name.clone()),
            );
            function.is_exported = true;
            _ = env.functions.define(function);
            continue;
        }

        let mut variable = env.variables.get_or_new(name, Scope::Global);
        if variable.assign(value, None).is_ok() {
            variable.export(true);
            variable.import(true);
        }
    }
    env.invalidate_export_env();
}

/// Reads one startup file into the environment, ignoring a missing file.
fn source_file(env: &mut Env, path: &str) {
    let Ok(c_path) = std::ffi::CString::new(path) else {
        return;
    };
    if !env.system.is_regular_file(&c_path) {
        return;
    }
    let fields = vec![marsh_env::semantics::Field::dummy(path)];
    _ = marsh_builtin::source::main(env, fields);
}

/// Sources the startup files appropriate for the invocation.
///
/// A login shell reads `/etc/profile` and `~/.profile`. An interactive
/// shell additionally reads the file named by `$ENV`, subjecting the value
/// to tilde expansion of the leading `~`.
pub fn source_startup_files(env: &mut Env, invocation: &Invocation) {
    let _ = invocation;
    if env.options.get(option::Login) == On {
        source_file(env, "/etc/profile");
        if let Some(home) = env.variables.get_scalar(variable::HOME) {
            let profile = format!("{home}/.profile");
            source_file(env, &profile);
        }
    }

    if env.is_interactive() {
        if let Some(env_file) = env.variables.get_scalar(variable::ENV) {
            let mut env_file = env_file.to_owned();
            if let Some(rest) = env_file.strip_prefix("~/") {
                if let Some(home) = env.variables.get_scalar(variable::HOME) {
                    env_file = format!("{home}/{rest}");
                }
            }
            source_file(env, &env_file);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Invocation {
        Invocation::from_args(args.iter().map(|s| s.to_string())).unwrap()
    }

    #[test]
    fn command_string_invocation() {
        let invocation = parse(&["marsh", "-c", "echo hi"]);
        assert_eq!(invocation.work, Work::CommandString("echo hi".to_owned()));
        assert_eq!(invocation.arg0, "marsh");
        assert_eq!(invocation.params, [] as [&str; 0]);
    }

    #[test]
    fn command_string_with_arg0_and_params() {
        let invocation = parse(&["marsh", "-c", "echo hi", "name", "p1", "p2"]);
        assert_eq!(invocation.arg0, "name");
        assert_eq!(invocation.params, ["p1", "p2"]);
    }

    #[test]
    fn script_file_invocation() {
        let invocation = parse(&["marsh", "script.sh", "a", "b"]);
        assert_eq!(invocation.work, Work::File("script.sh".to_owned()));
        assert_eq!(invocation.arg0, "script.sh");
        assert_eq!(invocation.params, ["a", "b"]);
    }

    #[test]
    fn stdin_invocation() {
        let invocation = parse(&["marsh"]);
        assert_eq!(invocation.work, Work::Stdin);

        let invocation = parse(&["marsh", "-s", "p1"]);
        assert_eq!(invocation.work, Work::Stdin);
        assert_eq!(invocation.params, ["p1"]);
    }

    #[test]
    fn short_option_flags() {
        let invocation = parse(&["marsh", "-ex", "-c", "true"]);
        assert!(invocation
            .option_settings
            .contains(&(option::ErrExit, On)));
        assert!(invocation
            .option_settings
            .contains(&(option::XTrace, On)));
    }

    #[test]
    fn long_options() {
        let invocation = parse(&["marsh", "-o", "pipefail", "-c", "true"]);
        assert!(invocation
            .option_settings
            .contains(&(option::PipeFail, On)));
    }

    #[test]
    fn login_from_arg0() {
        let invocation = parse(&["-marsh"]);
        assert!(invocation.login);
    }

    #[test]
    fn missing_command_string_is_an_error() {
        let result = Invocation::from_args(["marsh".to_owned(), "-c".to_owned()]);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_option_is_an_error() {
        let result =
            Invocation::from_args(["marsh".to_owned(), "-Z".to_owned()]);
        assert!(result.is_err());
    }
}
