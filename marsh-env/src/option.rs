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

//! Type definitions for shell options
//!
//! This module defines the [`OptionSet`] struct, a map from [`Option`] to
//! [`State`]. The option set represents whether each option is on or off.
//!
//! Note that `OptionSet` merely manages the state of options. It is not the
//! responsibility of `OptionSet` to change the behavior of the shell
//! according to the options.

use enumset::EnumSet;
use enumset::EnumSetType;
use std::fmt::Display;
use std::fmt::Formatter;
use std::ops::Not;
use std::str::FromStr;

/// State of an option: either enabled or disabled
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum State {
    /// Enabled
    On,
    /// Disabled
    Off,
}

pub use State::*;

impl Display for State {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            On => "on",
            Off => "off",
        };
        s.fmt(f)
    }
}

impl Not for State {
    type Output = Self;
    #[must_use]
    fn not(self) -> Self {
        match self {
            On => Off,
            Off => On,
        }
    }
}

impl From<bool> for State {
    fn from(value: bool) -> State {
        if value {
            On
        } else {
            Off
        }
    }
}

/// Shell option
#[derive(Clone, Copy, Debug, EnumSetType, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[enumset(no_super_impls)]
#[non_exhaustive]
pub enum Option {
    /// Exports all variables when they are assigned. (`-a`)
    AllExport,
    /// Allows overwriting an existing file with the `>` redirection.
    /// (`+C` disables clobbering.)
    Clobber,
    /// Executes a command string specified as a command line argument.
    /// (`-c`)
    CmdLine,
    /// Makes the shell exit when a command returns a non-zero exit status.
    /// (`-e`)
    ErrExit,
    /// Makes the shell actually run commands. (`+n` enables execution.)
    Exec,
    /// Makes functions inherit the `DEBUG`, `ERR`, and `RETURN` traps.
    /// (`-T`)
    FuncTrace,
    /// Enables pathname expansion. (`+f` enables globbing.)
    Glob,
    /// Prevents the interactive shell from exiting on end-of-file.
    IgnoreEof,
    /// Enables features for interactive use. (`-i`)
    Interactive,
    /// Runs the final element of a pipeline in the current shell
    /// environment when job control is off.
    LastPipe,
    /// Sources the profile files on startup. (`-l`)
    Login,
    /// Enables job control. (`-m`)
    Monitor,
    /// Automatically reports the results of asynchronous jobs.
    Notify,
    /// Makes the exit status of a pipeline the status of its rightmost
    /// non-zero element.
    PipeFail,
    /// Disables most non-POSIX extensions.
    PosixlyCorrect,
    /// Reads commands from the standard input. (`-s`)
    Stdin,
    /// Expands unset variables to an empty string rather than erroring out.
    /// (`+u`)
    Unset,
    /// Echoes the input before parsing and executing. (`-v`)
    Verbose,
    /// Prints expanded words during command execution. (`-x`)
    XTrace,
}

pub use self::Option::*;

impl Option {
    /// Whether this option can be modified by the set built-in.
    ///
    /// Unmodifiable options can be set only on shell startup.
    #[must_use]
    pub fn is_modifiable(self) -> bool {
        !matches!(self, CmdLine | Interactive | Stdin | Login)
    }

    /// Returns the option name, all in lower case without punctuation.
    #[must_use]
    pub fn long_name(self) -> &'static str {
        match self {
            AllExport => "allexport",
            Clobber => "clobber",
            CmdLine => "cmdline",
            ErrExit => "errexit",
            Exec => "exec",
            FuncTrace => "functrace",
            Glob => "glob",
            IgnoreEof => "ignoreeof",
            Interactive => "interactive",
            LastPipe => "lastpipe",
            Login => "login",
            Monitor => "monitor",
            Notify => "notify",
            PipeFail => "pipefail",
            PosixlyCorrect => "posixlycorrect",
            Stdin => "stdin",
            Unset => "unset",
            Verbose => "verbose",
            XTrace => "xtrace",
        }
    }

    /// Returns the short option letter, if any, with the state it selects.
    ///
    /// For example, `-e` turns `ErrExit` on, while `-C` turns `Clobber`
    /// off.
    #[must_use]
    pub fn short_name(self) -> std::option::Option<(char, State)> {
        match self {
            AllExport => Some(('a', On)),
            Clobber => Some(('C', Off)),
            CmdLine => Some(('c', On)),
            ErrExit => Some(('e', On)),
            Exec => Some(('n', Off)),
            FuncTrace => Some(('T', On)),
            Glob => Some(('f', Off)),
            Interactive => Some(('i', On)),
            Login => Some(('l', On)),
            Monitor => Some(('m', On)),
            Notify => Some(('b', On)),
            Stdin => Some(('s', On)),
            Unset => Some(('u', Off)),
            Verbose => Some(('v', On)),
            XTrace => Some(('x', On)),
            IgnoreEof | LastPipe | PipeFail | PosixlyCorrect => None,
        }
    }

    /// Finds the option with the given short letter.
    #[must_use]
    pub fn from_short_name(letter: char) -> std::option::Option<(Option, State)> {
        EnumSet::<Option>::all()
            .iter()
            .find_map(|option| match option.short_name() {
                Some((c, state)) if c == letter => Some((option, state)),
                _ => None,
            })
    }
}

impl Display for Option {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.long_name().fmt(f)
    }
}

/// Error type indicating that the input string does not name a valid option
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum FromStrError {
    /// The input string does not match any option name.
    NoSuchOption,
    /// The input string is a prefix of more than one valid option name.
    Ambiguous,
}

pub use FromStrError::*;

/// Parses an option name.
///
/// The input string should be a canonical option name, all lowercase without
/// punctuation; use [`canonicalize`] to normalize user input first.
///
/// The option name may be abbreviated as long as it is an unambiguous prefix
/// of a valid option name. A full option name is never considered ambiguous.
impl FromStr for Option {
    type Err = FromStrError;
    fn from_str(name: &str) -> Result<Self, FromStrError> {
        let mut matched = None;
        for option in EnumSet::<Option>::all() {
            let long_name = option.long_name();
            if long_name == name {
                return Ok(option);
            }
            if long_name.starts_with(name) {
                if matched.is_some() {
                    return Err(Ambiguous);
                }
                matched = Some(option);
            }
        }
        matched.ok_or(NoSuchOption)
    }
}

/// Normalizes an option name for parsing.
///
/// This function converts the name to lowercase and removes `-` and `_`
/// separators, so that e.g. `pipe-fail` and `Pipe_Fail` parse equal to
/// `pipefail`. A `no` prefix is *not* handled here.
#[must_use]
pub fn canonicalize(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Collection of all option states
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct OptionSet {
    /// Set of currently enabled options
    enabled: EnumSet<Option>,
}

impl OptionSet {
    /// Returns an option set with default settings.
    ///
    /// `Clobber`, `Exec`, `Glob`, and `Unset` are on; everything else is
    /// off.
    #[must_use]
    pub fn default() -> OptionSet {
        OptionSet {
            enabled: Clobber | Exec | Glob | Unset,
        }
    }

    /// Returns an option set with all options off.
    #[must_use]
    pub fn empty() -> OptionSet {
        OptionSet {
            enabled: EnumSet::empty(),
        }
    }

    /// Returns the state of an option.
    #[must_use]
    pub fn get(&self, option: Option) -> State {
        self.enabled.contains(option).into()
    }

    /// Sets the state of an option.
    pub fn set(&mut self, option: Option, state: State) {
        match state {
            On => self.enabled.insert(option),
            Off => self.enabled.remove(option),
        };
    }

    /// Returns an iterator of all options with their states.
    pub fn iter(&self) -> impl Iterator<Item = (Option, State)> + '_ {
        EnumSet::<Option>::all()
            .iter()
            .map(|option| (option, self.get(option)))
    }
}

impl Default for OptionSet {
    fn default() -> OptionSet {
        OptionSet::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_states() {
        let set = OptionSet::default();
        assert_eq!(set.get(Clobber), On);
        assert_eq!(set.get(Exec), On);
        assert_eq!(set.get(Glob), On);
        assert_eq!(set.get(Unset), On);
        assert_eq!(set.get(ErrExit), Off);
        assert_eq!(set.get(PipeFail), Off);
    }

    #[test]
    fn setting_states() {
        let mut set = OptionSet::default();
        set.set(ErrExit, On);
        assert_eq!(set.get(ErrExit), On);
        set.set(ErrExit, Off);
        assert_eq!(set.get(ErrExit), Off);
    }

    #[test]
    fn parsing_full_names() {
        assert_eq!("errexit".parse(), Ok(ErrExit));
        assert_eq!("pipefail".parse(), Ok(PipeFail));
        assert_eq!("nosuch".parse::<Option>(), Err(NoSuchOption));
    }

    #[test]
    fn parsing_abbreviations() {
        assert_eq!("err".parse(), Ok(ErrExit));
        // A prefix of multiple options is ambiguous.
        assert_eq!("l".parse::<Option>(), Err(Ambiguous));
        // A full name is never ambiguous even if it prefixes another.
        assert_eq!("login".parse(), Ok(Login));
    }

    #[test]
    fn canonicalizing() {
        assert_eq!(canonicalize("pipe-fail"), "pipefail");
        assert_eq!(canonicalize("Err_Exit"), "errexit");
    }

    #[test]
    fn short_names() {
        assert_eq!(Option::from_short_name('e'), Some((ErrExit, On)));
        assert_eq!(Option::from_short_name('C'), Some((Clobber, Off)));
        assert_eq!(Option::from_short_name('z'), None);
    }
}
