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

//! Signal names and numbers
//!
//! This module defines a portable [`Name`] for each signal the shell knows
//! about and a [`Number`] newtype for raw signal numbers. The mapping between
//! the two is provided by the `System` implementation in use; the real system
//! maps names to the C library constants, and the virtual system uses the
//! same values for simplicity.

use std::ffi::c_int;
use std::fmt;
use std::num::NonZeroI32;
use std::str::FromStr;
use strum::EnumIter;
use thiserror::Error;

/// Symbolic name of a signal
#[derive(Clone, Copy, Debug, EnumIter, Eq, Hash, PartialEq, PartialOrd, Ord)]
#[non_exhaustive]
pub enum Name {
    Abrt,
    Alrm,
    Bus,
    Chld,
    Cont,
    Fpe,
    Hup,
    Ill,
    Int,
    Kill,
    Pipe,
    Quit,
    Segv,
    Stop,
    Term,
    Tstp,
    Ttin,
    Ttou,
    Urg,
    Usr1,
    Usr2,
    Winch,
    Xcpu,
    Xfsz,
}

impl Name {
    /// Returns the name without the `SIG` prefix, e.g. `"INT"`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        use Name::*;
        match self {
            Abrt => "ABRT",
            Alrm => "ALRM",
            Bus => "BUS",
            Chld => "CHLD",
            Cont => "CONT",
            Fpe => "FPE",
            Hup => "HUP",
            Ill => "ILL",
            Int => "INT",
            Kill => "KILL",
            Pipe => "PIPE",
            Quit => "QUIT",
            Segv => "SEGV",
            Stop => "STOP",
            Term => "TERM",
            Tstp => "TSTP",
            Ttin => "TTIN",
            Ttou => "TTOU",
            Urg => "URG",
            Usr1 => "USR1",
            Usr2 => "USR2",
            Winch => "WINCH",
            Xcpu => "XCPU",
            Xfsz => "XFSZ",
        }
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SIG{}", self.as_str())
    }
}

/// Error parsing a signal name
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
#[error("not a signal name")]
pub struct ParseNameError;

/// Parses a signal name, with or without the `SIG` prefix.
impl FromStr for Name {
    type Err = ParseNameError;
    fn from_str(s: &str) -> Result<Name, ParseNameError> {
        use Name::*;
        let s = s.strip_prefix("SIG").unwrap_or(s);
        match s {
            "ABRT" => Ok(Abrt),
            "ALRM" => Ok(Alrm),
            "BUS" => Ok(Bus),
            "CHLD" => Ok(Chld),
            "CONT" => Ok(Cont),
            "FPE" => Ok(Fpe),
            "HUP" => Ok(Hup),
            "ILL" => Ok(Ill),
            "INT" => Ok(Int),
            "KILL" => Ok(Kill),
            "PIPE" => Ok(Pipe),
            "QUIT" => Ok(Quit),
            "SEGV" => Ok(Segv),
            "STOP" => Ok(Stop),
            "TERM" => Ok(Term),
            "TSTP" => Ok(Tstp),
            "TTIN" => Ok(Ttin),
            "TTOU" => Ok(Ttou),
            "URG" => Ok(Urg),
            "USR1" => Ok(Usr1),
            "USR2" => Ok(Usr2),
            "WINCH" => Ok(Winch),
            "XCPU" => Ok(Xcpu),
            "XFSZ" => Ok(Xfsz),
            _ => Err(ParseNameError),
        }
    }
}

/// Raw signal number
///
/// A `Number` is always positive. Use the `System` in use to convert between
/// numbers and [`Name`]s.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct Number(NonZeroI32);

impl Number {
    /// Creates a `Number` from a raw value.
    ///
    /// Returns `None` if the value is not positive.
    #[must_use]
    pub fn from_raw(value: c_int) -> Option<Number> {
        if value > 0 {
            NonZeroI32::new(value).map(Number)
        } else {
            None
        }
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_raw(self) -> c_int {
        self.0.get()
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_round_trip() {
        for s in ["INT", "CHLD", "USR1", "WINCH"] {
            let name: Name = s.parse().unwrap();
            assert_eq!(name.as_str(), s);
        }
    }

    #[test]
    fn name_with_sig_prefix() {
        assert_eq!("SIGTERM".parse::<Name>(), Ok(Name::Term));
    }

    #[test]
    fn invalid_names() {
        assert_eq!("NOSUCH".parse::<Name>(), Err(ParseNameError));
        assert_eq!("int".parse::<Name>(), Err(ParseNameError));
    }

    #[test]
    fn number_from_raw() {
        assert_eq!(Number::from_raw(2).unwrap().as_raw(), 2);
        assert_eq!(Number::from_raw(0), None);
        assert_eq!(Number::from_raw(-1), None);
    }
}
