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

//! Quirks of variables
//!
//! While most variables act as a simple store of a value, some variables
//! have their value computed dynamically when they are read. `Quirk`
//! determines the nature of such a variable and contains the relevant state.
//! Writes to these variables are intercepted by the special-name assignment
//! hooks in [`Env`](crate::Env), which update the quirk state.

use super::Value;
use super::Variable;
use marsh_syntax::source::Location;
use marsh_syntax::source::Source;
use std::borrow::Cow;
use std::cell::Cell;

/// Special characteristics of a variable
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Quirk {
    /// Quirk for the `$LINENO` variable
    ///
    /// The value is computed dynamically from the expanding context: the
    /// line number of the location of the parameter expansion.
    LineNumber,

    /// Quirk for the `$RANDOM` variable
    ///
    /// Each read yields the next value of a pseudo-random sequence in the
    /// range 0..32768. Assignment to the variable reseeds the generator.
    Random {
        /// Internal generator state
        seed: Cell<u32>,
    },

    /// Quirk for the `$SECONDS` variable
    ///
    /// The value is the number of seconds since the shell started, offset so
    /// that an assignment `SECONDS=n` makes the variable count from `n`.
    Seconds {
        /// Monotonic-clock value (in seconds) corresponding to `SECONDS=0`
        origin: Cell<i64>,
    },

    /// Quirk for the `$EPOCHSECONDS` variable
    ///
    /// The value is the current time in seconds since the Unix epoch.
    EpochSeconds,
}

impl Quirk {
    /// Creates a `Random` quirk with the given seed.
    #[must_use]
    pub fn random(seed: u32) -> Quirk {
        Quirk::Random {
            seed: Cell::new(seed),
        }
    }

    /// Creates a `Seconds` quirk with the given origin.
    #[must_use]
    pub fn seconds(origin: i64) -> Quirk {
        Quirk::Seconds {
            origin: Cell::new(origin),
        }
    }
}

/// Clock values needed to expand time-dependent quirks
///
/// The caller obtains these from the `System` in use and passes them down so
/// that the variable module itself stays free of system dependencies.
#[derive(Clone, Copy, Debug, Default)]
pub struct QuirkContext {
    /// Seconds of the monotonic clock since shell startup
    pub monotonic_seconds: i64,
    /// Seconds since the Unix epoch
    pub epoch_seconds: i64,
}

/// Expanded value of a variable
///
/// Variables with a [`Quirk`] have their values computed dynamically when
/// expanded, hence [`Cow`] in the enum values.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Expansion<'a> {
    /// The value does not exist.
    Unset,
    /// The value is a single string.
    Scalar(Cow<'a, str>),
    /// The value is an array of strings.
    Array(Cow<'a, [String]>),
}

impl From<String> for Expansion<'static> {
    fn from(value: String) -> Self {
        Expansion::Scalar(Cow::Owned(value))
    }
}

impl<'a> From<&'a str> for Expansion<'a> {
    fn from(value: &'a str) -> Self {
        Expansion::Scalar(Cow::Borrowed(value))
    }
}

impl<'a> From<&'a Value> for Expansion<'a> {
    fn from(value: &'a Value) -> Self {
        match value {
            Value::Scalar(value) => Expansion::Scalar(Cow::Borrowed(value)),
            Value::Indexed(values) => {
                Expansion::Array(Cow::Owned(values.values().cloned().collect()))
            }
            Value::Assoc(values) => {
                Expansion::Array(Cow::Owned(values.values().cloned().collect()))
            }
        }
    }
}

impl Expansion<'_> {
    /// Converts into an owned value.
    #[must_use]
    pub fn into_owned(self) -> Option<Value> {
        match self {
            Expansion::Unset => None,
            Expansion::Scalar(value) => Some(Value::Scalar(value.into_owned())),
            Expansion::Array(values) => Some(Value::array(values.into_owned())),
        }
    }
}

impl Variable {
    /// Returns the value of this variable, applying any quirk.
    ///
    /// If this variable has no [`Quirk`], this function just returns
    /// `self.value` converted to [`Expansion`]. Otherwise, the effect of the
    /// quirk is applied and the result is returned.
    ///
    /// This function requires the location of the parameter expanding this
    /// variable, so that `Quirk::LineNumber` can yield the line number of
    /// the location, and a [`QuirkContext`] for the time-dependent quirks.
    pub fn expand(&self, mut location: &Location, context: &QuirkContext) -> Expansion {
        match &self.quirk {
            None => match &self.value {
                None => Expansion::Unset,
                Some(value) => value.into(),
            },

            Some(Quirk::LineNumber) => {
                while let Source::Alias { original, .. } = &*location.code.source {
                    location = original;
                }
                let line_number = location.code.line_number(location.range.start);
                line_number.to_string().into()
            }

            Some(Quirk::Random { seed }) => {
                // Same linear congruential generator parameters as the C
                // library's rand(3) in many implementations
                let next = seed
                    .get()
                    .wrapping_mul(1103515245)
                    .wrapping_add(12345);
                seed.set(next);
                ((next >> 16) & 0x7FFF).to_string().into()
            }

            Some(Quirk::Seconds { origin }) => {
                (context.monotonic_seconds - origin.get()).to_string().into()
            }

            Some(Quirk::EpochSeconds) => context.epoch_seconds.to_string().into(),
        }
    }
}
