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

//! Quote removal
//!
//! Quote removal drops the characters that [quote other
//! characters](super::attr::AttrChar::is_quoting), which is the last phase
//! of the word expansion.

use super::attr::AttrField;

/// Removes quoting characters and returns the string value of the field.
#[must_use]
pub fn strip(field: &AttrField) -> String {
    field
        .iter()
        .filter(|c| !c.is_quoting)
        .map(|c| c.value)
        .collect()
}
