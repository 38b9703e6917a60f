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

//! Part of the lexer that parses arithmetic expansions

use super::core::WordLexer;
use crate::parser::error::Result;
use crate::syntax::Text;
use crate::syntax::TextUnit;

impl WordLexer<'_, '_> {
    /// Parses an arithmetic expansion, if the input really is one.
    ///
    /// The current position must be at the second `(` of `$((`; `index` is
    /// the position of the `$`. Because `$((` can also start a command
    /// substitution containing a subshell (as in `$((echo); (echo))`), this
    /// function returns `None` and rewinds to the second `(` when the
    /// closing `))` cannot be found, in which case the caller should parse a
    /// command substitution instead.
    pub(super) fn arithmetic_expansion(&mut self, index: usize) -> Result<Option<TextUnit>> {
        let start = self.index();
        debug_assert_eq!(self.peek_char()?, Some('('));
        self.consume_char();

        fn is_escapable(c: char) -> bool {
            matches!(c, '$' | '`' | '\\')
        }

        let mut units = Vec::new();
        let mut depth = 0usize;
        loop {
            let mut inner =
                self.text(|c| c == '(' || c == ')', is_escapable)?;
            units.append(&mut inner.0);

            match self.peek_char()? {
                Some('(') => {
                    self.consume_char();
                    depth += 1;
                    units.push(TextUnit::Literal('('));
                }
                Some(')') if depth > 0 => {
                    self.consume_char();
                    depth -= 1;
                    units.push(TextUnit::Literal(')'));
                }
                Some(')') => {
                    self.consume_char();
                    if self.skip_if(|c| c == ')')? {
                        let location = self.location_range(index..self.index());
                        let content = Text(units);
                        return Ok(Some(TextUnit::Arith { content, location }));
                    }
                    // A single closing parenthesis: this is a command
                    // substitution, not an arithmetic expansion.
                    self.rewind(start);
                    return Ok(None);
                }
                _ => {
                    // End of input without `))`
                    self.rewind(start);
                    return Ok(None);
                }
            }
        }
    }
}
