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

//! Part of the lexer that provides miscellaneous utility parsers

use super::core::is_blank;
use super::core::Lexer;
use crate::parser::error::Result;

impl Lexer<'_> {
    /// Skips a character if the given function returns true for it.
    ///
    /// Different from [`consume_char_if`](Lexer::consume_char_if), this
    /// function does not return the consumed character.
    pub fn skip_blanks(&mut self) -> Result<()> {
        while self.skip_if(is_blank)? {}
        Ok(())
    }

    /// Skips a comment, if any.
    ///
    /// A comment begins with `#` and continues up to (but not including) the
    /// next newline. Line continuations are not recognized in comments.
    pub fn skip_comment(&mut self) -> Result<()> {
        if self.peek_char()? != Some('#') {
            return Ok(());
        }

        self.disable_line_continuation();
        while self.skip_if(|c| c != '\n')? {}
        self.enable_line_continuation();
        Ok(())
    }

    /// Skips blank characters and a subsequent comment.
    pub fn skip_blanks_and_comment(&mut self) -> Result<()> {
        self.skip_blanks()?;
        self.skip_comment()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Source;

    #[test]
    fn skip_blanks_stops_at_newline() {
        let mut lexer = Lexer::from_memory(" \t \n x", Source::Unknown);
        lexer.skip_blanks().unwrap();
        assert_eq!(lexer.peek_char(), Ok(Some('\n')));
    }

    #[test]
    fn skip_comment_to_newline() {
        let mut lexer = Lexer::from_memory("# comment \\\ncode", Source::Unknown);
        lexer.skip_comment().unwrap();
        assert_eq!(lexer.peek_char(), Ok(Some('\n')));
    }

    #[test]
    fn skip_blanks_and_comment_combined() {
        let mut lexer = Lexer::from_memory("  # c\nx", Source::Unknown);
        lexer.skip_blanks_and_comment().unwrap();
        assert_eq!(lexer.peek_char(), Ok(Some('\n')));
    }

    #[test]
    fn no_comment() {
        let mut lexer = Lexer::from_memory("x # y", Source::Unknown);
        lexer.skip_blanks_and_comment().unwrap();
        assert_eq!(lexer.peek_char(), Ok(Some('x')));
    }
}
