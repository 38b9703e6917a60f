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

//! Part of the lexer that parses dollar-single-quoted strings

use super::core::WordLexer;
use crate::parser::error::Error;
use crate::parser::error::Result;
use crate::parser::error::SyntaxError;
use crate::source::Location;
use crate::syntax::EscapeUnit;
use crate::syntax::EscapedString;
use crate::syntax::WordUnit;

impl WordLexer<'_, '_> {
    /// Parses a dollar-single-quoted string (`$'...'`).
    ///
    /// The opening `$'` must have been consumed; `opening_location` is the
    /// location of the quote. The content is decoded according to the
    /// ANSI-C escape rules. An unknown escape sequence keeps the backslash
    /// literally.
    pub(super) fn dollar_single_quote(&mut self, opening_location: Location) -> Result<WordUnit> {
        self.disable_line_continuation();
        let result = self.dollar_single_quote_content(&opening_location);
        self.enable_line_continuation();
        result.map(WordUnit::DollarSingleQuote)
    }

    fn dollar_single_quote_content(
        &mut self,
        opening_location: &Location,
    ) -> Result<EscapedString> {
        use EscapeUnit::*;

        let mut units = Vec::new();
        loop {
            match self.peek_char()? {
                None => {
                    let cause = SyntaxError::UnclosedDollarSingleQuote {
                        opening_location: opening_location.clone(),
                    }
                    .into();
                    let location = self.location()?;
                    return Err(Error { cause, location });
                }
                Some('\'') => {
                    self.consume_char();
                    return Ok(EscapedString(units));
                }
                Some('\\') => {
                    self.consume_char();
                    self.escape_unit(&mut units)?;
                }
                Some(c) => {
                    self.consume_char();
                    units.push(Literal(c));
                }
            }
        }
    }

    /// Parses one escape sequence after the backslash, pushing the decoded
    /// units.
    fn escape_unit(&mut self, units: &mut Vec<EscapeUnit>) -> Result<()> {
        use EscapeUnit::*;

        let Some(c) = self.peek_char()? else {
            // The unclosed-quote error is reported by the caller's next
            // iteration.
            units.push(Literal('\\'));
            return Ok(());
        };

        match c {
            '"' => {
                self.consume_char();
                units.push(DoubleQuote);
            }
            '\'' => {
                self.consume_char();
                units.push(SingleQuote);
            }
            '\\' => {
                self.consume_char();
                units.push(Backslash);
            }
            '?' => {
                self.consume_char();
                units.push(Question);
            }
            'a' => {
                self.consume_char();
                units.push(Alert);
            }
            'b' => {
                self.consume_char();
                units.push(Backspace);
            }
            'e' | 'E' => {
                self.consume_char();
                units.push(Escape);
            }
            'f' => {
                self.consume_char();
                units.push(FormFeed);
            }
            'n' => {
                self.consume_char();
                units.push(Newline);
            }
            'r' => {
                self.consume_char();
                units.push(CarriageReturn);
            }
            't' => {
                self.consume_char();
                units.push(Tab);
            }
            'v' => {
                self.consume_char();
                units.push(VerticalTab);
            }
            'c' => {
                self.consume_char();
                match self.peek_char()? {
                    Some(c) if c.is_ascii() => {
                        self.consume_char();
                        units.push(Control(c.to_ascii_uppercase() as u8 ^ 0x40));
                    }
                    _ => {
                        units.push(Literal('\\'));
                        units.push(Literal('c'));
                    }
                }
            }
            'x' => {
                self.consume_char();
                let value = self.radix_digits(16, 2)?;
                match value {
                    Some(value) => units.push(Hex(value as u8)),
                    None => {
                        units.push(Literal('\\'));
                        units.push(Literal('x'));
                    }
                }
            }
            'u' | 'U' => {
                self.consume_char();
                let max_digits = if c == 'u' { 4 } else { 8 };
                let value = self.radix_digits(16, max_digits)?;
                match value {
                    Some(value) => match char::from_u32(value) {
                        Some(decoded) => units.push(Unicode(decoded)),
                        None => units.push(Literal('\u{FFFD}')),
                    },
                    None => {
                        units.push(Literal('\\'));
                        units.push(Literal(c));
                    }
                }
            }
            '0'..='7' => {
                let value = self.radix_digits(8, 3)?.unwrap();
                units.push(Octal(value as u8));
            }
            c => {
                // Unknown escape: keep the backslash literally.
                self.consume_char();
                units.push(Literal('\\'));
                units.push(Literal(c));
            }
        }
        Ok(())
    }

    /// Consumes up to `max_digits` digits in the given radix and returns the
    /// accumulated value, or `None` if no digit was present.
    fn radix_digits(&mut self, radix: u32, max_digits: usize) -> Result<Option<u32>> {
        let mut value: u32 = 0;
        let mut digits = 0;
        while digits < max_digits {
            match self.peek_char()? {
                Some(c) if c.is_digit(radix) => {
                    self.consume_char();
                    value = value.wrapping_mul(radix).wrapping_add(c.to_digit(radix).unwrap());
                    digits += 1;
                }
                _ => break,
            }
        }
        Ok(if digits == 0 { None } else { Some(value) })
    }
}

#[cfg(test)]
mod tests {
    use super::super::core::Lexer;
    use super::super::core::WordContext;
    use super::super::core::WordLexer;
    use crate::parser::error::ErrorCause;
    use crate::parser::error::SyntaxError;
    use crate::source::Source;
    use crate::syntax::EscapeUnit::*;
    use crate::syntax::WordUnit;
    use assert_matches::assert_matches;

    fn parse(source: &str) -> Result<crate::syntax::EscapedString, crate::parser::error::Error> {
        let mut lexer = Lexer::from_memory(source, Source::Unknown);
        let mut lexer = WordLexer {
            lexer: &mut lexer,
            context: WordContext::Word,
        };
        match lexer.word_unit(|_| false)? {
            Some(WordUnit::DollarSingleQuote(escaped)) => Ok(escaped),
            other => panic!("not a dollar-single-quote: {other:?}"),
        }
    }

    #[test]
    fn literals_and_simple_escapes() {
        let escaped = parse(r"$'a\n\t\\'").unwrap();
        assert_eq!(escaped.0, [Literal('a'), Newline, Tab, Backslash]);
    }

    #[test]
    fn quote_escapes() {
        let escaped = parse(r#"$'\'\"'"#).unwrap();
        assert_eq!(escaped.0, [SingleQuote, DoubleQuote]);
    }

    #[test]
    fn numeric_escapes() {
        let escaped = parse(r"$'\x41\101B'").unwrap();
        assert_eq!(escaped.0, [Hex(0x41), Octal(0o101), Literal('B')]);
    }

    #[test]
    fn control_escape() {
        let escaped = parse(r"$'\cA'").unwrap();
        assert_eq!(escaped.0, [Control(1)]);
    }

    #[test]
    fn unknown_escape_keeps_backslash() {
        let escaped = parse(r"$'\q'").unwrap();
        assert_eq!(escaped.0, [Literal('\\'), Literal('q')]);
    }

    #[test]
    fn decoded_value() {
        let escaped = parse(r"$'a\tb'").unwrap();
        assert_eq!(escaped.to_decoded(), "a\tb");
    }

    #[test]
    fn unclosed() {
        let error = parse(r"$'abc").unwrap_err();
        assert_matches!(
            error.cause,
            ErrorCause::Syntax(SyntaxError::UnclosedDollarSingleQuote { .. })
        );
    }
}
