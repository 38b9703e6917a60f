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

//! Part of the lexer that parses words

use super::core::WordContext;
use super::core::WordLexer;
use crate::parser::error::Error;
use crate::parser::error::Result;
use crate::parser::error::SyntaxError;
use crate::source::Location;
use crate::syntax::Word;
use crate::syntax::WordUnit::{self, DollarDoubleQuote, DollarSingleQuote, DoubleQuote, SingleQuote, Unquoted};

impl WordLexer<'_, '_> {
    /// Parses a single-quoted string.
    ///
    /// The opening `'` must have been consumed before calling this function.
    /// The closing `'` is consumed in this function.
    ///
    /// `opening_location` should be the location of the opening `'`.
    fn single_quote(&mut self, opening_location: Location) -> Result<WordUnit> {
        let mut content = String::new();
        self.disable_line_continuation();
        loop {
            match self.peek_char()? {
                Some('\'') => {
                    self.consume_char();
                    break;
                }
                Some(c) => {
                    self.consume_char();
                    content.push(c);
                }
                None => {
                    self.enable_line_continuation();
                    let cause = SyntaxError::UnclosedSingleQuote { opening_location }.into();
                    let location = self.location()?;
                    return Err(Error { cause, location });
                }
            }
        }
        self.enable_line_continuation();
        Ok(SingleQuote(content))
    }

    /// Parses a double-quoted string.
    ///
    /// The opening `"` must have been consumed before calling this function.
    /// The closing `"` is consumed in this function.
    fn double_quote(&mut self, opening_location: Location) -> Result<WordUnit> {
        fn is_delimiter(c: char) -> bool {
            c == '"'
        }
        fn is_escapable(c: char) -> bool {
            matches!(c, '$' | '`' | '"' | '\\')
        }

        let mut lexer = WordLexer {
            lexer: self.lexer,
            context: WordContext::Text,
        };
        let content = lexer.text(is_delimiter, is_escapable)?;

        if self.skip_if(|c| c == '"')? {
            Ok(DoubleQuote(content))
        } else {
            let cause = SyntaxError::UnclosedDoubleQuote { opening_location }.into();
            let location = self.location()?;
            Err(Error { cause, location })
        }
    }

    /// Parses a word unit.
    ///
    /// `is_delimiter` is a function that decides a character is a delimiter.
    /// An unquoted character is parsed only if `is_delimiter` returns false
    /// for it.
    ///
    /// This function does not parse tilde expansion. See [`word`](Self::word).
    pub fn word_unit<F>(&mut self, is_delimiter: F) -> Result<Option<WordUnit>>
    where
        F: FnMut(char) -> bool,
    {
        let allow_quotes = match self.context {
            WordContext::Word => true,
            WordContext::Text => false,
        };

        match self.peek_char()? {
            Some('\'') if allow_quotes => {
                let location = self.location()?;
                self.consume_char();
                self.single_quote(location).map(Some)
            }
            Some('"') if allow_quotes => {
                let location = self.location()?;
                self.consume_char();
                self.double_quote(location).map(Some)
            }
            Some('$') if allow_quotes => {
                // `$'...'` and `$"..."` take precedence over plain dollar
                // expansions, which are handled by `text_unit`.
                let index = self.index();
                self.consume_char();
                match self.peek_char()? {
                    Some('\'') => {
                        let location = self.location()?;
                        self.consume_char();
                        return self.dollar_single_quote(location).map(Some);
                    }
                    Some('"') => {
                        let location = self.location()?;
                        self.consume_char();
                        return match self.double_quote(location)? {
                            DoubleQuote(content) => Ok(Some(DollarDoubleQuote(content))),
                            _ => unreachable!(),
                        };
                    }
                    _ => self.rewind(index),
                }
                Ok(self.text_unit(is_delimiter, |_| true)?.map(Unquoted))
            }
            _ => Ok(self.text_unit(is_delimiter, |_| true)?.map(Unquoted)),
        }
    }

    /// Parses a word token.
    ///
    /// `is_delimiter` is a function that decides which character is a
    /// delimiter. The word ends when an unquoted delimiter is found. To parse
    /// a normal word token, you should pass
    /// [`is_token_delimiter_char`](super::is_token_delimiter_char) as
    /// `is_delimiter`. Other functions can be passed to parse a word that
    /// ends with different delimiters.
    ///
    /// This function does not parse any tilde expansions in the word.
    /// To parse them, you need to call [`Word::parse_tilde_front`] on the
    /// resultant word.
    pub fn word<F>(&mut self, mut is_delimiter: F) -> Result<Word>
    where
        F: FnMut(char) -> bool,
    {
        let start = self.index();
        let location = self.location()?;
        let mut units = vec![];
        while let Some(unit) = self.word_unit(&mut is_delimiter)? {
            units.push(unit)
        }
        let location = if units.is_empty() {
            location
        } else {
            self.location_range(start..self.index())
        };
        Ok(Word { units, location })
    }
}

#[cfg(test)]
mod tests {
    use super::super::core::Lexer;
    use super::*;
    use crate::source::Source;
    use crate::syntax::EscapeUnit;
    use crate::syntax::TextUnit::*;
    use assert_matches::assert_matches;

    fn word_lexer<'a, 'b>(lexer: &'a mut Lexer<'b>) -> WordLexer<'a, 'b> {
        WordLexer {
            lexer,
            context: WordContext::Word,
        }
    }

    fn parse_word(source: &str) -> Word {
        let mut lexer = Lexer::from_memory(source, Source::Unknown);
        let mut lexer = word_lexer(&mut lexer);
        lexer.word(super::super::is_token_delimiter_char).unwrap()
    }

    #[test]
    fn plain_word() {
        let word = parse_word("hello");
        assert_eq!(word.units.len(), 5);
        assert_eq!(word.to_string(), "hello");
    }

    #[test]
    fn single_quoted() {
        let word = parse_word("'a b'");
        assert_eq!(word.units, [SingleQuote("a b".to_string())]);
    }

    #[test]
    fn single_quote_keeps_backslash() {
        let word = parse_word(r"'a\n'");
        assert_eq!(word.units, [SingleQuote(r"a\n".to_string())]);
    }

    #[test]
    fn single_quote_keeps_line_continuation() {
        let word = parse_word("'a\\\nb'");
        assert_eq!(word.units, [SingleQuote("a\\\nb".to_string())]);
    }

    #[test]
    fn double_quoted() {
        let word = parse_word(r#""a $b""#);
        assert_matches!(&word.units[..], [DoubleQuote(text)] => {
            assert_eq!(text.0[0], Literal('a'));
            assert_eq!(text.0[1], Literal(' '));
            assert_matches!(&text.0[2], RawParam { param, .. } => {
                assert_eq!(param.id, "b");
            });
        });
    }

    #[test]
    fn double_quote_escapes() {
        let word = parse_word(r#""\$\a""#);
        assert_matches!(&word.units[..], [DoubleQuote(text)] => {
            assert_eq!(
                text.0,
                [Backslashed('$'), Literal('\\'), Literal('a')]
            );
        });
    }

    #[test]
    fn single_quote_not_special_in_text_context() {
        let mut lexer = Lexer::from_memory("'a'", Source::Unknown);
        let mut lexer = WordLexer {
            lexer: &mut lexer,
            context: WordContext::Text,
        };
        let unit = lexer.word_unit(|_| false).unwrap().unwrap();
        assert_eq!(unit, Unquoted(Literal('\'')));
    }

    #[test]
    fn unclosed_single_quote() {
        let mut lexer = Lexer::from_memory("'abc", Source::Unknown);
        let mut lexer = word_lexer(&mut lexer);
        let error = lexer.word_unit(|_| false).unwrap_err();
        assert_matches!(
            error.cause,
            crate::parser::error::ErrorCause::Syntax(SyntaxError::UnclosedSingleQuote { .. })
        );
    }

    #[test]
    fn unclosed_double_quote() {
        let mut lexer = Lexer::from_memory("\"abc", Source::Unknown);
        let mut lexer = word_lexer(&mut lexer);
        let error = lexer.word_unit(|_| false).unwrap_err();
        assert_matches!(
            error.cause,
            crate::parser::error::ErrorCause::Syntax(SyntaxError::UnclosedDoubleQuote { .. })
        );
    }

    #[test]
    fn dollar_single_quote_in_word() {
        let word = parse_word(r"$'a\n'");
        assert_matches!(&word.units[..], [DollarSingleQuote(escaped)] => {
            assert_eq!(
                escaped.0,
                [EscapeUnit::Literal('a'), EscapeUnit::Newline]
            );
        });
    }

    #[test]
    fn dollar_double_quote_in_word() {
        let word = parse_word(r#"$"hi""#);
        assert_matches!(&word.units[..], [DollarDoubleQuote(text)] => {
            assert_eq!(text.0, [Literal('h'), Literal('i')]);
        });
    }

    #[test]
    fn dollar_expansion_still_works() {
        let word = parse_word("$x");
        assert_matches!(&word.units[..], [Unquoted(RawParam { param, .. })] => {
            assert_eq!(param.id, "x");
        });
    }

    #[test]
    fn word_stops_at_delimiter() {
        let mut lexer = Lexer::from_memory("foo;bar", Source::Unknown);
        let mut lexer = word_lexer(&mut lexer);
        let word = lexer.word(super::super::is_token_delimiter_char).unwrap();
        assert_eq!(word.to_string(), "foo");
        assert_eq!(lexer.peek_char(), Ok(Some(';')));
    }

    #[test]
    fn quoted_delimiter_does_not_delimit() {
        let word = parse_word("a';'b");
        assert_eq!(word.to_string(), "a';'b");
    }
}
