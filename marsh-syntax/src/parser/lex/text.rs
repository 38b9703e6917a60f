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

//! Part of the lexer that parses [`Text`]s

use super::core::Lexer;
use super::core::WordContext;
use super::core::WordLexer;
use crate::parser::error::Error;
use crate::parser::error::Result;
use crate::parser::error::SyntaxError;
use crate::syntax::BackquoteUnit;
use crate::syntax::Text;
use crate::syntax::TextUnit;

impl WordLexer<'_, '_> {
    /// Parses a backquoted command substitution.
    ///
    /// The opening backquote must be the next character. Inside backquotes, a
    /// backslash retains its meaning only before `$`, `` ` ``, and `\`; when
    /// the backquote appears inside double quotes, `"` is also escapable.
    fn backquote(&mut self) -> Result<TextUnit> {
        let start = self.index();
        let opening_location = self.location()?;
        self.consume_char(); // the opening backquote

        let double_quote_escapable = match self.context {
            WordContext::Word => false,
            WordContext::Text => true,
        };

        let mut content = Vec::new();
        loop {
            match self.peek_char()? {
                Some('`') => {
                    self.consume_char();
                    break;
                }
                Some('\\') => {
                    self.consume_char();
                    match self.peek_char()? {
                        Some(c @ ('$' | '`' | '\\')) => {
                            self.consume_char();
                            content.push(BackquoteUnit::Backslashed(c));
                        }
                        Some('"') if double_quote_escapable => {
                            self.consume_char();
                            content.push(BackquoteUnit::Backslashed('"'));
                        }
                        _ => content.push(BackquoteUnit::Literal('\\')),
                    }
                }
                Some(c) => {
                    self.consume_char();
                    content.push(BackquoteUnit::Literal(c));
                }
                None => {
                    let cause = SyntaxError::UnclosedBackquote { opening_location }.into();
                    let location = self.location()?;
                    return Err(Error { cause, location });
                }
            }
        }

        let location = self.location_range(start..self.index());
        Ok(TextUnit::Backquote { content, location })
    }

    /// Parses a text unit.
    ///
    /// `is_delimiter` is a function that decides a character is a delimiter.
    /// An unquoted character is parsed only if `is_delimiter` returns false
    /// for it.
    ///
    /// `is_escapable` decides if a character can be escaped by a backslash.
    /// When `is_escapable` returns false, the backslash is treated as a
    /// literal character.
    pub fn text_unit<F, G>(
        &mut self,
        mut is_delimiter: F,
        mut is_escapable: G,
    ) -> Result<Option<TextUnit>>
    where
        F: FnMut(char) -> bool,
        G: FnMut(char) -> bool,
    {
        match self.peek_char()? {
            Some('\\') => {
                let index = self.index();
                self.consume_char();
                match self.peek_char()? {
                    Some(c) if is_escapable(c) => {
                        self.consume_char();
                        Ok(Some(TextUnit::Backslashed(c)))
                    }
                    _ => {
                        self.rewind(index);
                        self.consume_char();
                        Ok(Some(TextUnit::Literal('\\')))
                    }
                }
            }
            Some('$') => {
                if let Some(unit) = self.dollar_unit()? {
                    return Ok(Some(unit));
                }
                // A lone dollar is a literal.
                self.consume_char();
                Ok(Some(TextUnit::Literal('$')))
            }
            Some('`') => self.backquote().map(Some),
            Some(c) if is_delimiter(c) => Ok(None),
            Some(c) => {
                self.consume_char();
                Ok(Some(TextUnit::Literal(c)))
            }
            None => Ok(None),
        }
    }

    /// Parses a text, a sequence of text units.
    pub fn text<F, G>(&mut self, mut is_delimiter: F, mut is_escapable: G) -> Result<Text>
    where
        F: FnMut(char) -> bool,
        G: FnMut(char) -> bool,
    {
        let mut units = Vec::new();
        while let Some(unit) = self.text_unit(&mut is_delimiter, &mut is_escapable)? {
            units.push(unit);
        }
        Ok(Text(units))
    }
}

impl Lexer<'_> {
    /// Parses a text in the `Text` word context.
    ///
    /// This is a convenience function that wraps the lexer in a
    /// [`WordLexer`] with [`WordContext::Text`].
    pub fn text<F, G>(&mut self, is_delimiter: F, is_escapable: G) -> Result<Text>
    where
        F: FnMut(char) -> bool,
        G: FnMut(char) -> bool,
    {
        let mut lexer = WordLexer {
            lexer: self,
            context: WordContext::Text,
        };
        lexer.text(is_delimiter, is_escapable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Source;
    use crate::syntax::TextUnit::*;
    use assert_matches::assert_matches;

    fn word_lexer<'a, 'b>(lexer: &'a mut Lexer<'b>) -> WordLexer<'a, 'b> {
        WordLexer {
            lexer,
            context: WordContext::Word,
        }
    }

    #[test]
    fn text_literals_until_delimiter() {
        let mut lexer = Lexer::from_memory("ab:c", Source::Unknown);
        let mut lexer = word_lexer(&mut lexer);
        let text = lexer.text(|c| c == ':', |_| true).unwrap();
        assert_eq!(text.0, [Literal('a'), Literal('b')]);
        assert_eq!(lexer.peek_char(), Ok(Some(':')));
    }

    #[test]
    fn text_backslash_escapable() {
        let mut lexer = Lexer::from_memory(r"a\$b", Source::Unknown);
        let mut lexer = word_lexer(&mut lexer);
        let text = lexer.text(|_| false, |c| c == '$').unwrap();
        assert_eq!(text.0, [Literal('a'), Backslashed('$'), Literal('b')]);
    }

    #[test]
    fn text_backslash_not_escapable() {
        let mut lexer = Lexer::from_memory(r"\x", Source::Unknown);
        let mut lexer = word_lexer(&mut lexer);
        let text = lexer.text(|_| false, |c| c == '$').unwrap();
        assert_eq!(text.0, [Literal('\\'), Literal('x')]);
    }

    #[test]
    fn lone_dollar_is_literal() {
        let mut lexer = Lexer::from_memory("$", Source::Unknown);
        let mut lexer = word_lexer(&mut lexer);
        let text = lexer.text(|_| false, |_| true).unwrap();
        assert_eq!(text.0, [Literal('$')]);
    }

    #[test]
    fn backquote_simple() {
        let mut lexer = Lexer::from_memory("`echo`", Source::Unknown);
        let mut lexer = word_lexer(&mut lexer);
        let unit = lexer.text_unit(|_| false, |_| true).unwrap().unwrap();
        assert_matches!(unit, Backquote { content, .. } => {
            let expected: Vec<_> = "echo".chars().map(BackquoteUnit::Literal).collect();
            assert_eq!(content, expected);
        });
    }

    #[test]
    fn backquote_escapes_in_word_context() {
        let mut lexer = Lexer::from_memory(r#"`\$\`\\\"`"#, Source::Unknown);
        let mut lexer = word_lexer(&mut lexer);
        let unit = lexer.text_unit(|_| false, |_| true).unwrap().unwrap();
        assert_matches!(unit, Backquote { content, .. } => {
            assert_eq!(
                content,
                [
                    BackquoteUnit::Backslashed('$'),
                    BackquoteUnit::Backslashed('`'),
                    BackquoteUnit::Backslashed('\\'),
                    BackquoteUnit::Literal('\\'),
                    BackquoteUnit::Literal('"'),
                ]
            );
        });
    }

    #[test]
    fn backquote_escapes_in_text_context() {
        let mut lexer = Lexer::from_memory(r#"`\"`"#, Source::Unknown);
        let mut lexer = WordLexer {
            lexer: &mut lexer,
            context: WordContext::Text,
        };
        let unit = lexer.text_unit(|_| false, |_| true).unwrap().unwrap();
        assert_matches!(unit, Backquote { content, .. } => {
            assert_eq!(content, [BackquoteUnit::Backslashed('"')]);
        });
    }

    #[test]
    fn backquote_unclosed() {
        let mut lexer = Lexer::from_memory("`echo", Source::Unknown);
        let mut lexer = word_lexer(&mut lexer);
        let error = lexer.text_unit(|_| false, |_| true).unwrap_err();
        assert_matches!(
            error.cause,
            crate::parser::error::ErrorCause::Syntax(SyntaxError::UnclosedBackquote { .. })
        );
    }
}
