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

//! Part of the lexer that parses dollar expansions

use super::core::WordLexer;
use crate::parser::error::Error;
use crate::parser::error::Result;
use crate::parser::error::SyntaxError;
use crate::syntax::Param;
use crate::syntax::SpecialParam;
use crate::syntax::TextUnit;
use std::rc::Rc;

/// Tests whether the character can start a variable name.
pub fn is_name_start_char(c: char) -> bool {
    c == '_' || c.is_ascii_alphabetic()
}

/// Tests whether the character can appear in a variable name.
pub fn is_name_char(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric()
}

impl WordLexer<'_, '_> {
    /// Parses a variable name.
    ///
    /// The current position must be at the first character of the name.
    /// Returns `None` if the current character cannot start a name.
    pub(super) fn name(&mut self) -> Result<Option<String>> {
        match self.peek_char()? {
            Some(c) if is_name_start_char(c) => (),
            _ => return Ok(None),
        }

        let mut name = String::new();
        while let Some(c) = self.consume_char_if(is_name_char)? {
            name.push(c.value);
        }
        Ok(Some(name))
    }

    /// Parses an expansion that starts with `$`.
    ///
    /// The current position must be at the `$`. If the dollar is not
    /// followed by an expansion form, the position is left at the dollar and
    /// `None` is returned.
    pub fn dollar_unit(&mut self) -> Result<Option<TextUnit>> {
        let index = self.index();
        let location = self.location()?;
        debug_assert_eq!(self.peek_char()?, Some('$'));
        self.consume_char();

        match self.peek_char()? {
            Some('{') => {
                self.consume_char();
                let param = self.braced_param(index, location)?;
                Ok(Some(TextUnit::BracedParam(param)))
            }
            Some('(') => {
                self.consume_char();
                if self.peek_char()? == Some('(') {
                    if let Some(unit) = self.arithmetic_expansion(index)? {
                        return Ok(Some(unit));
                    }
                }
                self.command_substitution(index, location).map(Some)
            }
            Some(c) if is_name_start_char(c) => {
                let mut id = String::new();
                while let Some(c) = self.consume_char_if(is_name_char)? {
                    id.push(c.value);
                }
                let location = self.location_range(index..self.index());
                Ok(Some(TextUnit::RawParam {
                    param: Param::from_name(id),
                    location,
                }))
            }
            Some(c) if c.is_ascii_digit() => {
                // Unbraced positional parameters are a single digit long.
                self.consume_char();
                let location = self.location_range(index..self.index());
                Ok(Some(TextUnit::RawParam {
                    param: Param::from_name(c.to_string()),
                    location,
                }))
            }
            Some(c) if SpecialParam::from_char(c).is_some() => {
                self.consume_char();
                let location = self.location_range(index..self.index());
                Ok(Some(TextUnit::RawParam {
                    param: Param::from_name(c.to_string()),
                    location,
                }))
            }
            _ => {
                self.rewind(index);
                Ok(None)
            }
        }
    }

    /// Parses a command substitution that starts with `$(`.
    ///
    /// The `$(` must have been consumed; `index` is the position of the `$`.
    fn command_substitution(
        &mut self,
        index: usize,
        opening_location: crate::source::Location,
    ) -> Result<TextUnit> {
        let content = self.inner_program()?;

        if !self.skip_if(|c| c == ')')? {
            let cause = SyntaxError::UnclosedCommandSubstitution { opening_location }.into();
            let location = self.location()?;
            return Err(Error { cause, location });
        }

        let location = self.location_range(index..self.index());
        Ok(TextUnit::CommandSubst {
            content: Rc::from(content),
            location,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::core::Lexer;
    use super::super::core::WordContext;
    use crate::source::Source;
    use crate::syntax::ParamType;
    use assert_matches::assert_matches;

    fn dollar(source: &str) -> Option<TextUnit> {
        let mut lexer = Lexer::from_memory(source, Source::Unknown);
        let mut lexer = WordLexer {
            lexer: &mut lexer,
            context: WordContext::Word,
        };
        lexer.dollar_unit().unwrap()
    }

    #[test]
    fn raw_param_name() {
        assert_matches!(dollar("$foo"), Some(TextUnit::RawParam { param, .. }) => {
            assert_eq!(param.id, "foo");
            assert_eq!(param.r#type, ParamType::Variable);
        });
    }

    #[test]
    fn raw_param_special() {
        assert_matches!(dollar("$?"), Some(TextUnit::RawParam { param, .. }) => {
            assert_eq!(param.r#type, ParamType::Special(SpecialParam::Question));
        });
        assert_matches!(dollar("$#"), Some(TextUnit::RawParam { param, .. }) => {
            assert_eq!(param.r#type, ParamType::Special(SpecialParam::Number));
        });
    }

    #[test]
    fn raw_param_positional_single_digit() {
        let mut lexer = Lexer::from_memory("$10", Source::Unknown);
        let mut lexer = WordLexer {
            lexer: &mut lexer,
            context: WordContext::Word,
        };
        let unit = lexer.dollar_unit().unwrap().unwrap();
        assert_matches!(unit, TextUnit::RawParam { param, .. } => {
            assert_eq!(param.r#type, ParamType::Positional(1));
        });
        assert_eq!(lexer.peek_char(), Ok(Some('0')));
    }

    #[test]
    fn lone_dollar_rewinds() {
        let mut lexer = Lexer::from_memory("$ x", Source::Unknown);
        let mut lexer = WordLexer {
            lexer: &mut lexer,
            context: WordContext::Word,
        };
        assert_eq!(lexer.dollar_unit().unwrap(), None);
        assert_eq!(lexer.peek_char(), Ok(Some('$')));
    }

    #[test]
    fn command_substitution() {
        assert_matches!(dollar("$(echo hi)"), Some(TextUnit::CommandSubst { content, .. }) => {
            assert_eq!(&*content, "echo hi");
        });
        assert_matches!(dollar("$()"), Some(TextUnit::CommandSubst { content, .. }) => {
            assert_eq!(&*content, "");
        });
    }

    #[test]
    fn command_substitution_unclosed() {
        let mut lexer = Lexer::from_memory("$(echo", Source::Unknown);
        let mut lexer = WordLexer {
            lexer: &mut lexer,
            context: WordContext::Word,
        };
        let error = lexer.dollar_unit().unwrap_err();
        assert_matches!(
            error.cause,
            crate::parser::error::ErrorCause::Syntax(
                SyntaxError::UnclosedCommandSubstitution { .. }
            )
        );
    }

    #[test]
    fn command_substitution_with_nested_parens() {
        assert_matches!(dollar("$((echo); (echo))"), Some(TextUnit::CommandSubst { content, .. }) => {
            assert_eq!(&*content, "(echo); (echo)");
        });
    }

    #[test]
    fn arithmetic_expansion() {
        assert_matches!(dollar("$((1 + 2))"), Some(TextUnit::Arith { content, .. }) => {
            assert_eq!(content.to_string(), "1 + 2");
        });
    }
}
