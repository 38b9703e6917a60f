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

//! Part of the lexer that parses braced parameter expansions

use super::core::WordLexer;
use super::dollar::is_name_char;
use super::dollar::is_name_start_char;
use crate::parser::error::Error;
use crate::parser::error::Result;
use crate::parser::error::SyntaxError;
use crate::source::Location;
use crate::syntax::BracedParam;
use crate::syntax::Modifier;
use crate::syntax::Param;
use crate::syntax::SpecialParam;
use crate::syntax::Switch;
use crate::syntax::SwitchCondition;
use crate::syntax::SwitchType;
use crate::syntax::Text;
use crate::syntax::Trim;
use crate::syntax::TrimLength;
use crate::syntax::TrimSide;

impl WordLexer<'_, '_> {
    /// Parses the parameter name in a braced parameter expansion.
    fn param_id(&mut self) -> Result<Option<String>> {
        if let Some(name) = self.name()? {
            return Ok(Some(name));
        }

        match self.peek_char()? {
            Some(c) if c.is_ascii_digit() => {
                let mut id = String::new();
                while let Some(c) = self.consume_char_if(|c| c.is_ascii_digit())? {
                    id.push(c.value);
                }
                Ok(Some(id))
            }
            Some(c) if SpecialParam::from_char(c).is_some() => {
                self.consume_char();
                Ok(Some(c.to_string()))
            }
            _ => Ok(None),
        }
    }

    /// Parses an optional array subscript.
    fn subscript(&mut self) -> Result<Option<Text>> {
        if !self.skip_if(|c| c == '[')? {
            return Ok(None);
        }

        let index = self.text(|c| c == ']', |c| matches!(c, '$' | '`' | '\\' | ']'))?;

        if !self.skip_if(|c| c == ']')? {
            let cause = SyntaxError::UnclosedArrayIndex.into();
            let location = self.location()?;
            return Err(Error { cause, location });
        }

        Ok(Some(index))
    }

    /// Parses an optional modifier of a braced parameter expansion.
    fn modifier(&mut self) -> Result<Modifier> {
        match self.peek_char()? {
            Some(':') => {
                self.consume_char();
                let r#type = match self.peek_char()? {
                    Some('+') => SwitchType::Alter,
                    Some('-') => SwitchType::Default,
                    Some('=') => SwitchType::Assign,
                    Some('?') => SwitchType::Error,
                    _ => {
                        let cause = SyntaxError::InvalidModifier.into();
                        let location = self.location()?;
                        return Err(Error { cause, location });
                    }
                };
                self.consume_char();
                let word = self.braced_param_word()?;
                Ok(Modifier::Switch(Switch {
                    r#type,
                    condition: SwitchCondition::UnsetOrEmpty,
                    word,
                }))
            }
            Some(c @ ('+' | '-' | '=' | '?')) => {
                self.consume_char();
                let r#type = match c {
                    '+' => SwitchType::Alter,
                    '-' => SwitchType::Default,
                    '=' => SwitchType::Assign,
                    '?' => SwitchType::Error,
                    _ => unreachable!(),
                };
                let word = self.braced_param_word()?;
                Ok(Modifier::Switch(Switch {
                    r#type,
                    condition: SwitchCondition::Unset,
                    word,
                }))
            }
            Some(side @ ('#' | '%')) => {
                self.consume_char();
                let side = match side {
                    '#' => TrimSide::Prefix,
                    '%' => TrimSide::Suffix,
                    _ => unreachable!(),
                };
                let length = if self.skip_if(|c| c == side_char(side))? {
                    TrimLength::Longest
                } else {
                    TrimLength::Shortest
                };
                let pattern = self.braced_param_word()?;
                Ok(Modifier::Trim(Trim {
                    side,
                    length,
                    pattern,
                }))
            }
            _ => Ok(Modifier::None),
        }
    }

    /// Parses the word operand of a modifier, delimited by the closing brace.
    fn braced_param_word(&mut self) -> Result<crate::syntax::Word> {
        self.word(|c| c == '}')
    }

    /// Parses a braced parameter expansion.
    ///
    /// The `${` must have been consumed; `start_index` is the position of the
    /// `$` and `opening_location` its location.
    pub(super) fn braced_param(
        &mut self,
        start_index: usize,
        opening_location: Location,
    ) -> Result<BracedParam> {
        let has_length_prefix = match self.peek_char()? {
            Some('#') => {
                // `${#}` is the number of positional parameters; `${#x}` is
                // the length of `$x`. Tell them apart by looking one
                // character ahead.
                let index = self.index();
                self.consume_char();
                match self.peek_char()? {
                    Some('}') | None => {
                        self.rewind(index);
                        false
                    }
                    _ => true,
                }
            }
            _ => false,
        };

        let Some(id) = self.param_id()? else {
            let cause = SyntaxError::EmptyParam.into();
            let location = self.location()?;
            return Err(Error { cause, location });
        };

        let index = self.subscript()?;

        let modifier = if has_length_prefix {
            Modifier::Length
        } else {
            self.modifier()?
        };

        if !self.skip_if(|c| c == '}')? {
            let cause = SyntaxError::UnclosedParam { opening_location }.into();
            let location = self.location()?;
            return Err(Error { cause, location });
        }

        let location = self.location_range(start_index..self.index());
        Ok(BracedParam {
            param: Param::from_name(id),
            index,
            modifier,
            location,
        })
    }
}

fn side_char(side: TrimSide) -> char {
    match side {
        TrimSide::Prefix => '#',
        TrimSide::Suffix => '%',
    }
}

#[cfg(test)]
mod tests {
    use super::super::core::Lexer;
    use super::super::core::WordContext;
    use super::super::core::WordLexer;
    use super::*;
    use crate::source::Source;
    use crate::syntax::ParamType;
    use crate::syntax::TextUnit;
    use assert_matches::assert_matches;

    fn parse(source: &str) -> std::result::Result<BracedParam, Error> {
        let mut lexer = Lexer::from_memory(source, Source::Unknown);
        let mut lexer = WordLexer {
            lexer: &mut lexer,
            context: WordContext::Word,
        };
        match lexer.dollar_unit()? {
            Some(TextUnit::BracedParam(param)) => Ok(param),
            other => panic!("not a braced param: {other:?}"),
        }
    }

    #[test]
    fn plain_name() {
        let param = parse("${foo}").unwrap();
        assert_eq!(param.param.id, "foo");
        assert_eq!(param.modifier, Modifier::None);
        assert_eq!(param.index, None);
    }

    #[test]
    fn positional_and_special() {
        let param = parse("${12}").unwrap();
        assert_eq!(param.param.r#type, ParamType::Positional(12));

        let param = parse("${@}").unwrap();
        assert_eq!(param.param.r#type, ParamType::Special(SpecialParam::At));
    }

    #[test]
    fn length_prefix() {
        let param = parse("${#foo}").unwrap();
        assert_eq!(param.param.id, "foo");
        assert_eq!(param.modifier, Modifier::Length);

        // `${#}` is the special parameter, not a length expansion
        let param = parse("${#}").unwrap();
        assert_eq!(param.param.r#type, ParamType::Special(SpecialParam::Number));
        assert_eq!(param.modifier, Modifier::None);
    }

    #[test]
    fn switches() {
        let param = parse("${foo:-default}").unwrap();
        assert_matches!(param.modifier, Modifier::Switch(switch) => {
            assert_eq!(switch.r#type, SwitchType::Default);
            assert_eq!(switch.condition, SwitchCondition::UnsetOrEmpty);
            assert_eq!(switch.word.to_string(), "default");
        });

        let param = parse("${foo+set}").unwrap();
        assert_matches!(param.modifier, Modifier::Switch(switch) => {
            assert_eq!(switch.r#type, SwitchType::Alter);
            assert_eq!(switch.condition, SwitchCondition::Unset);
        });
    }

    #[test]
    fn trims() {
        let param = parse("${foo#pat}").unwrap();
        assert_matches!(param.modifier, Modifier::Trim(trim) => {
            assert_eq!(trim.side, TrimSide::Prefix);
            assert_eq!(trim.length, TrimLength::Shortest);
        });

        let param = parse("${foo%%pat}").unwrap();
        assert_matches!(param.modifier, Modifier::Trim(trim) => {
            assert_eq!(trim.side, TrimSide::Suffix);
            assert_eq!(trim.length, TrimLength::Longest);
        });
    }

    #[test]
    fn subscripts() {
        let param = parse("${a[2]}").unwrap();
        assert_eq!(param.index.unwrap().to_string(), "2");

        let param = parse("${a[$i]}").unwrap();
        assert_eq!(param.index.unwrap().to_string(), "$i");
    }

    #[test]
    fn nested_expansion_in_switch() {
        let param = parse("${a:-${b}}").unwrap();
        assert_matches!(param.modifier, Modifier::Switch(switch) => {
            assert_eq!(switch.word.to_string(), "${b}");
        });
    }

    #[test]
    fn errors() {
        assert_matches!(
            parse("${}").unwrap_err().cause,
            crate::parser::error::ErrorCause::Syntax(SyntaxError::EmptyParam)
        );
        assert_matches!(
            parse("${foo").unwrap_err().cause,
            crate::parser::error::ErrorCause::Syntax(SyntaxError::UnclosedParam { .. })
        );
    }
}
