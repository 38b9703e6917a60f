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

//! Syntax parser for simple commands

use super::core::Parser;
use super::core::Rec;
use super::error::Error;
use super::error::Result;
use super::error::SyntaxError;
use super::lex::Operator;
use super::lex::TokenId;
use crate::syntax::Assign;
use crate::syntax::SimpleCommand;
use crate::syntax::Text;
use crate::syntax::TextUnit;
use crate::syntax::Value;
use crate::syntax::Word;
use crate::syntax::WordUnit::Unquoted;
use std::rc::Rc;

/// Tests whether the character can be part of a variable name.
fn is_name_char(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric()
}

/// Splits a word into an assignment, if it looks like one.
///
/// An assignment word has the form `name=value`, `name+=value`,
/// `name[index]=value` or `name[index]+=value`, where the name is a
/// non-empty sequence of unquoted name characters not starting with a digit.
/// If the word is not an assignment, it is returned intact in `Err`.
fn to_assign(word: Word) -> std::result::Result<Assign, Word> {
    // Parse the name
    let mut name = String::new();
    let mut consumed = 0;
    loop {
        match word.units.get(consumed) {
            Some(Unquoted(TextUnit::Literal('=' | '+' | '['))) => break,
            Some(Unquoted(TextUnit::Literal(c))) if is_name_char(*c) => {
                name.push(*c);
                consumed += 1;
            }
            _ => return Err(word),
        }
    }
    if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(word);
    }

    // Parse the optional index
    let mut index = None;
    if let Some(Unquoted(TextUnit::Literal('['))) = word.units.get(consumed) {
        let mut depth = 1;
        let mut inner = Vec::new();
        let mut i = consumed + 1;
        loop {
            match word.units.get(i) {
                Some(Unquoted(TextUnit::Literal('['))) => {
                    depth += 1;
                    inner.push(TextUnit::Literal('['));
                }
                Some(Unquoted(TextUnit::Literal(']'))) => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                    inner.push(TextUnit::Literal(']'));
                }
                Some(Unquoted(unit)) => inner.push(unit.clone()),
                // Quotations do not appear in a valid subscript.
                Some(_) | None => return Err(word),
            }
            i += 1;
        }
        index = Some(Text(inner));
        consumed = i + 1;
    }

    // Parse `=` or `+=`
    let append = match word.units.get(consumed) {
        Some(Unquoted(TextUnit::Literal('='))) => {
            consumed += 1;
            false
        }
        Some(Unquoted(TextUnit::Literal('+'))) => {
            if let Some(Unquoted(TextUnit::Literal('='))) = word.units.get(consumed + 1) {
                consumed += 2;
                true
            } else {
                return Err(word);
            }
        }
        _ => return Err(word),
    };

    let location = word.location.clone();
    let mut value = Word {
        units: word.units[consumed..].to_vec(),
        location: word.location,
    };
    // A tilde expansion may follow the `=` or a colon in the value.
    value.parse_tilde_front();
    Ok(Assign {
        name,
        index,
        value: Value::Scalar(value),
        append,
        location,
    })
}

impl Parser<'_, '_> {
    /// Parses the value words of an array assignment.
    ///
    /// The opening parenthesis token must have been consumed; its location
    /// is passed as `opening_location`.
    fn array_values(&mut self, opening_location: crate::source::Location) -> Result<Vec<Word>> {
        let mut words = Vec::new();
        loop {
            let token = self.take_token_auto(&[])?;
            match token.id {
                TokenId::Operator(Operator::CloseParen) => return Ok(words),
                TokenId::Operator(Operator::Newline) => {
                    self.here_doc_contents()?;
                }
                TokenId::Token(_) => words.push(token.word),
                TokenId::EndOfInput => {
                    return Err(Error {
                        cause: SyntaxError::UnclosedArrayValue { opening_location }.into(),
                        location: token.word.location,
                    })
                }
                TokenId::Operator(_) | TokenId::IoNumber(_) => {
                    return Err(Error {
                        cause: SyntaxError::UnclosedArrayValue { opening_location }.into(),
                        location: token.word.location,
                    })
                }
            }
        }
    }

    /// Parses a simple command.
    ///
    /// If there is no valid command at the current position, this function
    /// returns `Ok(Rec::Parsed(None))`.
    pub fn simple_command(&mut self) -> Result<Rec<Option<SimpleCommand>>> {
        let mut result = SimpleCommand {
            assigns: vec![],
            words: vec![],
            redirs: Rc::new(vec![]),
        };

        loop {
            // Before the first word, an assignment or redirection may appear.
            if let Some(redir) = self.redirection()? {
                Rc::make_mut(&mut result.redirs).push(redir);
                continue;
            }

            let is_command_name = result.words.is_empty();
            let token = match self.peek_token()?.id {
                TokenId::Token(_) => match self.take_token_manual(is_command_name)? {
                    Rec::AliasSubstituted => {
                        if result.is_empty() {
                            return Ok(Rec::AliasSubstituted);
                        }
                        continue;
                    }
                    Rec::Parsed(token) => token,
                },
                _ => break,
            };

            if result.words.is_empty() {
                match to_assign(token.word) {
                    Ok(mut assign) => {
                        // An opening parenthesis immediately following `=`
                        // begins an array value.
                        let is_array = matches!(&assign.value, Value::Scalar(w) if w.units.is_empty())
                            && !self.has_blank()?
                            && matches!(
                                self.peek_token()?.id,
                                TokenId::Operator(Operator::OpenParen)
                            );
                        if is_array {
                            let open = self.take_token_raw()?;
                            let words = self.array_values(open.word.location)?;
                            assign.value = Value::Array(words);
                        }
                        result.assigns.push(assign);
                    }
                    Err(word) => result.words.push(word),
                }
            } else {
                result.words.push(token.word);
            }
        }

        Ok(Rec::Parsed(if result.is_empty() {
            None
        } else {
            Some(result)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::super::lex::Lexer;
    use super::*;
    use crate::source::Source;
    use assert_matches::assert_matches;

    fn parse(source: &str) -> Option<SimpleCommand> {
        let mut lexer = Lexer::from_memory(source, Source::Unknown);
        let mut parser = Parser::new(&mut lexer);
        parser.simple_command().unwrap().unwrap()
    }

    #[test]
    fn words_only() {
        let command = parse("echo  hello world ;").unwrap();
        assert_eq!(command.assigns, []);
        assert_eq!(command.words.len(), 3);
        assert_eq!(command.to_string(), "echo hello world");
    }

    #[test]
    fn assignments_before_words() {
        let command = parse("a=1 b=2 env").unwrap();
        assert_eq!(command.assigns.len(), 2);
        assert_eq!(command.assigns[0].name, "a");
        assert_eq!(command.assigns[0].value.to_string(), "1");
        assert!(!command.assigns[0].append);
        assert_eq!(command.words.len(), 1);
    }

    #[test]
    fn assignment_after_word_is_a_word() {
        let command = parse("echo a=1").unwrap();
        assert_eq!(command.assigns, []);
        assert_eq!(command.words.len(), 2);
    }

    #[test]
    fn append_assignment() {
        let command = parse("a+=x").unwrap();
        assert!(command.assigns[0].append);
    }

    #[test]
    fn subscript_assignment() {
        let command = parse("a[2]=x").unwrap();
        let assign = &command.assigns[0];
        assert_eq!(assign.name, "a");
        assert_eq!(assign.index.as_ref().unwrap().to_string(), "2");
    }

    #[test]
    fn array_assignment() {
        let command = parse("a=(1 2 3)").unwrap();
        assert_matches!(&command.assigns[0].value, Value::Array(words) => {
            assert_eq!(words.len(), 3);
        });
    }

    #[test]
    fn empty_array_assignment() {
        let command = parse("a=()").unwrap();
        assert_matches!(&command.assigns[0].value, Value::Array(words) => {
            assert!(words.is_empty());
        });
    }

    #[test]
    fn array_needs_adjacent_paren() {
        // With a blank between `=` and `(`, the parenthesis is not an array.
        let command = parse("a= ").unwrap();
        assert_matches!(&command.assigns[0].value, Value::Scalar(word) => {
            assert!(word.units.is_empty());
        });
    }

    #[test]
    fn digit_name_is_not_assignment() {
        let command = parse("1=x").unwrap();
        assert_eq!(command.assigns, []);
        assert_eq!(command.words.len(), 1);
    }

    #[test]
    fn quoted_name_is_not_assignment() {
        let command = parse("'a'=x").unwrap();
        assert_eq!(command.assigns, []);
        assert_eq!(command.words.len(), 1);
    }

    #[test]
    fn redirections_intermixed() {
        let command = parse("<in echo >out x").unwrap();
        assert_eq!(command.redirs.len(), 2);
        assert_eq!(command.words.len(), 2);
    }

    #[test]
    fn empty_command() {
        let mut lexer = Lexer::from_memory(";", Source::Unknown);
        let mut parser = Parser::new(&mut lexer);
        let result = parser.simple_command().unwrap().unwrap();
        assert_eq!(result, None);
    }

    #[test]
    fn tilde_in_assignment_value() {
        let command = parse("dir=~user/x").unwrap();
        assert_matches!(&command.assigns[0].value, Value::Scalar(word) => {
            assert_matches!(&word.units[0], crate::syntax::WordUnit::Tilde(name) => {
                assert_eq!(name, "user");
            });
        });
    }
}
