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

//! Fundamental building blocks for the lexical analyzer

use super::keyword::Keyword;
pub use super::op::Operator;
use crate::alias::Alias;
use crate::input::Context;
use crate::input::Input;
use crate::input::Memory;
use crate::parser::error::Error;
use crate::parser::error::Result;
use crate::source::source_chars;
use crate::source::Code;
use crate::source::Location;
use crate::source::Source;
use crate::source::SourceChar;
use crate::syntax::Word;
use std::cell::RefCell;
use std::fmt;
use std::num::NonZeroU64;
use std::ops::Range;
use std::rc::Rc;

/// Returns true if the character is a blank character.
pub fn is_blank(c: char) -> bool {
    c != '\n' && c.is_whitespace()
}

/// Token identifier, or classification of tokens
///
/// This enum classifies a token as defined in POSIX XCU 2.10.1 Shell Grammar
/// Lexical Conventions, but does not exactly reflect further distinction
/// defined in POSIX XCU 2.10.2 Shell Grammar Rules.
///
/// For convenience, the special token identifier `EndOfInput` is included.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TokenId {
    /// `TOKEN`
    ///
    /// If this token _looks like_ a reserved word, this variant has some
    /// associated `Keyword` that describes the word. However, it depends on
    /// context whether a token is actually regarded as a reserved word or
    /// just as an ordinary word. You must ensure that you're in an applicable
    /// context when examining the `Keyword` value.
    Token(Option<Keyword>),
    /// Operator
    Operator(Operator),
    /// `IO_NUMBER`
    IoNumber(crate::syntax::Fd),
    /// Imaginary token identifier for the end of input
    EndOfInput,
}

/// Result of lexical analysis produced by the [`Lexer`]
#[derive(Debug)]
pub struct Token {
    /// Content of the token
    ///
    /// The word value always contains at least one unit, regardless of
    /// whether the token is an operator.
    pub word: Word,
    /// Token identifier
    pub id: TokenId,
    /// Position of the first character of the word in the lexer's buffer
    pub index: usize,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.word)
    }
}

/// State of the input function in a lexer
#[derive(Clone, Debug)]
enum InputState {
    Alive,
    EndOfInput(Location),
    Error(Error),
}

/// Lexical analyzer
///
/// A lexer reads lines using an input function and parses the characters into
/// tokens. It has an internal buffer containing the characters that have been
/// read and the position (or the index) of the character that is to be parsed
/// next.
///
/// `Lexer` has primitive functions such as [`peek_char`](Lexer::peek_char)
/// that provide access to the character at the current position. Derived
/// functions such as
/// [`skip_blanks_and_comment`](Lexer::skip_blanks_and_comment) depend on
/// those primitives to parse more complex structures in the source code.
pub struct Lexer<'a> {
    input: Box<dyn Input + 'a>,
    state: InputState,
    code: Rc<Code>,
    /// Number of characters stored in `code` so far
    code_len: usize,
    source: Vec<SourceChar>,
    index: usize,
    line_continuation_enabled: bool,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer that reads using the given input function.
    #[must_use]
    pub fn new(
        input: Box<dyn Input + 'a>,
        start_line_number: NonZeroU64,
        source: Rc<Source>,
    ) -> Lexer<'a> {
        let code = Rc::new(Code {
            value: RefCell::new(String::new()),
            start_line_number,
            source,
        });
        Lexer {
            input,
            state: InputState::Alive,
            code,
            code_len: 0,
            source: Vec::new(),
            index: 0,
            line_continuation_enabled: true,
        }
    }

    /// Creates a new lexer with a fixed source code.
    #[must_use]
    pub fn from_memory<S: Into<Source>>(code: &'a str, source: S) -> Lexer<'a> {
        fn inner<'a>(code: &'a str, source: Source) -> Lexer<'a> {
            Lexer::new(
                Box::new(Memory::new(code)),
                NonZeroU64::new(1).unwrap(),
                Rc::new(source),
            )
        }
        inner(code, source.into())
    }

    /// Reads the next line from the input unless the state is final.
    fn read_line(&mut self) {
        debug_assert!(matches!(self.state, InputState::Alive));
        // The line starts a new command if the previous line has been fully
        // consumed; otherwise it continues one, which an interactive input
        // function indicates with the secondary prompt.
        let is_first_line = self.index >= self.source.len()
            && self.source.last().map_or(true, |c| c.value == '\n');
        let context = Context { is_first_line };
        match self.input.next_line(&context) {
            Ok(line) => {
                if line.is_empty() {
                    let location = Location {
                        code: Rc::clone(&self.code),
                        range: self.code_len..self.code_len,
                    };
                    self.state = InputState::EndOfInput(location);
                } else {
                    self.code.value.borrow_mut().push_str(&line);
                    let offset = self.code_len;
                    self.source
                        .extend(source_chars(&line, &self.code, offset));
                    self.code_len += line.chars().count();
                }
            }
            Err(io_error) => {
                let location = Location {
                    code: Rc::clone(&self.code),
                    range: self.code_len..self.code_len,
                };
                self.state = InputState::Error(Error {
                    cause: io_error.into(),
                    location,
                });
            }
        }
    }

    /// Ensures that the character at the current index is available.
    ///
    /// Returns false if the end of input has been reached. Line
    /// continuations are skipped transparently if enabled.
    fn fill(&mut self) -> Result<bool> {
        loop {
            while self.index >= self.source.len() {
                match &self.state {
                    InputState::Alive => self.read_line(),
                    InputState::EndOfInput(_) => return Ok(false),
                    InputState::Error(error) => return Err(error.clone()),
                }
            }

            if self.line_continuation_enabled && self.source[self.index].value == '\\' {
                // A backslash-newline pair is removed silently.
                while self.index + 1 >= self.source.len() {
                    match &self.state {
                        InputState::Alive => self.read_line(),
                        InputState::EndOfInput(_) => return Ok(true),
                        InputState::Error(error) => return Err(error.clone()),
                    }
                }
                if self.source[self.index + 1].value == '\n' {
                    self.index += 2;
                    continue;
                }
            }

            return Ok(true);
        }
    }

    /// Peeks the next character.
    ///
    /// If the end of input is reached, `Ok(None)` is returned. On error,
    /// `Err(_)` is returned.
    pub fn peek_char(&mut self) -> Result<Option<char>> {
        Ok(if self.fill()? {
            Some(self.source[self.index].value)
        } else {
            None
        })
    }

    /// Returns the location of the next character.
    ///
    /// If there is no more character (that is, it is the end of input), an
    /// imaginary location is returned that would be returned if a character
    /// existed.
    pub fn location(&mut self) -> Result<Location> {
        if self.fill()? {
            Ok(self.source[self.index].location.clone())
        } else {
            match &self.state {
                InputState::EndOfInput(location) => Ok(location.clone()),
                _ => unreachable!("fill returned false in a non-final state"),
            }
        }
    }

    /// Consumes the next character.
    ///
    /// This function must be called after [`peek_char`](Lexer::peek_char) has
    /// successfully returned the character. Consuming a character that has
    /// not yet been peeked would result in a panic!
    pub fn consume_char(&mut self) {
        assert!(
            self.index < self.source.len(),
            "A character must have been peeked before being consumed: index={}",
            self.index
        );
        self.index += 1;
    }

    /// Returns the position of the next character, counted from zero.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Moves the current position back to the given index so that characters
    /// that have been consumed can be read again.
    ///
    /// The given index must not be larger than the [current
    /// index](Lexer::index), or this function would panic.
    pub fn rewind(&mut self, index: usize) {
        assert!(
            index <= self.index,
            "The new index {} must not be larger than the current index {}",
            index,
            self.index
        );
        self.index = index;
    }

    /// Peeks the next character and, if the given decider function returns
    /// true for it, advances the position.
    ///
    /// Returns the consumed character if the function returned true. Returns
    /// `Ok(None)` if it returned false or there is no more character.
    pub fn consume_char_if<F>(&mut self, f: F) -> Result<Option<&SourceChar>>
    where
        F: FnOnce(char) -> bool,
    {
        match self.peek_char()? {
            Some(c) if f(c) => {
                let index = self.index;
                self.consume_char();
                Ok(Some(&self.source[index]))
            }
            _ => Ok(None),
        }
    }

    /// Like [`consume_char_if`](Lexer::consume_char_if), but only returns a
    /// boolean that tells whether the character was consumed.
    pub fn skip_if<F>(&mut self, f: F) -> Result<bool>
    where
        F: FnOnce(char) -> bool,
    {
        Ok(self.consume_char_if(f)?.is_some())
    }

    /// Disables line continuation recognition.
    ///
    /// Single-quoted strings and here-document contents with a quoted
    /// delimiter treat a backslash-newline pair literally.
    pub fn disable_line_continuation(&mut self) {
        self.line_continuation_enabled = false;
    }

    /// Re-enables line continuation recognition.
    pub fn enable_line_continuation(&mut self) {
        self.line_continuation_enabled = true;
    }

    /// Returns the string value of the characters in the given index range.
    #[must_use]
    pub fn source_string(&self, range: Range<usize>) -> String {
        self.source[range].iter().map(|c| c.value).collect()
    }

    /// Computes the location that covers the characters in the given index
    /// range.
    ///
    /// If the range spans characters from different code blocks (e.g.,
    /// across an alias substitution), the result covers only the leading
    /// characters that share the first character's code block.
    #[must_use]
    pub fn location_range(&self, range: Range<usize>) -> Location {
        let Some(first) = self.source.get(range.start) else {
            // Empty or out-of-bounds range at the end of input
            return match &self.state {
                InputState::EndOfInput(location) => location.clone(),
                _ => Location {
                    code: Rc::clone(&self.code),
                    range: self.code_len..self.code_len,
                },
            };
        };

        let mut location = first.location.clone();
        let end = range.end.min(self.source.len()).max(range.start + 1);
        for c in &self.source[range.start + 1..end] {
            if c.location.code == location.code {
                location.range.end = c.location.range.end;
            } else {
                break;
            }
        }
        location
    }

    /// Performs alias substitution right before the current position.
    ///
    /// This function must be called just after a word token has been parsed
    /// that matches the name of the argument alias. The characters starting
    /// from the `begin` index up to the current position are silently
    /// replaced with the alias value.
    ///
    /// The resulting part of the buffer will be characters with a
    /// [`Source::Alias`] origin.
    ///
    /// After the substitution, the position will be set before the replaced
    /// string.
    ///
    /// # Panics
    ///
    /// If the replaced part is empty, i.e., `begin >= self.index()`.
    pub fn substitute_alias(&mut self, begin: usize, alias: &Rc<Alias>) {
        let end = self.index;
        if begin >= end {
            panic!("Lexer::substitute_alias: begin={}, end={}", begin, end);
        }

        let original = self.source[begin].location.clone();
        let code = Rc::new(Code {
            value: RefCell::new(alias.replacement.clone()),
            start_line_number: NonZeroU64::new(1).unwrap(),
            source: Rc::new(Source::Alias {
                original,
                alias: Rc::clone(alias),
            }),
        });
        let repl: Vec<SourceChar> = source_chars(&alias.replacement, &code, 0).collect();

        self.source.splice(begin..end, repl);
        self.index = begin;
    }

    /// Tests if the given index is after the replacement string of alias
    /// substitution that ends with a blank.
    ///
    /// # Panics
    ///
    /// If `index` is larger than the currently read index.
    #[must_use]
    pub fn is_after_blank_ending_alias(&self, index: usize) -> bool {
        fn ends_with_blank(s: &str) -> bool {
            s.chars().next_back().is_some_and(is_blank)
        }
        fn is_same_alias(alias: &Alias, c: Option<&SourceChar>) -> bool {
            match c {
                None => false,
                Some(c) => c.location.code.source.is_alias_for(&alias.name),
            }
        }

        for index in (0..index).rev() {
            let c = &self.source[index];

            if !is_blank(c.value) {
                return false;
            }

            if let Source::Alias { ref alias, .. } = *c.location.code.source {
                #[allow(clippy::collapsible_if)]
                if ends_with_blank(&alias.replacement) {
                    if !is_same_alias(alias, self.source.get(index + 1)) {
                        return true;
                    }
                }
            }
        }

        false
    }

    /// Parses an optional compound list that is the content of a command
    /// substitution.
    ///
    /// This function consumes characters until a token that cannot be the
    /// beginning of an and-or list is found and returns the string that was
    /// consumed.
    pub fn inner_program(&mut self) -> Result<String> {
        let begin = self.index;

        let mut parser = crate::parser::Parser::new(self);
        parser.maybe_compound_list()?;

        let end = parser.peek_token()?.index;
        self.rewind(end);
        Ok(self.source_string(begin..end))
    }
}

impl fmt::Debug for Lexer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> std::result::Result<(), fmt::Error> {
        f.debug_struct("Lexer")
            .field("index", &self.index)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// Lexer with a state for parsing a word
///
/// This struct implements the word parsing functions for the lexer. The
/// `context` affects which quotations are recognized: single quotes are
/// literal inside double quotes, for example.
#[derive(Debug)]
pub struct WordLexer<'a, 'b> {
    pub lexer: &'a mut Lexer<'b>,
    pub context: WordContext,
}

impl<'b> std::ops::Deref for WordLexer<'_, 'b> {
    type Target = Lexer<'b>;
    fn deref(&self) -> &Lexer<'b> {
        self.lexer
    }
}

impl std::ops::DerefMut for WordLexer<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.lexer
    }
}

/// Context in which a word is parsed
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WordContext {
    /// Words in a normal command position
    Word,
    /// Text units inside double quotes or here-document contents
    Text,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexer_with_empty_source() {
        let mut lexer = Lexer::from_memory("", Source::Unknown);
        assert_eq!(lexer.peek_char(), Ok(None));
    }

    #[test]
    fn lexer_with_multiline_source() {
        let mut lexer = Lexer::from_memory("foo\nbar\n", Source::Unknown);

        for c in "foo\nbar\n".chars() {
            assert_eq!(lexer.peek_char(), Ok(Some(c)));
            lexer.consume_char();
        }
        assert_eq!(lexer.peek_char(), Ok(None));
        assert_eq!(lexer.peek_char(), Ok(None));
        assert_eq!(*lexer.code.value.borrow(), "foo\nbar\n");
    }

    #[test]
    fn lexer_locations() {
        let mut lexer = Lexer::from_memory("ab\ncd", Source::Unknown);
        let location = lexer.location().unwrap();
        assert_eq!(location.range, 0..1);
        assert_eq!(location.code.line_number(0).get(), 1);
        lexer.consume_char();
        lexer.consume_char();
        lexer.consume_char();
        let location = lexer.location().unwrap();
        assert_eq!(location.range, 3..4);
        assert_eq!(location.code.line_number(3).get(), 2);
    }

    #[test]
    fn lexer_eof_location() {
        let mut lexer = Lexer::from_memory("a", Source::Unknown);
        lexer.peek_char().unwrap();
        lexer.consume_char();
        assert_eq!(lexer.peek_char(), Ok(None));
        let location = lexer.location().unwrap();
        assert_eq!(location.range, 1..1);
    }

    #[test]
    #[should_panic(expected = "A character must have been peeked before being consumed: index=0")]
    fn lexer_consume_char_without_peeking() {
        let mut lexer = Lexer::from_memory("abc", Source::Unknown);
        lexer.consume_char();
    }

    #[test]
    fn lexer_consume_char_if() {
        let mut lexer = Lexer::from_memory("word\n", Source::Unknown);

        let c = lexer.consume_char_if(|c| c == 'w').unwrap().unwrap();
        assert_eq!(c.value, 'w');
        assert_eq!(lexer.consume_char_if(|c| c == 'x').unwrap(), None);
        assert_eq!(lexer.index(), 1);
    }

    #[test]
    fn lexer_rewind() {
        let mut lexer = Lexer::from_memory("abc", Source::Unknown);
        let _ = lexer.peek_char();
        lexer.consume_char();
        let _ = lexer.peek_char();
        lexer.consume_char();
        lexer.rewind(0);
        assert_eq!(lexer.peek_char(), Ok(Some('a')));
    }

    #[test]
    fn lexer_line_continuation() {
        let mut lexer = Lexer::from_memory("a\\\nb", Source::Unknown);
        assert_eq!(lexer.peek_char(), Ok(Some('a')));
        lexer.consume_char();
        assert_eq!(lexer.peek_char(), Ok(Some('b')));
    }

    #[test]
    fn lexer_line_continuations_in_a_row() {
        let mut lexer = Lexer::from_memory("\\\n\\\n\\\nx", Source::Unknown);
        assert_eq!(lexer.peek_char(), Ok(Some('x')));
    }

    #[test]
    fn lexer_line_continuation_disabled() {
        let mut lexer = Lexer::from_memory("\\\nx", Source::Unknown);
        lexer.disable_line_continuation();
        assert_eq!(lexer.peek_char(), Ok(Some('\\')));
        lexer.enable_line_continuation();
        assert_eq!(lexer.peek_char(), Ok(Some('x')));
    }

    #[test]
    fn lexer_substitute_alias() {
        let mut lexer = Lexer::from_memory("a b", Source::Unknown);
        let alias = Rc::new(Alias {
            name: "a".to_string(),
            replacement: "lex".to_string(),
            global: false,
            origin: Location::dummy("dummy"),
        });

        let _ = lexer.peek_char();
        lexer.consume_char();

        lexer.substitute_alias(0, &alias);

        for c in "lex b".chars() {
            assert_eq!(lexer.peek_char(), Ok(Some(c)), "char {c:?}");
            lexer.consume_char();
        }
        assert_eq!(lexer.peek_char(), Ok(None));
    }

    #[test]
    fn lexer_substitute_alias_location_provenance() {
        let mut lexer = Lexer::from_memory("a b", Source::Unknown);
        let alias = Rc::new(Alias {
            name: "a".to_string(),
            replacement: "x".to_string(),
            global: false,
            origin: Location::dummy("dummy"),
        });

        let _ = lexer.peek_char();
        lexer.consume_char();
        lexer.substitute_alias(0, &alias);

        let location = lexer.location().unwrap();
        assert!(location.code.source.is_alias_for("a"));
    }

    #[test]
    fn lexer_is_after_blank_ending_alias() {
        let mut lexer = Lexer::from_memory("a x", Source::Unknown);
        let alias = Rc::new(Alias {
            name: "a".to_string(),
            replacement: " b ".to_string(),
            global: false,
            origin: Location::dummy("dummy"),
        });

        lexer.peek_char().unwrap();
        lexer.consume_char();
        lexer.substitute_alias(0, &alias);

        assert_eq!(lexer.is_after_blank_ending_alias(0), false);
        assert_eq!(lexer.is_after_blank_ending_alias(1), false);
        assert_eq!(lexer.is_after_blank_ending_alias(2), false);
        assert_eq!(lexer.is_after_blank_ending_alias(3), true);
        assert_eq!(lexer.is_after_blank_ending_alias(4), true);
    }

    #[test]
    fn lexer_inner_program_success() {
        let mut lexer = Lexer::from_memory("x y )", Source::Unknown);
        let source = lexer.inner_program().unwrap();
        assert_eq!(source, "x y ");
    }
}
