// This file is part of marsh, an extended POSIX shell.
// Copyright (C) 2024 WATANABE Yuki

//! This crate provides pattern matching based on a POSIX globbing pattern.
//!
//! This implementation supports the following syntax in patterns:
//!
//! - Any single character (`?`)
//! - Any character sequence (`*`)
//! - Bracket expression (`[...]`)
//!     - Character literals
//!     - Character ranges (e.g. `a-z`)
//!     - Complement (`[!...]` or `[^...]`)
//!     - Character classes (`[:alpha:]`)
//!
//! Patterns are compiled into an anchored regular expression and matched with
//! the `regex` crate. Locale-specific collation is not supported; character
//! classes match ASCII characters only.
//!
//! A pattern is parsed from an iterator of [`PatternChar`]s, which
//! distinguishes ordinary characters from quoted characters that must match
//! literally. Use [`without_escape`] when the pattern string contains no
//! quoting, or [`with_escape`] to make backslashes escape the next character.
//!
//! ```
//! # use marsh_fnmatch::{Pattern, without_escape};
//! let p = Pattern::parse(without_escape("fo*r")).unwrap();
//! assert!(p.is_match("four"));
//! assert!(!p.is_match("foul"));
//! ```

use regex::Regex;
use thiserror::Error;

/// Character appearing in a pattern
///
/// `Normal` characters have their special meaning (if any) when the pattern is
/// parsed. `Literal` characters always match themselves; the shell produces
/// them from quoted parts of a word.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PatternChar {
    /// Character that may have a special meaning
    Normal(char),
    /// Character that matches itself
    Literal(char),
}

impl PatternChar {
    /// Returns the character value, ignoring the distinction.
    #[must_use]
    pub fn char_value(self) -> char {
        match self {
            PatternChar::Normal(c) | PatternChar::Literal(c) => c,
        }
    }
}

/// Converts a string to an iterator of pattern characters, with no escapes.
pub fn without_escape(pattern: &str) -> impl Iterator<Item = PatternChar> + Clone + '_ {
    pattern.chars().map(PatternChar::Normal)
}

/// Converts a string to an iterator of pattern characters where a backslash
/// makes the next character literal.
pub fn with_escape(pattern: &str) -> impl Iterator<Item = PatternChar> + Clone + '_ {
    let mut chars = pattern.chars();
    std::iter::from_fn(move || match chars.next()? {
        '\\' => match chars.next() {
            Some(c) => Some(PatternChar::Literal(c)),
            None => Some(PatternChar::Normal('\\')),
        },
        c => Some(PatternChar::Normal(c)),
    })
}

/// Error parsing or compiling a pattern
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum Error {
    /// The compiled regular expression was rejected by the regex engine.
    #[error("cannot compile pattern: {0}")]
    Compile(String),
}

/// Compiled glob pattern
#[derive(Clone, Debug)]
pub struct Pattern {
    body: Body,
}

#[derive(Clone, Debug)]
enum Body {
    /// Pattern with no special characters, compared by string equality
    Literal(String),
    /// Pattern compiled to an anchored regular expression
    Regex(Regex),
}

/// Appends a regex fragment matching the single character literally.
fn push_literal(regex: &mut String, c: char) {
    if regex_syntax_special(c) {
        regex.push('\\');
    }
    regex.push(c);
}

fn regex_syntax_special(c: char) -> bool {
    matches!(
        c,
        '\\' | '.' | '+' | '*' | '?' | '(' | ')' | '|' | '[' | ']' | '{' | '}' | '^' | '$' | '#'
            | '&' | '-' | '~'
    )
}

/// Parses a bracket expression.
///
/// `chars` must be positioned just after the opening `[`. On success, the
/// regex fragment for the whole bracket expression is appended to `regex` and
/// the updated iterator is returned. If the bracket expression is not closed,
/// `None` is returned and the caller treats the `[` as a literal character.
fn parse_bracket<I>(mut chars: I, regex: &mut String) -> Option<I>
where
    I: Iterator<Item = PatternChar> + Clone,
{
    let mut inner = String::new();
    let mut first = true;

    // complement marker
    let mut rest = chars.clone();
    if let Some(PatternChar::Normal('!' | '^')) = rest.next() {
        inner.push('^');
        chars = rest;
    }

    loop {
        let mut rest = chars.clone();
        match rest.next()? {
            PatternChar::Normal(']') if !first => {
                regex.push('[');
                regex.push_str(&inner);
                regex.push(']');
                return Some(rest);
            }
            PatternChar::Normal('[') => {
                // possible character class like [:alpha:]
                let mut rest2 = rest.clone();
                match rest2.next() {
                    Some(PatternChar::Normal(kind @ (':' | '.' | '='))) => {
                        let mut name = String::new();
                        loop {
                            match rest2.next()? {
                                PatternChar::Normal(c) if c == kind => {
                                    match rest2.next()? {
                                        PatternChar::Normal(']') => break,
                                        _ => return None,
                                    }
                                }
                                pc => name.push(pc.char_value()),
                            }
                        }
                        if kind == ':' {
                            inner.push_str("[:");
                            inner.push_str(&name);
                            inner.push_str(":]");
                        } else {
                            // collating symbols and equivalence classes match
                            // their own character sequence
                            for c in name.chars() {
                                push_class_literal(&mut inner, c);
                            }
                        }
                        chars = rest2;
                    }
                    _ => {
                        push_class_literal(&mut inner, '[');
                        chars = rest;
                    }
                }
            }
            PatternChar::Normal('-') if !first => {
                // Keep the range operator as-is unless it is the last
                // character before the closing bracket.
                let mut rest2 = rest.clone();
                match rest2.next()? {
                    PatternChar::Normal(']') => {
                        push_class_literal(&mut inner, '-');
                    }
                    _ => inner.push('-'),
                }
                chars = rest;
            }
            pc => {
                push_class_literal(&mut inner, pc.char_value());
                chars = rest;
            }
        }
        first = false;
    }
}

fn push_class_literal(class: &mut String, c: char) {
    if matches!(c, '\\' | ']' | '[' | '^' | '-' | '&' | '~') {
        class.push('\\');
    }
    class.push(c);
}

impl Pattern {
    /// Parses a pattern.
    ///
    /// The resulting pattern matches whole strings; use the dedicated methods
    /// for prefix and suffix matching.
    pub fn parse<I>(chars: I) -> Result<Self, Error>
    where
        I: Iterator<Item = PatternChar> + Clone,
    {
        let mut regex = String::from("\\A(?s:");
        let mut literal = Some(String::new());
        let mut chars = chars;

        while let Some(pc) = chars.next() {
            match pc {
                PatternChar::Normal('?') => {
                    literal = None;
                    regex.push('.');
                }
                PatternChar::Normal('*') => {
                    literal = None;
                    regex.push_str(".*");
                }
                PatternChar::Normal('[') => {
                    let mut fragment = String::new();
                    if let Some(rest) = parse_bracket(chars.clone(), &mut fragment) {
                        literal = None;
                        regex.push_str(&fragment);
                        chars = rest;
                    } else {
                        if let Some(literal) = &mut literal {
                            literal.push('[');
                        }
                        push_literal(&mut regex, '[');
                    }
                }
                pc => {
                    let c = pc.char_value();
                    if let Some(literal) = &mut literal {
                        literal.push(c);
                    }
                    push_literal(&mut regex, c);
                }
            }
        }

        if let Some(literal) = literal {
            return Ok(Pattern {
                body: Body::Literal(literal),
            });
        }

        regex.push_str(")\\z");
        match Regex::new(&regex) {
            Ok(regex) => Ok(Pattern {
                body: Body::Regex(regex),
            }),
            Err(e) => Err(Error::Compile(e.to_string())),
        }
    }

    /// Returns the literal string if the pattern contains no special
    /// characters.
    #[must_use]
    pub fn as_literal(&self) -> Option<&str> {
        match &self.body {
            Body::Literal(s) => Some(s),
            Body::Regex(_) => None,
        }
    }

    /// Tests whether this pattern matches the whole given string.
    #[must_use]
    pub fn is_match(&self, s: &str) -> bool {
        match &self.body {
            Body::Literal(literal) => literal == s,
            Body::Regex(regex) => regex.is_match(s),
        }
    }

    /// Returns the length of the shortest prefix of `s` this pattern matches.
    #[must_use]
    pub fn shortest_prefix(&self, s: &str) -> Option<usize> {
        self.prefix_lengths(s).next()
    }

    /// Returns the length of the longest prefix of `s` this pattern matches.
    #[must_use]
    pub fn longest_prefix(&self, s: &str) -> Option<usize> {
        self.prefix_lengths(s).last()
    }

    fn prefix_lengths<'a>(&'a self, s: &'a str) -> impl Iterator<Item = usize> + 'a {
        boundaries(s).filter(move |&i| self.is_match(&s[..i]))
    }

    /// Returns the start index of the shortest suffix of `s` this pattern
    /// matches.
    #[must_use]
    pub fn shortest_suffix(&self, s: &str) -> Option<usize> {
        self.suffix_starts(s).last()
    }

    /// Returns the start index of the longest suffix of `s` this pattern
    /// matches.
    #[must_use]
    pub fn longest_suffix(&self, s: &str) -> Option<usize> {
        self.suffix_starts(s).next()
    }

    fn suffix_starts<'a>(&'a self, s: &'a str) -> impl Iterator<Item = usize> + 'a {
        boundaries(s).filter(move |&i| self.is_match(&s[i..]))
    }
}

/// Iterates over all character boundaries of `s`, in ascending order,
/// including `0` and `s.len()`.
fn boundaries(s: &str) -> impl Iterator<Item = usize> + '_ {
    s.char_indices().map(|(i, _)| i).chain([s.len()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn literal_pattern() {
        let p = Pattern::parse(without_escape("abc")).unwrap();
        assert_eq!(p.as_literal(), Some("abc"));
        assert!(p.is_match("abc"));
        assert!(!p.is_match("abcd"));
        assert!(!p.is_match("ab"));
    }

    #[test]
    fn question_mark() {
        let p = Pattern::parse(without_escape("a?c")).unwrap();
        assert_eq!(p.as_literal(), None);
        assert!(p.is_match("abc"));
        assert!(p.is_match("axc"));
        assert!(!p.is_match("ac"));
        assert!(!p.is_match("abbc"));
    }

    #[test]
    fn asterisk() {
        let p = Pattern::parse(without_escape("a*c")).unwrap();
        assert!(p.is_match("ac"));
        assert!(p.is_match("abc"));
        assert!(p.is_match("a/x/c"));
        assert!(!p.is_match("ab"));
    }

    #[test]
    fn asterisk_matches_newline() {
        let p = Pattern::parse(without_escape("a*c")).unwrap();
        assert!(p.is_match("a\nc"));
    }

    #[test]
    fn bracket_expression() {
        let p = Pattern::parse(without_escape("[abc]")).unwrap();
        assert!(p.is_match("a"));
        assert!(p.is_match("c"));
        assert!(!p.is_match("d"));
        assert!(!p.is_match("ab"));
    }

    #[test]
    fn bracket_range() {
        let p = Pattern::parse(without_escape("x[0-9]")).unwrap();
        assert!(p.is_match("x0"));
        assert!(p.is_match("x9"));
        assert!(!p.is_match("xa"));
    }

    #[test]
    fn bracket_complement() {
        let p = Pattern::parse(without_escape("[!0-9]")).unwrap();
        assert!(p.is_match("a"));
        assert!(!p.is_match("5"));

        let p = Pattern::parse(without_escape("[^0-9]")).unwrap();
        assert!(p.is_match("a"));
        assert!(!p.is_match("5"));
    }

    #[test]
    fn bracket_close_bracket_first() {
        let p = Pattern::parse(without_escape("[]x]")).unwrap();
        assert!(p.is_match("]"));
        assert!(p.is_match("x"));
        assert!(!p.is_match("y"));
    }

    #[test]
    fn bracket_character_class() {
        let p = Pattern::parse(without_escape("[[:digit:]]")).unwrap();
        assert!(p.is_match("4"));
        assert!(!p.is_match("a"));
    }

    #[test]
    fn unclosed_bracket_is_literal() {
        let p = Pattern::parse(without_escape("a[b")).unwrap();
        assert!(p.is_match("a[b"));
        assert!(!p.is_match("ab"));
    }

    #[test]
    fn escaped_specials_are_literal() {
        let p = Pattern::parse(with_escape(r"a\*c")).unwrap();
        assert_eq!(p.as_literal(), Some("a*c"));
        assert!(p.is_match("a*c"));
        assert!(!p.is_match("abc"));
    }

    #[test]
    fn trailing_backslash() {
        let p = Pattern::parse(with_escape(r"a\")).unwrap();
        assert!(p.is_match(r"a\"));
    }

    #[test]
    fn regex_metacharacters_are_quoted() {
        let p = Pattern::parse(without_escape("a.c+")).unwrap();
        assert!(p.is_match("a.c+"));
        assert!(!p.is_match("abc+"));
    }

    #[test]
    fn prefix_matching() {
        let p = Pattern::parse(without_escape("*b")).unwrap();
        assert_eq!(p.shortest_prefix("abcabc"), Some(2));
        assert_eq!(p.longest_prefix("abcabc"), Some(5));
        assert_eq!(p.shortest_prefix("xyz"), None);
    }

    #[test]
    fn suffix_matching() {
        let p = Pattern::parse(without_escape("b*")).unwrap();
        assert_eq!(p.shortest_suffix("abcabc"), Some(4));
        assert_eq!(p.longest_suffix("abcabc"), Some(1));
        assert_eq!(p.longest_suffix("xyz"), None);
    }

    #[test]
    fn empty_pattern() {
        let p = Pattern::parse(without_escape("")).unwrap();
        assert!(p.is_match(""));
        assert!(!p.is_match("a"));
        assert_eq!(p.shortest_prefix("ab"), Some(0));
    }

    #[test]
    fn compile_error_is_reported() {
        // A bracket expression with an inverted range compiles to an invalid
        // regex class.
        let result = Pattern::parse(without_escape("[z-a]"));
        assert_matches!(result, Err(Error::Compile(_)));
    }
}
