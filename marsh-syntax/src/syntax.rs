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

//! Shell command language syntax
//!
//! This module contains types that represent abstract syntax trees (ASTs) of
//! the shell language.
//!
//! ## Syntactic elements
//!
//! The AST type that represents the whole shell script is [`List`], which is a
//! vector of [`Item`]s. An `Item` is a possibly asynchronous [`AndOrList`],
//! which is a sequence of conditionally executed [`Pipeline`]s. A `Pipeline`
//! is a sequence of [`Command`]s separated by `|`.
//!
//! There are several types of `Command`s, namely [`SimpleCommand`],
//! [`CompoundCommand`], [`FunctionDefinition`] and [`CoprocCommand`], where
//! `CompoundCommand` in turn comes in many variants.
//!
//! ## Lexical elements
//!
//! Tokens that make up commands may contain quotations and expansions. A
//! [`Word`], a sequence of [`WordUnit`]s, represents such a token that appears
//! in a simple command and some kinds of other commands.
//!
//! In some contexts, tilde expansion and single- and double-quotes are not
//! recognized while other kinds of expansions are allowed. Such part is
//! represented as [`Text`], a sequence of [`TextUnit`]s.
//!
//! ## Parsing and displaying
//!
//! Most AST types implement [`FromStr`](std::str::FromStr) and
//! [`Display`](std::fmt::Display). Parsing a string and displaying the result
//! produces an equivalent script, modulo whitespace and comments;
//! here-document contents are omitted from the display form.

use crate::parser::lex::Keyword;
use crate::parser::lex::Operator;
use crate::source::Location;
use std::cell::OnceCell;
#[cfg(unix)]
use std::os::unix::io::RawFd;
use std::rc::Rc;

#[cfg(not(unix))]
type RawFd = i32;

/// Special parameter
///
/// This enum value identifies a special parameter in the shell language.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SpecialParam {
    /// `@` (all positional parameters)
    At,
    /// `*` (all positional parameters)
    Asterisk,
    /// `#` (number of positional parameters)
    Number,
    /// `?` (exit status of the last command)
    Question,
    /// `-` (active shell options)
    Hyphen,
    /// `$` (process ID of the shell)
    Dollar,
    /// `!` (process ID of the last asynchronous command)
    Exclamation,
    /// `0` (name of the shell or shell script)
    Zero,
}

impl SpecialParam {
    /// Returns the character representing the special parameter.
    #[must_use]
    pub fn as_char(self) -> char {
        use SpecialParam::*;
        match self {
            At => '@',
            Asterisk => '*',
            Number => '#',
            Question => '?',
            Hyphen => '-',
            Dollar => '$',
            Exclamation => '!',
            Zero => '0',
        }
    }

    /// Classifies a character as a special parameter.
    #[must_use]
    pub fn from_char(c: char) -> Option<SpecialParam> {
        use SpecialParam::*;
        match c {
            '@' => Some(At),
            '*' => Some(Asterisk),
            '#' => Some(Number),
            '?' => Some(Question),
            '-' => Some(Hyphen),
            '$' => Some(Dollar),
            '!' => Some(Exclamation),
            '0' => Some(Zero),
            _ => None,
        }
    }
}

/// Type of a parameter
///
/// This enum distinguishes three types of [parameters](Param): named, special
/// and positional parameters. The actual name is stored in a separate field
/// in the AST node that contains this value.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ParamType {
    /// Named parameter
    Variable,
    /// Special parameter
    Special(SpecialParam),
    /// Positional parameter
    ///
    /// Positional parameters are indexed starting from 1, so the index of `0`
    /// always refers to a non-existent parameter.
    Positional(usize),
}

/// Parameter
///
/// A parameter is an identifier that appears in a parameter expansion
/// ([`TextUnit::RawParam`] and [`BracedParam`]).
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Param {
    /// Literal representation of the parameter name
    ///
    /// This is the raw string form of the parameter as it appears in the
    /// source code, e.g., `foo`, `@`, `#`, `0`, and `12`.
    pub id: String,

    /// Type of the parameter
    ///
    /// This precomputed value must be consistent with the `id` field; the
    /// parser ensures this invariant when it constructs a `Param` value.
    pub r#type: ParamType,
}

impl Param {
    /// Creates a parameter from a name, computing its type.
    #[must_use]
    pub fn from_name<S: Into<String>>(id: S) -> Param {
        fn inner(id: String) -> Param {
            let r#type = if id.chars().all(|c| c.is_ascii_digit()) && !id.is_empty() {
                ParamType::Positional(id.parse().unwrap_or(usize::MAX))
            } else {
                match id.chars().next().and_then(SpecialParam::from_char) {
                    Some(special) if id.len() == 1 => ParamType::Special(special),
                    _ => ParamType::Variable,
                }
            };
            Param { id, r#type }
        }
        let id = id.into();
        // `0` parses as a digit string but is the special parameter
        if id == "0" {
            return Param {
                id,
                r#type: ParamType::Special(SpecialParam::Zero),
            };
        }
        inner(id)
    }
}

/// Flag that specifies how the value is substituted in a [switch](Switch)
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SwitchType {
    /// Alter an existing value, if any. (`+`)
    Alter,
    /// Substitute a missing value with a default. (`-`)
    Default,
    /// Assign a default to the variable if the value is missing. (`=`)
    Assign,
    /// Error out if the value is missing. (`?`)
    Error,
}

/// Condition that triggers a [switch](Switch)
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SwitchCondition {
    /// Without a colon, the switch is triggered if the parameter is unset.
    Unset,
    /// With a colon, the switch is triggered if the parameter is unset or
    /// empty.
    UnsetOrEmpty,
}

/// Parameter expansion [modifier](Modifier) that conditionally substitutes
/// the value being expanded
///
/// Examples of switches include `+foo`, `:-bar` and `:=baz`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Switch {
    /// How the value is substituted
    pub r#type: SwitchType,
    /// Condition that determines whether the value is substituted or not
    pub condition: SwitchCondition,
    /// Word that substitutes the parameter value
    pub word: Word,
}

/// Flag that specifies which side of the expanded value is removed in a
/// [trim](Trim)
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TrimSide {
    /// Beginning of the value (`#`)
    Prefix,
    /// End of the value (`%`)
    Suffix,
}

/// Flag that specifies pattern matching strategy in a [trim](Trim)
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TrimLength {
    /// Match as small number of characters as possible.
    Shortest,
    /// Match as large number of characters as possible.
    Longest,
}

/// Parameter expansion [modifier](Modifier) that removes the beginning or end
/// of the value being expanded
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Trim {
    /// Which side of the value should be removed?
    pub side: TrimSide,
    /// How long the pattern should match?
    pub length: TrimLength,
    /// Pattern to be matched with the expanded value
    pub pattern: Word,
}

/// Attribute that modifies a parameter expansion
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Modifier {
    /// No modifier
    None,
    /// `#` prefix (`${#foo}`)
    Length,
    /// `+`, `-`, `=` or `?` suffix, optionally with `:` (`${foo:-bar}`)
    Switch(Switch),
    /// `#`, `##`, `%` or `%%` suffix
    Trim(Trim),
}

/// Parameter expansion enclosed in braces
///
/// This struct is used only for parameter expansions that are enclosed in
/// braces. Expansions that are not enclosed in braces are directly encoded
/// with [`TextUnit::RawParam`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BracedParam {
    /// Parameter to be expanded
    pub param: Param,
    /// Array subscript, if any (`${foo[2]}`)
    pub index: Option<Text>,
    /// Modifier
    pub modifier: Modifier,
    /// Position of this parameter expansion in the source code
    pub location: Location,
}

/// Element of [`TextUnit::Backquote`]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BackquoteUnit {
    /// Literal single character
    Literal(char),
    /// Backslash-escaped single character
    Backslashed(char),
}

/// Element of a [Text], i.e., something that can be expanded
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TextUnit {
    /// Literal single character
    Literal(char),
    /// Backslash-escaped single character
    Backslashed(char),
    /// Parameter expansion that is not enclosed in braces
    RawParam {
        /// Parameter to be expanded
        param: Param,
        /// Position of this parameter expansion in the source code
        location: Location,
    },
    /// Parameter expansion that is enclosed in braces
    BracedParam(BracedParam),
    /// Command substitution of the form `$(...)`
    CommandSubst {
        /// Command string that will be parsed and executed when the command
        /// substitution is expanded
        ///
        /// This value is reference-counted so that the shell does not have to
        /// clone the entire string when it is passed to a subshell.
        content: Rc<str>,
        /// Position of this command substitution in the source code
        location: Location,
    },
    /// Command substitution of the form `` `...` ``
    Backquote {
        /// Command string that will be parsed and executed when the command
        /// substitution is expanded
        content: Vec<BackquoteUnit>,
        /// Position of this command substitution in the source code
        location: Location,
    },
    /// Arithmetic expansion
    Arith {
        /// Expression that is to be evaluated
        content: Text,
        /// Position of this arithmetic expansion in the source code
        location: Location,
    },
    /// Process substitution (`<(...)` or `>(...)`)
    ProcSubst {
        /// Command string executed in the substituted process
        content: Rc<str>,
        /// Direction of the substitution: true for `<(...)`
        read: bool,
        /// Position of this process substitution in the source code
        location: Location,
    },
}

pub use TextUnit::*;

/// String that may contain some expansions
///
/// A text is a sequence of [text unit](TextUnit)s, which may contain some
/// kinds of expansions.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Text(pub Vec<TextUnit>);

impl Text {
    /// Creates a text from an iterator of literal chars.
    #[must_use]
    pub fn from_literal_chars<I: IntoIterator<Item = char>>(i: I) -> Text {
        Text(i.into_iter().map(Literal).collect())
    }

    /// Returns the text as a string if it consists solely of literals.
    #[must_use]
    pub fn to_string_if_literal(&self) -> Option<String> {
        self.0
            .iter()
            .map(|unit| match unit {
                Literal(c) => Some(*c),
                _ => None,
            })
            .collect()
    }
}

/// Element of an [`EscapedString`]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum EscapeUnit {
    /// Literal single character
    Literal(char),
    /// Backslash-escaped double-quote character (`\"`)
    DoubleQuote,
    /// Backslash-escaped single-quote character (`\'`)
    SingleQuote,
    /// Backslash-escaped backslash character (`\\`)
    Backslash,
    /// Backslash-escaped question mark character (`\?`)
    Question,
    /// Backslash notation for the bell character (`\a`, ASCII 7)
    Alert,
    /// Backslash notation for the backspace character (`\b`, ASCII 8)
    Backspace,
    /// Backslash notation for the escape character (`\e`, ASCII 27)
    Escape,
    /// Backslash notation for the form feed character (`\f`, ASCII 12)
    FormFeed,
    /// Backslash notation for the newline character (`\n`, ASCII 10)
    Newline,
    /// Backslash notation for the carriage return character (`\r`, ASCII 13)
    CarriageReturn,
    /// Backslash notation for the horizontal tab character (`\t`, ASCII 9)
    Tab,
    /// Backslash notation for the vertical tab character (`\v`, ASCII 11)
    VerticalTab,
    /// Control character notation (`\c...`)
    Control(u8),
    /// Single-byte octal notation (`\OOO`)
    Octal(u8),
    /// Single-byte hexadecimal notation (`\xHH`)
    Hex(u8),
    /// Unicode notation (`\uHHHH` or `\UHHHHHHHH`)
    Unicode(char),
}

/// String that may contain some escapes
///
/// This type is used for the value of a [dollar-single-quoted
/// string](WordUnit::DollarSingleQuote).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct EscapedString(pub Vec<EscapeUnit>);

impl EscapedString {
    /// Returns the decoded value of the escaped string.
    #[must_use]
    pub fn to_decoded(&self) -> String {
        use EscapeUnit::*;
        let mut result = String::new();
        for unit in &self.0 {
            match unit {
                Literal(c) => result.push(*c),
                DoubleQuote => result.push('"'),
                SingleQuote => result.push('\''),
                Backslash => result.push('\\'),
                Question => result.push('?'),
                Alert => result.push('\u{7}'),
                Backspace => result.push('\u{8}'),
                Escape => result.push('\u{1B}'),
                FormFeed => result.push('\u{C}'),
                Newline => result.push('\n'),
                CarriageReturn => result.push('\r'),
                Tab => result.push('\t'),
                VerticalTab => result.push('\u{B}'),
                Control(b) | Octal(b) | Hex(b) => result.push(*b as char),
                Unicode(c) => result.push(*c),
            }
        }
        result
    }
}

/// Element of a [Word], i.e., text with quotes and tilde expansion
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum WordUnit {
    /// Unquoted [`TextUnit`] as a word unit
    Unquoted(TextUnit),
    /// String surrounded with a pair of single quotations
    SingleQuote(String),
    /// Text surrounded with a pair of double quotations
    DoubleQuote(Text),
    /// String surrounded with single quotations and preceded by a dollar sign
    /// (`$'...'`), performing ANSI-C escape decoding
    DollarSingleQuote(EscapedString),
    /// Text surrounded with double quotations and preceded by a dollar sign
    /// (`$"..."`), subject to locale-dependent translation
    DollarDoubleQuote(Text),
    /// Tilde expansion
    ///
    /// The `String` value does not contain the initial tilde.
    Tilde(String),
}

pub use WordUnit::*;

/// Token that may involve expansions and quotes
///
/// A word is a sequence of [word unit](WordUnit)s. It depends on context
/// whether an empty word is valid or not.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Word {
    /// Word units that constitute the word
    pub units: Vec<WordUnit>,
    /// Position of the word in the source code
    pub location: Location,
}

impl Word {
    /// Returns the word as a string if it consists solely of unquoted
    /// literals.
    #[must_use]
    pub fn to_string_if_literal(&self) -> Option<String> {
        self.units
            .iter()
            .map(|unit| match unit {
                Unquoted(Literal(c)) => Some(*c),
                _ => None,
            })
            .collect()
    }

    /// Removes quotes and returns the string value, with a flag indicating
    /// whether any part of the word was quoted.
    ///
    /// Expansions are rendered in their literal form. This function is mainly
    /// used for here-document delimiters, whose quoting state determines
    /// whether the content is expanded.
    #[must_use]
    pub fn unquote(&self) -> (String, bool) {
        let mut result = String::new();
        let mut quoted = false;
        for unit in &self.units {
            match unit {
                Unquoted(Literal(c)) => result.push(*c),
                Unquoted(Backslashed(c)) => {
                    result.push(*c);
                    quoted = true;
                }
                Unquoted(unit) => result.push_str(&unit.to_string()),
                SingleQuote(s) => {
                    result.push_str(s);
                    quoted = true;
                }
                DoubleQuote(text) | DollarDoubleQuote(text) => {
                    for unit in &text.0 {
                        match unit {
                            Literal(c) | Backslashed(c) => result.push(*c),
                            unit => result.push_str(&unit.to_string()),
                        }
                    }
                    quoted = true;
                }
                DollarSingleQuote(escaped) => {
                    result.push_str(&escaped.to_decoded());
                    quoted = true;
                }
                Tilde(name) => {
                    result.push('~');
                    result.push_str(name);
                }
            }
        }
        (result, quoted)
    }

    /// Parses a tilde expansion at the beginning of the word.
    ///
    /// If the word starts with an unquoted tilde, the literal characters up
    /// to the first `/` (or the end of the word) are converted to a
    /// [`Tilde`] unit. Quoted characters prevent the conversion.
    pub fn parse_tilde_front(&mut self) {
        let mut units = self.units.iter();
        if !matches!(units.next(), Some(Unquoted(Literal('~')))) {
            return;
        }

        let mut name = String::new();
        let mut count = 1;
        for unit in units {
            match unit {
                Unquoted(Literal('/')) => break,
                Unquoted(Literal(c)) => {
                    // A colon also delimits tilde expansion in assignments,
                    // but plain words only stop at a slash.
                    name.push(*c);
                    count += 1;
                }
                _ => return,
            }
        }

        self.units.splice(..count, [Tilde(name)]);
    }
}

/// Value of an [assignment](Assign)
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Value {
    /// Scalar value, a possibly empty word
    Scalar(Word),

    /// Array, possibly empty list of non-empty words
    Array(Vec<Word>),
}

pub use Value::*;

/// Assignment word
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Assign {
    /// Name of the variable to assign to
    ///
    /// In the valid assignment syntax, the name must not be empty.
    pub name: String,
    /// Array subscript, if the assignment was of the form `name[index]=...`
    pub index: Option<Text>,
    /// Value assigned to the variable
    pub value: Value,
    /// Whether the assignment appends to the existing value (`+=`)
    pub append: bool,
    /// Location of the assignment word
    pub location: Location,
}

/// File descriptor
///
/// This is the `newtype` pattern applied to [`RawFd`].
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Fd(pub RawFd);

impl Fd {
    /// File descriptor for the standard input
    pub const STDIN: Fd = Fd(0);
    /// File descriptor for the standard output
    pub const STDOUT: Fd = Fd(1);
    /// File descriptor for the standard error
    pub const STDERR: Fd = Fd(2);
}

impl std::fmt::Display for Fd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<RawFd> for Fd {
    fn from(raw_fd: RawFd) -> Fd {
        Fd(raw_fd)
    }
}

/// Redirection operators
///
/// This enum defines the redirection operator types except here-documents.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RedirOp {
    /// `<` (open a file for input)
    FileIn,
    /// `<>` (open a file for input and output)
    FileInOut,
    /// `>` (open a file for output; truncate or fail if existing)
    FileOut,
    /// `>>` (open a file for output; append if existing)
    FileAppend,
    /// `>|` (open a file for output; always truncate if existing)
    FileClobber,
    /// `<&` (copy or close a file descriptor for input)
    FdIn,
    /// `>&` (copy or close a file descriptor for output)
    FdOut,
    /// `<<<` (here-string)
    HereString,
    /// `&>` (redirect both standard output and standard error)
    ErrAndOut,
    /// `&>>` (append both standard output and standard error)
    ErrAndOutAppend,
}

/// Here-document
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HereDoc {
    /// Token that marks the end of the content of the here-document
    pub delimiter: Word,

    /// Whether leading tab characters should be removed from each line of the
    /// here-document content
    ///
    /// This value is `true` for the `<<-` operator and `false` for `<<`.
    pub remove_tabs: bool,

    /// Content of the here-document
    ///
    /// The content ends with a newline unless it is empty. If the delimiter
    /// is quoted, the content must be all literal. If `remove_tabs` is
    /// `true`, each content line does not start with tabs as they are removed
    /// when parsed.
    ///
    /// The value is wrapped in `OnceCell` because the content is parsed
    /// separately from the here-doc operator: the cell is filled when the
    /// newline terminating the containing command is reached.
    pub content: OnceCell<Text>,
}

/// Part of a redirection that defines the nature of the resulting file
/// descriptor
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RedirBody {
    /// Normal redirection
    Normal { operator: RedirOp, operand: Word },
    /// Here-document
    HereDoc(Rc<HereDoc>),
}

impl RedirBody {
    /// Returns the operand word of the redirection.
    pub fn operand(&self) -> &Word {
        match self {
            RedirBody::Normal { operand, .. } => operand,
            RedirBody::HereDoc(here_doc) => &here_doc.delimiter,
        }
    }
}

impl<T: Into<Rc<HereDoc>>> From<T> for RedirBody {
    fn from(t: T) -> Self {
        RedirBody::HereDoc(t.into())
    }
}

/// Redirection
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Redir {
    /// File descriptor that is modified by this redirection
    pub fd: Option<Fd>,
    /// Nature of the resulting file descriptor
    pub body: RedirBody,
}

impl Redir {
    /// Computes the file descriptor that is modified by this redirection.
    ///
    /// If `self.fd` is `Some(_)`, the value is returned intact. Otherwise,
    /// the default file descriptor is selected depending on the type of
    /// `self.body`.
    #[must_use]
    pub fn fd_or_default(&self) -> Fd {
        use RedirOp::*;
        self.fd.unwrap_or(match self.body {
            RedirBody::Normal { operator, .. } => match operator {
                FileIn | FileInOut | FdIn | HereString => Fd::STDIN,
                FileOut | FileAppend | FileClobber | FdOut | ErrAndOut | ErrAndOutAppend => {
                    Fd::STDOUT
                }
            },
            RedirBody::HereDoc { .. } => Fd::STDIN,
        })
    }
}

/// Command that involves assignments, redirections, and word expansions
///
/// In the shell language syntax, a valid simple command must contain at least
/// one of assignments, redirections, and words. The parser must not produce a
/// completely empty simple command.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SimpleCommand {
    /// Assignments
    pub assigns: Vec<Assign>,
    /// Command name and arguments
    pub words: Vec<Word>,
    /// Redirections
    ///
    /// The redirections are in `Rc` so they can be shared with the forked
    /// execution of the command without cloning.
    pub redirs: Rc<Vec<Redir>>,
}

impl SimpleCommand {
    /// Returns true if the simple command does not contain any assignments,
    /// words, or redirections.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assigns.is_empty() && self.words.is_empty() && self.redirs.is_empty()
    }

    /// Tests whether the first word of the simple command is a keyword.
    #[must_use]
    pub(crate) fn first_word_is_keyword(&self) -> bool {
        let Some(word) = self.words.first() else {
            return false;
        };
        let Some(literal) = word.to_string_if_literal() else {
            return false;
        };
        literal.parse::<Keyword>().is_ok()
    }
}

/// `elif-then` clause
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ElifThen {
    pub condition: List,
    pub body: List,
}

/// Symbol that terminates the body of a case branch and determines what to do
/// after executing it
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum CaseContinuation {
    /// `;;` (terminate the case construct)
    #[default]
    Break,
    /// `;&` (unconditionally execute the body of the next case branch)
    FallThrough,
    /// `;;&` (resume with the next case branch, performing pattern matching
    /// again)
    Continue,
}

/// Branch item of a `case` compound command
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CaseItem {
    /// Array of patterns that are matched against the main word of the case
    /// compound command to decide if the body of this item should be executed
    ///
    /// A syntactically valid case item must have at least one pattern.
    pub patterns: Vec<Word>,
    /// Commands that are executed if any of the patterns matched
    pub body: List,
    /// What to do after executing the body of this item
    pub continuation: CaseContinuation,
}

/// Unary operator of a conditional expression (`[[ ... ]]`)
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CondUnaryOp {
    /// File tests: `-a`, `-b`, `-c`, `-d`, `-e`, `-f`, `-g`, `-h`, `-k`,
    /// `-p`, `-r`, `-s`, `-t`, `-u`, `-w`, `-x`, `-G`, `-L`, `-N`, `-O`,
    /// `-S`; string tests `-n`, `-z`; variable test `-v`; option test `-o`
    FileOrString(char),
}

impl CondUnaryOp {
    #[must_use]
    pub fn from_str_op(s: &str) -> Option<CondUnaryOp> {
        let mut chars = s.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (Some('-'), Some(c), None)
                if "abcdefghkprstuwxGLNOSnzvo".contains(c) =>
            {
                Some(CondUnaryOp::FileOrString(c))
            }
            _ => None,
        }
    }

    #[must_use]
    pub fn as_char(self) -> char {
        let CondUnaryOp::FileOrString(c) = self;
        c
    }
}

/// Binary operator of a conditional expression (`[[ ... ]]`)
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CondBinaryOp {
    /// `==` or `=` (pattern match)
    Match,
    /// `!=` (pattern mismatch)
    NoMatch,
    /// `=~` (regular expression match)
    RegexMatch,
    /// `<` (lexicographic less-than)
    StringLess,
    /// `>` (lexicographic greater-than)
    StringGreater,
    /// `-eq`, `-ne`, `-lt`, `-le`, `-gt`, `-ge` (arithmetic comparisons)
    ArithEq,
    ArithNe,
    ArithLt,
    ArithLe,
    ArithGt,
    ArithGe,
    /// `-nt`, `-ot`, `-ef` (file comparisons)
    FileNewer,
    FileOlder,
    FileSame,
}

impl CondBinaryOp {
    #[must_use]
    pub fn from_str_op(s: &str) -> Option<CondBinaryOp> {
        use CondBinaryOp::*;
        match s {
            "==" | "=" => Some(Match),
            "!=" => Some(NoMatch),
            "=~" => Some(RegexMatch),
            "<" => Some(StringLess),
            ">" => Some(StringGreater),
            "-eq" => Some(ArithEq),
            "-ne" => Some(ArithNe),
            "-lt" => Some(ArithLt),
            "-le" => Some(ArithLe),
            "-gt" => Some(ArithGt),
            "-ge" => Some(ArithGe),
            "-nt" => Some(FileNewer),
            "-ot" => Some(FileOlder),
            "-ef" => Some(FileSame),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        use CondBinaryOp::*;
        match self {
            Match => "==",
            NoMatch => "!=",
            RegexMatch => "=~",
            StringLess => "<",
            StringGreater => ">",
            ArithEq => "-eq",
            ArithNe => "-ne",
            ArithLt => "-lt",
            ArithLe => "-le",
            ArithGt => "-gt",
            ArithGe => "-ge",
            FileNewer => "-nt",
            FileOlder => "-ot",
            FileSame => "-ef",
        }
    }
}

/// Expression tree of a conditional expression (`[[ ... ]]`)
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CondExpr {
    /// Conjunction (`&&`)
    And(Box<CondExpr>, Box<CondExpr>),
    /// Disjunction (`||`)
    Or(Box<CondExpr>, Box<CondExpr>),
    /// Negation (`!`)
    Not(Box<CondExpr>),
    /// Unary test
    Unary { op: CondUnaryOp, operand: Word },
    /// Binary test
    Binary {
        op: CondBinaryOp,
        lhs: Word,
        rhs: Word,
    },
    /// Single word, true if the expansion is non-empty
    Word(Word),
}

/// Command that contains other commands
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CompoundCommand {
    /// List as a command (`{ ... ; }`)
    Grouping(List),
    /// Command for executing commands in a subshell (`( ... )`)
    Subshell { body: Rc<List>, location: Location },
    /// For loop
    For {
        name: Word,
        values: Option<Vec<Word>>,
        body: List,
    },
    /// Arithmetic for loop (`for (( init; cond; step ))`)
    ArithFor {
        init: String,
        condition: String,
        step: String,
        body: List,
        location: Location,
    },
    /// Select loop
    Select {
        name: Word,
        values: Option<Vec<Word>>,
        body: List,
    },
    /// While loop
    While { condition: List, body: List },
    /// Until loop
    Until { condition: List, body: List },
    /// If conditional construct
    If {
        condition: List,
        body: List,
        elifs: Vec<ElifThen>,
        r#else: Option<List>,
    },
    /// Case conditional construct
    Case { subject: Word, items: Vec<CaseItem> },
    /// Conditional expression (`[[ ... ]]`)
    DoubleBracket {
        expression: CondExpr,
        location: Location,
    },
    /// Arithmetic command (`(( ... ))`)
    Arithmetic {
        expression: String,
        location: Location,
    },
}

/// Compound command with redirections
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FullCompoundCommand {
    /// The main part
    pub command: CompoundCommand,
    /// Redirections
    pub redirs: Vec<Redir>,
}

/// Function definition command
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FunctionDefinition {
    /// Whether the function definition command starts with the `function`
    /// reserved word
    pub has_keyword: bool,
    /// Function name
    pub name: Word,
    /// Function body
    ///
    /// The body is in `Rc` so that defining the function does not clone the
    /// command tree; the function set shares it with the AST.
    pub body: Rc<FullCompoundCommand>,
}

/// Coprocess command (`coproc [NAME] command`)
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CoprocCommand {
    /// Name of the coprocess, `None` for the default
    pub name: Option<String>,
    /// Command executed as the coprocess
    pub body: Rc<Command>,
}

/// Element of a pipe sequence
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Command {
    /// Simple command
    Simple(SimpleCommand),
    /// Compound command
    Compound(FullCompoundCommand),
    /// Function definition command
    Function(FunctionDefinition),
    /// Coprocess
    Coproc(CoprocCommand),
}

/// Timing mode of a pipeline prefixed with `time`
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TimeFormat {
    /// Default multi-line format
    Default,
    /// POSIX format selected with `time -p`
    Posix,
}

/// Commands separated by `|`
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Pipeline {
    /// Elements of the pipeline
    ///
    /// A valid pipeline must have at least one command. The commands are
    /// contained in `Rc` to allow executing them in forked children without
    /// cloning them.
    pub commands: Vec<Rc<Command>>,
    /// Whether the pipeline begins with a `!`
    pub negation: bool,
    /// Timing requested with the `time` reserved word, if any
    pub time: Option<TimeFormat>,
}

/// Condition that decides if a [Pipeline] in an [and-or list](AndOrList)
/// should be executed
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AndOr {
    /// `&&`
    AndThen,
    /// `||`
    OrElse,
}

impl TryFrom<Operator> for AndOr {
    type Error = ();
    fn try_from(op: Operator) -> Result<AndOr, ()> {
        match op {
            Operator::AndAnd => Ok(AndOr::AndThen),
            Operator::BarBar => Ok(AndOr::OrElse),
            _ => Err(()),
        }
    }
}

/// Pipelines separated by `&&` and `||`
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AndOrList {
    pub first: Pipeline,
    pub rest: Vec<(AndOr, Pipeline)>,
}

/// Element of a [List]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Item {
    /// Main part of this item
    ///
    /// The and-or list is contained in `Rc` to allow executing it
    /// asynchronously without cloning it.
    pub and_or: Rc<AndOrList>,
    /// Location of the `&` operator for this item, if any
    pub async_flag: Option<Location>,
}

/// Sequence of [and-or lists](AndOrList) separated by `;` or `&`
///
/// It depends on context whether an empty list is a valid syntax.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct List(pub Vec<Item>);

/// Implementations of [std::fmt::Display] for the shell language syntax types
mod impl_display;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_from_name() {
        assert_eq!(Param::from_name("foo").r#type, ParamType::Variable);
        assert_eq!(Param::from_name("_x9").r#type, ParamType::Variable);
        assert_eq!(
            Param::from_name("12").r#type,
            ParamType::Positional(12)
        );
        assert_eq!(
            Param::from_name("0").r#type,
            ParamType::Special(SpecialParam::Zero)
        );
        assert_eq!(
            Param::from_name("@").r#type,
            ParamType::Special(SpecialParam::At)
        );
        assert_eq!(
            Param::from_name("?").r#type,
            ParamType::Special(SpecialParam::Question)
        );
    }

    #[test]
    fn word_to_string_if_literal() {
        let word = Word {
            units: vec![Unquoted(Literal('f')), Unquoted(Literal('i'))],
            location: Location::dummy("fi"),
        };
        assert_eq!(word.to_string_if_literal().unwrap(), "fi");

        let word = Word {
            units: vec![SingleQuote("fi".to_string())],
            location: Location::dummy("'fi'"),
        };
        assert_eq!(word.to_string_if_literal(), None);
    }

    #[test]
    fn word_unquote() {
        let word = Word {
            units: vec![
                Unquoted(Literal('a')),
                SingleQuote("b c".to_string()),
                Unquoted(Backslashed('d')),
            ],
            location: Location::dummy(r"a'b c'\d"),
        };
        assert_eq!(word.unquote(), ("ab cd".to_string(), true));

        let word = Word {
            units: vec![Unquoted(Literal('x'))],
            location: Location::dummy("x"),
        };
        assert_eq!(word.unquote(), ("x".to_string(), false));
    }

    #[test]
    fn word_parse_tilde_front() {
        let mut word = Word {
            units: vec![
                Unquoted(Literal('~')),
                Unquoted(Literal('u')),
                Unquoted(Literal('/')),
                Unquoted(Literal('x')),
            ],
            location: Location::dummy("~u/x"),
        };
        word.parse_tilde_front();
        assert_eq!(
            word.units,
            [
                Tilde("u".to_string()),
                Unquoted(Literal('/')),
                Unquoted(Literal('x')),
            ]
        );

        let mut word = Word {
            units: vec![Unquoted(Literal('~')), SingleQuote("u".to_string())],
            location: Location::dummy("~'u'"),
        };
        let units = word.units.clone();
        word.parse_tilde_front();
        assert_eq!(word.units, units);
    }

    #[test]
    fn redir_fd_or_default() {
        fn normal(operator: RedirOp) -> Redir {
            Redir {
                fd: None,
                body: RedirBody::Normal {
                    operator,
                    operand: Word {
                        units: vec![],
                        location: Location::dummy(""),
                    },
                },
            }
        }
        assert_eq!(normal(RedirOp::FileIn).fd_or_default(), Fd::STDIN);
        assert_eq!(normal(RedirOp::FileOut).fd_or_default(), Fd::STDOUT);
        assert_eq!(normal(RedirOp::HereString).fd_or_default(), Fd::STDIN);
        assert_eq!(normal(RedirOp::ErrAndOut).fd_or_default(), Fd::STDOUT);

        let redir = Redir {
            fd: Some(Fd(7)),
            ..normal(RedirOp::FileIn)
        };
        assert_eq!(redir.fd_or_default(), Fd(7));
    }

    #[test]
    fn cond_ops() {
        assert_eq!(CondUnaryOp::from_str_op("-f").unwrap().as_char(), 'f');
        assert_eq!(CondUnaryOp::from_str_op("-q"), None);
        assert_eq!(CondUnaryOp::from_str_op("x"), None);
        assert_eq!(
            CondBinaryOp::from_str_op("="),
            Some(CondBinaryOp::Match)
        );
        assert_eq!(
            CondBinaryOp::from_str_op("-ge"),
            Some(CondBinaryOp::ArithGe)
        );
        assert_eq!(CondBinaryOp::from_str_op("-xy"), None);
    }
}
