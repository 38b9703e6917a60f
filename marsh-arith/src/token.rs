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

//! Tokenizer for arithmetic expressions

use crate::Error;

/// Operator token
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Operator {
    /// `(`
    OpenParen,
    /// `)`
    CloseParen,
    /// `++`
    PlusPlus,
    /// `--`
    MinusMinus,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `~`
    Tilde,
    /// `!`
    Bang,
    /// `*`
    Asterisk,
    /// `/`
    Slash,
    /// `%`
    Percent,
    /// `<<`
    LessLess,
    /// `>>`
    GreaterGreater,
    /// `<`
    Less,
    /// `<=`
    LessEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterEqual,
    /// `==`
    EqualEqual,
    /// `!=`
    BangEqual,
    /// `&`
    Ampersand,
    /// `^`
    Caret,
    /// `|`
    Bar,
    /// `&&`
    AmpersandAmpersand,
    /// `||`
    BarBar,
    /// `?`
    Question,
    /// `:`
    Colon,
    /// `=`
    Equal,
    /// `*=`
    AsteriskEqual,
    /// `/=`
    SlashEqual,
    /// `%=`
    PercentEqual,
    /// `+=`
    PlusEqual,
    /// `-=`
    MinusEqual,
    /// `<<=`
    LessLessEqual,
    /// `>>=`
    GreaterGreaterEqual,
    /// `&=`
    AmpersandEqual,
    /// `^=`
    CaretEqual,
    /// `|=`
    BarEqual,
    /// `,`
    Comma,
}

impl Operator {
    /// Returns the source form of the operator.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        use Operator::*;
        match self {
            OpenParen => "(",
            CloseParen => ")",
            PlusPlus => "++",
            MinusMinus => "--",
            Plus => "+",
            Minus => "-",
            Tilde => "~",
            Bang => "!",
            Asterisk => "*",
            Slash => "/",
            Percent => "%",
            LessLess => "<<",
            GreaterGreater => ">>",
            Less => "<",
            LessEqual => "<=",
            Greater => ">",
            GreaterEqual => ">=",
            EqualEqual => "==",
            BangEqual => "!=",
            Ampersand => "&",
            Caret => "^",
            Bar => "|",
            AmpersandAmpersand => "&&",
            BarBar => "||",
            Question => "?",
            Colon => ":",
            Equal => "=",
            AsteriskEqual => "*=",
            SlashEqual => "/=",
            PercentEqual => "%=",
            PlusEqual => "+=",
            MinusEqual => "-=",
            LessLessEqual => "<<=",
            GreaterGreaterEqual => ">>=",
            AmpersandEqual => "&=",
            CaretEqual => "^=",
            BarEqual => "|=",
            Comma => ",",
        }
    }
}

/// Token value
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Token {
    /// Integer constant
    Number(i64),
    /// Variable name
    Identifier(String),
    /// Operator
    Operator(Operator),
}

/// Parses an integer constant.
///
/// Supports decimal, octal (leading `0`), hexadecimal (leading `0x` or `0X`),
/// and the `BASE#VALUE` notation with bases from 2 to 64.
fn parse_number(s: &str) -> Result<i64, Error> {
    let error = || Error::InvalidNumber(s.to_owned());

    if let Some((base, digits)) = s.split_once('#') {
        let base: u32 = base.parse().map_err(|_| error())?;
        if !(2..=64).contains(&base) || digits.is_empty() {
            return Err(error());
        }
        let mut result: i64 = 0;
        for c in digits.chars() {
            let digit = match c {
                '0'..='9' => c as u32 - '0' as u32,
                'a'..='z' => c as u32 - 'a' as u32 + 10,
                'A'..='Z' if base <= 36 => c as u32 - 'A' as u32 + 10,
                'A'..='Z' => c as u32 - 'A' as u32 + 36,
                '@' => 62,
                '_' => 63,
                _ => return Err(error()),
            };
            if digit >= base {
                return Err(error());
            }
            result = result
                .checked_mul(base.into())
                .and_then(|r| r.checked_add(digit.into()))
                .ok_or_else(error)?;
        }
        return Ok(result);
    }

    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16).map_err(|_| error());
    }
    if s.len() > 1 && s.starts_with('0') {
        return i64::from_str_radix(&s[1..], 8).map_err(|_| error());
    }
    s.parse().map_err(|_| error())
}

/// Splits the input string into tokens.
#[derive(Clone, Debug)]
pub struct Tokens<'a> {
    rest: &'a str,
    /// One-token lookahead
    peeked: Option<Option<Token>>,
}

impl<'a> Tokens<'a> {
    pub fn new(source: &'a str) -> Self {
        Tokens {
            rest: source,
            peeked: None,
        }
    }

    /// Returns the next token without consuming it.
    pub fn peek(&mut self) -> Result<Option<&Token>, Error> {
        if self.peeked.is_none() {
            self.peeked = Some(self.scan()?);
        }
        Ok(self.peeked.as_ref().unwrap().as_ref())
    }

    /// Returns and consumes the next token.
    pub fn next(&mut self) -> Result<Option<Token>, Error> {
        match self.peeked.take() {
            Some(token) => Ok(token),
            None => self.scan(),
        }
    }

    fn scan(&mut self) -> Result<Option<Token>, Error> {
        use Operator::*;

        self.rest = self.rest.trim_start();
        let mut chars = self.rest.char_indices();
        let Some((_, first)) = chars.next() else {
            return Ok(None);
        };

        if first.is_ascii_digit() {
            let end = self
                .rest
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '#' || c == '@' || c == '_'))
                .unwrap_or(self.rest.len());
            let (number, rest) = self.rest.split_at(end);
            self.rest = rest;
            return Ok(Some(Token::Number(parse_number(number)?)));
        }

        if first.is_alphabetic() || first == '_' {
            let end = self
                .rest
                .find(|c: char| !(c.is_alphanumeric() || c == '_'))
                .unwrap_or(self.rest.len());
            let (name, rest) = self.rest.split_at(end);
            self.rest = rest;
            return Ok(Some(Token::Identifier(name.to_owned())));
        }

        // Longest-match operator scan
        let mut take = |len: usize, op: Operator| {
            self.rest = &self.rest[len..];
            Ok(Some(Token::Operator(op)))
        };
        let next = chars.next().map(|(_, c)| c);
        let next2 = chars.next().map(|(_, c)| c);
        match (first, next, next2) {
            ('<', Some('<'), Some('=')) => take(3, LessLessEqual),
            ('>', Some('>'), Some('=')) => take(3, GreaterGreaterEqual),
            ('+', Some('+'), _) => take(2, PlusPlus),
            ('-', Some('-'), _) => take(2, MinusMinus),
            ('<', Some('<'), _) => take(2, LessLess),
            ('>', Some('>'), _) => take(2, GreaterGreater),
            ('<', Some('='), _) => take(2, LessEqual),
            ('>', Some('='), _) => take(2, GreaterEqual),
            ('=', Some('='), _) => take(2, EqualEqual),
            ('!', Some('='), _) => take(2, BangEqual),
            ('&', Some('&'), _) => take(2, AmpersandAmpersand),
            ('|', Some('|'), _) => take(2, BarBar),
            ('*', Some('='), _) => take(2, AsteriskEqual),
            ('/', Some('='), _) => take(2, SlashEqual),
            ('%', Some('='), _) => take(2, PercentEqual),
            ('+', Some('='), _) => take(2, PlusEqual),
            ('-', Some('='), _) => take(2, MinusEqual),
            ('&', Some('='), _) => take(2, AmpersandEqual),
            ('^', Some('='), _) => take(2, CaretEqual),
            ('|', Some('='), _) => take(2, BarEqual),
            ('(', _, _) => take(1, OpenParen),
            (')', _, _) => take(1, CloseParen),
            ('+', _, _) => take(1, Plus),
            ('-', _, _) => take(1, Minus),
            ('~', _, _) => take(1, Tilde),
            ('!', _, _) => take(1, Bang),
            ('*', _, _) => take(1, Asterisk),
            ('/', _, _) => take(1, Slash),
            ('%', _, _) => take(1, Percent),
            ('<', _, _) => take(1, Less),
            ('>', _, _) => take(1, Greater),
            ('&', _, _) => take(1, Ampersand),
            ('^', _, _) => take(1, Caret),
            ('|', _, _) => take(1, Bar),
            ('?', _, _) => take(1, Question),
            (':', _, _) => take(1, Colon),
            ('=', _, _) => take(1, Equal),
            (',', _, _) => take(1, Comma),
            _ => Err(Error::InvalidCharacter(first)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all(source: &str) -> Vec<Token> {
        let mut tokens = Tokens::new(source);
        let mut result = Vec::new();
        while let Some(token) = tokens.next().unwrap() {
            result.push(token);
        }
        result
    }

    #[test]
    fn numbers() {
        assert_eq!(all("42"), [Token::Number(42)]);
        assert_eq!(all("0"), [Token::Number(0)]);
        assert_eq!(all("010"), [Token::Number(8)]);
        assert_eq!(all("0x1F"), [Token::Number(31)]);
        assert_eq!(all("2#101"), [Token::Number(5)]);
        assert_eq!(all("16#ff"), [Token::Number(255)]);
        assert_eq!(all("64#@_"), [Token::Number(62 * 64 + 63)]);
    }

    #[test]
    fn invalid_numbers() {
        assert_eq!(
            Tokens::new("0x").next(),
            Err(Error::InvalidNumber("0x".to_owned()))
        );
        assert_eq!(
            Tokens::new("09").next(),
            Err(Error::InvalidNumber("09".to_owned()))
        );
        assert_eq!(
            Tokens::new("1#0").next(),
            Err(Error::InvalidNumber("1#0".to_owned()))
        );
        assert_eq!(
            Tokens::new("2#2").next(),
            Err(Error::InvalidNumber("2#2".to_owned()))
        );
    }

    #[test]
    fn identifiers_and_operators() {
        use Operator::*;
        assert_eq!(
            all("a+_b2"),
            [
                Token::Identifier("a".to_owned()),
                Token::Operator(Plus),
                Token::Identifier("_b2".to_owned()),
            ]
        );
        assert_eq!(
            all("x<<=1"),
            [
                Token::Identifier("x".to_owned()),
                Token::Operator(LessLessEqual),
                Token::Number(1),
            ]
        );
        assert_eq!(
            all("a ? b : c"),
            [
                Token::Identifier("a".to_owned()),
                Token::Operator(Question),
                Token::Identifier("b".to_owned()),
                Token::Operator(Colon),
                Token::Identifier("c".to_owned()),
            ]
        );
    }

    #[test]
    fn peeking() {
        let mut tokens = Tokens::new("1 2");
        assert_eq!(tokens.peek(), Ok(Some(&Token::Number(1))));
        assert_eq!(tokens.peek(), Ok(Some(&Token::Number(1))));
        assert_eq!(tokens.next(), Ok(Some(Token::Number(1))));
        assert_eq!(tokens.next(), Ok(Some(Token::Number(2))));
        assert_eq!(tokens.next(), Ok(None));
    }

    #[test]
    fn invalid_character() {
        assert_eq!(Tokens::new("1 @ 2").next(), Ok(Some(Token::Number(1))));
        let mut tokens = Tokens::new("@");
        assert_eq!(tokens.next(), Err(Error::InvalidCharacter('@')));
    }
}
