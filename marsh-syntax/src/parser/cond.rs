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

//! Syntax parser for the conditional expression command (`[[ ... ]]`)
//!
//! The conditional expression has its own grammar, distinct from ordinary
//! commands: `&&`, `||`, `!` and parentheses combine tests, `<` and `>` are
//! comparison operators rather than redirections, and the right-hand side of
//! `=~` is lexed with relaxed delimiters so that an unquoted regular
//! expression can contain parentheses. The parser switches to this
//! sub-grammar upon seeing `[[` at a command position.

use super::core::Parser;
use super::error::Error;
use super::error::Result;
use super::error::SyntaxError;
use super::lex::is_blank;
use super::lex::is_token_delimiter_char;
use super::lex::Keyword;
use super::lex::Lexer;
use super::lex::Operator;
use super::lex::TokenId;
use super::lex::WordContext;
use super::lex::WordLexer;
use crate::source::Location;
use crate::syntax::CompoundCommand;
use crate::syntax::CondBinaryOp;
use crate::syntax::CondExpr;
use crate::syntax::CondUnaryOp;
use crate::syntax::Word;

/// Token of the conditional expression sub-grammar
#[derive(Debug)]
enum CondToken {
    /// `&&`
    And,
    /// `||`
    Or,
    /// `(`
    OpenParen,
    /// `)`
    CloseParen,
    /// `<`
    Less,
    /// `>`
    Greater,
    /// `]]`
    End,
    /// Any other word
    Word(Word),
}

/// Recursive-descent parser over [`CondToken`]s
struct CondParser<'p, 'a> {
    lexer: &'p mut Lexer<'a>,
    /// One-token lookahead
    peeked: Option<CondToken>,
    /// Location of the opening `[[`
    opening_location: Location,
}

impl CondParser<'_, '_> {
    fn invalid(&mut self) -> Error {
        let location = self
            .lexer
            .location()
            .unwrap_or_else(|_| self.opening_location.clone());
        Error {
            cause: SyntaxError::InvalidCond.into(),
            location,
        }
    }

    fn unclosed(&mut self) -> Error {
        let location = self
            .lexer
            .location()
            .unwrap_or_else(|_| self.opening_location.clone());
        Error {
            cause: SyntaxError::UnclosedCond {
                opening_location: self.opening_location.clone(),
            }
            .into(),
            location,
        }
    }

    /// Scans the next token from the lexer.
    fn scan(&mut self) -> Result<CondToken> {
        loop {
            self.lexer.skip_blanks()?;
            if self.lexer.peek_char()? != Some('\n') {
                break;
            }
            self.lexer.consume_char();
        }

        if self.lexer.peek_char()?.is_none() {
            return Err(self.unclosed());
        }

        let index = self.lexer.index();
        if let Some(token) = self.lexer.operator()? {
            let operator = match token.id {
                TokenId::Operator(op) => op,
                _ => unreachable!(),
            };
            return match operator {
                Operator::AndAnd => Ok(CondToken::And),
                Operator::BarBar => Ok(CondToken::Or),
                Operator::OpenParen => Ok(CondToken::OpenParen),
                Operator::CloseParen => Ok(CondToken::CloseParen),
                Operator::Less => Ok(CondToken::Less),
                Operator::Greater => Ok(CondToken::Greater),
                _ => {
                    self.lexer.rewind(index);
                    Err(self.invalid())
                }
            };
        }

        let mut lexer = WordLexer {
            lexer: self.lexer,
            context: WordContext::Word,
        };
        let word = lexer.word(is_token_delimiter_char)?;
        if word.units.is_empty() {
            return Err(self.invalid());
        }
        if word.to_string_if_literal().as_deref() == Some("]]") {
            return Ok(CondToken::End);
        }
        Ok(CondToken::Word(word))
    }

    /// Returns the next token without consuming it.
    fn peek(&mut self) -> Result<&CondToken> {
        if self.peeked.is_none() {
            self.peeked = Some(self.scan()?);
        }
        Ok(self.peeked.as_ref().unwrap())
    }

    /// Returns and consumes the next token.
    fn next(&mut self) -> Result<CondToken> {
        match self.peeked.take() {
            Some(token) => Ok(token),
            None => self.scan(),
        }
    }

    /// Parses a disjunction (`||` level).
    fn or(&mut self) -> Result<CondExpr> {
        let mut expr = self.and()?;
        while matches!(self.peek()?, CondToken::Or) {
            self.next()?;
            let rhs = self.and()?;
            expr = CondExpr::Or(Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    /// Parses a conjunction (`&&` level).
    fn and(&mut self) -> Result<CondExpr> {
        let mut expr = self.term()?;
        while matches!(self.peek()?, CondToken::And) {
            self.next()?;
            let rhs = self.term()?;
            expr = CondExpr::And(Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    /// Parses a term: a negation, a parenthesized expression, or a test.
    fn term(&mut self) -> Result<CondExpr> {
        match self.next()? {
            CondToken::OpenParen => {
                let inner = self.or()?;
                match self.next()? {
                    CondToken::CloseParen => Ok(inner),
                    _ => Err(self.invalid()),
                }
            }
            CondToken::Word(word) => {
                if word.to_string_if_literal().as_deref() == Some("!") {
                    let operand = self.term()?;
                    return Ok(CondExpr::Not(Box::new(operand)));
                }

                // A unary operator applies only when an operand word follows.
                if let Some(op) = word
                    .to_string_if_literal()
                    .as_deref()
                    .and_then(CondUnaryOp::from_str_op)
                {
                    if matches!(self.peek()?, CondToken::Word(_)) {
                        let CondToken::Word(operand) = self.next()? else {
                            unreachable!()
                        };
                        return Ok(CondExpr::Unary { op, operand });
                    }
                }

                self.maybe_binary(word)
            }
            _ => Err(self.invalid()),
        }
    }

    /// Parses the optional binary operator and right-hand side after an
    /// operand word.
    fn maybe_binary(&mut self, lhs: Word) -> Result<CondExpr> {
        let op = match self.peek()? {
            CondToken::Less => Some(CondBinaryOp::StringLess),
            CondToken::Greater => Some(CondBinaryOp::StringGreater),
            CondToken::Word(word) => word
                .to_string_if_literal()
                .as_deref()
                .and_then(CondBinaryOp::from_str_op),
            _ => None,
        };
        let Some(op) = op else {
            return Ok(CondExpr::Word(lhs));
        };
        self.next()?;

        let rhs = if op == CondBinaryOp::RegexMatch {
            self.regex_word()?
        } else {
            match self.next()? {
                CondToken::Word(word) => word,
                CondToken::End => return Err(self.unclosed()),
                _ => return Err(self.invalid()),
            }
        };
        Ok(CondExpr::Binary { op, lhs, rhs })
    }

    /// Reads the right-hand side of a `=~` operator.
    ///
    /// The word is delimited by blanks and newlines only, so that an
    /// unquoted regular expression may contain parentheses and other
    /// characters that would otherwise delimit a word.
    fn regex_word(&mut self) -> Result<Word> {
        debug_assert!(self.peeked.is_none(), "no token must be peeked");
        self.lexer.skip_blanks()?;
        let mut lexer = WordLexer {
            lexer: self.lexer,
            context: WordContext::Word,
        };
        let word = lexer.word(|c| is_blank(c) || c == '\n')?;
        if word.units.is_empty() {
            return Err(self.invalid());
        }
        Ok(word)
    }

    /// Parses the whole conditional expression including the closing `]]`.
    fn parse(&mut self) -> Result<CondExpr> {
        let expression = self.or()?;
        match self.next()? {
            CondToken::End => Ok(expression),
            _ => Err(self.unclosed()),
        }
    }
}

impl Parser<'_, '_> {
    /// Parses a conditional expression command.
    ///
    /// The next token must be the `[[` reserved word.
    pub fn double_bracket_command(&mut self) -> Result<CompoundCommand> {
        let token = self.take_token_raw()?;
        debug_assert_eq!(token.id, TokenId::Token(Some(Keyword::OpenBracketBracket)));
        let location = token.word.location;

        let mut cond_parser = CondParser {
            lexer: self.lexer,
            peeked: None,
            opening_location: location.clone(),
        };
        let expression = cond_parser.parse()?;

        Ok(CompoundCommand::DoubleBracket {
            expression,
            location,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Source;
    use assert_matches::assert_matches;

    fn parse(source: &str) -> Result<CondExpr> {
        let mut lexer = Lexer::from_memory(source, Source::Unknown);
        let mut parser = Parser::new(&mut lexer);
        match parser.double_bracket_command()? {
            CompoundCommand::DoubleBracket { expression, .. } => Ok(expression),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn single_word() {
        let expr = parse("[[ word ]]").unwrap();
        assert_matches!(expr, CondExpr::Word(word) => {
            assert_eq!(word.to_string(), "word");
        });
    }

    #[test]
    fn unary_tests() {
        let expr = parse("[[ -f /etc/passwd ]]").unwrap();
        assert_matches!(expr, CondExpr::Unary { op, operand } => {
            assert_eq!(op.as_char(), 'f');
            assert_eq!(operand.to_string(), "/etc/passwd");
        });

        let expr = parse("[[ -n $x ]]").unwrap();
        assert_matches!(expr, CondExpr::Unary { op, .. } => {
            assert_eq!(op.as_char(), 'n');
        });
    }

    #[test]
    fn binary_tests() {
        let expr = parse("[[ a == b ]]").unwrap();
        assert_matches!(expr, CondExpr::Binary { op, lhs, rhs } => {
            assert_eq!(op, CondBinaryOp::Match);
            assert_eq!(lhs.to_string(), "a");
            assert_eq!(rhs.to_string(), "b");
        });

        let expr = parse("[[ 1 -lt 2 ]]").unwrap();
        assert_matches!(expr, CondExpr::Binary { op, .. } => {
            assert_eq!(op, CondBinaryOp::ArithLt);
        });

        let expr = parse("[[ a < b ]]").unwrap();
        assert_matches!(expr, CondExpr::Binary { op, .. } => {
            assert_eq!(op, CondBinaryOp::StringLess);
        });

        let expr = parse("[[ a != b ]]").unwrap();
        assert_matches!(expr, CondExpr::Binary { op, .. } => {
            assert_eq!(op, CondBinaryOp::NoMatch);
        });
    }

    #[test]
    fn regex_match() {
        let expr = parse("[[ $x =~ ^a(b|c)+$ ]]").unwrap();
        assert_matches!(expr, CondExpr::Binary { op, rhs, .. } => {
            assert_eq!(op, CondBinaryOp::RegexMatch);
            assert_eq!(rhs.to_string(), "^a(b|c)+$");
        });
    }

    #[test]
    fn negation() {
        let expr = parse("[[ ! -e file ]]").unwrap();
        assert_matches!(expr, CondExpr::Not(inner) => {
            assert_matches!(*inner, CondExpr::Unary { op, .. } => {
                assert_eq!(op.as_char(), 'e');
            });
        });
    }

    #[test]
    fn conjunction_and_disjunction() {
        let expr = parse("[[ -n a && -n b ]]").unwrap();
        assert_matches!(expr, CondExpr::And(..));

        let expr = parse("[[ a == b || c == d ]]").unwrap();
        assert_matches!(expr, CondExpr::Or(..));
    }

    #[test]
    fn precedence_of_and_over_or() {
        let expr = parse("[[ a || b && c ]]").unwrap();
        assert_matches!(expr, CondExpr::Or(_, rhs) => {
            assert_matches!(*rhs, CondExpr::And(..));
        });

        let expr = parse("[[ a && b || c ]]").unwrap();
        assert_matches!(expr, CondExpr::Or(lhs, _) => {
            assert_matches!(*lhs, CondExpr::And(..));
        });
    }

    #[test]
    fn parentheses() {
        let expr = parse("[[ ( a || b ) && c ]]").unwrap();
        assert_matches!(expr, CondExpr::And(lhs, _) => {
            assert_matches!(*lhs, CondExpr::Or(..));
        });
    }

    #[test]
    fn operator_like_word_without_operand() {
        let expr = parse("[[ -f ]]").unwrap();
        assert_matches!(expr, CondExpr::Word(word) => {
            assert_eq!(word.to_string(), "-f");
        });
    }

    #[test]
    fn quoted_operator_is_operand() {
        let expr = parse("[[ a == '==' ]]").unwrap();
        assert_matches!(expr, CondExpr::Binary { rhs, .. } => {
            assert_eq!(rhs.to_string(), "'=='");
        });
    }

    #[test]
    fn unclosed() {
        let error = parse("[[ a == b").unwrap_err();
        assert_matches!(
            error.cause,
            super::super::error::ErrorCause::Syntax(
                SyntaxError::UnclosedCond { .. } | SyntaxError::InvalidCond
            )
        );
    }

    #[test]
    fn multiline() {
        let expr = parse("[[ a == b &&\nc == d ]]").unwrap();
        assert_matches!(expr, CondExpr::And(..));
    }
}
