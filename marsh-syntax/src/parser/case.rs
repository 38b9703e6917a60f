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

//! Syntax parser for the case command

use super::core::Parser;
use super::error::Error;
use super::error::Result;
use super::error::SyntaxError;
use super::lex::Keyword;
use super::lex::Operator;
use super::lex::TokenId;
use crate::syntax::CaseContinuation;
use crate::syntax::CaseItem;
use crate::syntax::CompoundCommand;

impl Parser<'_, '_> {
    /// Consumes newline tokens, reading pending here-document contents.
    pub(super) fn newline_list(&mut self) -> Result<()> {
        while self.peek_token()?.id == TokenId::Operator(Operator::Newline) {
            self.take_token_raw()?;
            self.here_doc_contents()?;
        }
        Ok(())
    }

    /// Parses one case item, if any.
    fn case_item(&mut self) -> Result<Option<CaseItem>> {
        // An optional `(` may precede the pattern list.
        if self.peek_token()?.id == TokenId::Operator(Operator::OpenParen) {
            self.take_token_raw()?;
        } else if self.peek_token()?.id == TokenId::Token(Some(Keyword::Esac)) {
            return Ok(None);
        }

        // Parse patterns separated by `|`
        let mut patterns = Vec::new();
        loop {
            let token = self.take_token_raw()?;
            match token.id {
                // `esac` is the only keyword recognized in a pattern
                // position, and only as the first unparenthesized pattern.
                TokenId::Token(_) => patterns.push(token.word),
                _ => {
                    return Err(Error {
                        cause: SyntaxError::MissingPattern.into(),
                        location: token.word.location,
                    })
                }
            }

            let token = self.take_token_raw()?;
            match token.id {
                TokenId::Operator(Operator::Bar) => continue,
                TokenId::Operator(Operator::CloseParen) => break,
                _ => {
                    return Err(Error {
                        cause: SyntaxError::UnclosedPatternList.into(),
                        location: token.word.location,
                    })
                }
            }
        }

        // Parse the body
        let body = self.maybe_compound_list()?;

        // Parse the terminator
        let continuation = match self.peek_token()?.id {
            TokenId::Operator(Operator::SemicolonSemicolon) => {
                self.take_token_raw()?;
                CaseContinuation::Break
            }
            TokenId::Operator(Operator::SemicolonAnd) => {
                self.take_token_raw()?;
                CaseContinuation::FallThrough
            }
            TokenId::Operator(Operator::SemicolonSemicolonAnd) => {
                self.take_token_raw()?;
                CaseContinuation::Continue
            }
            // The last item may omit the terminator.
            _ => CaseContinuation::Break,
        };

        Ok(Some(CaseItem {
            patterns,
            body,
            continuation,
        }))
    }

    /// Parses a case command.
    ///
    /// The next token must be the `case` reserved word.
    pub fn case_command(&mut self) -> Result<CompoundCommand> {
        let token = self.take_token_raw()?;
        debug_assert_eq!(token.id, TokenId::Token(Some(Keyword::Case)));
        let opening_location = token.word.location;

        let subject = self.take_token_auto(&[])?;
        match subject.id {
            TokenId::Token(_) => (),
            TokenId::EndOfInput | TokenId::Operator(Operator::Newline) => {
                return Err(Error {
                    cause: SyntaxError::MissingCaseSubject.into(),
                    location: subject.word.location,
                })
            }
            _ => {
                return Err(Error {
                    cause: SyntaxError::InvalidCaseSubject.into(),
                    location: subject.word.location,
                })
            }
        }
        let subject = subject.word;

        self.newline_list()?;

        let r#in = self.take_token_raw()?;
        if r#in.id != TokenId::Token(Some(Keyword::In)) {
            return Err(Error {
                cause: SyntaxError::MissingIn { opening_location }.into(),
                location: r#in.word.location,
            });
        }

        let mut items = Vec::new();
        loop {
            self.newline_list()?;
            match self.case_item()? {
                Some(item) => items.push(item),
                None => break,
            }
        }

        let esac = self.take_token_raw()?;
        if esac.id != TokenId::Token(Some(Keyword::Esac)) {
            return Err(Error {
                cause: SyntaxError::UnclosedCase { opening_location }.into(),
                location: esac.word.location,
            });
        }

        Ok(CompoundCommand::Case { subject, items })
    }
}

#[cfg(test)]
mod tests {
    use super::super::lex::Lexer;
    use super::*;
    use crate::source::Source;
    use assert_matches::assert_matches;

    fn parse(source: &str) -> Result<CompoundCommand> {
        let mut lexer = Lexer::from_memory(source, Source::Unknown);
        let mut parser = Parser::new(&mut lexer);
        parser.case_command()
    }

    #[test]
    fn empty_case() {
        let command = parse("case x in esac").unwrap();
        assert_matches!(command, CompoundCommand::Case { subject, items } => {
            assert_eq!(subject.to_string(), "x");
            assert_eq!(items, []);
        });
    }

    #[test]
    fn items_with_and_without_parens() {
        let command = parse("case x in (a) p;; b|c) q;; esac").unwrap();
        assert_matches!(command, CompoundCommand::Case { items, .. } => {
            assert_eq!(items.len(), 2);
            assert_eq!(items[0].patterns.len(), 1);
            assert_eq!(items[0].body.to_string(), "p");
            assert_eq!(items[1].patterns.len(), 2);
            assert_eq!(items[1].continuation, CaseContinuation::Break);
        });
    }

    #[test]
    fn terminators() {
        let command = parse("case x in a) p;; b) q;& c) r;;& d) s esac").unwrap();
        assert_matches!(command, CompoundCommand::Case { items, .. } => {
            assert_eq!(items[0].continuation, CaseContinuation::Break);
            assert_eq!(items[1].continuation, CaseContinuation::FallThrough);
            assert_eq!(items[2].continuation, CaseContinuation::Continue);
            assert_eq!(items[3].continuation, CaseContinuation::Break);
        });
    }

    #[test]
    fn multiline_case() {
        let command = parse("case x\nin\n(a)\np\n;;\n\n(b) q;;\nesac").unwrap();
        assert_matches!(command, CompoundCommand::Case { items, .. } => {
            assert_eq!(items.len(), 2);
        });
    }

    #[test]
    fn empty_body_item() {
        let command = parse("case x in a) ;; esac").unwrap();
        assert_matches!(command, CompoundCommand::Case { items, .. } => {
            assert_eq!(items[0].body.0.len(), 0);
        });
    }

    #[test]
    fn missing_in() {
        let error = parse("case x esac").unwrap_err();
        assert_matches!(
            error.cause,
            super::super::error::ErrorCause::Syntax(SyntaxError::MissingIn { .. })
        );
    }

    #[test]
    fn missing_subject() {
        let error = parse("case\n").unwrap_err();
        assert_eq!(error.cause, SyntaxError::MissingCaseSubject.into());
    }

    #[test]
    fn keyword_pattern_with_paren() {
        // With an opening parenthesis, even `esac` is a pattern.
        let command = parse("case x in (esac) y;; esac").unwrap();
        assert_matches!(command, CompoundCommand::Case { items, .. } => {
            assert_eq!(items[0].patterns[0].to_string(), "esac");
        });
    }
}
