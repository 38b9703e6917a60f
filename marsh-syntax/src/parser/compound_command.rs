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

//! Syntax parser for compound commands

use super::core::Parser;
use super::error::Result;
use super::lex::Keyword;
use super::lex::Operator;
use super::lex::TokenId;
use crate::syntax::CompoundCommand;
use crate::syntax::FullCompoundCommand;

impl Parser<'_, '_> {
    /// Parses a compound command.
    ///
    /// If the current token does not start a compound command, the result is
    /// `Ok(None)`.
    pub fn compound_command(&mut self) -> Result<Option<CompoundCommand>> {
        match self.peek_token()?.id {
            TokenId::Operator(Operator::OpenParen) => {
                // `((` may be an arithmetic command.
                if let Some(arith) = self.arithmetic_command()? {
                    return Ok(Some(arith));
                }
                self.subshell().map(Some)
            }
            TokenId::Token(Some(Keyword::OpenBrace)) => self.grouping().map(Some),
            TokenId::Token(Some(Keyword::If)) => self.if_command().map(Some),
            TokenId::Token(Some(Keyword::While)) => self.while_loop().map(Some),
            TokenId::Token(Some(Keyword::Until)) => self.until_loop().map(Some),
            TokenId::Token(Some(Keyword::For)) => self.for_loop().map(Some),
            TokenId::Token(Some(Keyword::Select)) => self.select_loop().map(Some),
            TokenId::Token(Some(Keyword::Case)) => self.case_command().map(Some),
            TokenId::Token(Some(Keyword::OpenBracketBracket)) => {
                self.double_bracket_command().map(Some)
            }
            _ => Ok(None),
        }
    }

    /// Parses an optional compound command with redirections.
    pub fn full_compound_command(&mut self) -> Result<Option<FullCompoundCommand>> {
        let Some(command) = self.compound_command()? else {
            return Ok(None);
        };
        let redirs = self.redirections()?;
        Ok(Some(FullCompoundCommand { command, redirs }))
    }
}

#[cfg(test)]
mod tests {
    use super::super::lex::Lexer;
    use super::*;
    use crate::source::Source;
    use assert_matches::assert_matches;

    fn parse(source: &str) -> Option<FullCompoundCommand> {
        let mut lexer = Lexer::from_memory(source, Source::Unknown);
        let mut parser = Parser::new(&mut lexer);
        parser.full_compound_command().unwrap()
    }

    #[test]
    fn not_a_compound_command() {
        assert_eq!(parse("echo"), None);
        assert_eq!(parse(";"), None);
    }

    #[test]
    fn compound_command_with_redirections() {
        let command = parse("{ x; } <in >out").unwrap();
        assert_matches!(command.command, CompoundCommand::Grouping(_));
        assert_eq!(command.redirs.len(), 2);
    }

    #[test]
    fn dispatching() {
        assert_matches!(
            parse("(x)").unwrap().command,
            CompoundCommand::Subshell { .. }
        );
        assert_matches!(
            parse("if x; then y; fi").unwrap().command,
            CompoundCommand::If { .. }
        );
        assert_matches!(
            parse("while x; do y; done").unwrap().command,
            CompoundCommand::While { .. }
        );
        assert_matches!(
            parse("case x in esac").unwrap().command,
            CompoundCommand::Case { .. }
        );
        assert_matches!(
            parse("((1 + 2))").unwrap().command,
            CompoundCommand::Arithmetic { .. }
        );
        assert_matches!(
            parse("[[ -n x ]]").unwrap().command,
            CompoundCommand::DoubleBracket { .. }
        );
    }
}
