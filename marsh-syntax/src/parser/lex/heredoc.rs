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

//! Here-document content parser

use super::core::Lexer;
use crate::parser::error::Error;
use crate::parser::error::Result;
use crate::parser::error::SyntaxError;
use crate::syntax::HereDoc;
use crate::syntax::Text;
use crate::syntax::TextUnit::{self, Literal};

const NEWLINE: char = '\n';

/// Counts the number of leading literal tab characters in `i`.
fn leading_tabs<'a, I: IntoIterator<Item = &'a TextUnit>>(i: I) -> usize {
    i.into_iter()
        .take_while(|&unit| unit == &Literal('\t'))
        .count()
}

impl Lexer<'_> {
    /// Reads a line literally.
    ///
    /// This function recognizes no quotes or expansions. Starting from the
    /// current position, the line is read up to (but not including) the
    /// terminating newline.
    pub fn line(&mut self) -> Result<String> {
        let mut line = String::new();
        self.disable_line_continuation();
        while let Some(c) = self.consume_char_if(|c| c != NEWLINE)? {
            line.push(c.value);
        }
        self.enable_line_continuation();
        Ok(line)
    }

    /// Parses the content of a here-document.
    ///
    /// This function reads here-document content corresponding to the
    /// here-document operator represented by the argument and fills
    /// `here_doc.content` with the result. In case of an error, partial
    /// results may be left in `here_doc.content`.
    pub fn here_doc_content(&mut self, here_doc: &HereDoc) -> Result<()> {
        fn is_escapable(c: char) -> bool {
            matches!(c, '$' | '`' | '\\')
        }

        let (delimiter_string, literal) = here_doc.delimiter.unquote();
        let mut content = Vec::new();
        loop {
            let (line_text, line_string) = if literal {
                let line_string = self.line()?;
                let line_text = Text::from_literal_chars(line_string.chars());
                (line_text, line_string)
            } else {
                let begin = self.index();
                let line_text = self.text(|c| c == NEWLINE, is_escapable)?;
                let end = self.index();
                let line_string = self.source_string(begin..end);
                (line_text, line_string)
            };

            if !self.skip_if(|c| c == NEWLINE)? {
                let redir_op_location = here_doc.delimiter.location.clone();
                let cause = SyntaxError::UnclosedHereDocContent { redir_op_location }.into();
                let location = self.location()?;
                return Err(Error { cause, location });
            }

            let skip_count = if here_doc.remove_tabs {
                leading_tabs(&line_text.0)
            } else {
                0
            };
            if line_string[skip_count..] == delimiter_string {
                break;
            }

            content.extend({ line_text }.0.drain(skip_count..));
            content.push(Literal(NEWLINE));
        }

        here_doc
            .content
            .set(Text(content))
            .expect("here-doc content must be read just once");
        Ok(())
    }
}

#[allow(clippy::bool_assert_comparison)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::error::ErrorCause;
    use crate::source::Source;
    use assert_matches::assert_matches;
    use std::cell::OnceCell;

    #[test]
    fn leading_tabs_test() {
        let c = leading_tabs(std::iter::empty());
        assert_eq!(c, 0);
        let c = leading_tabs(&[Literal('\t'), Literal('a')]);
        assert_eq!(c, 1);
        let c = leading_tabs(&[Literal('\t'), Literal('\t'), Literal('\t')]);
        assert_eq!(c, 3);
    }

    #[test]
    fn lexer_line() {
        let mut lexer = Lexer::from_memory("\n", Source::Unknown);
        let line = lexer.line().unwrap();
        assert_eq!(line, "");

        let mut lexer = Lexer::from_memory("foo\n", Source::Unknown);
        let line = lexer.line().unwrap();
        assert_eq!(line, "foo");
        assert_eq!(lexer.peek_char(), Ok(Some('\n')));
    }

    fn here_doc_operator(delimiter: &str, remove_tabs: bool) -> HereDoc {
        HereDoc {
            delimiter: delimiter.parse().unwrap(),
            remove_tabs,
            content: OnceCell::new(),
        }
    }

    #[test]
    fn empty_content() {
        let heredoc = here_doc_operator("END", false);
        let mut lexer = Lexer::from_memory("END\nX", Source::Unknown);
        lexer.here_doc_content(&heredoc).unwrap();
        assert_eq!(heredoc.content.get().unwrap().0, []);
        assert_eq!(lexer.peek_char(), Ok(Some('X')));
    }

    #[test]
    fn one_line_content() {
        let heredoc = here_doc_operator("FOO", false);
        let mut lexer = Lexer::from_memory("content\nFOO\nX", Source::Unknown);
        lexer.here_doc_content(&heredoc).unwrap();
        assert_eq!(heredoc.content.get().unwrap().to_string(), "content\n");
    }

    #[test]
    fn long_content() {
        let heredoc = here_doc_operator("BAR", false);
        let mut lexer = Lexer::from_memory("foo\n\tBAR\n\nbaz\nBAR\nX", Source::Unknown);
        lexer.here_doc_content(&heredoc).unwrap();
        assert_eq!(
            heredoc.content.get().unwrap().to_string(),
            "foo\n\tBAR\n\nbaz\n",
        );
    }

    #[test]
    fn escapes_with_unquoted_delimiter() {
        let heredoc = here_doc_operator("END", false);
        let mut lexer = Lexer::from_memory("a$x\\$\\\\\nEND\n", Source::Unknown);
        lexer.here_doc_content(&heredoc).unwrap();
        let content = heredoc.content.get().unwrap();
        assert_matches!(&content.0[1], TextUnit::RawParam { param, .. } => {
            assert_eq!(param.id, "x");
        });
        assert_eq!(content.0[2], TextUnit::Backslashed('$'));
        assert_eq!(content.0[3], TextUnit::Backslashed('\\'));
    }

    #[test]
    fn no_expansion_with_quoted_delimiter() {
        let heredoc = here_doc_operator("'END'", false);
        let mut lexer = Lexer::from_memory("a$x\nEND\n", Source::Unknown);
        lexer.here_doc_content(&heredoc).unwrap();
        assert_eq!(
            heredoc.content.get().unwrap().0,
            [
                Literal('a'),
                Literal('$'),
                Literal('x'),
                Literal('\n'),
            ]
        );
    }

    #[test]
    fn tabs_removed_with_dash_operator() {
        let heredoc = here_doc_operator("END", true);
        let mut lexer = Lexer::from_memory("\t\tdata\n\tEND\nX", Source::Unknown);
        lexer.here_doc_content(&heredoc).unwrap();
        assert_eq!(heredoc.content.get().unwrap().to_string(), "data\n");
    }

    #[test]
    fn unclosed_content() {
        let heredoc = here_doc_operator("END", false);
        let mut lexer = Lexer::from_memory("content", Source::Unknown);
        let error = lexer.here_doc_content(&heredoc).unwrap_err();
        assert_matches!(
            error.cause,
            ErrorCause::Syntax(SyntaxError::UnclosedHereDocContent { .. })
        );
    }
}
