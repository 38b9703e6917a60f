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

//! Rendering diagnostics as annotated code snippets
//!
//! Errors in the shell carry [`Location`]s pointing into the source code.
//! This module converts such errors into human-readable messages with the
//! offending line quoted and annotated, rendered by the `annotate-snippets`
//! crate.
//!
//! An error type implements [`MessageBase`] to describe its title and
//! annotations. [`Message`] aggregates them and [`Message::to_string`]
//! produces the final text.

use super::Location;
use std::borrow::Cow;

/// Type of annotation
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AnnotationType {
    Error,
    Warning,
    Info,
    Note,
    Help,
}

/// Source code fragment annotated with a label
#[derive(Clone, Debug)]
pub struct Annotation<'a> {
    /// Type of annotation
    pub r#type: AnnotationType,
    /// Label that describes the annotation
    pub label: Cow<'a, str>,
    /// Position of the annotated fragment in the source code
    pub location: &'a Location,
}

impl<'a> Annotation<'a> {
    /// Creates a new annotation.
    #[must_use]
    pub fn new(r#type: AnnotationType, label: Cow<'a, str>, location: &'a Location) -> Self {
        Annotation {
            r#type,
            label,
            location,
        }
    }
}

/// Trait for types that can be rendered as a diagnostic message
pub trait MessageBase {
    /// Returns the type of the whole message. Defaults to `Error`.
    fn message_type(&self) -> AnnotationType {
        AnnotationType::Error
    }

    /// Returns the title of the message.
    fn message_title(&self) -> Cow<str>;

    /// Returns the annotation for the main location of this message.
    fn main_annotation(&self) -> Annotation<'_>;

    /// Adds additional annotations to the given container. Does nothing by
    /// default.
    fn additional_annotations<'a, T: Extend<Annotation<'a>>>(&'a self, _results: &mut T) {}
}

/// Complete diagnostic message
#[derive(Clone, Debug)]
pub struct Message<'a> {
    pub r#type: AnnotationType,
    pub title: Cow<'a, str>,
    pub annotations: Vec<Annotation<'a>>,
}

impl<'a, T: MessageBase> From<&'a T> for Message<'a> {
    fn from(base: &'a T) -> Self {
        let mut annotations = vec![base.main_annotation()];
        base.additional_annotations(&mut annotations);
        Message {
            r#type: base.message_type(),
            title: base.message_title(),
            annotations,
        }
    }
}

fn level(r#type: AnnotationType) -> annotate_snippets::Level {
    use annotate_snippets::Level;
    match r#type {
        AnnotationType::Error => Level::Error,
        AnnotationType::Warning => Level::Warning,
        AnnotationType::Info => Level::Info,
        AnnotationType::Note => Level::Note,
        AnnotationType::Help => Level::Help,
    }
}

/// Converts a character range to a byte range in the given string.
fn byte_range(value: &str, chars: &std::ops::Range<usize>) -> std::ops::Range<usize> {
    let mut indices = value.char_indices().map(|(i, _)| i).chain([value.len()]);
    let start = indices.nth(chars.start).unwrap_or(value.len());
    let end = if chars.end > chars.start {
        let mut indices = value.char_indices().map(|(i, _)| i).chain([value.len()]);
        indices.nth(chars.end).unwrap_or(value.len())
    } else {
        start
    };
    start..end.max(start)
}

impl std::fmt::Display for Message<'_> {
    /// Renders the message as annotated snippets.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use annotate_snippets::{Renderer, Snippet};

        // Copy out the code values so the borrows below live long enough.
        let values: Vec<String> = self
            .annotations
            .iter()
            .map(|a| a.location.code.value.borrow().clone())
            .collect();
        let labels: Vec<String> = self
            .annotations
            .iter()
            .map(|a| a.location.code.source.label().to_owned())
            .collect();

        let mut message = level(self.r#type).title(&self.title);
        for ((annotation, value), origin) in self.annotations.iter().zip(&values).zip(&labels) {
            let range = byte_range(value, &annotation.location.range);
            // An empty span renders nothing useful; extend it to one byte.
            let range = if range.is_empty() && range.start < value.len() {
                let mut end = range.start + 1;
                while !value.is_char_boundary(end) {
                    end += 1;
                }
                range.start..end
            } else {
                range
            };
            let line_start = annotation.location.code.start_line_number.get();
            let line_start = usize::try_from(line_start).unwrap_or(usize::MAX);
            let span = range.start.min(value.len())..range.end.min(value.len());
            message = message.snippet(
                Snippet::source(value)
                    .line_start(line_start)
                    .origin(origin)
                    .fold(true)
                    .annotation(level(annotation.r#type).span(span).label(&annotation.label)),
            );
        }

        let renderer = Renderer::plain();
        let rendered = renderer.render(message);
        write!(f, "{}", rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    struct Dummy {
        location: Location,
    }

    impl MessageBase for Dummy {
        fn message_title(&self) -> Cow<str> {
            "something went wrong".into()
        }
        fn main_annotation(&self) -> Annotation<'_> {
            Annotation::new(AnnotationType::Error, "here".into(), &self.location)
        }
    }

    #[test]
    fn message_contains_title_and_label() {
        let dummy = Dummy {
            location: Location::dummy("echo hello"),
        };
        let message = Message::from(&dummy);
        let text = message.to_string();
        assert!(text.contains("something went wrong"), "{text:?}");
        assert!(text.contains("echo hello"), "{text:?}");
        assert!(text.contains("here"), "{text:?}");
    }

    #[test]
    fn byte_range_multibyte() {
        // "héllo": char 1..2 is the é, bytes 1..3
        assert_eq!(byte_range("héllo", &(1..2)), 1..3);
        assert_eq!(byte_range("héllo", &(2..3)), 3..4);
        assert_eq!(byte_range("abc", &(3..3)), 3..3);
    }
}
