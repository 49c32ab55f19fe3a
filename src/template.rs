// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A small template language for turning a record into a string.
//!
//! A format string is plain text with token keys embedded in it, e.g.
//! `card-{{SOURCE}}-v1`. Keys are delimited by `{{` and `}}`. Compiling a
//! format against a token vocabulary yields a [`CompiledTemplate`] that can be
//! executed against any number of records.

use std::fmt;

use crate::error::TemplateError;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// A named extraction rule mapping a record to a string fragment
pub struct Token<T> {
    /// Delimited key, including the braces (e.g. `{{SOURCE}}`)
    pub key: &'static str,
    /// Human-readable description for help output
    pub description: &'static str,
    pub extractor: fn(&T) -> String,
}

// Derives would add `T: Clone` / `T: Debug` bounds
impl<T> Clone for Token<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Token<T> {}

impl<T> fmt::Debug for Token<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("key", &self.key)
            .field("description", &self.description)
            .finish()
    }
}

impl<T> Token<T> {
    pub const fn new(
        key: &'static str,
        description: &'static str,
        extractor: fn(&T) -> String,
    ) -> Self {
        Self {
            key,
            description,
            extractor,
        }
    }
}

enum Segment<T> {
    Literal(String),
    Token(Token<T>),
}

/// A format string compiled into literal and token segments
pub struct CompiledTemplate<T> {
    segments: Vec<Segment<T>>,
}

impl<T> CompiledTemplate<T> {
    /// Render the template for one record.
    ///
    /// The result is a raw string; callers that use it as a file name must
    /// sanitize it themselves.
    pub fn execute(&self, record: &T) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Token(token) => out.push_str(&(token.extractor)(record)),
            }
        }
        out
    }

    /// Keys referenced by this template, in order of appearance
    pub fn token_keys(&self) -> Vec<&'static str> {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Token(token) => Some(token.key),
                Segment::Literal(_) => None,
            })
            .collect()
    }
}

impl<T> fmt::Debug for CompiledTemplate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => list.entry(text),
                Segment::Token(token) => list.entry(&token.key),
            };
        }
        list.finish()
    }
}

/// A fixed token vocabulary that format strings are compiled against
pub struct Templater<T> {
    tokens: Vec<Token<T>>,
}

impl<T> Templater<T> {
    pub fn new(tokens: impl IntoIterator<Item = Token<T>>) -> Self {
        Self {
            tokens: tokens.into_iter().collect(),
        }
    }

    pub fn tokens(&self) -> &[Token<T>] {
        &self.tokens
    }

    pub fn keys(&self) -> Vec<&'static str> {
        self.tokens.iter().map(|t| t.key).collect()
    }

    fn lookup(&self, key: &str) -> Option<Token<T>> {
        self.tokens.iter().find(|t| t.key == key).copied()
    }

    /// Compile a format string.
    ///
    /// Text outside `{{...}}` is kept verbatim. Every delimited key must be
    /// part of the vocabulary, otherwise compilation fails. An opening `{{`
    /// with no closing `}}` after it, or one followed by another `{{` before
    /// the close, is treated as literal text.
    pub fn compile(&self, format: &str) -> Result<CompiledTemplate<T>, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = format;

        while let Some(first) = rest.find(OPEN) {
            let Some(len) = rest[first + OPEN.len()..].find(CLOSE) else {
                break;
            };
            let close = first + OPEN.len() + len;
            // Only the last `{{` before the closing `}}` opens the key
            let start = first + rest[first..close].rfind(OPEN).unwrap_or(0);
            let end = close + CLOSE.len();
            let key = &rest[start..end];

            let token = self.lookup(key).ok_or_else(|| TemplateError::UnknownToken {
                key: key.to_string(),
                format: format.to_string(),
            })?;

            literal.push_str(&rest[..start]);
            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(Segment::Token(token));
            rest = &rest[end..];
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(CompiledTemplate { segments })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Record {
        source: &'static str,
        id: u32,
    }

    fn templater() -> Templater<Record> {
        Templater::new([
            Token::new("{{SOURCE}}", "source", |r: &Record| r.source.to_string()),
            Token::new("{{ID}}", "id", |r: &Record| r.id.to_string()),
        ])
    }

    fn record() -> Record {
        Record {
            source: "chub",
            id: 42,
        }
    }

    #[test]
    fn literals_round_trip_around_tokens() {
        let template = templater().compile("card-{{SOURCE}}-v1").unwrap();
        assert_eq!(template.execute(&record()), "card-chub-v1");
    }

    #[test]
    fn adjacent_tokens() {
        let template = templater().compile("{{SOURCE}}{{ID}}").unwrap();
        assert_eq!(template.execute(&record()), "chub42");
        assert_eq!(template.token_keys(), vec!["{{SOURCE}}", "{{ID}}"]);
    }

    #[test]
    fn repeated_token() {
        let template = templater().compile("{{ID}}-{{ID}}").unwrap();
        assert_eq!(template.execute(&record()), "42-42");
    }

    #[test]
    fn plain_text_is_a_single_literal() {
        let template = templater().compile("no tokens here").unwrap();
        assert_eq!(template.execute(&record()), "no tokens here");
        assert!(template.token_keys().is_empty());
    }

    #[test]
    fn empty_format_renders_empty_string() {
        let template = templater().compile("").unwrap();
        assert_eq!(template.execute(&record()), "");
    }

    #[test]
    fn unknown_token_is_rejected() {
        let err = templater().compile("{{SOURCE}}_{{BOGUS}}").unwrap_err();
        assert_eq!(
            err,
            TemplateError::UnknownToken {
                key: "{{BOGUS}}".to_string(),
                format: "{{SOURCE}}_{{BOGUS}}".to_string(),
            }
        );
    }

    #[test]
    fn keys_are_case_sensitive() {
        assert!(templater().compile("{{source}}").is_err());
    }

    #[test]
    fn unterminated_open_is_literal() {
        let template = templater().compile("{{SOURCE}}-{{oops").unwrap();
        assert_eq!(template.execute(&record()), "chub-{{oops");
    }

    #[test]
    fn extra_brace_before_key_is_literal() {
        let template = templater().compile("{{{SOURCE}}").unwrap();
        assert_eq!(template.execute(&record()), "{chub");
    }

    #[test]
    fn stray_open_before_key_is_literal() {
        let template = templater().compile("a{{b_{{SOURCE}}").unwrap();
        assert_eq!(template.execute(&record()), "a{{b_chub");
        assert_eq!(template.token_keys(), vec!["{{SOURCE}}"]);
    }

    #[test]
    fn unknown_key_after_stray_open_is_still_rejected() {
        let err = templater().compile("a{{b_{{BOGUS}}").unwrap_err();
        assert_eq!(
            err,
            TemplateError::UnknownToken {
                key: "{{BOGUS}}".to_string(),
                format: "a{{b_{{BOGUS}}".to_string(),
            }
        );
    }

    #[test]
    fn single_braces_are_literal() {
        let template = templater().compile("{x}_{{ID}}_}").unwrap();
        assert_eq!(template.execute(&record()), "{x}_42_}");
    }

    #[test]
    fn compilation_is_deterministic() {
        let t = templater();
        let a = t.compile("{{SOURCE}}/{{ID}}").unwrap();
        let b = t.compile("{{SOURCE}}/{{ID}}").unwrap();
        assert_eq!(a.execute(&record()), b.execute(&record()));
        assert_eq!(a.execute(&record()), a.execute(&record()));
    }

    #[test]
    fn keys_preserve_vocabulary_order() {
        assert_eq!(templater().keys(), vec!["{{SOURCE}}", "{{ID}}"]);
    }
}
