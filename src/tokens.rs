//! File name tokens available to `fetch --format`.

use crate::card::Metadata;
use crate::template::{CompiledTemplate, Templater, Token};

pub const DEFAULT_FORMAT: &str = "{{SOURCE}}_{{PLATFORM_ID}}";

pub const TOKENS: [Token<Metadata>; 8] = [
    Token::new("{{SOURCE}}", "The source platform of the card", |m: &Metadata| {
        m.source.to_string()
    }),
    Token::new(
        "{{PLATFORM_ID}}",
        "The unique platform identifier for the card",
        |m: &Metadata| m.platform_id.clone(),
    ),
    Token::new(
        "{{CHARACTER_ID}}",
        "The unique character identifier",
        |m: &Metadata| m.character_id.clone(),
    ),
    Token::new("{{TITLE}}", "The title of the card", |m: &Metadata| m.title.clone()),
    Token::new("{{NAME}}", "The name of the character", |m: &Metadata| m.name.clone()),
    Token::new("{{CREATOR}}", "The nickname of the card creator", |m: &Metadata| {
        m.nickname.clone()
    }),
    Token::new(
        "{{CREATE_TIME}}",
        "The creation timestamp in seconds",
        |m: &Metadata| m.create_time.timestamp().to_string(),
    ),
    Token::new(
        "{{UPDATE_TIME}}",
        "The last update timestamp in seconds",
        |m: &Metadata| m.update_time.timestamp().to_string(),
    ),
];

pub type NameTemplate = CompiledTemplate<Metadata>;

pub fn templater() -> Templater<Metadata> {
    Templater::new(TOKENS)
}

/// Compile a user-supplied name format; blank means the default format
pub fn compile_name_format(
    format: Option<&str>,
) -> Result<NameTemplate, crate::error::TemplateError> {
    let format = format
        .filter(|f| !f.trim().is_empty())
        .unwrap_or(DEFAULT_FORMAT);
    templater().compile(format)
}
