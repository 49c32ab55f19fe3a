use sanitize_filename::Options;

use crate::card::PNG_EXTENSION;

/// Maximum length in bytes for the stem of a file name, leaving room for the
/// extension and the temporary `.partial` suffix
const MAX_STEM_LENGTH: usize = 200;

const FALLBACK_STEM: &str = "untitled";

/// Turn a rendered template into a safe file stem (without extension)
///
/// Path separators, reserved and control characters become `_`. Unicode
/// letters are kept.
pub fn sanitize_stem(raw: &str) -> String {
    let sanitized = sanitize_filename::sanitize_with_options(
        raw.trim(),
        Options {
            truncate: false,
            windows: true,
            replacement: "_",
        },
    );

    let truncated = truncate_at_char_boundary(&sanitized, MAX_STEM_LENGTH)
        .trim_end_matches(['.', ' '])
        .trim_start();

    if truncated.is_empty() {
        FALLBACK_STEM.to_string()
    } else {
        truncated.to_string()
    }
}

/// Complete card file name for a rendered template
pub fn card_file_name(raw: &str) -> String {
    format!("{}{}", sanitize_stem(raw), PNG_EXTENSION)
}

fn truncate_at_char_boundary(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        return s;
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
