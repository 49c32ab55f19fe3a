//! Moving card documents in and out of card images.

use std::path::Path;

use crate::card::{Card, JsonOptions, Png, Sheet};
use crate::error::CodecError;

/// Extract the embedded document of a card file as JSON
pub fn decode_card(card_path: &Path, options: JsonOptions) -> Result<Vec<u8>, CodecError> {
    let card = Card::read(card_path)?;
    let sheet = card.sheet.as_ref().ok_or(CodecError::MissingCard)?;
    tracing::debug!(path = %card_path.display(), name = %sheet.data.name, "Decoded card");
    Ok(sheet.to_json(options)?)
}

/// Extract the embedded document of a card file into a JSON file
pub fn decode_card_to_file(
    card_path: &Path,
    output: &Path,
    options: JsonOptions,
) -> Result<(), CodecError> {
    let card = Card::read(card_path)?;
    let sheet = card.sheet.as_ref().ok_or(CodecError::MissingCard)?;
    sheet.to_file(output, options)
}

/// Replace the document embedded in a card file with the one in a JSON file.
///
/// The card is rewritten in place. Any PNG works as the target, with or
/// without an existing document.
pub fn inject_sheet(card_path: &Path, json_path: &Path) -> Result<(), CodecError> {
    let sheet = Sheet::from_file(json_path)?;
    let image = Png::read(card_path)?;
    tracing::debug!(
        card = %card_path.display(),
        json = %json_path.display(),
        name = %sheet.data.name,
        "Injecting card document"
    );
    Card::new(image, Some(sheet)).write(card_path)
}
