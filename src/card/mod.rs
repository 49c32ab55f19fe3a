mod metadata;
mod png;
mod sheet;

use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::error::{CodecError, IntegrityError};

pub use metadata::Metadata;
pub use png::{Chunk, PNG_EXTENSION, Png};
pub use sheet::{CardVersion, JsonOptions, SPEC_V2, SPEC_V3, Sheet, SheetData};

/// `tEXt` keyword holding a V2 document
pub const KEYWORD_V2: &str = "chara";
/// `tEXt` keyword holding a V3 document
pub const KEYWORD_V3: &str = "ccv3";

/// A character card: an image plus the document embedded in it
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    image: Png,
    pub sheet: Option<Sheet>,
}

impl Card {
    /// Wrap an image and a document. Any card chunks already present in the
    /// image are dropped.
    pub fn new(mut image: Png, sheet: Option<Sheet>) -> Self {
        image.remove_text(KEYWORD_V3);
        image.remove_text(KEYWORD_V2);
        Self { image, sheet }
    }

    /// Decode a card from PNG bytes, preferring the newest embedded version
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let image = Png::parse(bytes)?;
        let payload = image
            .text(KEYWORD_V3)
            .or_else(|| image.text(KEYWORD_V2))
            .ok_or(CodecError::MissingCard)?;

        let json = STANDARD.decode(payload.trim_ascii())?;
        let sheet = Sheet::from_slice(&json)?;
        Ok(Self::new(image, Some(sheet)))
    }

    pub fn read(path: &Path) -> Result<Self, CodecError> {
        let bytes = std::fs::read(path).map_err(|e| CodecError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::decode(&bytes)
    }

    pub fn image(&self) -> &Png {
        &self.image
    }

    /// Verify the embedded document on its own terms
    pub fn validate(&self) -> Result<&Sheet, IntegrityError> {
        let sheet = self.sheet.as_ref().ok_or(IntegrityError::MissingSheet)?;
        sheet.validate()?;
        Ok(sheet)
    }

    pub fn integrity(&self) -> bool {
        self.validate().is_ok()
    }

    /// Encode back into PNG bytes.
    ///
    /// V3 documents are written under both keywords so that V2-only readers
    /// still find them.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        let sheet = self.sheet.as_ref().ok_or(CodecError::MissingCard)?;
        let payload = STANDARD.encode(sheet.to_bytes()?);

        let mut image = self.image.clone();
        if sheet.version() == Some(CardVersion::V3) {
            image.insert_text(KEYWORD_V3, payload.as_bytes());
        }
        image.insert_text(KEYWORD_V2, payload.as_bytes());
        Ok(image.to_bytes())
    }

    pub fn write(&self, path: &Path) -> Result<(), CodecError> {
        let bytes = self.encode()?;
        std::fs::write(path, bytes).map_err(|e| CodecError::WriteFailed {
            path: path.to_path_buf(),
            source: e,
        })
    }
}
