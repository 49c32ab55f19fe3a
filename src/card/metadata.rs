use chrono::{DateTime, Utc};

use crate::card::Sheet;
use crate::error::IntegrityError;
use crate::source::SourceId;

/// Descriptive record about a fetched card, as reported by its platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub source: SourceId,
    /// Platform-specific unique identifier of the card
    pub platform_id: String,
    pub character_id: String,
    pub title: String,
    /// Character name
    pub name: String,
    /// Creator nickname
    pub nickname: String,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

impl Metadata {
    /// Cross-check against the document decoded from the card itself
    pub fn check_consistency(&self, sheet: &Sheet) -> Result<(), IntegrityError> {
        if self.platform_id.trim().is_empty() {
            return Err(IntegrityError::MissingPlatformId);
        }

        let metadata_name = self.name.trim();
        let sheet_name = sheet.data.name.trim();
        if metadata_name != sheet_name {
            return Err(IntegrityError::Inconsistent {
                metadata_name: metadata_name.to_string(),
                sheet_name: sheet_name.to_string(),
            });
        }
        Ok(())
    }

    pub fn is_consistent_with(&self, sheet: &Sheet) -> bool {
        self.check_consistency(sheet).is_ok()
    }
}
