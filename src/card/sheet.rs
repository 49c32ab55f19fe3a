// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CodecError, IntegrityError};

pub const SPEC_V2: &str = "chara_card_v2";
pub const SPEC_V3: &str = "chara_card_v3";

/// Card format version, as declared by the document's `spec` field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardVersion {
    V2,
    V3,
}

/// The character document embedded in a card
///
/// Only the fields needed for verification are typed; everything else is
/// carried through untouched in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    #[serde(default)]
    pub spec: String,
    #[serde(default)]
    pub spec_version: String,
    pub data: SheetData,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetData {
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Options for serializing a sheet to JSON
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonOptions {
    /// Indent with four spaces
    pub pretty: bool,
    /// Sort object keys recursively
    pub stable: bool,
}

impl Sheet {
    /// Build a V2 sheet around a `data` object
    pub fn v2(data: SheetData) -> Self {
        Self {
            spec: SPEC_V2.to_string(),
            spec_version: "2.0".to_string(),
            data,
            extra: Map::new(),
        }
    }

    /// Parse a card document.
    ///
    /// Legacy documents without a `spec` field keep their fields at the top
    /// level; those are wrapped into a V2 document.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CodecError> {
        let value: Value = serde_json::from_slice(bytes)?;

        let is_legacy = value.as_object().is_some_and(|obj| !obj.contains_key("spec"));
        if is_legacy {
            let data: SheetData = serde_json::from_value(value)?;
            return Ok(Self::v2(data));
        }

        if value.get("data").is_none() {
            return Err(CodecError::MissingData);
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Read a card document from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, CodecError> {
        let bytes = std::fs::read(path).map_err(|e| CodecError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_slice(&bytes)
    }

    pub fn version(&self) -> Option<CardVersion> {
        match self.spec.as_str() {
            SPEC_V2 => Some(CardVersion::V2),
            SPEC_V3 => Some(CardVersion::V3),
            _ => None,
        }
    }

    /// Check the document's own structure, independent of any metadata
    pub fn validate(&self) -> Result<(), IntegrityError> {
        if self.version().is_none() {
            return Err(IntegrityError::MalformedSheet {
                reason: format!("unsupported spec '{}'", self.spec),
            });
        }
        if self.spec_version.trim().is_empty() {
            return Err(IntegrityError::MalformedSheet {
                reason: "missing spec_version".to_string(),
            });
        }
        if self.data.name.trim().is_empty() {
            return Err(IntegrityError::MalformedSheet {
                reason: "character name is blank".to_string(),
            });
        }
        Ok(())
    }

    /// Compact JSON, as embedded in card files
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn to_json(&self, options: JsonOptions) -> Result<Vec<u8>, serde_json::Error> {
        let mut value = serde_json::to_value(self)?;
        if options.stable {
            value.sort_all_objects();
        }

        if !options.pretty {
            return serde_json::to_vec(&value);
        }

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        value.serialize(&mut serializer)?;
        Ok(buf)
    }

    pub fn to_file(&self, path: &Path, options: JsonOptions) -> Result<(), CodecError> {
        let json = self.to_json(options)?;
        std::fs::write(path, json).map_err(|e| CodecError::WriteFailed {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

impl SheetData {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extra: Map::new(),
        }
    }
}
