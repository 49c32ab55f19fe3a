// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Chunk-level PNG reader/writer.
//!
//! Pixel data is never decoded; chunks are carried through byte for byte so
//! that only the text chunks holding the card document change.

use std::path::Path;

use crate::error::CodecError;

/// File extension of card files, including the dot
pub const PNG_EXTENSION: &str = ".png";

const SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];
const TEXT: [u8; 4] = *b"tEXt";
const IEND: [u8; 4] = *b"IEND";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub kind: [u8; 4],
    pub data: Vec<u8>,
}

impl Chunk {
    pub fn new(kind: [u8; 4], data: Vec<u8>) -> Self {
        Self { kind, data }
    }

    /// A `tEXt` chunk: keyword, NUL separator, value
    pub fn text(keyword: &str, value: &[u8]) -> Self {
        let mut data = Vec::with_capacity(keyword.len() + 1 + value.len());
        data.extend_from_slice(keyword.as_bytes());
        data.push(0);
        data.extend_from_slice(value);
        Self::new(TEXT, data)
    }

    /// Keyword and value if this is a `tEXt` chunk
    pub fn text_entry(&self) -> Option<(&[u8], &[u8])> {
        if self.kind != TEXT {
            return None;
        }
        let nul = self.data.iter().position(|&b| b == 0)?;
        Some((&self.data[..nul], &self.data[nul + 1..]))
    }

    fn is_text(&self, keyword: &str) -> bool {
        self.text_entry()
            .is_some_and(|(key, _)| key.eq_ignore_ascii_case(keyword.as_bytes()))
    }

    fn crc(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&self.kind);
        hasher.update(&self.data);
        hasher.finalize()
    }

    fn name(&self) -> String {
        String::from_utf8_lossy(&self.kind).into_owned()
    }
}

/// A PNG file as an ordered list of chunks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Png {
    chunks: Vec<Chunk>,
}

impl Png {
    pub fn from_chunks(chunks: Vec<Chunk>) -> Self {
        Self { chunks }
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Parse PNG bytes, verifying every chunk checksum.
    ///
    /// Anything after `IEND` is ignored.
    pub fn parse(bytes: &[u8]) -> Result<Self, CodecError> {
        if !bytes.starts_with(&SIGNATURE) {
            return Err(CodecError::NotPng);
        }

        let mut chunks = Vec::new();
        let mut pos = SIGNATURE.len();

        while pos < bytes.len() {
            let header = bytes.get(pos..pos + 8).ok_or(CodecError::Truncated)?;
            let len = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
            let kind = [header[4], header[5], header[6], header[7]];

            let data_start = pos + 8;
            let data_end = data_start.checked_add(len).ok_or(CodecError::Truncated)?;
            let data = bytes
                .get(data_start..data_end)
                .ok_or(CodecError::Truncated)?
                .to_vec();
            let crc = bytes
                .get(data_end..data_end + 4)
                .ok_or(CodecError::Truncated)?;
            let crc = u32::from_be_bytes([crc[0], crc[1], crc[2], crc[3]]);

            let chunk = Chunk::new(kind, data);
            if chunk.crc() != crc {
                return Err(CodecError::ChecksumMismatch {
                    chunk: chunk.name(),
                });
            }

            pos = data_end + 4;
            let is_end = chunk.kind == IEND;
            chunks.push(chunk);
            if is_end {
                break;
            }
        }

        Ok(Self { chunks })
    }

    pub fn read(path: &Path) -> Result<Self, CodecError> {
        let bytes = std::fs::read(path).map_err(|e| CodecError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&bytes)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let size: usize = self.chunks.iter().map(|c| c.data.len() + 12).sum();
        let mut out = Vec::with_capacity(SIGNATURE.len() + size);
        out.extend_from_slice(&SIGNATURE);
        for chunk in &self.chunks {
            out.extend_from_slice(&(chunk.data.len() as u32).to_be_bytes());
            out.extend_from_slice(&chunk.kind);
            out.extend_from_slice(&chunk.data);
            out.extend_from_slice(&chunk.crc().to_be_bytes());
        }
        out
    }

    /// Value of the last `tEXt` chunk with this keyword (case-insensitive)
    pub fn text(&self, keyword: &str) -> Option<&[u8]> {
        self.chunks
            .iter()
            .rev()
            .filter(|c| c.is_text(keyword))
            .find_map(|c| c.text_entry().map(|(_, value)| value))
    }

    pub fn remove_text(&mut self, keyword: &str) {
        self.chunks.retain(|c| !c.is_text(keyword));
    }

    /// Append a `tEXt` chunk just before `IEND` (or at the end if there is none)
    pub fn insert_text(&mut self, keyword: &str, value: &[u8]) {
        let at = self
            .chunks
            .iter()
            .position(|c| c.kind == IEND)
            .unwrap_or(self.chunks.len());
        self.chunks.insert(at, Chunk::text(keyword, value));
    }
}
