use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when compiling a file name template
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Unknown token '{key}' in format '{format}'")]
    UnknownToken { key: String, format: String },
}

/// Errors that can occur when reading or writing the PNG card container
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Not a PNG file (bad signature)")]
    NotPng,

    #[error("PNG data ends in the middle of a chunk")]
    Truncated,

    #[error("Checksum mismatch in '{chunk}' chunk")]
    ChecksumMismatch { chunk: String },

    #[error("No embedded card document found")]
    MissingCard,

    #[error("Card document is missing the 'data' object")]
    MissingData,

    #[error("Embedded card is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Card document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to read {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur when reading credentials
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("Missing credential: {var} is not set")]
    Missing { var: String },
}

/// Errors raised by a source while fetching a card
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("HTTP request failed for {url}: {source}")]
    HttpFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP error {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Unexpected response from {url}: {reason}")]
    InvalidResponse { url: String, reason: String },

    #[error("URL {url} is not a {source_id} character page")]
    UnsupportedUrl { url: String, source_id: String },

    #[error("Card decode failed: {0}")]
    Codec(#[from] CodecError),

    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),
}

/// A fetched card that did not pass verification
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntegrityError {
    #[error("Card has no embedded document")]
    MissingSheet,

    #[error("Card document is malformed: {reason}")]
    MalformedSheet { reason: String },

    #[error("Metadata has no platform id")]
    MissingPlatformId,

    #[error("Metadata name '{metadata_name}' does not match card name '{sheet_name}'")]
    Inconsistent {
        metadata_name: String,
        sheet_name: String,
    },
}

/// Errors that can occur while writing a verified card to disk
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("Failed to encode card: {0}")]
    Encode(#[source] CodecError),

    #[error("Failed to write file {path}: {source}")]
    FileWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Coarse classification of a failed fetch task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Transport, status or decode failure inside the source
    Task,
    /// The card or its metadata did not verify
    Integrity,
    /// Encoding or writing the output file failed
    Write,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            FailureKind::Task => "task",
            FailureKind::Integrity => "integrity",
            FailureKind::Write => "write",
        })
    }
}

/// Per-URL failure; always absorbed into the failed bucket
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("{0}")]
    Fetch(#[from] SourceError),

    #[error("Integrity check failed: {0}")]
    Integrity(#[from] IntegrityError),

    #[error("{0}")]
    Write(#[from] WriteError),
}

impl TaskError {
    pub fn kind(&self) -> FailureKind {
        match self {
            TaskError::Fetch(_) => FailureKind::Task,
            TaskError::Integrity(_) => FailureKind::Integrity,
            TaskError::Write(_) => FailureKind::Write,
        }
    }
}

/// Pre-flight errors that abort a whole fetch batch
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Output directory '{0}' doesn't exist")]
    OutputDirNotFound(PathBuf),

    #[error("Failed to determine current directory: {0}")]
    CurrentDir(#[source] std::io::Error),

    #[error("Invalid name format: {0}")]
    Template(#[from] TemplateError),
}
