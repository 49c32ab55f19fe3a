// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod character_tavern;
mod chub;
mod pygmalion;
mod router;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use url::Url;

use crate::card::{Card, Metadata};
use crate::error::SourceError;
use crate::http::{HttpClient, HttpResponse};

pub use character_tavern::CharacterTavernSource;
pub use chub::ChubSource;
pub use pygmalion::PygmalionSource;
pub use router::{Classification, Router, SkippedSource, default_router};

/// Identifies the platform a card came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceId {
    ChubAi,
    CharacterTavern,
    Pygmalion,
}

impl SourceId {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceId::ChubAi => "chub",
            SourceId::CharacterTavern => "character_tavern",
            SourceId::Pygmalion => "pygmalion",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a source availability probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrationStatus {
    Available,
    Unavailable { reason: String },
}

impl IntegrationStatus {
    pub fn is_available(&self) -> bool {
        matches!(self, IntegrationStatus::Available)
    }
}

impl fmt::Display for IntegrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrationStatus::Available => f.write_str("OK"),
            IntegrationStatus::Unavailable { reason } => write!(f, "UNAVAILABLE ({reason})"),
        }
    }
}

/// One fetch strategy per external platform
#[async_trait]
pub trait Source: Send + Sync {
    fn id(&self) -> SourceId;

    /// Public home page of the platform
    fn base_url(&self) -> &'static str;

    /// Whether the URL points at a character page of this platform
    fn matches(&self, url: &Url) -> bool;

    /// Fetch the platform metadata and the card for a matching URL
    async fn fetch(&self, client: &dyn HttpClient, url: &Url)
    -> Result<(Metadata, Card), SourceError>;

    /// Lightweight reachability probe, independent of any card
    async fn check_integration(&self, client: &dyn HttpClient) -> IntegrationStatus {
        match client.get(self.base_url()).await {
            Ok(response) if response.status < 400 => IntegrationStatus::Available,
            Ok(response) => IntegrationStatus::Unavailable {
                reason: format!("HTTP {}", response.status),
            },
            Err(e) => IntegrationStatus::Unavailable {
                reason: e.to_string(),
            },
        }
    }
}

/// A unit of work bound to one URL and the source that matched it
#[derive(Clone)]
pub struct FetchTask {
    original_url: String,
    url: Url,
    source: Arc<dyn Source>,
    client: Arc<dyn HttpClient>,
}

impl FetchTask {
    pub fn original_url(&self) -> &str {
        &self.original_url
    }

    pub fn source_id(&self) -> SourceId {
        self.source.id()
    }

    /// Fetch metadata and card. Every call goes to the network again.
    pub async fn fetch_all(&self) -> Result<(Metadata, Card), SourceError> {
        self.source.fetch(self.client.as_ref(), &self.url).await
    }
}

impl fmt::Debug for FetchTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchTask")
            .field("url", &self.original_url)
            .field("source", &self.source.id())
            .finish()
    }
}

/// GET a URL and fail on any non-2xx status
async fn get_ok(client: &dyn HttpClient, url: &str) -> Result<Bytes, SourceError> {
    ok_body(url, client.get(url).await)
}

fn ok_body(
    url: &str,
    response: Result<HttpResponse, reqwest::Error>,
) -> Result<Bytes, SourceError> {
    let response = response.map_err(|e| SourceError::HttpFailed {
        url: url.to_string(),
        source: e,
    })?;
    if !response.is_success() {
        return Err(SourceError::HttpStatus {
            url: url.to_string(),
            status: response.status,
        });
    }
    Ok(response.body)
}

fn parse_json<T: DeserializeOwned>(url: &str, body: &[u8]) -> Result<T, SourceError> {
    serde_json::from_slice(body).map_err(|e| SourceError::InvalidResponse {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

fn host_in(url: &Url, hosts: &[&str]) -> bool {
    url.host_str()
        .is_some_and(|host| hosts.iter().any(|h| host.eq_ignore_ascii_case(h)))
}

fn unsupported(url: &Url, id: SourceId) -> SourceError {
    SourceError::UnsupportedUrl {
        url: url.to_string(),
        source_id: id.to_string(),
    }
}
