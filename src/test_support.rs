//! Fixtures shared by the unit tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use chrono::{TimeZone, Utc};
use url::Url;

use crate::card::{Card, Chunk, KEYWORD_V2, Metadata, Png, Sheet, SheetData};
use crate::error::SourceError;
use crate::http::{HttpClient, HttpResponse};
use crate::source::{Source, SourceId};

/// 1x1 PNG skeleton; pixel data is never decoded so IDAT is filler
pub fn blank_png() -> Png {
    let ihdr = vec![0, 0, 0, 1, 0, 0, 0, 1, 8, 6, 0, 0, 0];
    Png::from_chunks(vec![
        Chunk::new(*b"IHDR", ihdr),
        Chunk::new(*b"IDAT", vec![0x78, 0x9c, 0x62, 0x00, 0x01, 0x00, 0x00, 0xff, 0xff, 0x03]),
        Chunk::new(*b"IEND", Vec::new()),
    ])
}

pub fn card_png(sheet: &Sheet) -> Vec<u8> {
    let mut png = blank_png();
    png.insert_text(KEYWORD_V2, STANDARD.encode(sheet.to_bytes().unwrap()).as_bytes());
    png.to_bytes()
}

pub fn sheet_named(name: &str) -> Sheet {
    Sheet::v2(SheetData::named(name))
}

pub fn metadata_for(source: SourceId, platform_id: &str, name: &str) -> Metadata {
    Metadata {
        source,
        platform_id: platform_id.to_string(),
        character_id: format!("char-{platform_id}"),
        title: format!("Title of {name}"),
        name: name.to_string(),
        nickname: "creator".to_string(),
        create_time: Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap(),
        update_time: Utc.with_ymd_and_hms(2024, 2, 1, 8, 30, 0).unwrap(),
    }
}

/// HTTP client answering from a fixed routing table; unknown URLs get 404
#[derive(Clone, Default)]
pub struct MockHttpClient {
    routes: HashMap<String, (u16, Bytes)>,
}

impl MockHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, url: &str, status: u16, body: impl Into<Bytes>) -> Self {
        self.routes.insert(format!("GET {url}"), (status, body.into()));
        self
    }

    pub fn post_route(mut self, url: &str, status: u16, body: impl Into<Bytes>) -> Self {
        self.routes.insert(format!("POST {url}"), (status, body.into()));
        self
    }

    /// Route that only answers when called with this bearer token
    pub fn authorized_route(
        mut self,
        url: &str,
        token: &str,
        status: u16,
        body: impl Into<Bytes>,
    ) -> Self {
        self.routes
            .insert(format!("GET {url} {token}"), (status, body.into()));
        self
    }

    fn answer(&self, key: &str) -> HttpResponse {
        match self.routes.get(key) {
            Some((status, body)) => HttpResponse {
                status: *status,
                body: body.clone(),
            },
            None => HttpResponse {
                status: 404,
                body: Bytes::new(),
            },
        }
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn get(&self, url: &str) -> Result<HttpResponse, reqwest::Error> {
        Ok(self.answer(&format!("GET {url}")))
    }

    async fn post_json(
        &self,
        url: &str,
        _body: &serde_json::Value,
        _bearer: Option<&str>,
    ) -> Result<HttpResponse, reqwest::Error> {
        Ok(self.answer(&format!("POST {url}")))
    }

    async fn get_authorized(
        &self,
        url: &str,
        bearer: &str,
    ) -> Result<HttpResponse, reqwest::Error> {
        let key = format!("GET {url} {bearer}");
        if !self.routes.contains_key(&key) {
            return Ok(HttpResponse {
                status: 401,
                body: Bytes::new(),
            });
        }
        Ok(self.answer(&key))
    }
}

/// Source whose behaviour is chosen by the URL path:
///
/// - `/ok/<id>`: consistent card named `<id>`
/// - `/fail`: transport-level failure
/// - `/corrupt`: card whose document has a blank name
/// - `/mismatch`: metadata name differs from the card name
/// - `/nosheet`: card without a document
pub struct StubSource {
    id: SourceId,
    host: &'static str,
    calls: AtomicUsize,
}

impl StubSource {
    pub fn new(id: SourceId, host: &'static str) -> Self {
        Self {
            id,
            host,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Source for StubSource {
    fn id(&self) -> SourceId {
        self.id
    }

    fn base_url(&self) -> &'static str {
        "https://stub.example"
    }

    fn matches(&self, url: &Url) -> bool {
        url.host_str() == Some(self.host)
    }

    async fn fetch(
        &self,
        _client: &dyn HttpClient,
        url: &Url,
    ) -> Result<(Metadata, Card), SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let segments: Vec<&str> = url.path_segments().map(|s| s.collect()).unwrap_or_default();
        match segments.as_slice() {
            ["ok", id] => Ok((
                metadata_for(self.id, id, id),
                Card::new(blank_png(), Some(sheet_named(id))),
            )),
            ["corrupt"] => Ok((
                metadata_for(self.id, "corrupt", ""),
                Card::new(blank_png(), Some(sheet_named(""))),
            )),
            ["mismatch"] => Ok((
                metadata_for(self.id, "mismatch", "Alice"),
                Card::new(blank_png(), Some(sheet_named("Bob"))),
            )),
            ["nosheet"] => Ok((
                metadata_for(self.id, "nosheet", "Alice"),
                Card::new(blank_png(), None),
            )),
            _ => Err(SourceError::HttpStatus {
                url: url.to_string(),
                status: 500,
            }),
        }
    }
}

pub fn stub_source(id: SourceId, host: &'static str) -> Arc<StubSource> {
    Arc::new(StubSource::new(id, host))
}
