use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Deserialize;
use url::Url;

use super::{Source, SourceId, get_ok, host_in, parse_json, unsupported};
use crate::card::{Card, Metadata};
use crate::error::SourceError;
use crate::http::HttpClient;

const HOSTS: &[&str] = &[
    "chub.ai",
    "www.chub.ai",
    "venus.chub.ai",
    "characterhub.org",
    "www.characterhub.org",
];
const API_URL: &str = "https://gateway.chub.ai/api/characters";
const AVATAR_URL: &str = "https://avatars.charhub.io/avatars";

static CHARACTER_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/characters/(?P<creator>[^/]+)/(?P<slug>[^/]+)/?$").expect("valid regex")
});

#[derive(Debug, Deserialize)]
struct CharacterResponse {
    node: Node,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Node {
    id: u64,
    name: String,
    full_path: String,
    created_at: DateTime<Utc>,
    last_activity_at: DateTime<Utc>,
    #[serde(default)]
    definition: Option<Definition>,
}

#[derive(Debug, Deserialize)]
struct Definition {
    name: String,
}

/// chub.ai / characterhub.org
#[derive(Debug, Clone, Copy, Default)]
pub struct ChubSource;

impl ChubSource {
    fn full_path(url: &Url) -> Option<String> {
        let captures = CHARACTER_PATH.captures(url.path())?;
        Some(format!("{}/{}", &captures["creator"], &captures["slug"]))
    }
}

#[async_trait]
impl Source for ChubSource {
    fn id(&self) -> SourceId {
        SourceId::ChubAi
    }

    fn base_url(&self) -> &'static str {
        "https://chub.ai"
    }

    fn matches(&self, url: &Url) -> bool {
        host_in(url, HOSTS) && CHARACTER_PATH.is_match(url.path())
    }

    async fn fetch(
        &self,
        client: &dyn HttpClient,
        url: &Url,
    ) -> Result<(Metadata, Card), SourceError> {
        let path = Self::full_path(url).ok_or_else(|| unsupported(url, self.id()))?;

        let api_url = format!("{API_URL}/{path}?full=true");
        tracing::debug!(url = %url, api = %api_url, "Fetching chub metadata");
        let body = get_ok(client, &api_url).await?;
        let node = parse_json::<CharacterResponse>(&api_url, &body)?.node;

        let card_url = format!("{AVATAR_URL}/{}/chara_card_v2.png", node.full_path);
        let card = Card::decode(&get_ok(client, &card_url).await?)?;

        let nickname = node
            .full_path
            .split('/')
            .next()
            .unwrap_or_default()
            .to_string();
        let name = node
            .definition
            .map(|d| d.name)
            .unwrap_or_else(|| node.name.clone());

        let metadata = Metadata {
            source: self.id(),
            platform_id: node.full_path,
            character_id: node.id.to_string(),
            title: node.name,
            name,
            nickname,
            create_time: node.created_at,
            update_time: node.last_activity_at,
        };
        Ok((metadata, card))
    }
}
