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

const HOSTS: &[&str] = &["character-tavern.com", "www.character-tavern.com"];
const API_URL: &str = "https://character-tavern.com/api/character";
const CARDS_URL: &str = "https://cards.character-tavern.com";

static CHARACTER_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/character/(?P<creator>[^/]+)/(?P<slug>[^/]+)/?$").expect("valid regex")
});

#[derive(Debug, Deserialize)]
struct CharacterResponse {
    card: CardInfo,
}

// Timestamps are Unix milliseconds
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CardInfo {
    id: String,
    name: String,
    in_chat_name: String,
    path: String,
    author: String,
    created_at: i64,
    last_update_at: i64,
}

fn from_millis(url: &str, millis: i64) -> Result<DateTime<Utc>, SourceError> {
    DateTime::from_timestamp_millis(millis).ok_or_else(|| SourceError::InvalidResponse {
        url: url.to_string(),
        reason: format!("timestamp {millis} out of range"),
    })
}

/// character-tavern.com
#[derive(Debug, Clone, Copy, Default)]
pub struct CharacterTavernSource;

#[async_trait]
impl Source for CharacterTavernSource {
    fn id(&self) -> SourceId {
        SourceId::CharacterTavern
    }

    fn base_url(&self) -> &'static str {
        "https://character-tavern.com"
    }

    fn matches(&self, url: &Url) -> bool {
        host_in(url, HOSTS) && CHARACTER_PATH.is_match(url.path())
    }

    async fn fetch(
        &self,
        client: &dyn HttpClient,
        url: &Url,
    ) -> Result<(Metadata, Card), SourceError> {
        let api_url = CHARACTER_PATH
            .captures(url.path())
            .map(|c| format!("{API_URL}/{}/{}", &c["creator"], &c["slug"]))
            .ok_or_else(|| unsupported(url, self.id()))?;

        tracing::debug!(url = %url, api = %api_url, "Fetching character tavern metadata");
        let body = get_ok(client, &api_url).await?;
        let info = parse_json::<CharacterResponse>(&api_url, &body)?.card;

        let card_url = format!("{CARDS_URL}/{}.png", info.path);
        let card = Card::decode(&get_ok(client, &card_url).await?)?;

        let metadata = Metadata {
            source: self.id(),
            create_time: from_millis(&api_url, info.created_at)?,
            update_time: from_millis(&api_url, info.last_update_at)?,
            platform_id: info.path,
            character_id: info.id,
            title: info.name,
            name: info.in_chat_name,
            nickname: info.author,
        };
        Ok((metadata, card))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockHttpClient, card_png, sheet_named};

    const API: &str = "https://character-tavern.com/api/character/bob/knight";
    const PNG: &str = "https://cards.character-tavern.com/bob/knight.png";
    const PAGE: &str = "https://character-tavern.com/character/bob/knight";

    fn response(created_at: i64) -> String {
        format!(
            r#"{{"card": {{
                "id": "ct-77",
                "name": "The Knight",
                "inChatName": "Sir Reginald",
                "path": "bob/knight",
                "author": "bob",
                "createdAt": {created_at},
                "lastUpdateAt": 1706776200000
            }}}}"#
        )
    }

    #[test]
    fn matches_character_pages() {
        let source = CharacterTavernSource;
        assert!(source.matches(&Url::parse(PAGE).unwrap()));
        assert!(source.matches(&Url::parse("https://www.character-tavern.com/character/bob/knight/").unwrap()));
        assert!(!source.matches(&Url::parse("https://character-tavern.com/character/bob").unwrap()));
        assert!(!source.matches(&Url::parse("https://chub.ai/character/bob/knight").unwrap()));
    }

    #[tokio::test]
    async fn fetch_builds_metadata_and_card() {
        let client = MockHttpClient::new()
            .route(API, 200, response(1705320000000))
            .route(PNG, 200, card_png(&sheet_named("Sir Reginald")));

        let (metadata, card) = CharacterTavernSource
            .fetch(&client, &Url::parse(PAGE).unwrap())
            .await
            .unwrap();

        assert_eq!(metadata.source, SourceId::CharacterTavern);
        assert_eq!(metadata.platform_id, "bob/knight");
        assert_eq!(metadata.character_id, "ct-77");
        assert_eq!(metadata.title, "The Knight");
        assert_eq!(metadata.name, "Sir Reginald");
        assert_eq!(metadata.nickname, "bob");
        assert_eq!(metadata.create_time.timestamp(), 1705320000);
        assert_eq!(metadata.update_time.timestamp(), 1706776200);
        assert!(metadata.is_consistent_with(card.sheet.as_ref().unwrap()));
    }

    #[tokio::test]
    async fn out_of_range_timestamp_is_invalid() {
        let client = MockHttpClient::new()
            .route(API, 200, response(i64::MAX))
            .route(PNG, 200, card_png(&sheet_named("Sir Reginald")));

        let result = CharacterTavernSource
            .fetch(&client, &Url::parse(PAGE).unwrap())
            .await;
        assert!(matches!(result, Err(SourceError::InvalidResponse { .. })));
    }

    #[tokio::test]
    async fn api_error_status_fails() {
        let client = MockHttpClient::new().route(API, 500, "");
        let result = CharacterTavernSource
            .fetch(&client, &Url::parse(PAGE).unwrap())
            .await;
        assert!(matches!(result, Err(SourceError::HttpStatus { status: 500, .. })));
    }
}
