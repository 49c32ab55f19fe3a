use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use url::Url;

use super::{Source, SourceId, get_ok, host_in, ok_body, parse_json, unsupported};
use crate::card::{Card, Metadata, Png, Sheet, SheetData};
use crate::credential::CredentialProvider;
use crate::error::SourceError;
use crate::http::HttpClient;

const HOSTS: &[&str] = &["pygmalion.chat", "www.pygmalion.chat"];
const AUTH_URL: &str = "https://auth.pygmalion.chat/session";
const API_URL: &str = "https://server.pygmalion.chat/api/export/character";

static CHARACTER_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^/character/(?P<id>[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12})/?$",
    )
    .expect("valid regex")
});

#[derive(Debug, Deserialize)]
struct SessionResponse {
    result: Session,
}

#[derive(Debug, Deserialize)]
struct Session {
    id_token: String,
}

#[derive(Debug, Deserialize)]
struct CharacterResponse {
    character: Character,
}

// Timestamps are Unix seconds
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Character {
    id: String,
    display_name: String,
    avatar_url: String,
    owner: Owner,
    created_at: i64,
    updated_at: i64,
    personality: Personality,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Owner {
    username: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Personality {
    name: String,
    description: String,
    persona: String,
    scenario: String,
    greeting: String,
    mes_example: String,
    alternate_greetings: Vec<String>,
}

/// pygmalion.chat; exports need a logged-in account
pub struct PygmalionSource {
    credentials: Arc<dyn CredentialProvider>,
}

impl PygmalionSource {
    pub fn new(credentials: Arc<dyn CredentialProvider>) -> Self {
        Self { credentials }
    }

    async fn login(&self, client: &dyn HttpClient) -> Result<String, SourceError> {
        let identity = self.credentials.get()?;
        let body = json!({
            "username": identity.username,
            "password": identity.password,
        });
        let response = ok_body(AUTH_URL, client.post_json(AUTH_URL, &body, None).await)?;
        Ok(parse_json::<SessionResponse>(AUTH_URL, &response)?
            .result
            .id_token)
    }
}

/// Build a V2 document from the exported personality fields
fn sheet_from(character: &Character) -> Sheet {
    let p = &character.personality;
    let mut extra = Map::new();
    extra.insert("description".into(), Value::from(p.description.as_str()));
    extra.insert("personality".into(), Value::from(p.persona.as_str()));
    extra.insert("scenario".into(), Value::from(p.scenario.as_str()));
    extra.insert("first_mes".into(), Value::from(p.greeting.as_str()));
    extra.insert("mes_example".into(), Value::from(p.mes_example.as_str()));
    extra.insert(
        "alternate_greetings".into(),
        Value::from(p.alternate_greetings.clone()),
    );
    extra.insert("creator".into(), Value::from(character.owner.username.as_str()));
    extra.insert("tags".into(), Value::from(character.tags.clone()));

    Sheet::v2(SheetData {
        name: p.name.clone(),
        extra,
    })
}

fn from_seconds(url: &str, seconds: i64) -> Result<DateTime<Utc>, SourceError> {
    DateTime::from_timestamp(seconds, 0).ok_or_else(|| SourceError::InvalidResponse {
        url: url.to_string(),
        reason: format!("timestamp {seconds} out of range"),
    })
}

#[async_trait]
impl Source for PygmalionSource {
    fn id(&self) -> SourceId {
        SourceId::Pygmalion
    }

    fn base_url(&self) -> &'static str {
        "https://pygmalion.chat"
    }

    fn matches(&self, url: &Url) -> bool {
        host_in(url, HOSTS) && CHARACTER_PATH.is_match(url.path())
    }

    async fn fetch(
        &self,
        client: &dyn HttpClient,
        url: &Url,
    ) -> Result<(Metadata, Card), SourceError> {
        let platform_id = CHARACTER_PATH
            .captures(url.path())
            .map(|c| c["id"].to_lowercase())
            .ok_or_else(|| unsupported(url, self.id()))?;

        let token = self.login(client).await?;

        let api_url = format!("{API_URL}/{platform_id}");
        tracing::debug!(url = %url, api = %api_url, "Fetching pygmalion character");
        let body = ok_body(&api_url, client.get_authorized(&api_url, &token).await)?;
        let character = parse_json::<CharacterResponse>(&api_url, &body)?.character;

        let avatar = Png::parse(&get_ok(client, &character.avatar_url).await?)?;
        let card = Card::new(avatar, Some(sheet_from(&character)));

        let metadata = Metadata {
            source: self.id(),
            create_time: from_seconds(&api_url, character.created_at)?,
            update_time: from_seconds(&api_url, character.updated_at)?,
            platform_id,
            character_id: character.id,
            title: character.display_name,
            name: character.personality.name,
            nickname: character.owner.username,
        };
        Ok((metadata, card))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::{EnvCredentials, Identity};
    use crate::test_support::{MockHttpClient, blank_png};

    const ID: &str = "0b6f2a54-8a4e-4d84-9a3b-1d2c3e4f5a6b";
    const AVATAR: &str = "https://assets.pygmalion.chat/avatars/luna.png";

    fn source() -> PygmalionSource {
        PygmalionSource::new(Arc::new(Identity {
            username: "user".to_string(),
            password: "secret".to_string(),
        }))
    }

    fn page() -> Url {
        Url::parse(&format!("https://pygmalion.chat/character/{ID}")).unwrap()
    }

    fn character_json() -> String {
        json!({
            "character": {
                "id": "version-9",
                "displayName": "Luna the Astronomer",
                "avatarUrl": AVATAR,
                "owner": { "username": "stargazer" },
                "createdAt": 1705320000,
                "updatedAt": 1706776200,
                "personality": {
                    "name": "Luna",
                    "persona": "Curious",
                    "greeting": "Hello!",
                    "alternateGreetings": ["Hi"]
                },
                "tags": ["space"]
            }
        })
        .to_string()
    }

    fn client() -> MockHttpClient {
        MockHttpClient::new()
            .post_route(AUTH_URL, 200, r#"{"result": {"id_token": "tok-1"}}"#)
            .authorized_route(&format!("{API_URL}/{ID}"), "tok-1", 200, character_json())
            .route(AVATAR, 200, blank_png().to_bytes())
    }

    #[test]
    fn matches_uuid_character_pages_only() {
        let source = source();
        assert!(source.matches(&page()));
        assert!(!source.matches(&Url::parse("https://pygmalion.chat/character/luna").unwrap()));
        assert!(!source.matches(&Url::parse("https://pygmalion.chat/profile/x").unwrap()));
    }

    #[tokio::test]
    async fn fetch_builds_card_from_export() {
        let (metadata, card) = source().fetch(&client(), &page()).await.unwrap();

        assert_eq!(metadata.source, SourceId::Pygmalion);
        assert_eq!(metadata.platform_id, ID);
        assert_eq!(metadata.character_id, "version-9");
        assert_eq!(metadata.title, "Luna the Astronomer");
        assert_eq!(metadata.nickname, "stargazer");
        assert_eq!(metadata.update_time.timestamp(), 1706776200);

        let sheet = card.sheet.as_ref().unwrap();
        assert_eq!(sheet.data.name, "Luna");
        assert_eq!(sheet.data.extra["first_mes"], "Hello!");
        assert_eq!(sheet.data.extra["personality"], "Curious");
        assert_eq!(sheet.data.extra["creator"], "stargazer");
        assert!(card.integrity());
        assert!(metadata.is_consistent_with(sheet));
    }

    #[tokio::test]
    async fn rejected_login_fails_the_task() {
        let client = MockHttpClient::new().post_route(AUTH_URL, 401, "");
        let result = source().fetch(&client, &page()).await;
        assert!(matches!(result, Err(SourceError::HttpStatus { status: 401, .. })));
    }

    #[tokio::test]
    async fn missing_credentials_fail_the_task() {
        let source = PygmalionSource::new(Arc::new(EnvCredentials::with_lookup("pygmalion", |_| None)));
        let result = source.fetch(&client(), &page()).await;
        assert!(matches!(result, Err(SourceError::Credential(_))));
    }

    #[tokio::test]
    async fn avatar_that_is_not_png_fails() {
        let client = client().route(AVATAR, 200, "<html>");
        let result = source().fetch(&client, &page()).await;
        assert!(matches!(result, Err(SourceError::Codec(_))));
    }
}
