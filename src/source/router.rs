use std::sync::Arc;

use url::Url;

use super::{
    CharacterTavernSource, ChubSource, FetchTask, IntegrationStatus, PygmalionSource, Source,
    SourceId,
};
use crate::credential::CredentialProvider;
use crate::error::CredentialError;
use crate::http::HttpClient;

/// Input URLs split into runnable tasks and URLs no source accepts
#[derive(Debug, Default)]
pub struct Classification {
    /// Tasks in input order
    pub tasks: Vec<FetchTask>,
    /// Unmatched URLs in input order
    pub invalid: Vec<String>,
}

/// Immutable, ordered set of sources and the client they share
pub struct Router {
    client: Arc<dyn HttpClient>,
    sources: Vec<Arc<dyn Source>>,
}

impl Router {
    /// Sources are tried in the given order; the first match wins
    pub fn new(client: Arc<dyn HttpClient>, sources: Vec<Arc<dyn Source>>) -> Self {
        Self { client, sources }
    }

    pub fn sources(&self) -> impl Iterator<Item = &dyn Source> {
        self.sources.iter().map(|s| s.as_ref())
    }

    pub fn source_ids(&self) -> Vec<SourceId> {
        self.sources.iter().map(|s| s.id()).collect()
    }

    /// Find the source for a raw URL string
    pub fn route(&self, raw: &str) -> Option<(Url, &Arc<dyn Source>)> {
        let url = Url::parse(raw.trim()).ok()?;
        if !matches!(url.scheme(), "http" | "https") {
            return None;
        }
        let source = self.sources.iter().find(|s| s.matches(&url))?;
        Some((url, source))
    }

    pub fn task_for(&self, raw: &str) -> Option<FetchTask> {
        let (url, source) = self.route(raw)?;
        Some(FetchTask {
            original_url: raw.to_string(),
            url,
            source: Arc::clone(source),
            client: Arc::clone(&self.client),
        })
    }

    /// Build one task per URL a source accepts; everything else is invalid
    pub fn classify<S: AsRef<str>>(&self, urls: &[S]) -> Classification {
        let mut classification = Classification::default();
        for raw in urls {
            let raw = raw.as_ref();
            match self.task_for(raw) {
                Some(task) => classification.tasks.push(task),
                None => {
                    tracing::debug!(url = raw, "No source matches URL");
                    classification.invalid.push(raw.to_string());
                }
            }
        }
        classification
    }

    /// Probe one source. Never affects fetching.
    pub async fn check_integration(&self, id: SourceId) -> IntegrationStatus {
        match self.sources.iter().find(|s| s.id() == id) {
            Some(source) => source.check_integration(self.client.as_ref()).await,
            None => IntegrationStatus::Unavailable {
                reason: "not registered".to_string(),
            },
        }
    }
}

/// A source left out of the registry at startup
#[derive(Debug, Clone)]
pub struct SkippedSource {
    pub id: SourceId,
    pub reason: CredentialError,
}

/// Build the standard registry.
///
/// Pygmalion needs an account; when the provider has no credential the
/// source is skipped for the whole run and reported back to the caller.
pub fn default_router(
    client: Arc<dyn HttpClient>,
    pygmalion_credentials: Arc<dyn CredentialProvider>,
) -> (Router, Vec<SkippedSource>) {
    let mut sources: Vec<Arc<dyn Source>> =
        vec![Arc::new(ChubSource), Arc::new(CharacterTavernSource)];
    let mut skipped = Vec::new();

    match pygmalion_credentials.get() {
        Ok(_) => sources.push(Arc::new(PygmalionSource::new(pygmalion_credentials))),
        Err(reason) => {
            tracing::warn!(source = %SourceId::Pygmalion, %reason, "Source skipped");
            skipped.push(SkippedSource {
                id: SourceId::Pygmalion,
                reason,
            });
        }
    }

    (Router::new(client, sources), skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::{EnvCredentials, Identity};
    use crate::test_support::{MockHttpClient, StubSource};

    fn router() -> Router {
        Router::new(
            Arc::new(MockHttpClient::new()),
            vec![
                Arc::new(StubSource::new(SourceId::ChubAi, "a.example")),
                Arc::new(StubSource::new(SourceId::CharacterTavern, "b.example")),
            ],
        )
    }

    #[test]
    fn classify_preserves_order_within_buckets() {
        let urls = [
            "https://a.example/1",
            "not a url",
            "https://b.example/2",
            "https://c.example/3",
            "https://a.example/4",
        ];
        let classification = router().classify(&urls);

        let task_urls: Vec<_> = classification
            .tasks
            .iter()
            .map(|t| t.original_url())
            .collect();
        assert_eq!(
            task_urls,
            vec![
                "https://a.example/1",
                "https://b.example/2",
                "https://a.example/4"
            ]
        );
        assert_eq!(
            classification.invalid,
            vec!["not a url", "https://c.example/3"]
        );
    }

    #[test]
    fn first_matching_source_wins() {
        let router = Router::new(
            Arc::new(MockHttpClient::new()),
            vec![
                Arc::new(StubSource::new(SourceId::CharacterTavern, "a.example")),
                Arc::new(StubSource::new(SourceId::ChubAi, "a.example")),
            ],
        );
        let task = router.task_for("https://a.example/x").unwrap();
        assert_eq!(task.source_id(), SourceId::CharacterTavern);
    }

    #[test]
    fn duplicates_are_kept() {
        let urls = ["https://a.example/1", "https://a.example/1"];
        assert_eq!(router().classify(&urls).tasks.len(), 2);
    }

    #[test]
    fn non_http_schemes_are_invalid() {
        let classification = router().classify(&["ftp://a.example/1"]);
        assert!(classification.tasks.is_empty());
        assert_eq!(classification.invalid.len(), 1);
    }

    #[test]
    fn original_url_is_kept_verbatim() {
        let task = router().task_for("  https://a.example/1 ").unwrap();
        assert_eq!(task.original_url(), "  https://a.example/1 ");
    }

    #[tokio::test]
    async fn unregistered_source_is_unavailable() {
        let status = router().check_integration(SourceId::Pygmalion).await;
        assert!(!status.is_available());
    }

    #[test]
    fn default_router_skips_pygmalion_without_credentials() {
        let (router, skipped) = default_router(
            Arc::new(MockHttpClient::new()),
            Arc::new(EnvCredentials::with_lookup("pygmalion", |_| None)),
        );

        assert_eq!(
            router.source_ids(),
            vec![SourceId::ChubAi, SourceId::CharacterTavern]
        );
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].id, SourceId::Pygmalion);
        assert!(
            router
                .classify(&["https://pygmalion.chat/character/0b6f2a54-8a4e-4d84-9a3b-1d2c3e4f5a6b"])
                .tasks
                .is_empty()
        );
    }

    #[test]
    fn default_router_registers_pygmalion_with_credentials() {
        let identity = Identity {
            username: "u".to_string(),
            password: "p".to_string(),
        };
        let (router, skipped) = default_router(Arc::new(MockHttpClient::new()), Arc::new(identity));

        assert!(skipped.is_empty());
        assert_eq!(
            router.source_ids(),
            vec![
                SourceId::ChubAi,
                SourceId::CharacterTavern,
                SourceId::Pygmalion
            ]
        );
    }
}
