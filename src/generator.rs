use std::sync::Arc;

use thiserror::Error;
use url::Url;

use crate::config::{Config, ConfigError};
use crate::content::{ArticleFetcher, ScraperExtractor};
use crate::feed::{Channel, FeedRenderer, ListReconciler, ReconcileError, RenderError};
use crate::remote::{AuthError, HttpTransport, SessionManager, TransportError};
use crate::storage::ArticleCache;

/// Failures that abort a generation cycle. No document is produced.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to build HTTP client: {0}")]
    Transport(#[from] TransportError),

    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Reconciliation failed: {0}")]
    Reconcile(#[from] ReconcileError),

    #[error("Rendering failed: {0}")]
    Render(#[from] RenderError),
}

/// One configured pipeline: session, reconciliation, article fan-out, render.
///
/// Build it once per process and call [`FeedGenerator::generate`] for every
/// request. The session and the article cache live as long as the generator,
/// so warm calls skip the login and refetch only articles not seen before.
pub struct FeedGenerator {
    sessions: SessionManager,
    reconciler: ListReconciler,
    fetcher: ArticleFetcher,
    renderer: FeedRenderer,
}

impl FeedGenerator {
    pub fn new(config: &Config, cache: ArticleCache) -> Result<Self, GenerateError> {
        config.validate()?;

        let transport = HttpTransport::new(config)?;
        let extractor = Arc::new(ScraperExtractor::new());
        let export_url = config
            .export_url
            .as_deref()
            .map(Url::parse)
            .transpose()
            .map_err(|e| ConfigError::Invalid(format!("export_url: {e}")))?;

        Ok(Self {
            sessions: SessionManager::new(transport.clone(), config.credentials()),
            reconciler: ListReconciler::new(transport.clone(), extractor.clone(), export_url),
            fetcher: ArticleFetcher::new(transport, extractor, cache),
            renderer: FeedRenderer::new(Channel::from_config(config)),
        })
    }

    pub fn cache(&self) -> &ArticleCache {
        self.fetcher.cache()
    }

    /// Runs one generation cycle and returns the RSS document.
    pub async fn generate(&self) -> Result<String, GenerateError> {
        let session = self.sessions.resolve().await?;
        let items = self.reconciler.reconcile(&session).await?;
        let articles = self.fetcher.fetch_all(&session, &items).await;
        let document = self.renderer.render(&articles)?;

        tracing::info!(
            items = articles.len(),
            unparseable = articles.iter().filter(|a| a.is_parse_error()).count(),
            cached = self.cache().len(),
            "Generated feed"
        );
        Ok(document)
    }
}

impl std::fmt::Debug for FeedGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedGenerator")
            .field("fetcher", &self.fetcher)
            .field("renderer", &self.renderer)
            .finish_non_exhaustive()
    }
}
