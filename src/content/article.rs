use std::sync::Arc;

use futures::future::join_all;
use thiserror::Error;
use url::Url;

use super::extract::MarkupExtractor;
use crate::remote::{HttpTransport, Session, TransportError};
use crate::storage::{Article, ArticleCache, ReconciledItem};
use crate::util::{has_query_param, resolve_url};

/// Element id of the read view's content container.
const STORY_CONTAINER_ID: &str = "story";

/// Query parameter the service sets on its redirect when it could not parse
/// an article. Its value is the article id.
const PARSE_ERROR_PARAM: &str = "parse_error";

/// Why an article could not be resolved to real content.
///
/// `ParseError` is a known outcome signaled by the service and is terminal
/// for the id. The other variants are unexpected and may succeed later.
#[derive(Debug, Error)]
pub enum ArticleFailure {
    #[error("Service could not parse the article")]
    ParseError,
    #[error("Read view request failed: {0}")]
    Transport(#[from] TransportError),
    #[error("Read view has no story container")]
    MissingContent,
}

impl ArticleFailure {
    /// Returns true for failures the service signals deliberately.
    pub fn is_known(&self) -> bool {
        matches!(self, ArticleFailure::ParseError)
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ArticleFailure::Transport(e) => e.status(),
            ArticleFailure::ParseError | ArticleFailure::MissingContent => None,
        }
    }

    /// Serialized failure used as the body of a diagnostic article.
    fn diagnostic(&self, item: &ReconciledItem) -> String {
        serde_json::json!({
            "id": item.id,
            "url": item.url,
            "error": self.to_string(),
            "status": self.status(),
        })
        .to_string()
    }
}

/// Resolves reconciled items into full articles.
///
/// Every lookup goes through the shared [`ArticleCache`]. Real content and
/// parse-error placeholders are cached for the life of the process; unknown
/// failures yield a diagnostic article and leave the id uncached.
#[derive(Clone)]
pub struct ArticleFetcher {
    transport: HttpTransport,
    extractor: Arc<dyn MarkupExtractor>,
    cache: ArticleCache,
}

impl ArticleFetcher {
    pub fn new(
        transport: HttpTransport,
        extractor: Arc<dyn MarkupExtractor>,
        cache: ArticleCache,
    ) -> Self {
        Self {
            transport,
            extractor,
            cache,
        }
    }

    pub fn cache(&self) -> &ArticleCache {
        &self.cache
    }

    /// Resolves one item. Never fails: failures degrade to placeholder articles.
    pub async fn fetch(&self, session: &Session, item: &ReconciledItem) -> Article {
        let resolved = self
            .cache
            .get_or_try_init(&item.id, || self.resolve(session, item))
            .await;

        match resolved {
            Ok(article) => article,
            Err(failure) => {
                tracing::warn!(
                    id = %item.id,
                    url = %item.url,
                    status = ?failure.status(),
                    error = %failure,
                    "Unexpected failure fetching article"
                );
                Article::diagnostic(item, failure.diagnostic(item))
            }
        }
    }

    /// Resolves all items concurrently. Output order matches input order.
    pub async fn fetch_all(&self, session: &Session, items: &[ReconciledItem]) -> Vec<Article> {
        join_all(items.iter().map(|item| self.fetch(session, item))).await
    }

    /// Fetches from the service, folding the known failure into a placeholder.
    async fn resolve(
        &self,
        session: &Session,
        item: &ReconciledItem,
    ) -> Result<Article, ArticleFailure> {
        match self.fetch_remote(session, item).await {
            Err(ArticleFailure::ParseError) => {
                tracing::debug!(id = %item.id, "Article marked unparseable by service");
                Ok(Article::parse_error(item))
            }
            other => other,
        }
    }

    async fn fetch_remote(
        &self,
        session: &Session,
        item: &ReconciledItem,
    ) -> Result<Article, ArticleFailure> {
        let url = self.read_url(&item.id)?;
        tracing::debug!(id = %item.id, url = %url, "Fetching article");

        let response = match self.transport.get(&url, Some(session)).await {
            Ok(response) => response,
            Err(err) if self.is_parse_error_redirect(&err, &item.id) => {
                return Err(ArticleFailure::ParseError)
            }
            Err(err) => return Err(err.into()),
        };

        let html = self
            .extractor
            .fragment_by_id(&response.body, STORY_CONTAINER_ID)
            .ok_or(ArticleFailure::MissingContent)?;
        let title = self
            .extractor
            .title(&response.body)
            .unwrap_or_else(|| item.url.clone());

        Ok(Article::from_content(item, title, html))
    }

    /// `<base>/read/<id>`, with the id encoded as a single path segment.
    fn read_url(&self, id: &str) -> Result<Url, TransportError> {
        let mut url = self.transport.base_url().clone();
        url.path_segments_mut()
            .map_err(|()| {
                TransportError::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase)
            })?
            .pop_if_empty()
            .push("read")
            .push(id);
        Ok(url)
    }

    fn is_parse_error_redirect(&self, err: &TransportError, id: &str) -> bool {
        if !err.is_redirect() {
            return false;
        }
        err.location()
            .and_then(|location| resolve_url(location, self.transport.base_url()))
            .is_some_and(|target| has_query_param(&target, PARSE_ERROR_PARAM, id))
    }
}

impl std::fmt::Debug for ArticleFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArticleFetcher")
            .field("base_url", &self.transport.base_url().as_str())
            .field("cache", &self.cache)
            .finish()
    }
}
