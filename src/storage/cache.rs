use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OnceCell;

use super::types::Article;

/// Process-wide article cache keyed by remote article id.
///
/// Entries are write-once and never expire: the first resolved article for an
/// id is returned for every later lookup. Each id owns a [`OnceCell`], so
/// concurrent generation cycles asking for the same id share a single
/// in-flight fetch instead of racing to write.
///
/// Cloning the cache is cheap and yields a handle to the same entries.
#[derive(Clone, Default)]
pub struct ArticleCache {
    entries: Arc<Mutex<HashMap<String, Arc<OnceCell<Article>>>>>,
}

impl ArticleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the slot for `id`, creating an empty one if needed.
    fn slot(&self, id: &str) -> Arc<OnceCell<Article>> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(entries.entry(id.to_owned()).or_default())
    }

    /// Looks up a resolved article without triggering any fetch.
    pub fn get(&self, id: &str) -> Option<Article> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(id).and_then(|cell| cell.get().cloned())
    }

    /// Stores an article unless one is already cached for its id.
    ///
    /// Returns `false` (and leaves the existing entry untouched) if the id was
    /// already resolved.
    pub fn insert(&self, article: Article) -> bool {
        self.slot(&article.id).set(article).is_ok()
    }

    /// Returns the cached article for `id`, or resolves it with `init`.
    ///
    /// `init` runs at most once at a time per id. An `Ok` result is stored
    /// permanently; an `Err` leaves the id uncached so a later call retries.
    pub async fn get_or_try_init<F, Fut, E>(&self, id: &str, init: F) -> Result<Article, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Article, E>>,
    {
        let slot = self.slot(id);
        slot.get_or_try_init(init).await.cloned()
    }

    /// Number of resolved entries.
    pub fn len(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.values().filter(|cell| cell.initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ArticleCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArticleCache")
            .field("entries", &self.len())
            .finish()
    }
}
