use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use url::Url;

use super::export::{parse_export, ExportError};
use crate::content::{ExtractError, MarkupExtractor};
use crate::remote::{HttpTransport, Session, TransportError};
use crate::storage::{FeedDateEntry, ListItem, ReconciledItem};
use crate::util::resolve_url;

/// Number of reconciled items kept per generation, in list-page order.
pub const MAX_ITEMS: usize = 5;

const LIST_PATH: &str = "/u";
const ITEM_SELECTOR: &str = "article[data-article-id]";
const ITEM_ID_ATTR: &str = "data-article-id";
const ITEM_LINK_SELECTOR: &str = ".title_meta .js_domain_linkout";
const EXPORT_LINK_SELECTOR: &str = r#"link[type="application/rss+xml"]"#;

/// Errors that abort reconciliation. Every variant is fatal for a cycle.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Failed to fetch list page: {0}")]
    ListPage(#[source] TransportError),

    #[error("Failed to fetch RSS export: {0}")]
    Export(#[source] TransportError),

    /// The list page carries no RSS export link.
    #[error("No RSS export link on list page")]
    ExportNotFound,

    #[error("Invalid RSS export URL: {0}")]
    InvalidExportUrl(String),

    #[error("Failed to parse RSS export: {0}")]
    ExportParse(#[from] ExportError),

    #[error("Failed to extract list items: {0}")]
    Extract(#[from] ExtractError),
}

/// Joins the unread list with the RSS export to recover publish dates.
///
/// The list page is the only source of article ids; the export is the only
/// source of publish dates. Items are matched on their outbound URL, which
/// the export uses as its guid.
pub struct ListReconciler {
    transport: HttpTransport,
    extractor: Arc<dyn MarkupExtractor>,
    export_url: Option<Url>,
}

impl ListReconciler {
    /// `export_url` skips discovery and lets both documents load concurrently.
    pub fn new(
        transport: HttpTransport,
        extractor: Arc<dyn MarkupExtractor>,
        export_url: Option<Url>,
    ) -> Self {
        Self {
            transport,
            extractor,
            export_url,
        }
    }

    /// Fetches both documents and returns at most [`MAX_ITEMS`] reconciled items.
    pub async fn reconcile(&self, session: &Session) -> Result<Vec<ReconciledItem>, ReconcileError> {
        let list_url = self
            .transport
            .endpoint(LIST_PATH)
            .map_err(ReconcileError::ListPage)?;

        let (list_page, export) = match &self.export_url {
            Some(export_url) => {
                futures::try_join!(
                    self.fetch_list(&list_url, session),
                    self.fetch_export(export_url)
                )?
            }
            None => {
                let list_page = self.fetch_list(&list_url, session).await?;
                let export_url = self.discover_export(&list_page, &list_url)?;
                let export = self.fetch_export(&export_url).await?;
                (list_page, export)
            }
        };

        let items = self.list_items(&list_page)?;
        let dates = parse_export(&export)?;
        let listed = items.len();
        let reconciled = join(items, &dates);

        tracing::info!(
            listed,
            dated = dates.len(),
            reconciled = reconciled.len(),
            "Reconciled unread list"
        );
        Ok(reconciled)
    }

    async fn fetch_list(&self, url: &Url, session: &Session) -> Result<String, ReconcileError> {
        let response = self
            .transport
            .get(url, Some(session))
            .await
            .map_err(ReconcileError::ListPage)?;
        Ok(response.body)
    }

    /// The export is public; no session cookie is sent.
    async fn fetch_export(&self, url: &Url) -> Result<String, ReconcileError> {
        tracing::debug!(url = %url, "Fetching RSS export");
        let response = self
            .transport
            .get(url, None)
            .await
            .map_err(ReconcileError::Export)?;
        Ok(response.body)
    }

    /// Finds the export link on the list page and resolves it.
    fn discover_export(&self, list_page: &str, list_url: &Url) -> Result<Url, ReconcileError> {
        let href = self
            .extractor
            .attribute(list_page, EXPORT_LINK_SELECTOR, "href")?
            .filter(|href| !href.trim().is_empty())
            .ok_or(ReconcileError::ExportNotFound)?;

        resolve_url(&href, list_url).ok_or(ReconcileError::InvalidExportUrl(href))
    }

    /// List items in page order. Elements lacking an id or a link are skipped.
    fn list_items(&self, list_page: &str) -> Result<Vec<ListItem>, ReconcileError> {
        let mut items = Vec::new();
        for element in self.extractor.elements(list_page, ITEM_SELECTOR)? {
            let id = self.extractor.attribute(&element, "article", ITEM_ID_ATTR)?;
            let url = self
                .extractor
                .attribute(&element, ITEM_LINK_SELECTOR, "href")?;

            match (non_blank(id), non_blank(url)) {
                (Some(id), Some(url)) => items.push(ListItem { id, url }),
                (id, _) => tracing::debug!(id = ?id, "Skipping list item without id or link"),
            }
        }
        Ok(items)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Keeps list items whose URL appears as a guid in `dates`, attaching its date.
///
/// Duplicate guids resolve to the last entry. Entries with an empty date never
/// match. The result holds at most [`MAX_ITEMS`] items, in `items` order.
pub fn join(items: Vec<ListItem>, dates: &[FeedDateEntry]) -> Vec<ReconciledItem> {
    let by_guid: HashMap<&str, &str> = dates
        .iter()
        .map(|entry| (entry.guid.as_str(), entry.pub_date.as_str()))
        .collect();

    items
        .into_iter()
        .filter_map(|item| {
            let pub_date = by_guid.get(item.url.as_str()).filter(|d| !d.is_empty())?;
            let pub_date = (*pub_date).to_string();
            Some(ReconciledItem::from_list_item(item, pub_date))
        })
        .take(MAX_ITEMS)
        .collect()
}
