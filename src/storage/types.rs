// ============================================================================
// List / Export Items
// ============================================================================

/// An unread item as it appears on the list page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListItem {
    /// Remote article identifier, used to fetch the read view
    pub id: String,
    /// Outbound URL of the original article; join key against the export
    pub url: String,
}

/// A `<guid>`/`<pubDate>` pair from the RSS export.
///
/// The export uses the article URL as its guid, which is what makes the
/// join with [`ListItem::url`] possible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedDateEntry {
    pub guid: String,
    /// Publish date exactly as written in the export
    pub pub_date: String,
}

/// A list item whose publish date was recovered from the export.
///
/// Only produced by the join, so `pub_date` is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciledItem {
    pub id: String,
    pub url: String,
    pub pub_date: String,
}

impl ReconciledItem {
    pub(crate) fn from_list_item(item: ListItem, pub_date: String) -> Self {
        Self {
            id: item.id,
            url: item.url,
            pub_date,
        }
    }
}

// ============================================================================
// Articles
// ============================================================================

/// A fully resolved article, ready to be rendered as a feed entry.
///
/// `title` and `html` hold placeholder values for degraded articles (see
/// [`Article::parse_error`] and [`Article::diagnostic`]); every field is
/// always populated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub id: String,
    pub url: String,
    pub pub_date: String,
    pub title: String,
    pub html: String,
}

/// Placeholder content for articles the service reports it could not parse.
pub const PARSE_ERROR_HTML: &str = "<p>Instapaper could not parse this article.</p>";

impl Article {
    /// Builds an article from successfully extracted content.
    pub fn from_content(item: &ReconciledItem, title: String, html: String) -> Self {
        Self {
            id: item.id.clone(),
            url: item.url.clone(),
            pub_date: item.pub_date.clone(),
            title,
            html,
        }
    }

    /// Degraded article for the service-signaled "content unparseable" case.
    pub fn parse_error(item: &ReconciledItem) -> Self {
        Self::from_content(item, item.url.clone(), PARSE_ERROR_HTML.to_string())
    }

    /// Degraded article carrying a serialized failure for diagnostics.
    pub fn diagnostic(item: &ReconciledItem, details: String) -> Self {
        Self::from_content(item, item.url.clone(), details)
    }

    /// Returns true if this article holds the parse-error sentinel.
    pub fn is_parse_error(&self) -> bool {
        self.html == PARSE_ERROR_HTML
    }
}
