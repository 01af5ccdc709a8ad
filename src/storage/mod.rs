mod cache;
mod types;

pub use cache::ArticleCache;
pub use types::{Article, FeedDateEntry, ListItem, ReconciledItem, PARSE_ERROR_HTML};
