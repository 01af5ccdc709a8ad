//! Building the unread feed from the service's two item sources.
//!
//! - **Export**: Read `<guid>`/`<pubDate>` pairs from the RSS export
//! - **Reconcile**: Join list-page items with export dates on their URL
//! - **Render**: Serialize resolved articles as an RSS 2.0 document
//!
//! # Example
//!
//! ```ignore
//! let items = reconciler.reconcile(&session).await?;
//! let articles = fetcher.fetch_all(&session, &items).await;
//! let xml = FeedRenderer::new(channel).render(&articles)?;
//! ```

mod export;
mod reconcile;
mod render;

pub use export::{parse_export, ExportError};
pub use reconcile::{join, ListReconciler, ReconcileError, MAX_ITEMS};
pub use render::{Channel, FeedRenderer, RenderError};
