mod article;
mod extract;

pub use article::{ArticleFailure, ArticleFetcher};
pub use extract::{ExtractError, MarkupExtractor, ScraperExtractor};
