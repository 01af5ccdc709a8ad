use scraper::{Html, Selector};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    /// A CSS selector could not be parsed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },
}

/// Narrow markup-querying capability used by the reconciler and the fetcher.
///
/// Implementations take raw markup on every call and keep no state between
/// calls, so one extractor can be shared freely across tasks.
pub trait MarkupExtractor: Send + Sync {
    /// Text of the document's `<title>`, trimmed. `None` if absent or blank.
    fn title(&self, markup: &str) -> Option<String>;

    /// Inner HTML of the element whose `id` attribute equals `id`.
    fn fragment_by_id(&self, markup: &str, id: &str) -> Option<String>;

    /// Value of `attr` on the first element matching `selector`.
    fn attribute(
        &self,
        markup: &str,
        selector: &str,
        attr: &str,
    ) -> Result<Option<String>, ExtractError>;

    /// Outer HTML of every element matching `selector`, in document order.
    fn elements(&self, markup: &str, selector: &str) -> Result<Vec<String>, ExtractError>;
}

/// [`MarkupExtractor`] backed by the `scraper` HTML parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScraperExtractor;

impl ScraperExtractor {
    pub fn new() -> Self {
        Self
    }

    fn parse_selector(selector: &str) -> Result<Selector, ExtractError> {
        Selector::parse(selector).map_err(|e| ExtractError::Selector {
            selector: selector.to_string(),
            message: format!("{e:?}"),
        })
    }
}

impl MarkupExtractor for ScraperExtractor {
    fn title(&self, markup: &str) -> Option<String> {
        let document = Html::parse_document(markup);
        let selector = Selector::parse("title").ok()?;
        let title: String = document.select(&selector).next()?.text().collect();
        let title = title.trim();
        (!title.is_empty()).then(|| title.to_string())
    }

    fn fragment_by_id(&self, markup: &str, id: &str) -> Option<String> {
        let document = Html::parse_document(markup);
        // Match on the attribute value rather than building `#id`, so ids
        // with selector metacharacters need no escaping.
        let selector = Selector::parse("[id]").ok()?;
        document
            .select(&selector)
            .find(|element| element.value().id() == Some(id))
            .map(|element| element.inner_html())
    }

    fn attribute(
        &self,
        markup: &str,
        selector: &str,
        attr: &str,
    ) -> Result<Option<String>, ExtractError> {
        let selector = Self::parse_selector(selector)?;
        let document = Html::parse_document(markup);
        Ok(document
            .select(&selector)
            .next()
            .and_then(|element| element.value().attr(attr))
            .map(str::to_string))
    }

    fn elements(&self, markup: &str, selector: &str) -> Result<Vec<String>, ExtractError> {
        let selector = Self::parse_selector(selector)?;
        let document = Html::parse_document(markup);
        Ok(document
            .select(&selector)
            .map(|element| element.html())
            .collect())
    }
}
