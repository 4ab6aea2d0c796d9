//! Markup access as a small capability trait.
//!
//! Extractors only ever need "find the elements matching this selector" and
//! "give me the text under this element", so that is all [`MarkupNode`]
//! exposes. The `scraper` crate backs it for real pages; tests can plug in
//! an in-memory tree.

use crate::types::ParseError;
use scraper::{ElementRef, Html, Selector};

/// A node in a parsed page.
pub trait MarkupNode: Sized {
    /// All descendants matching `selector`, in document order.
    fn find_all(&self, selector: &str) -> Result<Vec<Self>, ParseError>;

    /// Text content with whitespace trimmed and collapsed.
    fn text(&self) -> String;

    /// First descendant matching `selector`.
    fn find_first(&self, selector: &str) -> Result<Option<Self>, ParseError> {
        Ok(self.find_all(selector)?.into_iter().next())
    }
}

/// A parsed HTML document.
pub struct HtmlPage {
    document: Html,
}

impl HtmlPage {
    pub fn parse(body: &str) -> Self {
        Self {
            document: Html::parse_document(body),
        }
    }

    /// The `<html>` element; every extractor starts here.
    pub fn root(&self) -> ElementRef<'_> {
        self.document.root_element()
    }
}

impl MarkupNode for ElementRef<'_> {
    fn find_all(&self, selector: &str) -> Result<Vec<Self>, ParseError> {
        let sel = Selector::parse(selector)
            .map_err(|_| ParseError::InvalidSelector(selector.to_string()))?;
        Ok(self.select(&sel).collect())
    }

    fn text(&self) -> String {
        clean_text(&ElementRef::text(self).collect::<String>())
    }
}

/// Trim and collapse runs of whitespace to a single space.
pub fn clean_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
