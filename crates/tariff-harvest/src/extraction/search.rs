//! Keyword search result pages.
//!
//! Each hit is a `.search-result-item` container holding `.hs-code`,
//! `.description` and, optionally, `.duty-rate`. A hit without a code or a
//! description is skipped; a missing rate becomes the `N/A` sentinel.

use super::markup::MarkupNode;
use super::{fold_items, required_text, Extraction, RawFields};
use crate::types::ParseError;
use chrono::{DateTime, Utc};

pub const RESULT_ITEM_SELECTOR: &str = ".search-result-item";
pub const CODE_SELECTOR: &str = ".hs-code";
pub const DESCRIPTION_SELECTOR: &str = ".description";
pub const DUTY_RATE_SELECTOR: &str = ".duty-rate";

/// Extract every search hit under `root`.
pub fn extract_search_results<N: MarkupNode>(
    root: &N,
    scraped_at: DateTime<Utc>,
) -> Result<Extraction, ParseError> {
    let items = root.find_all(RESULT_ITEM_SELECTOR)?;
    Ok(fold_items(
        items.iter().map(parse_item),
        "result item",
        scraped_at,
    ))
}

fn parse_item<N: MarkupNode>(item: &N) -> Result<RawFields, ParseError> {
    let raw_code = required_text(item, CODE_SELECTOR, "hs-code")?;
    let description = required_text(item, DESCRIPTION_SELECTOR, "description")?;
    let duty_rate = item.find_first(DUTY_RATE_SELECTOR)?.map(|n| n.text());

    Ok(RawFields {
        raw_code,
        description,
        duty_rate,
        chapter: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::markup::fake::FakeNode;
    use crate::extraction::markup::HtmlPage;
    use crate::types::NOT_AVAILABLE;

    fn item(code: Option<&str>, desc: Option<&str>, rate: Option<&str>) -> FakeNode {
        let mut node = FakeNode::new();
        if let Some(code) = code {
            node = node.with(CODE_SELECTOR, FakeNode::leaf(code));
        }
        if let Some(desc) = desc {
            node = node.with(DESCRIPTION_SELECTOR, FakeNode::leaf(desc));
        }
        if let Some(rate) = rate {
            node = node.with(DUTY_RATE_SELECTOR, FakeNode::leaf(rate));
        }
        node
    }

    #[test]
    fn test_synthetic_tree_partial_items() {
        let root = FakeNode::new()
            .with(
                RESULT_ITEM_SELECTOR,
                item(Some("8471.30.00"), Some("Portable computers"), Some("Free")),
            )
            .with(RESULT_ITEM_SELECTOR, item(None, Some("No code here"), None))
            .with(RESULT_ITEM_SELECTOR, item(Some("8517.13"), None, None))
            .with(
                RESULT_ITEM_SELECTOR,
                item(Some("8517.13.00"), Some("Smartphones"), None),
            );

        let extraction = extract_search_results(&root, Utc::now()).unwrap();
        assert_eq!(extraction.records.len(), 2);
        assert_eq!(extraction.skipped, 2);

        let laptops = &extraction.records[0];
        assert_eq!(laptops.code, "84.71.30.00");
        assert_eq!(laptops.chapter, 84);
        assert_eq!(laptops.duty_rate, "Free");

        let phones = &extraction.records[1];
        assert_eq!(phones.code, "85.17.13.00");
        assert_eq!(phones.duty_rate, NOT_AVAILABLE);
    }

    #[test]
    fn test_blank_description_counts_as_missing() {
        let root = FakeNode::new().with(
            RESULT_ITEM_SELECTOR,
            item(Some("8471.30.00"), Some("   "), Some("Free")),
        );
        let extraction = extract_search_results(&root, Utc::now()).unwrap();
        assert!(extraction.records.is_empty());
        assert_eq!(extraction.skipped, 1);
    }

    #[test]
    fn test_real_html_search_page() {
        let html = r#"
        <html><body>
          <div class="results">
            <div class="search-result-item">
              <span class="hs-code">5201.00.00</span>
              <p class="description">
                Cotton, not carded or combed
              </p>
              <span class="duty-rate">Free</span>
            </div>
            <div class="search-result-item">
              <span class="hs-code">6109.10</span>
              <p class="description">T-shirts, singlets, of cotton</p>
            </div>
            <div class="search-result-item">
              <p class="description">Orphan description</p>
            </div>
          </div>
        </body></html>"#;

        let page = HtmlPage::parse(html);
        let extraction = extract_search_results(&page.root(), Utc::now()).unwrap();

        assert_eq!(extraction.records.len(), 2);
        assert_eq!(extraction.skipped, 1);
        assert_eq!(extraction.records[0].code, "52.01.00.00");
        assert_eq!(extraction.records[0].description, "Cotton, not carded or combed");
        assert_eq!(extraction.records[1].code, "61.09.10");
        assert_eq!(extraction.records[1].duty_rate, NOT_AVAILABLE);
    }

    #[test]
    fn test_page_without_results_is_empty() {
        let page = HtmlPage::parse("<html><body><p>No results found.</p></body></html>");
        let extraction = extract_search_results(&page.root(), Utc::now()).unwrap();
        assert!(extraction.records.is_empty());
        assert_eq!(extraction.skipped, 0);
    }
}
