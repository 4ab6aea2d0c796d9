//! Per-chapter tariff tables.
//!
//! Rows live in `table.hs-code-table tbody tr`. Cell 0 is the raw code,
//! cell 1 the description, cell 2 the duty rate. Every row is stamped with
//! the chapter the page was requested for, not one read from the row.

use super::markup::MarkupNode;
use super::{fold_items, Extraction, RawFields};
use crate::types::ParseError;
use chrono::{DateTime, Utc};

pub const ROW_SELECTOR: &str = "table.hs-code-table tbody tr";
pub const CELL_SELECTOR: &str = "td";

/// Minimum cells a row needs to be read.
pub const MIN_CELLS: usize = 3;

/// Extract every data row of a chapter page.
pub fn extract_chapter_table<N: MarkupNode>(
    root: &N,
    chapter: u8,
    scraped_at: DateTime<Utc>,
) -> Result<Extraction, ParseError> {
    let rows = root.find_all(ROW_SELECTOR)?;
    Ok(fold_items(
        rows.iter().map(|row| parse_row(row, chapter)),
        "row",
        scraped_at,
    ))
}

fn parse_row<N: MarkupNode>(row: &N, chapter: u8) -> Result<RawFields, ParseError> {
    let cells = row.find_all(CELL_SELECTOR)?;
    if cells.len() < MIN_CELLS {
        return Err(ParseError::TooFewCells {
            found: cells.len(),
            expected: MIN_CELLS,
        });
    }

    let description = cells[1].text();
    if description.is_empty() {
        return Err(ParseError::MissingField("description"));
    }

    Ok(RawFields {
        raw_code: cells[0].text(),
        description,
        duty_rate: Some(cells[2].text()),
        chapter: Some(chapter),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::markup::fake::FakeNode;
    use crate::extraction::markup::HtmlPage;
    use crate::types::NOT_AVAILABLE;

    fn row(cells: &[&str]) -> FakeNode {
        cells.iter().fold(FakeNode::new(), |node, text| {
            node.with(CELL_SELECTOR, FakeNode::leaf(text))
        })
    }

    #[test]
    fn test_one_malformed_row_does_not_sink_the_table() {
        let mut root = FakeNode::new();
        for i in 0..10 {
            let node = if i == 4 {
                row(&["0101.29.00", "Other horses"])
            } else {
                let code = format!("0101.{:02}.00", 10 + i);
                let desc = format!("Horse variety {i}");
                row(&[code.as_str(), desc.as_str(), "Free"])
            };
            root = root.with(ROW_SELECTOR, node);
        }

        let extraction = extract_chapter_table(&root, 1, Utc::now()).unwrap();
        assert_eq!(extraction.records.len(), 9);
        assert_eq!(extraction.skipped, 1);
        assert!(extraction.records.iter().all(|r| r.chapter == 1));
    }

    #[test]
    fn test_chapter_is_imposed_not_derived() {
        let root = FakeNode::new().with(ROW_SELECTOR, row(&["2204.21", "Wine", "Free"]));
        let extraction = extract_chapter_table(&root, 7, Utc::now()).unwrap();
        assert_eq!(extraction.records[0].chapter, 7);
        assert_eq!(extraction.records[0].code, "22.04.21");
    }

    #[test]
    fn test_extra_cells_are_ignored_and_blank_rate_is_sentinel() {
        let root = FakeNode::new().with(
            ROW_SELECTOR,
            row(&["0301.11.00", "Ornamental fish", " ", "kg", "note"]),
        );
        let extraction = extract_chapter_table(&root, 3, Utc::now()).unwrap();
        assert_eq!(extraction.records.len(), 1);
        assert_eq!(extraction.records[0].duty_rate, NOT_AVAILABLE);
    }

    #[test]
    fn test_real_html_chapter_table() {
        let html = r#"
        <html><body>
          <table class="hs-code-table">
            <thead><tr><th>Tariff item</th><th>Description</th><th>MFN</th></tr></thead>
            <tbody>
              <tr><td>0101.21.00</td><td>Pure-bred breeding animals</td><td>Free</td></tr>
              <tr><td colspan="3">Asses</td></tr>
              <tr><td>0101.30.00</td><td>Asses</td><td>Free</td></tr>
              <tr><td>0101.90.00</td><td>Other</td><td>2.5%</td></tr>
            </tbody>
          </table>
          <table class="footnotes"><tbody><tr><td>a</td><td>b</td><td>c</td></tr></tbody></table>
        </body></html>"#;

        let page = HtmlPage::parse(html);
        let extraction = extract_chapter_table(&page.root(), 1, Utc::now()).unwrap();

        assert_eq!(extraction.records.len(), 3);
        assert_eq!(extraction.skipped, 1);
        assert_eq!(extraction.records[0].code, "01.01.21.00");
        assert_eq!(extraction.records[2].duty_rate, "2.5%");
    }

    #[test]
    fn test_table_without_tbody_markup_still_parses() {
        // html5ever inserts the implied <tbody>.
        let html = r#"<table class="hs-code-table">
            <tr><td>0201.10.00</td><td>Carcasses</td><td>26.5%</td></tr>
        </table>"#;
        let page = HtmlPage::parse(html);
        let extraction = extract_chapter_table(&page.root(), 2, Utc::now()).unwrap();
        assert_eq!(extraction.records.len(), 1);
        assert_eq!(extraction.records[0].code, "02.01.10.00");
    }
}
