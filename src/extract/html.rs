use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::table::{ResultPage, ResultTable};
use crate::error::{TranscriptError, TranscriptResult};

const HEADING_TAGS: [&str; 5] = ["b", "h4", "h5", "p", "center"];

fn selector(css: &str) -> TranscriptResult<Selector> {
    Selector::parse(css).map_err(|e| TranscriptError::Selector {
        selector: css.to_string(),
        message: format!("{e:?}"),
    })
}

/// Text of an element with every text node trimmed and glued together.
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .collect()
}

/// Turn a rendered results page into tables for [`super::TableExtractor`].
///
/// Each table is paired with the text of the nearest heading-like element
/// (`b`, `h4`, `h5`, `p`, `center`) that starts before it in document order.
pub fn parse_result_page(html: &str, htno: Option<&str>) -> TranscriptResult<ResultPage> {
    let document = Html::parse_document(html);
    let row_selector = selector("tr")?;
    let cell_selector = selector("td, th")?;

    let page_text = document
        .root_element()
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ");
    let lowered = page_text.to_lowercase();
    if lowered.contains("not found") || lowered.contains("invalid") {
        return Err(TranscriptError::ResultNotFound);
    }

    let mut last_heading: Option<String> = None;
    let mut tables = Vec::new();

    for node in document.root_element().descendants() {
        let Some(element) = ElementRef::wrap(node) else {
            continue;
        };
        let tag = element.value().name();

        if HEADING_TAGS.contains(&tag) {
            last_heading = Some(element_text(element));
        } else if tag == "table" {
            let rows = element
                .select(&row_selector)
                .map(|row| row.select(&cell_selector).map(element_text).collect())
                .collect();
            tables.push(ResultTable {
                heading: last_heading.clone(),
                rows,
            });
        }
    }

    debug!(tables = tables.len(), "parsed results page");
    Ok(ResultPage {
        tables,
        page_text,
        htno: htno.map(str::to_string),
    })
}
