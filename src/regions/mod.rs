//! Region extractors over a rendered recipe page.
//!
//! Each region is looked up independently and comes back as an `Option`; deciding
//! which absences matter is left to the extraction pipeline.

mod json_ld;
mod markers;

pub use json_ld::LinkedRecipe;
pub use markers::PageMarkers;

use scraper::{ElementRef, Selector};

use crate::error::ExtractError;

pub(crate) fn selector(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|e| ExtractError::Internal(format!("bad selector {css:?}: {e}")))
}

/// Visible text of an element with runs of whitespace collapsed
pub(crate) fn element_text(element: ElementRef) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn non_empty(text: String) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn test_element_text_collapses_whitespace() {
        let document = Html::parse_fragment("<li>\n  <span>2</span>\n  cups   flour </li>");
        let li = document.select(&selector("li").unwrap()).next().unwrap();
        assert_eq!(element_text(li), "2 cups flour");
    }

    #[test]
    fn test_bad_selector_is_internal_error() {
        let err = selector("[[").unwrap_err();
        assert!(err.to_string().starts_with("Extraction error: bad selector"));
    }
}
