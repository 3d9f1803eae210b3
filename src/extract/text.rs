//! Text helpers shared by the extraction strategies

use crate::HarvestError;
use scraper::{ElementRef, Selector};
use unicode_normalization::UnicodeNormalization;

/// Folds `text` to NFKC, collapses whitespace runs (non-breaking spaces
/// included) into single spaces and trims the ends
pub fn normalize(text: &str) -> String {
    let folded: String = text.nfkc().collect();
    folded
        .split(|c: char| c.is_whitespace() || c == '\u{a0}')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalized text content of an element
pub fn element_text(element: ElementRef<'_>) -> String {
    normalize(&element.text().collect::<String>())
}

/// Text of the first element under `scope` matching `selector`, or ""
pub fn first_text(scope: ElementRef<'_>, selector: &Selector) -> String {
    scope
        .select(selector)
        .next()
        .map(element_text)
        .unwrap_or_default()
}

/// Parses a CSS selector, reporting the offending text on failure
pub fn parse_selector(css: &str) -> Result<Selector, HarvestError> {
    Selector::parse(css).map_err(|_| HarvestError::Selector(css.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize("  150\u{a0}000\n\t km "), "150 000 km");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_normalize_composes_decomposed_labels() {
        assert_eq!(
            normalize("Pojemnos\u{301}c\u{301}  skokowa"),
            "Pojemno\u{15b}\u{107} skokowa"
        );
        assert_eq!(normalize("Moc\u{2009}150\u{ff2b}\u{ff2d}"), "Moc 150KM");
    }

    #[test]
    fn test_element_text_joins_children() {
        let html = Html::parse_fragment("<p>Moc <span>150</span>\u{a0}KM</p>");
        let p = html.select(&parse_selector("p").unwrap()).next().unwrap();
        assert_eq!(element_text(p), "Moc 150 KM");
    }

    #[test]
    fn test_first_text_missing_is_empty() {
        let html = Html::parse_fragment("<div></div>");
        let sel = parse_selector("span.price").unwrap();
        assert_eq!(first_text(html.root_element(), &sel), "");
    }

    #[test]
    fn test_parse_selector_error() {
        assert!(matches!(parse_selector("div[["), Err(HarvestError::Selector(_))));
    }
}
