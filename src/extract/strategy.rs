//! Field extraction strategies, one per layout generation
//!
//! Each strategy maps required labels to values for one markup generation of
//! the listing page. The `Extractor` runs them in order and keeps the first
//! result with at least one non-empty value.

use super::text::{element_text, normalize, parse_selector};
use crate::HarvestError;
use scraper::{ElementRef, Html, Selector};
use std::collections::{HashMap, HashSet};

/// Containers of the current layout that group fields rather than hold one
const SKIPPED_TEST_IDS: &[&str] = &[
    "basic_information",
    "technical_specs",
    "condition_history",
    "financial_information",
    "collapsible-groups-wrapper",
];

/// Containers whose label is implied by their test id
const TEST_ID_LABELS: &[(&str, &str)] = &[
    ("registration", "Numer rejestracyjny pojazdu"),
    (
        "date_registration",
        "Data pierwszej rejestracji w historii pojazdu",
    ),
];

/// Extracts required fields from one layout generation
pub trait FieldStrategy: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Maps required labels found in `html` to their values
    ///
    /// Labels outside `required` are never returned. Missing elements are
    /// simply absent from the map.
    fn extract_fields(&self, html: &Html, required: &HashSet<String>) -> HashMap<String, String>;
}

/// Legacy layout: `<p data-sentry-element="Label">` followed by a sibling value `<p>`
pub struct LegacyLabelStrategy {
    label: Selector,
}

impl LegacyLabelStrategy {
    pub fn new() -> Result<Self, HarvestError> {
        Ok(Self {
            label: parse_selector(r#"p[data-sentry-element="Label"]"#)?,
        })
    }
}

impl FieldStrategy for LegacyLabelStrategy {
    fn name(&self) -> &'static str {
        "legacy-label"
    }

    fn extract_fields(&self, html: &Html, required: &HashSet<String>) -> HashMap<String, String> {
        let mut fields: HashMap<String, String> = HashMap::new();

        for label_el in html.select(&self.label) {
            let label = element_text(label_el);
            if !required.contains(&label) {
                continue;
            }

            let Some(value_el) = label_el
                .next_siblings()
                .filter_map(ElementRef::wrap)
                .find(|el| el.value().name() == "p")
            else {
                continue;
            };

            // First non-empty value wins when a label repeats
            let slot = fields.entry(label).or_default();
            if slot.is_empty() {
                *slot = element_text(value_el);
            }
        }

        fields
    }
}

/// Current layout: field containers keyed by `data-testid`
pub struct TestIdStrategy {
    container: Selector,
    paragraph: Selector,
    value_class: Selector,
}

impl TestIdStrategy {
    pub fn new() -> Result<Self, HarvestError> {
        Ok(Self {
            container: parse_selector("div[data-testid]")?,
            paragraph: parse_selector("p")?,
            value_class: parse_selector("p.ed2m2uu0, p.ekwurce9")?,
        })
    }

    /// Reads a container's value, ignoring its label paragraph
    ///
    /// Known value classes win; otherwise the first non-empty paragraph after
    /// the first one whose text differs from the label.
    fn value_of(&self, container: ElementRef<'_>) -> String {
        if let Some(candidate) = container.select(&self.value_class).next() {
            return element_text(candidate);
        }

        let paragraphs: Vec<String> = container
            .select(&self.paragraph)
            .map(element_text)
            .collect();
        let Some((label, rest)) = paragraphs.split_first() else {
            return String::new();
        };

        rest.iter()
            .find(|text| !text.is_empty() && *text != label)
            .cloned()
            .unwrap_or_default()
    }
}

impl FieldStrategy for TestIdStrategy {
    fn name(&self) -> &'static str {
        "test-id"
    }

    fn extract_fields(&self, html: &Html, required: &HashSet<String>) -> HashMap<String, String> {
        let mut fields: HashMap<String, String> = HashMap::new();

        for container in html.select(&self.container) {
            let Some(test_id) = container.value().attr("data-testid") else {
                continue;
            };
            if SKIPPED_TEST_IDS.contains(&test_id) {
                continue;
            }

            if let Some((_, label)) = TEST_ID_LABELS.iter().find(|(id, _)| *id == test_id) {
                if required.contains(*label) {
                    let slot = fields.entry(label.to_string()).or_default();
                    if slot.is_empty() {
                        *slot = self.value_of(container);
                    }
                }
                continue;
            }

            let mut paragraphs = container.select(&self.paragraph);
            let (Some(first), Some(_)) = (paragraphs.next(), paragraphs.next()) else {
                continue;
            };
            let label = normalize(&first.text().collect::<String>());
            if required.contains(&label) {
                let value = self.value_of(container);
                fields.insert(label, value);
            }
        }

        fields
    }
}
