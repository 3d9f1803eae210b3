//! Layout-independent listing sections
//!
//! Equipment, price, advert metadata, description and VIN are read the same
//! way whichever strategy supplied the required fields. Every reader is
//! fail-soft and returns empty values for missing markup.

use super::record::{AdvertMetadata, Price};
use super::text::{element_text, first_text, parse_selector};
use crate::HarvestError;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

/// Compiled selectors for every section
pub struct SectionReader {
    equipment_section: Selector,
    equipment_box: Selector,
    equipment_fallback: Selector,
    text: Selector,
    price_amount: Selector,
    price_currency: Selector,
    price_label: Selector,
    price_evaluation: Selector,
    paragraph: Selector,
    bottom_wrapper: Selector,
    area: Selector,
    button_text: Selector,
    heading: Selector,
    text_wrapper: Selector,
    vin: Selector,
    advert_id: Regex,
}

impl SectionReader {
    pub fn new() -> Result<Self, HarvestError> {
        Ok(Self {
            equipment_section: parse_selector(r#"div[data-testid="content-equipments-section"]"#)?,
            equipment_box: parse_selector(r#"div[data-sentry-element="EquipmentBox"]"#)?,
            equipment_fallback: parse_selector("div[data-testid] p")?,
            text: parse_selector(r#"p[data-sentry-element="Text"]"#)?,
            price_amount: parse_selector("span.offer-price__number")?,
            price_currency: parse_selector("span.offer-price__currency")?,
            price_label: parse_selector(r#"p[data-testid="price-indicator-label-IN"]"#)?,
            price_evaluation: parse_selector(
                r#"div[data-testid="small-price-evaluation-indicator"]"#,
            )?,
            paragraph: parse_selector("p")?,
            bottom_wrapper: parse_selector(r#"div[data-sentry-element="BottomWrapper"]"#)?,
            area: parse_selector(r#"div[data-sentry-element="Area"]"#)?,
            button_text: parse_selector(r#"button p[data-sentry-element="Text"]"#)?,
            heading: parse_selector("h2")?,
            text_wrapper: parse_selector(r#"div[data-testid="textWrapper"]"#)?,
            vin: parse_selector(r#"div[data-testid="advert-vin"] p[data-sentry-element="Label"]"#)?,
            advert_id: Regex::new(r"ID\s*:\s*(\d+)")
                .map_err(|e| HarvestError::Selector(e.to_string()))?,
        })
    }

    /// Distinct equipment item names in page order
    ///
    /// Items come from equipment boxes; when the section has none, every
    /// paragraph inside a test-id container of the section is used instead.
    pub fn equipment(&self, html: &Html) -> Vec<String> {
        let Some(section) = html.select(&self.equipment_section).next() else {
            return Vec::new();
        };

        let boxes: Vec<ElementRef<'_>> = section.select(&self.equipment_box).collect();
        let texts: Vec<String> = if boxes.is_empty() {
            section
                .select(&self.equipment_fallback)
                .map(element_text)
                .collect()
        } else {
            boxes
                .into_iter()
                .map(|item| {
                    item.select(&self.text)
                        .next()
                        .map(element_text)
                        .unwrap_or_else(|| element_text(item))
                })
                .collect()
        };

        let mut items: Vec<String> = Vec::with_capacity(texts.len());
        for text in texts {
            if !text.is_empty() && !items.contains(&text) {
                items.push(text);
            }
        }
        items
    }

    /// Price amount, currency and price-level label
    pub fn price(&self, html: &Html) -> Price {
        let root = html.root_element();

        let indicator_label = match root.select(&self.price_label).next() {
            Some(label) => element_text(label),
            None => root
                .select(&self.price_evaluation)
                .next()
                .and_then(|container| {
                    container
                        .select(&self.paragraph)
                        .map(element_text)
                        .find(|text| !text.is_empty())
                })
                .unwrap_or_default(),
        };

        Price {
            amount: first_text(root, &self.price_amount),
            currency: first_text(root, &self.price_currency),
            indicator_label,
        }
    }

    /// Publication date and advert id from the bottom wrapper
    ///
    /// The id is the number in `ID: <digits>`, or the raw text when that
    /// pattern is absent.
    pub fn advert(&self, html: &Html) -> AdvertMetadata {
        let Some(bottom) = html.select(&self.bottom_wrapper).next() else {
            return AdvertMetadata::default();
        };
        let areas: Vec<ElementRef<'_>> = bottom.select(&self.area).collect();

        let published_at = areas
            .first()
            .map(|area| first_text(*area, &self.text))
            .unwrap_or_default();

        let item_id = areas
            .get(1)
            .and_then(|area| {
                area.select(&self.button_text)
                    .next()
                    .or_else(|| area.select(&self.text).next())
            })
            .map(|el| {
                let raw = element_text(el);
                self.advert_id
                    .captures(&raw)
                    .and_then(|caps| caps.get(1))
                    .map(|m| m.as_str().to_string())
                    .unwrap_or(raw)
            })
            .unwrap_or_default();

        AdvertMetadata {
            published_at,
            item_id,
        }
    }

    /// Description paragraphs joined by newlines
    ///
    /// The section is found through its `<h2>` whose text equals `heading`.
    pub fn description(&self, html: &Html, heading: &str) -> String {
        let Some(h2) = html
            .select(&self.heading)
            .find(|h2| element_text(*h2) == heading)
        else {
            return String::new();
        };

        let section = h2.ancestors().filter_map(ElementRef::wrap).find(|el| {
            el.value().name() == "div"
                && el.value().attr("data-testid") == Some("content-description-section")
        });
        let Some(wrapper) = section.and_then(|s| s.select(&self.text_wrapper).next()) else {
            return String::new();
        };

        wrapper
            .select(&self.paragraph)
            .map(element_text)
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Vehicle identification number, when the page shows one
    pub fn vin(&self, html: &Html) -> String {
        first_text(html.root_element(), &self.vin)
    }
}
