//! Schema-resilient listing extraction
//!
//! This module turns a fetched listing page into a `ListingRecord`:
//! - Required fields come from the first layout strategy that finds any
//! - Equipment, price, advert metadata, description and VIN are read
//!   independently of the strategy
//! - Every step is fail-soft, so a changed layout yields empty fields rather
//!   than an error

mod record;
mod sections;
mod strategy;
mod text;

pub use record::{AdvertMetadata, ListingRecord, Price, EQUIPMENT_SEPARATOR};
pub use sections::SectionReader;
pub use strategy::{FieldStrategy, LegacyLabelStrategy, TestIdStrategy};
pub use text::normalize;

use crate::config::ExtractorConfig;
use crate::fetcher::Document;
use crate::HarvestError;
use std::collections::{HashMap, HashSet};

/// Converts listing documents into records
pub struct Extractor {
    labels: Vec<String>,
    required: HashSet<String>,
    strategies: Vec<Box<dyn FieldStrategy>>,
    sections: SectionReader,
    description_heading: String,
    capture_vin: bool,
}

impl Extractor {
    /// Creates an extractor with the legacy strategy first, then the current one
    pub fn new(config: &ExtractorConfig) -> Result<Self, HarvestError> {
        let strategies: Vec<Box<dyn FieldStrategy>> = vec![
            Box::new(LegacyLabelStrategy::new()?),
            Box::new(TestIdStrategy::new()?),
        ];
        Self::with_strategies(config, strategies)
    }

    /// Creates an extractor running `strategies` in the given order
    pub fn with_strategies(
        config: &ExtractorConfig,
        strategies: Vec<Box<dyn FieldStrategy>>,
    ) -> Result<Self, HarvestError> {
        let labels: Vec<String> = config
            .required_labels
            .iter()
            .map(|label| normalize(label))
            .collect();

        Ok(Self {
            required: labels.iter().cloned().collect(),
            labels,
            strategies,
            sections: SectionReader::new()?,
            description_heading: config.description_heading.trim().to_string(),
            capture_vin: config.capture_vin,
        })
    }

    /// Extracts a record from `document`
    ///
    /// Never fails: a page matching no strategy yields a record whose
    /// required fields are all empty.
    pub fn extract(&self, document: &Document) -> ListingRecord {
        let html = document.html();

        let mut fields = HashMap::new();
        for strategy in &self.strategies {
            let found = strategy.extract_fields(&html, &self.required);
            if found.values().any(|value| !value.is_empty()) {
                tracing::debug!(
                    "{} matched {} field(s) with the {} strategy",
                    document.url(),
                    found.len(),
                    strategy.name()
                );
                fields = found;
                break;
            }
        }
        if fields.is_empty() {
            tracing::warn!("No layout strategy matched any field on {}", document.url());
        }

        let mut record = ListingRecord::new(&self.labels, fields);
        record.equipment = self.sections.equipment(&html);
        record.price = self.sections.price(&html);
        record.advert = self.sections.advert(&html);
        record.description = self.sections.description(&html, &self.description_heading);
        if self.capture_vin {
            record.vin = self.sections.vin(&html);
        }
        record
    }
}
