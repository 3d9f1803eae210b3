use crate::config::ExtractorConfig;
use crate::extract::{normalize, ListingRecord};

/// Columns written after the required labels (and the optional VIN)
pub const TRAILING_COLUMNS: &[&str] = &[
    "equipment",
    "price",
    "currency",
    "price_level",
    "advert_date",
    "advert_id",
    "description",
];

/// Header name of the optional VIN column
pub const VIN_COLUMN: &str = "VIN";

/// Fixed column order of the output files
///
/// Every row has every column: required labels in configuration order,
/// `VIN` when enabled, then the trailing derived columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    labels: Vec<String>,
    include_vin: bool,
}

impl ColumnLayout {
    pub fn new(labels: Vec<String>, include_vin: bool) -> Self {
        Self {
            labels,
            include_vin,
        }
    }

    pub fn from_config(config: &ExtractorConfig) -> Self {
        Self::new(
            config.required_labels.iter().map(|l| normalize(l)).collect(),
            config.capture_vin,
        )
    }

    pub fn header(&self) -> Vec<String> {
        let mut header = self.labels.clone();
        if self.include_vin {
            header.push(VIN_COLUMN.to_string());
        }
        header.extend(TRAILING_COLUMNS.iter().map(|c| c.to_string()));
        header
    }

    pub fn len(&self) -> usize {
        self.labels.len() + usize::from(self.include_vin) + TRAILING_COLUMNS.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flattens a record into one value per column
    pub fn row(&self, record: &ListingRecord) -> Vec<String> {
        let mut row: Vec<String> = self
            .labels
            .iter()
            .map(|label| record.field(label).unwrap_or_default().to_string())
            .collect();

        if self.include_vin {
            row.push(record.vin.clone());
        }

        row.extend([
            record.equipment_field(),
            record.price.amount.clone(),
            record.price.currency.clone(),
            record.price.indicator_label.clone(),
            record.advert.published_at.clone(),
            record.advert.item_id.clone(),
            record.description.clone(),
        ]);
        row
    }
}
