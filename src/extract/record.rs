use std::collections::HashMap;

/// Separator between equipment items in the flattened equipment field
pub const EQUIPMENT_SEPARATOR: &str = "|";

/// Asking price as displayed on the listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Price {
    pub amount: String,
    pub currency: String,
    /// The site's price-level verdict (e.g. "Poniżej średniej")
    pub indicator_label: String,
}

/// Publication details from the bottom of the listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdvertMetadata {
    pub published_at: String,
    pub item_id: String,
}

/// One listing converted into a fixed set of fields
///
/// Every required label is present, in configuration order, with an empty
/// string when the page did not provide it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingRecord {
    fields: Vec<(String, String)>,
    pub vin: String,
    pub equipment: Vec<String>,
    pub price: Price,
    pub advert: AdvertMetadata,
    pub description: String,
}

impl ListingRecord {
    /// Builds a record holding exactly `labels`, filled from `found`
    pub fn new(labels: &[String], mut found: HashMap<String, String>) -> Self {
        let fields = labels
            .iter()
            .map(|label| {
                let value = found.remove(label).unwrap_or_default();
                (label.clone(), value)
            })
            .collect();

        Self {
            fields,
            ..Self::default()
        }
    }

    /// Value of a required field, `None` if the label is not required
    pub fn field(&self, label: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }

    /// Required fields in column order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(l, v)| (l.as_str(), v.as_str()))
    }

    /// Number of required fields with a non-empty value
    pub fn filled_fields(&self) -> usize {
        self.fields.iter().filter(|(_, v)| !v.is_empty()).count()
    }

    /// Equipment items joined into a single column value
    pub fn equipment_field(&self) -> String {
        self.equipment.join(EQUIPMENT_SEPARATOR)
    }
}
