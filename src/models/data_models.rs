use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;
use crate::pricing::compute_final_price;

/// One catalog entry with its derived final price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: i64,
    pub title: String,
    pub price: f64,
    pub discount_percentage: f64,
    pub final_price: f64,
}

impl Record {
    /// Build a record from list price and discount, deriving `final_price`.
    pub fn priced(id: i64, title: impl Into<String>, price: f64, discount_percentage: f64) -> Result<Self> {
        let final_price =
            compute_final_price(price, discount_percentage).map_err(|e| e.with_id(id))?;
        Ok(Record {
            id,
            title: title.into(),
            price,
            discount_percentage,
            final_price,
        })
    }
}

/// Records ordered by ascending `id`, one record per id.
///
/// Duplicate ids collapse to the record that came last in the input.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dataset {
    records: Vec<Record>,
}

impl Dataset {
    pub fn new(records: Vec<Record>) -> Self {
        let input_len = records.len();

        let mut by_id: HashMap<i64, Record> = HashMap::with_capacity(input_len);
        for record in records {
            by_id.insert(record.id, record);
        }

        let mut records: Vec<Record> = by_id.into_values().collect();
        records.sort_by_key(|r| r.id);

        if records.len() != input_len {
            warn!(
                "Collapsed {} duplicate ids (last occurrence kept)",
                input_len - records.len()
            );
        }

        Dataset { records }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: i64) -> Option<&Record> {
        self.records
            .binary_search_by_key(&id, |r| r.id)
            .ok()
            .map(|i| &self.records[i])
    }
}

impl FromIterator<Record> for Dataset {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Dataset::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Outcome of comparing an actual dataset with the expected baseline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciliationResult {
    pub most_expensive: Record,
    /// Actual records whose id is absent from the baseline.
    pub missing: Vec<Record>,
    pub matching_price_count: usize,
    /// Number of actual records; the "out of" figure in reports.
    pub actual_count: usize,
    /// Records whose id exists on both sides, i.e. those actually compared.
    pub compared_count: usize,
}

/// Envelope returned by the catalog endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductPage {
    pub total: usize,
    #[serde(default)]
    pub limit: usize,
    #[serde(default)]
    pub skip: usize,
    #[serde(default)]
    pub products: Vec<RawProduct>,
}

/// Product as sent by the API; other fields in the payload are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawProduct {
    pub id: i64,
    pub title: String,
    pub price: f64,
    #[serde(rename = "discountPercentage")]
    pub discount_percentage: f64,
}

impl TryFrom<RawProduct> for Record {
    type Error = crate::error::CatalogError;

    fn try_from(raw: RawProduct) -> Result<Self> {
        Record::priced(raw.id, raw.title, raw.price, raw.discount_percentage)
    }
}
