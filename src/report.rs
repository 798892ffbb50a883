
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{ReconciliationResult, Record};

/// JSON shape of a reconciliation run.
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub generated_at: DateTime<Utc>,
    pub source: &'a str,
    pub most_expensive: ProductSummary<'a>,
    pub missing_products: Vec<ProductSummary<'a>>,
    pub matching_price_count: usize,
    pub actual_count: usize,
    pub compared_count: usize,
}

#[derive(Debug, Serialize)]
pub struct ProductSummary<'a> {
    pub id: i64,
    pub title: &'a str,
    pub final_price: f64,
}

impl<'a> From<&'a Record> for ProductSummary<'a> {
    fn from(record: &'a Record) -> Self {
        ProductSummary {
            id: record.id,
            title: &record.title,
            final_price: record.final_price,
        }
    }
}

impl<'a> Report<'a> {
    pub fn new(source: &'a str, result: &'a ReconciliationResult) -> Self {
        Report {
            generated_at: Utc::now(),
            source,
            most_expensive: (&result.most_expensive).into(),
            missing_products: result.missing.iter().map(ProductSummary::from).collect(),
            matching_price_count: result.matching_price_count,
            actual_count: result.actual_count,
            compared_count: result.compared_count,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Plain-text rendering for the terminal.
pub fn render_text(result: &ReconciliationResult) -> String {
    let mut lines = vec![
        "--- Most Expensive Product ---".to_string(),
        format!("Product: {}", result.most_expensive.title),
        format!("Price: {:.2}", result.most_expensive.final_price),
        String::new(),
        "--- Missing Products in Expected Data ---".to_string(),
    ];

    if result.missing.is_empty() {
        lines.push("No products are missing.".to_string());
    } else {
        lines.push(format!("Number of missing products: {}", result.missing.len()));
        let width = result
            .missing
            .iter()
            .map(|r| r.id.to_string().len())
            .max()
            .unwrap_or(2)
            .max(2);
        lines.push(format!("{:>width$}  title", "id"));
        for record in &result.missing {
            lines.push(format!("{:>width$}  {}", record.id, record.title));
        }
    }

    lines.push(String::new());
    lines.push("--- Price Comparison ---".to_string());
    lines.push(format!(
        "Number of matching rows (final prices): {} out of {} ({} compared by id)",
        result.matching_price_count, result.actual_count, result.compared_count
    ));

    let mut out = lines.join("\n");
    out.push('\n');
    out
}
