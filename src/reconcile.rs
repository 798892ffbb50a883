use std::collections::{HashMap, HashSet};

use tracing::info;

use crate::error::{CatalogError, Result};
use crate::models::{Dataset, ReconciliationResult, Record};

/// Compare the fetched catalog against the expected baseline.
///
/// Neither input is modified. `missing` keeps the actual dataset's canonical order.
pub fn reconcile(actual: &Dataset, expected: &Dataset) -> Result<ReconciliationResult> {
    let most_expensive = find_most_expensive(actual)?.clone();
    let missing: Vec<Record> = find_missing(actual, expected).into_iter().cloned().collect();
    let comparison = compare_prices(actual, expected);

    info!(
        "Reconciled {} actual against {} expected: {} missing, {} of {} compared prices match",
        actual.len(),
        expected.len(),
        missing.len(),
        comparison.matching,
        comparison.compared
    );

    Ok(ReconciliationResult {
        most_expensive,
        missing,
        matching_price_count: comparison.matching,
        actual_count: actual.len(),
        compared_count: comparison.compared,
    })
}

/// Highest `final_price`; on ties the record earliest in canonical order wins.
/// NaN prices lose to any number.
pub fn find_most_expensive(actual: &Dataset) -> Result<&Record> {
    let mut records = actual.iter();
    let mut best = records.next().ok_or(CatalogError::EmptyDataset)?;

    for record in records {
        if record.final_price > best.final_price
            || (best.final_price.is_nan() && !record.final_price.is_nan())
        {
            best = record;
        }
    }

    Ok(best)
}

/// Actual records whose id has no counterpart in `expected`.
pub fn find_missing<'a>(actual: &'a Dataset, expected: &Dataset) -> Vec<&'a Record> {
    let expected_ids: HashSet<i64> = expected.iter().map(|r| r.id).collect();

    actual
        .iter()
        .filter(|r| !expected_ids.contains(&r.id))
        .collect()
}

/// Actual records whose id is in `expected` with exactly the same final price.
pub fn count_matching_prices(actual: &Dataset, expected: &Dataset) -> usize {
    compare_prices(actual, expected).matching
}

struct PriceComparison {
    compared: usize,
    matching: usize,
}

fn compare_prices(actual: &Dataset, expected: &Dataset) -> PriceComparison {
    let expected_prices: HashMap<i64, f64> =
        expected.iter().map(|r| (r.id, r.final_price)).collect();

    let mut comparison = PriceComparison {
        compared: 0,
        matching: 0,
    };

    for record in actual {
        if let Some(&expected_price) = expected_prices.get(&record.id) {
            comparison.compared += 1;
            if record.final_price == expected_price {
                comparison.matching += 1;
            }
        }
    }

    comparison
}
