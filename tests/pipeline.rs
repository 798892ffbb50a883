use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use catalog_recon::config::FetchConfig;
use catalog_recon::pricing::compute_final_price;
use catalog_recon::{
    CatalogError, CatalogFetcher, Dataset, DatasetStore, HttpResponse, HttpTransport, Record,
    reconcile,
};
use serde_json::json;

const BASE: &str = "https://dummyjson.test/products";

struct FakeCatalog {
    products: Vec<serde_json::Value>,
    requests: Mutex<Vec<String>>,
}

impl FakeCatalog {
    fn new(count: i64) -> Self {
        let products = (1..=count)
            .map(|id| {
                json!({
                    "id": id,
                    "title": format!("Item {}", id),
                    "price": (id * 333) as f64 / 100.0,
                    "discountPercentage": (id % 20) as f64 * 1.5,
                    "category": "misc"
                })
            })
            .collect();
        FakeCatalog {
            products,
            requests: Mutex::new(Vec::new()),
        }
    }
}

fn param(url: &str, key: &str) -> Option<usize> {
    url.split_once('?')?.1.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == key).then(|| v.parse().ok()).flatten()
    })
}

#[async_trait]
impl HttpTransport for FakeCatalog {
    async fn get(&self, url: &str) -> anyhow::Result<HttpResponse> {
        self.requests.lock().unwrap().push(url.to_string());

        let limit = param(url, "limit").unwrap_or(30);
        let skip = param(url, "skip").unwrap_or(0);
        let end = (skip + limit).min(self.products.len());
        let start = skip.min(end);

        let body = json!({
            "total": self.products.len(),
            "skip": skip,
            "limit": limit,
            "products": &self.products[start..end],
        });
        Ok(HttpResponse {
            status: 200,
            body: body.to_string(),
        })
    }
}

fn fetch_options() -> FetchConfig {
    FetchConfig {
        concurrency: 3,
        max_retries: 2,
        retry_backoff_ms: 0,
        timeout_seconds: 5,
    }
}

#[tokio::test]
async fn fetch_store_load_and_reconcile() {
    let dir = tempfile::tempdir().unwrap();
    let actual_path = dir.path().join("raw").join("raw_product_data.parquet");
    let expected_path = dir.path().join("product_prices_calculated.parquet");
    let store = DatasetStore;

    let fetcher = CatalogFetcher::new(FakeCatalog::new(194), fetch_options());
    let fetched = fetcher.fetch_all(BASE, 50).await.unwrap();
    assert_eq!(fetched.len(), 194);

    store.save(&fetched, &actual_path).unwrap();
    let actual = store.load(&actual_path).unwrap();
    assert_eq!(actual, fetched);

    // Baseline: drop ids 10 and 20, perturb id 30, add an id the API never returned.
    let mut baseline: Vec<Record> = actual
        .iter()
        .filter(|r| r.id != 10 && r.id != 20)
        .cloned()
        .collect();
    for record in baseline.iter_mut().filter(|r| r.id == 30) {
        record.final_price += 1.0;
    }
    baseline.push(Record::priced(5000, "Discontinued", 1.0, 0.0).unwrap());
    store.save(&Dataset::new(baseline), &expected_path).unwrap();

    let expected = store.load(&expected_path).unwrap();
    let result = reconcile(&actual, &expected).unwrap();

    let missing: Vec<i64> = result.missing.iter().map(|r| r.id).collect();
    assert_eq!(missing, vec![10, 20]);
    assert_eq!(result.actual_count, 194);
    assert_eq!(result.compared_count, 192);
    assert_eq!(result.matching_price_count, 191);

    let top = actual
        .iter()
        .map(|r| r.final_price)
        .fold(f64::MIN, f64::max);
    assert_eq!(result.most_expensive.final_price, top);
}

#[tokio::test]
async fn pagination_issues_one_request_per_page() {
    let catalog = Arc::new(FakeCatalog::new(194));
    let fetcher = CatalogFetcher::new(catalog.clone(), fetch_options());
    let dataset = fetcher.fetch_all(BASE, 50).await.unwrap();
    assert_eq!(dataset.len(), 194);

    // probe plus four pages
    let requests = catalog.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 5);
    assert_eq!(param(&requests[0], "limit"), Some(1));
    let mut skips: Vec<usize> = requests[1..].iter().filter_map(|u| param(u, "skip")).collect();
    skips.sort();
    assert_eq!(skips, vec![0, 50, 100, 150]);
}

#[tokio::test]
async fn fetched_prices_follow_calculator() {
    let fetcher = CatalogFetcher::new(FakeCatalog::new(25), fetch_options());
    let dataset = fetcher.fetch_all(BASE, 7).await.unwrap();

    for record in &dataset {
        let expected = compute_final_price(record.price, record.discount_percentage).unwrap();
        assert_eq!(record.final_price, expected);
        assert!(record.final_price <= record.price);
    }
}

#[test]
fn empty_actual_dataset_cannot_be_reconciled() {
    let err = reconcile(&Dataset::default(), &Dataset::default()).unwrap_err();
    assert!(matches!(err, CatalogError::EmptyDataset));
}
