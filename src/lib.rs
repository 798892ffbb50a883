//! Fetch a paginated product catalog, store it, and reconcile it against an expected baseline.

pub mod config;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod pricing;
pub mod reconcile;
pub mod report;
pub mod storage;

pub use error::{CatalogError, FetchError, FetchErrorKind, FetchStage};
pub use fetcher::{CatalogFetcher, HttpResponse, HttpTransport, WreqTransport};
pub use models::{Dataset, ReconciliationResult, Record};
pub use reconcile::reconcile;
pub use storage::DatasetStore;
