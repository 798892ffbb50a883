use std::time::Duration;

use futures::stream::{self, StreamExt, TryStreamExt};
use tokio::time::{sleep, timeout};
use tracing::{info, warn};

use crate::config::{CatalogConfig, FetchConfig};
use crate::error::{CatalogError, FetchError, FetchErrorKind, FetchStage, Result};
use crate::fetcher::transport::{HttpTransport, WreqTransport};
use crate::models::{Dataset, ProductPage, Record};

/// Pulls a complete catalog out of a `limit`/`skip` paginated endpoint.
pub struct CatalogFetcher<T: HttpTransport> {
    transport: T,
    options: FetchConfig,
    probe_limit: usize,
}

impl CatalogFetcher<WreqTransport> {
    pub fn from_config(config: &CatalogConfig) -> anyhow::Result<Self> {
        let transport = WreqTransport::new()?;
        Ok(CatalogFetcher::new(transport, config.fetch.clone())
            .with_probe_limit(config.pagination.probe_limit))
    }
}

impl<T: HttpTransport> CatalogFetcher<T> {
    pub fn new(transport: T, options: FetchConfig) -> Self {
        CatalogFetcher {
            transport,
            options,
            probe_limit: 1,
        }
    }

    pub fn with_probe_limit(mut self, probe_limit: usize) -> Self {
        self.probe_limit = probe_limit.max(1);
        self
    }

    /// Ask the endpoint for its `total` with a minimal page. Not retried.
    pub async fn probe_total(&self, base_url: &str) -> Result<usize> {
        let url = build_url(base_url, &[("limit", self.probe_limit)]);
        info!("Probing catalog size: {}", url);

        let page = self.get_page_once(&url, FetchStage::Probe).await?;
        info!("Catalog reports {} products", page.total);

        Ok(page.total)
    }

    /// Fetch every page, price every product and assemble one dataset.
    ///
    /// Pages run concurrently up to `concurrency`; the first page that fails for good
    /// aborts the whole fetch and anything already downloaded is dropped.
    pub async fn fetch_all(&self, base_url: &str, page_size: usize) -> Result<Dataset> {
        if page_size == 0 {
            return Err(CatalogError::Config("page_size must be positive".into()));
        }

        let total = self.probe_total(base_url).await?;
        let offsets = page_offsets(total, page_size);

        info!(
            "Fetching {} pages of up to {} products ({} in flight)",
            offsets.len(),
            page_size,
            self.options.concurrency
        );

        let mut pages: Vec<(usize, Vec<Record>)> = stream::iter(
            offsets
                .into_iter()
                .map(|skip| self.fetch_page(base_url, page_size, skip, total)),
        )
        .buffer_unordered(self.options.concurrency.max(1))
        .try_collect()
        .await?;

        pages.sort_by_key(|(skip, _)| *skip);
        let records: Vec<Record> = pages.into_iter().flat_map(|(_, page)| page).collect();

        // Counted after de-duplication: an overlapping page must not pad the total.
        let dataset = Dataset::new(records);
        if dataset.len() != total {
            return Err(FetchError::count_mismatch(total, dataset.len()).into());
        }

        info!("Assembled {} products", dataset.len());

        Ok(dataset)
    }

    async fn fetch_page(
        &self,
        base_url: &str,
        page_size: usize,
        skip: usize,
        expected_total: usize,
    ) -> Result<(usize, Vec<Record>)> {
        let url = build_url(base_url, &[("limit", page_size), ("skip", skip)]);
        let page = self
            .get_page_with_retry(&url, FetchStage::Page { skip })
            .await?;

        if page.total != expected_total {
            warn!(
                "Page at skip={} reports total {} but probe saw {}",
                skip, page.total, expected_total
            );
        }

        let records = page
            .products
            .into_iter()
            .map(Record::try_from)
            .collect::<Result<Vec<_>>>()?;

        info!("Fetched {} products at skip={}", records.len(), skip);

        Ok((skip, records))
    }

    async fn get_page_with_retry(
        &self,
        url: &str,
        stage: FetchStage,
    ) -> std::result::Result<ProductPage, FetchError> {
        let max_attempts = self.options.max_retries.max(1);
        let mut attempts = 0;

        loop {
            attempts += 1;
            match self.get_page_once(url, stage).await {
                Ok(page) => return Ok(page),
                Err(e) if e.kind.is_retryable() && attempts < max_attempts => {
                    let delay = self.backoff_delay(attempts);
                    warn!(
                        "Attempt {} failed for {}, retrying in {:?}: {}",
                        attempts, url, delay, e
                    );
                    sleep(delay).await;
                }
                Err(mut e) => {
                    e.attempts = attempts;
                    return Err(e);
                }
            }
        }
    }

    async fn get_page_once(
        &self,
        url: &str,
        stage: FetchStage,
    ) -> std::result::Result<ProductPage, FetchError> {
        let limit = self.options.timeout();

        let response = match timeout(limit, self.transport.get(url)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                return Err(FetchError::new(
                    stage,
                    FetchErrorKind::Transport {
                        url: url.to_string(),
                        message: e.to_string(),
                    },
                ));
            }
            Err(_) => {
                return Err(FetchError::new(
                    stage,
                    FetchErrorKind::Timeout {
                        url: url.to_string(),
                        after: limit,
                    },
                ));
            }
        };

        if !response.is_success() {
            return Err(FetchError::new(
                stage,
                FetchErrorKind::Status {
                    url: url.to_string(),
                    status: response.status,
                },
            ));
        }

        serde_json::from_str(&response.body).map_err(|e| {
            FetchError::new(
                stage,
                FetchErrorKind::Malformed {
                    url: url.to_string(),
                    message: e.to_string(),
                },
            )
        })
    }

    // Exponential backoff with jitter no larger than the base delay.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.options.backoff();
        let exp = base.saturating_mul(2_u32.saturating_pow(attempt.saturating_sub(1)));
        let jitter_ms = rand::random::<u64>() % (base.as_millis() as u64).saturating_add(1);
        exp.saturating_add(Duration::from_millis(jitter_ms))
    }
}

/// Start offsets of every page covering `[0, total)`.
pub fn page_offsets(total: usize, page_size: usize) -> Vec<usize> {
    if page_size == 0 {
        return Vec::new();
    }
    (0..total).step_by(page_size).collect()
}

fn build_url(base_url: &str, params: &[(&str, usize)]) -> String {
    let query = params
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&");
    let sep = if base_url.contains('?') { '&' } else { '?' };
    format!("{}{}{}", base_url, sep, query)
}
