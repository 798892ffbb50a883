use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use wreq::Client;
use wreq_util::Emulation;

/// Status and raw body of a GET request.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The HTTP capability the fetcher needs. Errors are connection-level failures only;
/// non-success statuses come back as a normal `HttpResponse`.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpResponse>;
}

#[async_trait]
impl<T: HttpTransport + ?Sized> HttpTransport for Arc<T> {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        (**self).get(url).await
    }
}

pub struct WreqTransport {
    client: Client,
}

impl WreqTransport {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .emulation(Emulation::Firefox136)
            .build()?;

        Ok(WreqTransport { client })
    }
}

#[async_trait]
impl HttpTransport for WreqTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(HttpResponse { status, body })
    }
}
