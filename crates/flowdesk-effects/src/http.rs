use std::time::Duration;

use futures::future::BoxFuture;
use tracing::debug;

use flowdesk_core::config::HttpConfig;
use flowdesk_core::error::{FlowdeskError, Result};
use flowdesk_core::traits::{HttpFetch, HttpResponse};

/// Outbound GET over reqwest. No retries, no credentials.
pub struct ReqwestFetch {
    client: reqwest::Client,
}

impl ReqwestFetch {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| FlowdeskError::Http(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

impl HttpFetch for ReqwestFetch {
    fn get(&self, url: String) -> BoxFuture<'_, Result<HttpResponse>> {
        Box::pin(async move {
            debug!(url = %url, "Fetching URL");

            let resp = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| FlowdeskError::Http(format!("Request failed: {}", e)))?;

            let status = resp.status().as_u16();
            let body = resp
                .text()
                .await
                .map_err(|e| FlowdeskError::Http(format!("Failed to read response body: {}", e)))?;

            debug!(url = %url, status, bytes = body.len(), "Fetched");
            Ok(HttpResponse::new(status, body))
        })
    }
}
