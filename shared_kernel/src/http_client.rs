use anyhow::Context;
use lazy_static::lazy_static;
use reqwest::Response;
use reqwest_tracing::TracingMiddleware;
use std::time::Duration;

use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

lazy_static! {
    static ref CLIENT: ClientWithMiddleware = {
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(3);
        ClientBuilder::new(reqwest::Client::new())
            // Retry failed requests.
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .with(TracingMiddleware::default())
            .build()
    };
    // Posts are not idempotent; a retried `sendMessage` delivers twice.
    static ref CLIENT_WITHOUT_RETRY: ClientWithMiddleware = ClientBuilder::new(reqwest::Client::new())
        .with(TracingMiddleware::default())
        .build();
}

pub struct HttpClient;

/// Error messages only carry the origin of the url, paths may contain credentials.
fn origin(url: &Url) -> String {
    url.origin().ascii_serialization()
}

impl HttpClient {
    async fn get(url: Url, timeout: Duration) -> anyhow::Result<Response> {
        CLIENT
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .with_context(|| format!("Failed to fetch request from {url}"))
    }

    pub async fn get_json<DTO: DeserializeOwned>(url: Url, timeout: Duration) -> anyhow::Result<DTO> {
        let response = Self::get(url.clone(), timeout).await?;
        let status = response.status();
        response
            .json::<DTO>()
            .await
            .with_context(|| format!("Failed to deserialize response from {url} (status {status})"))
    }

    pub async fn post_json<Body: Serialize + ?Sized, DTO: DeserializeOwned>(
        url: Url,
        body: &Body,
        timeout: Duration,
    ) -> anyhow::Result<DTO> {
        let body = serde_json::to_vec(body).context("Failed to serialize request body")?;
        let response = CLIENT_WITHOUT_RETRY
            .post(url.clone())
            .timeout(timeout)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .with_context(|| format!("Failed to post request to {}", origin(&url)))?;
        let status = response.status();
        response.json::<DTO>().await.with_context(|| {
            format!(
                "Failed to deserialize response from {} (status {status})",
                origin(&url)
            )
        })
    }
}
