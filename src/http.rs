//! JSON-over-HTTP helper shared by the embedding and generation providers.
//!
//! Maps transport failures and non-success statuses onto [`ProviderError`]
//! so the retry policy can tell transient failures from permanent ones.

use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use repo_chat_core::ProviderError;

/// Build a client with a per-request timeout.
pub fn client(timeout: Duration) -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::Network(format!("failed to build HTTP client: {}", e)))
}

/// POST `body` as JSON and return the decoded JSON response.
pub async fn post_json<B: Serialize + ?Sized>(
    client: &Client,
    url: &str,
    bearer: Option<&str>,
    body: &B,
    timeout: Duration,
) -> Result<Value, ProviderError> {
    let mut req = client.post(url).json(body);
    if let Some(token) = bearer {
        req = req.bearer_auth(token);
    }

    let response = req
        .send()
        .await
        .map_err(|e| transport_error(e, timeout))?;
    let status = response.status();

    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(ProviderError::from_status(status.as_u16(), &text));
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| ProviderError::InvalidResponse(format!("POST {} decode failed: {}", url, e)))
}

fn transport_error(e: reqwest::Error, timeout: Duration) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(timeout)
    } else {
        ProviderError::Network(e.to_string())
    }
}
