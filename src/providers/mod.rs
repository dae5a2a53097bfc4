//! HTTP clients implementing the core store traits.

pub mod google;
pub mod notion;

pub use google::GoogleCalendarClient;
pub use notion::NotionClient;

use std::time::Duration;

use notion_gcal_core::{StoreError, StoreResult};
use serde::de::DeserializeOwned;

/// Seconds to wait when a 429 comes without Retry-After
const DEFAULT_RETRY_AFTER: u64 = 60;

fn http_client(timeout: Duration) -> StoreResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(network)
}

fn network(e: reqwest::Error) -> StoreError {
    StoreError::Network(e.to_string())
}

/// Decode a successful JSON body, or map the failure status.
async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> StoreResult<T> {
    if response.status().is_success() {
        response
            .json()
            .await
            .map_err(|e| StoreError::Parse(e.to_string()))
    } else {
        Err(error_for_status(response).await)
    }
}

/// For calls whose success carries no body worth reading.
async fn handle_empty(response: reqwest::Response) -> StoreResult<()> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(error_for_status(response).await)
    }
}

async fn error_for_status(response: reqwest::Response) -> StoreError {
    let status = response.status().as_u16();

    if status == 429 {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_RETRY_AFTER);
        return StoreError::RateLimited(retry_after);
    }

    let text = response.text().await.unwrap_or_default();
    match status {
        401 | 403 => StoreError::Unauthorized(text),
        404 | 410 => StoreError::NotFound(text),
        _ => StoreError::Api {
            status,
            message: text,
        },
    }
}
