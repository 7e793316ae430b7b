//! HTTP client initialization.

use std::time::Duration;

use reqwest::ClientBuilder;

use crate::config::USER_AGENT;
use crate::error_handling::InitializationError;

/// Builds the shared HTTP client used by the registry and scrape sources.
///
/// One client serves the whole run, so connection pools and cookies persist
/// across the scrape stage the way a browser session would.
///
/// # Errors
///
/// Returns `InitializationError::HttpClientError` if client creation fails.
pub fn init_client(timeout_seconds: u64) -> Result<reqwest::Client, InitializationError> {
    let client = ClientBuilder::new()
        .timeout(Duration::from_secs(timeout_seconds))
        .user_agent(USER_AGENT)
        .cookie_store(true)
        .build()?;
    Ok(client)
}
