// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! HTTP plumbing shared by the hosted DNS clients.

use crate::constants::PROVIDER_HTTP_TIMEOUT_SECS;
use crate::errors::ProviderError;
use reqwest::{Client as HttpClient, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error};
use url::Url;

/// HTTP client with the provider request timeout.
///
/// # Errors
///
/// Returns [`ProviderError::Http`] if the TLS backend cannot be initialized.
pub fn build_client(provider: &str) -> Result<HttpClient, ProviderError> {
    HttpClient::builder()
        .timeout(Duration::from_secs(PROVIDER_HTTP_TIMEOUT_SECS))
        .build()
        .map_err(|source| ProviderError::Http {
            provider: provider.to_string(),
            source,
        })
}

/// `base` with `segments` appended to its path and `query` as query string.
///
/// # Errors
///
/// Returns [`ProviderError::Config`] when `base` is not an absolute http(s) URL.
pub fn endpoint(
    provider: &str,
    base: &str,
    segments: &[&str],
    query: &[(&str, &str)],
) -> Result<Url, ProviderError> {
    let config_error = |reason: String| ProviderError::Config {
        provider: provider.to_string(),
        reason,
    };
    let mut url = Url::parse(base).map_err(|e| config_error(format!("invalid API URL '{base}': {e}")))?;
    url.path_segments_mut()
        .map_err(|()| config_error(format!("API URL '{base}' cannot have a path")))?
        .pop_if_empty()
        .extend(segments);
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }
    Ok(url)
}

/// Send `request` and return the body of a successful response.
///
/// # Errors
///
/// Returns [`ProviderError::Http`] when the request cannot be performed and
/// [`ProviderError::Api`] for non-success statuses.
pub async fn send(provider: &str, request: RequestBuilder) -> Result<String, ProviderError> {
    let http_error = |source| ProviderError::Http {
        provider: provider.to_string(),
        source,
    };
    let response = request.send().await.map_err(http_error)?;
    let status = response.status();
    let url = response.url().clone();
    let body = response.text().await.map_err(http_error)?;

    if !status.is_success() {
        error!(provider = %provider, url = %url, status = %status, body = %body, "Provider API request failed");
        return Err(ProviderError::Api {
            provider: provider.to_string(),
            status: status.as_u16(),
            body,
        });
    }
    debug!(provider = %provider, url = %url, status = %status, response_len = body.len(), "Provider API request successful");
    Ok(body)
}

/// Decode a JSON body.
///
/// # Errors
///
/// Returns [`ProviderError::UnexpectedResponse`] when the body does not match `T`.
pub fn decode<T: DeserializeOwned>(provider: &str, body: &str) -> Result<T, ProviderError> {
    serde_json::from_str(body).map_err(|e| ProviderError::UnexpectedResponse {
        provider: provider.to_string(),
        reason: format!("invalid JSON: {e}"),
    })
}
