// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! OVHcloud API client.
//!
//! Requests are signed with the application secret and consumer key:
//!
//! ```text
//! X-Ovh-Signature: "$1$" + hex(sha1(secret + "+" + consumer + "+" + METHOD + "+" + url + "+" + body + "+" + timestamp))
//! ```
//!
//! The timestamp is the server clock, derived from `/auth/time` once per client.
//! Every mutation is followed by a zone refresh so the change is published.

use super::http::{build_client, decode, send};
use super::{absolute_name, relative_name, LibdnsRecord, RecordClient};
use crate::domain::unfqdn;
use crate::errors::ProviderError;
use crate::providers::ProviderEnv;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client as HttpClient, Method};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::fmt::Write as _;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::debug;

pub const PROVIDER_NAME: &str = "ovh";

const ENDPOINT_ENV: &str = "OVH_ENDPOINT";
const APPLICATION_KEY_ENV: &str = "OVH_APPLICATION_KEY";
const APPLICATION_SECRET_ENV: &str = "OVH_APPLICATION_SECRET";
const CONSUMER_KEY_ENV: &str = "OVH_CONSUMER_KEY";

/// Named API endpoints.
const ENDPOINTS: &[(&str, &str)] = &[
    ("ovh-eu", "https://eu.api.ovh.com/1.0"),
    ("ovh-ca", "https://ca.api.ovh.com/1.0"),
    ("ovh-us", "https://api.us.ovhcloud.com/1.0"),
    ("kimsufi-eu", "https://eu.api.kimsufi.com/1.0"),
    ("kimsufi-ca", "https://ca.api.kimsufi.com/1.0"),
    ("soyoustart-eu", "https://eu.api.soyoustart.com/1.0"),
    ("soyoustart-ca", "https://ca.api.soyoustart.com/1.0"),
];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OvhRecord {
    id: u64,
    field_type: String,
    #[serde(default)]
    sub_domain: String,
    target: String,
    #[serde(default)]
    ttl: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateRecord<'a> {
    field_type: &'a str,
    sub_domain: String,
    target: &'a str,
    ttl: u64,
}

/// Base URL for an endpoint name, or the value itself when it is already a URL.
///
/// # Errors
///
/// Returns [`ProviderError::Config`] for unknown names.
pub fn endpoint_url(endpoint: &str) -> Result<String, ProviderError> {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        return Ok(endpoint.trim_end_matches('/').to_string());
    }
    ENDPOINTS
        .iter()
        .find(|(name, _)| *name == endpoint)
        .map(|(_, url)| (*url).to_string())
        .ok_or_else(|| ProviderError::Config {
            provider: PROVIDER_NAME.to_string(),
            reason: format!("unknown endpoint '{endpoint}'"),
        })
}

/// `X-Ovh-Signature` value for a request.
#[must_use]
pub fn signature(
    application_secret: &str,
    consumer_key: &str,
    method: &str,
    url: &str,
    body: &str,
    timestamp: i64,
) -> String {
    let mut hasher = Sha1::new();
    hasher.update(
        format!("{application_secret}+{consumer_key}+{method}+{url}+{body}+{timestamp}").as_bytes(),
    );
    let digest = hasher.finalize();
    let mut out = String::with_capacity(3 + digest.len() * 2);
    out.push_str("$1$");
    for byte in digest {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

#[derive(Debug)]
pub struct OvhClient {
    http: HttpClient,
    base: String,
    application_key: String,
    application_secret: String,
    consumer_key: String,
    /// Server clock minus local clock, in seconds
    time_delta: OnceCell<i64>,
}

impl OvhClient {
    /// Client for the API at `base`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        base: &str,
        application_key: &str,
        application_secret: &str,
        consumer_key: &str,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            http: build_client(PROVIDER_NAME)?,
            base: base.trim_end_matches('/').to_string(),
            application_key: application_key.to_string(),
            application_secret: application_secret.to_string(),
            consumer_key: consumer_key.to_string(),
            time_delta: OnceCell::new(),
        })
    }

    /// Client configured from `OVH_ENDPOINT`, `OVH_APPLICATION_KEY`,
    /// `OVH_APPLICATION_SECRET` and `OVH_CONSUMER_KEY`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Config`] when a variable is missing or the endpoint is
    /// unknown.
    pub fn from_env(env: &ProviderEnv) -> Result<Self, ProviderError> {
        let base = endpoint_url(&env.require(PROVIDER_NAME, ENDPOINT_ENV)?)?;
        let application_key = env.require(PROVIDER_NAME, APPLICATION_KEY_ENV)?;
        let application_secret = env.require(PROVIDER_NAME, APPLICATION_SECRET_ENV)?;
        let consumer_key = env.require(PROVIDER_NAME, CONSUMER_KEY_ENV)?;
        Self::new(&base, &application_key, &application_secret, &consumer_key)
    }

    async fn timestamp(&self) -> Result<i64, ProviderError> {
        let delta = self
            .time_delta
            .get_or_try_init(|| async {
                let url = format!("{}/auth/time", self.base);
                let body = send(PROVIDER_NAME, self.http.get(url)).await?;
                let server: i64 = decode(PROVIDER_NAME, &body)?;
                let delta = server - chrono::Utc::now().timestamp();
                debug!(delta, "Synchronized with OVH API clock");
                Ok::<_, ProviderError>(delta)
            })
            .await?;
        Ok(chrono::Utc::now().timestamp() + delta)
    }

    async fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<String>,
    ) -> Result<String, ProviderError> {
        let url = format!("{}{path}", self.base);
        let body = body.unwrap_or_default();
        let timestamp = self.timestamp().await?;
        let signature = signature(
            &self.application_secret,
            &self.consumer_key,
            method.as_str(),
            &url,
            &body,
            timestamp,
        );
        let mut request = self
            .http
            .request(method, &url)
            .header("X-Ovh-Application", &self.application_key)
            .header("X-Ovh-Consumer", &self.consumer_key)
            .header("X-Ovh-Timestamp", timestamp.to_string())
            .header("X-Ovh-Signature", signature)
            .header(CONTENT_TYPE, "application/json");
        if !body.is_empty() {
            request = request.body(body);
        }
        send(PROVIDER_NAME, request).await
    }

    async fn refresh(&self, zone: &str) -> Result<(), ProviderError> {
        self.call(Method::POST, &format!("/domain/zone/{zone}/refresh"), None)
            .await?;
        debug!(zone = %zone, "Refreshed OVH zone");
        Ok(())
    }

    fn to_libdns(record: OvhRecord, zone: &str) -> LibdnsRecord {
        LibdnsRecord {
            id: record.id.to_string(),
            name: absolute_name(&record.sub_domain, zone),
            record_type: record.field_type,
            value: record.target,
            ttl: Duration::from_secs(record.ttl),
        }
    }
}

/// OVH writes the apex as an empty sub-domain.
fn sub_domain(name: &str, zone: &str) -> String {
    let relative = relative_name(name, zone);
    if relative == "@" {
        String::new()
    } else {
        relative
    }
}

fn encode_body<T: Serialize>(value: &T) -> Result<String, ProviderError> {
    serde_json::to_string(value).map_err(|e| ProviderError::UnexpectedResponse {
        provider: PROVIDER_NAME.to_string(),
        reason: format!("cannot encode request: {e}"),
    })
}

#[async_trait]
impl RecordClient for OvhClient {
    async fn get_records(&self, zone: &str) -> Result<Vec<LibdnsRecord>, ProviderError> {
        let bare = unfqdn(zone);
        let body = self
            .call(Method::GET, &format!("/domain/zone/{bare}/record"), None)
            .await?;
        let ids: Vec<u64> = decode(PROVIDER_NAME, &body)?;
        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            let body = self
                .call(Method::GET, &format!("/domain/zone/{bare}/record/{id}"), None)
                .await?;
            let record: OvhRecord = decode(PROVIDER_NAME, &body)?;
            records.push(Self::to_libdns(record, zone));
        }
        debug!(zone = %zone, records = records.len(), "Listed OVH records");
        Ok(records)
    }

    async fn append_records(
        &self,
        zone: &str,
        records: &[LibdnsRecord],
    ) -> Result<Vec<LibdnsRecord>, ProviderError> {
        let bare = unfqdn(zone);
        let mut created = Vec::with_capacity(records.len());
        for record in records {
            let payload = encode_body(&CreateRecord {
                field_type: &record.record_type,
                sub_domain: sub_domain(&record.name, zone),
                target: &record.value,
                ttl: record.ttl.as_secs(),
            })?;
            let body = self
                .call(Method::POST, &format!("/domain/zone/{bare}/record"), Some(payload))
                .await?;
            let record: OvhRecord = decode(PROVIDER_NAME, &body)?;
            created.push(Self::to_libdns(record, zone));
        }
        self.refresh(bare).await?;
        Ok(created)
    }

    async fn delete_records(
        &self,
        zone: &str,
        records: &[LibdnsRecord],
    ) -> Result<Vec<LibdnsRecord>, ProviderError> {
        let bare = unfqdn(zone);
        for record in records {
            self.call(
                Method::DELETE,
                &format!("/domain/zone/{bare}/record/{}", record.id),
                None,
            )
            .await?;
        }
        self.refresh(bare).await?;
        Ok(records.to_vec())
    }
}

#[cfg(test)]
#[path = "ovh_tests.rs"]
mod ovh_tests;
