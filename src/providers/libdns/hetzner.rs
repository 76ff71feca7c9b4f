// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Hetzner DNS API client.
//!
//! Records are addressed through the id of their zone, looked up by name before each
//! operation. Record names are relative to the zone, `@` for the apex.

use super::http::{build_client, decode, endpoint, send};
use super::{absolute_name, relative_name, LibdnsRecord, RecordClient};
use crate::domain::unfqdn;
use crate::errors::ProviderError;
use crate::providers::ProviderEnv;
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub const PROVIDER_NAME: &str = "hetzner";

/// Public API endpoint.
pub const DEFAULT_API_URL: &str = "https://dns.hetzner.com/api/v1";

const TOKEN_ENV: &str = "HETZNER_TOKEN";
const API_URL_ENV: &str = "HETZNER_API_URL";
const AUTH_HEADER: &str = "Auth-API-Token";

#[derive(Debug, Deserialize)]
struct ZonesResponse {
    #[serde(default)]
    zones: Vec<HetznerZone>,
}

#[derive(Debug, Deserialize)]
struct HetznerZone {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct RecordsResponse {
    #[serde(default)]
    records: Vec<HetznerRecord>,
}

#[derive(Debug, Deserialize)]
struct RecordResponse {
    record: HetznerRecord,
}

#[derive(Debug, Deserialize)]
struct HetznerRecord {
    id: String,
    #[serde(rename = "type")]
    record_type: String,
    name: String,
    value: String,
    #[serde(default)]
    ttl: Option<u64>,
}

#[derive(Debug, Serialize)]
struct CreateRecord<'a> {
    zone_id: &'a str,
    #[serde(rename = "type")]
    record_type: &'a str,
    name: String,
    value: &'a str,
    ttl: u64,
}

#[derive(Clone, Debug)]
pub struct HetznerClient {
    http: HttpClient,
    base: String,
    token: String,
}

impl HetznerClient {
    /// Client for `base` authenticated with `token`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base: &str, token: &str) -> Result<Self, ProviderError> {
        Ok(Self {
            http: build_client(PROVIDER_NAME)?,
            base: base.to_string(),
            token: token.to_string(),
        })
    }

    /// Client configured from `HETZNER_TOKEN` and optionally `HETZNER_API_URL`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Config`] when the token is missing.
    pub fn from_env(env: &ProviderEnv) -> Result<Self, ProviderError> {
        let token = env.require(PROVIDER_NAME, TOKEN_ENV)?;
        Self::new(env.get(API_URL_ENV).unwrap_or(DEFAULT_API_URL), &token)
    }

    async fn zone_id(&self, zone: &str) -> Result<String, ProviderError> {
        let bare = unfqdn(zone);
        let url = endpoint(PROVIDER_NAME, &self.base, &["zones"], &[("name", bare)])?;
        let body = send(PROVIDER_NAME, self.http.get(url).header(AUTH_HEADER, &self.token)).await?;
        let response: ZonesResponse = decode(PROVIDER_NAME, &body)?;
        response
            .zones
            .into_iter()
            .find(|z| z.name.eq_ignore_ascii_case(bare))
            .map(|z| z.id)
            .ok_or_else(|| ProviderError::UnexpectedResponse {
                provider: PROVIDER_NAME.to_string(),
                reason: format!("zone '{bare}' not found"),
            })
    }

    fn to_libdns(&self, record: HetznerRecord, zone: &str) -> LibdnsRecord {
        LibdnsRecord {
            id: record.id,
            name: absolute_name(&record.name, zone),
            record_type: record.record_type,
            value: record.value,
            ttl: Duration::from_secs(record.ttl.unwrap_or_default()),
        }
    }
}

#[async_trait]
impl RecordClient for HetznerClient {
    async fn get_records(&self, zone: &str) -> Result<Vec<LibdnsRecord>, ProviderError> {
        let zone_id = self.zone_id(zone).await?;
        let url = endpoint(PROVIDER_NAME, &self.base, &["records"], &[("zone_id", zone_id.as_str())])?;
        let body = send(PROVIDER_NAME, self.http.get(url).header(AUTH_HEADER, &self.token)).await?;
        let response: RecordsResponse = decode(PROVIDER_NAME, &body)?;
        debug!(zone = %zone, records = response.records.len(), "Listed Hetzner records");
        Ok(response
            .records
            .into_iter()
            .map(|r| self.to_libdns(r, zone))
            .collect())
    }

    async fn append_records(
        &self,
        zone: &str,
        records: &[LibdnsRecord],
    ) -> Result<Vec<LibdnsRecord>, ProviderError> {
        let zone_id = self.zone_id(zone).await?;
        let url = endpoint(PROVIDER_NAME, &self.base, &["records"], &[])?;
        let mut created = Vec::with_capacity(records.len());
        for record in records {
            let payload = CreateRecord {
                zone_id: &zone_id,
                record_type: &record.record_type,
                name: relative_name(&record.name, zone),
                value: &record.value,
                ttl: record.ttl.as_secs(),
            };
            let request = self
                .http
                .post(url.clone())
                .header(AUTH_HEADER, &self.token)
                .json(&payload);
            let body = send(PROVIDER_NAME, request).await?;
            let response: RecordResponse = decode(PROVIDER_NAME, &body)?;
            created.push(self.to_libdns(response.record, zone));
        }
        Ok(created)
    }

    async fn delete_records(
        &self,
        zone: &str,
        records: &[LibdnsRecord],
    ) -> Result<Vec<LibdnsRecord>, ProviderError> {
        for record in records {
            let url = endpoint(PROVIDER_NAME, &self.base, &["records", record.id.as_str()], &[])?;
            send(PROVIDER_NAME, self.http.delete(url).header(AUTH_HEADER, &self.token)).await?;
            debug!(zone = %zone, id = %record.id, "Deleted Hetzner record");
        }
        Ok(records.to_vec())
    }
}

#[cfg(test)]
#[path = "hetzner_tests.rs"]
mod hetzner_tests;
