// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Scaleway Domains and DNS API client.
//!
//! Zones are addressed by name. Mutations go through the `PATCH` change-set endpoint,
//! which returns the records it touched.

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

pub const PROVIDER_NAME: &str = "scaleway";

/// Public API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.scaleway.com/domain/v2beta1";

const SECRET_KEY_ENV: &str = "SCALEWAY_SECRET_KEY";
const ORGANIZATION_ID_ENV: &str = "SCALEWAY_ORGANIZATION_ID";
const API_URL_ENV: &str = "SCALEWAY_API_URL";
const AUTH_HEADER: &str = "X-Auth-Token";
const PAGE_SIZE: &str = "1000";

#[derive(Debug, Deserialize)]
struct RecordsResponse {
    #[serde(default)]
    records: Vec<ScalewayRecord>,
}

#[derive(Debug, Deserialize, Serialize)]
struct ScalewayRecord {
    #[serde(default, skip_serializing)]
    id: String,
    name: String,
    #[serde(rename = "type")]
    record_type: String,
    data: String,
    ttl: u64,
}

#[derive(Debug, Serialize)]
struct ChangeSet {
    changes: Vec<Change>,
    return_all_records: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
enum Change {
    Add { records: Vec<ScalewayRecord> },
    Delete { id: String },
}

#[derive(Clone, Debug)]
pub struct ScalewayClient {
    http: HttpClient,
    base: String,
    secret_key: String,
    organization_id: String,
}

impl ScalewayClient {
    /// Client for `base` authenticated with `secret_key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base: &str, secret_key: &str, organization_id: &str) -> Result<Self, ProviderError> {
        Ok(Self {
            http: build_client(PROVIDER_NAME)?,
            base: base.to_string(),
            secret_key: secret_key.to_string(),
            organization_id: organization_id.to_string(),
        })
    }

    /// Client configured from `SCALEWAY_SECRET_KEY`, `SCALEWAY_ORGANIZATION_ID` and
    /// optionally `SCALEWAY_API_URL`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Config`] when a credential is missing.
    pub fn from_env(env: &ProviderEnv) -> Result<Self, ProviderError> {
        let secret_key = env.require(PROVIDER_NAME, SECRET_KEY_ENV)?;
        let organization_id = env.require(PROVIDER_NAME, ORGANIZATION_ID_ENV)?;
        Self::new(
            env.get(API_URL_ENV).unwrap_or(DEFAULT_API_URL),
            &secret_key,
            &organization_id,
        )
    }

    /// Organization the credentials belong to.
    #[must_use]
    pub fn organization_id(&self) -> &str {
        &self.organization_id
    }

    async fn patch(&self, zone: &str, changes: Vec<Change>) -> Result<Vec<ScalewayRecord>, ProviderError> {
        let url = endpoint(
            PROVIDER_NAME,
            &self.base,
            &["dns-zones", unfqdn(zone), "records"],
            &[],
        )?;
        let request = self
            .http
            .patch(url)
            .header(AUTH_HEADER, &self.secret_key)
            .json(&ChangeSet {
                changes,
                return_all_records: false,
            });
        let body = send(PROVIDER_NAME, request).await?;
        let response: RecordsResponse = decode(PROVIDER_NAME, &body)?;
        Ok(response.records)
    }
}

fn to_libdns(record: ScalewayRecord, zone: &str) -> LibdnsRecord {
    LibdnsRecord {
        id: record.id,
        name: absolute_name(&record.name, zone),
        record_type: record.record_type,
        value: record.data,
        ttl: Duration::from_secs(record.ttl),
    }
}

/// Scaleway writes the apex as an empty name.
fn scaleway_name(name: &str, zone: &str) -> String {
    let relative = relative_name(name, zone);
    if relative == "@" {
        String::new()
    } else {
        relative
    }
}

#[async_trait]
impl RecordClient for ScalewayClient {
    async fn get_records(&self, zone: &str) -> Result<Vec<LibdnsRecord>, ProviderError> {
        let url = endpoint(
            PROVIDER_NAME,
            &self.base,
            &["dns-zones", unfqdn(zone), "records"],
            &[("page_size", PAGE_SIZE)],
        )?;
        let body = send(PROVIDER_NAME, self.http.get(url).header(AUTH_HEADER, &self.secret_key)).await?;
        let response: RecordsResponse = decode(PROVIDER_NAME, &body)?;
        debug!(zone = %zone, records = response.records.len(), "Listed Scaleway records");
        Ok(response
            .records
            .into_iter()
            .map(|r| to_libdns(r, zone))
            .collect())
    }

    async fn append_records(
        &self,
        zone: &str,
        records: &[LibdnsRecord],
    ) -> Result<Vec<LibdnsRecord>, ProviderError> {
        let add = records
            .iter()
            .map(|r| ScalewayRecord {
                id: String::new(),
                name: scaleway_name(&r.name, zone),
                record_type: r.record_type.clone(),
                data: r.value.clone(),
                ttl: r.ttl.as_secs(),
            })
            .collect();
        let created = self.patch(zone, vec![Change::Add { records: add }]).await?;
        Ok(created.into_iter().map(|r| to_libdns(r, zone)).collect())
    }

    async fn delete_records(
        &self,
        zone: &str,
        records: &[LibdnsRecord],
    ) -> Result<Vec<LibdnsRecord>, ProviderError> {
        let changes = records
            .iter()
            .map(|r| Change::Delete { id: r.id.clone() })
            .collect();
        self.patch(zone, changes).await?;
        debug!(zone = %zone, records = records.len(), "Deleted Scaleway records");
        Ok(records.to_vec())
    }
}

#[cfg(test)]
#[path = "scaleway_tests.rs"]
mod scaleway_tests;
