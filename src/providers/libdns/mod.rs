// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Hosted DNS providers.
//!
//! Every backend implements [`RecordClient`], three operations against a zone named by
//! its registrable domain (`example.com.`). [`RemoteProvider`] drives a client through
//! the create, update and delete paths and keeps the provider-assigned record id in
//! `status.id`.
//!
//! # Value encoding
//!
//! | Type | Value |
//! |------|-------|
//! | A, AAAA | textual address |
//! | CNAME, NS | fully qualified name |
//! | TXT | strings concatenated without delimiter |
//! | MX | `<preference> <host>` |
//! | SRV | `<priority> <weight> <port> <target>` |

pub mod hetzner;
pub mod http;
pub mod ovh;
pub mod scaleway;
pub mod sync;

use super::{release, Provider, ProviderOutcome, Registry};
use crate::admission::apply_spec_defaults;
use crate::crd::DNSRecord;
use crate::domain::{fqdn, registrable_domain};
use crate::errors::ProviderError;
use crate::metrics::record_provider_operation;
use crate::record::spec_to_rr;
use async_trait::async_trait;
use hickory_proto::rr::{RData, Record};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// A record as seen by a hosted DNS API.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LibdnsRecord {
    /// Provider-assigned identifier, empty for records not created yet
    pub id: String,
    /// Fully qualified owner name
    pub name: String,
    /// Upper-case type mnemonic
    pub record_type: String,
    pub value: String,
    pub ttl: Duration,
}

/// Zone-level record operations of a hosted DNS API.
#[async_trait]
pub trait RecordClient: Send + Sync {
    /// Every record of `zone`.
    async fn get_records(&self, zone: &str) -> Result<Vec<LibdnsRecord>, ProviderError>;

    /// Create `records` in `zone`, returning them with their new ids.
    async fn append_records(
        &self,
        zone: &str,
        records: &[LibdnsRecord],
    ) -> Result<Vec<LibdnsRecord>, ProviderError>;

    /// Delete `records` (matched by id) from `zone`, returning the deleted ones.
    async fn delete_records(
        &self,
        zone: &str,
        records: &[LibdnsRecord],
    ) -> Result<Vec<LibdnsRecord>, ProviderError>;
}

/// Register every hosted backend.
pub fn register_all(registry: &mut Registry) {
    registry.register(hetzner::PROVIDER_NAME, |env| {
        let client = hetzner::HetznerClient::from_env(env)?;
        Ok(Arc::new(RemoteProvider::new(
            hetzner::PROVIDER_NAME,
            sync::SyncClient::new(client),
        )))
    });
    registry.register(scaleway::PROVIDER_NAME, |env| {
        let client = scaleway::ScalewayClient::from_env(env)?;
        Ok(Arc::new(RemoteProvider::new(scaleway::PROVIDER_NAME, client)))
    });
    registry.register(ovh::PROVIDER_NAME, |env| {
        let client = ovh::OvhClient::from_env(env)?;
        Ok(Arc::new(RemoteProvider::new(ovh::PROVIDER_NAME, client)))
    });
}

/// [`Provider`] over a [`RecordClient`].
pub struct RemoteProvider {
    name: String,
    client: Arc<dyn RecordClient>,
}

impl RemoteProvider {
    pub fn new(name: &str, client: impl RecordClient + 'static) -> Self {
        Self {
            name: name.to_string(),
            client: Arc::new(client),
        }
    }

    async fn get(&self, zone: &str) -> Result<Vec<LibdnsRecord>, ProviderError> {
        let result = self.client.get_records(zone).await;
        record_provider_operation(&self.name, "get", result.is_ok());
        result
    }

    async fn append(&self, zone: &str, record: LibdnsRecord) -> Result<LibdnsRecord, ProviderError> {
        let result = self.client.append_records(zone, &[record]).await;
        record_provider_operation(&self.name, "append", result.is_ok());
        let mut created = result?;
        if created.len() != 1 {
            return Err(ProviderError::UnexpectedResponse {
                provider: self.name.clone(),
                reason: format!("expected one created record, got {}", created.len()),
            });
        }
        Ok(created.remove(0))
    }

    async fn delete(&self, zone: &str, record: LibdnsRecord) -> Result<(), ProviderError> {
        let result = self.client.delete_records(zone, &[record]).await;
        record_provider_operation(&self.name, "delete", result.is_ok());
        result.map(|_| ())
    }

    fn stamp(&self, record: &mut DNSRecord, id: String) {
        let status = record.status_mut();
        status.provider = self.name.clone();
        status.id = id;
    }
}

impl std::fmt::Debug for RemoteProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteProvider")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Provider for RemoteProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn reconcile(&self, record: &mut DNSRecord) -> Result<ProviderOutcome, ProviderError> {
        let owner = record.owner_provider();
        if !owner.is_empty() && owner != self.name {
            return Ok(ProviderOutcome::skipped());
        }

        let mut spec = record.spec.clone();
        apply_spec_defaults(&mut spec);
        let rr = spec_to_rr(&spec)?;
        let zone = registrable_domain(&rr.name().to_string())?;
        let id = record
            .status
            .as_ref()
            .map(|s| s.id.clone())
            .unwrap_or_default();

        let mut current = self.get(&zone).await?;
        let existing = if id.is_empty() {
            None
        } else {
            current
                .iter()
                .position(|r| r.id == id)
                .map(|i| current.remove(i))
        };
        let want = libdns_record_from_rr(&rr, &id);

        if record.is_deleting() || !record.is_active() {
            if let Some(existing) = existing {
                info!(provider = %self.name, zone = %zone, id = %existing.id, "Deleting remote record");
                self.delete(&zone, existing).await?;
            }
            release(record);
            return Ok(ProviderOutcome::handled());
        }

        if let Some(existing) = existing {
            if same_record(&normalize(&existing, &zone), &want) {
                debug!(provider = %self.name, zone = %zone, id = %existing.id, "Remote record up to date");
                return Ok(ProviderOutcome::handled());
            }
            info!(provider = %self.name, zone = %zone, id = %existing.id, "Replacing remote record");
            self.delete(&zone, existing).await?;
        }

        // A previous attempt may have created the record without recording its id.
        if let Some(found) = current
            .iter()
            .find(|r| same_record(&normalize(r, &zone), &want))
        {
            debug!(provider = %self.name, zone = %zone, id = %found.id, "Adopting existing remote record");
            self.stamp(record, found.id.clone());
            return Ok(ProviderOutcome::handled());
        }

        let created = self.append(&zone, want).await?;
        info!(provider = %self.name, zone = %zone, id = %created.id, "Created remote record");
        self.stamp(record, created.id);
        Ok(ProviderOutcome::handled())
    }
}

/// Provider-neutral form of `rr` carrying `id`.
#[must_use]
pub fn libdns_record_from_rr(rr: &Record, id: &str) -> LibdnsRecord {
    LibdnsRecord {
        id: id.to_string(),
        name: fqdn(&rr.name().to_string().to_ascii_lowercase()),
        record_type: rr.record_type().to_string(),
        value: encode_value(rr),
        ttl: Duration::from_secs(u64::from(rr.ttl())),
    }
}

/// Value encoding of `rr`'s data.
#[must_use]
pub fn encode_value(rr: &Record) -> String {
    match rr.data() {
        Some(RData::A(a)) => a.0.to_string(),
        Some(RData::AAAA(aaaa)) => aaaa.0.to_string(),
        Some(RData::CNAME(cname)) => fqdn(&cname.0.to_string()),
        Some(RData::NS(ns)) => fqdn(&ns.0.to_string()),
        Some(RData::TXT(txt)) => txt
            .txt_data()
            .iter()
            .map(|s| String::from_utf8_lossy(s).into_owned())
            .collect(),
        Some(RData::MX(mx)) => format!("{} {}", mx.preference(), fqdn(&mx.exchange().to_string())),
        Some(RData::SRV(srv)) => format!(
            "{} {} {} {}",
            srv.priority(),
            srv.weight(),
            srv.port(),
            fqdn(&srv.target().to_string())
        ),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

/// Bring a record returned by an API into the encoding of [`libdns_record_from_rr`].
#[must_use]
pub fn normalize(record: &LibdnsRecord, zone: &str) -> LibdnsRecord {
    let record_type = record.record_type.to_ascii_uppercase();
    let value = match record_type.as_str() {
        "A" | "AAAA" | "TXT" => unquote(&record.value),
        "CNAME" | "NS" => fqdn(record.value.trim()),
        "MX" | "SRV" => fqdn_last_field(&record.value),
        _ => record.value.clone(),
    };
    LibdnsRecord {
        id: record.id.clone(),
        name: absolute_name(&record.name, zone),
        record_type,
        value,
        ttl: record.ttl,
    }
}

fn same_record(a: &LibdnsRecord, b: &LibdnsRecord) -> bool {
    a.name.eq_ignore_ascii_case(&b.name)
        && a.record_type.eq_ignore_ascii_case(&b.record_type)
        && a.value == b.value
        && a.ttl == b.ttl
}

fn fqdn_last_field(value: &str) -> String {
    let mut fields: Vec<&str> = value.split_whitespace().collect();
    let Some(last) = fields.pop() else {
        return String::new();
    };
    let last = fqdn(last);
    fields.push(&last);
    fields.join(" ")
}

/// Absolute form of a name an API may return relative to `zone` (`@` is the apex).
#[must_use]
pub fn absolute_name(name: &str, zone: &str) -> String {
    let name = name.trim().to_ascii_lowercase();
    let zone = fqdn(&zone.to_ascii_lowercase());
    if name.is_empty() || name == "@" {
        return zone;
    }
    if name.ends_with('.') {
        return name;
    }
    let bare_zone = zone.trim_end_matches('.');
    if name == bare_zone || name.ends_with(&format!(".{bare_zone}")) {
        return fqdn(&name);
    }
    format!("{name}.{zone}")
}

/// Name relative to `zone`, `@` for the apex.
#[must_use]
pub fn relative_name(name: &str, zone: &str) -> String {
    let name = fqdn(&name.to_ascii_lowercase());
    let zone = fqdn(&zone.to_ascii_lowercase());
    if name == zone {
        return "@".to_string();
    }
    name.strip_suffix(&format!(".{zone}"))
        .map_or_else(|| name.trim_end_matches('.').to_string(), str::to_string)
}

/// Collapse contiguous quoted strings (`"a" "b"` becomes `ab`). Unquoted values are
/// returned trimmed.
#[must_use]
pub fn unquote(value: &str) -> String {
    let value = value.trim();
    if !value.starts_with('"') {
        return value.to_string();
    }
    let mut out = String::new();
    let mut in_quotes = false;
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => in_quotes = !in_quotes,
            '\\' if in_quotes => {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            }
            c if in_quotes => out.push(c),
            _ => {}
        }
    }
    out
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod mod_tests;
