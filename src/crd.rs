// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definition for declared DNS records.
//!
//! A `DNSRecord` carries exactly one record variant (`a`, `cname`, `txt`, `srv`, `mx`)
//! or a `raw` presentation-format line. The controller converts it to a wire record,
//! programs the selected provider and reports the observed state in `status`.
//!
//! # Example: declaring an A record
//!
//! ```rust
//! use k8s_dns::crd::{ARecord, DNSRecordSpec};
//!
//! let spec = DNSRecordSpec {
//!     a: Some(ARecord {
//!         name: "api.example.com.".into(),
//!         target: "10.0.0.1".into(),
//!         ..Default::default()
//!     }),
//!     ..Default::default()
//! };
//! assert!(spec.a.is_some());
//! ```

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// `DNSRecord` declares a single resource record.
///
/// Exactly one of the structured variants or `raw` must be set. Derived records
/// created for `Ingress` and `Service` objects use the `a` variant.
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "dns.linka.cloud",
    version = "v1alpha1",
    kind = "DNSRecord",
    namespaced,
    shortname = "records",
    shortname = "record",
    shortname = "dns",
    printcolumn = r#"{"name":"Active","type":"boolean","jsonPath":".status.active"}"#,
    printcolumn = r#"{"name":"Record","type":"string","jsonPath":".status.record"}"#,
    doc = "DNSRecord declares a DNS resource record served by the embedded authoritative server or pushed to a hosted DNS provider."
)]
#[kube(status = "DNSRecordStatus")]
#[serde(rename_all = "camelCase")]
pub struct DNSRecordSpec {
    /// Whether the record should be published. Absent means `true`.
    ///
    /// Setting `false` keeps the object but withdraws the record from its provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,

    /// Address record. IPv6 targets are published as AAAA.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub a: Option<ARecord>,

    /// Canonical name record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cname: Option<CNAMERecord>,

    /// Text record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub txt: Option<TXTRecord>,

    /// Service locator record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub srv: Option<SRVRecord>,

    /// Mail exchanger record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mx: Option<MXRecord>,

    /// A single resource record in RFC 1035 presentation format, used when no
    /// structured variant is set (e.g. `"host.example.com. 300 IN AAAA ::1"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

/// A / AAAA record payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ARecord {
    /// Owner name, fully qualified with a trailing dot.
    pub name: String,

    /// DNS class, defaults to 1 (IN).
    #[serde(default)]
    pub class: u16,

    /// Time to live in seconds, defaults to 3600.
    #[serde(default)]
    pub ttl: u32,

    /// IPv4 or IPv6 address.
    pub target: String,
}

/// CNAME record payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CNAMERecord {
    /// Owner name, fully qualified with a trailing dot.
    pub name: String,

    /// DNS class, defaults to 1 (IN).
    #[serde(default)]
    pub class: u16,

    /// Time to live in seconds, defaults to 3600.
    #[serde(default)]
    pub ttl: u32,

    /// Canonical name, fully qualified with a trailing dot.
    pub target: String,
}

/// TXT record payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TXTRecord {
    /// Owner name, fully qualified with a trailing dot.
    pub name: String,

    /// DNS class, defaults to 1 (IN).
    #[serde(default)]
    pub class: u16,

    /// Time to live in seconds, defaults to 3600.
    #[serde(default)]
    pub ttl: u32,

    /// Character strings, published in order.
    #[serde(default)]
    pub targets: Vec<String>,
}

/// SRV record payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SRVRecord {
    /// Owner name, fully qualified with a trailing dot (e.g. `_sip._tcp.example.com.`).
    pub name: String,

    /// DNS class, defaults to 1 (IN).
    #[serde(default)]
    pub class: u16,

    /// Time to live in seconds, defaults to 3600.
    #[serde(default)]
    pub ttl: u32,

    /// Priority, lower is preferred.
    #[serde(default)]
    pub priority: u16,

    /// Relative weight among equal priorities, defaults to 1.
    #[serde(default)]
    pub weight: u16,

    /// Service port.
    pub port: u16,

    /// Target host, fully qualified with a trailing dot.
    pub target: String,
}

/// MX record payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MXRecord {
    /// Owner name, fully qualified with a trailing dot.
    pub name: String,

    /// DNS class, defaults to 1 (IN).
    #[serde(default)]
    pub class: u16,

    /// Time to live in seconds, defaults to 3600.
    #[serde(default)]
    pub ttl: u32,

    /// Preference, defaults to 10.
    #[serde(default)]
    pub preference: u16,

    /// Mail exchanger host, fully qualified with a trailing dot.
    pub target: String,
}

/// Observed state of a `DNSRecord`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DNSRecordStatus {
    /// Canonical single-line rendering of the programmed record.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub record: String,

    /// Outcome of the last verification query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,

    /// Name of the provider owning the record. Once set, only that provider acts on it.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub provider: String,

    /// Opaque identifier assigned by the provider.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
}

impl DNSRecord {
    /// Desired activation, `true` unless `spec.active` is explicitly `false`.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.spec.active.unwrap_or(true)
    }

    /// Whether the object carries a deletion timestamp.
    #[must_use]
    pub fn is_deleting(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    /// Provider currently owning the record, empty when unowned.
    #[must_use]
    pub fn owner_provider(&self) -> &str {
        self.status.as_ref().map_or("", |s| s.provider.as_str())
    }

    /// Mutable status, created on first access.
    pub fn status_mut(&mut self) -> &mut DNSRecordStatus {
        self.status.get_or_insert_with(DNSRecordStatus::default)
    }
}

impl DNSRecordSpec {
    /// Number of structured variants set, `raw` included when non-empty.
    #[must_use]
    pub fn variant_count(&self) -> usize {
        [
            self.a.is_some(),
            self.cname.is_some(),
            self.txt.is_some(),
            self.srv.is_some(),
            self.mx.is_some(),
            self.raw.as_deref().is_some_and(|r| !r.trim().is_empty()),
        ]
        .iter()
        .filter(|set| **set)
        .count()
    }
}
