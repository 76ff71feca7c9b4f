// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Conversion between declared [`DNSRecord`]s and wire resource records.
//!
//! [`to_rr`] selects the first variant present in the order A, TXT, SRV, MX, CNAME,
//! raw and builds a `hickory_proto` [`Record`]. [`from_rr`] goes the other way and
//! derives a Kubernetes-safe object name from the owner name and type.
//!
//! Records are compared with [`is_duplicate`] (owner, class, type and data, TTL
//! ignored) and rendered with [`presentation::render`] into the canonical single
//! line stored in `status.record`.

pub mod presentation;

pub use presentation::{parse, parse_with, parse_zone, render, ParseContext};

use crate::constants::{DNS_CLASS_IN, MAX_TXT_STRING_LEN};
use crate::crd::{ARecord, CNAMERecord, DNSRecord, DNSRecordSpec, MXRecord, SRVRecord, TXTRecord};
use crate::errors::RecordError;
use hickory_proto::rr::rdata::{A, AAAA, CNAME, MX, SRV, TXT};
use hickory_proto::rr::{DNSClass, Name, RData, Record, RecordType};
use std::net::IpAddr;

/// Convert a declared record into its wire form.
///
/// # Errors
///
/// Returns [`RecordError::InvalidSpec`] when the selected variant is incomplete (bad IP,
/// empty TXT, missing target) or when no variant is set and `raw` is empty or does not
/// parse as a single record.
pub fn to_rr(record: &DNSRecord) -> Result<Record, RecordError> {
    spec_to_rr(&record.spec)
}

/// Same as [`to_rr`] for a bare spec.
///
/// # Errors
///
/// See [`to_rr`].
pub fn spec_to_rr(spec: &DNSRecordSpec) -> Result<Record, RecordError> {
    if let Some(a) = &spec.a {
        let ip: IpAddr = a.target.parse().map_err(|_| {
            RecordError::InvalidSpec(format!("a: target '{}' is not an ip address", a.target))
        })?;
        let rdata = match ip {
            IpAddr::V4(v4) => RData::A(A(v4)),
            IpAddr::V6(v6) => RData::AAAA(AAAA(v6)),
        };
        return build(&a.name, a.class, a.ttl, rdata);
    }

    if let Some(txt) = &spec.txt {
        if txt.targets.is_empty() {
            return Err(RecordError::InvalidSpec("txt: targets must not be empty".into()));
        }
        if let Some((i, _)) = txt
            .targets
            .iter()
            .enumerate()
            .find(|(_, t)| t.len() > MAX_TXT_STRING_LEN)
        {
            return Err(RecordError::InvalidSpec(format!(
                "txt: targets[{i}] exceeds {MAX_TXT_STRING_LEN} bytes"
            )));
        }
        return build(
            &txt.name,
            txt.class,
            txt.ttl,
            RData::TXT(TXT::new(txt.targets.clone())),
        );
    }

    if let Some(srv) = &spec.srv {
        let target = required_target("srv", &srv.target)?;
        return build(
            &srv.name,
            srv.class,
            srv.ttl,
            RData::SRV(SRV::new(srv.priority, srv.weight, srv.port, target)),
        );
    }

    if let Some(mx) = &spec.mx {
        let target = required_target("mx", &mx.target)?;
        return build(
            &mx.name,
            mx.class,
            mx.ttl,
            RData::MX(MX::new(mx.preference, target)),
        );
    }

    if let Some(cname) = &spec.cname {
        let target = required_target("cname", &cname.target)?;
        return build(&cname.name, cname.class, cname.ttl, RData::CNAME(CNAME(target)));
    }

    match spec.raw.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => parse(raw)
            .map_err(|e| RecordError::InvalidSpec(format!("raw: {e}"))),
        _ => Err(RecordError::InvalidSpec("no record defined".into())),
    }
}

/// Build a declared record from a wire record.
///
/// The object name comes from [`object_name`]. A, CNAME, TXT, SRV and MX records map
/// to their structured variant; every other type is stored as `raw`.
#[must_use]
pub fn from_rr(rr: &Record) -> DNSRecord {
    let name = rr.name().to_string();
    let class = class_code(rr.dns_class());
    let ttl = rr.ttl();

    let mut spec = DNSRecordSpec::default();
    match rr.data() {
        Some(RData::A(a)) => {
            spec.a = Some(ARecord {
                name,
                class,
                ttl,
                target: a.0.to_string(),
            });
        }
        Some(RData::CNAME(cname)) => {
            spec.cname = Some(CNAMERecord {
                name,
                class,
                ttl,
                target: cname.0.to_string(),
            });
        }
        Some(RData::TXT(txt)) => {
            spec.txt = Some(TXTRecord {
                name,
                class,
                ttl,
                targets: txt
                    .txt_data()
                    .iter()
                    .map(|s| String::from_utf8_lossy(s).into_owned())
                    .collect(),
            });
        }
        Some(RData::SRV(srv)) => {
            spec.srv = Some(SRVRecord {
                name,
                class,
                ttl,
                priority: srv.priority(),
                weight: srv.weight(),
                port: srv.port(),
                target: srv.target().to_string(),
            });
        }
        Some(RData::MX(mx)) => {
            spec.mx = Some(MXRecord {
                name,
                class,
                ttl,
                preference: mx.preference(),
                target: mx.exchange().to_string(),
            });
        }
        _ => spec.raw = Some(render(rr)),
    }

    DNSRecord::new(&object_name(rr), spec)
}

/// Kubernetes-safe object name for a record.
///
/// The owner name is lowercased, the trailing dot stripped, dots become dashes,
/// underscores are dropped and `*` becomes `wildcard`. Every type but A gets a
/// `-<type>` suffix so records of different types at one name do not collide.
#[must_use]
pub fn object_name(rr: &Record) -> String {
    let owner = rr.name().to_string().to_lowercase();
    let mut name = owner
        .trim_end_matches('.')
        .replace('.', "-")
        .replace('_', "")
        .replace('*', "wildcard");
    if rr.record_type() != RecordType::A {
        name.push('-');
        name.push_str(&rr.record_type().to_string().to_lowercase());
    }
    name
}

/// Whether two records are the same RR: owner (case-insensitive), class, type and data.
/// TTLs are ignored.
#[must_use]
pub fn is_duplicate(a: &Record, b: &Record) -> bool {
    a.record_type() == b.record_type()
        && a.dns_class() == b.dns_class()
        && a.name() == b.name()
        && a.data() == b.data()
}

/// Parse an owner or target name, making it fully qualified.
///
/// # Errors
///
/// Returns [`RecordError::InvalidSpec`] for empty or malformed names.
pub fn fqdn_name(name: &str) -> Result<Name, RecordError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(RecordError::InvalidSpec("name is required".into()));
    }
    let absolute = if name.ends_with('.') {
        name.to_string()
    } else {
        format!("{name}.")
    };
    Name::from_ascii(&absolute)
        .map_err(|e| RecordError::InvalidSpec(format!("invalid name '{name}': {e}")))
}

/// Map a numeric class to [`DNSClass`]. Zero is treated as IN.
///
/// # Errors
///
/// Returns [`RecordError::InvalidSpec`] for classes the server does not know.
pub fn dns_class(class: u16) -> Result<DNSClass, RecordError> {
    match class {
        0 | DNS_CLASS_IN => Ok(DNSClass::IN),
        3 => Ok(DNSClass::CH),
        4 => Ok(DNSClass::HS),
        254 => Ok(DNSClass::NONE),
        255 => Ok(DNSClass::ANY),
        other => Err(RecordError::InvalidSpec(format!("unsupported class {other}"))),
    }
}

/// Numeric value of a [`DNSClass`].
#[must_use]
pub fn class_code(class: DNSClass) -> u16 {
    match class {
        DNSClass::IN => DNS_CLASS_IN,
        DNSClass::CH => 3,
        DNSClass::HS => 4,
        DNSClass::NONE => 254,
        DNSClass::ANY => 255,
        other => u16::from(other),
    }
}

fn required_target(variant: &str, target: &str) -> Result<Name, RecordError> {
    if target.trim().is_empty() {
        return Err(RecordError::InvalidSpec(format!("{variant}: target is required")));
    }
    fqdn_name(target)
}

fn build(name: &str, class: u16, ttl: u32, rdata: RData) -> Result<Record, RecordError> {
    let owner = fqdn_name(name)?;
    let mut rr = Record::from_rdata(owner, ttl, rdata);
    rr.set_dns_class(dns_class(class)?);
    Ok(rr)
}
