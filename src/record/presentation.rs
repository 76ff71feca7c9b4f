// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! RFC 1035 presentation format.
//!
//! [`render`] produces the canonical single-line form (`name ttl class type rdata`,
//! tab separated) used for `status.record` and as the embedded provider's map key.
//! [`parse_with`] reads one record and [`parse_zone`] reads a zone file, both through
//! the `hickory_proto` zone file parser. An owner TTL carries over to the following
//! records until another TTL or `$TTL` is given, and an SOA takes its expire as TTL.

use super::class_code;
use crate::constants::DEFAULT_RECORD_TTL_SECS;
use crate::errors::RecordError;
use hickory_proto::rr::{DNSClass, Name, RData, Record};
use hickory_proto::serialize::txt::Parser;
use std::fmt::Write as _;

/// Defaults applied to relative names and records without a TTL.
#[derive(Clone, Debug)]
pub struct ParseContext {
    /// Origin appended to relative names and substituted for `@`.
    pub origin: Option<Name>,
    /// TTL used when a record omits it.
    pub default_ttl: u32,
}

impl Default for ParseContext {
    fn default() -> Self {
        Self {
            origin: None,
            default_ttl: DEFAULT_RECORD_TTL_SECS,
        }
    }
}

/// Render a record in canonical presentation form.
#[must_use]
pub fn render(rr: &Record) -> String {
    format!(
        "{}\t{}\t{}\t{}\t{}",
        rr.name(),
        rr.ttl(),
        class_name(rr.dns_class()),
        rr.record_type(),
        rdata_text(rr.data())
    )
}

/// Parse a single record with no origin and the default TTL.
///
/// # Errors
///
/// Returns [`RecordError`] when the line is empty, malformed or holds more than one record.
pub fn parse(line: &str) -> Result<Record, RecordError> {
    parse_with(line, &ParseContext::default())
}

/// Parse a single record: `<owner> [<ttl>] [<class>] <type> <rdata...>`.
///
/// TTL and class may appear in either order and the rdata may span parentheses.
/// Relative names are completed with the context origin, or made absolute when there
/// is none. Directives are not allowed.
///
/// # Errors
///
/// Returns [`RecordError`] when the line is empty, malformed or holds more than one record.
pub fn parse_with(line: &str, ctx: &ParseContext) -> Result<Record, RecordError> {
    if line.lines().any(|l| l.trim_start().starts_with('$')) {
        return Err(RecordError::parse(line, "directives are only allowed in zone files"));
    }
    let mut records = read(line.trim_start(), line, ctx)?;
    match records.len() {
        0 => Err(RecordError::parse(line, "empty record")),
        1 => Ok(records.remove(0)),
        n => Err(RecordError::parse(line, format!("expected one record, got {n}"))),
    }
}

/// Parse a zone file.
///
/// Supports `;` comments, `$ORIGIN`, `$TTL`, parenthesized records and lines starting
/// with whitespace, which reuse the previous owner name. Records come back grouped by
/// owner name in canonical order, then by type.
///
/// # Errors
///
/// Returns the first [`RecordError`] encountered. `$INCLUDE` is rejected.
pub fn parse_zone(text: &str) -> Result<Vec<Record>, RecordError> {
    let include = text
        .lines()
        .any(|l| l.trim_start().to_ascii_uppercase().starts_with("$INCLUDE"));
    if include {
        return Err(RecordError::parse(ZONE_INPUT, "$INCLUDE is not supported"));
    }
    read(text, ZONE_INPUT, &ParseContext::default())
}

const ZONE_INPUT: &str = "zone file";

fn read(text: &str, label: &str, ctx: &ParseContext) -> Result<Vec<Record>, RecordError> {
    let input = format!("$TTL {}\n{text}\n", ctx.default_ttl);
    let origin = ctx.origin.clone().unwrap_or_else(Name::root);
    let (_, sets) = Parser::new(input, None, Some(origin))
        .parse()
        .map_err(|e| RecordError::parse(label, e.to_string()))?;

    let records: Vec<Record> = sets.into_values().flatten().collect();
    if ctx.origin.is_none() && records.iter().any(|rr| rr.name().is_root()) {
        return Err(RecordError::parse(label, "'@' used without $ORIGIN"));
    }
    Ok(records)
}

/// Presentation name of a class (`IN`, `CH`, ... or `CLASS<n>`).
#[must_use]
pub fn class_name(class: DNSClass) -> String {
    match class {
        DNSClass::IN => "IN".to_string(),
        DNSClass::CH => "CH".to_string(),
        DNSClass::HS => "HS".to_string(),
        DNSClass::NONE => "NONE".to_string(),
        DNSClass::ANY => "ANY".to_string(),
        other => format!("CLASS{}", class_code(other)),
    }
}

fn rdata_text(rdata: Option<&RData>) -> String {
    match rdata {
        None => String::new(),
        Some(RData::A(a)) => a.0.to_string(),
        Some(RData::AAAA(aaaa)) => aaaa.0.to_string(),
        Some(RData::CNAME(cname)) => cname.0.to_string(),
        Some(RData::NS(ns)) => ns.0.to_string(),
        Some(RData::PTR(ptr)) => ptr.0.to_string(),
        Some(RData::MX(mx)) => format!("{} {}", mx.preference(), mx.exchange()),
        Some(RData::SRV(srv)) => format!(
            "{} {} {} {}",
            srv.priority(),
            srv.weight(),
            srv.port(),
            srv.target()
        ),
        Some(RData::TXT(txt)) => txt
            .txt_data()
            .iter()
            .map(|s| quote(s))
            .collect::<Vec<_>>()
            .join(" "),
        Some(RData::SOA(soa)) => format!(
            "{} {} {} {} {} {} {}",
            soa.mname(),
            soa.rname(),
            soa.serial(),
            soa.refresh(),
            soa.retry(),
            soa.expire(),
            soa.minimum()
        ),
        Some(RData::HINFO(hinfo)) => format!("{} {}", quote(hinfo.cpu()), quote(hinfo.os())),
        Some(other) => other.to_string(),
    }
}

/// Quote a character-string, escaping `"` and `\` and writing non-printable bytes as `\DDD`.
pub(crate) fn quote(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() + 2);
    out.push('"');
    for &b in data {
        match b {
            b'"' | b'\\' => {
                out.push('\\');
                out.push(char::from(b));
            }
            0x20..=0x7e => out.push(char::from(b)),
            _ => {
                let _ = write!(out, "\\{b:03}");
            }
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
#[path = "presentation_tests.rs"]
mod presentation_tests;
