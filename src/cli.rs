// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Helpers behind the `kubectl-dns` plugin.
//!
//! Everything here is free of I/O so the binary stays a thin layer over
//! [`kube::Api`] calls.

use crate::constants::API_GROUP_VERSION;
use crate::crd::DNSRecord;
use crate::errors::RecordError;
use crate::record::{from_rr, parse, parse_zone, render};
use kube::ResourceExt;
use serde_json::{json, Value};

/// `DNSRecord` YAML for a presentation-format record.
///
/// # Errors
///
/// Returns an error if the line does not parse as exactly one record.
pub fn create_yaml(line: &str) -> anyhow::Result<String> {
    let rr = parse(line)?;
    Ok(serde_yaml::to_string(&from_rr(&rr))?)
}

/// `DNSRecordList` YAML for a zone file of fully-qualified records.
///
/// # Errors
///
/// Returns the first record that fails to parse.
pub fn import_yaml(zone: &str) -> anyhow::Result<String> {
    let items: Vec<DNSRecord> = parse_zone(zone)?.iter().map(from_rr).collect();
    let list = json!({
        "apiVersion": API_GROUP_VERSION,
        "kind": "DNSRecordList",
        "items": items,
    });
    Ok(serde_yaml::to_string(&list)?)
}

/// Table of `records`, or only their names when `quiet`.
#[must_use]
pub fn list_table(records: &[DNSRecord], quiet: bool) -> String {
    if quiet {
        return records
            .iter()
            .map(|r| format!("{}\n", r.name_any()))
            .collect();
    }

    let mut rows = vec![["NAME", "NAMESPACE", "ACTIVE", "RECORD", "TTL", "CLASS", "TYPE", "VALUE"]
        .map(str::to_string)
        .to_vec()];
    for record in records {
        let status = record.status.clone().unwrap_or_default();
        let active = status.active.map_or_else(String::new, |a| a.to_string());
        let mut row = vec![record.name_any(), record.namespace().unwrap_or_default(), active];
        let mut fields: Vec<String> = status.record.splitn(5, '\t').map(str::to_string).collect();
        fields.resize(5, String::new());
        row.extend(fields);
        rows.push(row);
    }

    let widths: Vec<usize> = (0..rows[0].len())
        .map(|col| rows.iter().map(|row| row[col].len()).max().unwrap_or(0))
        .collect();
    let mut out = String::new();
    for row in rows {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect();
        out.push_str(line.join("   ").trim_end());
        out.push('\n');
    }
    out
}

/// Record named `target`, or whose `status.record` equals `target` parsed as a record.
///
/// # Errors
///
/// Returns an error when `target` is neither a known name nor a parsable record.
pub fn find_record<'a>(records: &'a [DNSRecord], target: &str) -> Result<Option<&'a DNSRecord>, RecordError> {
    if let Some(record) = records.iter().find(|r| r.name_any() == target) {
        return Ok(Some(record));
    }
    let rendered = render(&parse(target)?);
    Ok(records
        .iter()
        .find(|r| r.status.as_ref().is_some_and(|s| s.record == rendered)))
}

/// Merge patch setting `spec.active`.
#[must_use]
pub fn activation_patch(active: bool) -> Value {
    json!({ "spec": { "active": active } })
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod cli_tests;
