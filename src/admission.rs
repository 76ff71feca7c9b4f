// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Defaulting and validation of `DNSRecord` specs.
//!
//! These functions back the admission webhook and are also applied by the reconciler
//! and the embedded provider, so objects admitted before the webhook existed converge
//! to the same wire record.

use crate::constants::{
    DEFAULT_MX_PREFERENCE, DEFAULT_RECORD_TTL_SECS, DEFAULT_SRV_WEIGHT, DNS_CLASS_IN,
    MAX_TXT_STRING_LEN,
};
use crate::crd::{DNSRecord, DNSRecordSpec};
use crate::domain::registrable_domain;
use crate::record::{dns_class, fqdn_name, is_duplicate, parse, spec_to_rr};
use hickory_proto::rr::RecordType;
use kube::ResourceExt;
use std::fmt;
use std::net::IpAddr;

/// A validation failure bound to a spec field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    /// JSON path of the offending field, e.g. `spec.a.target`
    pub field: String,
    pub message: String,
}

impl FieldError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Join field errors into one admission message.
#[must_use]
pub fn format_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Fill unset fields of `record.spec` with their defaults.
pub fn apply_defaults(record: &mut DNSRecord) {
    apply_spec_defaults(&mut record.spec);
}

/// Defaults: `active=true`, `class=1` and `ttl=3600` on every variant, SRV `weight=1`,
/// MX `preference=10`.
pub fn apply_spec_defaults(spec: &mut DNSRecordSpec) {
    if spec.active.is_none() {
        spec.active = Some(true);
    }

    macro_rules! default_header {
        ($variant:expr) => {
            if let Some(v) = $variant.as_mut() {
                if v.class == 0 {
                    v.class = DNS_CLASS_IN;
                }
                if v.ttl == 0 {
                    v.ttl = DEFAULT_RECORD_TTL_SECS;
                }
            }
        };
    }

    default_header!(spec.a);
    default_header!(spec.cname);
    default_header!(spec.txt);
    default_header!(spec.srv);
    default_header!(spec.mx);

    if let Some(srv) = spec.srv.as_mut() {
        if srv.weight == 0 {
            srv.weight = DEFAULT_SRV_WEIGHT;
        }
    }
    if let Some(mx) = spec.mx.as_mut() {
        if mx.preference == 0 {
            mx.preference = DEFAULT_MX_PREFERENCE;
        }
    }
}

/// Validate a record spec.
///
/// # Errors
///
/// Returns every field error found.
pub fn validate(record: &DNSRecord) -> Result<(), Vec<FieldError>> {
    validate_spec(&record.spec)
}

/// Same as [`validate`] for a bare spec.
///
/// # Errors
///
/// Returns every field error found.
pub fn validate_spec(spec: &DNSRecordSpec) -> Result<(), Vec<FieldError>> {
    let mut errors = Vec::new();

    match spec.variant_count() {
        0 => errors.push(FieldError::new(
            "spec",
            "one of a, cname, txt, srv, mx or raw must be set",
        )),
        1 => {}
        _ => errors.push(FieldError::new(
            "spec",
            "only one of a, cname, txt, srv, mx or raw may be set",
        )),
    }

    if let Some(a) = &spec.a {
        check_owner("spec.a", &a.name, a.class, &mut errors);
        if a.target.parse::<IpAddr>().is_err() {
            errors.push(FieldError::new(
                "spec.a.target",
                format!("'{}' is not an ip address", a.target),
            ));
        }
    }
    if let Some(cname) = &spec.cname {
        check_owner("spec.cname", &cname.name, cname.class, &mut errors);
        check_target("spec.cname.target", &cname.target, &mut errors);
    }
    if let Some(txt) = &spec.txt {
        check_owner("spec.txt", &txt.name, txt.class, &mut errors);
        if txt.targets.is_empty() {
            errors.push(FieldError::new("spec.txt.targets", "must not be empty"));
        }
        for (i, target) in txt.targets.iter().enumerate() {
            if target.len() > MAX_TXT_STRING_LEN {
                errors.push(FieldError::new(
                    format!("spec.txt.targets[{i}]"),
                    format!(
                        "is {} bytes, a character-string holds at most {MAX_TXT_STRING_LEN}",
                        target.len()
                    ),
                ));
            }
        }
    }
    if let Some(srv) = &spec.srv {
        check_owner("spec.srv", &srv.name, srv.class, &mut errors);
        check_target("spec.srv.target", &srv.target, &mut errors);
        if srv.port == 0 {
            errors.push(FieldError::new("spec.srv.port", "is required"));
        }
    }
    if let Some(mx) = &spec.mx {
        check_owner("spec.mx", &mx.name, mx.class, &mut errors);
        check_target("spec.mx.target", &mx.target, &mut errors);
    }
    if let Some(raw) = spec.raw.as_deref().filter(|r| !r.trim().is_empty()) {
        match parse(raw) {
            Ok(rr) => check_apex("spec.raw", &rr, &mut errors),
            Err(e) => errors.push(FieldError::new("spec.raw", e.to_string())),
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_owner(prefix: &str, name: &str, class: u16, errors: &mut Vec<FieldError>) {
    let field = format!("{prefix}.name");
    if !name.ends_with('.') {
        errors.push(FieldError::new(
            field,
            format!("'{name}' must be fully qualified (end with '.')"),
        ));
    } else if let Err(e) = fqdn_name(name) {
        errors.push(FieldError::new(field, e.to_string()));
    }
    if let Err(e) = dns_class(class) {
        errors.push(FieldError::new(format!("{prefix}.class"), e.to_string()));
    }
}

fn check_target(field: &str, target: &str, errors: &mut Vec<FieldError>) {
    if target.is_empty() {
        errors.push(FieldError::new(field, "is required"));
    } else if !target.ends_with('.') {
        errors.push(FieldError::new(
            field,
            format!("'{target}' must be fully qualified (end with '.')"),
        ));
    }
}

/// SOA and zone-apex NS records are synthesized by the server.
fn check_apex(field: &str, rr: &hickory_proto::rr::Record, errors: &mut Vec<FieldError>) {
    let owner = rr.name().to_string().to_ascii_lowercase();
    match rr.record_type() {
        RecordType::SOA => errors.push(FieldError::new(
            field,
            "SOA records are synthesized and cannot be declared",
        )),
        RecordType::NS if registrable_domain(&owner).is_ok_and(|zone| zone == owner) => {
            errors.push(FieldError::new(
                field,
                "NS records at the zone apex are synthesized and cannot be declared",
            ));
        }
        _ => {}
    }
}

/// Reject a CNAME sharing its owner name with another record, and any record sharing
/// its owner name with an existing CNAME. `siblings` are the other records of the
/// namespace; inactive and terminating ones are ignored.
///
/// # Errors
///
/// Returns one error per conflicting sibling.
pub fn validate_cname_coexistence(
    record: &DNSRecord,
    siblings: &[DNSRecord],
) -> Result<(), Vec<FieldError>> {
    let mut spec = record.spec.clone();
    apply_spec_defaults(&mut spec);
    let Ok(rr) = spec_to_rr(&spec) else {
        return Ok(());
    };
    let field = format!("spec.{}.name", variant_field(&spec));

    let mut errors = Vec::new();
    for sibling in siblings {
        if sibling.name_any() == record.name_any() || !sibling.is_active() || sibling.is_deleting() {
            continue;
        }
        let mut other_spec = sibling.spec.clone();
        apply_spec_defaults(&mut other_spec);
        let Ok(other) = spec_to_rr(&other_spec) else {
            continue;
        };
        if rr.name() != other.name() {
            continue;
        }
        let involves_cname =
            rr.record_type() == RecordType::CNAME || other.record_type() == RecordType::CNAME;
        if involves_cname && !is_duplicate(&rr, &other) {
            errors.push(FieldError::new(
                field.clone(),
                format!(
                    "'{}' cannot hold a CNAME alongside other data: conflicts with {} record '{}'",
                    rr.name(),
                    other.record_type(),
                    sibling.name_any()
                ),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Spec field name of the variant [`spec_to_rr`] would pick.
#[must_use]
pub fn variant_field(spec: &DNSRecordSpec) -> &'static str {
    if spec.a.is_some() {
        "a"
    } else if spec.txt.is_some() {
        "txt"
    } else if spec.srv.is_some() {
        "srv"
    } else if spec.mx.is_some() {
        "mx"
    } else if spec.cname.is_some() {
        "cname"
    } else {
        "raw"
    }
}

#[cfg(test)]
#[path = "admission_tests.rs"]
mod admission_tests;
