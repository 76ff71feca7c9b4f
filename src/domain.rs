// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Registrable-domain derivation.
//!
//! Zones are keyed by the registrable domain of a record's owner name (`api.example.co.uk.`
//! lives in `example.co.uk.`). The public-suffix list decides where the domain starts;
//! names it does not cover fall back to their last two labels.

use crate::errors::ZoneError;

/// Registrable domain of `name`, lowercase and fully qualified.
///
/// # Errors
///
/// Returns [`ZoneError::TooFewLabels`] for names with fewer than two labels.
///
/// # Example
///
/// ```rust
/// use k8s_dns::domain::registrable_domain;
///
/// assert_eq!(registrable_domain("api.example.com.").unwrap(), "example.com.");
/// assert_eq!(registrable_domain("a.b.example.co.uk").unwrap(), "example.co.uk.");
/// ```
pub fn registrable_domain(name: &str) -> Result<String, ZoneError> {
    let trimmed = normalize(name);
    let labels: Vec<&str> = trimmed.split('.').filter(|l| !l.is_empty()).collect();
    if labels.len() < 2 {
        return Err(ZoneError::TooFewLabels {
            name: name.to_string(),
        });
    }

    let domain = psl::domain_str(&trimmed)
        .map(str::to_string)
        .unwrap_or_else(|| labels[labels.len() - 2..].join("."));
    Ok(format!("{domain}."))
}

/// Whether `name` is below (or is) a registrable domain under a known public suffix.
#[must_use]
pub fn has_registrable_domain(name: &str) -> bool {
    let trimmed = normalize(name);
    !trimmed.is_empty() && psl::domain_str(&trimmed).is_some()
}

/// Append the trailing dot when missing.
#[must_use]
pub fn fqdn(name: &str) -> String {
    if name.ends_with('.') {
        name.to_string()
    } else {
        format!("{name}.")
    }
}

/// Strip a single trailing dot.
#[must_use]
pub fn unfqdn(name: &str) -> &str {
    name.strip_suffix('.').unwrap_or(name)
}

fn normalize(name: &str) -> String {
    unfqdn(name.trim()).to_ascii_lowercase()
}

#[cfg(test)]
#[path = "domain_tests.rs"]
mod domain_tests;
