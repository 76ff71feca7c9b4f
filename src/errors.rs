// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for record conversion, zone building and providers.
//!
//! - [`RecordError`] is the invalid-spec family: surfaced as admission rejections and
//!   as warning events on reconcile, never silently requeued.
//! - [`ZoneError`] reports names that cannot be placed in a zone.
//! - [`ProviderError`] covers provider configuration (fatal at startup) and remote API
//!   failures (transient, requeued by the controller).
//! - [`ConfigError`] rejects inconsistent command-line settings at startup.

use thiserror::Error;

/// Errors converting between declared records and wire records.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// The declared spec cannot produce a wire record
    #[error("invalid record spec: {0}")]
    InvalidSpec(String),

    /// A presentation-format line could not be parsed
    #[error("failed to parse record '{line}': {reason}")]
    Parse {
        /// The offending input
        line: String,
        /// What went wrong
        reason: String,
    },
}

impl RecordError {
    pub(crate) fn parse(line: &str, reason: impl Into<String>) -> Self {
        Self::Parse {
            line: line.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors placing records into zones.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ZoneError {
    /// Zones are keyed by registrable domain, which needs at least two labels
    #[error("'{name}' has fewer than two labels")]
    TooFewLabels {
        /// The rejected name
        name: String,
    },

    /// The name is not a valid domain name
    #[error("invalid domain name '{name}': {reason}")]
    InvalidName {
        /// The rejected name
        name: String,
        /// Parser message
        reason: String,
    },

    /// The record owner does not belong to the zone
    #[error("record '{name}' is outside zone '{zone}'")]
    OutOfZone {
        /// Record owner name
        name: String,
        /// Zone origin
        zone: String,
    },

    /// SOA and apex NS records are synthesized, never declared
    #[error("{rtype} record at the apex of '{zone}' is synthesized and cannot be declared")]
    ApexRecord {
        /// Zone origin
        zone: String,
        /// Record type
        rtype: String,
    },
}

/// Errors raised by DNS providers.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// No provider registered under the requested name
    #[error("provider '{0}' not found")]
    NotFound(String),

    /// Missing or invalid provider configuration
    #[error("provider '{provider}' configuration error: {reason}")]
    Config {
        /// Provider name
        provider: String,
        /// What is missing
        reason: String,
    },

    /// The HTTP request could not be performed
    #[error("{provider} API request failed: {source}")]
    Http {
        /// Provider name
        provider: String,
        /// Underlying client error
        #[source]
        source: reqwest::Error,
    },

    /// The API answered with a non-success status
    #[error("{provider} API returned HTTP {status}: {body}")]
    Api {
        /// Provider name
        provider: String,
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// The API answered with something the client cannot use
    #[error("{provider}: unexpected response: {reason}")]
    UnexpectedResponse {
        /// Provider name
        provider: String,
        /// Explanation
        reason: String,
    },

    /// The declared record is invalid
    #[error(transparent)]
    Record(#[from] RecordError),

    /// The record cannot be mapped to a zone
    #[error(transparent)]
    Zone(#[from] ZoneError),
}

impl ProviderError {
    /// Whether retrying the operation later may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http { .. } => true,
            Self::Api { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Short category label used for error metrics.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::NotFound(_) | Self::Config { .. } => "config_error",
            Self::Http { .. } => "network_error",
            Self::Api { .. } | Self::UnexpectedResponse { .. } => "api_error",
            Self::Record(_) | Self::Zone(_) => "validation_error",
        }
    }
}

/// Inconsistent startup configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The embedded server is disabled and no provider is selected
    #[error("no provider selected and the embedded DNS server is disabled")]
    NoBackend,

    /// A remote provider was selected while the embedded server is enabled
    #[error("provider '{0}' requires the embedded DNS server to be disabled (--no-dns)")]
    ProviderConflict(String),

    /// The embedded provider was selected while the embedded server is disabled
    #[error("provider '{0}' requires the embedded DNS server")]
    EmbeddedDisabled(String),

    /// No provider registered under the requested name
    #[error("unknown provider '{0}'")]
    UnknownProvider(String),

    /// A flag value is not a usable address
    #[error("invalid {flag} '{value}': {reason}")]
    InvalidAddress {
        /// Flag name
        flag: &'static str,
        /// Rejected value
        value: String,
        /// Parser message
        reason: String,
    },
}
