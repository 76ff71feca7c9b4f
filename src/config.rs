// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Command-line configuration of the `k8s-dns` controller.
//!
//! Flags that commonly come from a Deployment manifest are mirrored by environment
//! variables. [`Args::validate`] rejects combinations that cannot run; provider
//! credentials are checked when the provider is built.

use crate::constants::{DEFAULT_METRICS_ADDR, DEFAULT_WEBHOOK_ADDR, DEFAULT_WORKERS, DNS_PORT};
use crate::dns::PluginConfig;
use crate::errors::ConfigError;
use crate::providers::embedded::EMBEDDED_PROVIDER_NAME;
use crate::providers::Registry;
use clap::Parser;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Kubernetes DNS controller with an embedded authoritative server.
#[derive(Parser, Debug, Clone)]
#[command(name = "k8s-dns", version, about)]
pub struct Args {
    /// Address of the metrics and health endpoints
    #[arg(long, env = "METRICS_ADDR", default_value = DEFAULT_METRICS_ADDR)]
    pub metrics_addr: SocketAddr,

    /// Only run the controllers while holding the leader lease
    #[arg(long, env = "ENABLE_LEADER_ELECTION")]
    pub enable_leader_election: bool,

    /// Namespace of the leader lease
    #[arg(long, env = "POD_NAMESPACE", default_value = "default")]
    pub leader_election_namespace: String,

    /// Serve the admission webhook
    #[arg(long, env = "ENABLE_WEBHOOK")]
    pub enable_webhook: bool,

    /// Address of the admission webhook
    #[arg(long, default_value = DEFAULT_WEBHOOK_ADDR)]
    pub webhook_addr: SocketAddr,

    /// Do not run the embedded DNS server
    #[arg(long)]
    pub no_dns: bool,

    /// Address of the embedded DNS server (UDP and TCP)
    #[arg(long, default_value = "0.0.0.0:53")]
    pub dns_addr: SocketAddr,

    /// Log every DNS query
    #[arg(long)]
    pub dns_log: bool,

    /// Upstream servers for names outside the served zones
    #[arg(long, value_delimiter = ',')]
    pub dns_forward: Vec<String>,

    /// Record per-query DNS metrics
    #[arg(long)]
    pub dns_metrics: bool,

    /// Cache DNS responses for at most this many seconds, 0 disables the cache
    #[arg(long, default_value_t = 0)]
    pub dns_cache: u64,

    /// Answer ANY queries with a minimal response
    #[arg(long)]
    pub dns_any: bool,

    /// Address clients reach the DNS server on, published as the ns0 glue record
    #[arg(short = 'a', long, env = "EXTERNAL_ADDRESS", default_value = "127.0.0.1")]
    pub external_address: IpAddr,

    /// Resolver used to verify programmed records, forced to the embedded server when it runs
    #[arg(long, default_value = "1.1.1.1")]
    pub dns_verification_server: String,

    /// Provider records are programmed with
    #[arg(short = 'p', long, env = "DNS_PROVIDER", default_value = EMBEDDED_PROVIDER_NAME)]
    pub provider: String,

    /// Concurrent reconciliations per controller
    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    pub workers: u16,
}

impl Args {
    /// Whether the embedded DNS server runs.
    #[must_use]
    pub fn embedded_enabled(&self) -> bool {
        !self.no_dns
    }

    /// Whether the selected provider is the embedded one.
    #[must_use]
    pub fn uses_embedded_provider(&self) -> bool {
        self.provider == EMBEDDED_PROVIDER_NAME
    }

    /// Reject combinations that cannot run.
    ///
    /// # Errors
    ///
    /// Returns the first inconsistency found.
    pub fn validate(&self, registry: &Registry) -> Result<(), ConfigError> {
        if self.provider.is_empty() {
            return Err(ConfigError::NoBackend);
        }
        if self.uses_embedded_provider() {
            if !self.embedded_enabled() {
                return Err(ConfigError::EmbeddedDisabled(self.provider.clone()));
            }
        } else {
            if self.embedded_enabled() {
                return Err(ConfigError::ProviderConflict(self.provider.clone()));
            }
            if !registry.contains(&self.provider) {
                return Err(ConfigError::UnknownProvider(self.provider.clone()));
            }
        }
        self.plugin_config()?;
        self.verification_server()?;
        Ok(())
    }

    /// Plugin chain configuration of the embedded server.
    ///
    /// # Errors
    ///
    /// Returns an error for an unparsable forward upstream.
    pub fn plugin_config(&self) -> Result<PluginConfig, ConfigError> {
        let forward = self
            .dns_forward
            .iter()
            .filter(|s| !s.trim().is_empty())
            .map(|s| parse_server("--dns-forward", s))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PluginConfig {
            log: self.dns_log,
            metrics: self.dns_metrics,
            any: self.dns_any,
            cache_ttl: (self.dns_cache > 0).then(|| Duration::from_secs(self.dns_cache)),
            forward,
        })
    }

    /// Resolver queried by the verification step.
    ///
    /// # Errors
    ///
    /// Returns an error for an unparsable `--dns-verification-server`.
    pub fn verification_server(&self) -> Result<SocketAddr, ConfigError> {
        if self.embedded_enabled() {
            return Ok(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), self.dns_addr.port()));
        }
        parse_server("--dns-verification-server", &self.dns_verification_server)
    }
}

/// Parse `ip` or `ip:port`, port 53 implied.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidAddress`] when `value` is neither.
pub fn parse_server(flag: &'static str, value: &str) -> Result<SocketAddr, ConfigError> {
    let value = value.trim();
    if let Ok(addr) = value.parse::<SocketAddr>() {
        return Ok(addr);
    }
    let bare = value.trim_start_matches('[').trim_end_matches(']');
    bare.parse::<IpAddr>()
        .map(|ip| SocketAddr::new(ip, DNS_PORT))
        .map_err(|e| ConfigError::InvalidAddress {
            flag,
            value: value.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
