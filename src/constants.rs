// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the k8s-dns controller.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// API group of the `DNSRecord` CRD
pub const API_GROUP: &str = "dns.linka.cloud";

/// API version of the `DNSRecord` CRD
pub const API_VERSION: &str = "v1alpha1";

/// Fully qualified API version (group/version)
pub const API_GROUP_VERSION: &str = "dns.linka.cloud/v1alpha1";

/// Kind name for `DNSRecord` resource
pub const KIND_DNS_RECORD: &str = "DNSRecord";

/// Kind name for `Ingress` parents
pub const KIND_INGRESS: &str = "Ingress";

/// Kind name for `Service` parents
pub const KIND_SERVICE: &str = "Service";

/// Reporting controller name used for events and leases
pub const CONTROLLER_NAME: &str = "k8s-dns";

// ============================================================================
// DNS Protocol Constants
// ============================================================================

/// Standard DNS port for queries
pub const DNS_PORT: u16 = 53;

/// DNS class IN
pub const DNS_CLASS_IN: u16 = 1;

/// Default TTL applied to declared records (1 hour)
pub const DEFAULT_RECORD_TTL_SECS: u32 = 3600;

/// Default SRV weight
pub const DEFAULT_SRV_WEIGHT: u16 = 1;

/// Default MX preference
pub const DEFAULT_MX_PREFERENCE: u16 = 10;

/// Longest RFC 1035 character-string, the unit of TXT data
pub const MAX_TXT_STRING_LEN: usize = 255;

/// Maximum UDP response size without EDNS
pub const MAX_UDP_RESPONSE_SIZE: usize = 512;

/// Receive buffer size for UDP requests
pub const UDP_RECV_BUFFER_SIZE: usize = 4096;

/// Deadline applied to every verification and forwarded query
pub const DNS_QUERY_TIMEOUT_SECS: u64 = 5;

/// Idle timeout for pipelined TCP connections
pub const TCP_IDLE_TIMEOUT_SECS: u64 = 10;

/// Maximum number of CNAME hops followed inside a zone
pub const MAX_CNAME_CHAIN: usize = 8;

/// Maximum number of cached DNS responses
pub const DNS_CACHE_CAPACITY: usize = 10_000;

// ============================================================================
// Synthesized Zone Constants
// ============================================================================

/// Label inserted between the nameserver host and the zone (`ns0.<apex>.<zone>`)
pub const ZONE_APEX_LABEL: &str = "dns";

/// Host label of the synthesized nameserver
pub const ZONE_NS_LABEL: &str = "ns0";

/// Mailbox label of the synthesized SOA
pub const ZONE_HOSTMASTER_LABEL: &str = "hostmaster";

/// TTL of synthesized apex records
pub const ZONE_APEX_TTL_SECS: u32 = 3600;

/// SOA refresh interval
pub const SOA_REFRESH_SECS: i32 = 7200;

/// SOA retry interval
pub const SOA_RETRY_SECS: i32 = 1800;

/// SOA expire time
pub const SOA_EXPIRE_SECS: i32 = 86400;

/// SOA minimum (negative caching) TTL
pub const SOA_MINIMUM_TTL_SECS: u32 = 5;

// ============================================================================
// Controller Error Handling Constants
// ============================================================================

/// Requeue duration for controller errors (30 seconds)
pub const ERROR_REQUEUE_DURATION_SECS: u64 = 30;

/// Requeue delay after a status or finalizer write
pub const STATUS_REQUEUE_DURATION_MILLIS: u64 = 500;

/// Requeue delay while desired and observed activation differ
pub const ACTIVATION_REQUEUE_DURATION_SECS: u64 = 1;

/// Default number of concurrent reconcile workers
pub const DEFAULT_WORKERS: u16 = 8;

// ============================================================================
// Leader Election Constants
// ============================================================================

/// Name of the leader election lease
pub const LEADER_LEASE_NAME: &str = "k8s-dns-leader";

/// Default leader election lease duration (15 seconds)
pub const DEFAULT_LEASE_DURATION_SECS: u64 = 15;

/// Default leader election grace period (5 seconds)
pub const DEFAULT_LEASE_GRACE_SECS: u64 = 5;

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

// ============================================================================
// HTTP Server Constants
// ============================================================================

/// Default bind address for the metrics and health server
pub const DEFAULT_METRICS_ADDR: &str = "0.0.0.0:4299";

/// Path for Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";

/// Default bind address for the admission webhook
pub const DEFAULT_WEBHOOK_ADDR: &str = "0.0.0.0:9443";

/// Mutating webhook path
pub const WEBHOOK_MUTATE_PATH: &str = "/mutate-dns-linka-cloud-v1alpha1-dnsrecord";

/// Validating webhook path
pub const WEBHOOK_VALIDATE_PATH: &str = "/validate-dns-linka-cloud-v1alpha1-dnsrecord";

/// Timeout for remote provider HTTP calls
pub const PROVIDER_HTTP_TIMEOUT_SECS: u64 = 30;
