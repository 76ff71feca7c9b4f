// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Annotation and finalizer constants shared by the reconcilers.
//!
//! Parent objects (`Ingress`, `Service`) are steered with the `dns.linka.cloud/*`
//! annotations below; derived `DNSRecord`s carry a reclaim annotation naming their parent
//! so ownership survives a backup/restore that drops owner references.

// ============================================================================
// Finalizers
// ============================================================================

/// Finalizer placed on every `DNSRecord` until external state is released
pub const FINALIZER_DNS_RECORD: &str = "dns.linka.cloud/finalizer";

// ============================================================================
// Parent Annotations
// ============================================================================

/// Hostname published for a LoadBalancer `Service`
pub const ANNOTATION_HOSTNAME: &str = "dns.linka.cloud/hostname";

/// TTL (seconds) applied to derived records
pub const ANNOTATION_TTL: &str = "dns.linka.cloud/ttl";

/// Presence disables record derivation and removes existing children
pub const ANNOTATION_IGNORE: &str = "dns.linka.cloud/ignore";

// ============================================================================
// Reclaim Annotations
// ============================================================================

/// Names the `Ingress` a derived record belongs to
pub const ANNOTATION_INGRESS: &str = "dns.linka.cloud/ingress";

/// Names the `Service` a derived record belongs to
pub const ANNOTATION_SERVICE: &str = "dns.linka.cloud/service";
