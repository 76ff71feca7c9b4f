// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # k8s-dns - DNS records as Kubernetes objects
//!
//! k8s-dns reconciles `DNSRecord` custom resources (`dns.linka.cloud/v1alpha1`) into
//! live DNS data, either served by an embedded authoritative server or pushed to a
//! hosted DNS provider, and verifies every record with a real DNS query.
//!
//! ## Modules
//!
//! - [`crd`] - the `DNSRecord` custom resource
//! - [`record`] - conversion between specs, wire records and presentation format
//! - [`zones`] - in-memory zone store keyed by registrable domain
//! - [`dns`] - embedded DNS server and its plugin chain
//! - [`providers`] - the embedded provider and remote provider backends
//! - [`reconcilers`] - `DNSRecord`, `Ingress` and `Service` controllers
//! - [`admission`] / [`webhook`] - spec defaulting and validation
//! - [`config`] - command-line configuration
//! - [`cli`] - helpers of the `kubectl-dns` plugin
//!
//! ## Example
//!
//! ```rust
//! use k8s_dns::record::{parse, render};
//!
//! let rr = parse("api.example.com. 300 IN A 10.0.0.1").unwrap();
//! assert_eq!(render(&rr), "api.example.com.\t300\tIN\tA\t10.0.0.1");
//! ```

pub mod admission;
pub mod cli;
pub mod config;
pub mod constants;
pub mod context;
pub mod crd;
pub mod dns;
pub mod domain;
pub mod errors;
pub mod labels;
pub mod metrics;
pub mod providers;
pub mod reconcilers;
pub mod record;
pub mod webhook;
pub mod zones;

#[cfg(test)]
mod crd_tests;
