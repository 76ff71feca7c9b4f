// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes reconciliation controllers.
//!
//! # Available Reconcilers
//!
//! - [`dnsrecord`] - programs a `DNSRecord` through its provider and verifies it live
//! - [`ingress`] - derives A records from `Ingress` rules and load-balancer addresses
//! - [`service`] - derives A records from annotated `LoadBalancer` services
//!
//! The derivation controllers share [`children`], which reconciles the set of
//! `DNSRecord`s owned by a parent object.
//!
//! # Error handling
//!
//! Reconcile functions return [`ReconcileError`]; [`error_policy`] logs it and
//! requeues after [`ERROR_REQUEUE_DURATION_SECS`].

pub mod children;
pub mod dnsrecord;
pub mod finalizers;
pub mod ingress;
pub mod locks;
pub mod service;
pub mod store;
pub mod verify;

pub use dnsrecord::{run_dns_record_controller, RecordReconciler};
pub use ingress::run_ingress_controller;
pub use service::run_service_controller;

use crate::constants::{ERROR_REQUEUE_DURATION_SECS, STATUS_REQUEUE_DURATION_MILLIS};
use crate::errors::{ProviderError, RecordError};
use kube::runtime::controller::Action;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

/// Reconciliation error wrapper
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ReconcileError(#[from] anyhow::Error);

/// What a reconcile pass asks of the controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Converged, wait for the next change
    Done,
    /// State was written, run again shortly
    Requeue,
    /// Run again after the delay
    RequeueAfter(Duration),
}

impl Outcome {
    #[must_use]
    pub fn into_action(self) -> Action {
        match self {
            Outcome::Done => Action::await_change(),
            Outcome::Requeue => Action::requeue(Duration::from_millis(STATUS_REQUEUE_DURATION_MILLIS)),
            Outcome::RequeueAfter(delay) => Action::requeue(delay),
        }
    }
}

/// Error policy shared by every controller.
#[allow(clippy::needless_pass_by_value)] // Signature required by kube::runtime::Controller
pub fn error_policy<T, C>(resource: Arc<T>, err: &ReconcileError, _ctx: Arc<C>) -> Action
where
    T: Debug,
{
    error!(
        error = %err,
        resource = ?resource,
        "Reconciliation error - will retry in {}s",
        ERROR_REQUEUE_DURATION_SECS
    );
    Action::requeue(Duration::from_secs(ERROR_REQUEUE_DURATION_SECS))
}

/// Metric label for a reconcile error.
#[must_use]
pub fn error_category(err: &anyhow::Error) -> &'static str {
    if let Some(e) = err.downcast_ref::<ProviderError>() {
        return e.category();
    }
    if err.downcast_ref::<RecordError>().is_some() {
        return "invalid_spec";
    }
    if err.chain().any(|cause| cause.downcast_ref::<kube::Error>().is_some()) {
        return "kubernetes";
    }
    "reconcile"
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod mod_tests;
