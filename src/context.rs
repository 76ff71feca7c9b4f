// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for all controllers.
//!
//! Every controller receives an `Arc<Context>` holding the Kubernetes client, the
//! `DNSRecord` state machine and the per-controller worker count.

use crate::reconcilers::RecordReconciler;
use kube::Client;
use std::sync::Arc;

/// Shared context passed to all controllers.
#[derive(Clone)]
pub struct Context {
    /// Kubernetes client for API operations
    pub client: Client,

    /// `DNSRecord` reconciliation state machine
    pub reconciler: Arc<RecordReconciler>,

    /// Maximum concurrent reconciliations per controller
    pub workers: u16,
}

impl Context {
    #[must_use]
    pub fn new(client: Client, reconciler: Arc<RecordReconciler>, workers: u16) -> Self {
        Self {
            client,
            reconciler,
            workers,
        }
    }
}
