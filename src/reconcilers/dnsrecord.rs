// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `DNSRecord` reconciliation.
//!
//! Each pass runs, in order:
//!
//! 1. fetch the object (gone means done)
//! 2. apply spec defaults and render the wire record
//! 3. on deletion, let the provider release external state, then drop the finalizer
//! 4. install the finalizer
//! 5. program the provider
//! 6. persist `status.provider`, `status.id` and `status.record` when they changed
//! 7. query the verification resolver and persist `status.active`
//! 8. requeue shortly while the observed state differs from `spec.active`
//!
//! Every step that writes to the API server returns right after, so the next pass
//! starts from the persisted state.

use super::locks::KeyLocks;
use super::store::{EventKind, EventSink, RecordStore};
use super::verify::Verifier;
use super::{error_policy, Outcome, ReconcileError};
use crate::admission::apply_defaults;
use crate::constants::{ACTIVATION_REQUEUE_DURATION_SECS, KIND_DNS_RECORD};
use crate::context::Context;
use crate::crd::{DNSRecord, DNSRecordStatus};
use crate::labels::FINALIZER_DNS_RECORD;
use crate::metrics;
use crate::providers::Provider;
use crate::reconcilers::finalizers::has_finalizer;
use crate::record::{render, to_rr};
use anyhow::{anyhow, Result};
use futures::StreamExt;
use kube::runtime::controller::{Action, Config as ControllerConfig};
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::Controller;
use kube::{Api, ResourceExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Event reasons.
pub const REASON_SUCCESS: &str = "Success";
pub const REASON_ERROR: &str = "Error";

/// The `DNSRecord` state machine and its collaborators.
pub struct RecordReconciler {
    store: Arc<dyn RecordStore>,
    events: Arc<dyn EventSink>,
    verifier: Arc<dyn Verifier>,
    provider: Arc<dyn Provider>,
    locks: KeyLocks,
}

impl RecordReconciler {
    pub fn new(
        store: Arc<dyn RecordStore>,
        events: Arc<dyn EventSink>,
        verifier: Arc<dyn Verifier>,
        provider: Arc<dyn Provider>,
    ) -> Self {
        Self {
            store,
            events,
            verifier,
            provider,
            locks: KeyLocks::new(),
        }
    }

    /// Name of the provider records are programmed with.
    #[must_use]
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Per-key locks, exposed for inspection.
    #[must_use]
    pub fn locks(&self) -> &KeyLocks {
        &self.locks
    }

    /// Run one pass for `namespace/name` while holding its key lock.
    ///
    /// # Errors
    ///
    /// Returns store, provider and rendering errors; the caller requeues.
    pub async fn reconcile(&self, namespace: &str, name: &str) -> Result<Outcome> {
        let lock = self.locks.get(namespace, name);
        let result = {
            let _guard = lock.lock().await;
            self.reconcile_locked(namespace, name).await
        };
        drop(lock);

        match result? {
            Some(outcome) => Ok(outcome),
            None => {
                self.locks.prune(namespace, name);
                Ok(Outcome::Done)
            }
        }
    }

    /// `None` when the object no longer exists.
    async fn reconcile_locked(&self, namespace: &str, name: &str) -> Result<Option<Outcome>> {
        let Some(mut record) = self.store.get(namespace, name).await? else {
            debug!(namespace = %namespace, name = %name, "DNSRecord not found");
            return Ok(None);
        };

        apply_defaults(&mut record);
        let rr = match to_rr(&record) {
            Ok(rr) => rr,
            Err(e) => {
                self.events
                    .publish(&record, EventKind::Warning, REASON_ERROR, e.to_string())
                    .await;
                return Err(anyhow::Error::new(e).context(format!("rendering DNSRecord {namespace}/{name}")));
            }
        };
        let rendered = render(&rr);

        if record.is_deleting() {
            return self.finalize(record).await.map(Some);
        }

        if !has_finalizer(&record, FINALIZER_DNS_RECORD) {
            self.store.add_finalizer(&record).await?;
            return Ok(Some(Outcome::Requeue));
        }

        let before = record.status.clone().unwrap_or_default();
        let outcome = self.provider.reconcile(&mut record).await?;
        if !outcome.handled {
            debug!(
                namespace = %namespace,
                name = %name,
                owner = %record.owner_provider(),
                "DNSRecord belongs to another provider"
            );
            return Ok(Some(outcome.requeue_after.map_or(Outcome::Done, Outcome::RequeueAfter)));
        }

        let status = record.status_mut();
        status.record.clone_from(&rendered);
        if ownership_changed(&before, status) || status.record != before.record {
            info!(
                namespace = %namespace,
                name = %name,
                provider = %status.provider,
                id = %status.id,
                record = %status.record,
                "Programmed DNSRecord"
            );
            self.store.update_status(&record).await?;
            return Ok(Some(Outcome::Requeue));
        }

        let observed = match self.verifier.verify(&rr).await {
            Ok(observed) => observed,
            Err(e) => {
                warn!(namespace = %namespace, name = %name, error = %e, "Verification query failed");
                false
            }
        };

        if record.status.as_ref().and_then(|s| s.active) != Some(observed) {
            record.status_mut().active = Some(observed);
            self.store.update_status(&record).await?;
            if !observed {
                self.events
                    .publish(
                        &record,
                        EventKind::Warning,
                        REASON_ERROR,
                        format!("record {rendered} is not active"),
                    )
                    .await;
            }
            return Ok(Some(Outcome::Requeue));
        }

        let desired = record.is_active();
        if desired != observed {
            self.events
                .publish(
                    &record,
                    EventKind::Warning,
                    REASON_ERROR,
                    format!("record {rendered} should be {} but is {}", state(desired), state(observed)),
                )
                .await;
            return Ok(Some(Outcome::RequeueAfter(Duration::from_secs(
                ACTIVATION_REQUEUE_DURATION_SECS,
            ))));
        }

        self.events
            .publish(
                &record,
                EventKind::Normal,
                REASON_SUCCESS,
                format!("record {rendered} is {}", state(observed)),
            )
            .await;
        Ok(Some(outcome.requeue_after.map_or(Outcome::Done, Outcome::RequeueAfter)))
    }

    async fn finalize(&self, mut record: DNSRecord) -> Result<Outcome> {
        if !has_finalizer(&record, FINALIZER_DNS_RECORD) {
            return Ok(Outcome::Done);
        }
        let namespace = record.namespace().unwrap_or_default();
        let name = record.name_any();

        let before = record.status.clone().unwrap_or_default();
        self.provider.reconcile(&mut record).await?;
        if ownership_changed(&before, &record.status.clone().unwrap_or_default()) {
            info!(namespace = %namespace, name = %name, "Released external state of DNSRecord");
            self.store.update_status(&record).await?;
            return Ok(Outcome::Requeue);
        }

        self.store.remove_finalizer(&record).await?;
        info!(namespace = %namespace, name = %name, "Finalized DNSRecord");
        Ok(Outcome::Done)
    }
}

fn ownership_changed(before: &DNSRecordStatus, after: &DNSRecordStatus) -> bool {
    before.provider != after.provider || before.id != after.id
}

fn state(active: bool) -> &'static str {
    if active {
        "active"
    } else {
        "inactive"
    }
}

/// Run the `DNSRecord` controller until its stream ends.
///
/// # Errors
///
/// Never fails once started; reconciliation errors are handled by the error policy.
pub async fn run_dns_record_controller(ctx: Arc<Context>) -> Result<()> {
    info!(
        provider = %ctx.reconciler.provider_name(),
        workers = ctx.workers,
        "Starting DNSRecord controller"
    );

    let api = Api::<DNSRecord>::all(ctx.client.clone());
    Controller::new(api, WatcherConfig::default())
        .with_config(ControllerConfig::default().concurrency(ctx.workers))
        .run(reconcile_dns_record, error_policy, ctx)
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

async fn reconcile_dns_record(
    record: Arc<DNSRecord>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    let start = Instant::now();
    let namespace = record
        .namespace()
        .ok_or_else(|| ReconcileError::from(anyhow!("DNSRecord {} has no namespace", record.name_any())))?;
    let name = record.name_any();

    let result = ctx.reconciler.reconcile(&namespace, &name).await;
    let duration = start.elapsed();
    match result {
        Ok(outcome) => {
            metrics::record_reconciliation_success(KIND_DNS_RECORD, duration);
            match outcome {
                Outcome::Done => {}
                Outcome::Requeue => metrics::record_reconciliation_requeue(KIND_DNS_RECORD, "status_changed"),
                Outcome::RequeueAfter(_) => metrics::record_reconciliation_requeue(KIND_DNS_RECORD, "delayed"),
            }
            Ok(outcome.into_action())
        }
        Err(e) => {
            metrics::record_reconciliation_error(KIND_DNS_RECORD, duration);
            metrics::record_error(KIND_DNS_RECORD, super::error_category(&e));
            Err(ReconcileError::from(e))
        }
    }
}

#[cfg(test)]
#[path = "dnsrecord_tests.rs"]
mod dnsrecord_tests;
