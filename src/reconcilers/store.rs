// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Object-store and event seams of the `DNSRecord` reconciler.
//!
//! [`RecordStore`] and [`EventSink`] are the only ways the state machine talks to the
//! API server; [`KubeRecordStore`] and [`KubeEventSink`] back them with a
//! [`kube::Client`].

use super::finalizers::{ensure_finalizer, remove_finalizer};
use crate::constants::CONTROLLER_NAME;
use crate::crd::DNSRecord;
use crate::labels::FINALIZER_DNS_RECORD;
use anyhow::{Context as _, Result};
use async_trait::async_trait;
use kube::api::{Patch, PatchParams};
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::{Api, Client, Resource, ResourceExt};
use serde_json::json;
use tracing::{debug, warn};

/// Reads and writes `DNSRecord` objects.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Current object, `None` when it does not exist.
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<DNSRecord>>;

    /// Add the record finalizer.
    async fn add_finalizer(&self, record: &DNSRecord) -> Result<()>;

    /// Remove the record finalizer.
    async fn remove_finalizer(&self, record: &DNSRecord) -> Result<()>;

    /// Persist `record.status`, failing on a resource-version conflict.
    async fn update_status(&self, record: &DNSRecord) -> Result<()>;
}

/// Severity of a published event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    Normal,
    Warning,
}

/// Best-effort Kubernetes event publishing.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, record: &DNSRecord, kind: EventKind, reason: &str, note: String);
}

/// [`RecordStore`] over the API server.
#[derive(Clone)]
pub struct KubeRecordStore {
    client: Client,
}

impl KubeRecordStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<DNSRecord> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

/// Merge patch writing every status field, so cleared values are persisted too.
#[must_use]
pub fn status_patch(record: &DNSRecord) -> serde_json::Value {
    let status = record.status.clone().unwrap_or_default();
    json!({
        "metadata": { "resourceVersion": record.resource_version() },
        "status": {
            "record": status.record,
            "active": status.active,
            "provider": status.provider,
            "id": status.id,
        }
    })
}

#[async_trait]
impl RecordStore for KubeRecordStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<DNSRecord>> {
        self.api(namespace)
            .get_opt(name)
            .await
            .with_context(|| format!("fetching DNSRecord {namespace}/{name}"))
    }

    async fn add_finalizer(&self, record: &DNSRecord) -> Result<()> {
        ensure_finalizer(&self.client, record, FINALIZER_DNS_RECORD).await
    }

    async fn remove_finalizer(&self, record: &DNSRecord) -> Result<()> {
        remove_finalizer(&self.client, record, FINALIZER_DNS_RECORD).await
    }

    async fn update_status(&self, record: &DNSRecord) -> Result<()> {
        let namespace = record.namespace().unwrap_or_default();
        let name = record.name_any();
        self.api(&namespace)
            .patch_status(
                &name,
                &PatchParams::default(),
                &Patch::Merge(&status_patch(record)),
            )
            .await
            .with_context(|| format!("updating status of DNSRecord {namespace}/{name}"))?;
        debug!(namespace = %namespace, name = %name, "Updated DNSRecord status");
        Ok(())
    }
}

/// [`EventSink`] publishing through a [`Recorder`].
#[derive(Clone)]
pub struct KubeEventSink {
    recorder: Recorder,
}

impl KubeEventSink {
    /// Sink reporting as `k8s-dns`, with `instance` identifying this replica.
    #[must_use]
    pub fn new(client: Client, instance: Option<String>) -> Self {
        let reporter = Reporter {
            controller: CONTROLLER_NAME.to_string(),
            instance,
        };
        Self {
            recorder: Recorder::new(client, reporter),
        }
    }
}

#[async_trait]
impl EventSink for KubeEventSink {
    async fn publish(&self, record: &DNSRecord, kind: EventKind, reason: &str, note: String) {
        let event = Event {
            type_: match kind {
                EventKind::Normal => EventType::Normal,
                EventKind::Warning => EventType::Warning,
            },
            reason: reason.to_string(),
            note: Some(note),
            action: "Reconcile".to_string(),
            secondary: None,
        };
        if let Err(e) = self.recorder.publish(&event, &record.object_ref(&())).await {
            warn!(
                namespace = %record.namespace().unwrap_or_default(),
                name = %record.name_any(),
                error = %e,
                "Failed to publish event"
            );
        }
    }
}
