// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Provider backed by the in-process zone store.
//!
//! The provider follows the `DNSRecord` watch stream and keeps the [`ZoneStore`] in
//! step with it: active records are upserted under their canonical rendering,
//! inactive, terminating and deleted ones are removed. A canonical key shared by
//! several objects stays in the store until the last of them goes away.
//!
//! [`Provider::reconcile`] performs no I/O; it only claims ownership by stamping
//! `status.provider`.

use super::{release, Provider, ProviderOutcome};
use crate::admission::apply_defaults;
use crate::crd::DNSRecord;
use crate::errors::ProviderError;
use crate::record::{render, to_rr};
use crate::zones::ZoneStore;
use async_trait::async_trait;
use futures::StreamExt;
use hickory_proto::rr::Record;
use kube::runtime::watcher::{self, Event};
use kube::runtime::WatchStreamExt;
use kube::{Api, ResourceExt};
use std::collections::{BTreeMap, HashMap};
use std::pin::pin;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, error, info, warn};

/// Name stamped into `status.provider` for records served by the embedded server.
pub const EMBEDDED_PROVIDER_NAME: &str = "coredns";

#[derive(Debug)]
pub struct EmbeddedProvider {
    store: Arc<ZoneStore>,
    /// `namespace/name` to canonical key
    owners: RwLock<HashMap<String, String>>,
}

impl EmbeddedProvider {
    #[must_use]
    pub fn new(store: Arc<ZoneStore>) -> Self {
        Self {
            store,
            owners: RwLock::new(HashMap::new()),
        }
    }

    /// Zone store fed by this provider.
    #[must_use]
    pub fn store(&self) -> &Arc<ZoneStore> {
        &self.store
    }

    /// Handle an add or update event.
    pub fn apply(&self, record: &DNSRecord) {
        let object = object_key(record);
        let desired = served_record(record);

        let mut owners = self.owners.write().unwrap_or_else(PoisonError::into_inner);
        let previous = match &desired {
            Some((key, _)) => owners.insert(object.clone(), key.clone()),
            None => owners.remove(&object),
        };
        if previous.as_deref() == desired.as_ref().map(|(key, _)| key.as_str()) {
            return;
        }

        let orphan = previous.filter(|prev| !owners.values().any(|k| k == prev));
        match &desired {
            Some((key, _)) => debug!(object = %object, record = %key, "Serving record"),
            None => debug!(object = %object, "Withdrawing record"),
        }
        self.store.mutate(|records| {
            if let Some(prev) = orphan {
                records.remove(&prev);
            }
            if let Some((key, rr)) = desired {
                records.insert(key, rr);
            }
        });
    }

    /// Handle a delete event.
    pub fn remove(&self, record: &DNSRecord) {
        let object = object_key(record);
        let mut owners = self.owners.write().unwrap_or_else(PoisonError::into_inner);
        let Some(previous) = owners.remove(&object) else {
            return;
        };
        if owners.values().any(|k| *k == previous) {
            return;
        }
        debug!(object = %object, record = %previous, "Removing record");
        self.store.delete_key(&previous);
    }

    /// Replace the whole state with `records`, as after a (re)list.
    pub fn resync<'a>(&self, records: impl IntoIterator<Item = &'a DNSRecord>) {
        let mut owners = HashMap::new();
        let mut served: BTreeMap<String, Record> = BTreeMap::new();
        for record in records {
            if let Some((key, rr)) = served_record(record) {
                owners.insert(object_key(record), key.clone());
                served.insert(key, rr);
            }
        }
        info!(records = served.len(), "Resynchronized embedded zones");
        let mut guard = self.owners.write().unwrap_or_else(PoisonError::into_inner);
        *guard = owners;
        self.store.replace(served.into_values());
    }

    /// Follow the `DNSRecord` watch stream until it ends.
    ///
    /// # Errors
    ///
    /// Never returns an error today; watch failures are logged and retried with backoff.
    pub async fn run_watcher(self: Arc<Self>, api: Api<DNSRecord>) -> anyhow::Result<()> {
        info!("Starting embedded provider watcher");
        let mut stream = pin!(watcher::watcher(api, watcher::Config::default()).default_backoff());
        let mut initial: Vec<DNSRecord> = Vec::new();

        while let Some(event) = stream.next().await {
            match event {
                Ok(Event::Init) => initial.clear(),
                Ok(Event::InitApply(record)) => initial.push(record),
                Ok(Event::InitDone) => {
                    self.resync(&initial);
                    initial.clear();
                }
                Ok(Event::Apply(record)) => self.apply(&record),
                Ok(Event::Delete(record)) => self.remove(&record),
                Err(e) => warn!(error = %e, "DNSRecord watch error"),
            }
        }
        error!("DNSRecord watch stream ended");
        Ok(())
    }
}

#[async_trait]
impl Provider for EmbeddedProvider {
    fn name(&self) -> &str {
        EMBEDDED_PROVIDER_NAME
    }

    async fn reconcile(&self, record: &mut DNSRecord) -> Result<ProviderOutcome, ProviderError> {
        let owner = record.owner_provider();
        if !owner.is_empty() && owner != EMBEDDED_PROVIDER_NAME {
            return Ok(ProviderOutcome::skipped());
        }
        if record.is_deleting() {
            release(record);
            return Ok(ProviderOutcome::handled());
        }
        record.status_mut().provider = EMBEDDED_PROVIDER_NAME.to_string();
        Ok(ProviderOutcome::handled())
    }
}

fn object_key(record: &DNSRecord) -> String {
    format!(
        "{}/{}",
        record.namespace().unwrap_or_default(),
        record.name_any()
    )
}

/// Canonical key and record to serve for `record`, `None` when it must not be served.
fn served_record(record: &DNSRecord) -> Option<(String, Record)> {
    if !record.is_active() || record.is_deleting() {
        return None;
    }
    let mut record = record.clone();
    apply_defaults(&mut record);
    match to_rr(&record) {
        Ok(rr) => Some((render(&rr), rr)),
        Err(e) => {
            warn!(object = %object_key(&record), error = %e, "Skipping invalid record");
            None
        }
    }
}

#[cfg(test)]
#[path = "embedded_tests.rs"]
mod embedded_tests;
