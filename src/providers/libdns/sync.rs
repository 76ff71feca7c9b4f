// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Serialization of mutations for APIs that do not tolerate concurrent writes.

use super::{LibdnsRecord, RecordClient};
use crate::errors::ProviderError;
use async_trait::async_trait;
use tokio::sync::RwLock;

/// Wraps a client so reads share a lock and appends/deletes hold it exclusively.
#[derive(Debug, Default)]
pub struct SyncClient<C> {
    inner: C,
    lock: RwLock<()>,
}

impl<C> SyncClient<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            lock: RwLock::new(()),
        }
    }

    /// The wrapped client.
    pub fn inner(&self) -> &C {
        &self.inner
    }
}

#[async_trait]
impl<C: RecordClient> RecordClient for SyncClient<C> {
    async fn get_records(&self, zone: &str) -> Result<Vec<LibdnsRecord>, ProviderError> {
        let _guard = self.lock.read().await;
        self.inner.get_records(zone).await
    }

    async fn append_records(
        &self,
        zone: &str,
        records: &[LibdnsRecord],
    ) -> Result<Vec<LibdnsRecord>, ProviderError> {
        let _guard = self.lock.write().await;
        self.inner.append_records(zone, records).await
    }

    async fn delete_records(
        &self,
        zone: &str,
        records: &[LibdnsRecord],
    ) -> Result<Vec<LibdnsRecord>, ProviderError> {
        let _guard = self.lock.write().await;
        self.inner.delete_records(zone, records).await
    }
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod sync_tests;
