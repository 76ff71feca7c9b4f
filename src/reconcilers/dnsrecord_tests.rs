// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod tests {
    use crate::crd::{ARecord, DNSRecord, DNSRecordSpec, DNSRecordStatus};
    use crate::labels::FINALIZER_DNS_RECORD;
    use crate::providers::embedded::{EmbeddedProvider, EMBEDDED_PROVIDER_NAME};
    use crate::reconcilers::dnsrecord::{RecordReconciler, REASON_ERROR, REASON_SUCCESS};
    use crate::reconcilers::store::{EventKind, EventSink, RecordStore};
    use crate::reconcilers::verify::Verifier;
    use crate::reconcilers::Outcome;
    use crate::zones::ZoneStore;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use hickory_proto::rr::Record;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Single-object store mimicking the API server semantics the reconciler relies on.
    #[derive(Default)]
    struct FakeStore {
        object: Mutex<Option<DNSRecord>>,
        status_writes: AtomicUsize,
    }

    impl FakeStore {
        fn with(record: DNSRecord) -> Arc<Self> {
            Arc::new(Self {
                object: Mutex::new(Some(record)),
                status_writes: AtomicUsize::new(0),
            })
        }

        fn current(&self) -> Option<DNSRecord> {
            self.object.lock().unwrap().clone()
        }

        fn status(&self) -> DNSRecordStatus {
            self.current().and_then(|r| r.status).unwrap_or_default()
        }
    }

    #[async_trait]
    impl RecordStore for FakeStore {
        async fn get(&self, _namespace: &str, _name: &str) -> Result<Option<DNSRecord>> {
            Ok(self.current())
        }

        async fn add_finalizer(&self, _record: &DNSRecord) -> Result<()> {
            let mut object = self.object.lock().unwrap();
            let stored = object.as_mut().ok_or_else(|| anyhow!("not found"))?;
            stored
                .metadata
                .finalizers
                .get_or_insert_with(Vec::new)
                .push(FINALIZER_DNS_RECORD.to_string());
            Ok(())
        }

        async fn remove_finalizer(&self, _record: &DNSRecord) -> Result<()> {
            let mut object = self.object.lock().unwrap();
            let stored = object.as_mut().ok_or_else(|| anyhow!("not found"))?;
            if let Some(finalizers) = stored.metadata.finalizers.as_mut() {
                finalizers.retain(|f| f != FINALIZER_DNS_RECORD);
            }
            let gone = stored.metadata.deletion_timestamp.is_some()
                && stored.metadata.finalizers.as_ref().is_none_or(Vec::is_empty);
            if gone {
                *object = None;
            }
            Ok(())
        }

        async fn update_status(&self, record: &DNSRecord) -> Result<()> {
            let mut object = self.object.lock().unwrap();
            let stored = object.as_mut().ok_or_else(|| anyhow!("not found"))?;
            stored.status.clone_from(&record.status);
            self.status_writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeEvents {
        events: Mutex<Vec<(EventKind, String, String)>>,
    }

    impl FakeEvents {
        fn reasons(&self) -> Vec<(EventKind, String)> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .map(|(kind, reason, _)| (*kind, reason.clone()))
                .collect()
        }

        fn notes(&self) -> Vec<String> {
            self.events.lock().unwrap().iter().map(|(_, _, note)| note.clone()).collect()
        }
    }

    #[async_trait]
    impl EventSink for FakeEvents {
        async fn publish(&self, _record: &DNSRecord, kind: EventKind, reason: &str, note: String) {
            self.events.lock().unwrap().push((kind, reason.to_string(), note));
        }
    }

    /// Answers every verification with a fixed result.
    struct FakeVerifier(Option<bool>);

    #[async_trait]
    impl Verifier for FakeVerifier {
        async fn verify(&self, _rr: &Record) -> Result<bool> {
            self.0.ok_or_else(|| anyhow!("resolver unreachable"))
        }
    }

    struct Harness {
        store: Arc<FakeStore>,
        events: Arc<FakeEvents>,
        zones: Arc<ZoneStore>,
        reconciler: RecordReconciler,
    }

    impl Harness {
        fn new(record: DNSRecord, verified: Option<bool>) -> Self {
            let store = FakeStore::with(record);
            let events = Arc::new(FakeEvents::default());
            let zones = Arc::new(ZoneStore::new(None));
            let reconciler = RecordReconciler::new(
                store.clone(),
                events.clone(),
                Arc::new(FakeVerifier(verified)),
                Arc::new(EmbeddedProvider::new(zones.clone())),
            );
            Self {
                store,
                events,
                zones,
                reconciler,
            }
        }

        async fn pass(&self) -> Outcome {
            self.reconciler.reconcile("default", "api").await.unwrap()
        }

        /// Run passes until the reconciler stops asking for an immediate requeue.
        async fn settle(&self) -> Outcome {
            for _ in 0..10 {
                let outcome = self.pass().await;
                if outcome != Outcome::Requeue {
                    return outcome;
                }
            }
            panic!("reconciler did not settle");
        }
    }

    fn a_record() -> DNSRecord {
        let mut record = DNSRecord::new(
            "api",
            DNSRecordSpec {
                a: Some(ARecord {
                    name: "api.example.com.".into(),
                    target: "10.0.0.1".into(),
                    ..Default::default()
                }),
                ..Default::default()
            },
        );
        record.metadata.namespace = Some("default".into());
        record
    }

    fn deleting(mut record: DNSRecord) -> DNSRecord {
        record.metadata = serde_json::from_value(json!({
            "name": record.metadata.name,
            "namespace": record.metadata.namespace,
            "deletionTimestamp": "2025-01-01T00:00:00Z",
            "finalizers": [FINALIZER_DNS_RECORD]
        }))
        .unwrap();
        record
    }

    fn owned_by(mut record: DNSRecord, provider: &str) -> DNSRecord {
        record.metadata.finalizers = Some(vec![FINALIZER_DNS_RECORD.to_string()]);
        record.status = Some(DNSRecordStatus {
            provider: provider.into(),
            id: "42".into(),
            ..Default::default()
        });
        record
    }

    #[tokio::test]
    async fn test_missing_object_is_done_and_lock_pruned() {
        let h = Harness::new(a_record(), Some(true));
        *h.store.object.lock().unwrap() = None;

        assert_eq!(h.pass().await, Outcome::Done);
        assert!(h.reconciler.locks().is_empty());
        assert!(h.events.reasons().is_empty());
    }

    #[tokio::test]
    async fn test_finalizer_is_installed_first() {
        let h = Harness::new(a_record(), Some(true));

        assert_eq!(h.pass().await, Outcome::Requeue);
        let stored = h.store.current().unwrap();
        assert_eq!(stored.metadata.finalizers, Some(vec![FINALIZER_DNS_RECORD.to_string()]));
        assert_eq!(h.store.status_writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_programming_persists_ownership_and_rendering() {
        let h = Harness::new(a_record(), Some(true));
        h.pass().await;

        assert_eq!(h.pass().await, Outcome::Requeue);
        let status = h.store.status();
        assert_eq!(status.provider, EMBEDDED_PROVIDER_NAME);
        assert_eq!(status.record, "api.example.com.\t3600\tIN\tA\t10.0.0.1");
        assert_eq!(status.active, None);
    }

    #[tokio::test]
    async fn test_verified_record_converges_active() {
        let h = Harness::new(a_record(), Some(true));

        assert_eq!(h.settle().await, Outcome::Done);
        assert_eq!(h.store.status().active, Some(true));
        assert_eq!(h.events.reasons().last(), Some(&(EventKind::Normal, REASON_SUCCESS.to_string())));

        // Converged state writes nothing more.
        let writes = h.store.status_writes.load(Ordering::SeqCst);
        assert_eq!(h.pass().await, Outcome::Done);
        assert_eq!(h.store.status_writes.load(Ordering::SeqCst), writes);
    }

    #[tokio::test]
    async fn test_unverified_active_record_retries_shortly() {
        let h = Harness::new(a_record(), Some(false));

        let outcome = h.settle().await;
        assert_eq!(outcome, Outcome::RequeueAfter(Duration::from_secs(1)));
        assert_eq!(h.store.status().active, Some(false));
        assert!(h
            .events
            .notes()
            .iter()
            .any(|note| note.ends_with("should be active but is inactive")));
    }

    #[tokio::test]
    async fn test_verification_error_counts_as_inactive() {
        let h = Harness::new(a_record(), None);

        assert_eq!(h.settle().await, Outcome::RequeueAfter(Duration::from_secs(1)));
        assert_eq!(h.store.status().active, Some(false));
    }

    #[tokio::test]
    async fn test_deactivated_record_converges_inactive() {
        let mut record = a_record();
        record.spec.active = Some(false);
        let h = Harness::new(record, Some(false));

        assert_eq!(h.settle().await, Outcome::Done);
        assert_eq!(h.store.status().active, Some(false));
        assert_eq!(h.events.reasons().last(), Some(&(EventKind::Normal, REASON_SUCCESS.to_string())));
    }

    #[tokio::test]
    async fn test_deactivated_record_still_served_retries() {
        let mut record = a_record();
        record.spec.active = Some(false);
        let h = Harness::new(record, Some(true));

        assert_eq!(h.settle().await, Outcome::RequeueAfter(Duration::from_secs(1)));
        assert_eq!(h.events.reasons().last(), Some(&(EventKind::Warning, REASON_ERROR.to_string())));
    }

    #[tokio::test]
    async fn test_deletion_releases_then_drops_finalizer() {
        let h = Harness::new(deleting(owned_by(a_record(), EMBEDDED_PROVIDER_NAME)), Some(true));

        assert_eq!(h.pass().await, Outcome::Requeue);
        let status = h.store.status();
        assert!(status.provider.is_empty());
        assert!(status.id.is_empty());

        assert_eq!(h.pass().await, Outcome::Done);
        assert!(h.store.current().is_none());

        assert_eq!(h.pass().await, Outcome::Done);
        assert!(h.reconciler.locks().is_empty());
    }

    #[tokio::test]
    async fn test_deletion_without_finalizer_is_done() {
        let mut record = deleting(a_record());
        record.metadata.finalizers = Some(vec!["other.io/keep".into()]);
        let h = Harness::new(record, Some(true));

        assert_eq!(h.pass().await, Outcome::Done);
        assert_eq!(h.store.status_writes.load(Ordering::SeqCst), 0);
        assert!(h.store.current().is_some());
    }

    #[tokio::test]
    async fn test_foreign_record_is_left_alone() {
        let h = Harness::new(owned_by(a_record(), "hetzner"), Some(true));

        assert_eq!(h.pass().await, Outcome::Done);
        assert_eq!(h.store.status().provider, "hetzner");
        assert_eq!(h.store.status_writes.load(Ordering::SeqCst), 0);
        assert!(h.events.reasons().is_empty());
        assert!(h.zones.records().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_spec_is_reported() {
        let mut record = a_record();
        record.spec.a = None;
        let h = Harness::new(record, Some(true));

        let err = h.reconciler.reconcile("default", "api").await.unwrap_err();
        assert!(err.to_string().contains("default/api"));
        assert_eq!(h.events.reasons(), vec![(EventKind::Warning, REASON_ERROR.to_string())]);
        assert!(h.store.current().unwrap().metadata.finalizers.is_none());
    }
}
