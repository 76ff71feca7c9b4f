// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod tests {
    use crate::crd::{ARecord, DNSRecord, DNSRecordSpec, DNSRecordStatus, MXRecord, TXTRecord};
    use crate::errors::ProviderError;
    use crate::providers::libdns::{
        absolute_name, encode_value, libdns_record_from_rr, normalize, relative_name, unquote,
        LibdnsRecord, RecordClient, RemoteProvider,
    };
    use crate::providers::{Provider, ProviderOutcome};
    use crate::record::parse;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// In-memory hosted zone.
    #[derive(Default)]
    struct FakeClient {
        records: Mutex<Vec<LibdnsRecord>>,
        next_id: AtomicUsize,
        appends: AtomicUsize,
        deletes: AtomicUsize,
        zones: Mutex<Vec<String>>,
    }

    impl FakeClient {
        fn seeded(records: Vec<LibdnsRecord>) -> Arc<Self> {
            let client = Self::default();
            client.next_id.store(100, Ordering::SeqCst);
            *client.records.lock().unwrap() = records;
            Arc::new(client)
        }

        fn snapshot(&self) -> Vec<LibdnsRecord> {
            self.records.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RecordClient for Arc<FakeClient> {
        async fn get_records(&self, zone: &str) -> Result<Vec<LibdnsRecord>, ProviderError> {
            self.zones.lock().unwrap().push(zone.to_string());
            Ok(self.snapshot())
        }

        async fn append_records(
            &self,
            _zone: &str,
            records: &[LibdnsRecord],
        ) -> Result<Vec<LibdnsRecord>, ProviderError> {
            self.appends.fetch_add(1, Ordering::SeqCst);
            let mut created = Vec::new();
            for record in records {
                let mut record = record.clone();
                record.id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();
                created.push(record.clone());
                self.records.lock().unwrap().push(record);
            }
            Ok(created)
        }

        async fn delete_records(
            &self,
            _zone: &str,
            records: &[LibdnsRecord],
        ) -> Result<Vec<LibdnsRecord>, ProviderError> {
            self.deletes.fetch_add(1, Ordering::SeqCst);
            self.records
                .lock()
                .unwrap()
                .retain(|r| !records.iter().any(|d| d.id == r.id));
            Ok(records.to_vec())
        }
    }

    /// Client whose listing always fails.
    struct FailingClient;

    #[async_trait]
    impl RecordClient for FailingClient {
        async fn get_records(&self, _zone: &str) -> Result<Vec<LibdnsRecord>, ProviderError> {
            Err(ProviderError::Api {
                provider: "fake".into(),
                status: 503,
                body: "unavailable".into(),
            })
        }

        async fn append_records(
            &self,
            _zone: &str,
            _records: &[LibdnsRecord],
        ) -> Result<Vec<LibdnsRecord>, ProviderError> {
            Ok(Vec::new())
        }

        async fn delete_records(
            &self,
            _zone: &str,
            _records: &[LibdnsRecord],
        ) -> Result<Vec<LibdnsRecord>, ProviderError> {
            Ok(Vec::new())
        }
    }

    fn a_record(target: &str) -> DNSRecord {
        let mut record = DNSRecord::new(
            "api",
            DNSRecordSpec {
                a: Some(ARecord {
                    name: "api.example.com.".into(),
                    ttl: 300,
                    target: target.into(),
                    ..Default::default()
                }),
                ..Default::default()
            },
        );
        record.metadata.namespace = Some("default".into());
        record
    }

    fn owned(mut record: DNSRecord, id: &str) -> DNSRecord {
        record.status = Some(DNSRecordStatus {
            provider: "fake".into(),
            id: id.into(),
            ..Default::default()
        });
        record
    }

    fn remote(name: &str, record_type: &str, value: &str, id: &str) -> LibdnsRecord {
        LibdnsRecord {
            id: id.into(),
            name: name.into(),
            record_type: record_type.into(),
            value: value.into(),
            ttl: Duration::from_secs(300),
        }
    }

    #[tokio::test]
    async fn test_creates_missing_record_and_stamps_id() {
        let client = FakeClient::seeded(Vec::new());
        let provider = RemoteProvider::new("fake", client.clone());
        let mut record = a_record("10.0.0.1");

        let outcome = provider.reconcile(&mut record).await.unwrap();
        assert_eq!(outcome, ProviderOutcome::handled());

        let status = record.status.unwrap();
        assert_eq!(status.provider, "fake");
        assert_eq!(status.id, "100");
        assert_eq!(client.snapshot(), vec![remote("api.example.com.", "A", "10.0.0.1", "100")]);
        assert_eq!(client.zones.lock().unwrap().as_slice(), ["example.com."]);
    }

    #[tokio::test]
    async fn test_up_to_date_record_is_left_alone() {
        let client = FakeClient::seeded(vec![remote("api", "a", "10.0.0.1", "7")]);
        let provider = RemoteProvider::new("fake", client.clone());
        let mut record = owned(a_record("10.0.0.1"), "7");

        provider.reconcile(&mut record).await.unwrap();
        assert_eq!(client.appends.load(Ordering::SeqCst), 0);
        assert_eq!(client.deletes.load(Ordering::SeqCst), 0);
        assert_eq!(record.status.unwrap().id, "7");
    }

    #[tokio::test]
    async fn test_changed_record_is_replaced() {
        let client = FakeClient::seeded(vec![remote("api.example.com.", "A", "10.0.0.1", "7")]);
        let provider = RemoteProvider::new("fake", client.clone());
        let mut record = owned(a_record("10.0.0.2"), "7");

        provider.reconcile(&mut record).await.unwrap();
        assert_eq!(client.snapshot(), vec![remote("api.example.com.", "A", "10.0.0.2", "100")]);
        assert_eq!(record.status.unwrap().id, "100");
    }

    #[tokio::test]
    async fn test_existing_identical_record_is_adopted() {
        let client = FakeClient::seeded(vec![remote("api.example.com.", "A", "10.0.0.1", "55")]);
        let provider = RemoteProvider::new("fake", client.clone());
        let mut record = a_record("10.0.0.1");

        provider.reconcile(&mut record).await.unwrap();
        assert_eq!(client.appends.load(Ordering::SeqCst), 0);
        assert_eq!(record.status.unwrap().id, "55");
    }

    #[tokio::test]
    async fn test_inactive_record_is_deleted_and_released() {
        let client = FakeClient::seeded(vec![remote("api.example.com.", "A", "10.0.0.1", "7")]);
        let provider = RemoteProvider::new("fake", client.clone());
        let mut record = owned(a_record("10.0.0.1"), "7");
        record.spec.active = Some(false);

        provider.reconcile(&mut record).await.unwrap();
        assert!(client.snapshot().is_empty());
        let status = record.status.unwrap();
        assert!(status.provider.is_empty());
        assert!(status.id.is_empty());
    }

    #[tokio::test]
    async fn test_terminating_record_without_remote_copy_is_released() {
        let client = FakeClient::seeded(Vec::new());
        let provider = RemoteProvider::new("fake", client.clone());
        let mut record = owned(a_record("10.0.0.1"), "gone");
        record.metadata = serde_json::from_value(json!({
            "name": "api",
            "namespace": "default",
            "deletionTimestamp": "2025-01-01T00:00:00Z",
            "finalizers": ["dns.linka.cloud/finalizer"]
        }))
        .unwrap();

        let outcome = provider.reconcile(&mut record).await.unwrap();
        assert!(outcome.handled);
        assert_eq!(client.deletes.load(Ordering::SeqCst), 0);
        assert_eq!(record.owner_provider(), "");
    }

    #[tokio::test]
    async fn test_foreign_record_is_skipped() {
        let client = FakeClient::seeded(Vec::new());
        let provider = RemoteProvider::new("fake", client.clone());
        let mut record = a_record("10.0.0.1");
        record.status_mut().provider = "coredns".into();

        let outcome = provider.reconcile(&mut record).await.unwrap();
        assert_eq!(outcome, ProviderOutcome::skipped());
        assert!(client.zones.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_listing_failure_is_returned() {
        let provider = RemoteProvider::new("fake", FailingClient);
        let mut record = a_record("10.0.0.1");

        let err = provider.reconcile(&mut record).await.unwrap_err();
        assert!(matches!(err, ProviderError::Api { status: 503, .. }));
        assert_eq!(record.owner_provider(), "");
    }

    #[tokio::test]
    async fn test_invalid_spec_is_rejected_before_any_call() {
        let client = FakeClient::seeded(Vec::new());
        let provider = RemoteProvider::new("fake", client.clone());
        let mut record = a_record("not-an-ip");

        let err = provider.reconcile(&mut record).await.unwrap_err();
        assert!(matches!(err, ProviderError::Record(_)));
        assert!(client.zones.lock().unwrap().is_empty());
    }

    #[test]
    fn test_encode_txt_concatenates_strings() {
        let mut record = DNSRecord::new(
            "txt",
            DNSRecordSpec {
                txt: Some(TXTRecord {
                    name: "example.com.".into(),
                    class: 1,
                    ttl: 60,
                    targets: vec!["a".into(), "b".into()],
                }),
                ..Default::default()
            },
        );
        record.metadata.namespace = Some("default".into());
        let rr = crate::record::to_rr(&record).unwrap();

        let encoded = libdns_record_from_rr(&rr, "");
        assert_eq!(encoded.record_type, "TXT");
        assert_eq!(encoded.value, "ab");
        assert_eq!(encoded.ttl, Duration::from_secs(60));
    }

    #[test]
    fn test_encode_mx_and_srv() {
        let mx = crate::record::spec_to_rr(&DNSRecordSpec {
            mx: Some(MXRecord {
                name: "example.com.".into(),
                class: 1,
                ttl: 60,
                preference: 10,
                target: "mail.example.com".into(),
            }),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(encode_value(&mx), "10 mail.example.com.");

        let srv = parse("_sip._tcp.example.com. 60 IN SRV 1 2 5060 sip.example.com.").unwrap();
        assert_eq!(encode_value(&srv), "1 2 5060 sip.example.com.");
    }

    #[test]
    fn test_normalize_provider_forms() {
        let zone = "example.com.";
        assert_eq!(
            normalize(&remote("@", "txt", "\"a\" \"b\"", "1"), zone),
            remote("example.com.", "TXT", "ab", "1")
        );
        assert_eq!(
            normalize(&remote("www", "CNAME", "example.com", "2"), zone),
            remote("www.example.com.", "CNAME", "example.com.", "2")
        );
        assert_eq!(
            normalize(&remote("example.com", "MX", "10 mail.example.com", "3"), zone),
            remote("example.com.", "MX", "10 mail.example.com.", "3")
        );
    }

    #[test]
    fn test_absolute_and_relative_names() {
        assert_eq!(absolute_name("@", "example.com."), "example.com.");
        assert_eq!(absolute_name("", "example.com"), "example.com.");
        assert_eq!(absolute_name("WWW", "example.com."), "www.example.com.");
        assert_eq!(absolute_name("www.example.com", "example.com."), "www.example.com.");
        assert_eq!(absolute_name("other.net.", "example.com."), "other.net.");

        assert_eq!(relative_name("example.com.", "example.com."), "@");
        assert_eq!(relative_name("a.b.example.com.", "example.com."), "a.b");
        assert_eq!(relative_name("other.net.", "example.com."), "other.net");
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("plain"), "plain");
        assert_eq!(unquote(" \"a b\" "), "a b");
        assert_eq!(unquote("\"say \\\"hi\\\"\" \"x\""), "say \"hi\"x");
    }
}
