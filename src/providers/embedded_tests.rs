// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod tests {
    use crate::crd::{ARecord, DNSRecord, DNSRecordSpec, DNSRecordStatus};
    use crate::providers::embedded::{EmbeddedProvider, EMBEDDED_PROVIDER_NAME};
    use crate::providers::{Provider, ProviderOutcome};
    use crate::record::render;
    use crate::zones::ZoneStore;
    use serde_json::json;
    use std::sync::Arc;

    fn a_record(object: &str, name: &str, target: &str) -> DNSRecord {
        let mut record = DNSRecord::new(
            object,
            DNSRecordSpec {
                a: Some(ARecord {
                    name: name.into(),
                    target: target.into(),
                    ..Default::default()
                }),
                ..Default::default()
            },
        );
        record.metadata.namespace = Some("default".into());
        record
    }

    fn provider() -> EmbeddedProvider {
        EmbeddedProvider::new(Arc::new(ZoneStore::new(None)))
    }

    fn served(provider: &EmbeddedProvider) -> Vec<String> {
        provider.store().records().iter().map(render).collect()
    }

    fn deleting(mut record: DNSRecord) -> DNSRecord {
        record.metadata = serde_json::from_value(json!({
            "name": record.metadata.name,
            "namespace": record.metadata.namespace,
            "deletionTimestamp": "2025-01-01T00:00:00Z",
            "finalizers": ["dns.linka.cloud/finalizer"]
        }))
        .unwrap();
        record
    }

    #[test]
    fn test_apply_serves_record_with_defaults() {
        let provider = provider();
        provider.apply(&a_record("api", "api.example.com.", "10.0.0.1"));

        assert_eq!(served(&provider), vec!["api.example.com.\t3600\tIN\tA\t10.0.0.1"]);
        assert!(provider.store().zones().get("example.com.").is_some());
    }

    #[test]
    fn test_apply_update_replaces_previous_record() {
        let provider = provider();
        provider.apply(&a_record("api", "api.example.com.", "10.0.0.1"));
        provider.apply(&a_record("api", "api.example.com.", "10.0.0.2"));

        assert_eq!(served(&provider), vec!["api.example.com.\t3600\tIN\tA\t10.0.0.2"]);
    }

    #[test]
    fn test_apply_unchanged_does_not_bump_serial() {
        let provider = provider();
        let record = a_record("api", "api.example.com.", "10.0.0.1");
        provider.apply(&record);
        let serial = provider.store().serial();
        provider.apply(&record);
        assert_eq!(provider.store().serial(), serial);
    }

    #[test]
    fn test_inactive_record_is_withdrawn() {
        let provider = provider();
        let mut record = a_record("api", "api.example.com.", "10.0.0.1");
        provider.apply(&record);

        record.spec.active = Some(false);
        provider.apply(&record);
        assert!(served(&provider).is_empty());
        assert!(provider.store().zones().is_empty());
    }

    #[test]
    fn test_terminating_record_is_withdrawn() {
        let provider = provider();
        let record = a_record("api", "api.example.com.", "10.0.0.1");
        provider.apply(&record);
        provider.apply(&deleting(record));
        assert!(served(&provider).is_empty());
    }

    #[test]
    fn test_invalid_record_is_skipped() {
        let provider = provider();
        provider.apply(&a_record("bad", "bad.example.com.", "not-an-ip"));
        assert!(served(&provider).is_empty());
    }

    #[test]
    fn test_shared_record_survives_until_last_owner_is_removed() {
        let provider = provider();
        let first = a_record("one", "api.example.com.", "10.0.0.1");
        let second = a_record("two", "api.example.com.", "10.0.0.1");
        provider.apply(&first);
        provider.apply(&second);

        provider.remove(&first);
        assert_eq!(served(&provider).len(), 1);

        provider.remove(&second);
        assert!(served(&provider).is_empty());
    }

    #[test]
    fn test_shared_record_survives_update_of_one_owner() {
        let provider = provider();
        let first = a_record("one", "api.example.com.", "10.0.0.1");
        provider.apply(&first);
        provider.apply(&a_record("two", "api.example.com.", "10.0.0.1"));
        provider.apply(&a_record("one", "api.example.com.", "10.0.0.9"));

        assert_eq!(
            served(&provider),
            vec![
                "api.example.com.\t3600\tIN\tA\t10.0.0.1",
                "api.example.com.\t3600\tIN\tA\t10.0.0.9",
            ]
        );
    }

    #[test]
    fn test_remove_unknown_object_is_noop() {
        let provider = provider();
        provider.apply(&a_record("api", "api.example.com.", "10.0.0.1"));
        provider.remove(&a_record("other", "other.example.com.", "10.0.0.2"));
        assert_eq!(served(&provider).len(), 1);
    }

    #[test]
    fn test_resync_replaces_state() {
        let provider = provider();
        provider.apply(&a_record("stale", "stale.example.com.", "10.0.0.1"));

        let mut inactive = a_record("off", "off.example.org.", "10.0.0.3");
        inactive.spec.active = Some(false);
        let listed = vec![a_record("api", "api.example.org.", "10.0.0.2"), inactive];
        provider.resync(&listed);

        assert_eq!(served(&provider), vec!["api.example.org.\t3600\tIN\tA\t10.0.0.2"]);
        assert_eq!(provider.store().zones().names(), ["example.org.".to_string()]);

        // Ownership is rebuilt too: removing the listed object withdraws it.
        provider.remove(&listed[0]);
        assert!(served(&provider).is_empty());
    }

    #[tokio::test]
    async fn test_reconcile_claims_unowned_record() {
        let provider = provider();
        let mut record = a_record("api", "api.example.com.", "10.0.0.1");

        let outcome = provider.reconcile(&mut record).await.unwrap();
        assert_eq!(outcome, ProviderOutcome::handled());
        assert_eq!(record.owner_provider(), EMBEDDED_PROVIDER_NAME);
    }

    #[tokio::test]
    async fn test_reconcile_skips_foreign_record() {
        let provider = provider();
        let mut record = a_record("api", "api.example.com.", "10.0.0.1");
        record.status = Some(DNSRecordStatus {
            provider: "hetzner".into(),
            id: "abc".into(),
            ..Default::default()
        });

        let outcome = provider.reconcile(&mut record).await.unwrap();
        assert_eq!(outcome, ProviderOutcome::skipped());
        assert_eq!(record.owner_provider(), "hetzner");
    }

    #[tokio::test]
    async fn test_reconcile_releases_terminating_record() {
        let provider = provider();
        let mut record = deleting(a_record("api", "api.example.com.", "10.0.0.1"));
        record.status_mut().provider = EMBEDDED_PROVIDER_NAME.into();

        let outcome = provider.reconcile(&mut record).await.unwrap();
        assert!(outcome.handled);
        assert_eq!(record.owner_provider(), "");
    }
}
