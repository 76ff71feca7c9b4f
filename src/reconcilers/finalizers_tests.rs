// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `finalizers.rs`

#[cfg(test)]
mod tests {
    use crate::crd::{DNSRecord, DNSRecordSpec};
    use crate::reconcilers::finalizers::{has_finalizer, with_finalizer, without_finalizer};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    const TEST_FINALIZER: &str = "dns.linka.cloud/finalizer";

    fn record_with(finalizers: Option<Vec<&str>>) -> DNSRecord {
        let mut record = DNSRecord::new("test-record", DNSRecordSpec::default());
        record.metadata = ObjectMeta {
            name: Some("test-record".into()),
            namespace: Some("test-namespace".into()),
            finalizers: finalizers.map(|f| f.into_iter().map(String::from).collect()),
            ..Default::default()
        };
        record
    }

    #[test]
    fn test_has_finalizer() {
        assert!(!has_finalizer(&record_with(None), TEST_FINALIZER));
        assert!(!has_finalizer(&record_with(Some(vec!["other"])), TEST_FINALIZER));
        assert!(has_finalizer(
            &record_with(Some(vec!["other", TEST_FINALIZER])),
            TEST_FINALIZER
        ));
    }

    #[test]
    fn test_with_finalizer_appends_once() {
        let record = record_with(Some(vec!["other"]));
        assert_eq!(
            with_finalizer(&record, TEST_FINALIZER),
            Some(vec!["other".to_string(), TEST_FINALIZER.to_string()])
        );

        let record = record_with(Some(vec![TEST_FINALIZER]));
        assert_eq!(with_finalizer(&record, TEST_FINALIZER), None);
    }

    #[test]
    fn test_with_finalizer_on_empty_list() {
        assert_eq!(
            with_finalizer(&record_with(None), TEST_FINALIZER),
            Some(vec![TEST_FINALIZER.to_string()])
        );
    }

    #[test]
    fn test_without_finalizer_keeps_others() {
        let record = record_with(Some(vec!["a", TEST_FINALIZER, "b"]));
        assert_eq!(
            without_finalizer(&record, TEST_FINALIZER),
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(without_finalizer(&record_with(None), TEST_FINALIZER), None);
    }
}
