// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod tests {
    use crate::constants::{API_GROUP, API_VERSION, KIND_DNS_RECORD};
    use crate::crd::*;
    use kube::CustomResourceExt;
    use serde_json::json;

    #[test]
    fn test_spec_deserializes_variant_keys() {
        let spec: DNSRecordSpec = serde_json::from_value(json!({
            "active": false,
            "srv": {
                "name": "_sip._tcp.example.com.",
                "port": 5060,
                "target": "sip.example.com."
            }
        }))
        .unwrap();

        assert_eq!(spec.active, Some(false));
        let srv = spec.srv.unwrap();
        assert_eq!(srv.port, 5060);
        assert_eq!(srv.weight, 0);
        assert_eq!(srv.class, 0);
        assert!(spec.a.is_none());
    }

    #[test]
    fn test_spec_serialization_omits_unset_variants() {
        let spec = DNSRecordSpec {
            cname: Some(CNAMERecord {
                name: "www.example.com.".into(),
                class: 1,
                ttl: 300,
                target: "example.com.".into(),
            }),
            ..Default::default()
        };

        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(
            value,
            json!({
                "cname": {"name": "www.example.com.", "class": 1, "ttl": 300, "target": "example.com."}
            })
        );
    }

    #[test]
    fn test_status_serialization_omits_empty_fields() {
        let status = DNSRecordStatus {
            active: Some(true),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&status).unwrap(), json!({"active": true}));
    }

    #[test]
    fn test_is_active_defaults_to_true() {
        let mut record = DNSRecord::new("api", DNSRecordSpec::default());
        assert!(record.is_active());

        record.spec.active = Some(false);
        assert!(!record.is_active());
    }

    #[test]
    fn test_owner_provider_and_status_mut() {
        let mut record = DNSRecord::new("api", DNSRecordSpec::default());
        assert_eq!(record.owner_provider(), "");

        record.status_mut().provider = "hetzner".into();
        assert_eq!(record.owner_provider(), "hetzner");
    }

    #[test]
    fn test_variant_count() {
        let mut spec = DNSRecordSpec::default();
        assert_eq!(spec.variant_count(), 0);

        spec.raw = Some("   ".into());
        assert_eq!(spec.variant_count(), 0);

        spec.a = Some(ARecord::default());
        spec.raw = Some("example.com. 3600 IN A 10.0.0.1".into());
        assert_eq!(spec.variant_count(), 2);
    }

    #[test]
    fn test_crd_metadata() {
        let crd = DNSRecord::crd();
        assert_eq!(crd.spec.group, API_GROUP);
        assert_eq!(crd.spec.names.kind, KIND_DNS_RECORD);
        assert_eq!(crd.spec.names.plural, "dnsrecords");
        assert_eq!(
            crd.spec.names.short_names,
            Some(vec!["records".to_string(), "record".to_string(), "dns".to_string()])
        );
        assert_eq!(crd.spec.scope, "Namespaced");

        let version = &crd.spec.versions[0];
        assert_eq!(version.name, API_VERSION);
        let columns: Vec<_> = version
            .additional_printer_columns
            .as_ref()
            .unwrap()
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(columns, vec!["Active", "Record"]);
    }
}
