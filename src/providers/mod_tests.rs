// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod tests {
    use crate::crd::{DNSRecord, DNSRecordSpec, DNSRecordStatus};
    use crate::errors::ProviderError;
    use crate::providers::embedded::{EmbeddedProvider, EMBEDDED_PROVIDER_NAME};
    use crate::providers::{release, ProviderEnv, ProviderOutcome, Registry};
    use crate::zones::ZoneStore;
    use std::sync::Arc;

    #[test]
    fn test_env_get_ignores_blank_values() {
        let env = ProviderEnv::from_pairs([("A", "  value "), ("B", "   "), ("C", "")]);
        assert_eq!(env.get("A"), Some("value"));
        assert_eq!(env.get("B"), None);
        assert_eq!(env.get("C"), None);
        assert_eq!(env.get("D"), None);
    }

    #[test]
    fn test_env_require_names_provider_and_variable() {
        let env = ProviderEnv::default();
        let err = env.require("hetzner", "HETZNER_TOKEN").unwrap_err();
        match err {
            ProviderError::Config { provider, reason } => {
                assert_eq!(provider, "hetzner");
                assert!(reason.contains("HETZNER_TOKEN"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_registry_with_remote_providers_lists_sorted_names() {
        let registry = Registry::with_remote_providers();
        assert_eq!(registry.names(), vec!["hetzner", "ovh", "scaleway"]);
        assert!(registry.contains("ovh"));
        assert!(!registry.contains(EMBEDDED_PROVIDER_NAME));
    }

    #[test]
    fn test_registry_unknown_name_is_not_found() {
        let registry = Registry::with_remote_providers();
        let err = registry.build("route53", &ProviderEnv::default()).unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(name) if name == "route53"));
    }

    #[test]
    fn test_registry_build_reports_missing_credentials() {
        let registry = Registry::with_remote_providers();
        let err = registry.build("hetzner", &ProviderEnv::default()).unwrap_err();
        assert!(matches!(err, ProviderError::Config { .. }));
    }

    #[test]
    fn test_registry_build_with_credentials() {
        let registry = Registry::with_remote_providers();
        let env = ProviderEnv::from_pairs([("HETZNER_TOKEN", "secret")]);
        let provider = registry.build("hetzner", &env).unwrap();
        assert_eq!(provider.name(), "hetzner");
        assert!(format!("{provider:?}").contains("hetzner"));
    }

    #[test]
    fn test_registry_register_replaces_entry() {
        let mut registry = Registry::new();
        registry.register("coredns", |_| {
            Ok(Arc::new(EmbeddedProvider::new(Arc::new(ZoneStore::new(None)))))
        });
        registry.register("coredns", |_| Err(ProviderError::NotFound("replaced".into())));

        assert_eq!(registry.names(), vec!["coredns"]);
        let err = registry.build("coredns", &ProviderEnv::default()).unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(name) if name == "replaced"));
    }

    #[test]
    fn test_release_clears_ownership_only() {
        let mut record = DNSRecord::new("r", DNSRecordSpec::default());
        record.status = Some(DNSRecordStatus {
            record: "x".into(),
            active: Some(true),
            provider: "ovh".into(),
            id: "42".into(),
        });
        release(&mut record);

        let status = record.status.unwrap();
        assert!(status.provider.is_empty());
        assert!(status.id.is_empty());
        assert_eq!(status.record, "x");
        assert_eq!(status.active, Some(true));
    }

    #[test]
    fn test_outcome_constructors() {
        assert!(ProviderOutcome::handled().handled);
        assert!(!ProviderOutcome::skipped().handled);
        assert_eq!(ProviderOutcome::skipped().requeue_after, None);
    }
}
