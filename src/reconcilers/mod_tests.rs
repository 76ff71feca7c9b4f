// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod tests {
    use crate::constants::{ERROR_REQUEUE_DURATION_SECS, STATUS_REQUEUE_DURATION_MILLIS};
    use crate::errors::{ProviderError, RecordError};
    use crate::reconcilers::{error_category, error_policy, Outcome, ReconcileError};
    use kube::runtime::controller::Action;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_outcome_actions() {
        assert_eq!(Outcome::Done.into_action(), Action::await_change());
        assert_eq!(
            Outcome::Requeue.into_action(),
            Action::requeue(Duration::from_millis(STATUS_REQUEUE_DURATION_MILLIS))
        );
        assert_eq!(
            Outcome::RequeueAfter(Duration::from_secs(7)).into_action(),
            Action::requeue(Duration::from_secs(7))
        );
    }

    #[test]
    fn test_error_policy_requeues() {
        let err = ReconcileError::from(anyhow::anyhow!("boom"));
        let action = error_policy(Arc::new("default/api".to_string()), &err, Arc::new(()));
        assert_eq!(action, Action::requeue(Duration::from_secs(ERROR_REQUEUE_DURATION_SECS)));
    }

    #[test]
    fn test_reconcile_error_is_transparent() {
        let err = ReconcileError::from(anyhow::anyhow!("provider unreachable"));
        assert_eq!(err.to_string(), "provider unreachable");
    }

    #[test]
    fn test_error_category() {
        let provider = anyhow::Error::new(ProviderError::Api {
            provider: "hetzner".into(),
            status: 500,
            body: String::new(),
        });
        assert_eq!(error_category(&provider), "api_error");

        let record = anyhow::Error::new(RecordError::InvalidSpec("no record variant set".into()));
        assert_eq!(error_category(&record), "invalid_spec");

        assert_eq!(error_category(&anyhow::anyhow!("other")), "reconcile");
    }
}
