// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod tests {
    use crate::reconcilers::locks::KeyLocks;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_same_key_shares_mutex() {
        let locks = KeyLocks::new();
        let a = locks.get("default", "api");
        let b = locks.get("default", "api");
        let c = locks.get("other", "api");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(locks.len(), 2);
    }

    #[test]
    fn test_prune_skips_referenced_entries() {
        let locks = KeyLocks::new();
        let held = locks.get("default", "api");
        assert!(!locks.prune("default", "api"));
        assert_eq!(locks.len(), 1);

        drop(held);
        assert!(locks.prune("default", "api"));
        assert!(locks.is_empty());
        assert!(!locks.prune("default", "missing"));
    }

    #[tokio::test]
    async fn test_same_key_is_serialized() {
        let locks = Arc::new(KeyLocks::new());
        let lock = locks.get("default", "api");
        let guard = lock.lock().await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let lock = locks.get("default", "api");
                let _guard = lock.lock().await;
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_block() {
        let locks = KeyLocks::new();
        let first = locks.get("default", "a");
        let _held = first.lock().await;
        let second = locks.get("default", "b");
        assert!(second.try_lock().is_ok());
    }
}
