// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `main.rs` - health endpoints and signal handling

#[cfg(test)]
mod tests {
    use super::super::{leader_identity, metrics_router};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration as StdDuration;
    use tokio::net::TcpListener;
    use tokio::time::timeout;

    async fn serve(ready: Arc<AtomicBool>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, metrics_router(ready)).await });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_readiness_follows_startup() {
        let ready = Arc::new(AtomicBool::new(false));
        let base = serve(ready.clone()).await;

        let starting = reqwest::get(format!("{base}/readyz")).await.unwrap();
        assert_eq!(starting.status(), 503);

        ready.store(true, Ordering::SeqCst);
        let started = reqwest::get(format!("{base}/readyz")).await.unwrap();
        assert_eq!(started.status(), 200);

        let health = reqwest::get(format!("{base}/healthz")).await.unwrap();
        assert_eq!(health.status(), 200);
        assert_eq!(health.text().await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_metrics_endpoint_exports_registry() {
        k8s_dns::metrics::record_zone_count(2);
        let base = serve(Arc::new(AtomicBool::new(true))).await;

        let response = reqwest::get(format!("{base}/metrics")).await.unwrap();
        assert_eq!(response.status(), 200);
        assert!(response.text().await.unwrap().contains("dns_linka_cloud_zones"));
    }

    #[test]
    fn test_leader_identity_is_never_empty() {
        assert!(!leader_identity().is_empty());
    }

    /// Test that SIGTERM signal handler can be created on Unix platforms
    #[tokio::test]
    #[cfg(unix)]
    async fn test_sigterm_signal_handler_creation() {
        use tokio::signal::unix::{signal, SignalKind};

        let result = signal(SignalKind::terminate());
        assert!(result.is_ok(), "Should be able to create SIGTERM signal handler");
    }

    #[tokio::test]
    async fn test_shutdown_signal_waits() {
        let result = timeout(StdDuration::from_millis(100), super::super::shutdown_signal()).await;
        assert!(result.is_err(), "shutdown should wait for a signal");
    }
}
