// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

// Common test utilities for integration tests

#![allow(dead_code)]

use k8s_dns::crd::DNSRecord;
use kube::{
    api::{Api, DeleteParams, PostParams},
    client::Client,
};
use serde_json::json;
use std::time::Duration;
use tokio::time::sleep;

/// Get a Kubernetes client or skip the test if not in a cluster
pub async fn get_kube_client_or_skip() -> Option<Client> {
    match Client::try_default().await {
        Ok(client) => Some(client),
        Err(e) => {
            eprintln!("Skipping integration test: not running in Kubernetes cluster: {e}");
            None
        }
    }
}

/// Create a test namespace
pub async fn create_test_namespace(
    client: &Client,
    name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let namespaces: Api<k8s_openapi::api::core::v1::Namespace> = Api::all(client.clone());

    let ns = serde_json::from_value(json!({
        "apiVersion": "v1",
        "kind": "Namespace",
        "metadata": {
            "name": name,
            "labels": {
                "test": "integration",
                "managed-by": "k8s-dns-test"
            }
        }
    }))?;

    match namespaces.create(&PostParams::default(), &ns).await {
        Ok(_) => {
            println!("Created test namespace: {name}");
            Ok(())
        }
        Err(kube::Error::Api(ae)) if ae.code == 409 => {
            println!("Test namespace already exists: {name}");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

/// Cleanup test namespace
pub async fn cleanup_test_namespace(
    client: &Client,
    name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let namespaces: Api<k8s_openapi::api::core::v1::Namespace> = Api::all(client.clone());

    match namespaces.delete(name, &DeleteParams::default()).await {
        Ok(_) => {
            println!("Deleted test namespace: {name}");
            Ok(())
        }
        Err(kube::Error::Api(ae)) if ae.code == 404 => {
            println!("Test namespace already deleted: {name}");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

/// Poll `name` until `status.active` equals `active`, or give up after `timeout`.
pub async fn wait_for_active(
    api: &Api<DNSRecord>,
    name: &str,
    active: bool,
    timeout: Duration,
) -> Result<DNSRecord, Box<dyn std::error::Error>> {
    let step = Duration::from_millis(500);
    let mut waited = Duration::ZERO;
    loop {
        let record = api.get(name).await?;
        if record.status.as_ref().and_then(|s| s.active) == Some(active) {
            return Ok(record);
        }
        if waited >= timeout {
            return Err(format!("DNSRecord {name} did not reach active={active} in {timeout:?}").into());
        }
        sleep(step).await;
        waited += step;
    }
}

/// Poll until `name` no longer exists, or give up after `timeout`.
pub async fn wait_for_deleted<K>(
    api: &Api<K>,
    name: &str,
    timeout: Duration,
) -> Result<(), Box<dyn std::error::Error>>
where
    K: kube::Resource + Clone + serde::de::DeserializeOwned + std::fmt::Debug,
{
    let step = Duration::from_millis(500);
    let mut waited = Duration::ZERO;
    loop {
        if api.get_opt(name).await?.is_none() {
            return Ok(());
        }
        if waited >= timeout {
            return Err(format!("{name} still exists after {timeout:?}").into());
        }
        sleep(step).await;
        waited += step;
    }
}
