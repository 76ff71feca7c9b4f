// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Finalizer management for namespaced resources.
//!
//! Finalizers are added and removed with JSON merge patches of `metadata.finalizers`,
//! leaving the rest of the object untouched.
//!
//! # Example
//!
//! ```rust,no_run
//! use k8s_dns::crd::DNSRecord;
//! use k8s_dns::labels::FINALIZER_DNS_RECORD;
//! use k8s_dns::reconcilers::finalizers::{ensure_finalizer, has_finalizer};
//! use kube::Client;
//!
//! async fn example(client: Client, record: DNSRecord) -> anyhow::Result<()> {
//!     if !has_finalizer(&record, FINALIZER_DNS_RECORD) {
//!         ensure_finalizer(&client, &record, FINALIZER_DNS_RECORD).await?;
//!     }
//!     Ok(())
//! }
//! ```

use anyhow::{Context as _, Result};
use kube::api::{Patch, PatchParams};
use kube::core::NamespaceResourceScope;
use kube::{Api, Client, Resource, ResourceExt};
use serde_json::json;
use tracing::info;

/// Whether `resource` carries `finalizer`.
#[must_use]
pub fn has_finalizer<T: Resource>(resource: &T, finalizer: &str) -> bool {
    resource
        .meta()
        .finalizers
        .as_ref()
        .is_some_and(|f| f.iter().any(|x| x == finalizer))
}

/// Finalizer list of `resource` with `finalizer` appended, `None` when already present.
#[must_use]
pub fn with_finalizer<T: Resource>(resource: &T, finalizer: &str) -> Option<Vec<String>> {
    if has_finalizer(resource, finalizer) {
        return None;
    }
    let mut finalizers = resource.meta().finalizers.clone().unwrap_or_default();
    finalizers.push(finalizer.to_string());
    Some(finalizers)
}

/// Finalizer list of `resource` without `finalizer`, `None` when absent.
#[must_use]
pub fn without_finalizer<T: Resource>(resource: &T, finalizer: &str) -> Option<Vec<String>> {
    if !has_finalizer(resource, finalizer) {
        return None;
    }
    let mut finalizers = resource.meta().finalizers.clone().unwrap_or_default();
    finalizers.retain(|f| f != finalizer);
    Some(finalizers)
}

/// Add a finalizer to a resource if not already present.
///
/// # Errors
///
/// Returns an error if the API patch operation fails.
pub async fn ensure_finalizer<T>(client: &Client, resource: &T, finalizer: &str) -> Result<()>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    let Some(finalizers) = with_finalizer(resource, finalizer) else {
        return Ok(());
    };
    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();

    let api: Api<T> = Api::namespaced(client.clone(), &namespace);
    let patch = json!({ "metadata": { "finalizers": finalizers } });
    api.patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
        .await
        .with_context(|| format!("adding finalizer to {} {namespace}/{name}", T::kind(&())))?;

    info!(
        namespace = %namespace,
        name = %name,
        finalizer = %finalizer,
        "Added finalizer to {}",
        T::kind(&())
    );
    Ok(())
}

/// Remove a finalizer from a resource.
///
/// # Errors
///
/// Returns an error if the API patch operation fails.
pub async fn remove_finalizer<T>(client: &Client, resource: &T, finalizer: &str) -> Result<()>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    let Some(finalizers) = without_finalizer(resource, finalizer) else {
        return Ok(());
    };
    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();

    let api: Api<T> = Api::namespaced(client.clone(), &namespace);
    let patch = json!({ "metadata": { "finalizers": finalizers } });
    api.patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
        .await
        .with_context(|| format!("removing finalizer from {} {namespace}/{name}", T::kind(&())))?;

    info!(
        namespace = %namespace,
        name = %name,
        finalizer = %finalizer,
        "Removed finalizer from {}",
        T::kind(&())
    );
    Ok(())
}

#[cfg(test)]
#[path = "finalizers_tests.rs"]
mod finalizers_tests;
