// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Child `DNSRecord` reconciliation shared by the Ingress and Service controllers.
//!
//! A parent object (Ingress or Service) owns a set of `DNSRecord`s through a
//! controller owner reference. Each pass:
//!
//! 1. lists every `DNSRecord` in the parent namespace
//! 2. selects the owned ones, re-attaching records that lost their owner reference but
//!    still carry the reclaim annotation naming the parent
//! 3. diffs them against the desired set by object name
//! 4. deletes, then creates, then replaces
//!
//! The pure pieces ([`select_children`], [`diff_records`], [`child_record`]) carry the
//! semantics and are tested without a cluster.

use crate::admission::apply_spec_defaults;
use crate::constants::DEFAULT_RECORD_TTL_SECS;
use crate::crd::{ARecord, DNSRecord, DNSRecordSpec};
use crate::domain::fqdn;
use crate::labels::ANNOTATION_TTL;
use crate::metrics;
use anyhow::{anyhow, Context as _, Result};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::api::{DeleteParams, ListParams, Patch, PatchParams, PostParams};
use kube::{Api, Client, Resource, ResourceExt};
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, error, info};

/// The object owning a set of derived records.
#[derive(Clone, Debug)]
pub struct ChildParent {
    /// Parent kind, used for logs and metrics
    pub kind: &'static str,
    pub name: String,
    pub namespace: String,
    pub uid: String,
    /// Controller owner reference stamped on every child
    pub owner_ref: OwnerReference,
    /// Reclaim annotation key (`dns.linka.cloud/ingress` or `dns.linka.cloud/service`)
    pub annotation: &'static str,
    /// Infix of child names (`ing` or `svc`)
    pub infix: &'static str,
}

impl ChildParent {
    /// Build the parent descriptor, `None` when the object has no namespace or uid yet.
    pub fn from_resource<K>(
        obj: &K,
        kind: &'static str,
        annotation: &'static str,
        infix: &'static str,
    ) -> Option<Self>
    where
        K: Resource<DynamicType = ()>,
    {
        Some(Self {
            kind,
            name: obj.meta().name.clone()?,
            namespace: obj.meta().namespace.clone()?,
            uid: obj.meta().uid.clone()?,
            owner_ref: obj.controller_owner_ref(&())?,
            annotation,
            infix,
        })
    }

    /// Name of the child for `host` and load-balancer address index `idx`.
    #[must_use]
    pub fn child_name(&self, host: &str, idx: usize) -> String {
        format!("{}-{}-{}-{idx}", self.name, self.infix, normalize_host(host))
    }
}

/// Object-name fragment for a host: lowercase, no trailing dot, `.` as `-`, `*` as `wildcard`.
#[must_use]
pub fn normalize_host(host: &str) -> String {
    host.trim_end_matches('.')
        .to_lowercase()
        .replace('.', "-")
        .replace('*', "wildcard")
}

/// TTL from the `dns.linka.cloud/ttl` annotation, 3600 when absent or invalid.
#[must_use]
pub fn parse_ttl(annotations: &BTreeMap<String, String>, parent: &str) -> u32 {
    let Some(value) = annotations.get(ANNOTATION_TTL) else {
        return DEFAULT_RECORD_TTL_SECS;
    };
    match value.trim().parse::<u32>() {
        Ok(ttl) => ttl,
        Err(e) => {
            error!(parent = %parent, value = %value, error = %e, "Invalid TTL annotation, using default");
            DEFAULT_RECORD_TTL_SECS
        }
    }
}

/// IP addresses of a load-balancer status, hostnames skipped.
pub fn lb_ips<'a>(ips: impl IntoIterator<Item = Option<&'a str>>) -> Vec<String> {
    ips.into_iter()
        .flatten()
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
        .collect()
}

/// Desired child record for `host` pointing at `ip`.
#[must_use]
pub fn child_record(parent: &ChildParent, host: &str, idx: usize, ip: &str, ttl: u32) -> DNSRecord {
    let mut spec = DNSRecordSpec {
        a: Some(ARecord {
            name: fqdn(host),
            ttl,
            target: ip.to_string(),
            ..Default::default()
        }),
        ..Default::default()
    };
    apply_spec_defaults(&mut spec);

    let mut record = DNSRecord::new(&parent.child_name(host, idx), spec);
    record.metadata.namespace = Some(parent.namespace.clone());
    record.metadata.annotations = Some(BTreeMap::from([(
        parent.annotation.to_string(),
        parent.name.clone(),
    )]));
    record.metadata.owner_references = Some(vec![parent.owner_ref.clone()]);
    record
}

fn is_owned_by(record: &DNSRecord, uid: &str) -> bool {
    record.owner_references().iter().any(|r| r.uid == uid)
}

fn has_controller(record: &DNSRecord) -> bool {
    record
        .owner_references()
        .iter()
        .any(|r| r.controller == Some(true))
}

/// Records of `parent` split into `(owned, reclaimable)`.
///
/// Reclaimable records carry the reclaim annotation naming the parent but no
/// controller reference, as after a backup restore.
#[must_use]
pub fn select_children(parent: &ChildParent, records: Vec<DNSRecord>) -> (Vec<DNSRecord>, Vec<DNSRecord>) {
    let mut owned = Vec::new();
    let mut reclaim = Vec::new();
    for record in records {
        if is_owned_by(&record, &parent.uid) {
            owned.push(record);
        } else if record.annotations().get(parent.annotation) == Some(&parent.name)
            && !has_controller(&record)
        {
            reclaim.push(record);
        }
    }
    (owned, reclaim)
}

/// Changes turning `existing` into `desired`.
#[derive(Debug, Default)]
pub struct ChildDiff {
    pub create: Vec<DNSRecord>,
    /// Desired objects carrying the existing `resourceVersion`
    pub update: Vec<DNSRecord>,
    /// Names to delete
    pub delete: Vec<String>,
}

impl ChildDiff {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.update.is_empty() && self.delete.is_empty()
    }
}

/// Name-based diff; an update fires only when spec, annotations or owner references differ.
#[must_use]
pub fn diff_records(desired: Vec<DNSRecord>, existing: &[DNSRecord]) -> ChildDiff {
    let current: HashMap<String, &DNSRecord> = existing.iter().map(|r| (r.name_any(), r)).collect();
    let wanted: Vec<String> = desired.iter().map(ResourceExt::name_any).collect();

    let mut diff = ChildDiff::default();
    for mut record in desired {
        match current.get(&record.name_any()) {
            None => diff.create.push(record),
            Some(old) => {
                let changed = old.spec != record.spec
                    || old.annotations() != record.annotations()
                    || old.owner_references() != record.owner_references();
                if changed {
                    record.metadata.resource_version.clone_from(&old.metadata.resource_version);
                    diff.update.push(record);
                }
            }
        }
    }
    diff.delete = existing
        .iter()
        .map(ResourceExt::name_any)
        .filter(|name| !wanted.contains(name))
        .collect();
    diff
}

/// Bring the children of `parent` to `desired`.
///
/// # Errors
///
/// Returns the first failing list, patch, create or replace call; NotFound on delete is ignored.
pub async fn reconcile_children(client: &Client, parent: &ChildParent, desired: Vec<DNSRecord>) -> Result<()> {
    let api: Api<DNSRecord> = Api::namespaced(client.clone(), &parent.namespace);
    let listed = api
        .list(&ListParams::default())
        .await
        .with_context(|| format!("listing DNSRecords in {}", parent.namespace))?;

    let (mut owned, reclaim) = select_children(parent, listed.items);
    for record in reclaim {
        owned.push(reclaim_record(&api, parent, &record).await?);
    }

    let diff = diff_records(desired, &owned);
    if diff.is_empty() {
        debug!(kind = parent.kind, namespace = %parent.namespace, name = %parent.name, "Child records up to date");
        return Ok(());
    }

    for name in &diff.delete {
        match api.delete(name, &DeleteParams::default()).await {
            Ok(_) => {
                info!(kind = parent.kind, namespace = %parent.namespace, parent = %parent.name, record = %name, "Deleted child DNSRecord");
                metrics::record_child_record(parent.kind, "delete");
            }
            Err(kube::Error::Api(ae)) if ae.code == 404 => {}
            Err(e) => {
                return Err(anyhow!(e).context(format!("deleting DNSRecord {}/{name}", parent.namespace)));
            }
        }
    }

    for record in &diff.create {
        let name = record.name_any();
        api.create(&PostParams::default(), record)
            .await
            .with_context(|| format!("creating DNSRecord {}/{name}", parent.namespace))?;
        info!(kind = parent.kind, namespace = %parent.namespace, parent = %parent.name, record = %name, "Created child DNSRecord");
        metrics::record_child_record(parent.kind, "create");
    }

    for record in &diff.update {
        let name = record.name_any();
        api.replace(&name, &PostParams::default(), record)
            .await
            .with_context(|| format!("updating DNSRecord {}/{name}", parent.namespace))?;
        info!(kind = parent.kind, namespace = %parent.namespace, parent = %parent.name, record = %name, "Updated child DNSRecord");
        metrics::record_child_record(parent.kind, "update");
    }

    Ok(())
}

async fn reclaim_record(api: &Api<DNSRecord>, parent: &ChildParent, record: &DNSRecord) -> Result<DNSRecord> {
    let name = record.name_any();
    let mut refs = record.owner_references().to_vec();
    refs.push(parent.owner_ref.clone());
    let patch = json!({
        "metadata": {
            "resourceVersion": record.resource_version(),
            "ownerReferences": refs,
        }
    });
    let patched = api
        .patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
        .await
        .with_context(|| format!("reclaiming DNSRecord {}/{name}", parent.namespace))?;
    info!(kind = parent.kind, namespace = %parent.namespace, parent = %parent.name, record = %name, "Reclaimed child DNSRecord");
    metrics::record_child_record(parent.kind, "reclaim");
    Ok(patched)
}

#[cfg(test)]
#[path = "children_tests.rs"]
mod children_tests;
