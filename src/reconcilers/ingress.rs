// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Ingress derivation controller.
//!
//! Every `(rule host, load-balancer IP)` pair of an Ingress becomes an owned
//! `DNSRecord` with an A variant. Ingresses being deleted or carrying
//! `dns.linka.cloud/ignore` keep no records.

use super::children::{child_record, lb_ips, parse_ttl, reconcile_children, ChildParent};
use super::{error_policy, ReconcileError};
use crate::constants::KIND_INGRESS;
use crate::context::Context;
use crate::crd::DNSRecord;
use crate::labels::{ANNOTATION_IGNORE, ANNOTATION_INGRESS};
use crate::metrics;
use anyhow::Result;
use futures::StreamExt;
use k8s_openapi::api::networking::v1::Ingress;
use kube::runtime::controller::{Action, Config as ControllerConfig};
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::Controller;
use kube::{Api, ResourceExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Child name infix for Ingress records.
pub const INGRESS_INFIX: &str = "ing";

/// Parent descriptor of `ingress`, `None` until it has a namespace and uid.
#[must_use]
pub fn ingress_parent(ingress: &Ingress) -> Option<ChildParent> {
    ChildParent::from_resource(ingress, KIND_INGRESS, ANNOTATION_INGRESS, INGRESS_INFIX)
}

/// Records `ingress` should own.
#[must_use]
pub fn desired_ingress_records(ingress: &Ingress, parent: &ChildParent) -> Vec<DNSRecord> {
    if ingress.metadata.deletion_timestamp.is_some() || ingress.annotations().contains_key(ANNOTATION_IGNORE) {
        return Vec::new();
    }

    let ips = lb_ips(
        ingress
            .status
            .iter()
            .filter_map(|s| s.load_balancer.as_ref())
            .filter_map(|lb| lb.ingress.as_ref())
            .flatten()
            .map(|lb| lb.ip.as_deref()),
    );
    let ttl = parse_ttl(ingress.annotations(), &parent.name);

    let hosts = ingress
        .spec
        .iter()
        .filter_map(|spec| spec.rules.as_ref())
        .flatten()
        .filter_map(|rule| rule.host.as_deref())
        .filter(|host| !host.is_empty());

    let mut records = Vec::new();
    for host in hosts {
        for (idx, ip) in ips.iter().enumerate() {
            records.push(child_record(parent, host, idx, ip, ttl));
        }
    }
    records
}

/// Run the Ingress controller until its stream ends.
///
/// # Errors
///
/// Never fails once started; reconciliation errors are handled by the error policy.
pub async fn run_ingress_controller(ctx: Arc<Context>) -> Result<()> {
    info!(workers = ctx.workers, "Starting Ingress controller");

    let ingresses = Api::<Ingress>::all(ctx.client.clone());
    let records = Api::<DNSRecord>::all(ctx.client.clone());
    Controller::new(ingresses, WatcherConfig::default())
        .owns(records, WatcherConfig::default())
        .with_config(ControllerConfig::default().concurrency(ctx.workers))
        .run(reconcile_ingress, error_policy, ctx)
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

async fn reconcile_ingress(ingress: Arc<Ingress>, ctx: Arc<Context>) -> Result<Action, ReconcileError> {
    let start = Instant::now();
    let Some(parent) = ingress_parent(&ingress) else {
        warn!(name = %ingress.name_any(), "Ingress has no namespace or uid, skipping");
        return Ok(Action::await_change());
    };

    let desired = desired_ingress_records(&ingress, &parent);
    debug!(
        namespace = %parent.namespace,
        name = %parent.name,
        records = desired.len(),
        "Reconciling Ingress records"
    );

    match reconcile_children(&ctx.client, &parent, desired).await {
        Ok(()) => {
            metrics::record_reconciliation_success(KIND_INGRESS, start.elapsed());
            Ok(Action::await_change())
        }
        Err(e) => {
            metrics::record_reconciliation_error(KIND_INGRESS, start.elapsed());
            metrics::record_error(KIND_INGRESS, super::error_category(&e));
            Err(e.into())
        }
    }
}

#[cfg(test)]
#[path = "ingress_tests.rs"]
mod ingress_tests;
