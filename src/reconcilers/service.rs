// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Service derivation controller.
//!
//! A `LoadBalancer` Service annotated with `dns.linka.cloud/hostname` owns one A
//! record per load-balancer IP. Without a usable hostname its records are removed.

use super::children::{child_record, lb_ips, parse_ttl, reconcile_children, ChildParent};
use super::{error_policy, ReconcileError};
use crate::constants::KIND_SERVICE;
use crate::context::Context;
use crate::crd::DNSRecord;
use crate::domain::has_registrable_domain;
use crate::labels::{ANNOTATION_HOSTNAME, ANNOTATION_IGNORE, ANNOTATION_SERVICE};
use crate::metrics;
use anyhow::Result;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Service;
use kube::runtime::controller::{Action, Config as ControllerConfig};
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::Controller;
use kube::{Api, ResourceExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Child name infix for Service records.
pub const SERVICE_INFIX: &str = "svc";

const LOAD_BALANCER: &str = "LoadBalancer";

/// Parent descriptor of `service`, `None` until it has a namespace and uid.
#[must_use]
pub fn service_parent(service: &Service) -> Option<ChildParent> {
    ChildParent::from_resource(service, KIND_SERVICE, ANNOTATION_SERVICE, SERVICE_INFIX)
}

/// Hostname to publish for `service`, `None` when it must not own records.
#[must_use]
pub fn service_hostname(service: &Service) -> Option<&str> {
    if service.metadata.deletion_timestamp.is_some() || service.annotations().contains_key(ANNOTATION_IGNORE) {
        return None;
    }
    let is_lb = service
        .spec
        .as_ref()
        .and_then(|spec| spec.type_.as_deref())
        == Some(LOAD_BALANCER);
    if !is_lb {
        return None;
    }
    service
        .annotations()
        .get(ANNOTATION_HOSTNAME)
        .map(|h| h.trim())
        .filter(|h| has_registrable_domain(h))
}

/// Records `service` should own.
#[must_use]
pub fn desired_service_records(service: &Service, parent: &ChildParent) -> Vec<DNSRecord> {
    let Some(host) = service_hostname(service) else {
        return Vec::new();
    };
    let ips = lb_ips(
        service
            .status
            .iter()
            .filter_map(|s| s.load_balancer.as_ref())
            .filter_map(|lb| lb.ingress.as_ref())
            .flatten()
            .map(|lb| lb.ip.as_deref()),
    );
    let ttl = parse_ttl(service.annotations(), &parent.name);

    ips.iter()
        .enumerate()
        .map(|(idx, ip)| child_record(parent, host, idx, ip, ttl))
        .collect()
}

/// Run the Service controller until its stream ends.
///
/// # Errors
///
/// Never fails once started; reconciliation errors are handled by the error policy.
pub async fn run_service_controller(ctx: Arc<Context>) -> Result<()> {
    info!(workers = ctx.workers, "Starting Service controller");

    let services = Api::<Service>::all(ctx.client.clone());
    let records = Api::<DNSRecord>::all(ctx.client.clone());
    Controller::new(services, WatcherConfig::default())
        .owns(records, WatcherConfig::default())
        .with_config(ControllerConfig::default().concurrency(ctx.workers))
        .run(reconcile_service, error_policy, ctx)
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

async fn reconcile_service(service: Arc<Service>, ctx: Arc<Context>) -> Result<Action, ReconcileError> {
    let start = Instant::now();
    let Some(parent) = service_parent(&service) else {
        warn!(name = %service.name_any(), "Service has no namespace or uid, skipping");
        return Ok(Action::await_change());
    };

    let desired = desired_service_records(&service, &parent);
    debug!(
        namespace = %parent.namespace,
        name = %parent.name,
        records = desired.len(),
        "Reconciling Service records"
    );

    match reconcile_children(&ctx.client, &parent, desired).await {
        Ok(()) => {
            metrics::record_reconciliation_success(KIND_SERVICE, start.elapsed());
            Ok(Action::await_change())
        }
        Err(e) => {
            metrics::record_reconciliation_error(KIND_SERVICE, start.elapsed());
            metrics::record_error(KIND_SERVICE, super::error_category(&e));
            Err(e.into())
        }
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod service_tests;
