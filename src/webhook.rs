// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Admission webhook for `DNSRecord` objects.
//!
//! Two endpoints speak `admission.k8s.io/v1` `AdmissionReview`, using the
//! `kube::core::admission` types:
//!
//! - [`WEBHOOK_MUTATE_PATH`] answers with a JSON patch replacing `/spec` with its
//!   defaulted form
//! - [`WEBHOOK_VALIDATE_PATH`] rejects invalid specs with field-scoped messages, and
//!   CNAME owner names shared with other records of the namespace
//!
//! The server speaks plain HTTP; TLS is terminated in front of it.

use crate::admission::{apply_defaults, format_errors, validate, validate_cname_coexistence};
use crate::constants::{WEBHOOK_MUTATE_PATH, WEBHOOK_VALIDATE_PATH};
use crate::crd::DNSRecord;
use anyhow::{Context as _, Result};
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use json_patch::jsonptr::PointerBuf;
use json_patch::{Patch, PatchOperation, ReplaceOperation};
use kube::api::ListParams;
use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview, Operation};
use kube::core::DynamicObject;
use kube::{Api, Client};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

/// Status code of a request whose object cannot be read.
const CODE_BAD_REQUEST: u16 = 400;
/// Status code of a well-formed but invalid object.
const CODE_UNPROCESSABLE: u16 = 422;

fn deny(
    request: &AdmissionRequest<DynamicObject>,
    code: u16,
    message: impl ToString,
) -> AdmissionResponse {
    let mut response = AdmissionResponse::from(request).deny(message);
    response.result.code = code;
    response
}

fn decode(request: &AdmissionRequest<DynamicObject>) -> Result<DNSRecord, String> {
    let object = request
        .object
        .as_ref()
        .ok_or_else(|| "request carries no object".to_string())?;
    let value = serde_json::to_value(object).map_err(|e| format!("cannot read object: {e}"))?;
    serde_json::from_value(value).map_err(|e| format!("cannot decode DNSRecord: {e}"))
}

/// Default the object of `request`.
#[must_use]
pub fn mutate(request: &AdmissionRequest<DynamicObject>) -> AdmissionResponse {
    if request.operation == Operation::Delete {
        return AdmissionResponse::from(request);
    }
    let mut record = match decode(request) {
        Ok(record) => record,
        Err(message) => return deny(request, CODE_BAD_REQUEST, message),
    };
    let before = record.spec.clone();
    apply_defaults(&mut record);
    if record.spec == before {
        return AdmissionResponse::from(request);
    }

    let value = match serde_json::to_value(&record.spec) {
        Ok(value) => value,
        Err(e) => return deny(request, CODE_BAD_REQUEST, format!("cannot encode spec: {e}")),
    };
    let patch = Patch(vec![PatchOperation::Replace(ReplaceOperation {
        path: PointerBuf::from_tokens(["spec"]),
        value,
    })]);
    match AdmissionResponse::from(request).with_patch(patch) {
        Ok(response) => response,
        Err(e) => deny(request, CODE_BAD_REQUEST, e),
    }
}

/// Validate the object of `request` against the field rules and its `siblings`.
#[must_use]
pub fn validate_request(
    request: &AdmissionRequest<DynamicObject>,
    siblings: &[DNSRecord],
) -> AdmissionResponse {
    if request.operation == Operation::Delete {
        return AdmissionResponse::from(request);
    }
    let mut record = match decode(request) {
        Ok(record) => record,
        Err(message) => return deny(request, CODE_BAD_REQUEST, message),
    };
    apply_defaults(&mut record);

    let mut errors = validate(&record).err().unwrap_or_default();
    if errors.is_empty() {
        errors = validate_cname_coexistence(&record, siblings)
            .err()
            .unwrap_or_default();
    }
    if errors.is_empty() {
        AdmissionResponse::from(request)
    } else {
        deny(request, CODE_UNPROCESSABLE, format_errors(&errors))
    }
}

#[derive(Clone)]
struct WebhookState {
    client: Option<Client>,
}

impl WebhookState {
    async fn siblings(&self, namespace: Option<&str>) -> Vec<DNSRecord> {
        let (Some(client), Some(namespace)) = (self.client.as_ref(), namespace) else {
            return Vec::new();
        };
        let api: Api<DNSRecord> = Api::namespaced(client.clone(), namespace);
        match api.list(&ListParams::default()).await {
            Ok(list) => list.items,
            Err(e) => {
                warn!(namespace = %namespace, error = %e, "Cannot list DNSRecords, skipping CNAME coexistence check");
                Vec::new()
            }
        }
    }
}

fn into_request(
    review: AdmissionReview<DynamicObject>,
) -> Result<AdmissionRequest<DynamicObject>, Json<AdmissionReview<DynamicObject>>> {
    review.try_into().map_err(|e| {
        warn!(error = %e, "Admission review carries no request");
        Json(AdmissionResponse::invalid(e).into_review())
    })
}

async fn mutate_handler(
    Json(review): Json<AdmissionReview<DynamicObject>>,
) -> Json<AdmissionReview<DynamicObject>> {
    let request = match into_request(review) {
        Ok(request) => request,
        Err(invalid) => return invalid,
    };
    let response = mutate(&request);
    debug!(uid = %request.uid, patched = response.patch.is_some(), "Mutating admission");
    Json(response.into_review())
}

async fn validate_handler(
    State(state): State<WebhookState>,
    Json(review): Json<AdmissionReview<DynamicObject>>,
) -> Json<AdmissionReview<DynamicObject>> {
    let request = match into_request(review) {
        Ok(request) => request,
        Err(invalid) => return invalid,
    };
    let siblings = state.siblings(request.namespace.as_deref()).await;
    let response = validate_request(&request, &siblings);
    if !response.allowed {
        info!(uid = %request.uid, reason = %response.result.message, "Rejected DNSRecord");
    }
    Json(response.into_review())
}

/// Router serving both admission endpoints. Without a client the CNAME coexistence
/// check sees no siblings.
pub fn router(client: Option<Client>) -> Router {
    Router::new()
        .route(WEBHOOK_MUTATE_PATH, post(mutate_handler))
        .route(WEBHOOK_VALIDATE_PATH, post(validate_handler))
        .with_state(WebhookState { client })
}

/// Serve the webhook on `listener` until the task is dropped.
///
/// # Errors
///
/// Returns an error if the HTTP server fails.
pub async fn serve_on(listener: TcpListener, client: Option<Client>) -> Result<()> {
    axum::serve(listener, router(client))
        .await
        .context("admission webhook server failed")
}

/// Bind `addr` and serve the webhook.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(addr: SocketAddr, client: Option<Client>) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding admission webhook on {addr}"))?;
    info!(addr = %addr, "Admission webhook listening");
    serve_on(listener, client).await
}

#[cfg(test)]
#[path = "webhook_tests.rs"]
mod webhook_tests;
