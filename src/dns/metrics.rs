// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Per-query Prometheus metrics.

use super::response::rcode_name;
use super::{Handler, Next, Request};
use crate::metrics::record_dns_query;
use async_trait::async_trait;
use hickory_proto::op::Message;
use std::time::Instant;

#[derive(Debug, Default)]
pub struct MetricsPlugin;

#[async_trait]
impl Handler for MetricsPlugin {
    fn name(&self) -> &'static str {
        "prometheus"
    }

    async fn serve(&self, req: &Request, next: Next<'_>) -> Message {
        let start = Instant::now();
        let msg = next.run(req).await;
        let qtype = req
            .query()
            .map(|q| q.query_type().to_string())
            .unwrap_or_default();
        record_dns_query(
            req.protocol.as_str(),
            &qtype,
            &rcode_name(msg.response_code()),
            start.elapsed(),
        );
        msg
    }
}
