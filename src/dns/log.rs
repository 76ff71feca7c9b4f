// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Query logging.

use super::response::rcode_name;
use super::{Handler, Next, Request};
use async_trait::async_trait;
use hickory_proto::op::Message;
use std::time::Instant;
use tracing::info;

/// Logs one line per query once the rest of the chain has answered.
#[derive(Debug, Default)]
pub struct LogPlugin;

#[async_trait]
impl Handler for LogPlugin {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn serve(&self, req: &Request, next: Next<'_>) -> Message {
        let start = Instant::now();
        let msg = next.run(req).await;
        let (qname, qtype) = req
            .query()
            .map(|q| (q.name().to_string(), q.query_type().to_string()))
            .unwrap_or_default();
        info!(
            remote = %req.src,
            protocol = %req.protocol,
            id = req.message.id(),
            qname = %qname,
            qtype = %qtype,
            rcode = %rcode_name(msg.response_code()),
            answers = msg.answers().len(),
            truncated = msg.truncated(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "DNS query"
        );
        msg
    }
}
