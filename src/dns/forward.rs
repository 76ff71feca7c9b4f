// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Relay of queries the server is not authoritative for.

use super::exchange::udp_then_tcp;
use super::{response, Handler, Next, Request};
use crate::constants::DNS_QUERY_TIMEOUT_SECS;
use async_trait::async_trait;
use hickory_proto::op::Message;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{debug, warn};

/// Tries each upstream in order and answers SERVFAIL when all of them fail.
#[derive(Debug)]
pub struct ForwardPlugin {
    upstreams: Vec<SocketAddr>,
    deadline: Duration,
}

impl ForwardPlugin {
    #[must_use]
    pub fn new(upstreams: Vec<SocketAddr>) -> Self {
        Self {
            upstreams,
            deadline: Duration::from_secs(DNS_QUERY_TIMEOUT_SECS),
        }
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }
}

#[async_trait]
impl Handler for ForwardPlugin {
    fn name(&self) -> &'static str {
        "forward"
    }

    async fn serve(&self, req: &Request, _next: Next<'_>) -> Message {
        for upstream in &self.upstreams {
            match udp_then_tcp(*upstream, &req.message, self.deadline).await {
                Ok(mut reply) => {
                    debug!(upstream = %upstream, "Forwarded query");
                    reply.set_id(req.message.id());
                    return reply;
                }
                Err(e) => {
                    warn!(upstream = %upstream, error = %e, "Upstream failed");
                }
            }
        }
        response::servfail(&req.message)
    }
}
