// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Live verification of programmed records.

use crate::constants::DNS_QUERY_TIMEOUT_SECS;
use crate::dns::exchange::udp_then_tcp;
use crate::record::is_duplicate;
use anyhow::{Context as _, Result};
use async_trait::async_trait;
use hickory_proto::op::{Message, MessageType, OpCode, Query};
use hickory_proto::rr::Record;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;
use tracing::debug;

/// Checks whether a record is observably served.
#[async_trait]
pub trait Verifier: Send + Sync {
    /// `true` when the answer to `(name, type, class)` of `rr` contains `rr`.
    async fn verify(&self, rr: &Record) -> Result<bool>;
}

/// [`Verifier`] querying a resolver over UDP, falling back to TCP.
#[derive(Debug)]
pub struct DnsVerifier {
    server: SocketAddr,
    deadline: Duration,
    next_id: AtomicU16,
}

impl DnsVerifier {
    #[must_use]
    pub fn new(server: SocketAddr) -> Self {
        let seed = chrono::Utc::now().timestamp_subsec_nanos() & 0xffff;
        Self {
            server,
            deadline: Duration::from_secs(DNS_QUERY_TIMEOUT_SECS),
            next_id: AtomicU16::new(u16::try_from(seed).unwrap_or_default()),
        }
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    #[must_use]
    pub fn server(&self) -> SocketAddr {
        self.server
    }

    fn query(&self, rr: &Record) -> Message {
        let mut query = Query::query(rr.name().clone(), rr.record_type());
        query.set_query_class(rr.dns_class());

        let mut msg = Message::new();
        msg.set_id(self.next_id.fetch_add(1, Ordering::Relaxed))
            .set_message_type(MessageType::Query)
            .set_op_code(OpCode::Query)
            .set_recursion_desired(true)
            .add_query(query);
        msg
    }
}

#[async_trait]
impl Verifier for DnsVerifier {
    async fn verify(&self, rr: &Record) -> Result<bool> {
        let reply = udp_then_tcp(self.server, &self.query(rr), self.deadline)
            .await
            .with_context(|| format!("verifying {} {} at {}", rr.name(), rr.record_type(), self.server))?;
        let found = reply.answers().iter().any(|answer| is_duplicate(answer, rr));
        debug!(
            name = %rr.name(),
            record_type = %rr.record_type(),
            server = %self.server,
            rcode = %reply.response_code(),
            answers = reply.answers().len(),
            found,
            "Verification query answered"
        );
        Ok(found)
    }
}

#[cfg(test)]
#[path = "verify_tests.rs"]
mod verify_tests;
