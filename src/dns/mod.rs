// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Embedded authoritative DNS server.
//!
//! Requests are decoded with `hickory-proto` and handed to a [`Chain`] of
//! [`Handler`]s. Each handler either answers or passes the request to the rest of the
//! chain through [`Next::run`]; falling off the end of the chain yields `REFUSED`.
//!
//! The chain is assembled by [`build_chain`] in a fixed order:
//!
//! 1. [`log::LogPlugin`] (optional)
//! 2. [`metrics::MetricsPlugin`] (optional)
//! 3. [`any::AnyPlugin`] (optional)
//! 4. [`cache::CachePlugin`] (optional)
//! 5. [`records::RecordsPlugin`]
//! 6. [`forward::ForwardPlugin`] (optional)

pub mod any;
pub mod cache;
pub mod exchange;
pub mod forward;
pub mod log;
pub mod metrics;
pub mod records;
pub mod response;
pub mod server;

pub use server::DnsServer;

use crate::zones::ZoneStore;
use async_trait::async_trait;
use hickory_proto::op::{Message, Query};
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// Transport a request arrived on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Protocol {
    Udp,
    Tcp,
}

impl Protocol {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Udp => "udp",
            Self::Tcp => "tcp",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded query and where it came from.
#[derive(Clone, Debug)]
pub struct Request {
    pub message: Message,
    pub src: SocketAddr,
    pub protocol: Protocol,
}

impl Request {
    /// First question of the message.
    #[must_use]
    pub fn query(&self) -> Option<&Query> {
        self.message.queries().first()
    }
}

/// One link of the handler chain.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Plugin name used in logs.
    fn name(&self) -> &'static str;

    /// Answer `req` or delegate to `next`.
    async fn serve(&self, req: &Request, next: Next<'_>) -> Message;
}

/// The handlers following the current one.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    rest: &'a [Arc<dyn Handler>],
}

impl Next<'_> {
    /// Run the rest of the chain. An exhausted chain answers `REFUSED`.
    pub async fn run(self, req: &Request) -> Message {
        match self.rest.split_first() {
            Some((handler, rest)) => handler.serve(req, Next { rest }).await,
            None => response::refused(&req.message),
        }
    }
}

/// Ordered list of handlers.
#[derive(Clone, Default)]
pub struct Chain {
    handlers: Vec<Arc<dyn Handler>>,
}

impl Chain {
    #[must_use]
    pub fn new(handlers: Vec<Arc<dyn Handler>>) -> Self {
        Self { handlers }
    }

    /// Names of the handlers, in order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    /// Pass `req` through the whole chain.
    pub async fn handle(&self, req: &Request) -> Message {
        Next {
            rest: &self.handlers,
        }
        .run(req)
        .await
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("handlers", &self.names())
            .finish()
    }
}

/// Optional plugins of the embedded server.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PluginConfig {
    /// Log every query
    pub log: bool,
    /// Record per-query Prometheus metrics
    pub metrics: bool,
    /// Answer ANY queries with a synthesized HINFO record
    pub any: bool,
    /// Cache responses for at most this long
    pub cache_ttl: Option<Duration>,
    /// Upstream servers for names outside all zones
    pub forward: Vec<SocketAddr>,
}

/// Assemble the handler chain around the authoritative records plugin.
#[must_use]
pub fn build_chain(config: &PluginConfig, store: Arc<ZoneStore>) -> Chain {
    let mut handlers: Vec<Arc<dyn Handler>> = Vec::new();
    if config.log {
        handlers.push(Arc::new(log::LogPlugin));
    }
    if config.metrics {
        handlers.push(Arc::new(metrics::MetricsPlugin));
    }
    if config.any {
        handlers.push(Arc::new(any::AnyPlugin));
    }
    if let Some(ttl) = config.cache_ttl.filter(|ttl| !ttl.is_zero()) {
        handlers.push(Arc::new(cache::CachePlugin::new(ttl)));
    }
    handlers.push(Arc::new(records::RecordsPlugin::new(store)));
    if !config.forward.is_empty() {
        handlers.push(Arc::new(forward::ForwardPlugin::new(config.forward.clone())));
    }
    Chain::new(handlers)
}
