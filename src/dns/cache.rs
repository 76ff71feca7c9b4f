// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Response cache.
//!
//! Positive answers live for the smaller of the configured TTL and the lowest TTL in
//! the answer section. Negative answers (NXDOMAIN, NODATA) live for the smaller of the
//! configured TTL and the SOA minimum found in the authority section. Truncated
//! responses and other response codes are never cached.

use super::{Handler, Next, Request};
use crate::constants::DNS_CACHE_CAPACITY;
use async_trait::async_trait;
use hickory_proto::op::{Message, ResponseCode};
use hickory_proto::rr::{DNSClass, RData, RecordType};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::trace;

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
struct CacheKey {
    name: String,
    qtype: RecordType,
    qclass: DNSClass,
}

#[derive(Debug)]
struct Entry {
    response: Message,
    expires: Instant,
}

#[derive(Debug)]
pub struct CachePlugin {
    ttl: Duration,
    capacity: usize,
    entries: Mutex<HashMap<CacheKey, Entry>>,
}

impl CachePlugin {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self::with_capacity(ttl, DNS_CACHE_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Number of entries, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, key: &CacheKey, now: Instant) -> Option<Message> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        match entries.get(key) {
            Some(entry) if entry.expires > now => Some(entry.response.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn put(&self, key: CacheKey, response: Message, lifetime: Duration, now: Instant) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.len() >= self.capacity && !entries.contains_key(&key) {
            entries.retain(|_, e| e.expires > now);
            if entries.len() >= self.capacity {
                return;
            }
        }
        entries.insert(
            key,
            Entry {
                response,
                expires: now + lifetime,
            },
        );
    }

    /// How long `msg` may be cached, if at all.
    fn lifetime(&self, msg: &Message) -> Option<Duration> {
        if msg.truncated() {
            return None;
        }
        let secs = match msg.response_code() {
            ResponseCode::NoError if !msg.answers().is_empty() => {
                msg.answers().iter().map(|r| r.ttl()).min()?
            }
            ResponseCode::NoError | ResponseCode::NXDomain => {
                msg.name_servers().iter().find_map(|r| match r.data() {
                    Some(RData::SOA(soa)) => Some(soa.minimum().min(r.ttl())),
                    _ => None,
                })?
            }
            _ => return None,
        };
        let lifetime = self.ttl.min(Duration::from_secs(u64::from(secs)));
        (!lifetime.is_zero()).then_some(lifetime)
    }
}

#[async_trait]
impl Handler for CachePlugin {
    fn name(&self) -> &'static str {
        "cache"
    }

    async fn serve(&self, req: &Request, next: Next<'_>) -> Message {
        let Some(query) = req.query() else {
            return next.run(req).await;
        };
        let key = CacheKey {
            name: query.name().to_string().to_ascii_lowercase(),
            qtype: query.query_type(),
            qclass: query.query_class(),
        };

        if let Some(mut hit) = self.get(&key, Instant::now()) {
            trace!(qname = %key.name, qtype = %key.qtype, "Cache hit");
            hit.set_id(req.message.id());
            hit.set_recursion_desired(req.message.recursion_desired());
            return hit;
        }

        let msg = next.run(req).await;
        if let Some(lifetime) = self.lifetime(&msg) {
            self.put(key, msg.clone(), lifetime, Instant::now());
        }
        msg
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod cache_tests;
