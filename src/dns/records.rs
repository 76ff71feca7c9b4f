// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Authoritative answers from the zone store.
//!
//! Replies are complete; the server shrinks them for UDP after the whole chain ran,
//! so the cache only ever holds full answers.

use super::response;
use super::{Handler, Next, Request};
use crate::domain::fqdn;
use crate::zones::{LookupResult, ZoneStore};
use async_trait::async_trait;
use hickory_proto::op::{Message, ResponseCode};
use std::sync::Arc;
use tracing::warn;

/// Serves the zones of a [`ZoneStore`] and passes other names down the chain.
#[derive(Debug)]
pub struct RecordsPlugin {
    store: Arc<ZoneStore>,
}

impl RecordsPlugin {
    #[must_use]
    pub fn new(store: Arc<ZoneStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Handler for RecordsPlugin {
    fn name(&self) -> &'static str {
        "records"
    }

    async fn serve(&self, req: &Request, next: Next<'_>) -> Message {
        let Some(query) = req.query() else {
            return next.run(req).await;
        };
        let qname = query.name();

        let zones = self.store.zones();
        let Some(zone_name) = zones.matches(&fqdn(&qname.to_string())) else {
            return next.run(req).await;
        };
        let Some(zone) = zones.get(zone_name) else {
            return response::servfail(&req.message);
        };

        let lookup = {
            let data = zone.read();
            if data.expired {
                warn!(zone = %zone_name, "Zone expired");
                return response::servfail(&req.message);
            }
            data.lookup(qname, query.query_type())
        };

        let mut msg = response::reply(&req.message);
        msg.set_authoritative(true);
        match lookup.result {
            LookupResult::Success | LookupResult::NoData => {}
            LookupResult::NameError => {
                msg.set_response_code(ResponseCode::NXDomain);
            }
            LookupResult::Delegation => {
                msg.set_authoritative(false);
            }
            LookupResult::ServerFailure => return response::servfail(&req.message),
        }
        msg.add_answers(lookup.answer);
        msg.add_name_servers(lookup.ns);
        msg.add_additionals(lookup.extra);
        msg
    }
}
