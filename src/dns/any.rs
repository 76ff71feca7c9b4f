// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! RFC 8482 minimal answers to ANY queries.

use super::response;
use super::{Handler, Next, Request};
use async_trait::async_trait;
use hickory_proto::op::Message;
use hickory_proto::rr::rdata::HINFO;
use hickory_proto::rr::{RData, Record, RecordType};

const HINFO_TTL_SECS: u32 = 8482;

/// Answers `ANY` with a single `HINFO "RFC8482" ""` record.
#[derive(Debug, Default)]
pub struct AnyPlugin;

#[async_trait]
impl Handler for AnyPlugin {
    fn name(&self) -> &'static str {
        "any"
    }

    async fn serve(&self, req: &Request, next: Next<'_>) -> Message {
        let Some(query) = req.query() else {
            return next.run(req).await;
        };
        if query.query_type() != RecordType::ANY {
            return next.run(req).await;
        }

        let mut hinfo = Record::from_rdata(
            query.name().clone(),
            HINFO_TTL_SECS,
            RData::HINFO(HINFO::new("RFC8482".to_string(), String::new())),
        );
        hinfo.set_dns_class(query.query_class());

        let mut msg = response::reply(&req.message);
        msg.set_authoritative(true);
        msg.add_answer(hinfo);
        msg
    }
}
