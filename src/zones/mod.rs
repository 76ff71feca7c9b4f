// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory authoritative zone store.
//!
//! The store keeps every active record keyed by its canonical rendering and derives
//! one [`Zone`] per registrable domain. Each mutation rebuilds the whole set of zones
//! under the exclusive lock and swaps the resulting [`Zones`] snapshot in one step, so
//! queries holding an older snapshot finish their lookups undisturbed.
//!
//! Every zone gets a synthesized apex:
//!
//! - SOA `ns0.dns.<zone> hostmaster.dns.<zone> <serial> 7200 1800 86400 5`
//! - NS `ns0.dns.<zone>`
//! - `ns0.dns.<zone>` A/AAAA glue when an external address is configured
//!
//! The serial is `max(now, previous + 1)` and is bumped on every rebuild.

pub mod zone;

pub use zone::{Lookup, LookupResult, Zone, ZoneData};

use crate::constants::{
    SOA_EXPIRE_SECS, SOA_MINIMUM_TTL_SECS, SOA_REFRESH_SECS, SOA_RETRY_SECS, ZONE_APEX_LABEL,
    ZONE_APEX_TTL_SECS, ZONE_HOSTMASTER_LABEL, ZONE_NS_LABEL,
};
use crate::domain::registrable_domain;
use crate::errors::ZoneError;
use crate::record::render;
use hickory_proto::rr::rdata::{A, AAAA, NS, SOA};
use hickory_proto::rr::{DNSClass, Name, RData, Record};
use std::collections::{BTreeMap, HashMap};
use std::net::IpAddr;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};

/// Immutable snapshot of all zones.
#[derive(Debug, Default)]
pub struct Zones {
    zones: HashMap<String, Arc<Zone>>,
    names: Vec<String>,
}

impl Zones {
    /// Longest zone name that is `qname` or one of its ancestors.
    #[must_use]
    pub fn matches(&self, qname: &str) -> Option<&str> {
        let q = qname.to_ascii_lowercase();
        self.names
            .iter()
            .filter(|zone| q == **zone || q.ends_with(&format!(".{zone}")))
            .max_by_key(|zone| zone.len())
            .map(String::as_str)
    }

    /// Zone by its lowercase fully qualified name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<Zone>> {
        self.zones.get(name)
    }

    /// Sorted zone names.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.zones.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

#[derive(Debug, Default)]
struct StoreState {
    records: BTreeMap<String, Record>,
    zones: Arc<Zones>,
    serial: u32,
}

/// Thread-safe zone store fed by the embedded provider.
#[derive(Debug, Default)]
pub struct ZoneStore {
    external_address: Option<IpAddr>,
    state: RwLock<StoreState>,
}

impl ZoneStore {
    /// Create an empty store. `external_address` becomes the glue of `ns0.dns.<zone>`.
    #[must_use]
    pub fn new(external_address: Option<IpAddr>) -> Self {
        Self {
            external_address,
            state: RwLock::new(StoreState::default()),
        }
    }

    /// Current snapshot.
    #[must_use]
    pub fn zones(&self) -> Arc<Zones> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .zones
            .clone()
    }

    /// Records currently held, in canonical order.
    #[must_use]
    pub fn records(&self) -> Vec<Record> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .records
            .values()
            .cloned()
            .collect()
    }

    /// SOA serial of the current snapshot.
    #[must_use]
    pub fn serial(&self) -> u32 {
        self.state.read().unwrap_or_else(PoisonError::into_inner).serial
    }

    /// Insert or replace a record keyed by its canonical rendering.
    pub fn upsert(&self, rr: Record) -> Vec<ZoneError> {
        self.mutate(|records| {
            records.insert(render(&rr), rr);
        })
    }

    /// Remove a record by its canonical rendering.
    pub fn delete(&self, rr: &Record) -> Vec<ZoneError> {
        let key = render(rr);
        self.delete_key(&key)
    }

    /// Remove a record by canonical key.
    pub fn delete_key(&self, key: &str) -> Vec<ZoneError> {
        self.mutate(|records| {
            records.remove(key);
        })
    }

    /// Replace every record at once.
    pub fn replace(&self, rrs: impl IntoIterator<Item = Record>) -> Vec<ZoneError> {
        self.mutate(|records| {
            records.clear();
            records.extend(rrs.into_iter().map(|rr| (render(&rr), rr)));
        })
    }

    /// Apply `f` to the record map, then rebuild and swap the zones while still holding
    /// the exclusive lock. Returns the records that could not be placed.
    pub fn mutate<F>(&self, f: F) -> Vec<ZoneError>
    where
        F: FnOnce(&mut BTreeMap<String, Record>),
    {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut state.records);

        let serial = next_serial(state.serial);
        let (zones, errors) = build_zones(state.records.values(), self.external_address, serial);
        for err in &errors {
            warn!(error = %err, "Skipping record that cannot be placed in a zone");
        }
        debug!(zones = zones.len(), serial, "Rebuilt zones");
        crate::metrics::record_zone_count(zones.len());

        state.serial = serial;
        state.zones = Arc::new(zones);
        errors
    }
}

/// Group records by registrable domain and build one zone per group.
pub fn build_zones<'a>(
    records: impl IntoIterator<Item = &'a Record>,
    external_address: Option<IpAddr>,
    serial: u32,
) -> (Zones, Vec<ZoneError>) {
    let mut errors = Vec::new();
    let mut groups: BTreeMap<String, Vec<&Record>> = BTreeMap::new();

    for rr in records {
        match registrable_domain(&rr.name().to_string()) {
            Ok(zone) => groups.entry(zone).or_default().push(rr),
            Err(err) => errors.push(err),
        }
    }

    let mut zones = Zones::default();
    for (name, rrs) in groups {
        let origin = match Name::from_ascii(&name) {
            Ok(origin) => origin,
            Err(e) => {
                errors.push(ZoneError::InvalidName {
                    name,
                    reason: e.to_string(),
                });
                continue;
            }
        };
        let zone = match synthesize_apex(origin, external_address, serial) {
            Ok(zone) => zone,
            Err(err) => {
                errors.push(err);
                continue;
            }
        };
        for rr in rrs {
            if let Err(err) = zone.insert(rr.clone()) {
                errors.push(err);
            }
        }
        zones.names.push(name.clone());
        zones.zones.insert(name, Arc::new(zone));
    }
    zones.names.sort();

    (zones, errors)
}

/// Name of the synthesized nameserver, `ns0.dns.<zone>`.
///
/// # Errors
///
/// Returns [`ZoneError::InvalidName`] when the result exceeds DNS name limits.
pub fn nameserver_name(origin: &Name) -> Result<Name, ZoneError> {
    apex_host(origin, ZONE_NS_LABEL)
}

fn apex_host(origin: &Name, host: &str) -> Result<Name, ZoneError> {
    let text = format!("{host}.{ZONE_APEX_LABEL}.{origin}");
    Name::from_ascii(&text).map_err(|e| ZoneError::InvalidName {
        name: text,
        reason: e.to_string(),
    })
}

fn synthesize_apex(
    origin: Name,
    external_address: Option<IpAddr>,
    serial: u32,
) -> Result<Zone, ZoneError> {
    let ns_name = nameserver_name(&origin)?;
    let mbox = apex_host(&origin, ZONE_HOSTMASTER_LABEL)?;

    let mut soa = Record::from_rdata(
        origin.clone(),
        ZONE_APEX_TTL_SECS,
        RData::SOA(SOA::new(
            ns_name.clone(),
            mbox,
            serial,
            SOA_REFRESH_SECS,
            SOA_RETRY_SECS,
            SOA_EXPIRE_SECS,
            SOA_MINIMUM_TTL_SECS,
        )),
    );
    soa.set_dns_class(DNSClass::IN);

    let mut ns = Record::from_rdata(origin.clone(), ZONE_APEX_TTL_SECS, RData::NS(NS(ns_name.clone())));
    ns.set_dns_class(DNSClass::IN);

    let zone = Zone::new(origin);
    zone.set_soa(soa);
    zone.add_apex_ns(ns);

    if let Some(address) = external_address {
        let rdata = match address {
            IpAddr::V4(v4) => RData::A(A(v4)),
            IpAddr::V6(v6) => RData::AAAA(AAAA(v6)),
        };
        let mut glue = Record::from_rdata(ns_name, ZONE_APEX_TTL_SECS, rdata);
        glue.set_dns_class(DNSClass::IN);
        zone.insert_synthesized(glue);
    }

    Ok(zone)
}

/// Next SOA serial: wall-clock seconds, strictly increasing.
#[must_use]
pub fn next_serial(previous: u32) -> u32 {
    let now = u32::try_from(chrono::Utc::now().timestamp()).unwrap_or(u32::MAX);
    now.max(previous.saturating_add(1))
}
