// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! A single authoritative zone and its lookup algorithm.

use crate::constants::MAX_CNAME_CHAIN;
use crate::errors::ZoneError;
use crate::record::is_duplicate;
use hickory_proto::rr::{Name, RData, Record, RecordType};
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Outcome of a zone lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LookupResult {
    /// The answer section holds the requested data
    Success,
    /// The name exists without data of the requested type
    NoData,
    /// The name does not exist
    NameError,
    /// The name sits below a delegation point
    Delegation,
    /// The zone cannot answer
    ServerFailure,
}

/// Records produced by a lookup, one vector per message section.
#[derive(Clone, Debug)]
pub struct Lookup {
    pub answer: Vec<Record>,
    pub ns: Vec<Record>,
    pub extra: Vec<Record>,
    pub result: LookupResult,
}

impl Lookup {
    fn new(result: LookupResult) -> Self {
        Self {
            answer: Vec::new(),
            ns: Vec::new(),
            extra: Vec::new(),
            result,
        }
    }
}

/// An authoritative zone.
///
/// The contents sit behind a reader-writer lock; queries hold the read guard for the
/// duration of one lookup.
#[derive(Debug)]
pub struct Zone {
    origin: Name,
    data: RwLock<ZoneData>,
}

/// Contents of a [`Zone`].
#[derive(Debug, Default)]
pub struct ZoneData {
    origin: String,
    /// Set when the zone must not be served. Never set in steady state.
    pub expired: bool,
    soa: Option<Record>,
    ns: Vec<Record>,
    nodes: BTreeMap<String, Vec<Record>>,
}

impl Zone {
    /// Create an empty zone rooted at `origin`.
    #[must_use]
    pub fn new(origin: Name) -> Self {
        let data = ZoneData {
            origin: key(&origin),
            ..Default::default()
        };
        Self {
            origin,
            data: RwLock::new(data),
        }
    }

    /// Zone apex.
    #[must_use]
    pub fn origin(&self) -> &Name {
        &self.origin
    }

    /// Shared access to the zone contents.
    pub fn read(&self) -> RwLockReadGuard<'_, ZoneData> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, ZoneData> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a declared record.
    ///
    /// # Errors
    ///
    /// Returns [`ZoneError::OutOfZone`] for owners outside the zone and
    /// [`ZoneError::ApexRecord`] for SOA records and NS records at the apex, which are
    /// synthesized only.
    pub fn insert(&self, rr: Record) -> Result<(), ZoneError> {
        if !self.origin.zone_of(rr.name()) {
            return Err(ZoneError::OutOfZone {
                name: rr.name().to_string(),
                zone: self.origin.to_string(),
            });
        }
        let owner = key(rr.name());
        let mut data = self.write();
        let at_apex = owner == data.origin;
        match rr.record_type() {
            RecordType::SOA => {
                return Err(ZoneError::ApexRecord {
                    zone: data.origin.clone(),
                    rtype: "SOA".into(),
                })
            }
            RecordType::NS if at_apex => {
                return Err(ZoneError::ApexRecord {
                    zone: data.origin.clone(),
                    rtype: "NS".into(),
                })
            }
            _ => {}
        }
        let set = data.nodes.entry(owner).or_default();
        if !set.iter().any(|existing| is_duplicate(existing, &rr)) {
            set.push(rr);
        }
        Ok(())
    }

    /// Install the apex SOA.
    pub fn set_soa(&self, soa: Record) {
        self.write().soa = Some(soa);
    }

    /// Add an apex NS record.
    pub fn add_apex_ns(&self, ns: Record) {
        let mut data = self.write();
        if !data.ns.iter().any(|existing| is_duplicate(existing, &ns)) {
            data.ns.push(ns);
        }
    }

    /// Insert glue or other synthesized data without apex checks.
    pub(crate) fn insert_synthesized(&self, rr: Record) {
        let owner = key(rr.name());
        let mut data = self.write();
        let set = data.nodes.entry(owner).or_default();
        if !set.iter().any(|existing| is_duplicate(existing, &rr)) {
            set.push(rr);
        }
    }
}

impl ZoneData {
    /// Apex SOA, if synthesized.
    #[must_use]
    pub fn soa(&self) -> Option<&Record> {
        self.soa.as_ref()
    }

    /// Apex NS set.
    #[must_use]
    pub fn apex_ns(&self) -> &[Record] {
        &self.ns
    }

    /// Every record of the zone, apex records first.
    #[must_use]
    pub fn records(&self) -> Vec<Record> {
        self.soa
            .iter()
            .chain(self.ns.iter())
            .chain(self.nodes.values().flatten())
            .cloned()
            .collect()
    }

    /// Resolve `qname`/`qtype` against the zone.
    #[must_use]
    pub fn lookup(&self, qname: &Name, qtype: RecordType) -> Lookup {
        let Some(soa) = self.soa.clone() else {
            return Lookup::new(LookupResult::ServerFailure);
        };
        let q = key(qname);

        if let Some(delegation) = self.delegation(&q) {
            return delegation;
        }

        if q == self.origin {
            match qtype {
                RecordType::SOA => return self.success(vec![soa]),
                RecordType::NS => return self.success(self.ns.clone()),
                RecordType::ANY => {
                    let mut answer = vec![soa];
                    answer.extend(self.ns.iter().cloned());
                    if let Some(set) = self.nodes.get(&q) {
                        answer.extend(set.iter().cloned());
                    }
                    return self.success(answer);
                }
                _ => {}
            }
            let empty = Vec::new();
            let set = self.nodes.get(&q).unwrap_or(&empty);
            return self.answer_from(set, qname, qtype, &soa);
        }

        if let Some(set) = self.nodes.get(&q) {
            return self.answer_from(set, qname, qtype, &soa);
        }

        if self.is_empty_non_terminal(&q) {
            return self.no_data(&soa);
        }

        let encloser = self.closest_encloser(&q);
        if let Some(wildcard) = self.nodes.get(&format!("*.{encloser}")) {
            let synthesized: Vec<Record> = wildcard
                .iter()
                .map(|r| {
                    let mut r = r.clone();
                    r.set_name(qname.clone());
                    r
                })
                .collect();
            return self.answer_from(&synthesized, qname, qtype, &soa);
        }

        let mut lookup = Lookup::new(LookupResult::NameError);
        lookup.ns.push(soa);
        lookup
    }

    fn answer_from(&self, set: &[Record], qname: &Name, qtype: RecordType, soa: &Record) -> Lookup {
        let matching: Vec<Record> = set
            .iter()
            .filter(|r| qtype == RecordType::ANY || r.record_type() == qtype)
            .cloned()
            .collect();
        if !matching.is_empty() {
            return self.success(matching);
        }

        if qtype != RecordType::CNAME {
            if let Some(cname) = set.iter().find(|r| r.record_type() == RecordType::CNAME) {
                let mut answer = vec![cname.clone()];
                self.follow_cname(cname, qname, qtype, &mut answer);
                return self.success(answer);
            }
        }

        self.no_data(soa)
    }

    fn follow_cname(&self, start: &Record, qname: &Name, qtype: RecordType, answer: &mut Vec<Record>) {
        let mut current = start.clone();
        let mut seen = vec![key(qname)];
        for _ in 0..MAX_CNAME_CHAIN {
            let Some(RData::CNAME(target)) = current.data() else {
                return;
            };
            let target = key(&target.0);
            if seen.contains(&target) {
                return;
            }
            let Some(set) = self.nodes.get(&target) else {
                return;
            };
            let matching: Vec<Record> = set
                .iter()
                .filter(|r| r.record_type() == qtype)
                .cloned()
                .collect();
            if !matching.is_empty() {
                answer.extend(matching);
                return;
            }
            let Some(next) = set.iter().find(|r| r.record_type() == RecordType::CNAME) else {
                return;
            };
            answer.push(next.clone());
            seen.push(target);
            current = next.clone();
        }
    }

    fn success(&self, answer: Vec<Record>) -> Lookup {
        let mut lookup = Lookup::new(LookupResult::Success);
        lookup.extra = self.glue(answer.iter().chain(self.ns.iter()));
        lookup.ns = self.ns.clone();
        lookup.answer = answer;
        lookup
    }

    fn no_data(&self, soa: &Record) -> Lookup {
        let mut lookup = Lookup::new(LookupResult::NoData);
        lookup.ns.push(soa.clone());
        lookup
    }

    /// Topmost NS set strictly below the apex on the path to `q`.
    fn delegation(&self, q: &str) -> Option<Lookup> {
        let relative = q.strip_suffix(&self.origin)?;
        let labels: Vec<&str> = relative.split('.').filter(|l| !l.is_empty()).collect();
        for depth in (0..labels.len()).rev() {
            let candidate = format!("{}.{}", labels[depth..].join("."), self.origin);
            let Some(set) = self.nodes.get(&candidate) else {
                continue;
            };
            let ns: Vec<Record> = set
                .iter()
                .filter(|r| r.record_type() == RecordType::NS)
                .cloned()
                .collect();
            if ns.is_empty() {
                continue;
            }
            let mut lookup = Lookup::new(LookupResult::Delegation);
            lookup.extra = self.glue(ns.iter());
            lookup.ns = ns;
            return Some(lookup);
        }
        None
    }

    fn is_empty_non_terminal(&self, q: &str) -> bool {
        let suffix = format!(".{q}");
        self.nodes.keys().any(|k| k.ends_with(&suffix))
    }

    fn exists(&self, name: &str) -> bool {
        name == self.origin || self.nodes.contains_key(name) || self.is_empty_non_terminal(name)
    }

    fn closest_encloser(&self, q: &str) -> String {
        let mut current = q;
        while current != self.origin {
            let Some((_, parent)) = current.split_once('.') else {
                break;
            };
            current = parent;
            if self.exists(current) {
                return current.to_string();
            }
        }
        self.origin.clone()
    }

    /// A/AAAA records in the zone for the hosts named by NS, MX and SRV records.
    fn glue<'a>(&self, records: impl Iterator<Item = &'a Record>) -> Vec<Record> {
        let mut glue: Vec<Record> = Vec::new();
        for rr in records {
            let target = match rr.data() {
                Some(RData::NS(ns)) => &ns.0,
                Some(RData::MX(mx)) => mx.exchange(),
                Some(RData::SRV(srv)) => srv.target(),
                _ => continue,
            };
            let Some(set) = self.nodes.get(&key(target)) else {
                continue;
            };
            for addr in set
                .iter()
                .filter(|r| matches!(r.record_type(), RecordType::A | RecordType::AAAA))
            {
                if !glue.iter().any(|g| is_duplicate(g, addr)) {
                    glue.push(addr.clone());
                }
            }
        }
        glue
    }
}

/// Lowercase fully qualified map key for a name.
pub(crate) fn key(name: &Name) -> String {
    let mut s = name.to_string().to_ascii_lowercase();
    if !s.ends_with('.') {
        s.push('.');
    }
    s
}

#[cfg(test)]
#[path = "zone_tests.rs"]
mod zone_tests;
