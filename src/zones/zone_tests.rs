// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for zone lookups

#[cfg(test)]
mod tests {
    use crate::errors::ZoneError;
    use crate::record::{is_duplicate, parse, render};
    use crate::zones::{build_zones, LookupResult, Zone};
    use hickory_proto::rr::{Name, Record, RecordType};
    use std::net::{IpAddr, Ipv4Addr};
    use std::str::FromStr;
    use std::sync::Arc;

    fn zone(lines: &[&str]) -> Arc<Zone> {
        let records: Vec<Record> = lines.iter().map(|l| parse(l).unwrap()).collect();
        let (zones, errors) = build_zones(
            records.iter(),
            Some(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))),
            42,
        );
        assert!(errors.is_empty(), "{errors:?}");
        zones.get("example.com.").unwrap().clone()
    }

    fn name(s: &str) -> Name {
        Name::from_str(s).unwrap()
    }

    fn rendered(records: &[Record]) -> Vec<String> {
        records.iter().map(render).collect()
    }

    #[test]
    fn test_exact_match() {
        let zone = zone(&[
            "api.example.com. 3600 IN A 10.0.0.1",
            "api.example.com. 3600 IN A 10.0.0.2",
        ]);
        let data = zone.read();
        let lookup = data.lookup(&name("api.example.com."), RecordType::A);
        assert_eq!(lookup.result, LookupResult::Success);
        assert_eq!(lookup.answer.len(), 2);
        assert_eq!(
            rendered(&lookup.ns),
            vec!["example.com.\t3600\tIN\tNS\tns0.dns.example.com."]
        );
        assert_eq!(
            rendered(&lookup.extra),
            vec!["ns0.dns.example.com.\t3600\tIN\tA\t127.0.0.1"]
        );
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let zone = zone(&["api.example.com. 3600 IN A 10.0.0.1"]);
        let lookup = zone.read().lookup(&name("API.Example.COM."), RecordType::A);
        assert_eq!(lookup.result, LookupResult::Success);
        assert!(is_duplicate(
            &lookup.answer[0],
            &parse("api.example.com. 1 IN A 10.0.0.1").unwrap()
        ));
    }

    #[test]
    fn test_no_data_returns_soa() {
        let zone = zone(&["api.example.com. 3600 IN A 10.0.0.1"]);
        let lookup = zone.read().lookup(&name("api.example.com."), RecordType::TXT);
        assert_eq!(lookup.result, LookupResult::NoData);
        assert!(lookup.answer.is_empty());
        assert_eq!(lookup.ns.len(), 1);
        assert_eq!(lookup.ns[0].record_type(), RecordType::SOA);
    }

    #[test]
    fn test_name_error_returns_soa() {
        let zone = zone(&["api.example.com. 3600 IN A 10.0.0.1"]);
        let lookup = zone.read().lookup(&name("missing.example.com."), RecordType::A);
        assert_eq!(lookup.result, LookupResult::NameError);
        assert_eq!(lookup.ns[0].record_type(), RecordType::SOA);
    }

    #[test]
    fn test_empty_non_terminal_is_no_data() {
        let zone = zone(&["a.b.example.com. 3600 IN A 10.0.0.1"]);
        let lookup = zone.read().lookup(&name("b.example.com."), RecordType::A);
        assert_eq!(lookup.result, LookupResult::NoData);
    }

    #[test]
    fn test_cname_is_followed_in_zone() {
        let zone = zone(&[
            "www.example.com. 3600 IN CNAME web.example.com.",
            "web.example.com. 3600 IN CNAME api.example.com.",
            "api.example.com. 3600 IN A 10.0.0.1",
        ]);
        let lookup = zone.read().lookup(&name("www.example.com."), RecordType::A);
        assert_eq!(lookup.result, LookupResult::Success);
        let types: Vec<_> = lookup.answer.iter().map(Record::record_type).collect();
        assert_eq!(
            types,
            vec![RecordType::CNAME, RecordType::CNAME, RecordType::A]
        );
    }

    #[test]
    fn test_cname_loop_terminates() {
        let zone = zone(&[
            "a.example.com. 3600 IN CNAME b.example.com.",
            "b.example.com. 3600 IN CNAME a.example.com.",
        ]);
        let lookup = zone.read().lookup(&name("a.example.com."), RecordType::A);
        assert_eq!(lookup.result, LookupResult::Success);
        assert_eq!(lookup.answer.len(), 2);
    }

    #[test]
    fn test_wildcard_synthesis() {
        let zone = zone(&[
            "*.apps.example.com. 3600 IN A 10.0.0.5",
            "known.apps.example.com. 3600 IN A 10.0.0.6",
        ]);
        let data = zone.read();

        let lookup = data.lookup(&name("foo.apps.example.com."), RecordType::A);
        assert_eq!(lookup.result, LookupResult::Success);
        assert_eq!(
            rendered(&lookup.answer),
            vec!["foo.apps.example.com.\t3600\tIN\tA\t10.0.0.5"]
        );

        let lookup = data.lookup(&name("known.apps.example.com."), RecordType::A);
        assert_eq!(
            rendered(&lookup.answer),
            vec!["known.apps.example.com.\t3600\tIN\tA\t10.0.0.6"]
        );

        let lookup = data.lookup(&name("foo.apps.example.com."), RecordType::TXT);
        assert_eq!(lookup.result, LookupResult::NoData);
    }

    #[test]
    fn test_wildcard_does_not_cover_existing_encloser_children() {
        let zone = zone(&[
            "*.example.com. 3600 IN A 10.0.0.5",
            "x.sub.example.com. 3600 IN A 10.0.0.6",
        ]);
        let lookup = zone.read().lookup(&name("y.sub.example.com."), RecordType::A);
        assert_eq!(lookup.result, LookupResult::NameError);
    }

    #[test]
    fn test_delegation_with_glue() {
        let zone = zone(&[
            "sub.example.com. 3600 IN NS ns.sub.example.com.",
            "ns.sub.example.com. 3600 IN A 10.0.0.53",
        ]);
        let lookup = zone.read().lookup(&name("host.sub.example.com."), RecordType::A);
        assert_eq!(lookup.result, LookupResult::Delegation);
        assert!(lookup.answer.is_empty());
        assert_eq!(
            rendered(&lookup.ns),
            vec!["sub.example.com.\t3600\tIN\tNS\tns.sub.example.com."]
        );
        assert_eq!(
            rendered(&lookup.extra),
            vec!["ns.sub.example.com.\t3600\tIN\tA\t10.0.0.53"]
        );
    }

    #[test]
    fn test_apex_soa_and_ns() {
        let zone = zone(&["api.example.com. 3600 IN A 10.0.0.1"]);
        let data = zone.read();

        let soa = data.lookup(&name("example.com."), RecordType::SOA);
        assert_eq!(soa.result, LookupResult::Success);
        assert_eq!(
            rendered(&soa.answer),
            vec!["example.com.\t3600\tIN\tSOA\tns0.dns.example.com. hostmaster.dns.example.com. 42 7200 1800 86400 5"]
        );

        let ns = data.lookup(&name("example.com."), RecordType::NS);
        assert_eq!(
            rendered(&ns.answer),
            vec!["example.com.\t3600\tIN\tNS\tns0.dns.example.com."]
        );
        assert_eq!(ns.extra.len(), 1);

        let a = data.lookup(&name("example.com."), RecordType::A);
        assert_eq!(a.result, LookupResult::NoData);
    }

    #[test]
    fn test_any_returns_all_rrsets() {
        let zone = zone(&[
            "api.example.com. 3600 IN A 10.0.0.1",
            "api.example.com. 3600 IN TXT \"hello\"",
        ]);
        let lookup = zone.read().lookup(&name("api.example.com."), RecordType::ANY);
        assert_eq!(lookup.result, LookupResult::Success);
        assert_eq!(lookup.answer.len(), 2);
    }

    #[test]
    fn test_mx_target_glue() {
        let zone = zone(&[
            "example.com. 3600 IN MX 10 mail.example.com.",
            "mail.example.com. 3600 IN A 10.0.0.25",
        ]);
        let lookup = zone.read().lookup(&name("example.com."), RecordType::MX);
        assert_eq!(lookup.result, LookupResult::Success);
        assert!(rendered(&lookup.extra)
            .contains(&"mail.example.com.\t3600\tIN\tA\t10.0.0.25".to_string()));
    }

    #[test]
    fn test_insert_rejects_apex_records_and_foreign_names() {
        let zone = Zone::new(name("example.com."));
        assert!(matches!(
            zone.insert(parse("example.com. 3600 IN NS ns1.other.net.").unwrap()),
            Err(ZoneError::ApexRecord { .. })
        ));
        assert!(matches!(
            zone.insert(parse("other.net. 3600 IN A 10.0.0.1").unwrap()),
            Err(ZoneError::OutOfZone { .. })
        ));
        assert!(zone
            .insert(parse("api.example.com. 3600 IN A 10.0.0.1").unwrap())
            .is_ok());
    }

    #[test]
    fn test_zone_without_soa_fails() {
        let zone = Zone::new(name("example.com."));
        zone.insert(parse("api.example.com. 3600 IN A 10.0.0.1").unwrap())
            .unwrap();
        let lookup = zone.read().lookup(&name("api.example.com."), RecordType::A);
        assert_eq!(lookup.result, LookupResult::ServerFailure);
    }
}
