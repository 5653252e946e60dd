use std::net::IpAddr;

use ipnetwork::IpNetwork;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{Database, GeoIp2Error, Locales, Reader};
use crate::records::{NamedRecord, PlaceRecord};

const METADATA_START_MARKER: &[u8] = b"\xab\xcd\xefMaxMind.com";

/// Writes a MaxMind DB control byte for `type_num` with payload `size`.
fn write_control(out: &mut Vec<u8>, type_num: u8, size: usize) {
    let (size_bits, extension) = match size {
        s if s < 29 => (s as u8, None),
        s if s < 285 => (29, Some((s - 29) as u8)),
        s => panic!("size {s} too large for test encoder"),
    };
    if type_num <= 7 {
        out.push((type_num << 5) | size_bits);
    } else {
        out.push(size_bits);
        out.push(type_num - 7);
    }
    out.extend(extension);
}

fn encode_value(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Bool(b) => write_control(out, 14, usize::from(*b)),
        Value::Number(n) => match n.as_u64() {
            Some(u) => {
                let u = u32::try_from(u).expect("test encoder only writes uint32");
                let bytes: Vec<u8> = u
                    .to_be_bytes()
                    .into_iter()
                    .skip_while(|b| *b == 0)
                    .collect();
                write_control(out, 6, bytes.len());
                out.extend(bytes);
            }
            None => {
                let f = n.as_f64().expect("number is a float");
                write_control(out, 3, 8);
                out.extend(f.to_bits().to_be_bytes());
            }
        },
        Value::String(s) => {
            write_control(out, 2, s.len());
            out.extend(s.as_bytes());
        }
        Value::Array(items) => {
            write_control(out, 11, items.len());
            for item in items {
                encode_value(item, out);
            }
        }
        Value::Object(map) => {
            write_control(out, 7, map.len());
            for (key, item) in map {
                encode_value(&Value::String(key.clone()), out);
                encode_value(item, out);
            }
        }
        Value::Null => panic!("null cannot be stored in a MaxMind DB"),
    }
}

#[derive(Clone, Copy)]
enum Child {
    Empty,
    Node(usize),
    Data(usize),
}

/// Builds a MaxMind DB with 24-bit records holding one record per network.
/// The tree is IPv6 if any network is IPv6, with IPv4 networks placed under
/// `::/96`. Networks must not overlap.
fn build_database(database_type: &str, networks: &[(&str, Value)]) -> Vec<u8> {
    let networks: Vec<(IpNetwork, &Value)> = networks
        .iter()
        .map(|(cidr, record)| (cidr.parse().unwrap(), record))
        .collect();
    let ip_version = if networks.iter().any(|(network, _)| network.is_ipv6()) {
        6
    } else {
        4
    };
    let bit_count: u8 = if ip_version == 6 { 128 } else { 32 };

    let mut nodes: Vec<[Child; 2]> = vec![[Child::Empty, Child::Empty]];
    for (index, (network, _)) in networks.iter().enumerate() {
        let (bits, prefix) = match network.ip() {
            IpAddr::V4(ip) => (u128::from(u32::from(ip)), network.prefix() + bit_count - 32),
            IpAddr::V6(ip) => (u128::from(ip), network.prefix()),
        };
        let mut node = 0;
        for depth in 0..prefix {
            let bit = ((bits >> (bit_count - 1 - depth)) & 1) as usize;
            if depth + 1 == prefix {
                nodes[node][bit] = Child::Data(index);
                break;
            }
            node = match nodes[node][bit] {
                Child::Node(next) => next,
                _ => {
                    nodes.push([Child::Empty, Child::Empty]);
                    nodes[node][bit] = Child::Node(nodes.len() - 1);
                    nodes.len() - 1
                }
            };
        }
    }

    let mut data = Vec::new();
    let mut offsets = Vec::new();
    for (_, record) in &networks {
        offsets.push(data.len());
        encode_value(record, &mut data);
    }

    let node_count = nodes.len();
    let mut buf = Vec::new();
    for node in &nodes {
        for child in node {
            let value = match *child {
                Child::Empty => node_count,
                Child::Node(next) => next,
                Child::Data(index) => node_count + 16 + offsets[index],
            };
            buf.extend(&(value as u32).to_be_bytes()[1..]);
        }
    }
    buf.extend([0u8; 16]);
    buf.extend(data);
    buf.extend(METADATA_START_MARKER);
    encode_value(
        &json!({
            "binary_format_major_version": 2,
            "binary_format_minor_version": 0,
            "build_epoch": 1_700_000_000,
            "database_type": database_type,
            "description": {"en": "Test database"},
            "ip_version": ip_version,
            "languages": ["en", "zh-CN"],
            "node_count": node_count,
            "record_size": 24,
        }),
        &mut buf,
    );
    buf
}

fn city_reader(locales: Locales) -> Reader<maxminddb::Reader<Vec<u8>>> {
    let buf = build_database(
        "GeoIP2-City",
        &[
            (
                "81.2.69.160/27",
                json!({
                    "city": {"geoname_id": 2643743, "names": {"en": "London", "zh-CN": "伦敦"}},
                    "continent": {"code": "EU", "geoname_id": 6255148, "names": {"en": "Europe"}},
                    "country": {
                        "geoname_id": 2635167,
                        "iso_code": "GB",
                        "names": {"en": "United Kingdom"},
                    },
                    "location": {
                        "accuracy_radius": 10,
                        "latitude": 51.5142,
                        "longitude": -0.0931,
                        "time_zone": "Europe/London",
                    },
                    "subdivisions": [
                        {"geoname_id": 6269131, "iso_code": "ENG", "names": {"en": "England"}},
                    ],
                }),
            ),
            ("2.125.160.216/29", json!({"country": {"iso_code": "GB"}})),
        ],
    );
    Reader::from_source(buf, locales).unwrap()
}

#[test]
fn test_city() {
    let _ = env_logger::try_init();

    let reader = city_reader(Locales::default());
    assert_eq!(reader.database_type(), "GeoIP2-City");
    assert_eq!(reader.metadata().ip_version, 4);

    let city = reader.city("81.2.69.163").unwrap();
    assert_eq!(city.city.name(), Some("London"));
    assert_eq!(city.city.geoname_id(), Some(2643743));
    assert_eq!(city.continent.code.as_deref(), Some("EU"));
    assert_eq!(city.country.iso_code.as_deref(), Some("GB"));
    assert_eq!(city.location.latitude, Some(51.5142));
    assert_eq!(city.location.longitude, Some(-0.0931));
    assert_eq!(city.most_specific_subdivision.iso_code.as_deref(), Some("ENG"));
    assert!(city.postal.is_empty());
    assert_eq!(
        city.traits.ip_address,
        Some("81.2.69.163".parse::<IpAddr>().unwrap())
    );
    assert_eq!(
        city.traits.network.map(|n| n.to_string()).as_deref(),
        Some("81.2.69.160/27")
    );

    let city = reader.city("2.125.160.217").unwrap();
    assert!(city.city.is_empty());
    assert_eq!(city.most_specific_subdivision.name(), None);
    assert_eq!(
        city.traits.network.map(|n| n.to_string()).as_deref(),
        Some("2.125.160.216/29")
    );
}

#[test]
fn test_city_locales() {
    let reader = city_reader(Locales::new(["zh-CN", "en"]).unwrap());
    let city = reader.city("81.2.69.170").unwrap();
    assert_eq!(city.city.name(), Some("伦敦"));
    assert_eq!(city.country.name(), Some("United Kingdom"));
}

#[test]
fn test_address_not_found() {
    let reader = city_reader(Locales::default());
    let err = reader.city("10.0.0.1").unwrap_err();
    assert!(matches!(err, GeoIp2Error::AddressNotFound { .. }));
    assert_eq!(err.to_string(), "The address 10.0.0.1 is not in the database.");
}

#[test]
fn test_invalid_address() {
    let reader = city_reader(Locales::default());
    let err = reader.city("invalid").unwrap_err();
    assert!(matches!(err, GeoIp2Error::InvalidArgument { .. }));
    assert!(err.to_string().contains("is not a valid IP address"));

    let err = reader.city("2001:db8::1").unwrap_err();
    assert!(matches!(err, GeoIp2Error::InvalidArgument { .. }), "{err:?}");
}

#[test]
fn test_incorrect_database_type() {
    let reader = city_reader(Locales::default());

    let err = reader.domain("81.2.69.163").unwrap_err();
    assert_eq!(
        err.to_string(),
        "The domain method cannot be used to open a GeoIP2-City database"
    );
    let err = reader.country("81.2.69.163").unwrap_err();
    assert!(matches!(
        err,
        GeoIp2Error::IncorrectDatabaseType { method: "country", .. }
    ));
    assert!(reader.isp("81.2.69.163").is_err());
    assert!(reader.enterprise("81.2.69.163").is_err());
}

#[test]
fn test_flat_models() {
    let _ = env_logger::try_init();

    let buf = build_database(
        "GeoLite2-ASN",
        &[(
            "1.128.0.0/11",
            json!({
                "autonomous_system_number": 1221,
                "autonomous_system_organization": "Telstra Pty Ltd",
            }),
        )],
    );
    let reader = Reader::from_source(buf, Locales::default()).unwrap();
    let asn = reader.asn("1.128.0.1").unwrap();
    assert_eq!(asn.autonomous_system_number, Some(1221));
    assert_eq!(
        asn.autonomous_system_organization.as_deref(),
        Some("Telstra Pty Ltd")
    );
    assert_eq!(asn.ip_address, Some("1.128.0.1".parse::<IpAddr>().unwrap()));
    assert_eq!(
        asn.network.map(|n| n.to_string()).as_deref(),
        Some("1.128.0.0/11")
    );

    let buf = build_database(
        "GeoIP2-Anonymous-IP",
        &[(
            "1.2.0.0/16",
            json!({
                "is_anonymous": true,
                "is_anonymous_vpn": true,
                "is_hosting_provider": true,
                "is_public_proxy": true,
                "is_residential_proxy": true,
                "is_tor_exit_node": true,
            }),
        )],
    );
    let reader = Reader::from_source(buf, Locales::default()).unwrap();
    let anonymous = reader.anonymous_ip("1.2.0.1").unwrap();
    assert!(anonymous.is_anonymous);
    assert!(anonymous.is_tor_exit_node);
    assert_eq!(
        anonymous.network.map(|n| n.to_string()).as_deref(),
        Some("1.2.0.0/16")
    );

    let buf = build_database(
        "GeoIP2-Connection-Type",
        &[("1.0.1.0/24", json!({"connection_type": "Cellular"}))],
    );
    let reader = Reader::from_source(buf, Locales::default()).unwrap();
    let connection = reader.connection_type("1.0.1.0").unwrap();
    assert_eq!(connection.connection_type.as_deref(), Some("Cellular"));

    let buf = build_database(
        "GeoIP2-Domain",
        &[("1.2.0.0/16", json!({"domain": "maxmind.com"}))],
    );
    let reader = Reader::from_source(buf, Locales::default()).unwrap();
    assert_eq!(
        reader.domain("1.2.0.0").unwrap().domain.as_deref(),
        Some("maxmind.com")
    );

    let buf = build_database(
        "GeoIP2-ISP",
        &[(
            "1.128.0.0/11",
            json!({
                "autonomous_system_number": 1221,
                "autonomous_system_organization": "Telstra Pty Ltd",
                "isp": "Telstra Internet",
                "organization": "Telstra Internet",
            }),
        )],
    );
    let reader = Reader::from_source(buf, Locales::default()).unwrap();
    let isp = reader.isp("1.128.0.1").unwrap();
    assert_eq!(isp.isp.as_deref(), Some("Telstra Internet"));
    assert_eq!(isp.mobile_country_code, None);
}

#[test]
fn test_enterprise() {
    let buf = build_database(
        "GeoIP2-Enterprise",
        &[(
            "74.209.16.0/20",
            json!({
                "city": {"confidence": 11, "geoname_id": 5112335, "names": {"en": "Chatham"}},
                "country": {"confidence": 99, "iso_code": "US"},
                "postal": {"code": "12037", "confidence": 11},
                "traits": {
                    "autonomous_system_number": 14671,
                    "connection_type": "Cable/DSL",
                    "is_legitimate_proxy": true,
                    "user_type": "residential",
                },
            }),
        )],
    );
    let reader = Reader::from_source(buf, Locales::default()).unwrap();

    let enterprise = reader.enterprise("74.209.24.1").unwrap();
    assert_eq!(enterprise.city.confidence(), Some(11));
    assert_eq!(enterprise.country.confidence(), Some(99));
    assert_eq!(enterprise.postal.confidence, Some(11));
    assert!(enterprise.traits.is_legitimate_proxy);
    assert_eq!(enterprise.traits.connection_type.as_deref(), Some("Cable/DSL"));
    assert_eq!(
        enterprise.traits.network.map(|n| n.to_string()).as_deref(),
        Some("74.209.16.0/20")
    );

    assert!(reader.city("74.209.24.1").is_err());
}

#[test]
fn test_open_readfile() {
    let path = std::env::temp_dir().join(format!("geoip2-test-{}.mmdb", std::process::id()));
    std::fs::write(
        &path,
        build_database("GeoLite2-Country", &[("1.0.0.0/24", json!({"country": {"iso_code": "AU"}}))]),
    )
    .unwrap();

    let reader = Reader::open_readfile(&path, Locales::default()).unwrap();
    let country = reader.country("1.0.0.1").unwrap();
    assert_eq!(country.country.iso_code.as_deref(), Some("AU"));
    std::fs::remove_file(&path).unwrap();

    let err = Reader::open_readfile(&path, Locales::default()).unwrap_err();
    assert!(matches!(err, GeoIp2Error::Io(_)), "{err:?}");
}

#[cfg(feature = "mmap")]
#[test]
fn test_open_mmap() {
    let path = std::env::temp_dir().join(format!("geoip2-mmap-{}.mmdb", std::process::id()));
    std::fs::write(
        &path,
        build_database("GeoLite2-Country", &[("1.0.0.0/24", json!({"country": {"iso_code": "AU"}}))]),
    )
    .unwrap();

    // The file is only removed after the reader is dropped.
    let reader = unsafe { Reader::open_mmap(&path, Locales::default()) }.unwrap();
    let country = reader.country("1.0.0.1").unwrap();
    assert_eq!(country.country.iso_code.as_deref(), Some("AU"));
    assert_eq!(
        country.traits.network.map(|n| n.to_string()).as_deref(),
        Some("1.0.0.0/24")
    );
    drop(reader);
    std::fs::remove_file(&path).unwrap();

    let err = unsafe { Reader::open_mmap(&path, Locales::default()) }.unwrap_err();
    assert!(matches!(err, GeoIp2Error::Io(_)), "{err:?}");
}

#[test]
fn test_ipv4_in_ipv6_database() {
    let buf = build_database(
        "GeoIP2-Country",
        &[
            ("1.2.3.0/24", json!({"country": {"iso_code": "AU"}})),
            ("2001:db8::/32", json!({"country": {"iso_code": "DE"}})),
        ],
    );
    let reader = Reader::from_source(buf, Locales::default()).unwrap();
    assert_eq!(reader.metadata().ip_version, 6);

    let country = reader.country("1.2.3.4").unwrap();
    assert_eq!(country.country.iso_code.as_deref(), Some("AU"));
    assert_eq!(
        country.traits.network.map(|n| n.to_string()).as_deref(),
        Some("1.2.3.0/24")
    );
    let country = reader.country("2001:db8::1").unwrap();
    assert_eq!(
        country.traits.network.map(|n| n.to_string()).as_deref(),
        Some("2001:db8::/32")
    );
    assert!(matches!(
        reader.country("1.2.4.1"),
        Err(GeoIp2Error::AddressNotFound { .. })
    ));
}

#[test]
fn test_ipv4_under_ipv6_record() {
    // `::/64` holds all of IPv4, so IPv4 lookups land on a record above the
    // IPv4 subtree.
    let buf = build_database(
        "GeoIP2-Country",
        &[
            ("::/64", json!({"country": {"iso_code": "ZZ"}})),
            ("2001:db8::/32", json!({"country": {"iso_code": "DE"}})),
        ],
    );
    let reader = Reader::from_source(buf, Locales::default()).unwrap();

    let country = reader.country("81.2.69.160").unwrap();
    assert_eq!(country.country.iso_code.as_deref(), Some("ZZ"));
    assert_eq!(
        country.traits.ip_address,
        Some("81.2.69.160".parse::<IpAddr>().unwrap())
    );
    assert_eq!(
        country.traits.network.map(|n| n.to_string()).as_deref(),
        Some("0.0.0.0/0")
    );

    let country = reader.country("::5").unwrap();
    assert_eq!(
        country.traits.network.map(|n| n.to_string()).as_deref(),
        Some("::/64")
    );
}

#[test]
fn test_corrupt_database() {
    let err = Reader::from_source(vec![0u8; 64], Locales::default()).unwrap_err();
    assert!(matches!(err, GeoIp2Error::InvalidDatabase { .. }), "{err:?}");
}

/// A database backed by JSON records, for exercising type checks without
/// building a MaxMind DB file.
struct MemoryDatabase {
    database_type: &'static str,
    networks: Vec<(IpNetwork, Value)>,
}

impl Database for MemoryDatabase {
    fn database_type(&self) -> &str {
        self.database_type
    }

    fn lookup_prefix<T>(&self, ip: IpAddr) -> Result<Option<(T, u8)>, GeoIp2Error>
    where
        T: DeserializeOwned,
    {
        for (network, record) in &self.networks {
            if network.contains(ip) {
                return Ok(Some((T::deserialize(record)?, network.prefix())));
            }
        }
        Ok(None)
    }
}

fn memory_reader(database_type: &'static str) -> Reader<MemoryDatabase> {
    Reader::new(
        MemoryDatabase {
            database_type,
            networks: vec![("1.2.3.0/24".parse().unwrap(), json!({}))],
        },
        Locales::default(),
    )
}

#[test]
fn test_type_tags_are_substring_matches() {
    let _ = env_logger::try_init();

    fn accepted(database_type: &'static str) -> Vec<&'static str> {
        let reader = memory_reader(database_type);
        let ip = "1.2.3.4";
        let mut methods = Vec::new();
        let mut check = |method: &'static str, result: Result<(), GeoIp2Error>| match result {
            Ok(()) => methods.push(method),
            Err(GeoIp2Error::IncorrectDatabaseType { .. }) => {}
            Err(e) => panic!("unexpected error from {method}: {e:?}"),
        };
        check("city", reader.city(ip).map(drop));
        check("country", reader.country(ip).map(drop));
        check("enterprise", reader.enterprise(ip).map(drop));
        check("anonymous_ip", reader.anonymous_ip(ip).map(drop));
        check("asn", reader.asn(ip).map(drop));
        check("connection_type", reader.connection_type(ip).map(drop));
        check("domain", reader.domain(ip).map(drop));
        check("isp", reader.isp(ip).map(drop));
        methods
    }

    assert_eq!(accepted("GeoIP2-City"), vec!["city"]);
    assert_eq!(accepted("GeoLite2-City"), vec!["city"]);
    assert_eq!(accepted("GeoIP2-Country"), vec!["country"]);
    assert_eq!(accepted("GeoIP2-Enterprise"), vec!["enterprise"]);
    assert_eq!(accepted("GeoIP2-Anonymous-IP"), vec!["anonymous_ip"]);
    assert_eq!(accepted("GeoLite2-ASN"), vec!["asn"]);
    assert_eq!(accepted("GeoIP2-Connection-Type"), vec!["connection_type"]);
    assert_eq!(accepted("GeoIP2-Domain"), vec!["domain"]);
    assert_eq!(accepted("GeoIP2-ISP"), vec!["isp"]);
    assert_eq!(accepted("GeoIP2-City-Country-ISP"), vec!["city", "country"]);
    assert_eq!(
        accepted("GeoIP2-City-Country-GeoIP2-ISP"),
        vec!["city", "country", "isp"]
    );
    // Near misses: case and vendor prefix both matter.
    assert!(accepted("GeoLite2-ISP").is_empty());
    assert!(accepted("GeoIP2-Anonymous").is_empty());
    assert!(accepted("geoip2-city").is_empty());
}

#[test]
fn test_memory_database_injects_lookup() {
    let reader = memory_reader("GeoIP2-Country");
    let country = reader.country("1.2.3.4").unwrap();
    assert_eq!(
        country.traits.network.map(|n| n.to_string()).as_deref(),
        Some("1.2.3.0/24")
    );
    assert!(country.continent.is_empty());

    #[derive(Deserialize)]
    struct Raw {
        #[serde(default)]
        traits: Option<Value>,
    }
    let database = MemoryDatabase {
        database_type: "GeoIP2-Country",
        networks: vec![("1.2.3.0/24".parse().unwrap(), json!({"country": {}}))],
    };
    let (raw, prefix_len): (Raw, u8) = database
        .lookup_prefix("1.2.3.4".parse().unwrap())
        .unwrap()
        .unwrap();
    assert!(raw.traits.is_none());
    assert_eq!(prefix_len, 24);
}

#[test]
fn test_concurrent_lookups() {
    use rayon::prelude::*;

    let reader = city_reader(Locales::default());
    let names: Vec<Option<String>> = (160..192)
        .into_par_iter()
        .map(|last| reader.city(&format!("81.2.69.{last}")).unwrap().city.name)
        .collect();
    assert!(names.iter().all(|n| n.as_deref() == Some("London")));
}
