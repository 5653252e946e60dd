//! Records that make up the GeoIP2 models.
//!
//! Every record deserializes from a sparse mapping: missing keys become
//! `None`, missing `is_*` flags become `false` and unknown keys are ignored.
//! Records carrying `names` also expose a `name` resolved from the caller's
//! [`Locales`] when the enclosing model is built. `name` is a derived view
//! and is never serialized.

use std::net::IpAddr;

use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};

use crate::error::GeoIp2Error;
use crate::locales::{Locales, Names};
use crate::network;

/// A record with localized names.
pub trait NamedRecord {
    /// All localized names, keyed by locale code.
    fn names(&self) -> &Names;

    /// Name in the first of the caller's locales that has one.
    fn name(&self) -> Option<&str>;
}

/// A named record for a place, with MaxMind's confidence and a GeoNames ID.
pub trait PlaceRecord: NamedRecord {
    /// Confidence (0-100) that the place is correct. Only populated by the
    /// Insights web service and Enterprise databases.
    fn confidence(&self) -> Option<u16>;

    /// GeoNames ID of the place.
    fn geoname_id(&self) -> Option<u32>;
}

pub(crate) fn is_false(value: &bool) -> bool {
    !*value
}

macro_rules! named_record {
    ($record:ident) => {
        impl NamedRecord for $record {
            fn names(&self) -> &Names {
                &self.names
            }

            fn name(&self) -> Option<&str> {
                self.name.as_deref()
            }
        }

        impl $record {
            /// Returns true if all fields are empty/None.
            #[must_use]
            pub fn is_empty(&self) -> bool {
                *self == Self::default()
            }

            pub(crate) fn localize(&mut self, locales: &Locales) {
                self.name = locales.resolve(&self.names).map(str::to_owned);
            }
        }
    };
}

macro_rules! place_record {
    ($record:ident) => {
        named_record!($record);

        impl PlaceRecord for $record {
            fn confidence(&self) -> Option<u16> {
                self.confidence
            }

            fn geoname_id(&self) -> Option<u32> {
                self.geoname_id
            }
        }
    };
}

/// Continent data for an IP address.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Continent {
    /// Two-character continent code (e.g., "NA" for North America, "EU" for Europe).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// GeoNames ID for the continent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geoname_id: Option<u32>,
    /// Continent name in the caller's preferred locale.
    #[serde(skip)]
    pub name: Option<String>,
    /// Localized continent names.
    #[serde(default, skip_serializing_if = "Names::is_empty")]
    pub names: Names,
}

named_record!(Continent);

/// Country data for an IP address.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Country {
    /// Confidence (0-100) that the country is correct.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<u16>,
    /// GeoNames ID for the country.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geoname_id: Option<u32>,
    /// True if the country is a member state of the European Union.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_in_european_union: bool,
    /// Two-character ISO 3166-1 alpha-2 country code.
    /// See <https://en.wikipedia.org/wiki/ISO_3166-1_alpha-2>.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iso_code: Option<String>,
    /// Country name in the caller's preferred locale.
    #[serde(skip)]
    pub name: Option<String>,
    /// Localized country names.
    #[serde(default, skip_serializing_if = "Names::is_empty")]
    pub names: Names,
}

place_record!(Country);

/// Represented country data.
///
/// The represented country is the country represented by something like a
/// military base or embassy.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct RepresentedCountry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geoname_id: Option<u32>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_in_european_union: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iso_code: Option<String>,
    #[serde(skip)]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Names::is_empty")]
    pub names: Names,
    /// Type of entity representing the country (e.g., "military").
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub representation_type: Option<String>,
}

place_record!(RepresentedCountry);

/// City data for an IP address.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct City {
    /// Confidence (0-100) that the city is correct.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<u16>,
    /// GeoNames ID for the city.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geoname_id: Option<u32>,
    /// City name in the caller's preferred locale.
    #[serde(skip)]
    pub name: Option<String>,
    /// Localized city names.
    #[serde(default, skip_serializing_if = "Names::is_empty")]
    pub names: Names,
}

place_record!(City);

/// Subdivision (state, province, etc.) data for an IP address.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Subdivision {
    /// Confidence (0-100) that the subdivision is correct.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<u16>,
    /// GeoNames ID for the subdivision.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geoname_id: Option<u32>,
    /// ISO 3166-2 subdivision code (up to 3 characters).
    /// See <https://en.wikipedia.org/wiki/ISO_3166-2>.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iso_code: Option<String>,
    /// Subdivision name in the caller's preferred locale.
    #[serde(skip)]
    pub name: Option<String>,
    /// Localized subdivision names.
    #[serde(default, skip_serializing_if = "Names::is_empty")]
    pub names: Names,
}

place_record!(Subdivision);

/// Location data for an IP address.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct Location {
    /// Approximate accuracy radius in kilometers around the coordinates.
    /// This is the radius where we have a 67% confidence that the device
    /// using the IP address resides within.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy_radius: Option<u16>,
    /// Average income in US dollars associated with the IP address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_income: Option<u32>,
    /// Approximate latitude of the location. This value is not precise and
    /// should not be used to identify a particular address or household.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    /// Approximate longitude of the location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Metro code for the location. Only available for US locations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metro_code: Option<u16>,
    /// Estimated number of people per square kilometer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub population_density: Option<u32>,
    /// Time zone associated with the location, as specified by the
    /// IANA Time Zone Database (e.g., "America/New_York").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl Location {
    /// Returns true if all fields are None.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Postal data for an IP address.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Postal {
    /// Postal code for the location. Not available for all countries.
    /// In some countries, this will only contain part of the postal code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Confidence (0-100) that the postal code is correct.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<u16>,
}

impl Postal {
    /// Returns true if all fields are None.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Account information returned by the web service.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct MaxMind {
    /// Number of queries remaining on the account's current plan.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queries_remaining: Option<u32>,
}

impl MaxMind {
    /// Returns true if all fields are None.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Anonymizer data for an IP address. Only populated by the Insights web
/// service.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Anonymizer {
    /// Confidence (1-99) that the network is actively used for anonymizing
    /// traffic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<u16>,
    /// True if the IP belongs to any sort of anonymous network.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_anonymous: bool,
    /// True if the IP is registered to an anonymous VPN provider.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_anonymous_vpn: bool,
    /// True if the IP belongs to a hosting or VPN provider.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_hosting_provider: bool,
    /// True if the IP belongs to a public proxy.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_public_proxy: bool,
    /// True if the IP is on a suspected anonymizing network and belongs to
    /// a residential ISP.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_residential_proxy: bool,
    /// True if the IP is a Tor exit node.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_tor_exit_node: bool,
    /// Last day (YYYY-MM-DD) the network was seen in anonymizer analysis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_last_seen: Option<String>,
    /// Name of the VPN provider, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_name: Option<String>,
}

impl Anonymizer {
    /// Returns true if all fields are empty/false.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Traits of the IP address and the network it belongs to.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct Traits {
    /// The autonomous system number (ASN) for the IP address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autonomous_system_number: Option<u32>,
    /// The organization associated with the registered ASN.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autonomous_system_organization: Option<String>,
    /// The connection type, e.g. "Cable/DSL" or "Cellular".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_type: Option<String>,
    /// The second-level domain associated with the IP address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// The IP address the data is for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<IpAddr>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_anonymous: bool,
    /// Deprecated. Use the anonymizer record or the Anonymous IP database.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_anonymous_proxy: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_anonymous_vpn: bool,
    /// True if the IP belongs to an anycast network.
    /// See <https://en.wikipedia.org/wiki/Anycast>.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_anycast: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_hosting_provider: bool,
    /// True if MaxMind believes the IP is a legitimate proxy, such as an
    /// internal VPN used by a corporation.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_legitimate_proxy: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_public_proxy: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_residential_proxy: bool,
    /// Deprecated. True if the IP belongs to a satellite internet provider.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_satellite_provider: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_tor_exit_node: bool,
    /// The name of the ISP associated with the IP address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isp: Option<String>,
    /// The mobile country code (MCC) associated with the IP.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile_country_code: Option<String>,
    /// The mobile network code (MNC) associated with the IP.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile_network_code: Option<String>,
    /// The largest network where all addresses share this record's data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<IpNetwork>,
    /// The name of the organization associated with the IP address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    /// Indicator of how static or dynamic the IP address is, from 0 to 99.99.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_ip_score: Option<f64>,
    /// Estimated number of users sharing the IP or network in the past
    /// 24 hours.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_count: Option<u32>,
    /// The user type, e.g. "residential" or "business".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_type: Option<String>,
    #[serde(default, skip_serializing)]
    prefix_len: Option<u8>,
}

impl Traits {
    /// Returns true if all fields are empty/false.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Records the address that was looked up and the prefix length of the
    /// database network it fell in.
    pub(crate) fn inject(&mut self, ip_address: IpAddr, prefix_len: u8) {
        self.ip_address = Some(ip_address);
        self.prefix_len = Some(prefix_len);
    }

    /// Fills in `network` from the address and prefix length when the raw
    /// record did not carry one. The prefix length is consumed.
    pub(crate) fn resolve_network(&mut self) -> Result<(), GeoIp2Error> {
        self.network = derive_network(self.network, self.ip_address, self.prefix_len.take())?;
        Ok(())
    }
}

/// `network` wins if present; otherwise the network is derived from the
/// address, treating a missing prefix length as 0.
pub(crate) fn derive_network(
    raw_network: Option<IpNetwork>,
    ip_address: Option<IpAddr>,
    prefix_len: Option<u8>,
) -> Result<Option<IpNetwork>, GeoIp2Error> {
    match (raw_network, ip_address) {
        (Some(raw), _) => Ok(Some(raw)),
        (None, Some(ip)) => Ok(Some(network::network(ip, prefix_len.unwrap_or(0))?)),
        (None, None) => Ok(None),
    }
}
