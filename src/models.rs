//! GeoIP2 models returned by database and web service lookups.
//!
//! # Model Types
//!
//! - [`Country`] - Country-level data (GeoIP2 Country database and web service)
//! - [`City`] - City-level data (GeoIP2 City database and web service)
//! - [`Insights`] - City data plus anonymizer data (web service only)
//! - [`Enterprise`] - City data read from a GeoIP2 Enterprise database
//! - [`AnonymousIp`], [`Asn`], [`ConnectionType`], [`Domain`], [`Isp`] -
//!   flat models read from the corresponding databases
//!
//! Models are built once from a raw mapping and not changed afterwards.
//! Every nested record is always present; a record missing from the raw
//! input is in its empty state.
//!
//! ```
//! use geoip2::{Locales, Model};
//! use geoip2::models::City;
//! use serde_json::json;
//!
//! let raw = json!({
//!     "city": {"names": {"en": "Minneapolis", "de": "Minneapolis"}},
//!     "subdivisions": [{"iso_code": "MN", "names": {"en": "Minnesota"}}],
//!     "traits": {"ip_address": "1.2.3.4", "network": "1.2.3.0/24"},
//! });
//! let city = City::from_value(raw, &Locales::default()).unwrap();
//! assert_eq!(city.city.name.as_deref(), Some("Minneapolis"));
//! assert_eq!(city.most_specific_subdivision.iso_code.as_deref(), Some("MN"));
//! assert!(city.postal.is_empty());
//! ```

use std::net::IpAddr;

use ipnetwork::IpNetwork;
use log::trace;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::GeoIp2Error;
use crate::locales::Locales;
use crate::records::{
    self, is_false, Anonymizer, Continent, Location, MaxMind, Postal, RepresentedCountry,
    Subdivision, Traits,
};

pub(crate) mod private {
    use std::net::IpAddr;

    use crate::error::GeoIp2Error;
    use crate::locales::Locales;

    pub trait Resolve {
        /// Localizes names and fills in derived fields. `lookup` is the
        /// address that was looked up and the prefix length of the network
        /// it was found in, when the model comes from a database.
        fn resolve(
            &mut self,
            locales: &Locales,
            lookup: Option<(IpAddr, u8)>,
        ) -> Result<(), GeoIp2Error>;
    }
}

use private::Resolve;

/// A GeoIP2 model that can be built from a raw mapping.
pub trait Model: Resolve + Serialize + DeserializeOwned + Sized {
    /// Builds the model from any serde data source shaped like a GeoIP2
    /// response, resolving names with `locales`.
    ///
    /// Missing and unknown keys are fine; a value of the wrong type (for
    /// example a string where a number belongs) fails with
    /// [`GeoIp2Error::Generic`].
    fn from_raw<'de, D>(raw: D, locales: &Locales) -> Result<Self, GeoIp2Error>
    where
        D: Deserializer<'de>,
    {
        let model = Self::deserialize(raw)
            .map_err(|e| GeoIp2Error::generic(format!("unable to decode record: {e}")))?;
        build(model, locales, None)
    }

    /// Builds the model from a JSON value.
    fn from_value(raw: serde_json::Value, locales: &Locales) -> Result<Self, GeoIp2Error> {
        Self::from_raw(raw, locales)
    }
}

pub(crate) fn build<M: Model>(
    mut model: M,
    locales: &Locales,
    lookup: Option<(IpAddr, u8)>,
) -> Result<M, GeoIp2Error> {
    model.resolve(locales, lookup)?;
    trace!("built {}", std::any::type_name::<M>());
    Ok(model)
}

fn resolve_traits(traits: &mut Traits, lookup: Option<(IpAddr, u8)>) -> Result<(), GeoIp2Error> {
    if let Some((ip, prefix_len)) = lookup {
        traits.inject(ip, prefix_len);
    }
    traits.resolve_network()
}

fn resolve_subdivisions(subdivisions: &mut [Subdivision], locales: &Locales) -> Subdivision {
    for subdivision in subdivisions.iter_mut() {
        subdivision.localize(locales);
    }
    match subdivisions.last() {
        Some(last) => last.clone(),
        None => {
            let mut placeholder = Subdivision::default();
            placeholder.localize(locales);
            placeholder
        }
    }
}

fn resolve_flat(
    ip_address: &mut Option<IpAddr>,
    network: &mut Option<IpNetwork>,
    prefix_len: &mut Option<u8>,
    lookup: Option<(IpAddr, u8)>,
) -> Result<(), GeoIp2Error> {
    if let Some((ip, len)) = lookup {
        *ip_address = Some(ip);
        *prefix_len = Some(len);
    }
    *network = records::derive_network(*network, *ip_address, prefix_len.take())?;
    Ok(())
}

/// Data returned by the GeoIP2 Country web service and database.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct Country {
    /// Continent data for the IP address.
    #[serde(default, skip_serializing_if = "Continent::is_empty")]
    pub continent: Continent,
    /// Country where MaxMind believes the IP is located.
    #[serde(default, skip_serializing_if = "records::Country::is_empty")]
    pub country: records::Country,
    /// Account data. Only present in web service responses.
    #[serde(default, skip_serializing_if = "MaxMind::is_empty")]
    pub maxmind: MaxMind,
    /// Country where the ISP has registered the IP block.
    /// May differ from `country` (e.g., for mobile networks or VPNs).
    #[serde(default, skip_serializing_if = "records::Country::is_empty")]
    pub registered_country: records::Country,
    /// Country represented by users of this IP (e.g., military base or embassy).
    #[serde(default, skip_serializing_if = "RepresentedCountry::is_empty")]
    pub represented_country: RepresentedCountry,
    /// Traits of the IP address.
    #[serde(default, skip_serializing_if = "Traits::is_empty")]
    pub traits: Traits,
}

impl Resolve for Country {
    fn resolve(
        &mut self,
        locales: &Locales,
        lookup: Option<(IpAddr, u8)>,
    ) -> Result<(), GeoIp2Error> {
        self.continent.localize(locales);
        self.country.localize(locales);
        self.registered_country.localize(locales);
        self.represented_country.localize(locales);
        resolve_traits(&mut self.traits, lookup)
    }
}

impl Model for Country {}

/// Data returned by the GeoIP2 City web service and database.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct City {
    /// City data for the IP address.
    #[serde(default, skip_serializing_if = "records::City::is_empty")]
    pub city: records::City,
    /// Continent data for the IP address.
    #[serde(default, skip_serializing_if = "Continent::is_empty")]
    pub continent: Continent,
    /// Country where MaxMind believes the IP is located.
    #[serde(default, skip_serializing_if = "records::Country::is_empty")]
    pub country: records::Country,
    /// Location data including coordinates and time zone.
    #[serde(default, skip_serializing_if = "Location::is_empty")]
    pub location: Location,
    /// Account data. Only present in web service responses.
    #[serde(default, skip_serializing_if = "MaxMind::is_empty")]
    pub maxmind: MaxMind,
    /// Postal code data for the IP address.
    #[serde(default, skip_serializing_if = "Postal::is_empty")]
    pub postal: Postal,
    /// Country where the ISP has registered the IP block.
    #[serde(default, skip_serializing_if = "records::Country::is_empty")]
    pub registered_country: records::Country,
    /// Country represented by users of this IP (e.g., military base or embassy).
    #[serde(default, skip_serializing_if = "RepresentedCountry::is_empty")]
    pub represented_country: RepresentedCountry,
    /// Subdivisions (states, provinces, etc.) ordered from largest to smallest.
    /// For example, Oxford, UK would have England first, then Oxfordshire.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subdivisions: Vec<Subdivision>,
    /// Traits of the IP address.
    #[serde(default, skip_serializing_if = "Traits::is_empty")]
    pub traits: Traits,
    /// The last entry of `subdivisions`, or an empty subdivision if there
    /// are none.
    #[serde(skip)]
    pub most_specific_subdivision: Subdivision,
}

/// Implements [`Model`] for a model with the City record set.
macro_rules! city_model {
    ($model:ty) => {
        impl Resolve for $model {
            fn resolve(
                &mut self,
                locales: &Locales,
                lookup: Option<(IpAddr, u8)>,
            ) -> Result<(), GeoIp2Error> {
                self.city.localize(locales);
                self.continent.localize(locales);
                self.country.localize(locales);
                self.registered_country.localize(locales);
                self.represented_country.localize(locales);
                self.most_specific_subdivision =
                    resolve_subdivisions(&mut self.subdivisions, locales);
                resolve_traits(&mut self.traits, lookup)
            }
        }

        impl Model for $model {}
    };
}

city_model!(City);

/// Data returned by a GeoIP2 Enterprise database. It has the shape of
/// [`City`]; Enterprise records additionally carry confidence values.
pub type Enterprise = City;

/// Data returned by the GeoIP2 Insights web service.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct Insights {
    /// Anonymizer data for the IP address.
    #[serde(default, skip_serializing_if = "Anonymizer::is_empty")]
    pub anonymizer: Anonymizer,
    /// City data for the IP address, with a confidence score.
    #[serde(default, skip_serializing_if = "records::City::is_empty")]
    pub city: records::City,
    /// Continent data for the IP address.
    #[serde(default, skip_serializing_if = "Continent::is_empty")]
    pub continent: Continent,
    /// Country where MaxMind believes the IP is located.
    #[serde(default, skip_serializing_if = "records::Country::is_empty")]
    pub country: records::Country,
    /// Location data, including average income and population density.
    #[serde(default, skip_serializing_if = "Location::is_empty")]
    pub location: Location,
    /// Account data, such as the number of queries remaining.
    #[serde(default, skip_serializing_if = "MaxMind::is_empty")]
    pub maxmind: MaxMind,
    /// Postal code data for the IP address.
    #[serde(default, skip_serializing_if = "Postal::is_empty")]
    pub postal: Postal,
    /// Country where the ISP has registered the IP block.
    #[serde(default, skip_serializing_if = "records::Country::is_empty")]
    pub registered_country: records::Country,
    /// Country represented by users of this IP (e.g., military base or embassy).
    #[serde(default, skip_serializing_if = "RepresentedCountry::is_empty")]
    pub represented_country: RepresentedCountry,
    /// Subdivisions ordered from largest to smallest.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subdivisions: Vec<Subdivision>,
    /// Traits of the IP address, including user type and static IP score.
    #[serde(default, skip_serializing_if = "Traits::is_empty")]
    pub traits: Traits,
    /// The last entry of `subdivisions`, or an empty subdivision if there
    /// are none.
    #[serde(skip)]
    pub most_specific_subdivision: Subdivision,
}

city_model!(Insights);

/// GeoIP2 Anonymous IP database record.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct AnonymousIp {
    /// The IP address that was looked up.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<IpAddr>,
    /// True if the IP belongs to any sort of anonymous network.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_anonymous: bool,
    /// True if the IP is registered to an anonymous VPN provider.
    /// Note: If a VPN provider does not register subnets under names associated
    /// with them, we will likely only flag their IP ranges using `is_hosting_provider`.
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
    /// The largest network where all addresses share this record's data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<IpNetwork>,
    #[serde(default, skip_serializing)]
    prefix_len: Option<u8>,
}

impl Resolve for AnonymousIp {
    fn resolve(&mut self, _: &Locales, lookup: Option<(IpAddr, u8)>) -> Result<(), GeoIp2Error> {
        resolve_flat(
            &mut self.ip_address,
            &mut self.network,
            &mut self.prefix_len,
            lookup,
        )
    }
}

impl Model for AnonymousIp {}

/// GeoLite2 ASN database record.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Asn {
    /// The autonomous system number for the IP address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autonomous_system_number: Option<u32>,
    /// The organization associated with the registered ASN.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autonomous_system_organization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<IpAddr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<IpNetwork>,
    #[serde(default, skip_serializing)]
    prefix_len: Option<u8>,
}

impl Resolve for Asn {
    fn resolve(&mut self, _: &Locales, lookup: Option<(IpAddr, u8)>) -> Result<(), GeoIp2Error> {
        resolve_flat(
            &mut self.ip_address,
            &mut self.network,
            &mut self.prefix_len,
            lookup,
        )
    }
}

impl Model for Asn {}

/// GeoIP2 Connection-Type database record.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ConnectionType {
    /// The connection type. Possible values include "Dialup", "Cable/DSL",
    /// "Corporate", "Cellular", and "Satellite". Additional values may be
    /// added in the future.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<IpAddr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<IpNetwork>,
    #[serde(default, skip_serializing)]
    prefix_len: Option<u8>,
}

impl Resolve for ConnectionType {
    fn resolve(&mut self, _: &Locales, lookup: Option<(IpAddr, u8)>) -> Result<(), GeoIp2Error> {
        resolve_flat(
            &mut self.ip_address,
            &mut self.network,
            &mut self.prefix_len,
            lookup,
        )
    }
}

impl Model for ConnectionType {}

/// GeoIP2 Domain database record.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Domain {
    /// The second-level domain associated with the IP address
    /// (e.g., "example.com").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<IpAddr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<IpNetwork>,
    #[serde(default, skip_serializing)]
    prefix_len: Option<u8>,
}

impl Resolve for Domain {
    fn resolve(&mut self, _: &Locales, lookup: Option<(IpAddr, u8)>) -> Result<(), GeoIp2Error> {
        resolve_flat(
            &mut self.ip_address,
            &mut self.network,
            &mut self.prefix_len,
            lookup,
        )
    }
}

impl Model for Domain {}

/// GeoIP2 ISP database record.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Isp {
    /// The autonomous system number (ASN) for the IP address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autonomous_system_number: Option<u32>,
    /// The organization associated with the registered ASN.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autonomous_system_organization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<IpAddr>,
    /// The name of the ISP associated with the IP address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isp: Option<String>,
    /// The mobile country code (MCC) associated with the IP.
    /// See <https://en.wikipedia.org/wiki/Mobile_country_code>.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile_country_code: Option<String>,
    /// The mobile network code (MNC) associated with the IP.
    /// See <https://en.wikipedia.org/wiki/Mobile_network_code>.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile_network_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<IpNetwork>,
    /// The name of the organization associated with the IP address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(default, skip_serializing)]
    prefix_len: Option<u8>,
}

impl Resolve for Isp {
    fn resolve(&mut self, _: &Locales, lookup: Option<(IpAddr, u8)>) -> Result<(), GeoIp2Error> {
        resolve_flat(
            &mut self.ip_address,
            &mut self.network,
            &mut self.prefix_len,
            lookup,
        )
    }
}

impl Model for Isp {}
