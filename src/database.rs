//! The database behind a [`Reader`](crate::Reader).

use std::net::IpAddr;

use serde::de::DeserializeOwned;

use crate::error::GeoIp2Error;

/// A MaxMind DB style database: something that reports its type and maps
/// an address to a record plus the prefix length of the network holding it.
///
/// Implemented for [`maxminddb::Reader`]; tests and callers with their own
/// storage can provide other implementations.
pub trait Database {
    /// The `database_type` string from the database metadata, e.g.
    /// `"GeoIP2-City"`.
    fn database_type(&self) -> &str;

    /// Looks up `ip`, returning the decoded record and the prefix length of
    /// the network it was found in, or `None` if the address has no data.
    fn lookup_prefix<T>(&self, ip: IpAddr) -> Result<Option<(T, u8)>, GeoIp2Error>
    where
        T: DeserializeOwned;
}

impl<S: AsRef<[u8]>> Database for maxminddb::Reader<S> {
    fn database_type(&self) -> &str {
        &self.metadata.database_type
    }

    fn lookup_prefix<T>(&self, ip: IpAddr) -> Result<Option<(T, u8)>, GeoIp2Error>
    where
        T: DeserializeOwned,
    {
        let result = self.lookup(ip)?;
        let Some(record) = result.decode::<T>()? else {
            return Ok(None);
        };
        let network = result.network()?;
        // An IPv4 address matched by an IPv6 record above the IPv4 subtree
        // lies in a record covering all of IPv4.
        let prefix_len = if ip.is_ipv4() && network.is_ipv6() {
            0
        } else {
            network.prefix()
        };
        Ok(Some((record, prefix_len)))
    }
}
