//! GeoIP2 database reader.

use std::net::IpAddr;
use std::path::Path;

use log::debug;

#[cfg(feature = "mmap")]
use maxminddb::Mmap;

use crate::database::Database;
use crate::error::GeoIp2Error;
use crate::locales::Locales;
use crate::models::{
    self, AnonymousIp, Asn, City, ConnectionType, Country, Domain, Enterprise, Isp, Model,
};

/// Reads GeoIP2 and GeoLite2 databases into localized models.
///
/// Each lookup method checks that the database is of a matching type,
/// validates the address, and returns the record for the network containing
/// it. The `traits.ip_address` and `traits.network` of the result (or the
/// top-level `ip_address` and `network` for flat models) describe the lookup.
///
/// The database is closed when the reader is dropped.
///
/// # Example
///
/// ```no_run
/// use geoip2::{Locales, Reader};
///
/// # fn main() -> Result<(), geoip2::GeoIp2Error> {
/// let reader = Reader::open_readfile("/path/to/GeoIP2-City.mmdb", Locales::default())?;
/// let city = reader.city("81.2.69.160")?;
/// println!("{:?} in {:?}", city.city.name, city.country.iso_code);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Reader<D> {
    database: D,
    locales: Locales,
}

#[cfg(feature = "mmap")]
impl Reader<maxminddb::Reader<Mmap>> {
    /// Open a MaxMind DB database file by memory mapping it.
    ///
    /// # Safety
    ///
    /// The file must not be modified or truncated while the reader is
    /// alive. Replace database files by renaming a new file over the old
    /// path instead of writing into it.
    pub unsafe fn open_mmap<P: AsRef<Path>>(
        database: P,
        locales: Locales,
    ) -> Result<Self, GeoIp2Error> {
        let database = unsafe { maxminddb::Reader::open_mmap(database) }?;
        Ok(Reader::new(database, locales))
    }
}

impl Reader<maxminddb::Reader<Vec<u8>>> {
    /// Open a MaxMind DB database file by loading it into memory.
    pub fn open_readfile<P: AsRef<Path>>(
        database: P,
        locales: Locales,
    ) -> Result<Self, GeoIp2Error> {
        Ok(Reader::new(maxminddb::Reader::open_readfile(database)?, locales))
    }
}

impl<S: AsRef<[u8]>> Reader<maxminddb::Reader<S>> {
    /// Open a MaxMind DB database from anything that implements `AsRef<[u8]>`.
    pub fn from_source(buf: S, locales: Locales) -> Result<Self, GeoIp2Error> {
        Ok(Reader::new(maxminddb::Reader::from_source(buf)?, locales))
    }

    /// Metadata of the underlying database.
    pub fn metadata(&self) -> &maxminddb::Metadata {
        &self.database.metadata
    }
}

impl<D: Database> Reader<D> {
    /// Wraps an already opened database.
    pub fn new(database: D, locales: Locales) -> Self {
        Reader { database, locales }
    }

    /// The type reported by the database, e.g. `"GeoIP2-City"`.
    pub fn database_type(&self) -> &str {
        self.database.database_type()
    }

    /// Locales used to resolve names.
    pub fn locales(&self) -> &Locales {
        &self.locales
    }

    /// Looks up `ip_address` in a City database.
    pub fn city(&self, ip_address: &str) -> Result<City, GeoIp2Error> {
        self.model("city", "City", ip_address)
    }

    /// Looks up `ip_address` in a Country database.
    pub fn country(&self, ip_address: &str) -> Result<Country, GeoIp2Error> {
        self.model("country", "Country", ip_address)
    }

    /// Looks up `ip_address` in an Enterprise database.
    pub fn enterprise(&self, ip_address: &str) -> Result<Enterprise, GeoIp2Error> {
        self.model("enterprise", "Enterprise", ip_address)
    }

    /// Looks up `ip_address` in an Anonymous IP database.
    pub fn anonymous_ip(&self, ip_address: &str) -> Result<AnonymousIp, GeoIp2Error> {
        self.model("anonymous_ip", "GeoIP2-Anonymous-IP", ip_address)
    }

    /// Looks up `ip_address` in a GeoLite2 ASN database.
    pub fn asn(&self, ip_address: &str) -> Result<Asn, GeoIp2Error> {
        self.model("asn", "GeoLite2-ASN", ip_address)
    }

    /// Looks up `ip_address` in a Connection-Type database.
    pub fn connection_type(&self, ip_address: &str) -> Result<ConnectionType, GeoIp2Error> {
        self.model("connection_type", "GeoIP2-Connection-Type", ip_address)
    }

    /// Looks up `ip_address` in a Domain database.
    pub fn domain(&self, ip_address: &str) -> Result<Domain, GeoIp2Error> {
        self.model("domain", "GeoIP2-Domain", ip_address)
    }

    /// Looks up `ip_address` in an ISP database.
    pub fn isp(&self, ip_address: &str) -> Result<Isp, GeoIp2Error> {
        self.model("isp", "GeoIP2-ISP", ip_address)
    }

    fn model<M: Model>(
        &self,
        method: &'static str,
        type_tag: &str,
        ip_address: &str,
    ) -> Result<M, GeoIp2Error> {
        let database_type = self.database.database_type();
        if !database_type.contains(type_tag) {
            return Err(GeoIp2Error::IncorrectDatabaseType {
                method,
                database_type: database_type.to_owned(),
            });
        }

        let ip: IpAddr = ip_address
            .parse()
            .map_err(|_| GeoIp2Error::invalid_ip(ip_address))?;
        debug!("{method} lookup of {ip} in {database_type} database");

        match self.database.lookup_prefix::<M>(ip)? {
            Some((record, prefix_len)) => models::build(record, &self.locales, Some((ip, prefix_len))),
            None => Err(GeoIp2Error::address_not_found(format!(
                "The address {ip_address} is not in the database."
            ))),
        }
    }
}
