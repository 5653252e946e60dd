#![deny(trivial_casts, trivial_numeric_casts, unused_import_braces)]
//! # GeoIP2
//!
//! Typed, localized GeoIP2 data for an IP address, read from a local
//! MaxMind DB file or fetched from the GeoIP2 Precision web services.
//!
//! ## Features
//!
//! - **`mmap`** (default: disabled): Enable memory-mapped database access
//!   via the `unsafe` [`Reader::open_mmap`]; the file must not change while
//!   mapped
//! - **`http-client`** (default: disabled): Enable
//!   [`transport::ReqwestTransport`] and [`webservice::Client::new`], a
//!   blocking HTTPS transport for the web services
//!
//! ## Models
//!
//! Lookups return a model from [`models`]. Nested records are always
//! present: a record missing from the data is in its empty state, boolean
//! flags default to `false`, and every other field is an `Option`. Names
//! are resolved against the caller's [`Locales`] when the model is built,
//! so `country.country.name` is the name in the first preferred locale
//! that has one.
//!
//! ## Quick Start
//!
//! ```no_run
//! use geoip2::{Locales, Reader};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let locales = Locales::new(["fr", "en"])?;
//!     let reader = Reader::open_readfile("/path/to/GeoIP2-City.mmdb", locales)?;
//!
//!     let city = reader.city("81.2.69.160")?;
//!     println!("City: {}", city.city.name.as_deref().unwrap_or("Unknown"));
//!     println!("Network: {:?}", city.traits.network);
//!     Ok(())
//! }
//! ```
//!
//! ## Thread Safety
//!
//! Models, locales and a [`Reader`] over a `maxminddb::Reader` are `Send`
//! and `Sync`, so one reader can serve lookups from many threads.

mod database;
mod error;
mod locales;
pub mod models;
pub mod network;
mod reader;
pub mod records;
#[cfg(feature = "http-client")]
pub mod transport;
pub mod webservice;

pub use database::Database;
pub use error::GeoIp2Error;
pub use locales::{Locales, Names};
pub use models::Model;
pub use reader::Reader;

#[cfg(feature = "mmap")]
pub use maxminddb::Mmap;

#[cfg(test)]
mod reader_test;
