//! Error types for GeoIP2 lookups.

use std::io;

use ipnetwork::IpNetworkError;
use maxminddb::MaxMindDbError;
use thiserror::Error;

/// Error returned by database and web service lookups.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum GeoIp2Error {
    /// The address is not in the database, or the web service reported it
    /// as not found or reserved.
    #[error("{message}")]
    AddressNotFound {
        /// Description including the address that was looked up.
        message: String,
    },

    /// The caller supplied something unusable: an unparsable address, an
    /// address of the wrong family for the database, an empty locale list,
    /// or an out of range prefix length.
    #[error("{message}")]
    InvalidArgument {
        /// Description of what is invalid.
        message: String,
    },

    /// The web service rejected the account ID or license key.
    #[error("{message}")]
    Authentication {
        /// Error code reported by the web service.
        code: String,
        /// Message reported by the web service.
        message: String,
    },

    /// The account has run out of queries.
    #[error("{message}")]
    OutOfQueries {
        /// Error code reported by the web service.
        code: String,
        /// Message reported by the web service.
        message: String,
    },

    /// The web service returned an unexpected or unusable HTTP response, or
    /// the request never completed (status 0).
    #[error("{message}")]
    Http {
        /// Description of the failure.
        message: String,
        /// HTTP status of the response.
        status: u16,
        /// URI of the request.
        uri: String,
        /// Error code from the response body, if it contained one.
        code: Option<String>,
    },

    /// The response could not be turned into a model.
    #[error("{message}")]
    Generic {
        /// Description of the failure.
        message: String,
    },

    /// A reader method was called on a database of another type.
    #[error("The {method} method cannot be used to open a {database_type} database")]
    IncorrectDatabaseType {
        /// Name of the reader method.
        method: &'static str,
        /// Type reported by the database metadata.
        database_type: String,
    },

    /// The database is corrupt or a record could not be decoded.
    #[error("{message}")]
    InvalidDatabase {
        /// Description reported by the database reader.
        message: String,
    },

    /// An I/O error occurred while opening the database.
    #[error("i/o error: {0}")]
    Io(
        #[from]
        #[source]
        io::Error,
    ),
}

impl GeoIp2Error {
    /// Creates an AddressNotFound error.
    pub fn address_not_found(message: impl Into<String>) -> Self {
        GeoIp2Error::AddressNotFound {
            message: message.into(),
        }
    }

    /// Creates an InvalidArgument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        GeoIp2Error::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates an InvalidArgument error for an address that does not parse.
    pub fn invalid_ip(ip_address: &str) -> Self {
        GeoIp2Error::invalid_argument(format!(
            "The value \"{ip_address}\" is not a valid IP address"
        ))
    }

    /// Creates a Generic error.
    pub fn generic(message: impl Into<String>) -> Self {
        GeoIp2Error::Generic {
            message: message.into(),
        }
    }

    /// Creates an Http error without a service error code.
    pub fn http(message: impl Into<String>, status: u16, uri: impl Into<String>) -> Self {
        GeoIp2Error::Http {
            message: message.into(),
            status,
            uri: uri.into(),
            code: None,
        }
    }

    /// Returns the HTTP status for errors raised from a web service response.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            GeoIp2Error::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<MaxMindDbError> for GeoIp2Error {
    fn from(err: MaxMindDbError) -> Self {
        match err {
            MaxMindDbError::InvalidInput { message } => GeoIp2Error::InvalidArgument { message },
            MaxMindDbError::Io(err) => GeoIp2Error::Io(err),
            other => GeoIp2Error::InvalidDatabase {
                message: other.to_string(),
            },
        }
    }
}

impl From<IpNetworkError> for GeoIp2Error {
    fn from(err: IpNetworkError) -> Self {
        GeoIp2Error::invalid_argument(format!("invalid network: {err}"))
    }
}

impl From<serde_json::Error> for GeoIp2Error {
    fn from(err: serde_json::Error) -> Self {
        GeoIp2Error::generic(format!("unable to decode record: {err}"))
    }
}
