//! Client for the GeoIP2 Precision web services.
//!
//! The client builds requests and classifies responses; sending them is left
//! to a [`Transport`]. With the `http-client` feature,
//! [`ReqwestTransport`](crate::transport::ReqwestTransport) provides a
//! blocking HTTPS transport and [`Client::new`] uses it.

use std::net::IpAddr;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use log::{debug, warn};
use serde::Deserialize;

use crate::error::GeoIp2Error;
use crate::locales::Locales;
use crate::models::{City, Country, Insights, Model};

/// Default web service host.
pub const DEFAULT_HOST: &str = "geoip.maxmind.com";

/// Value sent in the `User-Agent` header.
pub fn user_agent() -> String {
    format!("GeoIP2-Rust/{}", env!("CARGO_PKG_VERSION"))
}

/// An HTTP GET request ready to be sent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    /// Full request URL.
    pub url: String,
    /// Header name/value pairs.
    pub headers: Vec<(String, String)>,
    /// Timeout for the whole request.
    pub timeout: Option<Duration>,
}

/// The parts of an HTTP response the client looks at.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Value of the `Content-Type` header, if any.
    pub content_type: Option<String>,
    /// Response body.
    pub body: Vec<u8>,
}

/// Sends requests for a [`Client`].
///
/// Failing to get any response should be reported as
/// [`GeoIp2Error::Http`] with status 0, e.g. via [`transport_error`].
pub trait Transport {
    /// Sends a GET request and returns the response, whatever its status.
    fn get(&self, request: &Request) -> Result<Response, GeoIp2Error>;
}

/// Builds the error for a request that never got a response.
pub fn transport_error(uri: &str, err: impl std::fmt::Display) -> GeoIp2Error {
    GeoIp2Error::http(format!("Unable to contact {uri}: {err}"), 0, uri)
}

/// Configuration for a [`Client`].
///
/// ```
/// use std::time::Duration;
/// use geoip2::webservice::ClientOptions;
///
/// let options = ClientOptions::default()
///     .with_host("geolite.info")
///     .with_timeout(Duration::from_secs(5));
/// assert_eq!(options.host(), "geolite.info");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientOptions {
    host: String,
    locales: Locales,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    proxy: Option<String>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        ClientOptions {
            host: DEFAULT_HOST.to_owned(),
            locales: Locales::default(),
            timeout: None,
            connect_timeout: None,
            proxy: None,
        }
    }
}

impl ClientOptions {
    /// Host to send requests to. Use `"geolite.info"` for the GeoLite2 web
    /// service and `"sandbox.maxmind.com"` for the sandbox.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Locales used to resolve names in responses.
    pub fn with_locales(mut self, locales: Locales) -> Self {
        self.locales = locales;
        self
    }

    /// Timeout for a whole request.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Timeout for establishing a connection.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Proxy URL, e.g. `"http://proxy.example:3128"`.
    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn locales(&self) -> &Locales {
        &self.locales
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
    }

    pub fn proxy(&self) -> Option<&str> {
        self.proxy.as_deref()
    }
}

#[derive(Clone, Copy, Debug)]
enum Service {
    Country,
    City,
    Insights,
}

impl Service {
    fn path(self) -> &'static str {
        match self {
            Service::Country => "country",
            Service::City => "city",
            Service::Insights => "insights",
        }
    }

    fn name(self) -> &'static str {
        match self {
            Service::Country => "GeoIP2 Country",
            Service::City => "GeoIP2 City",
            Service::Insights => "GeoIP2 Insights",
        }
    }
}

/// Error document returned by the web service with 4xx responses.
#[derive(Deserialize)]
struct ErrorBody {
    code: Option<String>,
    error: Option<String>,
}

/// Client for the GeoIP2 Country, City and Insights web services.
///
/// ```
/// use geoip2::webservice::{Client, ClientOptions, Request, Response, Transport};
/// use geoip2::GeoIp2Error;
///
/// struct Canned;
///
/// impl Transport for Canned {
///     fn get(&self, _: &Request) -> Result<Response, GeoIp2Error> {
///         Ok(Response {
///             status: 200,
///             content_type: Some("application/vnd.maxmind.com-country+json".to_owned()),
///             body: br#"{"country":{"iso_code":"US"},"traits":{"ip_address":"1.2.3.4","network":"1.2.3.0/24"}}"#.to_vec(),
///         })
///     }
/// }
///
/// let client = Client::with_transport(42, "abcdef123456", ClientOptions::default(), Canned);
/// let country = client.country("1.2.3.4").unwrap();
/// assert_eq!(country.country.iso_code.as_deref(), Some("US"));
/// ```
#[derive(Debug)]
pub struct Client<T> {
    account_id: u32,
    license_key: String,
    options: ClientOptions,
    transport: T,
}

#[cfg(feature = "http-client")]
impl Client<crate::transport::ReqwestTransport> {
    /// Creates a client that sends requests with `reqwest`.
    pub fn new(
        account_id: u32,
        license_key: impl Into<String>,
        options: ClientOptions,
    ) -> Result<Self, GeoIp2Error> {
        let transport = crate::transport::ReqwestTransport::from_options(&options)?;
        Ok(Client::with_transport(account_id, license_key, options, transport))
    }
}

impl<T: Transport> Client<T> {
    /// Creates a client that sends requests through `transport`.
    pub fn with_transport(
        account_id: u32,
        license_key: impl Into<String>,
        options: ClientOptions,
        transport: T,
    ) -> Self {
        Client {
            account_id,
            license_key: license_key.into(),
            options,
            transport,
        }
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Calls the GeoIP2 Country endpoint. Pass `"me"` to look up the
    /// address the request comes from.
    pub fn country(&self, ip_address: &str) -> Result<Country, GeoIp2Error> {
        self.response_for(Service::Country, ip_address)
    }

    /// Calls the GeoIP2 City endpoint. Pass `"me"` to look up the address
    /// the request comes from.
    pub fn city(&self, ip_address: &str) -> Result<City, GeoIp2Error> {
        self.response_for(Service::City, ip_address)
    }

    /// Calls the GeoIP2 Insights endpoint. Pass `"me"` to look up the
    /// address the request comes from.
    pub fn insights(&self, ip_address: &str) -> Result<Insights, GeoIp2Error> {
        self.response_for(Service::Insights, ip_address)
    }

    fn response_for<M: Model>(&self, service: Service, ip_address: &str) -> Result<M, GeoIp2Error> {
        let request = self.request(service, ip_address)?;
        debug!("requesting {}", request.url);
        let response = self.transport.get(&request)?;
        handle_response(service, &request.url, response, &self.options.locales)
    }

    fn request(&self, service: Service, ip_address: &str) -> Result<Request, GeoIp2Error> {
        if ip_address != "me" && ip_address.parse::<IpAddr>().is_err() {
            return Err(GeoIp2Error::invalid_ip(ip_address));
        }
        let url = format!(
            "https://{}/geoip/v2.1/{}/{}",
            self.options.host,
            service.path(),
            ip_address
        );
        let credentials = B64.encode(format!("{}:{}", self.account_id, self.license_key));
        Ok(Request {
            url,
            headers: vec![
                ("Authorization".to_owned(), format!("Basic {credentials}")),
                ("Accept".to_owned(), "application/json".to_owned()),
                ("User-Agent".to_owned(), user_agent()),
            ],
            timeout: self.options.timeout,
        })
    }
}

fn handle_response<M: Model>(
    service: Service,
    uri: &str,
    response: Response,
    locales: &Locales,
) -> Result<M, GeoIp2Error> {
    let status = response.status;
    match status {
        200 => handle_success(service, &response.body, locales),
        400..=499 => Err(handle_4xx(service, uri, &response)),
        500..=599 => Err(GeoIp2Error::http(
            format!("Received a server error ({status}) for {}", service.name()),
            status,
            uri,
        )),
        _ => Err(GeoIp2Error::http(
            format!(
                "Received an unexpected HTTP status ({status}) for {}",
                service.name()
            ),
            status,
            uri,
        )),
    }
}

fn handle_success<M: Model>(
    service: Service,
    body: &[u8],
    locales: &Locales,
) -> Result<M, GeoIp2Error> {
    if body.is_empty() {
        return Err(GeoIp2Error::generic(format!(
            "Received a 200 response for {} but did not receive a HTTP body.",
            service.name()
        )));
    }
    let mut deserializer = serde_json::Deserializer::from_slice(body);
    M::from_raw(&mut deserializer, locales)
        .and_then(|model| {
            deserializer.end()?;
            Ok(model)
        })
        .map_err(|e| {
            GeoIp2Error::generic(format!(
                "Received a 200 response for {} but could not decode the response as JSON: {e}",
                service.name()
            ))
        })
}

fn handle_4xx(service: Service, uri: &str, response: &Response) -> GeoIp2Error {
    let status = response.status;
    let body = String::from_utf8_lossy(&response.body);
    if body.is_empty() {
        return GeoIp2Error::http(
            format!("Received a {status} error for {} with no body", service.name()),
            status,
            uri,
        );
    }

    let is_json = response
        .content_type
        .as_deref()
        .is_some_and(|content_type| content_type.contains("json"));
    if !is_json {
        return GeoIp2Error::http(
            format!(
                "Received a {status} error for {} with the following body: {body}",
                service.name()
            ),
            status,
            uri,
        );
    }

    let error_body: ErrorBody = match serde_json::from_str(&body) {
        Ok(error_body) => error_body,
        Err(e) => {
            return GeoIp2Error::http(
                format!(
                    "Received a {status} error for {} but could not decode the response as JSON: {e}. Body: {body}",
                    service.name()
                ),
                status,
                uri,
            );
        }
    };

    let (Some(code), Some(message)) = (error_body.code, error_body.error) else {
        warn!("{} error response without code or error: {body}", service.name());
        return GeoIp2Error::generic(format!(
            "Error response contains JSON but it does not specify code or error keys: {body}"
        ));
    };
    classify_error(code, message, status, uri)
}

fn classify_error(code: String, message: String, status: u16, uri: &str) -> GeoIp2Error {
    match code.as_str() {
        "IP_ADDRESS_NOT_FOUND" | "IP_ADDRESS_RESERVED" => GeoIp2Error::AddressNotFound { message },
        "ACCOUNT_ID_REQUIRED"
        | "ACCOUNT_ID_UNKNOWN"
        | "AUTHORIZATION_INVALID"
        | "LICENSE_KEY_REQUIRED"
        | "USER_ID_REQUIRED"
        | "USER_ID_UNKNOWN" => GeoIp2Error::Authentication { code, message },
        "INSUFFICIENT_FUNDS" | "OUT_OF_QUERIES" => GeoIp2Error::OutOfQueries { code, message },
        _ => GeoIp2Error::Http {
            message,
            status,
            uri: uri.to_owned(),
            code: Some(code),
        },
    }
}
