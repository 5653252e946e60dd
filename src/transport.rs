//! Blocking HTTPS transport built on `reqwest`.

use reqwest::blocking;
use reqwest::header::CONTENT_TYPE;

use crate::error::GeoIp2Error;
use crate::webservice::{transport_error, ClientOptions, Request, Response, Transport};

/// Sends web service requests with a blocking `reqwest` client.
///
/// Connection settings (connect timeout and proxy) come from the
/// [`ClientOptions`] it was built from. The per-request timeout travels
/// with each [`Request`].
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: blocking::Client,
}

impl ReqwestTransport {
    /// Builds the underlying HTTP client.
    pub fn from_options(options: &ClientOptions) -> Result<Self, GeoIp2Error> {
        let mut builder = blocking::Client::builder();
        if let Some(timeout) = options.connect_timeout() {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(proxy) = options.proxy() {
            let proxy = reqwest::Proxy::all(proxy).map_err(|e| {
                GeoIp2Error::invalid_argument(format!("invalid proxy {proxy}: {e}"))
            })?;
            builder = builder.proxy(proxy);
        }
        let client = builder.build().map_err(|e| {
            GeoIp2Error::invalid_argument(format!("unable to build HTTP client: {e}"))
        })?;
        Ok(ReqwestTransport { client })
    }
}

impl Transport for ReqwestTransport {
    fn get(&self, request: &Request) -> Result<Response, GeoIp2Error> {
        let mut builder = self.client.get(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder
            .send()
            .map_err(|e| transport_error(&request.url, e))?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let body = response
            .bytes()
            .map_err(|e| transport_error(&request.url, e))?
            .to_vec();

        Ok(Response {
            status,
            content_type,
            body,
        })
    }
}
