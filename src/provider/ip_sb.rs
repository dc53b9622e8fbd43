//! [ip.sb](https://ip.sb/api/) GeoIP endpoint.
//!
//! The endpoint sits behind Cloudflare, which answers non-browser clients with
//! an empty or unrelated body instead of an error status.

use super::http::{compose_uri, get};
use super::{GeoProvider, ProviderDescriptor, ProviderError, ResolveOptions};
use crate::result::{coordinate, text, GeoResult, RawGeo};

use hyper::http::uri::Uri;
use lazy_static::lazy_static;
use serde_json::Value;
use std::net::IpAddr;

pub const NAME: &str = "ip.sb";

pub const DESCRIPTOR: ProviderDescriptor = ProviderDescriptor {
    name: NAME,
    requires_network: true,
    requires_token: false,
    base_uri_override: true,
};

const FIELDS: [&str; 8] = [
    "asn",
    "country",
    "country_code",
    "region",
    "city",
    "isp",
    "latitude",
    "longitude",
];

lazy_static! {
    static ref IP_SB_URI: Uri = "https://api.ip.sb/geoip/".parse().unwrap();
}

#[derive(Debug, Clone)]
pub struct IpSb {
    base_uri: Uri,
}

impl Default for IpSb {
    fn default() -> Self {
        Self::new(Self::default_base_uri())
    }
}

impl IpSb {
    pub fn new(base_uri: Uri) -> Self {
        Self { base_uri }
    }

    pub fn default_base_uri() -> Uri {
        IP_SB_URI.clone()
    }

    pub fn base_uri(&self) -> &Uri {
        &self.base_uri
    }

    fn parse(body: &[u8]) -> Result<GeoResult, ProviderError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(ProviderError::EmptyResponse { provider: NAME });
        }
        let json: Value = serde_json::from_slice(body).map_err(|error| ProviderError::Format {
            provider: NAME,
            reason: error.to_string(),
        })?;
        if let Some(message) = json.get("message").and_then(Value::as_str) {
            return Err(ProviderError::UpstreamRejected {
                provider: NAME,
                reason: message.to_owned(),
            });
        }
        let country = text(&json["country"]);
        if country.is_empty() {
            let anything = FIELDS
                .iter()
                .filter_map(|field| json.get(field))
                .any(|value| !value.is_null());
            return Err(if anything {
                ProviderError::UpstreamRejected {
                    provider: NAME,
                    reason: "no country in response".to_owned(),
                }
            } else {
                ProviderError::EmptyResponse { provider: NAME }
            });
        }
        let country_code = text(&json["country_code"]);
        Ok(RawGeo {
            asn: text(&json["asn"]),
            country,
            country_code: (!country_code.is_empty()).then_some(country_code),
            province: text(&json["region"]),
            city: text(&json["city"]),
            district: String::new(),
            organization: text(&json["isp"]),
            latitude: coordinate(&json["latitude"]),
            longitude: coordinate(&json["longitude"]),
        }
        .into())
    }
}

impl GeoProvider for IpSb {
    fn resolve(
        &self,
        address: IpAddr,
        options: &ResolveOptions,
    ) -> Result<GeoResult, ProviderError> {
        let uri = compose_uri(&self.base_uri, &address.to_string())?;
        let (status, body) = get(uri, options.timeout).map_err(|error| {
            log::warn!("{NAME} request failed, consider another provider: {error}");
            error
        })?;
        if !status.is_success() {
            return Err(ProviderError::UpstreamRejected {
                provider: NAME,
                reason: format!("HTTP status {status}"),
            });
        }
        Self::parse(&body)
    }

    fn descriptor(&self) -> &'static ProviderDescriptor {
        &DESCRIPTOR
    }
}
