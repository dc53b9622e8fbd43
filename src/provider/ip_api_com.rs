//! [ip-api.com](https://ip-api.com) JSON endpoint.

use super::http::{compose_uri, get};
use super::{GeoProvider, ProviderDescriptor, ProviderError, ResolveOptions};
use crate::result::{coordinate, text, GeoResult, RawGeo};

use hyper::http::uri::Uri;
use lazy_static::lazy_static;
use serde_json::Value;
use std::net::IpAddr;

pub const NAME: &str = "ip-api.com";

pub const DESCRIPTOR: ProviderDescriptor = ProviderDescriptor {
    name: NAME,
    requires_network: true,
    requires_token: false,
    base_uri_override: true,
};

const FIELDS: [&str; 10] = [
    "status",
    "message",
    "country",
    "regionName",
    "city",
    "isp",
    "district",
    "as",
    "lat",
    "lon",
];

/// The paid endpoint answers 403 to requests without `key`
const PRO_HOST: &str = "pro.ip-api.com";

lazy_static! {
    static ref IP_API_COM_URI: Uri = "http://ip-api.com/json/".parse().unwrap();
}

#[derive(Debug, Clone)]
pub struct IpApiCom {
    base_uri: Uri,
}

impl Default for IpApiCom {
    fn default() -> Self {
        Self::new(Self::default_base_uri())
    }
}

impl IpApiCom {
    pub fn new(base_uri: Uri) -> Self {
        Self { base_uri }
    }

    pub fn default_base_uri() -> Uri {
        IP_API_COM_URI.clone()
    }

    pub fn base_uri(&self) -> &Uri {
        &self.base_uri
    }

    fn uri(&self, address: IpAddr, token: Option<&str>) -> Result<Uri, ProviderError> {
        let mut path_and_query = format!("{address}?fields={}", FIELDS.join(","));
        // the paid endpoint authenticates with a key parameter
        if let Some(token) = token {
            path_and_query.push_str("&key=");
            path_and_query.push_str(&urlencoding::encode(token));
        }
        Ok(compose_uri(&self.base_uri, &path_and_query)?)
    }

    fn parse(body: &[u8]) -> Result<GeoResult, ProviderError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(ProviderError::EmptyResponse { provider: NAME });
        }
        let json: Value = serde_json::from_slice(body).map_err(|error| ProviderError::Format {
            provider: NAME,
            reason: error.to_string(),
        })?;
        if !FIELDS
            .iter()
            .filter_map(|field| json.get(field))
            .any(|value| !value.is_null())
        {
            return Err(ProviderError::EmptyResponse { provider: NAME });
        }
        if json["status"].as_str() != Some("success") {
            // "message" is "private range", "reserved range", "invalid query" or a quota notice
            let reason = json["message"]
                .as_str()
                .or_else(|| json["status"].as_str())
                .unwrap_or("no status in response");
            return Err(ProviderError::UpstreamRejected {
                provider: NAME,
                reason: reason.to_owned(),
            });
        }
        Ok(RawGeo {
            asn: text(&json["as"]),
            country: text(&json["country"]),
            country_code: None,
            province: text(&json["regionName"]),
            city: text(&json["city"]),
            district: text(&json["district"]),
            organization: text(&json["isp"]),
            latitude: coordinate(&json["lat"]),
            longitude: coordinate(&json["lon"]),
        }
        .into())
    }
}

impl GeoProvider for IpApiCom {
    fn resolve(
        &self,
        address: IpAddr,
        options: &ResolveOptions,
    ) -> Result<GeoResult, ProviderError> {
        let uri = self.uri(address, options.token.as_deref())?;
        let (status, body) = get(uri, options.timeout).map_err(|error| {
            log::warn!("{NAME} request failed, consider another provider: {error}");
            error
        })?;
        // throttled clients get 429 with an empty body
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

    fn requires_token(&self) -> bool {
        self.base_uri
            .host()
            .map_or(false, |host| host.eq_ignore_ascii_case(PRO_HOST))
    }
}
