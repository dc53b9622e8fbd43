pub use error::ProviderError;
pub use ip_api_com::IpApiCom;
pub use ip_sb::IpSb;
#[cfg(feature = "maxminddb")]
pub use ipinfo_local::{DatabaseLocator, IpInfoLocal};

mod error;
pub mod http;
pub mod ip_api_com;
pub mod ip_sb;
#[cfg(feature = "maxminddb")]
pub mod ipinfo_local;

use crate::result::GeoResult;

use enum_dispatch::enum_dispatch;
use hyper::http::uri::Uri;
use serde::Deserialize;
use std::net::IpAddr;
#[cfg(feature = "maxminddb")]
use std::path::PathBuf;
use std::time::Duration;

/// Per-call settings supplied by the caller
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    pub timeout: Duration,
    /// Access token for providers with a paid tier
    pub token: Option<String>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(2),
            token: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderDescriptor {
    pub name: &'static str,
    pub requires_network: bool,
    pub requires_token: bool,
    /// Accepts a per-deployment `base_uri`
    pub base_uri_override: bool,
}

/// Every provider compiled in, in default preference order
pub static DESCRIPTORS: &[ProviderDescriptor] = &[
    ip_api_com::DESCRIPTOR,
    ip_sb::DESCRIPTOR,
    #[cfg(feature = "maxminddb")]
    ipinfo_local::DESCRIPTOR,
];

pub fn descriptor(name: &str) -> Option<&'static ProviderDescriptor> {
    let name = name.trim();
    DESCRIPTORS
        .iter()
        .find(|descriptor| descriptor.name.eq_ignore_ascii_case(name))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "ProviderConfig")]
#[enum_dispatch]
pub enum Provider {
    IpApiCom(IpApiCom),
    IpSb(IpSb),
    #[cfg(feature = "maxminddb")]
    IpInfoLocal(IpInfoLocal),
}

impl Provider {
    pub fn name(&self) -> &'static str {
        self.descriptor().name
    }
}

#[enum_dispatch(Provider)]
pub trait GeoProvider: Send + Sync {
    fn resolve(
        &self,
        address: IpAddr,
        options: &ResolveOptions,
    ) -> Result<GeoResult, ProviderError>;

    fn descriptor(&self) -> &'static ProviderDescriptor;

    /// Whether this instance, as configured, cannot answer without an access token
    fn requires_token(&self) -> bool {
        self.descriptor().requires_token
    }
}

#[derive(Deserialize)]
#[serde(tag = "type")]
#[serde(deny_unknown_fields)]
enum ProviderConfig {
    #[serde(
        rename = "ip-api.com",
        alias = "ipapi",
        alias = "ip-api",
        alias = "ipapicom"
    )]
    IpApiCom {
        #[serde(
            default = "IpApiCom::default_base_uri",
            alias = "url",
            with = "http_serde::uri"
        )]
        base_uri: Uri,
    },
    #[serde(rename = "ip.sb", alias = "ipsb", alias = "ip-sb")]
    IpSb {
        #[serde(
            default = "IpSb::default_base_uri",
            alias = "url",
            with = "http_serde::uri"
        )]
        base_uri: Uri,
    },
    #[cfg(feature = "maxminddb")]
    #[serde(
        rename = "ipinfo-local",
        alias = "ipinfolocal",
        alias = "ipinfo_local",
        alias = "ipinfo"
    )]
    IpInfoLocal {
        #[serde(default)]
        path: Option<PathBuf>,
    },
}

impl TryFrom<ProviderConfig> for Provider {
    type Error = ProviderError;

    fn try_from(value: ProviderConfig) -> Result<Self, Self::Error> {
        match value {
            ProviderConfig::IpApiCom { base_uri } => Ok(IpApiCom::new(base_uri).into()),
            ProviderConfig::IpSb { base_uri } => Ok(IpSb::new(base_uri).into()),
            #[cfg(feature = "maxminddb")]
            ProviderConfig::IpInfoLocal { path } => Ok(IpInfoLocal::locate(path)?.into()),
        }
    }
}
