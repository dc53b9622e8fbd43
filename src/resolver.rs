use crate::address::parse_address;
use crate::config::Config;
use crate::geofeed::{GeoFeed, GeoFeedEntry, GeoFeedError};
use crate::provider::{GeoProvider, Provider, ProviderError, ResolveOptions};
use crate::result::{GeoResult, RawGeo};

use smallvec::SmallVec;
use std::fmt;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;

pub type ProviderVec = SmallVec<[Provider; 2]>;

#[derive(Debug)]
pub struct ProviderFailure {
    pub provider: &'static str,
    pub error: ProviderError,
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.provider, self.error)
    }
}

fn join_failures(failures: &[ProviderFailure]) -> String {
    failures
        .iter()
        .map(ProviderFailure::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error(r#""{0}" is not an IP address"#)]
    InvalidAddress(String),
    #[error("no providers are configured")]
    NoProviders,
    #[error("all providers failed: {}", join_failures(.0))]
    ProvidersFailed(Vec<ProviderFailure>),
}

impl From<&GeoFeedEntry> for RawGeo {
    fn from(entry: &GeoFeedEntry) -> Self {
        Self {
            asn: entry.asn.clone().unwrap_or_default(),
            country: entry.country.clone(),
            country_code: Some(entry.country.clone()),
            province: entry.region.clone(),
            city: entry.city.clone(),
            organization: entry.owner.clone().unwrap_or_default(),
            ..Default::default()
        }
    }
}

/// Geofeed first, then every provider in order until one answers
pub struct Resolver {
    geofeed_path: Option<PathBuf>,
    geofeed: RwLock<Option<Arc<GeoFeed>>>,
    providers: ProviderVec,
    options: ResolveOptions,
}

impl Resolver {
    pub fn new(
        geofeed_path: Option<PathBuf>,
        providers: impl IntoIterator<Item = Provider>,
        options: ResolveOptions,
    ) -> Self {
        let geofeed = Self::load_geofeed(geofeed_path.as_deref())
            .ok()
            .map(Arc::new);
        Self {
            geofeed_path,
            geofeed: RwLock::new(geofeed),
            providers: providers.into_iter().collect(),
            options,
        }
    }

    pub fn from_config(config: Config) -> Self {
        let Config {
            geofeed,
            timeout,
            token,
            providers,
            ..
        } = config;
        for provider in providers.iter() {
            log::info!("provider {} enabled", provider.name());
        }
        Self::new(
            geofeed,
            providers,
            ResolveOptions {
                timeout: timeout.into(),
                token,
            },
        )
    }

    fn load_geofeed(path: Option<&Path>) -> Result<GeoFeed, GeoFeedError> {
        GeoFeed::from_config(path).map_err(|error| {
            match &error {
                GeoFeedError::NotConfigured => log::debug!("{error}, skipping local overrides"),
                _ => log::warn!("{error}, skipping local overrides"),
            }
            error
        })
    }

    /// Load the geofeed again and swap it in. On failure the previous index stays
    pub fn reload_geofeed(&self) -> Result<(), GeoFeedError> {
        let geofeed = Arc::new(Self::load_geofeed(self.geofeed_path.as_deref())?);
        *self
            .geofeed
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(geofeed);
        Ok(())
    }

    pub fn geofeed(&self) -> Option<Arc<GeoFeed>> {
        self.geofeed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn providers(&self) -> &[Provider] {
        &self.providers
    }

    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    pub fn lookup_geofeed(&self, address: IpAddr) -> Option<GeoResult> {
        let geofeed = self.geofeed()?;
        let entry = geofeed.lookup_addr(address)?;
        log::debug!("{address} matched geofeed network {}", entry.network);
        Some(RawGeo::from(entry).into())
    }

    pub fn resolve(&self, ip: &str) -> Result<GeoResult, ResolveError> {
        let address = match parse_address(ip) {
            Some(address) => address,
            None => return Err(ResolveError::InvalidAddress(ip.to_owned())),
        };
        self.resolve_addr(address)
    }

    pub fn resolve_addr(&self, address: IpAddr) -> Result<GeoResult, ResolveError> {
        if let Some(result) = self.lookup_geofeed(address) {
            return Ok(result);
        }
        if self.providers.is_empty() {
            return Err(ResolveError::NoProviders);
        }
        let mut failures = vec![];
        for provider in self.providers.iter() {
            match provider.resolve(address, &self.options) {
                Ok(result) => return Ok(result),
                Err(error) => {
                    log::warn!("{} failed for {address}: {error}", provider.name());
                    failures.push(ProviderFailure {
                        provider: provider.name(),
                        error,
                    });
                }
            }
        }
        Err(ResolveError::ProvidersFailed(failures))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::http::test_server::{refused, response, serve_once};
    use crate::provider::{IpApiCom, IpSb};
    use std::io::Write;
    use std::time::Duration;

    const IP_API_COM_BODY: &str = r#"{
        "status": "success",
        "country": "Hong Kong",
        "regionName": "Kowloon",
        "city": "Hong Kong",
        "district": "",
        "isp": "HKBN",
        "as": "AS9269 Hong Kong Broadband Network Ltd.",
        "lat": 22.3,
        "lon": 114.2
    }"#;

    fn options() -> ResolveOptions {
        ResolveOptions {
            timeout: Duration::from_secs(5),
            token: None,
        }
    }

    fn geofeed_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn resolver_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Resolver>();
    }

    #[test]
    fn geofeed_wins() {
        let file = geofeed_file(
            "192.0.2.0/24,US-CA,US,Mountain View\n\
             192.0.2.128/25,US-CA,US,Los Angeles,AS64500,Example Net\n",
        );
        let provider = IpApiCom::new(refused("/json/"));
        let resolver = Resolver::new(
            Some(file.path().to_owned()),
            [Provider::from(provider)],
            options(),
        );
        let result = resolver.resolve("192.0.2.130").unwrap();
        assert_eq!(
            result,
            GeoResult {
                as_number: "64500".into(),
                country: "United States".into(),
                province: "US-CA".into(),
                city: "Los Angeles".into(),
                district: "".into(),
                organization: "Example Net".into(),
                latitude: 0.0,
                longitude: 0.0,
            }
        );
        assert_eq!(
            resolver.resolve("::ffff:192.0.2.1").unwrap().city,
            "Mountain View"
        );
    }

    #[test]
    fn geofeed_territory_is_normalized() {
        let file = geofeed_file("203.0.113.0/24,HK-KKC,HK,Kowloon City\n");
        let resolver = Resolver::new(Some(file.path().to_owned()), [], options());
        let address = "203.0.113.9".parse().unwrap();
        let result = resolver.lookup_geofeed(address).unwrap();
        assert_eq!(result.country, "China");
        assert_eq!(result.province, "Hong Kong");
        assert_eq!(result.district, "HK-KKC Kowloon City");
    }

    #[test]
    fn falls_back_in_order() {
        let (base, server) = serve_once("/json/", response("200 OK", IP_API_COM_BODY));
        let resolver = Resolver::new(
            None,
            [
                Provider::from(IpSb::new(refused("/geoip/"))),
                IpApiCom::new(base).into(),
            ],
            options(),
        );
        let result = resolver.resolve(" 198.51.100.7 ").unwrap();
        assert_eq!(result.country, "China");
        assert_eq!(result.province, "Hong Kong");
        assert_eq!(result.district, "Kowloon");
        let request = server.join().unwrap();
        assert!(request.starts_with("GET /json/198.51.100.7?"));
    }

    #[test]
    fn all_providers_fail() {
        let (base, _server) = serve_once(
            "/json/",
            response("200 OK", r#"{"status": "fail", "message": "reserved"}"#),
        );
        let resolver = Resolver::new(
            None,
            [
                Provider::from(IpSb::new(refused("/geoip/"))),
                IpApiCom::new(base).into(),
            ],
            options(),
        );
        match resolver.resolve("10.0.0.1") {
            Err(ResolveError::ProvidersFailed(failures)) => {
                assert_eq!(failures.len(), 2);
                assert_eq!(failures[0].provider, "ip.sb");
                assert!(failures[0].error.is_retryable());
                assert_eq!(failures[1].provider, "ip-api.com");
                assert!(matches!(
                    failures[1].error,
                    ProviderError::UpstreamRejected { .. }
                ));
                let message = ResolveError::ProvidersFailed(failures).to_string();
                assert!(message.contains("reserved"), "{message}");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn invalid_address_and_no_providers() {
        let resolver = Resolver::new(None, [], options());
        assert!(matches!(
            resolver.resolve("not-an-ip"),
            Err(ResolveError::InvalidAddress(s)) if s == "not-an-ip"
        ));
        assert!(matches!(
            resolver.resolve("192.0.2.1"),
            Err(ResolveError::NoProviders)
        ));
    }

    #[test]
    fn broken_geofeed_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = Resolver::new(Some(dir.path().join("missing.csv")), [], options());
        assert!(resolver.geofeed().is_none());
        let address = "192.0.2.1".parse().unwrap();
        assert!(resolver.lookup_geofeed(address).is_none());
        assert!(matches!(
            resolver.reload_geofeed(),
            Err(GeoFeedError::Open { .. })
        ));

        let unconfigured = Resolver::new(None, [], options());
        assert!(matches!(
            unconfigured.reload_geofeed(),
            Err(GeoFeedError::NotConfigured)
        ));
    }

    #[test]
    fn reload_replaces_index() {
        let file = geofeed_file("192.0.2.0/24,US-CA,US,Mountain View\n");
        let resolver = Resolver::new(Some(file.path().to_owned()), [], options());
        let before = resolver.geofeed().unwrap();

        std::fs::write(file.path(), "192.0.2.0/24,DE-HE,DE,Frankfurt am Main\n").unwrap();
        resolver.reload_geofeed().unwrap();
        assert_eq!(
            resolver.resolve("192.0.2.1").unwrap().city,
            "Frankfurt am Main"
        );
        // readers holding the old index are unaffected
        assert_eq!(before.lookup("192.0.2.1").unwrap().city, "Mountain View");

        std::fs::remove_file(file.path()).unwrap();
        assert!(resolver.reload_geofeed().is_err());
        assert_eq!(resolver.resolve("192.0.2.1").unwrap().country, "Germany");
    }

    #[test]
    fn from_config() {
        let config = crate::config::parse_config_str(
            r#"
            timeout = 300
            token = "secret"
            [[providers]]
            type = "ip.sb"
            "#,
        )
        .unwrap();
        let resolver = Resolver::from_config(config);
        assert_eq!(resolver.providers().len(), 1);
        assert_eq!(resolver.options().timeout, Duration::from_millis(300));
        assert_eq!(resolver.options().token.as_deref(), Some("secret"));
        assert!(resolver.geofeed().is_none());
    }
}
