use super::{GeoProvider, ProviderDescriptor, ProviderError, ResolveOptions};
use crate::result::{GeoResult, RawGeo};

use maxminddb::{MaxMindDBError, Reader};
use serde::Deserialize;
use std::env;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

pub const NAME: &str = "ipinfo-local";

pub const DESCRIPTOR: ProviderDescriptor = ProviderDescriptor {
    name: NAME,
    requires_network: false,
    requires_token: false,
    base_uri_override: false,
};

pub const DATABASE_FILE_NAME: &str = "ipinfo_lite.mmdb";

/// Overrides the search when the config has no explicit `path`
pub const PATH_ENV: &str = "HOPGEO_IPINFO_LOCAL_PATH";

#[cfg(not(windows))]
const SHARE_DIRS: [&str; 2] = ["/usr/local/share/hopgeo/", "/usr/share/hopgeo/"];
#[cfg(windows)]
const SHARE_DIRS: [&str; 0] = [];

/// Finds the database file: an explicit path, if any, is final; otherwise the
/// first directory holding [DATABASE_FILE_NAME] wins.
#[derive(Debug, Clone)]
pub struct DatabaseLocator {
    explicit: Option<PathBuf>,
    search_dirs: Vec<PathBuf>,
}

impl DatabaseLocator {
    pub fn new(explicit: Option<PathBuf>, search_dirs: Vec<PathBuf>) -> Self {
        Self {
            explicit,
            search_dirs,
        }
    }

    /// `explicit` falls back to [PATH_ENV]; the search covers the working
    /// directory, the executable's directory and the shared data directories
    pub fn from_environment(explicit: Option<PathBuf>) -> Self {
        let explicit = explicit.or_else(|| {
            env::var_os(PATH_ENV)
                .filter(|value| !value.is_empty())
                .map(PathBuf::from)
        });
        let mut search_dirs = vec![];
        if let Ok(current) = env::current_dir() {
            search_dirs.push(current);
        }
        if let Some(exe_dir) = env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
        {
            search_dirs.push(exe_dir);
        }
        search_dirs.extend(SHARE_DIRS.iter().map(PathBuf::from));
        Self::new(explicit, search_dirs)
    }

    pub fn locate(&self) -> Result<PathBuf, ProviderError> {
        if let Some(explicit) = &self.explicit {
            return if explicit.is_file() {
                Ok(explicit.clone())
            } else {
                Err(ProviderError::ExplicitPathMissing(explicit.clone()))
            };
        }
        self.search_dirs
            .iter()
            .map(|dir| dir.join(DATABASE_FILE_NAME))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| ProviderError::DatabaseNotFound {
                file_name: DATABASE_FILE_NAME,
                searched: self.search_dirs.clone(),
            })
    }
}

/// ipinfo "lite" record layout
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct IpInfoRecord {
    country: String,
    country_name: String,
    asn: String,
    as_name: String,
}

impl From<IpInfoRecord> for RawGeo {
    fn from(record: IpInfoRecord) -> Self {
        Self {
            asn: record.asn,
            country: record.country_name,
            country_code: (!record.country.is_empty()).then_some(record.country),
            organization: record.as_name,
            ..Default::default()
        }
    }
}

/// Local ipinfo database, opened for every lookup and closed right after it
#[derive(Debug, Clone)]
pub struct IpInfoLocal {
    path: PathBuf,
}

impl IpInfoLocal {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Resolve the database location once, see [DatabaseLocator::from_environment]
    pub fn locate(explicit: Option<PathBuf>) -> Result<Self, ProviderError> {
        let path = DatabaseLocator::from_environment(explicit).locate()?;
        log::info!("using {NAME} database {}", path.display());
        Ok(Self::new(path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl GeoProvider for IpInfoLocal {
    fn resolve(&self, address: IpAddr, _: &ResolveOptions) -> Result<GeoResult, ProviderError> {
        let reader =
            Reader::open_readfile(&self.path).map_err(|error| ProviderError::DatabaseOpen {
                path: self.path.clone(),
                error,
            })?;
        let record: IpInfoRecord = reader.lookup(address).map_err(|error| match error {
            MaxMindDBError::AddressNotFoundError(_) => ProviderError::LookupMiss(address),
            error => ProviderError::Format {
                provider: NAME,
                reason: error.to_string(),
            },
        })?;
        Ok(RawGeo::from(record).into())
    }

    fn descriptor(&self) -> &'static ProviderDescriptor {
        &DESCRIPTOR
    }
}
