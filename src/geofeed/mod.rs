//! Local CIDR-to-location overrides.
//!
//! A geofeed is a comma separated table with rows of the form
//! `CIDR,region,country,city` or `CIDR,region,country,city,asn,owner[,...]`.
//! Rows that do not match either shape, or whose CIDR does not parse, are skipped
//! at load time. Lookups return the most specific network containing the address.

mod error;
pub mod network;

pub use error::{GeoFeedError, GeoFeedFileError};
pub use network::{CidrError, Network};

use crate::address::{parse_address, CanonicalIpAddr};

use std::cmp::Reverse;
use std::io::Read;
use std::net::IpAddr;
use std::path::Path;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeoFeedEntry {
    pub network: Network,
    /// ISO 3166-2 subdivision code
    pub region: String,
    /// ISO 3166-1 alpha-2 code
    pub country: String,
    pub city: String,
    pub asn: Option<String>,
    pub owner: Option<String>,
}

#[derive(Error, Debug)]
enum RowError {
    #[error("field {0} is not valid UTF-8")]
    Utf8(usize),
    #[error("row has {0} fields, expected 4 or at least 6")]
    Length(usize),
    #[error(r#"network "{cidr}" is invalid: {error}"#)]
    Cidr { cidr: String, error: CidrError },
}

impl GeoFeedEntry {
    fn from_record(record: &csv::StringRecord) -> Result<Self, RowError> {
        let optional = |s: &str| Some(s.to_owned()).filter(|s| !s.is_empty());
        let (asn, owner) = match record.len() {
            4 => (None, None),
            len if len >= 6 => (optional(&record[4]), optional(&record[5])),
            len => return Err(RowError::Length(len)),
        };
        let network = record[0].parse().map_err(|error| RowError::Cidr {
            cidr: record[0].to_owned(),
            error,
        })?;
        Ok(Self {
            network,
            region: record[1].to_owned(),
            country: record[2].to_owned(),
            city: record[3].to_owned(),
            asn,
            owner,
        })
    }
}

/// Immutable geofeed index. Each address family is kept separately, ordered by
/// prefix length from the longest to the shortest.
#[derive(Clone, Debug, Default)]
pub struct GeoFeed {
    ipv4: Vec<GeoFeedEntry>,
    ipv6: Vec<GeoFeedEntry>,
    skipped: usize,
}

impl GeoFeed {
    pub fn from_config(path: Option<&Path>) -> Result<Self, GeoFeedError> {
        Self::from_file(path.ok_or(GeoFeedError::NotConfigured)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, GeoFeedError> {
        let file = std::fs::File::open(path).map_err(|error| GeoFeedError::Open {
            path: path.to_owned(),
            error,
        })?;
        let geofeed = Self::from_reader(file).map_err(|error| GeoFeedError::File {
            path: path.to_owned(),
            error,
        })?;
        log::info!(
            r#"geofeed "{}" loaded: {} networks, {} rows skipped"#,
            path.display(),
            geofeed.len(),
            geofeed.skipped()
        );
        Ok(geofeed)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, GeoFeedFileError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .comment(Some(b'#'))
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut ipv4 = vec![];
        let mut ipv6 = vec![];
        let mut skipped = 0;
        for record in csv_reader.byte_records() {
            let record = record?;
            let line = record.position().map(csv::Position::line);
            // a row that is not valid UTF-8 is dropped like any other bad row
            let parsed = csv::StringRecord::from_byte_record(record)
                .map_err(|error| RowError::Utf8(error.utf8_error().field()))
                .and_then(|record| GeoFeedEntry::from_record(&record));
            match parsed {
                Ok(entry) if entry.network.is_ipv4() => ipv4.push(entry),
                Ok(entry) => ipv6.push(entry),
                Err(error) => {
                    skipped += 1;
                    log::debug!("skipping geofeed row at line {line:?}: {error}");
                }
            }
        }
        // sort_by_key is stable, equally specific networks keep file order
        ipv4.sort_by_key(|entry| Reverse(entry.network.prefix_len()));
        ipv6.sort_by_key(|entry| Reverse(entry.network.prefix_len()));

        Ok(Self {
            ipv4,
            ipv6,
            skipped,
        })
    }

    /// Never fails: an unparsable address is simply not found.
    pub fn lookup(&self, ip: &str) -> Option<&GeoFeedEntry> {
        self.lookup_addr(parse_address(ip)?)
    }

    pub fn lookup_addr(&self, address: IpAddr) -> Option<&GeoFeedEntry> {
        let address = address.to_canonical_ip();
        let entries = match address {
            IpAddr::V4(_) => &self.ipv4,
            IpAddr::V6(_) => &self.ipv6,
        };
        entries.iter().find(|entry| entry.network.contains(address))
    }

    pub fn entries(&self) -> impl Iterator<Item = &GeoFeedEntry> {
        self.ipv4.iter().chain(self.ipv6.iter())
    }

    pub fn len(&self) -> usize {
        self.ipv4.len() + self.ipv6.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ipv4.is_empty() && self.ipv6.is_empty()
    }

    /// Number of rows dropped while loading
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}
