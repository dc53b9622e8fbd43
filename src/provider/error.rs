#[cfg(feature = "maxminddb")]
use maxminddb::MaxMindDBError;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Network(#[from] hyper::Error),
    #[error("cannot build request: {0}")]
    Request(#[from] hyper::http::Error),
    #[error("cannot start HTTP runtime: {0}")]
    Runtime(std::io::Error),
    #[error("{provider} rejected the query: {reason}")]
    UpstreamRejected {
        provider: &'static str,
        reason: String,
    },
    #[error("{provider} returned an empty response, the request was probably intercepted")]
    EmptyResponse { provider: &'static str },
    #[error("{provider} returned a malformed payload: {reason}")]
    Format {
        provider: &'static str,
        reason: String,
    },
    #[error("no {file_name} found in {searched:?}")]
    DatabaseNotFound {
        file_name: &'static str,
        searched: Vec<PathBuf>,
    },
    #[error(r#"database path "{0}" is set explicitly but the file does not exist"#)]
    ExplicitPathMissing(PathBuf),
    #[cfg(feature = "maxminddb")]
    #[error(r#"cannot open database "{path}": {error}"#)]
    DatabaseOpen { path: PathBuf, error: MaxMindDBError },
    #[error("no record for {0}")]
    LookupMiss(IpAddr),
}

impl ProviderError {
    /// Transport failures may succeed on a later attempt, the rest will not
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Network(_))
    }
}
