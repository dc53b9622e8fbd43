use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GeoFeedError {
    #[error("geofeed path is not configured")]
    NotConfigured,
    #[error(r#"Error while attempting to open geofeed "{path}": {error}"#)]
    Open {
        path: PathBuf,
        error: std::io::Error,
    },
    #[error(r#"Error parsing geofeed "{path}": {error}"#)]
    File {
        path: PathBuf,
        error: GeoFeedFileError,
    },
}

#[derive(Error, Debug)]
pub enum GeoFeedFileError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("not a valid CSV table (line {line:?}): {reason}")]
    Format { line: Option<u64>, reason: String },
}

impl From<csv::Error> for GeoFeedFileError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(csv::Position::line);
        let reason = error.to_string();
        match error.into_kind() {
            csv::ErrorKind::Io(error) => Self::Io(error),
            _ => Self::Format { line, reason },
        }
    }
}
