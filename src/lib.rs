pub mod address;
pub mod config;
pub mod country;
pub mod geofeed;
pub mod provider;
pub mod region;
pub mod resolver;
pub mod result;
mod timeout;

pub use geofeed::{GeoFeed, GeoFeedEntry};
pub use provider::{GeoProvider, Provider, ProviderError, ResolveOptions};
pub use resolver::{ResolveError, Resolver};
pub use result::GeoResult;
pub use timeout::Timeout;
