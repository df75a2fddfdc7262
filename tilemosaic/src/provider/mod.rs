//! Satellite imagery provider addressing
//!
//! Maps tile indices to fetchable URLs for the supported providers and
//! abstracts the blocking HTTP client used to fetch them.
//!
//! ```ignore
//! use tilemosaic::provider::{ProviderKind, TileUrlResolver};
//!
//! let resolver = TileUrlResolver::new(ProviderKind::Bing);
//! let request = resolver.resolve(&top_left, dx, dy, 19)?;
//! ```

mod arcgis;
mod bing;
mod google;
mod http;
mod resolver;
mod shard;
mod tianditu;
mod types;

pub use http::{HttpClient, ReqwestClient, TransportError, DEFAULT_TIMEOUT};
pub use resolver::{resolve, TileUrlResolver};
pub use shard::{FixedShard, RandomShard, RoundRobinShard, ShardSelector};
pub use tianditu::DEFAULT_TIANDITU_KEY;
pub use types::{ProviderError, ProviderKind, TileRequest, DEFAULT_HEADERS};

#[cfg(test)]
pub use http::tests::{FlakyHttpClient, MockHttpClient};
