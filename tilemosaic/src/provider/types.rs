//! Provider types

use crate::coord::CoordError;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while resolving a tile address.
///
/// All of these are precondition violations and are returned before any
/// network call is made.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    /// Provider name not recognised
    #[error("Unsupported provider: '{0}' (expected tianditu, google, bing or arcgis)")]
    UnsupportedProvider(String),

    /// Requested zoom is above the provider's ceiling
    #[error("Zoom level {zoom} exceeds the {provider} maximum of {max}")]
    ZoomExceeded {
        provider: ProviderKind,
        zoom: u8,
        max: u8,
    },

    /// Target tile is outside the pyramid
    #[error(transparent)]
    Coord(#[from] CoordError),
}

/// Supported imagery providers.
///
/// Each variant carries its own URL template, addressing convention and
/// zoom ceiling. The variant is resolved once from the configured name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// Tianditu imagery (`img_w`), XYZ addressing, max zoom 18
    Tianditu,
    /// Google satellite (`lyrs=s`), XYZ addressing, max zoom 20
    Google,
    /// Bing aerial, quadkey addressing, max zoom 19
    Bing,
    /// ArcGIS World Imagery, `z/y/x` addressing, max zoom 19
    ArcGis,
}

impl ProviderKind {
    /// All providers, in display order.
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::Tianditu,
        ProviderKind::Google,
        ProviderKind::Bing,
        ProviderKind::ArcGis,
    ];

    /// Highest zoom level the provider serves.
    pub fn max_zoom(&self) -> u8 {
        match self {
            ProviderKind::Tianditu => 18,
            ProviderKind::Google => 20,
            ProviderKind::Bing => 19,
            ProviderKind::ArcGis => 19,
        }
    }

    /// Number of interchangeable server shards (1 when there is no sharding).
    pub fn shard_count(&self) -> u8 {
        match self {
            ProviderKind::Tianditu | ProviderKind::Google | ProviderKind::Bing => 4,
            ProviderKind::ArcGis => 1,
        }
    }

    /// Canonical lowercase name, as accepted by `FromStr`.
    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::Tianditu => "tianditu",
            ProviderKind::Google => "google",
            ProviderKind::Bing => "bing",
            ProviderKind::ArcGis => "arcgis",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProviderKind {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tianditu" => Ok(ProviderKind::Tianditu),
            "google" => Ok(ProviderKind::Google),
            "bing" => Ok(ProviderKind::Bing),
            "arcgis" | "esri" => Ok(ProviderKind::ArcGis),
            _ => Err(ProviderError::UnsupportedProvider(s.to_string())),
        }
    }
}

/// Request headers sent with every tile fetch.
///
/// Some servers (Tianditu in particular) reject requests that do not look
/// like they come from a browser. `Accept-Encoding` is left to reqwest,
/// which advertises gzip and deflate and decodes the body itself.
pub const DEFAULT_HEADERS: &[(&str, &str)] = &[
    (
        "User-Agent",
        "Mozilla/5.0 (Windows NT 10.0; WOW64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/63.0.3239.132 Safari/537.36",
    ),
    ("Referer", "https://www.tianditu.gov.cn/"),
    ("Connection", "keep-alive"),
    ("Accept-Language", "zh-CN,zh;q=0.8"),
    ("Accept", "image/webp,image/apng,image/*,*/*;q=0.8"),
];

/// A fully resolved, fetchable tile address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileRequest {
    pub url: String,
    pub headers: &'static [(&'static str, &'static str)],
}

impl TileRequest {
    pub fn new(url: String) -> Self {
        Self {
            url,
            headers: DEFAULT_HEADERS,
        }
    }
}
