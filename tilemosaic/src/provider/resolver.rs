//! Tile URL resolution

use super::shard::{RandomShard, ShardSelector};
use super::tianditu::DEFAULT_TIANDITU_KEY;
use super::types::{ProviderError, ProviderKind, TileRequest};
use super::{arcgis, bing, google, tianditu};
use crate::coord::{CoordError, TileIndex};
use std::sync::Arc;

/// Turns grid offsets into fetchable tile requests for one provider.
///
/// Built once per grid request; cheap to share between worker threads.
#[derive(Clone)]
pub struct TileUrlResolver {
    kind: ProviderKind,
    shard: Arc<dyn ShardSelector>,
    tianditu_key: String,
}

impl std::fmt::Debug for TileUrlResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileUrlResolver")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl TileUrlResolver {
    /// Creates a resolver with random shard selection.
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            shard: Arc::new(RandomShard),
            tianditu_key: DEFAULT_TIANDITU_KEY.to_string(),
        }
    }

    /// Creates a resolver from a provider name.
    pub fn from_name(name: &str) -> Result<Self, ProviderError> {
        Ok(Self::new(name.parse()?))
    }

    /// Replaces the shard selector.
    pub fn with_shard_selector(mut self, shard: Arc<dyn ShardSelector>) -> Self {
        self.shard = shard;
        self
    }

    /// Sets the Tianditu developer key. Ignored by other providers.
    pub fn with_tianditu_key(mut self, key: impl Into<String>) -> Self {
        self.tianditu_key = key.into();
        self
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    /// Checks `zoom` against the provider ceiling.
    pub fn check_zoom(&self, zoom: u8) -> Result<(), ProviderError> {
        let max = self.kind.max_zoom();
        if zoom > max {
            return Err(ProviderError::ZoomExceeded {
                provider: self.kind,
                zoom,
                max,
            });
        }
        Ok(())
    }

    /// Resolves the tile at `(dx, dy)` from `top_left` into a request.
    ///
    /// # Errors
    ///
    /// * [`ProviderError::ZoomExceeded`] if `zoom` is above the ceiling
    /// * [`ProviderError::Coord`] if the target tile is outside the pyramid
    pub fn resolve(
        &self,
        top_left: &TileIndex,
        dx: u32,
        dy: u32,
        zoom: u8,
    ) -> Result<TileRequest, ProviderError> {
        self.check_zoom(zoom)?;

        let x = top_left.x.checked_add(dx);
        let y = top_left.y.checked_add(dy);
        let tile = match (x, y) {
            (Some(x), Some(y)) => TileIndex::new(x, y, zoom)?,
            _ => {
                return Err(CoordError::TileOutOfRange {
                    x: top_left.x.saturating_add(dx),
                    y: top_left.y.saturating_add(dy),
                    zoom,
                }
                .into())
            }
        };

        Ok(TileRequest::new(self.url_for(&tile)))
    }

    fn url_for(&self, tile: &TileIndex) -> String {
        let shard = self.shard.pick(self.kind.shard_count());
        match self.kind {
            ProviderKind::Tianditu => tianditu::tile_url(shard, tile, &self.tianditu_key),
            ProviderKind::Google => google::tile_url(shard, tile),
            ProviderKind::Bing => bing::tile_url(shard, tile),
            ProviderKind::ArcGis => arcgis::tile_url(tile),
        }
    }
}

/// One-shot resolution by provider name with random shards.
pub fn resolve(
    provider: &str,
    top_left: &TileIndex,
    dx: u32,
    dy: u32,
    zoom: u8,
) -> Result<TileRequest, ProviderError> {
    TileUrlResolver::from_name(provider)?.resolve(top_left, dx, dy, zoom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::shard::FixedShard;
    use crate::provider::DEFAULT_HEADERS;

    fn origin(zoom: u8) -> TileIndex {
        TileIndex::new(0, 0, zoom).unwrap()
    }

    #[test]
    fn test_google_zoom_ceiling() {
        assert!(resolve("google", &origin(20), 0, 0, 20).is_ok());
        assert!(matches!(
            resolve("google", &origin(20), 0, 0, 21),
            Err(ProviderError::ZoomExceeded {
                provider: ProviderKind::Google,
                zoom: 21,
                max: 20
            })
        ));
    }

    #[test]
    fn test_every_provider_ceiling_enforced() {
        for kind in ProviderKind::ALL {
            let resolver = TileUrlResolver::new(kind);
            let max = kind.max_zoom();
            assert!(resolver.resolve(&origin(max), 0, 0, max).is_ok());
            assert!(resolver.resolve(&origin(max), 0, 0, max + 1).is_err());
        }
    }

    #[test]
    fn test_unknown_provider() {
        assert_eq!(
            resolve("mapquest", &origin(5), 0, 0, 5),
            Err(ProviderError::UnsupportedProvider("mapquest".to_string()))
        );
    }

    #[test]
    fn test_offset_applied_and_headers_attached() {
        let resolver =
            TileUrlResolver::new(ProviderKind::Google).with_shard_selector(Arc::new(FixedShard(1)));
        let top_left = TileIndex::new(100, 200, 10).unwrap();
        let request = resolver.resolve(&top_left, 3, 4, 10).unwrap();
        assert_eq!(
            request.url,
            "http://mt1.google.com/vt/lyrs=s&x=103&y=204&z=10"
        );
        assert_eq!(request.headers, DEFAULT_HEADERS);
    }

    #[test]
    fn test_tile_outside_pyramid_rejected() {
        let resolver = TileUrlResolver::new(ProviderKind::ArcGis);
        let top_left = TileIndex::new(3, 3, 2).unwrap();
        assert!(matches!(
            resolver.resolve(&top_left, 1, 0, 2),
            Err(ProviderError::Coord(CoordError::TileOutOfRange { .. }))
        ));
        assert!(resolver.resolve(&top_left, u32::MAX, 0, 2).is_err());
    }

    #[test]
    fn test_tianditu_key_used() {
        let resolver = TileUrlResolver::new(ProviderKind::Tianditu)
            .with_shard_selector(Arc::new(FixedShard(0)))
            .with_tianditu_key("mykey");
        let request = resolver.resolve(&origin(3), 1, 2, 3).unwrap();
        assert_eq!(
            request.url,
            "http://t1.tianditu.gov.cn/DataServer?T=img_w&x=1&y=2&l=3&tk=mykey"
        );
    }

    #[test]
    fn test_provider_names_parse() {
        assert_eq!("Google".parse::<ProviderKind>().unwrap(), ProviderKind::Google);
        assert_eq!("esri".parse::<ProviderKind>().unwrap(), ProviderKind::ArcGis);
        for kind in ProviderKind::ALL {
            assert_eq!(kind.name().parse::<ProviderKind>().unwrap(), kind);
        }
    }
}
