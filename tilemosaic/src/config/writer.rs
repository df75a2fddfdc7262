//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! This module contains the `to_config_string()` function that produces
//! the commented INI representation written to `config.ini`.

use std::path::Path;

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    format!(
        r#"[provider]
; Imagery provider:
;   tianditu - Tianditu satellite imagery (requires a developer key, max zoom 18)
;   google   - Google satellite tiles (max zoom 20)
;   bing     - Bing aerial imagery via quad-keys (max zoom 19)
;   arcgis   - ArcGIS World Imagery (max zoom 19)
type = {}
; Tianditu developer key (only used when type = tianditu)
tianditu_key = {}

[download]
; Per-attempt HTTP timeout in seconds (default: 2)
timeout = {}
; HTTP attempts per tile within one pass (default: 3)
max_retries = {}
; Worker threads per column batch (default: 8)
concurrency = {}
; Abort the first pass once this fraction of tiles has failed (default: 0.1)
abort_ratio = {}
; Retry sweeps over tiles that failed the first pass (default: 1)
retry_sweeps = {}

[grid]
; Default zoom level (default: 19)
zoom = {}

[merge]
; Tiles per block side when merging a tile cache (default: 60)
block_size = {}
; Decode attempts per block when writing the GeoTIFF (default: 3)
merge_retries = {}
; GeoTIFF compression: none, lzw or deflate (default: lzw)
compression = {}
; JPEG quality of cached tiles and blocks, 1-100 (default: 90)
jpeg_quality = {}

[logging]
; Log file, cleared at every start
file = {}
"#,
        config.provider.provider_type,
        config.provider.tianditu_key,
        config.download.timeout,
        config.download.max_retries,
        config.download.concurrency,
        config.download.abort_ratio,
        config.download.retry_sweeps,
        config.grid.zoom,
        config.merge.block_size,
        config.merge.merge_retries,
        config.merge.compression,
        config.merge.jpeg_quality,
        path_to_string(&config.logging.file),
    )
}

/// Convert a path to a string, using ~ for the home directory.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::super::settings::ConfigFile;
    use super::*;
    use crate::provider::ProviderKind;
    use crate::raster::Compression;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.ini");

        let mut config = ConfigFile::default();
        config.provider.provider_type = ProviderKind::Bing;
        config.download.timeout = 10;
        config.download.abort_ratio = 0.05;
        config.grid.zoom = 17;
        config.merge.compression = Compression::None;
        config.logging.file = temp_dir.path().join("run.log");

        config.save_to(&config_path).unwrap();
        let loaded = ConfigFile::load_from(&config_path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_output_is_commented() {
        let content = to_config_string(&ConfigFile::default());
        assert!(content.contains("[provider]\n; Imagery provider:"));
        assert!(content.contains("type = google"));
        assert!(content.contains("compression = lzw"));
        assert!(content.contains("abort_ratio = 0.1\n"));
    }
}
