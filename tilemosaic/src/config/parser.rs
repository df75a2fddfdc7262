//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This module contains the `parse_ini()` function and its helpers.
//! It is the single place where INI key names are mapped to struct fields.

use ini::Ini;
use std::path::PathBuf;
use std::str::FromStr;

use super::file::ConfigFileError;
use super::settings::ConfigFile;
use crate::coord::MAX_ZOOM;
use crate::raster::Compression;

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Parses `value`, mapping any failure to `InvalidValue` with `reason`.
fn parse_value<T: FromStr>(
    section: &str,
    key: &str,
    value: &str,
    reason: &str,
) -> Result<T, ConfigFileError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, value, reason))
}

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [provider] section
    if let Some(section) = ini.section(Some("provider")) {
        if let Some(v) = section.get("type") {
            config.provider.provider_type = parse_value(
                "provider",
                "type",
                v,
                "must be one of: tianditu, google, bing, arcgis",
            )?;
        }
        if let Some(v) = section.get("tianditu_key") {
            let v = v.trim();
            if !v.is_empty() {
                config.provider.tianditu_key = v.to_string();
            }
        }
    }

    // [download] section
    if let Some(section) = ini.section(Some("download")) {
        if let Some(v) = section.get("timeout") {
            let timeout: u64 =
                parse_value("download", "timeout", v, "must be a positive integer (seconds)")?;
            if timeout == 0 {
                return Err(invalid("download", "timeout", v, "must be at least 1 second"));
            }
            config.download.timeout = timeout;
        }
        if let Some(v) = section.get("max_retries") {
            config.download.max_retries =
                parse_value("download", "max_retries", v, "must be a positive integer")?;
        }
        if let Some(v) = section.get("concurrency") {
            let concurrency: usize =
                parse_value("download", "concurrency", v, "must be a positive integer")?;
            if concurrency == 0 {
                return Err(invalid("download", "concurrency", v, "must be at least 1"));
            }
            config.download.concurrency = concurrency;
        }
        if let Some(v) = section.get("abort_ratio") {
            let ratio: f64 =
                parse_value("download", "abort_ratio", v, "must be a number between 0 and 1")?;
            if !(0.0..=1.0).contains(&ratio) {
                return Err(invalid(
                    "download",
                    "abort_ratio",
                    v,
                    "must be a number between 0 and 1",
                ));
            }
            config.download.abort_ratio = ratio;
        }
        if let Some(v) = section.get("retry_sweeps") {
            config.download.retry_sweeps =
                parse_value("download", "retry_sweeps", v, "must be a non-negative integer")?;
        }
    }

    // [grid] section
    if let Some(section) = ini.section(Some("grid")) {
        if let Some(v) = section.get("zoom") {
            let reason = format!("must be an integer from 0 to {}", MAX_ZOOM);
            let zoom: u8 = parse_value("grid", "zoom", v, &reason)?;
            if zoom > MAX_ZOOM {
                return Err(invalid("grid", "zoom", v, &reason));
            }
            config.grid.zoom = zoom;
        }
    }

    // [merge] section
    if let Some(section) = ini.section(Some("merge")) {
        if let Some(v) = section.get("block_size") {
            let size: u32 = parse_value("merge", "block_size", v, "must be a positive integer")?;
            if size == 0 {
                return Err(invalid("merge", "block_size", v, "must be at least 1"));
            }
            config.merge.block_size = size;
        }
        if let Some(v) = section.get("merge_retries") {
            config.merge.merge_retries =
                parse_value("merge", "merge_retries", v, "must be a positive integer")?;
        }
        if let Some(v) = section.get("compression") {
            config.merge.compression = v
                .trim()
                .parse::<Compression>()
                .map_err(|_| invalid("merge", "compression", v, "must be one of: none, lzw, deflate"))?;
        }
        if let Some(v) = section.get("jpeg_quality") {
            let quality: u8 =
                parse_value("merge", "jpeg_quality", v, "must be an integer from 1 to 100")?;
            if !(1..=100).contains(&quality) {
                return Err(invalid(
                    "merge",
                    "jpeg_quality",
                    v,
                    "must be an integer from 1 to 100",
                ));
            }
            config.merge.jpeg_quality = quality;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = expand_tilde(v);
            }
        }
    }

    Ok(config)
}

/// Expand ~ to home directory in paths.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
