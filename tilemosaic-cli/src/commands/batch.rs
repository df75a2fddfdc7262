//! Batch command - fetch a fixed-size image around each of many locations.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use tilemosaic::orchestrator::{run_locations, NamedLocation};

use super::common::{parse_point, resolve_zoom, save_image, DownloadOverrides};
use crate::error::CliError;
use crate::runner::{ensure_dir, CliRunner};

/// Arguments for the batch command.
#[derive(Debug, Args)]
pub struct BatchArgs {
    /// Location as "lng,lat" or "lng,lat,name" (repeatable)
    #[arg(long = "at", value_name = "LNG,LAT[,NAME]", allow_hyphen_values = true)]
    pub locations: Vec<String>,

    /// Text file with one location per line ("lng,lat[,name]", '#' starts a comment)
    #[arg(long, short)]
    pub file: Option<PathBuf>,

    /// Image width in pixels
    #[arg(long, default_value = "1024")]
    pub width: u32,

    /// Image height in pixels (default: --width)
    #[arg(long)]
    pub height: Option<u32>,

    /// Zoom level (default: from config)
    #[arg(long, short)]
    pub zoom: Option<u8>,

    /// Directory for the images
    #[arg(long, short, default_value = ".")]
    pub output_dir: PathBuf,

    /// File name prefix: images are named <prefix>_<name or index>_<provider>.jpg
    #[arg(long, default_value = "location")]
    pub prefix: String,

    #[command(flatten)]
    pub download: DownloadOverrides,
}

/// Run the batch command.
pub fn run(args: BatchArgs, runner: &CliRunner) -> Result<(), CliError> {
    runner.log_startup("batch");
    let config = runner.config();

    let mut locations = args
        .locations
        .iter()
        .map(|line| parse_location(line))
        .collect::<Result<Vec<_>, _>>()
        .map_err(CliError::InvalidArgument)?;
    if let Some(file) = &args.file {
        locations.extend(read_locations(file)?);
    }
    if locations.is_empty() {
        return Err(CliError::InvalidArgument(
            "No locations given: use --at or --file".to_string(),
        ));
    }

    let zoom = resolve_zoom(args.zoom, config);
    let height = args.height.unwrap_or(args.width);
    let output_dir = ensure_dir(&args.output_dir)?;

    let progress = runner.progress();
    let orchestrator = runner.orchestrator(&args.download, progress.clone())?;
    let provider = orchestrator.resolver().kind();

    println!(
        "Fetching {} locations, {}x{} px at zoom {} from {}",
        locations.len(),
        args.width,
        height,
        zoom,
        provider
    );

    let summary = run_locations(
        &orchestrator,
        &locations,
        args.width,
        height,
        zoom,
        |index, location, image| {
            let name = image_file_name(&args.prefix, &location.label(index), provider.name());
            let path = output_dir.join(name);
            save_image(&path, &image, config)?;
            progress.println(format!("Saved {}", path.display()));
            Ok::<(), CliError>(())
        },
    );
    progress.finish();

    println!(
        "Done: {} succeeded, {} failed",
        summary.succeeded, summary.failed
    );
    if summary.failed > 0 {
        return Err(CliError::BatchIncomplete {
            failed: summary.failed,
            total: summary.total(),
        });
    }
    Ok(())
}

/// Parses "lng,lat" or "lng,lat,name".
fn parse_location(line: &str) -> Result<NamedLocation, String> {
    let mut parts = line.splitn(3, ',');
    let lng = parts.next().unwrap_or_default();
    let lat = parts
        .next()
        .ok_or_else(|| format!("expected \"lng,lat[,name]\", got '{}'", line))?;
    let point = parse_point(&format!("{},{}", lng, lat))?;

    match parts.next().map(str::trim).filter(|name| !name.is_empty()) {
        Some(name) => Ok(NamedLocation::named(name, point)),
        None => Ok(NamedLocation::new(point)),
    }
}

/// Reads a location file, skipping blank lines and `#` comments.
fn read_locations(path: &Path) -> Result<Vec<NamedLocation>, CliError> {
    let content = fs::read_to_string(path).map_err(|error| CliError::Io {
        path: path.to_path_buf(),
        error,
    })?;

    content
        .lines()
        .enumerate()
        .map(|(number, line)| (number + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(number, line)| {
            parse_location(line).map_err(|e| {
                CliError::InvalidArgument(format!("{}:{}: {}", path.display(), number, e))
            })
        })
        .collect()
}

/// File name of one location image; path separators in names become `_`.
fn image_file_name(prefix: &str, label: &str, provider: &str) -> String {
    let label: String = label
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect();
    format!("{}_{}_{}.jpg", prefix, label, provider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tilemosaic::coord::GeoPoint;

    #[test]
    fn test_parse_location() {
        let plain = parse_location("114.35,30.54").unwrap();
        assert_eq!(plain.point, GeoPoint::new(114.35, 30.54));
        assert_eq!(plain.name, None);

        let named = parse_location("2.2945, 48.8584, Eiffel Tower").unwrap();
        assert_eq!(named.name.as_deref(), Some("Eiffel Tower"));

        assert!(parse_location("2.2945").is_err());
        assert!(parse_location("x,48.8").is_err());
    }

    #[test]
    fn test_read_locations_skips_comments() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("locs.txt");
        fs::write(
            &path,
            "# lng,lat,name\n114.35,30.54,wuhan\n\n-0.1276,51.5072\n",
        )
        .unwrap();

        let locations = read_locations(&path).unwrap();
        assert_eq!(locations.len(), 2);
        assert_eq!(locations[0].label(0), "wuhan");
        assert_eq!(locations[1].label(1), "1");
    }

    #[test]
    fn test_read_locations_reports_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("locs.txt");
        fs::write(&path, "114.35,30.54\nnonsense\n").unwrap();

        let err = read_locations(&path).unwrap_err().to_string();
        assert!(err.contains(":2:"), "unexpected message: {}", err);
    }

    #[test]
    fn test_image_file_name() {
        assert_eq!(image_file_name("loc", "3", "google"), "loc_3_google.jpg");
        assert_eq!(image_file_name("loc", "a/b", "bing"), "loc_a_b_bing.jpg");
    }
}
