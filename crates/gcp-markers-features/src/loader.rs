//! Marker match CSV loading.

use crate::types::{ImageMarkerGroups, MarkerDetection};
use gcp_markers_core::{parse_f64, DelimitedError, DelimitedReader, Delimiter, Record};
use std::path::Path;

/// Required columns: markerX, markerY, imageFileName, markerID, markerSize.
const MATCH_COLUMNS: usize = 5;

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error(transparent)]
    Input(#[from] DelimitedError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Parse the match CSV into per-image detection groups.
///
/// Rows with fewer than five fields or unparsable numeric fields are skipped
/// with a warning; surviving rows keep file order within each image.
pub fn load_detections(
    path: impl AsRef<Path>,
    delimiter: Delimiter,
) -> Result<ImageMarkerGroups, LoadError> {
    let mut groups = ImageMarkerGroups::new();
    let mut loaded = 0usize;
    let mut skipped = 0usize;

    for record in DelimitedReader::open(path, delimiter)? {
        let record = record?;
        match parse_match_row(&record) {
            Ok((image, detection)) => {
                groups.entry(image).or_default().push(detection);
                loaded += 1;
            }
            Err(reason) => {
                log::warn!("skipping match row {}: {reason}", record.line);
                skipped += 1;
            }
        }
    }

    log::info!("Loaded {loaded} marker match(es) in {} image(s)", groups.len());
    if skipped > 0 {
        log::warn!("{skipped} malformed match row(s) skipped");
    }
    Ok(groups)
}

fn parse_match_row(record: &Record) -> Result<(String, MarkerDetection), String> {
    if record.fields.len() < MATCH_COLUMNS {
        return Err(format!(
            "expected {MATCH_COLUMNS} fields, found {}",
            record.fields.len()
        ));
    }
    let x = parse_f64(&record.fields[0], "markerX")?;
    let y = parse_f64(&record.fields[1], "markerY")?;
    let image = record.fields[2].trim();
    if image.is_empty() {
        return Err("empty image file name".into());
    }
    let id = parse_marker_id(&record.fields[3])?;
    let size = parse_f64(&record.fields[4], "markerSize")?;
    Ok((image.to_string(), MarkerDetection { x, y, size, id }))
}

/// Marker IDs in the match CSV must be non-negative integers.
fn parse_marker_id(field: &str) -> Result<u32, String> {
    let trimmed = field.trim();
    trimmed
        .parse()
        .map_err(|_| format!("invalid markerID value {trimmed:?}"))
}
