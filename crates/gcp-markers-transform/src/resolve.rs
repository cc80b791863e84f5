//! Marker identity resolution for the geo-registration step.
//!
//! Two sources produce the ID list: a manual comma-separated string, or a
//! structure-extraction tool run through the process invoker whose JSON
//! output encodes marker IDs in landmark colors.

use crate::coords::{Coordinate, CoordinateTable};
use crate::process::{run_logged, ProcessError, ProcessMonitor};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum ResolveError {
    #[error("no coordinate for marker {id}")]
    MissingCoordinate { id: u32 },
    #[error("structure extraction failed: {0}")]
    Extraction(#[from] ProcessError),
    #[error("structure file not found: {0}")]
    MissingStructure(PathBuf),
    #[error("malformed structure document: {0}")]
    MalformedStructure(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Ordered marker → coordinate pairs used to build the command parameter.
#[derive(Debug, Default, PartialEq)]
pub struct ResolvedMarkerSet {
    entries: Vec<(u32, Coordinate)>,
}

impl ResolvedMarkerSet {
    /// Insert keeping the first occurrence of a duplicate ID.
    fn push_unique(&mut self, id: u32, coordinate: Coordinate) {
        if !self.entries.iter().any(|(existing, _)| *existing == id) {
            self.entries.push((id, coordinate));
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, Coordinate)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse a manual comma-separated marker ID list.
///
/// Tokens that do not parse as integers are skipped, which tolerates stray
/// whitespace and empty entries; input order is preserved.
pub fn parse_manual_ids(list: &str) -> Vec<u32> {
    list.split(',')
        .filter_map(|token| token.trim().parse().ok())
        .collect()
}

/// Structure-extraction settings for auto ID resolution.
#[derive(Clone, Debug)]
pub struct StructureExtraction<'a> {
    /// Extraction command argument vector.
    pub command: &'a [String],
    /// Working directory for the extraction tool.
    pub workdir: &'a Path,
    /// Log file receiving the tool's combined output.
    pub log_path: &'a Path,
    /// JSON document the tool writes.
    pub structure_path: &'a Path,
}

/// Run the extraction command and collect marker IDs from its output.
pub fn extract_marker_ids(
    extraction: &StructureExtraction<'_>,
    monitor: Option<&dyn ProcessMonitor>,
) -> Result<Vec<u32>, ResolveError> {
    run_logged(
        extraction.command,
        extraction.workdir,
        extraction.log_path,
        monitor,
    )?;
    marker_ids_from_structure(extraction.structure_path)
}

/// Marker IDs recovered from a structure document.
///
/// The extraction tool stores each landmark's marker ID as the first channel
/// of its `color` triple: a pixel intensity reused as an identifier, not a
/// real color. That reinterpretation lives entirely in this function.
/// Returns ascending unique IDs.
pub fn marker_ids_from_structure(path: &Path) -> Result<Vec<u32>, ResolveError> {
    if !path.is_file() {
        return Err(ResolveError::MissingStructure(path.to_path_buf()));
    }
    let raw = fs::read_to_string(path)?;
    let doc: Value = serde_json::from_str(&raw)?;
    let landmarks = doc
        .get("structure")
        .and_then(Value::as_array)
        .ok_or_else(|| ResolveError::MalformedStructure("missing `structure` array".into()))?;

    let mut ids = Vec::with_capacity(landmarks.len());
    for landmark in landmarks {
        let channel = landmark
            .get("color")
            .and_then(Value::as_array)
            .and_then(|color| color.first())
            .ok_or_else(|| {
                ResolveError::MalformedStructure("landmark without a color triple".into())
            })?;
        ids.push(channel_to_id(channel)?);
    }
    ids.sort_unstable();
    ids.dedup();
    log::info!("Resolved {} marker id(s) from structure", ids.len());
    Ok(ids)
}

/// The channel value may be a JSON number or a numeric string; the integer
/// cast truncates as the extraction tool's consumers expect.
fn channel_to_id(value: &Value) -> Result<u32, ResolveError> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match number {
        Some(v) if v >= 0.0 => Ok(v as u32),
        _ => Err(ResolveError::MalformedStructure(format!(
            "bad color channel {value}"
        ))),
    }
}

/// Join resolved IDs against the coordinate table, keeping input order.
///
/// Duplicate IDs collapse to their first occurrence. A marker without a
/// coordinate is an input contract violation and fails the run.
pub fn resolve_markers(
    ids: &[u32],
    table: &CoordinateTable,
) -> Result<ResolvedMarkerSet, ResolveError> {
    let mut resolved = ResolvedMarkerSet::default();
    for &id in ids {
        let coordinate = table
            .get(id)
            .ok_or(ResolveError::MissingCoordinate { id })?;
        resolved.push_unique(id, coordinate);
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn coordinate(e: f64) -> Coordinate {
        Coordinate {
            easting: e,
            northing: e + 1.0,
            elevation: e + 2.0,
        }
    }

    fn table_with(ids: &[u32]) -> CoordinateTable {
        let mut table = CoordinateTable::default();
        for &id in ids {
            table.insert(id, coordinate(id as f64));
        }
        table
    }

    fn temp_structure(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(content.as_bytes()).expect("write");
        file
    }

    #[test]
    fn manual_ids_skip_bad_tokens_and_keep_order() {
        assert_eq!(parse_manual_ids("3, x, 5,,7"), [3, 5, 7]);
        assert_eq!(parse_manual_ids("9,4"), [9, 4]);
        assert!(parse_manual_ids("").is_empty());
    }

    #[test]
    fn structure_ids_are_sorted_and_unique() {
        let file = temp_structure(
            r#"{"structure": [
                {"color": [5, 0, 0]},
                {"color": [2, 9, 9]},
                {"color": [5, 1, 1]},
                {"color": [9, 0, 0]}
            ]}"#,
        );
        let ids = marker_ids_from_structure(file.path()).expect("ids");
        assert_eq!(ids, [2, 5, 9]);
    }

    #[test]
    fn string_color_channels_are_accepted() {
        let file = temp_structure(
            r#"{"structure": [
                {"color": ["12", "0", "0"], "X": [1.0, 2.0, 3.0]},
                {"color": ["3.0", "0", "0"]}
            ]}"#,
        );
        let ids = marker_ids_from_structure(file.path()).expect("ids");
        assert_eq!(ids, [3, 12]);
    }

    #[test]
    fn missing_structure_array_is_malformed() {
        let file = temp_structure(r#"{"views": []}"#);
        let err = marker_ids_from_structure(file.path()).unwrap_err();
        assert!(matches!(err, ResolveError::MalformedStructure(_)));
    }

    #[test]
    fn missing_structure_file_is_reported() {
        let err = marker_ids_from_structure(Path::new("/nonexistent/structure.json")).unwrap_err();
        assert!(matches!(err, ResolveError::MissingStructure(_)));
    }

    #[test]
    fn resolve_keeps_input_order_and_dedups() {
        let table = table_with(&[3, 5, 7]);
        let resolved = resolve_markers(&[7, 3, 7, 5], &table).expect("resolve");
        let ids: Vec<u32> = resolved.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, [7, 3, 5]);
    }

    #[test]
    fn unresolvable_id_is_fatal() {
        let table = table_with(&[1]);
        let err = resolve_markers(&[1, 2], &table).unwrap_err();
        assert!(matches!(err, ResolveError::MissingCoordinate { id: 2 }));
    }

    #[cfg(unix)]
    #[test]
    fn extraction_failure_propagates_with_log() {
        let dir = tempfile::tempdir().expect("tempdir");
        let command: Vec<String> = ["sh", "-c", "echo extraction broke; exit 2"]
            .map(str::to_string)
            .to_vec();
        let extraction = StructureExtraction {
            command: &command,
            workdir: dir.path(),
            log_path: &dir.path().join("extract.log"),
            structure_path: &dir.path().join("structure.json"),
        };
        let err = extract_marker_ids(&extraction, None).unwrap_err();
        match err {
            ResolveError::Extraction(ProcessError::NonZeroExit { log, .. }) => {
                assert!(log.contains("extraction broke"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn extraction_success_reads_the_written_structure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let structure_path = dir.path().join("structure.json");
        let script = format!(
            "printf '%s' '{{\"structure\": [{{\"color\": [4, 0, 0]}}]}}' > {}",
            structure_path.display()
        );
        let command: Vec<String> = ["sh", "-c", script.as_str()].map(str::to_string).to_vec();
        let extraction = StructureExtraction {
            command: &command,
            workdir: dir.path(),
            log_path: &dir.path().join("extract.log"),
            structure_path: &structure_path,
        };
        let ids = extract_marker_ids(&extraction, None).expect("extract");
        assert_eq!(ids, [4]);
    }
}
