//! Ground-control coordinate table.

use gcp_markers_core::{parse_f64, DelimitedError, DelimitedReader, Delimiter, Record};
use std::collections::HashMap;
use std::path::Path;

/// Required columns: markerID, easting, northing, elevation.
const COORD_COLUMNS: usize = 4;

#[derive(thiserror::Error, Debug)]
pub enum CoordsError {
    #[error(transparent)]
    Input(#[from] DelimitedError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Fixed translation applied to every loaded coordinate, used to keep
/// numeric magnitudes small downstream.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Offset {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// One offset-adjusted ground-control coordinate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coordinate {
    pub easting: f64,
    pub northing: f64,
    pub elevation: f64,
}

/// Marker ID → coordinate mapping. Duplicate IDs keep the last row.
#[derive(Debug, Default)]
pub struct CoordinateTable {
    by_id: HashMap<u32, Coordinate>,
}

impl CoordinateTable {
    pub fn insert(&mut self, id: u32, coordinate: Coordinate) -> Option<Coordinate> {
        self.by_id.insert(id, coordinate)
    }

    pub fn get(&self, id: u32) -> Option<Coordinate> {
        self.by_id.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Load the coordinate CSV, applying `offset` to every row.
///
/// A missing file yields an empty table: resolution later fails per marker
/// rather than up front. Short or non-numeric rows are skipped with a
/// warning.
pub fn load_coordinates(
    path: impl AsRef<Path>,
    delimiter: Delimiter,
    offset: Offset,
) -> Result<CoordinateTable, CoordsError> {
    let reader = match DelimitedReader::open(path, delimiter) {
        Ok(reader) => reader,
        Err(DelimitedError::MissingFile(path)) => {
            log::warn!(
                "coordinate file {} not found, starting with an empty table",
                path.display()
            );
            return Ok(CoordinateTable::default());
        }
        Err(err) => return Err(err.into()),
    };

    let mut table = CoordinateTable::default();
    for record in reader {
        let record = record?;
        match parse_coord_row(&record, offset) {
            Ok((id, coordinate)) => {
                if table.insert(id, coordinate).is_some() {
                    log::debug!("duplicate coordinate for marker {id}, keeping row {}", record.line);
                }
            }
            Err(reason) => log::warn!("skipping coordinate row {}: {reason}", record.line),
        }
    }
    log::info!("Loaded {} marker coordinate(s)", table.len());
    Ok(table)
}

fn parse_coord_row(record: &Record, offset: Offset) -> Result<(u32, Coordinate), String> {
    if record.fields.len() < COORD_COLUMNS {
        return Err(format!(
            "expected {COORD_COLUMNS} fields, found {}",
            record.fields.len()
        ));
    }
    let id = parse_marker_id(&record.fields[0])?;
    let easting = parse_f64(&record.fields[1], "easting")?;
    let northing = parse_f64(&record.fields[2], "northing")?;
    let elevation = parse_f64(&record.fields[3], "elevation")?;
    Ok((
        id,
        Coordinate {
            easting: easting + offset.x,
            northing: northing + offset.y,
            elevation: elevation + offset.z,
        },
    ))
}

/// The ID column tolerates float spelling of integers ("7.0" → 7), matching
/// the all-numeric quoting convention of the survey exports.
fn parse_marker_id(field: &str) -> Result<u32, String> {
    let trimmed = field.trim();
    if let Ok(id) = trimmed.parse::<u32>() {
        return Ok(id);
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value >= 0.0 && value.fract() == 0.0 && value <= u32::MAX as f64 => {
            Ok(value as u32)
        }
        _ => Err(format!("invalid markerID value {trimmed:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(content.as_bytes()).expect("write");
        file
    }

    #[test]
    fn applies_the_offset_at_load_time() {
        let file = temp_csv("1;10.0;20.0;5.0\n");
        let offset = Offset { x: -1.0, y: -2.0, z: -3.0 };
        let table = load_coordinates(file.path(), Delimiter::Semicolon, offset).expect("load");
        assert_eq!(
            table.get(1),
            Some(Coordinate { easting: 9.0, northing: 18.0, elevation: 2.0 })
        );
    }

    #[test]
    fn missing_file_yields_an_empty_table() {
        let table = load_coordinates(
            "/nonexistent/gcp.csv",
            Delimiter::Semicolon,
            Offset::default(),
        )
        .expect("load");
        assert!(table.is_empty());
    }

    #[test]
    fn short_rows_are_skipped() {
        let file = temp_csv("1;10.0;20.0\n2;1.0;2.0;3.0\n");
        let table =
            load_coordinates(file.path(), Delimiter::Semicolon, Offset::default()).expect("load");
        assert_eq!(table.len(), 1);
        assert!(table.get(2).is_some());
    }

    #[test]
    fn duplicate_ids_keep_the_last_row() {
        let file = temp_csv("5;1.0;1.0;1.0\n5;2.0;2.0;2.0\n");
        let table =
            load_coordinates(file.path(), Delimiter::Semicolon, Offset::default()).expect("load");
        assert_eq!(table.get(5).map(|c| c.easting), Some(2.0));
    }

    #[test]
    fn float_spelled_integer_ids_are_accepted() {
        let file = temp_csv("7.0;1.0;2.0;3.0\n7.5;4.0;5.0;6.0\n");
        let table =
            load_coordinates(file.path(), Delimiter::Semicolon, Offset::default()).expect("load");
        assert_eq!(table.len(), 1);
        assert!(table.get(7).is_some());
    }
}
