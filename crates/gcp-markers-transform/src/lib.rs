//! Marker-based geo-registration support.
//!
//! Joins a resolved marker ID list against a ground-control coordinate
//! table, formats the result into the transform tool's `--markers`
//! parameter, and runs the tool synchronously with combined log capture.

mod command;
mod coords;
mod limits;
mod process;
mod resolve;

pub use command::{build_markers_param, MarkerType, TransformCommand, MAX_PRECISION};
pub use coords::{load_coordinates, Coordinate, CoordinateTable, CoordsError, Offset};
pub use limits::{detect_resource_limits, ResourceLimits};
pub use process::{run_logged, PidSlot, ProcessError, ProcessMonitor};
pub use resolve::{
    extract_marker_ids, marker_ids_from_structure, parse_manual_ids, resolve_markers,
    ResolveError, ResolvedMarkerSet, StructureExtraction,
};
