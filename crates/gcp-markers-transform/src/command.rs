//! Transform command assembly.

use crate::limits::ResourceLimits;
use crate::resolve::ResolvedMarkerSet;
use std::fmt;
use std::path::PathBuf;

/// Largest supported coordinate precision (decimal places).
pub const MAX_PRECISION: usize = 10;

/// Format the ` --markers` parameter with fixed-point coordinates.
///
/// Every numeric value carries exactly `precision` decimals; fields are
/// comma-joined without spaces, entries space-joined, with a leading space
/// before the flag and before each entry. Entry order follows the resolved
/// set. Callers validate `precision` (the CLI enforces 0–10).
pub fn build_markers_param(markers: &ResolvedMarkerSet, precision: usize) -> String {
    debug_assert!(precision <= MAX_PRECISION);
    let mut param = String::from(" --markers");
    for (id, coordinate) in markers.iter() {
        param.push_str(&format!(
            " {id}:{:.p$},{:.p$},{:.p$}",
            coordinate.easting,
            coordinate.northing,
            coordinate.elevation,
            p = precision
        ));
    }
    param
}

/// Marker flavor understood by the transform tool.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MarkerType {
    Cctag3,
    Cctag4,
    Tag16h5,
}

impl MarkerType {
    pub fn as_str(self) -> &'static str {
        match self {
            MarkerType::Cctag3 => "cctag3",
            MarkerType::Cctag4 => "cctag4",
            MarkerType::Tag16h5 => "tag16h5",
        }
    }
}

impl fmt::Display for MarkerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings for the external geo-registration invocation.
#[derive(Clone, Debug)]
pub struct TransformCommand {
    /// Transform tool executable.
    pub tool: String,
    /// SfMData file to align.
    pub input: PathBuf,
    /// Aligned SfMData output path.
    pub output: PathBuf,
    /// Output SfMData with cameras (views and poses).
    pub views_poses_output: PathBuf,
    pub marker_type: MarkerType,
    pub apply_scale: bool,
    pub apply_rotation: bool,
    pub apply_translation: bool,
    /// Verbosity level forwarded to the tool.
    pub verbose_level: String,
}

impl TransformCommand {
    /// Full argument vector: the base command, then the markers parameter,
    /// then the resource-limit flags.
    pub fn to_argv(&self, markers_param: &str, limits: &ResourceLimits) -> Vec<String> {
        let mut argv = vec![
            self.tool.clone(),
            self.input.display().to_string(),
            "--method".into(),
            "from_markers".into(),
            "--scale".into(),
            "1.0".into(),
            "--landmarksDescriberTypes".into(),
            self.marker_type.as_str().into(),
            "--applyScale".into(),
            bool_arg(self.apply_scale).into(),
            "--applyRotation".into(),
            bool_arg(self.apply_rotation).into(),
            "--applyTranslation".into(),
            bool_arg(self.apply_translation).into(),
            "--verboseLevel".into(),
            self.verbose_level.clone(),
            "--output".into(),
            self.output.display().to_string(),
            "--outputViewsAndPoses".into(),
            self.views_poses_output.display().to_string(),
        ];
        argv.extend(markers_param.split_whitespace().map(str::to_string));
        argv.extend(limits.to_args());
        argv
    }
}

fn bool_arg(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}
