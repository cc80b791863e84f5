use std::collections::BTreeMap;
use std::fmt;

/// One marker detection on one image, as read from the match CSV.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MarkerDetection {
    /// Horizontal image coordinate in pixels.
    pub x: f64,
    /// Vertical image coordinate in pixels.
    pub y: f64,
    /// Marker radius in pixels.
    pub size: f64,
    /// Marker identifier.
    pub id: u32,
}

/// Detections grouped by image file name, in CSV row order within each
/// image. Keying by image name makes the shared-image invariant structural
/// and gives deterministic iteration.
pub type ImageMarkerGroups = BTreeMap<String, Vec<MarkerDetection>>;

/// Descriptor flavor to emit; selects the output file extensions.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DescriptorType {
    Cctag3,
    Cctag4,
}

impl DescriptorType {
    pub fn as_str(self) -> &'static str {
        match self {
            DescriptorType::Cctag3 => "cctag3",
            DescriptorType::Cctag4 => "cctag4",
        }
    }
}

impl fmt::Display for DescriptorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
