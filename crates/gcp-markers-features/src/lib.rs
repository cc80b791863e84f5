//! Synthetic CCTag feature import for marker matches.
//!
//! Reads a formatted CSV of marker detections (one row = one marker on one
//! image), resolves each image to a view identifier through the manifest,
//! and emits one text feature file and one binary one-hot descriptor file
//! per view. The output stands in for real CCTag descriptors so that
//! manually registered markers can enter the matching stage.

mod encoder;
mod loader;
mod types;

pub use encoder::{write_descriptors, EncodeError, MarkerReport, DESCRIPTOR_LEN};
pub use loader::{load_detections, LoadError};
pub use types::{DescriptorType, ImageMarkerGroups, MarkerDetection};
