//! Shared leaves for the gcp-markers pipeline.
//!
//! This crate is intentionally small: the delimited record reader and the
//! view manifest loader used by both subsystems, plus logging setup. It does
//! *not* know about markers, descriptors or coordinates.

mod delimited;
mod logger;
mod manifest;

pub use delimited::{
    parse_f64, DelimitedError, DelimitedReader, Delimiter, ParseDelimiterError, Record,
};
pub use manifest::{ManifestError, ViewLookup, ViewRecord};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
