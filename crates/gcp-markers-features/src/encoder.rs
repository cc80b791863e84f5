//! Feature and descriptor file emission for manifest-resolved views.

use crate::types::{DescriptorType, ImageMarkerGroups, MarkerDetection};
use gcp_markers_core::ViewLookup;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Descriptor record width in bytes; marker IDs must stay below this.
pub const DESCRIPTOR_LEN: usize = 128;

#[derive(thiserror::Error, Debug)]
pub enum EncodeError {
    #[error("marker id {id} out of range for one-hot descriptor (max {max})", max = DESCRIPTOR_LEN - 1)]
    MarkerIdOutOfRange { id: u32 },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Per-marker view counts accumulated while writing output files.
///
/// Covers every marker ID encountered in the input, including markers whose
/// images had no manifest entry (those stay at 0 views).
#[derive(Debug, Default, PartialEq, Eq)]
pub struct MarkerReport {
    views_by_id: BTreeMap<u32, u32>,
}

impl MarkerReport {
    fn observe(&mut self, id: u32) {
        self.views_by_id.entry(id).or_insert(0);
    }

    fn count_view(&mut self, id: u32) {
        *self.views_by_id.entry(id).or_insert(0) += 1;
    }

    /// Number of views whose output contains `id`, if the marker was seen.
    pub fn view_count(&self, id: u32) -> Option<u32> {
        self.views_by_id.get(&id).copied()
    }

    /// All (marker ID, view count) pairs, ascending by ID.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.views_by_id.iter().map(|(&id, &views)| (id, views))
    }

    pub fn log_summary(&self) {
        log::info!("Markers report:");
        for (id, views) in self.iter() {
            log::info!("\tFound marker {id} in {views} view(s)");
        }
    }
}

/// Write one `.feat`/`.desc` file pair per manifest-resolved image.
///
/// Images without a manifest entry are skipped: a marker detection on an
/// unphotographed or excluded image is expected input, not an error. Returns
/// the per-marker view counts.
pub fn write_descriptors(
    output_dir: &Path,
    groups: &ImageMarkerGroups,
    lookup: &ViewLookup,
    descriptor_type: DescriptorType,
) -> Result<MarkerReport, EncodeError> {
    log::info!("Writing {descriptor_type} descriptor files");

    let mut report = MarkerReport::default();
    for markers in groups.values() {
        for marker in markers {
            report.observe(marker.id);
        }
    }

    for (image, markers) in groups {
        let Some(view_id) = lookup.get(image) else {
            log::debug!("no view for image {image}, markers dropped");
            continue;
        };
        write_view(output_dir, view_id, markers, descriptor_type)?;

        let mut ids: Vec<u32> = markers.iter().map(|m| m.id).collect();
        ids.sort_unstable();
        ids.dedup();
        for id in ids {
            report.count_view(id);
        }
    }

    report.log_summary();
    Ok(report)
}

fn write_view(
    output_dir: &Path,
    view_id: &str,
    markers: &[MarkerDetection],
    descriptor_type: DescriptorType,
) -> Result<(), EncodeError> {
    let stem = format!("{view_id}.{}", descriptor_type.as_str());
    let mut feat = BufWriter::new(File::create(output_dir.join(format!("{stem}.feat")))?);
    let mut desc = BufWriter::new(File::create(output_dir.join(format!("{stem}.desc")))?);

    desc.write_all(&(markers.len() as u64).to_le_bytes())?;
    for marker in markers {
        // Validate before writing anything for this marker: a partial file
        // is accepted on error, a wrong-offset byte is not.
        let record = one_hot(marker.id)?;
        writeln!(feat, "{:.2} {:.2} {:.4} 0", marker.x, marker.y, marker.size)?;
        desc.write_all(&record)?;
    }

    desc.flush()?;
    feat.flush()?;
    Ok(())
}

fn one_hot(id: u32) -> Result<[u8; DESCRIPTOR_LEN], EncodeError> {
    let index = id as usize;
    if index >= DESCRIPTOR_LEN {
        return Err(EncodeError::MarkerIdOutOfRange { id });
    }
    let mut record = [0u8; DESCRIPTOR_LEN];
    record[index] = 255;
    Ok(record)
}
