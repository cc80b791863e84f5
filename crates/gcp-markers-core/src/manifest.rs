//! View manifest loading (image file name → opaque view identifier).

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Errors raised while loading a view manifest.
#[derive(thiserror::Error, Debug)]
pub enum ManifestError {
    #[error("view manifest not found: {0}")]
    MissingFile(PathBuf),
    #[error("malformed view manifest: {0}")]
    Malformed(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// One entry of the manifest's `views` array. Unknown keys are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ViewRecord {
    pub path: String,
    #[serde(rename = "viewId")]
    pub view_id: String,
}

/// Mapping from image base file name (case-sensitive) to view identifier.
#[derive(Debug, Default)]
pub struct ViewLookup {
    by_name: HashMap<String, String>,
}

impl ViewLookup {
    /// Load a manifest with a top-level `views` array of `{path, viewId}`
    /// objects.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ManifestError::MissingFile(path.to_path_buf()));
        }
        let raw = fs::read_to_string(path)?;
        let doc: serde_json::Value = serde_json::from_str(&raw)?;
        let views = doc
            .get("views")
            .ok_or_else(|| ManifestError::Malformed("missing `views` key".into()))?;
        let entries = views
            .as_array()
            .ok_or_else(|| ManifestError::Malformed("`views` is not an array".into()))?;

        let mut by_name = HashMap::new();
        for entry in entries {
            let record: ViewRecord = serde_json::from_value(entry.clone())
                .map_err(|err| ManifestError::Malformed(format!("bad view entry: {err}")))?;
            by_name.insert(base_name(&record.path).to_string(), record.view_id);
        }
        log::info!("Found {} view(s)", by_name.len());
        Ok(Self { by_name })
    }

    /// Look up the view identifier for an image base file name.
    pub fn get(&self, image_name: &str) -> Option<&str> {
        self.by_name.get(image_name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// File-name component of a path; both separator flavors appear in manifests.
fn base_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}
