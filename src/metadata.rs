//! Feature metadata store (C3): per-feature side data keyed by feature name.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::RampError;
use crate::ports::atomic_write;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FeatureMetadataEntry {
    #[serde(rename = "displayName", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

type MetadataMap = BTreeMap<String, FeatureMetadataEntry>;

pub struct FeatureMetadataStore {
    file: PathBuf,
    entries: MetadataMap,
}

impl FeatureMetadataStore {
    pub fn load(project_dir: &Path) -> anyhow::Result<Self> {
        let file = crate::paths::feature_metadata_file(project_dir);
        let entries = load_entries(&file)?;
        Ok(Self { file, entries })
    }

    /// `SetDisplayName(feature, name)`. Setting an empty name deletes the
    /// entry entirely.
    pub fn set_display_name(&mut self, feature: &str, name: &str) -> anyhow::Result<()> {
        if name.is_empty() {
            self.entries.remove(feature);
        } else {
            self.entries.insert(
                feature.to_string(),
                FeatureMetadataEntry {
                    display_name: Some(name.to_string()),
                },
            );
        }
        self.persist()
    }

    pub fn get_display_name(&self, feature: &str) -> Option<&str> {
        self.entries
            .get(feature)
            .and_then(|e| e.display_name.as_deref())
    }

    /// `RemoveFeature(feature)`: idempotent.
    pub fn remove_feature(&mut self, feature: &str) -> anyhow::Result<()> {
        if self.entries.remove(feature).is_some() {
            self.persist()?;
        }
        Ok(())
    }

    fn persist(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.entries)?;
        atomic_write(&self.file, json.as_bytes())?;
        Ok(())
    }
}

fn load_entries(file: &Path) -> anyhow::Result<MetadataMap> {
    let contents = match std::fs::read_to_string(file) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(MetadataMap::new()),
        Err(e) => return Err(e.into()),
    };
    if contents.trim().is_empty() {
        return Ok(MetadataMap::new());
    }
    serde_json::from_str(&contents)
        .map_err(|e| RampError::fatal_bug(format!("malformed feature_metadata.json: {e}")).into())
}
