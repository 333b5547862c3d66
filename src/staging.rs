/*!
 * Staging of resolved font files into a fresh output layout.
 *
 * The output root is cleared and recreated with one subarea per extension
 * class role. Each matched file is copied once, under its original file name.
 * An output root that holds, or lies inside, one of the inputs is refused
 * before anything is removed.
 */

use log::{debug, info, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::app_config::StagingConfig;
use crate::errors::StagingError;
use crate::file_utils::FileManager;
use crate::font_library::{ClassRole, FontAsset, ResolutionRecord};

/// Result of copying one asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum StageStatus {
    Copied,
    Failed(String),
}

/// One matched font file and where it was staged
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StagedAsset {
    pub asset: FontAsset,
    /// Destination inside the output root
    pub destination: PathBuf,
    /// Required names that resolved to this file
    pub names: Vec<String>,
    pub status: StageStatus,
}

impl StagedAsset {
    pub fn is_copied(&self) -> bool {
        self.status == StageStatus::Copied
    }
}

/// Copies resolved assets into the output layout
#[derive(Debug, Clone)]
pub struct AssetStager {
    primary_dir: String,
    secondary_dir: String,
}

impl AssetStager {
    pub fn new(config: &StagingConfig) -> Self {
        Self {
            primary_dir: config.primary_dir.clone(),
            secondary_dir: config.secondary_dir.clone(),
        }
    }

    /// Subarea receiving assets of `role`
    pub fn subarea(&self, output_root: &Path, role: ClassRole) -> PathBuf {
        match role {
            ClassRole::Primary => output_root.join(&self.primary_dir),
            ClassRole::Secondary => output_root.join(&self.secondary_dir),
        }
    }

    /// Recreate the output layout and copy every matched asset into it
    ///
    /// Only failing to prepare the directories aborts staging. A failed copy is
    /// recorded on its `StagedAsset` and the remaining copies go ahead.
    pub fn stage(
        &self,
        records: &[ResolutionRecord],
        output_root: &Path,
        mut on_staged: impl FnMut(&StagedAsset),
    ) -> Result<Vec<StagedAsset>, StagingError> {
        for asset in records.iter().filter_map(|record| record.asset.as_ref()) {
            ensure_disjoint(output_root, &asset.path)?;
        }
        self.prepare(output_root)?;

        let mut staged: Vec<StagedAsset> = Vec::new();
        let mut by_source: HashMap<PathBuf, usize> = HashMap::new();

        for record in records {
            let Some(asset) = &record.asset else {
                continue;
            };
            if let Some(&index) = by_source.get(&asset.path) {
                staged[index].names.push(record.name.clone());
                continue;
            }
            by_source.insert(asset.path.clone(), staged.len());

            let destination = self.subarea(output_root, asset.role).join(asset.file_name());
            let status = if staged.iter().any(|s| same_destination(&s.destination, &destination)) {
                warn!(
                    "Not staging {:?}: {:?} was already staged from another file",
                    asset.path, destination
                );
                StageStatus::Failed(format!("destination {:?} already taken", destination))
            } else {
                match FileManager::copy_file(&asset.path, &destination) {
                    Ok(()) => {
                        debug!("Staged {:?} -> {:?}", asset.path, destination);
                        StageStatus::Copied
                    }
                    Err(e) => {
                        warn!("Failed to stage {:?}: {:#}", asset.path, e);
                        StageStatus::Failed(format!("{:#}", e))
                    }
                }
            };

            let item = StagedAsset {
                asset: asset.clone(),
                destination,
                names: vec![record.name.clone()],
                status,
            };
            on_staged(&item);
            staged.push(item);
        }

        let copied = staged.iter().filter(|s| s.is_copied()).count();
        info!("Staged {} of {} font files into {:?}", copied, staged.len(), output_root);
        Ok(staged)
    }

    fn prepare(&self, output_root: &Path) -> Result<(), StagingError> {
        if output_root.exists() {
            std::fs::remove_dir_all(output_root).map_err(|source| StagingError::Clear {
                path: output_root.to_path_buf(),
                source,
            })?;
        }

        for role in [ClassRole::Primary, ClassRole::Secondary] {
            let dir = self.subarea(output_root, role);
            std::fs::create_dir_all(&dir).map_err(|source| StagingError::Create { path: dir, source })?;
        }
        Ok(())
    }
}

/// Refuse an output directory that is, holds, or lies inside `input`
pub fn ensure_disjoint(output_dir: &Path, input: &Path) -> Result<(), StagingError> {
    if FileManager::paths_overlap(output_dir, input) {
        return Err(StagingError::Overlap {
            output: output_dir.to_path_buf(),
            input: input.to_path_buf(),
        });
    }
    Ok(())
}

// Same subarea and same file name ignoring case, as case-insensitive file systems see it
fn same_destination(a: &Path, b: &Path) -> bool {
    let lower = |p: &Path| p.file_name().map(|f| f.to_string_lossy().to_lowercase());
    a.parent() == b.parent() && lower(a) == lower(b)
}
