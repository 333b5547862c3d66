/*!
 * Resolution of required font names against a font library directory.
 *
 * Matching runs in two phases over a deterministic, lexicographically sorted
 * walk of the library:
 * - exact: case-insensitive equality of the name and a file's base name,
 *   tried for every extension class in priority order
 * - fuzzy: case-insensitive containment of the name in a base name, tried
 *   only for names still unresolved, and only over secondary classes
 *
 * Names matched by neither phase are reported as missing. This module never
 * touches the files it finds.
 */

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::app_config::normalize_extension;
use crate::cancel::CancelFlag;
use crate::errors::MatchError;
use crate::file_utils::FileManager;
use crate::requirements::RequirementSet;

/// Priority role of an extension class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassRole {
    /// The designated format, staged into its own subarea
    Primary,
    /// Remaining supported formats; also the only fuzzy-match candidates
    Secondary,
}

/// A group of file extensions with equal matching priority
#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionClass {
    pub role: ClassRole,
    /// Lowercased extensions without the dot
    pub extensions: Vec<String>,
}

impl ExtensionClass {
    pub fn new(role: ClassRole, extensions: &[String]) -> Self {
        Self {
            role,
            extensions: extensions.iter().map(|ext| normalize_extension(ext)).collect(),
        }
    }

    pub fn primary(extensions: &[String]) -> Self {
        Self::new(ClassRole::Primary, extensions)
    }

    pub fn secondary(extensions: &[String]) -> Self {
        Self::new(ClassRole::Secondary, extensions)
    }

    pub fn contains(&self, extension: &str) -> bool {
        self.extensions.iter().any(|ext| ext == extension)
    }
}

/// Tie-break used when several files fuzzy-match the same name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FuzzyPolicy {
    /// First candidate in sorted walk order
    #[default]
    FirstAlphabetical,
    /// Candidate with the shortest base name, walk order breaking ties
    ShortestName,
}

/// A font file found in the library
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FontAsset {
    /// Full path of the file
    pub path: PathBuf,
    /// Lowercased extension
    pub extension: String,
    /// File name without the extension
    pub base_name: String,
    /// Role of the class the extension belongs to
    pub role: ClassRole,
}

impl FontAsset {
    /// File name of the asset, as it should appear once staged
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_else(|| format!("{}.{}", self.base_name, self.extension))
    }
}

/// How a required name was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Exact,
    Fuzzy,
    Missing,
}

/// Outcome of resolving one required font name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolutionRecord {
    /// Required font name, in its display casing
    pub name: String,
    pub status: MatchStatus,
    /// Matched file; `None` exactly when the status is `Missing`
    pub asset: Option<FontAsset>,
    /// Number of other fuzzy candidates that were passed over
    pub alternatives: usize,
}

impl ResolutionRecord {
    fn exact(name: &str, asset: FontAsset) -> Self {
        Self { name: name.to_string(), status: MatchStatus::Exact, asset: Some(asset), alternatives: 0 }
    }

    fn fuzzy(name: &str, asset: FontAsset, alternatives: usize) -> Self {
        Self { name: name.to_string(), status: MatchStatus::Fuzzy, asset: Some(asset), alternatives }
    }

    fn missing(name: &str) -> Self {
        Self { name: name.to_string(), status: MatchStatus::Missing, asset: None, alternatives: 0 }
    }

    /// Whether the fuzzy pass had more than one candidate for this name
    pub fn is_ambiguous(&self) -> bool {
        self.alternatives > 0
    }
}

/// Every recognised font file of a library, in walk order
#[derive(Debug, Clone, Default)]
pub struct LibraryIndex {
    /// (class index, asset) pairs
    assets: Vec<(usize, FontAsset)>,
}

impl LibraryIndex {
    /// Walk `root` and collect the files belonging to one of `classes`
    ///
    /// Entries are visited sorted by file name in every directory. Unreadable
    /// entries are logged and skipped.
    pub fn scan(root: &Path, classes: &[ExtensionClass], cancel: &CancelFlag) -> Result<Self, MatchError> {
        if !FileManager::dir_exists(root) {
            return Err(MatchError::LibraryNotFound(root.to_path_buf()));
        }

        let mut assets = Vec::new();
        for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
            if cancel.is_cancelled() {
                return Err(MatchError::Cancelled);
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable library entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let Some(extension) = FileManager::extension_of(path) else {
                continue;
            };
            let Some(class_index) = classes.iter().position(|c| c.contains(&extension)) else {
                continue;
            };
            let base_name = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();

            assets.push((class_index, FontAsset {
                path: path.to_path_buf(),
                extension,
                base_name,
                role: classes[class_index].role,
            }));
        }

        debug!("Indexed {} font files under {:?}", assets.len(), root);
        Ok(Self { assets })
    }

    /// Build an index from assets already in walk order
    pub fn from_assets(classes: &[ExtensionClass], assets: Vec<FontAsset>) -> Self {
        let assets = assets
            .into_iter()
            .filter_map(|asset| {
                classes.iter()
                    .position(|c| c.contains(&asset.extension))
                    .map(|index| (index, asset))
            })
            .collect();
        Self { assets }
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    fn in_class(&self, class_index: usize) -> impl Iterator<Item = &FontAsset> {
        self.assets.iter().filter(move |(i, _)| *i == class_index).map(|(_, a)| a)
    }

    fn with_role(&self, role: ClassRole) -> impl Iterator<Item = &FontAsset> {
        self.assets.iter().filter(move |(_, a)| a.role == role).map(|(_, a)| a)
    }
}

/// Resolves required font names to files of a font library
#[derive(Debug, Clone)]
pub struct FontLibraryMatcher {
    /// Extension classes in priority order
    classes: Vec<ExtensionClass>,
    fuzzy_policy: FuzzyPolicy,
    cancel: CancelFlag,
}

impl FontLibraryMatcher {
    pub fn new(classes: Vec<ExtensionClass>, fuzzy_policy: FuzzyPolicy) -> Self {
        Self { classes, fuzzy_policy, cancel: CancelFlag::new() }
    }

    /// Use `cancel` to stop a running library walk
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn classes(&self) -> &[ExtensionClass] {
        &self.classes
    }

    /// Walk `library_root` and resolve every name of `requirements`
    ///
    /// `on_resolved` is called once per record as soon as it is final.
    pub fn resolve(
        &self,
        requirements: &RequirementSet,
        library_root: &Path,
        on_resolved: impl FnMut(&ResolutionRecord),
    ) -> Result<Vec<ResolutionRecord>, MatchError> {
        let index = LibraryIndex::scan(library_root, &self.classes, &self.cancel)?;
        Ok(self.resolve_in(requirements, &index, on_resolved))
    }

    /// Resolve against an already scanned library
    ///
    /// Records come back in the order of `requirements.names()`, one per name.
    pub fn resolve_in(
        &self,
        requirements: &RequirementSet,
        index: &LibraryIndex,
        mut on_resolved: impl FnMut(&ResolutionRecord),
    ) -> Vec<ResolutionRecord> {
        let order: Vec<&str> = requirements.names().collect();
        let mut remaining: HashMap<String, &str> = order.iter()
            .map(|name| (name.to_lowercase(), *name))
            .collect();
        let mut resolved: HashMap<String, ResolutionRecord> = HashMap::new();

        // Exact pass, class by class; all classes finish before any fuzzy match
        for class_index in 0..self.classes.len() {
            if remaining.is_empty() {
                break;
            }
            for asset in index.in_class(class_index) {
                let key = asset.base_name.to_lowercase();
                if let Some(name) = remaining.remove(&key) {
                    debug!("Exact match: {} -> {:?}", name, asset.path);
                    let record = ResolutionRecord::exact(name, asset.clone());
                    on_resolved(&record);
                    resolved.insert(key, record);
                }
            }
        }

        // Fuzzy pass over secondary classes only
        for name in &order {
            let key = name.to_lowercase();
            if !remaining.contains_key(&key) {
                continue;
            }

            let candidates: Vec<&FontAsset> = index
                .with_role(ClassRole::Secondary)
                .filter(|asset| asset.base_name.to_lowercase().contains(&key))
                .collect();

            let record = match self.pick_fuzzy(&candidates) {
                Some(asset) => {
                    let alternatives = candidates.len() - 1;
                    if alternatives > 0 {
                        warn!(
                            "Ambiguous fuzzy match for '{}': {} candidates, using {:?}",
                            name, candidates.len(), asset.path
                        );
                    } else {
                        debug!("Fuzzy match: {} -> {:?}", name, asset.path);
                    }
                    ResolutionRecord::fuzzy(name, asset.clone(), alternatives)
                }
                None => {
                    debug!("No font file found for '{}'", name);
                    ResolutionRecord::missing(name)
                }
            };

            remaining.remove(&key);
            on_resolved(&record);
            resolved.insert(key, record);
        }

        order
            .iter()
            .filter_map(|name| resolved.remove(&name.to_lowercase()))
            .collect()
    }

    fn pick_fuzzy<'a>(&self, candidates: &[&'a FontAsset]) -> Option<&'a FontAsset> {
        match self.fuzzy_policy {
            FuzzyPolicy::FirstAlphabetical => candidates.first().copied(),
            FuzzyPolicy::ShortestName => candidates
                .iter()
                .enumerate()
                .min_by_key(|(position, asset)| (asset.base_name.chars().count(), *position))
                .map(|(_, asset)| *asset),
        }
    }
}
