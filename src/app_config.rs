use anyhow::{anyhow, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::font_library::{ExtensionClass, FuzzyPolicy};
use crate::subtitle_processor::TextEncoding;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Root directory of the font library to search
    #[serde(default)]
    pub library_root: Option<PathBuf>,

    /// Root directory for staged fonts
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Ordered list of encodings tried when reading subtitle files
    #[serde(default = "default_encodings")]
    pub encodings: Vec<TextEncoding>,

    /// Extension classes recognised in the font library
    #[serde(default)]
    pub extensions: ExtensionConfig,

    /// Matching behaviour
    #[serde(default)]
    pub matching: MatchingConfig,

    /// Output layout
    #[serde(default)]
    pub staging: StagingConfig,

    /// Subsetting settings
    #[serde(default)]
    pub subset: SubsetConfig,

    /// OTF/TTC to TTF conversion settings
    #[serde(default)]
    pub convert: ConvertConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Font file extensions, grouped by priority
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ExtensionConfig {
    // @field: Extensions of the primary class, matched first
    #[serde(default = "default_primary_extensions")]
    pub primary: Vec<String>,

    // @field: Extensions of the secondary class, also used for fuzzy matching
    #[serde(default = "default_secondary_extensions")]
    pub secondary: Vec<String>,
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            primary: default_primary_extensions(),
            secondary: default_secondary_extensions(),
        }
    }
}

impl ExtensionConfig {
    /// Extension classes in priority order (primary first)
    pub fn classes(&self) -> Vec<ExtensionClass> {
        vec![
            ExtensionClass::primary(&self.primary),
            ExtensionClass::secondary(&self.secondary),
        ]
    }
}

/// Matching configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct MatchingConfig {
    /// Tie-break used when several files fuzzy-match one name
    #[serde(default)]
    pub fuzzy_policy: FuzzyPolicy,
}

/// Output directory layout
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StagingConfig {
    /// Subdirectory receiving primary-class fonts
    #[serde(default = "default_primary_dir")]
    pub primary_dir: String,

    /// Subdirectory receiving secondary-class fonts
    #[serde(default = "default_secondary_dir")]
    pub secondary_dir: String,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            primary_dir: default_primary_dir(),
            secondary_dir: default_secondary_dir(),
        }
    }
}

/// Subsetting configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SubsetConfig {
    /// Whether staged fonts are subset after staging
    #[serde(default)]
    pub enabled: bool,

    /// Subdirectory of the output root receiving subset fonts
    #[serde(default = "default_subset_dir")]
    pub output_dir: String,

    /// Maximum number of codec processes running at once
    #[serde(default = "default_concurrent_jobs")]
    pub concurrent_jobs: usize,

    /// Codec executable
    #[serde(default = "default_subset_command")]
    pub command: String,

    /// Per-job timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SubsetConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            output_dir: default_subset_dir(),
            concurrent_jobs: default_concurrent_jobs(),
            command: default_subset_command(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Conversion of staged OpenType and collection fonts into TrueType files
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ConvertConfig {
    /// Whether staged secondary-class fonts are converted after staging
    #[serde(default)]
    pub enabled: bool,

    /// Subdirectory of the output root receiving converted fonts
    #[serde(default = "default_convert_dir")]
    pub output_dir: String,

    /// fontTools executable
    #[serde(default = "default_convert_command")]
    pub command: String,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            output_dir: default_convert_dir(),
            command: default_convert_command(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Matching `log` filter
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("fonts")
}

fn default_encodings() -> Vec<TextEncoding> {
    vec![TextEncoding::Utf8, TextEncoding::Utf16Le, TextEncoding::Utf16Be]
}

fn default_primary_extensions() -> Vec<String> {
    vec!["ttf".to_string()]
}

fn default_secondary_extensions() -> Vec<String> {
    vec!["otf".to_string(), "ttc".to_string()]
}

fn default_primary_dir() -> String {
    "ttf".to_string()
}

fn default_secondary_dir() -> String {
    "otf_ttc".to_string()
}

fn default_subset_dir() -> String {
    "subset".to_string()
}

fn default_convert_dir() -> String {
    "converted".to_string()
}

fn default_convert_command() -> String {
    "fonttools".to_string()
}

fn default_concurrent_jobs() -> usize {
    4
}

fn default_subset_command() -> String {
    "pyftsubset".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

impl Config {
    /// Load the configuration from `path`, writing a default file if none exists
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let file = File::open(path)
                .with_context(|| format!("Failed to open config file: {}", path.display()))?;
            let reader = BufReader::new(file);
            let config: Config = serde_json::from_reader(reader)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            return Ok(config);
        }

        warn!("Config file not found at '{}', creating default config.", path.display());
        let config = Config::default();
        let config_json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;
        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write default config to file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.encodings.is_empty() {
            return Err(anyhow!("At least one subtitle encoding must be configured"));
        }

        if self.extensions.primary.is_empty() {
            return Err(anyhow!("The primary extension class must not be empty"));
        }
        if self.extensions.secondary.is_empty() {
            return Err(anyhow!("The secondary extension class must not be empty"));
        }

        let primary: HashSet<String> = self.extensions.primary.iter()
            .map(|ext| normalize_extension(ext))
            .collect();
        if let Some(ext) = self.extensions.secondary.iter()
            .map(|ext| normalize_extension(ext))
            .find(|ext| primary.contains(ext)) {
            return Err(anyhow!("Extension '{}' is listed in both extension classes", ext));
        }

        let subareas = [
            ("staging.primary_dir", &self.staging.primary_dir),
            ("staging.secondary_dir", &self.staging.secondary_dir),
            ("subset.output_dir", &self.subset.output_dir),
            ("convert.output_dir", &self.convert.output_dir),
        ];
        for (key, name) in subareas {
            validate_subarea(key, name)?;
        }
        let distinct: HashSet<String> = subareas.iter().map(|(_, name)| name.to_lowercase()).collect();
        if distinct.len() != subareas.len() {
            return Err(anyhow!("Staging, subset and convert subdirectories must have distinct names"));
        }

        if self.subset.concurrent_jobs == 0 {
            return Err(anyhow!("subset.concurrent_jobs must be at least 1"));
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            library_root: None,
            output_dir: default_output_dir(),
            encodings: default_encodings(),
            extensions: ExtensionConfig::default(),
            matching: MatchingConfig::default(),
            staging: StagingConfig::default(),
            subset: SubsetConfig::default(),
            convert: ConvertConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}

// A subarea is a single directory name directly below the output root
fn validate_subarea(key: &str, name: &str) -> Result<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed == "." || trimmed == ".." {
        return Err(anyhow!("{} must name a subdirectory, got '{}'", key, name));
    }
    if trimmed.contains(['/', '\\', ':']) {
        return Err(anyhow!("{} must be a single directory name, got '{}'", key, name));
    }
    Ok(())
}

/// Lowercase an extension and drop any leading dot
pub fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}
