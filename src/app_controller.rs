use anyhow::{Context, Result};
use chrono::Local;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{info, warn};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::Config;
use crate::cancel::CancelFlag;
use crate::codec::FontCodec;
use crate::codec::fonttools::FontToolsCodec;
use crate::convert::{ConvertJob, FontConverter};
use crate::errors::SubtitleError;
use crate::file_utils::FileManager;
use crate::font_library::{ClassRole, FontAsset, FontLibraryMatcher, ResolutionRecord};
use crate::report::{Report, ResolutionReporter};
use crate::requirements::{RequirementAggregator, RequirementSet};
use crate::staging::{self, AssetStager, StageStatus, StagedAsset};
use crate::subset::{SubsetJob, SubsetOrchestrator};
use crate::subtitle_processor;

// @module: Application controller driving the font pipeline

/// Session object owning the requirement set and running the pipeline stages
pub struct Controller {
    // @field: App configuration
    config: Config,

    // @field: Requirements accumulated by this session
    aggregator: Mutex<RequirementAggregator>,

    // @field: Codec used for subsetting and conversion
    codec: Arc<dyn FontCodec>,

    // @field: Shared cancellation flag
    cancel: CancelFlag,

    multi_progress: MultiProgress,
}

/// Everything a full run produced
#[derive(Debug)]
pub struct PipelineOutcome {
    pub requirements: RequirementSet,
    pub records: Vec<ResolutionRecord>,
    pub staged: Vec<StagedAsset>,
    pub jobs: Vec<SubsetJob>,
    pub conversions: Vec<ConvertJob>,
    pub report: Report,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;
        let codec = Arc::new(FontToolsCodec::from_config(&config.subset, &config.convert));

        Ok(Self {
            config,
            aggregator: Mutex::new(RequirementAggregator::new()),
            codec,
            cancel: CancelFlag::new(),
            multi_progress: MultiProgress::new(),
        })
    }

    /// Replace the font codec
    pub fn with_codec(mut self, codec: Arc<dyn FontCodec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Flag that stops matching and subsetting at the next file boundary
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Current requirements of the session
    pub fn requirements(&self) -> RequirementSet {
        self.aggregator.lock().snapshot()
    }

    /// Forget every requirement collected so far
    pub fn reset_requirements(&self) {
        self.aggregator.lock().reset();
    }

    /// Parse subtitle documents and merge them into the session requirements
    ///
    /// Documents that cannot be read are skipped and returned as errors.
    pub fn load_documents(&self, paths: &[PathBuf]) -> (RequirementSet, Vec<SubtitleError>) {
        let progress_bar = self.progress_bar(paths.len(), "documents");
        let mut failures = Vec::new();

        for path in paths {
            progress_bar.set_message(file_label(path));
            match subtitle_processor::parse_file(path, &self.config.encodings) {
                Ok(parsed) => self.aggregator.lock().add_parsed(&parsed),
                Err(e) => {
                    warn!("Skipping document: {}", e);
                    failures.push(e);
                }
            }
            progress_bar.inc(1);
        }
        progress_bar.finish_and_clear();

        let requirements = self.requirements();
        info!(
            "Loaded {} documents: {} font names, {} glyphs",
            paths.len() - failures.len(),
            requirements.name_count(),
            requirements.glyph_count()
        );
        (requirements, failures)
    }

    /// Write the requirements in the export format
    pub fn export_requirements<P: AsRef<Path>>(&self, requirements: &RequirementSet, path: P) -> Result<()> {
        FileManager::write_to_file(&path, &requirements.to_export_string())?;
        info!("Requirements written to {}", path.as_ref().display());
        Ok(())
    }

    /// Resolve every required name against the font library
    pub fn resolve_fonts(&self, requirements: &RequirementSet, library_root: &Path) -> Result<Vec<ResolutionRecord>> {
        let matcher = FontLibraryMatcher::new(self.config.extensions.classes(), self.config.matching.fuzzy_policy)
            .with_cancel(self.cancel.clone());

        let progress_bar = self.progress_bar(requirements.name_count(), "fonts");
        let records = matcher
            .resolve(requirements, library_root, |record| {
                progress_bar.set_message(record.name.clone());
                progress_bar.inc(1);
            })
            .with_context(|| format!("Failed to match fonts in {}", library_root.display()))?;
        progress_bar.finish_and_clear();

        Ok(records)
    }

    /// Copy matched fonts into a freshly recreated output layout
    pub fn stage_assets(&self, records: &[ResolutionRecord], output_root: &Path) -> Result<Vec<StagedAsset>> {
        let stager = AssetStager::new(&self.config.staging);
        let matched = records.iter().filter(|r| r.asset.is_some()).count();

        let progress_bar = self.progress_bar(matched, "files");
        let staged = stager
            .stage(records, output_root, |item| {
                progress_bar.set_message(item.asset.file_name());
                progress_bar.inc(1);
            })
            .context("Failed to prepare output directories")?;
        progress_bar.finish_and_clear();

        Ok(staged)
    }

    /// Subset every staged font into the subset subarea of `output_root`
    pub async fn subset_all(
        &self,
        staged: &[StagedAsset],
        glyphs: &BTreeSet<char>,
        output_root: &Path,
    ) -> Result<Vec<SubsetJob>> {
        let output_dir = output_root.join(&self.config.subset.output_dir);
        self.subset_into(staged, glyphs, &output_dir).await
    }

    /// Subset arbitrary font files, as if they had been staged in place
    pub async fn subset_files(
        &self,
        fonts: &[PathBuf],
        glyphs: &BTreeSet<char>,
        output_dir: &Path,
    ) -> Result<Vec<SubsetJob>> {
        let staged: Vec<StagedAsset> = fonts.iter().map(|path| staged_in_place(path)).collect();
        self.subset_into(&staged, glyphs, output_dir).await
    }

    async fn subset_into(
        &self,
        staged: &[StagedAsset],
        glyphs: &BTreeSet<char>,
        output_dir: &Path,
    ) -> Result<Vec<SubsetJob>> {
        let orchestrator = SubsetOrchestrator::new(Arc::clone(&self.codec), self.config.subset.concurrent_jobs)
            .with_cancel(self.cancel.clone());

        let progress_bar = self.progress_bar(staged.len(), "fonts");
        let pb = progress_bar.clone();
        let jobs = orchestrator
            .subset_all(staged, glyphs, output_dir, move |completed, _total, job| {
                pb.set_message(file_label(&job.source));
                pb.set_position(completed as u64);
            })
            .await
            .context("Failed to prepare subset directory")?;
        progress_bar.finish_and_clear();

        Ok(jobs)
    }

    /// Convert the staged secondary-class fonts into the convert subarea of `output_root`
    pub async fn convert_staged(&self, staged: &[StagedAsset], output_root: &Path) -> Result<Vec<ConvertJob>> {
        let sources: Vec<PathBuf> = staged
            .iter()
            .filter(|item| item.is_copied() && item.asset.role == ClassRole::Secondary)
            .map(|item| item.destination.clone())
            .collect();
        let output_dir = output_root.join(&self.config.convert.output_dir);
        self.convert_files(&sources, &output_dir).await
    }

    /// Convert every face of `fonts` into TrueType files in a recreated `output_dir`
    pub async fn convert_files(&self, fonts: &[PathBuf], output_dir: &Path) -> Result<Vec<ConvertJob>> {
        let converter = FontConverter::new(Arc::clone(&self.codec), self.config.subset.concurrent_jobs)
            .with_cancel(self.cancel.clone());

        let progress_bar = self.progress_bar(fonts.len(), "fonts");
        let pb = progress_bar.clone();
        let jobs = converter
            .convert_all(fonts, output_dir, move |completed, _total, job| {
                pb.set_message(file_label(&job.source));
                pb.set_position(completed as u64);
            })
            .await
            .context("Failed to prepare convert directory")?;
        progress_bar.finish_and_clear();

        Ok(jobs)
    }

    /// Summarize the outputs of the stages that ran, stamped with the current time
    pub fn build_report(
        &self,
        requirements: &RequirementSet,
        records: &[ResolutionRecord],
        decode_errors: &[SubtitleError],
        staged: &[StagedAsset],
        jobs: &[SubsetJob],
        conversions: &[ConvertJob],
    ) -> Report {
        ResolutionReporter::summarize(requirements, records, decode_errors, staged, jobs, conversions, Local::now())
    }

    /// Run the whole pipeline: parse, resolve, stage, then optionally convert and subset
    ///
    /// An output root that contains the library, or lies inside it, is refused
    /// before anything is read.
    pub async fn run(&self, documents: &[PathBuf], library_root: &Path, output_root: &Path) -> Result<PipelineOutcome> {
        let start_time = Instant::now();
        staging::ensure_disjoint(output_root, library_root)
            .context("Refusing to recreate the output directory")?;

        let (requirements, decode_errors) = self.load_documents(documents);
        let records = self.resolve_fonts(&requirements, library_root)?;
        let staged = self.stage_assets(&records, output_root)?;

        let conversions = if self.config.convert.enabled {
            self.convert_staged(&staged, output_root).await?
        } else {
            Vec::new()
        };

        let jobs = if self.config.subset.enabled {
            self.subset_all(&staged, requirements.glyphs(), output_root).await?
        } else {
            Vec::new()
        };

        let report = self.build_report(&requirements, &records, &decode_errors, &staged, &jobs, &conversions);
        info!(
            "Done in {}: {} exact, {} fuzzy, {} missing",
            Self::format_duration(start_time.elapsed()),
            report.exact_count(),
            report.fuzzy_count(),
            report.missing_count()
        );

        Ok(PipelineOutcome { requirements, records, staged, jobs, conversions, report })
    }

    fn progress_bar(&self, len: usize, unit: &str) -> ProgressBar {
        let progress_bar = self.multi_progress.add(ProgressBar::new(len as u64));
        let template = format!(
            "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {} ({{percent}}%) {{msg}}",
            unit
        );
        let style = ProgressStyle::default_bar()
            .template(&template)
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars("█▓▒░"));
        progress_bar
    }

    // Format duration in a human-readable format (HH:MM:SS)
    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

// A font the user picked directly, treated as already staged where it lies
fn staged_in_place(path: &Path) -> StagedAsset {
    let status = if FileManager::file_exists(path) {
        StageStatus::Copied
    } else {
        StageStatus::Failed(format!("file does not exist: {}", path.display()))
    };

    StagedAsset {
        asset: FontAsset {
            path: path.to_path_buf(),
            extension: FileManager::extension_of(path).unwrap_or_default(),
            base_name: path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default(),
            role: ClassRole::Primary,
        },
        destination: path.to_path_buf(),
        names: Vec::new(),
        status,
    }
}
