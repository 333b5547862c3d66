/*!
 * Summary of a pipeline run for display or export.
 */

use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::codec::JobStatus;
use crate::convert::ConvertJob;
use crate::errors::SubtitleError;
use crate::font_library::{MatchStatus, ResolutionRecord};
use crate::requirements::RequirementSet;
use crate::staging::{StageStatus, StagedAsset};
use crate::subset::SubsetJob;

/// A required name together with the file it resolved to
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedName {
    pub name: String,
    pub path: PathBuf,
    /// Other fuzzy candidates that were passed over
    pub alternatives: usize,
}

/// A file that was skipped, with the reason
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileIssue {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of one subset or convert job
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobOutcome {
    pub source: PathBuf,
    pub outputs: Vec<PathBuf>,
    pub status: JobStatus,
}

impl JobOutcome {
    fn new(source: &Path, outputs: &[PathBuf], status: &JobStatus) -> Self {
        Self {
            source: source.to_path_buf(),
            outputs: outputs.to_vec(),
            status: status.clone(),
        }
    }
}

fn count_status(jobs: &[JobOutcome]) -> (usize, usize, usize) {
    let succeeded = jobs.iter().filter(|j| j.status == JobStatus::Succeeded).count();
    let failed = jobs.iter().filter(|j| matches!(j.status, JobStatus::Failed(_))).count();
    (succeeded, failed, jobs.len() - succeeded - failed)
}

/// Everything a caller needs to show what was found, staged and trimmed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub generated_at: String,
    pub total_required: usize,
    pub total_glyphs: usize,
    pub exact: Vec<MatchedName>,
    pub fuzzy: Vec<MatchedName>,
    pub missing: Vec<String>,
    pub skipped_documents: Vec<FileIssue>,
    pub staged: usize,
    pub staging_failures: Vec<FileIssue>,
    pub subset_jobs: Vec<JobOutcome>,
    pub conversions: Vec<JobOutcome>,
}

impl Report {
    pub fn exact_count(&self) -> usize {
        self.exact.len()
    }

    pub fn fuzzy_count(&self) -> usize {
        self.fuzzy.len()
    }

    pub fn missing_count(&self) -> usize {
        self.missing.len()
    }

    /// Fuzzy matches that had more than one candidate
    pub fn ambiguous(&self) -> impl Iterator<Item = &MatchedName> {
        self.fuzzy.iter().filter(|m| m.alternatives > 0)
    }

    pub fn subset_succeeded(&self) -> usize {
        count_status(&self.subset_jobs).0
    }

    pub fn subset_failed(&self) -> usize {
        count_status(&self.subset_jobs).1
    }

    /// Faces written by conversion
    pub fn converted_faces(&self) -> usize {
        self.conversions.iter().map(|j| j.outputs.len()).sum()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Required font names: {}", self.total_required)?;
        writeln!(f, "Required glyphs: {}", self.total_glyphs)?;
        writeln!(f, "Exact matches: {}", self.exact_count())?;
        for m in &self.exact {
            writeln!(f, "  {} -> {}", m.name, m.path.display())?;
        }
        writeln!(f, "Fuzzy matches: {}", self.fuzzy_count())?;
        for m in &self.fuzzy {
            if m.alternatives > 0 {
                writeln!(f, "  {} -> {} ({} other candidates)", m.name, m.path.display(), m.alternatives)?;
            } else {
                writeln!(f, "  {} -> {}", m.name, m.path.display())?;
            }
        }
        writeln!(f, "Missing: {}", self.missing_count())?;
        for name in &self.missing {
            writeln!(f, "  {}", name)?;
        }
        if !self.skipped_documents.is_empty() {
            writeln!(f, "Skipped documents: {}", self.skipped_documents.len())?;
            for doc in &self.skipped_documents {
                writeln!(f, "  {}: {}", doc.path.display(), doc.reason)?;
            }
        }
        writeln!(f, "Staged files: {}", self.staged)?;
        for failure in &self.staging_failures {
            writeln!(f, "  failed {}: {}", failure.path.display(), failure.reason)?;
        }
        for (label, jobs) in [("Subset", &self.subset_jobs), ("Convert", &self.conversions)] {
            if jobs.is_empty() {
                continue;
            }
            let (succeeded, failed, pending) = count_status(jobs);
            writeln!(f, "{}: {} succeeded, {} failed, {} pending", label, succeeded, failed, pending)?;
            for job in jobs {
                if let JobStatus::Failed(reason) = &job.status {
                    writeln!(f, "  failed {}: {}", job.source.display(), reason)?;
                }
            }
        }
        Ok(())
    }
}

/// Builds a `Report` from the outputs of the pipeline stages
pub struct ResolutionReporter;

impl ResolutionReporter {
    /// Summarize a run; stages that did not run are passed as empty slices
    ///
    /// The same inputs always give the same report.
    pub fn summarize(
        requirements: &RequirementSet,
        records: &[ResolutionRecord],
        decode_errors: &[SubtitleError],
        staged: &[StagedAsset],
        jobs: &[SubsetJob],
        conversions: &[ConvertJob],
        generated_at: DateTime<Local>,
    ) -> Report {
        let mut exact = Vec::new();
        let mut fuzzy = Vec::new();
        let mut missing = Vec::new();

        for record in records {
            match (record.status, &record.asset) {
                (MatchStatus::Exact, Some(asset)) => exact.push(MatchedName {
                    name: record.name.clone(),
                    path: asset.path.clone(),
                    alternatives: 0,
                }),
                (MatchStatus::Fuzzy, Some(asset)) => fuzzy.push(MatchedName {
                    name: record.name.clone(),
                    path: asset.path.clone(),
                    alternatives: record.alternatives,
                }),
                _ => missing.push(record.name.clone()),
            }
        }

        let staging_failures = staged
            .iter()
            .filter_map(|item| match &item.status {
                StageStatus::Failed(reason) => Some(FileIssue {
                    path: item.asset.path.clone(),
                    reason: reason.clone(),
                }),
                StageStatus::Copied => None,
            })
            .collect();

        Report {
            generated_at: generated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            total_required: records.len().max(requirements.name_count()),
            total_glyphs: requirements.glyph_count(),
            exact,
            fuzzy,
            missing,
            skipped_documents: decode_errors
                .iter()
                .map(|e| FileIssue { path: e.path().clone(), reason: e.to_string() })
                .collect(),
            staged: staged.iter().filter(|s| s.is_copied()).count(),
            staging_failures,
            subset_jobs: jobs
                .iter()
                .map(|job| JobOutcome::new(&job.source, &job.outputs, &job.status))
                .collect(),
            conversions: conversions
                .iter()
                .map(|job| JobOutcome::new(&job.source, &job.outputs, &job.status))
                .collect(),
        }
    }
}
