/*!
 * Subsetting of staged font files.
 *
 * The orchestrator hands every staged asset plus the full required glyph set
 * to a `FontCodec`, with bounded concurrency. Collections are subset face by
 * face, each face written to its own file. A failing job is recorded and the
 * rest of the batch keeps going.
 */

use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::cancel::CancelFlag;
use crate::codec::{FontCodec, JobStatus, SubsetRequest};
use crate::errors::StagingError;
use crate::font_file;
use crate::staging::{self, StageStatus, StagedAsset};

/// Subsetting of one staged font file
#[derive(Debug, Clone, Serialize)]
pub struct SubsetJob {
    /// Staged file handed to the codec
    pub source: PathBuf,
    /// Required names served by this file
    pub names: Vec<String>,
    /// Glyphs to retain
    #[serde(skip)]
    pub glyphs: Arc<BTreeSet<char>>,
    /// Files written, one per face
    pub outputs: Vec<PathBuf>,
    pub status: JobStatus,
}

impl SubsetJob {
    fn pending(staged: &StagedAsset, glyphs: Arc<BTreeSet<char>>) -> Self {
        Self {
            source: staged.destination.clone(),
            names: staged.names.clone(),
            glyphs,
            outputs: Vec::new(),
            status: JobStatus::Pending,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.status == JobStatus::Succeeded
    }
}

/// Runs subset jobs against a codec
#[derive(Debug, Clone)]
pub struct SubsetOrchestrator {
    codec: Arc<dyn FontCodec>,
    concurrent_jobs: usize,
    cancel: CancelFlag,
}

impl SubsetOrchestrator {
    pub fn new(codec: Arc<dyn FontCodec>, concurrent_jobs: usize) -> Self {
        Self {
            codec,
            concurrent_jobs: concurrent_jobs.max(1),
            cancel: CancelFlag::new(),
        }
    }

    /// Jobs not yet started when `cancel` fires are left pending
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Subset one staged asset into `output_dir`
    ///
    /// A single-face file keeps its name. Face `i` of a collection is written
    /// as `<stem>-<i>.ttf` or `<stem>-<i>.otf` depending on its outlines.
    pub async fn subset(&self, staged: &StagedAsset, glyphs: Arc<BTreeSet<char>>, output_dir: &Path) -> SubsetJob {
        let mut job = SubsetJob::pending(staged, glyphs);

        if self.cancel.is_cancelled() {
            return job;
        }
        if let StageStatus::Failed(reason) = &staged.status {
            job.status = JobStatus::Failed(format!("font was not staged: {}", reason));
            return job;
        }

        let targets = match face_targets(&job.source, output_dir).await {
            Ok(targets) => targets,
            Err(reason) => {
                warn!("Cannot subset {:?}: {}", job.source, reason);
                job.status = JobStatus::Failed(reason);
                return job;
            }
        };

        let glyph_text: String = job.glyphs.iter().collect();
        let mut failures = Vec::new();
        for (font_number, output) in targets {
            let request = SubsetRequest {
                source: job.source.clone(),
                output,
                glyphs: glyph_text.clone(),
                font_number,
                preserve_names: true,
            };

            match self.codec.subset(&request).await {
                Ok(()) => {
                    debug!("{} subset {:?} -> {:?}", self.codec.name(), request.source, request.output);
                    job.outputs.push(request.output);
                }
                Err(e) => {
                    warn!("Failed to subset {:?}: {}", request.source, e);
                    failures.push(match font_number {
                        Some(number) => format!("face {}: {}", number, e),
                        None => e.to_string(),
                    });
                }
            }
        }

        job.status = if failures.is_empty() {
            JobStatus::Succeeded
        } else {
            JobStatus::Failed(failures.join("; "))
        };
        job
    }

    /// Subset every staged asset into a freshly recreated `output_dir`
    ///
    /// Refuses to clear an `output_dir` that holds one of the staged files.
    /// Jobs run concurrently but come back in the order of `staged`.
    /// `on_finished` receives (finished count, total, job) after every job.
    pub async fn subset_all(
        &self,
        staged: &[StagedAsset],
        glyphs: &BTreeSet<char>,
        output_dir: &Path,
        on_finished: impl Fn(usize, usize, &SubsetJob),
    ) -> Result<Vec<SubsetJob>, StagingError> {
        for item in staged {
            staging::ensure_disjoint(output_dir, &item.destination)?;
        }
        recreate_output_dir(output_dir)?;

        if glyphs.is_empty() {
            warn!("No glyphs are required; subset fonts will only keep .notdef");
        }

        let glyphs = Arc::new(glyphs.clone());
        let total = staged.len();
        let finished = AtomicUsize::new(0);
        let finished = &finished;
        let on_finished = &on_finished;

        let mut results: Vec<(usize, SubsetJob)> = stream::iter(staged.iter().enumerate())
            .map(|(index, item)| {
                let glyphs = Arc::clone(&glyphs);
                async move {
                    let job = self.subset(item, glyphs, output_dir).await;
                    let current = finished.fetch_add(1, Ordering::SeqCst) + 1;
                    on_finished(current, total, &job);
                    (index, job)
                }
            })
            .buffer_unordered(self.concurrent_jobs)
            .collect()
            .await;

        results.sort_by_key(|(index, _)| *index);
        let jobs: Vec<SubsetJob> = results.into_iter().map(|(_, job)| job).collect();

        let succeeded = jobs.iter().filter(|job| job.succeeded()).count();
        info!("Subset {} of {} font files with {}", succeeded, jobs.len(), self.codec.name());
        Ok(jobs)
    }
}

/// Remove `output_dir` with its contents, then create it empty
pub(crate) fn recreate_output_dir(output_dir: &Path) -> Result<(), StagingError> {
    if output_dir.exists() {
        std::fs::remove_dir_all(output_dir).map_err(|source| StagingError::Clear {
            path: output_dir.to_path_buf(),
            source,
        })?;
    }
    std::fs::create_dir_all(output_dir).map_err(|source| StagingError::Create {
        path: output_dir.to_path_buf(),
        source,
    })
}

// One (face number, output path) pair per face to write
async fn face_targets(source: &Path, output_dir: &Path) -> Result<Vec<(Option<u32>, PathBuf)>, String> {
    let data = tokio::fs::read(source)
        .await
        .map_err(|e| format!("failed to read {:?}: {}", source, e))?;

    if !font_file::is_collection(&data) {
        let file_name = source
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .ok_or_else(|| format!("{:?} has no file name", source))?;
        return Ok(vec![(None, output_dir.join(file_name))]);
    }

    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "font".to_string());
    let faces = font_file::faces(&data)?;
    Ok(faces
        .iter()
        .map(|face| {
            let file_name = format!("{}-{}.{}", stem, face.number(), face.outlines.extension());
            (Some(face.number()), output_dir.join(file_name))
        })
        .collect())
}
