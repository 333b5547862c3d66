/*!
 * Conversion of OpenType and collection fonts into stand-alone TrueType files.
 *
 * Every face of every source is written as its own `.ttf` file, named after
 * the family found in the face's naming table. Collections are split face by
 * face. The font bytes are rewritten by a `FontCodec`; this module only plans
 * names and runs the jobs.
 */

use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::cancel::CancelFlag;
use crate::codec::{ConvertRequest, FontCodec, JobStatus};
use crate::errors::StagingError;
use crate::font_file::{self, FontFace};
use crate::staging;
use crate::subset::recreate_output_dir;

// @const: Extension of every converted file
const OUTPUT_EXTENSION: &str = "ttf";

/// Conversion of one source file
#[derive(Debug, Clone, Serialize)]
pub struct ConvertJob {
    pub source: PathBuf,
    /// Files written, one per face
    pub outputs: Vec<PathBuf>,
    pub status: JobStatus,
}

impl ConvertJob {
    pub fn succeeded(&self) -> bool {
        self.status == JobStatus::Succeeded
    }
}

// A source with its planned (face number, output path) pairs
#[derive(Debug)]
struct Plan {
    source: PathBuf,
    targets: Result<Vec<(Option<u32>, PathBuf)>, String>,
}

/// Converts font files through a codec
#[derive(Debug, Clone)]
pub struct FontConverter {
    codec: Arc<dyn FontCodec>,
    concurrent_jobs: usize,
    cancel: CancelFlag,
}

impl FontConverter {
    pub fn new(codec: Arc<dyn FontCodec>, concurrent_jobs: usize) -> Self {
        Self {
            codec,
            concurrent_jobs: concurrent_jobs.max(1),
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Convert every face of `sources` into a freshly recreated `output_dir`
    ///
    /// Output names are planned up front, in source order, so two faces with
    /// the same family never write to the same file. Jobs come back in the
    /// order of `sources`.
    pub async fn convert_all(
        &self,
        sources: &[PathBuf],
        output_dir: &Path,
        on_finished: impl Fn(usize, usize, &ConvertJob),
    ) -> Result<Vec<ConvertJob>, StagingError> {
        for source in sources {
            staging::ensure_disjoint(output_dir, source)?;
        }
        recreate_output_dir(output_dir)?;

        let plans = plan_outputs(sources, output_dir);
        let total = plans.len();
        let finished = AtomicUsize::new(0);
        let finished = &finished;
        let on_finished = &on_finished;

        let mut results: Vec<(usize, ConvertJob)> = stream::iter(plans.into_iter().enumerate())
            .map(|(index, plan)| async move {
                let job = self.run_plan(plan).await;
                let current = finished.fetch_add(1, Ordering::SeqCst) + 1;
                on_finished(current, total, &job);
                (index, job)
            })
            .buffer_unordered(self.concurrent_jobs)
            .collect()
            .await;

        results.sort_by_key(|(index, _)| *index);
        let jobs: Vec<ConvertJob> = results.into_iter().map(|(_, job)| job).collect();

        let written: usize = jobs.iter().map(|job| job.outputs.len()).sum();
        info!("Converted {} faces from {} font files into {:?}", written, jobs.len(), output_dir);
        Ok(jobs)
    }

    async fn run_plan(&self, plan: Plan) -> ConvertJob {
        let mut job = ConvertJob {
            source: plan.source,
            outputs: Vec::new(),
            status: JobStatus::Pending,
        };
        if self.cancel.is_cancelled() {
            return job;
        }

        let targets = match plan.targets {
            Ok(targets) => targets,
            Err(reason) => {
                warn!("Cannot convert {:?}: {}", job.source, reason);
                job.status = JobStatus::Failed(reason);
                return job;
            }
        };

        let mut failures = Vec::new();
        for (font_number, output) in targets {
            let request = ConvertRequest {
                source: job.source.clone(),
                output,
                font_number,
            };
            match self.codec.convert(&request).await {
                Ok(()) => {
                    debug!("Converted {:?} -> {:?}", request.source, request.output);
                    job.outputs.push(request.output);
                }
                Err(e) => {
                    warn!("Failed to convert {:?}: {}", request.source, e);
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
}

fn plan_outputs(sources: &[PathBuf], output_dir: &Path) -> Vec<Plan> {
    let mut taken: HashSet<String> = HashSet::new();

    sources
        .iter()
        .map(|source| {
            let targets = font_file::read_faces(source)
                .map_err(|e| e.to_string())
                .map(|faces| {
                    faces
                        .iter()
                        .map(|face| {
                            let stem = unique_stem(&mut taken, output_stem(source, face));
                            (face.index, output_dir.join(format!("{}.{}", stem, OUTPUT_EXTENSION)))
                        })
                        .collect()
                });
            Plan { source: source.clone(), targets }
        })
        .collect()
}

// Family name when the face has one, otherwise the source stem plus the face index
fn output_stem(source: &Path, face: &FontFace) -> String {
    if let Some(family) = face.family.as_deref().map(font_file::file_stem_for) {
        if !family.is_empty() {
            return family;
        }
    }
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "font".to_string());
    match face.index {
        Some(index) => format!("{}-{}", stem, index),
        None => stem,
    }
}

// Names are compared ignoring case; repeats get `_2`, `_3`, ...
fn unique_stem(taken: &mut HashSet<String>, stem: String) -> String {
    if taken.insert(stem.to_lowercase()) {
        return stem;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{}_{}", stem, n);
        if taken.insert(candidate.to_lowercase()) {
            return candidate;
        }
        n += 1;
    }
}
