/*!
 * External font codec seam.
 *
 * The actual font rewriting is never done in-process; it is handed to a
 * `FontCodec`:
 * - `fonttools`: runs the fontTools command line tools as external processes
 * - `mock`: in-process codec used by tests
 */

use async_trait::async_trait;
use serde::Serialize;
use std::fmt::Debug;
use std::path::PathBuf;

use crate::errors::CodecError;

pub mod fonttools;
pub mod mock;

/// What a codec is asked to do when trimming one face
#[derive(Debug, Clone, PartialEq)]
pub struct SubsetRequest {
    /// Font file to read
    pub source: PathBuf,
    /// Where the trimmed face must be written
    pub output: PathBuf,
    /// Characters whose glyphs must be kept
    pub glyphs: String,
    /// Face to read from a collection; `None` for single-face files
    pub font_number: Option<u32>,
    /// Keep every naming record of the source unchanged
    pub preserve_names: bool,
}

/// What a codec is asked to do when saving one face as a stand-alone font
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertRequest {
    pub source: PathBuf,
    pub output: PathBuf,
    /// Face to extract from a collection; `None` for single-face files
    pub font_number: Option<u32>,
}

/// External font codec performing the actual font rewriting
#[async_trait]
pub trait FontCodec: Send + Sync + Debug {
    /// Write a subset of one face of `request.source` to `request.output`
    async fn subset(&self, request: &SubsetRequest) -> Result<(), CodecError>;

    /// Save one face of `request.source` as a plain, single-face font file
    async fn convert(&self, request: &ConvertRequest) -> Result<(), CodecError>;

    /// Short name used in logs
    fn name(&self) -> &str;
}

/// State of a codec job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum JobStatus {
    /// Not run (yet); jobs skipped by cancellation stay here
    Pending,
    Succeeded,
    Failed(String),
}
