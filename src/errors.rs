/*!
 * Error types for the subfont application.
 *
 * Each pipeline stage owns its error type. Failures that only concern one
 * document or one font asset are absorbed by the stage and surfaced in the
 * final report; only the errors returned from a stage abort it.
 */

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading a subtitle document
#[derive(Error, Debug)]
pub enum SubtitleError {
    /// The file could not be read from disk
    #[error("Failed to read subtitle file {path:?}: {source}")]
    Read {
        /// Path of the document
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// None of the configured encodings could decode the file
    #[error("Failed to decode subtitle file {path:?} (tried: {tried})")]
    Decode {
        /// Path of the document
        path: PathBuf,
        /// Comma-separated list of the encodings that were attempted
        tried: String,
    },
}

impl SubtitleError {
    /// Path of the document this error refers to
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::Read { path, .. } | Self::Decode { path, .. } => path,
        }
    }
}

/// Errors that abort a font library matching run
#[derive(Error, Debug)]
pub enum MatchError {
    /// The library root does not exist or is not a directory
    #[error("Font library root is not a directory: {0:?}")]
    LibraryNotFound(PathBuf),

    /// The run was cancelled by the caller
    #[error("Font matching was cancelled")]
    Cancelled,
}

/// Errors that abort a whole staging (or subsetting) phase
#[derive(Error, Debug)]
pub enum StagingError {
    /// The output directory could not be cleared
    #[error("Failed to clear output directory {path:?}: {source}")]
    Clear {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The output directory could not be created
    #[error("Failed to create output directory {path:?}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Clearing the output directory would delete input files
    #[error("Output directory {output:?} overlaps input {input:?}")]
    Overlap {
        output: PathBuf,
        input: PathBuf,
    },
}

/// Errors raised while inspecting a font file
#[derive(Error, Debug)]
pub enum FontFileError {
    #[error("Failed to read font file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not a font or font collection that can be inspected
    #[error("Malformed font file {path:?}: {reason}")]
    Malformed { path: PathBuf, reason: String },
}

/// Errors reported by a font codec for a single subset job
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    /// The codec process could not be started
    #[error("Failed to start font codec: {0}")]
    Spawn(String),

    /// The codec rejected the font (malformed font, unsupported table, ...)
    #[error("Font codec failed: {0}")]
    Failed(String),

    /// The codec did not finish in time
    #[error("Font codec timed out after {0} seconds")]
    Timeout(u64),

    /// The codec reported success but produced no output file
    #[error("Font codec produced no output at {0:?}")]
    MissingOutput(PathBuf),

    /// Local I/O around the codec call failed
    #[error("I/O error around font codec: {0}")]
    Io(String),
}

impl From<std::io::Error> for CodecError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from subtitle processing
    #[error("Subtitle error: {0}")]
    Subtitle(#[from] SubtitleError),

    /// Error from font matching
    #[error("Matching error: {0}")]
    Match(#[from] MatchError),

    /// Error preparing output directories
    #[error("Staging error: {0}")]
    Staging(#[from] StagingError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
