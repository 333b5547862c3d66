/*!
 * Tests for error types and conversions
 */

use std::io;
use std::path::PathBuf;
use subfont::errors::{AppError, CodecError, MatchError, StagingError, SubtitleError};

/// Test that subtitle errors expose their document path
#[test]
fn test_subtitle_error_path_shouldReturnDocument() {
    let error = SubtitleError::Decode { path: PathBuf::from("a.ass"), tried: "utf-8, utf-16le".to_string() };
    assert_eq!(error.path(), &PathBuf::from("a.ass"));
    assert!(error.to_string().contains("utf-8, utf-16le"));
}

/// Test conversions into AppError
#[test]
fn test_app_error_from_shouldWrapStageErrors() {
    let error: AppError = MatchError::Cancelled.into();
    assert!(matches!(error, AppError::Match(MatchError::Cancelled)));

    let error: AppError = StagingError::Create {
        path: PathBuf::from("out"),
        source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
    }
    .into();
    assert!(error.to_string().starts_with("Staging error"));

    let error: AppError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
    assert!(matches!(error, AppError::File(_)));

    let error: AppError = anyhow::anyhow!("boom").into();
    assert_eq!(error.to_string(), "Unknown error: boom");
}

/// Test that codec I/O errors keep their message
#[test]
fn test_codec_error_from_io_shouldKeepMessage() {
    let error: CodecError = io::Error::other("disk full").into();
    assert_eq!(error, CodecError::Io("disk full".to_string()));
    assert_eq!(CodecError::Timeout(30).to_string(), "Font codec timed out after 30 seconds");
}
