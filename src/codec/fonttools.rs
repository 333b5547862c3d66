/*!
 * Font codec backed by the fontTools command line tools.
 *
 * Subsetting runs `pyftsubset`; conversion runs `fonttools ttLib`, which
 * loads one face and saves it again as a plain sfnt file.
 */

use async_trait::async_trait;
use log::debug;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;

use crate::app_config::{ConvertConfig, SubsetConfig};
use crate::codec::{ConvertRequest, FontCodec, SubsetRequest};
use crate::errors::CodecError;

// @const: Options keeping every name record, layout feature and .notdef outline
const PRESERVE_OPTIONS: &[&str] = &[
    "--name-IDs=*",
    "--name-languages=*",
    "--name-legacy",
    "--layout-features=*",
    "--notdef-outline",
    "--recalc-bounds",
    "--no-recalc-timestamp",
    "--canonical-order",
];

/// Runs one fontTools process per face
#[derive(Debug, Clone)]
pub struct FontToolsCodec {
    subset_command: String,
    convert_command: String,
    timeout: Duration,
}

impl FontToolsCodec {
    pub fn new(subset_command: impl Into<String>, convert_command: impl Into<String>, timeout: Duration) -> Self {
        Self {
            subset_command: subset_command.into(),
            convert_command: convert_command.into(),
            timeout,
        }
    }

    pub fn from_config(subset: &SubsetConfig, convert: &ConvertConfig) -> Self {
        Self::new(
            subset.command.clone(),
            convert.command.clone(),
            Duration::from_secs(subset.timeout_secs),
        )
    }

    /// `pyftsubset` arguments for `request`, given the path of the glyph text file
    pub fn subset_args(request: &SubsetRequest, text_file: &Path) -> Vec<String> {
        let mut args = vec![
            request.source.to_string_lossy().to_string(),
            format!("--text-file={}", text_file.display()),
            format!("--output-file={}", request.output.display()),
        ];
        if request.preserve_names {
            args.extend(PRESERVE_OPTIONS.iter().map(|opt| opt.to_string()));
        }
        if let Some(number) = request.font_number {
            args.push(format!("--font-number={}", number));
        }
        args
    }

    /// `fonttools ttLib` arguments for `request`
    pub fn convert_args(request: &ConvertRequest) -> Vec<String> {
        let mut args = vec![
            "ttLib".to_string(),
            "-o".to_string(),
            request.output.to_string_lossy().to_string(),
        ];
        if let Some(number) = request.font_number {
            args.push("-y".to_string());
            args.push(number.to_string());
        }
        args.push(request.source.to_string_lossy().to_string());
        args
    }

    // Keep the last meaningful line of a Python traceback
    fn summarize_stderr(stderr: &str) -> String {
        stderr
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .last()
            .unwrap_or("no error output")
            .to_string()
    }

    async fn run(&self, command: &str, args: &[String], output: &Path) -> Result<(), CodecError> {
        debug!("Running {} {}", command, args.join(" "));

        let child = Command::new(command)
            .args(args)
            .kill_on_drop(true)
            .output();

        let result = tokio::select! {
            result = child => {
                result.map_err(|e| CodecError::Spawn(format!("{}: {}", command, e)))?
            },
            _ = tokio::time::sleep(self.timeout) => {
                return Err(CodecError::Timeout(self.timeout.as_secs()));
            }
        };

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(CodecError::Failed(Self::summarize_stderr(&stderr)));
        }

        if !output.exists() {
            return Err(CodecError::MissingOutput(output.to_path_buf()));
        }

        Ok(())
    }
}

#[async_trait]
impl FontCodec for FontToolsCodec {
    async fn subset(&self, request: &SubsetRequest) -> Result<(), CodecError> {
        let mut text_file = tempfile::NamedTempFile::new()?;
        text_file.write_all(request.glyphs.as_bytes())?;
        text_file.flush()?;

        let args = Self::subset_args(request, text_file.path());
        self.run(&self.subset_command, &args, &request.output).await
    }

    async fn convert(&self, request: &ConvertRequest) -> Result<(), CodecError> {
        let args = Self::convert_args(request);
        self.run(&self.convert_command, &args, &request.output).await
    }

    fn name(&self) -> &str {
        "fonttools"
    }
}
