use encoding_rs::Encoding;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::SubtitleError;

// @module: Subtitle document reading and requirement extraction

// @const: Style record, font name is the second comma-separated field
static STYLE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*Style:[^,]*,([^,]*),").unwrap()
});

// @const: Dialogue record, nine leading fields then the unsplit text
static DIALOGUE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*Dialogue:(?:[^,]*,){9}(.*)$").unwrap()
});

/// Text encodings a subtitle file may be stored in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextEncoding {
    /// UTF-8, with or without a byte order mark
    #[serde(rename = "utf-8")]
    Utf8,
    /// UTF-16 little endian, requires a byte order mark
    #[serde(rename = "utf-16le")]
    Utf16Le,
    /// UTF-16 big endian, requires a byte order mark
    #[serde(rename = "utf-16be")]
    Utf16Be,
    /// Simplified Chinese code page (GBK, read as GB18030)
    #[serde(rename = "gbk")]
    Gbk,
    /// Traditional Chinese code page
    #[serde(rename = "big5")]
    Big5,
    /// Japanese code page
    #[serde(rename = "shift_jis")]
    ShiftJis,
    /// Korean code page
    #[serde(rename = "euc-kr")]
    EucKr,
    /// ISO-8859-1; never fails, so it only makes sense last
    #[serde(rename = "latin-1")]
    Latin1,
}

impl TextEncoding {
    /// Decode `bytes`, returning `None` if they are not valid in this encoding
    pub fn decode(&self, bytes: &[u8]) -> Option<String> {
        match self {
            Self::Utf8 => {
                let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
                std::str::from_utf8(bytes).ok().map(str::to_string)
            }
            Self::Utf16Le => decode_strict(encoding_rs::UTF_16LE, bytes.strip_prefix(&[0xFF, 0xFE])?),
            Self::Utf16Be => decode_strict(encoding_rs::UTF_16BE, bytes.strip_prefix(&[0xFE, 0xFF])?),
            Self::Gbk => decode_strict(encoding_rs::GBK, bytes),
            Self::Big5 => decode_strict(encoding_rs::BIG5, bytes),
            Self::ShiftJis => decode_strict(encoding_rs::SHIFT_JIS, bytes),
            Self::EucKr => decode_strict(encoding_rs::EUC_KR, bytes),
            Self::Latin1 => Some(bytes.iter().map(|&b| b as char).collect()),
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Utf8 => "utf-8",
            Self::Utf16Le => "utf-16le",
            Self::Utf16Be => "utf-16be",
            Self::Gbk => "gbk",
            Self::Big5 => "big5",
            Self::ShiftJis => "shift_jis",
            Self::EucKr => "euc-kr",
            Self::Latin1 => "latin-1",
        };
        write!(f, "{}", name)
    }
}

// Malformed input is a failure, never replaced with U+FFFD
fn decode_strict(encoding: &'static Encoding, bytes: &[u8]) -> Option<String> {
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| text.into_owned())
}

/// A subtitle file decoded into text
#[derive(Debug, Clone)]
pub struct SubtitleDocument {
    /// Path the document was read from
    pub path: PathBuf,

    /// Encoding that successfully decoded the file
    pub encoding: TextEncoding,

    /// Decoded contents
    pub text: String,
}

impl SubtitleDocument {
    /// Read `path` and decode it with the first encoding in `encodings` that accepts it
    pub fn read<P: AsRef<Path>>(path: P, encodings: &[TextEncoding]) -> Result<Self, SubtitleError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| SubtitleError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::decode(path, &bytes, encodings)
    }

    /// Decode raw bytes that were read from `path`
    pub fn decode(path: &Path, bytes: &[u8], encodings: &[TextEncoding]) -> Result<Self, SubtitleError> {
        for encoding in encodings {
            if let Some(text) = encoding.decode(bytes) {
                debug!("Decoded {:?} as {}", path, encoding);
                return Ok(Self {
                    path: path.to_path_buf(),
                    encoding: *encoding,
                    text,
                });
            }
        }

        Err(SubtitleError::Decode {
            path: path.to_path_buf(),
            tried: encodings.iter().map(|e| e.to_string()).collect::<Vec<_>>().join(", "),
        })
    }

    /// Extract the declared font names and the dialogue text
    pub fn extract(&self) -> ParsedSubtitle {
        ParsedSubtitle::from_text(&self.text)
    }
}

/// Font names and dialogue text pulled out of one document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedSubtitle {
    /// Font names in declaration order, duplicates kept
    pub font_names: Vec<String>,

    /// Concatenation of every dialogue text, without separators
    pub glyph_text: String,
}

impl ParsedSubtitle {
    /// Scan subtitle text line by line for style and dialogue records
    ///
    /// Fields are split on every literal comma, so a font name containing a
    /// comma is cut at that comma. Dialogue text after the ninth comma is
    /// kept whole, commas included.
    pub fn from_text(text: &str) -> Self {
        let mut parsed = ParsedSubtitle::default();

        for line in text.lines() {
            let line = line.trim_end_matches('\r');

            if let Some(caps) = STYLE_REGEX.captures(line) {
                let name = caps[1].trim();
                if !name.is_empty() {
                    parsed.font_names.push(name.to_string());
                }
            } else if let Some(caps) = DIALOGUE_REGEX.captures(line) {
                parsed.glyph_text.push_str(&caps[1]);
            }
        }

        parsed
    }
}

/// Read and parse one subtitle file
pub fn parse_file<P: AsRef<Path>>(path: P, encodings: &[TextEncoding]) -> Result<ParsedSubtitle, SubtitleError> {
    Ok(SubtitleDocument::read(path, encodings)?.extract())
}
