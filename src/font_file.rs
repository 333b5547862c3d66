/*!
 * Read-only inspection of font files.
 *
 * Only the sfnt table directory and the naming table are looked at: enough
 * to list the faces of a collection, tell TrueType from CFF outlines and
 * pick a family name for output files. Nothing here rewrites font data.
 */

use std::fs;
use std::path::Path;
use ttf_parser::name::Table as NameTable;
use ttf_parser::{PlatformId, RawFace, Tag};

use crate::errors::FontFileError;

// @const: (name id, language id) in preference order, Windows records only; 0 matches any language
const NAME_PREFERENCE: [(u16, u16); 4] = [(1, 2052), (16, 0), (1, 0), (4, 0)];

/// Outline format of a face
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outlines {
    TrueType,
    Cff,
}

impl Outlines {
    /// Extension a stand-alone file holding this face should carry
    pub fn extension(&self) -> &'static str {
        match self {
            Self::TrueType => "ttf",
            Self::Cff => "otf",
        }
    }
}

/// One face of a font file
#[derive(Debug, Clone, PartialEq)]
pub struct FontFace {
    /// Index inside a collection; `None` for single-face files
    pub index: Option<u32>,
    pub outlines: Outlines,
    /// Family name taken from the naming table
    pub family: Option<String>,
}

impl FontFace {
    /// Index to pass to a codec; single-face files use 0
    pub fn number(&self) -> u32 {
        self.index.unwrap_or(0)
    }
}

/// Whether `data` starts with a font collection header
pub fn is_collection(data: &[u8]) -> bool {
    ttf_parser::fonts_in_collection(data).is_some()
}

/// List the faces stored in `data`
pub fn faces(data: &[u8]) -> Result<Vec<FontFace>, String> {
    let indices: Vec<Option<u32>> = match ttf_parser::fonts_in_collection(data) {
        Some(0) => return Err("font collection holds no faces".to_string()),
        Some(count) => (0..count).map(Some).collect(),
        None => vec![None],
    };

    indices
        .into_iter()
        .map(|index| {
            let raw = RawFace::parse(data, index.unwrap_or(0))
                .map_err(|e| format!("face {}: {}", index.unwrap_or(0), e))?;
            let outlines = if raw.table(Tag::from_bytes(b"glyf")).is_none()
                && (raw.table(Tag::from_bytes(b"CFF ")).is_some() || raw.table(Tag::from_bytes(b"CFF2")).is_some())
            {
                Outlines::Cff
            } else {
                Outlines::TrueType
            };
            Ok(FontFace { index, outlines, family: family_name(&raw) })
        })
        .collect()
}

/// Read `path` and list its faces
pub fn read_faces(path: &Path) -> Result<Vec<FontFace>, FontFileError> {
    let data = fs::read(path).map_err(|source| FontFileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    faces(&data).map_err(|reason| FontFileError::Malformed {
        path: path.to_path_buf(),
        reason,
    })
}

/// Turn a family name into a file stem: spaces become underscores, path characters are dropped
pub fn file_stem_for(family: &str) -> String {
    family
        .trim()
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

fn family_name(raw: &RawFace<'_>) -> Option<String> {
    let table = NameTable::parse(raw.table(Tag::from_bytes(b"name"))?)?;

    for (name_id, language_id) in NAME_PREFERENCE {
        for i in 0..table.names.len() {
            let Some(record) = table.names.get(i) else {
                continue;
            };
            if record.platform_id != PlatformId::Windows || record.name_id != name_id {
                continue;
            }
            if language_id != 0 && record.language_id != language_id {
                continue;
            }
            let units: Vec<u16> = record
                .name
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            if let Ok(name) = String::from_utf16(&units) {
                if !name.trim().is_empty() {
                    return Some(name);
                }
            }
        }
    }
    None
}
