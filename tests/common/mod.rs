/*!
 * Common test utilities for the subfont test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Creates an ASS subtitle declaring one style per font and one dialogue line per text
pub fn create_test_subtitle(dir: &Path, filename: &str, fonts: &[&str], dialogues: &[&str]) -> Result<PathBuf> {
    let mut content = String::from(
        "[Script Info]\nScriptType: v4.00+\n\n[V4+ Styles]\n\
Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold\n",
    );
    for (i, font) in fonts.iter().enumerate() {
        content.push_str(&format!("Style: Style{},{},48,&H00FFFFFF,&H000000FF,&H00000000,&H00000000,0\n", i, font));
    }
    content.push_str("\n[Events]\nFormat: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n");
    for text in dialogues {
        content.push_str(&format!("Dialogue: 0,0:00:01.00,0:00:03.00,Style0,,0,0,0,,{}\n", text));
    }
    create_test_file(dir, filename, &content)
}

/// Creates a fake font file; only its name matters to matching and staging
pub fn create_font_file(dir: &Path, relative_path: &str) -> Result<PathBuf> {
    create_test_file(dir, relative_path, &format!("font data for {}", relative_path))
}

/// Creates a minimal sfnt font: one outline table and a Windows family name
pub fn create_sfnt_font(dir: &Path, relative_path: &str, cff: bool, family: &str) -> Result<PathBuf> {
    write_bytes(dir, relative_path, &sfnt_face(cff, family, 0))
}

/// Creates a font collection; each face is (CFF outlines, family name)
pub fn create_font_collection(dir: &Path, relative_path: &str, faces: &[(bool, &str)]) -> Result<PathBuf> {
    let mut data = b"ttcf".to_vec();
    data.extend_from_slice(&[0, 1, 0, 0]);
    data.extend_from_slice(&(faces.len() as u32).to_be_bytes());

    let mut body = Vec::new();
    let header_len = 12 + 4 * faces.len();
    for (cff, family) in faces {
        let base = header_len + body.len();
        data.extend_from_slice(&(base as u32).to_be_bytes());
        body.extend(sfnt_face(*cff, family, base));
    }
    data.extend(body);
    write_bytes(dir, relative_path, &data)
}

fn write_bytes(dir: &Path, relative_path: &str, data: &[u8]) -> Result<PathBuf> {
    let file_path = dir.join(relative_path);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file_path, data)?;
    Ok(file_path)
}

// Table offsets count from the start of the file, `base` bytes before this face
fn sfnt_face(cff: bool, family: &str, base: usize) -> Vec<u8> {
    let encoded: Vec<u8> = family.encode_utf16().flat_map(|u| u.to_be_bytes()).collect();
    let mut name = Vec::new();
    for field in [0u16, 1, 18, 3, 1, 0x409, 1, encoded.len() as u16, 0] {
        name.extend_from_slice(&field.to_be_bytes());
    }
    name.extend(encoded);

    // Sorted by tag
    let outline: (&[u8; 4], Vec<u8>) = if cff { (b"CFF ", vec![0; 4]) } else { (b"glyf", vec![0; 4]) };
    let tables = [outline, (b"name", name)];

    let mut out = if cff { b"OTTO".to_vec() } else { vec![0, 1, 0, 0] };
    out.extend_from_slice(&(tables.len() as u16).to_be_bytes());
    out.extend_from_slice(&[0; 6]);
    let mut offset = base + 12 + 16 * tables.len();
    for (tag, data) in &tables {
        out.extend_from_slice(*tag);
        out.extend_from_slice(&[0; 4]);
        out.extend_from_slice(&(offset as u32).to_be_bytes());
        out.extend_from_slice(&(data.len() as u32).to_be_bytes());
        offset += data.len();
    }
    for (_, data) in &tables {
        out.extend_from_slice(data);
    }
    out
}

/// Routes `log` output through the test harness; safe to call more than once
pub fn init_test_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
