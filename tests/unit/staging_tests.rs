/*!
 * Tests for staging resolved fonts into the output layout
 */

use anyhow::Result;
use std::fs;
use subfont::app_config::{ExtensionConfig, StagingConfig};
use subfont::font_library::{FontLibraryMatcher, FuzzyPolicy};
use subfont::requirements::RequirementSet;
use subfont::staging::{AssetStager, StageStatus};
use crate::common;

fn resolve(names: &[&str], library: &std::path::Path) -> Result<Vec<subfont::ResolutionRecord>> {
    let mut set = RequirementSet::new();
    for name in names {
        set.insert_name(name);
    }
    let matcher = FontLibraryMatcher::new(ExtensionConfig::default().classes(), FuzzyPolicy::default());
    Ok(matcher.resolve(&set, library, |_| {})?)
}

/// Primary and secondary files land in their own subareas
#[test]
fn test_stage_shouldSplitFilesByRole() -> Result<()> {
    let library = common::create_temp_dir()?;
    let out = common::create_temp_dir()?;
    common::create_font_file(library.path(), "Arial.ttf")?;
    common::create_font_file(library.path(), "deep/Meiryo.ttc")?;
    let records = resolve(&["Arial", "Meiryo", "Nope"], library.path())?;

    let mut reported = 0;
    let staged = AssetStager::new(&StagingConfig::default()).stage(&records, out.path(), |_| reported += 1)?;

    assert_eq!(staged.len(), 2);
    assert_eq!(reported, 2);
    assert!(out.path().join("ttf/Arial.ttf").is_file());
    assert!(out.path().join("otf_ttc/Meiryo.ttc").is_file());
    assert_eq!(fs::read_to_string(out.path().join("ttf/Arial.ttf"))?, "font data for Arial.ttf");
    Ok(())
}

/// A second run leaves only the files of that run
#[test]
fn test_stage_twice_shouldClearPreviousRun() -> Result<()> {
    let library = common::create_temp_dir()?;
    let out = common::create_temp_dir()?;
    common::create_font_file(library.path(), "Arial.ttf")?;
    common::create_font_file(library.path(), "Gothic.otf")?;
    common::create_font_file(out.path(), "stray.txt")?;
    let stager = AssetStager::new(&StagingConfig::default());

    stager.stage(&resolve(&["Arial"], library.path())?, out.path(), |_| {})?;
    stager.stage(&resolve(&["Gothic"], library.path())?, out.path(), |_| {})?;

    assert!(!out.path().join("stray.txt").exists());
    assert!(!out.path().join("ttf/Arial.ttf").exists());
    assert!(out.path().join("otf_ttc/Gothic.otf").exists());
    assert!(out.path().join("ttf").is_dir());
    Ok(())
}

/// Two different files with the same name cannot share a destination
#[test]
fn test_stage_withNameCollision_shouldFailSecondCopy() -> Result<()> {
    let library = common::create_temp_dir()?;
    let out = common::create_temp_dir()?;
    common::create_font_file(library.path(), "a/Foo.otf")?;
    common::create_font_file(library.path(), "b/Foo.otf")?;
    let a = library.path().join("a/Foo.otf");
    let b = library.path().join("b/Foo.otf");

    let mut records = resolve(&["Foo"], library.path())?;
    let mut other = records[0].clone();
    other.name = "Foo Alt".to_string();
    if let Some(asset) = other.asset.as_mut() {
        asset.path = b.clone();
    }
    records.push(other);

    let staged = AssetStager::new(&StagingConfig::default()).stage(&records, out.path(), |_| {})?;

    assert_eq!(staged[0].asset.path, a);
    assert!(staged[0].is_copied());
    assert!(matches!(staged[1].status, StageStatus::Failed(_)));
    Ok(())
}

/// Nothing matched still yields an empty layout
#[test]
fn test_stage_withNoMatches_shouldCreateEmptySubareas() -> Result<()> {
    let library = common::create_temp_dir()?;
    let out = common::create_temp_dir()?;
    let target = out.path().join("fonts");

    let staged = AssetStager::new(&StagingConfig::default())
        .stage(&resolve(&["Missing"], library.path())?, &target, |_| {})?;

    assert!(staged.is_empty());
    assert!(target.join("ttf").is_dir());
    assert!(target.join("otf_ttc").is_dir());
    Ok(())
}

/// Staging into the library itself is refused and the library is left alone
#[test]
fn test_stage_intoLibraryRoot_shouldRefuseAndKeepLibrary() -> Result<()> {
    let library = common::create_temp_dir()?;
    let font = common::create_font_file(library.path(), "Arial.ttf")?;
    let records = resolve(&["Arial"], library.path())?;

    let result = AssetStager::new(&StagingConfig::default()).stage(&records, library.path(), |_| {});

    assert!(matches!(result, Err(subfont::StagingError::Overlap { .. })));
    assert!(font.is_file());
    Ok(())
}

/// File names differing only in case share a destination on case-insensitive file systems
#[test]
fn test_stage_withCaseOnlyCollision_shouldFailSecondCopy() -> Result<()> {
    let library = common::create_temp_dir()?;
    let out = common::create_temp_dir()?;
    common::create_font_file(library.path(), "a/GOTHIC.otf")?;
    common::create_font_file(library.path(), "b/gothic.otf")?;

    let mut records = resolve(&["GOTHIC"], library.path())?;
    let mut other = records[0].clone();
    other.name = "gothic alt".to_string();
    if let Some(asset) = other.asset.as_mut() {
        asset.path = library.path().join("b/gothic.otf");
    }
    records.push(other);

    let staged = AssetStager::new(&StagingConfig::default()).stage(&records, out.path(), |_| {})?;

    assert!(staged[0].is_copied());
    assert!(matches!(staged[1].status, StageStatus::Failed(_)));
    Ok(())
}
