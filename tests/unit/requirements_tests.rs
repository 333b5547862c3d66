/*!
 * Tests for requirement aggregation and the export format
 */

use anyhow::Result;
use std::fs;
use subfont::requirements::{RequirementAggregator, RequirementSet};
use subfont::subtitle_processor::{self, TextEncoding};
use crate::common;

/// Two documents with case-variant fonts aggregate to one name and the glyph union
#[test]
fn test_aggregate_withCaseVariantDocuments_shouldDeduplicate() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let first = common::create_test_subtitle(temp_dir.path(), "a.ass", &["Arial"], &["AB"])?;
    let second = common::create_test_subtitle(temp_dir.path(), "b.ass", &["arial"], &["BC"])?;

    let mut aggregator = RequirementAggregator::new();
    for path in [&first, &second] {
        aggregator.add_parsed(&subtitle_processor::parse_file(path, &[TextEncoding::Utf8])?);
    }
    let set = aggregator.snapshot();

    assert_eq!(set.names().collect::<Vec<_>>(), vec!["Arial"]);
    assert!(set.contains_name("ARIAL"));
    assert_eq!(set.glyph_string(), "ABC");
    Ok(())
}

/// Parsing the same document twice changes nothing
#[test]
fn test_aggregate_sameDocumentTwice_shouldEqualOnce() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_subtitle(temp_dir.path(), "a.ass", &["Foo", "Bar"], &["hello", "world"])?;
    let parsed = subtitle_processor::parse_file(&path, &[TextEncoding::Utf8])?;

    let mut once = RequirementAggregator::new();
    once.add_parsed(&parsed);
    let mut twice = RequirementAggregator::new();
    twice.add_parsed(&parsed);
    twice.add_parsed(&subtitle_processor::parse_file(&path, &[TextEncoding::Utf8])?);

    assert_eq!(once.snapshot(), twice.snapshot());
    Ok(())
}

/// Snapshots are independent copies of the running set
#[test]
fn test_snapshot_shouldNotChangeWhenAggregatorGrows() {
    let mut aggregator = RequirementAggregator::new();
    aggregator.add(&["Foo"], "a");
    let snapshot = aggregator.snapshot();
    aggregator.add(&["Bar"], "b");

    assert_eq!(snapshot.name_count(), 1);
    assert_eq!(aggregator.snapshot().name_count(), 2);
}

/// The export file round-trips through disk
#[test]
fn test_export_file_roundTrip_shouldRestoreSet() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let mut set = RequirementSet::new();
    set.insert_name("Noto Sans CJK SC");
    set.insert_name("Arial");
    set.insert_glyphs("字幕 test!");

    let path = temp_dir.path().join("ASSInfo.txt");
    fs::write(&path, set.to_export_string())?;
    let restored = RequirementSet::parse_export(&fs::read_to_string(&path)?);

    assert_eq!(restored, set);
    Ok(())
}

/// An export written on Windows (CRLF) still parses
#[test]
fn test_parse_export_withCrlf_shouldParse() {
    let set = RequirementSet::parse_export("Arial\r\nMeiryo\r\n\r\nabc");
    assert_eq!(set.names().collect::<Vec<_>>(), vec!["Arial", "Meiryo"]);
    assert_eq!(set.glyph_string(), "abc");
}
