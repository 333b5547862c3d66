/*!
 * End-to-end tests driving the controller through a full run
 */

use anyhow::Result;
use std::collections::BTreeSet;
use std::fs;
use std::sync::Arc;
use subfont::app_config::Config;
use subfont::font_library::MatchStatus;
use subfont::codec::mock::MockCodec;
use subfont::codec::JobStatus;
use subfont::Controller;
use crate::common;

fn config_with_subset() -> Config {
    let mut config = Config::default();
    config.subset.enabled = true;
    config.subset.concurrent_jobs = 2;
    config
}

/// Full run: parse two documents, skip an undecodable one, resolve, stage and subset
#[tokio::test]
async fn test_run_withMixedLibrary_shouldProduceFullReport() -> Result<()> {
    common::init_test_logger();
    let subs = common::create_temp_dir()?;
    let library = common::create_temp_dir()?;
    let out = common::create_temp_dir()?;
    let output_root = out.path().join("fonts");

    let first = common::create_test_subtitle(subs.path(), "01.ass", &["Arial", "Meiryo"], &["Hello"])?;
    let second = common::create_test_subtitle(subs.path(), "02.ass", &["arial", "Unknown Font"], &["こんにちは"])?;
    let broken = subs.path().join("03.ass");
    fs::write(&broken, [0xFF, 0xFF, 0xC3, 0x28])?;

    common::create_font_file(library.path(), "Arial.ttf")?;
    common::create_font_file(library.path(), "Arial-Bold.otf")?;
    common::create_font_file(library.path(), "jp/Meiryo-Regular.ttc")?;

    let codec = Arc::new(MockCodec::working());
    let controller = Controller::with_config(config_with_subset())?.with_codec(codec.clone());
    let outcome = controller.run(&[first, second, broken.clone()], library.path(), &output_root).await?;

    assert_eq!(outcome.requirements.name_count(), 3);
    assert_eq!(outcome.records.len(), 3);
    let status = |name: &str| outcome.records.iter().find(|r| r.name == name).map(|r| r.status);
    assert_eq!(status("Arial"), Some(MatchStatus::Exact));
    assert_eq!(status("Meiryo"), Some(MatchStatus::Fuzzy));
    assert_eq!(status("Unknown Font"), Some(MatchStatus::Missing));

    assert!(output_root.join("ttf/Arial.ttf").is_file());
    assert!(output_root.join("otf_ttc/Meiryo-Regular.ttc").is_file());
    assert!(!output_root.join("otf_ttc/Arial-Bold.otf").exists());

    assert_eq!(outcome.jobs.len(), 2);
    assert!(outcome.jobs.iter().all(|job| job.succeeded()));
    assert!(output_root.join("subset/Arial.ttf").is_file());
    let requests = codec.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests.iter().all(|r| r.glyphs.contains('H') && r.glyphs.contains('ん')));

    let report = &outcome.report;
    assert_eq!(report.exact_count(), 1);
    assert_eq!(report.fuzzy_count(), 1);
    assert_eq!(report.missing, vec!["Unknown Font"]);
    assert_eq!(report.skipped_documents.len(), 1);
    assert_eq!(report.skipped_documents[0].path, broken);
    assert_eq!(report.subset_succeeded(), 2);
    Ok(())
}

/// A codec failure on one font leaves the other jobs untouched
#[tokio::test]
async fn test_run_withFailingCodecForOneFont_shouldContinue() -> Result<()> {
    let subs = common::create_temp_dir()?;
    let library = common::create_temp_dir()?;
    let out = common::create_temp_dir()?;

    let doc = common::create_test_subtitle(subs.path(), "a.ass", &["Good", "Bad"], &["abc"])?;
    common::create_font_file(library.path(), "Good.ttf")?;
    common::create_font_file(library.path(), "Bad.otf")?;

    let controller = Controller::with_config(config_with_subset())?
        .with_codec(Arc::new(MockCodec::fail_on(&["Bad.otf"])));
    let outcome = controller.run(&[doc], library.path(), out.path()).await?;

    let bad = outcome.jobs.iter().find(|j| j.source.ends_with("Bad.otf"));
    let good = outcome.jobs.iter().find(|j| j.source.ends_with("Good.ttf"));
    assert!(matches!(bad.map(|j| &j.status), Some(JobStatus::Failed(_))));
    assert!(good.is_some_and(|j| j.succeeded()));
    assert_eq!(outcome.report.subset_failed(), 1);
    Ok(())
}

/// With subsetting disabled no jobs run and the codec is never called
#[tokio::test]
async fn test_run_withSubsetDisabled_shouldOnlyStage() -> Result<()> {
    let subs = common::create_temp_dir()?;
    let library = common::create_temp_dir()?;
    let out = common::create_temp_dir()?;

    let doc = common::create_test_subtitle(subs.path(), "a.ass", &["Arial"], &["x"])?;
    common::create_font_file(library.path(), "Arial.ttf")?;

    let codec = Arc::new(MockCodec::working());
    let controller = Controller::with_config(Config::default())?.with_codec(codec.clone());
    let outcome = controller.run(&[doc], library.path(), out.path()).await?;

    assert!(outcome.jobs.is_empty());
    assert!(codec.requests().is_empty());
    assert_eq!(outcome.report.staged, 1);
    assert!(!out.path().join("subset").exists());
    Ok(())
}

/// Requirements accumulate across loads until reset
#[tokio::test]
async fn test_load_documents_shouldAccumulateUntilReset() -> Result<()> {
    let subs = common::create_temp_dir()?;
    let a = common::create_test_subtitle(subs.path(), "a.ass", &["One"], &["1"])?;
    let b = common::create_test_subtitle(subs.path(), "b.ass", &["Two"], &["2"])?;

    let controller = Controller::with_config(Config::default())?;
    controller.load_documents(&[a]);
    let (requirements, errors) = controller.load_documents(&[b.clone()]);
    assert!(errors.is_empty());
    assert_eq!(requirements.name_count(), 2);

    controller.reset_requirements();
    let (requirements, _) = controller.load_documents(&[b]);
    assert_eq!(requirements.names().collect::<Vec<_>>(), vec!["Two"]);
    Ok(())
}

/// The export written by the controller can be read back
#[tokio::test]
async fn test_export_requirements_shouldWriteReadableFile() -> Result<()> {
    let subs = common::create_temp_dir()?;
    let doc = common::create_test_subtitle(subs.path(), "a.ass", &["Noto Sans"], &["字幕"])?;
    let export = subs.path().join("ASSInfo.txt");

    let controller = Controller::with_config(Config::default())?;
    let (requirements, _) = controller.load_documents(&[doc]);
    controller.export_requirements(&requirements, &export)?;

    let restored = subfont::RequirementSet::parse_export(&fs::read_to_string(&export)?);
    assert_eq!(restored, requirements);
    Ok(())
}

/// Cancelling before a run stops at the library walk
#[tokio::test]
async fn test_run_whenCancelled_shouldFail() -> Result<()> {
    let subs = common::create_temp_dir()?;
    let library = common::create_temp_dir()?;
    let out = common::create_temp_dir()?;
    let doc = common::create_test_subtitle(subs.path(), "a.ass", &["Arial"], &["x"])?;

    let controller = Controller::with_config(Config::default())?;
    controller.cancel_flag().cancel();

    assert!(controller.run(&[doc], library.path(), out.path()).await.is_err());
    Ok(())
}

/// Subsetting hand-picked files fails only the jobs whose file is absent
#[test]
fn test_subset_files_withMissingFont_shouldFailThatJob() -> Result<()> {
    common::init_test_logger();
    let fonts = common::create_temp_dir()?;
    let out = common::create_temp_dir()?;
    let present = common::create_font_file(fonts.path(), "Present.ttf")?;
    let absent = fonts.path().join("Absent.otf");
    let glyphs: BTreeSet<char> = "abc".chars().collect();

    let codec = Arc::new(MockCodec::working());
    let controller = Controller::with_config(Config::default())?.with_codec(codec.clone());
    let jobs = tokio_test::block_on(controller.subset_files(&[present, absent], &glyphs, out.path()))?;

    assert!(jobs[0].succeeded());
    assert!(matches!(jobs[1].status, JobStatus::Failed(_)));
    assert_eq!(codec.requests().len(), 1);
    assert!(out.path().join("Present.ttf").is_file());
    Ok(())
}

/// An output root holding the library is refused before anything is deleted
#[tokio::test]
async fn test_run_withLibraryInsideOutputRoot_shouldRefuseAndKeepLibrary() -> Result<()> {
    let subs = common::create_temp_dir()?;
    let out = common::create_temp_dir()?;
    let library = out.path().join("library");
    let font = common::create_font_file(&library, "Arial.ttf")?;
    let doc = common::create_test_subtitle(subs.path(), "a.ass", &["Arial"], &["x"])?;

    let controller = Controller::with_config(Config::default())?;
    let result = controller.run(&[doc], &library, out.path()).await;

    assert!(result.is_err());
    assert!(font.is_file());
    Ok(())
}

/// An output root inside the library is refused as well
#[tokio::test]
async fn test_run_withOutputRootInsideLibrary_shouldRefuse() -> Result<()> {
    let subs = common::create_temp_dir()?;
    let library = common::create_temp_dir()?;
    let kept = common::create_font_file(library.path(), "staged/Old.ttf")?;
    let doc = common::create_test_subtitle(subs.path(), "a.ass", &["Arial"], &["x"])?;

    let controller = Controller::with_config(Config::default())?;
    let result = controller.run(&[doc], library.path(), &library.path().join("staged")).await;

    assert!(result.is_err());
    assert!(kept.is_file());
    Ok(())
}

/// Subsetting into the directory that holds the fonts is refused
#[tokio::test]
async fn test_subset_files_intoFontDirectory_shouldRefuseAndKeepFonts() -> Result<()> {
    let fonts = common::create_temp_dir()?;
    let font = common::create_font_file(fonts.path(), "Arial.ttf")?;
    let glyphs: BTreeSet<char> = "abc".chars().collect();

    let codec = Arc::new(MockCodec::working());
    let controller = Controller::with_config(Config::default())?.with_codec(codec.clone());
    let result = controller.subset_files(&[font.clone()], &glyphs, fonts.path()).await;

    assert!(result.is_err());
    assert!(font.is_file());
    assert!(codec.requests().is_empty());
    Ok(())
}

/// A second subset run leaves no outputs of the first one behind
#[tokio::test]
async fn test_subset_files_rerun_shouldClearStaleOutputs() -> Result<()> {
    let fonts = common::create_temp_dir()?;
    let out = common::create_temp_dir()?;
    let first = common::create_font_file(fonts.path(), "First.ttf")?;
    let second = common::create_font_file(fonts.path(), "Second.ttf")?;
    let glyphs: BTreeSet<char> = "abc".chars().collect();
    let output_dir = out.path().join("slim");

    let controller = Controller::with_config(Config::default())?.with_codec(Arc::new(MockCodec::working()));
    controller.subset_files(&[first], &glyphs, &output_dir).await?;
    controller.subset_files(&[second], &glyphs, &output_dir).await?;

    assert!(!output_dir.join("First.ttf").exists());
    assert!(output_dir.join("Second.ttf").is_file());
    Ok(())
}

/// A staged collection is subset face by face
#[tokio::test]
async fn test_run_withCollectionFont_shouldSubsetEveryFace() -> Result<()> {
    let subs = common::create_temp_dir()?;
    let library = common::create_temp_dir()?;
    let out = common::create_temp_dir()?;
    let doc = common::create_test_subtitle(subs.path(), "a.ass", &["Meiryo"], &["字"])?;
    common::create_font_collection(library.path(), "Meiryo.ttc", &[(false, "Meiryo"), (false, "Meiryo UI")])?;

    let codec = Arc::new(MockCodec::working());
    let controller = Controller::with_config(config_with_subset())?.with_codec(codec.clone());
    let outcome = controller.run(&[doc], library.path(), out.path()).await?;

    assert_eq!(outcome.jobs.len(), 1);
    assert_eq!(outcome.jobs[0].outputs.len(), 2);
    assert!(out.path().join("subset/Meiryo-0.ttf").is_file());
    assert!(out.path().join("subset/Meiryo-1.ttf").is_file());
    let numbers: Vec<_> = codec.requests().iter().map(|r| r.font_number).collect();
    assert_eq!(numbers, vec![Some(0), Some(1)]);
    Ok(())
}

/// With conversion enabled, staged OTF/TTC fonts are also written as TTF files
#[tokio::test]
async fn test_run_withConvertEnabled_shouldConvertSecondaryFonts() -> Result<()> {
    let subs = common::create_temp_dir()?;
    let library = common::create_temp_dir()?;
    let out = common::create_temp_dir()?;
    let doc = common::create_test_subtitle(subs.path(), "a.ass", &["Arial", "Source Han Sans", "msyh"], &["x"])?;
    common::create_font_file(library.path(), "Arial.ttf")?;
    common::create_sfnt_font(library.path(), "Source Han Sans.otf", true, "Source Han Sans SC")?;
    common::create_font_collection(library.path(), "msyh.ttc", &[(false, "Microsoft YaHei"), (false, "Microsoft YaHei UI")])?;

    let mut config = Config::default();
    config.convert.enabled = true;
    let codec = Arc::new(MockCodec::working());
    let controller = Controller::with_config(config)?.with_codec(codec.clone());
    let outcome = controller.run(&[doc], library.path(), out.path()).await?;

    assert_eq!(outcome.conversions.len(), 2);
    assert!(outcome.conversions.iter().all(|job| job.succeeded()));
    let converted = out.path().join("converted");
    assert!(converted.join("Source_Han_Sans_SC.ttf").is_file());
    assert!(converted.join("Microsoft_YaHei.ttf").is_file());
    assert!(converted.join("Microsoft_YaHei_UI.ttf").is_file());
    assert!(codec.conversions().iter().all(|r| !r.source.ends_with("Arial.ttf")));
    assert_eq!(outcome.report.converted_faces(), 3);
    Ok(())
}

/// Converting hand-picked files keeps going past a file that is not a font
#[tokio::test]
async fn test_convert_files_withBrokenFont_shouldConvertTheRest() -> Result<()> {
    let fonts = common::create_temp_dir()?;
    let out = common::create_temp_dir()?;
    let broken = common::create_font_file(fonts.path(), "Broken.otf")?;
    let good = common::create_sfnt_font(fonts.path(), "good.otf", true, "Noto Serif CJK")?;

    let controller = Controller::with_config(Config::default())?.with_codec(Arc::new(MockCodec::working()));
    let jobs = controller.convert_files(&[broken, good], out.path()).await?;

    assert!(matches!(jobs[0].status, JobStatus::Failed(_)));
    assert_eq!(jobs[1].outputs, vec![out.path().join("Noto_Serif_CJK.ttf")]);
    Ok(())
}
