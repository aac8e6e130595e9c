/*!
 * End-to-end tests of the download pool feeding the sequential processor
 */

use anyhow::Result;
use std::fs;
use std::time::{Duration, Instant};
use teamgrab::app_controller::ISSUES_LOG;
use teamgrab::collaborators::mock::{MockDownloader, MockExtractor};
use teamgrab::job::JobOutcome;
use tokio_util::sync::CancellationToken;

use crate::common::{self, IDS, TestHarness};

/// Test a single video going through download and extraction
#[tokio::test]
async fn test_run_withSingleId_shouldDownloadExtractAndRemoveVideo() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config = common::test_config(temp_dir.path(), 2);
    let video_dir = config.checks_dir.join(IDS[1]);
    let harness = TestHarness::new(config, MockDownloader::working(), MockExtractor::working(3))?;

    let summary = harness.controller.run(&[IDS[1]], CancellationToken::new()).await?;

    assert_eq!(summary.total(), 1);
    assert_eq!(summary.processed(), 1);
    assert_eq!(summary.reports[0].outcome, JobOutcome::Processed { artifacts: 3 });
    assert_eq!(harness.downloader.call_count(), 1);
    assert_eq!(harness.extractor.call_count(), 1);
    assert!(video_dir.is_dir());
    assert!(!video_dir.join("video.mp4").exists());
    assert!(video_dir.join("team_0.png").exists());
    Ok(())
}

/// Test that downloads never exceed the configured parallelism
#[tokio::test]
async fn test_run_withFiveIdsAndTwoDownloaders_shouldBoundParallelism() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config = common::test_config(temp_dir.path(), 2);
    let harness = TestHarness::new(
        config,
        MockDownloader::working().with_delay(Duration::from_millis(30)),
        MockExtractor::working(1).with_delay(Duration::from_millis(10)),
    )?;

    let summary = harness.controller.run(&IDS, CancellationToken::new()).await?;

    assert_eq!(summary.total(), 5);
    assert_eq!(summary.processed(), 5);
    assert_eq!(harness.downloader.call_count(), 5);
    assert_eq!(harness.downloader.peak_concurrency(), 2);
    assert_eq!(harness.extractor.peak_concurrency(), 1);
    Ok(())
}

/// Test that extraction of finished downloads overlaps the remaining downloads
#[tokio::test]
async fn test_run_withSingleDownloader_shouldOverlapDownloadsAndExtraction() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config = common::test_config(temp_dir.path(), 1);
    let step = Duration::from_millis(200);
    let harness = TestHarness::new(
        config,
        MockDownloader::working().with_delay(step),
        MockExtractor::working(1).with_delay(step),
    )?;

    let started = Instant::now();
    let summary = harness.controller.run(&IDS[..3], CancellationToken::new()).await?;
    let elapsed = started.elapsed();

    assert_eq!(summary.processed(), 3);
    assert_eq!(harness.downloader.peak_concurrency(), 1);
    assert_eq!(harness.extractor.peak_concurrency(), 1);
    // One stage after the other would take 6 steps, overlapped stages take 4
    assert!(
        elapsed < step * 11 / 2,
        "stages did not overlap: {:?}",
        elapsed
    );
    Ok(())
}

/// Test that a repeated id never loses the artifacts of its first pass
#[tokio::test]
async fn test_run_withDuplicateId_shouldKeepArtifacts() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config = common::test_config(temp_dir.path(), 1);
    let dir = config.checks_dir.join(IDS[0]);
    let harness = TestHarness::new(config, MockDownloader::working(), MockExtractor::working(2))?;

    let summary = harness.controller.run(&[IDS[0], IDS[0]], CancellationToken::new()).await?;

    assert_eq!(summary.total(), 2);
    assert!(summary.processed() >= 1);
    assert!(dir.join("team_0.png").exists());
    assert!(dir.join("team_1.png").exists());
    Ok(())
}

/// Test that extraction is strictly sequential even with many downloaders
#[tokio::test]
async fn test_run_withManyDownloaders_shouldExtractOneAtATime() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config = common::test_config(temp_dir.path(), 5);
    let harness = TestHarness::new(
        config,
        MockDownloader::working(),
        MockExtractor::working(1).with_delay(Duration::from_millis(20)),
    )?;

    harness.controller.run(&IDS, CancellationToken::new()).await?;

    assert_eq!(harness.extractor.call_count(), 5);
    assert_eq!(harness.extractor.peak_concurrency(), 1);
    assert!(harness.extractor.calls().iter().all(|call| call.video_present));
    Ok(())
}

/// Test that download-only runs never touch the extractor
#[tokio::test]
async fn test_run_withDownloadOnly_shouldKeepVideosAndArtifacts() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let mut config = common::test_config(temp_dir.path(), 2);
    config.download_only = true;
    // Above the skip threshold, but download-only ignores it
    let dir = common::seed_artifacts(&config, IDS[0], 12)?;
    let harness = TestHarness::new(config, MockDownloader::working(), MockExtractor::working(1))?;

    let summary = harness.controller.run(&IDS[..2], CancellationToken::new()).await?;

    assert_eq!(summary.downloaded(), 2);
    assert_eq!(harness.downloader.call_count(), 2);
    assert_eq!(harness.extractor.call_count(), 0);
    assert!(dir.join("video.mp4").is_file());
    assert_eq!(fs::read_dir(&dir)?.count(), 13);
    Ok(())
}

/// Test the already-processed heuristic
#[tokio::test]
async fn test_run_withMoreThanThresholdArtifacts_shouldSkipVideo() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config = common::test_config(temp_dir.path(), 2);
    let skipped_dir = common::seed_artifacts(&config, IDS[0], 11)?;
    let harness = TestHarness::new(config, MockDownloader::working(), MockExtractor::working(2))?;

    let summary = harness.controller.run(&IDS[..2], CancellationToken::new()).await?;

    assert_eq!(summary.skipped(), 1);
    assert_eq!(summary.processed(), 1);
    assert_eq!(harness.downloader.calls().len(), 1);
    assert_eq!(harness.downloader.calls()[0].as_str(), IDS[1]);
    assert_eq!(harness.extractor.call_count(), 1);
    assert_eq!(fs::read_dir(&skipped_dir)?.count(), 11);
    Ok(())
}

/// Test that a re-run starts from an empty artifact set
#[tokio::test]
async fn test_run_withLeftoverArtifacts_shouldResetBeforeExtraction() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config = common::test_config(temp_dir.path(), 1);
    let dir = common::seed_artifacts(&config, IDS[0], 4)?;
    common::seed_video(&config, IDS[0])?;
    let harness = TestHarness::new(config, MockDownloader::working(), MockExtractor::working(2))?;

    let summary = harness.controller.run(&[IDS[0]], CancellationToken::new()).await?;

    assert_eq!(summary.processed(), 1);
    // The existing video is reused
    assert_eq!(harness.downloader.call_count(), 0);
    assert_eq!(harness.extractor.calls()[0].artifacts_before, 0);
    assert!(!dir.join("team_seed0.png").exists());
    assert!(dir.join("team_1.png").exists());
    assert!(!dir.join("video.mp4").exists());
    Ok(())
}

/// Test that a failed extraction keeps the video for the next run
#[tokio::test]
async fn test_run_withFailingExtractor_shouldKeepVideoAndLogIssue() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config = common::test_config(temp_dir.path(), 2);
    let checks_dir = config.checks_dir.clone();
    let harness = TestHarness::new(config, MockDownloader::working(), MockExtractor::failing())?;

    let summary = harness.controller.run(&[IDS[2]], CancellationToken::new()).await?;

    assert!(summary.has_failures());
    assert!(matches!(summary.reports[0].outcome, JobOutcome::ExtractionFailed(_)));
    assert!(checks_dir.join(IDS[2]).join("video.mp4").is_file());
    let issues = fs::read_to_string(checks_dir.join(ISSUES_LOG))?;
    assert!(issues.contains(IDS[2]));
    assert!(issues.contains("extraction failed"));
    Ok(())
}

/// Test that a failed download is never handed to the extractor
#[tokio::test]
async fn test_run_withFailingDownloader_shouldNotInvokeExtractor() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config = common::test_config(temp_dir.path(), 2);
    let harness = TestHarness::new(config, MockDownloader::failing(), MockExtractor::working(1))?;

    let summary = harness.controller.run(&IDS[..3], CancellationToken::new()).await?;

    assert_eq!(summary.total(), 3);
    assert_eq!(summary.failed(), 3);
    assert!(summary
        .reports
        .iter()
        .all(|r| matches!(r.outcome, JobOutcome::DownloadFailed(_))));
    assert_eq!(harness.extractor.call_count(), 0);
    assert_eq!(harness.reporter.errors().len(), 3);
    Ok(())
}

/// Test that one bad id does not stop the others
#[tokio::test]
async fn test_run_withMixedInputs_shouldProcessValidIdsOnly() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config = common::test_config(temp_dir.path(), 2);
    let list = common::create_test_file(
        temp_dir.path(),
        "ids.txt",
        &format!("abc\n{}\r\n{}\n", IDS[0], IDS[1]),
    )?;
    let harness = TestHarness::new(config, MockDownloader::working(), MockExtractor::working(1))?;

    let inputs = vec![list.to_string_lossy().to_string(), "bogus".to_string()];
    let summary = harness.controller.run(&inputs, CancellationToken::new()).await?;

    assert_eq!(summary.processed(), 2);
    let warnings = harness.reporter.warnings();
    assert!(warnings.iter().any(|w| w.contains("'abc'")));
    assert!(warnings.iter().any(|w| w.contains("'bogus'")));
    Ok(())
}
