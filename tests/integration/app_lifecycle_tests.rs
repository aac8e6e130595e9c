/*!
 * Integration tests for controller setup, cancellation and timeouts
 */

use anyhow::Result;
use std::time::{Duration, Instant};
use teamgrab::app_config::Config;
use teamgrab::app_controller::Controller;
use teamgrab::collaborators::mock::{MockDownloader, MockExtractor};
use teamgrab::job::JobOutcome;
use tokio_util::sync::CancellationToken;

use crate::common::{self, IDS, TestHarness};

/// Test the controller initialization with the real collaborators
#[test]
fn test_with_config_withDefaultConfig_shouldSucceed() -> Result<()> {
    let controller = Controller::with_config(Config::default())?;
    assert_eq!(controller.config().download.program, "yt-dlp");
    Ok(())
}

/// Test that an invalid configuration is rejected up front
#[test]
fn test_with_collaborators_withInvalidConfig_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let mut config = common::test_config(temp_dir.path(), 0);
    config.extraction.nb_extractors = 0;

    let result = TestHarness::new(config, MockDownloader::working(), MockExtractor::working(1));

    assert!(result.is_err());
    Ok(())
}

/// Test that nothing happens without a valid id
#[test]
fn test_run_withNoValidIds_shouldReturnEmptySummary() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config = common::test_config(temp_dir.path(), 2);
    let checks_dir = config.checks_dir.clone();
    let harness = TestHarness::new(config, MockDownloader::working(), MockExtractor::working(1))?;

    let result = tokio_test::block_on(async {
        harness.controller.run(&["short"], CancellationToken::new()).await
    });
    let summary = tokio_test::assert_ok!(result);

    assert_eq!(summary.total(), 0);
    assert!(!summary.has_failures());
    assert_eq!(harness.downloader.call_count(), 0);
    assert!(checks_dir.is_dir());
    assert!(harness
        .reporter
        .warnings()
        .iter()
        .any(|w| w.contains("No valid video id")));
    Ok(())
}

/// Test that a cancelled token stops work before any download starts
#[test]
fn test_run_withCancelledToken_shouldReportEveryVideoCancelled() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config = common::test_config(temp_dir.path(), 2);
    let harness = TestHarness::new(config, MockDownloader::working(), MockExtractor::working(1))?;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let summary = tokio_test::block_on(harness.controller.run(&IDS, cancel))?;

    assert_eq!(summary.total(), 5);
    assert_eq!(summary.cancelled(), 5);
    assert!(!summary.has_failures());
    assert_eq!(harness.downloader.call_count(), 0);
    assert_eq!(harness.extractor.call_count(), 0);
    Ok(())
}

/// Test that cancelling mid-run interrupts in-flight downloads
#[tokio::test]
async fn test_run_withCancellationDuringDownloads_shouldStopQuickly() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config = common::test_config(temp_dir.path(), 2);
    let harness = TestHarness::new(
        config,
        MockDownloader::working().with_delay(Duration::from_secs(30)),
        MockExtractor::working(1),
    )?;
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let summary = harness.controller.run(&IDS[..3], cancel).await?;

    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(summary.cancelled(), 3);
    assert_eq!(harness.downloader.call_count(), 2);
    assert_eq!(harness.extractor.call_count(), 0);
    Ok(())
}

/// Test that a hung download is abandoned after its timeout
#[tokio::test]
async fn test_run_withDownloadTimeout_shouldFailOnlyThatVideo() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let mut config = common::test_config(temp_dir.path(), 1);
    config.download.timeout_secs = 1;
    let harness = TestHarness::new(
        config,
        MockDownloader::working().with_delay(Duration::from_secs(30)),
        MockExtractor::working(1),
    )?;

    let started = Instant::now();
    let summary = harness.controller.run(&[IDS[0]], CancellationToken::new()).await?;

    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(summary.failed(), 1);
    match &summary.reports[0].outcome {
        JobOutcome::DownloadFailed(reason) => assert!(reason.contains("timed out after 1s")),
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(harness.extractor.call_count(), 0);
    Ok(())
}
