use anyhow::{Context, Result};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::app_config::Config;
use crate::collaborators::{CommandExtractor, Downloader, Extractor, YtDlpDownloader};
use crate::identifiers;
use crate::job::{JobOutcome, JobReport};
use crate::pool::{DownloadPool, PoolSettings};
use crate::processor::{ProcessorSettings, SequentialProcessor};
use crate::queue::handoff_queue;
use crate::reporter::{LogReporter, SharedReporter};
use crate::workspace::VideoWorkspace;

// @module: Application controller wiring the download and processing stages

/// Name of the failure log written under the checks directory
pub const ISSUES_LOG: &str = "teamgrab.issues.log";

/// Main application controller
pub struct Controller {
    // @field: App configuration
    config: Config,
    downloader: Arc<dyn Downloader>,
    extractor: Arc<dyn Extractor>,
    reporter: SharedReporter,
    show_progress: bool,
}

impl Controller {
    // @method: Create a controller using yt-dlp and the configured extractor
    pub fn with_config(config: Config) -> Result<Self> {
        let downloader = Arc::new(YtDlpDownloader::new(&config.download));
        let extractor = Arc::new(CommandExtractor::new(&config.extraction));
        let mut controller =
            Self::with_collaborators(config, downloader, extractor, LogReporter::shared())?;
        controller.show_progress = true;
        Ok(controller)
    }

    /// Create a controller with explicit collaborators, without progress bars
    pub fn with_collaborators(
        config: Config,
        downloader: Arc<dyn Downloader>,
        extractor: Arc<dyn Extractor>,
        reporter: SharedReporter,
    ) -> Result<Self> {
        config
            .validate()
            .context("Configuration validation failed")?;

        Ok(Self {
            config,
            downloader,
            extractor,
            reporter,
            show_progress: false,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolve `inputs`, download every video and process the downloads
    /// one by one (unless the run is download-only).
    pub async fn run<S: AsRef<str>>(
        &self,
        inputs: &[S],
        cancel: CancellationToken,
    ) -> Result<RunSummary> {
        let start_time = Instant::now();

        let workspace = VideoWorkspace::from_config(&self.config)?;
        workspace.ensure_root()?;

        let ids = identifiers::resolve(inputs, self.reporter.as_ref());
        if ids.is_empty() {
            self.reporter.warn("No valid video id to process");
            return Ok(RunSummary::default());
        }

        let total = ids.len();
        self.reporter.info(&format!(
            "{} video(s) to handle, {} parallel download(s){}",
            total,
            self.config.download.concurrency,
            if self.config.download_only { ", download only" } else { "" }
        ));

        let multi_progress = if self.show_progress {
            MultiProgress::new()
        } else {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        };
        let download_pb = Self::progress_bar(&multi_progress, total, "downloads");

        let (sender, receiver) = handoff_queue(total);
        let pool = DownloadPool::new(
            self.downloader.clone(),
            workspace.clone(),
            PoolSettings::from_config(&self.config),
            self.reporter.clone(),
        )
        .with_progress(download_pb.clone());
        let pool_handle = pool.spawn(ids, sender, cancel.clone());

        let reports = if self.config.download_only {
            let reports = pool_handle.await.context("Download pool task failed")?;
            drop(receiver);
            reports
        } else {
            let process_pb = Self::progress_bar(&multi_progress, total, "videos");
            let processor = SequentialProcessor::new(
                self.extractor.clone(),
                workspace.clone(),
                ProcessorSettings::from_config(&self.config),
                self.reporter.clone(),
            )
            .with_progress(process_pb.clone());

            let reports = processor.run(receiver, &cancel).await;
            pool_handle.await.context("Download pool task failed")?;
            process_pb.finish_and_clear();
            reports
        };
        download_pb.finish_and_clear();

        let summary = RunSummary::new(reports, start_time.elapsed());
        self.reporter.info(&summary.to_string());
        self.write_issues(&workspace, &summary);

        Ok(summary)
    }

    fn progress_bar(multi_progress: &MultiProgress, len: usize, unit: &str) -> ProgressBar {
        let progress_bar = multi_progress.add(ProgressBar::new(len as u64));
        let template = format!(
            "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {} ({{percent}}%) {{msg}}",
            unit
        );
        let style = ProgressStyle::default_bar()
            .template(&template)
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%)"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars("█▓▒░"));
        progress_bar
    }

    /// Append every failure of the run to the issues log
    fn write_issues(&self, workspace: &VideoWorkspace, summary: &RunSummary) {
        for report in summary.failures() {
            let line = format!("{}: {}", report.id, report.outcome);
            if let Err(e) = workspace.append_issue(ISSUES_LOG, &line) {
                self.reporter
                    .warn(&format!("Failed to write issues log: {:#}", e));
                return;
            }
        }
        if summary.failed() > 0 {
            self.reporter.info(&format!(
                "Failures written to {}",
                workspace.root().join(ISSUES_LOG).display()
            ));
        }
    }
}

/// Outcome of a whole run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub reports: Vec<JobReport>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn new(reports: Vec<JobReport>, elapsed: Duration) -> Self {
        Self { reports, elapsed }
    }

    fn count(&self, predicate: impl Fn(&JobOutcome) -> bool) -> usize {
        self.reports.iter().filter(|r| predicate(&r.outcome)).count()
    }

    pub fn total(&self) -> usize {
        self.reports.len()
    }

    pub fn processed(&self) -> usize {
        self.count(|o| matches!(o, JobOutcome::Processed { .. }))
    }

    pub fn downloaded(&self) -> usize {
        self.count(|o| matches!(o, JobOutcome::Downloaded))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, JobOutcome::Skipped))
    }

    pub fn failed(&self) -> usize {
        self.count(JobOutcome::is_failure)
    }

    pub fn cancelled(&self) -> usize {
        self.count(|o| matches!(o, JobOutcome::Cancelled))
    }

    pub fn failures(&self) -> impl Iterator<Item = &JobReport> {
        self.reports.iter().filter(|r| r.outcome.is_failure())
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    // Format duration in a human-readable format (HH:MM:SS)
    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Run completed in {}: {} processed, {} downloaded, {} skipped, {} failed, {} cancelled",
            Self::format_duration(self.elapsed),
            self.processed(),
            self.downloaded(),
            self.skipped(),
            self.failed(),
            self.cancelled()
        )
    }
}
