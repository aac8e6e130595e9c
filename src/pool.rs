/*!
 * Bounded-parallel download stage.
 *
 * Every resolved id becomes one job. A job decides on its own whether to
 * reuse an existing video, skip an already processed one or call the
 * downloader, and always ends by publishing exactly one signal on the
 * handoff queue.
 */

use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::app_config::Config;
use crate::collaborators::{run_bounded, Downloader, Interrupted};
use crate::errors::DownloadError;
use crate::identifiers::VideoId;
use crate::job::{CompletionSignal, JobOutcome, JobPhase, JobReport, VideoJob};
use crate::queue::HandoffSender;
use crate::reporter::SharedReporter;
use crate::workspace::VideoWorkspace;

/// Knobs of the download stage
#[derive(Debug, Clone, PartialEq)]
pub struct PoolSettings {
    /// Downloads running at once
    pub concurrency: usize,
    /// Disables the already-processed heuristic
    pub download_only: bool,
    /// Artifact count above which a video counts as processed
    pub skip_threshold: usize,
    /// Per-download timeout
    pub timeout: Option<Duration>,
}

impl PoolSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            concurrency: config.download.concurrency,
            download_only: config.download_only,
            skip_threshold: config.artifacts.skip_threshold,
            timeout: config.download.timeout(),
        }
    }
}

/// Runs download jobs with bounded parallelism
pub struct DownloadPool {
    downloader: Arc<dyn Downloader>,
    workspace: VideoWorkspace,
    settings: PoolSettings,
    reporter: SharedReporter,
    progress: Option<ProgressBar>,
}

impl DownloadPool {
    pub fn new(
        downloader: Arc<dyn Downloader>,
        workspace: VideoWorkspace,
        settings: PoolSettings,
        reporter: SharedReporter,
    ) -> Self {
        Self {
            downloader,
            workspace,
            settings,
            reporter,
            progress: None,
        }
    }

    /// Advance `progress` once per finished job
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Run every job on a background task
    pub fn spawn(
        self,
        ids: Vec<VideoId>,
        sender: HandoffSender,
        cancel: CancellationToken,
    ) -> JoinHandle<Vec<JobReport>> {
        tokio::spawn(async move { self.run(ids, sender, cancel).await })
    }

    /// Run every job, at most `concurrency` at a time.
    ///
    /// Reports come back in completion order.
    pub async fn run(
        &self,
        ids: Vec<VideoId>,
        sender: HandoffSender,
        cancel: CancellationToken,
    ) -> Vec<JobReport> {
        let concurrency = self.settings.concurrency.max(1);

        stream::iter(ids)
            .map(|id| {
                let sender = sender.clone();
                let cancel = cancel.clone();
                async move { self.run_job(id, &sender, &cancel).await }
            })
            .buffer_unordered(concurrency)
            .collect()
            .await
    }

    async fn run_job(
        &self,
        id: VideoId,
        sender: &HandoffSender,
        cancel: &CancellationToken,
    ) -> JobReport {
        let mut job = VideoJob::new(id.clone(), &self.workspace);
        let signal = self.fetch(&mut job, cancel).await;

        let outcome = match &signal {
            CompletionSignal::Ready(_) => JobOutcome::Downloaded,
            CompletionSignal::Skip(_) => JobOutcome::Skipped,
            CompletionSignal::DownloadFailed {
                error: DownloadError::Cancelled,
                ..
            } => JobOutcome::Cancelled,
            CompletionSignal::DownloadFailed { error, .. } => {
                JobOutcome::DownloadFailed(error.to_string())
            }
        };

        if !sender.put(signal) {
            self.reporter
                .debug(&format!("No consumer left for the signal of video {}", id));
        }
        if let Some(progress) = &self.progress {
            progress.inc(1);
        }

        job.into_report(outcome)
    }

    /// Decide what to do with one job and produce its signal
    async fn fetch(&self, job: &mut VideoJob, cancel: &CancellationToken) -> CompletionSignal {
        let video_id = job.id.clone();
        let id = &video_id;
        let failed = |error: DownloadError| CompletionSignal::DownloadFailed {
            id: id.clone(),
            error,
        };

        if cancel.is_cancelled() {
            return failed(DownloadError::Cancelled);
        }

        if let Err(e) = self.workspace.ensure_dir(id) {
            self.reporter.error(&format!("Video {}: {:#}", id, e));
            return failed(DownloadError::Workspace(format!("{:#}", e)));
        }

        if job.video_path.is_file() {
            self.reporter
                .warn(&format!("Video {} already downloaded", id));
            job.advance(JobPhase::Downloaded);
            return CompletionSignal::Ready(id.clone());
        }

        if !self.settings.download_only {
            match self.workspace.count_artifacts(id) {
                Ok(count) if count > self.settings.skip_threshold => {
                    self.reporter.warn(&format!(
                        "Video {} seems already processed ({} artifacts), skipping",
                        id, count
                    ));
                    job.advance(JobPhase::Skipped);
                    return CompletionSignal::Skip(id.clone());
                }
                Ok(_) => {}
                Err(e) => self.reporter.warn(&format!(
                    "Could not count artifacts of video {}: {:#}",
                    id, e
                )),
            }
        }

        self.reporter.info(&format!("Downloading video {}", id));
        job.advance(JobPhase::Downloading);

        let result = match run_bounded(
            self.downloader.download(id, &job.video_path),
            self.settings.timeout,
            cancel,
        )
        .await
        {
            Ok(result) => result,
            Err(Interrupted::TimedOut) => Err(DownloadError::TimedOut(
                self.settings.timeout.unwrap_or_default(),
            )),
            Err(Interrupted::Cancelled) => Err(DownloadError::Cancelled),
        };

        let result = result.and_then(|()| {
            if job.video_path.is_file() {
                Ok(())
            } else {
                Err(DownloadError::MissingOutput(
                    job.video_path.display().to_string(),
                ))
            }
        });

        match result {
            Ok(()) => {
                job.advance(JobPhase::Downloaded);
                self.reporter.info(&format!("Video {} downloaded", id));
                CompletionSignal::Ready(id.clone())
            }
            Err(error) => {
                if error != DownloadError::Cancelled {
                    job.advance(JobPhase::Failed);
                }
                // A leftover file would be taken for a finished download next run
                if let Err(e) = self.workspace.remove_download_leftovers(id) {
                    self.reporter.warn(&format!(
                        "Could not remove partial download of video {}: {:#}",
                        id, e
                    ));
                }
                if error == DownloadError::Cancelled {
                    self.reporter.warn(&format!("Download of video {} cancelled", id));
                } else {
                    self.reporter
                        .error(&format!("Failed to download video {}: {}", id, error));
                }
                failed(error)
            }
        }
    }
}
