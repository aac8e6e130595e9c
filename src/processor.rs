/*!
 * Sequential processing stage.
 *
 * The processor is the only consumer of the handoff queue. It handles one
 * signal at a time in arrival order, so extraction never runs twice at once
 * even though downloads proceed in parallel.
 */

use indicatif::ProgressBar;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::app_config::Config;
use crate::collaborators::{run_bounded, ExtractionRequest, Extractor, Interrupted};
use crate::errors::{DownloadError, ExtractionError};
use crate::job::{CompletionSignal, JobOutcome, JobPhase, JobReport, VideoJob};
use crate::queue::HandoffReceiver;
use crate::reporter::SharedReporter;
use crate::workspace::VideoWorkspace;

/// Knobs forwarded to the extraction collaborator
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessorSettings {
    pub nb_finders: usize,
    pub nb_extractors: usize,
    /// Per-video extraction timeout
    pub timeout: Option<Duration>,
}

impl ProcessorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            nb_finders: config.extraction.nb_finders,
            nb_extractors: config.extraction.nb_extractors,
            timeout: config.extraction.timeout(),
        }
    }
}

/// Single consumer driving the extractor
pub struct SequentialProcessor {
    extractor: Arc<dyn Extractor>,
    workspace: VideoWorkspace,
    settings: ProcessorSettings,
    reporter: SharedReporter,
    progress: Option<ProgressBar>,
}

impl SequentialProcessor {
    pub fn new(
        extractor: Arc<dyn Extractor>,
        workspace: VideoWorkspace,
        settings: ProcessorSettings,
        reporter: SharedReporter,
    ) -> Self {
        Self {
            extractor,
            workspace,
            settings,
            reporter,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Consume every expected signal, one at a time.
    ///
    /// After cancellation the remaining signals are still drained but
    /// reported as cancelled instead of processed.
    pub async fn run(
        &self,
        mut receiver: HandoffReceiver,
        cancel: &CancellationToken,
    ) -> Vec<JobReport> {
        let mut reports = Vec::with_capacity(receiver.expected());

        while let Some(signal) = receiver.recv().await {
            let report = self.handle(signal, cancel).await;
            if let Some(progress) = &self.progress {
                progress.inc(1);
            }
            reports.push(report);
        }

        if receiver.remaining() > 0 {
            self.reporter.warn(&format!(
                "Download stage stopped early, {} signal(s) never arrived",
                receiver.remaining()
            ));
        }

        reports
    }

    /// Handle a single signal
    pub async fn handle(&self, signal: CompletionSignal, cancel: &CancellationToken) -> JobReport {
        let mut job = VideoJob::new(signal.id().clone(), &self.workspace);

        let outcome = match signal {
            CompletionSignal::Skip(id) => {
                job.advance(JobPhase::Skipped);
                self.reporter
                    .debug(&format!("Video {} skipped, nothing to process", id));
                JobOutcome::Skipped
            }
            CompletionSignal::DownloadFailed {
                error: DownloadError::Cancelled,
                ..
            } => JobOutcome::Cancelled,
            CompletionSignal::DownloadFailed { error, .. } => {
                job.advance(JobPhase::Failed);
                JobOutcome::DownloadFailed(error.to_string())
            }
            CompletionSignal::Ready(id) => {
                job.advance(JobPhase::Downloaded);
                if cancel.is_cancelled() {
                    JobOutcome::Cancelled
                } else {
                    match self.process(&mut job, cancel).await {
                        Ok(artifacts) => JobOutcome::Processed { artifacts },
                        Err(ExtractionError::Cancelled) => {
                            self.reporter
                                .warn(&format!("Processing of video {} cancelled", id));
                            JobOutcome::Cancelled
                        }
                        Err(e) => {
                            self.reporter
                                .error(&format!("Failed to process video {}: {}", id, e));
                            JobOutcome::ExtractionFailed(e.to_string())
                        }
                    }
                }
            }
        };

        job.into_report(outcome)
    }

    /// Reset artifacts, extract, then reclaim the video.
    ///
    /// `job` must be in the `Downloaded` phase. A missing video leaves
    /// existing artifacts untouched. The video is only removed when the
    /// extractor succeeded.
    pub async fn process(
        &self,
        job: &mut VideoJob,
        cancel: &CancellationToken,
    ) -> Result<usize, ExtractionError> {
        let id = job.id.clone();

        if job.phase() != JobPhase::Downloaded {
            return Err(ExtractionError::NotReady(id.to_string()));
        }

        // Without a video there is no extraction to reset for
        if !job.video_path.is_file() {
            job.advance(JobPhase::Failed);
            return Err(ExtractionError::MissingVideo(
                job.video_path.display().to_string(),
            ));
        }

        let removed = self
            .workspace
            .clear_artifacts(&id)
            .map_err(|e| ExtractionError::Workspace(format!("{:#}", e)))?;
        if removed > 0 {
            self.reporter.debug(&format!(
                "Removed {} previous artifacts of video {}",
                removed, id
            ));
        }

        self.reporter.info(&format!("Processing video {}", id));
        job.advance(JobPhase::Processing);

        let request = ExtractionRequest {
            video_path: job.video_path.clone(),
            output_dir: job.dir.clone(),
            nb_finders: self.settings.nb_finders,
            nb_extractors: self.settings.nb_extractors,
        };

        let result = match run_bounded(
            self.extractor.extract(&request),
            self.settings.timeout,
            cancel,
        )
        .await
        {
            Ok(result) => result,
            Err(Interrupted::TimedOut) => Err(ExtractionError::TimedOut(
                self.settings.timeout.unwrap_or_default(),
            )),
            Err(Interrupted::Cancelled) => Err(ExtractionError::Cancelled),
        };

        if let Err(e) = result {
            job.advance(JobPhase::Failed);
            return Err(e);
        }

        self.reporter.info(&format!("Removing video {}", id));
        self.workspace
            .remove_video(&id)
            .map_err(|e| ExtractionError::Workspace(format!("{:#}", e)))?;
        job.advance(JobPhase::Processed);

        let artifacts = self.workspace.count_artifacts(&id).unwrap_or_default();
        self.reporter.info(&format!(
            "Video {} successfully processed ({} artifacts)",
            id, artifacts
        ));
        Ok(artifacts)
    }
}
