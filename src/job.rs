/*!
 * Work items exchanged between the download pool and the processor.
 */

use std::fmt;
use std::path::PathBuf;

use crate::errors::DownloadError;
use crate::identifiers::VideoId;
use crate::workspace::VideoWorkspace;

/// Lifecycle of a single video through the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    Pending,
    Downloading,
    Downloaded,
    Skipped,
    Processing,
    Processed,
    Failed,
}

impl JobPhase {
    /// Whether moving from `self` to `next` is a legal step
    pub fn can_transition_to(self, next: JobPhase) -> bool {
        use JobPhase::*;
        matches!(
            (self, next),
            (Pending, Downloading)
                | (Pending, Downloaded)
                | (Pending, Skipped)
                | (Pending, Failed)
                | (Downloading, Downloaded)
                | (Downloading, Failed)
                | (Downloaded, Processing)
                | (Downloaded, Failed)
                | (Processing, Processed)
                | (Processing, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobPhase::Skipped | JobPhase::Processed | JobPhase::Failed)
    }
}

/// Working state for one video id
#[derive(Debug, Clone)]
pub struct VideoJob {
    pub id: VideoId,
    pub dir: PathBuf,
    pub video_path: PathBuf,
    phase: JobPhase,
}

impl VideoJob {
    pub fn new(id: VideoId, workspace: &VideoWorkspace) -> Self {
        Self {
            dir: workspace.dir(&id),
            video_path: workspace.video_path(&id),
            id,
            phase: JobPhase::Pending,
        }
    }

    pub fn phase(&self) -> JobPhase {
        self.phase
    }

    /// Move to `next`; illegal transitions are ignored and reported as `false`
    pub fn advance(&mut self, next: JobPhase) -> bool {
        if self.phase.can_transition_to(next) {
            self.phase = next;
            true
        } else {
            log::debug!("Ignoring transition {:?} -> {:?} for {}", self.phase, next, self.id);
            false
        }
    }

    /// Close the job with `outcome`, keeping the phase it reached
    pub fn into_report(self, outcome: JobOutcome) -> JobReport {
        JobReport::new(self.id, outcome, self.phase)
    }
}

/// Value published by a download job on the handoff queue
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionSignal {
    /// Already processed in a previous run, nothing to do
    Skip(VideoId),
    /// Video is on disk and ready for extraction
    Ready(VideoId),
    /// The download did not produce a usable video
    DownloadFailed { id: VideoId, error: DownloadError },
}

impl CompletionSignal {
    pub fn id(&self) -> &VideoId {
        match self {
            CompletionSignal::Skip(id) | CompletionSignal::Ready(id) => id,
            CompletionSignal::DownloadFailed { id, .. } => id,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, CompletionSignal::Ready(_))
    }
}

/// Final state of one video after a run
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// Extraction succeeded and the video was removed
    Processed { artifacts: usize },
    /// Download finished (download-only runs)
    Downloaded,
    /// Skipped by the already-processed heuristic
    Skipped,
    DownloadFailed(String),
    ExtractionFailed(String),
    Cancelled,
}

impl JobOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            JobOutcome::DownloadFailed(_) | JobOutcome::ExtractionFailed(_)
        )
    }
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobOutcome::Processed { artifacts } => write!(f, "processed ({} artifacts)", artifacts),
            JobOutcome::Downloaded => write!(f, "downloaded"),
            JobOutcome::Skipped => write!(f, "skipped"),
            JobOutcome::DownloadFailed(reason) => write!(f, "download failed: {}", reason),
            JobOutcome::ExtractionFailed(reason) => write!(f, "extraction failed: {}", reason),
            JobOutcome::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Outcome of one video, as reported by a stage
#[derive(Debug, Clone, PartialEq)]
pub struct JobReport {
    pub id: VideoId,
    pub outcome: JobOutcome,
    /// Last phase the job reached in that stage
    pub phase: JobPhase,
}

impl JobReport {
    pub fn new(id: VideoId, outcome: JobOutcome, phase: JobPhase) -> Self {
        Self { id, outcome, phase }
    }
}
