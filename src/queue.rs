/*!
 * Handoff queue between the download pool and the sequential processor.
 *
 * Many download jobs publish through cloned `HandoffSender`s; a single
 * `HandoffReceiver` consumes signals in arrival order and stops after the
 * number of signals it was told to expect.
 */

use tokio::sync::mpsc;

use crate::job::CompletionSignal;

/// Create a queue that will deliver exactly `expected` signals
pub fn handoff_queue(expected: usize) -> (HandoffSender, HandoffReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        HandoffSender { tx },
        HandoffReceiver {
            rx,
            expected,
            received: 0,
        },
    )
}

/// Producer side, cheap to clone into every download job
#[derive(Debug, Clone)]
pub struct HandoffSender {
    tx: mpsc::UnboundedSender<CompletionSignal>,
}

impl HandoffSender {
    /// Publish a signal; returns `false` if the consumer is gone
    pub fn put(&self, signal: CompletionSignal) -> bool {
        self.tx.send(signal).is_ok()
    }
}

/// Consumer side, owned by the sequential processor
#[derive(Debug)]
pub struct HandoffReceiver {
    rx: mpsc::UnboundedReceiver<CompletionSignal>,
    expected: usize,
    received: usize,
}

impl HandoffReceiver {
    /// Wait for the next signal.
    ///
    /// Returns `None` once `expected` signals have been taken, or earlier if
    /// every sender was dropped.
    pub async fn recv(&mut self) -> Option<CompletionSignal> {
        if self.received >= self.expected {
            return None;
        }
        let signal = self.rx.recv().await?;
        self.received += 1;
        Some(signal)
    }

    pub fn expected(&self) -> usize {
        self.expected
    }

    pub fn received(&self) -> usize {
        self.received
    }

    pub fn remaining(&self) -> usize {
        self.expected - self.received
    }
}
