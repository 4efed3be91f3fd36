//! In-process queue wake-up signal.
//!
//! Admission nudges the processor through this instead of a fire-and-forget
//! HTTP call. The notification is best-effort (a missed permit costs at
//! most one poll interval); durability comes from the job row itself plus
//! the watchdog sweep.

use tokio::sync::Notify;

/// Wake-up channel between admission/watchdog and the queue processor.
#[derive(Debug, Default)]
pub struct QueueSignal {
    notify: Notify,
}

impl QueueSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Nudge the processor. Never blocks; a permit is stored if the
    /// processor is mid-cycle so the wake-up is not lost.
    pub fn notify(&self) {
        self.notify.notify_one();
    }

    /// Wait until nudged.
    pub async fn notified(&self) {
        self.notify.notified().await;
    }
}
