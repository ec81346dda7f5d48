use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use lockstep_shared::FrameNumber;

/// The frame watermarks of a node, readable from any thread.
///
/// Only the node thread writes them.
#[derive(Debug, Default)]
pub struct FrameCounters {
    current: AtomicU32,
    unlocked: AtomicU32,
    finished: AtomicU32,
    local_notifications: AtomicU64,
    finish_notifications: AtomicU64,
    enforced_releases: AtomicU64,
}

/// A copy of the watermarks and notification counts at one instant
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameProgress {
    pub current: FrameNumber,
    pub unlocked: FrameNumber,
    pub finished: FrameNumber,
    pub local_notifications: u64,
    pub finish_notifications: u64,
}

impl FrameCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Newest started frame
    pub fn current(&self) -> FrameNumber {
        self.current.load(Ordering::Acquire)
    }

    /// Newest frame released locally
    pub fn unlocked(&self) -> FrameNumber {
        self.unlocked.load(Ordering::Acquire)
    }

    /// Newest frame reported finished to the control process
    pub fn finished(&self) -> FrameNumber {
        self.finished.load(Ordering::Acquire)
    }

    /// How many releases `frame_finish` had to enforce
    pub fn enforced_releases(&self) -> u64 {
        self.enforced_releases.load(Ordering::Acquire)
    }

    pub fn progress(&self) -> FrameProgress {
        FrameProgress {
            current: self.current(),
            unlocked: self.unlocked(),
            finished: self.finished(),
            local_notifications: self.local_notifications.load(Ordering::Acquire),
            finish_notifications: self.finish_notifications.load(Ordering::Acquire),
        }
    }

    pub(crate) fn reset(&self) {
        self.current.store(0, Ordering::Release);
        self.unlocked.store(0, Ordering::Release);
        self.finished.store(0, Ordering::Release);
    }

    pub(crate) fn set_current(&self, frame_number: FrameNumber) {
        self.current.store(frame_number, Ordering::Release);
    }

    pub(crate) fn set_unlocked(&self, frame_number: FrameNumber) {
        self.unlocked.store(frame_number, Ordering::Release);
        self.local_notifications.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn set_finished(&self, frame_number: FrameNumber) {
        self.finished.store(frame_number, Ordering::Release);
        self.finish_notifications.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn count_enforced_release(&self) {
        self.enforced_releases.fetch_add(1, Ordering::AcqRel);
    }
}
