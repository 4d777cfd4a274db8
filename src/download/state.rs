//! Consumption state shared by a handle and the reader it hands out.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle of a download handle.
///
/// `Unconsumed -> Consuming -> {Completed | Failed}`; `Closed` is reachable
/// from every state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DownloadState {
    Unconsumed = 0,
    Consuming = 1,
    Completed = 2,
    Failed = 3,
    Closed = 4,
}

impl DownloadState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Unconsumed,
            1 => Self::Consuming,
            2 => Self::Completed,
            3 => Self::Failed,
            _ => Self::Closed,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ConsumptionState(Arc<AtomicU8>);

impl ConsumptionState {
    pub(crate) fn new(initial: DownloadState) -> Self {
        Self(Arc::new(AtomicU8::new(initial as u8)))
    }

    pub(crate) fn get(&self) -> DownloadState {
        DownloadState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Claims the body. Only the first caller on an unconsumed handle wins.
    pub(crate) fn begin(&self) -> Result<(), DownloadState> {
        self.transition(DownloadState::Unconsumed, DownloadState::Consuming)
    }

    /// Records the end of an in-progress consumption.
    pub(crate) fn finish(&self, outcome: DownloadState) {
        let _ = self.transition(DownloadState::Consuming, outcome);
    }

    pub(crate) fn close(&self) {
        self.0.store(DownloadState::Closed as u8, Ordering::Release);
    }

    pub(crate) fn transition(
        &self,
        from: DownloadState,
        to: DownloadState,
    ) -> Result<(), DownloadState> {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(DownloadState::from_u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_succeeds_once() {
        let state = ConsumptionState::new(DownloadState::Unconsumed);
        assert!(state.begin().is_ok());
        assert_eq!(state.begin(), Err(DownloadState::Consuming));
        assert_eq!(state.get(), DownloadState::Consuming);
    }

    #[test]
    fn test_finish_only_applies_while_consuming() {
        let state = ConsumptionState::new(DownloadState::Unconsumed);
        state.finish(DownloadState::Completed);
        assert_eq!(state.get(), DownloadState::Unconsumed);
        state.begin().ok();
        state.finish(DownloadState::Failed);
        assert_eq!(state.get(), DownloadState::Failed);
        state.finish(DownloadState::Completed);
        assert_eq!(state.get(), DownloadState::Failed);
    }

    #[test]
    fn test_close_from_any_state() {
        let state = ConsumptionState::new(DownloadState::Completed);
        state.close();
        assert_eq!(state.get(), DownloadState::Closed);
        assert_eq!(state.begin(), Err(DownloadState::Closed));
    }
}
