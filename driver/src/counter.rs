use crate::interrupt::{Interrupt, Interrupted};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Completion counter of {total} submissions was counted down past zero")]
pub struct CounterExhausted {
    pub total: usize,
}

/// Countdown of the submissions of one phase that have not finished yet.
///
/// Workers count down once each; the phase coordinator blocks in [`wait`]
/// until the count reaches zero. Reaching zero drops the release sender, which
/// wakes every waiter at once.
///
/// [`wait`]: CompletionCounter::wait
#[derive(Debug)]
pub struct CompletionCounter {
    total: usize,
    remaining: AtomicUsize,
    release: Mutex<Option<flume::Sender<()>>>,
    released: flume::Receiver<()>,
}

impl CompletionCounter {
    pub fn new(total: usize) -> Self {
        let (release, released) = flume::bounded(1);
        let counter = Self {
            total,
            remaining: AtomicUsize::new(total),
            release: Mutex::new(Some(release)),
            released,
        };
        if total == 0 {
            counter.release();
        }
        counter
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::SeqCst)
    }

    /// Returns the number of submissions still outstanding after this one.
    pub fn count_down(&self) -> Result<usize, CounterExhausted> {
        let previous = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .map_err(|_| CounterExhausted { total: self.total })?;

        let remaining = previous - 1;
        if remaining == 0 {
            self.release();
        }
        Ok(remaining)
    }

    pub fn wait(&self, interrupt: &Interrupt) -> Result<(), Interrupted> {
        // The release sender is never used to send, so only disconnection wakes us
        let _ = interrupt.wait(&self.released)?;
        Ok(())
    }

    fn release(&self) {
        self.release
            .lock()
            .expect("No one should panic while holding this lock")
            .take();
    }
}
