use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Interrupted while waiting")]
pub struct Interrupted;

/// Pending-interrupt flag for the thread that waits on it.
///
/// Raising the flag wakes the blocking call the owning thread is in (or the
/// next one it makes). The call that observes the flag clears it, so later
/// waits block normally again. Raising an already pending flag is a no-op.
#[derive(Debug, Clone)]
pub struct Interrupt {
    raise: flume::Sender<()>,
    pending: flume::Receiver<()>,
}

impl Default for Interrupt {
    fn default() -> Self {
        Self::new()
    }
}

impl Interrupt {
    pub fn new() -> Self {
        let (raise, pending) = flume::bounded(1);
        Self { raise, pending }
    }

    pub fn interrupt(&self) {
        // Full means an interrupt is already pending
        let _ = self.raise.try_send(());
    }

    pub fn is_interrupted(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Clears a pending interrupt and reports whether there was one.
    pub fn take(&self) -> bool {
        self.pending.try_recv().is_ok()
    }

    pub fn sleep(&self, duration: Duration) -> Result<(), Interrupted> {
        match self.pending.recv_timeout(duration) {
            Ok(()) => Err(Interrupted),
            // Disconnection is impossible while we hold `raise`
            Err(_) => Ok(()),
        }
    }

    /// Blocks until `signal` yields a message or disconnects, unless
    /// interrupted first. A pending interrupt wins over a ready signal.
    pub(crate) fn wait<T>(
        &self,
        signal: &flume::Receiver<T>,
    ) -> Result<Result<T, flume::RecvError>, Interrupted> {
        if self.take() {
            return Err(Interrupted);
        }
        flume::Selector::new()
            .recv(signal, Ok)
            .recv(&self.pending, |_| Err(Interrupted))
            .wait()
    }
}
