use crate::interrupt::{Interrupt, Interrupted};
use client::{QueryDataBatch, QueryResultsListener, SubmissionError};
use model::query::QueryId;
use model::query::query_state::QueryState;
use model::query::result::SubmissionResult;
use std::sync::{Mutex, OnceLock};
use tracing::{debug, trace, warn};

pub const INTERRUPTED_MESSAGE: &str = "Interrupted while waiting for results";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Terminal {
    Completed(QueryState),
    Failed(String),
}

/// Turns the callbacks of one submission into a result a single thread can
/// block on.
///
/// The first terminal callback wins; whichever of `submission_failed` and
/// `query_completed` comes second is ignored.
#[derive(Debug)]
pub struct ResultListener {
    query_id: OnceLock<QueryId>,
    terminal: OnceLock<Terminal>,
    wake: Mutex<Option<flume::Sender<()>>>,
    woken: flume::Receiver<()>,
}

impl Default for ResultListener {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultListener {
    pub fn new() -> Self {
        let (wake, woken) = flume::bounded(1);
        Self {
            query_id: OnceLock::new(),
            terminal: OnceLock::new(),
            wake: Mutex::new(Some(wake)),
            woken,
        }
    }

    pub fn query_id(&self) -> Option<&QueryId> {
        self.query_id.get()
    }

    /// Blocks until a terminal callback fired or `interrupt` is raised.
    ///
    /// An interrupted wait returns whatever state is recorded at that moment
    /// (usually [`QueryState::Pending`]) with an interruption notice as the
    /// error message. The submission itself keeps running.
    pub fn wait_for_terminal(&self, interrupt: &Interrupt) -> SubmissionResult {
        match interrupt.wait(&self.woken) {
            // Woken by the terminal callback dropping `wake`
            Ok(_) => self.snapshot(),
            Err(Interrupted) => {
                warn!("{}", INTERRUPTED_MESSAGE);
                SubmissionResult {
                    error_message: Some(INTERRUPTED_MESSAGE.to_string()),
                    ..self.snapshot()
                }
            }
        }
    }

    fn snapshot(&self) -> SubmissionResult {
        let query_id = self.query_id.get().cloned();
        match self.terminal.get() {
            Some(Terminal::Completed(state)) => SubmissionResult {
                query_id,
                state: *state,
                error_message: None,
            },
            Some(Terminal::Failed(message)) => SubmissionResult {
                query_id,
                state: QueryState::Failed,
                error_message: Some(message.clone()),
            },
            None => SubmissionResult {
                query_id,
                ..SubmissionResult::default()
            },
        }
    }

    fn terminate(&self, terminal: Terminal) {
        if let Err(ignored) = self.terminal.set(terminal) {
            debug!("Ignoring {:?}, submission already terminated", ignored);
            return;
        }
        self.wake
            .lock()
            .expect("No one should panic while holding this lock")
            .take();
    }
}

impl QueryResultsListener for ResultListener {
    fn query_id_arrived(&self, query_id: QueryId) {
        debug!("Query id arrived: {}", query_id);
        if let Err(ignored) = self.query_id.set(query_id) {
            debug!("Ignoring second query id {}", ignored);
        }
    }

    fn data_arrived(&self, batch: QueryDataBatch) {
        trace!("Releasing batch of {} rows", batch.row_count);
        drop(batch);
    }

    fn submission_failed(&self, error: SubmissionError) {
        debug!("Submission failed: {}", error);
        self.terminate(Terminal::Failed(error.message));
    }

    fn query_completed(&self, state: QueryState) {
        if !state.is_terminal() {
            warn!("Query completed with non-terminal state {}", state);
        }
        debug!("Final state: {}", state);
        self.terminate(Terminal::Completed(state));
    }
}
