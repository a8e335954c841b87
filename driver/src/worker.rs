use crate::counter::CompletionCounter;
use crate::interrupt::Interrupt;
use crate::listener::ResultListener;
use crate::phase::Phase;
use crate::report::{CompletionRecord, CompletionReporter};
use client::Connection;
use model::query::QueryRecord;
use model::query::result::SubmissionResult;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Counts the phase down when dropped, so the phase never waits on a worker
/// that returned early or panicked.
struct CountDownOnDrop<'a>(&'a CompletionCounter);

impl Drop for CountDownOnDrop<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.0.count_down() {
            warn!("{}", e);
        }
    }
}

/// Runs one submission to a terminal state and reports it.
pub struct QueryWorker {
    phase: Phase,
    connection: Arc<dyn Connection>,
    query: QueryRecord,
    counter: Arc<CompletionCounter>,
    reporter: Arc<dyn CompletionReporter>,
    excerpt_len: usize,
}

impl QueryWorker {
    pub fn new(
        phase: Phase,
        connection: Arc<dyn Connection>,
        query: QueryRecord,
        counter: Arc<CompletionCounter>,
        reporter: Arc<dyn CompletionReporter>,
        excerpt_len: usize,
    ) -> Self {
        Self {
            phase,
            connection,
            query,
            counter,
            reporter,
            excerpt_len,
        }
    }

    #[instrument(skip_all, fields(phase = %self.phase, origin = %self.query.origin()))]
    pub fn run(self, interrupt: &Interrupt) -> SubmissionResult {
        let _count_down = CountDownOnDrop(&self.counter);

        let listener = Arc::new(ResultListener::new());
        debug!("> {}", self.query.text());
        self.connection.submit(self.query.text(), listener.clone());
        let result = listener.wait_for_terminal(interrupt);

        let record = CompletionRecord::new(
            self.phase,
            self.completion_index(),
            self.query.origin(),
            &result,
            self.excerpt_len,
        );
        self.reporter.report(record);
        result
    }

    // Racy by nature; only used to number output lines
    fn completion_index(&self) -> usize {
        self.counter.total() - self.counter.remaining() + 1
    }
}
