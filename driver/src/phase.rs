use crate::counter::CompletionCounter;
use crate::interrupt::{Interrupt, Interrupted};
use crate::report::CompletionReporter;
use crate::worker::QueryWorker;
use client::Connection;
use model::query::QueryRecord;
use std::sync::Arc;
use std::thread;
use strum::Display;
use tracing::{error, info, instrument, warn};

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
#[strum(serialize_all = "lowercase")]
pub enum Phase {
    Setup,
    Load,
}

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum PhaseOutcome {
    /// Every submission reached a terminal or abandoned state.
    Completed,
    /// The coordinator stopped waiting; started workers keep running.
    Interrupted,
}

/// A batch of submissions gated by one completion barrier.
///
/// Each [`start`](LoadPhase::start) spawns a dedicated worker thread. Workers
/// are never joined: a phase that is interrupted simply stops waiting for them.
pub struct LoadPhase {
    phase: Phase,
    connection: Arc<dyn Connection>,
    counter: Arc<CompletionCounter>,
    reporter: Arc<dyn CompletionReporter>,
    excerpt_len: usize,
    started: usize,
}

impl LoadPhase {
    pub fn new(
        phase: Phase,
        connection: Arc<dyn Connection>,
        submissions: usize,
        reporter: Arc<dyn CompletionReporter>,
        excerpt_len: usize,
    ) -> Self {
        Self {
            phase,
            connection,
            counter: Arc::new(CompletionCounter::new(submissions)),
            reporter,
            excerpt_len,
            started: 0,
        }
    }

    pub fn started(&self) -> usize {
        self.started
    }

    pub fn remaining(&self) -> usize {
        self.counter.remaining()
    }

    /// Starts one worker for `query` on its own thread.
    pub fn start(&mut self, query: QueryRecord) {
        if self.started == self.counter.total() {
            warn!(
                "All {} submissions of the {} phase already started, ignoring {}",
                self.started,
                self.phase,
                query.origin()
            );
            return;
        }
        let submission = self.started;
        self.started += 1;

        let origin = query.origin().to_string();
        let worker = QueryWorker::new(
            self.phase,
            self.connection.clone(),
            query,
            self.counter.clone(),
            self.reporter.clone(),
            self.excerpt_len,
        );

        let spawned = thread::Builder::new()
            .name(format!("{}-worker-{}", self.phase, submission))
            .spawn(move || {
                worker.run(&Interrupt::new());
            });

        if let Err(e) = spawned {
            // The worker never ran, so its slot has to be released here
            error!("Failed to start worker thread for {}: {}", origin, e);
            if let Err(e) = self.counter.count_down() {
                warn!("{}", e);
            }
        }
    }

    /// Blocks until every submission of the phase has finished.
    #[instrument(skip_all, fields(phase = %self.phase))]
    pub fn wait(&self, interrupt: &Interrupt) -> PhaseOutcome {
        match self.counter.wait(interrupt) {
            Ok(()) => {
                info!("All {} submissions finished", self.counter.total());
                PhaseOutcome::Completed
            }
            Err(Interrupted) => {
                warn!(
                    "Interrupted with {} of {} submissions outstanding",
                    self.counter.remaining(),
                    self.counter.total()
                );
                PhaseOutcome::Interrupted
            }
        }
    }

    /// Starts one worker per query, all at once, and waits for them.
    pub fn run<I>(mut self, queries: I, interrupt: &Interrupt) -> PhaseOutcome
    where
        I: IntoIterator<Item = QueryRecord>,
    {
        for query in queries {
            self.start(query);
        }
        self.wait(interrupt)
    }
}
