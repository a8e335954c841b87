use crate::interrupt::{Interrupt, Interrupted};
use crate::phase::{LoadPhase, Phase, PhaseOutcome};
use crate::report::{CompletionReporter, DEFAULT_ERROR_EXCERPT_LEN, StdoutReporter};
use client::{ConnectError, Connection, QueryService};
use model::endpoint::ServiceAddr;
use model::query::{QueryPool, QueryRecord};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use strum::Display;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("Could not connect to the query service")]
    Connect(#[from] ConnectError),
}

/// `Error` is absorbing: every path through it continues with `Closing` and
/// then `Done`.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum DriverState {
    Connecting,
    Setup,
    Loading,
    Closing,
    Done,
    Error,
}

/// Everything the driver needs to know about one run.
#[derive(Debug, Clone)]
pub struct LoadPlan {
    pub service_addr: ServiceAddr,
    pub setup_queries: Vec<QueryRecord>,
    pub worker_threads: NonZeroUsize,
    pub query_pool: QueryPool,
    pub pacing_delay: Duration,
    pub error_excerpt_len: usize,
}

impl LoadPlan {
    pub fn new(
        service_addr: ServiceAddr,
        setup_queries: Vec<QueryRecord>,
        worker_threads: NonZeroUsize,
        query_pool: QueryPool,
    ) -> Self {
        Self {
            service_addr,
            setup_queries,
            worker_threads,
            query_pool,
            pacing_delay: Duration::ZERO,
            error_excerpt_len: DEFAULT_ERROR_EXCERPT_LEN,
        }
    }

    pub fn with_pacing_delay(mut self, pacing_delay: Duration) -> Self {
        self.pacing_delay = pacing_delay;
        self
    }

    pub fn with_error_excerpt_len(mut self, error_excerpt_len: usize) -> Self {
        self.error_excerpt_len = error_excerpt_len;
        self
    }

    /// Every worker thread runs through the whole pool once.
    pub fn load_submissions(&self) -> usize {
        self.worker_threads.get().saturating_mul(self.query_pool.len())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub transitions: Vec<DriverState>,
    pub setup: PhaseOutcome,
    /// `None` when setup did not complete and the load phase was skipped.
    pub load: Option<PhaseOutcome>,
    pub setup_started: usize,
    pub load_started: usize,
}

/// Closes the shared connection exactly once, also while unwinding.
struct ConnectionGuard {
    connection: Arc<dyn Connection>,
}

impl ConnectionGuard {
    fn connection(&self) -> Arc<dyn Connection> {
        self.connection.clone()
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        info!("Closing connection");
        self.connection.close();
    }
}

/// Runs the setup phase, then the sustained load phase, over one connection.
pub struct LoadDriver<S: QueryService> {
    service: S,
    plan: LoadPlan,
    reporter: Arc<dyn CompletionReporter>,
    transitions: Vec<DriverState>,
}

impl<S: QueryService> LoadDriver<S> {
    pub fn new(service: S, plan: LoadPlan) -> Self {
        Self {
            service,
            plan,
            reporter: Arc::new(StdoutReporter),
            transitions: Vec::new(),
        }
    }

    pub fn with_reporter(mut self, reporter: impl CompletionReporter + 'static) -> Self {
        self.reporter = Arc::new(reporter);
        self
    }

    /// States visited by the latest [`run`](LoadDriver::run), in order.
    pub fn transitions(&self) -> &[DriverState] {
        &self.transitions
    }

    /// Drives both phases to completion.
    ///
    /// `interrupt` belongs to the calling thread: raising it while a phase is
    /// waiting abandons that phase (and skips the load phase if setup was
    /// abandoned). The connection is closed before this returns in every case
    /// except a failed connect, which has nothing to close but still passes
    /// through [`DriverState::Closing`].
    #[instrument(skip_all, fields(addr = %self.plan.service_addr))]
    pub fn run(&mut self, interrupt: &Interrupt) -> Result<RunSummary, DriverError> {
        self.transitions.clear();
        self.transition(DriverState::Connecting);
        let guard = match self.service.connect(&self.plan.service_addr) {
            Ok(connection) => ConnectionGuard {
                connection: Arc::new(connection),
            },
            Err(e) => {
                error!("Failed trying to connect: {}", e);
                self.transition(DriverState::Error);
                self.transition(DriverState::Closing);
                self.transition(DriverState::Done);
                return Err(e.into());
            }
        };

        self.transition(DriverState::Setup);
        let setup_started = self.plan.setup_queries.len();
        let setup = self.run_setup(guard.connection(), interrupt);

        let (load, load_started) = match setup {
            PhaseOutcome::Completed => {
                self.transition(DriverState::Loading);
                let (outcome, started) = self.run_load(guard.connection(), interrupt);
                if outcome == PhaseOutcome::Interrupted {
                    self.transition(DriverState::Error);
                }
                (Some(outcome), started)
            }
            PhaseOutcome::Interrupted => {
                warn!("Setup did not complete, skipping load phase");
                self.transition(DriverState::Error);
                (None, 0)
            }
        };

        self.transition(DriverState::Closing);
        drop(guard);
        self.transition(DriverState::Done);

        Ok(RunSummary {
            transitions: self.transitions.clone(),
            setup,
            load,
            setup_started,
            load_started,
        })
    }

    fn run_setup(&self, connection: Arc<dyn Connection>, interrupt: &Interrupt) -> PhaseOutcome {
        let queries = &self.plan.setup_queries;
        info!("Running {} setup queries", queries.len());
        LoadPhase::new(
            Phase::Setup,
            connection,
            queries.len(),
            self.reporter.clone(),
            self.plan.error_excerpt_len,
        )
        .run(queries.iter().cloned(), interrupt)
    }

    fn run_load(
        &self,
        connection: Arc<dyn Connection>,
        interrupt: &Interrupt,
    ) -> (PhaseOutcome, usize) {
        let submissions = self.plan.load_submissions();
        info!(
            "Submitting {} queries from a pool of {} with {:?} between submissions",
            submissions,
            self.plan.query_pool.len(),
            self.plan.pacing_delay
        );

        let mut phase = LoadPhase::new(
            Phase::Load,
            connection,
            submissions,
            self.reporter.clone(),
            self.plan.error_excerpt_len,
        );
        for query in self.plan.query_pool.schedule(submissions) {
            if let Err(Interrupted) = interrupt.sleep(self.plan.pacing_delay) {
                warn!("Interrupted while pacing, submitting {} now", query.origin());
            }
            phase.start(query.clone());
        }

        (phase.wait(interrupt), phase.started())
    }

    fn transition(&mut self, next: DriverState) {
        match self.transitions.last() {
            Some(current) => info!("{} -> {}", current, next),
            None => info!("{}", next),
        }
        self.transitions.push(next);
    }
}
