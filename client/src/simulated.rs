//! In-process stand-in for a query service.
//!
//! Every submission runs on its own thread, receives a fresh UUID as its query
//! id, streams a few empty batches and then finishes with whatever the script
//! decides for its statement.

use crate::{
    ConnectError, Connection, QueryDataBatch, QueryResultsListener, QueryService,
    SubmissionError,
};
use model::endpoint::ServiceAddr;
use model::query::QueryId;
use model::query::query_state::QueryState;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// How the simulated service finishes a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedOutcome {
    /// Report `query_completed` with the given state.
    Complete(QueryState),
    /// Report `submission_failed` with the given message.
    Reject(String),
    /// Keep the query running until [`SimulatedService::release_hung`].
    Hang,
}

type Script = Box<dyn Fn(&str) -> ScriptedOutcome + Send + Sync>;

struct Shared {
    script: Script,
    batches_per_query: usize,
    refuse_connections: bool,
    submitted: Mutex<Vec<String>>,
    connects: AtomicUsize,
    closes: AtomicUsize,
    hang_gate: Mutex<Option<flume::Sender<()>>>,
    hang_release: flume::Receiver<()>,
}

#[derive(Clone)]
pub struct SimulatedService {
    shared: Arc<Shared>,
}

impl Default for SimulatedService {
    fn default() -> Self {
        Self::with_script(|_| ScriptedOutcome::Complete(QueryState::Succeeded))
    }
}

impl SimulatedService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script<F>(script: F) -> Self
    where
        F: Fn(&str) -> ScriptedOutcome + Send + Sync + 'static,
    {
        let (gate, hang_release) = flume::bounded(1);
        Self {
            shared: Arc::new(Shared {
                script: Box::new(script),
                batches_per_query: 2,
                refuse_connections: false,
                submitted: Mutex::new(Vec::new()),
                connects: AtomicUsize::new(0),
                closes: AtomicUsize::new(0),
                hang_gate: Mutex::new(Some(gate)),
                hang_release,
            }),
        }
    }

    /// Number of empty batches streamed before each query finishes.
    pub fn with_batches(mut self, batches_per_query: usize) -> Self {
        self.configure().batches_per_query = batches_per_query;
        self
    }

    pub fn refusing_connections(mut self) -> Self {
        self.configure().refuse_connections = true;
        self
    }

    fn configure(&mut self) -> &mut Shared {
        Arc::get_mut(&mut self.shared)
            .expect("Simulated service must be configured before it is shared")
    }

    /// Statements in the order they were submitted.
    pub fn submitted(&self) -> Vec<String> {
        self.shared
            .submitted
            .lock()
            .expect("No one should panic while holding this lock")
            .clone()
    }

    pub fn connect_count(&self) -> usize {
        self.shared.connects.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.shared.closes.load(Ordering::SeqCst)
    }

    /// Lets every hanging query (current and future) finish successfully.
    pub fn release_hung(&self) {
        self.shared
            .hang_gate
            .lock()
            .expect("No one should panic while holding this lock")
            .take();
    }
}

impl QueryService for SimulatedService {
    type Connection = SimulatedConnection;

    #[instrument(skip(self), fields(addr = %addr))]
    fn connect(&self, addr: &ServiceAddr) -> Result<SimulatedConnection, ConnectError> {
        if self.shared.refuse_connections {
            warn!("Refusing connection");
            return Err(ConnectError::Refused { addr: addr.clone() });
        }
        self.shared.connects.fetch_add(1, Ordering::SeqCst);
        info!("Accepted connection");
        Ok(SimulatedConnection {
            shared: self.shared.clone(),
            closed: Arc::new(AtomicBool::new(false)),
        })
    }
}

pub struct SimulatedConnection {
    shared: Arc<Shared>,
    closed: Arc<AtomicBool>,
}

impl SimulatedConnection {
    fn run_query(shared: &Shared, query: &str, listener: &dyn QueryResultsListener) {
        let query_id = QueryId::new(Uuid::new_v4().to_string());
        debug!("Assigned query id {}", query_id);
        listener.query_id_arrived(query_id);

        for _ in 0..shared.batches_per_query {
            listener.data_arrived(QueryDataBatch::default());
        }

        match (shared.script)(query) {
            ScriptedOutcome::Complete(state) => listener.query_completed(state),
            ScriptedOutcome::Reject(message) => {
                listener.submission_failed(SubmissionError::new(message))
            }
            ScriptedOutcome::Hang => {
                // Disconnect of the gate is the release signal
                let _ = shared.hang_release.recv();
                listener.query_completed(QueryState::Succeeded);
            }
        }
    }
}

impl Connection for SimulatedConnection {
    fn submit(&self, query: &str, listener: Arc<dyn QueryResultsListener>) {
        let submission = {
            let mut submitted = self
                .shared
                .submitted
                .lock()
                .expect("No one should panic while holding this lock");
            submitted.push(query.to_string());
            submitted.len()
        };

        if self.closed.load(Ordering::SeqCst) {
            listener.submission_failed(SubmissionError::new("Connection is closed"));
            return;
        }

        let shared = self.shared.clone();
        let query = query.to_string();
        let spawned = std::thread::Builder::new()
            .name(format!("sim-query-{submission}"))
            .spawn({
                let listener = listener.clone();
                move || Self::run_query(&shared, &query, listener.as_ref())
            });

        if let Err(e) = spawned {
            listener.submission_failed(SubmissionError::new(format!(
                "Failed to start query: {e}"
            )));
        }
    }

    fn close(&self) {
        self.shared.closes.fetch_add(1, Ordering::SeqCst);
        if self.closed.swap(true, Ordering::SeqCst) {
            warn!("Connection closed more than once");
        } else {
            info!("Connection closed");
        }
    }
}
