//! Contract between the load driver and a query service client.
//!
//! The driver never talks to the network itself. It connects once through a
//! [`QueryService`], submits every statement over the shared [`Connection`]
//! and learns about progress through a [`QueryResultsListener`].

#[cfg(feature = "testing")]
pub mod simulated;

use model::endpoint::ServiceAddr;
use model::query::QueryId;
use model::query::query_state::QueryState;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConnectError {
    #[error("Failed to connect to query service at '{addr}': {reason}")]
    Unreachable { addr: ServiceAddr, reason: String },

    #[error("Query service at '{addr}' refused the connection")]
    Refused { addr: ServiceAddr },
}

impl ConnectError {
    pub fn addr(&self) -> &ServiceAddr {
        match self {
            ConnectError::Unreachable { addr, .. } => addr,
            ConnectError::Refused { addr } => addr,
        }
    }
}

/// Failure reported by the service before or while running a query.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct SubmissionError {
    pub message: String,
}

impl SubmissionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A batch of result rows streamed back for a running query.
#[derive(Debug, Clone, Default)]
pub struct QueryDataBatch {
    pub row_count: usize,
    pub data: Vec<u8>,
}

/// Callbacks for a single submission.
///
/// The service calls `query_id_arrived` at most once and `data_arrived` any
/// number of times, followed by exactly one of `submission_failed` or
/// `query_completed`. Callbacks may come from any thread.
pub trait QueryResultsListener: Send + Sync {
    fn query_id_arrived(&self, query_id: QueryId);

    fn data_arrived(&self, batch: QueryDataBatch);

    fn submission_failed(&self, error: SubmissionError);

    fn query_completed(&self, state: QueryState);
}

/// A live session that many threads may submit over concurrently.
pub trait Connection: Send + Sync + 'static {
    /// Hands `query` to the service and returns without waiting for it.
    fn submit(&self, query: &str, listener: Arc<dyn QueryResultsListener>);

    fn close(&self);
}

pub trait QueryService {
    type Connection: Connection;

    fn connect(&self, addr: &ServiceAddr) -> Result<Self::Connection, ConnectError>;
}
