use crate::phase::Phase;
use model::query::QueryId;
use model::query::query_state::QueryState;
use model::query::result::SubmissionResult;
use std::fmt;
use tracing::info;

pub const DEFAULT_ERROR_EXCERPT_LEN: usize = 50;

/// The first `max_chars` characters of `message`.
pub fn excerpt(message: &str, max_chars: usize) -> &str {
    match message.char_indices().nth(max_chars) {
        Some((end, _)) => &message[..end],
        None => message,
    }
}

/// One finished (or abandoned) submission, printed as a single line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRecord {
    pub phase: Phase,
    /// Completion order within the phase, for display only.
    pub index: usize,
    pub origin: String,
    pub query_id: Option<QueryId>,
    pub state: QueryState,
    /// Set for failed submissions and for waits that were abandoned.
    pub error_excerpt: Option<String>,
}

impl CompletionRecord {
    pub fn new(
        phase: Phase,
        index: usize,
        origin: impl Into<String>,
        result: &SubmissionResult,
        excerpt_len: usize,
    ) -> Self {
        let error_excerpt = if result.is_failed() || !result.is_terminal() {
            result
                .error_message
                .as_deref()
                .map(|message| excerpt(message, excerpt_len).to_string())
        } else {
            None
        };

        Self {
            phase,
            index,
            origin: origin.into(),
            query_id: result.query_id.clone(),
            state: result.state,
            error_excerpt,
        }
    }
}

impl fmt::Display for CompletionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: ", self.phase, self.index)?;
        match &self.query_id {
            Some(query_id) => write!(f, "{query_id}")?,
            None => f.write_str("<unknown>")?,
        }
        write!(f, " {}", self.state)?;
        if let Some(error) = &self.error_excerpt {
            write!(f, ": {error}")?;
        }
        Ok(())
    }
}

/// Destination for completion records. Called concurrently from worker threads.
pub trait CompletionReporter: Send + Sync {
    fn report(&self, record: CompletionRecord);
}

/// Prints each record as a line on stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutReporter;

impl CompletionReporter for StdoutReporter {
    fn report(&self, record: CompletionRecord) {
        println!("{record}");
    }
}

/// Emits each record as an `info` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl CompletionReporter for LogReporter {
    fn report(&self, record: CompletionRecord) {
        info!(phase = %record.phase, origin = %record.origin, "{}", record);
    }
}

impl CompletionReporter for flume::Sender<CompletionRecord> {
    fn report(&self, record: CompletionRecord) {
        // Nobody listening anymore is not the worker's problem
        let _ = self.send(record);
    }
}
