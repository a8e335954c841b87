use super::QueryId;
use super::query_state::QueryState;

/// Outcome of a single submission as seen by the thread that waited on it.
///
/// `state` stays [`QueryState::Pending`] only when the waiter gave up before a
/// terminal callback arrived; in that case `error_message` explains why.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionResult {
    pub query_id: Option<QueryId>,
    pub state: QueryState,
    pub error_message: Option<String>,
}

impl SubmissionResult {
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn is_failed(&self) -> bool {
        self.state == QueryState::Failed
    }
}
