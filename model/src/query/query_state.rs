#[cfg(feature = "testing")]
use proptest_derive::Arbitrary;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

#[cfg_attr(feature = "testing", derive(Arbitrary))]
#[derive(
    Clone, Copy, Debug, Default, Display, PartialEq, Eq, Hash, EnumIter, EnumString,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum QueryState {
    #[default]
    Pending, // Submitted, no terminal callback observed yet
    Running,   // Accepted by the service and streaming results
    Succeeded, // Query finished without error
    Failed,    // Query failed on the service or was rejected on submission
    Cancelled, // Query was cancelled by the service
}

impl QueryState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            QueryState::Succeeded | QueryState::Failed | QueryState::Cancelled
        )
    }

    pub fn terminal_states() -> Vec<QueryState> {
        QueryState::iter().filter(QueryState::is_terminal).collect()
    }
}
