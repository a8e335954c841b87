//! Proptest strategies for model types.
//!
//! This module is only available when the `testing` feature is enabled.

use crate::query::query_state::QueryState;
use crate::query::{QueryPool, QueryRecord};
use proptest::prelude::*;

/// Strategy for a single-line SQL statement.
pub fn arb_query_text() -> impl Strategy<Value = String> {
    prop_oneof![
        proptest::string::string_regex("SELECT [a-z][a-z0-9_]{0,11} FROM [a-z][a-z0-9_]{0,11}")
            .unwrap(),
        (0..10_000u32).prop_map(|n| format!("SELECT {n}")),
        proptest::string::string_regex("CREATE TABLE [a-z][a-z0-9_]{0,11}").unwrap(),
    ]
}

prop_compose! {
    /// Strategy for a non-empty pool of up to `max_len` queries.
    pub fn arb_query_pool(max_len: usize)(
        texts in prop::collection::vec(arb_query_text(), 1..=max_len.max(1))
    ) -> QueryPool {
        QueryPool::new(QueryRecord::from_texts("pool", texts)).expect("Strategy never yields an empty pool")
    }
}

pub fn arb_terminal_state() -> impl Strategy<Value = QueryState> {
    prop_oneof![
        Just(QueryState::Succeeded),
        Just(QueryState::Failed),
        Just(QueryState::Cancelled),
    ]
}

/// Strategy for an error message of arbitrary (possibly multi-byte) characters.
pub fn arb_error_message(max_chars: usize) -> impl Strategy<Value = String> {
    prop::collection::vec(any::<char>(), 0..=max_chars).prop_map(|chars| chars.into_iter().collect())
}
