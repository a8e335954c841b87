//! Test utilities shared by the driver's unit and integration tests.
//! Provides tracing setup, simulated-service scripts and proptest strategies.

use client::simulated::ScriptedOutcome;
use model::query::query_state::QueryState;
use proptest::prelude::*;
use std::sync::Once;
use tracing_subscriber::EnvFilter;

// Re-export proptest and the model strategies for convenience
pub use model::testing::*;
pub use proptest;

static TRACING: Once = Once::new();

/// Routes `tracing` output through the test harness so it only shows for
/// failing tests. Honors `RUST_LOG`, defaulting to `debug`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_thread_names(true)
            .try_init();
    });
}

/// Script that rejects every statement containing `needle` and lets the rest
/// succeed.
pub fn reject_containing(
    needle: &'static str,
    message: &'static str,
) -> impl Fn(&str) -> ScriptedOutcome + Send + Sync + 'static {
    move |statement| {
        if statement.contains(needle) {
            ScriptedOutcome::Reject(message.to_string())
        } else {
            ScriptedOutcome::Complete(QueryState::Succeeded)
        }
    }
}

/// Script that keeps every statement containing `needle` running until the
/// service releases it.
pub fn hang_containing(needle: &'static str) -> impl Fn(&str) -> ScriptedOutcome + Send + Sync + 'static {
    move |statement| {
        if statement.contains(needle) {
            ScriptedOutcome::Hang
        } else {
            ScriptedOutcome::Complete(QueryState::Succeeded)
        }
    }
}

/// Order in which up to `max_workers` workers finish: a permutation of
/// `0..n` for some `n <= max_workers`.
pub fn arb_completion_order(max_workers: usize) -> impl Strategy<Value = Vec<usize>> {
    (0..=max_workers).prop_flat_map(|n| Just((0..n).collect::<Vec<usize>>()).prop_shuffle())
}

/// Outcome a simulated service may script for one statement, excluding hangs.
pub fn arb_finishing_outcome() -> impl Strategy<Value = ScriptedOutcome> {
    prop_oneof![
        arb_terminal_state().prop_map(ScriptedOutcome::Complete),
        arb_error_message(120).prop_map(ScriptedOutcome::Reject),
    ]
}
