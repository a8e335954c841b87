use crate::setup::{eventually, plan, run};
use client::simulated::{ScriptedOutcome, SimulatedService};
use driver::{DriverError, DriverState, Interrupt, Phase, PhaseOutcome};
use model::query::query_state::QueryState;
use std::collections::HashSet;
use std::thread;
use std::time::Duration;
use test_utils::{hang_containing, init_tracing, reject_containing};

#[test]
fn setup_then_load_over_one_connection() -> anyhow::Result<()> {
    init_tracing();
    let service = SimulatedService::new();

    let run = run(
        &service,
        plan(&["CREATE TABLE t"], &["SELECT 1"], 2)?,
        &Interrupt::new(),
    )?;

    assert_eq!(service.connect_count(), 1);
    assert_eq!(service.close_count(), 1);
    assert_eq!(service.submitted(), vec!["CREATE TABLE t", "SELECT 1", "SELECT 1"]);
    assert_eq!(run.summary.setup, PhaseOutcome::Completed);
    assert_eq!(run.summary.load, Some(PhaseOutcome::Completed));
    assert_eq!(run.records.len(), 3);
    assert!(run.records.iter().all(|r| r.state.is_terminal() && r.query_id.is_some()));

    let ids: HashSet<_> = run.records.iter().filter_map(|r| r.query_id.clone()).collect();
    assert_eq!(ids.len(), 3);
    Ok(())
}

#[test]
fn load_starts_only_after_every_setup_query_finished() -> anyhow::Result<()> {
    let service = SimulatedService::new().with_batches(8);
    let setup: Vec<String> = (0..8).map(|i| format!("CREATE TABLE t{i}")).collect();
    let setup: Vec<&str> = setup.iter().map(String::as_str).collect();

    let run = run(
        &service,
        plan(&setup, &["SELECT a", "SELECT b"], 3)?,
        &Interrupt::new(),
    )?;

    let first_load = run
        .records
        .iter()
        .position(|r| r.phase == Phase::Load)
        .expect("Load phase reported records");
    assert_eq!(first_load, 8);
    assert!(run.records[..8].iter().all(|r| r.phase == Phase::Setup));
    assert_eq!(run.phase_records(Phase::Load).len(), 6);

    let submitted = service.submitted();
    assert!(submitted[..8].iter().all(|q| q.starts_with("CREATE")));
    assert!(submitted[8..].iter().all(|q| q.starts_with("SELECT")));
    Ok(())
}

#[test]
fn failed_queries_are_reported_and_the_run_continues() -> anyhow::Result<()> {
    let message = "VALIDATION ERROR: Table 'missing' not found in schema 'dfs.tmp', please check the spelling";
    let service = SimulatedService::with_script(reject_containing("missing", message));

    let run = run(
        &service,
        plan(&[], &["SELECT * FROM missing", "SELECT 1"], 2)?,
        &Interrupt::new(),
    )?;

    assert_eq!(run.summary.load, Some(PhaseOutcome::Completed));
    let failed: Vec<_> = run
        .records
        .iter()
        .filter(|r| r.state == QueryState::Failed)
        .collect();
    assert_eq!(failed.len(), 2);
    for record in failed {
        assert_eq!(record.origin, "pool[0]");
        let excerpt = record.error_excerpt.as_deref().expect("Failures carry an excerpt");
        assert_eq!(excerpt.chars().count(), 50);
        assert!(message.starts_with(excerpt));
    }
    assert_eq!(
        run.records.iter().filter(|r| r.state == QueryState::Succeeded).count(),
        2
    );
    Ok(())
}

#[test]
fn cancelled_and_failed_terminal_states_are_passed_through() -> anyhow::Result<()> {
    let service = SimulatedService::with_script(|query| match query {
        "SELECT cancelled" => ScriptedOutcome::Complete(QueryState::Cancelled),
        "SELECT failed" => ScriptedOutcome::Complete(QueryState::Failed),
        _ => ScriptedOutcome::Complete(QueryState::Succeeded),
    });

    let run = run(
        &service,
        plan(&[], &["SELECT cancelled", "SELECT failed", "SELECT ok"], 1)?,
        &Interrupt::new(),
    )?;

    let states: HashSet<_> = run.records.iter().map(|r| (r.origin.as_str(), r.state)).collect();
    assert!(states.contains(&("pool[0]", QueryState::Cancelled)));
    assert!(states.contains(&("pool[1]", QueryState::Failed)));
    assert!(states.contains(&("pool[2]", QueryState::Succeeded)));
    Ok(())
}

#[test]
fn interrupted_setup_skips_the_load_phase() -> anyhow::Result<()> {
    init_tracing();
    let service = SimulatedService::with_script(hang_containing("CREATE"));
    let interrupt = Interrupt::new();
    interrupt.interrupt();

    let run = run(
        &service,
        plan(&["CREATE TABLE slow"], &["SELECT 1"], 4)?,
        &interrupt,
    )?;

    assert_eq!(run.summary.setup, PhaseOutcome::Interrupted);
    assert_eq!(run.summary.load, None);
    assert_eq!(run.summary.load_started, 0);
    assert_eq!(
        run.summary.transitions,
        vec![
            DriverState::Connecting,
            DriverState::Setup,
            DriverState::Error,
            DriverState::Closing,
            DriverState::Done,
        ]
    );
    assert_eq!(service.close_count(), 1);
    assert!(service.submitted().iter().all(|q| q.starts_with("CREATE")));

    service.release_hung();
    Ok(())
}

#[test]
fn interrupted_load_stops_waiting_and_closes() -> anyhow::Result<()> {
    let service = SimulatedService::with_script(hang_containing("slow"));
    let interrupt = Interrupt::new();
    let pool = ["SELECT slow", "SELECT fast"];
    let expected = 3 * pool.len();
    // The setup statement is submitted too
    let submissions = 1 + expected;

    let interrupter = {
        let service = service.clone();
        let interrupt = interrupt.clone();
        thread::spawn(move || {
            let submitted = eventually(Duration::from_secs(10), || {
                service.submitted().len() == submissions
            });
            interrupt.interrupt();
            submitted
        })
    };

    let run = run(&service, plan(&["CREATE TABLE t"], &pool, 3)?, &interrupt)?;
    assert!(interrupter.join().expect("Interrupter panicked"));

    assert_eq!(run.summary.setup, PhaseOutcome::Completed);
    assert_eq!(run.summary.load, Some(PhaseOutcome::Interrupted));
    assert_eq!(run.summary.load_started, expected);
    assert_eq!(
        run.summary.transitions,
        vec![
            DriverState::Connecting,
            DriverState::Setup,
            DriverState::Loading,
            DriverState::Error,
            DriverState::Closing,
            DriverState::Done,
        ]
    );
    assert_eq!(service.close_count(), 1);
    // Hung workers have not reported yet
    assert!(run.phase_records(Phase::Load).len() <= 3);

    service.release_hung();
    Ok(())
}

#[test]
fn refused_connection_is_an_error() -> anyhow::Result<()> {
    let service = SimulatedService::new().refusing_connections();

    let err = run(&service, plan(&["CREATE TABLE t"], &["SELECT 1"], 1)?, &Interrupt::new())
        .err()
        .expect("Run must fail without a connection");

    let err = err.downcast::<DriverError>()?;
    assert!(matches!(err, DriverError::Connect(_)));
    assert!(service.submitted().is_empty());
    assert_eq!(service.close_count(), 0);
    Ok(())
}
