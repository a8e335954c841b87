use crate::setup::run;
use client::simulated::SimulatedService;
use driver::{ConfigError, DriverConfig, Interrupt, PhaseOutcome};
use std::fs;
use std::path::PathBuf;

fn write_config(name: &str, content: &str) -> anyhow::Result<PathBuf> {
    let path = std::env::temp_dir().join(format!("load-driver-{}-{name}.toml", std::process::id()));
    fs::write(&path, content)?;
    Ok(path)
}

#[test]
fn run_from_config_file() -> anyhow::Result<()> {
    let path = write_config(
        "run",
        r#"
        service_address = "localhost:31010/drill/test"
        setup_queries = ["CREATE TABLE t AS SELECT 1"]
        worker_threads = 2
        query_pool = ["SELECT * FROM t", "SELECT count(*) FROM t"]
        pacing_delay_ms = 1
        error_excerpt_len = 10
        "#,
    )?;

    let plan = DriverConfig::from_file(&path)?.into_plan()?;
    fs::remove_file(&path)?;
    assert_eq!(plan.error_excerpt_len, 10);

    let service = SimulatedService::new();
    let run = run(&service, plan, &Interrupt::new())?;

    assert_eq!(run.summary.setup, PhaseOutcome::Completed);
    assert_eq!(run.summary.load, Some(PhaseOutcome::Completed));
    assert_eq!(run.summary.load_started, 4);
    assert_eq!(service.submitted().len(), 5);
    Ok(())
}

#[test]
fn malformed_config_file_is_rejected() -> anyhow::Result<()> {
    let path = write_config("malformed", "service_address = \"localhost:31010\"\nworker_threads = \n")?;
    let result = DriverConfig::from_file(&path);
    fs::remove_file(&path)?;

    assert!(matches!(result, Err(ConfigError::Parse(_))));
    Ok(())
}
