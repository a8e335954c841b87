use anyhow::Result;
use client::simulated::SimulatedService;
use driver::{CompletionRecord, Interrupt, LoadDriver, LoadPlan, RunSummary};
use model::endpoint::ServiceAddr;
use model::query::{QueryPool, QueryRecord};
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

pub const SERVICE_ADDR: &str = "localhost:31010/drill/test";

pub fn plan(setup: &[&str], pool: &[&str], worker_threads: usize) -> Result<LoadPlan> {
    let worker_threads = NonZeroUsize::new(worker_threads)
        .ok_or_else(|| anyhow::anyhow!("worker_threads must not be zero"))?;
    Ok(LoadPlan::new(
        SERVICE_ADDR.parse::<ServiceAddr>()?,
        QueryRecord::from_texts("setup", setup.iter().copied()),
        worker_threads,
        QueryPool::new(QueryRecord::from_texts("pool", pool.iter().copied()))?,
    ))
}

pub struct Run {
    pub summary: RunSummary,
    /// Records in the order workers reported them.
    pub records: Vec<CompletionRecord>,
}

impl Run {
    pub fn phase_records(&self, phase: driver::Phase) -> Vec<&CompletionRecord> {
        self.records.iter().filter(|r| r.phase == phase).collect()
    }
}

/// Runs the driver to the end and collects every record reported so far.
pub fn run(service: &SimulatedService, plan: LoadPlan, interrupt: &Interrupt) -> Result<Run> {
    let (tx, rx) = flume::unbounded();
    let summary = LoadDriver::new(service.clone(), plan)
        .with_reporter(tx)
        .run(interrupt)?;
    Ok(Run {
        summary,
        records: rx.try_iter().collect(),
    })
}

/// Polls `condition` until it holds or `timeout` passes.
pub fn eventually(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    condition()
}
