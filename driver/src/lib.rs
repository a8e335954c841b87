pub mod config;
pub mod counter;
pub mod driver;
pub mod interrupt;
pub mod listener;
pub mod phase;
pub mod report;
pub mod worker;

pub use config::{ConfigError, DriverConfig};
pub use driver::{DriverError, DriverState, LoadDriver, LoadPlan, RunSummary};
pub use interrupt::{Interrupt, Interrupted};
pub use phase::{Phase, PhaseOutcome};
pub use report::{CompletionRecord, CompletionReporter, LogReporter, StdoutReporter};
