use crate::driver::LoadPlan;
use crate::report::DEFAULT_ERROR_EXCERPT_LEN;
use model::endpoint::{AddrParseError, ServiceAddr};
use model::query::{EmptyQueryPool, QueryPool, QueryRecord};
use serde::Deserialize;
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}'")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    InvalidAddress(#[from] AddrParseError),

    #[error(transparent)]
    EmptyQueryPool(#[from] EmptyQueryPool),

    #[error("worker_threads must be at least 1")]
    ZeroWorkerThreads,
}

fn default_error_excerpt_len() -> usize {
    DEFAULT_ERROR_EXCERPT_LEN
}

/// Startup configuration as written in a TOML file.
///
/// ```toml
/// service_address = "10.10.30.207:5181/drill/cluster"
/// setup_queries = ["CREATE TABLE t AS SELECT 1"]
/// worker_threads = 4
/// query_pool = ["SELECT * FROM t", "SELECT count(*) FROM t"]
/// pacing_delay_ms = 100
/// ```
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DriverConfig {
    pub service_address: String,
    #[serde(default)]
    pub setup_queries: Vec<String>,
    pub worker_threads: usize,
    pub query_pool: Vec<String>,
    #[serde(default)]
    pub pacing_delay_ms: u64,
    #[serde(default = "default_error_excerpt_len")]
    pub error_excerpt_len: usize,
}

impl DriverConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn into_plan(self) -> Result<LoadPlan, ConfigError> {
        let service_addr: ServiceAddr = self.service_address.parse()?;
        let worker_threads =
            NonZeroUsize::new(self.worker_threads).ok_or(ConfigError::ZeroWorkerThreads)?;
        let query_pool = QueryPool::new(QueryRecord::from_texts("pool", self.query_pool))?;

        Ok(LoadPlan::new(
            service_addr,
            QueryRecord::from_texts("setup", self.setup_queries),
            worker_threads,
            query_pool,
        )
        .with_pacing_delay(Duration::from_millis(self.pacing_delay_ms))
        .with_error_excerpt_len(self.error_excerpt_len))
    }
}
