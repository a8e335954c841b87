pub mod query_state;
pub mod result;

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Identifier the query service assigns to a submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryId(String);

impl QueryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for QueryId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl<'a> From<&'a str> for QueryId {
    fn from(id: &'a str) -> Self {
        Self(id.to_string())
    }
}

/// A query statement together with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRecord {
    text: String,
    origin: String,
}

impl QueryRecord {
    pub fn new(text: impl Into<String>, origin: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            origin: origin.into(),
        }
    }

    /// Labels each statement with its position, e.g. `setup[2]`.
    pub fn from_texts<I, S>(label: &str, texts: I) -> Vec<QueryRecord>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        texts
            .into_iter()
            .enumerate()
            .map(|(idx, text)| QueryRecord::new(text, format!("{label}[{idx}]")))
            .collect()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Query pool must contain at least one query")]
pub struct EmptyQueryPool;

/// Immutable, non-empty sequence of queries that load submissions cycle through.
#[derive(Debug, Clone)]
pub struct QueryPool {
    records: Arc<[QueryRecord]>,
}

impl QueryPool {
    pub fn new(records: Vec<QueryRecord>) -> Result<Self, EmptyQueryPool> {
        if records.is_empty() {
            return Err(EmptyQueryPool);
        }
        Ok(Self {
            records: records.into(),
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Pool index used by the `submission`-th submission.
    pub fn index_of(&self, submission: usize) -> usize {
        submission % self.records.len()
    }

    pub fn select(&self, submission: usize) -> &QueryRecord {
        &self.records[self.index_of(submission)]
    }

    /// The queries of the first `submissions` submissions, in start order.
    pub fn schedule(&self, submissions: usize) -> impl Iterator<Item = &QueryRecord> + '_ {
        (0..submissions).map(move |submission| self.select(submission))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn pool_of(texts: &[&str]) -> QueryPool {
        QueryPool::new(QueryRecord::from_texts("pool", texts.iter().copied()))
            .expect("Pool is not empty")
    }

    #[test]
    fn empty_pool_is_rejected() {
        assert_eq!(QueryPool::new(vec![]).unwrap_err(), EmptyQueryPool);
    }

    #[test]
    fn round_robin_wraps_around_pool() {
        let pool = pool_of(&["SELECT 1", "SELECT 2", "SELECT 3"]);
        let indices: Vec<usize> = (0..7).map(|i| pool.index_of(i)).collect();
        assert_eq!(indices, vec![0, 1, 2, 0, 1, 2, 0]);

        let texts: Vec<&str> = pool.schedule(4).map(QueryRecord::text).collect();
        assert_eq!(texts, vec!["SELECT 1", "SELECT 2", "SELECT 3", "SELECT 1"]);
    }

    #[test]
    fn records_are_labelled_with_their_position() {
        let records = QueryRecord::from_texts("setup", ["CREATE TABLE t", "INSERT INTO t"]);
        assert_eq!(records[0].origin(), "setup[0]");
        assert_eq!(records[1].origin(), "setup[1]");
        assert_eq!(records[1].text(), "INSERT INTO t");
    }

    proptest! {
        #[test]
        fn every_query_is_used_evenly_over_full_cycles(
            pool_size in 1..20usize,
            cycles in 1..10usize,
        ) {
            let texts: Vec<String> = (0..pool_size).map(|i| format!("SELECT {i}")).collect();
            let pool = QueryPool::new(QueryRecord::from_texts("pool", texts)).unwrap();

            let mut uses = vec![0usize; pool_size];
            for submission in 0..pool_size * cycles {
                uses[pool.index_of(submission)] += 1;
            }
            prop_assert!(uses.iter().all(|count| *count == cycles));
        }
    }
}
