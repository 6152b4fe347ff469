use std::fmt::Display;

use sqlx::SqlitePool;

use crate::policy::Policy;

pub mod sql;

/// Accepted policies, persisted across runs.
///
/// Rows are not unique per domain: concurrent writers may leave a duplicate
/// behind, which the next [`PolicyCache::store`] for that domain prunes.
#[derive(Debug, Clone)]
pub struct PolicyCache {
    pool: SqlitePool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub domain: String,
    pub tls_only: bool,
    pub record: String,
    pub expires: u64,
    pub observed_at: u64,
}

#[derive(Debug, Clone)]
pub struct CachedPolicy {
    pub entry: CacheEntry,
    pub policy: Policy,
}

#[derive(Debug)]
pub enum Error {
    Sql(sqlx::Error),
}

impl CacheEntry {
    pub fn new(policy: &Policy, record: &str) -> Self {
        CacheEntry {
            domain: policy.domain.clone(),
            tls_only: policy.tls_only,
            record: record.to_string(),
            expires: policy.expires_at(),
            observed_at: policy.observed_at,
        }
    }
}

impl CachedPolicy {
    pub fn is_expired(&self, now: u64) -> bool {
        self.entry.expires <= now
    }
}

impl From<sqlx::Error> for Error {
    fn from(value: sqlx::Error) -> Self {
        Error::Sql(value)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Sql(err) => write!(f, "Policy cache error: {}", err),
        }
    }
}
