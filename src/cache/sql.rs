use std::{str::FromStr, time::Duration};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::policy::Policy;

use super::{CacheEntry, CachedPolicy, Error, PolicyCache};

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS sts_cache (domain TEXT, tls_only TEXT, sts_record TEXT, expires INTEGER)";
const SELECT_ENTRY: &str = "SELECT domain, tls_only, sts_record, expires FROM sts_cache WHERE domain = ? ORDER BY rowid DESC LIMIT 1";
const INSERT_ENTRY: &str =
    "INSERT INTO sts_cache (domain, tls_only, sts_record, expires) VALUES (?, ?, ?, ?)";
const PRUNE_ENTRIES: &str =
    "DELETE FROM sts_cache WHERE domain = ? AND (expires < ? OR rowid < ?)";

impl PolicyCache {
    /// Opens the record store at `location`, which is either a file path or
    /// an `sqlite:` connection URL, and makes sure the cache table exists.
    pub async fn open(location: &str) -> Result<Self, Error> {
        let options = (if location.starts_with("sqlite:") {
            SqliteConnectOptions::from_str(location)?
        } else {
            SqliteConnectOptions::new().filename(location)
        })
        .create_if_missing(true)
        .busy_timeout(Duration::from_secs(5));

        // A single connection keeps in-memory stores alive for the whole run
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|err| {
                tracing::warn!(context = "sql", event = "error", location = location, reason = ?err);
                err
            })?;

        let cache = PolicyCache { pool };
        cache.initialize().await?;
        Ok(cache)
    }

    pub async fn initialize(&self) -> Result<(), Error> {
        sqlx::query(CREATE_TABLE)
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|err| {
                tracing::warn!(context = "sql", event = "error", query = CREATE_TABLE, reason = ?err);
                err.into()
            })
    }

    /// Returns the newest entry stored for `domain`. Entries whose record no
    /// longer parses are reported as absent; expiry is left to the caller.
    pub async fn lookup(&self, domain: &str) -> Result<Option<CachedPolicy>, Error> {
        let row = sqlx::query_as::<_, (String, String, String, i64)>(SELECT_ENTRY)
            .bind(domain)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| {
                tracing::warn!(context = "sql", event = "error", query = SELECT_ENTRY, reason = ?err);
                err
            })?;

        let Some((domain, tls_only, record, expires)) = row else {
            return Ok(None);
        };
        let expires = u64::try_from(expires).unwrap_or(0);

        // The max age comes from the record, the observation time is derived
        let policy = match Policy::parse_at(&domain, &record, 0) {
            Ok(policy) => Policy {
                observed_at: expires.saturating_sub(policy.max_age),
                ..policy
            },
            Err(err) => {
                tracing::warn!(
                    context = "sts",
                    event = "invalid-cache-entry",
                    domain = domain,
                    reason = %err
                );
                return Ok(None);
            }
        };

        Ok(Some(CachedPolicy {
            entry: CacheEntry {
                domain,
                tls_only: tls_only == "true",
                record,
                expires,
                observed_at: policy.observed_at,
            },
            policy,
        }))
    }

    pub async fn store(&self, entry: &CacheEntry) -> Result<(), Error> {
        let mut tx = self.pool.begin().await?;

        let rowid = sqlx::query(INSERT_ENTRY)
            .bind(&entry.domain)
            .bind(if entry.tls_only { "true" } else { "false" })
            .bind(&entry.record)
            .bind(i64::try_from(entry.expires).unwrap_or(i64::MAX))
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

        sqlx::query(PRUNE_ENTRIES)
            .bind(&entry.domain)
            .bind(i64::try_from(entry.observed_at).unwrap_or(i64::MAX))
            .bind(rowid)
            .execute(&mut *tx)
            .await?;

        tx.commit().await.map_err(|err| {
            tracing::warn!(context = "sql", event = "error", domain = entry.domain, reason = ?err);
            err.into()
        })
    }

    pub async fn close(self) {
        self.pool.close().await;
    }

    #[cfg(test)]
    pub(crate) async fn count(&self, domain: &str) -> i64 {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM sts_cache WHERE domain = ?")
            .bind(domain)
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    #[cfg(test)]
    pub(crate) async fn execute_raw(&self, query: &str) {
        sqlx::query(query).execute(&self.pool).await.unwrap();
    }

    #[cfg(test)]
    pub(crate) async fn insert_raw(&self, domain: &str, record: &str, expires: i64) {
        sqlx::query(INSERT_ENTRY)
            .bind(domain)
            .bind("false")
            .bind(record)
            .bind(expires)
            .execute(&self.pool)
            .await
            .unwrap();
    }
}
