//! # Counter Repository
//!
//! Named sequence counters with a single primitive: compare-and-swap.
//!
//! ## Why Not `UPDATE value = value + 1`?
//! The allocator must know which value *it* produced. A conditional write
//! that reports whether it won lets the caller retry with a fresh read
//! instead of trusting a value someone else may also have observed.
//!
//! ```text
//! expected = None     INSERT OR IGNORE (name, next)        won ⇔ 1 row
//! expected = Some(v)  UPDATE SET value = next
//!                     WHERE name = ? AND value = v          won ⇔ 1 row
//! ```

use sqlx::SqlitePool;
use tracing::trace;

use crate::error::DbResult;

#[derive(Debug, Clone)]
pub struct CounterRepository {
    pool: SqlitePool,
}

impl CounterRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CounterRepository { pool }
    }

    /// Current value, `None` if the counter was never written.
    pub async fn current(&self, name: &str) -> DbResult<Option<u64>> {
        let value: Option<i64> = sqlx::query_scalar("SELECT value FROM counters WHERE name = ?1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value.map(|v| v as u64))
    }

    /// Writes `next` only if the counter still holds `expected`.
    ///
    /// ## Returns
    /// `true` if this call performed the write.
    pub async fn compare_and_swap(
        &self,
        name: &str,
        expected: Option<u64>,
        next: u64,
    ) -> DbResult<bool> {
        let result = match expected {
            None => {
                sqlx::query("INSERT OR IGNORE INTO counters (name, value) VALUES (?1, ?2)")
                    .bind(name)
                    .bind(next as i64)
                    .execute(&self.pool)
                    .await?
            }
            Some(expected) => {
                sqlx::query("UPDATE counters SET value = ?3 WHERE name = ?1 AND value = ?2")
                    .bind(name)
                    .bind(expected as i64)
                    .bind(next as i64)
                    .execute(&self.pool)
                    .await?
            }
        };

        let won = result.rows_affected() == 1;
        trace!(counter = %name, ?expected, next, won, "Counter compare-and-swap");
        Ok(won)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_first_write_initializes() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let counters = db.counters();

        assert_eq!(counters.current("orderNumberCounter").await.unwrap(), None);
        assert!(counters.compare_and_swap("orderNumberCounter", None, 1).await.unwrap());
        assert_eq!(counters.current("orderNumberCounter").await.unwrap(), Some(1));
        // A second initializer loses.
        assert!(!counters.compare_and_swap("orderNumberCounter", None, 1).await.unwrap());
    }

    #[tokio::test]
    async fn test_stale_expected_value_loses() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let counters = db.counters();
        counters.compare_and_swap("c", None, 1).await.unwrap();

        assert!(counters.compare_and_swap("c", Some(1), 2).await.unwrap());
        assert!(!counters.compare_and_swap("c", Some(1), 2).await.unwrap());
        assert_eq!(counters.current("c").await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_counters_are_independent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let counters = db.counters();
        counters.compare_and_swap("a", None, 5).await.unwrap();

        assert_eq!(counters.current("b").await.unwrap(), None);
    }
}
