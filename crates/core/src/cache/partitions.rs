//! Partition registry operations: open, list, delete.

use super::connection::CacheDb;
use crate::Error;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;

/// Size summary for one partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PartitionStats {
    pub name: String,
    pub entries: u64,
    pub body_bytes: u64,
}

impl CacheDb {
    /// Create the partition if it does not exist yet.
    pub async fn open_partition(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
                    params![name, chrono::Utc::now().to_rfc3339()],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    pub async fn has_partition(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists =
                    conn.query_row("SELECT EXISTS(SELECT 1 FROM partitions WHERE name = ?1)", params![name], |row| {
                        row.get(0)
                    })?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// All partition names, oldest first.
    pub async fn partition_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM partitions ORDER BY created_at, name")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a partition and every entry in it.
    ///
    /// Returns false if no partition had that name.
    pub async fn delete_partition(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM partitions WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every partition whose name is not in `keep`.
    ///
    /// Returns the deleted names.
    pub async fn delete_partitions_except(&self, keep: &[&str]) -> Result<Vec<String>, Error> {
        let keep: Vec<String> = keep.iter().map(|s| s.to_string()).collect();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let tx = conn.transaction()?;
                let stale: Vec<String> = {
                    let mut stmt = tx.prepare("SELECT name FROM partitions ORDER BY created_at, name")?;
                    stmt.query_map([], |row| row.get::<_, String>(0))?
                        .collect::<Result<Vec<_>, _>>()?
                        .into_iter()
                        .filter(|name| !keep.contains(name))
                        .collect()
                };
                for name in &stale {
                    tx.execute("DELETE FROM partitions WHERE name = ?1", params![name])?;
                }
                tx.commit()?;
                Ok(stale)
            })
            .await
            .map_err(Error::from)
    }

    /// Entry counts and stored body sizes for every partition.
    pub async fn partition_stats(&self) -> Result<Vec<PartitionStats>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<PartitionStats>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT p.name, COUNT(e.entry_key),
                            COALESCE(SUM(LENGTH(e.response_body)), 0) + COALESCE(SUM(LENGTH(e.request_body)), 0)
                     FROM partitions p LEFT JOIN entries e ON e.partition = p.name
                     GROUP BY p.name
                     ORDER BY p.created_at, p.name",
                )?;
                let stats = stmt
                    .query_map([], |row| {
                        Ok(PartitionStats {
                            name: row.get(0)?,
                            entries: row.get::<_, i64>(1)? as u64,
                            body_bytes: row.get::<_, i64>(2)? as u64,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(stats)
            })
            .await
            .map_err(Error::from)
    }
}
