//! Entry CRUD operations.
//!
//! An entry is a stored request (method, URL, headers, body) plus the response
//! it produced. Queued submissions are stored without a response.

use super::connection::CacheDb;
use super::hash::compute_entry_key;
use crate::Error;
use crate::http::{Method, Request, Response};
use chrono::{DateTime, SecondsFormat, Utc};
use tokio_rusqlite::{params, rusqlite};
use url::Url;

type Headers = Vec<(String, String)>;

const ENTRY_COLUMNS: &str = "partition, method, url, request_headers_json, request_body,
     status, response_headers_json, response_body, cached_at, last_accessed";

/// A cache entry read back from a partition.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEntry {
    pub partition: String,
    pub request: Request,
    pub response: Option<Response>,
    pub cached_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
}

impl StoredEntry {
    /// Age of the entry at `now`.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.cached_at
    }
}

/// Raw column values, converted outside the SQLite thread.
struct EntryRow {
    partition: String,
    method: String,
    url: String,
    request_headers_json: String,
    request_body: Option<Vec<u8>>,
    status: Option<i64>,
    response_headers_json: Option<String>,
    response_body: Option<Vec<u8>>,
    cached_at: String,
    last_accessed: String,
}

impl EntryRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            partition: row.get(0)?,
            method: row.get(1)?,
            url: row.get(2)?,
            request_headers_json: row.get(3)?,
            request_body: row.get(4)?,
            status: row.get(5)?,
            response_headers_json: row.get(6)?,
            response_body: row.get(7)?,
            cached_at: row.get(8)?,
            last_accessed: row.get(9)?,
        })
    }

    fn into_entry(self) -> Result<StoredEntry, Error> {
        let method: Method = self.method.parse()?;
        let url = Url::parse(&self.url).map_err(|e| Error::CorruptEntry(format!("{}: {e}", self.url)))?;
        let request = Request {
            method,
            url,
            destination: Default::default(),
            headers: serde_json::from_str::<Headers>(&self.request_headers_json)?,
            body: self.request_body.map(Into::into),
        };

        let response = match self.status {
            Some(status) => Some(Response {
                status: u16::try_from(status).map_err(|_| Error::CorruptEntry(format!("status {status}")))?,
                headers: match self.response_headers_json {
                    Some(json) => serde_json::from_str::<Headers>(&json)?,
                    None => Vec::new(),
                },
                body: self.response_body.unwrap_or_default().into(),
            }),
            None => None,
        };

        Ok(StoredEntry {
            partition: self.partition,
            request,
            response,
            cached_at: parse_time(&self.cached_at)?,
            last_accessed: parse_time(&self.last_accessed)?,
        })
    }
}

fn parse_time(s: &str) -> Result<DateTime<Utc>, Error> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::CorruptEntry(format!("timestamp {s}: {e}")))
}

fn now_string() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl CacheDb {
    /// Store a request and its response, replacing any entry with the same
    /// method and URL. Opens the partition if needed.
    ///
    /// Pass `None` as the response to queue a request for later replay.
    pub async fn put_entry(&self, partition: &str, request: &Request, response: Option<&Response>) -> Result<(), Error> {
        let partition = partition.to_string();
        let key = compute_entry_key(request.method, request.url.as_str());
        let method = request.method.as_str();
        let url = request.url.to_string();
        let request_headers_json = serde_json::to_string(&request.headers)?;
        let request_body = request.body.as_ref().map(|b| b.to_vec());
        let status = response.map(|r| r.status as i64);
        let response_headers_json = response.map(|r| serde_json::to_string(&r.headers)).transpose()?;
        let response_body = response.map(|r| r.body.to_vec());
        let now = now_string();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
                    params![partition, now],
                )?;
                tx.execute(
                    "INSERT INTO entries (
                        partition, entry_key, method, url, request_headers_json, request_body,
                        status, response_headers_json, response_body, cached_at, last_accessed
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
                    ON CONFLICT(partition, entry_key) DO UPDATE SET
                        request_headers_json = excluded.request_headers_json,
                        request_body = excluded.request_body,
                        status = excluded.status,
                        response_headers_json = excluded.response_headers_json,
                        response_body = excluded.response_body,
                        cached_at = excluded.cached_at,
                        last_accessed = excluded.last_accessed",
                    params![
                        partition,
                        key,
                        method,
                        url,
                        request_headers_json,
                        request_body,
                        status,
                        response_headers_json,
                        response_body,
                        now,
                    ],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Read an entry without touching its access time.
    pub async fn get_entry(&self, partition: &str, method: Method, url: &Url) -> Result<Option<StoredEntry>, Error> {
        self.select_entry(partition, method, url, false).await
    }

    /// Read an entry for serving, marking it as recently used.
    pub async fn match_entry(&self, partition: &str, method: Method, url: &Url) -> Result<Option<StoredEntry>, Error> {
        self.select_entry(partition, method, url, true).await
    }

    async fn select_entry(
        &self, partition: &str, method: Method, url: &Url, touch: bool,
    ) -> Result<Option<StoredEntry>, Error> {
        let partition = partition.to_string();
        let key = compute_entry_key(method, url.as_str());
        let now = now_string();

        let row = self
            .conn
            .call(move |conn| -> Result<Option<EntryRow>, Error> {
                if touch {
                    conn.execute(
                        "UPDATE entries SET last_accessed = ?3 WHERE partition = ?1 AND entry_key = ?2",
                        params![partition, key, now],
                    )?;
                }
                let sql = format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE partition = ?1 AND entry_key = ?2");
                let result = conn.query_row(&sql, params![partition, key], EntryRow::from_row);

                match result {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        row.map(EntryRow::into_entry).transpose()
    }

    /// Delete one entry. Returns false if it was not present.
    pub async fn delete_entry(&self, partition: &str, method: Method, url: &Url) -> Result<bool, Error> {
        let partition = partition.to_string();
        let key = compute_entry_key(method, url.as_str());
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute(
                    "DELETE FROM entries WHERE partition = ?1 AND entry_key = ?2",
                    params![partition, key],
                )?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// All entries in a partition stored with the given method, oldest first.
    pub async fn entries_with_method(&self, partition: &str, method: Method) -> Result<Vec<StoredEntry>, Error> {
        let partition = partition.to_string();
        let method = method.as_str();
        let rows = self
            .conn
            .call(move |conn| -> Result<Vec<EntryRow>, Error> {
                let sql = format!(
                    "SELECT {ENTRY_COLUMNS} FROM entries WHERE partition = ?1 AND method = ?2 ORDER BY cached_at, rowid"
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params![partition, method], EntryRow::from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)?;

        rows.into_iter().map(EntryRow::into_entry).collect()
    }

    /// Number of entries in a partition.
    pub async fn count_entries(&self, partition: &str) -> Result<u64, Error> {
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE partition = ?1", params![partition], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Evict least recently used responses until the partition holds at most
    /// `max_entries` of them.
    ///
    /// Queued submissions (entries without a response) are neither counted
    /// nor evicted; only a replay removes them.
    ///
    /// Returns the number of deleted entries.
    pub async fn trim_partition(&self, partition: &str, max_entries: usize) -> Result<u64, Error> {
        let partition = partition.to_string();
        let max = i64::try_from(max_entries).unwrap_or(i64::MAX);
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM entries WHERE partition = ?1 AND status IS NOT NULL",
                    params![partition],
                    |row| row.get(0),
                )?;
                if count <= max {
                    return Ok(0);
                }

                let deleted = conn.execute(
                    "DELETE FROM entries WHERE rowid IN (
                        SELECT rowid FROM entries WHERE partition = ?1 AND status IS NOT NULL
                        ORDER BY last_accessed ASC, rowid ASC LIMIT ?2
                    )",
                    params![partition, count - max],
                )?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete responses cached before `cutoff`. Queued submissions are kept.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_entries_before(&self, partition: &str, cutoff: DateTime<Utc>) -> Result<u64, Error> {
        let partition = partition.to_string();
        let cutoff = cutoff.to_rfc3339_opts(SecondsFormat::Micros, true);
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let deleted = conn.execute(
                    "DELETE FROM entries WHERE partition = ?1 AND cached_at < ?2 AND status IS NOT NULL",
                    params![partition, cutoff],
                )?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }
}
