//! Generation and entry operations on the SQLite store.
//!
//! A generation row owns its entries; deleting the generation removes
//! them in the same transaction.

use super::connection::CacheDb;
use super::key::RequestKey;
use crate::Error;
use crate::http::Response;
use tokio_rusqlite::rusqlite::{self, OptionalExtension, Transaction};
use tokio_rusqlite::params;

/// A stored entry paired with its identity, as written by a batch.
pub type Entry = (RequestKey, Response);

fn ensure_generation(tx: &Transaction<'_>, generation: &str) -> Result<(), rusqlite::Error> {
    tx.execute(
        "INSERT OR IGNORE INTO generations (name, created_at) VALUES (?1, ?2)",
        params![generation, chrono::Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

fn upsert_entry(tx: &Transaction<'_>, generation: &str, key: &RequestKey, response: &Response) -> Result<(), Error> {
    let headers_json =
        serde_json::to_string(&response.headers).map_err(|e| Error::CorruptEntry(format!("headers: {e}")))?;
    tx.execute(
        "INSERT INTO entries (generation, key_hash, method, url, status, headers_json, body, stored_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(generation, key_hash) DO UPDATE SET
            status = excluded.status,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            generation,
            key.digest(),
            &key.method,
            &key.url,
            response.status,
            headers_json,
            response.body.as_ref(),
            chrono::Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

impl CacheDb {
    /// Create the generation if it does not exist yet.
    pub async fn open_generation(&self, generation: &str) -> Result<(), Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                ensure_generation(&tx, &generation)?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Store `response` under `key`, overwriting any previous entry.
    pub async fn put_entry(&self, generation: &str, key: &RequestKey, response: &Response) -> Result<(), Error> {
        self.put_entries(generation, vec![(key.clone(), response.clone())]).await
    }

    /// Store every entry in one transaction; either all land or none do.
    pub async fn put_entries(&self, generation: &str, entries: Vec<Entry>) -> Result<(), Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                ensure_generation(&tx, &generation)?;
                for (key, response) in &entries {
                    upsert_entry(&tx, &generation, key, response)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up the entry stored under `key` in `generation`.
    pub async fn get_entry(&self, generation: &str, key: &RequestKey) -> Result<Option<Response>, Error> {
        let generation = generation.to_string();
        let key_hash = key.digest();
        self.conn
            .call(move |conn| -> Result<Option<Response>, Error> {
                let row = conn
                    .query_row(
                        "SELECT status, headers_json, body FROM entries WHERE generation = ?1 AND key_hash = ?2",
                        params![generation, key_hash],
                        |row| Ok((row.get::<_, u16>(0)?, row.get::<_, String>(1)?, row.get::<_, Vec<u8>>(2)?)),
                    )
                    .optional()?;

                let Some((status, headers_json, body)) = row else {
                    return Ok(None);
                };
                let headers: Vec<(String, String)> = serde_json::from_str(&headers_json)
                    .map_err(|e| Error::CorruptEntry(format!("headers: {e}")))?;

                Ok(Some(Response::new(status, headers, body)))
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a generation and all of its entries.
    ///
    /// Returns whether the generation existed.
    pub async fn delete_generation(&self, generation: &str) -> Result<bool, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM entries WHERE generation = ?1", params![&generation])?;
                let deleted = tx.execute("DELETE FROM generations WHERE name = ?1", params![&generation])?;
                tx.commit()?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Names of all generations, oldest first.
    pub async fn generation_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM generations ORDER BY created_at ASC, rowid ASC")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries stored in `generation`.
    pub async fn count_entries(&self, generation: &str) -> Result<u64, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE generation = ?1", params![generation], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
