use std::path::{Path, PathBuf};

use rusqlite::{Connection, params};

use crate::error::HarvestError;
use crate::formats::IndexRecord;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS llms_index (
    url TEXT PRIMARY KEY,
    host TEXT NOT NULL,
    path TEXT NOT NULL,
    kind TEXT NOT NULL,
    source TEXT NOT NULL,
    crawl_id TEXT NOT NULL,
    fetch_status INTEGER,
    fetch_time TEXT,
    content_type TEXT,
    live_status INTEGER,
    live_checked_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_llms_host ON llms_index(host);
CREATE INDEX IF NOT EXISTS idx_llms_kind ON llms_index(kind);
";

const UPSERT: &str = "
INSERT INTO llms_index (
    url, host, path, kind, source, crawl_id,
    fetch_status, fetch_time, content_type,
    live_status, live_checked_at, created_at, updated_at
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
ON CONFLICT(url) DO UPDATE SET
    host = excluded.host,
    path = excluded.path,
    kind = excluded.kind,
    source = excluded.source,
    crawl_id = excluded.crawl_id,
    fetch_status = excluded.fetch_status,
    fetch_time = excluded.fetch_time,
    content_type = excluded.content_type,
    live_status = excluded.live_status,
    live_checked_at = excluded.live_checked_at,
    updated_at = excluded.updated_at
";

/// File-backed index of harvested records, keyed by URL. Writes are only
/// durable once `save` has run.
#[derive(Debug)]
pub struct IndexStore {
    conn: Connection,
    path: PathBuf,
}

impl IndexStore {
    /// Open (or create) the store and ensure its schema exists.
    pub fn open(path: &Path) -> Result<Self, HarvestError> {
        let conn = Connection::open(path).map_err(|err| HarvestError::store(path, err))?;
        conn.execute_batch(SCHEMA)
            .map_err(|err| HarvestError::store(path, err))?;
        Ok(Self {
            conn,
            path: path.to_owned(),
        })
    }

    /// Insert a record, or overwrite every non-key column on URL conflict.
    /// `created_at` keeps its original value across overwrites.
    pub fn upsert(&mut self, record: &IndexRecord) -> Result<(), HarvestError> {
        Self::upsert_in(&self.conn, &self.path, record)
    }

    /// Upsert a batch inside one transaction.
    pub fn upsert_all(&mut self, records: &[IndexRecord]) -> Result<(), HarvestError> {
        let path = self.path.clone();
        let tx = self
            .conn
            .transaction()
            .map_err(|err| HarvestError::store(&path, err))?;
        for record in records {
            Self::upsert_in(&tx, &path, record)?;
        }
        tx.commit().map_err(|err| HarvestError::store(&path, err))
    }

    fn upsert_in(
        conn: &Connection,
        path: &Path,
        record: &IndexRecord,
    ) -> Result<(), HarvestError> {
        conn.execute(
            UPSERT,
            params![
                record.url,
                record.host,
                record.path,
                record.kind.as_str(),
                record.source,
                record.crawl_id,
                record.fetch_status,
                record.fetch_time,
                record.content_type,
                record.live_status,
                record.live_checked_at,
                record.created_at,
                record.updated_at,
            ],
        )
        .map(|_| ())
        .map_err(|err| HarvestError::store(path, err))
    }

    pub fn count(&self) -> Result<usize, HarvestError> {
        self.conn
            .query_row("SELECT COUNT(*) FROM llms_index", [], |row| {
                row.get::<_, i64>(0)
            })
            .map(|count| count as usize)
            .map_err(|err| HarvestError::store(&self.path, err))
    }

    /// Flush and release the store. Must run before process exit; the file on
    /// disk is not guaranteed complete until it has.
    pub fn save(self) -> Result<(), HarvestError> {
        let path = self.path;
        self.conn
            .close()
            .map_err(|(_conn, err)| HarvestError::store(&path, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::CandidateKind;

    fn record(url: &str, updated_at: &str) -> IndexRecord {
        IndexRecord {
            url: url.to_owned(),
            host: "example.com".to_owned(),
            path: "/llms.txt".to_owned(),
            kind: CandidateKind::Llms,
            source: "commoncrawl".to_owned(),
            crawl_id: "CC-TEST-2024".to_owned(),
            fetch_status: Some(200),
            fetch_time: Some("2024-01-01T00:00:00Z".to_owned()),
            content_type: Some("text/plain".to_owned()),
            live_status: Some(200),
            live_checked_at: Some(updated_at.to_owned()),
            created_at: updated_at.to_owned(),
            updated_at: updated_at.to_owned(),
        }
    }

    fn read_row(path: &Path, url: &str) -> (String, String) {
        let conn = Connection::open(path).expect("reopen store");
        conn.query_row(
            "SELECT created_at, updated_at FROM llms_index WHERE url = ?1",
            [url],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .expect("row exists")
    }

    #[test]
    fn upsert_is_idempotent_and_bumps_updated_at() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let db_path = dir.path().join("llms-index.sqlite");

        let mut store = IndexStore::open(&db_path)?;
        store.upsert(&record("https://example.com/llms.txt", "2024-01-01T00:00:00Z"))?;

        let mut second = record("https://example.com/llms.txt", "2024-02-02T00:00:00Z");
        second.created_at = "2024-02-02T00:00:00Z".to_owned();
        store.upsert(&second)?;

        assert_eq!(store.count()?, 1);
        store.save()?;

        let (created_at, updated_at) = read_row(&db_path, "https://example.com/llms.txt");
        assert_eq!(created_at, "2024-01-01T00:00:00Z");
        assert_eq!(updated_at, "2024-02-02T00:00:00Z");
        Ok(())
    }

    #[test]
    fn upsert_all_writes_every_record_once() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let db_path = dir.path().join("llms-index.sqlite");

        let records = vec![
            record("https://a.example/llms.txt", "2024-01-01T00:00:00Z"),
            record("https://b.example/llms-full.txt", "2024-01-01T00:00:00Z"),
        ];

        let mut store = IndexStore::open(&db_path)?;
        store.upsert_all(&records)?;
        assert_eq!(store.count()?, 2);
        store.save()?;

        // A second run with the same records keeps the store at two rows.
        let mut store = IndexStore::open(&db_path)?;
        store.upsert_all(&records)?;
        assert_eq!(store.count()?, 2);
        store.save()?;
        Ok(())
    }

    #[test]
    fn unwritable_path_fails_with_store_error() {
        let err = IndexStore::open(Path::new("/definitely/missing/dir/llms-index.sqlite"))
            .expect_err("open must fail");
        assert!(matches!(err, HarvestError::Store { .. }));
    }
}
