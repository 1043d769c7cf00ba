use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use rusqlite::{params, Connection, OptionalExtension, Row};
use rusqlite_migration::{Migrations, M};

use crate::app::{Result, StoryError};
use crate::domain::Story;
use crate::store::{Collection, Store};

/// Schema version the store migrates to on open. One step per migration.
pub const SCHEMA_VERSION: usize = 2;

/// Handles already opened in this process, keyed by canonical database path.
///
/// A handle is created on the first `open` of a path and lives until
/// [`SqliteStore::release`] or process exit.
static OPEN_STORES: Lazy<Mutex<HashMap<PathBuf, Arc<SqliteStore>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open-or-create the database at `path`, reusing the live handle if this
    /// process already opened it.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Arc<Self>> {
        let path = path.as_ref();
        let mut stores = OPEN_STORES
            .lock()
            .map_err(|e| StoryError::StorageUnavailable(e.to_string()))?;

        if let Some(key) = Self::registry_key(path) {
            if let Some(store) = stores.get(&key) {
                tracing::debug!("Reusing open store for {}", key.display());
                return Ok(store.clone());
            }
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoryError::StorageUnavailable(e.to_string()))?;
        }

        let store = Arc::new(Self::new(path)?);
        let key = Self::registry_key(path).unwrap_or_else(|| path.to_path_buf());
        stores.insert(key, store.clone());
        Ok(store)
    }

    /// Drop the process-wide handle for `path`. Existing clones stay usable.
    pub fn release<P: AsRef<Path>>(path: P) -> bool {
        let Some(key) = Self::registry_key(path.as_ref()) else {
            return false;
        };
        match OPEN_STORES.lock() {
            Ok(mut stores) => stores.remove(&key).is_some(),
            Err(_) => false,
        }
    }

    /// Open an unshared connection. Prefer [`SqliteStore::open`].
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .map_err(|e| StoryError::StorageUnavailable(e.to_string()))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoryError::StorageUnavailable(e.to_string()))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn migrations() -> Migrations<'static> {
        Migrations::new(vec![
            M::up(include_str!("../../migrations/001-stories/up.sql")),
            M::up(include_str!("../../migrations/002-bookmarks/up.sql")),
        ])
    }

    fn run_migrations(&self) -> Result<()> {
        let mut conn = self.conn()?;
        let before = Self::user_version(&conn)?;

        Self::migrations()
            .to_latest(&mut conn)
            .map_err(|e| StoryError::StorageUnavailable(format!("migration failed: {}", e)))?;

        if before < SCHEMA_VERSION {
            tracing::info!(
                "Upgraded local database schema from v{} to v{}",
                before,
                SCHEMA_VERSION
            );
        }
        Ok(())
    }

    /// Current on-disk schema version.
    pub fn schema_version(&self) -> Result<usize> {
        let conn = self.conn()?;
        Self::user_version(&conn)
    }

    fn user_version(conn: &Connection) -> Result<usize> {
        let version: i64 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .map_err(|e| StoryError::StorageUnavailable(e.to_string()))?;
        Ok(version.max(0) as usize)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StoryError::StorageUnavailable(format!("database lock poisoned: {}", e)))
    }

    fn registry_key(path: &Path) -> Option<PathBuf> {
        path.canonicalize().ok()
    }

    fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| s.parse::<DateTime<Utc>>().ok())
    }

    fn story_from_row(row: &Row<'_>) -> rusqlite::Result<Story> {
        Ok(Story {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            photo_url: row.get(3)?,
            created_at: row
                .get::<_, String>(4)
                .ok()
                .and_then(|s| Self::parse_datetime(&s))
                .unwrap_or_else(Utc::now),
            lat: row.get(5)?,
            lon: row.get(6)?,
        })
    }

    fn upsert_sql(collection: Collection) -> String {
        format!(
            "INSERT INTO {} (id, name, description, photo_url, created_at, lat, lon)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                photo_url = excluded.photo_url,
                created_at = excluded.created_at,
                lat = excluded.lat,
                lon = excluded.lon",
            collection.table()
        )
    }

    fn upsert(conn: &Connection, collection: Collection, story: &Story) -> Result<()> {
        conn.execute(
            &Self::upsert_sql(collection),
            params![
                story.id,
                story.name,
                story.description,
                story.photo_url,
                story.created_at.to_rfc3339(),
                story.lat,
                story.lon
            ],
        )?;
        Ok(())
    }
}

impl Store for SqliteStore {
    fn get(&self, collection: Collection, id: &str) -> Result<Option<Story>> {
        let conn = self.conn()?;

        let result = conn
            .query_row(
                &format!(
                    "SELECT id, name, description, photo_url, created_at, lat, lon
                     FROM {} WHERE id = ?1",
                    collection.table()
                ),
                params![id],
                Self::story_from_row,
            )
            .optional()?;

        Ok(result)
    }

    fn get_all(&self, collection: Collection) -> Result<Vec<Story>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT id, name, description, photo_url, created_at, lat, lon FROM {}",
            collection.table()
        ))?;

        let stories = stmt
            .query_map([], Self::story_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(stories)
    }

    fn put(&self, collection: Collection, story: &Story) -> Result<()> {
        story.validate()?;
        let conn = self.conn()?;
        Self::upsert(&conn, collection, story)
    }

    fn put_many(&self, collection: Collection, stories: &[Story]) -> Result<usize> {
        for story in stories {
            story.validate()?;
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        for story in stories {
            Self::upsert(&tx, collection, story)?;
        }
        tx.commit()?;

        tracing::debug!("Upserted {} records into {}", stories.len(), collection);
        Ok(stories.len())
    }

    fn delete(&self, collection: Collection, id: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1", collection.table()),
            params![id],
        )?;
        Ok(())
    }

    fn clear(&self, collection: Collection) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(&format!("DELETE FROM {}", collection.table()), [])?;
        Ok(())
    }

    fn clear_all(&self) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        for collection in Collection::ALL {
            tx.execute(&format!("DELETE FROM {}", collection.table()), [])?;
        }
        tx.commit()?;
        Ok(())
    }

    fn count(&self, collection: Collection) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", collection.table()),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn story(id: &str) -> Story {
        Story::new(id, "Dimas", "A walk by the river", "https://example.com/p.png")
    }

    #[test]
    fn test_put_and_get_round_trip() {
        let store = SqliteStore::in_memory().unwrap();
        let s = story("s1").with_location(-7.12, 110.4225);
        store.put(Collection::Stories, &s).unwrap();

        let retrieved = store.get(Collection::Stories, "s1").unwrap().unwrap();
        assert_eq!(retrieved, s);
    }

    #[test]
    fn test_get_missing_is_none() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.get(Collection::Stories, "nope").unwrap().is_none());
        assert!(store.get(Collection::Bookmarks, "nope").unwrap().is_none());
    }

    #[test]
    fn test_put_twice_keeps_one_record_with_latest_fields() {
        let store = SqliteStore::in_memory().unwrap();
        store.put(Collection::Stories, &story("s1")).unwrap();

        let mut updated = story("s1");
        updated.description = "Edited".into();
        updated.lat = Some(1.5);
        updated.lon = Some(2.5);
        store.put(Collection::Stories, &updated).unwrap();

        let all = store.get_all(Collection::Stories).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0], updated);
    }

    #[test]
    fn test_put_overwrites_without_merging() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .put(Collection::Stories, &story("s1").with_location(1.0, 2.0))
            .unwrap();
        store.put(Collection::Stories, &story("s1")).unwrap();

        let retrieved = store.get(Collection::Stories, "s1").unwrap().unwrap();
        assert_eq!(retrieved.location(), None);
    }

    #[test]
    fn test_put_many_upserts_alongside_existing() {
        let store = SqliteStore::in_memory().unwrap();
        store.put(Collection::Stories, &story("s1")).unwrap();

        let count = store
            .put_many(Collection::Stories, &[story("s2"), story("s3")])
            .unwrap();
        assert_eq!(count, 2);

        let mut ids: Vec<String> = store
            .get_all(Collection::Stories)
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["s1", "s2", "s3"]);
    }

    #[test]
    fn test_put_many_rejects_whole_batch_on_invalid_record() {
        let store = SqliteStore::in_memory().unwrap();
        let result = store.put_many(Collection::Stories, &[story("s1"), story("")]);
        assert!(matches!(result, Err(StoryError::InvalidRecord(_))));
        assert_eq!(store.count(Collection::Stories).unwrap(), 0);
    }

    #[test]
    fn test_put_rejects_empty_id() {
        let store = SqliteStore::in_memory().unwrap();
        let result = store.put(Collection::Bookmarks, &story(""));
        assert!(matches!(result, Err(StoryError::InvalidRecord(_))));
    }

    #[test]
    fn test_put_rejects_nan_coordinate() {
        let store = SqliteStore::in_memory().unwrap();
        let result = store.put(Collection::Stories, &story("s1").with_location(f64::NAN, 106.8));
        assert!(matches!(result, Err(StoryError::InvalidRecord(_))));
        assert_eq!(store.get(Collection::Stories, "s1").unwrap(), None);
    }

    #[test]
    fn test_delete_missing_is_noop() {
        let store = SqliteStore::in_memory().unwrap();
        store.delete(Collection::Stories, "ghost").unwrap();

        store.put(Collection::Stories, &story("s1")).unwrap();
        store.delete(Collection::Stories, "s1").unwrap();
        store.delete(Collection::Stories, "s1").unwrap();
        assert!(store.get(Collection::Stories, "s1").unwrap().is_none());
    }

    #[test]
    fn test_clear_only_touches_one_collection() {
        let store = SqliteStore::in_memory().unwrap();
        let s = story("s1");
        store.put(Collection::Stories, &s).unwrap();
        store.put(Collection::Bookmarks, &s).unwrap();

        store.clear(Collection::Stories).unwrap();

        assert_eq!(store.count(Collection::Stories).unwrap(), 0);
        assert_eq!(store.get_all(Collection::Bookmarks).unwrap(), vec![s]);
    }

    #[test]
    fn test_deleting_story_keeps_bookmark() {
        let store = SqliteStore::in_memory().unwrap();
        let s = story("s1");
        store.put(Collection::Stories, &s).unwrap();
        store.put(Collection::Bookmarks, &s).unwrap();

        store.delete(Collection::Stories, "s1").unwrap();
        assert_eq!(store.get(Collection::Bookmarks, "s1").unwrap(), Some(s));
    }

    #[test]
    fn test_clear_all_empties_both_collections() {
        let store = SqliteStore::in_memory().unwrap();
        store.put(Collection::Stories, &story("s1")).unwrap();
        store.put(Collection::Bookmarks, &story("s2")).unwrap();

        store.clear_all().unwrap();

        assert_eq!(store.count(Collection::Stories).unwrap(), 0);
        assert_eq!(store.count(Collection::Bookmarks).unwrap(), 0);
    }

    #[test]
    fn test_schema_version_is_latest() {
        let store = SqliteStore::in_memory().unwrap();
        assert_eq!(store.schema_version().unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_upgrade_adds_bookmarks_and_keeps_stories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stories.db");

        {
            let mut conn = Connection::open(&path).unwrap();
            Migrations::new(vec![M::up(include_str!(
                "../../migrations/001-stories/up.sql"
            ))])
            .to_latest(&mut conn)
            .unwrap();
            conn.execute(
                "INSERT INTO stories (id, name, description, photo_url, created_at)
                 VALUES ('old', 'A', 'kept', 'https://example.com/p.png', '2024-01-01T00:00:00+00:00')",
                [],
            )
            .unwrap();
        }

        let store = SqliteStore::new(&path).unwrap();
        assert_eq!(store.schema_version().unwrap(), SCHEMA_VERSION);

        let old = store.get(Collection::Stories, "old").unwrap().unwrap();
        assert_eq!(old.description, "kept");

        store.put(Collection::Bookmarks, &story("b1")).unwrap();
        assert_eq!(store.count(Collection::Bookmarks).unwrap(), 1);
    }

    #[test]
    fn test_reopen_preserves_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stories.db");

        {
            let store = SqliteStore::new(&path).unwrap();
            store.put(Collection::Bookmarks, &story("b1")).unwrap();
        }

        let store = SqliteStore::new(&path).unwrap();
        assert!(store.get(Collection::Bookmarks, "b1").unwrap().is_some());
    }

    #[test]
    fn test_newer_on_disk_schema_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("future.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch("PRAGMA user_version = 99;").unwrap();
        }

        let result = SqliteStore::new(&path);
        assert!(matches!(result, Err(StoryError::StorageUnavailable(_))));
    }

    #[test]
    fn test_open_returns_same_handle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("shared.db");

        let first = SqliteStore::open(&path).unwrap();
        let second = SqliteStore::open(&path).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        first.put(Collection::Stories, &story("s1")).unwrap();
        assert!(second.get(Collection::Stories, "s1").unwrap().is_some());

        assert!(SqliteStore::release(&path));
        let third = SqliteStore::open(&path).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        SqliteStore::release(&path);
    }

    #[test]
    fn test_open_fails_when_path_is_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let result = SqliteStore::new(dir.path());
        assert!(matches!(result, Err(StoryError::StorageUnavailable(_))));
    }
}
