//! SQLite-backed index store.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE meta    (key TEXT PRIMARY KEY, value TEXT NOT NULL);
//! CREATE TABLE entries (digest BLOB PRIMARY KEY, path BLOB NOT NULL);
//! ```
//!
//! `meta` records the schema version and the digest algorithm. Opening a
//! store that was built with another algorithm is refused, since its
//! digests can never match.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OpenFlags, OptionalExtension};

use super::store::{IndexOp, IndexStore};
use super::IndexError;
use crate::scanner::{ContentDigest, HashAlgorithm};

/// Current schema version.
pub const SCHEMA_VERSION: &str = "1";

/// The index file and the journal files SQLite may create beside it.
#[must_use]
pub fn index_files(path: &Path) -> Vec<PathBuf> {
    let mut files = vec![path.to_path_buf()];
    for suffix in ["-journal", "-wal", "-shm"] {
        let mut name = path.as_os_str().to_os_string();
        name.push(suffix);
        files.push(PathBuf::from(name));
    }
    files
}

/// Persistent index store using SQLite.
pub struct SqliteStore {
    conn: Connection,
    path: PathBuf,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open or create a store at `path` for `algorithm`.
    ///
    /// # Errors
    ///
    /// - [`IndexError::Corrupt`] if the file exists but is not a valid index
    /// - [`IndexError::AlgorithmMismatch`] if it was built with another algorithm
    /// - [`IndexError::Open`] if the file cannot be created
    pub fn open(path: &Path, algorithm: HashAlgorithm) -> Result<Self, IndexError> {
        let existed = path.exists();
        let conn = Connection::open(path).map_err(|source| IndexError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let store = Self {
            conn,
            path: path.to_path_buf(),
        };

        let has_meta = store.has_meta_table().map_err(|e| store.corrupt(e))?;
        if has_meta {
            store.check_meta(algorithm)?;
        } else if existed && store.has_foreign_tables().map_err(|e| store.corrupt(e))? {
            return Err(IndexError::Corrupt {
                path: store.path.clone(),
                message: "database has no index metadata".to_string(),
            });
        } else {
            store.create_schema(algorithm).map_err(|e| {
                if existed {
                    store.corrupt(e)
                } else {
                    IndexError::Open {
                        path: store.path.clone(),
                        source: e,
                    }
                }
            })?;
            log::debug!("Created new index at {}", store.path.display());
        }

        Ok(store)
    }

    /// Open an existing store without write access.
    ///
    /// # Errors
    ///
    /// Same as [`open`](Self::open); a missing file is [`IndexError::Open`].
    pub fn open_read_only(path: &Path, algorithm: HashAlgorithm) -> Result<Self, IndexError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|source| IndexError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let store = Self {
            conn,
            path: path.to_path_buf(),
        };

        if !store.has_meta_table().map_err(|e| store.corrupt(e))? {
            return Err(IndexError::Corrupt {
                path: store.path.clone(),
                message: "database has no index metadata".to_string(),
            });
        }
        store.check_meta(algorithm)?;
        Ok(store)
    }

    fn corrupt(&self, e: rusqlite::Error) -> IndexError {
        IndexError::Corrupt {
            path: self.path.clone(),
            message: e.to_string(),
        }
    }

    fn has_meta_table(&self) -> rusqlite::Result<bool> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'meta'",
                [],
                |row| row.get::<_, i64>(0),
            )
            .map(|n| n > 0)
    }

    fn has_foreign_tables(&self) -> rusqlite::Result<bool> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'",
                [],
                |row| row.get::<_, i64>(0),
            )
            .map(|n| n > 0)
    }

    fn create_schema(&self, algorithm: HashAlgorithm) -> rusqlite::Result<()> {
        self.conn.execute_batch(
            "BEGIN;
             CREATE TABLE IF NOT EXISTS meta (key TEXT PRIMARY KEY, value TEXT NOT NULL);
             CREATE TABLE IF NOT EXISTS entries (digest BLOB PRIMARY KEY, path BLOB NOT NULL);
             COMMIT;",
        )?;
        self.conn.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES ('schema_version', ?1), ('algorithm', ?2)",
            params![SCHEMA_VERSION, algorithm.name()],
        )?;
        Ok(())
    }

    fn meta(&self, key: &str) -> Result<Option<String>, IndexError> {
        self.conn
            .query_row("SELECT value FROM meta WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(|e| self.corrupt(e))
    }

    fn check_meta(&self, algorithm: HashAlgorithm) -> Result<(), IndexError> {
        match self.meta("schema_version")?.as_deref() {
            Some(SCHEMA_VERSION) => {}
            other => {
                return Err(IndexError::Corrupt {
                    path: self.path.clone(),
                    message: format!("unsupported schema version {:?}", other),
                })
            }
        }

        let stored = self.meta("algorithm")?.unwrap_or_default();
        if stored != algorithm.name() {
            return Err(IndexError::AlgorithmMismatch {
                path: self.path.clone(),
                expected: algorithm.name().to_string(),
                found: stored,
            });
        }
        Ok(())
    }
}

impl IndexStore for SqliteStore {
    fn load(&mut self) -> Result<Vec<(ContentDigest, PathBuf)>, IndexError> {
        let mut stmt = self
            .conn
            .prepare("SELECT digest, path FROM entries")
            .map_err(|e| self.corrupt(e))?;

        let rows = stmt
            .query_map([], |row| {
                let digest: Vec<u8> = row.get(0)?;
                let path: Vec<u8> = row.get(1)?;
                Ok((ContentDigest::from_bytes(digest), path_from_bytes(path)))
            })
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(|e| IndexError::Corrupt {
                path: self.path.clone(),
                message: e.to_string(),
            })?;

        Ok(rows)
    }

    fn apply(&mut self, ops: &[IndexOp]) -> Result<(), IndexError> {
        if ops.is_empty() {
            return Ok(());
        }

        let tx = self.conn.transaction()?;
        {
            let mut put =
                tx.prepare_cached("INSERT OR REPLACE INTO entries (digest, path) VALUES (?1, ?2)")?;
            let mut remove = tx.prepare_cached("DELETE FROM entries WHERE digest = ?1")?;
            for op in ops {
                match op {
                    IndexOp::Put(digest, path) => {
                        put.execute(params![digest.as_bytes(), path_to_bytes(path)])?;
                    }
                    IndexOp::Remove(digest) => {
                        remove.execute(params![digest.as_bytes()])?;
                    }
                }
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn location(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

#[cfg(unix)]
fn path_to_bytes(path: &Path) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    path.as_os_str().as_bytes().to_vec()
}

#[cfg(unix)]
fn path_from_bytes(bytes: Vec<u8>) -> PathBuf {
    use std::os::unix::ffi::OsStringExt;
    PathBuf::from(std::ffi::OsString::from_vec(bytes))
}

#[cfg(not(unix))]
fn path_to_bytes(path: &Path) -> Vec<u8> {
    path.to_string_lossy().into_owned().into_bytes()
}

#[cfg(not(unix))]
fn path_from_bytes(bytes: Vec<u8>) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(&bytes).into_owned())
}
