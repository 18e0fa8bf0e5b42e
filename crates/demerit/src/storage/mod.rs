//! Storage layer for demerit.
//!
//! This module provides `SQLite`-based persistent storage for recorded
//! violations. Records are partitioned by school of origin: listing,
//! pruning, and queue inspection all operate per school, and the sync
//! engine prunes by explicit row id so in-flight batches never swallow
//! records inserted while a push was running.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};

use rusqlite::{params, params_from_iter, Connection};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::record::ViolationRecord;

/// `SQLite` caps bound variables per statement; stay well under it.
const DELETE_CHUNK: usize = 500;

/// Store for pending violation records.
///
/// Every record lives here from the moment it is captured until a sync
/// push has been acknowledged by the server. The store is the durable
/// source of truth; the server copy is a best-effort mirror.
#[derive(Debug)]
pub struct Store {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl Store {
    /// Open or create a store database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema
    /// initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        // WAL keeps reads cheap while the sync engine deletes behind them
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory store instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert a record and return its assigned id.
    ///
    /// The record's own `id` field is ignored; the store always assigns a
    /// fresh one.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn insert(&self, record: &ViolationRecord) -> Result<i64> {
        self.conn.execute(
            r"
            INSERT INTO violations
                (student_id, student_name, class_name, dob, gender,
                 violation_type, points_deducted, violation_date,
                 school_name, recorder_name, recorder_class)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ",
            params![
                record.student_id,
                record.student_name,
                record.class_name,
                record.dob,
                record.gender,
                record.violation_type,
                record.points_deducted,
                record.violation_date,
                record.school_name,
                record.recorder_name,
                record.recorder_class,
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        debug!("Inserted violation with id {}", id);
        Ok(id)
    }

    /// Get all pending records for a school, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_by_school(&self, school: &str) -> Result<Vec<ViolationRecord>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT id, student_id, student_name, class_name, dob, gender,
                   violation_type, points_deducted, violation_date,
                   school_name, recorder_name, recorder_class
            FROM violations WHERE school_name = ?1
            ORDER BY id ASC
            ",
        )?;

        let records = stmt
            .query_map([school], Self::row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Delete all pending records for a school.
    ///
    /// Returns the number of records deleted; zero when the school had
    /// nothing pending.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_by_school(&self, school: &str) -> Result<usize> {
        let affected = self
            .conn
            .execute("DELETE FROM violations WHERE school_name = ?1", [school])?;
        Ok(affected)
    }

    /// Delete exactly the identified records.
    ///
    /// This is the pruning operation the sync engine uses after a server
    /// acknowledgment: only the ids that were transmitted go, anything
    /// inserted since stays pending.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_batch(&self, ids: &[i64]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut affected = 0;
        for chunk in ids.chunks(DELETE_CHUNK) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!("DELETE FROM violations WHERE id IN ({placeholders})");
            affected += self.conn.execute(&sql, params_from_iter(chunk.iter()))?;
        }

        debug!("Deleted {} synced violations", affected);
        Ok(affected)
    }

    /// Get the distinct schools that currently have pending records.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn schools(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT school_name FROM violations ORDER BY school_name ASC",
        )?;

        let schools = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(schools)
    }

    /// Count total pending records across all schools.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM violations", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Convert a database row to a `ViolationRecord`.
    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<ViolationRecord> {
        Ok(ViolationRecord {
            id: Some(row.get(0)?),
            student_id: row.get(1)?,
            student_name: row.get(2)?,
            class_name: row.get(3)?,
            dob: row.get(4)?,
            gender: row.get(5)?,
            violation_type: row.get(6)?,
            points_deducted: row.get(7)?,
            violation_date: row.get(8)?,
            school_name: row.get(9)?,
            recorder_name: row.get(10)?,
            recorder_class: row.get(11)?,
        })
    }
}
