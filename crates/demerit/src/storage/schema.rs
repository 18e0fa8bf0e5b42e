//! `SQLite` schema definitions for demerit.
//!
//! This module contains the SQL statements for creating and managing
//! the database schema.

/// SQL statement to create the violations table.
///
/// This is the original table shape; the identity-snapshot columns
/// (`student_name`, `class_name`, `dob`, `gender`) arrive with the
/// version 2 migration.
pub const CREATE_VIOLATIONS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS violations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    student_id TEXT NOT NULL,
    violation_type TEXT NOT NULL,
    points_deducted INTEGER NOT NULL,
    violation_date TEXT NOT NULL,
    school_name TEXT NOT NULL,
    recorder_name TEXT NOT NULL,
    recorder_class TEXT NOT NULL
)
";

/// SQL statement to create an index on `school_name`.
///
/// Every sync and queue-inspection query filters on the school of origin.
pub const CREATE_SCHOOL_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_violations_school ON violations(school_name)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All base schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_VIOLATIONS_TABLE,
    CREATE_SCHOOL_INDEX,
    CREATE_METADATA_TABLE,
];

/// Version 2 statements adding the identity-snapshot columns.
///
/// Additive with empty-string defaults, so a version 1 store upgrades in
/// place without losing rows.
pub const ADD_IDENTITY_SNAPSHOT_COLUMNS: &[&str] = &[
    "ALTER TABLE violations ADD COLUMN student_name TEXT NOT NULL DEFAULT ''",
    "ALTER TABLE violations ADD COLUMN class_name TEXT NOT NULL DEFAULT ''",
    "ALTER TABLE violations ADD COLUMN dob TEXT NOT NULL DEFAULT ''",
    "ALTER TABLE violations ADD COLUMN gender TEXT NOT NULL DEFAULT ''",
];
