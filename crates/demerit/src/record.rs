//! Violation records and the identities they are assembled from.
//!
//! A [`ViolationRecord`] is the unit of capture: one student, one violation
//! type, one calendar date, one recording teacher, all under a single school
//! of origin. Records are assembled locally, persisted in the local store,
//! and later pushed to the server as-is.

use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::catalog::ViolationType;
use crate::error::{Error, Result};

/// Placeholder for identity fields a payload did not carry.
const UNKNOWN: &str = "Unknown";
/// Placeholder date of birth for payloads that omit one.
const UNKNOWN_DOB: &str = "2000-01-01";

fn default_unknown() -> String {
    UNKNOWN.to_string()
}

fn default_dob() -> String {
    UNKNOWN_DOB.to_string()
}

/// A student identity, either verified from a scanned payload or typed in
/// manually.
///
/// Fields missing from a scanned payload fall back to fixed placeholders
/// during deserialization; manual entry requires every field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentIdentity {
    /// The student's full name.
    #[serde(default = "default_unknown")]
    pub full_name: String,
    /// The student's class, e.g. "10A".
    #[serde(default = "default_unknown")]
    pub class_name: String,
    /// Date of birth, `YYYY-MM-DD`.
    #[serde(default = "default_dob")]
    pub dob: String,
    /// The student's gender.
    #[serde(default = "default_unknown")]
    pub gender: String,
}

impl StudentIdentity {
    /// Build an identity from manual entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSelection`] if any field is empty; manual
    /// entry has no placeholder fallbacks.
    pub fn manual(
        full_name: impl Into<String>,
        class_name: impl Into<String>,
        dob: impl Into<String>,
        gender: impl Into<String>,
    ) -> Result<Self> {
        let identity = Self {
            full_name: full_name.into(),
            class_name: class_name.into(),
            dob: dob.into(),
            gender: gender.into(),
        };
        for (field, value) in [
            ("full name", &identity.full_name),
            ("class", &identity.class_name),
            ("date of birth", &identity.dob),
            ("gender", &identity.gender),
        ] {
            if value.trim().is_empty() {
                return Err(Error::invalid_selection(format!(
                    "student {field} must not be empty"
                )));
            }
        }
        Ok(identity)
    }
}

/// The teacher recording a violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reporter {
    /// The recorder's name.
    pub name: String,
    /// The class the recorder is responsible for.
    pub class_name: String,
}

impl Reporter {
    /// Create a new reporter.
    #[must_use]
    pub fn new(name: impl Into<String>, class_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            class_name: class_name.into(),
        }
    }
}

/// One recorded violation, pending or persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationRecord {
    /// Local store row id; `None` until the record has been persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Derived correlation id, `<school>_<name hash>`.
    pub student_id: String,
    /// Snapshot of the student's full name at capture time.
    pub student_name: String,
    /// Snapshot of the student's class at capture time.
    pub class_name: String,
    /// Snapshot of the student's date of birth at capture time.
    pub dob: String,
    /// Snapshot of the student's gender at capture time.
    pub gender: String,
    /// Name of the violation type that was selected.
    pub violation_type: String,
    /// Points deducted for this violation.
    pub points_deducted: u32,
    /// Device-local calendar date of the capture, `YYYY-MM-DD`.
    pub violation_date: String,
    /// School of origin; records are partitioned and synced per school.
    pub school_name: String,
    /// Name of the recording teacher.
    pub recorder_name: String,
    /// Class of the recording teacher.
    pub recorder_class: String,
}

impl ViolationRecord {
    /// Assemble a record from its parts, stamping today's date and
    /// deriving the student correlation id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSelection`] if the school, the reporter
    /// name, or the reporter class is empty, or if the label does not
    /// parse as a catalog entry.
    pub fn assemble(
        school: &str,
        student: &StudentIdentity,
        label: &str,
        reporter: &Reporter,
    ) -> Result<Self> {
        if school.trim().is_empty() {
            return Err(Error::invalid_selection("school must not be empty"));
        }
        if reporter.name.trim().is_empty() {
            return Err(Error::invalid_selection("recorder name must not be empty"));
        }
        if reporter.class_name.trim().is_empty() {
            return Err(Error::invalid_selection("recorder class must not be empty"));
        }

        let violation = ViolationType::parse_label(label)?;
        let violation_date = Local::now().format("%Y-%m-%d").to_string();

        Ok(Self {
            id: None,
            student_id: derive_student_id(school, &student.full_name),
            student_name: student.full_name.clone(),
            class_name: student.class_name.clone(),
            dob: student.dob.clone(),
            gender: student.gender.clone(),
            violation_type: violation.name,
            points_deducted: violation.points,
            violation_date,
            school_name: school.to_string(),
            recorder_name: reporter.name.clone(),
            recorder_class: reporter.class_name.clone(),
        })
    }
}

/// Derive the per-school student correlation id.
///
/// Two students with the same full name at the same school collide; the id
/// is a grouping hint for the server's reports, not a uniqueness guarantee.
#[must_use]
pub fn derive_student_id(school: &str, full_name: &str) -> String {
    format!("{school}_{}", name_hash(full_name))
}

/// Stable 31-based polynomial hash over the UTF-16 code units of `name`.
///
/// The value is deterministic across devices and processes, so records for
/// the same name always group under the same id server-side.
#[must_use]
pub fn name_hash(name: &str) -> i32 {
    let mut hash: i32 = 0;
    for unit in name.encode_utf16() {
        hash = hash.wrapping_mul(31).wrapping_add(i32::from(unit));
    }
    hash
}
