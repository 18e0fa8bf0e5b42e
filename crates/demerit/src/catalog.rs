//! Violation-type catalog entries.
//!
//! The server publishes a per-school catalog of violation types. Each entry
//! pairs a human-readable name with a non-negative point deduction, and is
//! presented to recorders as a single selectable label of the form
//! `"<name> (-<points>)"`. This module owns that label format and its
//! strict inverse.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Marker separating the name from the point deduction in a label.
const LABEL_MARKER: &str = " (-";

/// One entry of a school's violation-type catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationType {
    /// Display name of the violation, e.g. "Late arrival".
    pub name: String,
    /// Points deducted when this violation is recorded.
    pub points: u32,
}

impl ViolationType {
    /// Create a new catalog entry.
    #[must_use]
    pub fn new(name: impl Into<String>, points: u32) -> Self {
        Self {
            name: name.into(),
            points,
        }
    }

    /// Render the selectable label for this entry.
    ///
    /// # Examples
    ///
    /// ```
    /// use demerit::catalog::ViolationType;
    ///
    /// let vt = ViolationType::new("Late arrival", 5);
    /// assert_eq!(vt.label(), "Late arrival (-5)");
    /// ```
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}{}{})", self.name, LABEL_MARKER, self.points)
    }

    /// Recover the name and point deduction from a selectable label.
    ///
    /// The split happens at the *last* `" (-"` marker, so names that
    /// themselves contain the marker still round-trip through `label()`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSelection`] when the marker is missing, the
    /// name is empty, the points field is not a non-negative integer, or
    /// text follows the closing parenthesis.
    pub fn parse_label(label: &str) -> Result<Self> {
        let marker = label
            .rfind(LABEL_MARKER)
            .ok_or_else(|| Error::invalid_selection(format!("label {label:?} has no point marker")))?;

        let name = &label[..marker];
        if name.is_empty() {
            return Err(Error::invalid_selection(format!(
                "label {label:?} has an empty violation name"
            )));
        }

        let rest = &label[marker + LABEL_MARKER.len()..];
        let points_text = rest.strip_suffix(')').ok_or_else(|| {
            Error::invalid_selection(format!("label {label:?} does not end at the point field"))
        })?;

        let points: u32 = points_text.parse().map_err(|_| {
            Error::invalid_selection(format!("label {label:?} has a non-numeric point field"))
        })?;

        Ok(Self {
            name: name.to_string(),
            points,
        })
    }
}

impl std::fmt::Display for ViolationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}
