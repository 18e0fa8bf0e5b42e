//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Record command arguments.
#[derive(Debug, Args)]
pub struct RecordCommand {
    /// Violation label as listed by `types`, e.g. "Late arrival (-5)"
    pub violation: String,

    /// School the violation belongs to
    #[arg(short, long)]
    pub school: String,

    /// Scanned QR payload (JSON text); the alternative to manual entry
    #[arg(short, long)]
    pub payload: Option<String>,

    /// Student full name (manual entry)
    #[arg(long)]
    pub name: Option<String>,

    /// Student class (manual entry)
    #[arg(long)]
    pub class: Option<String>,

    /// Student date of birth (manual entry)
    #[arg(long, default_value = "2000-01-01")]
    pub dob: String,

    /// Student gender (manual entry)
    #[arg(long, default_value = "Unknown")]
    pub gender: String,

    /// Name of the recording teacher (defaults to the configured recorder)
    #[arg(long)]
    pub recorder: Option<String>,

    /// Class of the recording teacher
    #[arg(long)]
    pub recorder_class: Option<String>,
}

/// Sync command arguments.
#[derive(Debug, Args)]
pub struct SyncCommand {
    /// School to flush; omit to flush every school with pending records
    pub school: Option<String>,
}

/// Pending command arguments.
#[derive(Debug, Args)]
pub struct PendingCommand {
    /// Limit the listing to one school
    pub school: Option<String>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Types command arguments.
#[derive(Debug, Args)]
pub struct TypesCommand {
    /// School whose violation catalog to fetch
    pub school: String,
}

/// Login command arguments.
#[derive(Debug, Args)]
pub struct LoginCommand {
    /// Account username
    pub username: String,

    /// Account password
    pub password: String,
}

/// Qr command arguments.
#[derive(Debug, Args)]
pub struct QrCommand {
    /// School the payload is bound to
    #[arg(short, long)]
    pub school: String,

    /// Student full name
    #[arg(long)]
    pub name: String,

    /// Student class
    #[arg(long, default_value = "Unknown")]
    pub class: String,

    /// Student date of birth
    #[arg(long, default_value = "2000-01-01")]
    pub dob: String,

    /// Student gender
    #[arg(long, default_value = "Unknown")]
    pub gender: String,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_command_debug() {
        let cmd = RecordCommand {
            violation: "Late arrival (-5)".to_string(),
            school: "Northside High".to_string(),
            payload: None,
            name: Some("Li Wei".to_string()),
            class: Some("10A".to_string()),
            dob: "2008-03-14".to_string(),
            gender: "M".to_string(),
            recorder: None,
            recorder_class: None,
        };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("violation"));
        assert!(debug_str.contains("Late arrival"));
    }

    #[test]
    fn test_sync_command_debug() {
        let cmd = SyncCommand {
            school: Some("Northside High".to_string()),
        };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("school"));
    }

    #[test]
    fn test_pending_command_debug() {
        let cmd = PendingCommand {
            school: None,
            json: true,
        };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("json"));
    }

    #[test]
    fn test_login_command_debug() {
        let cmd = LoginCommand {
            username: "teacher".to_string(),
            password: "secret".to_string(),
        };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("username"));
    }

    #[test]
    fn test_qr_command_debug() {
        let cmd = QrCommand {
            school: "Northside High".to_string(),
            name: "Li Wei".to_string(),
            class: "10A".to_string(),
            dob: "2008-03-14".to_string(),
            gender: "M".to_string(),
        };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Li Wei"));
    }

    #[test]
    fn test_config_command_debug() {
        let cmd = ConfigCommand::Show { json: false };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Show"));
    }
}
