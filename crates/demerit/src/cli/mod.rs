//! Command-line interface for demerit.
//!
//! This module provides the CLI structure for the `demerit` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, LoginCommand, PendingCommand, QrCommand, RecordCommand, SyncCommand,
    TypesCommand,
};

/// demerit - Record school violations offline, sync when you can
///
/// Saves every violation into a durable local queue first and pushes it to
/// the central server opportunistically, so a dead network never loses a
/// record.
#[derive(Debug, Parser)]
#[command(name = "demerit")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Record a violation into the local queue
    Record(RecordCommand),

    /// Push pending records to the server now
    Sync(SyncCommand),

    /// List locally pending records
    Pending(PendingCommand),

    /// List schools known to the server
    Schools,

    /// List violation types for a school
    Types(TypesCommand),

    /// Log in and store an API token
    Login(LoginCommand),

    /// Remove the stored API token
    Logout,

    /// Mint a signed QR payload for a student
    Qr(QrCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}
