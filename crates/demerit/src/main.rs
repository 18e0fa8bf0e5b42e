//! `demerit` - CLI for the offline-first school violation recorder.
//!
//! This binary records violations into the durable local queue, pushes
//! pending records to the sync server, and carries the small utility
//! commands around them (catalog listing, login, payload minting).

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;

use demerit::cli::{
    Cli, Command, ConfigCommand, LoginCommand, PendingCommand, QrCommand, RecordCommand,
    SyncCommand, TypesCommand,
};
use demerit::{
    auth, init_logging, qr, worker, Config, Error, HttpApi, Recorder, RemoteApi, Reporter,
    ScannedPayload, Store, StoreHandle, StudentIdentity, SyncEngine, SyncEvent, SyncOutcome,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config =
        Config::load_from(cli.config.clone()).context("failed to load configuration")?;

    // Execute the command
    match cli.command {
        Command::Record(cmd) => handle_record(&config, cmd).await,
        Command::Sync(cmd) => handle_sync(&config, cmd).await,
        Command::Pending(cmd) => handle_pending(&config, cmd).await,
        Command::Schools => handle_schools(&config).await,
        Command::Types(cmd) => handle_types(&config, cmd).await,
        Command::Login(cmd) => handle_login(&config, cmd).await,
        Command::Logout => handle_logout(&config),
        Command::Qr(cmd) => handle_qr(cmd),
        Command::Config(cmd) => handle_config(&config, cli.config, cmd),
    }
}

/// Open the local store and hand it to a worker thread.
fn open_store(config: &Config) -> anyhow::Result<StoreHandle> {
    let store = Store::open(config.database_path()).context("failed to open the record store")?;
    Ok(worker::spawn(store)?)
}

/// Build the HTTP client, attaching the stored login token when present.
fn build_api(config: &Config) -> anyhow::Result<HttpApi> {
    let api = HttpApi::new(&config.server.base_url, config.request_timeout())?;
    match auth::load_token(&config.token_path())? {
        Some(token) => Ok(api.with_token(token)),
        None => Ok(api),
    }
}

async fn handle_record(config: &Config, cmd: RecordCommand) -> anyhow::Result<()> {
    let student = resolve_student(&cmd)?;
    let reporter = resolve_reporter(config, &cmd)?;

    let store = open_store(config)?;
    let api = Arc::new(build_api(config)?);
    let (events_tx, mut events_rx) = mpsc::channel(1);
    let engine = SyncEngine::new(store.clone(), api).with_events(events_tx);
    let recorder = Recorder::new(store, engine);

    let record = recorder
        .record(&cmd.school, &student, &cmd.violation, &reporter)
        .await?;
    println!(
        "Recorded \"{}\" (-{}) for {} [{}] at {}.",
        record.violation_type,
        record.points_deducted,
        record.student_name,
        record.class_name,
        record.school_name
    );

    // The recorder holds the only other event sender; drop it so the
    // receive below ends even if the flush task dies without reporting.
    drop(recorder);
    match events_rx.recv().await {
        Some(SyncEvent::Synced { pushed, .. }) => {
            println!("Synced {pushed} record(s).");
        }
        Some(SyncEvent::Failed { message, .. }) => {
            println!("Sync pending: {message}");
            println!("The record is saved locally and rides along with the next sync.");
        }
        Some(SyncEvent::Idle { .. }) | None => {}
    }

    // A failed sync never fails the save.
    Ok(())
}

/// Resolve the student identity from a payload or the manual-entry flags.
fn resolve_student(cmd: &RecordCommand) -> demerit::Result<StudentIdentity> {
    match (&cmd.payload, &cmd.name) {
        (Some(text), None) => {
            let payload = ScannedPayload::parse(text)?;
            payload.verify(&cmd.school)?;
            Ok(payload.student)
        }
        (None, Some(name)) => {
            let class = cmd.class.as_deref().ok_or_else(|| {
                Error::invalid_selection("manual entry needs --class alongside --name")
            })?;
            StudentIdentity::manual(name.clone(), class, cmd.dob.clone(), cmd.gender.clone())
        }
        (Some(_), Some(_)) => Err(Error::invalid_selection(
            "use either --payload or --name, not both",
        )),
        (None, None) => Err(Error::invalid_selection(
            "provide --payload or --name with --class",
        )),
    }
}

/// Resolve the reporter from flags, falling back to the configured default.
fn resolve_reporter(config: &Config, cmd: &RecordCommand) -> demerit::Result<Reporter> {
    let name = cmd
        .recorder
        .clone()
        .unwrap_or_else(|| config.recorder.name.clone());
    let class_name = cmd
        .recorder_class
        .clone()
        .unwrap_or_else(|| config.recorder.class_name.clone());
    if name.trim().is_empty() {
        return Err(Error::invalid_selection(
            "no recorder name given; pass --recorder or set [recorder] name in the config",
        ));
    }
    Ok(Reporter::new(name, class_name))
}

async fn handle_sync(config: &Config, cmd: SyncCommand) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let api = Arc::new(build_api(config)?);
    let engine = SyncEngine::new(store.clone(), api);

    let schools = match cmd.school {
        Some(school) => vec![school],
        None => store.schools().await?,
    };
    if schools.is_empty() {
        println!("Nothing pending.");
        return Ok(());
    }

    for school in schools {
        match engine.flush(&school).await? {
            SyncOutcome::Flushed { pushed } => println!("{school}: pushed {pushed} record(s)"),
            SyncOutcome::Idle => println!("{school}: nothing pending"),
        }
    }
    Ok(())
}

async fn handle_pending(config: &Config, cmd: PendingCommand) -> anyhow::Result<()> {
    let store = open_store(config)?;

    let records = match &cmd.school {
        Some(school) => store.list_by_school(school).await?,
        None => {
            let mut all = Vec::new();
            for school in store.schools().await? {
                all.extend(store.list_by_school(&school).await?);
            }
            all
        }
    };

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("Nothing pending.");
        return Ok(());
    }
    for record in &records {
        println!(
            "#{} {} | {} [{}] | {} (-{}) | {} | by {}",
            record.id.unwrap_or(0),
            record.school_name,
            record.student_name,
            record.class_name,
            record.violation_type,
            record.points_deducted,
            record.violation_date,
            record.recorder_name
        );
    }
    println!();
    println!("{} record(s) pending.", records.len());
    Ok(())
}

async fn handle_schools(config: &Config) -> anyhow::Result<()> {
    let api = build_api(config)?;
    let schools = api.schools().await?;
    if schools.is_empty() {
        println!("No schools registered.");
        return Ok(());
    }
    for school in schools {
        println!("{school}");
    }
    Ok(())
}

async fn handle_types(config: &Config, cmd: TypesCommand) -> anyhow::Result<()> {
    let api = build_api(config)?;
    let types = api.violation_types(&cmd.school).await?;
    if types.is_empty() {
        println!("No violation types for {}.", cmd.school);
        return Ok(());
    }
    for violation_type in types {
        println!("{violation_type}");
    }
    Ok(())
}

async fn handle_login(config: &Config, cmd: LoginCommand) -> anyhow::Result<()> {
    // Login itself never sends a stale token.
    let api = HttpApi::new(&config.server.base_url, config.request_timeout())?;
    let token = api.login(&cmd.username, &cmd.password).await?;

    let path = config.token_path();
    auth::save_token(&path, &token)?;
    println!("Logged in; token stored at {}", path.display());
    Ok(())
}

fn handle_logout(config: &Config) -> anyhow::Result<()> {
    let path = config.token_path();
    if auth::clear_token(&path)? {
        println!("Token removed.");
    } else {
        println!("No stored token.");
    }
    Ok(())
}

fn handle_qr(cmd: QrCommand) -> anyhow::Result<()> {
    let student = StudentIdentity::manual(cmd.name, cmd.class, cmd.dob, cmd.gender)?;
    println!("{}", qr::mint_payload(&student, &cmd.school)?);
    Ok(())
}

fn handle_config(
    config: &Config,
    config_path: Option<PathBuf>,
    cmd: ConfigCommand,
) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Server]");
                println!("  Base URL:       {}", config.server.base_url);
                println!("  Timeout (s):    {}", config.server.request_timeout_secs);
                println!("  Token path:     {}", config.token_path().display());
                println!();
                println!("[Storage]");
                println!("  Database path:  {}", config.database_path().display());
                println!();
                println!("[Recorder]");
                println!("  Name:           {}", config.recorder.name);
                println!("  Class:          {}", config.recorder.class_name);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file
                .or(config_path)
                .unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
