//! `demerit` - Offline-first recording of school violations
//!
//! This library verifies scanned QR payloads, queues violation records in a
//! durable local store partitioned by school, and pushes pending batches to
//! the central server whenever the network allows. The local save is the
//! source of truth; delivery is best effort and retried on the next save.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod api;
pub mod auth;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod qr;
pub mod record;
pub mod recorder;
pub mod storage;
pub mod sync;
pub mod worker;

pub use api::{HttpApi, RemoteApi, SyncAck};
pub use catalog::ViolationType;
pub use config::Config;
pub use error::{Error, Result};
pub use logging::{init_logging, Verbosity};
pub use qr::ScannedPayload;
pub use record::{Reporter, StudentIdentity, ViolationRecord};
pub use recorder::Recorder;
pub use storage::Store;
pub use sync::{SyncEngine, SyncEvent, SyncOutcome};
pub use worker::StoreHandle;
