//! Capture façade.
//!
//! [`Recorder`] is the one entry point for recording a violation: it
//! assembles the record, persists it through the store worker, and kicks
//! off a detached sync attempt. The save is the product; delivery is
//! opportunistic and its outcome never changes what the caller gets back.

use crate::error::Result;
use crate::record::{Reporter, StudentIdentity, ViolationRecord};
use crate::sync::SyncEngine;
use crate::worker::StoreHandle;

/// Records violations into the local store and nudges the sync engine.
#[derive(Debug, Clone)]
pub struct Recorder {
    store: StoreHandle,
    sync: SyncEngine,
}

impl Recorder {
    /// Create a recorder over a store worker and a sync engine.
    ///
    /// Both ends should share the same store, otherwise the flush kicked
    /// off after a save will not see the record it is meant to deliver.
    #[must_use]
    pub fn new(store: StoreHandle, sync: SyncEngine) -> Self {
        Self { store, sync }
    }

    /// Record one violation.
    ///
    /// Assembles the record from the verified identity and the selected
    /// violation label, persists it, and spawns a background flush for
    /// the school. Returns as soon as the save lands; the returned record
    /// carries the row id it was stored under.
    ///
    /// # Errors
    ///
    /// Returns an error when the selection is invalid or the store cannot
    /// persist the record. A sync failure is not an error here: the
    /// record is safe locally and will ride along with a later flush.
    pub async fn record(
        &self,
        school: &str,
        student: &StudentIdentity,
        label: &str,
        reporter: &Reporter,
    ) -> Result<ViolationRecord> {
        let mut record = ViolationRecord::assemble(school, student, label, reporter)?;
        let id = self.store.insert(record.clone()).await?;
        record.id = Some(id);

        self.sync.spawn_flush(school);
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::sync::mpsc;

    use crate::api::{RemoteApi, SyncAck};
    use crate::catalog::ViolationType;
    use crate::error::Error;
    use crate::storage::Store;
    use crate::sync::SyncEvent;
    use crate::worker;

    #[derive(Debug, Default)]
    struct FakeApi {
        pushes: Mutex<usize>,
        fail_pushes: bool,
    }

    #[async_trait]
    impl RemoteApi for FakeApi {
        async fn schools(&self) -> crate::error::Result<Vec<String>> {
            Ok(Vec::new())
        }

        async fn violation_types(
            &self,
            _school: &str,
        ) -> crate::error::Result<Vec<ViolationType>> {
            Ok(Vec::new())
        }

        async fn push_violations(
            &self,
            _batch: &[ViolationRecord],
        ) -> crate::error::Result<SyncAck> {
            *self.pushes.lock().unwrap() += 1;
            if self.fail_pushes {
                return Err(Error::ServerRejected {
                    status: 500,
                    message: "down".to_string(),
                });
            }
            Ok(SyncAck {
                message: "ok".to_string(),
            })
        }

        async fn login(&self, _username: &str, _password: &str) -> crate::error::Result<String> {
            Ok("token".to_string())
        }
    }

    fn student() -> StudentIdentity {
        StudentIdentity {
            full_name: "Li Wei".to_string(),
            class_name: "10A".to_string(),
            dob: "2008-03-14".to_string(),
            gender: "M".to_string(),
        }
    }

    fn setup(fail_pushes: bool) -> (StoreHandle, Recorder, mpsc::Receiver<SyncEvent>) {
        let store = Store::open_in_memory().expect("failed to create test store");
        let handle = worker::spawn(store).expect("failed to spawn store worker");
        let api = Arc::new(FakeApi {
            pushes: Mutex::new(0),
            fail_pushes,
        });
        let (tx, rx) = mpsc::channel(4);
        let engine = SyncEngine::new(handle.clone(), api).with_events(tx);
        let recorder = Recorder::new(handle.clone(), engine);
        (handle, recorder, rx)
    }

    #[tokio::test]
    async fn test_record_persists_and_returns_row_id() {
        let (handle, recorder, mut rx) = setup(false);

        let record = recorder
            .record(
                "Northside High",
                &student(),
                "Late arrival (-5)",
                &Reporter::new("Ms. Tran", "10A"),
            )
            .await
            .unwrap();

        assert!(record.id.is_some());
        assert_eq!(record.violation_type, "Late arrival");
        assert_eq!(record.points_deducted, 5);
        assert_eq!(record.student_id, format!("Northside High_{}", crate::record::name_hash("Li Wei")));

        // The detached flush delivers and prunes it.
        let event = rx.recv().await.unwrap();
        assert_eq!(
            event,
            SyncEvent::Synced {
                school: "Northside High".to_string(),
                pushed: 1,
            }
        );
        assert!(handle.list_by_school("Northside High").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_record_succeeds_when_sync_fails() {
        let (handle, recorder, mut rx) = setup(true);

        let record = recorder
            .record(
                "Northside High",
                &student(),
                "Late arrival (-5)",
                &Reporter::new("Ms. Tran", "10A"),
            )
            .await
            .unwrap();
        assert!(record.id.is_some());

        // The flush failed but the save stands.
        let event = rx.recv().await.unwrap();
        assert!(matches!(event, SyncEvent::Failed { .. }));
        assert_eq!(handle.list_by_school("Northside High").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_record_rejects_bad_label_without_storing() {
        let (handle, recorder, _rx) = setup(false);

        let err = recorder
            .record(
                "Northside High",
                &student(),
                "Late arrival",
                &Reporter::new("Ms. Tran", "10A"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSelection { .. }));
        assert_eq!(handle.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_record_rejects_blank_school() {
        let (handle, recorder, _rx) = setup(false);

        let err = recorder
            .record(
                "  ",
                &student(),
                "Late arrival (-5)",
                &Reporter::new("Ms. Tran", "10A"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSelection { .. }));
        assert_eq!(handle.count().await.unwrap(), 0);
    }
}
