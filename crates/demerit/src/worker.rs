//! Background store worker.
//!
//! `SQLite` connections are `Send` but not `Sync`, so the store is moved
//! onto a dedicated worker thread and everything else talks to it through
//! a job channel. One worker means one writer: submissions from a handle
//! are applied in submission order, saves never block a caller's async
//! task, and there is no lock to contend on.

use std::thread;

use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::error::{Error, Result};
use crate::record::ViolationRecord;
use crate::storage::Store;

/// Depth of the job queue; callers briefly back-pressure when it fills.
const QUEUE_DEPTH: usize = 64;

/// A job submitted to the store worker, carrying its reply channel.
#[derive(Debug)]
enum StoreJob {
    Insert {
        record: ViolationRecord,
        reply: oneshot::Sender<Result<i64>>,
    },
    ListBySchool {
        school: String,
        reply: oneshot::Sender<Result<Vec<ViolationRecord>>>,
    },
    DeleteBySchool {
        school: String,
        reply: oneshot::Sender<Result<usize>>,
    },
    DeleteBatch {
        ids: Vec<i64>,
        reply: oneshot::Sender<Result<usize>>,
    },
    Schools {
        reply: oneshot::Sender<Result<Vec<String>>>,
    },
    Count {
        reply: oneshot::Sender<Result<i64>>,
    },
}

/// Async handle to the store worker.
///
/// Cheap to clone; every clone submits to the same worker. The worker
/// exits once all handles have been dropped and the queue drains.
#[derive(Debug, Clone)]
pub struct StoreHandle {
    jobs: mpsc::Sender<StoreJob>,
}

/// Move a store onto its worker thread and return the async handle.
///
/// # Errors
///
/// Returns an error if the worker thread cannot be spawned.
pub fn spawn(store: Store) -> Result<StoreHandle> {
    let (jobs, queue) = mpsc::channel(QUEUE_DEPTH);

    thread::Builder::new()
        .name("demerit-store".to_string())
        .spawn(move || run(&store, queue))?;

    Ok(StoreHandle { jobs })
}

/// Worker loop: drain jobs until every handle is gone.
fn run(store: &Store, mut queue: mpsc::Receiver<StoreJob>) {
    debug!("Store worker started");
    while let Some(job) = queue.blocking_recv() {
        handle_job(store, job);
    }
    debug!("Store worker stopped");
}

fn handle_job(store: &Store, job: StoreJob) {
    // A dropped reply receiver means the caller gave up waiting; the
    // database effect stands either way.
    match job {
        StoreJob::Insert { record, reply } => {
            let _ = reply.send(store.insert(&record));
        }
        StoreJob::ListBySchool { school, reply } => {
            let _ = reply.send(store.list_by_school(&school));
        }
        StoreJob::DeleteBySchool { school, reply } => {
            let _ = reply.send(store.delete_by_school(&school));
        }
        StoreJob::DeleteBatch { ids, reply } => {
            let _ = reply.send(store.delete_batch(&ids));
        }
        StoreJob::Schools { reply } => {
            let _ = reply.send(store.schools());
        }
        StoreJob::Count { reply } => {
            let _ = reply.send(store.count());
        }
    }
}

impl StoreHandle {
    /// Persist a record, returning its assigned id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreClosed`] if the worker has shut down, or the
    /// storage error the insert produced.
    pub async fn insert(&self, record: ViolationRecord) -> Result<i64> {
        let (reply, response) = oneshot::channel();
        self.submit(StoreJob::Insert { record, reply }, response)
            .await
    }

    /// Get all pending records for a school, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreClosed`] if the worker has shut down, or the
    /// storage error the query produced.
    pub async fn list_by_school(&self, school: &str) -> Result<Vec<ViolationRecord>> {
        let (reply, response) = oneshot::channel();
        self.submit(
            StoreJob::ListBySchool {
                school: school.to_string(),
                reply,
            },
            response,
        )
        .await
    }

    /// Delete all pending records for a school, returning how many went.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreClosed`] if the worker has shut down, or the
    /// storage error the delete produced.
    pub async fn delete_by_school(&self, school: &str) -> Result<usize> {
        let (reply, response) = oneshot::channel();
        self.submit(
            StoreJob::DeleteBySchool {
                school: school.to_string(),
                reply,
            },
            response,
        )
        .await
    }

    /// Delete exactly the identified records, returning how many went.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreClosed`] if the worker has shut down, or the
    /// storage error the delete produced.
    pub async fn delete_batch(&self, ids: Vec<i64>) -> Result<usize> {
        let (reply, response) = oneshot::channel();
        self.submit(StoreJob::DeleteBatch { ids, reply }, response)
            .await
    }

    /// Get the distinct schools that currently have pending records.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreClosed`] if the worker has shut down, or the
    /// storage error the query produced.
    pub async fn schools(&self) -> Result<Vec<String>> {
        let (reply, response) = oneshot::channel();
        self.submit(StoreJob::Schools { reply }, response).await
    }

    /// Count total pending records across all schools.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreClosed`] if the worker has shut down, or the
    /// storage error the query produced.
    pub async fn count(&self) -> Result<i64> {
        let (reply, response) = oneshot::channel();
        self.submit(StoreJob::Count { reply }, response).await
    }

    /// Submit a job and wait for its reply.
    async fn submit<T>(&self, job: StoreJob, response: oneshot::Receiver<Result<T>>) -> Result<T> {
        self.jobs.send(job).await.map_err(|_| Error::StoreClosed)?;
        response.await.map_err(|_| Error::StoreClosed)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_record(school: &str, student: &str) -> ViolationRecord {
        ViolationRecord {
            id: None,
            student_id: format!("{school}_{}", crate::record::name_hash(student)),
            student_name: student.to_string(),
            class_name: "10A".to_string(),
            dob: "2008-03-14".to_string(),
            gender: "M".to_string(),
            violation_type: "Late arrival".to_string(),
            points_deducted: 5,
            violation_date: "2024-01-15".to_string(),
            school_name: school.to_string(),
            recorder_name: "Ms. Tran".to_string(),
            recorder_class: "10A".to_string(),
        }
    }

    fn spawn_test_worker() -> StoreHandle {
        let store = Store::open_in_memory().expect("failed to create test store");
        spawn(store).expect("failed to spawn store worker")
    }

    #[tokio::test]
    async fn test_insert_and_list_through_worker() {
        let handle = spawn_test_worker();

        let id = handle
            .insert(test_record("Northside High", "Li Wei"))
            .await
            .unwrap();

        let listed = handle.list_by_school("Northside High").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, Some(id));
        assert_eq!(listed[0].student_name, "Li Wei");
    }

    #[tokio::test]
    async fn test_submissions_apply_in_order() {
        let handle = spawn_test_worker();

        for student in ["First", "Second", "Third"] {
            handle
                .insert(test_record("Northside High", student))
                .await
                .unwrap();
        }

        let listed = handle.list_by_school("Northside High").await.unwrap();
        let names: Vec<&str> = listed.iter().map(|r| r.student_name.as_str()).collect();
        assert_eq!(names, ["First", "Second", "Third"]);
    }

    #[tokio::test]
    async fn test_delete_batch_through_worker() {
        let handle = spawn_test_worker();

        let a = handle
            .insert(test_record("Northside High", "A"))
            .await
            .unwrap();
        let b = handle
            .insert(test_record("Northside High", "B"))
            .await
            .unwrap();
        handle
            .insert(test_record("Northside High", "C"))
            .await
            .unwrap();

        let deleted = handle.delete_batch(vec![a, b]).await.unwrap();
        assert_eq!(deleted, 2);

        let remaining = handle.list_by_school("Northside High").await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].student_name, "C");
    }

    #[tokio::test]
    async fn test_delete_by_school_through_worker() {
        let handle = spawn_test_worker();

        handle
            .insert(test_record("Northside High", "Li Wei"))
            .await
            .unwrap();
        handle
            .insert(test_record("Southside High", "Li Na"))
            .await
            .unwrap();

        assert_eq!(handle.delete_by_school("Northside High").await.unwrap(), 1);
        assert_eq!(handle.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_schools_and_count_through_worker() {
        let handle = spawn_test_worker();
        assert_eq!(handle.count().await.unwrap(), 0);

        handle
            .insert(test_record("Southside High", "Li Na"))
            .await
            .unwrap();
        handle
            .insert(test_record("Northside High", "Li Wei"))
            .await
            .unwrap();

        assert_eq!(
            handle.schools().await.unwrap(),
            ["Northside High", "Southside High"]
        );
        assert_eq!(handle.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_clones_share_one_worker() {
        let handle = spawn_test_worker();
        let other = handle.clone();

        handle
            .insert(test_record("Northside High", "Li Wei"))
            .await
            .unwrap();

        let listed = other.list_by_school("Northside High").await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_inserts_all_land() {
        let handle = spawn_test_worker();

        let mut tasks = Vec::new();
        for i in 0..20 {
            let handle = handle.clone();
            tasks.push(tokio::spawn(async move {
                handle
                    .insert(test_record("Northside High", &format!("Student {i}")))
                    .await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(handle.count().await.unwrap(), 20);
    }
}
