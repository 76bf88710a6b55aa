use std::{
    future::Future,
    io::ErrorKind,
    ops::Deref,
    path::{Path, PathBuf},
};

use anyhow::Result;
use chrono::NaiveDate;
use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::File,
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
};
use tracing::{debug, warn};

use crate::utils::time::{date_to_record_name, record_name_to_date};

use super::record::SessionRecord;

/// Interface for abstracting storage of finalized sessions. The store is
/// append-only; records are never rewritten or deleted in normal operation.
pub trait SessionStore {
    /// Persists one session record into the file for `record.date`.
    fn insert(&self, record: SessionRecord) -> impl Future<Output = Result<()>> + Send;

    /// Retrieves every session attributed to a certain day.
    fn records_for(&self, date: NaiveDate) -> impl Future<Output = Result<Vec<SessionRecord>>> + Send;

    /// Lists every day that has at least one record, sorted ascending.
    fn dates(&self) -> impl Future<Output = Result<Vec<NaiveDate>>> + Send;
}

impl<T: Deref + Sync> SessionStore for T
where
    T::Target: SessionStore + Sync,
{
    fn insert(&self, record: SessionRecord) -> impl Future<Output = Result<()>> + Send {
        self.deref().insert(record)
    }

    fn records_for(&self, date: NaiveDate) -> impl Future<Output = Result<Vec<SessionRecord>>> + Send {
        self.deref().records_for(date)
    }

    fn dates(&self) -> impl Future<Output = Result<Vec<NaiveDate>>> + Send {
        self.deref().dates()
    }
}

/// The main realization of [SessionStore]. Keeps one JSON-lines file per day
/// under the record directory, guarded by advisory file locks.
pub struct SessionStoreImpl {
    record_dir: PathBuf,
}

impl SessionStoreImpl {
    pub fn new(record_dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&record_dir)?;

        Ok(Self { record_dir })
    }

    fn record_path(&self, date: NaiveDate) -> PathBuf {
        self.record_dir.join(date_to_record_name(date))
    }

    async fn read_records(&self, path: &Path) -> Result<Vec<SessionRecord>> {
        async fn extract(path: &Path) -> std::result::Result<Vec<SessionRecord>, std::io::Error> {
            debug!("Extracting {path:?}");
            let file = File::open(path).await?;
            file.lock_shared()?;
            let buffer = BufReader::new(file);
            let mut lines = buffer.lines();
            let mut records = vec![];
            while let Ok(Some(v)) = lines.next_line().await {
                match serde_json::from_str::<SessionRecord>(&v) {
                    Ok(v) => records.push(v),
                    Err(e) => {
                        // ignore illegal values. Might happen after shutdowns
                        warn!(
                            "During parsing in path {:?} found illegal json string {}:  {e}",
                            path, &v
                        )
                    }
                }
            }

            lines.into_inner().into_inner().unlock_async().await?;

            Ok(records)
        }

        match extract(path).await {
            Ok(s) => Ok(s),
            Err(e) => {
                if e.kind() == ErrorKind::NotFound {
                    Ok(vec![])
                } else {
                    Err(e)?
                }
            }
        }
    }
}

impl SessionStore for SessionStoreImpl {
    async fn insert(&self, record: SessionRecord) -> Result<()> {
        let path = self.record_path(record.date);

        let mut file = File::options()
            .append(true)
            .create(true)
            .open(path)
            .await?;

        let mut buffer = serde_json::to_vec(&record)?;
        buffer.push(b'\n');

        // Semi-safe acquire-release for a file
        file.lock_exclusive()?;
        let result = async {
            file.write_all(&buffer).await?;
            file.flush().await?;
            Ok(())
        }
        .await;
        file.unlock_async().await?;
        result
    }

    async fn records_for(&self, date: NaiveDate) -> Result<Vec<SessionRecord>> {
        let path = self.record_path(date);
        self.read_records(&path).await
    }

    async fn dates(&self) -> Result<Vec<NaiveDate>> {
        let mut dir = tokio::fs::read_dir(&self.record_dir).await?;
        let mut dates = vec![];
        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name();
            match name.to_str().and_then(record_name_to_date) {
                Some(date) => dates.push(date),
                None => debug!("Skipping non-record entry {name:?}"),
            }
        }
        dates.sort_unstable();
        Ok(dates)
    }
}
