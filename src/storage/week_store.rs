use std::{io::ErrorKind, io::SeekFrom, path::PathBuf};

use anyhow::{Context, Result};
use fs4::tokio::AsyncFileExt;
use futures::{stream, StreamExt};
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt},
};
use tracing::{debug, warn};

use super::store::{merge_into, StoreSnapshot, TimeStore, WeekRecord};

/// The main realization of [TimeStore]. Keeps one json file per week key in a
/// record directory. Merges take an exclusive lock on the week file, so
/// concurrent closes targeting the same week serialize instead of losing
/// updates.
pub struct WeekStore {
    record_dir: PathBuf,
}

impl WeekStore {
    pub fn new(record_dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&record_dir)?;

        Ok(Self { record_dir })
    }

    fn week_path(&self, week_key: &str) -> PathBuf {
        self.record_dir.join(format!("{week_key}.json"))
    }

    async fn list_weeks(&self) -> Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.record_dir).await?;
        let mut keys = vec![];
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(key) = name.strip_suffix(".json") {
                if key.starts_with("week_") {
                    keys.push(key.to_owned());
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    async fn read_record(path: PathBuf) -> Result<Option<WeekRecord>> {
        debug!("Extracting {path:?}");
        let mut file = match File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        file.lock_shared()?;
        let mut contents = String::new();
        let read_result = file.read_to_string(&mut contents).await;
        file.unlock_async().await?;
        read_result?;

        Ok(Some(parse_record(&contents, &path)?))
    }

    async fn write_record(&self, week_key: &str, record: &WeekRecord) -> Result<()> {
        let mut file = File::options()
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.week_path(week_key))
            .await?;
        file.lock_exclusive()?;
        let result = overwrite_with(&mut file, record).await;
        file.unlock_async().await?;
        result
    }
}

impl TimeStore for WeekStore {
    async fn get(&self, keys: &[String]) -> Result<StoreSnapshot> {
        let mut snapshot = StoreSnapshot::new();
        for key in keys {
            match Self::read_record(self.week_path(key)).await {
                Ok(Some(record)) => {
                    snapshot.insert(key.clone(), record);
                }
                Ok(None) => {}
                Err(e) => warn!("Skipping unreadable record for {key}: {e}"),
            }
        }
        Ok(snapshot)
    }

    async fn get_all(&self) -> Result<StoreSnapshot> {
        let keys = self.list_weeks().await?;

        let records = stream::iter(keys.into_iter().map(|key| {
            let path = self.week_path(&key);
            async move { (key, Self::read_record(path).await) }
        }))
        .buffered(4)
        .collect::<Vec<_>>()
        .await;

        let mut snapshot = StoreSnapshot::new();
        for (key, record) in records {
            match record {
                Ok(Some(record)) => {
                    snapshot.insert(key, record);
                }
                Ok(None) => {}
                Err(e) => warn!("Skipping unreadable record for {key}: {e}"),
            }
        }
        Ok(snapshot)
    }

    async fn set(&self, records: StoreSnapshot) -> Result<()> {
        for (key, record) in &records {
            self.write_record(key, record).await?;
        }
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        for key in self.list_weeks().await? {
            tokio::fs::remove_file(self.week_path(&key)).await?;
        }
        Ok(())
    }

    async fn merge(&self, week_key: &str, date_key: &str, domain: &str, millis: u64) -> Result<()> {
        let mut file = File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.week_path(week_key))
            .await?;
        // Semi-safe acquire-release for a file
        file.lock_exclusive()?;
        let result = merge_with_file(&mut file, date_key, domain, millis).await;
        file.unlock_async().await?;
        result
    }
}

fn parse_record(contents: &str, path: &std::path::Path) -> Result<WeekRecord> {
    if contents.trim().is_empty() {
        return Ok(WeekRecord::default());
    }
    serde_json::from_str(contents).with_context(|| format!("Record file {path:?} is corrupted"))
}

async fn merge_with_file(file: &mut File, date_key: &str, domain: &str, millis: u64) -> Result<()> {
    let mut contents = String::new();
    file.read_to_string(&mut contents).await?;

    // A corrupted record aborts the merge. Historical totals are never
    // overwritten with a fresh record.
    let mut record = if contents.trim().is_empty() {
        WeekRecord::default()
    } else {
        serde_json::from_str(&contents).context("Record file is corrupted, refusing to merge")?
    };

    merge_into(&mut record, date_key, domain, millis);

    overwrite_with(file, &record).await
}

async fn overwrite_with(file: &mut File, record: &WeekRecord) -> Result<()> {
    let buffer = serde_json::to_vec(record)?;
    file.seek(SeekFrom::Start(0)).await?;
    file.set_len(0).await?;
    file.write_all(&buffer).await?;
    file.flush().await?;
    Ok(())
}
