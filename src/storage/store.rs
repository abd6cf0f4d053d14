use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::challenge::{CandidateImage, CandidateIndex, Candidates};
use crate::constants::{LOCK_FILENAME, METADATA_FILENAME, STATS_FILENAME, candidate_filename};

use super::error::{StorageError, StorageResult};
use super::lock::StoreLock;
use super::model::{Attempt, AttemptId, LabelUpdate, NewAttempt, Partition};
use super::stats::LearningStats;

const TEMP_SUFFIX: &str = "tmp";
const TEMP_DIR_PREFIX: &str = ".tmp-";

/// Durable, append-only record of every attempt.
///
/// Layout: `<root>/{successes,failures}/<id>/button_{1..4}.png + metadata.json`,
/// plus `<root>/learning_stats.json` and `<root>/.lock`.
#[derive(Debug)]
pub struct AttemptStore {
    root: PathBuf,
    lock: StoreLock,
}

impl AttemptStore {
    /// Opens (and creates if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        for partition in Partition::all() {
            let path = root.join(partition.dir_name());
            fs::create_dir_all(&path)
                .map_err(|_| StorageError::StorageUnavailable { path: path.clone() })?;
        }
        debug!(root = %root.display(), "Attempt store opened");
        Ok(Self {
            root,
            lock: StoreLock::default(),
        })
    }

    /// Returns the store root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the directory of `partition`.
    pub fn partition_path(&self, partition: Partition) -> PathBuf {
        self.root.join(partition.dir_name())
    }

    /// Returns the directory of one attempt.
    pub fn attempt_path(&self, id: &AttemptId) -> PathBuf {
        self.partition_path(id.partition()).join(id.as_str())
    }

    fn lock_path(&self) -> PathBuf {
        self.root.join(LOCK_FILENAME)
    }

    fn stats_path(&self) -> PathBuf {
        self.root.join(STATS_FILENAME)
    }

    /// Appends an attempt recorded now; see [`append_at`](Self::append_at).
    pub fn append(&self, attempt: &NewAttempt) -> StorageResult<Attempt> {
        self.append_at(attempt, Utc::now())
    }

    /// Appends an attempt and bumps the attempt counters; returns the stored record.
    ///
    /// The attempt directory is written under a temporary name and renamed into place,
    /// so readers never observe a partial attempt.
    pub fn append_at(&self, attempt: &NewAttempt, recorded_at: DateTime<Utc>) -> StorageResult<Attempt> {
        let record = attempt.to_attempt(recorded_at);
        record.validate()?;

        let _guard = self.lock.acquire(&self.lock_path())?;

        let final_path = self.attempt_path(&record.id);
        if final_path.exists() {
            return Err(StorageError::AlreadyExists {
                id: record.id.to_string(),
            });
        }

        let temp_path = self
            .partition_path(record.partition())
            .join(format!("{}{}", TEMP_DIR_PREFIX, record.id));
        if temp_path.exists() {
            fs::remove_dir_all(&temp_path)?;
        }
        fs::create_dir_all(&temp_path)?;

        for (index, image) in attempt.candidates.iter() {
            write_file_synced(
                &temp_path.join(candidate_filename(usize::from(index.get()))),
                image.as_bytes(),
            )?;
        }
        write_file_synced(
            &temp_path.join(METADATA_FILENAME),
            &serde_json::to_vec_pretty(&record)?,
        )?;

        fs::rename(&temp_path, &final_path)?;

        let mut stats = self.read_stats_file();
        stats.record_attempt(record.succeeded);
        self.write_stats_file(&stats)?;

        info!(
            id = %record.id,
            question = %record.question,
            succeeded = record.succeeded,
            chosen = ?record.chosen_index.map(|c| c.get()),
            "Attempt recorded"
        );
        Ok(record)
    }

    /// Reads every valid attempt of `partition`, sorted by id (oldest first).
    ///
    /// Unreadable or invalid records are skipped with a warning.
    pub fn read_all(&self, partition: Partition) -> StorageResult<Vec<Attempt>> {
        let dir = self.partition_path(partition);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut attempts = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();

            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name.starts_with('.') || !path.is_dir() {
                continue;
            }

            match read_metadata(&path) {
                Ok(attempt) if attempt.id.as_str() != name => {
                    warn!(dir = name, id = %attempt.id, "Attempt id does not match directory, skipping");
                }
                Ok(attempt) if attempt.partition() != partition => {
                    warn!(id = %attempt.id, "Attempt stored in wrong partition, skipping");
                }
                Ok(attempt) => match attempt.validate() {
                    Ok(()) => attempts.push(attempt),
                    Err(e) => warn!(id = %attempt.id, error = %e, "Invalid attempt, skipping"),
                },
                Err(e) => warn!(dir = name, error = %e, "Unreadable attempt metadata, skipping"),
            }
        }

        attempts.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(attempts)
    }

    /// Loads one attempt's metadata.
    pub fn load(&self, id: &AttemptId) -> StorageResult<Attempt> {
        let path = self.attempt_path(id);
        if !path.is_dir() {
            return Err(StorageError::NotFound { id: id.to_string() });
        }
        let attempt = read_metadata(&path)?;
        attempt.validate()?;
        Ok(attempt)
    }

    /// Loads one attempt's candidate images.
    pub fn load_images(&self, id: &AttemptId) -> StorageResult<Candidates> {
        let path = self.attempt_path(id);
        if !path.is_dir() {
            return Err(StorageError::NotFound { id: id.to_string() });
        }

        let mut images = Vec::new();
        for index in CandidateIndex::all() {
            let file = path.join(candidate_filename(usize::from(index.get())));
            let bytes = fs::read(&file).map_err(|e| StorageError::ImageUnreadable {
                id: id.to_string(),
                index: index.get(),
                reason: e.to_string(),
            })?;
            images.push(CandidateImage::new(bytes));
        }

        Candidates::new(images).map_err(|e| StorageError::InvalidRecord {
            id: id.to_string(),
            reason: e.to_string(),
        })
    }

    /// Labels an unlabeled attempt; returns `false` if it already had a label.
    pub fn update_label(&self, id: &AttemptId, update: &LabelUpdate) -> StorageResult<bool> {
        self.update_label_at(id, update, Utc::now())
    }

    /// Labels an unlabeled attempt with an explicit timestamp (first writer wins).
    pub fn update_label_at(
        &self,
        id: &AttemptId,
        update: &LabelUpdate,
        now: DateTime<Utc>,
    ) -> StorageResult<bool> {
        let _guard = self.lock.acquire(&self.lock_path())?;

        let path = self.attempt_path(id);
        if !path.is_dir() {
            return Err(StorageError::NotFound { id: id.to_string() });
        }

        let mut attempt = read_metadata(&path)?;
        if !attempt.apply_label(update, now) {
            debug!(id = %id, "Attempt already labeled, keeping first label");
            return Ok(false);
        }

        write_file_synced(
            &path.join(METADATA_FILENAME),
            &serde_json::to_vec_pretty(&attempt)?,
        )?;

        debug!(
            id = %id,
            correct_answer = update.correct_answer.get(),
            source = %update.source,
            "Attempt labeled"
        );
        Ok(true)
    }

    /// Number of valid attempts in `partition`.
    pub fn count(&self, partition: Partition) -> StorageResult<usize> {
        Ok(self.read_all(partition)?.len())
    }

    /// Loads the persisted counters (defaults if missing or corrupt).
    pub fn load_stats(&self) -> StorageResult<LearningStats> {
        let _guard = self.lock.acquire(&self.lock_path())?;
        Ok(self.read_stats_file())
    }

    /// Overwrites the persisted counters.
    pub fn save_stats(&self, stats: &LearningStats) -> StorageResult<()> {
        let _guard = self.lock.acquire(&self.lock_path())?;
        self.write_stats_file(stats)
    }

    /// Read-modify-writes the counters under the store lock.
    pub fn update_stats<T>(&self, f: impl FnOnce(&mut LearningStats) -> T) -> StorageResult<T> {
        let _guard = self.lock.acquire(&self.lock_path())?;
        let mut stats = self.read_stats_file();
        let result = f(&mut stats);
        self.write_stats_file(&stats)?;
        Ok(result)
    }

    fn read_stats_file(&self) -> LearningStats {
        let path = self.stats_path();
        match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Corrupt learning stats, starting fresh");
                LearningStats::default()
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => LearningStats::default(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unreadable learning stats, starting fresh");
                LearningStats::default()
            }
        }
    }

    fn write_stats_file(&self, stats: &LearningStats) -> StorageResult<()> {
        write_file_synced(&self.stats_path(), &serde_json::to_vec_pretty(stats)?)
    }
}

fn read_metadata(attempt_dir: &Path) -> StorageResult<Attempt> {
    let bytes = fs::read(attempt_dir.join(METADATA_FILENAME))?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Writes `bytes` to a sibling temp file, syncs it, then renames over `path`.
pub(crate) fn write_file_synced(path: &Path, bytes: &[u8]) -> StorageResult<()> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| StorageError::StorageUnavailable {
            path: path.to_path_buf(),
        })?;
    let temp_path = path.with_file_name(format!("{file_name}.{TEMP_SUFFIX}"));

    {
        let mut file = File::create(&temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }

    fs::rename(&temp_path, path)?;
    Ok(())
}
