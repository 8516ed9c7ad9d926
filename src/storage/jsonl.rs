//! Append-only JSONL store
//!
//! One JSON object per line. Every line is independently decodable, so a
//! torn or corrupt line costs only itself: replay logs it and moves on.
//!
//! Write ordering is what makes the store crash-safe: a record is written
//! and synced to disk before its key enters the in-memory index. A crash in
//! between only means the key is rediscovered on the next replay.

use crate::state::PageType;
use crate::storage::traits::{CandidateStore, StoreResult};
use crate::storage::{url_key, StoredRecord};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// What replaying the store file found
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Lines that yielded a dedup key
    pub valid: usize,
    /// Lines that could not be decoded
    pub corrupted: usize,
    /// Valid lines per page-type tag
    pub by_page_type: BTreeMap<String, usize>,
}

/// JSONL-backed candidate store
pub struct JsonlStore {
    path: PathBuf,
    file: File,
    keys: HashSet<String>,
    report: LoadReport,
    /// A failed write left bytes that could not be truncated away
    torn: bool,
}

impl JsonlStore {
    /// Opens the store, creating the file and its directory if needed
    ///
    /// Existing lines are replayed into the dedup index. If the file does
    /// not end with a newline (a write was cut short), one is appended so the
    /// next record starts on a line of its own.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut keys = HashSet::new();
        let report = if path.exists() {
            replay(path, &mut keys)?
        } else {
            LoadReport::default()
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(path)?;

        if has_torn_tail(&mut file)? {
            tracing::warn!("Repairing unterminated last line in {}", path.display());
            file.write_all(b"\n")?;
            file.sync_data()?;
        }

        tracing::info!(
            "Store loaded: {} records indexed ({} corrupted lines) from {}",
            report.valid,
            report.corrupted,
            path.display()
        );

        Ok(Self {
            path: path.to_path_buf(),
            file,
            keys,
            report,
            torn: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Counts gathered while replaying the file at open
    pub fn load_report(&self) -> &LoadReport {
        &self.report
    }

    /// Writes one terminated line and syncs it
    ///
    /// If an earlier failed write left a fragment behind, the line is
    /// prefixed with a newline so it does not merge into that fragment.
    fn write_line(&mut self, line: &[u8]) -> std::io::Result<()> {
        if self.torn {
            self.file.write_all(b"\n")?;
            self.torn = false;
        }
        self.file.write_all(line)?;
        self.file.sync_data()
    }

    /// Drops whatever a failed write left past `len`
    fn discard_partial(&mut self, len: u64) {
        let truncated = self.file.set_len(len).and_then(|()| self.file.sync_data());
        if let Err(e) = truncated {
            tracing::warn!(
                "Could not truncate partial write in {}: {}",
                self.path.display(),
                e
            );
            self.torn = true;
        }
    }
}

impl CandidateStore for JsonlStore {
    fn exists(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    fn append(&mut self, record: &StoredRecord) -> StoreResult<bool> {
        let key = record.dedup_key();
        if self.keys.contains(&key) {
            tracing::debug!("Skipping duplicate record {}", key);
            return Ok(false);
        }

        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        // Durable first, indexed second
        let len = self.file.metadata()?.len();
        if let Err(e) = self.write_line(line.as_bytes()) {
            self.discard_partial(len);
            return Err(e.into());
        }
        self.keys.insert(key);

        Ok(true)
    }

    fn len(&self) -> usize {
        self.keys.len()
    }
}

/// Reads the store file line by line, indexing every decodable record
fn replay(path: &Path, keys: &mut HashSet<String>) -> StoreResult<LoadReport> {
    let reader = BufReader::new(File::open(path)?);
    let mut report = LoadReport::default();

    for (index, line) in reader.split(b'\n').enumerate() {
        let line = line?;
        let line_number = index + 1;

        let text = match std::str::from_utf8(&line) {
            Ok(text) => text.trim(),
            Err(_) => {
                tracing::warn!("Corrupted line {} in {}: not UTF-8", line_number, path.display());
                report.corrupted += 1;
                continue;
            }
        };

        if text.is_empty() {
            continue;
        }

        match record_key(text) {
            Some((key, page_type)) => {
                keys.insert(key);
                report.valid += 1;
                *report.by_page_type.entry(page_type).or_default() += 1;
            }
            None => {
                tracing::warn!("Corrupted line {} in {}, skipping", line_number, path.display());
                report.corrupted += 1;
            }
        }
    }

    Ok(report)
}

/// Extracts the dedup key and page-type tag from one stored line
///
/// Decoding is deliberately loose: any JSON object is accepted, so records
/// written with extra or missing payload fields still deduplicate.
fn record_key(line: &str) -> Option<(String, String)> {
    let value: Value = serde_json::from_str(line).ok()?;
    let object = value.as_object()?;

    let page_type = object
        .get("page_type")
        .and_then(Value::as_str)
        .unwrap_or(PageType::Unknown.as_str())
        .to_string();

    let resume_id = object
        .get("payload")
        .and_then(|payload| payload.get("resume_id"))
        .and_then(|id| match id {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        });

    let key = match resume_id {
        Some(id) => id,
        None => url_key(object.get("url").and_then(Value::as_str).unwrap_or("")),
    };

    Some((key, page_type))
}

/// Returns true if the file is non-empty and its last byte is not a newline
fn has_torn_tail(file: &mut File) -> std::io::Result<bool> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(false);
    }

    let mut last = [0u8; 1];
    file.seek(SeekFrom::Start(len - 1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}
