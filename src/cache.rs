//! The modification time cache that lets a build skip unchanged scripts.
//!
//! Stored as one `<file name>|<RFC 3339 timestamp>` line per script. Lines
//! that don't parse are dropped on load, which just forces a recompile.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use log::*;
use serde::{Deserialize, Serialize};

use crate::errors::CacheError;

pub const CACHE_FILE_NAME: &str = "meta.txt";

const DELIMITER: u8 = b'|';

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Whole-second modification time.
    pub modified: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(modified: DateTime<Utc>) -> Self {
        let modified = Utc
            .timestamp_opt(modified.timestamp(), 0)
            .single()
            .unwrap_or(modified);
        Self { modified }
    }

    pub fn from_system_time(modified: SystemTime) -> Self {
        Self::new(modified.into())
    }

    pub fn matches(&self, other: &CacheEntry) -> bool {
        self.modified.timestamp() == other.modified.timestamp()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Record {
    file: String,
    modified: String,
}

/// Base file name to last seen modification time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cache {
    entries: BTreeMap<String, CacheEntry>,
}

impl Cache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a cache file, skipping malformed lines.
    pub fn load(path: &Path) -> Result<Self, CacheError> {
        let to_cache_error = |source| CacheError {
            path: path.to_path_buf(),
            source,
        };

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(DELIMITER)
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .from_path(path)
            .map_err(to_cache_error)?;

        let mut cache = Self::new();
        for result in reader.byte_records() {
            let record = match result {
                Ok(record) => record,
                Err(err) if err.is_io_error() => return Err(to_cache_error(err)),
                Err(err) => {
                    debug!("Skipping malformed cache line: {}", err);
                    continue;
                }
            };
            if record.len() != 2 {
                debug!("Skipping malformed cache line: {:?}", record);
                continue;
            }
            let record: Record = match record.deserialize(None) {
                Ok(record) => record,
                Err(err) => {
                    debug!("Skipping malformed cache line: {}", err);
                    continue;
                }
            };
            match DateTime::parse_from_rfc3339(&record.modified) {
                Ok(modified) => {
                    cache.insert(record.file, CacheEntry::new(modified.with_timezone(&Utc)));
                }
                Err(err) => {
                    debug!("Skipping cache entry for {}: {}", record.file, err);
                }
            }
        }

        Ok(cache)
    }

    /// Overwrites `path` with every entry, sorted by file name.
    pub fn save(&self, path: &Path) -> Result<(), CacheError> {
        let to_cache_error = |source| CacheError {
            path: path.to_path_buf(),
            source,
        };

        let mut writer = csv::WriterBuilder::new()
            .delimiter(DELIMITER)
            .has_headers(false)
            .quote_style(csv::QuoteStyle::Never)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_path(path)
            .map_err(to_cache_error)?;

        for (file, entry) in &self.entries {
            writer
                .serialize(Record {
                    file: file.clone(),
                    modified: entry.modified.to_rfc3339_opts(SecondsFormat::Secs, true),
                })
                .map_err(to_cache_error)?;
        }
        writer
            .flush()
            .map_err(|err| to_cache_error(err.into()))
    }

    pub fn get(&self, file: &str) -> Option<&CacheEntry> {
        self.entries.get(file)
    }

    pub fn insert(&mut self, file: impl Into<String>, entry: CacheEntry) -> Option<CacheEntry> {
        self.entries.insert(file.into(), entry)
    }

    pub fn remove(&mut self, file: &str) -> Option<CacheEntry> {
        self.entries.remove(file)
    }

    /// Whether `file` was last seen with the same modification time.
    pub fn is_fresh(&self, file: &str, entry: &CacheEntry) -> bool {
        self.get(file).map_or(false, |cached| cached.matches(entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn at(secs: i64) -> CacheEntry {
        CacheEntry::new(Utc.timestamp_opt(secs, 0).unwrap())
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CACHE_FILE_NAME);

        let mut cache = Cache::new();
        cache.insert("a.oud", at(1_600_000_000));
        cache.insert("b.oud", at(1_700_000_123));
        cache.save(&path).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "a.oud|2020-09-13T12:26:40Z\nb.oud|2023-11-14T22:15:23Z\n"
        );
        assert_eq!(Cache::load(&path).unwrap(), cache);
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CACHE_FILE_NAME);
        fs::write(
            &path,
            "good.oud|2020-09-13T12:26:40Z\n\
             no delimiter here\n\
             bad_time.oud|yesterday\n\
             extra.oud|2020-09-13T12:26:40Z|more\n\
             offset.oud|2020-09-13T14:26:40+02:00\n",
        )
        .unwrap();

        let cache = Cache::load(&path).unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("good.oud"), Some(&at(1_600_000_000)));
        assert_eq!(cache.get("offset.oud"), Some(&at(1_600_000_000)));
    }

    #[test]
    fn test_invalid_utf8_line_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CACHE_FILE_NAME);
        let mut contents = b"good.oud|2020-09-13T12:26:40Z\n".to_vec();
        contents.extend_from_slice(b"bad\xff.oud|2020-09-13T12:26:40Z\n");
        contents.extend_from_slice(b"other.oud|2020-09-13T12:26:41Z\n");
        fs::write(&path, contents).unwrap();

        let cache = Cache::load(&path).unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("good.oud"), Some(&at(1_600_000_000)));
        assert_eq!(cache.get("other.oud"), Some(&at(1_600_000_001)));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Cache::load(&dir.path().join(CACHE_FILE_NAME)).is_err());
    }

    #[test]
    fn test_is_fresh_ignores_subsecond_precision() {
        let mut cache = Cache::new();
        cache.insert("a.oud", at(100));

        let later = Utc.timestamp_opt(100, 999_000_000).unwrap();
        assert!(cache.is_fresh("a.oud", &CacheEntry { modified: later }));
        assert!(!cache.is_fresh("a.oud", &at(101)));
        assert!(!cache.is_fresh("b.oud", &at(100)));
    }
}
