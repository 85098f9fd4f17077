//! Append-only CSV ledger of completed downloads.
//!
//! The ledger doubles as resume state: every `video_id` in it is skipped on
//! the next run. Rows are never rewritten, and the header is written only
//! when the file is new or empty.

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use csv::{ReaderBuilder, Writer, WriterBuilder};
use serde::Serialize;
use serde_json::Value;

use crate::error::LedgerError;

pub const LEDGER_FILE: &str = "videos_metadata.csv";

pub const LEDGER_COLUMNS: [&str; 18] = [
    "video_id",
    "title",
    "description",
    "upload_date",
    "duration",
    "view_count",
    "like_count",
    "channel",
    "channel_id",
    "uploader",
    "thumbnail",
    "width",
    "height",
    "fps",
    "video_codec",
    "audio_codec",
    "filesize",
    "download_timestamp",
];

/// One ledger row. Field order matches [`LEDGER_COLUMNS`]; missing metadata
/// is stored as an empty string.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LedgerEntry {
    pub video_id: String,
    pub title: String,
    pub description: String,
    pub upload_date: String,
    pub duration: String,
    pub view_count: String,
    pub like_count: String,
    pub channel: String,
    pub channel_id: String,
    pub uploader: String,
    pub thumbnail: String,
    pub width: String,
    pub height: String,
    pub fps: String,
    pub video_codec: String,
    pub audio_codec: String,
    pub filesize: String,
    pub download_timestamp: String,
}

impl LedgerEntry {
    /// Maps the extractor's full metadata onto the fixed schema.
    pub fn from_info(info: &Value, fallback_id: &str, downloaded_at: DateTime<Utc>) -> Self {
        let field = |key: &str| cell(info.get(key));
        let video_id = info
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .unwrap_or(fallback_id)
            .to_owned();
        let filesize = match info.get("filesize") {
            Some(value) if !value.is_null() => cell(Some(value)),
            _ => field("filesize_approx"),
        };

        Self {
            video_id,
            title: field("title"),
            description: field("description"),
            upload_date: field("upload_date"),
            duration: field("duration"),
            view_count: field("view_count"),
            like_count: field("like_count"),
            channel: field("channel"),
            channel_id: field("channel_id"),
            uploader: field("uploader"),
            thumbnail: field("thumbnail"),
            width: field("width"),
            height: field("height"),
            fps: field("fps"),
            video_codec: field("vcodec"),
            audio_codec: field("acodec"),
            filesize,
            download_timestamp: downloaded_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

/// Open handle on the ledger for the duration of a run.
pub struct Ledger {
    path: PathBuf,
    writer: Writer<File>,
}

impl Ledger {
    /// Opens `path` for appending, writing the header row if the file is new
    /// or currently empty.
    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        let needs_header = fs::metadata(path).map(|meta| meta.len() == 0).unwrap_or(true);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| LedgerError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        if needs_header {
            writer.write_record(LEDGER_COLUMNS)?;
            writer.flush().map_err(|source| LedgerError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        }

        Ok(Self {
            path: path.to_path_buf(),
            writer,
        })
    }

    /// Appends one row and flushes it straight to disk.
    pub fn append(&mut self, entry: &LedgerEntry) -> Result<(), LedgerError> {
        self.writer.serialize(entry)?;
        self.writer.flush().map_err(|source| LedgerError::Io {
            path: self.path.clone(),
            source,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Collects every `video_id` recorded in the ledger. A missing file is an
/// empty set.
pub fn load_ids(path: &Path) -> Result<HashSet<String>, LedgerError> {
    if !path.exists() {
        return Ok(HashSet::new());
    }

    let mut reader = ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = reader.headers()?.clone();
    if headers.is_empty() {
        return Ok(HashSet::new());
    }
    let column = headers
        .iter()
        .position(|name| name == "video_id")
        .ok_or_else(|| LedgerError::MissingIdColumn(path.to_path_buf()))?;

    let mut ids = HashSet::new();
    for record in reader.records() {
        let record = record?;
        if let Some(id) = record.get(column)
            && !id.is_empty()
        {
            ids.insert(id.to_owned());
        }
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use chrono::TimeZone;
    use serde_json::json;
    use tempfile::tempdir;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap()
    }

    fn header_count(path: &Path) -> Result<usize> {
        let text = fs::read_to_string(path)?;
        Ok(text.lines().filter(|line| line.starts_with("video_id,")).count())
    }

    #[test]
    fn entry_maps_fields_and_blanks_missing_ones() {
        let info = json!({
            "id": "abc",
            "title": "Title, with comma",
            "duration": 125,
            "view_count": 10,
            "fps": 29.97,
            "vcodec": "avc1.640028",
            "acodec": "mp4a.40.2",
            "filesize": null,
            "filesize_approx": 2048,
            "like_count": null
        });
        let entry = LedgerEntry::from_info(&info, "fallback", fixed_time());
        assert_eq!(entry.video_id, "abc");
        assert_eq!(entry.duration, "125");
        assert_eq!(entry.fps, "29.97");
        assert_eq!(entry.video_codec, "avc1.640028");
        assert_eq!(entry.filesize, "2048");
        assert_eq!(entry.like_count, "");
        assert_eq!(entry.description, "");
        assert_eq!(entry.download_timestamp, "2024-05-06T07:08:09Z");
    }

    #[test]
    fn entry_falls_back_to_listing_id() {
        let entry = LedgerEntry::from_info(&json!({"title": "t"}), "listed", fixed_time());
        assert_eq!(entry.video_id, "listed");
    }

    #[test]
    fn new_ledger_gets_one_header_and_rows_round_trip_ids() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(LEDGER_FILE);
        {
            let mut ledger = Ledger::open(&path)?;
            ledger.append(&LedgerEntry::from_info(&json!({"id": "a"}), "a", fixed_time()))?;
        }
        {
            let mut ledger = Ledger::open(&path)?;
            let info = json!({"id": "b", "description": "line one\nline two"});
            ledger.append(&LedgerEntry::from_info(&info, "b", fixed_time()))?;
        }

        assert_eq!(header_count(&path)?, 1);
        let ids = load_ids(&path)?;
        assert_eq!(ids, HashSet::from(["a".to_string(), "b".to_string()]));
        Ok(())
    }

    #[test]
    fn empty_existing_file_gets_a_header() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(LEDGER_FILE);
        fs::write(&path, "")?;
        Ledger::open(&path)?;
        let text = fs::read_to_string(&path)?;
        assert_eq!(text.trim_end(), LEDGER_COLUMNS.join(","));
        Ok(())
    }

    #[test]
    fn append_is_visible_before_the_ledger_is_dropped() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(LEDGER_FILE);
        let mut ledger = Ledger::open(&path)?;
        ledger.append(&LedgerEntry::from_info(&json!({"id": "live"}), "live", fixed_time()))?;
        assert!(load_ids(&path)?.contains("live"));
        drop(ledger);
        Ok(())
    }

    #[test]
    fn load_ids_handles_missing_and_foreign_files() -> Result<()> {
        let dir = tempdir()?;
        assert!(load_ids(&dir.path().join("absent.csv"))?.is_empty());

        let foreign = dir.path().join("foreign.csv");
        fs::write(&foreign, "name,size\nx,1\n")?;
        assert!(matches!(
            load_ids(&foreign),
            Err(LedgerError::MissingIdColumn(_))
        ));
        Ok(())
    }
}
