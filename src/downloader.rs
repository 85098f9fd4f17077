//! Download planner and executor.
//!
//! The plan is the listing minus a skip-set built from the ledger and from
//! media files already on disk. Execution is strictly sequential and
//! fail-fast: the first item that fails stops the run, because extractor
//! failures are usually systemic (expired cookies, rate limiting) and every
//! following item would fail the same way.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::console::{Console, Status};
use crate::error::{DownloadError, ExtractError};
use crate::extractor::{BEST_QUALITY_FORMAT, Extractor, ExtractorOptions, Progress};
use crate::interrupt::Interrupt;
use crate::ledger::{self, LEDGER_FILE, Ledger, LedgerEntry};
use crate::model::VideoRecord;

/// Container every download is muxed into; also the extension probed when
/// looking for media left by an earlier run.
pub const MEDIA_CONTAINER: &str = "mp4";

pub const DEFAULT_OUTPUT_DIR: &str = "downloads";

#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub output_dir: PathBuf,
    pub cookie_file: Option<PathBuf>,
    /// Fetch metadata only; no media is written. Resolved items are still
    /// recorded in the ledger.
    pub dry_run: bool,
    pub skip_existing: bool,
    pub verbose: bool,
    /// Accepted for callers that plan for parallelism; items are always
    /// processed one at a time.
    pub concurrency: usize,
    /// Checked between items so a Ctrl-C during skips still ends the run.
    pub interrupt: Interrupt,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            cookie_file: None,
            dry_run: false,
            skip_existing: true,
            verbose: false,
            concurrency: 1,
            interrupt: Interrupt::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedVideo {
    pub id: String,
    pub title: String,
    pub error: String,
}

/// Outcome of one run. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadStats {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub skipped: usize,
    pub failed_videos: Vec<FailedVideo>,
}

impl DownloadStats {
    fn record_failure(&mut self, video: &VideoRecord, error: String) {
        self.failed += 1;
        self.failed_videos.push(FailedVideo {
            id: video.id.clone(),
            title: video.display_title().to_owned(),
            error,
        });
    }
}

/// Extractor options for fetching one item into `output_dir`.
pub fn fetch_options(options: &DownloadOptions, output_dir: &Path) -> ExtractorOptions {
    let template = output_dir.join("%(id)s.%(ext)s");
    ExtractorOptions {
        flat: false,
        format: Some(BEST_QUALITY_FORMAT.to_owned()),
        merge_output_format: Some(MEDIA_CONTAINER.to_owned()),
        output_template: Some(template.to_string_lossy().into_owned()),
        quiet: !options.verbose,
        ignore_errors: false,
        cookie_file: options.cookie_file.clone(),
        simulate: options.dry_run,
    }
}

/// Downloads `videos` in order and reports what happened.
///
/// Per-item failures end the run but are returned as data in
/// [`DownloadStats`]. Only conditions that prevent the run from starting, and
/// operator interrupts, are returned as errors.
pub fn download_videos(
    extractor: &dyn Extractor,
    videos: &[VideoRecord],
    options: &DownloadOptions,
    console: &mut dyn Console,
) -> Result<DownloadStats, DownloadError> {
    let output_dir = options.output_dir.as_path();
    fs::create_dir_all(output_dir).map_err(|source| DownloadError::OutputDir {
        path: output_dir.to_path_buf(),
        source,
    })?;

    if options.concurrency > 1 {
        log::warn!(
            "concurrency {} requested; downloads run one at a time",
            options.concurrency
        );
    }

    let total = videos.len();
    let mut stats = DownloadStats {
        total,
        ..Default::default()
    };

    if options.dry_run {
        console.warn("DRY RUN MODE - No files will be downloaded");
    }
    let shown_dir = fs::canonicalize(output_dir).unwrap_or_else(|_| output_dir.to_path_buf());
    console.info(&format!(
        "Downloading {} videos to: {}",
        total,
        shown_dir.display()
    ));

    let ledger_path = output_dir.join(LEDGER_FILE);
    let mut done = if options.skip_existing {
        previously_downloaded(&ledger_path, console)
    } else {
        HashSet::new()
    };

    let mut ledger = Ledger::open(&ledger_path)?;

    let fetch = fetch_options(options, output_dir);

    for (index, video) in videos.iter().enumerate() {
        if options.interrupt.is_triggered() {
            console.warn("Download cancelled by user");
            return Err(DownloadError::Interrupted);
        }

        let position = format!("[{}/{}]", index + 1, total);
        let title = video.display_title();

        if options.skip_existing {
            if done.contains(&video.id) {
                console.say(Status::Skipped, &format!("{position} {title}"));
                console.say(Status::Skipped, "Already downloaded - skipping");
                stats.skipped += 1;
                continue;
            }
            if media_path(output_dir, &video.id).exists() {
                console.say(Status::Skipped, &format!("{position} {title}"));
                console.say(Status::Skipped, "File already exists - skipping");
                stats.skipped += 1;
                done.insert(video.id.clone());
                continue;
            }
        }

        console.info(&format!("{position} {title}"));

        let fetched = extractor.extract(&video.watch_url(), &fetch, &mut |progress: Progress| {
            if let Some(percent) = progress.percent() {
                console.progress(percent);
            }
        });
        console.finish_progress();

        let info = match fetched {
            Ok(info) => info,
            Err(ExtractError::Interrupted) => {
                console.warn("Download cancelled by user");
                return Err(DownloadError::Interrupted);
            }
            Err(ExtractError::Failed(message)) => {
                console.failure(&format!("Failed: {message}"));
                console.failure("Stopping due to download error");
                stats.record_failure(video, message);
                break;
            }
            Err(other) => {
                let message = other.to_string();
                console.failure(&format!("Unexpected error: {message}"));
                console.failure("Stopping due to unexpected error");
                stats.record_failure(video, message);
                break;
            }
        };

        if let Some(info) = info.as_ref() {
            let entry = LedgerEntry::from_info(info, &video.id, Utc::now());
            if let Err(err) = ledger.append(&entry) {
                let message = format!("writing {}: {err}", ledger.path().display());
                console.failure(&format!("Unexpected error: {message}"));
                console.failure("Stopping due to unexpected error");
                stats.record_failure(video, message);
                break;
            }
            done.insert(entry.video_id);
        }

        stats.success += 1;
        if options.dry_run {
            console.success("Simulated successfully");
        } else {
            console.success("Downloaded successfully");
        }
    }

    if options.interrupt.is_triggered() {
        console.warn("Download cancelled by user");
        return Err(DownloadError::Interrupted);
    }

    Ok(stats)
}

/// Where the media for `video_id` lands once merged.
pub fn media_path(output_dir: &Path, video_id: &str) -> PathBuf {
    output_dir.join(format!("{video_id}.{MEDIA_CONTAINER}"))
}

fn previously_downloaded(ledger_path: &Path, console: &mut dyn Console) -> HashSet<String> {
    match ledger::load_ids(ledger_path) {
        Ok(ids) => {
            if !ids.is_empty() {
                console.info(&format!(
                    "Found {} already downloaded videos - will skip them",
                    ids.len()
                ));
            }
            ids
        }
        Err(err) => {
            log::warn!("ignoring unreadable ledger {}: {err}", ledger_path.display());
            console.warn(&format!("Warning: Could not read existing CSV: {err}"));
            HashSet::new()
        }
    }
}
