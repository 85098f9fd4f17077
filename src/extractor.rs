//! Seam to the extraction collaborator.
//!
//! All protocol work (site scraping, format negotiation, muxing) belongs to
//! yt-dlp. This module only translates an [`ExtractorOptions`] value into a
//! yt-dlp command line, streams its output back, and hands the final
//! `--dump-single-json` payload to the caller.

use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;

use anyhow::{Result, bail};
use serde_json::Value;

use crate::error::ExtractError;
use crate::interrupt::Interrupt;

pub const DEFAULT_PROGRAM: &str = "yt-dlp";

/// Best video plus best audio, preferring mp4/m4a so the merge is a remux.
pub const BEST_QUALITY_FORMAT: &str =
    "bestvideo[ext=mp4]+bestaudio[ext=m4a]/bestvideo+bestaudio/best";

const PROGRESS_MARKER: &str = "[channel-dl-progress]";
const PROGRESS_TEMPLATE: &str = "download:[channel-dl-progress] %(progress.status)s \
    %(progress.downloaded_bytes)s %(progress.total_bytes)s %(progress.total_bytes_estimate)s";

/// Everything the collaborator needs to know about one call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractorOptions {
    /// Metadata-only enumeration of a playlist; entries are not resolved.
    pub flat: bool,
    pub format: Option<String>,
    pub merge_output_format: Option<String>,
    pub output_template: Option<String>,
    pub quiet: bool,
    /// Keep going past per-entry errors instead of failing the whole call.
    pub ignore_errors: bool,
    pub cookie_file: Option<PathBuf>,
    /// Resolve metadata but write no media.
    pub simulate: bool,
}

/// Byte-count sample emitted while media is being fetched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Progress {
    Downloading {
        downloaded: f64,
        total: Option<f64>,
        estimate: Option<f64>,
    },
    Finished,
}

impl Progress {
    /// Completion in percent, clamped to `0..=100`. `None` when the
    /// collaborator knows neither the exact nor the estimated size.
    pub fn percent(&self) -> Option<f64> {
        match *self {
            Progress::Finished => Some(100.0),
            Progress::Downloading {
                downloaded,
                total,
                estimate,
            } => {
                let total = total.or(estimate).filter(|total| *total > 0.0)?;
                Some((downloaded / total * 100.0).clamp(0.0, 100.0))
            }
        }
    }
}

pub trait Extractor {
    /// Runs one extraction against `url`. Returns `Ok(None)` when the
    /// collaborator finished but produced no information at all.
    fn extract(
        &self,
        url: &str,
        options: &ExtractorOptions,
        on_progress: &mut dyn FnMut(Progress),
    ) -> Result<Option<Value>, ExtractError>;
}

/// [`Extractor`] backed by the `yt-dlp` executable.
#[derive(Debug, Clone)]
pub struct YtDlp {
    program: PathBuf,
    interrupt: Interrupt,
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM)
    }
}

impl YtDlp {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            interrupt: Interrupt::new(),
        }
    }

    /// Shares the operator-interrupt flag so a Ctrl-C during a fetch is
    /// reported as [`ExtractError::Interrupted`] rather than a failure.
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Runs `<program> --version` to fail loudly when yt-dlp is missing.
    pub fn ensure_available(&self) -> Result<()> {
        let status = Command::new(&self.program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(status) if status.success() => Ok(()),
            Ok(_) => bail!(
                "{} is installed but returned a failure status",
                self.program.display()
            ),
            Err(err) => bail!(
                "{} is not installed or not in PATH: {}",
                self.program.display(),
                err
            ),
        }
    }

    fn program_name(&self) -> String {
        self.program.display().to_string()
    }
}

impl Extractor for YtDlp {
    fn extract(
        &self,
        url: &str,
        options: &ExtractorOptions,
        on_progress: &mut dyn FnMut(Progress),
    ) -> Result<Option<Value>, ExtractError> {
        if self.interrupt.is_triggered() {
            return Err(ExtractError::Interrupted);
        }

        let args = command_args(url, options);
        log::debug!("running {} {}", self.program.display(), args.join(" "));

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ExtractError::Spawn {
                program: self.program_name(),
                source,
            })?;

        let (tx, rx) = mpsc::channel();
        let mut readers = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            readers.push(forward_lines(stdout, Stream::Stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(forward_lines(stderr, Stream::Stderr, tx.clone()));
        }
        drop(tx);

        // Lines from both pipes arrive here, so progress callbacks run on the
        // caller's thread.
        let mut payload: Option<String> = None;
        let mut errors = Vec::new();
        for (stream, line) in rx {
            if let Some(progress) = parse_progress_line(&line) {
                on_progress(progress);
                continue;
            }
            let trimmed = line.trim();
            match stream {
                Stream::Stdout if trimmed.starts_with('{') || trimmed == "null" => {
                    payload = Some(trimmed.to_owned());
                }
                Stream::Stderr => {
                    if let Some(message) = trimmed.strip_prefix("ERROR:") {
                        errors.push(message.trim().to_owned());
                    } else if !trimmed.is_empty() {
                        log::debug!("yt-dlp: {trimmed}");
                    }
                }
                Stream::Stdout => {
                    if !trimmed.is_empty() {
                        log::debug!("yt-dlp: {trimmed}");
                    }
                }
            }
        }

        for reader in readers {
            let _ = reader.join();
        }
        let status = child.wait().map_err(|source| ExtractError::Io {
            program: self.program_name(),
            source,
        })?;

        if self.interrupt.is_triggered() {
            return Err(ExtractError::Interrupted);
        }

        let info = match payload {
            Some(raw) => serde_json::from_str::<Value>(&raw)?,
            None => Value::Null,
        };
        let info = (!info.is_null()).then_some(info);

        if !status.success() {
            if options.ignore_errors && info.is_some() {
                log::warn!(
                    "{} exited with {status} but returned metadata; continuing",
                    self.program.display()
                );
                return Ok(info);
            }
            let message = if errors.is_empty() {
                format!("{} exited with {status}", self.program.display())
            } else {
                errors.join("; ")
            };
            return Err(ExtractError::Failed(message));
        }

        Ok(info)
    }
}

/// Translates `options` into yt-dlp flags. `url` always comes last, after
/// `--`, so a URL can never be mistaken for a flag.
pub fn command_args(url: &str, options: &ExtractorOptions) -> Vec<String> {
    let mut args: Vec<String> = vec!["--dump-single-json".into()];

    if options.flat {
        args.push("--flat-playlist".into());
    } else {
        args.push("--no-playlist".into());
        if let Some(format) = &options.format {
            args.extend(["--format".into(), format.clone()]);
        }
        if let Some(merge) = &options.merge_output_format {
            args.extend(["--merge-output-format".into(), merge.clone()]);
        }
        if let Some(template) = &options.output_template {
            args.extend(["--output".into(), template.clone()]);
        }
        args.extend([
            "--newline".into(),
            "--progress".into(),
            "--progress-template".into(),
            PROGRESS_TEMPLATE.into(),
        ]);
        // --dump-single-json implies --simulate unless told otherwise.
        args.push(if options.simulate {
            "--simulate".into()
        } else {
            "--no-simulate".into()
        });
    }

    if options.ignore_errors {
        args.push("--ignore-errors".into());
    }
    if options.quiet {
        args.push("--no-warnings".into());
    } else {
        args.push("--verbose".into());
    }
    if let Some(cookies) = &options.cookie_file {
        args.extend(["--cookies".into(), cookies.to_string_lossy().into_owned()]);
    }

    args.push("--".into());
    args.push(url.to_owned());
    args
}

/// Parses one line rendered from [`PROGRESS_TEMPLATE`]. yt-dlp renders
/// missing fields as `NA`.
pub fn parse_progress_line(line: &str) -> Option<Progress> {
    let rest = line.trim().strip_prefix(PROGRESS_MARKER)?;
    let mut fields = rest.split_whitespace();
    let status = fields.next()?;
    if status == "finished" {
        return Some(Progress::Finished);
    }
    if status != "downloading" {
        return None;
    }

    let number = |field: Option<&str>| field.and_then(|value| value.parse::<f64>().ok());
    let downloaded = number(fields.next()).unwrap_or(0.0);
    let total = number(fields.next());
    let estimate = number(fields.next());

    Some(Progress::Downloading {
        downloaded,
        total,
        estimate,
    })
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

/// Pumps one pipe into `tx` line by line. Invalid UTF-8 is replaced rather
/// than ending the stream early.
fn forward_lines<R>(
    pipe: R,
    stream: Stream,
    tx: mpsc::Sender<(Stream, String)>,
) -> thread::JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut reader = BufReader::new(pipe);
        let mut buffer = Vec::new();
        loop {
            buffer.clear();
            match reader.read_until(b'\n', &mut buffer) {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buffer)
                        .trim_end_matches(['\r', '\n'])
                        .to_owned();
                    if tx.send((stream, line)).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    log::debug!("reading yt-dlp output failed: {err}");
                    break;
                }
            }
        }
    })
}
