//! Output sink handed to every component that talks to the operator.
//!
//! Components never print directly. The binary passes a [`Terminal`]; tests
//! pass a [`Transcript`] and assert on what was said.

use std::io::{self, Write};

/// Category of a console line. The terminal renders each with its own marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Info,
    Success,
    Warning,
    Skipped,
    Failure,
}

impl Status {
    fn marker(self) -> &'static str {
        match self {
            Status::Info => "",
            Status::Success => "✓ ",
            Status::Warning => "",
            Status::Skipped => "⊘ ",
            Status::Failure => "✗ ",
        }
    }
}

pub trait Console {
    fn say(&mut self, status: Status, message: &str);

    /// Percentage of the current fetch, already clamped to `0..=100`.
    fn progress(&mut self, percent: f64);

    /// Closes the progress line opened by [`Console::progress`], if any.
    fn finish_progress(&mut self);

    fn info(&mut self, message: &str) {
        self.say(Status::Info, message);
    }

    fn success(&mut self, message: &str) {
        self.say(Status::Success, message);
    }

    fn warn(&mut self, message: &str) {
        self.say(Status::Warning, message);
    }

    fn failure(&mut self, message: &str) {
        self.say(Status::Failure, message);
    }
}

const BAR_WIDTH: usize = 30;

/// Writes to any `io::Write`, redrawing progress in place with `\r`.
pub struct Terminal<W: Write> {
    out: W,
    progress_open: bool,
}

impl Terminal<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> Terminal<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            progress_open: false,
        }
    }

    // Console output is best effort: a closed stdout must not abort a download.
    fn write_line(&mut self, line: &str) {
        if let Err(err) = writeln!(self.out, "{line}") {
            log::debug!("console write failed: {err}");
        }
    }

    fn write_progress(&mut self, frame: &str) {
        if let Err(err) = write!(self.out, "{frame}").and_then(|()| self.out.flush()) {
            log::debug!("console write failed: {err}");
        }
    }
}

impl<W: Write> Console for Terminal<W> {
    fn say(&mut self, status: Status, message: &str) {
        self.finish_progress();
        let line = format!("{}{}", status.marker(), message);
        self.write_line(&line);
    }

    fn progress(&mut self, percent: f64) {
        let filled = ((percent / 100.0) * BAR_WIDTH as f64).round() as usize;
        let filled = filled.min(BAR_WIDTH);
        let bar = format!("{}{}", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled));
        self.write_progress(&format!("\r  Downloading... [{bar}] {percent:5.1}%"));
        self.progress_open = true;
    }

    fn finish_progress(&mut self) {
        if self.progress_open {
            self.progress_open = false;
            self.write_line("");
        }
    }
}

/// Records everything said to it. Used by tests and by callers that want to
/// render output themselves.
#[derive(Debug, Default)]
pub struct Transcript {
    pub lines: Vec<(Status, String)>,
    pub progress: Vec<f64>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|(_, line)| line.contains(needle))
    }

    pub fn count(&self, status: Status) -> usize {
        self.lines.iter().filter(|(s, _)| *s == status).count()
    }
}

impl Console for Transcript {
    fn say(&mut self, status: Status, message: &str) {
        self.lines.push((status, message.to_owned()));
    }

    fn progress(&mut self, percent: f64) {
        self.progress.push(percent);
    }

    fn finish_progress(&mut self) {}
}
