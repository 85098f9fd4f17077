#![forbid(unsafe_code)]

//! `download_channel` lists or downloads every video of a YouTube channel.
//!
//! This binary only parses flags, wires the library pieces together and maps
//! their errors onto console labels and exit codes. yt-dlp must be on PATH
//! (or configured through `YTDLP_PATH`).

use anyhow::{Context, Result};
use channel_downloader::config::{EnvConfig, load_config};
use channel_downloader::console::{Console, Terminal};
use channel_downloader::cookies::validate_cookie_file;
use channel_downloader::display::{render_summary, render_video_table};
use channel_downloader::downloader::{DownloadOptions, download_videos};
use channel_downloader::error::{DownloadError, ListingError, ValidationError};
use channel_downloader::extractor::YtDlp;
use channel_downloader::interrupt::Interrupt;
use channel_downloader::lister::list_channel_videos;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

const EXIT_FAILURE: u8 = 1;
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser, Debug)]
#[command(
    name = "download-channel",
    author,
    version,
    about = "Download all videos from a YouTube channel in maximum quality"
)]
struct Cli {
    #[arg(
        long = "config",
        value_name = "PATH",
        global = true,
        help = "Path to an env-style config file"
    )]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List all videos from a channel without downloading.
    List(ListArgs),
    /// Download all videos from a channel in maximum quality.
    Download(DownloadArgs),
}

#[derive(Args, Debug)]
struct CommonArgs {
    #[arg(
        value_name = "CHANNEL_URL",
        help = "Channel or playlist URL (e.g. https://www.youtube.com/@name)"
    )]
    channel_url: String,
    #[arg(
        short = 'c',
        long = "cookie-file",
        value_name = "PATH",
        help = "Netscape format cookie file for authenticated access"
    )]
    cookie_file: Option<PathBuf>,
    #[arg(short = 'v', long = "verbose", help = "Show detailed yt-dlp output")]
    verbose: bool,
}

#[derive(Args, Debug)]
struct ListArgs {
    #[command(flatten)]
    common: CommonArgs,
    #[arg(
        short = 'n',
        long = "max-display",
        value_name = "N",
        help = "Maximum number of videos to show in the table (0 for all)"
    )]
    max_display: Option<usize>,
}

#[derive(Args, Debug)]
struct DownloadArgs {
    #[command(flatten)]
    common: CommonArgs,
    #[arg(
        short = 'o',
        long = "output-dir",
        value_name = "DIR",
        help = "Directory to save downloaded videos (default downloads)"
    )]
    output_dir: Option<PathBuf>,
    #[arg(long = "dry-run", help = "Fetch metadata without downloading any files")]
    dry_run: bool,
    #[arg(
        long = "skip-existing",
        overrides_with = "no_skip_existing",
        help = "Skip videos that are already downloaded (default)"
    )]
    skip_existing: bool,
    #[arg(
        long = "no-skip-existing",
        overrides_with = "skip_existing",
        help = "Download every video even if it was fetched before"
    )]
    no_skip_existing: bool,
}

impl DownloadArgs {
    fn skip_existing(&self) -> bool {
        self.skip_existing || !self.no_skip_existing
    }
}

impl Commands {
    fn verbose(&self) -> bool {
        match self {
            Commands::List(args) => args.common.verbose,
            Commands::Download(args) => args.common.verbose,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let verbose = cli.command.verbose();
    init_logging(verbose);

    let mut console = Terminal::stdout();
    let interrupt = Interrupt::new();
    if let Err(err) = interrupt.listen_for_ctrl_c() {
        log::warn!("Ctrl-C will terminate without cleanup: {err:#}");
    }

    let outcome = load_config(cli.config.as_deref()).and_then(|config| {
        let ytdlp = YtDlp::new(config.ytdlp_program()).with_interrupt(interrupt.clone());
        match &cli.command {
            Commands::List(args) => run_list(args, &config, &ytdlp, &mut console),
            Commands::Download(args) => {
                run_download(args, &config, &ytdlp, &interrupt, &mut console)
            }
        }
    });

    match outcome {
        Ok(code) => code,
        Err(err) => ExitCode::from(report_error(&err, verbose, &mut console)),
    }
}

/// `warn` by default, `debug` for this crate with `--verbose`; `RUST_LOG`
/// overrides both.
fn init_logging(verbose: bool) {
    let default = if verbose {
        "warn,channel_downloader=debug,download_channel=debug"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

fn validated_cookie(
    flag: Option<PathBuf>,
    config: &EnvConfig,
    console: &mut dyn Console,
) -> Result<Option<PathBuf>> {
    let Some(path) = config.cookie_file(flag) else {
        return Ok(None);
    };
    console.info("Validating cookie file...");
    let path = validate_cookie_file(&path)?;
    console.success(&format!("Cookie file validated: {}", path.display()));
    Ok(Some(path))
}

fn run_list(
    args: &ListArgs,
    config: &EnvConfig,
    ytdlp: &YtDlp,
    console: &mut dyn Console,
) -> Result<ExitCode> {
    let common = &args.common;
    let cookie = validated_cookie(common.cookie_file.clone(), config, console)?;
    ytdlp.ensure_available()?;

    let listing = list_channel_videos(
        ytdlp,
        &common.channel_url,
        cookie.as_deref(),
        common.verbose,
        console,
    )?;

    if listing.is_empty() {
        console.warn("No videos found in channel");
        return Ok(ExitCode::SUCCESS);
    }

    let max_rows = match config.max_display(args.max_display) {
        0 => None,
        max => Some(max),
    };
    for line in render_video_table(&listing.videos, max_rows).lines() {
        console.info(line);
    }
    console.info("");
    console.success(&format!("Total videos: {}", listing.len()));
    Ok(ExitCode::SUCCESS)
}

fn run_download(
    args: &DownloadArgs,
    config: &EnvConfig,
    ytdlp: &YtDlp,
    interrupt: &Interrupt,
    console: &mut dyn Console,
) -> Result<ExitCode> {
    let common = &args.common;
    let cookie = validated_cookie(common.cookie_file.clone(), config, console)?;
    ytdlp.ensure_available()?;

    console.info("Fetching channel videos...");
    let listing = list_channel_videos(
        ytdlp,
        &common.channel_url,
        cookie.as_deref(),
        common.verbose,
        console,
    )?;

    if listing.is_empty() {
        console.warn("No videos found in channel");
        return Ok(ExitCode::SUCCESS);
    }
    console.success(&format!("Found {} videos to download", listing.len()));
    console.info("");

    let options = DownloadOptions {
        output_dir: config.output_dir(args.output_dir.clone()),
        cookie_file: cookie,
        dry_run: args.dry_run,
        skip_existing: args.skip_existing(),
        verbose: common.verbose,
        interrupt: interrupt.clone(),
        ..Default::default()
    };
    let stats = download_videos(ytdlp, &listing.videos, &options, console)
        .context("downloading channel videos")?;

    for line in render_summary(&stats).lines() {
        console.info(line);
    }

    if stats.failed > 0 {
        return Ok(ExitCode::from(EXIT_FAILURE));
    }
    Ok(ExitCode::SUCCESS)
}

/// Error categories the operator sees, one label each.
#[derive(Debug, PartialEq, Eq)]
enum Category {
    Validation,
    Listing,
    Download,
    Interrupted,
    Unexpected,
}

fn categorize(err: &anyhow::Error) -> Category {
    for cause in err.chain() {
        if cause.downcast_ref::<ValidationError>().is_some() {
            return Category::Validation;
        }
        if let Some(listing) = cause.downcast_ref::<ListingError>() {
            return match listing {
                ListingError::Interrupted => Category::Interrupted,
                _ => Category::Listing,
            };
        }
        if let Some(download) = cause.downcast_ref::<DownloadError>() {
            return match download {
                DownloadError::Interrupted => Category::Interrupted,
                _ => Category::Download,
            };
        }
    }
    Category::Unexpected
}

fn report_error(err: &anyhow::Error, verbose: bool, console: &mut dyn Console) -> u8 {
    // The typed errors carry the user-facing message; context layers added on
    // the way up are only for the verbose trace.
    let root = err
        .chain()
        .find(|cause| {
            cause.is::<ValidationError>()
                || cause.is::<ListingError>()
                || cause.is::<DownloadError>()
        })
        .map(|cause| cause.to_string())
        .unwrap_or_else(|| format!("{err:#}"));

    match categorize(err) {
        Category::Validation => console.failure(&format!("Cookie validation error: {root}")),
        Category::Listing => console.failure(&format!("Channel listing error: {root}")),
        Category::Download => console.failure(&format!("Download error: {root}")),
        Category::Interrupted => {
            console.warn("\nCancelled by user");
            return EXIT_INTERRUPTED;
        }
        Category::Unexpected => {
            console.failure(&format!("Unexpected error: {root}"));
            if verbose {
                console.failure(&format!("{err:?}"));
            }
        }
    }
    EXIT_FAILURE
}
