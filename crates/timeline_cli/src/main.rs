mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, ValueEnum};
use engine_logging::engine_info;
use timeline_engine::{
    EngineEvent, FetchReport, FetchRequest, FetcherConfig, Platform, ProgressSink,
    TimelineFetcher, DEFAULT_MAX_POSTS,
};

use crate::logging::LogDestination;

#[derive(Parser, Debug)]
#[command(
    name = "timeline-cli",
    about = "Fetch recent posts from a social profile using exported session cookies."
)]
struct Cli {
    #[arg(long, value_enum)]
    platform: PlatformArg,
    /// Username or profile URL, depending on the platform.
    #[arg(long)]
    identifier: String,
    #[arg(long, default_value_t = DEFAULT_MAX_POSTS)]
    max_posts: usize,
    /// Directory holding the per-platform cookie export files.
    #[arg(long, default_value = ".")]
    cookie_dir: PathBuf,
    /// Where page snapshots land when a fetch finds no content.
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    headless: bool,
    /// Chrome debug endpoint to attach to instead of launching a browser.
    #[arg(long)]
    remote: Option<String>,
    /// Print the report as JSON instead of formatted text.
    #[arg(long)]
    json: bool,
    #[arg(long, value_enum, default_value_t = LogArg::Terminal)]
    log: LogArg,
    /// Log scroll rounds and strategy skips too.
    #[arg(long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PlatformArg {
    Twitter,
    Linkedin,
    Instagram,
    Facebook,
}

impl From<PlatformArg> for Platform {
    fn from(arg: PlatformArg) -> Self {
        match arg {
            PlatformArg::Twitter => Platform::Twitter,
            PlatformArg::Linkedin => Platform::LinkedIn,
            PlatformArg::Instagram => Platform::Instagram,
            PlatformArg::Facebook => Platform::Facebook,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogArg {
    Terminal,
    File,
    Both,
}

impl From<LogArg> for LogDestination {
    fn from(arg: LogArg) -> Self {
        match arg {
            LogArg::Terminal => LogDestination::Terminal,
            LogArg::File => LogDestination::File,
            LogArg::Both => LogDestination::Both,
        }
    }
}

/// Forwards stage transitions to the logger so long fetches stay visible.
struct LogProgressSink;

impl ProgressSink for LogProgressSink {
    fn emit(&self, event: EngineEvent) {
        if let EngineEvent::Progress(progress) = event {
            engine_info!(
                "fetch {}: {:?} ({} posts, round {})",
                progress.fetch_id,
                progress.stage,
                progress.posts,
                progress.rounds
            );
        }
    }
}

fn main() -> ExitCode {
    let args = Cli::parse();
    logging::initialize(args.log.into(), args.verbose);

    let mut config = FetcherConfig::default();
    config.cookie_dir = args.cookie_dir.clone();
    if let Some(dir) = args.snapshot_dir.clone() {
        config.snapshot_dir = dir;
    }
    config.browser.headless = args.headless;
    config.browser.remote_debug_url = args.remote.clone();

    let request = FetchRequest::new(args.platform.into(), args.identifier.clone(), args.max_posts);
    let fetcher = TimelineFetcher::new(config);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("Error: could not start async runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(fetcher.fetch(1, &request, &LogProgressSink)) {
        Ok(report) => print_report(&report, args.json),
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn print_report(report: &FetchReport, json: bool) -> ExitCode {
    if json {
        match serde_json::to_string_pretty(report) {
            Ok(rendered) => println!("{rendered}"),
            Err(err) => {
                eprintln!("Error: could not render report: {err}");
                return ExitCode::FAILURE;
            }
        }
        return ExitCode::SUCCESS;
    }

    if let Some(reason) = &report.reason {
        println!("No posts fetched from {}: {reason}", report.platform);
        return ExitCode::SUCCESS;
    }

    println!("Fetched {} post(s) from {}:", report.posts.len(), report.platform);
    for (index, post) in report.posts.iter().enumerate() {
        println!();
        println!("--- Post {} [{}] ---", index + 1, post.timestamp);
        println!("{}", post.text);
    }
    ExitCode::SUCCESS
}
