use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, anyhow};
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

use football_etl::api_football;
use football_etl::backoff::ThreadSleeper;
use football_etl::combine;
use football_etl::config::{self, ApiFootballConfig, ErrorPolicy, FootballDataConfig};
use football_etl::extract::{self, ExtractSummary};
use football_etl::http_client::http_client;
use football_etl::seasons::SeasonSpan;
use football_etl::storage;

#[derive(Debug, Parser)]
#[command(name = "football_etl", about = "Extract football matches into raw JSON and CSV")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch a competition from football-data.org, season by season.
    Extract(ExtractArgs),
    /// Fetch league fixtures from api-football into per-season CSVs.
    ApiFootball(ApiFootballArgs),
    /// Concatenate per-season CSVs into combined files.
    Combine(CombineArgs),
    /// Rebuild processed CSVs from raw JSON already on disk.
    Reflatten(ReflattenArgs),
}

#[derive(Debug, Args)]
struct FetchArgs {
    #[arg(long, default_value = "abort", value_parser = parse_error_policy)]
    on_error: ErrorPolicy,
    #[arg(long, default_value_t = 5)]
    max_retries: u32,
    #[arg(long, default_value_t = 6)]
    pacing_secs: u64,
    #[arg(long, default_value_t = 600)]
    max_backoff_secs: u64,
    #[arg(long, default_value_t = 0)]
    jitter_secs: u64,
}

#[derive(Debug, Args)]
struct ExtractArgs {
    /// Competition code (e.g., PL, PD, SA, BL1, FL1)
    #[arg(long, default_value = "PL")]
    competition: String,
    /// How many seasons back to include (besides current)
    #[arg(long, default_value_t = 5)]
    seasons_back: u32,
    #[arg(long, default_value = "true", action = ArgAction::Set, value_parser = parse_truthy_arg)]
    include_current: bool,
    #[arg(long, default_value = "legacy", value_parser = parse_season_span)]
    season_span: SeasonSpan,
    /// Where to save raw JSON
    #[arg(long, default_value = "data/raw")]
    raw_dir: PathBuf,
    /// Where to save processed CSV
    #[arg(long, default_value = "data/processed")]
    processed_dir: PathBuf,
    #[command(flatten)]
    fetch: FetchArgs,
}

#[derive(Debug, Args)]
struct ApiFootballArgs {
    #[arg(long, default_value_t = 39)]
    league: u32,
    /// Directory name for the league under `api-football/`
    #[arg(long, default_value = "PL")]
    code: String,
    #[arg(long, default_value_t = 2015)]
    start_season: i32,
    #[arg(long, default_value_t = 2025)]
    end_season: i32,
    #[arg(long, default_value = "data/raw")]
    raw_dir: PathBuf,
    #[command(flatten)]
    fetch: FetchArgs,
}

#[derive(Debug, Args)]
struct CombineArgs {
    #[arg(long, default_value = "data/raw/api-football/PL")]
    api_dir: PathBuf,
    #[arg(long, default_value = "data/processed/football-data/PL")]
    fd_dir: PathBuf,
    #[arg(long, default_value = "data/processed/football-data/PL/combined")]
    out_dir: PathBuf,
}

#[derive(Debug, Args)]
struct ReflattenArgs {
    #[arg(long, default_value = "PL")]
    competition: String,
    #[arg(long, default_value = "data/raw")]
    raw_dir: PathBuf,
    #[arg(long, default_value = "data/processed")]
    processed_dir: PathBuf,
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    match Cli::parse().command {
        Command::Extract(args) => run_extract(args),
        Command::ApiFootball(args) => run_api_football(args),
        Command::Combine(args) => run_combine(args),
        Command::Reflatten(args) => run_reflatten(args),
    }
}

fn run_extract(args: ExtractArgs) -> Result<()> {
    storage::ensure_dirs(&[args.raw_dir.as_path(), args.processed_dir.as_path()])?;
    let mut cfg = FootballDataConfig::from_env()?;
    cfg.competition = args.competition;
    cfg.raw_dir = args.raw_dir;
    cfg.processed_dir = args.processed_dir;
    cfg.seasons.last_n_back = args.seasons_back;
    cfg.seasons.include_current = args.include_current;
    cfg.seasons.span = args.season_span;
    cfg.pacing = Duration::from_secs(args.fetch.pacing_secs);
    cfg.on_error = args.fetch.on_error;
    apply_backoff_args(&mut cfg.backoff, &args.fetch);

    let years = extract::season_years_for(&cfg);
    let summary = extract::run_football_data(&cfg, http_client()?, &ThreadSleeper, &years)?;

    println!("football-data.org extract complete ({})", cfg.competition);
    print_summary(&summary);
    Ok(())
}

fn run_api_football(args: ApiFootballArgs) -> Result<()> {
    if args.end_season < args.start_season {
        return Err(anyhow!(
            "end season {} is before start season {}",
            args.end_season,
            args.start_season
        ));
    }
    storage::ensure_dirs(&[args.raw_dir.as_path()])?;

    let mut cfg = ApiFootballConfig::from_env();
    cfg.league_id = args.league;
    cfg.code = args.code;
    cfg.start_season = args.start_season;
    cfg.end_season = args.end_season;
    cfg.raw_dir = args.raw_dir;
    cfg.pacing = Duration::from_secs(args.fetch.pacing_secs);
    cfg.on_error = args.fetch.on_error;
    apply_backoff_args(&mut cfg.backoff, &args.fetch);

    let summary = api_football::run_api_football(&cfg, http_client()?, &ThreadSleeper)?;

    println!("api-football extract complete (league {})", cfg.league_id);
    print_summary(&summary);
    Ok(())
}

fn run_combine(args: CombineArgs) -> Result<()> {
    storage::ensure_dirs(&[args.out_dir.as_path()])?;
    let groups = combine::default_groups(&args.api_dir, &args.fd_dir, &args.out_dir);
    let summaries = combine::combine_all(&groups)?;
    if summaries.is_empty() {
        println!("Nothing to combine");
    }
    for s in summaries {
        println!(
            "{} combined CSV saved ({} files, {} rows) -> {}",
            s.name,
            s.files,
            s.rows,
            s.output.display()
        );
    }
    Ok(())
}

fn run_reflatten(args: ReflattenArgs) -> Result<()> {
    let summary =
        extract::reflatten_from_raw(&args.raw_dir, &args.processed_dir, &args.competition)?;
    info!(competition = %args.competition, "reflatten finished");
    println!("Rebuilt processed CSVs ({})", args.competition);
    print_summary(&summary);
    Ok(())
}

fn apply_backoff_args(backoff: &mut football_etl::backoff::BackoffPolicy, fetch: &FetchArgs) {
    backoff.max_retries = fetch.max_retries;
    backoff.max_delay = Duration::from_secs(fetch.max_backoff_secs);
    backoff.jitter = Duration::from_secs(fetch.jitter_secs);
}

fn print_summary(summary: &ExtractSummary) {
    println!(
        "Seasons: {}/{}",
        summary.seasons_succeeded, summary.seasons_total
    );
    println!("Total rows across seasons: {}", summary.rows_total);
    println!("Files written: {}", summary.files_written.len());
    if !summary.errors.is_empty() {
        println!("Errors: {}", summary.errors.len());
        for err in summary.errors.iter().take(8) {
            println!(" - {err}");
        }
    }
}

fn parse_truthy_arg(raw: &str) -> Result<bool, String> {
    Ok(config::parse_truthy(raw))
}

fn parse_error_policy(raw: &str) -> Result<ErrorPolicy, String> {
    ErrorPolicy::parse(raw).ok_or_else(|| format!("expected abort or skip, got {raw:?}"))
}

fn parse_season_span(raw: &str) -> Result<SeasonSpan, String> {
    SeasonSpan::parse(raw).ok_or_else(|| format!("expected legacy or descending, got {raw:?}"))
}
