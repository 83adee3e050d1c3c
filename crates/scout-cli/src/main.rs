mod config;
mod logo;

use std::io;
use std::num::NonZeroUsize;
use std::path::PathBuf;

use anyhow::bail;
use clap::{CommandFactory, Parser};
use clap_complete::{generate, Shell};
use scout_crawler::{OnError, Throttle};
use scout_maps::scrape;
use scout_verify::{verify_sheet, Verdict, VerificationResult, VerificationStatus, Verifier};
use tokio::runtime;

use crate::config::AppConfig;

/// Business leads from Google Maps, and email verification
#[derive(Debug, Parser)]
#[command(version)]
pub struct Args {
    /// Optional yaml configuration file with crawler, maps and verify sections
    #[arg(env = "LEADSCOUT_CONFIG", long, global = true)]
    pub config: Option<PathBuf>,
    /// When quiet no logs are outputted
    #[arg(long, short, global = true)]
    pub quiet: bool,
    #[command(subcommand)]
    pub cmd: SubCommand,
}

#[derive(Debug, clap::Subcommand)]
pub enum SubCommand {
    Scrape(ScrapeArgs),
    Verify(VerifyArgs),
    Bulk(BulkArgs),
    History(HistoryArgs),
    Logo(LogoArgs),
    #[command(hide = true)]
    Completion,
}

/// Search Google Maps and write the listings found as CSV
#[derive(Debug, clap::Args)]
pub struct ScrapeArgs {
    /// Search query, usually "<business> in <location>"
    #[arg(long)]
    pub query: Option<String>,
    /// Output CSV file, stdout when absent
    #[arg(long, short)]
    pub output_file: Option<PathBuf>,
    /// Override the file receiving `index/total|query` progress lines
    #[arg(long)]
    pub progress_file: Option<PathBuf>,
    /// Search the query as is, without variations
    #[arg(long)]
    pub no_expand: bool,
    /// Override crawler's maximum concurrent requests
    #[arg(long)]
    pub concurrent_requests: Option<NonZeroUsize>,
    /// Override crawler's user agents with a single one
    #[arg(long)]
    pub user_agent: Option<String>,
    /// Override crawler's download error handling strategy
    #[arg(value_enum, long)]
    pub on_dl_error: Option<OnError>,
    /// Override crawler's scrap error handling strategy
    #[arg(value_enum, long)]
    pub on_scrap_error: Option<OnError>,
    /// Directory receiving screenshots of searches without results
    #[arg(long)]
    pub debug_dir: Option<PathBuf>,
    /// Show the browser window
    #[arg(long)]
    pub headful: bool,
    /// No SIGINT handling, the crawl can't be interrupted gracefully
    #[arg(long)]
    pub no_sigint: bool,
}

impl ScrapeArgs {
    fn apply(&self, conf: &mut AppConfig) {
        if let Some(query) = &self.query {
            conf.maps.query = query.to_string();
        }
        if let Some(output_file) = &self.output_file {
            conf.maps.output_file = Some(output_file.clone());
        }
        if let Some(progress_file) = &self.progress_file {
            conf.maps.progress_file = Some(progress_file.clone());
        }
        if self.no_expand {
            conf.maps.expand_queries = false;
        }
        if let Some(n) = self.concurrent_requests {
            conf.crawler.throttle = Throttle::Concurrent(n);
        }
        if let Some(user_agent) = &self.user_agent {
            conf.crawler.user_agents = vec![user_agent.to_string()];
        }
        if let Some(on_dl_error) = self.on_dl_error {
            conf.crawler.on_dl_error = on_dl_error;
        }
        if let Some(on_scrap_error) = self.on_scrap_error {
            conf.crawler.on_scrap_error = on_scrap_error;
        }
        if let Some(debug_dir) = &self.debug_dir {
            conf.crawler.screenshot_dir = Some(debug_dir.clone());
        }
        if self.headful {
            conf.crawler.browser.headless = false;
        }
        if self.no_sigint {
            conf.crawler.handle_sigint = false;
        }
    }
}

pub fn scrape_maps(args: ScrapeArgs, mut conf: AppConfig) -> anyhow::Result<()> {
    args.apply(&mut conf);
    if let Some(dir) = &conf.crawler.screenshot_dir {
        fs_err::create_dir_all(dir)?;
    }
    let rt = runtime::Builder::new_multi_thread().enable_all().build()?;
    let report = rt.block_on(scrape(&conf.crawler, &conf.maps))?;
    log::info!(
        "Wrote {} listings ({} duplicates dropped) from {} places over {} searches",
        report.written,
        report.dropped,
        report.places,
        report.queries
    );
    Ok(())
}

/// Verify a single email address
#[derive(Debug, clap::Args)]
pub struct VerifyArgs {
    pub email: String,
    /// Override the verification backend base url
    #[arg(long)]
    pub backend_url: Option<String>,
    /// Print the result as json
    #[arg(long)]
    pub json: bool,
}

fn print_result(result: &VerificationResult, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }
    let details = &result.details;
    println!("{}: {}", result.email, result.status);
    println!("  score:      {:.0}%", result.score * 100.0);
    println!("  reason:     {}", result.reason);
    println!("  disposable: {}", details.is_disposable);
    println!("  role based: {}", details.is_role);
    if let Some(smtp) = &details.smtp_check {
        println!("  smtp:       {smtp}");
    }
    if let Some(suggestion) = &details.suggestion {
        println!("  did you mean {suggestion}?");
    }
    if !details.mx_records.is_empty() {
        println!("  mx records: {}", details.mx_records.join(", "));
    }
    Ok(())
}

pub fn verify(args: VerifyArgs, mut conf: AppConfig) -> anyhow::Result<()> {
    if let Some(url) = args.backend_url {
        conf.verify.base_url = url;
    }
    let rt = runtime::Builder::new_multi_thread().enable_all().build()?;
    let verdict = rt.block_on(async {
        let mut verifier = Verifier::new(conf.verify)?;
        verifier.verify_one(&args.email).await
    })?;

    match verdict {
        Verdict::Malformed(e) => bail!("{}: {e}", args.email.trim()),
        Verdict::RateLimited(wait) => {
            bail!("Please wait {:.1}s before verifying again", wait.as_secs_f32())
        }
        Verdict::Cached(result) | Verdict::Verified(result) | Verdict::Demo(result) => {
            print_result(&result, args.json)
        }
    }
}

/// Verify the email column of a CSV file
#[derive(Debug, clap::Args)]
pub struct BulkArgs {
    #[arg(long, short)]
    pub input: PathBuf,
    /// Input rows annotated with the verification results
    #[arg(long, short)]
    pub output: PathBuf,
    /// Column holding the addresses, guessed from the headers when absent
    #[arg(long)]
    pub column: Option<String>,
    /// Override the verification backend base url
    #[arg(long)]
    pub backend_url: Option<String>,
}

pub fn bulk(args: BulkArgs, mut conf: AppConfig) -> anyhow::Result<()> {
    if let Some(url) = args.backend_url {
        conf.verify.base_url = url;
    }
    let rt = runtime::Builder::new_multi_thread().enable_all().build()?;
    let summary = rt.block_on(async {
        let mut verifier = Verifier::new(conf.verify)?;
        verify_sheet(&mut verifier, &args.input, &args.output, args.column.as_deref()).await
    })?;
    println!(
        "Verified {} emails: {} valid, {} invalid, {} risky",
        summary.total, summary.valid, summary.invalid, summary.risky
    );
    Ok(())
}

/// Print past verifications as CSV
#[derive(Debug, clap::Args)]
pub struct HistoryArgs {
    /// Override the verification backend base url
    #[arg(long)]
    pub backend_url: Option<String>,
}

pub fn history(args: HistoryArgs, mut conf: AppConfig) -> anyhow::Result<()> {
    if let Some(url) = args.backend_url {
        conf.verify.base_url = url;
    }
    let rt = runtime::Builder::new_multi_thread().enable_all().build()?;
    let entries = rt.block_on(async {
        let verifier = Verifier::new(conf.verify)?;
        anyhow::Ok(verifier.history().await)
    })?;

    let mut wtr = csv::Writer::from_writer(io::stdout());
    wtr.write_record(["Email", "Status", "Score", "Source", "Date"])?;
    for entry in &entries {
        wtr.write_record([
            entry.email.clone(),
            entry.status.to_string(),
            entry.score.map(|s| format!("{:.0}%", s * 100.0)).unwrap_or_default(),
            entry.source.clone().unwrap_or_default(),
            entry
                .timestamp
                .map(|t| t.format("%d %b, %H:%M").to_string())
                .unwrap_or_default(),
        ])?;
    }
    wtr.flush()?;

    let count = |status: VerificationStatus| entries.iter().filter(|e| e.status == status).count();
    eprintln!(
        "Total: {}, valid: {}, invalid: {}, risky: {}",
        entries.len(),
        count(VerificationStatus::Valid),
        count(VerificationStatus::Invalid),
        count(VerificationStatus::Risky),
    );
    Ok(())
}

/// Make dark-on-light logo artwork white on a transparent background
#[derive(Debug, clap::Args)]
pub struct LogoArgs {
    #[arg(long, short, default_value = "logo.png")]
    pub input: PathBuf,
    #[arg(long, short, default_value = "logo_fixed.png")]
    pub output: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if !args.quiet {
        env_logger::Builder::from_env(
            env_logger::Env::default()
                .default_filter_or("scout_crawler=info,scout_maps=info,scout_verify=info,leadscout=info"),
        )
        .init();
    }

    if let SubCommand::Completion = args.cmd {
        generate(Shell::Bash, &mut Args::command(), "leadscout", &mut io::stdout());
        return Ok(());
    }

    let conf = AppConfig::load(args.config.as_deref())?;
    match args.cmd {
        SubCommand::Scrape(cmd) => scrape_maps(cmd, conf),
        SubCommand::Verify(cmd) => verify(cmd, conf),
        SubCommand::Bulk(cmd) => bulk(cmd, conf),
        SubCommand::History(cmd) => history(cmd, conf),
        SubCommand::Logo(cmd) => logo::whiten_file(&cmd.input, &cmd.output),
        SubCommand::Completion => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn scrape_flags_override_the_file() {
        let args = Args::parse_from([
            "leadscout",
            "scrape",
            "--query",
            "Dentists in Pune",
            "-o",
            "out.csv",
            "--no-expand",
            "--concurrent-requests",
            "4",
            "--on-dl-error",
            "fail",
            "--headful",
            "--no-sigint",
        ]);
        let cmd = match args.cmd {
            SubCommand::Scrape(cmd) => cmd,
            other => panic!("unexpected command: {other:?}"),
        };
        let mut conf = AppConfig::default();
        cmd.apply(&mut conf);

        assert_eq!(conf.maps.query, "Dentists in Pune");
        assert_eq!(conf.maps.output_file, Some(PathBuf::from("out.csv")));
        assert!(!conf.maps.expand_queries);
        assert_eq!(conf.crawler.throttle, Throttle::Concurrent(NonZeroUsize::new(4).unwrap()));
        assert_eq!(conf.crawler.on_dl_error, OnError::Fail);
        assert_eq!(conf.crawler.on_scrap_error, OnError::SkipAndLog);
        assert!(!conf.crawler.browser.headless);
        assert!(!conf.crawler.handle_sigint);
    }

    #[test]
    fn global_flags_after_the_subcommand() {
        let args = Args::parse_from(["leadscout", "verify", "a@b.co", "-q", "--json"]);
        assert!(args.quiet);
        assert!(matches!(args.cmd, SubCommand::Verify(VerifyArgs { json: true, .. })));
    }
}
