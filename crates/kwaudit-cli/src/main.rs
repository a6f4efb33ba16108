//! kwaudit - negative keyword conflict auditor
//!
//! ## Commands
//!
//! - `audit`: check every negative in an account export against its positives
//! - `validate`: run the built-in conflict regression cases
//! - `check`: evaluate a single negative/positive pair

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

use kwaudit_core::telemetry::level_for;
use kwaudit_core::{
    conflicts, legacy_conflicts, render_summary_md, run_validation, AccountSnapshot, AuditConfig,
    AuditReport, AuditRunner, DateRange, JsonFileReporter, LogReporter, MatchType,
    MemoryPlatform,
};

#[derive(Parser)]
#[command(name = "kwaudit")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Find negative keywords that block your own positives", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Audit an account export for conflicting negatives
    Audit(AuditArgs),

    /// Run the conflict regression cases
    Validate,

    /// Check whether one negative blocks one positive
    Check {
        /// Negative keyword text
        negative: String,

        /// Positive keyword text
        positive: String,

        /// Negative match type (BROAD, PHRASE, EXACT)
        #[arg(short, long, default_value = "BROAD")]
        match_type: String,
    },
}

#[derive(clap::Args, Debug, Default)]
struct AuditArgs {
    /// Account export (JSON)
    #[arg(short, long, env = "KWAUDIT_SNAPSHOT")]
    snapshot: PathBuf,

    /// TOML config file; flags below override it
    #[arg(short, long, env = "KWAUDIT_CONFIG")]
    config: Option<PathBuf>,

    /// Remove conflicting negatives and write the export back
    #[arg(long, env = "KWAUDIT_LIVE", conflicts_with = "dry_run")]
    live: bool,

    /// Report conflicts without removing anything
    #[arg(long)]
    dry_run: bool,

    /// Stop ingesting positives after this many rows
    #[arg(long, env = "KWAUDIT_MAX_KEYWORDS")]
    max_keywords: Option<u64>,

    /// First day of the positive keyword activity window
    #[arg(long, requires = "to")]
    from: Option<NaiveDate>,

    /// Last day of the positive keyword activity window
    #[arg(long, requires = "from")]
    to: Option<NaiveDate>,

    /// Write audit_report.json / audit_failure.json here
    #[arg(long, env = "KWAUDIT_REPORT_DIR")]
    report_dir: Option<PathBuf>,

    /// Log every negative checked
    #[arg(long)]
    detailed: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Audit(args) => {
            let config = resolve_config(&args)?;
            kwaudit_core::init_tracing(cli.json, level_for(cli.verbose, config.detailed_logging));
            let report = cmd_audit(&args, config).await?;
            println!("{}", render_summary_md(&report));
            Ok(())
        }
        Commands::Validate => {
            kwaudit_core::init_tracing(cli.json, level_for(cli.verbose, false));
            cmd_validate()
        }
        Commands::Check {
            negative,
            positive,
            match_type,
        } => {
            kwaudit_core::init_tracing(cli.json, level_for(cli.verbose, false));
            cmd_check(&negative, &positive, &match_type);
            Ok(())
        }
    }
}

/// Config file (or defaults) with command-line overrides applied.
fn resolve_config(args: &AuditArgs) -> Result<AuditConfig> {
    let mut config = match &args.config {
        Some(path) => AuditConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load config {:?}", path))?,
        None => AuditConfig::default(),
    };

    if args.live {
        config.dry_run = false;
    }
    if args.dry_run {
        config.dry_run = true;
    }
    if let Some(cap) = args.max_keywords {
        config.max_keywords_to_process = cap;
    }
    match (args.from, args.to) {
        (Some(start), Some(end)) => config.date_range = Some(DateRange { start, end }),
        (None, None) => {}
        _ => bail!("--from and --to must be given together"),
    }
    if args.detailed {
        config.detailed_logging = true;
    }

    config.validate()?;
    Ok(config)
}

async fn cmd_audit(args: &AuditArgs, config: AuditConfig) -> Result<AuditReport> {
    let account = AccountSnapshot::load(&args.snapshot)
        .with_context(|| format!("Failed to load account export {:?}", args.snapshot))?;
    info!(
        positives = account.positives.len(),
        negatives = account.negative_count(),
        "loaded account export"
    );

    let platform = MemoryPlatform::new(account);
    let dry_run = config.dry_run;
    let runner = AuditRunner::new(&platform, config)?;

    let outcome = match &args.report_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create report dir {:?}", dir))?;
            runner.run(&JsonFileReporter::new(dir)).await
        }
        None => runner.run(&LogReporter).await,
    };

    // Removals made before a failure are not rolled back, so persist them either way.
    if !dry_run {
        persist(&platform, &args.snapshot)?;
    }

    Ok(outcome?)
}

fn persist(platform: &MemoryPlatform, path: &Path) -> Result<()> {
    let removed = platform.removed().len();
    if removed == 0 {
        return Ok(());
    }
    platform
        .snapshot()
        .save(path)
        .with_context(|| format!("Failed to write account export {:?}", path))?;
    info!(removed, path = ?path, "account export updated");
    Ok(())
}

fn cmd_validate() -> Result<()> {
    let report = run_validation();

    for outcome in &report.outcomes {
        let case = &outcome.case;
        println!(
            "{}  {:<18} [{}] vs {:<32} expected={} actual={}  {}",
            if outcome.passed { "PASS" } else { "FAIL" },
            format!("'{}'", case.negative_text),
            case.negative_match_type,
            format!("'{}'", case.positive_text),
            case.expected,
            outcome.actual,
            case.description
        );
    }
    println!();
    println!("{}/{} cases passed", report.passed, report.total);

    if !report.all_passed() {
        bail!("{} of {} validation cases failed", report.failed, report.total);
    }
    Ok(())
}

fn cmd_check(negative: &str, positive: &str, match_type: &str) {
    let match_type = MatchType::parse(match_type);
    let blocked = conflicts(negative, &match_type, positive, &MatchType::Broad);
    let legacy = legacy_conflicts(negative, &match_type, positive);

    println!(
        "'{}' [{}] vs '{}': {}",
        negative,
        match_type,
        positive,
        if blocked { "CONFLICT" } else { "no conflict" }
    );
    if legacy && !blocked {
        println!("  (substring matching would have flagged this: false positive avoided)");
    }
}
