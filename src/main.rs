use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn, LevelFilter};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use tokio::runtime::Runtime;

use crash_agent::cli::{Args, Commands, UploadOpts};
use crash_agent::collectors::default_collectors;
use crash_agent::config::{load_or_create_config, AgentConfig, ReachabilityMode};
use crash_agent::identity::{default_identifier, Resolution};
use crash_agent::packaging::DpkgResolver;
use crash_agent::reachability::{
    AlwaysReachable, NetworkStateMonitor, ReachabilityMonitor, RouteTablePoller,
};
use crash_agent::report::{FieldPolicy, ReportParser};
use crash_agent::sweep::{for_each_report_in_dir, ListingVisitor, UploadVisitor};
use crash_agent::upload::{HttpReportPersister, ReqwestTransport};

fn main() -> Result<()> {
    let args = Args::parse();

    initialize_logging(args.verbose)?;

    match args.command {
        Commands::InitConfig { path } => init_config(&path),
        command => {
            let config = load_or_create_config(args.config.as_deref())?;
            let rt = Runtime::new().context("Failed to create tokio runtime")?;

            match command {
                Commands::Id => print_identity(&config),
                Commands::List { crash_dir, packages } => {
                    rt.block_on(list_reports(&config, crash_dir, packages))
                }
                Commands::Upload(opts) => rt.block_on(upload_reports(&config, opts)),
                Commands::Logs => rt.block_on(print_logs()),
                Commands::InitConfig { .. } => Ok(()),
            }
        }
    }
}

/// Initialize logging with the specified verbosity level
fn initialize_logging(verbose: bool) -> Result<()> {
    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    TermLogger::init(
        log_level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .context("Failed to initialize logger")?;
    Ok(())
}

fn init_config(path: &Path) -> Result<()> {
    info!("Creating default configuration file at {}", path.display());
    AgentConfig::default().save_to_yaml_file(path)?;
    info!("Configuration created successfully");
    Ok(())
}

fn print_identity(config: &AgentConfig) -> Result<()> {
    let resolution = default_identifier(&config.identity)
        .resolve()
        .context("Failed to determine device identity")?;

    match &resolution {
        Resolution::Cached(_) => info!("Identity loaded from {}", config.identity.cache_path.display()),
        Resolution::Fresh { persist_error: Some(e), .. } => warn!("{}", e),
        Resolution::Fresh { persist_error: None, .. } => {
            info!("Identity stored in {}", config.identity.cache_path.display())
        }
    }

    println!("{}", resolution.identity());
    Ok(())
}

async fn list_reports(config: &AgentConfig, crash_dir: Option<PathBuf>, packages: bool) -> Result<()> {
    let crash_dir = crash_dir.unwrap_or_else(|| config.crash_dir.clone());
    println!("Listing crash reports in {}:", crash_dir.display());

    let mut visitor = ListingVisitor::new(io::stdout());
    if packages {
        visitor = visitor.with_resolver(Box::new(DpkgResolver::default()));
    }

    let parser = ReportParser::from_config(&config.parser);
    for_each_report_in_dir(&crash_dir, &config.report_suffix, parser, &mut visitor).await;
    Ok(())
}

fn reachability_monitor(config: &AgentConfig, skip_check: bool) -> Arc<dyn ReachabilityMonitor> {
    if skip_check || config.reachability.mode == ReachabilityMode::Always {
        info!("Skipping reachability checks");
        return Arc::new(AlwaysReachable);
    }

    let poller = RouteTablePoller::new(
        config.reachability.route_table.clone(),
        config.reachability.net_class_dir.clone(),
    )
    .with_ipv6_route_table(config.reachability.ipv6_route_table.clone());
    Arc::new(NetworkStateMonitor::with_route_table(
        poller,
        config.reachability.poll_interval(),
    ))
}

async fn upload_reports(config: &AgentConfig, opts: UploadOpts) -> Result<()> {
    let submit_url = opts.dest.unwrap_or_else(|| config.submit_url.clone());
    let crash_dir = opts.crash_dir.unwrap_or_else(|| config.crash_dir.clone());
    let cleanup = opts.cleanup || config.cleanup;

    let transport = ReqwestTransport::new(&config.http).context("Failed to create HTTP client")?;
    let persister = HttpReportPersister::new(
        &submit_url,
        config.agent_version.clone(),
        FieldPolicy::from_config(&config.policy),
        Arc::new(default_identifier(&config.identity)),
        Arc::new(transport),
        reachability_monitor(config, opts.skip_reachability_check),
    )
    .context("Destination needs to be a valid url")?;

    info!("Uploading crash reports from {} to {}", crash_dir.display(), submit_url);

    let mut visitor = UploadVisitor::new(persister, &crash_dir, cleanup, io::stdout());
    let parser = ReportParser::from_config(&config.parser);
    for_each_report_in_dir(&crash_dir, &config.report_suffix, parser, &mut visitor).await;

    let summary = visitor.into_summary();
    info!(
        "Upload finished: {} uploaded, {} failed, {} skipped, {} removed",
        summary.uploaded, summary.failed, summary.skipped, summary.removed
    );
    if !summary.is_clean() {
        warn!("Some crash reports were not uploaded and remain in {}", crash_dir.display());
    }

    Ok(())
}

async fn print_logs() -> Result<()> {
    let mut stdout = io::stdout();

    for collector in default_collectors() {
        match collector.collect().await {
            Ok(blob) => {
                writeln!(stdout, "==> {} <==", collector.name())?;
                stdout.write_all(&blob)?;
            }
            Err(e) => warn!("{}", e),
        }
    }

    stdout.flush()?;
    Ok(())
}
