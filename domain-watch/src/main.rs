//! Domain Watch CLI Application
//!
//! A terminal dashboard that tracks a list of domains, probes whether each
//! one answers over HTTPS or HTTP, and shows a heuristic availability hint.
//! All checking logic lives in domain-watch-lib.

mod ui;

use chrono::Utc;
use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Parser, Subcommand};
use console::Term;
use domain_watch_lib::{
    load_env_config, mark_workflow_update_now, parse_duration_string, CheckState, ConfigManager,
    DashboardController, DashboardStats, DomainName, FileConfig, JsonFileStore, StateStore,
    SummaryFetcher, WatchConfig,
};
use serde::Serialize;
use std::io::BufRead;
use std::process;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::ui::TerminalPresenter;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

const DEFAULT_LOG_FILTER: &str = "domain_watch=warn,domain_watch_lib=warn";
const VERBOSE_LOG_FILTER: &str = "domain_watch=debug,domain_watch_lib=debug";

/// CLI arguments for domain-watch
#[derive(Parser, Debug)]
#[command(name = "domain-watch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Track domains: reachability probes plus a heuristic availability hint")]
#[command(
    long_about = "Track a list of domains and check whether each one answers over HTTPS or HTTP.\n\nAvailability is a labeled heuristic (known-name match plus a random draw), not a registry lookup."
)]
#[command(styles = STYLES)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Output results in JSON format
    #[arg(short = 'j', long = "json", global = true, help_heading = "Output Format")]
    pub json: bool,

    /// Colored, aligned output with a header
    #[arg(short = 'p', long = "pretty", global = true, help_heading = "Output Format")]
    pub pretty: bool,

    /// Timeout per transport attempt (e.g. 10s, 500ms)
    #[arg(long = "timeout", value_name = "DURATION", global = true, help_heading = "Checking")]
    pub timeout: Option<String>,

    /// Automatic refresh period for `watch` (e.g. 5m)
    #[arg(long = "interval", value_name = "DURATION", global = true, help_heading = "Checking")]
    pub interval: Option<String>,

    /// File holding the tracked domain list
    #[arg(long = "state-file", value_name = "FILE", global = true, help_heading = "Configuration")]
    pub state_file: Option<String>,

    /// Path or URL of the workflow status summary
    #[arg(long = "summary", value_name = "SOURCE", global = true, help_heading = "Configuration")]
    pub summary: Option<String>,

    /// Record "now" as the latest workflow update
    #[arg(
        long = "workflow",
        value_name = "VALUE",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "1",
        global = true,
        help_heading = "Configuration"
    )]
    pub workflow: Option<String>,

    /// Use specific config file instead of automatic discovery
    #[arg(long = "config", value_name = "FILE", global = true, help_heading = "Configuration")]
    pub config: Option<String>,

    /// Verbose logging
    #[arg(short = 'v', long = "verbose", global = true, help_heading = "Configuration")]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show tracked domains and their state (default)
    List,
    /// Start tracking a domain
    Add {
        /// Domain name, e.g. example.org
        domain: String,
    },
    /// Stop tracking a domain
    Remove {
        domain: String,

        /// Skip confirmation prompt
        #[arg(short = 'y', long = "yes")]
        yes: bool,
    },
    /// Check one tracked domain, or all of them
    Check {
        /// Only check this domain
        domain: Option<String>,
    },
    /// Check all domains now and then on every refresh interval until Ctrl-C
    Watch,
    /// Stop tracking every domain
    Clear {
        /// Skip confirmation prompt
        #[arg(short = 'y', long = "yes")]
        yes: bool,
    },
}

/// Output settings resolved from CLI, environment and config files.
#[derive(Debug, Clone)]
struct Settings {
    config: WatchConfig,
    json: bool,
    pretty: bool,
}

/// One row of JSON output.
#[derive(Serialize)]
struct DomainRow<'a> {
    domain: &'a DomainName,
    status: &'a CheckState,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    domains: Vec<DomainRow<'a>>,
    stats: &'a DashboardStats,
}

/// Initialize tracing to stderr so stdout stays clean for results.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::new(VERBOSE_LOG_FILTER)
    } else {
        tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    if let Err(e) = run(args).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let settings = build_settings(&args)?;
    let config = &settings.config;
    debug!(
        state_file = %config.state_file.display(),
        summary = %config.summary_source,
        timeout = ?config.probe_timeout,
        interval = ?config.refresh_interval,
        "configuration resolved"
    );

    let state: Arc<dyn StateStore> = Arc::new(JsonFileStore::open(&config.state_file)?);

    SummaryFetcher::new(state.clone())?
        .refresh(&config.summary_source)
        .await;
    if args.workflow.is_some() {
        let stamped = mark_workflow_update_now(state.as_ref(), Utc::now())?;
        debug!(%stamped, "workflow update recorded");
    }

    let presenter = Arc::new(TerminalPresenter::new(
        settings.pretty && !settings.json,
        settings.json,
    ));
    let controller = Arc::new(DashboardController::from_config(
        config,
        state,
        presenter.clone(),
    )?);

    match args.command.clone().unwrap_or(Command::List) {
        Command::List => {
            print_states(&controller, &settings);
        }
        Command::Add { domain } => {
            let added = controller.add_domain(&domain)?;
            if settings.json {
                println!("{}", serde_json::json!({ "added": added }));
            } else {
                println!("Added {} ({} tracked)", added, controller.stats().total);
            }
        }
        Command::Remove { domain, yes } => {
            if !yes && !confirm(&format!("Remove {}?", domain))? {
                eprintln!("Aborted.");
                return Ok(());
            }
            let removed = controller.remove_domain(&domain)?;
            if settings.json {
                println!("{}", serde_json::json!({ "removed": removed, "domain": domain }));
            } else if removed {
                println!("Removed {}", domain);
            } else {
                println!("{} is not tracked", domain);
            }
        }
        Command::Check { domain } => {
            if !settings.json {
                if settings.pretty {
                    let count = domain.as_ref().map_or(controller.stats().total, |_| 1);
                    ui::print_header(count, config);
                }
                presenter.go_live();
            }

            match &domain {
                Some(name) => {
                    controller.refresh_one(name).await?;
                }
                None => {
                    controller.refresh_all().await?;
                }
            }

            if settings.json {
                print_states(&controller, &settings);
            }
        }
        Command::Watch => {
            if settings.pretty && !settings.json {
                ui::print_header(controller.stats().total, config);
            }
            presenter.go_live();

            controller.refresh_all().await?;
            let ticker = controller.clone().spawn_auto_refresh();

            // In JSON mode every finished refresh prints one full report.
            let shutdown = tokio::signal::ctrl_c();
            tokio::pin!(shutdown);
            loop {
                tokio::select! {
                    result = &mut shutdown => {
                        result?;
                        break;
                    }
                    _ = presenter.stats_published(), if settings.json => {
                        print_states(&controller, &settings);
                    }
                }
            }
            ticker.abort();
            eprintln!("Stopped.");
        }
        Command::Clear { yes } => {
            let total = controller.stats().total;
            if !yes && !confirm(&format!("Stop tracking all {} domains?", total))? {
                eprintln!("Aborted.");
                return Ok(());
            }
            controller.clear()?;
            if settings.json {
                println!("{}", serde_json::json!({ "cleared": total }));
            } else {
                println!("Cleared {} domains", total);
            }
        }
    }

    Ok(())
}

/// Print every tracked domain with its state, then the statistics.
fn print_states(controller: &DashboardController, settings: &Settings) {
    let states = controller.states();
    let stats = controller.stats();

    if settings.json {
        let report = JsonReport {
            domains: states
                .iter()
                .map(|(domain, status)| DomainRow { domain, status })
                .collect(),
            stats: &stats,
        };
        let rendered = if settings.pretty {
            serde_json::to_string_pretty(&report)
        } else {
            serde_json::to_string(&report)
        };
        match rendered {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Error serializing results: {}", e),
        }
        return;
    }

    if states.is_empty() {
        println!("No domains tracked. Add one with `domain-watch add <DOMAIN>`.");
    }
    for (domain, state) in &states {
        println!("{}", ui::format_state_line(domain, state, settings.pretty));
    }
    ui::print_stats(&stats, settings.pretty);
}

/// Ask for confirmation on an interactive terminal; non-interactive runs proceed.
fn confirm(prompt: &str) -> std::io::Result<bool> {
    let term = Term::stderr();
    if !term.is_term() {
        return Ok(true);
    }

    eprint!("{} [y/N] ", prompt);
    let mut input = String::new();
    std::io::stdin().lock().read_line(&mut input)?;
    let answer = input.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}

/// Resolve settings: CLI > environment > config file > defaults.
fn build_settings(args: &Args) -> Result<Settings, Box<dyn std::error::Error>> {
    let env_config = load_env_config();
    let config_manager = ConfigManager::new(args.verbose);

    // Step 1: config files (explicit path, or discovery)
    let explicit_path = args.config.clone().or_else(|| env_config.config.clone());
    let file_config: FileConfig = match &explicit_path {
        Some(path) => {
            debug!(%path, "using explicit config file");
            config_manager
                .load_file(path)
                .map_err(|e| format!("Failed to load config file '{}': {}", path, e))?
        }
        None => config_manager.discover_and_load(),
    };

    let mut config = file_config.apply_to(WatchConfig::default());
    let file_defaults = file_config.defaults.clone().unwrap_or_default();

    // Step 2: environment variables (DW_*)
    config = env_config.apply_to(config);

    // Step 3: CLI arguments (highest precedence)
    if let Some(timeout) = &args.timeout {
        config = config.with_probe_timeout(parse_cli_duration("--timeout", timeout)?);
    }
    if let Some(interval) = &args.interval {
        config = config.with_refresh_interval(parse_cli_duration("--interval", interval)?);
    }
    if let Some(path) = &args.state_file {
        config = config.with_state_file(path);
    }
    if let Some(source) = &args.summary {
        config = config.with_summary_source(source.clone());
    }

    let json = args.json || env_config.json.or(file_defaults.json).unwrap_or(false);
    let pretty = args.pretty || env_config.pretty.or(file_defaults.pretty).unwrap_or(false);

    Ok(Settings {
        config,
        json,
        pretty,
    })
}

fn parse_cli_duration(flag: &str, value: &str) -> Result<std::time::Duration, String> {
    match parse_duration_string(value) {
        Some(d) if !d.is_zero() => Ok(d),
        _ => Err(format!(
            "Invalid {} '{}'. Use format like '500ms', '10s', '5m'",
            flag, value
        )),
    }
}
