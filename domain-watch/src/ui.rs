//! Terminal rendering for the domain-watch dashboard.
//!
//! Result lines, the statistics footer and the `--pretty` header. Output
//! goes to stdout; logging stays on stderr. Uses only the `console` crate.

use console::{pad_str, style, Alignment};
use domain_watch_lib::{
    human_timestamp, CheckState, DashboardStats, DomainCheckResult, DomainName, Presenter,
    WatchConfig,
};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

const DOMAIN_WIDTH: usize = 30;

// ── Presenter ────────────────────────────────────────────────────────────────

/// Streams state changes to the terminal while a check is running.
///
/// Silent until [`TerminalPresenter::go_live`] is called, so list edits
/// (add, remove, clear) don't echo intermediate state.
///
/// In JSON mode nothing is printed here; finished refreshes are signalled
/// through [`TerminalPresenter::stats_published`] so the caller can print a
/// whole report.
pub struct TerminalPresenter {
    pretty: bool,
    json: bool,
    live: AtomicBool,
    stats_ready: Notify,
}

impl TerminalPresenter {
    pub fn new(pretty: bool, json: bool) -> Self {
        Self {
            pretty,
            json,
            live: AtomicBool::new(false),
            stats_ready: Notify::new(),
        }
    }

    /// Resolves once statistics have been published since the last call.
    pub async fn stats_published(&self) {
        self.stats_ready.notified().await
    }

    pub fn go_live(&self) {
        self.live.store(true, Ordering::Release);
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }
}

impl Presenter for TerminalPresenter {
    fn render_state(&self, domain: &DomainName, state: &CheckState) {
        if self.is_live() && !self.json {
            println!("{}", format_state_line(domain, state, self.pretty));
        }
    }

    fn render_stats(&self, stats: &DashboardStats) {
        if !self.is_live() {
            return;
        }
        if self.json {
            self.stats_ready.notify_one();
        } else {
            print_stats(stats, self.pretty);
        }
    }
}

// ── Header ───────────────────────────────────────────────────────────────────

/// Print a styled header at the start of a pretty run.
pub fn print_header(domain_count: usize, config: &WatchConfig) {
    println!(
        "{} {} {}",
        style("domain-watch").bold(),
        style(format!("v{}", env!("CARGO_PKG_VERSION"))).dim(),
        style(format!(
            "- Checking {} domain{}",
            domain_count,
            if domain_count == 1 { "" } else { "s" }
        ))
        .dim(),
    );
    println!(
        "{}",
        style(format!(
            "Probe timeout: {}s | Refresh every {}s",
            config.probe_timeout.as_secs_f32(),
            config.refresh_interval.as_secs()
        ))
        .dim()
    );
    println!();
}

// ── Single state line ────────────────────────────────────────────────────────

/// One line describing a domain's current state.
pub fn format_state_line(domain: &DomainName, state: &CheckState, pretty: bool) -> String {
    let name = if pretty {
        let padded = pad_str(domain.as_str(), DOMAIN_WIDTH, Alignment::Left, Some(".."));
        style(padded).white().to_string()
    } else {
        domain.to_string()
    };

    match state {
        CheckState::NotChecked => {
            format!("{}  {}", name, style("Not checked").dim())
        }
        CheckState::Checking => {
            format!("{}  {}", name, style("Checking...").cyan())
        }
        CheckState::Resolved(result) => {
            let line = format!(
                "{}  {}  {}",
                name,
                availability_label(result, pretty),
                reachability_label(result, pretty)
            );
            if pretty {
                format!(
                    "{}  {}",
                    line,
                    style(human_timestamp(&result.checked_at)).dim()
                )
            } else {
                line
            }
        }
        CheckState::Errored { message } => {
            format!(
                "{}  {}  {}",
                name,
                style("ERROR").red().bold(),
                style(message).dim()
            )
        }
    }
}

/// `REGISTERED (heuristic, Known Domain)` or `AVAILABLE (heuristic)`.
pub fn availability_label(result: &DomainCheckResult, pretty: bool) -> String {
    let availability = &result.availability;
    let qualifier = if availability.is_authoritative() {
        availability.registrar.clone()
    } else {
        format!("{}, {}", availability.confidence.label(), availability.registrar)
    };

    if availability.available {
        let text = if availability.is_authoritative() {
            "AVAILABLE".to_string()
        } else {
            format!("AVAILABLE ({})", availability.confidence.label())
        };
        if pretty {
            style(text).green().bold().to_string()
        } else {
            text
        }
    } else {
        let text = format!("REGISTERED ({})", qualifier);
        if pretty {
            style(text).red().to_string()
        } else {
            text
        }
    }
}

/// `ALIVE (HTTPS)` or `DOWN`.
pub fn reachability_label(result: &DomainCheckResult, pretty: bool) -> String {
    let reachability = &result.reachability;
    if reachability.alive() {
        let text = format!("ALIVE ({})", reachability.transport());
        if pretty {
            style(text).green().to_string()
        } else {
            text
        }
    } else if pretty {
        style("DOWN").yellow().to_string()
    } else {
        "DOWN".to_string()
    }
}

// ── Summary ──────────────────────────────────────────────────────────────────

/// Text of the statistics footer.
pub fn format_stats(stats: &DashboardStats) -> String {
    let mut parts = vec![
        format!(
            "{} domain{}",
            stats.total,
            if stats.total == 1 { "" } else { "s" }
        ),
        format!("{} available (heuristic)", stats.available),
        format!("{} alive", stats.alive),
    ];

    if let Some(refreshed) = &stats.last_refreshed {
        parts.push(format!("Last refreshed: {}", human_timestamp(refreshed)));
    }
    if let Some(workflow) = &stats.last_workflow_update {
        parts.push(format!("Workflow update: {}", workflow));
    }

    parts.join(" | ")
}

/// Print the statistics footer.
pub fn print_stats(stats: &DashboardStats, pretty: bool) {
    if pretty {
        println!();
        println!("{}", style(format_stats(stats)).bold());
    } else {
        println!("{}", format_stats(stats));
    }
}
