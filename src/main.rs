use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};

use shopaudit::args::{AdminCommand, Command, IpArgs};
use shopaudit::audit::print_audit_outcome;
use shopaudit::ip::{ClientIp, FixedIpResolver, IpResolver, IpifyResolver};
use shopaudit::gemini::GeminiProvider;
use shopaudit::report::{AnalysisProvider, ReportFileProvider};
use shopaudit::stats::ScoreBand;
use shopaudit::utils::{redact_ip, setup_logging};
use shopaudit::{Args, Auditor, Config, HistoryEntry, HistoryStore, HistorySummary, SqliteStore, UsageLimiter};

fn ip_resolver(ip: &IpArgs, config: &Config) -> Box<dyn IpResolver> {
    if let Some(explicit) = &ip.ip {
        Box::new(FixedIpResolver(ClientIp::from(explicit.as_str())))
    } else if ip.no_ip_lookup {
        Box::new(FixedIpResolver(ClientIp::Unknown))
    } else {
        Box::new(IpifyResolver::new(config.ip_timeout))
    }
}

fn analysis_provider(
    report: &Option<PathBuf>,
    api_key: &Option<String>,
    model: &str,
) -> Result<Box<dyn AnalysisProvider>> {
    if let Some(path) = report {
        return Ok(Box::new(ReportFileProvider::new(path.clone())));
    }
    match api_key.as_deref().filter(|key| !key.trim().is_empty()) {
        Some(key) => Ok(Box::new(GeminiProvider::new(key, model))),
        None => anyhow::bail!("Set GEMINI_API_KEY (or --api-key), or pass --report with a report JSON"),
    }
}

fn print_history(entries: &[HistoryEntry], limit: Option<usize>, redact: bool) {
    if entries.is_empty() {
        println!("No audits recorded.");
        return;
    }

    let shown = limit.unwrap_or(entries.len()).min(entries.len());
    println!("\n--- Audit history ({} of {}) ---", shown, entries.len());
    for entry in entries.iter().take(shown) {
        let ip = if redact && !entry.client_ip.is_unknown() {
            redact_ip(entry.client_ip.as_str())
        } else {
            entry.client_ip.to_string()
        };
        println!(
            "{}  {}  {:>3} ({})  {}  {}  {}",
            entry.timestamp.format("%Y-%m-%d %H:%M"),
            entry.id,
            entry.score,
            ScoreBand::of(entry.score).label(),
            entry.platform,
            ip,
            entry.url
        );
    }
}

fn print_summary(summary: &HistorySummary) {
    println!("\n--- History summary ---");
    println!("Total audits: {}", summary.total);
    println!("Average score: {}", summary.average_score);
    match summary.latest {
        Some(latest) => println!("Latest audit: {}", latest.format("%B %-d, %Y")),
        None => println!("Latest audit: -"),
    }
    println!(
        "Score bands: {} good, {} warning, {} poor",
        summary.good, summary.warning, summary.poor
    );
    if !summary.platforms.is_empty() {
        println!("\nPlatforms:");
        for (platform, count) in &summary.platforms {
            println!("- {}: {}", platform, count);
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let config = Config::from_args(args)?;
    let store = SqliteStore::open(&config.db_path)?;
    let limiter = UsageLimiter::new(&store).with_daily_limit(config.daily_limit);
    let history = HistoryStore::new(&store);

    match &args.command {
        Command::Audit {
            url,
            report,
            api_key,
            model,
            ip,
        } => {
            let provider = analysis_provider(report, api_key, model)?;
            let resolver = ip_resolver(ip, &config);
            let outcome = Auditor::new(&limiter, &history, &resolver, &provider).run(url)?;
            print_audit_outcome(&outcome);
        }
        Command::Quota { ip } => {
            let client_ip = ip_resolver(ip, &config).resolve();
            if client_ip.is_unknown() {
                println!("Client IP unknown: daily limit not applied");
            } else {
                println!(
                    "Remaining analyses today for {}: {} of {}",
                    client_ip,
                    limiter.remaining(&client_ip),
                    limiter.daily_limit()
                );
            }
        }
        Command::Admin { password, command } => {
            if !config.check_admin_password(password) {
                anyhow::bail!("Incorrect admin password");
            }
            info!(action = "authenticate", component = "admin", "Admin access granted");

            match command {
                AdminCommand::List {
                    search,
                    limit,
                    redact,
                } => {
                    let entries = match search {
                        Some(term) => history.search(term),
                        None => history.list_entries(),
                    };
                    print_history(&entries, *limit, *redact);
                }
                AdminCommand::Delete { id } => {
                    let removed = history
                        .try_delete_entry(id)
                        .context("Failed to delete history entry")?;
                    if removed {
                        println!("Deleted {}", id);
                    } else {
                        println!("No entry with id {}", id);
                    }
                }
                AdminCommand::Clear => {
                    history.try_clear_all().context("Failed to clear history")?;
                    println!("History cleared");
                }
                AdminCommand::ResetQuota => {
                    limiter.try_reset_usage().context("Failed to reset quota")?;
                    println!("Daily limit reset for this device");
                }
                AdminCommand::Stats => {
                    print_summary(&HistorySummary::from_entries(&history.list_entries()));
                }
            }
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(args.verbose);

    match run(&args) {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}
