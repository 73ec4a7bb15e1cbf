use std::time::Instant;
use thiserror::Error;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::history::{HistoryEntry, HistoryStore};
use crate::ip::{ClientIp, IpResolver};
use crate::report::{AnalysisProvider, AuditReport, ProviderError};
use crate::stats::ScoreBand;
use crate::store::KeyValueStore;
use crate::usage::UsageLimiter;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("{0}")]
    InvalidUrl(String),
    #[error("daily free analysis limit ({limit}) reached, please try again tomorrow")]
    QuotaExceeded { limit: u32 },
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

#[derive(Debug)]
pub struct AuditOutcome {
    pub report: AuditReport,
    pub entry: HistoryEntry,
    pub client_ip: ClientIp,
    /// Analyses left today for `client_ip` after this one.
    pub remaining: u32,
}

/// Runs one audit: quota check, analysis, then usage and history bookkeeping.
pub struct Auditor<'a, S, C, R, P> {
    limiter: &'a UsageLimiter<S, C>,
    history: &'a HistoryStore<S, C>,
    resolver: &'a R,
    provider: &'a P,
}

impl<'a, S, C, R, P> Auditor<'a, S, C, R, P>
where
    S: KeyValueStore,
    C: Clock,
    R: IpResolver,
    P: AnalysisProvider,
{
    pub fn new(
        limiter: &'a UsageLimiter<S, C>,
        history: &'a HistoryStore<S, C>,
        resolver: &'a R,
        provider: &'a P,
    ) -> Self {
        Self {
            limiter,
            history,
            resolver,
            provider,
        }
    }

    pub fn run(&self, url: &str) -> Result<AuditOutcome, AuditError> {
        let start_time = Instant::now();
        let url = crate::utils::normalize_url(url).map_err(|e| AuditError::InvalidUrl(e.to_string()))?;
        info!(action = "start", component = "audit", url = %url, "Starting audit");

        let client_ip = self.resolver.resolve();
        if !self.limiter.check_limit(&client_ip) {
            warn!(action = "check", component = "audit", ip = %client_ip, "Daily limit reached");
            return Err(AuditError::QuotaExceeded {
                limit: self.limiter.daily_limit(),
            });
        }

        let mut report = self.provider.analyze(&url)?;
        if report.url.trim().is_empty() {
            report.url = url.clone();
        }

        self.limiter.record_usage(&client_ip);
        let entry = self.history.record_entry(&report, &client_ip);
        let remaining = self.limiter.remaining(&client_ip);

        info!(
            action = "complete",
            component = "audit",
            url = %entry.url,
            score = entry.score,
            remaining,
            duration_ms = start_time.elapsed().as_millis(),
            "Audit recorded"
        );

        Ok(AuditOutcome {
            report,
            entry,
            client_ip,
            remaining,
        })
    }
}

pub fn print_audit_outcome(outcome: &AuditOutcome) {
    let report = &outcome.report;

    println!("\n--- Audit: {} ---", report.url);
    println!(
        "Overall score: {} ({})",
        outcome.entry.score,
        ScoreBand::of(outcome.entry.score).label()
    );
    println!("Platform: {}", report.platform);
    if !report.summary.is_empty() {
        println!("Summary: {}", report.summary);
    }

    for section in report.sections() {
        if section.title.is_empty() {
            continue;
        }
        println!(
            "\n{} ({})",
            section.title,
            crate::report::clamp_score(section.score)
        );
        for item in &section.items {
            println!("- {}: {} [{:?}]", item.name, item.value, item.status);
        }
    }

    if !report.recommendations.is_empty() {
        println!("\nRecommendations:");
        for rec in &report.recommendations {
            println!("- {}", rec);
        }
    }

    println!("\nHistory id: {}", outcome.entry.id);
    if outcome.client_ip.is_unknown() {
        println!("Client IP unknown: daily limit not applied");
    } else {
        println!(
            "Remaining analyses today for {}: {}",
            outcome.client_ip, outcome.remaining
        );
    }
}
