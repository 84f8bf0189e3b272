//! Command-line surface: argument types and plain-text rendering of the
//! reports.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use serde::Serialize;

use enquiry_ledger::IntakeService;
use enquiry_ledger::config::AnalyticsConfig;
use enquiry_ledger::db::{PaymentDraft, PaymentStatus};
use enquiry_ledger::error::IntakeError;
use enquiry_ledger::intake::LedgerView;
use enquiry_ledger::intake::ledger::suggest_status;
use enquiry_ledger::reports::{
    Dashboard, KpiMetrics, PaymentLine, PaymentPortfolio, PipelineForecast, StatusCount,
    StatusRollup, sort_by_funnel, status_rollup,
};

/// enquiry-ledger - enquiry pipeline analytics and payment ledger
#[derive(Parser, Debug)]
#[command(name = "enquiry-ledger")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to a TOML settings file
    #[arg(short, long, env = "ENQUIRY_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// JSON snapshot of enquiries and payments (overrides settings)
    #[arg(long)]
    pub snapshot: Option<PathBuf>,

    /// Reference time for month-scoped metrics (RFC 3339, defaults to now)
    #[arg(long)]
    pub now: Option<DateTime<Utc>>,

    /// Emit JSON instead of text
    #[arg(long)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Headline KPIs
    Kpi,

    /// Probability-weighted pipeline forecast
    Forecast,

    /// Enquiry counts per status
    Status,

    /// Payment portfolio across converted clients
    Payments {
        /// Also list every converted client
        #[arg(long)]
        lines: bool,
    },

    /// All reports from one snapshot
    Dashboard,

    /// Validate a payment for an enquiry without saving it
    CheckPayment {
        /// Enquiry reference, e.g. ENQ-00012
        #[arg(long)]
        enquiry: String,

        /// JSON payment draft; defaults to the stored payment
        #[arg(long)]
        draft: Option<PathBuf>,
    },
}

pub async fn run(cli: &Cli, service: &IntakeService, config: &AnalyticsConfig) -> Result<String> {
    let now = cli.now.unwrap_or_else(Utc::now);
    let render = Render { config };

    match &cli.command {
        Commands::Kpi => {
            let kpi = service.kpi_metrics(now).await?;
            output(cli.json, &kpi, || render.kpi(&kpi))
        }
        Commands::Forecast => {
            let forecast = service.pipeline_forecast().await?;
            output(cli.json, &forecast, || render.forecast(&forecast))
        }
        Commands::Status => {
            let mut summary = service.status_summary().await?;
            sort_by_funnel(&mut summary);
            let rollup = status_rollup(&summary)?;
            if cli.json {
                return to_json(&serde_json::json!({
                    "summary": summary,
                    "rollup": rollup,
                }));
            }
            Ok(render.status(&summary, &rollup))
        }
        Commands::Payments { lines } => {
            let portfolio = service.payment_portfolio().await?;
            if !*lines {
                return output(cli.json, &portfolio, || render.portfolio(&portfolio));
            }
            let detail = service.payment_lines().await?;
            if cli.json {
                return to_json(&serde_json::json!({
                    "portfolio": portfolio,
                    "lines": detail,
                }));
            }
            let mut out = render.portfolio(&portfolio);
            out.push('\n');
            out.push_str(&render.lines(&detail));
            Ok(out)
        }
        Commands::Dashboard => {
            let mut dashboard = service.dashboard(now).await?;
            sort_by_funnel(&mut dashboard.status_summary);
            output(cli.json, &dashboard, || render.dashboard(&dashboard))
        }
        Commands::CheckPayment { enquiry, draft } => {
            let record = service.find_enquiry(enquiry).await?;
            let draft = match draft {
                Some(path) => load_draft(path).await?,
                None => service
                    .payment_for(record.id)
                    .await?
                    .map(|payment| payment.to_draft())
                    .ok_or_else(|| IntakeError::PaymentNotFound {
                        enquiry_id: record.enquiry_id.clone(),
                    })?,
            };
            match service.check_payment(record.id, &draft).await {
                Ok(ledger) => output(cli.json, &ledger, || render.ledger(&ledger)),
                Err(err) => {
                    // Hint at a consistent status before surfacing the rejection.
                    if matches!(
                        err.as_intake(),
                        Some(IntakeError::InconsistentPaymentStatus { .. })
                    ) {
                        let hint = suggest_status(&draft.amounts);
                        tracing::warn!(suggested = %hint, "Payment status does not match amounts");
                    }
                    Err(err.into())
                }
            }
        }
    }
}

async fn load_draft(path: &Path) -> Result<PaymentDraft> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read payment draft {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("invalid payment draft {}", path.display()))
}

fn output<T: Serialize>(json: bool, value: &T, text: impl FnOnce() -> String) -> Result<String> {
    if json { to_json(value) } else { Ok(text()) }
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("failed to serialize report")
}

struct Render<'a> {
    config: &'a AnalyticsConfig,
}

impl Render<'_> {
    fn kpi(&self, kpi: &KpiMetrics) -> String {
        let c = self.config;
        let mut out = String::new();
        let _ = writeln!(out, "Total enquiries:       {}", kpi.total_enquiries);
        let _ = writeln!(out, "This month:            {}", kpi.this_month_enquiries);
        let _ = writeln!(out, "Converted:             {}", kpi.converted_enquiries);
        let _ = writeln!(out, "Conversion rate:       {}", c.format_percent(kpi.conversion_rate));
        let _ = writeln!(out, "Total revenue:         {}", c.format_money(kpi.total_revenue));
        let _ = writeln!(
            out,
            "Avg conversion value:  {}",
            c.format_money(kpi.average_conversion_value())
        );
        if let Some(open) = kpi.growth_opportunity() {
            let _ = writeln!(
                out,
                "Growth opportunity:    {open} unconverted enquiries could convert with follow-up"
            );
        }
        out
    }

    fn forecast(&self, forecast: &PipelineForecast) -> String {
        let c = self.config;
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:<20} {:>6} {:>22} {:>8} {:>22}",
            "Status", "Count", "Value", "Prob", "Weighted"
        );
        for row in &forecast.rows {
            let _ = writeln!(
                out,
                "{:<20} {:>6} {:>22} {:>8} {:>22}",
                row.status.as_str(),
                row.count,
                c.format_money(row.total_value),
                c.format_percent(row.probability * Decimal::ONE_HUNDRED),
                c.format_money(row.weighted_value),
            );
        }
        let _ = writeln!(out, "Pipeline value:        {}", c.format_money(forecast.total_value));
        let _ = writeln!(
            out,
            "Weighted value:        {}",
            c.format_money(forecast.total_weighted_value)
        );
        let _ = writeln!(
            out,
            "Probability factor:    {}",
            c.format_percent(forecast.probability_factor())
        );
        out
    }

    fn status(&self, summary: &[StatusCount], rollup: &StatusRollup) -> String {
        if summary.is_empty() {
            return "No enquiries.\n".to_string();
        }
        let c = self.config;
        let mut out = String::new();
        for item in summary {
            let _ = writeln!(
                out,
                "{:<20} {:>6} {:>8}  {}",
                item.status.as_str(),
                item.count,
                c.format_percent(item.share),
                item.color
            );
        }
        let _ = writeln!(
            out,
            "Total {}, active {}, converted {}, lost {}",
            rollup.total, rollup.active, rollup.converted, rollup.lost
        );
        out
    }

    fn portfolio(&self, portfolio: &PaymentPortfolio) -> String {
        let c = self.config;
        let mut out = String::new();
        let _ = writeln!(out, "Converted clients:     {}", portfolio.converted_clients);
        let _ = writeln!(out, "Pending setup:         {}", portfolio.pending_setup);
        let _ = writeln!(out, "Received:              {}", c.format_money(portfolio.total_received));
        let _ = writeln!(
            out,
            "Outstanding:           {}",
            c.format_money(portfolio.total_outstanding)
        );
        if portfolio.overpaid_count > 0 {
            let _ = writeln!(out, "Overpaid:              {}", portfolio.overpaid_count);
        }
        for item in &portfolio.by_status {
            let _ = writeln!(out, "  {:<18} {:>6}", item.status.as_str(), item.count);
        }
        out
    }

    fn lines(&self, lines: &[PaymentLine]) -> String {
        let c = self.config;
        let mut out = String::new();
        for line in lines {
            let status = line
                .ledger
                .map(|ledger| ledger.normalized_status.as_str())
                .unwrap_or("Not set up");
            let outstanding = line
                .ledger
                .and_then(|ledger| ledger.amount_outstanding)
                .map(|amount| c.format_money(amount))
                .unwrap_or_else(|| "-".to_string());
            let _ = writeln!(
                out,
                "{:<10} {:<12} {:<24} {:<16} {:>22}",
                line.enquiry_id, line.matter_code, line.client_name, status, outstanding
            );
        }
        out
    }

    fn ledger(&self, ledger: &LedgerView) -> String {
        let c = self.config;
        let mut out = String::new();
        let _ = writeln!(out, "Status:                {}", ledger.normalized_status);
        let outstanding = ledger
            .amount_outstanding
            .map(|amount| c.format_money(amount))
            .unwrap_or_else(|| "no total set".to_string());
        let _ = writeln!(out, "Outstanding:           {outstanding}");
        if ledger.overpaid {
            out.push_str("Overpaid:              yes\n");
        }
        if ledger.normalized_status == PaymentStatus::Overdue {
            out.push_str("Flagged overdue by the account owner.\n");
        }
        out
    }

    fn dashboard(&self, dashboard: &Dashboard) -> String {
        [
            ("KPIs", self.kpi(&dashboard.kpi)),
            ("Pipeline forecast", self.forecast(&dashboard.forecast)),
            (
                "Status summary",
                self.status(&dashboard.status_summary, &dashboard.status_rollup),
            ),
            ("Payments", self.portfolio(&dashboard.payments)),
        ]
        .into_iter()
        .map(|(title, body)| format!("== {title} ==\n{body}"))
        .collect::<Vec<_>>()
        .join("\n")
    }
}
