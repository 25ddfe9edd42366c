//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use sweep_lib::{Finding, ScanReport};
use tabled::{settings::Style, Table, Tabled};

/// Output format for the scan report
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
    /// CSV rows on stdout
    Csv,
}

/// Row for the findings table
#[derive(Tabled)]
struct FindingRow {
    #[tabled(rename = "Account")]
    account: String,
    #[tabled(rename = "Region")]
    region: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "Current")]
    current: String,
    #[tabled(rename = "Recommended")]
    recommended: String,
    #[tabled(rename = "Monthly Savings")]
    savings: String,
    #[tabled(rename = "Flags")]
    flags: String,
}

impl FindingRow {
    fn from_finding(finding: &Finding) -> Self {
        let estimate = &finding.estimate;
        Self {
            account: finding.account.clone(),
            region: finding.region.clone(),
            kind: finding.kind.to_string(),
            resource: finding.resource_id.clone(),
            current: format!(
                "{} ({})",
                estimate.current_class,
                format_currency(estimate.current_monthly_cost)
            ),
            recommended: format!(
                "{} ({})",
                estimate.recommended_class,
                format_currency(estimate.recommended_monthly_cost)
            ),
            savings: format_currency(estimate.monthly_savings()),
            flags: finding.flags.to_string(),
        }
    }
}

/// Print the scan report in the requested format
pub fn print_report(report: &ScanReport, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        OutputFormat::Csv => {
            print!("{}", crate::sink::to_csv(&report.findings));
        }
        OutputFormat::Table => {
            print_table(report);
        }
    }
    Ok(())
}

fn print_table(report: &ScanReport) {
    if report.findings.is_empty() {
        println!("{}", "No idle or unused resources found".yellow());
    } else {
        let rows: Vec<FindingRow> = report
            .findings
            .iter()
            .map(FindingRow::from_finding)
            .collect();
        let table = Table::new(rows).with(Style::rounded()).to_string();
        println!("{}", table);
    }

    let summary = &report.summary;
    println!();
    println!("{}", "Scan Summary".bold());
    println!("{}", "=".repeat(50));
    println!("Accounts scanned:       {}", summary.accounts_scanned);
    println!("Resources evaluated:    {}", summary.resources_evaluated);
    println!("Findings:               {}", summary.findings_emitted);
    println!(
        "{}  {}",
        "Potential Monthly Savings:".bold(),
        format_currency(summary.total_monthly_savings).green().bold()
    );

    for failure in &summary.accounts_failed {
        print_warning(&format!("account skipped: {failure}"));
    }
    for failure in &summary.regions_failed {
        print_warning(&format!("region skipped: {failure}"));
    }
    for failure in &summary.kind_failures {
        print_warning(&format!("kind skipped: {failure}"));
    }
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Format currency
pub fn format_currency(amount: f64) -> String {
    format!("${:.2}", amount)
}
