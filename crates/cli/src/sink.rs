//! Report sinks
//!
//! CSV export of findings, streamed to a file as the scan emits them or
//! rendered in one pass for stdout. Columns extend the classic
//! account/region/id layout with the resource kind and degraded-confidence
//! flags.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use sweep_lib::{Finding, ReportSink};

const CSV_HEADER: &str = "account,region,resource_kind,resource_id,current_class,\
current_monthly_cost,recommended_class,recommended_monthly_cost,flags";

/// Quote a field when it would break the row
fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv_line(finding: &Finding) -> String {
    let estimate = &finding.estimate;
    format!(
        "{},{},{},{},{},{:.2},{},{:.2},{}",
        csv_field(&finding.account),
        csv_field(&finding.region),
        finding.kind,
        csv_field(&finding.resource_id),
        csv_field(&estimate.current_class),
        estimate.current_monthly_cost,
        csv_field(&estimate.recommended_class),
        estimate.recommended_monthly_cost,
        finding.flags,
    )
}

/// Render findings as a complete CSV document
pub fn to_csv(findings: &[Finding]) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for finding in findings {
        out.push_str(&csv_line(finding));
        out.push('\n');
    }
    out
}

/// Streaming CSV sink writing each finding as it is emitted
pub struct CsvFileSink {
    writer: Mutex<BufWriter<File>>,
}

impl CsvFileSink {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "{CSV_HEADER}").context("failed to write CSV header")?;
        Ok(Self {
            writer: Mutex::new(writer),
        })
    }
}

#[async_trait]
impl ReportSink for CsvFileSink {
    async fn emit(&self, finding: &Finding) -> Result<()> {
        let mut writer = self.writer.lock().expect("CSV writer lock poisoned");
        writeln!(writer, "{}", csv_line(finding)).context("failed to write CSV row")?;
        writer.flush().context("failed to flush CSV row")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sweep_lib::{CostEstimate, FindingFlags, ResourceKind};

    fn finding(resource_id: &str) -> Finding {
        Finding {
            account: "111111111111".to_string(),
            region: "us-east-1".to_string(),
            kind: ResourceKind::FloatingIp,
            resource_id: resource_id.to_string(),
            estimate: CostEstimate::delete("floating-ip", 3.6),
            flags: FindingFlags::default(),
        }
    }

    #[test]
    fn test_to_csv_layout() {
        let csv = to_csv(&[finding("eipalloc-1")]);
        let mut lines = csv.lines();
        assert_eq!(lines.next().unwrap(), CSV_HEADER);
        assert_eq!(
            lines.next().unwrap(),
            "111111111111,us-east-1,floating_ip,eipalloc-1,floating-ip,3.60,None,0.00,"
        );
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_fields_with_commas_are_quoted() {
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[tokio::test]
    async fn test_file_sink_streams_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("findings.csv");

        let sink = CsvFileSink::create(&path).unwrap();
        sink.emit(&finding("eipalloc-1")).await.unwrap();
        sink.emit(&finding("eipalloc-2")).await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], CSV_HEADER);
        assert!(lines[1].contains("eipalloc-1"));
        assert!(lines[2].contains("eipalloc-2"));
    }
}
