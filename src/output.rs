use crate::error::{ReportError, Result};
use crate::types::{AnalysisResults, DataOverview};
use crate::util::format_int;
use log::info;
use serde::Serialize;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s).map_err(|e| ReportError::io(path, e))?;
    info!("Wrote summary {}", path.display());
    Ok(())
}

pub fn write_pdf(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).map_err(|e| ReportError::io(path, e))?;
    info!("Wrote {} ({} bytes)", path.display(), format_int(bytes.len()));
    Ok(())
}

pub fn print_overview(overview: &DataOverview) {
    println!("\nData Overview:");
    println!("• Total Records: {}", format_int(overview.total_records));
    match (overview.first_issue_date, overview.last_issue_date) {
        (Some(first), Some(last)) => println!("• Time Period: {} to {}", first, last),
        _ => println!("• Time Period: n/a"),
    }
    println!("• Unique Clients: {}", format_int(overview.unique_customers));
}

pub fn preview_table<T>(title: &str, rows: &[T])
where
    T: Tabled,
{
    println!("\n{}", title);
    if rows.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(rows).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

pub fn preview_analysis(analysis: &AnalysisResults) {
    preview_table(
        "Shipment Status Distribution",
        &analysis.status_distribution.rows(),
    );
    preview_table("Invoice Totals by Status", &analysis.payment_analysis.rows());
    preview_table("Cost Driver Correlations", &analysis.correlation_matrix.rows());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ReportSummary, StatusDistribution, StatusShare};
    use crate::analysis::{correlation_matrix, payment_analysis};

    #[test]
    fn summary_json_has_overview_and_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        let overview = DataOverview {
            total_records: 2,
            first_issue_date: None,
            last_issue_date: None,
            unique_customers: 1,
        };
        let analysis = AnalysisResults {
            status_distribution: StatusDistribution {
                shares: vec![StatusShare {
                    status: "Delivered".to_string(),
                    count: 2,
                    percent: 100.0,
                }],
            },
            payment_analysis: payment_analysis(&[]),
            correlation_matrix: correlation_matrix(&[]),
        };
        write_json(
            &path,
            &ReportSummary {
                overview: &overview,
                analysis: &analysis,
            },
        )
        .unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["overview"]["total_records"], 2);
        assert_eq!(value["status_distribution"]["shares"][0]["percent"], 100.0);
        assert!(value["correlation_matrix"]["Distance_Km"]["Quantity"].is_null());
    }

    #[test]
    fn write_pdf_reports_bad_path() {
        let err = write_pdf(Path::new("/nonexistent-dir/report.pdf"), b"%PDF").unwrap_err();
        assert!(matches!(err, ReportError::Io { .. }));
    }
}
