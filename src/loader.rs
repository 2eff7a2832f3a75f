use crate::error::{ReportError, Result};
use crate::types::{DataOverview, RawRow, ShipmentRecord, REQUIRED_COLUMNS};
use crate::util::{days_between, parse_datetime, parse_f64_or_nan};
use chrono::NaiveDateTime;
use csv::{ReaderBuilder, Trim};
use log::{debug, info};
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Load the shipment CSV at `path` and summarize it.
pub fn load_shipments(path: &Path) -> Result<(Vec<ShipmentRecord>, DataOverview)> {
    info!("Reading shipments from {}", path.display());
    let file = File::open(path).map_err(|e| ReportError::io(path, e))?;
    read_shipments(file)
}

/// Parse shipments from any reader. Every row must carry parseable issue and
/// payment dates; the first bad row aborts the load.
pub fn read_shipments<R: Read>(reader: R) -> Result<(Vec<ShipmentRecord>, DataOverview)> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::Headers)
        .from_reader(reader);
    let headers = rdr.headers()?.clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(ReportError::MissingColumn(column.to_string()));
        }
    }

    let mut records = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let row: RawRow = record.deserialize(Some(&headers))?;

        let issue_date = required_date(row.issue_date.as_deref(), "Issue_Date", line)?;
        let payment_date = required_date(row.payment_date.as_deref(), "Payment_Date", line)?;

        records.push(ShipmentRecord {
            customer_id: row.customer_id.unwrap_or_default().trim().to_string(),
            issue_date,
            payment_date,
            payment_delay_days: days_between(issue_date, payment_date),
            shipment_status: row
                .shipment_status
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            invoice_total: parse_f64_or_nan(row.invoice_total.as_deref()),
            distance_km: parse_f64_or_nan(row.distance_km.as_deref()),
            shipment_cost: parse_f64_or_nan(row.shipment_cost.as_deref()),
            quantity: parse_f64_or_nan(row.quantity.as_deref()),
            goods_weight: parse_f64_or_nan(row.goods_weight.as_deref()),
        });
    }
    debug!("Parsed {} shipment rows", records.len());

    let overview = summarize(&records);
    Ok((records, overview))
}

fn required_date(value: Option<&str>, column: &'static str, line: u64) -> Result<NaiveDateTime> {
    let raw = value.unwrap_or("");
    parse_datetime(raw).ok_or_else(|| ReportError::InvalidDate {
        line,
        column,
        value: raw.to_string(),
    })
}

pub fn summarize(records: &[ShipmentRecord]) -> DataOverview {
    let customers: HashSet<&str> = records
        .iter()
        .map(|r| r.customer_id.as_str())
        .filter(|c| !c.is_empty())
        .collect();
    DataOverview {
        total_records: records.len(),
        first_issue_date: records.iter().map(|r| r.issue_date.date()).min(),
        last_issue_date: records.iter().map(|r| r.issue_date.date()).max(),
        unique_customers: customers.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const HEADER: &str = "Customer_ID,Issue_Date,Payment_Date,Shipment_Status,Invoice_Total,Distance_Km,Shipment_Cost,Quantity,Goods_Weight\n";

    fn load(body: &str) -> Result<(Vec<ShipmentRecord>, DataOverview)> {
        read_shipments(format!("{HEADER}{body}").as_bytes())
    }

    #[test]
    fn derives_payment_delay_and_overview() {
        let (records, overview) = load(
            "C1,2024-01-01,2024-01-15,Delivered,\"1,000.50\",120,80,3,12.5\n\
             C2,2024-02-10,2024-02-01,Delayed,500,60,,1,4\n\
             C1,2024-03-01,2024-03-01,In Transit,250,30,20,2,1\n",
        )
        .unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].payment_delay_days, 14);
        assert_eq!(records[1].payment_delay_days, -9);
        assert_eq!(records[2].payment_delay_days, 0);
        assert_eq!(records[0].invoice_total, 1000.5);
        assert!(records[1].shipment_cost.is_nan());
        assert_eq!(records[1].shipment_status.as_deref(), Some("Delayed"));

        assert_eq!(overview.total_records, 3);
        assert_eq!(overview.unique_customers, 2);
        assert_eq!(overview.first_issue_date, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(overview.last_issue_date, NaiveDate::from_ymd_opt(2024, 3, 1));
    }

    #[test]
    fn missing_column_is_fatal() {
        let err = read_shipments(
            "Customer_ID,Issue_Date,Payment_Date\nC1,2024-01-01,2024-01-02\n".as_bytes(),
        )
        .unwrap_err();
        assert!(matches!(err, ReportError::MissingColumn(ref c) if c == "Shipment_Status"));
    }

    #[test]
    fn unparseable_date_reports_line() {
        let err = load(
            "C1,2024-01-01,2024-01-15,Delivered,1,1,1,1,1\n\
             C2,2024-01-01,someday,Delivered,1,1,1,1,1\n",
        )
        .unwrap_err();
        match err {
            ReportError::InvalidDate {
                line,
                column,
                value,
            } => {
                assert_eq!(line, 3);
                assert_eq!(column, "Payment_Date");
                assert_eq!(value, "someday");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_status_is_dropped() {
        let (records, _) = load("C1,2024-01-01,2024-01-02, ,1,1,1,1,1\n").unwrap();
        assert_eq!(records[0].shipment_status, None);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_shipments(Path::new("definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, ReportError::Io { .. }));
    }
}
