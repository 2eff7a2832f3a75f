use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tabled::Tabled;

use crate::util::{format_int, format_number};

/// Column names the loader insists on before reading any row.
pub const REQUIRED_COLUMNS: [&str; 9] = [
    "Customer_ID",
    "Issue_Date",
    "Payment_Date",
    "Shipment_Status",
    "Invoice_Total",
    "Distance_Km",
    "Shipment_Cost",
    "Quantity",
    "Goods_Weight",
];

#[derive(Debug, Deserialize)]
pub struct RawRow {
    #[serde(rename = "Customer_ID")]
    pub customer_id: Option<String>,
    #[serde(rename = "Issue_Date")]
    pub issue_date: Option<String>,
    #[serde(rename = "Payment_Date")]
    pub payment_date: Option<String>,
    #[serde(rename = "Shipment_Status")]
    pub shipment_status: Option<String>,
    #[serde(rename = "Invoice_Total")]
    pub invoice_total: Option<String>,
    #[serde(rename = "Distance_Km")]
    pub distance_km: Option<String>,
    #[serde(rename = "Shipment_Cost")]
    pub shipment_cost: Option<String>,
    #[serde(rename = "Quantity")]
    pub quantity: Option<String>,
    #[serde(rename = "Goods_Weight")]
    pub goods_weight: Option<String>,
}

/// One parsed shipment. Numeric fields hold NaN when the cell was empty or
/// not a number.
#[derive(Debug, Clone)]
pub struct ShipmentRecord {
    pub customer_id: String,
    pub issue_date: NaiveDateTime,
    pub payment_date: NaiveDateTime,
    pub payment_delay_days: i64,
    pub shipment_status: Option<String>,
    pub invoice_total: f64,
    pub distance_km: f64,
    pub shipment_cost: f64,
    pub quantity: f64,
    pub goods_weight: f64,
}

impl ShipmentRecord {
    pub fn numeric(&self, column: NumericColumn) -> f64 {
        match column {
            NumericColumn::DistanceKm => self.distance_km,
            NumericColumn::ShipmentCost => self.shipment_cost,
            NumericColumn::Quantity => self.quantity,
            NumericColumn::GoodsWeight => self.goods_weight,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DataOverview {
    pub total_records: usize,
    pub first_issue_date: Option<NaiveDate>,
    pub last_issue_date: Option<NaiveDate>,
    pub unique_customers: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NumericColumn {
    DistanceKm,
    ShipmentCost,
    Quantity,
    GoodsWeight,
}

impl NumericColumn {
    pub const ALL: [NumericColumn; 4] = [
        NumericColumn::DistanceKm,
        NumericColumn::ShipmentCost,
        NumericColumn::Quantity,
        NumericColumn::GoodsWeight,
    ];

    pub fn name(self) -> &'static str {
        match self {
            NumericColumn::DistanceKm => "Distance_Km",
            NumericColumn::ShipmentCost => "Shipment_Cost",
            NumericColumn::Quantity => "Quantity",
            NumericColumn::GoodsWeight => "Goods_Weight",
        }
    }

    pub fn index(self) -> usize {
        match self {
            NumericColumn::DistanceKm => 0,
            NumericColumn::ShipmentCost => 1,
            NumericColumn::Quantity => 2,
            NumericColumn::GoodsWeight => 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StatusShare {
    pub status: String,
    pub count: usize,
    pub percent: f64,
}

/// Share of records per status, most frequent first.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct StatusDistribution {
    pub shares: Vec<StatusShare>,
}

impl StatusDistribution {
    pub fn share_of(&self, status: &str) -> Option<f64> {
        self.shares
            .iter()
            .find(|s| s.status == status)
            .map(|s| s.percent)
    }

    pub fn is_empty(&self) -> bool {
        self.shares.is_empty()
    }

    pub fn total_percent(&self) -> f64 {
        self.shares.iter().map(|s| s.percent).sum()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PaymentStats {
    pub shipments: usize,
    pub mean_invoice: f64,
    pub total_invoice_millions: f64,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct PaymentAnalysis {
    pub by_status: BTreeMap<String, PaymentStats>,
}

/// Pearson coefficients over [`NumericColumn::ALL`], indexed by
/// [`NumericColumn::index`].
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub values: [[f64; 4]; 4],
}

impl CorrelationMatrix {
    pub fn get(&self, a: NumericColumn, b: NumericColumn) -> f64 {
        self.values[a.index()][b.index()]
    }
}

impl Serialize for CorrelationMatrix {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // Nested column-name maps, NaN rendered as null by serde_json.
        let map: BTreeMap<&str, BTreeMap<&str, Option<f64>>> = NumericColumn::ALL
            .iter()
            .map(|row| {
                let inner = NumericColumn::ALL
                    .iter()
                    .map(|col| {
                        let v = self.get(*row, *col);
                        (col.name(), if v.is_finite() { Some(v) } else { None })
                    })
                    .collect();
                (row.name(), inner)
            })
            .collect();
        map.serialize(serializer)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResults {
    pub status_distribution: StatusDistribution,
    pub payment_analysis: PaymentAnalysis,
    pub correlation_matrix: CorrelationMatrix,
}

#[derive(Debug, Serialize)]
pub struct ReportSummary<'a> {
    pub overview: &'a DataOverview,
    #[serde(flatten)]
    pub analysis: &'a AnalysisResults,
}

#[derive(Debug, Tabled, Clone)]
pub struct StatusRow {
    #[tabled(rename = "Status")]
    pub status: String,
    #[tabled(rename = "Shipments")]
    pub shipments: String,
    #[tabled(rename = "Share (%)")]
    pub percent: String,
}

#[derive(Debug, Tabled, Clone)]
pub struct PaymentRow {
    #[tabled(rename = "Status")]
    pub status: String,
    #[tabled(rename = "Shipments")]
    pub shipments: String,
    #[tabled(rename = "Mean Invoice")]
    pub mean_invoice: String,
    #[tabled(rename = "Total Invoice (M)")]
    pub total_invoice_millions: String,
}

#[derive(Debug, Tabled, Clone)]
pub struct CorrelationRow {
    #[tabled(rename = "")]
    pub column: String,
    #[tabled(rename = "Distance_Km")]
    pub distance_km: String,
    #[tabled(rename = "Shipment_Cost")]
    pub shipment_cost: String,
    #[tabled(rename = "Quantity")]
    pub quantity: String,
    #[tabled(rename = "Goods_Weight")]
    pub goods_weight: String,
}

impl StatusDistribution {
    pub fn rows(&self) -> Vec<StatusRow> {
        self.shares
            .iter()
            .map(|s| StatusRow {
                status: s.status.clone(),
                shipments: format_int(s.count),
                percent: format_number(s.percent, 1),
            })
            .collect()
    }
}

impl PaymentAnalysis {
    pub fn rows(&self) -> Vec<PaymentRow> {
        self.by_status
            .iter()
            .map(|(status, stats)| PaymentRow {
                status: status.clone(),
                shipments: format_int(stats.shipments),
                mean_invoice: format_number(stats.mean_invoice, 2),
                total_invoice_millions: format_number(stats.total_invoice_millions, 2),
            })
            .collect()
    }
}

impl CorrelationMatrix {
    pub fn rows(&self) -> Vec<CorrelationRow> {
        let cell = |a: NumericColumn, b: NumericColumn| format_number(self.get(a, b), 2);
        NumericColumn::ALL
            .iter()
            .map(|&row| CorrelationRow {
                column: row.name().to_string(),
                distance_km: cell(row, NumericColumn::DistanceKm),
                shipment_cost: cell(row, NumericColumn::ShipmentCost),
                quantity: cell(row, NumericColumn::Quantity),
                goods_weight: cell(row, NumericColumn::GoodsWeight),
            })
            .collect()
    }
}
