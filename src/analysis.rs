use crate::types::{
    AnalysisResults, CorrelationMatrix, NumericColumn, PaymentAnalysis, PaymentStats,
    ShipmentRecord, StatusDistribution, StatusShare,
};
use crate::util::{has_spread, nan_mean, nan_sum, pearson};
use log::info;
use std::collections::{BTreeMap, HashMap};

const MILLION: f64 = 1e6;

pub fn analyze(records: &[ShipmentRecord]) -> AnalysisResults {
    info!("Analyzing {} shipments", records.len());
    AnalysisResults {
        status_distribution: status_distribution(records),
        payment_analysis: payment_analysis(records),
        correlation_matrix: correlation_matrix(records),
    }
}

/// Percentage of records per status. Records without a status are left out
/// of both numerator and denominator.
pub fn status_distribution(records: &[ShipmentRecord]) -> StatusDistribution {
    // (first-seen position, count) so ties keep input order after sorting.
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for status in records.iter().filter_map(|r| r.shipment_status.as_deref()) {
        let next = counts.len();
        let e = counts.entry(status).or_insert((next, 0));
        e.1 += 1;
    }
    let total: usize = counts.values().map(|(_, c)| c).sum();
    if total == 0 {
        return StatusDistribution::default();
    }

    let mut ordered: Vec<(&str, usize, usize)> = counts
        .into_iter()
        .map(|(status, (seen, count))| (status, seen, count))
        .collect();
    ordered.sort_by(|a, b| b.2.cmp(&a.2).then(a.1.cmp(&b.1)));

    StatusDistribution {
        shares: ordered
            .into_iter()
            .map(|(status, _, count)| StatusShare {
                status: status.to_string(),
                count,
                percent: count as f64 / total as f64 * 100.0,
            })
            .collect(),
    }
}

/// Mean invoice total and total invoice volume (in millions) per status.
pub fn payment_analysis(records: &[ShipmentRecord]) -> PaymentAnalysis {
    let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for r in records {
        if let Some(status) = &r.shipment_status {
            groups
                .entry(status.clone())
                .or_default()
                .push(r.invoice_total);
        }
    }
    PaymentAnalysis {
        by_status: groups
            .into_iter()
            .map(|(status, totals)| {
                let stats = PaymentStats {
                    shipments: totals.len(),
                    mean_invoice: nan_mean(&totals),
                    total_invoice_millions: nan_sum(&totals) / MILLION,
                };
                (status, stats)
            })
            .collect(),
    }
}

/// Pairwise Pearson correlation over the four cost-related columns.
pub fn correlation_matrix(records: &[ShipmentRecord]) -> CorrelationMatrix {
    let columns: Vec<Vec<f64>> = NumericColumn::ALL
        .iter()
        .map(|c| records.iter().map(|r| r.numeric(*c)).collect())
        .collect();

    let mut values = [[f64::NAN; 4]; 4];
    for i in 0..columns.len() {
        values[i][i] = if has_spread(&columns[i]) { 1.0 } else { f64::NAN };
        for j in (i + 1)..columns.len() {
            let r = pearson(&columns[i], &columns[j]);
            values[i][j] = r;
            values[j][i] = r;
        }
    }
    CorrelationMatrix { values }
}
