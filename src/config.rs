//! Paths and narrative text for one report run.

use chrono::NaiveDate;
use std::path::PathBuf;

pub const DEFAULT_INPUT: &str = "fulldataset.csv";
pub const DEFAULT_OUTPUT: &str = "Shipping_Analysis_Report.pdf";
pub const DEFAULT_AUTHOR: &str = "Shipping Analytics";
pub const DEFAULT_COMPANY: &str = "[Your Company Name]";

#[derive(Debug, Clone, PartialEq)]
pub struct ReportConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Charts are written here while the PDF is built; `None` keeps them in
    /// memory only.
    pub chart_dir: Option<PathBuf>,
    pub fonts_dir: Option<PathBuf>,
    pub summary_json: Option<PathBuf>,
    /// Fail instead of writing fallback text when no shipment is "Delivered".
    pub require_delivered: bool,
    pub report_date: NaiveDate,
    pub narrative: Narrative,
}

impl ReportConfig {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>, report_date: NaiveDate) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            chart_dir: None,
            fonts_dir: None,
            summary_json: None,
            require_delivered: false,
            report_date,
            narrative: Narrative::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recommendation {
    pub title: String,
    pub body: String,
}

impl Recommendation {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

/// All prose that ends up in the PDF apart from the computed figures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Narrative {
    pub title: String,
    pub author: String,
    pub company: String,
    pub status_caption: String,
    pub distance_cost_caption: String,
    pub recommendations: Vec<Recommendation>,
}

impl Narrative {
    pub fn footer(&self) -> String {
        format!("Confidential - Prepared Exclusively by {}", self.author)
    }
}

impl Default for Narrative {
    fn default() -> Self {
        Self {
            title: "Shipping Operations Analysis".to_string(),
            author: DEFAULT_AUTHOR.to_string(),
            company: DEFAULT_COMPANY.to_string(),
            status_caption:
                "Figure 1: Distribution of shipment statuses showing delivery success rates"
                    .to_string(),
            distance_cost_caption:
                "Figure 2: Correlation between shipping distance and operational costs".to_string(),
            recommendations: vec![
                Recommendation::new(
                    "Optimize Asian Routes",
                    "Implement volume discounts for high-frequency China-Singapore corridor",
                ),
                Recommendation::new(
                    "Container Management",
                    "Introduce dynamic container allocation based on goods type analysis",
                ),
                Recommendation::new(
                    "Risk Mitigation",
                    "Develop predictive model for at-risk shipments using historical patterns",
                ),
            ],
        }
    }
}
