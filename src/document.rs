//! Typed content model of the PDF report and its composition from the
//! analysis results.

use log::{info, warn};
use tabled::Tabled;

use crate::charts::ChartKind;
use crate::config::ReportConfig;
use crate::error::{ReportError, Result};
use crate::types::AnalysisResults;

/// Status the executive summary reports on.
pub const DELIVERED_STATUS: &str = "Delivered";

#[derive(Debug, Clone, PartialEq)]
pub struct TableBlock {
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TableBlock {
    pub fn from_rows<T: Tabled>(title: impl Into<String>, rows: &[T]) -> Self {
        Self {
            title: title.into(),
            headers: T::headers().into_iter().map(|h| h.into_owned()).collect(),
            rows: rows
                .iter()
                .map(|r| r.fields().into_iter().map(|f| f.into_owned()).collect())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Title(String),
    /// Centered lines under the title.
    AuthorBlock(Vec<String>),
    Heading(String),
    Paragraph(String),
    Figure { chart: ChartKind, caption: String },
    Table(TableBlock),
    Recommendation { title: String, body: String },
    /// Vertical gap in points.
    Spacer(f64),
    Footer(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportDocument {
    pub title: String,
    pub author: String,
    pub blocks: Vec<Block>,
}

impl ReportDocument {
    /// Every piece of text in reading order, one block per line.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            match block {
                Block::Title(t) | Block::Heading(t) | Block::Paragraph(t) | Block::Footer(t) => {
                    out.push_str(t);
                }
                Block::AuthorBlock(lines) => out.push_str(&lines.join(" | ")),
                Block::Figure { caption, .. } => out.push_str(caption),
                Block::Table(table) => {
                    out.push_str(&table.title);
                    out.push('\n');
                    out.push_str(&table.headers.join(" | "));
                    for row in &table.rows {
                        out.push('\n');
                        out.push_str(&row.join(" | "));
                    }
                }
                Block::Recommendation { title, body } => {
                    out.push_str(&format!("{title}: {body}"));
                }
                Block::Spacer(_) => continue,
            }
            out.push('\n');
        }
        out
    }

    pub fn figures(&self) -> impl Iterator<Item = ChartKind> + '_ {
        self.blocks.iter().filter_map(|b| match b {
            Block::Figure { chart, .. } => Some(*chart),
            _ => None,
        })
    }
}

fn executive_summary(config: &ReportConfig, analysis: &AnalysisResults) -> Result<String> {
    let delivered = analysis.status_distribution.share_of(DELIVERED_STATUS);
    let rate_clause = match delivered {
        Some(rate) => format!("a {:.1}% successful delivery rate", rate),
        None if config.require_delivered => {
            return Err(ReportError::MissingStatus(DELIVERED_STATUS.to_string()));
        }
        None => {
            warn!("No \"{}\" shipments; delivery rate omitted", DELIVERED_STATUS);
            "that the successful delivery rate is not available for this dataset".to_string()
        }
    };
    Ok(format!(
        "Through comprehensive analysis of the shipping dataset, key operational patterns \
         and optimization opportunities have been identified. The analysis reveals {} \
         with notable correlations between shipping distance and operational costs.",
        rate_clause
    ))
}

/// Lay out the report in its fixed section order. Fails only when the
/// delivery rate is required and missing.
pub fn compose(config: &ReportConfig, analysis: &AnalysisResults) -> Result<ReportDocument> {
    let narrative = &config.narrative;
    let mut blocks = vec![
        Block::Title(narrative.title.clone()),
        Block::Spacer(12.0),
        Block::AuthorBlock(vec![
            format!("Prepared by: {}", narrative.author),
            format!("Date: {}", config.report_date.format("%B %d, %Y")),
            format!("Company: {}", narrative.company),
        ]),
        Block::Spacer(24.0),
        Block::Heading("Executive Summary".to_string()),
        Block::Paragraph(executive_summary(config, analysis)?),
        Block::Spacer(24.0),
        Block::Heading("Key Findings".to_string()),
    ];

    for (chart, caption) in [
        (ChartKind::StatusDistribution, &narrative.status_caption),
        (ChartKind::DistanceCost, &narrative.distance_cost_caption),
    ] {
        blocks.push(Block::Figure {
            chart,
            caption: caption.clone(),
        });
        blocks.push(Block::Spacer(12.0));
    }

    blocks.push(Block::Table(TableBlock::from_rows(
        "Invoice totals by shipment status",
        &analysis.payment_analysis.rows(),
    )));
    blocks.push(Block::Spacer(12.0));
    blocks.push(Block::Table(TableBlock::from_rows(
        "Correlation of cost drivers (Pearson r)",
        &analysis.correlation_matrix.rows(),
    )));
    blocks.push(Block::Spacer(24.0));

    blocks.push(Block::Heading("Professional Recommendations".to_string()));
    for rec in &narrative.recommendations {
        blocks.push(Block::Recommendation {
            title: rec.title.clone(),
            body: rec.body.clone(),
        });
        blocks.push(Block::Spacer(8.0));
    }

    blocks.push(Block::Spacer(24.0));
    blocks.push(Block::Footer(narrative.footer()));

    info!("Composed report with {} blocks", blocks.len());
    Ok(ReportDocument {
        title: narrative.title.clone(),
        author: narrative.author.clone(),
        blocks,
    })
}
