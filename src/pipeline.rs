//! One full report run: load, analyze, draw, lay out, write.

use std::path::PathBuf;

use log::info;

use crate::analysis::analyze;
use crate::charts::{self, ChartFiles, ChartSet};
use crate::config::ReportConfig;
use crate::document::{compose, ReportDocument};
use crate::error::Result;
use crate::fonts::FontBundle;
use crate::loader::load_shipments;
use crate::output::{preview_analysis, print_overview, write_json, write_pdf};
use crate::pdf;
use crate::types::ReportSummary;

/// What a successful run produced.
#[derive(Debug)]
pub struct RunOutcome {
    pub output: PathBuf,
    pub records: usize,
    pub document: ReportDocument,
    pub charts: ChartSet,
}

/// Run the whole report. The document is composed before fonts and charts
/// are touched, so a run that cannot produce its text writes nothing.
pub fn run(config: &ReportConfig) -> Result<RunOutcome> {
    info!("Loading shipments from {}", config.input.display());
    let (records, overview) = load_shipments(&config.input)?;
    print_overview(&overview);

    let analysis = analyze(&records);
    preview_analysis(&analysis);

    let document = compose(config, &analysis)?;

    let fonts = FontBundle::discover(config.fonts_dir.as_deref())?;
    charts::register_fonts(&fonts)?;
    let chart_set = charts::render_all(&records, &analysis)?;

    let pdf_bytes = match &config.chart_dir {
        Some(dir) => {
            // Dropped at the end of this arm, on success or error.
            let files = ChartFiles::persist(&chart_set, dir)?;
            pdf::render(&document, &files, &fonts)?
        }
        None => pdf::render(&document, &chart_set, &fonts)?,
    };
    write_pdf(&config.output, &pdf_bytes)?;

    if let Some(path) = &config.summary_json {
        write_json(
            path,
            &ReportSummary {
                overview: &overview,
                analysis: &analysis,
            },
        )?;
    }

    info!("Report complete: {}", config.output.display());
    Ok(RunOutcome {
        output: config.output.clone(),
        records: records.len(),
        document,
        charts: chart_set,
    })
}
