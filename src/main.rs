// Entry point for the shipping report CLI.
//
// Flags map one to one onto `ReportConfig`; everything else happens in
// `pipeline::run`. A failed run exits non-zero with the error chain printed.
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use shipping_report::config::{DEFAULT_AUTHOR, DEFAULT_COMPANY, DEFAULT_INPUT, DEFAULT_OUTPUT};
use shipping_report::fonts::FONTS_DIR_ENV;
use shipping_report::ReportConfig;

#[derive(Parser, Debug)]
#[command(name = "shipping_report", version, about = "Analyze shipments and write a PDF report")]
struct Args {
    /// Shipment dataset (CSV with a header row)
    #[arg(short, long, default_value = DEFAULT_INPUT)]
    input: PathBuf,

    /// Where to write the PDF
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Directory for the temporary chart PNGs
    #[arg(long, default_value = ".", conflicts_with = "in_memory_charts")]
    chart_dir: PathBuf,

    /// Embed charts straight from memory instead of temporary files
    #[arg(long)]
    in_memory_charts: bool,

    /// Directory holding the TTF family used for the PDF and charts
    #[arg(long, env = FONTS_DIR_ENV)]
    fonts_dir: Option<PathBuf>,

    /// Also write the analysis results as JSON
    #[arg(long)]
    summary_json: Option<PathBuf>,

    #[arg(long, default_value = DEFAULT_AUTHOR)]
    author: String,

    #[arg(long, default_value = DEFAULT_COMPANY)]
    company: String,

    /// Fail if no shipment has status "Delivered"
    #[arg(long)]
    require_delivered: bool,
}

impl Args {
    fn into_config(self) -> ReportConfig {
        let today = chrono::Local::now().date_naive();
        let mut config = ReportConfig::new(self.input, self.output, today);
        if !self.in_memory_charts {
            config.chart_dir = Some(self.chart_dir);
        }
        config.fonts_dir = self.fonts_dir;
        config.summary_json = self.summary_json;
        config.require_delivered = self.require_delivered;
        config.narrative.author = self.author;
        config.narrative.company = self.company;
        config
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Args::parse().into_config();
    let outcome = shipping_report::run(&config)
        .with_context(|| format!("could not build report from {}", config.input.display()))?;

    println!(
        "\nReport successfully generated: {} ({} shipments)",
        outcome.output.display(),
        shipping_report::util::format_int(outcome.records)
    );
    Ok(())
}
