//! Chart rendering into in-memory PNGs, plus the scoped on-disk copies the
//! report reads while it is being built.

use std::fs;
use std::io::{self, Cursor};
use std::ops::Range;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageOutputFormat, RgbImage};
use log::{debug, info, warn};
use once_cell::sync::OnceCell;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{register_font, FontStyle};

use crate::error::{ReportError, Result};
use crate::fonts::FontBundle;
use crate::types::{
    AnalysisResults, CorrelationMatrix, NumericColumn, ShipmentRecord, StatusDistribution,
};

const CHART_FONT: &str = "sans-serif";
const CHART_SIZE: (u32, u32) = (1000, 600);
const BAR_GAP: u32 = 18;

static CHART_FONTS: OnceCell<()> = OnceCell::new();

/// Every chart the report can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartKind {
    StatusDistribution,
    DistanceCost,
}

impl ChartKind {
    pub const ALL: [ChartKind; 2] = [ChartKind::StatusDistribution, ChartKind::DistanceCost];

    pub fn file_name(self) -> &'static str {
        match self {
            ChartKind::StatusDistribution => "status_distribution.png",
            ChartKind::DistanceCost => "distance_cost.png",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedChart {
    pub kind: ChartKind,
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

/// One rendered chart per [`ChartKind`].
#[derive(Debug, Clone)]
pub struct ChartSet {
    status_distribution: RenderedChart,
    distance_cost: RenderedChart,
}

impl ChartSet {
    pub fn new(status_distribution: RenderedChart, distance_cost: RenderedChart) -> Self {
        debug_assert_eq!(status_distribution.kind, ChartKind::StatusDistribution);
        debug_assert_eq!(distance_cost.kind, ChartKind::DistanceCost);
        Self {
            status_distribution,
            distance_cost,
        }
    }

    pub fn get(&self, kind: ChartKind) -> &RenderedChart {
        match kind {
            ChartKind::StatusDistribution => &self.status_distribution,
            ChartKind::DistanceCost => &self.distance_cost,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &RenderedChart> + '_ {
        ChartKind::ALL.into_iter().map(move |kind| self.get(kind))
    }
}

/// Where the PDF renderer should read a figure from.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource<'a> {
    Bytes(&'a [u8]),
    Path(PathBuf),
}

pub trait FigureImages {
    fn image_source(&self, kind: ChartKind) -> ImageSource<'_>;
}

impl FigureImages for ChartSet {
    fn image_source(&self, kind: ChartKind) -> ImageSource<'_> {
        ImageSource::Bytes(&self.get(kind).png)
    }
}

/// Chart PNGs written to a directory for the lifetime of this value.
///
/// Files are removed on drop, including when `persist` itself fails half
/// way, and a file that is already gone is not an error.
#[derive(Debug)]
pub struct ChartFiles {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl ChartFiles {
    pub fn persist(charts: &ChartSet, dir: &Path) -> Result<Self> {
        let mut files = ChartFiles {
            dir: dir.to_path_buf(),
            written: Vec::new(),
        };
        for chart in charts.iter() {
            let path = dir.join(chart.kind.file_name());
            files.written.push(path.clone());
            fs::write(&path, &chart.png).map_err(|e| ReportError::io(&path, e))?;
            debug!("Wrote chart {}", path.display());
        }
        Ok(files)
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.written
    }
}

impl FigureImages for ChartFiles {
    fn image_source(&self, kind: ChartKind) -> ImageSource<'_> {
        ImageSource::Path(self.dir.join(kind.file_name()))
    }
}

impl Drop for ChartFiles {
    fn drop(&mut self) {
        for path in self.written.drain(..) {
            match fs::remove_file(&path) {
                Ok(()) => debug!("Removed chart {}", path.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!("Could not remove chart {}: {}", path.display(), e),
            }
        }
    }
}

fn title_font() -> FontDesc<'static> {
    (CHART_FONT, 28.0).into_font().style(FontStyle::Bold)
}

fn chart_err<E: std::fmt::Display>(err: E) -> ReportError {
    ReportError::Chart(err.to_string())
}

/// Make the report font available to plotters. Registration is process
/// global, so only the first bundle wins.
pub fn register_fonts(fonts: &FontBundle) -> Result<()> {
    CHART_FONTS.get_or_try_init(|| -> Result<()> {
        let regular: &'static [u8] = Box::leak(fonts.regular.clone().into_boxed_slice());
        let bold: &'static [u8] = Box::leak(fonts.bold.clone().into_boxed_slice());
        let rejected = |face: &str| {
            ReportError::Font(format!("{} {} face rejected by plotters", fonts.family, face))
        };
        register_font(CHART_FONT, FontStyle::Normal, regular).map_err(|_| rejected("regular"))?;
        register_font(CHART_FONT, FontStyle::Bold, bold).map_err(|_| rejected("bold"))?;
        debug!("Registered {} for charts", fonts.family);
        Ok(())
    })?;
    Ok(())
}

pub fn render_all(records: &[ShipmentRecord], analysis: &AnalysisResults) -> Result<ChartSet> {
    info!("Rendering charts");
    Ok(ChartSet::new(
        render_status_distribution(&analysis.status_distribution)?,
        render_distance_cost(records, &analysis.correlation_matrix)?,
    ))
}

/// Bar per status with its percentage printed just above the bar.
pub fn render_status_distribution(dist: &StatusDistribution) -> Result<RenderedChart> {
    let (width, height) = CHART_SIZE;
    let labels: Vec<String> = dist.shares.iter().map(|s| s.status.clone()).collect();
    let segments = labels.len().max(1) as i32;
    let y_max = dist.shares.iter().map(|s| s.percent).fold(0.0, f64::max) * 1.1 + 5.0;
    let value_style = TextStyle::from((CHART_FONT, 18.0).into_font())
        .pos(Pos::new(HPos::Center, VPos::Bottom));

    let mut buffer = vec![0u8; (width * height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(chart_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption("Shipment Status Distribution", title_font())
            .margin(20)
            .x_label_area_size(60)
            .y_label_area_size(80)
            .build_cartesian_2d((0..segments).into_segmented(), 0f64..y_max)
            .map_err(chart_err)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(labels.len().max(1))
            .x_label_formatter(&|v| match v {
                SegmentValue::CenterOf(i) => labels.get(*i as usize).cloned().unwrap_or_default(),
                _ => String::new(),
            })
            .x_desc("Status")
            .y_desc("Percentage (%)")
            .label_style((CHART_FONT, 16))
            .axis_desc_style((CHART_FONT, 18))
            .draw()
            .map_err(chart_err)?;

        let bar = |i: usize, percent: f64, style: ShapeStyle| {
            let i = i as i32;
            let mut rect = Rectangle::new(
                [(SegmentValue::Exact(i), 0.0), (SegmentValue::Exact(i + 1), percent)],
                style,
            );
            rect.set_margin(0, 0, BAR_GAP, BAR_GAP);
            rect
        };
        chart
            .draw_series(
                dist.shares
                    .iter()
                    .enumerate()
                    .map(|(i, s)| bar(i, s.percent, Palette99::pick(i).filled())),
            )
            .map_err(chart_err)?;
        chart
            .draw_series(
                dist.shares
                    .iter()
                    .enumerate()
                    .map(|(i, s)| bar(i, s.percent, BLACK.stroke_width(1))),
            )
            .map_err(chart_err)?;
        chart
            .draw_series(dist.shares.iter().enumerate().map(|(i, s)| {
                Text::new(
                    format!("{:.1}%", s.percent),
                    (SegmentValue::CenterOf(i as i32), s.percent + 1.0),
                    value_style.clone(),
                )
            }))
            .map_err(chart_err)?;

        root.present().map_err(chart_err)?;
    }
    encode_png(ChartKind::StatusDistribution, buffer, width, height)
}

/// Scatter of distance against shipment cost. Rows with a missing value in
/// either column are skipped.
pub fn render_distance_cost(
    records: &[ShipmentRecord],
    correlations: &CorrelationMatrix,
) -> Result<RenderedChart> {
    let (width, height) = CHART_SIZE;
    let points: Vec<(f64, f64)> = records
        .iter()
        .map(|r| (r.distance_km, r.shipment_cost))
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .collect();
    let x_range = padded_range(points.iter().map(|p| p.0));
    let y_range = padded_range(points.iter().map(|p| p.1));
    let r = correlations.get(NumericColumn::DistanceKm, NumericColumn::ShipmentCost);
    let caption = if r.is_finite() {
        format!("Shipping Distance vs Operational Cost (r = {:.2})", r)
    } else {
        "Shipping Distance vs Operational Cost".to_string()
    };

    let mut buffer = vec![0u8; (width * height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(chart_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(caption, title_font())
            .margin(20)
            .x_label_area_size(60)
            .y_label_area_size(90)
            .build_cartesian_2d(x_range, y_range)
            .map_err(chart_err)?;

        chart
            .configure_mesh()
            .x_desc("Distance (km)")
            .y_desc("Shipment Cost")
            .label_style((CHART_FONT, 16))
            .axis_desc_style((CHART_FONT, 18))
            .draw()
            .map_err(chart_err)?;

        chart
            .draw_series(
                points
                    .iter()
                    .map(|p| Circle::new(*p, 3, Palette99::pick(0).mix(0.6).filled())),
            )
            .map_err(chart_err)?;

        root.present().map_err(chart_err)?;
    }
    encode_png(ChartKind::DistanceCost, buffer, width, height)
}

fn padded_range(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !lo.is_finite() || !hi.is_finite() {
        return 0.0..1.0;
    }
    let pad = if hi > lo {
        (hi - lo) * 0.05
    } else {
        lo.abs().max(1.0) * 0.05
    };
    (lo - pad)..(hi + pad)
}

fn encode_png(kind: ChartKind, buffer: Vec<u8>, width: u32, height: u32) -> Result<RenderedChart> {
    let image = RgbImage::from_raw(width, height, buffer)
        .ok_or_else(|| ReportError::Chart("pixel buffer does not match chart size".to_string()))?;
    let mut png = Vec::new();
    DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut png), ImageOutputFormat::Png)
        .map_err(chart_err)?;
    debug!("Encoded {:?} chart ({} bytes)", kind, png.len());
    Ok(RenderedChart {
        kind,
        width,
        height,
        png,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze;
    use crate::util::parse_datetime;

    fn placeholder(kind: ChartKind) -> RenderedChart {
        RenderedChart {
            kind,
            width: 1,
            height: 1,
            png: kind.file_name().as_bytes().to_vec(),
        }
    }

    fn placeholder_set() -> ChartSet {
        ChartSet::new(
            placeholder(ChartKind::StatusDistribution),
            placeholder(ChartKind::DistanceCost),
        )
    }

    fn sample_records() -> Vec<ShipmentRecord> {
        let day = parse_datetime("2024-05-01").unwrap();
        ["Delivered", "Delivered", "Delayed", "In Transit", "Delivered"]
            .iter()
            .enumerate()
            .map(|(i, status)| ShipmentRecord {
                customer_id: format!("C{i}"),
                issue_date: day,
                payment_date: day,
                payment_delay_days: 0,
                shipment_status: Some(status.to_string()),
                invoice_total: 100.0 * (i + 1) as f64,
                distance_km: 50.0 * (i + 1) as f64,
                shipment_cost: 12.0 * (i + 1) as f64 + (i % 2) as f64,
                quantity: (i + 1) as f64,
                goods_weight: (i * 3 % 5) as f64,
            })
            .collect()
    }

    fn fonts_or_skip(test: &str) -> bool {
        match FontBundle::discover(None).and_then(|f| register_fonts(&f)) {
            Ok(()) => true,
            Err(e) => {
                eprintln!("Skipping {test}: {e}");
                false
            }
        }
    }

    #[test]
    fn every_kind_resolves_to_its_chart() {
        let set = placeholder_set();
        for kind in ChartKind::ALL {
            assert_eq!(set.get(kind).kind, kind);
            assert_eq!(
                set.image_source(kind),
                ImageSource::Bytes(kind.file_name().as_bytes())
            );
        }
        assert_eq!(set.iter().count(), 2);
    }

    #[test]
    fn chart_files_are_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let files = ChartFiles::persist(&placeholder_set(), dir.path()).unwrap();
        let paths = files.paths().to_vec();
        assert_eq!(paths.len(), 2);
        assert!(paths.iter().all(|p| p.is_file()));
        assert_eq!(
            files.image_source(ChartKind::DistanceCost),
            ImageSource::Path(dir.path().join("distance_cost.png"))
        );

        // One file already gone must not upset cleanup.
        fs::remove_file(&paths[0]).unwrap();
        drop(files);
        assert!(paths.iter().all(|p| !p.exists()));
    }

    #[test]
    fn failed_persist_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        // A directory squatting on the second file name makes its write fail.
        fs::create_dir(dir.path().join("distance_cost.png")).unwrap();
        let err = ChartFiles::persist(&placeholder_set(), dir.path()).unwrap_err();
        assert!(matches!(err, ReportError::Io { .. }));
        assert!(!dir.path().join("status_distribution.png").exists());
    }

    #[test]
    fn unreadable_font_is_rejected_or_already_registered() {
        let bogus = FontBundle {
            family: "Bogus".to_string(),
            directory: PathBuf::from("/nowhere"),
            regular: b"not a font".to_vec(),
            bold: b"not a font".to_vec(),
            italic: Vec::new(),
            bold_italic: Vec::new(),
        };
        // Another test may have registered a real family first; the first
        // successful registration wins for the whole process.
        match register_fonts(&bogus) {
            Ok(()) => assert!(CHART_FONTS.get().is_some()),
            Err(e) => assert!(matches!(e, ReportError::Font(ref m) if m.contains("Bogus"))),
        }
    }

    #[test]
    fn padded_range_handles_degenerate_input() {
        assert_eq!(padded_range(std::iter::empty()), 0.0..1.0);
        let r = padded_range([5.0, 5.0].into_iter());
        assert!(r.start < 5.0 && r.end > 5.0);
        let r = padded_range([0.0, 100.0].into_iter());
        assert_eq!(r, -5.0..105.0);
    }

    #[test]
    fn charts_are_deterministic_pngs() {
        if !fonts_or_skip("charts_are_deterministic_pngs") {
            return;
        }
        let records = sample_records();
        let analysis = analyze(&records);
        let first = render_all(&records, &analysis).unwrap();
        let second = render_all(&records, &analysis).unwrap();
        for kind in ChartKind::ALL {
            let chart = first.get(kind);
            assert_eq!(chart.png, second.get(kind).png, "{kind:?} differs between runs");
            let decoded = image::load_from_memory(&chart.png).unwrap();
            assert_eq!(
                image::GenericImageView::dimensions(&decoded),
                CHART_SIZE
            );
        }
    }
}
