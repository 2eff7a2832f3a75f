//! Rendering a [`ReportDocument`] to PDF bytes with `genpdf`.

use genpdf::elements::{Break, FrameCellDecorator, Image, LinearLayout, Paragraph, TableLayout};
use genpdf::style::{Color, Style, StyledString};
use genpdf::{Alignment, Element, Margins, Mm, PaperSize, Scale, SimplePageDecorator};
use image::GenericImageView;
use log::{debug, info};
use lopdf::{Dictionary, Object};

use crate::charts::{FigureImages, ImageSource};
use crate::document::{Block, ReportDocument, TableBlock};
use crate::error::{ReportError, Result};
use crate::fonts::FontBundle;

const DARK_BLUE: Color = Color::Rgb(0, 0, 139);
const DARK_GREEN: Color = Color::Rgb(0, 100, 0);

const FIGURE_WIDTH_PT: f64 = 500.0;
const RECOMMENDATION_INDENT_PT: f64 = 20.0;
const BASE_LINE_PT: f64 = 12.0;
const PAGE_MARGIN_MM: i32 = 18;

// genpdf places images at 300 dpi unless told otherwise.
const DEFAULT_IMAGE_DPI: f64 = 300.0;
const MM_PER_INCH: f64 = 25.4;
const PT_PER_INCH: f64 = 72.0;

fn mm_from_f64(value: f64) -> Mm {
    Mm::from(printpdf::Mm(value))
}

fn pt_to_mm(points: f64) -> f64 {
    points * MM_PER_INCH / PT_PER_INCH
}

/// Named paragraph styles layered over the document's base style.
struct StyleSheet {
    title: Style,
    author: Style,
    heading: Style,
    body: Style,
    caption: Style,
    table_title: Style,
    table_header: Style,
    table_cell: Style,
    bullet: Style,
    recommendation_title: Style,
    recommendation: Style,
}

impl StyleSheet {
    fn new() -> Self {
        let body = Style::new().with_font_size(10);
        Self {
            title: Style::new().bold().with_font_size(20),
            author: Style::new().with_font_size(10).with_color(DARK_BLUE),
            heading: Style::new().bold().with_font_size(14),
            caption: body.italic().with_font_size(9),
            table_title: body.bold(),
            table_header: Style::new().bold().with_font_size(9),
            table_cell: Style::new().with_font_size(9),
            bullet: Style::new().bold().with_font_size(12).with_color(DARK_GREEN),
            recommendation_title: body.bold().with_color(DARK_GREEN),
            recommendation: body.with_color(DARK_GREEN),
            body,
        }
    }
}

/// Render the document, pulling figure images from `images`.
pub fn render<I>(document: &ReportDocument, images: &I, fonts: &FontBundle) -> Result<Vec<u8>>
where
    I: FigureImages + ?Sized,
{
    info!("Rendering PDF '{}'", document.title);
    let styles = StyleSheet::new();

    let mut doc = genpdf::Document::new(fonts.pdf_family()?);
    doc.set_title(document.title.clone());
    doc.set_paper_size(PaperSize::Letter);
    doc.set_font_size(10);
    doc.set_line_spacing(1.25);
    let mut decorator = SimplePageDecorator::new();
    decorator.set_margins(PAGE_MARGIN_MM);
    doc.set_page_decorator(decorator);

    for block in &document.blocks {
        push_block(&mut doc, block, images, &styles)?;
    }

    let mut bytes = Vec::new();
    doc.render(&mut bytes)?;
    debug!("genpdf produced {} bytes", bytes.len());
    set_author(&bytes, &document.author)
}

fn push_block<I>(
    doc: &mut genpdf::Document,
    block: &Block,
    images: &I,
    styles: &StyleSheet,
) -> Result<()>
where
    I: FigureImages + ?Sized,
{
    match block {
        Block::Title(text) => {
            doc.push(
                Paragraph::new(StyledString::new(text.as_str(), styles.title))
                    .aligned(Alignment::Center),
            );
        }
        Block::AuthorBlock(lines) => {
            let mut layout = LinearLayout::vertical();
            for line in lines {
                layout.push(
                    Paragraph::new(StyledString::new(line.as_str(), styles.author))
                        .aligned(Alignment::Center),
                );
            }
            doc.push(layout);
        }
        Block::Heading(text) => {
            doc.push(Paragraph::new(StyledString::new(text.as_str(), styles.heading)));
            doc.push(Break::new(0.5));
        }
        Block::Paragraph(text) => {
            doc.push(Paragraph::new(StyledString::new(text.as_str(), styles.body)));
        }
        Block::Figure { chart, caption } => {
            doc.push(figure_image(images.image_source(*chart))?);
            doc.push(Paragraph::new(StyledString::new(caption.as_str(), styles.caption)));
        }
        Block::Table(table) => {
            doc.push(Paragraph::new(StyledString::new(
                table.title.as_str(),
                styles.table_title,
            )));
            doc.push(Break::new(0.3));
            doc.push(table_layout(table, styles)?);
        }
        Block::Recommendation { title, body } => {
            let mut paragraph = Paragraph::default();
            paragraph.push_styled("\u{203a} ", styles.bullet);
            paragraph.push_styled(format!("{}: ", title), styles.recommendation_title);
            paragraph.push_styled(body.as_str(), styles.recommendation);
            let indent = mm_from_f64(pt_to_mm(RECOMMENDATION_INDENT_PT));
            doc.push(paragraph.padded(Margins::trbl(0, 0, 0, indent)));
        }
        Block::Spacer(points) => {
            doc.push(Break::new(points / BASE_LINE_PT));
        }
        Block::Footer(text) => {
            doc.push(
                Paragraph::new(StyledString::new(text.as_str(), styles.author))
                    .aligned(Alignment::Center),
            );
        }
    }
    Ok(())
}

fn figure_image(source: ImageSource<'_>) -> Result<Image> {
    let dynamic = match source {
        ImageSource::Bytes(bytes) => image::load_from_memory(bytes)
            .map_err(|e| ReportError::Pdf(format!("cannot decode figure: {}", e)))?,
        ImageSource::Path(path) => image::open(&path).map_err(|e| {
            ReportError::Pdf(format!("cannot load figure {}: {}", path.display(), e))
        })?,
    };
    let (px_width, _) = dynamic.dimensions();
    let natural_mm = MM_PER_INCH * px_width as f64 / DEFAULT_IMAGE_DPI;
    let scale = if natural_mm > f64::EPSILON {
        pt_to_mm(FIGURE_WIDTH_PT) / natural_mm
    } else {
        1.0
    };
    let image = Image::from_dynamic_image(dynamic)?
        .with_alignment(Alignment::Center)
        .with_scale(Scale::new(scale, scale));
    Ok(image)
}

fn table_layout(table: &TableBlock, styles: &StyleSheet) -> Result<TableLayout> {
    // First column holds the row label and gets twice the width.
    let weights: Vec<usize> = (0..table.headers.len())
        .map(|i| if i == 0 { 2 } else { 1 })
        .collect();
    let mut layout = TableLayout::new(weights);
    layout.set_cell_decorator(FrameCellDecorator::new(true, true, false));

    let mut header = layout.row();
    for h in &table.headers {
        header.push_element(
            Paragraph::new(StyledString::new(h.as_str(), styles.table_header)).padded(1),
        );
    }
    header.push()?;

    for row in &table.rows {
        let mut cells = layout.row();
        for (i, value) in row.iter().enumerate() {
            let alignment = if i == 0 { Alignment::Left } else { Alignment::Right };
            cells.push_element(
                Paragraph::new(StyledString::new(value.as_str(), styles.table_cell))
                    .aligned(alignment)
                    .padded(1),
            );
        }
        cells.push()?;
    }
    Ok(layout)
}

fn meta_err<E: std::fmt::Display>(err: E) -> ReportError {
    ReportError::Metadata(err.to_string())
}

/// Write `/Author` into the document information dictionary, creating the
/// dictionary if the renderer did not emit one.
pub fn set_author(pdf: &[u8], author: &str) -> Result<Vec<u8>> {
    let mut document = lopdf::Document::load_mem(pdf).map_err(meta_err)?;

    let author = Object::string_literal(author);
    match document.trailer.get(b"Info").and_then(Object::as_reference) {
        Ok(id) => {
            document
                .get_object_mut(id)
                .and_then(Object::as_dict_mut)
                .map_err(meta_err)?
                .set("Author", author);
        }
        Err(_) => {
            if let Ok(info) = document.trailer.get_mut(b"Info").and_then(Object::as_dict_mut) {
                info.set("Author", author);
            } else {
                let mut info = Dictionary::new();
                info.set("Author", author);
                let id = document.add_object(info);
                document.trailer.set("Info", Object::Reference(id));
            }
        }
    }

    let mut buffer = Vec::new();
    document.save_to(&mut buffer).map_err(meta_err)?;
    Ok(buffer)
}
