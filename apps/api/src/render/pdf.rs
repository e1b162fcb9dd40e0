//! Improved-resume PDF: built in memory with lopdf.
//!
//! Uses the built-in Helvetica faces with WinAnsiEncoding, so no font files
//! are needed. Characters that encoding cannot represent print as `?`.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use thiserror::Error;

use crate::models::analysis::{AnalysisResult, ImprovedResume, SectionBody};
use crate::render::font_metrics::{get_metrics, FontFace};

// A4, in points. Margins follow the usual 10 mm page margin with a 15 mm
// bottom break zone that leaves room for the footer.
const PAGE_WIDTH: f32 = 595.28;
const PAGE_HEIGHT: f32 = 841.89;
const MARGIN: f32 = 28.35;
const BOTTOM_BREAK: f32 = 42.52;
const FOOTER_BASELINE: f32 = 24.0;

const TITLE: &str = "Improved Resume";
const NO_CONTENT: &str = "No improvement data available.";
const BULLET: char = '•';

const BLACK: (f32, f32, f32) = (0.0, 0.0, 0.0);
const DODGER_BLUE: (f32, f32, f32) = (30.0 / 255.0, 144.0 / 255.0, 1.0);

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("PDF encoding failed: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("PDF write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Renders `improved_resume` as a downloadable PDF and returns its bytes.
pub fn render_improved_resume_pdf(result: &AnalysisResult) -> Result<Vec<u8>, RenderError> {
    let mut layout = PageLayout::new();
    layout.line(TITLE, FontFace::Bold, 16.0, 28.35, Align::Center, BLACK);
    layout.gap(14.17);

    match result.improved_resume() {
        Some(ImprovedResume::Sections(sections)) => {
            for section in sections {
                layout.line(
                    &section.name.to_uppercase(),
                    FontFace::Bold,
                    12.0,
                    28.35,
                    Align::Left,
                    DODGER_BLUE,
                );
                match section.body {
                    SectionBody::Text(text) => layout.paragraph(&text),
                    SectionBody::Items(items) => {
                        for item in items {
                            layout.paragraph(&format!("{BULLET} {item}"));
                        }
                    }
                }
                layout.gap(8.5);
            }
        }
        Some(ImprovedResume::Text(text)) => layout.paragraph(&text),
        None => layout.paragraph(NO_CONTENT),
    }

    layout.finish()
}

#[derive(Debug, Clone, Copy)]
enum Align {
    Left,
    Center,
}

/// Top-down cursor over a sequence of pages. `y` is the distance from the top edge.
struct PageLayout {
    pages: Vec<Vec<Operation>>,
    current: Vec<Operation>,
    y: f32,
}

impl PageLayout {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: Vec::new(),
            y: MARGIN,
        }
    }

    fn break_page(&mut self) {
        self.pages.push(std::mem::take(&mut self.current));
        self.y = MARGIN;
    }

    fn gap(&mut self, height: f32) {
        self.y += height;
    }

    /// Regular 10pt body text, wrapped to the text width. Explicit newlines
    /// start new lines; blank lines keep their height.
    fn paragraph(&mut self, text: &str) {
        const SIZE: f32 = 10.0;
        const LINE_HEIGHT: f32 = 17.0;
        let metrics = get_metrics(FontFace::Regular);
        let width = PAGE_WIDTH - 2.0 * MARGIN;

        for raw_line in text.lines() {
            let wrapped = metrics.wrap(raw_line, SIZE, width);
            if wrapped.is_empty() {
                self.gap(LINE_HEIGHT);
                continue;
            }
            for line in wrapped {
                self.line(&line, FontFace::Regular, SIZE, LINE_HEIGHT, Align::Left, BLACK);
            }
        }
    }

    /// Writes one line of text, vertically centered in a row of `line_height`.
    fn line(
        &mut self,
        text: &str,
        face: FontFace,
        size: f32,
        line_height: f32,
        align: Align,
        color: (f32, f32, f32),
    ) {
        if self.y + line_height > PAGE_HEIGHT - BOTTOM_BREAK {
            self.break_page();
        }

        let x = match align {
            Align::Left => MARGIN,
            Align::Center => (PAGE_WIDTH - get_metrics(face).measure_pt(text, size)) / 2.0,
        };
        let baseline = self.y + line_height / 2.0 + size * 0.35;

        self.current
            .extend(text_ops(text, face, size, x, PAGE_HEIGHT - baseline, color));
        self.y += line_height;
    }

    fn finish(mut self) -> Result<Vec<u8>, RenderError> {
        self.pages.push(self.current);

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut fonts = lopdf::Dictionary::new();
        for face in [FontFace::Regular, FontFace::Bold, FontFace::Oblique] {
            let font_id = doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => face.base_font(),
                "Encoding" => "WinAnsiEncoding",
            });
            fonts.set(face.resource_name(), font_id);
        }
        let resources_id = doc.add_object(dictionary! { "Font" => fonts });

        let page_count = self.pages.len();
        let mut kids: Vec<Object> = Vec::with_capacity(page_count);
        for (index, mut operations) in self.pages.into_iter().enumerate() {
            operations.extend(footer_ops(index + 1));
            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
            let page_id: ObjectId = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
            });
            kids.push(page_id.into());
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => Object::Integer(page_count as i64),
                "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.compress();

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer)?;
        Ok(buffer)
    }
}

fn text_ops(
    text: &str,
    face: FontFace,
    size: f32,
    x: f32,
    y: f32,
    (r, g, b): (f32, f32, f32),
) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new("rg", vec![r.into(), g.into(), b.into()]),
        Operation::new("Tf", vec![face.resource_name().into(), size.into()]),
        Operation::new("Td", vec![x.into(), y.into()]),
        Operation::new("Tj", vec![Object::string_literal(encode_win_ansi(text))]),
        Operation::new("ET", vec![]),
    ]
}

fn footer_ops(page_number: usize) -> Vec<Operation> {
    const SIZE: f32 = 8.0;
    let label = format!("Page {page_number}");
    let width = get_metrics(FontFace::Oblique).measure_pt(&label, SIZE);
    text_ops(
        &label,
        FontFace::Oblique,
        SIZE,
        (PAGE_WIDTH - width) / 2.0,
        FOOTER_BASELINE,
        BLACK,
    )
}

/// Encodes text for a WinAnsiEncoding simple font.
///
/// Latin-1 printable characters map to themselves and the characters WinAnsi
/// places in 0x80..=0x9F are mapped explicitly. Tabs become spaces; anything
/// else becomes `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' => c as u8,
            '\u{A0}'..='\u{FF}' => c as u32 as u8,
            '\t' => b' ',
            '€' => 0x80,
            '‚' => 0x82,
            'ƒ' => 0x83,
            '„' => 0x84,
            '…' => 0x85,
            '†' => 0x86,
            '‡' => 0x87,
            'ˆ' => 0x88,
            '‰' => 0x89,
            'Š' => 0x8A,
            '‹' => 0x8B,
            'Œ' => 0x8C,
            'Ž' => 0x8E,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '˜' => 0x98,
            '™' => 0x99,
            'š' => 0x9A,
            '›' => 0x9B,
            'œ' => 0x9C,
            'ž' => 0x9E,
            'Ÿ' => 0x9F,
            _ => b'?',
        })
        .collect()
}
