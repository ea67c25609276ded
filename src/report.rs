use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use chrono::Local;
use printpdf::image_crate::GenericImageView;
use printpdf::{
    BuiltinFont, ImageTransform, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference,
};

use crate::models::PredictionRecord;

const PAGE_WIDTH_MM: f64 = 210.0;
const PAGE_HEIGHT_MM: f64 = 297.0;
const MARGIN_MM: f64 = 15.0;
const BODY_LINE_MM: f64 = 6.0;
const BODY_WRAP_CHARS: usize = 88;
const IMAGE_WIDTH_MM: f64 = 90.0;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("pdf error: {0}")]
    Pdf(#[from] printpdf::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Top-down text cursor over the document, inserting page breaks when a
/// block would run past the bottom margin.
struct ReportWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    y: f64,
}

impl ReportWriter {
    fn new(title: &str) -> Result<Self, ReportError> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH_MM as f32), Mm(PAGE_HEIGHT_MM as f32), "Layer 1");
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica)?;
        let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;
        let layer = doc.get_page(page).get_layer(layer);
        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            y: MARGIN_MM,
        })
    }

    fn ensure_space(&mut self, needed_mm: f64) {
        if self.y + needed_mm > PAGE_HEIGHT_MM - MARGIN_MM {
            let (page, layer) =
                self.doc
                    .add_page(Mm(PAGE_WIDTH_MM as f32), Mm(PAGE_HEIGHT_MM as f32), "Layer 1");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = MARGIN_MM;
        }
    }

    fn line(&mut self, text: &str, font: &IndirectFontRef, size: f64, advance_mm: f64) {
        self.ensure_space(advance_mm);
        self.y += advance_mm;
        self.layer.use_text(
            text,
            size as f32,
            Mm(MARGIN_MM as f32),
            Mm((PAGE_HEIGHT_MM - self.y) as f32),
            font,
        );
    }

    fn title(&mut self, text: &str) {
        self.ensure_space(10.0);
        self.y += 10.0;
        // Roughly centered for the fixed report title width.
        self.layer.use_text(
            text,
            16.0,
            Mm(60.0),
            Mm((PAGE_HEIGHT_MM - self.y) as f32),
            &self.bold,
        );
    }

    fn heading(&mut self, text: &str) {
        let bold = self.bold.clone();
        self.line(text, &bold, 14.0, 10.0);
    }

    fn body_line(&mut self, text: &str) {
        let regular = self.regular.clone();
        self.line(text, &regular, 12.0, BODY_LINE_MM);
    }

    fn paragraph(&mut self, text: &str) {
        for line in wrap_text(text, BODY_WRAP_CHARS) {
            self.body_line(&line);
        }
    }

    fn bullet(&mut self, text: &str) {
        let mut first = true;
        for line in wrap_text(text, BODY_WRAP_CHARS - 2) {
            if first {
                self.body_line(&format!("- {}", line));
                first = false;
            } else {
                self.body_line(&format!("  {}", line));
            }
        }
    }

    fn spacer(&mut self, mm: f64) {
        self.ensure_space(mm);
        self.y += mm;
    }
}

/// Renders the prediction record as a fixed-layout PDF under
/// `<report_dir>/<username>_report.pdf` and returns that path. A failure to
/// embed the uploaded image is logged and skipped; the rest of the report
/// is still produced.
pub fn generate_report(
    record: &PredictionRecord,
    upload_dir: &Path,
    report_dir: &Path,
) -> Result<PathBuf, ReportError> {
    let report_path = report_dir.join(format!("{}_report.pdf", record.username));
    let mut writer = ReportWriter::new("Rice Disease Detection Report")?;

    writer.title("Rice Disease Detection Report");
    writer.spacer(4.0);
    writer.body_line(&format!("User: {}", record.username));
    writer.body_line(&format!(
        "Date: {}",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    ));
    writer.body_line(&format!("Disease: {}", record.disease));
    writer.body_line(&format!("Confidence: {}%", record.confidence));
    writer.spacer(5.0);

    writer.heading("Description:");
    writer.paragraph(&record.remedy.description);

    if !record.remedy.management.is_empty() {
        writer.heading("Recommended Management Practices:");
        for point in &record.remedy.management {
            writer.bullet(point);
        }
    }

    if !record.remedy.solutions.is_empty() {
        writer.heading("Solutions:");
        for solution in &record.remedy.solutions {
            writer.bullet(solution);
        }
    }

    embed_image(&mut writer, &upload_dir.join(&record.filename));

    let file = File::create(&report_path)?;
    writer.doc.save(&mut BufWriter::new(file))?;
    Ok(report_path)
}

fn embed_image(writer: &mut ReportWriter, image_path: &Path) {
    let img = match printpdf::image_crate::open(image_path) {
        Ok(img) => img,
        Err(e) => {
            log::warn!(
                "could not add image {} to report: {}",
                image_path.display(),
                e
            );
            return;
        }
    };

    // printpdf assumes 300 dpi when no dpi is given; scale to a fixed width.
    let (width_px, height_px) = img.dimensions();
    let width_mm = width_px as f64 / 300.0 * 25.4;
    let height_mm = height_px as f64 / 300.0 * 25.4;
    let scale = IMAGE_WIDTH_MM / width_mm;

    writer.spacer(10.0);
    writer.ensure_space(height_mm * scale);
    writer.y += height_mm * scale;

    let pdf_image = printpdf::Image::from_dynamic_image(&img);
    pdf_image.add_to_layer(
        writer.layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(60.0)),
            translate_y: Some(Mm((PAGE_HEIGHT_MM - writer.y) as f32)),
            scale_x: Some(scale as f32),
            scale_y: Some(scale as f32),
            ..Default::default()
        },
    );
}

fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.len() + 1 + word.len() > max_chars {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remedies::get_remedy;

    #[test]
    fn wrap_text_respects_the_character_budget() {
        let lines = wrap_text("one two three four five six seven", 10);
        assert!(lines.iter().all(|l| l.len() <= 10));
        assert_eq!(lines.join(" "), "one two three four five six seven");
    }

    #[test]
    fn wrap_text_keeps_short_text_on_one_line() {
        assert_eq!(wrap_text("short text", 80), vec!["short text".to_string()]);
        assert!(wrap_text("", 80).is_empty());
    }

    #[test]
    fn spacer_breaks_the_page_instead_of_eating_the_margin() {
        let mut writer = ReportWriter::new("test").unwrap();
        writer.y = PAGE_HEIGHT_MM - MARGIN_MM - 2.0;
        writer.spacer(10.0);
        assert_eq!(writer.y, MARGIN_MM + 10.0);

        // Well clear of the margin, a spacer just advances the cursor.
        let mut writer = ReportWriter::new("test").unwrap();
        writer.y = 100.0;
        writer.spacer(10.0);
        assert_eq!(writer.y, 110.0);
    }

    #[test]
    fn report_is_produced_even_when_the_image_is_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().to_path_buf();

        let record = PredictionRecord {
            username: "alice".into(),
            filename: "does_not_exist.jpg".into(),
            disease: "leaf_blast".into(),
            confidence: 97.13,
            remedy: get_remedy("leaf_blast"),
            labels: vec!["healthy".into(), "leaf_blast".into()],
            values: vec![0.0287, 0.9713],
        };

        let path = generate_report(&record, &dir, &dir).unwrap();
        assert_eq!(path, dir.join("alice_report.pdf"));
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }
}
