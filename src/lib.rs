mod ai_response;
mod assemble;
mod canvas;
mod error;
#[cfg(test)]
mod fixtures;
mod font;
mod frame;
mod geometry;
mod model;
mod pdf;
mod pdfinspect;
mod picture;
mod plan;
mod render;
mod text;
mod types;

pub use ai_response::{
    CaseScore, DEFAULT_FINDING_DESCRIPTION, DEFAULT_FINDING_TITLE, Extracted, ExtractionError,
    LetterSuggestions, Strategy, StrategyItem, Trend, VisionFinding, extract_json,
};
pub use assemble::{Packet, assemble};
pub use canvas::{Canvas, Command, Page, PageRole};
pub use error::{PacketError, Result};
pub use font::{StandardFont, line_height};
pub use frame::Frame;
pub use geometry::{Geometry, PageFrame};
pub use model::{Attachment, CaseDocument, DisplayMode, Exhibit, PropertySummary};
pub use pdf::{PdfRenderer, packet_to_pdf, packet_to_pdf_writer};
pub use pdfinspect::{
    PdfInspectError, PdfInspectErrorCode, PdfInspectReport, PdfInspectWarning, inspect_pdf_bytes,
    inspect_pdf_path, verify_packet_pdf,
};
pub use picture::{
    DecodeFailure, DecodeFailureKind, ImageBox, ImageInfo, SourceFormat, normalize, probe,
};
pub use plan::{
    Align, BlockRole, ImageBlock, LayoutNotice, LayoutPlan, Placement, PlannedPage, TextBlock,
    plan, plan_exhibit,
};
pub use render::{Renderer, TranscriptRenderer, render_packet};
pub use text::{WrapLines, WrappedLine, wrap, wrap_all};
pub use types::{Pt, Rect, Size};

/// Configures a [`PacketEngine`]. Nothing is checked until [`build`], which
/// rejects invalid geometry before any page can be produced.
///
/// [`build`]: PacketBuilder::build
#[derive(Debug, Clone)]
pub struct PacketBuilder {
    geometry: Geometry,
    parallel_decode: bool,
    pdf_title: Option<String>,
}

impl Default for PacketBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketBuilder {
    pub fn new() -> Self {
        Self {
            geometry: Geometry::a4(),
            parallel_decode: true,
            pdf_title: Some("Property Tax Protest".to_string()),
        }
    }

    pub fn geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn page_size(mut self, width: f32, height: f32) -> Self {
        self.geometry.page_width = width;
        self.geometry.page_height = height;
        self
    }

    pub fn margin(mut self, margin: f32) -> Self {
        self.geometry.margin = margin;
        self
    }

    pub fn body_font_size(mut self, size: f32) -> Self {
        self.geometry.body_font_size = size;
        self
    }

    pub fn header_font_size(mut self, size: f32) -> Self {
        self.geometry.header_font_size = size;
        self
    }

    pub fn photo_max_height(mut self, height: f32) -> Self {
        self.geometry.photo_max_height = height;
        self
    }

    pub fn min_photo_height(mut self, height: f32) -> Self {
        self.geometry.min_photo_height = height;
        self
    }

    /// Decode attachments on the rayon pool (the default) or on the calling
    /// thread. Output is identical either way.
    pub fn parallel_decode(mut self, enabled: bool) -> Self {
        self.parallel_decode = enabled;
        self
    }

    pub fn pdf_title(mut self, title: Option<String>) -> Self {
        self.pdf_title = title;
        self
    }

    pub fn build(self) -> Result<PacketEngine> {
        let frame = self.geometry.validate()?;
        log::debug!(
            "packet engine ready: {}x{}pt page, margin {}pt, parallel decode {}",
            self.geometry.page_width,
            self.geometry.page_height,
            self.geometry.margin,
            self.parallel_decode
        );
        Ok(PacketEngine {
            geometry: self.geometry,
            frame,
            parallel_decode: self.parallel_decode,
            pdf_title: self.pdf_title,
        })
    }
}

/// Validated configuration. Holds no per-case state, so one engine can
/// assemble any number of cases, from any number of threads.
#[derive(Debug, Clone)]
pub struct PacketEngine {
    geometry: Geometry,
    frame: PageFrame,
    parallel_decode: bool,
    pdf_title: Option<String>,
}

impl PacketEngine {
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn frame(&self) -> &PageFrame {
        &self.frame
    }

    pub fn assemble(&self, case: &CaseDocument) -> Packet {
        assemble::assemble_in_frame(case, &self.frame, self.parallel_decode)
    }

    pub fn plan_exhibit(&self, exhibit: &Exhibit, number: usize) -> LayoutPlan {
        plan::plan_exhibit(exhibit, number, &self.frame)
    }

    fn pdf_renderer(&self) -> PdfRenderer {
        match &self.pdf_title {
            Some(title) => PdfRenderer::new().with_title(title.clone()),
            None => PdfRenderer::new(),
        }
    }

    /// Assembles `case` and writes it as PDF bytes.
    pub fn render_pdf(&self, case: &CaseDocument) -> Result<(Packet, Vec<u8>)> {
        let packet = self.assemble(case);
        let mut renderer = self.pdf_renderer();
        render_packet(&packet, &mut renderer)?;
        let bytes = renderer.finish()?;
        Ok((packet, bytes))
    }

    pub fn render_pdf_to_writer<W: std::io::Write>(
        &self,
        case: &CaseDocument,
        writer: &mut W,
    ) -> Result<Packet> {
        let packet = self.assemble(case);
        let mut renderer = self.pdf_renderer();
        render_packet(&packet, &mut renderer)?;
        renderer.finish_to_writer(writer)?;
        Ok(packet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{case_with, document_exhibit, jpeg_bytes, photo_exhibit, png_bytes, words};

    #[test]
    fn builder_rejects_invalid_geometry() {
        for builder in [
            PacketBuilder::new().margin(-1.0),
            PacketBuilder::new().body_font_size(0.0),
            PacketBuilder::new().header_font_size(f32::NAN),
            PacketBuilder::new().page_size(100.0, 0.0),
            PacketBuilder::new().min_photo_height(0.0),
        ] {
            let err = builder.build().expect_err("invalid geometry");
            assert!(matches!(err, PacketError::InvalidGeometry(_)), "{err}");
        }
    }

    #[test]
    fn every_exhibit_starts_its_own_page_in_order() {
        let engine = PacketBuilder::new().build().expect("engine");
        for exhibit_count in 0..6usize {
            let exhibits = (0..exhibit_count)
                .map(|i| match i % 3 {
                    0 => photo_exhibit(
                        &format!("Photo {i}"),
                        &words(30 * i),
                        png_bytes(90, 60),
                        "image/png",
                    ),
                    1 => {
                        document_exhibit(&format!("Doc {i}"), "", jpeg_bytes(60, 90), "image/jpeg")
                    }
                    _ => photo_exhibit(&format!("Bad {i}"), "", vec![0; 16], "image/png"),
                })
                .collect::<Vec<_>>();
            let case = case_with(25 * exhibit_count, exhibits);
            let packet = engine.assemble(&case);
            assert!(packet.page_count() >= 1 + exhibit_count);

            let firsts: Vec<usize> = packet
                .pages
                .iter()
                .filter_map(|page| match page.role {
                    PageRole::Exhibit { number, sheet: 0 } => Some(number),
                    _ => None,
                })
                .collect();
            assert_eq!(firsts, (1..=exhibit_count).collect::<Vec<_>>());
            for (idx, exhibit) in case.exhibits.iter().enumerate() {
                let page = packet.exhibit_pages(idx + 1).next().expect("page");
                let header = page.texts().next().expect("header");
                assert!(header.contains(&exhibit.display_title()), "{header}");
            }
        }
    }

    #[test]
    fn assembly_is_idempotent() {
        let engine = PacketBuilder::new().parallel_decode(true).build().expect("engine");
        let case = case_with(
            700,
            vec![
                photo_exhibit("Roof", &words(200), png_bytes(300, 200), "image/png"),
                document_exhibit("Survey", "plat", jpeg_bytes(200, 260), "image/jpeg"),
            ],
        );
        let first = engine.assemble(&case);
        let second = engine.assemble(&case);
        assert_eq!(first.pages, second.pages);
        assert_eq!(first.fingerprint(), second.fingerprint());
    }

    #[test]
    fn sequential_engine_matches_free_function() {
        let case = case_with(
            120,
            vec![photo_exhibit("Yard", &words(12), png_bytes(50, 50), "image/png")],
        );
        let engine = PacketBuilder::new()
            .geometry(Geometry::us_letter())
            .parallel_decode(false)
            .build()
            .expect("engine");
        let packet = assemble(&case, &Geometry::us_letter()).expect("assemble");
        assert_eq!(engine.assemble(&case), packet);
    }

    #[test]
    fn json_case_renders_to_a_verified_pdf() {
        use base64::Engine;
        let png = base64::engine::general_purpose::STANDARD.encode(png_bytes(40, 30));
        let json = format!(
            r#"{{
                "letterText": "To the Appraisal Review Board:\n\nI protest the 2025 valuation.",
                "property": {{ "address": "9 Oak Ln", "requestedValue": 410000 }},
                "exhibits": [
                    {{
                        "title": "Foundation",
                        "description": "Settlement cracks.",
                        "displayMode": "photo",
                        "attachments": [{{
                            "imageBytes": "data:image/png;base64,{png}",
                            "mimeType": "image/png"
                        }}]
                    }},
                    {{ "title": "Appraisal", "displayMode": "document" }}
                ]
            }}"#
        );
        let case = CaseDocument::from_json(&json).expect("case");
        let engine = PacketBuilder::new().pdf_title(None).build().expect("engine");
        let (packet, bytes) = engine.render_pdf(&case).expect("pdf");
        assert_eq!(packet.page_count(), 3);
        assert_eq!(packet.notices, vec![LayoutNotice::MissingDocument { exhibit: 2 }]);
        let report = verify_packet_pdf(&bytes, &packet).expect("verify");
        assert_eq!(report.page_count, 3);

        let mut streamed = Vec::new();
        let again = engine.render_pdf_to_writer(&case, &mut streamed).expect("stream");
        assert_eq!(again, packet);
        assert_eq!(streamed, bytes);
    }
}
