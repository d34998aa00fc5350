//! Painting a packet onto an output surface.

use crate::assemble::Packet;
use crate::canvas::{Command, PageRole};
use crate::error::PacketError;
use crate::font::StandardFont;
use crate::picture::ImageInfo;
use crate::types::{Pt, Size};

/// An output surface. Coordinates are page space with the origin at the top
/// left; `y` on text is the top of the line box.
pub trait Renderer {
    fn begin_page(&mut self, size: Size, role: PageRole) -> Result<(), PacketError>;

    fn place_text(
        &mut self,
        x: Pt,
        y: Pt,
        text: &str,
        font_size: Pt,
        font: StandardFont,
    ) -> Result<(), PacketError>;

    fn place_image(
        &mut self,
        x: Pt,
        y: Pt,
        width: Pt,
        height: Pt,
        image: &ImageInfo,
    ) -> Result<(), PacketError>;

    fn end_page(&mut self) -> Result<(), PacketError>;
}

/// Replays every page of `packet` in order. Stops at the first renderer error.
pub fn render_packet<R: Renderer + ?Sized>(
    packet: &Packet,
    renderer: &mut R,
) -> Result<(), PacketError> {
    for page in &packet.pages {
        renderer.begin_page(packet.page_size, page.role)?;
        for command in &page.commands {
            match command {
                Command::PlaceText {
                    x,
                    y,
                    text,
                    font_size,
                    font,
                } => renderer.place_text(*x, *y, text, *font_size, *font)?,
                Command::PlaceImage {
                    x,
                    y,
                    width,
                    height,
                    image,
                } => renderer.place_image(*x, *y, *width, *height, image)?,
            }
        }
        renderer.end_page()?;
    }
    Ok(())
}

/// Records calls as text, one per line. Handy for eyeballing a layout and
/// for tests.
#[derive(Debug, Default)]
pub struct TranscriptRenderer {
    lines: Vec<String>,
}

impl TranscriptRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl Renderer for TranscriptRenderer {
    fn begin_page(&mut self, size: Size, role: PageRole) -> Result<(), PacketError> {
        let role = match role {
            PageRole::Cover { sheet } => format!("cover/{sheet}"),
            PageRole::Exhibit { number, sheet } => format!("exhibit {number}/{sheet}"),
        };
        self.lines.push(format!(
            "page {} {}x{}",
            role,
            size.width.to_milli_i64(),
            size.height.to_milli_i64()
        ));
        Ok(())
    }

    fn place_text(
        &mut self,
        x: Pt,
        y: Pt,
        text: &str,
        font_size: Pt,
        font: StandardFont,
    ) -> Result<(), PacketError> {
        self.lines.push(format!(
            "  text {} {} {}@{} {:?}",
            x.to_milli_i64(),
            y.to_milli_i64(),
            font.base_font(),
            font_size.to_milli_i64(),
            text
        ));
        Ok(())
    }

    fn place_image(
        &mut self,
        x: Pt,
        y: Pt,
        width: Pt,
        height: Pt,
        image: &ImageInfo,
    ) -> Result<(), PacketError> {
        self.lines.push(format!(
            "  image {} {} {}x{} ({:?} {}x{}px)",
            x.to_milli_i64(),
            y.to_milli_i64(),
            width.to_milli_i64(),
            height.to_milli_i64(),
            image.format,
            image.width_px,
            image.height_px
        ));
        Ok(())
    }

    fn end_page(&mut self) -> Result<(), PacketError> {
        self.lines.push("end".to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::assemble;
    use crate::fixtures::{case_with, photo_exhibit, png_bytes, words};
    use crate::geometry::Geometry;

    #[test]
    fn transcript_follows_packet_order() {
        let case = case_with(
            20,
            vec![photo_exhibit("Garage", &words(5), png_bytes(64, 48), "image/png")],
        );
        let packet = assemble(&case, &Geometry::a4()).expect("assemble");
        let mut renderer = TranscriptRenderer::new();
        render_packet(&packet, &mut renderer).expect("render");
        let lines = renderer.lines();
        let pages: Vec<&String> = lines.iter().filter(|l| l.starts_with("page ")).collect();
        assert_eq!(pages.len(), 2);
        assert!(pages[0].starts_with("page cover/0 595280x841890"));
        assert!(pages[1].starts_with("page exhibit 1/0"));
        assert_eq!(lines.iter().filter(|l| *l == "end").count(), 2);
        assert!(lines.iter().any(|l| l.contains("\"Exhibit 1: GARAGE\"")));
        assert!(lines.iter().any(|l| l.starts_with("  image ") && l.contains("Png 64x48px")));
    }

    struct FailOnImage;

    impl Renderer for FailOnImage {
        fn begin_page(&mut self, _: Size, _: PageRole) -> Result<(), PacketError> {
            Ok(())
        }
        fn place_text(
            &mut self,
            _: Pt,
            _: Pt,
            _: &str,
            _: Pt,
            _: StandardFont,
        ) -> Result<(), PacketError> {
            Ok(())
        }
        fn place_image(
            &mut self,
            _: Pt,
            _: Pt,
            _: Pt,
            _: Pt,
            _: &ImageInfo,
        ) -> Result<(), PacketError> {
            Err(PacketError::Render("no images here".to_string()))
        }
        fn end_page(&mut self) -> Result<(), PacketError> {
            Ok(())
        }
    }

    #[test]
    fn renderer_errors_propagate() {
        let case = case_with(5, vec![photo_exhibit("Shed", "", png_bytes(8, 8), "image/png")]);
        let packet = assemble(&case, &Geometry::a4()).expect("assemble");
        let err = render_packet(&packet, &mut FailOnImage).expect_err("fails");
        assert!(matches!(err, PacketError::Render(_)));
    }
}
