use serde::{Deserialize, Serialize};

use crate::error::PacketError;
use crate::font::line_height;
use crate::types::{Pt, Rect, Size};

/// Page geometry as supplied by the caller, in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Geometry {
    pub page_width: f32,
    pub page_height: f32,
    pub margin: f32,
    pub body_font_size: f32,
    pub header_font_size: f32,
    /// Ceiling for a photo's height so a tall, narrow image cannot push the
    /// rest of the exhibit off the page.
    #[serde(default = "default_photo_max_height")]
    pub photo_max_height: f32,
    /// A photo that would get less than this moves to a continuation page.
    #[serde(default = "default_min_photo_height")]
    pub min_photo_height: f32,
}

fn default_photo_max_height() -> f32 {
    Pt::from_mm(160.0).to_f32()
}

fn default_min_photo_height() -> f32 {
    72.0
}

impl Geometry {
    pub fn a4() -> Self {
        let size = Size::a4();
        Self::with_page(size.width.to_f32(), size.height.to_f32())
    }

    pub fn us_letter() -> Self {
        let size = Size::letter();
        Self::with_page(size.width.to_f32(), size.height.to_f32())
    }

    fn with_page(page_width: f32, page_height: f32) -> Self {
        Self {
            page_width,
            page_height,
            margin: Pt::from_mm(20.0).to_f32(),
            body_font_size: 11.0,
            header_font_size: 14.0,
            photo_max_height: default_photo_max_height(),
            min_photo_height: default_min_photo_height(),
        }
    }

    /// Checks every value and derives the layout frame. Nothing is laid out
    /// with a geometry that fails here.
    pub fn validate(&self) -> Result<PageFrame, PacketError> {
        let page_width = positive("pageWidth", self.page_width)?;
        let page_height = positive("pageHeight", self.page_height)?;
        let margin = positive("margin", self.margin)?;
        let body_size = positive("bodyFontSize", self.body_font_size)?;
        let header_size = positive("headerFontSize", self.header_font_size)?;
        let photo_max_height = positive("photoMaxHeight", self.photo_max_height)?;
        let min_photo_height = positive("minPhotoHeight", self.min_photo_height)?;

        let content = Rect {
            x: margin,
            y: margin,
            width: page_width - margin * 2,
            height: page_height - margin * 2,
        };
        if !content.width.is_positive() || !content.height.is_positive() {
            return Err(PacketError::InvalidGeometry(format!(
                "margin {} leaves no printable area on a {}x{} page",
                self.margin, self.page_width, self.page_height
            )));
        }

        let frame = PageFrame {
            page_size: Size {
                width: page_width,
                height: page_height,
            },
            content,
            body_size,
            header_size,
            photo_max_height,
            min_photo_height,
        };
        // A continuation sheet must always take its heading plus one more line
        // of either size, or spilled text would never make progress.
        let needed =
            line_height(header_size) + frame.block_gap() + line_height(body_size.max(header_size));
        if content.height < needed {
            return Err(PacketError::InvalidGeometry(format!(
                "printable height {} is below the {} needed for a heading and one line",
                content.height.to_f32(),
                needed.to_f32()
            )));
        }
        Ok(frame)
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self::a4()
    }
}

fn positive(name: &str, value: f32) -> Result<Pt, PacketError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(PacketError::InvalidGeometry(format!(
            "{name} must be a positive number, got {value}"
        )));
    }
    let pt = Pt::from_f32(value);
    if !pt.is_positive() {
        return Err(PacketError::InvalidGeometry(format!(
            "{name} is too small to lay out: {value}"
        )));
    }
    Ok(pt)
}

/// Validated geometry in layout units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageFrame {
    pub page_size: Size,
    /// Printable area inside the margins.
    pub content: Rect,
    pub body_size: Pt,
    pub header_size: Pt,
    pub photo_max_height: Pt,
    pub min_photo_height: Pt,
}

impl PageFrame {
    pub fn margin(&self) -> Pt {
        self.content.x
    }

    /// Size for compact headings (document exhibits, continuation pages):
    /// two points under the header size, never below one point.
    pub fn compact_header_size(&self) -> Pt {
        (self.header_size - Pt::from_i32(2)).max(Pt::from_i32(1))
    }

    pub fn block_gap(&self) -> Pt {
        line_height(self.body_size) / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a4_defaults_validate() {
        let frame = Geometry::a4().validate().expect("valid");
        assert_eq!(frame.margin().to_milli_i64(), 56693);
        assert_eq!(frame.content.width, frame.page_size.width - frame.margin() * 2);
        assert_eq!(frame.compact_header_size(), Pt::from_i32(12));
        assert!(Geometry::us_letter().validate().is_ok());
    }

    #[test]
    fn non_positive_values_fail_fast() {
        for mutate in [
            |g: &mut Geometry| g.page_width = 0.0,
            |g: &mut Geometry| g.page_height = -10.0,
            |g: &mut Geometry| g.margin = 0.0,
            |g: &mut Geometry| g.body_font_size = f32::NAN,
            |g: &mut Geometry| g.header_font_size = -1.0,
            |g: &mut Geometry| g.photo_max_height = 0.0,
            |g: &mut Geometry| g.min_photo_height = f32::INFINITY,
        ] {
            let mut geometry = Geometry::a4();
            mutate(&mut geometry);
            let err = geometry.validate().expect_err("must reject");
            assert!(matches!(err, PacketError::InvalidGeometry(_)), "{err}");
        }
    }

    #[test]
    fn margins_must_leave_room() {
        let mut geometry = Geometry::a4();
        geometry.margin = 300.0;
        let err = geometry.validate().expect_err("no printable width");
        assert!(err.to_string().contains("printable area"));

        let mut geometry = Geometry::a4();
        geometry.page_height = 130.0;
        geometry.margin = 50.0;
        let err = geometry.validate().expect_err("too short");
        assert!(err.to_string().contains("heading and one line"));
    }

    #[test]
    fn deserializes_with_defaults() {
        let geometry: Geometry = serde_json::from_str(
            r#"{"pageWidth":612,"pageHeight":792,"margin":72,"bodyFontSize":10,"headerFontSize":16}"#,
        )
        .expect("parse");
        assert_eq!(geometry.min_photo_height, 72.0);
        assert!(geometry.photo_max_height > 450.0);
        assert!(geometry.validate().is_ok());
    }
}
