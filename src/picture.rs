//! Attachment decoding and aspect-preserving fit.
//!
//! Decoding ([`probe`]) is the expensive part and is independent per
//! attachment, so the assembler runs it up front (in parallel). Fitting a
//! decoded image into a box ([`ImageInfo::fit`]) is plain arithmetic and
//! happens during planning once the available space is known.

use std::fmt;
use std::sync::Arc;

use image::GenericImageView;

use crate::types::Pt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    Png,
    Jpeg,
}

impl SourceFormat {
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        match essence.as_str() {
            "image/png" => Some(SourceFormat::Png),
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(SourceFormat::Jpeg),
            _ => None,
        }
    }

    fn image_format(self) -> image::ImageFormat {
        match self {
            SourceFormat::Png => image::ImageFormat::Png,
            SourceFormat::Jpeg => image::ImageFormat::Jpeg,
        }
    }
}

/// A successfully decoded attachment. The bytes are shared, not copied, by
/// every draw command that places this image.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageInfo {
    pub format: SourceFormat,
    pub width_px: u32,
    pub height_px: u32,
    pub bytes: Arc<[u8]>,
}

/// Render size of an image, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageBox {
    pub width: Pt,
    pub height: Pt,
    pub scale: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecodeFailureKind {
    UnsupportedMime,
    Corrupt,
    EmptyImage,
    InvalidBounds,
}

impl DecodeFailureKind {
    pub fn label(self) -> &'static str {
        match self {
            DecodeFailureKind::UnsupportedMime => "unsupported image type",
            DecodeFailureKind::Corrupt => "image data could not be decoded",
            DecodeFailureKind::EmptyImage => "image has no pixels",
            DecodeFailureKind::InvalidBounds => "no room to place image",
        }
    }
}

/// Why an attachment could not be placed. Never fatal to assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeFailure {
    pub kind: DecodeFailureKind,
    pub detail: String,
}

impl DecodeFailure {
    fn new(kind: DecodeFailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for DecodeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.detail.is_empty() {
            write!(f, "{}", self.kind.label())
        } else {
            write!(f, "{} ({})", self.kind.label(), self.detail)
        }
    }
}

impl std::error::Error for DecodeFailure {}

pub fn probe(bytes: &[u8], mime_type: &str) -> Result<ImageInfo, DecodeFailure> {
    let Some(format) = SourceFormat::from_mime(mime_type) else {
        return Err(DecodeFailure::new(
            DecodeFailureKind::UnsupportedMime,
            mime_type.trim(),
        ));
    };
    if bytes.is_empty() {
        return Err(DecodeFailure::new(DecodeFailureKind::Corrupt, "empty buffer"));
    }
    let decoded = image::load_from_memory_with_format(bytes, format.image_format())
        .map_err(|err| DecodeFailure::new(DecodeFailureKind::Corrupt, err.to_string()))?;
    let (width_px, height_px) = decoded.dimensions();
    if width_px == 0 || height_px == 0 {
        return Err(DecodeFailure::new(
            DecodeFailureKind::EmptyImage,
            format!("{width_px}x{height_px}"),
        ));
    }
    Ok(ImageInfo {
        format,
        width_px,
        height_px,
        bytes: Arc::from(bytes),
    })
}

impl ImageInfo {
    /// Scales by `min(max_width / w, max_height / h)` so the result keeps the
    /// source aspect ratio and touches at least one bound. One pixel maps to
    /// one point before scaling.
    pub fn fit(&self, max_width: Pt, max_height: Pt) -> Result<ImageBox, DecodeFailure> {
        if !max_width.is_positive() || !max_height.is_positive() {
            return Err(DecodeFailure::new(
                DecodeFailureKind::InvalidBounds,
                format!("{}x{}pt", max_width.to_f32(), max_height.to_f32()),
            ));
        }
        let src_w = self.width_px as f64;
        let src_h = self.height_px as f64;
        let scale = (max_width.to_f32() as f64 / src_w).min(max_height.to_f32() as f64 / src_h);
        let width = Pt::from_f32((src_w * scale) as f32).min(max_width);
        let height = Pt::from_f32((src_h * scale) as f32).min(max_height);
        Ok(ImageBox {
            width,
            height,
            scale,
        })
    }
}

pub fn normalize(
    bytes: &[u8],
    mime_type: &str,
    max_width: Pt,
    max_height: Pt,
) -> Result<ImageBox, DecodeFailure> {
    probe(bytes, mime_type)?.fit(max_width, max_height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{jpeg_bytes, png_bytes};

    #[test]
    fn mime_types_are_matched_loosely() {
        assert_eq!(SourceFormat::from_mime("IMAGE/PNG"), Some(SourceFormat::Png));
        assert_eq!(
            SourceFormat::from_mime("image/jpeg; charset=binary"),
            Some(SourceFormat::Jpeg)
        );
        assert_eq!(SourceFormat::from_mime("image/jpg"), Some(SourceFormat::Jpeg));
        assert_eq!(SourceFormat::from_mime("application/pdf"), None);
    }

    #[test]
    fn fit_preserves_ratio_within_bounds() {
        let info = probe(&png_bytes(400, 300), "image/png").expect("decode");
        for (w, h) in [(500.0_f32, 500.0_f32), (100.0, 900.0), (900.0, 60.0), (483.0, 453.5)] {
            let fitted = info.fit(Pt::from_f32(w), Pt::from_f32(h)).expect("fit");
            assert!(fitted.width <= Pt::from_f32(w));
            assert!(fitted.height <= Pt::from_f32(h));
            let ratio = fitted.height.to_f32() / fitted.width.to_f32();
            assert!((ratio - 0.75).abs() < 0.005, "ratio {ratio} for {w}x{h}");
        }
    }

    #[test]
    fn tall_image_is_height_bound() {
        let info = probe(&jpeg_bytes(100, 1000), "image/jpeg").expect("decode");
        let fitted = info.fit(Pt::from_i32(480), Pt::from_i32(400)).expect("fit");
        assert_eq!(fitted.height, Pt::from_i32(400));
        assert_eq!(fitted.width, Pt::from_i32(40));
    }

    #[test]
    fn corrupt_bytes_are_a_decode_failure() {
        let bound = Pt::from_i32(100);
        let err = normalize(b"\x89PNG not really", "image/png", bound, bound).expect_err("corrupt");
        assert_eq!(err.kind, DecodeFailureKind::Corrupt);
        let err = probe(&[], "image/png").expect_err("empty");
        assert_eq!(err.kind, DecodeFailureKind::Corrupt);
    }

    #[test]
    fn mismatched_or_unknown_mime_fails() {
        let err = probe(&png_bytes(10, 10), "image/gif").expect_err("gif");
        assert_eq!(err.kind, DecodeFailureKind::UnsupportedMime);
        assert!(err.to_string().contains("image/gif"));
        let err = probe(&png_bytes(10, 10), "image/jpeg").expect_err("png labelled jpeg");
        assert_eq!(err.kind, DecodeFailureKind::Corrupt);
    }

    #[test]
    fn non_positive_bounds_are_rejected() {
        let info = probe(&png_bytes(10, 10), "image/png").expect("decode");
        let err = info.fit(Pt::ZERO, Pt::from_i32(10)).expect_err("zero width");
        assert_eq!(err.kind, DecodeFailureKind::InvalidBounds);
    }
}
