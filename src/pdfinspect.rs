//! Read-back checks on a rendered packet.

use std::path::Path;

use lopdf::{Document as LoDocument, Object as LoObject};

use crate::assemble::Packet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdfInspectErrorCode {
    PdfParseFailed,
    PdfEncryptedUnsupported,
    PdfEmptyOrNoPages,
    PdfPageCountMismatch,
    PdfIoError,
}

impl PdfInspectErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PdfInspectErrorCode::PdfParseFailed => "PDF_PARSE_FAILED",
            PdfInspectErrorCode::PdfEncryptedUnsupported => "PDF_ENCRYPTED_UNSUPPORTED",
            PdfInspectErrorCode::PdfEmptyOrNoPages => "PDF_EMPTY_OR_NO_PAGES",
            PdfInspectErrorCode::PdfPageCountMismatch => "PDF_PAGE_COUNT_MISMATCH",
            PdfInspectErrorCode::PdfIoError => "PDF_IO_ERROR",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfInspectError {
    pub code: PdfInspectErrorCode,
    pub message: String,
}

impl std::fmt::Display for PdfInspectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for PdfInspectError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfInspectWarning {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PdfInspectReport {
    pub pdf_version: String,
    pub page_count: usize,
    pub encrypted: bool,
    pub file_size_bytes: usize,
    /// MediaBox width and height per page, in points. `None` when a page has
    /// no readable MediaBox of its own.
    pub page_sizes: Vec<Option<(f32, f32)>>,
    pub warnings: Vec<PdfInspectWarning>,
}

pub fn inspect_pdf_bytes(bytes: &[u8]) -> Result<PdfInspectReport, PdfInspectError> {
    let pdf = LoDocument::load_mem(bytes).map_err(|err| PdfInspectError {
        code: PdfInspectErrorCode::PdfParseFailed,
        message: err.to_string(),
    })?;

    let mut warnings = Vec::new();
    let mut page_sizes = Vec::new();
    for (page_number, page_id) in pdf.get_pages() {
        let size = media_box_size(&pdf, page_id);
        if size.is_none() {
            warnings.push(PdfInspectWarning {
                code: "PAGE_MEDIABOX_MISSING".to_string(),
                message: format!("page {} has no readable MediaBox", page_number),
            });
        }
        page_sizes.push(size);
    }

    Ok(PdfInspectReport {
        pdf_version: pdf.version.clone(),
        page_count: page_sizes.len(),
        encrypted: pdf.is_encrypted(),
        file_size_bytes: bytes.len(),
        page_sizes,
        warnings,
    })
}

pub fn inspect_pdf_path(path: &Path) -> Result<PdfInspectReport, PdfInspectError> {
    let data = std::fs::read(path).map_err(|err| PdfInspectError {
        code: PdfInspectErrorCode::PdfIoError,
        message: err.to_string(),
    })?;
    inspect_pdf_bytes(&data)
}

/// Inspects `bytes` and checks them against the packet they were rendered
/// from. A page count mismatch is an error; a page size that differs from
/// the packet's is a warning.
pub fn verify_packet_pdf(
    bytes: &[u8],
    packet: &Packet,
) -> Result<PdfInspectReport, PdfInspectError> {
    let mut report = inspect_pdf_bytes(bytes)?;
    if report.encrypted {
        return Err(PdfInspectError {
            code: PdfInspectErrorCode::PdfEncryptedUnsupported,
            message: "encrypted pdf output is not expected".to_string(),
        });
    }
    if report.page_count == 0 {
        return Err(PdfInspectError {
            code: PdfInspectErrorCode::PdfEmptyOrNoPages,
            message: "pdf has no pages".to_string(),
        });
    }
    if report.page_count != packet.page_count() {
        return Err(PdfInspectError {
            code: PdfInspectErrorCode::PdfPageCountMismatch,
            message: format!(
                "pdf has {} page(s), packet has {}",
                report.page_count,
                packet.page_count()
            ),
        });
    }

    let expected = (
        packet.page_size.width.to_f32(),
        packet.page_size.height.to_f32(),
    );
    let mismatched: Vec<String> = report
        .page_sizes
        .iter()
        .enumerate()
        .filter_map(|(idx, size)| match size {
            Some((w, h)) if (w - expected.0).abs() > 0.01 || (h - expected.1).abs() > 0.01 => {
                Some((idx + 1).to_string())
            }
            _ => None,
        })
        .collect();
    if !mismatched.is_empty() {
        report.warnings.push(PdfInspectWarning {
            code: "PAGE_SIZE_MISMATCH".to_string(),
            message: format!("page(s) {} differ from the packet page size", mismatched.join(", ")),
        });
    }
    Ok(report)
}

fn media_box_size(pdf: &LoDocument, page_id: lopdf::ObjectId) -> Option<(f32, f32)> {
    let page = pdf.get_dictionary(page_id).ok()?;
    let bounds = page.get(b"MediaBox").ok()?.as_array().ok()?;
    let values: Vec<f32> = bounds.iter().filter_map(number).collect();
    match values[..] {
        [llx, lly, urx, ury] => Some((urx - llx, ury - lly)),
        _ => None,
    }
}

fn number(obj: &LoObject) -> Option<f32> {
    match obj {
        LoObject::Integer(value) => Some(*value as f32),
        LoObject::Real(value) => Some(*value as f32),
        _ => None,
    }
}
