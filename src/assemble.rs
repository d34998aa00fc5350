use std::fmt::Write as _;

use sha2::{Digest, Sha256};

use crate::canvas::{Canvas, Command, Page, PageRole};
use crate::error::PacketError;
use crate::font::StandardFont;
use crate::geometry::{Geometry, PageFrame};
use crate::model::{Attachment, CaseDocument};
use crate::picture::{DecodeFailure, ImageInfo, probe};
use crate::plan::{Align, BlockRole, LayoutNotice, LayoutPlan, Placement, SheetPlanner, plan};
use crate::types::Size;

/// The assembled packet: the cover section followed by one section per
/// exhibit, in case order.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    pub page_size: Size,
    pub pages: Vec<Page>,
    pub notices: Vec<LayoutNotice>,
}

impl Packet {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Pages belonging to exhibit `number` (1-based).
    pub fn exhibit_pages(&self, number: usize) -> impl Iterator<Item = &Page> {
        self.pages
            .iter()
            .filter(move |page| page.role.exhibit_number() == Some(number))
    }

    /// Hex SHA-256 over the page size and every draw command. Two packets
    /// with the same fingerprint render identically.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.page_size.width.to_milli_i64().to_le_bytes());
        hasher.update(self.page_size.height.to_milli_i64().to_le_bytes());
        for page in &self.pages {
            match page.role {
                PageRole::Cover { sheet } => {
                    hasher.update(b"C");
                    hasher.update((sheet as u64).to_le_bytes());
                }
                PageRole::Exhibit { number, sheet } => {
                    hasher.update(b"E");
                    hasher.update((number as u64).to_le_bytes());
                    hasher.update((sheet as u64).to_le_bytes());
                }
            }
            for command in &page.commands {
                match command {
                    Command::PlaceText {
                        x,
                        y,
                        text,
                        font_size,
                        font,
                    } => {
                        hasher.update(b"T");
                        for v in [x, y, font_size] {
                            hasher.update(v.to_milli_i64().to_le_bytes());
                        }
                        hasher.update(font.base_font().as_bytes());
                        hasher.update((text.len() as u64).to_le_bytes());
                        hasher.update(text.as_bytes());
                    }
                    Command::PlaceImage {
                        x,
                        y,
                        width,
                        height,
                        image,
                    } => {
                        hasher.update(b"I");
                        for v in [x, y, width, height] {
                            hasher.update(v.to_milli_i64().to_le_bytes());
                        }
                        hasher.update(image.width_px.to_le_bytes());
                        hasher.update(image.height_px.to_le_bytes());
                        hasher.update((image.bytes.len() as u64).to_le_bytes());
                        hasher.update(&image.bytes);
                    }
                }
            }
        }
        let digest = hasher.finalize();
        let mut out = String::with_capacity(digest.len() * 2);
        for b in digest {
            let _ = write!(&mut out, "{:02x}", b);
        }
        out
    }
}

/// Lays out `case` on pages described by `geometry`. Fails only on invalid
/// geometry; broken attachments degrade their exhibit and are reported in
/// [`Packet::notices`].
pub fn assemble(case: &CaseDocument, geometry: &Geometry) -> Result<Packet, PacketError> {
    let frame = geometry.validate()?;
    Ok(assemble_in_frame(case, &frame, true))
}

pub(crate) fn assemble_in_frame(case: &CaseDocument, frame: &PageFrame, parallel: bool) -> Packet {
    let decoded = decode_attachments(case, parallel);
    let mut canvas = Canvas::new(frame.page_size);
    let mut notices = Vec::new();

    let cover = plan_cover(case, frame);
    draw_plan(&mut canvas, &cover);
    notices.extend(cover.notices);

    for (idx, exhibit) in case.exhibits.iter().enumerate() {
        let number = idx + 1;
        let results = decoded.get(idx).map(Vec::as_slice).unwrap_or(&[]);
        let layout = plan(exhibit, number, results, frame);
        log::debug!(
            "exhibit {} planned on {} page(s), {} notice(s)",
            number,
            layout.pages.len(),
            layout.notices.len()
        );
        for notice in &layout.notices {
            log_notice(notice);
        }
        draw_plan(&mut canvas, &layout);
        notices.extend(layout.notices);
    }

    let (page_size, pages) = canvas.finish();
    log::debug!(
        "packet assembled: {} page(s) for {} exhibit(s)",
        pages.len(),
        case.exhibits.len()
    );
    Packet {
        page_size,
        pages,
        notices,
    }
}

fn plan_cover(case: &CaseDocument, frame: &PageFrame) -> LayoutPlan {
    let mut sheets = SheetPlanner::new(frame, None);
    sheets.flow_text(
        BlockRole::Header,
        "PROPERTY TAX PROTEST",
        StandardFont::HelveticaBold,
        frame.header_size,
        Align::Center,
    );
    if let Some(property) = &case.property {
        sheets.gap();
        sheets.flow_text(
            BlockRole::Caption,
            &format!("Property: {}", property.address.trim()),
            StandardFont::Helvetica,
            frame.body_size,
            Align::Left,
        );
        sheets.flow_text(
            BlockRole::Caption,
            &format!("Requested Value: {}", property.requested_value_label()),
            StandardFont::Helvetica,
            frame.body_size,
            Align::Left,
        );
    }
    sheets.gap();
    sheets.gap();
    sheets.flow_text(
        BlockRole::Body,
        &case.letter_text,
        StandardFont::Helvetica,
        frame.body_size,
        Align::Left,
    );

    let mut notices = Vec::new();
    if sheets.text_spills() > 0 {
        let notice = LayoutNotice::TextContinued {
            exhibit: None,
            sheets: sheets.text_spills(),
        };
        log_notice(&notice);
        notices.push(notice);
    }
    LayoutPlan {
        exhibit: None,
        pages: sheets.finish(),
        notices,
    }
}

fn draw_plan(canvas: &mut Canvas, layout: &LayoutPlan) {
    for (sheet, page) in layout.pages.iter().enumerate() {
        let role = match layout.exhibit {
            Some(number) => PageRole::Exhibit { number, sheet },
            None => PageRole::Cover { sheet },
        };
        canvas.start_page(role);
        for placement in &page.placements {
            match placement {
                Placement::Text(block) => {
                    let mut y = block.y;
                    for line in &block.lines {
                        if !line.text.is_empty() {
                            canvas.place_text(
                                block.line_x(line),
                                y,
                                line.text.as_str(),
                                block.font_size,
                                block.font,
                            );
                        }
                        y += block.line_height;
                    }
                }
                Placement::Image(block) => canvas.place_image(
                    block.rect.x,
                    block.rect.y,
                    block.rect.width,
                    block.rect.height,
                    block.image.clone(),
                ),
            }
        }
        canvas.show_page();
    }
}

type Decoded = Result<ImageInfo, DecodeFailure>;

/// Probes every attachment of every exhibit. Results come back grouped per
/// exhibit, in attachment order, whichever thread decoded them.
fn decode_attachments(case: &CaseDocument, parallel: bool) -> Vec<Vec<Decoded>> {
    let jobs: Vec<((usize, usize), &Attachment)> = case
        .exhibits
        .iter()
        .enumerate()
        .flat_map(|(exhibit, ex)| {
            ex.attachments
                .iter()
                .enumerate()
                .map(move |(attachment, att)| ((exhibit, attachment), att))
        })
        .collect();

    let decode = |(key, att): &((usize, usize), &Attachment)| -> ((usize, usize), Decoded) {
        (*key, probe(&att.image_bytes, &att.mime_type))
    };
    let mut results: Vec<((usize, usize), Decoded)> = if parallel {
        use rayon::prelude::*;
        jobs.par_iter().map(decode).collect()
    } else {
        jobs.iter().map(decode).collect()
    };
    results.sort_by_key(|(key, _)| *key);

    let mut grouped: Vec<Vec<Decoded>> = case
        .exhibits
        .iter()
        .map(|ex| Vec::with_capacity(ex.attachments.len()))
        .collect();
    for ((exhibit, _), result) in results {
        if let Some(slot) = grouped.get_mut(exhibit) {
            slot.push(result);
        }
    }
    grouped
}

fn log_notice(notice: &LayoutNotice) {
    match notice {
        LayoutNotice::ImageUnavailable {
            exhibit,
            attachment,
            reason,
        } => log::warn!(
            "exhibit {} attachment {} shown as placeholder: {}",
            exhibit,
            attachment,
            reason
        ),
        LayoutNotice::MissingDocument { exhibit } => {
            log::warn!("exhibit {} is in document mode but has no attachment", exhibit)
        }
        LayoutNotice::PhotoSpilled { exhibit } => {
            log::warn!("exhibit {} photo moved to a continuation page", exhibit)
        }
        LayoutNotice::TextContinued { exhibit, sheets } => match exhibit {
            Some(number) => log::warn!(
                "exhibit {} text continued on {} extra page(s)",
                number,
                sheets
            ),
            None => log::debug!("letter continued on {} extra page(s)", sheets),
        },
    }
}
