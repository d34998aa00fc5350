//! Per-exhibit layout.
//!
//! A plan is a list of sheets. The first sheet carries the exhibit heading;
//! anything that does not fit (long narratives, a photo squeezed below the
//! minimum height, extra attachments) lands on continuation sheets with their
//! own heading. Every placement stays inside the printable area.

use crate::font::{StandardFont, line_height};
use crate::frame::Frame;
use crate::geometry::PageFrame;
use crate::model::{DisplayMode, Exhibit};
use crate::picture::{DecodeFailure, ImageInfo, probe};
use crate::text::{WrappedLine, wrap_all};
use crate::types::{Pt, Rect};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
}

/// What a text block is for. Renderers ignore it; callers and tests use it to
/// find the parts of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockRole {
    Header,
    Caption,
    Body,
    Marker,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub role: BlockRole,
    pub x: Pt,
    pub y: Pt,
    pub width: Pt,
    pub font: StandardFont,
    pub font_size: Pt,
    pub line_height: Pt,
    pub align: Align,
    pub lines: Vec<WrappedLine>,
}

impl TextBlock {
    pub fn height(&self) -> Pt {
        self.line_height * self.lines.len() as i32
    }

    pub fn rect(&self) -> Rect {
        Rect {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height(),
        }
    }

    /// Left edge of `line` once alignment is applied.
    pub fn line_x(&self, line: &WrappedLine) -> Pt {
        match self.align {
            Align::Left => self.x,
            Align::Center => self.x + ((self.width - line.width) / 2).max(Pt::ZERO),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageBlock {
    pub rect: Rect,
    pub image: ImageInfo,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Placement {
    Text(TextBlock),
    Image(ImageBlock),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlannedPage {
    pub placements: Vec<Placement>,
}

impl PlannedPage {
    pub fn text_blocks(&self) -> impl Iterator<Item = &TextBlock> {
        self.placements.iter().filter_map(|p| match p {
            Placement::Text(block) => Some(block),
            Placement::Image(_) => None,
        })
    }

    pub fn images(&self) -> impl Iterator<Item = &ImageBlock> {
        self.placements.iter().filter_map(|p| match p {
            Placement::Image(block) => Some(block),
            Placement::Text(_) => None,
        })
    }

    pub fn bounds(&self) -> impl Iterator<Item = Rect> + '_ {
        self.placements.iter().map(|p| match p {
            Placement::Text(block) => block.rect(),
            Placement::Image(block) => block.rect,
        })
    }
}

/// Something the packet does differently from what the case asked for.
/// Exhibit and attachment numbers are 1-based.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutNotice {
    ImageUnavailable {
        exhibit: usize,
        attachment: usize,
        reason: DecodeFailure,
    },
    MissingDocument {
        exhibit: usize,
    },
    PhotoSpilled {
        exhibit: usize,
    },
    /// Text ran past its first sheet. `exhibit` is `None` for the letter.
    TextContinued {
        exhibit: Option<usize>,
        sheets: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutPlan {
    /// Exhibit number, or `None` for the cover section.
    pub exhibit: Option<usize>,
    pub pages: Vec<PlannedPage>,
    pub notices: Vec<LayoutNotice>,
}

impl LayoutPlan {
    pub fn header_box(&self) -> Option<Rect> {
        let mut headers = self
            .pages
            .first()?
            .text_blocks()
            .filter(|block| block.role == BlockRole::Header);
        let first = headers.next()?.rect();
        Some(headers.fold(first, |acc, block| {
            let rect = block.rect();
            Rect {
                height: rect.bottom() - acc.y,
                ..acc
            }
        }))
    }

    pub fn body_text_lines(&self) -> impl Iterator<Item = &WrappedLine> {
        self.pages
            .iter()
            .flat_map(|page| page.text_blocks())
            .filter(|block| block.role == BlockRole::Body)
            .flat_map(|block| block.lines.iter())
    }

    /// Box of the exhibit's primary image, wherever it landed.
    pub fn image_box(&self) -> Option<Rect> {
        self.pages
            .iter()
            .flat_map(|page| page.images())
            .map(|image| image.rect)
            .next()
    }

    pub fn markers(&self) -> impl Iterator<Item = &str> {
        self.pages
            .iter()
            .flat_map(|page| page.text_blocks())
            .filter(|block| block.role == BlockRole::Marker)
            .flat_map(|block| block.lines.iter().map(|line| line.text.as_str()))
    }
}

/// Cursor over a growing list of sheets. Text flows line by line and opens a
/// continuation sheet whenever the current one is full.
pub(crate) struct SheetPlanner<'a> {
    frame: &'a PageFrame,
    continuation_heading: Option<String>,
    pages: Vec<PlannedPage>,
    cursor: Frame,
    text_spills: usize,
}

impl<'a> SheetPlanner<'a> {
    pub(crate) fn new(frame: &'a PageFrame, continuation_heading: Option<String>) -> Self {
        Self {
            frame,
            continuation_heading,
            pages: vec![PlannedPage::default()],
            cursor: Frame::new(frame.content),
            text_spills: 0,
        }
    }

    fn page(&mut self) -> &mut PlannedPage {
        if self.pages.is_empty() {
            self.pages.push(PlannedPage::default());
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    pub(crate) fn open_sheet(&mut self, heading: Option<&str>) {
        self.pages.push(PlannedPage::default());
        self.cursor = Frame::new(self.frame.content);
        if let Some(heading) = heading {
            let size = self.frame.compact_header_size();
            let line = WrappedLine {
                text: heading.to_string(),
                width: StandardFont::HelveticaBold.text_width(size, heading),
            };
            self.push_block(
                BlockRole::Header,
                StandardFont::HelveticaBold,
                size,
                Align::Left,
                vec![line],
            );
            self.gap();
        }
    }

    fn continue_sheet(&mut self) {
        let heading = self.continuation_heading.clone();
        self.open_sheet(heading.as_deref());
    }

    pub(crate) fn gap(&mut self) {
        self.cursor.advance(self.frame.block_gap());
    }

    pub(crate) fn flow_text(
        &mut self,
        role: BlockRole,
        text: &str,
        font: StandardFont,
        font_size: Pt,
        align: Align,
    ) {
        let lines = wrap_all(text, self.frame.content.width, font_size, font);
        self.flow_lines(role, lines, font, font_size, align);
    }

    fn flow_lines(
        &mut self,
        role: BlockRole,
        lines: Vec<WrappedLine>,
        font: StandardFont,
        font_size: Pt,
        align: Align,
    ) {
        let step = line_height(font_size);
        let mut rest = lines;
        let mut just_opened = false;
        while !rest.is_empty() {
            let mut fit = self.cursor.remaining_height().whole_steps(step);
            if fit == 0 {
                if !just_opened {
                    self.continue_sheet();
                    self.text_spills += 1;
                    just_opened = true;
                    continue;
                }
                // A hand-built frame too short for a single line; place one
                // anyway so the flow terminates.
                fit = 1;
            }
            let tail = rest.split_off(fit.min(rest.len()));
            self.push_block(role, font, font_size, align, rest);
            rest = tail;
            just_opened = false;
        }
    }

    fn push_block(
        &mut self,
        role: BlockRole,
        font: StandardFont,
        font_size: Pt,
        align: Align,
        lines: Vec<WrappedLine>,
    ) {
        let block = TextBlock {
            role,
            x: self.frame.content.x,
            y: self.cursor.y(),
            width: self.frame.content.width,
            font,
            font_size,
            line_height: line_height(font_size),
            align,
            lines,
        };
        self.cursor.advance(block.height());
        self.page().placements.push(Placement::Text(block));
    }

    /// Fits `image` into the space under the cursor, capped at `max_height`.
    /// Returns whether the image had to move to a continuation sheet.
    pub(crate) fn place_image(
        &mut self,
        image: &ImageInfo,
        max_height: Option<Pt>,
    ) -> Result<bool, DecodeFailure> {
        let cap = |available: Pt| match max_height {
            Some(limit) => available.min(limit),
            None => available,
        };
        let mut spilled = false;
        let available = self.cursor.remaining_height();
        if available < self.frame.min_photo_height && available < self.fresh_sheet_height() {
            self.continue_sheet();
            spilled = true;
        }
        let fitted = image.fit(self.frame.content.width, cap(self.cursor.remaining_height()))?;
        if let Some(rect) = self.cursor.take(fitted.width, fitted.height) {
            self.page().placements.push(Placement::Image(ImageBlock {
                rect,
                image: image.clone(),
            }));
        }
        Ok(spilled)
    }

    /// Height left on a continuation sheet once its heading is placed.
    fn fresh_sheet_height(&self) -> Pt {
        match self.continuation_heading {
            Some(_) => {
                self.frame.content.height
                    - line_height(self.frame.compact_header_size())
                    - self.frame.block_gap()
            }
            None => self.frame.content.height,
        }
    }

    pub(crate) fn text_spills(&self) -> usize {
        self.text_spills
    }

    pub(crate) fn finish(self) -> Vec<PlannedPage> {
        self.pages
    }
}

/// Lays out one exhibit. `decoded` holds one probe result per attachment, in
/// attachment order; `number` is the exhibit's 1-based position.
pub fn plan(
    exhibit: &Exhibit,
    number: usize,
    decoded: &[Result<ImageInfo, DecodeFailure>],
    frame: &PageFrame,
) -> LayoutPlan {
    let mut sheets = SheetPlanner::new(frame, Some(format!("Exhibit {number} (continued)")));
    let mut notices = Vec::new();
    let title = exhibit.display_title();

    match exhibit.display_mode {
        DisplayMode::Photo => {
            sheets.flow_text(
                BlockRole::Header,
                &format!("Exhibit {number}: {title}"),
                StandardFont::HelveticaBold,
                frame.header_size,
                Align::Left,
            );
            if !exhibit.description.trim().is_empty() {
                sheets.gap();
                body(&mut sheets, frame, &exhibit.description);
            }
            match decoded.first() {
                None => {}
                Some(Ok(image)) => {
                    sheets.gap();
                    match sheets.place_image(image, Some(frame.photo_max_height)) {
                        Ok(true) => notices.push(LayoutNotice::PhotoSpilled { exhibit: number }),
                        Ok(false) => {}
                        Err(reason) => {
                            image_unavailable(&mut sheets, frame, &mut notices, number, 1, reason)
                        }
                    }
                }
                Some(Err(reason)) => {
                    sheets.gap();
                    image_unavailable(&mut sheets, frame, &mut notices, number, 1, reason.clone());
                }
            }
        }
        DisplayMode::Document => {
            sheets.flow_text(
                BlockRole::Header,
                &format!("Exhibit {number}: {title} (Document)"),
                StandardFont::HelveticaBold,
                frame.compact_header_size(),
                Align::Left,
            );
            sheets.gap();
            match decoded.first() {
                Some(Ok(image)) => match sheets.place_image(image, None) {
                    Ok(true) => notices.push(LayoutNotice::PhotoSpilled { exhibit: number }),
                    Ok(false) => {}
                    Err(reason) => {
                        let text = format!("[Document image unavailable: {}]", reason.kind.label());
                        document_fallback(&mut sheets, frame, exhibit, &text);
                        notices.push(LayoutNotice::ImageUnavailable {
                            exhibit: number,
                            attachment: 1,
                            reason,
                        });
                    }
                },
                Some(Err(reason)) => {
                    let text = format!("[Document image unavailable: {}]", reason.kind.label());
                    document_fallback(&mut sheets, frame, exhibit, &text);
                    notices.push(LayoutNotice::ImageUnavailable {
                        exhibit: number,
                        attachment: 1,
                        reason: reason.clone(),
                    });
                }
                None => {
                    document_fallback(&mut sheets, frame, exhibit, "[No document attached]");
                    notices.push(LayoutNotice::MissingDocument { exhibit: number });
                }
            }
        }
    }

    let total = decoded.len();
    for (idx, result) in decoded.iter().enumerate().skip(1) {
        let attachment = idx + 1;
        sheets.open_sheet(Some(&format!(
            "Exhibit {number} (continued): attachment {attachment} of {total}"
        )));
        let outcome = match result {
            Ok(image) => sheets.place_image(image, None).map(|_| ()),
            Err(reason) => Err(reason.clone()),
        };
        if let Err(reason) = outcome {
            image_unavailable(&mut sheets, frame, &mut notices, number, attachment, reason);
        }
    }

    if sheets.text_spills() > 0 {
        notices.push(LayoutNotice::TextContinued {
            exhibit: Some(number),
            sheets: sheets.text_spills(),
        });
    }

    LayoutPlan {
        exhibit: Some(number),
        pages: sheets.finish(),
        notices,
    }
}

/// Decodes the exhibit's attachments in order, then plans it.
pub fn plan_exhibit(exhibit: &Exhibit, number: usize, frame: &PageFrame) -> LayoutPlan {
    let decoded: Vec<Result<ImageInfo, DecodeFailure>> = exhibit
        .attachments
        .iter()
        .map(|attachment| probe(&attachment.image_bytes, &attachment.mime_type))
        .collect();
    plan(exhibit, number, &decoded, frame)
}

fn body(sheets: &mut SheetPlanner<'_>, frame: &PageFrame, text: &str) {
    sheets.flow_text(
        BlockRole::Body,
        text,
        StandardFont::Helvetica,
        frame.body_size,
        Align::Left,
    );
}

fn marker(sheets: &mut SheetPlanner<'_>, frame: &PageFrame, text: &str) {
    sheets.flow_text(
        BlockRole::Marker,
        text,
        StandardFont::HelveticaBold,
        frame.body_size,
        Align::Left,
    );
}

fn image_unavailable(
    sheets: &mut SheetPlanner<'_>,
    frame: &PageFrame,
    notices: &mut Vec<LayoutNotice>,
    exhibit: usize,
    attachment: usize,
    reason: DecodeFailure,
) {
    marker(sheets, frame, &format!("[Image unavailable: {}]", reason.kind.label()));
    notices.push(LayoutNotice::ImageUnavailable {
        exhibit,
        attachment,
        reason,
    });
}

fn document_fallback(
    sheets: &mut SheetPlanner<'_>,
    frame: &PageFrame,
    exhibit: &Exhibit,
    marker_text: &str,
) {
    if !exhibit.description.trim().is_empty() {
        body(sheets, frame, &exhibit.description);
        sheets.gap();
    }
    marker(sheets, frame, marker_text);
}
