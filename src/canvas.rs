use crate::font::StandardFont;
use crate::picture::ImageInfo;
use crate::types::{Pt, Size};

/// A draw instruction in page space. `y` is measured from the top edge of the
/// page; for text it is the top of the line box.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    PlaceText {
        x: Pt,
        y: Pt,
        text: String,
        font_size: Pt,
        font: StandardFont,
    },
    PlaceImage {
        x: Pt,
        y: Pt,
        width: Pt,
        height: Pt,
        image: ImageInfo,
    },
}

/// What a page holds. `sheet` counts from zero within its section, so the
/// first page of a section is sheet 0 and its continuations follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageRole {
    Cover { sheet: usize },
    Exhibit { number: usize, sheet: usize },
}

impl PageRole {
    pub fn exhibit_number(&self) -> Option<usize> {
        match self {
            PageRole::Cover { .. } => None,
            PageRole::Exhibit { number, .. } => Some(*number),
        }
    }

    pub fn is_continuation(&self) -> bool {
        match self {
            PageRole::Cover { sheet } | PageRole::Exhibit { sheet, .. } => *sheet > 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub role: PageRole,
    pub commands: Vec<Command>,
}

impl Page {
    fn new(role: PageRole) -> Self {
        Self {
            role,
            commands: Vec::new(),
        }
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|cmd| match cmd {
            Command::PlaceText { text, .. } => Some(text.as_str()),
            Command::PlaceImage { .. } => None,
        })
    }

    pub fn image_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|cmd| matches!(cmd, Command::PlaceImage { .. }))
            .count()
    }
}

/// Accumulates draw commands page by page.
pub struct Canvas {
    page_size: Size,
    pages: Vec<Page>,
    current: Option<Page>,
}

impl Canvas {
    pub fn new(page_size: Size) -> Self {
        Self {
            page_size,
            pages: Vec::new(),
            current: None,
        }
    }

    pub fn page_size(&self) -> Size {
        self.page_size
    }

    /// Opens a new page, closing the current one first. A page is kept even
    /// when nothing is drawn on it.
    pub fn start_page(&mut self, role: PageRole) {
        self.show_page();
        self.current = Some(Page::new(role));
    }

    pub fn place_text(
        &mut self,
        x: Pt,
        y: Pt,
        text: impl Into<String>,
        font_size: Pt,
        font: StandardFont,
    ) {
        self.push(Command::PlaceText {
            x,
            y,
            text: text.into(),
            font_size,
            font,
        });
    }

    pub fn place_image(&mut self, x: Pt, y: Pt, width: Pt, height: Pt, image: ImageInfo) {
        self.push(Command::PlaceImage {
            x,
            y,
            width,
            height,
            image,
        });
    }

    fn push(&mut self, command: Command) {
        // Drawing without an open page starts a cover page, matching how the
        // packet always opens.
        let page = self
            .current
            .get_or_insert_with(|| Page::new(PageRole::Cover { sheet: 0 }));
        page.commands.push(command);
    }

    pub fn show_page(&mut self) {
        if let Some(page) = self.current.take() {
            self.pages.push(page);
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len() + usize::from(self.current.is_some())
    }

    pub fn finish(mut self) -> (Size, Vec<Page>) {
        self.show_page();
        (self.page_size, self.pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_keep_order_and_roles() {
        let mut canvas = Canvas::new(Size::a4());
        canvas.start_page(PageRole::Cover { sheet: 0 });
        let at = Pt::from_i32(10);
        let font_size = Pt::from_i32(11);
        canvas.place_text(at, at, "cover", font_size, StandardFont::Helvetica);
        canvas.start_page(PageRole::Exhibit { number: 1, sheet: 0 });
        canvas.start_page(PageRole::Exhibit { number: 1, sheet: 1 });
        canvas.place_text(at, at, "more", font_size, StandardFont::Helvetica);
        assert_eq!(canvas.page_count(), 3);

        let (size, pages) = canvas.finish();
        assert_eq!(size, Size::a4());
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].texts().collect::<Vec<_>>(), vec!["cover"]);
        assert!(pages[1].commands.is_empty());
        assert_eq!(pages[2].role.exhibit_number(), Some(1));
        assert!(pages[2].role.is_continuation());
        assert!(!pages[0].role.is_continuation());
    }

    #[test]
    fn drawing_first_opens_a_cover_page() {
        let mut canvas = Canvas::new(Size::letter());
        canvas.place_text(Pt::ZERO, Pt::ZERO, "x", Pt::from_i32(9), StandardFont::HelveticaBold);
        let (_, pages) = canvas.finish();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].role, PageRole::Cover { sheet: 0 });
    }
}
