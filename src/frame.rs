use crate::types::{Pt, Rect};

/// Vertical cursor over a page's printable area. One frame lives for one
/// sheet; a new sheet gets a fresh frame with the cursor at the top margin.
#[derive(Debug, Clone, Copy)]
pub struct Frame {
    rect: Rect,
    cursor_y: Pt,
}

impl Frame {
    pub fn new(rect: Rect) -> Self {
        Self {
            rect,
            cursor_y: Pt::ZERO,
        }
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Page-space y of the cursor.
    pub fn y(&self) -> Pt {
        self.rect.y + self.cursor_y
    }

    pub fn remaining_height(&self) -> Pt {
        (self.rect.height - self.cursor_y).max(Pt::ZERO)
    }

    pub fn is_empty(&self) -> bool {
        self.cursor_y <= Pt::ZERO
    }

    pub fn fits(&self, height: Pt) -> bool {
        height <= self.remaining_height()
    }

    /// Moves the cursor down, stopping at the bottom of the frame.
    pub fn advance(&mut self, height: Pt) {
        self.cursor_y = (self.cursor_y + height.max(Pt::ZERO)).min(self.rect.height);
    }

    /// Claims `height` at the cursor and returns the box, or `None` when it
    /// does not fit. The cursor only moves on success.
    pub fn take(&mut self, width: Pt, height: Pt) -> Option<Rect> {
        if !self.fits(height) {
            return None;
        }
        let placed = Rect {
            x: self.rect.x,
            y: self.y(),
            width: width.min(self.rect.width),
            height,
        };
        self.advance(height);
        Some(placed)
    }

    pub fn reset(&mut self) {
        self.cursor_y = Pt::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> Frame {
        Frame::new(Rect {
            x: Pt::from_i32(50),
            y: Pt::from_i32(40),
            width: Pt::from_i32(200),
            height: Pt::from_i32(100),
        })
    }

    #[test]
    fn take_moves_cursor_only_when_it_fits() {
        let mut frame = frame();
        assert!(frame.is_empty());
        let first = frame.take(Pt::from_i32(300), Pt::from_i32(60)).expect("fits");
        assert_eq!(first.y, Pt::from_i32(40));
        assert_eq!(first.width, Pt::from_i32(200));
        assert_eq!(frame.y(), Pt::from_i32(100));
        assert!(frame.take(Pt::from_i32(10), Pt::from_i32(41)).is_none());
        assert_eq!(frame.remaining_height(), Pt::from_i32(40));
        assert!(frame.take(Pt::from_i32(10), Pt::from_i32(40)).is_some());
        assert_eq!(frame.remaining_height(), Pt::ZERO);
    }

    #[test]
    fn advance_is_clamped_and_reset_returns_to_top() {
        let mut frame = frame();
        frame.advance(Pt::from_i32(500));
        assert_eq!(frame.y(), Pt::from_i32(140));
        frame.reset();
        assert!(frame.is_empty());
        assert_eq!(frame.y(), Pt::from_i32(40));
    }
}
