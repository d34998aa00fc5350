use crate::types::Pt;

// Advance widths from the Adobe base-14 AFM files, in 1/1000 em.
// Index = (char as usize) - 32, covering 0x20 (space) through 0x7E (~).
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0-9
    278, 278, 584, 584, 584, 556, 1015, // :..@
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // A-M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N-Z
    278, 278, 278, 469, 556, 333, // [..`
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // a-m
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // n-z
    334, 260, 334, 584, // {..~
];

const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0-9
    333, 333, 584, 584, 584, 611, 975, // :..@
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, // A-M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N-Z
    333, 278, 333, 584, 556, 333, // [..`
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, // a-m
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, // n-z
    389, 280, 389, 584, // {..~
];

// WinAnsi 0x80..=0xFF, same source. Codes with no glyph (0x81, 0x8D, 0x8F,
// 0x90, 0x9D) are never emitted; they carry the bullet width.
const HELVETICA_HIGH_WIDTHS: [u16; 128] = [
    556, 350, 222, 556, 333, 1000, 556, 556, 333, 1000, 667, 333, 1000, 350, 611, 350, // 0x80
    350, 222, 222, 333, 333, 350, 556, 1000, 333, 1000, 500, 333, 944, 350, 500, 667, // 0x90
    278, 333, 556, 556, 556, 556, 260, 556, 333, 737, 370, 556, 584, 333, 737, 333, // 0xA0
    400, 584, 333, 333, 333, 556, 537, 278, 333, 333, 365, 556, 834, 834, 834, 611, // 0xB0
    667, 667, 667, 667, 667, 667, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278, // 0xC0
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611, // 0xD0
    556, 556, 556, 556, 556, 556, 889, 500, 556, 556, 556, 556, 278, 278, 278, 278, // 0xE0
    556, 556, 556, 556, 556, 556, 556, 584, 611, 556, 556, 556, 556, 500, 556, 500, // 0xF0
];

const HELVETICA_BOLD_HIGH_WIDTHS: [u16; 128] = [
    556, 350, 278, 556, 500, 1000, 556, 556, 333, 1000, 667, 333, 1000, 350, 611, 350, // 0x80
    350, 278, 278, 500, 500, 350, 556, 1000, 333, 1000, 556, 333, 944, 350, 500, 667, // 0x90
    278, 333, 556, 556, 556, 556, 280, 556, 333, 737, 370, 556, 584, 333, 737, 333, // 0xA0
    400, 584, 333, 333, 333, 611, 556, 278, 333, 333, 365, 556, 834, 834, 834, 611, // 0xB0
    722, 722, 722, 722, 722, 722, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278, // 0xC0
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611, // 0xD0
    556, 556, 556, 556, 556, 556, 889, 556, 556, 556, 556, 556, 278, 278, 278, 278, // 0xE0
    611, 611, 611, 611, 611, 611, 611, 584, 611, 611, 611, 611, 611, 556, 611, 556, // 0xF0
];

/// The WinAnsi bytes one char is drawn with. A few symbols the encoding
/// lacks get an ASCII stand-in; anything else becomes `?`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct WinAnsiGlyphs {
    bytes: [u8; 2],
    len: usize,
    pub(crate) replaced: bool,
}

impl WinAnsiGlyphs {
    fn one(byte: u8) -> Self {
        Self {
            bytes: [byte, 0],
            len: 1,
            replaced: false,
        }
    }

    fn pair(first: u8, second: u8) -> Self {
        Self {
            bytes: [first, second],
            len: 2,
            replaced: false,
        }
    }

    pub(crate) fn bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

pub(crate) fn winansi_glyphs(ch: char) -> WinAnsiGlyphs {
    let byte = match ch {
        '\u{2265}' => return WinAnsiGlyphs::pair(b'>', b'='),
        '\u{2264}' => return WinAnsiGlyphs::pair(b'<', b'='),
        '\u{0020}'..='\u{007E}' | '\u{00A0}'..='\u{00FF}' => ch as u8,
        // cp1252 extensions
        '\u{20AC}' => 0x80,
        '\u{201A}' => 0x82,
        '\u{0192}' => 0x83,
        '\u{201E}' => 0x84,
        '\u{2026}' => 0x85,
        '\u{2020}' => 0x86,
        '\u{2021}' => 0x87,
        '\u{02C6}' => 0x88,
        '\u{2030}' => 0x89,
        '\u{0160}' => 0x8A,
        '\u{2039}' => 0x8B,
        '\u{0152}' => 0x8C,
        '\u{017D}' => 0x8E,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201C}' => 0x93,
        '\u{201D}' => 0x94,
        '\u{2022}' => 0x95,
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        '\u{02DC}' => 0x98,
        '\u{2122}' => 0x99,
        '\u{0161}' => 0x9A,
        '\u{203A}' => 0x9B,
        '\u{0153}' => 0x9C,
        '\u{017E}' => 0x9E,
        '\u{0178}' => 0x9F,
        _ => {
            return WinAnsiGlyphs {
                replaced: true,
                ..WinAnsiGlyphs::one(b'?')
            };
        }
    };
    WinAnsiGlyphs::one(byte)
}

/// The base-14 faces the packet is set in. Every PDF reader ships these, so
/// nothing is embedded and measurement matches what the reader draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
}

impl StandardFont {
    pub fn base_font(self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::HelveticaBold => "Helvetica-Bold",
        }
    }

    fn byte_units(self, byte: u8) -> u32 {
        let (low, high) = match self {
            StandardFont::Helvetica => (&HELVETICA_WIDTHS, &HELVETICA_HIGH_WIDTHS),
            StandardFont::HelveticaBold => (&HELVETICA_BOLD_WIDTHS, &HELVETICA_BOLD_HIGH_WIDTHS),
        };
        match byte {
            0x20..=0x7E => low[(byte - 0x20) as usize] as u32,
            0x80..=0xFF => high[(byte - 0x80) as usize] as u32,
            _ => 0,
        }
    }

    /// Width of `ch` as drawn, following the same WinAnsi mapping as the PDF
    /// writer.
    pub fn advance_units(self, ch: char) -> u32 {
        winansi_glyphs(ch)
            .bytes()
            .iter()
            .map(|byte| self.byte_units(*byte))
            .sum()
    }

    pub fn text_units(self, text: &str) -> u64 {
        text.chars().map(|ch| self.advance_units(ch) as u64).sum()
    }

    pub fn text_width(self, font_size: Pt, text: &str) -> Pt {
        units_to_width(font_size, self.text_units(text))
    }
}

pub(crate) fn units_to_width(font_size: Pt, units: u64) -> Pt {
    if units == 0 {
        return Pt::ZERO;
    }
    let units = units.min(i32::MAX as u64) as i32;
    font_size.mul_ratio(units, 1000)
}

/// Baseline-to-baseline distance for a font size.
pub fn line_height(font_size: Pt) -> Pt {
    font_size.mul_ratio(6, 5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measures_ascii_with_afm_widths() {
        let size = Pt::from_i32(10);
        // "Hi" = 722 + 222 units.
        assert_eq!(
            StandardFont::Helvetica.text_width(size, "Hi").to_milli_i64(),
            9440
        );
        assert!(
            StandardFont::HelveticaBold.text_width(size, "Hi")
                > StandardFont::Helvetica.text_width(size, "Hi")
        );
    }

    #[test]
    fn winansi_symbols_use_their_glyph_widths() {
        let regular = StandardFont::Helvetica;
        assert_eq!(regular.advance_units('\u{2014}'), 1000);
        assert_eq!(regular.advance_units('\u{2026}'), 1000);
        assert_eq!(regular.advance_units('\u{2122}'), 1000);
        assert_eq!(regular.advance_units('\u{2030}'), 1000);
        assert_eq!(regular.advance_units('\u{00c6}'), 1000);
        assert_eq!(regular.advance_units('\u{0153}'), 944);
        assert_eq!(regular.advance_units('\u{00e6}'), 889);
        assert_eq!(regular.advance_units('\u{00e9}'), 556);
        assert_eq!(StandardFont::HelveticaBold.advance_units('\u{00e9}'), 556);
        assert_eq!(StandardFont::HelveticaBold.advance_units('\u{201c}'), 500);
        assert_eq!(regular.text_units(""), 0);
    }

    #[test]
    fn unmappable_chars_measure_as_their_stand_in() {
        let regular = StandardFont::Helvetica;
        let question = regular.advance_units('?');
        assert_eq!(regular.advance_units('\u{2260}'), question);
        assert_eq!(regular.advance_units('\u{4e2d}'), question);
        assert_eq!(regular.advance_units('\u{0007}'), question);
        assert_eq!(u64::from(regular.advance_units('\u{2265}')), regular.text_units(">="));

        let glyphs = winansi_glyphs('\u{2260}');
        assert!(glyphs.replaced);
        assert_eq!(glyphs.bytes(), b"?");
        assert_eq!(winansi_glyphs('\u{2014}').bytes(), &[0x97]);
        assert!(!winansi_glyphs('\u{2264}').replaced);
    }

    #[test]
    fn line_height_is_six_fifths_of_size() {
        assert_eq!(line_height(Pt::from_i32(10)).to_milli_i64(), 12000);
    }
}
