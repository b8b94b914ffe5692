//! A small PDF 1.4 writer: Helvetica text and stroked rectangles on A4 pages.
//!
//! Coordinates are in points with the origin at the bottom-left corner of
//! the page, like every PDF content stream.

use std::fmt::Write as _;

pub const A4_WIDTH: f32 = 595.2756;
pub const A4_HEIGHT: f32 = 841.8898;

/// Points in one centimetre.
pub const CM: f32 = 72.0 / 2.54;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Helvetica,
    HelveticaBold,
}

impl Font {
    fn resource(self) -> &'static str {
        match self {
            Font::Helvetica => "F1",
            Font::HelveticaBold => "F2",
        }
    }

    fn base_font(self) -> &'static str {
        match self {
            Font::Helvetica => "Helvetica",
            Font::HelveticaBold => "Helvetica-Bold",
        }
    }

    /// Glyph width in thousandths of the font size, from the standard AFM metrics.
    fn glyph_width(self, byte: u8) -> u16 {
        let table = match self {
            Font::Helvetica => &HELVETICA_WIDTHS,
            Font::HelveticaBold => &HELVETICA_BOLD_WIDTHS,
        };
        match byte {
            32..=255 => table[(byte - 32) as usize],
            _ => 0,
        }
    }
}

// WinAnsi codes 32 to 255; 0 where the encoding has no glyph.
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 224] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, 0,
    556, 0, 222, 556, 333, 1000, 556, 556, 333, 1000, 667, 333, 1000, 0, 611, 0,
    0, 222, 222, 333, 333, 350, 556, 1000, 333, 1000, 500, 333, 944, 0, 500, 667,
    278, 333, 556, 556, 556, 556, 260, 556, 333, 737, 370, 556, 584, 333, 737, 333,
    400, 584, 333, 333, 333, 556, 537, 278, 333, 333, 365, 556, 834, 834, 834, 611,
    667, 667, 667, 667, 667, 667, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278,
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611,
    556, 556, 556, 556, 556, 556, 889, 500, 556, 556, 556, 556, 278, 278, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 584, 611, 556, 556, 556, 556, 500, 556, 500,
];

#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 224] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584, 0,
    556, 0, 278, 556, 500, 1000, 556, 556, 333, 1000, 667, 333, 1000, 0, 611, 0,
    0, 278, 278, 500, 500, 350, 556, 1000, 333, 1000, 556, 333, 944, 0, 500, 667,
    278, 333, 556, 556, 556, 556, 280, 556, 333, 737, 370, 556, 584, 333, 737, 333,
    400, 584, 333, 333, 333, 611, 556, 278, 333, 333, 365, 556, 834, 834, 834, 611,
    722, 722, 722, 722, 722, 722, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278,
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611,
    556, 556, 556, 556, 556, 556, 889, 556, 556, 556, 556, 556, 278, 278, 278, 278,
    611, 611, 611, 611, 611, 611, 611, 584, 611, 611, 611, 611, 611, 556, 611, 556,
];

/// Encodes text as WinAnsi (cp1252) bytes; anything else becomes `?`.
fn encode(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{20}'..='\u{7E}' | '\u{A0}'..='\u{FF}' => c as u32 as u8,
            '\u{202F}' => 0xA0,
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
            _ => b'?',
        })
        .collect()
}

fn escape(bytes: &[u8], out: &mut Vec<u8>) {
    for &b in bytes {
        if matches!(b, b'(' | b')' | b'\\') {
            out.push(b'\\');
        }
        out.push(b);
    }
}

pub fn text_width(text: &str, font: Font, size: f32) -> f32 {
    let units: u32 = encode(text)
        .into_iter()
        .map(|b| font.glyph_width(b) as u32)
        .sum();
    units as f32 * size / 1000.0
}

pub struct Canvas {
    width: f32,
    height: f32,
    pages: Vec<Vec<u8>>,
    current: Vec<u8>,
    font: Font,
    size: f32,
}

impl Canvas {
    pub fn new(width: f32, height: f32) -> Self {
        Canvas {
            width,
            height,
            pages: Vec::new(),
            current: Vec::new(),
            font: Font::Helvetica,
            size: 12.0,
        }
    }

    pub fn a4() -> Self {
        Canvas::new(A4_WIDTH, A4_HEIGHT)
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn set_font(&mut self, font: Font, size: f32) {
        self.font = font;
        self.size = size;
    }

    pub fn draw_string(&mut self, x: f32, y: f32, text: &str) {
        let mut op = Vec::new();
        let _ = write!(
            Ops(&mut op),
            "BT /{} {:.2} Tf {:.2} {:.2} Td (",
            self.font.resource(),
            self.size,
            x,
            y
        );
        escape(&encode(text), &mut op);
        op.extend_from_slice(b") Tj ET\n");
        self.current.extend_from_slice(&op);
    }

    pub fn draw_centred_string(&mut self, x: f32, y: f32, text: &str) {
        let w = text_width(text, self.font, self.size);
        self.draw_string(x - w / 2.0, y, text);
    }

    pub fn draw_right_string(&mut self, x: f32, y: f32, text: &str) {
        let w = text_width(text, self.font, self.size);
        self.draw_string(x - w, y, text);
    }

    /// Stroked rectangle with its lower-left corner at (`x`, `y`).
    pub fn rect(&mut self, x: f32, y: f32, w: f32, h: f32) {
        let _ = writeln!(
            Ops(&mut self.current),
            "{:.2} {:.2} {:.2} {:.2} re S",
            x,
            y,
            w,
            h
        );
    }

    pub fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) {
        let _ = writeln!(
            Ops(&mut self.current),
            "{:.2} {:.2} m {:.2} {:.2} l S",
            x1,
            y1,
            x2,
            y2
        );
    }

    /// Ends the current page; drawing continues on a fresh one.
    pub fn show_page(&mut self) {
        let page = std::mem::take(&mut self.current);
        self.pages.push(page);
    }

    pub fn page_count(&self) -> usize {
        self.pages.len() + usize::from(!self.current.is_empty())
    }

    /// Serializes the document. A pending page is closed first.
    pub fn save(mut self) -> Vec<u8> {
        if !self.current.is_empty() || self.pages.is_empty() {
            self.show_page();
        }

        let page_count = self.pages.len();
        // 1 catalog, 2 pages, 3-4 fonts, then a (page, contents) pair per page.
        let page_obj = |i: usize| 5 + 2 * i;
        let object_count = 4 + 2 * page_count;

        let mut out: Vec<u8> = Vec::new();
        let mut offsets: Vec<usize> = Vec::with_capacity(object_count);
        out.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");

        let mut object = |out: &mut Vec<u8>, id: usize, body: &[u8]| {
            offsets.push(out.len());
            let _ = write!(Ops(&mut *out), "{} 0 obj\n", id);
            out.extend_from_slice(body);
            out.extend_from_slice(b"\nendobj\n");
        };

        object(&mut out, 1, b"<< /Type /Catalog /Pages 2 0 R >>");

        let kids: Vec<String> = (0..page_count)
            .map(|i| format!("{} 0 R", page_obj(i)))
            .collect();
        let pages = format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            page_count
        );
        object(&mut out, 2, pages.as_bytes());

        for (id, font) in [(3, Font::Helvetica), (4, Font::HelveticaBold)] {
            let body = format!(
                "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
                font.base_font()
            );
            object(&mut out, id, body.as_bytes());
        }

        for (i, content) in self.pages.iter().enumerate() {
            let page = format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.4} {:.4}] \
                 /Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> /Contents {} 0 R >>",
                self.width,
                self.height,
                page_obj(i) + 1
            );
            object(&mut out, page_obj(i), page.as_bytes());

            let mut stream = format!("<< /Length {} >>\nstream\n", content.len()).into_bytes();
            stream.extend_from_slice(content);
            stream.extend_from_slice(b"\nendstream");
            object(&mut out, page_obj(i) + 1, &stream);
        }

        let xref_offset = out.len();
        let _ = write!(
            Ops(&mut out),
            "xref\n0 {}\n0000000000 65535 f \n",
            object_count + 1
        );
        for offset in &offsets {
            let _ = write!(Ops(&mut out), "{:010} 00000 n \n", offset);
        }
        let _ = write!(
            Ops(&mut out),
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            object_count + 1,
            xref_offset
        );
        out
    }
}

/// `fmt::Write` adapter appending UTF-8 to a byte buffer.
struct Ops<'a>(&'a mut Vec<u8>);

impl std::fmt::Write for Ops<'_> {
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        self.0.extend_from_slice(s.as_bytes());
        Ok(())
    }
}
