use std::collections::HashMap;
use std::io::{self, Write};

use image::GenericImageView;
use sha2::{Digest, Sha256};

use crate::assemble::Packet;
use crate::canvas::PageRole;
use crate::error::PacketError;
use crate::font::{StandardFont, winansi_glyphs};
use crate::picture::{ImageInfo, SourceFormat};
use crate::render::{Renderer, render_packet};
use crate::types::{Pt, Size};

// Fixed object ids; images, content streams and pages follow.
const CATALOG_ID: usize = 1;
const PAGES_ID: usize = 2;
const REGULAR_FONT_ID: usize = 3;
const BOLD_FONT_ID: usize = 4;
const INFO_ID: usize = 5;
const FIRST_FREE_ID: usize = 6;

const PDF_HEADER: &[u8] = b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n";

struct ImageData {
    width: u32,
    height: u32,
    color_space: &'static str,
    bits_per_component: u8,
    filter: &'static str,
    data: Vec<u8>,
    alpha: Option<AlphaData>,
}

struct AlphaData {
    width: u32,
    height: u32,
    bits_per_component: u8,
    filter: &'static str,
    data: Vec<u8>,
}

struct PageState {
    size: Size,
    content: String,
    images: Vec<(String, usize)>,
}

/// Writes a packet as a PDF 1.7 file.
///
/// Text uses the base-14 Helvetica faces with WinAnsi encoding, so nothing is
/// embedded. JPEG attachments are passed through as-is; PNGs are re-encoded as
/// Flate-compressed RGB with a soft mask when they carry transparency. An
/// image placed more than once is stored once.
pub struct PdfRenderer {
    title: Option<String>,
    // Object bodies by id; slot 0 is unused.
    objects: Vec<Option<String>>,
    page_ids: Vec<usize>,
    images: HashMap<[u8; 32], (String, usize)>,
    current: Option<PageState>,
    lossy_chars: usize,
}

impl Default for PdfRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfRenderer {
    pub fn new() -> Self {
        Self {
            title: None,
            objects: vec![None; FIRST_FREE_ID],
            page_ids: Vec::new(),
            images: HashMap::new(),
            current: None,
            lossy_chars: 0,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    fn add_object(&mut self, body: String) -> usize {
        self.objects.push(Some(body));
        self.objects.len() - 1
    }

    fn set_object(&mut self, id: usize, body: String) {
        if let Some(slot) = self.objects.get_mut(id) {
            *slot = Some(body);
        }
    }

    fn current_page(&mut self) -> Result<&mut PageState, PacketError> {
        self.current
            .as_mut()
            .ok_or_else(|| PacketError::Render("draw call outside of a page".to_string()))
    }

    fn ensure_image(&mut self, image: &ImageInfo) -> Result<(String, usize), PacketError> {
        let key = image_key(&image.bytes);
        if let Some(existing) = self.images.get(&key) {
            return Ok(existing.clone());
        }
        let data = decode_image_bytes(image)?;
        let smask_id = match &data.alpha {
            Some(alpha) => Some(self.add_object(image_smask_object(alpha))),
            None => None,
        };
        let id = self.add_object(image_object(&data, smask_id));
        let entry = (format!("Im{}", self.images.len() + 1), id);
        self.images.insert(key, entry.clone());
        Ok(entry)
    }

    /// Closes any open page and writes the finished file.
    pub fn finish_to_writer<W: Write>(mut self, writer: &mut W) -> Result<(), PacketError> {
        if self.current.is_some() {
            self.end_page()?;
        }
        if self.lossy_chars > 0 {
            log::warn!(
                "{} character(s) outside WinAnsi were replaced with '?'",
                self.lossy_chars
            );
        }

        let kids: Vec<String> = self.page_ids.iter().map(|id| format!("{} 0 R", id)).collect();
        self.set_object(CATALOG_ID, format!("<< /Type /Catalog /Pages {} 0 R >>", PAGES_ID));
        self.set_object(
            PAGES_ID,
            format!(
                "<< /Type /Pages /Kids [{}] /Count {} >>",
                kids.join(" "),
                self.page_ids.len()
            ),
        );
        self.set_object(REGULAR_FONT_ID, font_object(StandardFont::Helvetica));
        self.set_object(BOLD_FONT_ID, font_object(StandardFont::HelveticaBold));
        self.set_object(INFO_ID, info_object(self.title.as_deref()));

        let mut offset = 0usize;
        let mut offsets = vec![0usize; self.objects.len()];
        write_bytes(writer, PDF_HEADER, &mut offset)?;
        for (obj_id, body) in self.objects.iter().enumerate().skip(1) {
            let body = body.as_deref().unwrap_or("null");
            write_pdf_object(writer, &mut offset, &mut offsets, obj_id, body)?;
        }

        let xref_start = offset;
        write_str(writer, &format!("xref\n0 {}\n", self.objects.len()), &mut offset)?;
        write_str(writer, "0000000000 65535 f \n", &mut offset)?;
        for entry in offsets.iter().skip(1) {
            write_str(writer, &format!("{:010} 00000 n \n", entry), &mut offset)?;
        }
        write_str(
            writer,
            &format!(
                "trailer\n<< /Size {} /Root {} 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
                self.objects.len(),
                CATALOG_ID,
                INFO_ID,
                xref_start
            ),
            &mut offset,
        )?;
        writer.flush()?;
        log::debug!(
            "pdf written: {} page(s), {} image(s), {} bytes",
            self.page_ids.len(),
            self.images.len(),
            offset
        );
        Ok(())
    }

    pub fn finish(self) -> Result<Vec<u8>, PacketError> {
        let mut out = Vec::new();
        self.finish_to_writer(&mut out)?;
        Ok(out)
    }
}

impl Renderer for PdfRenderer {
    fn begin_page(&mut self, size: Size, _role: PageRole) -> Result<(), PacketError> {
        if self.current.is_some() {
            self.end_page()?;
        }
        self.current = Some(PageState {
            size,
            content: String::new(),
            images: Vec::new(),
        });
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
        let encoded = encode_winansi_pdf_string(text);
        self.lossy_chars += encoded.replaced;
        let page = self.current_page()?;
        let baseline = page.size.height - y - font_size;
        page.content.push_str("BT\n");
        page.content
            .push_str(&format!("/{} {} Tf\n", font_resource(font), fmt_pt(font_size)));
        page.content
            .push_str(&format!("{} {} Td\n", fmt_pt(x), fmt_pt(baseline)));
        page.content.push_str(&format!("({}) Tj\n", encoded.text));
        page.content.push_str("ET\n");
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
        self.current_page()?;
        let (name, id) = self.ensure_image(image)?;
        let page = self.current_page()?;
        let draw_y = page.size.height - y - height;
        page.content.push_str("q\n");
        page.content.push_str(&format!(
            "{} 0 0 {} {} {} cm\n",
            fmt_pt(width),
            fmt_pt(height),
            fmt_pt(x),
            fmt_pt(draw_y)
        ));
        page.content.push_str(&format!("/{} Do\n", name));
        page.content.push_str("Q\n");
        if !page.images.iter().any(|(existing, _)| *existing == name) {
            page.images.push((name, id));
        }
        Ok(())
    }

    fn end_page(&mut self) -> Result<(), PacketError> {
        let page = self
            .current
            .take()
            .ok_or_else(|| PacketError::Render("end_page without begin_page".to_string()))?;
        let content_id = self.add_object(stream_object(&page.content));
        let resources = format!(
            "<< /Font << /F1 {} 0 R /F2 {} 0 R >> /XObject {} >>",
            REGULAR_FONT_ID,
            BOLD_FONT_ID,
            xobject_resources(&page.images)
        );
        let page_id = self.add_object(format!(
            "<< /Type /Page /Parent {} 0 R /MediaBox [0 0 {} {}] /Resources {} /Contents {} 0 R >>",
            PAGES_ID,
            fmt_pt(page.size.width),
            fmt_pt(page.size.height),
            resources,
            content_id
        ));
        self.page_ids.push(page_id);
        Ok(())
    }
}

/// Renders `packet` to PDF bytes in memory.
pub fn packet_to_pdf(packet: &Packet) -> Result<Vec<u8>, PacketError> {
    let mut renderer = PdfRenderer::new().with_title("Property Tax Protest");
    render_packet(packet, &mut renderer)?;
    renderer.finish()
}

pub fn packet_to_pdf_writer<W: Write>(packet: &Packet, writer: &mut W) -> Result<(), PacketError> {
    let mut renderer = PdfRenderer::new().with_title("Property Tax Protest");
    render_packet(packet, &mut renderer)?;
    renderer.finish_to_writer(writer)
}

fn font_resource(font: StandardFont) -> &'static str {
    match font {
        StandardFont::Helvetica => "F1",
        StandardFont::HelveticaBold => "F2",
    }
}

fn decode_image_bytes(image: &ImageInfo) -> Result<ImageData, PacketError> {
    let format = match image.format {
        SourceFormat::Png => image::ImageFormat::Png,
        SourceFormat::Jpeg => image::ImageFormat::Jpeg,
    };
    let decoded = image::load_from_memory_with_format(&image.bytes, format)
        .map_err(|err| PacketError::Render(format!("image decode failed: {err}")))?;
    let (width, height) = decoded.dimensions();

    if image.format == SourceFormat::Jpeg {
        let color_space = match decoded.color() {
            image::ColorType::L8 | image::ColorType::La8 => "/DeviceGray",
            _ => "/DeviceRGB",
        };
        return Ok(ImageData {
            width,
            height,
            color_space,
            bits_per_component: 8,
            filter: "/DCTDecode",
            data: image.bytes.to_vec(),
            alpha: None,
        });
    }

    let rgba = decoded.to_rgba8();
    let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);
    let mut alpha = Vec::with_capacity(width as usize * height as usize);
    let mut has_alpha = false;
    for pixel in rgba.pixels() {
        let [r, g, b, a] = pixel.0;
        if a != 255 {
            has_alpha = true;
        }
        rgb.extend_from_slice(&[r, g, b]);
        alpha.push(a);
    }

    let alpha = if has_alpha {
        Some(AlphaData {
            width,
            height,
            bits_per_component: 8,
            filter: "/FlateDecode",
            data: flate_compress(&alpha)?,
        })
    } else {
        None
    };
    Ok(ImageData {
        width,
        height,
        color_space: "/DeviceRGB",
        bits_per_component: 8,
        filter: "/FlateDecode",
        data: flate_compress(&rgb)?,
        alpha,
    })
}

fn flate_compress(data: &[u8]) -> io::Result<Vec<u8>> {
    use flate2::Compression;
    use flate2::write::ZlibEncoder;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// SHA-256 of the source bytes; equal keys mean identical images.
fn image_key(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

fn image_object(image: &ImageData, smask_id: Option<usize>) -> String {
    let stream_data = encode_stream_data(&image.data);
    let filters = match image.filter {
        "/DCTDecode" => "[/ASCIIHexDecode /DCTDecode]",
        _ => "[/ASCIIHexDecode /FlateDecode]",
    };
    let smask = smask_id
        .map(|id| format!(" /SMask {} 0 R", id))
        .unwrap_or_default();
    format!(
        "<< /Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace {} /BitsPerComponent {} /Length {} /Filter {}{} >>
stream
{}
endstream",
        image.width,
        image.height,
        image.color_space,
        image.bits_per_component,
        stream_data.len(),
        filters,
        smask,
        stream_data
    )
}

fn image_smask_object(alpha: &AlphaData) -> String {
    let stream_data = encode_stream_data(&alpha.data);
    format!(
        "<< /Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace /DeviceGray /BitsPerComponent {} /Length {} /Filter [/ASCIIHexDecode {}] >>
stream
{}
endstream",
        alpha.width,
        alpha.height,
        alpha.bits_per_component,
        stream_data.len(),
        alpha.filter,
        stream_data
    )
}

fn encode_stream_data(data: &[u8]) -> String {
    let mut hex = ascii_hex_encode(data);
    hex.push('>');
    hex
}

fn ascii_hex_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2 + data.len() / 32);
    for (index, byte) in data.iter().enumerate() {
        use std::fmt::Write;
        let _ = write!(&mut out, "{:02X}", byte);
        if index % 32 == 31 {
            out.push('\n');
        }
    }
    out
}

fn font_object(font: StandardFont) -> String {
    format!(
        "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
        font.base_font()
    )
}

fn xobject_resources(images: &[(String, usize)]) -> String {
    let mut entries = Vec::new();
    for (resource, image_id) in images {
        entries.push(format!("/{} {} 0 R", resource, image_id));
    }
    format!("<< {} >>", entries.join(" "))
}

fn stream_object(content: &str) -> String {
    let length = content.len();
    format!("<< /Length {} >>\nstream\n{}\nendstream", length, content)
}

fn info_object(title: Option<&str>) -> String {
    let mut entries = vec!["/Producer (protest_packet)".to_string()];
    if let Some(title) = title {
        entries.push(format!("/Title ({})", escape_pdf_string(title)));
    }
    format!("<< {} >>", entries.join(" "))
}

fn write_pdf_object<W: Write>(
    writer: &mut W,
    offset: &mut usize,
    offsets: &mut [usize],
    obj_id: usize,
    body: &str,
) -> io::Result<()> {
    if let Some(slot) = offsets.get_mut(obj_id) {
        *slot = *offset;
    }
    write_str(writer, &format!("{} 0 obj\n", obj_id), offset)?;
    write_bytes(writer, body.as_bytes(), offset)?;
    write_bytes(writer, b"\nendobj\n", offset)?;
    Ok(())
}

fn write_bytes<W: Write>(writer: &mut W, data: &[u8], offset: &mut usize) -> io::Result<()> {
    writer.write_all(data)?;
    *offset += data.len();
    Ok(())
}

fn write_str<W: Write>(writer: &mut W, data: &str, offset: &mut usize) -> io::Result<()> {
    write_bytes(writer, data.as_bytes(), offset)
}

fn escape_pdf_string(input: &str) -> String {
    let mut out = String::new();
    for ch in input.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(ch),
        }
    }
    out
}

struct WinAnsiEncoded {
    text: String,
    replaced: usize,
}

fn encode_winansi_pdf_string(input: &str) -> WinAnsiEncoded {
    let mut out = String::new();
    let mut replaced = 0usize;
    for ch in input.chars() {
        let glyphs = winansi_glyphs(ch);
        if glyphs.replaced {
            replaced += 1;
        }
        for byte in glyphs.bytes() {
            match *byte {
                b'\\' => out.push_str("\\\\"),
                b'(' => out.push_str("\\("),
                b')' => out.push_str("\\)"),
                b if b >= 0x7f => out.push_str(&format!("\\{:03o}", b)),
                b => out.push(b as char),
            }
        }
    }

    WinAnsiEncoded {
        text: out,
        replaced,
    }
}

fn format_milli(milli: i64) -> String {
    if milli == 0 {
        return "0".to_string();
    }
    let sign = if milli < 0 { "-" } else { "" };
    let abs = milli.abs();
    let int_part = abs / 1000;
    let frac_part = abs % 1000;
    if frac_part == 0 {
        format!("{}{}", sign, int_part)
    } else {
        let mut s = format!("{}{}.{:03}", sign, int_part, frac_part);
        while s.ends_with('0') {
            s.pop();
        }
        s
    }
}

fn fmt_pt(value: Pt) -> String {
    format_milli(value.to_milli_i64())
}
