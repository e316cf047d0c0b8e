//! # PDF Serializer
//!
//! Takes the laid-out pages from the layout engine and writes a valid PDF
//! file. This is a from-scratch PDF 1.7 writer — the subset a report needs
//! (two standard fonts, filled rectangles, JPEG images) is small enough
//! that writing the raw bytes keeps the engine self-contained.
//!
//! ## PDF Structure (simplified)
//!
//! ```text
//! %PDF-1.7            <- header
//! 1 0 obj ... endobj  <- objects (catalog, fonts, pages, content, images)
//! 2 0 obj ... endobj
//! ...
//! xref                <- cross-reference table (byte offsets of each object)
//! trailer             <- points to the root object
//! %%EOF
//! ```
//!
//! Text uses the standard Helvetica and Helvetica-Bold Type1 fonts with
//! WinAnsiEncoding, whose Latin-1 range covers the Portuguese report text.
//! Photos are always normalized JPEGs, so images embed directly as
//! DCTDecode XObjects without re-encoding.

use std::fmt::Write as FmtWrite; // for write! on String
use std::io::Write as IoWrite; // for write! on Vec<u8>

use miniz_oxide::deflate::compress_to_vec_zlib;

use crate::image::NormalizedPhoto;
use crate::layout::{DrawOp, Page};

pub struct PdfWriter;

struct PdfObject {
    data: Vec<u8>,
}

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfWriter {
    pub fn new() -> Self {
        Self
    }

    /// Write laid-out pages to a PDF byte vector.
    pub fn write(&self, pages: &[Page], title: &str) -> Vec<u8> {
        // Object IDs: 0 = placeholder (PDF objects are 1-indexed),
        // 1 = Catalog, 2 = Pages tree, 3 = Helvetica, 4 = Helvetica-Bold,
        // then per page: image XObjects, content stream, page object.
        let mut objects: Vec<PdfObject> = Vec::new();
        objects.push(PdfObject { data: vec![] });
        objects.push(PdfObject { data: vec![] });
        objects.push(PdfObject { data: vec![] });
        objects.push(PdfObject {
            data: b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica \
                    /Encoding /WinAnsiEncoding >>"
                .to_vec(),
        });
        objects.push(PdfObject {
            data: b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold \
                    /Encoding /WinAnsiEncoding >>"
                .to_vec(),
        });

        let mut page_obj_ids: Vec<usize> = Vec::new();
        let mut image_counter = 0usize;

        for page in pages {
            // Register this page's images first so the content stream can
            // reference them by name.
            let mut image_refs: Vec<(usize, usize)> = Vec::new(); // (index, obj id)
            for op in &page.ops {
                if let DrawOp::Image { photo, .. } = op {
                    let obj_id = Self::write_image_xobject(&mut objects, photo);
                    image_refs.push((image_counter, obj_id));
                    image_counter += 1;
                }
            }

            let content = Self::content_stream(page, image_refs.iter().map(|(idx, _)| *idx));
            let compressed = compress_to_vec_zlib(content.as_bytes(), 6);

            let content_obj_id = objects.len();
            let mut content_data: Vec<u8> = Vec::new();
            let _ = write!(
                content_data,
                "<< /Length {} /Filter /FlateDecode >>\nstream\n",
                compressed.len()
            );
            content_data.extend_from_slice(&compressed);
            content_data.extend_from_slice(b"\nendstream");
            objects.push(PdfObject { data: content_data });

            let xobjects = image_refs
                .iter()
                .map(|(idx, obj_id)| format!("/Im{} {} 0 R", idx, obj_id))
                .collect::<Vec<_>>()
                .join(" ");
            let resources = if xobjects.is_empty() {
                "/Font << /F0 3 0 R /F1 4 0 R >>".to_string()
            } else {
                format!("/Font << /F0 3 0 R /F1 4 0 R >> /XObject << {} >>", xobjects)
            };

            let page_obj_id = objects.len();
            let page_dict = format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
                 /Contents {} 0 R /Resources << {} >> >>",
                page.width, page.height, content_obj_id, resources
            );
            objects.push(PdfObject {
                data: page_dict.into_bytes(),
            });
            page_obj_ids.push(page_obj_id);
        }

        objects[1].data = b"<< /Type /Catalog /Pages 2 0 R >>".to_vec();

        let kids: String = page_obj_ids
            .iter()
            .map(|id| format!("{} 0 R", id))
            .collect::<Vec<_>>()
            .join(" ");
        objects[2].data = format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids,
            page_obj_ids.len()
        )
        .into_bytes();

        let info_obj_id = objects.len();
        objects.push(PdfObject {
            data: format!(
                "<< /Title ({}) /Producer (avalia 0.3) >>",
                Self::escape_pdf_string(title)
            )
            .into_bytes(),
        });

        Self::serialize(&objects, info_obj_id)
    }

    /// Build the content stream for one page of draw operations.
    fn content_stream(page: &Page, image_indices: impl Iterator<Item = usize>) -> String {
        let mut stream = String::new();
        let mut image_indices = image_indices;
        let page_height = page.height;

        for op in &page.ops {
            match op {
                DrawOp::Text {
                    x,
                    y,
                    text,
                    size,
                    bold,
                    color,
                } => {
                    let font = if *bold { "F1" } else { "F0" };
                    let pdf_y = page_height - y;
                    let _ = write!(
                        stream,
                        "BT\n{:.3} {:.3} {:.3} rg\n/{} {:.1} Tf\n{:.2} {:.2} Td\n({}) Tj\nET\n",
                        color.r,
                        color.g,
                        color.b,
                        font,
                        size,
                        x,
                        pdf_y,
                        Self::encode_text(text)
                    );
                }

                DrawOp::Rect {
                    x,
                    y,
                    width,
                    height,
                    color,
                } => {
                    let pdf_y = page_height - y - height;
                    let _ = write!(
                        stream,
                        "q\n{:.3} {:.3} {:.3} rg\n{:.2} {:.2} {:.2} {:.2} re\nf\nQ\n",
                        color.r, color.g, color.b, x, pdf_y, width, height
                    );
                }

                DrawOp::Image {
                    x,
                    y,
                    width,
                    height,
                    ..
                } => {
                    let pdf_y = page_height - y - height;
                    let idx = image_indices.next().unwrap_or(0);
                    let _ = write!(
                        stream,
                        "q\n{:.4} 0 0 {:.4} {:.2} {:.2} cm\n/Im{} Do\nQ\n",
                        width, height, x, pdf_y, idx
                    );
                }
            }
        }

        stream
    }

    /// Write a normalized photo as a DCTDecode image XObject. Returns the
    /// object id.
    fn write_image_xobject(objects: &mut Vec<PdfObject>, photo: &NormalizedPhoto) -> usize {
        let obj_id = objects.len();
        let mut data: Vec<u8> = Vec::new();
        let _ = write!(
            data,
            "<< /Type /XObject /Subtype /Image \
             /Width {} /Height {} \
             /ColorSpace /DeviceRGB \
             /BitsPerComponent 8 \
             /Filter /DCTDecode \
             /Length {} >>\nstream\n",
            photo.width,
            photo.height,
            photo.jpeg.len()
        );
        data.extend_from_slice(&photo.jpeg);
        data.extend_from_slice(b"\nendstream");
        objects.push(PdfObject { data });
        obj_id
    }

    /// Encode text for a `Tj` operator: WinAnsi bytes with `\`, `(`, `)`
    /// escaped and non-ASCII bytes written as octal escapes. Characters
    /// outside WinAnsi degrade to `?`.
    fn encode_text(text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for ch in text.chars() {
            let b = Self::unicode_to_winansi(ch).unwrap_or(b'?');
            match b {
                b'\\' => out.push_str("\\\\"),
                b'(' => out.push_str("\\("),
                b')' => out.push_str("\\)"),
                0x20..=0x7E => out.push(b as char),
                _ => {
                    let _ = write!(out, "\\{:03o}", b);
                }
            }
        }
        out
    }

    /// Escape special characters in a PDF string literal.
    fn escape_pdf_string(s: &str) -> String {
        s.replace('\\', "\\\\")
            .replace('(', "\\(")
            .replace(')', "\\)")
    }

    /// Map a Unicode codepoint to a WinAnsiEncoding byte value.
    ///
    /// WinAnsiEncoding is based on Windows-1252. Most codepoints in
    /// 0x20..=0x7E and 0xA0..=0xFF map directly. The 0x80..=0x9F range
    /// contains special mappings for smart quotes, bullets, dashes, etc.
    fn unicode_to_winansi(ch: char) -> Option<u8> {
        let cp = ch as u32;
        if (0x20..=0x7E).contains(&cp) || (0xA0..=0xFF).contains(&cp) {
            return Some(cp as u8);
        }
        match cp {
            0x20AC => Some(0x80), // Euro sign
            0x201A => Some(0x82), // Single low-9 quotation mark
            0x0192 => Some(0x83), // Latin small letter f with hook
            0x201E => Some(0x84), // Double low-9 quotation mark
            0x2026 => Some(0x85), // Horizontal ellipsis
            0x2020 => Some(0x86), // Dagger
            0x2021 => Some(0x87), // Double dagger
            0x02C6 => Some(0x88), // Modifier letter circumflex accent
            0x2030 => Some(0x89), // Per mille sign
            0x0160 => Some(0x8A), // Latin capital letter S with caron
            0x2039 => Some(0x8B), // Single left-pointing angle quotation
            0x0152 => Some(0x8C), // Latin capital ligature OE
            0x017D => Some(0x8E), // Latin capital letter Z with caron
            0x2018 => Some(0x91), // Left single quotation mark
            0x2019 => Some(0x92), // Right single quotation mark
            0x201C => Some(0x93), // Left double quotation mark
            0x201D => Some(0x94), // Right double quotation mark
            0x2022 => Some(0x95), // Bullet
            0x2013 => Some(0x96), // En dash
            0x2014 => Some(0x97), // Em dash
            0x02DC => Some(0x98), // Small tilde
            0x2122 => Some(0x99), // Trade mark sign
            0x0161 => Some(0x9A), // Latin small letter s with caron
            0x203A => Some(0x9B), // Single right-pointing angle quotation
            0x0153 => Some(0x9C), // Latin small ligature oe
            0x017E => Some(0x9E), // Latin small letter z with caron
            0x0178 => Some(0x9F), // Latin capital letter Y with diaeresis
            _ => None,
        }
    }

    /// Serialize all objects into the final PDF byte stream.
    fn serialize(objects: &[PdfObject], info_obj_id: usize) -> Vec<u8> {
        let mut output: Vec<u8> = Vec::new();
        let mut offsets: Vec<usize> = vec![0; objects.len()];

        output.extend_from_slice(b"%PDF-1.7\n");
        output.extend_from_slice(b"%\xe2\xe3\xcf\xd3\n");

        for (i, obj) in objects.iter().enumerate().skip(1) {
            offsets[i] = output.len();
            let header = format!("{} 0 obj\n", i);
            output.extend_from_slice(header.as_bytes());
            output.extend_from_slice(&obj.data);
            output.extend_from_slice(b"\nendobj\n\n");
        }

        let xref_offset = output.len();
        let _ = write!(output, "xref\n0 {}\n", objects.len());
        let _ = write!(output, "0000000000 65535 f \n");
        for offset in offsets.iter().skip(1) {
            let _ = write!(output, "{:010} 00000 n \n", offset);
        }

        let _ = write!(
            output,
            "trailer\n<< /Size {} /Root 1 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len(),
            info_obj_id,
            xref_offset
        );

        output
    }
}
