//! Minimal PDF 1.4 writer for text-only documents
//!
//! Lines are laid out top to bottom on A4 pages with the built-in Helvetica
//! fonts, so no font embedding is needed. Text outside Latin-1 is replaced
//! with `?`.

/// One line of document content
#[derive(Debug, Clone, PartialEq)]
pub enum PdfLine {
    Title(String),
    Heading(String),
    Text(String),
    Blank,
}

impl PdfLine {
    fn advance(&self) -> f32 {
        match self {
            PdfLine::Title(_) => 28.0,
            PdfLine::Heading(_) => 22.0,
            PdfLine::Text(_) => 14.0,
            PdfLine::Blank => 8.0,
        }
    }
}

/// Page geometry, in points
#[derive(Debug, Clone)]
pub struct PdfWriter {
    pub page_width: f32,
    pub page_height: f32,
    pub margin: f32,
}

impl Default for PdfWriter {
    fn default() -> Self {
        // A4
        Self {
            page_width: 595.0,
            page_height: 842.0,
            margin: 50.0,
        }
    }
}

const FOOTER_SPACE: f32 = 24.0;

impl PdfWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize `lines` into a complete PDF file
    pub fn render(&self, lines: &[PdfLine]) -> Vec<u8> {
        let pages = self.paginate(lines);
        let page_count = pages.len();

        let mut out: Vec<u8> = Vec::new();
        let mut offsets: Vec<usize> = Vec::new();
        out.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");

        // 1 catalog, 2 page tree, 3-4 fonts, then a page + content pair per page
        let kids = (0..page_count)
            .map(|i| format!("{} 0 R", 5 + 2 * i))
            .collect::<Vec<_>>()
            .join(" ");
        push_object(&mut out, &mut offsets, b"<< /Type /Catalog /Pages 2 0 R >>");
        push_object(
            &mut out,
            &mut offsets,
            format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids, page_count).as_bytes(),
        );
        for font in ["Helvetica", "Helvetica-Bold"] {
            push_object(
                &mut out,
                &mut offsets,
                format!(
                    "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
                    font
                )
                .as_bytes(),
            );
        }

        for (i, page) in pages.iter().enumerate() {
            let page_obj = format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] \
                 /Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> /Contents {} 0 R >>",
                fmt_num(self.page_width),
                fmt_num(self.page_height),
                6 + 2 * i
            );
            push_object(&mut out, &mut offsets, page_obj.as_bytes());

            let content = self.page_content(page, i + 1, page_count);
            let mut stream = format!("<< /Length {} >>\nstream\n", content.len()).into_bytes();
            stream.extend_from_slice(&content);
            stream.extend_from_slice(b"\nendstream");
            push_object(&mut out, &mut offsets, &stream);
        }

        let xref_pos = out.len();
        out.extend_from_slice(format!("xref\n0 {}\n", offsets.len() + 1).as_bytes());
        out.extend_from_slice(b"0000000000 65535 f \n");
        for offset in &offsets {
            out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
        }
        out.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
                offsets.len() + 1,
                xref_pos
            )
            .as_bytes(),
        );
        out
    }

    /// Assign each line a baseline, breaking pages at the bottom margin
    fn paginate<'a>(&self, lines: &'a [PdfLine]) -> Vec<Vec<(&'a PdfLine, f32)>> {
        let top = self.page_height - self.margin;
        let bottom = self.margin + FOOTER_SPACE;

        let mut pages = vec![Vec::new()];
        let mut y = top;
        for line in lines {
            let next = y - line.advance();
            if next < bottom {
                pages.push(Vec::new());
                y = top;
                // blank lines at a page top carry nothing
                if *line == PdfLine::Blank {
                    continue;
                }
            }
            y -= line.advance();
            if let Some(page) = pages.last_mut() {
                page.push((line, y));
            }
        }
        pages
    }

    fn page_content(&self, page: &[(&PdfLine, f32)], number: usize, total: usize) -> Vec<u8> {
        let mut content = Vec::new();
        for (line, y) in page {
            let (font, size, text) = match line {
                PdfLine::Title(t) => ("F2", 18.0, t),
                PdfLine::Heading(t) => ("F2", 13.0, t),
                PdfLine::Text(t) => ("F1", 10.0, t),
                PdfLine::Blank => continue,
            };
            text_op(&mut content, font, size, self.margin, *y, text);
        }
        let footer = format!("Page {} / {}", number, total);
        text_op(
            &mut content,
            "F1",
            8.0,
            self.margin,
            self.margin,
            &footer,
        );
        content
    }
}

fn text_op(content: &mut Vec<u8>, font: &str, size: f32, x: f32, y: f32, text: &str) {
    content.extend_from_slice(
        format!(
            "BT /{} {} Tf {} {} Td (",
            font,
            fmt_num(size),
            fmt_num(x),
            fmt_num(y)
        )
        .as_bytes(),
    );
    content.extend_from_slice(&encode_text(text));
    content.extend_from_slice(b") Tj ET\n");
}

fn push_object(out: &mut Vec<u8>, offsets: &mut Vec<usize>, body: &[u8]) {
    offsets.push(out.len());
    out.extend_from_slice(format!("{} 0 obj\n", offsets.len()).as_bytes());
    out.extend_from_slice(body);
    out.extend_from_slice(b"\nendobj\n");
}

fn fmt_num(value: f32) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}

/// Escape a literal string body; Latin-1 passes through, the rest becomes `?`
pub fn encode_text(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' | '(' | ')' => {
                bytes.push(b'\\');
                bytes.push(ch as u8);
            }
            '\n' | '\r' | '\t' => bytes.push(b' '),
            c if (c as u32) < 0x20 => {}
            c if (c as u32) <= 0xFF => bytes.push(c as u32 as u8),
            _ => bytes.push(b'?'),
        }
    }
    bytes
}

/// Split `text` into lines of at most `width` characters on word boundaries
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        let current_len = current.chars().count();
        if current_len > 0 && current_len + 1 + word_len > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
