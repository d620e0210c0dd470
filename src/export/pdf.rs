//! Minimal multi-page table writer on top of pdf-writer

use pdf_writer::{Content, Name, Pdf, Rect, Ref, Str};

/// Gold accent used for the title and the table header
const GOLD: (f32, f32, f32) = (0.83, 0.69, 0.22);

/// One table line: regular cells or a full-width section band
#[derive(Debug, Clone, PartialEq)]
pub enum TableRow {
    Cells(Vec<String>),
    /// Session title band
    Section(String),
    /// Italic-looking grey note under a session
    Note(String),
    Spacer,
}

pub struct ReportPdf {
    pdf: Pdf,
    catalog_id: Ref,
    pages_id: Ref,
    font_id: Ref,
    page_refs: Vec<Ref>,
    next_id: i32,

    page_w: f32,
    page_h: f32,
    margin: f32,
    row_h: f32,
    font_size: f32,
}

impl Default for ReportPdf {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportPdf {
    pub fn new() -> Self {
        let mut pdf = Pdf::new();
        let catalog_id = Ref::new(1);
        let pages_id = Ref::new(2);
        let font_id = Ref::new(3);
        pdf.type1_font(font_id).base_font(Name(b"Helvetica"));

        Self {
            pdf,
            catalog_id,
            pages_id,
            font_id,
            page_refs: Vec::new(),
            next_id: 4,
            page_w: 595.0,
            page_h: 842.0,
            margin: 40.0,
            row_h: 16.0,
            font_size: 8.0,
        }
    }

    fn fresh_ref(&mut self) -> Ref {
        let id = Ref::new(self.next_id);
        self.next_id += 1;
        id
    }

    /// Allocate a page and return the id its content stream must be written to
    fn add_page(&mut self) -> Ref {
        let page_id = self.fresh_ref();
        let content_id = self.fresh_ref();
        self.page_refs.push(page_id);

        let mut page = self.pdf.page(page_id);
        page.parent(self.pages_id)
            .media_box(Rect::new(0.0, 0.0, self.page_w, self.page_h))
            .contents(content_id);
        page.resources().fonts().pair(Name(b"F1"), self.font_id);
        content_id
    }

    fn text(content: &mut Content, x: f32, y: f32, size: f32, text: &str) {
        content.begin_text();
        content.set_font(Name(b"F1"), size);
        content.set_text_matrix([1.0, 0.0, 0.0, 1.0, x, y]);
        content.show(Str(text.as_bytes()));
        content.end_text();
    }

    fn band(content: &mut Content, x: f32, y: f32, w: f32, h: f32, rgb: (f32, f32, f32)) {
        content.save_state();
        content.set_fill_rgb(rgb.0, rgb.1, rgb.2);
        content.rect(x, y, w, h);
        content.fill_nonzero();
        content.restore_state();
    }

    fn cells(&self, content: &mut Content, y: f32, widths: &[f32], row: &[String]) {
        let mut x = self.margin;
        for (text, w) in row.iter().zip(widths) {
            Self::text(content, x + 3.0, y + 5.0, self.font_size, text);
            content.save_state();
            content.set_stroke_rgb(0.65, 0.65, 0.65);
            content.rect(x, y, *w, self.row_h);
            content.stroke();
            content.restore_state();
            x += w;
        }
    }

    /// Column widths from the longest cell, scaled down to fit the page
    fn column_widths(&self, headers: &[&str], rows: &[TableRow]) -> Vec<f32> {
        let char_w = self.font_size * 0.55;
        let mut widths: Vec<f32> = headers.iter().map(|h| h.len() as f32 * char_w + 8.0).collect();
        for row in rows {
            if let TableRow::Cells(cells) = row {
                for (w, cell) in widths.iter_mut().zip(cells) {
                    *w = w.max(cell.len() as f32 * char_w + 8.0);
                }
            }
        }

        let total: f32 = widths.iter().sum();
        let max = self.page_w - 2.0 * self.margin;
        if total > max {
            let scale = max / total;
            widths.iter_mut().for_each(|w| *w *= scale);
        }
        widths
    }

    /// Write the document header lines followed by a paginated table
    pub fn write_report(&mut self, title: &str, subtitle: &[String], headers: &[&str], rows: &[TableRow]) {
        let widths = self.column_widths(headers, rows);
        let table_w: f32 = widths.iter().sum();
        let header_row: Vec<String> = headers.iter().map(|h| h.to_string()).collect();

        let mut remaining = rows;
        let mut page_no = 1;

        loop {
            let content_id = self.add_page();
            let mut content = Content::new();
            let mut y = self.page_h - self.margin;

            if page_no == 1 {
                content.save_state();
                content.set_fill_rgb(GOLD.0, GOLD.1, GOLD.2);
                Self::text(&mut content, self.margin, y - 12.0, 18.0, title);
                content.restore_state();
                y -= 30.0;
                for line in subtitle {
                    Self::text(&mut content, self.margin, y, 9.0, line);
                    y -= 12.0;
                }
                y -= 8.0;
            }

            y -= self.row_h;
            Self::band(&mut content, self.margin, y, table_w, self.row_h, GOLD);
            self.cells(&mut content, y, &widths, &header_row);

            let mut consumed = 0;
            for row in remaining {
                if y - self.row_h < self.margin {
                    break;
                }
                y -= self.row_h;
                match row {
                    TableRow::Cells(cells) => self.cells(&mut content, y, &widths, cells),
                    TableRow::Section(label) => {
                        Self::band(&mut content, self.margin, y, table_w, self.row_h, (0.12, 0.12, 0.12));
                        content.save_state();
                        content.set_fill_rgb(GOLD.0, GOLD.1, GOLD.2);
                        Self::text(&mut content, self.margin + 3.0, y + 5.0, self.font_size, label);
                        content.restore_state();
                    }
                    TableRow::Note(text) => {
                        content.save_state();
                        content.set_fill_rgb(0.59, 0.59, 0.59);
                        Self::text(&mut content, self.margin + 3.0, y + 5.0, self.font_size, text);
                        content.restore_state();
                    }
                    TableRow::Spacer => {}
                }
                consumed += 1;
            }

            Self::text(
                &mut content,
                self.page_w - self.margin - 40.0,
                self.margin / 2.0,
                self.font_size,
                &format!("Str. {page_no}"),
            );
            self.pdf.stream(content_id, &content.finish());

            remaining = &remaining[consumed..];
            if remaining.is_empty() {
                break;
            }
            page_no += 1;
        }
    }

    /// Page width and height in points (A4 portrait)
    pub fn page_size(&self) -> (f32, f32) {
        (self.page_w, self.page_h)
    }

    pub fn page_count(&self) -> usize {
        self.page_refs.len()
    }

    /// Finish the document into bytes
    pub fn finish(mut self) -> Vec<u8> {
        self.pdf.catalog(self.catalog_id).pages(self.pages_id);
        let count = self.page_refs.len() as i32;
        self.pdf.pages(self.pages_id).count(count).kids(self.page_refs.iter().copied());
        self.pdf.finish()
    }
}
