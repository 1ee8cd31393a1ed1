//! Rebuilds the visual lines of a page from its content stream.

use anyhow::Result;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Encoding, Object, ObjectId};
use std::collections::BTreeMap;
use std::mem;

/// Baselines closer than this (in text space units) belong to the same line.
const LINE_TOLERANCE: f32 = 3.0;

/// `TJ` adjustments below this (thousandths of an em) read as a word gap.
const TJ_WORD_GAP: f32 = -200.0;

/// Plain text of a page, one visual line per `\n`, without a trailing newline.
pub(super) fn page_text(doc: &Document, page_id: ObjectId) -> Result<String> {
    let encodings = font_encodings(doc, page_id)?;
    let content = Content::decode(&doc.get_page_content(page_id)?)?;

    let mut layout = TextLayout::default();
    let mut encoding = None;
    for operation in &content.operations {
        match operation.operator.as_str() {
            "BT" => layout.begin_text(),
            "Tf" => {
                encoding = operation
                    .operands
                    .first()
                    .and_then(|font| font.as_name().ok())
                    .and_then(|font| encodings.get(font));
            }
            "TL" => layout.leading = number(operation, 0),
            "Td" => layout.move_by(number(operation, 1)),
            "TD" => {
                let ty = number(operation, 1);
                layout.leading = -ty;
                layout.move_by(ty);
            }
            "Tm" => layout.move_to(number(operation, 5)),
            "T*" => layout.next_line(),
            "Tj" => show_strings(&mut layout, encoding, &operation.operands),
            "'" | "\"" => {
                layout.next_line();
                if let Some(text) = operation.operands.last() {
                    show_strings(&mut layout, encoding, std::slice::from_ref(text));
                }
            }
            "TJ" => {
                if let Some(Ok(parts)) = operation.operands.first().map(Object::as_array) {
                    show_strings(&mut layout, encoding, parts);
                }
            }
            _ => {}
        }
    }
    Ok(layout.finish())
}

/// Decoders for every font the page can select, keyed by resource name.
/// Fonts whose encoding lopdf cannot describe fall back to [`lopdf::decode_text_string`].
fn font_encodings(doc: &Document, page_id: ObjectId) -> Result<BTreeMap<Vec<u8>, Encoding<'_>>> {
    let mut encodings = BTreeMap::new();
    for (name, font) in doc.get_page_fonts(page_id)? {
        match font.get_font_encoding(doc) {
            Ok(encoding) => {
                encodings.insert(name, encoding);
            }
            Err(e) => tracing::debug!(
                font = %String::from_utf8_lossy(&name),
                error = %e,
                "unknown font encoding"
            ),
        }
    }
    Ok(encodings)
}

fn number(operation: &Operation, position: usize) -> f32 {
    operation
        .operands
        .get(position)
        .and_then(|operand| operand.as_float().ok())
        .unwrap_or(0.0)
}

fn show_strings(layout: &mut TextLayout, encoding: Option<&Encoding<'_>>, operands: &[Object]) {
    for operand in operands {
        match operand {
            Object::String(bytes, _) => layout.show(&decode(encoding, bytes, operand)),
            Object::Integer(_) | Object::Real(_) => {
                if operand.as_float().is_ok_and(|gap| gap < TJ_WORD_GAP) {
                    layout.gap();
                }
            }
            _ => {}
        }
    }
}

fn decode(encoding: Option<&Encoding<'_>>, bytes: &[u8], operand: &Object) -> String {
    encoding
        .and_then(|encoding| Document::decode_text(encoding, bytes).ok())
        .or_else(|| lopdf::decode_text_string(operand).ok())
        .unwrap_or_else(|| String::from_utf8_lossy(bytes).into_owned())
}

/// Groups shown text into lines by the baseline it was drawn on.
#[derive(Debug, Default)]
struct TextLayout {
    lines: Vec<String>,
    line: String,
    /// Baseline of the current text position.
    y: f32,
    leading: f32,
    /// Baseline of the last text that was shown.
    shown_y: Option<f32>,
    line_break: bool,
    moved: bool,
}

impl TextLayout {
    fn begin_text(&mut self) {
        self.y = 0.0;
        self.moved = true;
    }

    fn move_to(&mut self, y: f32) {
        self.y = y;
        self.moved = true;
    }

    fn move_by(&mut self, ty: f32) {
        self.move_to(self.y + ty);
    }

    fn next_line(&mut self) {
        self.move_by(-self.leading);
        self.line_break = true;
    }

    fn show(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(shown_y) = self.shown_y {
            if self.line_break || (shown_y - self.y).abs() > LINE_TOLERANCE {
                self.break_line();
            } else if self.moved && !text.starts_with(' ') {
                self.gap();
            }
        }
        self.line.push_str(text);
        self.shown_y = Some(self.y);
        self.line_break = false;
        self.moved = false;
    }

    fn gap(&mut self) {
        if !self.line.is_empty() && !self.line.ends_with(' ') {
            self.line.push(' ');
        }
    }

    fn break_line(&mut self) {
        let line = mem::take(&mut self.line);
        self.lines.push(line.trim_end().to_string());
    }

    fn finish(mut self) -> String {
        if self.shown_y.is_some() {
            self.break_line();
        }
        self.lines.join("\n")
    }
}
