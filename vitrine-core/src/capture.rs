//! Capture service: rasterizes the mounted scene (or a sub-element of it)
//! into a PNG, returned as a `data:image/png;base64,...` payload.
//!
//! Layout is a simple vertical block flow, enough to make the default
//! element set (stack, text, button, input) read correctly in a capture.
//! Text is drawn with an embedded 5×7 pixel font at 2× scale; fills and
//! borders are solid. Capture is read-only: the scene is never mutated,
//! and the target is resolved at request time.

use crate::error::CaptureError;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;
use vitrine_scene::{find, parse_hex_color, Child, Color, Node, Selector, Theme};

const GLYPH_W: u32 = 5;
const GLYPH_H: u32 = 7;
const SCALE: u32 = 2;
const CHAR_ADVANCE: u32 = (GLYPH_W + 1) * SCALE;
const LINE_HEIGHT: u32 = (GLYPH_H + 2) * SCALE;

const ROOT_PADDING: u32 = 16;
const STACK_GAP: u32 = 8;
const STACK_PADDING: u32 = 12;
const BUTTON_PAD_X: u32 = 16;
const BUTTON_PAD_Y: u32 = 8;
const INPUT_PAD_X: u32 = 10;
const INPUT_PAD_Y: u32 = 8;
const INPUT_MIN_W: u32 = 160;

/// Resolve the capture target within a mounted scene. A selector that
/// matches nothing is an error, never a whole-root fallback.
pub fn resolve_target<'a>(
    root: &'a Node,
    selector: Option<&str>,
) -> Result<&'a Node, CaptureError> {
    match selector {
        None => Ok(root),
        Some(raw) => {
            let selector = Selector::parse(raw)?;
            find(root, &selector).ok_or_else(|| CaptureError::TargetNotFound {
                selector: raw.to_string(),
            })
        }
    }
}

/// Rasterize the target and return it as a data URL.
pub fn capture_data_url(target: &Node) -> Result<String, CaptureError> {
    let png = capture_png(target)?;
    Ok(format!("data:image/png;base64,{}", BASE64.encode(png)))
}

/// Rasterize the target and return the PNG bytes.
pub fn capture_png(target: &Node) -> Result<Vec<u8>, CaptureError> {
    let image = rasterize(target);
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(image)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| CaptureError::Encode(e.to_string()))?;
    Ok(bytes)
}

fn rasterize(root: &Node) -> RgbaImage {
    let theme = Theme::default();
    let (w, h) = measure_node(root);
    let width = (w + ROOT_PADDING * 2).max(1);
    let height = (h + ROOT_PADDING * 2).max(1);
    let mut canvas = RgbaImage::from_pixel(width, height, Rgba(theme.background.0));
    paint_node(&mut canvas, root, ROOT_PADDING, ROOT_PADDING, &theme);
    canvas
}

// --- Measure ----------------------------------------------------------------

fn text_width(text: &str) -> u32 {
    text.chars().count() as u32 * CHAR_ADVANCE
}

fn measure_node(node: &Node) -> (u32, u32) {
    match node.tag.as_str() {
        "text" => (text_width(&node.text_content()), LINE_HEIGHT),
        "button" => {
            let label = button_label(node);
            (
                text_width(&label) + BUTTON_PAD_X * 2,
                LINE_HEIGHT + BUTTON_PAD_Y * 2,
            )
        }
        "input" => {
            let shown = input_text(node);
            let w = (text_width(&shown) + INPUT_PAD_X * 2).max(INPUT_MIN_W);
            (w, LINE_HEIGHT + INPUT_PAD_Y * 2)
        }
        // stack, and any container-like element from a custom registry
        _ => {
            let gap = node.prop_number("gap").map_or(STACK_GAP, |g| g.max(0.0) as u32);
            let padding = node
                .prop_number("padding")
                .map_or(STACK_PADDING, |p| p.max(0.0) as u32);
            let mut width: u32 = 0;
            let mut height: u32 = 0;
            let mut first = true;
            for child in &node.children {
                let (cw, ch) = measure_child(child);
                if !first {
                    height += gap;
                }
                first = false;
                width = width.max(cw);
                height += ch;
            }
            (width + padding * 2, height + padding * 2)
        }
    }
}

fn measure_child(child: &Child) -> (u32, u32) {
    match child {
        Child::Element(node) => measure_node(node),
        Child::Text(text) => (text_width(text), LINE_HEIGHT),
    }
}

fn button_label(node: &Node) -> String {
    node.prop_str("label")
        .map(|s| s.to_string())
        .unwrap_or_else(|| node.text_content())
}

fn input_text(node: &Node) -> String {
    node.prop_str("value")
        .or_else(|| node.prop_str("placeholder"))
        .unwrap_or_default()
        .to_string()
}

// --- Paint ------------------------------------------------------------------

fn prop_color(node: &Node, name: &str, fallback: Color) -> Color {
    node.prop_str(name)
        .and_then(|s| parse_hex_color(s).ok())
        .unwrap_or(fallback)
}

fn paint_node(canvas: &mut RgbaImage, node: &Node, x: u32, y: u32, theme: &Theme) {
    let (w, h) = measure_node(node);
    match node.tag.as_str() {
        "text" => {
            let color = prop_color(node, "color", theme.text);
            draw_text(canvas, x, y + SCALE, &node.text_content(), color);
        }
        "button" => {
            let background = prop_color(node, "background", theme.surface);
            fill_rect(canvas, x, y, w, h, background);
            stroke_rect(canvas, x, y, w, h, theme.border);
            let disabled = node.prop_bool("disabled").unwrap_or(false);
            let fallback = if disabled { theme.muted } else { theme.text };
            let color = prop_color(node, "color", fallback);
            draw_text(
                canvas,
                x + BUTTON_PAD_X,
                y + BUTTON_PAD_Y + SCALE,
                &button_label(node),
                color,
            );
        }
        "input" => {
            let background = prop_color(node, "background", theme.background);
            fill_rect(canvas, x, y, w, h, background);
            stroke_rect(canvas, x, y, w, h, theme.border);
            let placeholder_only = node.prop_str("value").is_none();
            let fallback = if placeholder_only { theme.muted } else { theme.text };
            let color = prop_color(node, "color", fallback);
            draw_text(
                canvas,
                x + INPUT_PAD_X,
                y + INPUT_PAD_Y + SCALE,
                &input_text(node),
                color,
            );
        }
        _ => {
            if let Some(value) = node.prop_str("background") {
                if let Ok(color) = parse_hex_color(value) {
                    fill_rect(canvas, x, y, w, h, color);
                }
            }
            let gap = node.prop_number("gap").map_or(STACK_GAP, |g| g.max(0.0) as u32);
            let padding = node
                .prop_number("padding")
                .map_or(STACK_PADDING, |p| p.max(0.0) as u32);
            let mut cy = y + padding;
            for child in &node.children {
                match child {
                    Child::Element(child_node) => {
                        paint_node(canvas, child_node, x + padding, cy, theme);
                        cy += measure_node(child_node).1 + gap;
                    }
                    Child::Text(text) => {
                        let color = prop_color(node, "color", theme.text);
                        draw_text(canvas, x + padding, cy + SCALE, text, color);
                        cy += LINE_HEIGHT + gap;
                    }
                }
            }
        }
    }
}

// --- Drawing primitives -----------------------------------------------------

fn fill_rect(canvas: &mut RgbaImage, x: u32, y: u32, w: u32, h: u32, color: Color) {
    for py in y..(y + h).min(canvas.height()) {
        for px in x..(x + w).min(canvas.width()) {
            canvas.put_pixel(px, py, Rgba(color.0));
        }
    }
}

fn stroke_rect(canvas: &mut RgbaImage, x: u32, y: u32, w: u32, h: u32, color: Color) {
    if w == 0 || h == 0 {
        return;
    }
    fill_rect(canvas, x, y, w, 1, color);
    fill_rect(canvas, x, y + h - 1, w, 1, color);
    fill_rect(canvas, x, y, 1, h, color);
    fill_rect(canvas, x + w - 1, y, 1, h, color);
}

fn draw_text(canvas: &mut RgbaImage, x: u32, y: u32, text: &str, color: Color) {
    let mut cx = x;
    for c in text.chars() {
        draw_glyph(canvas, cx, y, c, color);
        cx += CHAR_ADVANCE;
    }
}

fn draw_glyph(canvas: &mut RgbaImage, x: u32, y: u32, c: char, color: Color) {
    let columns = glyph(c);
    for (col, bits) in columns.iter().enumerate() {
        for row in 0..GLYPH_H {
            if bits & (1 << row) != 0 {
                fill_rect(
                    canvas,
                    x + col as u32 * SCALE,
                    y + row * SCALE,
                    SCALE,
                    SCALE,
                    color,
                );
            }
        }
    }
}

/// 5×7 bitmap font, one byte per column, bit 0 = top row. Printable ASCII;
/// anything else draws as a hollow box.
fn glyph(c: char) -> [u8; 5] {
    let index = (c as usize).wrapping_sub(0x20);
    if index < FONT_5X7.len() {
        FONT_5X7[index]
    } else {
        [0x7F, 0x41, 0x41, 0x41, 0x7F]
    }
}

#[rustfmt::skip]
const FONT_5X7: [[u8; 5]; 95] = [
    [0x00, 0x00, 0x00, 0x00, 0x00], // space
    [0x00, 0x00, 0x5F, 0x00, 0x00], // !
    [0x00, 0x07, 0x00, 0x07, 0x00], // "
    [0x14, 0x7F, 0x14, 0x7F, 0x14], // #
    [0x24, 0x2A, 0x7F, 0x2A, 0x12], // $
    [0x23, 0x13, 0x08, 0x64, 0x62], // %
    [0x36, 0x49, 0x55, 0x22, 0x50], // &
    [0x00, 0x05, 0x03, 0x00, 0x00], // '
    [0x00, 0x1C, 0x22, 0x41, 0x00], // (
    [0x00, 0x41, 0x22, 0x1C, 0x00], // )
    [0x08, 0x2A, 0x1C, 0x2A, 0x08], // *
    [0x08, 0x08, 0x3E, 0x08, 0x08], // +
    [0x00, 0x50, 0x30, 0x00, 0x00], // ,
    [0x08, 0x08, 0x08, 0x08, 0x08], // -
    [0x00, 0x60, 0x60, 0x00, 0x00], // .
    [0x20, 0x10, 0x08, 0x04, 0x02], // /
    [0x3E, 0x51, 0x49, 0x45, 0x3E], // 0
    [0x00, 0x42, 0x7F, 0x40, 0x00], // 1
    [0x42, 0x61, 0x51, 0x49, 0x46], // 2
    [0x21, 0x41, 0x45, 0x4B, 0x31], // 3
    [0x18, 0x14, 0x12, 0x7F, 0x10], // 4
    [0x27, 0x45, 0x45, 0x45, 0x39], // 5
    [0x3C, 0x4A, 0x49, 0x49, 0x30], // 6
    [0x01, 0x71, 0x09, 0x05, 0x03], // 7
    [0x36, 0x49, 0x49, 0x49, 0x36], // 8
    [0x06, 0x49, 0x49, 0x29, 0x1E], // 9
    [0x00, 0x36, 0x36, 0x00, 0x00], // :
    [0x00, 0x56, 0x36, 0x00, 0x00], // ;
    [0x08, 0x14, 0x22, 0x41, 0x00], // <
    [0x14, 0x14, 0x14, 0x14, 0x14], // =
    [0x00, 0x41, 0x22, 0x14, 0x08], // >
    [0x02, 0x01, 0x51, 0x09, 0x06], // ?
    [0x32, 0x49, 0x79, 0x41, 0x3E], // @
    [0x7E, 0x11, 0x11, 0x11, 0x7E], // A
    [0x7F, 0x49, 0x49, 0x49, 0x36], // B
    [0x3E, 0x41, 0x41, 0x41, 0x22], // C
    [0x7F, 0x41, 0x41, 0x22, 0x1C], // D
    [0x7F, 0x49, 0x49, 0x49, 0x41], // E
    [0x7F, 0x09, 0x09, 0x09, 0x01], // F
    [0x3E, 0x41, 0x49, 0x49, 0x7A], // G
    [0x7F, 0x08, 0x08, 0x08, 0x7F], // H
    [0x00, 0x41, 0x7F, 0x41, 0x00], // I
    [0x20, 0x40, 0x41, 0x3F, 0x01], // J
    [0x7F, 0x08, 0x14, 0x22, 0x41], // K
    [0x7F, 0x40, 0x40, 0x40, 0x40], // L
    [0x7F, 0x02, 0x0C, 0x02, 0x7F], // M
    [0x7F, 0x04, 0x08, 0x10, 0x7F], // N
    [0x3E, 0x41, 0x41, 0x41, 0x3E], // O
    [0x7F, 0x09, 0x09, 0x09, 0x06], // P
    [0x3E, 0x41, 0x51, 0x21, 0x5E], // Q
    [0x7F, 0x09, 0x19, 0x29, 0x46], // R
    [0x46, 0x49, 0x49, 0x49, 0x31], // S
    [0x01, 0x01, 0x7F, 0x01, 0x01], // T
    [0x3F, 0x40, 0x40, 0x40, 0x3F], // U
    [0x1F, 0x20, 0x40, 0x20, 0x1F], // V
    [0x3F, 0x40, 0x38, 0x40, 0x3F], // W
    [0x63, 0x14, 0x08, 0x14, 0x63], // X
    [0x07, 0x08, 0x70, 0x08, 0x07], // Y
    [0x61, 0x51, 0x49, 0x45, 0x43], // Z
    [0x00, 0x7F, 0x41, 0x41, 0x00], // [
    [0x02, 0x04, 0x08, 0x10, 0x20], // backslash
    [0x00, 0x41, 0x41, 0x7F, 0x00], // ]
    [0x04, 0x02, 0x01, 0x02, 0x04], // ^
    [0x40, 0x40, 0x40, 0x40, 0x40], // _
    [0x00, 0x01, 0x02, 0x04, 0x00], // `
    [0x20, 0x54, 0x54, 0x54, 0x78], // a
    [0x7F, 0x48, 0x44, 0x44, 0x38], // b
    [0x38, 0x44, 0x44, 0x44, 0x20], // c
    [0x38, 0x44, 0x44, 0x48, 0x7F], // d
    [0x38, 0x54, 0x54, 0x54, 0x18], // e
    [0x08, 0x7E, 0x09, 0x01, 0x02], // f
    [0x0C, 0x52, 0x52, 0x52, 0x3E], // g
    [0x7F, 0x08, 0x04, 0x04, 0x78], // h
    [0x00, 0x44, 0x7D, 0x40, 0x00], // i
    [0x20, 0x40, 0x44, 0x3D, 0x00], // j
    [0x7F, 0x10, 0x28, 0x44, 0x00], // k
    [0x00, 0x41, 0x7F, 0x40, 0x00], // l
    [0x7C, 0x04, 0x18, 0x04, 0x78], // m
    [0x7C, 0x08, 0x04, 0x04, 0x78], // n
    [0x38, 0x44, 0x44, 0x44, 0x38], // o
    [0x7C, 0x14, 0x14, 0x14, 0x08], // p
    [0x08, 0x14, 0x14, 0x18, 0x7C], // q
    [0x7C, 0x08, 0x04, 0x04, 0x08], // r
    [0x48, 0x54, 0x54, 0x54, 0x20], // s
    [0x04, 0x3F, 0x44, 0x40, 0x20], // t
    [0x3C, 0x40, 0x40, 0x20, 0x7C], // u
    [0x1C, 0x20, 0x40, 0x20, 0x1C], // v
    [0x3C, 0x40, 0x30, 0x40, 0x3C], // w
    [0x44, 0x28, 0x10, 0x28, 0x44], // x
    [0x0C, 0x50, 0x50, 0x50, 0x3C], // y
    [0x44, 0x64, 0x54, 0x4C, 0x44], // z
    [0x00, 0x08, 0x36, 0x41, 0x00], // {
    [0x00, 0x00, 0x7F, 0x00, 0x00], // |
    [0x00, 0x41, 0x36, 0x08, 0x00], // }
    [0x08, 0x04, 0x08, 0x10, 0x08], // ~
];

#[cfg(test)]
mod tests {
    use super::*;
    use vitrine_scene::PropValue;

    #[test]
    fn capture_produces_a_nonempty_png_data_url() {
        let root = Node::new("stack").with_child(Node::new("button").with_text("Hi"));
        let url = capture_data_url(&root).unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
        assert!(url.len() > "data:image/png;base64,".len());
    }

    #[test]
    fn png_bytes_carry_the_signature() {
        let root = Node::new("text").with_text("hello");
        let png = capture_png(&root).unwrap();
        assert_eq!(&png[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    }

    #[test]
    fn selector_misses_are_errors_not_fallbacks() {
        let root = Node::new("stack").with_child(Node::new("button").with_text("Hi"));
        let err = resolve_target(&root, Some("#missing")).unwrap_err();
        assert!(matches!(err, CaptureError::TargetNotFound { .. }));
    }

    #[test]
    fn selector_resolves_a_sub_element() {
        let root = Node::new("stack").with_child(
            Node::new("button")
                .with_prop("id", PropValue::Text("go".into()))
                .with_text("Go"),
        );
        let target = resolve_target(&root, Some("#go")).unwrap();
        assert_eq!(target.tag, "button");
        // Capturing the sub-element alone also works.
        assert!(capture_data_url(target).is_ok());
    }

    #[test]
    fn wider_labels_produce_wider_captures() {
        let narrow = rasterize(&Node::new("button").with_text("Hi"));
        let wide = rasterize(&Node::new("button").with_text("A much longer label"));
        assert!(wide.width() > narrow.width());
        assert_eq!(wide.height(), narrow.height());
    }
}
