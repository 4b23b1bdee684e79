/// Debug rendering of a registry onto its screenshot.
///
/// Every element gets a rectangle and its registry index drawn above the top
/// left corner, so the picture lines up with the JSON output.
use image::{DynamicImage, RgbaImage};

use crate::perception::registry::ElementRegistry;
use crate::perception::types::{BBox, Element};

const TEXT_ONLY_COLOUR: [u8; 4] = [170, 170, 170, 220];

const PALETTE: [[u8; 4]; 8] = [
    [255, 68, 68, 220],   // red
    [68, 255, 68, 220],   // green
    [68, 68, 255, 220],   // blue
    [255, 170, 0, 220],   // orange
    [255, 68, 255, 220],  // magenta
    [0, 220, 255, 220],   // cyan
    [170, 170, 68, 220],  // olive
    [255, 200, 100, 220], // light orange
];

/// Stable colour per detection label; text-only elements are grey.
fn element_colour(el: &Element, text_label: &str) -> [u8; 4] {
    if el.label == text_label && el.confidence >= 1.0 {
        return TEXT_ONLY_COLOUR;
    }
    let hash = el
        .label
        .bytes()
        .fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));
    PALETTE[hash % PALETTE.len()]
}

/// Draw every element of `registry` onto a copy of `image`.
pub fn annotate(image: &DynamicImage, registry: &ElementRegistry, text_label: &str) -> RgbaImage {
    let mut canvas = image.to_rgba8();
    let thickness = if canvas.width() > 1600 { 3 } else { 2 };
    let scale: u32 = if canvas.width() > 1600 { 2 } else { 1 };

    for (idx, el) in registry.iter().enumerate() {
        let col = element_colour(el, text_label);
        draw_rect(&mut canvas, &el.bbox, col, thickness);
        let tag_h = (5 * scale + 4) as i32;
        draw_index(&mut canvas, el.bbox.x1, (el.bbox.y1 - tag_h).max(0), idx, col, scale);
    }
    canvas
}

fn draw_rect(canvas: &mut RgbaImage, b: &BBox, col: [u8; 4], thickness: i32) {
    for t in 0..thickness {
        for x in b.x1..=b.x2 {
            plot(canvas, x, b.y1 + t, col);
            plot(canvas, x, b.y2 - t, col);
        }
        for y in b.y1..=b.y2 {
            plot(canvas, b.x1 + t, y, col);
            plot(canvas, b.x2 - t, y, col);
        }
    }
}

/// `set_pixel` with clipping for signed coordinates.
fn plot(canvas: &mut RgbaImage, x: i32, y: i32, col: [u8; 4]) {
    if x >= 0 && y >= 0 && (x as u32) < canvas.width() && (y as u32) < canvas.height() {
        set_pixel(canvas, x as u32, y as u32, col);
    }
}

/// Darkened tag with the element index in a 5x5 digit font.
fn draw_index(canvas: &mut RgbaImage, x: i32, y: i32, idx: usize, col: [u8; 4], scale: u32) {
    let (w, h) = canvas.dimensions();
    let (x, y) = (x.max(0) as u32, y.max(0) as u32);
    let digits = idx.to_string();
    let step = 5 * scale + 1;
    let pad = 2 * scale;
    let tag_w = digits.len() as u32 * step + pad * 2;
    let tag_h = 5 * scale + pad * 2;

    for dy in 0..tag_h {
        for dx in 0..tag_w {
            let (px, py) = (x + dx, y + dy);
            if px < w && py < h {
                let p = canvas.get_pixel_mut(px, py);
                p[0] = (p[0] as f32 * 0.2) as u8;
                p[1] = (p[1] as f32 * 0.2) as u8;
                p[2] = (p[2] as f32 * 0.2) as u8;
                p[3] = 255;
            }
        }
    }

    for (i, c) in digits.bytes().enumerate() {
        let glyph = DIGITS[(c - b'0') as usize];
        let gx = x + pad + i as u32 * step;
        for (row, bits) in glyph.iter().enumerate() {
            for bit in 0..5u32 {
                if (bits >> (4 - bit)) & 1 == 0 {
                    continue;
                }
                for sy in 0..scale {
                    for sx in 0..scale {
                        let px = gx + bit * scale + sx;
                        let py = y + pad + row as u32 * scale + sy;
                        if px < w && py < h {
                            set_pixel(canvas, px, py, col);
                        }
                    }
                }
            }
        }
    }
}

fn set_pixel(canvas: &mut RgbaImage, x: u32, y: u32, col: [u8; 4]) {
    let p = canvas.get_pixel_mut(x, y);
    let a = col[3] as f32 / 255.0;
    for c in 0..3 {
        p[c] = (p[c] as f32 * (1.0 - a) + col[c] as f32 * a).round() as u8;
    }
    p[3] = 255;
}

const DIGITS: [[u8; 5]; 10] = [
    [0b01110, 0b10001, 0b10001, 0b10001, 0b01110],
    [0b00100, 0b01100, 0b00100, 0b00100, 0b01110],
    [0b01110, 0b10001, 0b00110, 0b01000, 0b11111],
    [0b11110, 0b00001, 0b00110, 0b00001, 0b11110],
    [0b00110, 0b01010, 0b10010, 0b11111, 0b00010],
    [0b11111, 0b10000, 0b11110, 0b00001, 0b11110],
    [0b01110, 0b10000, 0b11110, 0b10001, 0b01110],
    [0b11111, 0b00001, 0b00010, 0b00100, 0b00100],
    [0b01110, 0b10001, 0b01110, 0b10001, 0b01110],
    [0b01110, 0b10001, 0b01111, 0b00001, 0b01110],
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegistryConfig;
    use crate::testing::{detection, text_region};

    #[test]
    fn draws_boxes_without_touching_source() {
        let src = DynamicImage::new_rgb8(100, 100);
        let reg = ElementRegistry::build(
            vec![detection("button", [20, 30, 60, 70])],
            vec![text_region("far", [80, 80, 95, 95])],
            &RegistryConfig::default(),
        );
        let out = annotate(&src, &reg, "text");

        assert_eq!(out.dimensions(), (100, 100));
        assert_ne!(out.get_pixel(20, 50).0[..3], [0, 0, 0]);
        assert_eq!(out.get_pixel(40, 50).0[..3], [0, 0, 0]);
        assert_eq!(src.to_rgba8().get_pixel(20, 50).0[..3], [0, 0, 0]);
    }

    #[test]
    fn text_only_elements_are_grey() {
        let reg = ElementRegistry::build(
            vec![],
            vec![text_region("hi", [0, 0, 10, 10])],
            &RegistryConfig::default(),
        );
        assert_eq!(element_colour(&reg.elements()[0], "text"), TEXT_ONLY_COLOUR);
    }

    #[test]
    fn boxes_outside_image_are_clipped() {
        let src = DynamicImage::new_rgb8(10, 10);
        let reg = ElementRegistry::build(
            vec![detection("panel", [-5, -5, 50, 50])],
            vec![],
            &RegistryConfig::default(),
        );
        let out = annotate(&src, &reg, "text");
        assert_eq!(out.dimensions(), (10, 10));
    }
}
