// SPDX-License-Identifier: GPL-3.0-only

//! Deterministic test image for the simulator backend
//!
//! Everything except the timestamp stamp is a pure function of the constants
//! below, so two images differ only inside [`TIMESTAMP_REGION`].

use crate::constants::simulator::{BORDER_WIDTH, HEADING, IMAGE_HEIGHT, IMAGE_WIDTH};
use image::{Rgba, RgbaImage};

const GRADIENT_START: [u8; 3] = [52, 152, 219];
const GRADIENT_END: [u8; 3] = [44, 62, 80];

/// Bounding boxes `(x, y, diameter)` of the decorative circles
const CIRCLES: [(u32, u32, u32); 3] = [(100, 100, 150), (550, 350, 200), (200, 400, 100)];
const CIRCLE_FILL: Rgba<u8> = Rgba([255, 255, 255, 50]);
const CIRCLE_OUTLINE: Rgba<u8> = Rgba([255, 255, 255, 100]);
const CIRCLE_OUTLINE_WIDTH: f32 = 2.0;

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

const HEADING_SCALE: u32 = 6;
const STAMP_SCALE: u32 = 2;
const STAMP_LEFT: u32 = 20;
const STAMP_BASELINE: u32 = IMAGE_HEIGHT - 20;

/// Area `(x, y, width, height)` the timestamp may draw into
pub const TIMESTAMP_REGION: (u32, u32, u32, u32) = (
    STAMP_LEFT,
    STAMP_BASELINE - GLYPH_HEIGHT * STAMP_SCALE,
    IMAGE_WIDTH / 2,
    GLYPH_HEIGHT * STAMP_SCALE,
);

const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;
const GLYPH_SPACING: u32 = 1;
const LINE_SPACING: u32 = 2;

/// Render the simulator's test photo with `stamp` in the bottom-left corner
pub fn render(stamp: &str) -> RgbaImage {
    let mut img = RgbaImage::new(IMAGE_WIDTH, IMAGE_HEIGHT);

    fill_gradient(&mut img);
    for (x, y, diameter) in CIRCLES {
        draw_circle(&mut img, x, y, diameter);
    }
    draw_centered_text(&mut img, HEADING, HEADING_SCALE);
    draw_text(
        &mut img,
        stamp,
        STAMP_LEFT,
        TIMESTAMP_REGION.1,
        STAMP_SCALE,
        TIMESTAMP_REGION.0 + TIMESTAMP_REGION.2,
    );
    draw_border(&mut img);

    img
}

/// Diagonal linear gradient from the top-left to the bottom-right corner
fn fill_gradient(img: &mut RgbaImage) {
    let (w, h) = (IMAGE_WIDTH as f32, IMAGE_HEIGHT as f32);
    let norm = w * w + h * h;

    for (x, y, pixel) in img.enumerate_pixels_mut() {
        // Projection of the pixel onto the gradient axis
        let t = ((x as f32 * w + y as f32 * h) / norm).clamp(0.0, 1.0);
        let channel = |i: usize| {
            let a = GRADIENT_START[i] as f32;
            let b = GRADIENT_END[i] as f32;
            (a + (b - a) * t).round() as u8
        };
        *pixel = Rgba([channel(0), channel(1), channel(2), 255]);
    }
}

fn draw_circle(img: &mut RgbaImage, left: u32, top: u32, diameter: u32) {
    let radius = diameter as f32 / 2.0;
    let cx = left as f32 + radius;
    let cy = top as f32 + radius;
    let x_end = (left + diameter + 2).min(img.width());
    let y_end = (top + diameter + 2).min(img.height());

    for y in top.saturating_sub(2)..y_end {
        for x in left.saturating_sub(2)..x_end {
            let dx = x as f32 + 0.5 - cx;
            let dy = y as f32 + 0.5 - cy;
            let dist = (dx * dx + dy * dy).sqrt();

            if (dist - radius).abs() <= CIRCLE_OUTLINE_WIDTH / 2.0 {
                blend(img, x, y, CIRCLE_OUTLINE);
            } else if dist < radius {
                blend(img, x, y, CIRCLE_FILL);
            }
        }
    }
}

/// Source-over blend onto an opaque destination
fn blend(img: &mut RgbaImage, x: u32, y: u32, src: Rgba<u8>) {
    let dst = img.get_pixel_mut(x, y);
    let alpha = src[3] as u32;
    for i in 0..3 {
        dst[i] = ((src[i] as u32 * alpha + dst[i] as u32 * (255 - alpha)) / 255) as u8;
    }
    dst[3] = 255;
}

fn draw_border(img: &mut RgbaImage) {
    let (w, h) = img.dimensions();
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        if x < BORDER_WIDTH || y < BORDER_WIDTH || x >= w - BORDER_WIDTH || y >= h - BORDER_WIDTH
        {
            *pixel = WHITE;
        }
    }
}

fn text_width(line: &str, scale: u32) -> u32 {
    let chars = line.chars().count() as u32;
    if chars == 0 {
        return 0;
    }
    (chars * (GLYPH_WIDTH + GLYPH_SPACING) - GLYPH_SPACING) * scale
}

fn draw_centered_text(img: &mut RgbaImage, text: &str, scale: u32) {
    let lines: Vec<&str> = text.split('\n').collect();
    let line_height = (GLYPH_HEIGHT + LINE_SPACING) * scale;
    let block_height = line_height * lines.len() as u32 - LINE_SPACING * scale;
    let mut y = img.height().saturating_sub(block_height) / 2;

    for line in lines {
        let x = img.width().saturating_sub(text_width(line, scale)) / 2;
        draw_text(img, line, x, y, scale, img.width());
        y += line_height;
    }
}

/// Draw one line of text with its top-left corner at `(x, y)`, clipped at `x_limit`
fn draw_text(img: &mut RgbaImage, text: &str, x: u32, y: u32, scale: u32, x_limit: u32) {
    let mut pen_x = x;
    for ch in text.chars() {
        if let Some(rows) = glyph(ch) {
            for (row, bits) in rows.iter().enumerate() {
                for col in 0..GLYPH_WIDTH {
                    if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                        continue;
                    }
                    let px = pen_x + col * scale;
                    let py = y + row as u32 * scale;
                    fill_block(img, px, py, scale, x_limit);
                }
            }
        }
        pen_x += (GLYPH_WIDTH + GLYPH_SPACING) * scale;
    }
}

fn fill_block(img: &mut RgbaImage, x: u32, y: u32, size: u32, x_limit: u32) {
    let x_end = (x + size).min(x_limit).min(img.width());
    let y_end = (y + size).min(img.height());
    for py in y..y_end {
        for px in x..x_end {
            img.put_pixel(px, py, WHITE);
        }
    }
}

/// 5×7 bitmap glyphs; lowercase letters render as uppercase
fn glyph(ch: char) -> Option<[u8; 7]> {
    let rows = match ch.to_ascii_uppercase() {
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'B' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10001, 0b10001, 0b11110],
        'C' => [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
        'D' => [0b11110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11110],
        'E' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111],
        'F' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000],
        'G' => [0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01111],
        'H' => [0b10001, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'I' => [0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        'J' => [0b00111, 0b00010, 0b00010, 0b00010, 0b00010, 0b10010, 0b01100],
        'K' => [0b10001, 0b10010, 0b10100, 0b11000, 0b10100, 0b10010, 0b10001],
        'L' => [0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111],
        'M' => [0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001],
        'N' => [0b10001, 0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001],
        'O' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'P' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000],
        'Q' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10101, 0b10010, 0b01101],
        'R' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001],
        'S' => [0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110],
        'T' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100],
        'U' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'V' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01010, 0b00100],
        'W' => [0b10001, 0b10001, 0b10001, 0b10101, 0b10101, 0b10101, 0b01010],
        'X' => [0b10001, 0b10001, 0b01010, 0b00100, 0b01010, 0b10001, 0b10001],
        'Y' => [0b10001, 0b10001, 0b01010, 0b00100, 0b00100, 0b00100, 0b00100],
        'Z' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b11111],
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
        '3' => [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        ':' => [0b00000, 0b01100, 0b01100, 0b00000, 0b01100, 0b01100, 0b00000],
        '-' => [0b00000, 0b00000, 0b00000, 0b11111, 0b00000, 0b00000, 0b00000],
        '.' => [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b01100, 0b01100],
        '!' => [0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00000, 0b00100],
        // Camera pictogram
        '📷' | '📸' => [0b01100, 0b11111, 0b10001, 0b10101, 0b10001, 0b11111, 0b00000],
        _ => return None,
    };
    Some(rows)
}
