use crate::detection::PixelBox;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

pub const OUTLINE_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const LABEL_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
pub const LABEL_BACKGROUND: Rgb<u8> = Rgb([0, 0, 0]);

const OUTLINE_THICKNESS: u32 = 2;
/// Distance of the label baseline from the box's left and bottom edges.
const LABEL_MARGIN: i32 = 6;
const LABEL_PADDING: i32 = 2;

const GLYPH_WIDTH: i32 = 3;
const GLYPH_HEIGHT: i32 = 5;
const GLYPH_SCALE: i32 = 2;
const GLYPH_SPACING: i32 = 2;

/// 3x5 bitmaps for the digits, one row per entry, most significant bit left.
const DIGITS: [[u8; 5]; 10] = [
    [0b111, 0b101, 0b101, 0b101, 0b111],
    [0b010, 0b110, 0b010, 0b010, 0b111],
    [0b111, 0b001, 0b111, 0b100, 0b111],
    [0b111, 0b001, 0b111, 0b001, 0b111],
    [0b101, 0b101, 0b111, 0b001, 0b001],
    [0b111, 0b100, 0b111, 0b001, 0b111],
    [0b111, 0b100, 0b111, 0b101, 0b111],
    [0b111, 0b001, 0b010, 0b010, 0b010],
    [0b111, 0b101, 0b111, 0b101, 0b111],
    [0b111, 0b101, 0b111, 0b001, 0b111],
];

/// Rendered size of `text` in pixels.
pub fn text_size(text: &str) -> (u32, u32) {
    let chars = text.chars().count() as i32;
    if chars == 0 {
        return (0, 0);
    }
    let advance = GLYPH_WIDTH * GLYPH_SCALE + GLYPH_SPACING;
    (
        (chars * advance - GLYPH_SPACING) as u32,
        (GLYPH_HEIGHT * GLYPH_SCALE) as u32,
    )
}

/// Draw a 2 px outline along the inside of `bbox`.
pub fn draw_outline(image: &mut RgbImage, bbox: &PixelBox) {
    for inset in 0..OUTLINE_THICKNESS {
        if bbox.width <= 2 * inset || bbox.height <= 2 * inset {
            break;
        }
        let rect = Rect::at((bbox.x + inset) as i32, (bbox.y + inset) as i32)
            .of_size(bbox.width - 2 * inset, bbox.height - 2 * inset);
        draw_hollow_rect_mut(image, rect, OUTLINE_COLOR);
    }
}

/// Top-left corner of the text for `text` inside `bbox`: anchored near
/// the bottom-left corner with the baseline `LABEL_MARGIN` above the edge.
pub fn label_origin(bbox: &PixelBox, text: &str) -> (i32, i32) {
    let (_, text_height) = text_size(text);
    let baseline = bbox.bottom() as i32 - LABEL_MARGIN;
    (bbox.x as i32 + LABEL_MARGIN, baseline - text_height as i32)
}

/// Draw the rank label for a face, optionally over an opaque background.
pub fn draw_label(image: &mut RgbImage, bbox: &PixelBox, rank: usize, background: bool) {
    let text = rank.to_string();
    let (text_width, text_height) = text_size(&text);
    let (left, top) = label_origin(bbox, &text);

    if background {
        let rect = Rect::at(left - LABEL_PADDING, top - LABEL_PADDING).of_size(
            text_width + 2 * LABEL_PADDING as u32,
            text_height + 2 * LABEL_PADDING as u32,
        );
        draw_filled_rect_mut(image, rect, LABEL_BACKGROUND);
    }

    draw_text(image, left, top, &text, LABEL_COLOR);
}

/// Draw digits with their top-left corner at (`left`, `top`). Anything
/// other than an ASCII digit advances the cursor without drawing.
pub fn draw_text(image: &mut RgbImage, left: i32, top: i32, text: &str, color: Rgb<u8>) {
    let advance = GLYPH_WIDTH * GLYPH_SCALE + GLYPH_SPACING;

    for (i, ch) in text.chars().enumerate() {
        let Some(digit) = ch.to_digit(10) else {
            continue;
        };
        let glyph_left = left + i as i32 * advance;

        for (row, bits) in DIGITS[digit as usize].iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if (bits >> (GLYPH_WIDTH - 1 - col)) & 1 == 0 {
                    continue;
                }
                let cell = Rect::at(
                    glyph_left + col * GLYPH_SCALE,
                    top + row as i32 * GLYPH_SCALE,
                )
                .of_size(GLYPH_SCALE as u32, GLYPH_SCALE as u32);
                draw_filled_rect_mut(image, cell, color);
            }
        }
    }
}

/// Whether the glyph cell at (`row`, `col`) of `digit` is set. Used to
/// check rendered labels.
pub fn glyph_bit(digit: u32, row: usize, col: usize) -> bool {
    DIGITS[digit as usize % 10][row] >> (GLYPH_WIDTH as usize - 1 - col) & 1 == 1
}

/// Pixel at the centre of glyph cell (`row`, `col`) of character `index`
/// for text drawn at (`left`, `top`).
pub fn glyph_cell_center(left: i32, top: i32, index: usize, row: usize, col: usize) -> (i32, i32) {
    let advance = GLYPH_WIDTH * GLYPH_SCALE + GLYPH_SPACING;
    (
        left + index as i32 * advance + col as i32 * GLYPH_SCALE + GLYPH_SCALE / 2,
        top + row as i32 * GLYPH_SCALE + GLYPH_SCALE / 2,
    )
}
