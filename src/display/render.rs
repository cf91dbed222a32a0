/*
 *  display/render.rs
 *
 *  OctoMonS - print status at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Lays the status model out on a small monochrome frame
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use embedded_graphics::{
    mono_font::{iso_8859_1::FONT_6X10, MonoFont, MonoTextStyle},
    pixelcolor::BinaryColor,
    prelude::*,
    text::{Baseline, Text},
};

use crate::display::framebuffer::PixelBuffer;
use crate::status::DisplayModel;

/// Top of each text row, in pixels
pub const ROW_Y: [i32; 3] = [0, 10, 20];

/// Start of the right hand field on a 128 pixel wide panel
const SPLIT_X: u32 = 62;
const REFERENCE_WIDTH: u32 = 128;

// Latin-1 so the degree sign has a glyph
const FONT: &MonoFont<'static> = &FONT_6X10;

const TEST_PATTERN: [&str; 3] = [
    "This is a test",
    "Test on another row",
    "Test on a third row",
];

fn glyph_advance() -> u32 {
    FONT.character_size.width + FONT.character_spacing
}

/// Left edge of the right field, scaled to the canvas width.
pub fn split_x(width: u32) -> u32 {
    SPLIT_X * width / REFERENCE_WIDTH
}

/// Longest prefix of whole glyphs that fits in `max_px`.
fn fit(text: &str, max_px: u32) -> &str {
    let max_chars = (max_px / glyph_advance()) as usize;
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => &text[..cut],
        None => text,
    }
}

fn draw_field(frame: &mut PixelBuffer, text: &str, x: u32, y: i32, max_px: u32) {
    let style = MonoTextStyle::new(FONT, BinaryColor::On);
    let text = fit(text, max_px);
    if text.is_empty() {
        return;
    }
    // drawing into memory cannot fail
    let _ = Text::with_baseline(text, Point::new(x as i32, y), style, Baseline::Top).draw(frame);
}

/// Renders one status frame. Same model and size, same pixels.
///
/// Rows that fall below the canvas are clipped; text wider than its field
/// is cut at the last whole glyph.
pub fn render_status(model: &DisplayModel, width: u32, height: u32) -> PixelBuffer {
    let mut frame = PixelBuffer::new(width, height);
    let split = split_x(width);

    draw_field(&mut frame, &model.line1, 0, ROW_Y[0], width);
    draw_field(&mut frame, &model.line2, 0, ROW_Y[1], width);
    draw_field(&mut frame, &model.line3_left, 0, ROW_Y[2], split);
    draw_field(&mut frame, &model.line3_right, split, ROW_Y[2], width - split);

    frame
}

/// Three fixed rows used to check wiring and orientation.
pub fn render_test_pattern(width: u32, height: u32) -> PixelBuffer {
    let mut frame = PixelBuffer::new(width, height);
    for (text, y) in TEST_PATTERN.iter().zip(ROW_Y) {
        draw_field(&mut frame, text, 0, y, width);
    }
    frame
}
