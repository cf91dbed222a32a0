/*
 *  display/framebuffer.rs
 *
 *  OctoMonS - print status at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Runtime-sized 1-bit frame
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

use core::convert::Infallible;
use embedded_graphics::geometry::{OriginDimensions, Size};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use std::io::Write;

/// A monochrome frame, row-major, sized at runtime.
///
/// Drawing outside the frame is clipped silently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    buf: Vec<BinaryColor>,
    w: usize,
    h: usize,
}

impl PixelBuffer {
    /// All pixels off
    pub fn new(width: u32, height: u32) -> Self {
        let (w, h) = (width as usize, height as usize);
        Self { buf: vec![BinaryColor::Off; w * h], w, h }
    }

    pub fn width(&self) -> u32 { self.w as u32 }
    pub fn height(&self) -> u32 { self.h as u32 }

    pub fn clear_color(&mut self, color: BinaryColor) {
        self.buf.fill(color);
    }

    /// Flip every pixel
    pub fn invert(&mut self) {
        self.buf.iter_mut().for_each(|p| *p = p.invert());
    }

    pub fn get(&self, x: u32, y: u32) -> Option<BinaryColor> {
        self.idx(Point::new(x as i32, y as i32)).map(|i| self.buf[i])
    }

    pub fn is_on(&self, x: u32, y: u32) -> bool {
        self.get(x, y) == Some(BinaryColor::On)
    }

    pub fn count_on(&self) -> usize {
        self.buf.iter().filter(|&&p| p == BinaryColor::On).count()
    }

    /// Lit pixels inside a rectangle given as x and y ranges.
    pub fn count_on_in(&self, xs: std::ops::Range<u32>, ys: std::ops::Range<u32>) -> usize {
        ys.flat_map(|y| xs.clone().map(move |x| (x, y)))
            .filter(|&(x, y)| self.is_on(x, y))
            .count()
    }

    /// Every pixel with its position, row by row.
    pub fn pixels(&self) -> impl Iterator<Item = Pixel<BinaryColor>> + '_ {
        let w = self.w;
        self.buf.iter().enumerate().map(move |(i, &c)| {
            Pixel(Point::new((i % w) as i32, (i / w) as i32), c)
        })
    }

    /// One text row per pixel row, '#' for lit.
    pub fn to_ascii(&self) -> String {
        let mut out = String::with_capacity((self.w + 1) * self.h);
        for row in self.buf.chunks(self.w.max(1)) {
            out.extend(row.iter().map(|&p| if p == BinaryColor::On { '#' } else { '.' }));
            out.push('\n');
        }
        out
    }

    /// Plain PBM (P1) for visual debugging
    pub fn write_pbm<W: Write>(&self, mut out: W) -> std::io::Result<()> {
        writeln!(out, "P1")?;
        writeln!(out, "{} {}", self.w, self.h)?;
        for row in self.buf.chunks(self.w.max(1)) {
            let bits: Vec<&str> = row.iter()
                .map(|&p| if p == BinaryColor::On { "1" } else { "0" })
                .collect();
            writeln!(out, "{}", bits.join(" "))?;
        }
        Ok(())
    }

    /// Map (x,y) to linear index; returns None if out of bounds
    #[inline]
    fn idx(&self, p: Point) -> Option<usize> {
        if p.x >= 0 && p.y >= 0 {
            let (x, y) = (p.x as usize, p.y as usize);
            if x < self.w && y < self.h {
                return Some(y * self.w + x);
            }
        }
        None
    }
}

impl OriginDimensions for PixelBuffer {
    fn size(&self) -> Size {
        Size::new(self.w as u32, self.h as u32)
    }
}

impl DrawTarget for PixelBuffer {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(p, c) in pixels {
            if let Some(i) = self.idx(p) {
                self.buf[i] = c;
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.clear_color(color);
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let area = area.intersection(&self.bounding_box());
        if let Some(br) = area.bottom_right() {
            for y in area.top_left.y..=br.y {
                let base = y as usize * self.w;
                self.buf[base + area.top_left.x as usize..=base + br.x as usize].fill(color);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::primitives::{Line, PrimitiveStyle};

    #[test]
    fn test_new_is_blank() {
        let fb = PixelBuffer::new(128, 32);
        assert_eq!(fb.width(), 128);
        assert_eq!(fb.height(), 32);
        assert_eq!(fb.count_on(), 0);
    }

    #[test]
    fn test_drawing_clips_out_of_bounds() {
        let mut fb = PixelBuffer::new(16, 8);
        Line::new(Point::new(-5, 0), Point::new(30, 0))
            .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
            .draw(&mut fb)
            .unwrap();
        assert_eq!(fb.count_on(), 16);
        assert!(fb.is_on(0, 0));
        assert!(fb.is_on(15, 0));
        assert_eq!(fb.get(16, 0), None);
    }

    #[test]
    fn test_fill_solid_clipped() {
        let mut fb = PixelBuffer::new(10, 10);
        fb.fill_solid(&Rectangle::new(Point::new(8, 8), Size::new(5, 5)), BinaryColor::On).unwrap();
        assert_eq!(fb.count_on(), 4);
        assert_eq!(fb.count_on_in(8..10, 8..10), 4);
    }

    #[test]
    fn test_ascii_dump() {
        let mut fb = PixelBuffer::new(3, 2);
        Pixel(Point::new(1, 1), BinaryColor::On).draw(&mut fb).unwrap();
        assert_eq!(fb.to_ascii(), "...\n.#.\n");
    }

    #[test]
    fn test_pbm_export() {
        let mut fb = PixelBuffer::new(3, 2);
        Pixel(Point::new(0, 0), BinaryColor::On).draw(&mut fb).unwrap();
        let mut out = Vec::new();
        fb.write_pbm(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "P1\n3 2\n1 0 0\n0 0 0\n");
    }

    #[test]
    fn test_pixels_positions() {
        let mut fb = PixelBuffer::new(4, 3);
        Pixel(Point::new(3, 2), BinaryColor::On).draw(&mut fb).unwrap();
        let lit: Vec<Point> = fb.pixels()
            .filter(|Pixel(_, c)| *c == BinaryColor::On)
            .map(|Pixel(p, _)| p)
            .collect();
        assert_eq!(lit, vec![Point::new(3, 2)]);
    }
}
