/*
 *  display/traits.rs
 *
 *  OctoMonS - print status at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Panel driver abstraction
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

use crate::display::error::DisplayError;
use crate::display::framebuffer::PixelBuffer;

/// Display capabilities and metadata
#[derive(Debug, Clone)]
pub struct DisplayCapabilities {
    /// Short driver name for logs
    pub name: &'static str,

    /// Panel width in pixels, unrotated
    pub width: u32,

    /// Panel height in pixels, unrotated
    pub height: u32,

    /// Whether the display supports hardware rotation
    pub supports_rotation: bool,

    /// Whether the display supports brightness control
    pub supports_brightness: bool,

    /// Whether the display supports inversion
    pub supports_invert: bool,
}

pub fn validate_rotation(degrees: u16) -> Result<u16, DisplayError> {
    match degrees {
        0 | 90 | 180 | 270 => Ok(degrees),
        _ => Err(DisplayError::InvalidRotation(degrees)),
    }
}

/// Every panel the status loop can drive implements this.
///
/// The loop renders into a [`PixelBuffer`] sized to [`canvas_size`](Self::canvas_size)
/// and hands it over with [`commit`](Self::commit). Nothing is visible until `flush`.
pub trait DisplayDriver: Send {
    /// Returns the capabilities of this display
    fn capabilities(&self) -> &DisplayCapabilities;

    /// Returns the panel dimensions as (width, height)
    fn dimensions(&self) -> (u32, u32) {
        let caps = self.capabilities();
        (caps.width, caps.height)
    }

    /// Current rotation in degrees
    fn rotation(&self) -> u16 {
        0
    }

    /// Drawing surface after rotation
    fn canvas_size(&self) -> (u32, u32) {
        let (w, h) = self.dimensions();
        match self.rotation() {
            90 | 270 => (h, w),
            _ => (w, h),
        }
    }

    /// Initialize the display hardware
    fn init(&mut self) -> Result<(), DisplayError>;

    /// Blank the panel and push the blank frame out
    fn clear(&mut self) -> Result<(), DisplayError>;

    /// Replace the pending frame; the buffer must match `canvas_size`.
    fn draw_buffer(&mut self, buffer: &PixelBuffer) -> Result<(), DisplayError>;

    /// Transfer the pending frame to the panel
    fn flush(&mut self) -> Result<(), DisplayError>;

    /// Draw and flush in one step
    fn commit(&mut self, buffer: &PixelBuffer) -> Result<(), DisplayError> {
        self.draw_buffer(buffer)?;
        self.flush()
    }

    /// Set display brightness (0-255)
    fn set_brightness(&mut self, _value: u8) -> Result<(), DisplayError> {
        Err(DisplayError::UnsupportedOperation)
    }

    /// Set display inversion (if supported)
    fn set_invert(&mut self, _inverted: bool) -> Result<(), DisplayError> {
        Err(DisplayError::UnsupportedOperation)
    }

    /// Set display rotation (if supported); 0, 90, 180 or 270 degrees.
    fn set_rotation(&mut self, degrees: u16) -> Result<(), DisplayError> {
        validate_rotation(degrees)?;
        Err(DisplayError::UnsupportedOperation)
    }
}

/// Checks a frame against the surface a driver expects.
pub fn check_frame(expected: (u32, u32), buffer: &PixelBuffer) -> Result<(), DisplayError> {
    let actual = (buffer.width(), buffer.height());
    if actual != expected {
        return Err(DisplayError::BufferSizeMismatch { expected, actual });
    }
    Ok(())
}
