/*
 *  display/drivers/ssd1306.rs
 *
 *  OctoMonS - print status at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  SSD1306 OLED over I2C
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

use linux_embedded_hal::I2cdev;
use ssd1306::{
    mode::BufferedGraphicsMode,
    prelude::*,
    size::{DisplaySize128x32, DisplaySize128x64, DisplaySize96x16},
    I2CDisplayInterface,
    Ssd1306,
};

use embedded_graphics::prelude::*;

use crate::display::error::DisplayError;
use crate::display::framebuffer::PixelBuffer;
use crate::display::traits::{check_frame, validate_rotation, DisplayCapabilities, DisplayDriver};

use log::info;

type Panel<SIZE> = Ssd1306<I2CInterface<I2cdev>, SIZE, BufferedGraphicsMode<SIZE>>;

/// Panel geometries the controller is sold in
enum Ssd1306Variants {
    Size128x64(Panel<DisplaySize128x64>),
    Size128x32(Panel<DisplaySize128x32>),
    Size96x16(Panel<DisplaySize96x16>),
}

// Same body for every geometry; each arm is typed separately.
macro_rules! with_panel {
    ($variants:expr, $d:ident => $body:expr) => {
        match $variants {
            Ssd1306Variants::Size128x64($d) => $body,
            Ssd1306Variants::Size128x32($d) => $body,
            Ssd1306Variants::Size96x16($d) => $body,
        }
    };
}

/// SSD1306 display driver wrapper
pub struct Ssd1306Driver {
    display: Ssd1306Variants,
    capabilities: DisplayCapabilities,
    rotation: u16,
    // applied while copying the frame into controller RAM
    inverted: bool,
}

fn to_rotation(degrees: u16) -> Result<DisplayRotation, DisplayError> {
    Ok(match validate_rotation(degrees)? {
        90 => DisplayRotation::Rotate90,
        180 => DisplayRotation::Rotate180,
        270 => DisplayRotation::Rotate270,
        _ => DisplayRotation::Rotate0,
    })
}

/// 0-255 in four steps, dimmest first
fn brightness_step(value: u8) -> usize {
    usize::from(value / 64)
}

fn to_brightness(value: u8) -> Brightness {
    match brightness_step(value) {
        0 => Brightness::DIMMEST,
        1 => Brightness::DIM,
        2 => Brightness::NORMAL,
        _ => Brightness::BRIGHTEST,
    }
}

impl Ssd1306Driver {
    /// Opens the I2C device; the panel is not touched until `init`.
    ///
    /// # Arguments
    ///
    /// * `i2c_bus_path` - Path to I2C device (e.g., "/dev/i2c-1")
    /// * `address` - I2C address (typically 0x3C or 0x3D)
    /// * `width`, `height` - panel geometry, 128x64, 128x32 or 96x16
    pub fn new_i2c(
        i2c_bus_path: &str,
        address: u8,
        width: u32,
        height: u32,
    ) -> Result<Self, DisplayError> {
        info!("Opening SSD1306 {}x{} on {} at address 0x{:02X}", width, height, i2c_bus_path, address);

        let i2c = I2cdev::new(i2c_bus_path)
            .map_err(|e| DisplayError::I2cError(format!("Failed to open {}: {}", i2c_bus_path, e)))?;
        let interface = I2CDisplayInterface::new_custom_address(i2c, address);

        let display = match (width, height) {
            (128, 64) => Ssd1306Variants::Size128x64(
                Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
                    .into_buffered_graphics_mode(),
            ),
            (128, 32) => Ssd1306Variants::Size128x32(
                Ssd1306::new(interface, DisplaySize128x32, DisplayRotation::Rotate0)
                    .into_buffered_graphics_mode(),
            ),
            (96, 16) => Ssd1306Variants::Size96x16(
                Ssd1306::new(interface, DisplaySize96x16, DisplayRotation::Rotate0)
                    .into_buffered_graphics_mode(),
            ),
            _ => {
                return Err(DisplayError::InvalidConfiguration(
                    format!("Unsupported SSD1306 size: {}x{}", width, height)
                ));
            }
        };

        let capabilities = DisplayCapabilities {
            name: "ssd1306",
            width,
            height,
            supports_rotation: true,
            supports_brightness: true,
            supports_invert: true,
        };

        Ok(Self {
            display,
            capabilities,
            rotation: 0,
            inverted: false,
        })
    }
}

impl DisplayDriver for Ssd1306Driver {
    fn capabilities(&self) -> &DisplayCapabilities {
        &self.capabilities
    }

    fn rotation(&self) -> u16 {
        self.rotation
    }

    fn init(&mut self) -> Result<(), DisplayError> {
        with_panel!(&mut self.display, d => d.init())
            .map_err(|e| DisplayError::InitializationFailed(format!("{:?}", e)))?;
        info!("SSD1306 initialized ({}x{})", self.capabilities.width, self.capabilities.height);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        let (w, h) = self.canvas_size();
        self.commit(&PixelBuffer::new(w, h))
    }

    fn draw_buffer(&mut self, buffer: &PixelBuffer) -> Result<(), DisplayError> {
        check_frame(self.canvas_size(), buffer)?;
        let inverted = self.inverted;
        let pixels = buffer.pixels()
            .map(|Pixel(p, c)| Pixel(p, if inverted { c.invert() } else { c }));
        with_panel!(&mut self.display, d => d.draw_iter(pixels))?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), DisplayError> {
        with_panel!(&mut self.display, d => d.flush())?;
        Ok(())
    }

    fn set_brightness(&mut self, value: u8) -> Result<(), DisplayError> {
        let brightness = to_brightness(value);
        with_panel!(&mut self.display, d => d.set_brightness(brightness))?;
        Ok(())
    }

    fn set_invert(&mut self, inverted: bool) -> Result<(), DisplayError> {
        self.inverted = inverted;
        Ok(())
    }

    fn set_rotation(&mut self, degrees: u16) -> Result<(), DisplayError> {
        let rotation = to_rotation(degrees)?;
        with_panel!(&mut self.display, d => d.set_rotation(rotation))?;
        self.rotation = degrees;
        Ok(())
    }
}
