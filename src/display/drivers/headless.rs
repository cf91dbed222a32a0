/*
 *  display/drivers/headless.rs
 *
 *  OctoMonS - print status at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  In-memory panel for running without hardware
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

use embedded_graphics::pixelcolor::BinaryColor;
use log::{debug, log_enabled, Level};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::display::error::DisplayError;
use crate::display::framebuffer::PixelBuffer;
use crate::display::traits::{check_frame, validate_rotation, DisplayCapabilities, DisplayDriver};

/// Panel that keeps frames in memory.
///
/// Flushed frames are written to the debug log as text art. The shared
/// state handle lets callers inspect what was shown and inject failures.
#[derive(Debug, Clone)]
pub struct HeadlessDriver {
    /// Pending frame, not yet flushed
    framebuffer: PixelBuffer,

    capabilities: DisplayCapabilities,

    rotation: u16,

    state: Arc<Mutex<HeadlessState>>,
}

/// Counters and the last visible frame
#[derive(Debug, Default)]
pub struct HeadlessState {
    pub init_count: usize,
    pub flush_count: usize,
    pub clear_count: usize,
    pub last_brightness: Option<u8>,
    pub last_rotation: Option<u16>,
    pub last_invert: Option<bool>,
    pub is_initialized: bool,

    /// What the panel currently shows, inversion applied
    pub shown: Option<PixelBuffer>,

    /// Simulate failures (for error testing)
    pub simulate_flush_failure: bool,
    pub simulate_init_failure: bool,
}

impl HeadlessDriver {
    pub fn new(width: u32, height: u32) -> Self {
        let capabilities = DisplayCapabilities {
            name: "headless",
            width,
            height,
            supports_rotation: true,
            supports_brightness: true,
            supports_invert: true,
        };

        Self {
            framebuffer: PixelBuffer::new(width, height),
            capabilities,
            rotation: 0,
            state: Arc::new(Mutex::new(HeadlessState::default())),
        }
    }

    /// A bare panel: no rotation, brightness or inversion.
    pub fn without_controls(mut self) -> Self {
        self.capabilities.supports_rotation = false;
        self.capabilities.supports_brightness = false;
        self.capabilities.supports_invert = false;
        self
    }

    /// Shared handle; stays valid after the driver is boxed.
    pub fn state(&self) -> Arc<Mutex<HeadlessState>> {
        Arc::clone(&self.state)
    }

    fn lock(&self) -> MutexGuard<'_, HeadlessState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DisplayDriver for HeadlessDriver {
    fn capabilities(&self) -> &DisplayCapabilities {
        &self.capabilities
    }

    fn rotation(&self) -> u16 {
        self.rotation
    }

    fn init(&mut self) -> Result<(), DisplayError> {
        let mut state = self.lock();

        if state.simulate_init_failure {
            return Err(DisplayError::InitializationFailed("simulated init failure".to_string()));
        }

        state.init_count += 1;
        state.is_initialized = true;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        self.lock().clear_count += 1;
        self.framebuffer.clear_color(BinaryColor::Off);
        self.flush()
    }

    fn draw_buffer(&mut self, buffer: &PixelBuffer) -> Result<(), DisplayError> {
        check_frame(self.canvas_size(), buffer)?;
        self.framebuffer.clone_from(buffer);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), DisplayError> {
        let mut frame = self.framebuffer.clone();
        let mut state = self.lock();

        if state.simulate_flush_failure {
            return Err(DisplayError::Other("simulated flush failure".to_string()));
        }

        if state.last_invert == Some(true) {
            frame.invert();
        }

        state.flush_count += 1;
        if log_enabled!(Level::Debug) {
            debug!("headless frame {}:\n{}", state.flush_count, frame.to_ascii());
        }
        state.shown = Some(frame);
        Ok(())
    }

    fn set_brightness(&mut self, value: u8) -> Result<(), DisplayError> {
        if !self.capabilities.supports_brightness {
            return Err(DisplayError::UnsupportedOperation);
        }
        self.lock().last_brightness = Some(value);
        Ok(())
    }

    fn set_invert(&mut self, inverted: bool) -> Result<(), DisplayError> {
        if !self.capabilities.supports_invert {
            return Err(DisplayError::UnsupportedOperation);
        }
        self.lock().last_invert = Some(inverted);
        Ok(())
    }

    fn set_rotation(&mut self, degrees: u16) -> Result<(), DisplayError> {
        let degrees = validate_rotation(degrees)?;
        if !self.capabilities.supports_rotation {
            return Err(DisplayError::UnsupportedOperation);
        }
        self.rotation = degrees;
        let (w, h) = self.canvas_size();
        self.framebuffer = PixelBuffer::new(w, h);
        self.lock().last_rotation = Some(degrees);
        Ok(())
    }
}
