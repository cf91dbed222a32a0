/*
 *  display/factory.rs
 *
 *  OctoMonS - print status at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Builds and prepares the configured panel driver
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

use crate::config::{DisplaySettings, DriverKind};
use crate::display::drivers::headless::HeadlessDriver;
use crate::display::error::{DisplayError, DisplayFactoryError};
use crate::display::traits::{validate_rotation, DisplayDriver};
use log::{info, warn};

#[cfg(feature = "driver-ssd1306")]
use crate::display::drivers::ssd1306::Ssd1306Driver;

/// Type alias for boxed display driver trait objects
pub type BoxedDriver = Box<dyn DisplayDriver>;

/// Factory for creating display drivers from configuration
pub struct DisplayDriverFactory;

impl DisplayDriverFactory {
    /// Create, initialize and configure the panel described by `settings`.
    ///
    /// Rotation problems are fatal. Brightness and inversion are best effort:
    /// a panel that cannot do them still shows the status.
    pub fn create_from_settings(
        settings: &DisplaySettings
    ) -> Result<BoxedDriver, DisplayFactoryError> {
        Self::validate_settings(settings)?;

        let mut driver: BoxedDriver = match settings.driver {
            DriverKind::Headless => Box::new(HeadlessDriver::new(settings.width, settings.height)),

            #[cfg(feature = "driver-ssd1306")]
            DriverKind::Ssd1306 => Box::new(Ssd1306Driver::new_i2c(
                &settings.bus,
                settings.address,
                settings.width,
                settings.height,
            )?),

            #[cfg(not(feature = "driver-ssd1306"))]
            DriverKind::Ssd1306 => {
                return Err(DisplayFactoryError::DriverNotEnabled("driver-ssd1306"));
            }
        };

        Self::configure(driver.as_mut(), settings)?;
        Ok(driver)
    }

    /// Init the panel and apply the optional settings.
    ///
    /// Options the panel does not advertise in its capabilities are not sent
    /// to it: rotation is refused, brightness and invert are skipped.
    pub fn configure(
        driver: &mut dyn DisplayDriver,
        settings: &DisplaySettings,
    ) -> Result<(), DisplayFactoryError> {
        driver.init()?;

        let caps = driver.capabilities();
        let (name, rotation, brightness, invert) =
            (caps.name, caps.supports_rotation, caps.supports_brightness, caps.supports_invert);

        if settings.rotate_deg != 0 {
            if !rotation {
                return Err(DisplayFactoryError::ConfigError(
                    format!("{} display cannot rotate {} degrees", name, settings.rotate_deg)
                ));
            }
            driver.set_rotation(settings.rotate_deg)?;
        }
        if let Some(value) = settings.brightness {
            if brightness {
                best_effort(driver.set_brightness(value), "brightness")?;
            } else {
                warn!("Display {} has no brightness control, ignored", name);
            }
        }
        if let Some(value) = settings.invert {
            if invert {
                best_effort(driver.set_invert(value), "invert")?;
            } else {
                warn!("Display {} cannot invert, ignored", name);
            }
        }

        let (w, h) = driver.canvas_size();
        info!("Display {} ready, canvas {}x{}", driver.capabilities().name, w, h);
        Ok(())
    }

    /// Validate settings without touching hardware
    pub fn validate_settings(settings: &DisplaySettings) -> Result<(), DisplayFactoryError> {
        if settings.width == 0 || settings.height == 0 {
            return Err(DisplayFactoryError::ConfigError(
                format!("Invalid display size {}x{}", settings.width, settings.height)
            ));
        }
        validate_rotation(settings.rotate_deg)
            .map_err(|e| DisplayFactoryError::ConfigError(e.to_string()))?;
        Ok(())
    }
}

fn best_effort(result: Result<(), DisplayError>, what: &str) -> Result<(), DisplayError> {
    match result {
        Err(DisplayError::UnsupportedOperation) => {
            warn!("Display does not support {}, ignored", what);
            Ok(())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::framebuffer::PixelBuffer;

    fn headless(width: u32, height: u32) -> DisplaySettings {
        DisplaySettings {
            driver: DriverKind::Headless,
            width,
            height,
            rotate_deg: 0,
            invert: None,
            brightness: None,
            clear_on_exit: true,
            bus: "/dev/i2c-1".to_string(),
            address: 0x3C,
        }
    }

    #[test]
    fn test_headless_from_settings() {
        let mut driver = DisplayDriverFactory::create_from_settings(&headless(128, 32)).unwrap();
        assert_eq!(driver.capabilities().name, "headless");
        assert_eq!(driver.canvas_size(), (128, 32));
        assert!(driver.commit(&PixelBuffer::new(128, 32)).is_ok());
    }

    #[test]
    fn test_options_applied() {
        let mut settings = headless(128, 64);
        settings.rotate_deg = 270;
        settings.brightness = Some(10);
        settings.invert = Some(true);

        let mut driver = HeadlessDriver::new(128, 64);
        let state = driver.state();
        DisplayDriverFactory::configure(&mut driver, &settings).unwrap();

        assert_eq!(driver.canvas_size(), (64, 128));
        let state = state.lock().unwrap();
        assert!(state.is_initialized);
        assert_eq!(state.last_rotation, Some(270));
        assert_eq!(state.last_brightness, Some(10));
        assert_eq!(state.last_invert, Some(true));
    }

    #[test]
    fn test_capabilities_gate_options() {
        let mut settings = headless(128, 32);
        settings.brightness = Some(10);
        settings.invert = Some(true);

        let mut driver = HeadlessDriver::new(128, 32).without_controls();
        let state = driver.state();
        DisplayDriverFactory::configure(&mut driver, &settings).unwrap();

        let state = state.lock().unwrap();
        assert!(state.is_initialized);
        assert_eq!(state.last_brightness, None);
        assert_eq!(state.last_invert, None);
    }

    #[test]
    fn test_rotation_on_fixed_panel_is_fatal() {
        let mut settings = headless(128, 32);
        settings.rotate_deg = 180;

        let mut driver = HeadlessDriver::new(128, 32).without_controls();
        let state = driver.state();
        assert!(matches!(
            DisplayDriverFactory::configure(&mut driver, &settings),
            Err(DisplayFactoryError::ConfigError(_))
        ));
        assert_eq!(state.lock().unwrap().last_rotation, None);
    }

    #[test]
    fn test_invalid_rotation() {
        let mut settings = headless(128, 32);
        settings.rotate_deg = 45;
        assert!(matches!(
            DisplayDriverFactory::create_from_settings(&settings),
            Err(DisplayFactoryError::ConfigError(_))
        ));
    }

    #[test]
    fn test_zero_size() {
        assert!(DisplayDriverFactory::validate_settings(&headless(0, 32)).is_err());
    }

    #[test]
    fn test_init_failure_is_reported() {
        let mut driver = HeadlessDriver::new(128, 32);
        driver.state().lock().unwrap().simulate_init_failure = true;
        assert!(matches!(
            DisplayDriverFactory::configure(&mut driver, &headless(128, 32)),
            Err(DisplayFactoryError::DriverInitFailed(_))
        ));
    }

    #[test]
    fn test_unsupported_options_are_not_fatal() {
        assert!(best_effort(Err(DisplayError::UnsupportedOperation), "invert").is_ok());
        assert!(best_effort(Err(DisplayError::Other("bus".into())), "invert").is_err());
    }

    #[cfg(feature = "driver-ssd1306")]
    #[test]
    fn test_missing_i2c_bus_is_fatal() {
        let mut settings = headless(128, 32);
        settings.driver = DriverKind::Ssd1306;
        settings.bus = "/dev/octomons-no-such-i2c".to_string();
        assert!(matches!(
            DisplayDriverFactory::create_from_settings(&settings),
            Err(DisplayFactoryError::DriverInitFailed(DisplayError::I2cError(_)))
        ));
    }
}
