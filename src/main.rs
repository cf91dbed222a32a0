/*
 *  main.rs
 *
 *  OctoMonS - print status at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  CPU temperature, IP address and OctoPrint job progress on a small OLED
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

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{info, warn};
use std::time::Duration;
use tokio::sync::watch;

use octomons::config::{self, Cli, Settings};
use octomons::display::{render_test_pattern, BoxedDriver, DisplayDriverFactory};
use octomons::shutdown;
use octomons::{StatusPoller, SystemSources, BUILD_DATE};

const TEST_PATTERN_HOLD: Duration = Duration::from_secs(5);

/// Wiring check: three fixed rows, held until the timer or a signal.
async fn show_test_pattern(
    display: &mut BoxedDriver,
    settings: &Settings,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let (w, h) = display.canvas_size();
    display.commit(&render_test_pattern(w, h))
        .context("drawing the test pattern")?;
    info!("Test pattern up for {:?}", TEST_PATTERN_HOLD);

    tokio::select! {
        _ = tokio::time::sleep(TEST_PATTERN_HOLD) => {}
        _ = shutdown.changed() => {}
    }

    if settings.display.clear_on_exit {
        display.clear().context("clearing the display")?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(&cli).context("loading configuration")?;

    if cli.dump_config {
        print!("{}", serde_yaml::to_string(&cfg).context("serializing configuration")?);
        return Ok(());
    }

    let settings = cfg.resolve().context("resolving configuration")?;

    // Initialize the logger; RUST_LOG still wins
    env_logger::Builder::from_env(Env::default().default_filter_or(settings.log_level.as_str()))
        .format_timestamp_secs()
        .init();

    info!("This is {}, print status at a glance", env!("CARGO_PKG_NAME"));
    info!("v.{} built {}", env!("CARGO_PKG_VERSION"), BUILD_DATE);

    let shutdown = shutdown::install().context("installing signal handlers")?;

    let mut display = DisplayDriverFactory::create_from_settings(&settings.display)
        .context("display initialization failed")?;

    if cli.test_pattern {
        return show_test_pattern(&mut display, &settings, shutdown).await;
    }

    if settings.octoprint.api_key.is_empty() {
        warn!("No OctoPrint API key configured, job status will be unavailable");
    }

    let sources = SystemSources::from_settings(&settings)
        .context("creating the OctoPrint client")?;
    info!("Interface {}, sensor {}, OctoPrint {}",
        settings.interface, settings.thermal_path.display(), settings.octoprint.base_url);

    StatusPoller::from_settings(sources, display, &settings)
        .run(shutdown)
        .await;

    info!("Main application exiting.");
    Ok(())
}
