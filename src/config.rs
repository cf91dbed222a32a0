/*
 *  config.rs
 *
 *  OctoMonS - print status at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Layered configuration: defaults, YAML file, command line
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

use clap::{ArgAction, Parser, ValueHint};
use dirs_next::home_dir;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}, time::Duration};
use thiserror::Error;

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;
/// Upper bound for a single source fetch, further capped at half the poll interval
pub const MAX_FETCH_TIMEOUT_MS: u64 = 3000;
pub const DEFAULT_WIDTH: u32 = 128;
pub const DEFAULT_HEIGHT: u32 = 32;
pub const DEFAULT_I2C_BUS: &str = "/dev/i2c-1";
pub const DEFAULT_I2C_ADDRESS: u8 = 0x3C;
pub const DEFAULT_INTERFACE: &str = "wlan0";
pub const DEFAULT_THERMAL_PATH: &str = "/sys/class/thermal/thermal_zone0/temp";
pub const DEFAULT_OCTOPRINT_URL: &str = "http://localhost/";

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Configuration as read from YAML and the command line. Every field is
/// optional so the layers can be merged; `resolve` fills in the defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    pub log_level: Option<String>,      // e.g., "info" | "debug"
    pub poll_interval_ms: Option<u64>,
    pub fetch_timeout_ms: Option<u64>,
    pub display: Option<DisplayConfig>,
    pub network: Option<NetworkConfig>,
    pub sensor: Option<SensorConfig>,
    pub octoprint: Option<OctoPrintConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DisplayConfig {
    pub driver: Option<DriverKind>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub rotate_deg: Option<u16>,
    pub invert: Option<bool>,
    pub brightness: Option<u8>,     // 0-255
    pub clear_on_exit: Option<bool>,
    pub bus: Option<BusConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct NetworkConfig {
    pub interface: Option<String>,  // e.g. "wlan0"
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SensorConfig {
    pub thermal_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct OctoPrintConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub time_left_unit: Option<TimeLeftUnit>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BusConfig {
    I2c {
        bus: String,        // e.g. "/dev/i2c-1"
        address: u8,        // 7-bit, e.g. 0x3C
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    Ssd1306,
    Headless,   // in-memory sink, no hardware
}

/// Unit of `printTimeLeft` as delivered by the job endpoint
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimeLeftUnit {
    #[default]
    Minutes,
    Seconds,
}

/// CLI overrides. All fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone)]
#[command(name = "octomons", version, about = "OctoMonS - print job status on a tiny OLED")]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(short = 'c', long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    /// Enable debug log level
    #[arg(short = 'v', long, alias = "verbose", action = ArgAction::SetTrue)]
    pub debug: bool,
    #[arg(long)]
    pub log_level: Option<String>,
    /// Milliseconds between display updates
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,
    /// Per-source fetch timeout in milliseconds
    #[arg(long)]
    pub fetch_timeout_ms: Option<u64>,
    /// Render to an in-memory display instead of the OLED
    #[arg(long, action = ArgAction::SetTrue)]
    pub headless: bool,
    /// I2C bus device path for the OLED display (e.g., /dev/i2c-1)
    #[arg(long)]
    pub i2c_bus: Option<String>,
    /// I2C address of the OLED, decimal or 0x-prefixed hex
    #[arg(long, value_parser = parse_i2c_address)]
    pub i2c_address: Option<u8>,
    #[arg(long)]
    pub display_width: Option<u32>,
    #[arg(long)]
    pub display_height: Option<u32>,
    #[arg(long)]
    pub display_rotate_deg: Option<u16>,
    #[arg(long, action = ArgAction::Set)]
    pub display_invert: Option<bool>,
    #[arg(long)]
    pub display_brightness: Option<u8>,
    /// Network interface whose IPv4 address is shown
    #[arg(short = 'i', long)]
    pub interface: Option<String>,
    /// OctoPrint base URL
    #[arg(short = 'u', long)]
    pub octoprint_url: Option<String>,
    /// OctoPrint application key
    #[arg(short = 'k', long, env = "OCTOPRINT_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
    /// draw the three-row wiring test pattern and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub test_pattern: bool,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

/// Fully resolved, immutable runtime settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub log_level: String,
    pub poll_interval: Duration,
    pub fetch_timeout: Duration,
    pub display: DisplaySettings,
    pub interface: String,
    pub thermal_path: PathBuf,
    pub octoprint: OctoPrintSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DisplaySettings {
    pub driver: DriverKind,
    pub width: u32,
    pub height: u32,
    pub rotate_deg: u16,
    pub invert: Option<bool>,
    pub brightness: Option<u8>,
    pub clear_on_exit: bool,
    pub bus: String,
    pub address: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OctoPrintSettings {
    pub base_url: Url,
    pub api_key: String,
    pub time_left_unit: TimeLeftUnit,
}

/// Merge YAML (explicit path or search) and CLI overrides, then validate.
pub fn load(cli: &Cli) -> Result<Config, ConfigError> {
    // 1) defaults are applied later by `resolve`
    let mut cfg = Config::default();

    // 2) YAML file
    if let Some(p) = cli.config.as_ref() {
        if p.exists() {
            let y = read_yaml(p)?;
            merge(&mut cfg, y);
        } else {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
    } else if let Some(p) = find_config_file() {
        let y = read_yaml(&p)?;
        merge(&mut cfg, y);
    }

    // 3) CLI overrides (highest precedence)
    apply_cli_overrides(&mut cfg, cli);

    // 4) Validate
    validate(&cfg)?;

    Ok(cfg)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    if let Some(home) = home_dir() {
        let p = home.join(".config/octomons/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/octomons.yaml");
        if p.exists() { return Some(p) }
    }
    for candidate in &["octomons.yaml", "config.yaml", "config/octomons.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

pub fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&s)?;
    Ok(cfg)
}

/// Shallow merge `src` into `dst`, Option-by-Option.
fn merge(dst: &mut Config, src: Config) {
    if src.log_level.is_some()         { dst.log_level = src.log_level; }
    if src.poll_interval_ms.is_some()  { dst.poll_interval_ms = src.poll_interval_ms; }
    if src.fetch_timeout_ms.is_some()  { dst.fetch_timeout_ms = src.fetch_timeout_ms; }
    match (&mut dst.display, src.display) {
        (None, Some(c)) => dst.display = Some(c),
        (Some(d), Some(s)) => merge_display(d, s),
        _ => {}
    }
    match (&mut dst.network, src.network) {
        (None, Some(c)) => dst.network = Some(c),
        (Some(d), Some(s)) => if s.interface.is_some() { d.interface = s.interface; },
        _ => {}
    }
    match (&mut dst.sensor, src.sensor) {
        (None, Some(c)) => dst.sensor = Some(c),
        (Some(d), Some(s)) => if s.thermal_path.is_some() { d.thermal_path = s.thermal_path; },
        _ => {}
    }
    match (&mut dst.octoprint, src.octoprint) {
        (None, Some(c)) => dst.octoprint = Some(c),
        (Some(d), Some(s)) => merge_octoprint(d, s),
        _ => {}
    }
}

fn merge_display(dst: &mut DisplayConfig, src: DisplayConfig) {
    if src.driver.is_some()        { dst.driver = src.driver; }
    if src.width.is_some()         { dst.width = src.width; }
    if src.height.is_some()        { dst.height = src.height; }
    if src.rotate_deg.is_some()    { dst.rotate_deg = src.rotate_deg; }
    if src.invert.is_some()        { dst.invert = src.invert; }
    if src.brightness.is_some()    { dst.brightness = src.brightness; }
    if src.clear_on_exit.is_some() { dst.clear_on_exit = src.clear_on_exit; }
    if src.bus.is_some()           { dst.bus = src.bus; }
}

fn merge_octoprint(dst: &mut OctoPrintConfig, src: OctoPrintConfig) {
    if src.base_url.is_some()       { dst.base_url = src.base_url; }
    if src.api_key.is_some()        { dst.api_key = src.api_key; }
    if src.time_left_unit.is_some() { dst.time_left_unit = src.time_left_unit; }
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.debug                       { cfg.log_level = Some("debug".into()); }
    if cli.log_level.is_some()         { cfg.log_level = cli.log_level.clone(); }
    if cli.poll_interval_ms.is_some()  { cfg.poll_interval_ms = cli.poll_interval_ms; }
    if cli.fetch_timeout_ms.is_some()  { cfg.fetch_timeout_ms = cli.fetch_timeout_ms; }

    let display = cfg.display.get_or_insert_with(DisplayConfig::default);
    if cli.headless                       { display.driver = Some(DriverKind::Headless); }
    if cli.display_width.is_some()        { display.width = cli.display_width; }
    if cli.display_height.is_some()       { display.height = cli.display_height; }
    if cli.display_rotate_deg.is_some()   { display.rotate_deg = cli.display_rotate_deg; }
    if cli.display_invert.is_some()       { display.invert = cli.display_invert; }
    if cli.display_brightness.is_some()   { display.brightness = cli.display_brightness; }
    if cli.i2c_bus.is_some() || cli.i2c_address.is_some() {
        let (bus, address) = match display.bus.take() {
            Some(BusConfig::I2c { bus, address }) => (bus, address),
            None => (DEFAULT_I2C_BUS.to_string(), DEFAULT_I2C_ADDRESS),
        };
        display.bus = Some(BusConfig::I2c {
            bus: cli.i2c_bus.clone().unwrap_or(bus),
            address: cli.i2c_address.unwrap_or(address),
        });
    }

    if let Some(iface) = cli.interface.as_ref() {
        cfg.network.get_or_insert_with(NetworkConfig::default).interface = Some(iface.clone());
    }
    if cli.octoprint_url.is_some() || cli.api_key.is_some() {
        let octo = cfg.octoprint.get_or_insert_with(OctoPrintConfig::default);
        if cli.octoprint_url.is_some() { octo.base_url = cli.octoprint_url.clone(); }
        if cli.api_key.is_some()       { octo.api_key = cli.api_key.clone(); }
    }
}

/// Put any invariants here (required fields, ranges, etc.)
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.poll_interval_ms == Some(0) {
        return Err(ConfigError::Validation("poll_interval_ms must be > 0".into()));
    }
    if cfg.fetch_timeout_ms == Some(0) {
        return Err(ConfigError::Validation("fetch_timeout_ms must be > 0".into()));
    }
    if let Some(display) = cfg.display.as_ref() {
        if display.width == Some(0) || display.height == Some(0) {
            return Err(ConfigError::Validation("display width/height must be > 0".into()));
        }
        if let Some(rot) = display.rotate_deg {
            match rot {
                0 | 90 | 180 | 270 => {},
                _ => return Err(ConfigError::Validation("display rotate_deg must be 0|90|180|270".into()))
            }
        }
        if let Some(BusConfig::I2c { bus, address }) = display.bus.as_ref() {
            if bus.is_empty() {
                return Err(ConfigError::Validation("display bus path must not be empty".into()));
            }
            if *address > 0x7F {
                return Err(ConfigError::Validation(format!(
                    "I2C address 0x{:02X} is not a 7-bit address", address
                )));
            }
        }
    }
    if let Some(iface) = cfg.network.as_ref().and_then(|n| n.interface.as_ref()) {
        if iface.trim().is_empty() {
            return Err(ConfigError::Validation("network interface must not be empty".into()));
        }
    }
    if let Some(url) = cfg.octoprint.as_ref().and_then(|o| o.base_url.as_ref()) {
        parse_base_url(url)?;
    }
    Ok(())
}

/// Parse the OctoPrint base URL; the path is kept as a prefix so the daemon
/// also works behind a reverse proxy sub-path.
fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(raw)
        .map_err(|e| ConfigError::Validation(format!("octoprint base_url '{}': {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" => {},
        other => return Err(ConfigError::Validation(format!(
            "octoprint base_url scheme must be http or https, got '{}'", other
        ))),
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn parse_i2c_address(s: &str) -> Result<u8, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse::<u8>(),
    };
    parsed.map_err(|e| format!("invalid I2C address '{}': {}", s, e))
}

impl Config {
    /// Fill defaults and freeze into `Settings`.
    pub fn resolve(&self) -> Result<Settings, ConfigError> {
        validate(self)?;

        let poll_ms = self.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS);
        let fetch_ms = self.fetch_timeout_ms
            .unwrap_or(MAX_FETCH_TIMEOUT_MS)
            .min(poll_ms / 2)
            .max(1);

        let d = self.display.clone().unwrap_or_default();
        let (bus, address) = match d.bus {
            Some(BusConfig::I2c { bus, address }) => (bus, address),
            None => (DEFAULT_I2C_BUS.to_string(), DEFAULT_I2C_ADDRESS),
        };
        let display = DisplaySettings {
            driver: d.driver.unwrap_or(DriverKind::Ssd1306),
            width: d.width.unwrap_or(DEFAULT_WIDTH),
            height: d.height.unwrap_or(DEFAULT_HEIGHT),
            rotate_deg: d.rotate_deg.unwrap_or(0),
            invert: d.invert,
            brightness: d.brightness,
            clear_on_exit: d.clear_on_exit.unwrap_or(true),
            bus,
            address,
        };

        let octo = self.octoprint.clone().unwrap_or_default();
        let octoprint = OctoPrintSettings {
            base_url: parse_base_url(octo.base_url.as_deref().unwrap_or(DEFAULT_OCTOPRINT_URL))?,
            api_key: octo.api_key.unwrap_or_default(),
            time_left_unit: octo.time_left_unit.unwrap_or_default(),
        };

        Ok(Settings {
            log_level: self.log_level.clone().unwrap_or_else(|| "info".into()),
            poll_interval: Duration::from_millis(poll_ms),
            fetch_timeout: Duration::from_millis(fetch_ms),
            display,
            interface: self.network.as_ref()
                .and_then(|n| n.interface.clone())
                .unwrap_or_else(|| DEFAULT_INTERFACE.to_string()),
            thermal_path: self.sensor.as_ref()
                .and_then(|s| s.thermal_path.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_THERMAL_PATH)),
            octoprint,
        })
    }
}
