/*
 *  lib.rs
 *
 *  OctoMonS - print status at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Library root, the daemon binary and the integration tests build on this
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

pub mod config;
pub mod display;
pub mod metrics;
pub mod octoprint;
pub mod poller;
pub mod shutdown;
pub mod sources;
pub mod status;

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

pub use config::{Config, ConfigError, Settings};
pub use poller::{CycleReport, StatusPoller};
pub use sources::{MetricSources, SourceError, SystemSources};
pub use status::{DisplayModel, JobStatus, RawMetrics, format_status};
