/*
 *  sources.rs
 *
 *  OctoMonS - print status at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  The three independent data sources sampled every cycle
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

use std::future::Future;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::config::Settings;
use crate::metrics;
use crate::octoprint::{OctoPrintClient, OctoPrintError};
use crate::status::JobStatus;

/// A per-cycle, per-source failure. Never fatal: the field is shown as
/// unavailable for that cycle only.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("interface {interface} unavailable: {reason}")]
    InterfaceUnavailable { interface: String, reason: String },
    #[error("temperature sensor unavailable: {0}")]
    SensorUnavailable(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("authorization rejected (HTTP {0})")]
    Auth(u16),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("no answer within {0:?}")]
    Timeout(Duration),
}

impl From<OctoPrintError> for SourceError {
    fn from(err: OctoPrintError) -> Self {
        match err {
            OctoPrintError::Request(e) => SourceError::Network(e.to_string()),
            OctoPrintError::Unauthorized(status) => SourceError::Auth(status),
            OctoPrintError::UnexpectedStatus(status) => {
                SourceError::Protocol(format!("unexpected HTTP status {}", status))
            }
            OctoPrintError::Body(e) => SourceError::Protocol(e.to_string()),
            e @ (OctoPrintError::InvalidApiKey | OctoPrintError::InvalidUrl(_)) => {
                SourceError::Protocol(e.to_string())
            }
        }
    }
}

/// The metric providers the poll loop samples.
///
/// Each method is its own failure domain; the loop wraps every call in a
/// timeout and never lets one failure affect the others.
pub trait MetricSources {
    fn local_ip(&self) -> impl Future<Output = Result<Ipv4Addr, SourceError>> + Send;
    fn cpu_temperature(&self) -> impl Future<Output = Result<f64, SourceError>> + Send;
    fn job_status(&self) -> impl Future<Output = Result<JobStatus, SourceError>> + Send;
}

/// Production sources: kernel interface table, sysfs thermal zone, OctoPrint.
#[derive(Debug)]
pub struct SystemSources {
    interface: String,
    thermal_path: PathBuf,
    octoprint: OctoPrintClient,
}

impl SystemSources {
    pub fn new(interface: &str, thermal_path: PathBuf, octoprint: OctoPrintClient) -> Self {
        Self {
            interface: interface.to_string(),
            thermal_path,
            octoprint,
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, OctoPrintError> {
        let client = OctoPrintClient::new(&settings.octoprint, settings.fetch_timeout)?;
        Ok(Self::new(&settings.interface, settings.thermal_path.clone(), client))
    }
}

impl MetricSources for SystemSources {
    async fn local_ip(&self) -> Result<Ipv4Addr, SourceError> {
        metrics::interface_ipv4(&self.interface)
    }

    async fn cpu_temperature(&self) -> Result<f64, SourceError> {
        metrics::read_cpu_temperature(&self.thermal_path).await
    }

    async fn job_status(&self) -> Result<JobStatus, SourceError> {
        Ok(self.octoprint.job_status().await?)
    }
}
