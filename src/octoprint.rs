/*
 *  octoprint.rs
 *
 *  OctoMonS - print status at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  OctoPrint REST client, job progress only
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

use reqwest::{Client, StatusCode, Url, header, Error as ReqwestError};
use serde::Deserialize;
use serde_json::Error as SerdeJsonError;
use std::fmt::{self, Display, Formatter};
use std::time::Duration;

use crate::config::{OctoPrintSettings, TimeLeftUnit};
use crate::status::JobStatus;

const JOB_ENDPOINT: &str = "api/job";
const API_KEY_HEADER: &str = "x-api-key";

/// Custom error type for OctoPrintClient operations.
#[derive(Debug)]
pub enum OctoPrintError {
    /// Error during the HTTP exchange (connect failure, timeout, bad URL).
    Request(ReqwestError),
    /// The server rejected the API key.
    Unauthorized(u16),
    /// Any other non-2xx answer.
    UnexpectedStatus(u16),
    /// The body was not the expected job document.
    Body(SerdeJsonError),
    /// The API key cannot be sent as an HTTP header value.
    InvalidApiKey,
    /// The job endpoint cannot be derived from the base URL.
    InvalidUrl(String),
}

impl Display for OctoPrintError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            OctoPrintError::Request(e) => write!(f, "HTTP request error: {}", e),
            OctoPrintError::Unauthorized(s) => write!(f, "OctoPrint rejected the API key (HTTP {})", s),
            OctoPrintError::UnexpectedStatus(s) => write!(f, "OctoPrint answered HTTP {}", s),
            OctoPrintError::Body(e) => write!(f, "JSON deserialization error: {}", e),
            OctoPrintError::InvalidApiKey => write!(f, "API key contains characters not allowed in a header"),
            OctoPrintError::InvalidUrl(e) => write!(f, "Invalid OctoPrint URL: {}", e),
        }
    }
}

impl std::error::Error for OctoPrintError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OctoPrintError::Request(e) => Some(e),
            OctoPrintError::Body(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ReqwestError> for OctoPrintError {
    fn from(err: ReqwestError) -> Self {
        OctoPrintError::Request(err)
    }
}

/// `GET /api/job` response, only the fields we display.
#[derive(Debug, Deserialize)]
struct JobResponse {
    progress: Progress,
}

#[derive(Debug, Deserialize)]
struct Progress {
    completion: Option<f64>,
    #[serde(rename = "printTimeLeft")]
    print_time_left: Option<f64>,
}

/// Parses a job document. Null progress fields mean no active job.
pub fn parse_job_status(body: &str, unit: TimeLeftUnit) -> Result<JobStatus, SerdeJsonError> {
    let job: JobResponse = serde_json::from_str(body)?;
    let time_left_min = job.progress.print_time_left
        .filter(|t| t.is_finite())
        .map(|t| match unit {
            TimeLeftUnit::Minutes => t.floor() as i64,
            TimeLeftUnit::Seconds => (t / 60.0).floor() as i64,
        });
    Ok(JobStatus {
        completion_pct: job.progress.completion.filter(|c| c.is_finite()),
        time_left_min,
    })
}

/// A client for the OctoPrint job endpoint with the API key and timeout baked in.
#[derive(Debug)]
pub struct OctoPrintClient {
    client: Client,
    job_url: Url,
    time_left_unit: TimeLeftUnit,
}

impl OctoPrintClient {
    /// Creates a client; `timeout` bounds the whole request.
    pub fn new(settings: &OctoPrintSettings, timeout: Duration) -> Result<Self, OctoPrintError> {
        const VERSION: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

        let mut api_key = header::HeaderValue::from_str(&settings.api_key)
            .map_err(|_| OctoPrintError::InvalidApiKey)?;
        api_key.set_sensitive(true);

        let mut headers = header::HeaderMap::new();
        headers.insert(header::USER_AGENT, header::HeaderValue::from_static(VERSION));
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
        headers.insert(header::CONNECTION, header::HeaderValue::from_static("close"));
        headers.insert(API_KEY_HEADER, api_key);

        let client = Client::builder()
            .http1_only()
            .connect_timeout(timeout)
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        // base_url always ends in '/', so the join keeps any proxy prefix
        let job_url = settings.base_url.join(JOB_ENDPOINT)
            .map_err(|e| OctoPrintError::InvalidUrl(e.to_string()))?;

        Ok(Self {
            client,
            job_url,
            time_left_unit: settings.time_left_unit,
        })
    }

    pub fn job_url(&self) -> &Url {
        &self.job_url
    }

    /// Fetches the current job progress.
    pub async fn job_status(&self) -> Result<JobStatus, OctoPrintError> {
        let response = self.client
            .get(self.job_url.clone())
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(OctoPrintError::Unauthorized(status.as_u16()));
        }
        if !status.is_success() {
            return Err(OctoPrintError::UnexpectedStatus(status.as_u16()));
        }

        let body = response.text().await?;
        parse_job_status(&body, self.time_left_unit).map_err(OctoPrintError::Body)
    }
}
