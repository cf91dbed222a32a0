/*
 *  status.rs
 *
 *  OctoMonS - print status at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  Raw readings to display text
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

use std::net::Ipv4Addr;

const NOT_AVAILABLE: &str = "N/A";
const NO_JOB: &str = "None";
const NO_TIME_LEFT: &str = "000:00";

/// Print job progress as reported by OctoPrint; `None` means no active job.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct JobStatus {
    pub completion_pct: Option<f64>,
    pub time_left_min: Option<i64>,
}

/// One cycle's worth of readings. Any field may be absent.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawMetrics {
    pub ip_address: Option<Ipv4Addr>,
    pub cpu_temperature_c: Option<f64>,
    pub job_completion_pct: Option<f64>,
    pub job_time_left_min: Option<i64>,
}

impl RawMetrics {
    pub fn with_job(mut self, job: Option<JobStatus>) -> Self {
        let job = job.unwrap_or_default();
        self.job_completion_pct = job.completion_pct;
        self.job_time_left_min = job.time_left_min;
        self
    }
}

/// The four strings drawn on the panel.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DisplayModel {
    pub line1: String,
    pub line2: String,
    pub line3_left: String,
    pub line3_right: String,
}

/// 45.06 -> "45.1°C"
pub fn format_temperature(celsius: Option<f64>) -> String {
    match celsius.filter(|c| c.is_finite()) {
        Some(c) => format!("{:.1}\u{00B0}C", c),
        None => NOT_AVAILABLE.to_string(),
    }
}

pub fn format_ip(ip: Option<Ipv4Addr>) -> String {
    ip.map_or_else(|| NOT_AVAILABLE.to_string(), |ip| ip.to_string())
}

/// Rounded to the nearest whole percent, halves to even; 0 % is a real job, not "None".
pub fn format_completion(pct: Option<f64>) -> String {
    match pct.filter(|p| p.is_finite()) {
        Some(p) => format!("{}%", p.round_ties_even() as i64),
        None => NO_JOB.to_string(),
    }
}

/// Minutes to HH:MM; hours are not wrapped at 24.
pub fn format_time_left(minutes: Option<i64>) -> String {
    match minutes {
        Some(m) => {
            let m = m.max(0);
            format!("{:02}:{:02}", m / 60, m % 60)
        }
        None => NO_TIME_LEFT.to_string(),
    }
}

/// Total and pure: every field of the model is always set.
pub fn format_status(raw: &RawMetrics) -> DisplayModel {
    DisplayModel {
        line1: format!("CPU Temp: {}", format_temperature(raw.cpu_temperature_c)),
        line2: format!("IP: {}", format_ip(raw.ip_address)),
        line3_left: format!("Job: {}", format_completion(raw.job_completion_pct)),
        line3_right: format!("Rem: {}", format_time_left(raw.job_time_left_min)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_to_end_model() {
        let raw = RawMetrics {
            ip_address: Some(Ipv4Addr::new(192, 168, 1, 42)),
            cpu_temperature_c: Some(51.3),
            job_completion_pct: Some(37.2),
            job_time_left_min: Some(125),
        };
        let model = format_status(&raw);
        assert_eq!(model.line1, "CPU Temp: 51.3°C");
        assert_eq!(model.line2, "IP: 192.168.1.42");
        assert_eq!(model.line3_left, "Job: 37%");
        assert_eq!(model.line3_right, "Rem: 02:05");
    }

    #[test]
    fn test_time_left() {
        assert_eq!(format_time_left(Some(90)), "01:30");
        assert_eq!(format_time_left(Some(0)), "00:00");
        assert_eq!(format_time_left(None), "000:00");
        assert_eq!(format_time_left(Some(25 * 60 + 7)), "25:07");
        assert_eq!(format_time_left(Some(6000)), "100:00");
        assert_eq!(format_time_left(Some(-5)), "00:00");
    }

    #[test]
    fn test_completion() {
        assert_eq!(format_completion(Some(0.0)), "0%");
        assert_eq!(format_completion(Some(99.6)), "100%");
        assert_eq!(format_completion(Some(37.2)), "37%");
        assert_eq!(format_completion(Some(0.5)), "0%");
        assert_eq!(format_completion(Some(2.5)), "2%");
        assert_eq!(format_completion(Some(36.5)), "36%");
        assert_eq!(format_completion(Some(37.5)), "38%");
        assert_eq!(format_completion(None), "None");
        assert_eq!(format_completion(Some(f64::NAN)), "None");
    }

    #[test]
    fn test_temperature() {
        assert_eq!(format_temperature(Some(45.06)), "45.1°C");
        assert_eq!(format_temperature(Some(51.3)), "51.3°C");
        assert_eq!(format_temperature(None), "N/A");
    }

    #[test]
    fn test_every_absent_subset_is_fully_formatted() {
        for mask in 0u8..16 {
            let raw = RawMetrics {
                ip_address: (mask & 1 != 0).then(|| Ipv4Addr::new(10, 0, 0, 1)),
                cpu_temperature_c: (mask & 2 != 0).then_some(40.0),
                job_completion_pct: (mask & 4 != 0).then_some(12.5),
                job_time_left_min: (mask & 8 != 0).then_some(61),
            };
            let model = format_status(&raw);
            for line in [&model.line1, &model.line2, &model.line3_left, &model.line3_right] {
                let value = line.split_once(": ").map(|(_, v)| v).unwrap_or("");
                assert!(!value.is_empty(), "mask {mask:04b} left {line:?} without a value");
            }
        }
    }

    #[test]
    fn test_unreachable_printer_degrades_only_job_fields() {
        let raw = RawMetrics {
            ip_address: Some(Ipv4Addr::new(192, 168, 1, 42)),
            cpu_temperature_c: Some(48.0),
            ..Default::default()
        }.with_job(None);
        let model = format_status(&raw);
        assert_eq!(model.line1, "CPU Temp: 48.0°C");
        assert_eq!(model.line2, "IP: 192.168.1.42");
        assert_eq!(model.line3_left, "Job: None");
        assert_eq!(model.line3_right, "Rem: 000:00");
    }
}
