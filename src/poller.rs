/*
 *  poller.rs
 *
 *  OctoMonS - print status at a glance
 *  (c) 2020-26 Stuart Hunter
 *
 *  The sample, format, render, commit loop
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

use log::{debug, error, info, warn};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep, timeout, Instant};

use crate::config::Settings;
use crate::display::{render_status, BoxedDriver, DisplayDriver};
use crate::sources::{MetricSources, SourceError};
use crate::status::{format_status, DisplayModel, JobStatus, RawMetrics};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Ip,
    CpuTemperature,
    Job,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Ip => write!(f, "ip"),
            SourceKind::CpuTemperature => write!(f, "cpu temperature"),
            SourceKind::Job => write!(f, "job"),
        }
    }
}

/// What happened during one cycle. Not retained between cycles.
#[derive(Debug)]
pub struct CycleReport {
    pub raw: RawMetrics,
    pub model: DisplayModel,
    pub failures: Vec<(SourceKind, SourceError)>,
    pub committed: bool,
    pub elapsed: Duration,
}

impl CycleReport {
    pub fn failed(&self) -> Vec<SourceKind> {
        self.failures.iter().map(|(kind, _)| *kind).collect()
    }
}

/// Runs a fetch under its own deadline; expiry fails that source only.
async fn bounded<T, F>(limit: Duration, fetch: F) -> Result<T, SourceError>
where
    F: Future<Output = Result<T, SourceError>>,
{
    timeout(limit, fetch).await.unwrap_or(Err(SourceError::Timeout(limit)))
}

fn keep<T>(
    kind: SourceKind,
    result: Result<T, SourceError>,
    failures: &mut Vec<(SourceKind, SourceError)>,
) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            warn!("{} unavailable: {}", kind, e);
            failures.push((kind, e));
            None
        }
    }
}

/// Owns the panel and the sources; one instance per process.
pub struct StatusPoller<S: MetricSources> {
    sources: S,
    display: BoxedDriver,
    interval: Duration,
    fetch_timeout: Duration,
    clear_on_exit: bool,
}

impl<S: MetricSources> StatusPoller<S> {
    pub fn new(sources: S, display: BoxedDriver, interval: Duration, fetch_timeout: Duration) -> Self {
        Self {
            sources,
            display,
            interval,
            fetch_timeout,
            clear_on_exit: true,
        }
    }

    pub fn from_settings(sources: S, display: BoxedDriver, settings: &Settings) -> Self {
        Self::new(sources, display, settings.poll_interval, settings.fetch_timeout)
            .with_clear_on_exit(settings.display.clear_on_exit)
    }

    pub fn with_clear_on_exit(mut self, clear: bool) -> Self {
        self.clear_on_exit = clear;
        self
    }

    pub fn display(&self) -> &dyn DisplayDriver {
        self.display.as_ref()
    }

    /// One full cycle. Never fails: source and panel errors end up in the report.
    pub async fn run_cycle(&mut self) -> CycleReport {
        let start = Instant::now();
        let limit = self.fetch_timeout;

        let (ip, temp, job) = tokio::join!(
            bounded(limit, self.sources.local_ip()),
            bounded(limit, self.sources.cpu_temperature()),
            bounded(limit, self.sources.job_status()),
        );

        let mut failures = Vec::new();
        let raw = RawMetrics {
            ip_address: keep(SourceKind::Ip, ip, &mut failures),
            cpu_temperature_c: keep(SourceKind::CpuTemperature, temp, &mut failures),
            ..Default::default()
        }
        .with_job(keep::<JobStatus>(SourceKind::Job, job, &mut failures));

        let model = format_status(&raw);
        let (w, h) = self.display.canvas_size();
        let frame = render_status(&model, w, h);

        let committed = match self.display.commit(&frame) {
            Ok(()) => true,
            Err(e) => {
                error!("Frame skipped, display commit failed: {}", e);
                false
            }
        };

        let elapsed = start.elapsed();
        debug!("cycle {:?}: {:?} / {:?} / {:?} / {:?}",
            elapsed, model.line1, model.line2, model.line3_left, model.line3_right);

        CycleReport { raw, model, failures, committed, elapsed }
    }

    /// Polls until `shutdown` turns true or its sender goes away.
    ///
    /// Only the wait between cycles is interrupted; a cycle in progress runs to
    /// completion first. Updates that leave the flag false keep the current
    /// wait going.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("Polling every {:?}, fetch timeout {:?}", self.interval, self.fetch_timeout);

        if let Err(e) = self.display.clear() {
            error!("Start-up clear failed: {}", e);
        }

        while !*shutdown.borrow() {
            let report = self.run_cycle().await;
            let wait = self.interval.saturating_sub(report.elapsed);

            // an error means the sender is gone, nobody left to tell us to stop
            let stop = tokio::select! {
                _ = sleep(wait) => false,
                _ = shutdown.wait_for(|&stop| stop) => true,
            };
            if stop {
                break;
            }
        }

        info!("Polling stopped");
        if self.clear_on_exit {
            if let Err(e) = self.display.clear() {
                warn!("Clear on exit failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::{HeadlessDriver, HeadlessState};
    use std::net::Ipv4Addr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct FakeSources {
        hang_job: bool,
        no_sensor: bool,
        calls: AtomicUsize,
    }

    impl MetricSources for FakeSources {
        async fn local_ip(&self) -> Result<Ipv4Addr, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Ipv4Addr::new(192, 168, 1, 42))
        }

        async fn cpu_temperature(&self) -> Result<f64, SourceError> {
            if self.no_sensor {
                return Err(SourceError::SensorUnavailable("gone".into()));
            }
            Ok(51.3)
        }

        async fn job_status(&self) -> Result<JobStatus, SourceError> {
            if self.hang_job {
                std::future::pending::<()>().await;
            }
            Ok(JobStatus { completion_pct: Some(37.2), time_left_min: Some(125) })
        }
    }

    fn poller(sources: FakeSources) -> (StatusPoller<FakeSources>, Arc<Mutex<HeadlessState>>) {
        let driver = HeadlessDriver::new(128, 32);
        let state = driver.state();
        let p = StatusPoller::new(sources, Box::new(driver), Duration::from_secs(2), Duration::from_secs(1));
        (p, state)
    }

    #[tokio::test]
    async fn test_cycle_all_sources() {
        let (mut p, state) = poller(FakeSources::default());
        let report = p.run_cycle().await;

        assert!(report.failures.is_empty());
        assert!(report.committed);
        assert_eq!(report.model.line1, "CPU Temp: 51.3°C");
        assert_eq!(report.model.line3_right, "Rem: 02:05");

        let shown = state.lock().unwrap().shown.clone().unwrap();
        assert_eq!(shown, render_status(&report.model, 128, 32));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_job_source_times_out_alone() {
        let (mut p, _state) = poller(FakeSources { hang_job: true, ..Default::default() });
        let report = p.run_cycle().await;

        assert_eq!(report.failed(), vec![SourceKind::Job]);
        assert!(matches!(report.failures[0].1, SourceError::Timeout(_)));
        assert_eq!(report.model.line1, "CPU Temp: 51.3°C");
        assert_eq!(report.model.line2, "IP: 192.168.1.42");
        assert_eq!(report.model.line3_left, "Job: None");
        assert_eq!(report.model.line3_right, "Rem: 000:00");
        assert!(report.elapsed >= Duration::from_secs(1));
        assert!(report.elapsed < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_sensor_failure_degrades_one_line() {
        let (mut p, _state) = poller(FakeSources { no_sensor: true, ..Default::default() });
        let report = p.run_cycle().await;
        assert_eq!(report.failed(), vec![SourceKind::CpuTemperature]);
        assert_eq!(report.model.line1, "CPU Temp: N/A");
        assert_eq!(report.model.line3_left, "Job: 37%");
    }

    #[tokio::test]
    async fn test_commit_failure_skips_frame() {
        let (mut p, state) = poller(FakeSources::default());
        state.lock().unwrap().simulate_flush_failure = true;
        let report = p.run_cycle().await;
        assert!(!report.committed);
        assert!(state.lock().unwrap().shown.is_none());

        state.lock().unwrap().simulate_flush_failure = false;
        assert!(p.run_cycle().await.committed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_shutdown_and_clears() {
        let (p, state) = poller(FakeSources::default());
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(p.run(rx));
        sleep(Duration::from_millis(4500)).await;
        tx.send(true).unwrap();
        handle.await.unwrap();

        let state = state.lock().unwrap();
        // start-up clear, cycles at 0s 2s 4s, clear on exit
        assert_eq!(state.clear_count, 2);
        assert_eq!(state.flush_count, 5);
        assert_eq!(state.shown.as_ref().unwrap().count_on(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_sender_stops_loop() {
        let (p, state) = poller(FakeSources::default());
        let p = p.with_clear_on_exit(false);
        let (tx, rx) = watch::channel(false);
        drop(tx);

        p.run(rx).await;
        let state = state.lock().unwrap();
        assert_eq!(state.clear_count, 1);
        assert!(state.shown.as_ref().unwrap().count_on() > 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_cancelled_runs_no_cycle() {
        let (p, state) = poller(FakeSources::default());
        let (_tx, rx) = watch::channel(true);
        p.run(rx).await;

        let state = state.lock().unwrap();
        // start-up clear and clear on exit, nothing rendered in between
        assert_eq!(state.clear_count, 2);
        assert_eq!(state.flush_count, 2);
        assert_eq!(state.shown.as_ref().unwrap().count_on(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_false_updates_do_not_cut_the_wait() {
        let (p, state) = poller(FakeSources::default());
        let p = p.with_clear_on_exit(false);
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(p.run(rx));
        for _ in 0..5 {
            sleep(Duration::from_millis(980)).await;
            tx.send(false).unwrap();
        }
        tx.send(true).unwrap();
        handle.await.unwrap();

        // start-up clear, cycles at 0s 2s 4s only
        assert_eq!(state.lock().unwrap().flush_count, 4);
    }
}
