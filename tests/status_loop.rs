/*
 *  tests/status_loop.rs
 *
 *  Integration tests for the poll loop against the headless panel
 *
 *  OctoMonS - print status at a glance
 *  (c) 2020-26 Stuart Hunter
 */

use std::net::Ipv4Addr;
use std::sync::Mutex;
use std::time::Duration;

use octomons::display::{render_status, DisplayDriver, DisplayDriverFactory, HeadlessDriver, PixelBuffer};
use octomons::poller::SourceKind;
use octomons::{format_status, Config, JobStatus, MetricSources, RawMetrics, SourceError, StatusPoller};
use tokio::sync::watch;

/// Scripted sources; each cycle pops the next job answer.
struct ScriptedSources {
    ip: Option<Ipv4Addr>,
    temp: Option<f64>,
    jobs: Mutex<Vec<Result<JobStatus, SourceError>>>,
    job_delay: Duration,
}

impl ScriptedSources {
    fn healthy() -> Self {
        Self {
            ip: Some(Ipv4Addr::new(192, 168, 1, 42)),
            temp: Some(51.3),
            jobs: Mutex::new(Vec::new()),
            job_delay: Duration::ZERO,
        }
    }
}

impl MetricSources for ScriptedSources {
    async fn local_ip(&self) -> Result<Ipv4Addr, SourceError> {
        self.ip.ok_or_else(|| SourceError::InterfaceUnavailable {
            interface: "wlan0".into(),
            reason: "down".into(),
        })
    }

    async fn cpu_temperature(&self) -> Result<f64, SourceError> {
        self.temp.ok_or_else(|| SourceError::SensorUnavailable("missing".into()))
    }

    async fn job_status(&self) -> Result<JobStatus, SourceError> {
        tokio::time::sleep(self.job_delay).await;
        self.jobs.lock().unwrap().pop().unwrap_or(Ok(JobStatus {
            completion_pct: Some(37.2),
            time_left_min: Some(125),
        }))
    }
}

fn headless_settings(yaml: &str) -> octomons::Settings {
    let cfg: Config = serde_yaml::from_str(yaml).unwrap();
    cfg.resolve().unwrap()
}

#[tokio::test]
async fn test_end_to_end_frame_matches_model() {
    let driver = HeadlessDriver::new(128, 32);
    let state = driver.state();
    let mut poller = StatusPoller::new(
        ScriptedSources::healthy(),
        Box::new(driver),
        Duration::from_secs(2),
        Duration::from_secs(1),
    );

    let report = poller.run_cycle().await;
    assert_eq!(report.model.line1, "CPU Temp: 51.3°C");
    assert_eq!(report.model.line2, "IP: 192.168.1.42");
    assert_eq!(report.model.line3_left, "Job: 37%");
    assert_eq!(report.model.line3_right, "Rem: 02:05");

    let expected = render_status(&report.model, 128, 32);
    assert_eq!(state.lock().unwrap().shown.as_ref(), Some(&expected));
}

#[tokio::test(start_paused = true)]
async fn test_slow_printer_only_blanks_job_fields() {
    let mut sources = ScriptedSources::healthy();
    sources.job_delay = Duration::from_secs(10);
    let driver = HeadlessDriver::new(128, 32);
    let mut poller = StatusPoller::new(sources, Box::new(driver), Duration::from_secs(2), Duration::from_secs(1));

    let report = poller.run_cycle().await;
    assert_eq!(report.failed(), vec![SourceKind::Job]);
    assert!(report.committed);
    assert_eq!(report.model.line1, "CPU Temp: 51.3°C");
    assert_eq!(report.model.line2, "IP: 192.168.1.42");
    assert_eq!(report.model.line3_left, "Job: None");
    assert_eq!(report.model.line3_right, "Rem: 000:00");
}

#[tokio::test]
async fn test_everything_down_still_draws() {
    let sources = ScriptedSources {
        ip: None,
        temp: None,
        jobs: Mutex::new(vec![Err(SourceError::Network("connection refused".into()))]),
        job_delay: Duration::ZERO,
    };
    let driver = HeadlessDriver::new(128, 32);
    let state = driver.state();
    let mut poller = StatusPoller::new(sources, Box::new(driver), Duration::from_secs(2), Duration::from_secs(1));

    let report = poller.run_cycle().await;
    assert_eq!(report.failures.len(), 3);
    assert_eq!(report.model, format_status(&RawMetrics::default()));
    assert!(state.lock().unwrap().shown.as_ref().unwrap().count_on() > 0);
}

#[tokio::test]
async fn test_failure_is_forgotten_next_cycle() {
    let sources = ScriptedSources::healthy();
    sources.jobs.lock().unwrap().push(Err(SourceError::Auth(403)));
    let driver = HeadlessDriver::new(128, 32);
    let mut poller = StatusPoller::new(sources, Box::new(driver), Duration::from_secs(2), Duration::from_secs(1));

    assert_eq!(poller.run_cycle().await.model.line3_left, "Job: None");
    assert_eq!(poller.run_cycle().await.model.line3_left, "Job: 37%");
}

#[tokio::test(start_paused = true)]
async fn test_rotated_panel_from_settings() {
    let settings = headless_settings(
        "poll_interval_ms: 1000\ndisplay:\n  driver: headless\n  width: 128\n  height: 64\n  rotate_deg: 90\n",
    );
    assert_eq!(settings.fetch_timeout, Duration::from_millis(500));

    let display = DisplayDriverFactory::create_from_settings(&settings.display).unwrap();
    assert_eq!(display.canvas_size(), (64, 128));

    let mut poller = StatusPoller::from_settings(ScriptedSources::healthy(), display, &settings);
    let report = poller.run_cycle().await;
    assert!(report.committed);
}

#[tokio::test(start_paused = true)]
async fn test_loop_keeps_cadence_and_exits_cleanly() {
    let driver = HeadlessDriver::new(128, 32);
    let state = driver.state();
    let poller = StatusPoller::new(
        ScriptedSources::healthy(),
        Box::new(driver),
        Duration::from_secs(2),
        Duration::from_secs(1),
    );
    let (tx, rx) = watch::channel(false);
    let task = tokio::spawn(poller.run(rx));

    tokio::time::sleep(Duration::from_millis(9_500)).await;
    tx.send(true).unwrap();
    task.await.unwrap();

    let state = state.lock().unwrap();
    // start-up clear + cycles at 0, 2, 4, 6, 8 s + clear on exit
    assert_eq!(state.flush_count, 7);
    assert_eq!(state.shown.as_ref(), Some(&PixelBuffer::new(128, 32)));
}

#[tokio::test(start_paused = true)]
async fn test_slow_cycles_start_on_the_interval_grid() {
    let mut sources = ScriptedSources::healthy();
    sources.job_delay = Duration::from_millis(700);
    let driver = HeadlessDriver::new(128, 32);
    let state = driver.state();
    let poller = StatusPoller::new(sources, Box::new(driver), Duration::from_secs(2), Duration::from_secs(1))
        .with_clear_on_exit(false);
    let (tx, rx) = watch::channel(false);
    let task = tokio::spawn(poller.run(rx));

    tokio::time::sleep(Duration::from_millis(6_500)).await;
    tx.send(true).unwrap();
    task.await.unwrap();

    // start-up clear + cycles starting at 0, 2, 4, 6 s; the wait absorbs the
    // 0.7 s each fetch takes
    assert_eq!(state.lock().unwrap().flush_count, 5);
}

#[test]
fn test_pbm_snapshot_of_a_status_frame() {
    let model = format_status(&RawMetrics {
        ip_address: Some(Ipv4Addr::new(10, 0, 0, 7)),
        cpu_temperature_c: Some(45.06),
        ..Default::default()
    });
    let frame = render_status(&model, 128, 32);

    let file = tempfile::NamedTempFile::new().unwrap();
    frame.write_pbm(file.as_file()).unwrap();
    let text = std::fs::read_to_string(file.path()).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("P1"));
    assert_eq!(lines.next(), Some("128 32"));
    assert_eq!(lines.count(), 32);
}
