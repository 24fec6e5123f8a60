use std::fmt::{Display, Write};

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use chrono::Utc;

use uptime_core::SchedulerState;

use crate::state::AppState;

/// Minimal OpenMetrics text writer.
struct Exposition {
    out: String,
}

impl Exposition {
    fn new() -> Self {
        Self {
            out: String::with_capacity(2048),
        }
    }

    fn family(&mut self, name: &str, kind: &str, help: &str) {
        let _ = writeln!(self.out, "# TYPE {} {}", name, kind);
        let _ = writeln!(self.out, "# HELP {} {}", name, help);
    }

    fn sample(&mut self, name: &str, labels: &[(&str, &str)], value: impl Display) {
        self.out.push_str(name);
        if !labels.is_empty() {
            self.out.push('{');
            for (i, (k, v)) in labels.iter().enumerate() {
                if i > 0 {
                    self.out.push(',');
                }
                let _ = write!(self.out, "{}=\"{}\"", k, escape_label(v));
            }
            self.out.push('}');
        }
        let _ = writeln!(self.out, " {}", value);
    }

    fn finish(mut self) -> String {
        self.out.push_str("# EOF\n");
        self.out
    }
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

fn seconds(t: chrono::DateTime<Utc>) -> f64 {
    t.timestamp_millis() as f64 / 1000.0
}

pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    let monitor = &state.monitor;
    let targets = monitor.targets().await;
    let summary = monitor.summary().await;
    let scheduler = monitor.state().await;
    let mut m = Exposition::new();

    m.family("uptime_monitor_info", "info", "Information about the uptime monitor");
    let created = monitor.created_at().to_rfc3339();
    m.sample(
        "uptime_monitor_info",
        &[("version", env!("CARGO_PKG_VERSION")), ("created", created.as_str())],
        1,
    );

    m.family("uptime_scheduler_state", "stateset", "Current scheduler state");
    for variant in [SchedulerState::Stopped, SchedulerState::Running] {
        let label = variant.to_string();
        m.sample(
            "uptime_scheduler_state",
            &[("state", label.as_str())],
            u8::from(variant == scheduler),
        );
    }

    m.family("uptime_targets", "gauge", "Configured targets");
    m.sample("uptime_targets", &[], targets.len());

    m.family("uptime_targets_monitored", "gauge", "Targets with monitoring enabled");
    m.sample("uptime_targets_monitored", &[], summary.monitored);

    m.family("uptime_targets_online", "gauge", "Monitored targets currently online");
    m.sample("uptime_targets_online", &[], summary.online);

    m.family("uptime_targets_problems", "gauge", "Monitored targets currently failing");
    m.sample("uptime_targets_problems", &[], summary.problems);

    m.family(
        "uptime_target_up",
        "gauge",
        "1 if the target answered 200 on its last probe, 0 if it failed",
    );
    for t in targets
        .iter()
        .filter(|t| t.monitor_enabled && !t.status.is_unknown())
    {
        m.sample(
            "uptime_target_up",
            &[
                ("target_name", t.name.as_str()),
                ("url", t.url.as_str()),
                ("status", t.display.as_str()),
            ],
            u8::from(t.status.is_online()),
        );
    }

    m.family(
        "uptime_target_last_alert_timestamp_seconds",
        "gauge",
        "Unix timestamp of the last delivered alert per target",
    );
    for t in &targets {
        if let Some(at) = t.last_alert {
            m.sample(
                "uptime_target_last_alert_timestamp_seconds",
                &[("target_name", t.name.as_str())],
                format!("{:.3}", seconds(at)),
            );
        }
    }

    m.family(
        "uptime_last_sweep_timestamp_seconds",
        "gauge",
        "Unix timestamp of the last sweep",
    );
    if let Some(at) = monitor.last_sweep().await {
        m.sample(
            "uptime_last_sweep_timestamp_seconds",
            &[],
            format!("{:.3}", seconds(at)),
        );
    }

    m.family("uptime_transitions", "counter", "Alerts emitted since startup");
    m.sample("uptime_transitions_total", &[], monitor.transitions_total());

    m.family("uptime_monitor_uptime_seconds", "gauge", "Time since the monitor was created");
    let uptime = (Utc::now() - monitor.created_at()).num_milliseconds() as f64 / 1000.0;
    m.sample("uptime_monitor_uptime_seconds", &[], format!("{:.3}", uptime));

    (
        [(
            header::CONTENT_TYPE,
            "application/openmetrics-text; version=1.0.0; charset=utf-8",
        )],
        m.finish(),
    )
}
