use std::path::Path;

use chrono::{DateTime, Utc};
use console::{style, StyledObject};

use uptime_core::{
    MonitorConfig, StatusSummary, StatusTone, TargetView, TransitionEvent, TransitionKind,
};

const RULE_WIDTH: usize = 64;

fn on_off(flag: bool) -> StyledObject<&'static str> {
    if flag {
        style("on").green()
    } else {
        style("off").dim()
    }
}

pub fn banner(store: &Path, config: &MonitorConfig) -> Vec<String> {
    let monitored = config.targets.iter().filter(|t| t.monitor_enabled).count();
    vec![
        format!(
            "{} {}",
            style("uptime-monitor").bold(),
            style(env!("CARGO_PKG_VERSION")).dim()
        ),
        format!("  {} {}", style("store:   ").dim(), style(store.display()).bold()),
        format!(
            "  {} {}/{} monitored",
            style("targets: ").dim(),
            monitored,
            config.targets.len()
        ),
        format!("  {} {}s", style("interval:").dim(), config.check_interval_seconds),
        format!("  {} {}s", style("cooldown:").dim(), config.alert_cooldown_seconds),
        format!(
            "  {} {}",
            style("notify:  ").dim(),
            on_off(config.notifications_enabled)
        ),
        String::new(),
        format!("{}", style("Press Ctrl+C to stop").dim()),
        String::new(),
    ]
}

fn status_cell(view: &TargetView) -> String {
    let text = format!("{:<18}", view.display);
    let styled = if !view.monitor_enabled || view.status.is_unknown() {
        style(text).dim()
    } else {
        match view.tone {
            StatusTone::Up => style(text).green(),
            StatusTone::Down => style(text).red().bold(),
            StatusTone::Uncertain => style(text).yellow(),
        }
    };
    styled.to_string()
}

pub fn target_table(targets: &[TargetView]) -> String {
    let mut lines = vec![style(format!(
        "  {:<16} {:<18} {:<8} {}",
        "NAME", "STATUS", "MONITOR", "URL"
    ))
    .dim()
    .to_string()];

    if targets.is_empty() {
        lines.push(format!("  {}", style("No targets configured").dim()));
    }
    for t in targets {
        let monitor = if t.monitor_enabled {
            style(format!("{:<8}", "on")).green()
        } else {
            style(format!("{:<8}", "off")).dim()
        };
        lines.push(format!(
            "  {:<16} {} {} {}",
            t.name,
            status_cell(t),
            monitor,
            style(&t.url).dim()
        ));
    }
    lines.join("\n")
}

pub fn headline(summary: &StatusSummary) -> String {
    let text = summary.headline();
    if summary.problems > 0 {
        style(text).red().bold().to_string()
    } else if summary.monitored > 0 && summary.online == summary.monitored {
        style(text).green().to_string()
    } else {
        text
    }
}

fn separator(last_sweep: Option<DateTime<Utc>>) -> String {
    let label = last_sweep
        .map(|t| format!(" sweep {} ", t.format("%H:%M:%S")))
        .unwrap_or_default();
    let width = RULE_WIDTH.saturating_sub(label.len());
    format!(
        "{}{}{}",
        style("──").dim(),
        style(label).dim().bold(),
        style("─".repeat(width)).dim()
    )
}

/// Live block redrawn under the transition log.
pub fn status_block(
    targets: &[TargetView],
    summary: &StatusSummary,
    last_sweep: Option<DateTime<Utc>>,
) -> String {
    let mut out = vec![separator(last_sweep)];
    if last_sweep.is_none() {
        out.push(format!("  {}", style("Waiting for first sweep...").dim()));
    } else {
        out.push(target_table(targets));
        out.push(format!("  {}", headline(summary)));
    }
    out.join("\n")
}

pub fn transition_line(event: &TransitionEvent) -> String {
    let kind = match event.kind() {
        Some(kind) => {
            let label = format!("{:<10}", kind.to_string());
            match kind {
                TransitionKind::Recovery => style(label).green().bold(),
                TransitionKind::Problem => style(label).red().bold(),
            }
        }
        None => style(format!("{:<10}", "CHANGED")).dim(),
    };
    format!(
        "  {}  {} {}  {} {} {}",
        style(event.timestamp.format("%H:%M:%S")).dim(),
        kind,
        style(&event.target_name).bold(),
        event.previous_status,
        style("→").dim(),
        event.new_status
    )
}

pub fn settings_block(config: &MonitorConfig) -> String {
    [
        format!("  {} {}s", style("check interval:").dim(), config.check_interval_seconds),
        format!("  {} {}s", style("alert cooldown:").dim(), config.alert_cooldown_seconds),
        format!("  {} {}", style("notifications: ").dim(), on_off(config.notifications_enabled)),
        format!("  {} {}", style("vibration:     ").dim(), on_off(config.vibration_enabled)),
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use uptime_core::{StatusValue, Target};

    fn plain() {
        console::set_colors_enabled(false);
    }

    fn view(name: &str, status: StatusValue, enabled: bool) -> TargetView {
        let mut target = Target::new(name, format!("https://{}.example", name)).with_monitor(enabled);
        target.status = status;
        TargetView::new(&target, None)
    }

    #[test]
    fn table_lists_every_target() {
        plain();
        let table = target_table(&[
            view("api", StatusValue::Online, true),
            view("cdn", StatusValue::HttpError(502), false),
        ]);
        let lines: Vec<_> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("NAME"));
        assert!(lines[1].contains("api") && lines[1].contains("online") && lines[1].contains("on"));
        assert!(lines[2].contains("HTTP 502") && lines[2].contains("off"));
        assert!(lines[2].ends_with("https://cdn.example"));
    }

    #[test]
    fn transition_line_shows_both_statuses() {
        plain();
        let ev = TransitionEvent::new("api", StatusValue::Timeout, StatusValue::Online, Utc::now());
        let line = transition_line(&ev);
        assert!(line.contains("RECOVERED"));
        assert!(line.contains("api  timeout → online"), "{}", line);
    }

    #[test]
    fn block_waits_for_first_sweep() {
        plain();
        let block = status_block(&[], &StatusSummary::default(), None);
        assert!(block.contains("Waiting for first sweep"));

        let block = status_block(&[], &StatusSummary::default(), Some(Utc::now()));
        assert!(block.contains(" sweep "));
        assert!(block.contains("Online: 0/0"));
    }

    #[test]
    fn settings_render_flags() {
        plain();
        let config = MonitorConfig::default().with_check_interval(30);
        let text = settings_block(&config);
        assert!(text.contains("check interval: 30s"));
        assert!(text.contains("notifications:  on"));
    }
}
