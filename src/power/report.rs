//! Power operation reports

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Power operation requested for a set of nodes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerAction {
    Stop,
    Start,
    Restart,
}

impl PowerAction {
    pub fn name(&self) -> &'static str {
        match self {
            PowerAction::Stop => "stop",
            PowerAction::Start => "start",
            PowerAction::Restart => "restart",
        }
    }
}

impl fmt::Display for PowerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which operation family handled the nodes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerMode {
    /// libvirt domains driven through `virsh`
    Virtualized,
    /// Nodes driven through the service controller
    Generic,
}

impl PowerMode {
    pub fn from_flag(virtualized: bool) -> Self {
        if virtualized {
            PowerMode::Virtualized
        } else {
            PowerMode::Generic
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PowerMode::Virtualized => "virtualized",
            PowerMode::Generic => "generic",
        }
    }
}

impl fmt::Display for PowerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of a completed power operation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PowerReport {
    pub action: PowerAction,
    pub mode: PowerMode,
    pub nodes: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl PowerReport {
    pub fn new(
        action: PowerAction,
        mode: PowerMode,
        nodes: Vec<String>,
        started_at: DateTime<Utc>,
        elapsed: Duration,
    ) -> Self {
        Self {
            action,
            mode,
            nodes,
            started_at,
            duration_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

impl fmt::Display for PowerReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {} node(s): {} ({:.1}s, started {})",
            self.action,
            self.mode,
            self.nodes.len(),
            self.nodes.join(", "),
            self.duration_ms as f64 / 1000.0,
            self.started_at.format("%Y-%m-%d %H:%M:%S UTC")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_mode_from_flag() {
        assert_eq!(PowerMode::from_flag(true), PowerMode::Virtualized);
        assert_eq!(PowerMode::from_flag(false), PowerMode::Generic);
    }

    #[test]
    fn test_report_display() {
        let started = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let report = PowerReport::new(
            PowerAction::Restart,
            PowerMode::Virtualized,
            vec!["worker-0".to_string(), "worker-1".to_string()],
            started,
            Duration::from_millis(1500),
        );

        assert_eq!(
            report.to_string(),
            "restart [virtualized] 2 node(s): worker-0, worker-1 (1.5s, started 2024-05-01 12:00:00 UTC)"
        );
    }

    #[test]
    fn test_report_json() {
        let report = PowerReport::new(
            PowerAction::Stop,
            PowerMode::Generic,
            vec!["master-0".to_string()],
            Utc::now(),
            Duration::ZERO,
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["action"], "stop");
        assert_eq!(json["mode"], "generic");
    }

    #[test]
    fn test_report_duration_saturates() {
        let report = PowerReport::new(
            PowerAction::Start,
            PowerMode::Generic,
            Vec::new(),
            Utc::now(),
            Duration::MAX,
        );
        assert_eq!(report.duration_ms, u64::MAX);
    }
}
