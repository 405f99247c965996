//! Rolling per-tool performance statistics.
//!
//! Tracks, per tool, a capped window of recent execution times plus
//! running success/total counts. Every recorded execution re-derives
//! the metrics snapshot, checks the degradation thresholds, and emits
//! [`RouterEvent::PerformanceDegraded`] / [`RouterEvent::PerformanceImproved`]
//! signals. A periodic [`analyze`](PerformanceMonitor::analyze) pass
//! additionally flags sustained degradation: a worsening latency trend
//! on a tool whose success rate is already below threshold.

use crate::events::{EventBus, RouterEvent};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use tracing::warn;

/// Size of the per-tool execution-time window.
const WINDOW_SIZE: usize = 100;

/// Samples per side of the trend comparison.
const TREND_SAMPLE: usize = 10;

/// Relative change in mean latency that counts as a trend.
const TREND_EPSILON: f64 = 0.10;

/// Success rate above which an improving trend is reported.
const IMPROVEMENT_SUCCESS_RATE: f64 = 90.0;

/// Latency direction over the recent window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    /// Mean latency is rising (worse).
    Up,
    /// Mean latency is falling (better).
    Down,
    /// No significant movement, or not enough samples.
    Stable,
}

/// Thresholds that trigger degradation signals.
#[derive(Debug, Clone)]
pub struct PerformanceThresholds {
    /// Maximum acceptable mean execution time in milliseconds.
    pub max_average_execution_time_ms: f64,
    /// Minimum acceptable success percentage.
    pub min_success_rate: f64,
}

impl Default for PerformanceThresholds {
    fn default() -> Self {
        Self {
            max_average_execution_time_ms: 5_000.0,
            min_success_rate: 70.0,
        }
    }
}

/// Derived metrics snapshot for one tool.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceMetrics {
    /// Catalog id of the tool.
    pub tool_id: String,
    /// Total recorded executions.
    pub total_executions: u64,
    /// Recorded successes.
    pub success_count: u64,
    /// `success_count / total_executions * 100`, always recomputed.
    pub success_rate: f64,
    /// Mean execution time over the capped window, in milliseconds.
    pub average_execution_time_ms: f64,
    /// Latency trend over the window.
    pub trend: Trend,
}

#[derive(Debug, Default)]
struct ToolStats {
    times: VecDeque<f64>,
    success_count: u64,
    total: u64,
}

impl ToolStats {
    fn record(&mut self, duration_ms: f64, success: bool) {
        if self.times.len() == WINDOW_SIZE {
            self.times.pop_front();
        }
        self.times.push_back(duration_ms);
        self.total += 1;
        if success {
            self.success_count += 1;
        }
    }

    fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.success_count as f64 / self.total as f64 * 100.0
    }

    fn average_time(&self) -> f64 {
        if self.times.is_empty() {
            return 0.0;
        }
        self.times.iter().sum::<f64>() / self.times.len() as f64
    }

    /// Mean of the last 10 samples against the mean of the 10 before
    /// them; needs at least 20 samples to say anything.
    fn trend(&self) -> Trend {
        if self.times.len() < TREND_SAMPLE * 2 {
            return Trend::Stable;
        }
        let recent: f64 = self.times.iter().rev().take(TREND_SAMPLE).sum::<f64>()
            / TREND_SAMPLE as f64;
        let prior: f64 = self
            .times
            .iter()
            .rev()
            .skip(TREND_SAMPLE)
            .take(TREND_SAMPLE)
            .sum::<f64>()
            / TREND_SAMPLE as f64;
        if prior == 0.0 {
            return Trend::Stable;
        }
        let ratio = recent / prior;
        if ratio > 1.0 + TREND_EPSILON {
            Trend::Up
        } else if ratio < 1.0 - TREND_EPSILON {
            Trend::Down
        } else {
            Trend::Stable
        }
    }

    fn metrics(&self, tool_id: &str) -> PerformanceMetrics {
        PerformanceMetrics {
            tool_id: tool_id.to_string(),
            total_executions: self.total,
            success_count: self.success_count,
            success_rate: self.success_rate(),
            average_execution_time_ms: self.average_time(),
            trend: self.trend(),
        }
    }
}

/// Tracks execution statistics and emits degradation signals.
#[derive(Debug)]
pub struct PerformanceMonitor {
    stats: Mutex<HashMap<String, ToolStats>>,
    thresholds: PerformanceThresholds,
    events: EventBus,
}

impl PerformanceMonitor {
    /// Monitor with the given thresholds, reporting on `events`.
    pub fn new(thresholds: PerformanceThresholds, events: EventBus) -> Self {
        Self {
            stats: Mutex::new(HashMap::new()),
            thresholds,
            events,
        }
    }

    /// Records one execution outcome and runs the threshold checks.
    pub fn record_execution(&self, tool_id: &str, success: bool, duration_ms: f64) {
        let metrics = {
            let mut stats = self.stats.lock();
            let entry = stats.entry(tool_id.to_string()).or_default();
            entry.record(duration_ms, success);
            entry.metrics(tool_id)
        };

        if metrics.average_execution_time_ms > self.thresholds.max_average_execution_time_ms {
            self.degraded(
                tool_id,
                format!(
                    "average execution time {:.0}ms exceeds {:.0}ms",
                    metrics.average_execution_time_ms,
                    self.thresholds.max_average_execution_time_ms
                ),
            );
        }
        if metrics.success_rate < self.thresholds.min_success_rate {
            self.degraded(
                tool_id,
                format!(
                    "success rate {:.1}% below {:.1}%",
                    metrics.success_rate, self.thresholds.min_success_rate
                ),
            );
        }
        if metrics.trend == Trend::Down && metrics.success_rate >= IMPROVEMENT_SUCCESS_RATE {
            self.events.emit(RouterEvent::PerformanceImproved {
                tool_id: tool_id.to_string(),
            });
        }
    }

    /// Metrics snapshot for one tool, if it has any recorded history.
    pub fn metrics(&self, tool_id: &str) -> Option<PerformanceMetrics> {
        self.stats.lock().get(tool_id).map(|s| s.metrics(tool_id))
    }

    /// Flags tools whose latency trend is worsening while their success
    /// rate is already below threshold. Returns the flagged tool ids.
    pub fn analyze(&self) -> Vec<String> {
        let flagged: Vec<String> = {
            let stats = self.stats.lock();
            stats
                .iter()
                .filter(|(_, s)| {
                    s.trend() == Trend::Up && s.success_rate() < self.thresholds.min_success_rate
                })
                .map(|(id, _)| id.clone())
                .collect()
        };
        for tool_id in &flagged {
            self.degraded(tool_id, "sustained degradation".to_string());
        }
        flagged
    }

    fn degraded(&self, tool_id: &str, reason: String) {
        warn!(tool_id = %tool_id, reason = %reason, "tool performance degraded");
        self.events.emit(RouterEvent::PerformanceDegraded {
            tool_id: tool_id.to_string(),
            reason,
        });
    }
}
