//! Router configuration.

use crate::classify::ClassifierConfig;
use crate::monitor::PerformanceThresholds;
use crate::search::SearchOptions;
use std::time::Duration;

/// Tunable configuration for a [`crate::router::UnifiedToolRouter`].
///
/// # Examples
///
/// ```rust
/// use tool_router::config::RouterConfig;
/// use std::time::Duration;
///
/// let config = RouterConfig::default()
///     .with_refresh_interval(Duration::from_secs(60))
///     .with_periodic_refresh(false);
/// assert_eq!(config.refresh_interval, Duration::from_secs(60));
/// ```
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Interval between periodic catalog refresh cycles.
    pub refresh_interval: Duration,
    /// Capacity of the event broadcast channel.
    pub event_capacity: usize,
    /// Whether the facade spawns the periodic refresh task.
    pub periodic_refresh: bool,
    /// Keyword tables used to classify discovered tools.
    pub classifier: ClassifierConfig,
    /// Degradation thresholds for the performance monitor.
    pub thresholds: PerformanceThresholds,
    /// Default search options when the caller passes none.
    pub search_defaults: SearchOptions,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(300),
            event_capacity: 64,
            periodic_refresh: true,
            classifier: ClassifierConfig::default(),
            thresholds: PerformanceThresholds::default(),
            search_defaults: SearchOptions::default(),
        }
    }
}

impl RouterConfig {
    /// Sets the periodic refresh interval.
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Enables or disables the periodic refresh task.
    pub fn with_periodic_refresh(mut self, enabled: bool) -> Self {
        self.periodic_refresh = enabled;
        self
    }

    /// Sets the event channel capacity.
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Replaces the classifier keyword tables.
    pub fn with_classifier(mut self, classifier: ClassifierConfig) -> Self {
        self.classifier = classifier;
        self
    }

    /// Replaces the performance thresholds.
    pub fn with_thresholds(mut self, thresholds: PerformanceThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Replaces the default search options.
    pub fn with_search_defaults(mut self, options: SearchOptions) -> Self {
        self.search_defaults = options;
        self
    }
}
