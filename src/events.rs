//! Router observability events.
//!
//! Every component of the router reports noteworthy state changes
//! through a shared [`EventBus`]. Events are broadcast; emitting with no
//! subscribers is a no-op, so instrumentation never affects routing.
//!
//! # Event Types
//!
//! - **Catalog**: CatalogUpdated, SourceUnavailable
//! - **Execution**: ExecutionStarted, ExecutionCompleted, ExecutionFailed, FallbackTriggered
//! - **Conflicts**: ConflictDetected, ConflictResolved
//! - **Performance**: PerformanceDegraded, PerformanceImproved
//!
//! # Examples
//!
//! ```rust
//! use tool_router::events::{EventBus, RouterEvent};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let bus = EventBus::new(16);
//! let mut rx = bus.subscribe();
//!
//! bus.emit(RouterEvent::CatalogUpdated { tool_count: 3 });
//!
//! let event = rx.recv().await.unwrap();
//! assert_eq!(event.event_type(), "catalog_updated");
//! # }
//! ```

use crate::error::ExecutionErrorKind;
use tokio::sync::broadcast;

/// Events emitted by the router and its components.
///
/// `RouterEvent` is `Clone` so it can be distributed to multiple
/// subscribers, and `Send` so it can cross task boundaries.
#[derive(Debug, Clone)]
pub enum RouterEvent {
    /// A catalog refresh cycle completed and the new snapshot is live.
    CatalogUpdated {
        /// Number of tools in the published snapshot.
        tool_count: usize,
    },

    /// A provider failed discovery and its tools were omitted.
    SourceUnavailable {
        /// Source identifier of the failed provider.
        source_id: String,
        /// Failure description.
        reason: String,
    },

    /// An execution entered the pipeline.
    ExecutionStarted {
        /// Catalog id of the tool being executed.
        tool_id: String,
        /// Caller-supplied request id.
        request_id: String,
    },

    /// An execution finished successfully.
    ExecutionCompleted {
        /// Catalog id of the tool that ran.
        tool_id: String,
        /// Wall-clock duration in milliseconds.
        duration_ms: u64,
        /// Whether the result came from a fallback tool.
        fallback_used: bool,
    },

    /// An execution finished with a classified failure.
    ExecutionFailed {
        /// Catalog id of the tool that ran.
        tool_id: String,
        /// Error classification.
        kind: ExecutionErrorKind,
        /// Error message.
        message: String,
        /// Whether a fallback was eligible.
        recoverable: bool,
    },

    /// A recoverable failure is being retried on an alternative tool.
    FallbackTriggered {
        /// The tool that failed.
        from_tool_id: String,
        /// The alternative being executed instead.
        to_tool_id: String,
    },

    /// Two or more providers expose tools with the same normalized name.
    ConflictDetected {
        /// The normalized name shared by the candidates.
        normalized_name: String,
        /// Catalog ids of all candidates.
        candidate_ids: Vec<String>,
    },

    /// A detected conflict was resolved to a single winner.
    ConflictResolved {
        /// The normalized name that was contested.
        normalized_name: String,
        /// Catalog id of the winning tool.
        winner_id: String,
        /// Resolution strategy tag applied.
        strategy: String,
    },

    /// A tool breached a performance threshold.
    PerformanceDegraded {
        /// Catalog id of the degraded tool.
        tool_id: String,
        /// Description of the breach.
        reason: String,
    },

    /// A previously slow tool is trending faster with a high success rate.
    PerformanceImproved {
        /// Catalog id of the improving tool.
        tool_id: String,
    },
}

impl RouterEvent {
    /// Stable string tag for this event, useful for logging and filtering.
    pub fn event_type(&self) -> &'static str {
        match self {
            RouterEvent::CatalogUpdated { .. } => "catalog_updated",
            RouterEvent::SourceUnavailable { .. } => "source_unavailable",
            RouterEvent::ExecutionStarted { .. } => "execution_started",
            RouterEvent::ExecutionCompleted { .. } => "execution_completed",
            RouterEvent::ExecutionFailed { .. } => "execution_failed",
            RouterEvent::FallbackTriggered { .. } => "fallback_triggered",
            RouterEvent::ConflictDetected { .. } => "conflict_detected",
            RouterEvent::ConflictResolved { .. } => "conflict_resolved",
            RouterEvent::PerformanceDegraded { .. } => "performance_degraded",
            RouterEvent::PerformanceImproved { .. } => "performance_improved",
        }
    }

    /// Returns `true` for execution lifecycle events.
    pub fn is_execution_event(&self) -> bool {
        matches!(
            self,
            RouterEvent::ExecutionStarted { .. }
                | RouterEvent::ExecutionCompleted { .. }
                | RouterEvent::ExecutionFailed { .. }
                | RouterEvent::FallbackTriggered { .. }
        )
    }

    /// Returns `true` for conflict events.
    pub fn is_conflict_event(&self) -> bool {
        matches!(
            self,
            RouterEvent::ConflictDetected { .. } | RouterEvent::ConflictResolved { .. }
        )
    }
}

/// Broadcast bus distributing [`RouterEvent`]s to any number of subscribers.
///
/// Cloning the bus shares the underlying channel. The bus has no
/// required subscriber; `emit` silently drops events when nobody is
/// listening.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<RouterEvent>,
}

impl EventBus {
    /// Creates a bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribes to all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<RouterEvent> {
        self.sender.subscribe()
    }

    /// Emits an event to all current subscribers.
    pub fn emit(&self, event: RouterEvent) {
        tracing::debug!(event_type = event.event_type(), "router event");
        // A send error only means there are no subscribers.
        let _ = self.sender.send(event);
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
