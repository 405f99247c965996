//! Execution routing.
//!
//! One execution walks the states `Queued → Validating → Dispatching →
//! Completed | Failed`, with an optional single `FallbackDispatching`
//! hop after a recoverable failure. The contract:
//!
//! - Concurrent calls for the same `(tool_id, request_id)` coalesce
//!   onto one in-flight future; the provider is invoked once.
//! - Every execution owns a cancellation token. The timeout timer
//!   cancels that token, so timeout and external cancellation (for
//!   example shutdown) share one code path, and the provider observably
//!   stops rather than being abandoned.
//! - Failures are classified; only recoverable ones are eligible for
//!   the single-level fallback to a same-normalized-name alternative.
//! - Success or final failure, the performance monitor, the preference
//!   weights, and the catalog usage stats are always updated.

use crate::catalog::{Catalog, UnifiedTool};
use crate::conflict::normalize_name;
use crate::context::RequestContext;
use crate::error::{ExecutionError, ProviderError};
use crate::events::{EventBus, RouterEvent};
use crate::monitor::PerformanceMonitor;
use crate::preferences::PreferenceManager;
use crate::provider::ProviderRegistry;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Grace period for a provider to observe its cancelled token before
/// the router stops waiting for it.
const CANCEL_GRACE: Duration = Duration::from_millis(500);

/// Lifecycle state an execution ended in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    /// Accepted, not yet validated.
    Queued,
    /// Parameter validation in progress.
    Validating,
    /// Provider call in flight.
    Dispatching,
    /// Fallback provider call in flight.
    FallbackDispatching,
    /// Finished successfully.
    Completed,
    /// Finished with a classified failure.
    Failed,
}

/// Caller-visible outcome of one execution.
#[derive(Debug, Clone)]
pub struct ToolExecutionResult {
    /// Whether the execution produced output.
    pub success: bool,
    /// Tool output on success.
    pub output: Option<Value>,
    /// Classified failure, present iff `success` is false.
    pub error: Option<ExecutionError>,
    /// Wall-clock duration of the whole execution, fallback included.
    pub duration: Duration,
    /// Id of the tool that produced the result (the fallback's id when
    /// a fallback ran and succeeded).
    pub tool_id: String,
    /// Whether a fallback tool produced or attempted the result.
    pub fallback_used: bool,
    /// Terminal state.
    pub state: ExecutionState,
}

type ExecutionKey = (String, String);
type SharedExecution = Shared<BoxFuture<'static, ToolExecutionResult>>;

/// Routes executions to providers with dedup, timeout, and fallback.
#[derive(Clone)]
pub struct ExecutionRouter {
    inner: Arc<Inner>,
}

struct Inner {
    providers: Arc<ProviderRegistry>,
    catalog: Arc<Catalog>,
    monitor: Arc<PerformanceMonitor>,
    preferences: Arc<PreferenceManager>,
    events: EventBus,
    in_flight: DashMap<ExecutionKey, SharedExecution>,
    active: DashMap<ExecutionKey, CancellationToken>,
    shutdown: CancellationToken,
}

impl ExecutionRouter {
    /// Wires the router to its collaborators.
    pub fn new(
        providers: Arc<ProviderRegistry>,
        catalog: Arc<Catalog>,
        monitor: Arc<PerformanceMonitor>,
        preferences: Arc<PreferenceManager>,
        events: EventBus,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                providers,
                catalog,
                monitor,
                preferences,
                events,
                in_flight: DashMap::new(),
                active: DashMap::new(),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Executes a tool.
    ///
    /// A second call with the same `(tool_id, request_id)` while the
    /// first is in flight awaits the same underlying future.
    pub async fn execute(
        &self,
        tool: UnifiedTool,
        params: Value,
        ctx: RequestContext,
    ) -> ToolExecutionResult {
        let key: ExecutionKey = (tool.id.clone(), ctx.request_id.clone());

        let future = match self.inner.in_flight.entry(key.clone()) {
            Entry::Occupied(existing) => {
                debug!(tool_id = %key.0, request_id = %key.1, "coalescing duplicate execution");
                existing.get().clone()
            }
            Entry::Vacant(vacant) => {
                let inner = Arc::clone(&self.inner);
                let future: SharedExecution = async move {
                    let result = Inner::run(Arc::clone(&inner), tool, params, ctx).await;
                    // Guaranteed cleanup: the dedup entry goes away on
                    // every path, success or failure.
                    inner.in_flight.remove(&key);
                    result
                }
                .boxed()
                .shared();
                // A detached clone keeps the execution running even if
                // every caller drops its handle.
                tokio::spawn(future.clone());
                vacant.insert(future.clone());
                future
            }
        };

        future.await
    }

    /// Number of currently in-flight executions.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.len()
    }

    /// Cancels every active execution token; in-flight callers get
    /// timeout-classified results.
    pub fn shutdown(&self) {
        warn!(
            active = self.inner.active.len(),
            "shutting down execution router"
        );
        self.inner.shutdown.cancel();
    }
}

impl Inner {
    async fn run(
        inner: Arc<Inner>,
        tool: UnifiedTool,
        params: Value,
        ctx: RequestContext,
    ) -> ToolExecutionResult {
        let started = Instant::now();
        inner.events.emit(RouterEvent::ExecutionStarted {
            tool_id: tool.id.clone(),
            request_id: ctx.request_id.clone(),
        });

        // Validating.
        let missing = tool.input_schema.missing_required(&params);
        if !missing.is_empty() {
            let error = ExecutionError::validation(format!(
                "missing required parameters: {}",
                missing.join(", ")
            ));
            return inner.finish_failure(&tool, error, started, false);
        }

        // Dispatching.
        match inner.dispatch(&tool, params.clone(), &ctx).await {
            Ok(output) => inner.finish_success(&tool, output, started, false),
            Err(error) => {
                inner.record_outcome(&tool, false, started.elapsed());
                inner.events.emit(RouterEvent::ExecutionFailed {
                    tool_id: tool.id.clone(),
                    kind: error.kind,
                    message: error.message.clone(),
                    recoverable: error.recoverable,
                });
                error!(tool_id = %tool.id, error = %error, "tool execution failed");

                if error.recoverable
                    && ctx.max_fallbacks > 0
                    && inner.preferences.fallbacks_enabled()
                {
                    if let Some(alternative) = inner.fallback_candidate(&tool) {
                        inner.events.emit(RouterEvent::FallbackTriggered {
                            from_tool_id: tool.id.clone(),
                            to_tool_id: alternative.id.clone(),
                        });
                        return inner.run_fallback(alternative, params, &ctx).await;
                    }
                }

                failure_result(&tool.id, error, started.elapsed(), false)
            }
        }
    }

    /// Executes the fallback alternative once; no further chaining.
    async fn run_fallback(
        &self,
        alternative: UnifiedTool,
        params: Value,
        ctx: &RequestContext,
    ) -> ToolExecutionResult {
        let started = Instant::now();

        let missing = alternative.input_schema.missing_required(&params);
        if !missing.is_empty() {
            let error = ExecutionError::validation(format!(
                "fallback missing required parameters: {}",
                missing.join(", ")
            ));
            return self.finish_failure(&alternative, error, started, true);
        }

        match self.dispatch(&alternative, params, ctx).await {
            Ok(output) => self.finish_success(&alternative, output, started, true),
            Err(error) => self.finish_failure(&alternative, error, started, true),
        }
    }

    /// One provider call under a per-execution cancellation token.
    async fn dispatch(
        &self,
        tool: &UnifiedTool,
        params: Value,
        ctx: &RequestContext,
    ) -> Result<Value, ExecutionError> {
        if !tool.availability.is_dispatchable() {
            return Err(ExecutionError::classify(format!(
                "tool '{}' is currently unavailable",
                tool.name
            )));
        }
        let provider = self.providers.get(&tool.source.id).ok_or_else(|| {
            ExecutionError::classify(format!(
                "no provider registered for source '{}'",
                tool.source.id
            ))
        })?;

        let token = self.shutdown.child_token();
        let key = (tool.id.clone(), ctx.request_id.clone());
        self.active.insert(key.clone(), token.clone());

        let result = {
            let call = provider.call_tool(&tool.name, params, token.clone());
            tokio::pin!(call);
            tokio::select! {
                result = &mut call => result,
                _ = tokio::time::sleep(ctx.timeout) => {
                    // The timer fires the same token that external
                    // cancellation uses; the provider must observe it
                    // and stop. The grace period bounds providers that
                    // never look at their token.
                    token.cancel();
                    match tokio::time::timeout(CANCEL_GRACE, call).await {
                        Ok(result) => result,
                        Err(_) => Err(ProviderError::Cancelled),
                    }
                }
            }
        };
        self.active.remove(&key);

        result.map_err(ExecutionError::from)
    }

    fn finish_success(
        &self,
        tool: &UnifiedTool,
        output: Value,
        started: Instant,
        fallback_used: bool,
    ) -> ToolExecutionResult {
        let duration = started.elapsed();
        self.record_outcome(tool, true, duration);
        self.events.emit(RouterEvent::ExecutionCompleted {
            tool_id: tool.id.clone(),
            duration_ms: duration.as_millis() as u64,
            fallback_used,
        });
        ToolExecutionResult {
            success: true,
            output: Some(output),
            error: None,
            duration,
            tool_id: tool.id.clone(),
            fallback_used,
            state: ExecutionState::Completed,
        }
    }

    fn finish_failure(
        &self,
        tool: &UnifiedTool,
        error: ExecutionError,
        started: Instant,
        fallback_used: bool,
    ) -> ToolExecutionResult {
        let duration = started.elapsed();
        self.record_outcome(tool, false, duration);
        self.events.emit(RouterEvent::ExecutionFailed {
            tool_id: tool.id.clone(),
            kind: error.kind,
            message: error.message.clone(),
            recoverable: error.recoverable,
        });
        failure_result(&tool.id, error, duration, fallback_used)
    }

    /// Updates monitor, preference weight, and catalog usage stats.
    fn record_outcome(&self, tool: &UnifiedTool, success: bool, duration: Duration) {
        let duration_ms = duration.as_millis() as f64;
        self.monitor.record_execution(&tool.id, success, duration_ms);
        self.preferences.record_tool_usage(&tool.source.id, success);

        let metrics = self.monitor.metrics(&tool.id);
        self.catalog.update_tool(&tool.id, |entry| {
            entry.usage.usage_count += 1;
            entry.usage.last_used = Some(Utc::now());
            if let Some(metrics) = &metrics {
                entry.usage.average_execution_time_ms = metrics.average_execution_time_ms;
                entry.usage.success_rate = metrics.success_rate;
            }
            entry.preference_weight = self.preferences.source_weight(&tool.source.id);
        });
    }

    /// A currently-available alternative with the same normalized name.
    ///
    /// Availability is re-checked against the live catalog snapshot at
    /// selection time, not against the state the caller saw.
    fn fallback_candidate(&self, failed: &UnifiedTool) -> Option<UnifiedTool> {
        let wanted = normalize_name(&failed.name);
        let snapshot = self.catalog.snapshot();
        let mut candidates: Vec<&UnifiedTool> = snapshot
            .values()
            .filter(|t| t.id != failed.id)
            .filter(|t| normalize_name(&t.name) == wanted)
            .filter(|t| t.availability.is_dispatchable())
            .collect();
        candidates.sort_by(|a, b| a.id.cmp(&b.id));
        candidates.first().map(|t| (*t).clone())
    }
}

fn failure_result(
    tool_id: &str,
    error: ExecutionError,
    duration: Duration,
    fallback_used: bool,
) -> ToolExecutionResult {
    ToolExecutionResult {
        success: false,
        output: None,
        error: Some(error),
        duration,
        tool_id: tool_id.to_string(),
        fallback_used,
        state: ExecutionState::Failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{
        Availability, InputSchema, ParameterKind, ParameterSpec, SourceHealth, SourceKind,
        ToolCategory, ToolSource, UsageStats,
    };
    use crate::monitor::PerformanceThresholds;
    use crate::preferences::MemoryStore;
    use crate::provider::{StaticProvider, ToolDescriptor, ToolProvider};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn unified(source_id: &str, kind: SourceKind, name: &str) -> UnifiedTool {
        UnifiedTool {
            id: UnifiedTool::derive_id(source_id, name),
            name: name.to_string(),
            description: String::new(),
            source: ToolSource {
                id: source_id.to_string(),
                name: source_id.to_string(),
                kind,
                health: SourceHealth::healthy(),
            },
            category: ToolCategory::general(),
            input_schema: InputSchema::empty(),
            output_schema: None,
            tags: vec![],
            usage: UsageStats::default(),
            relevance: None,
            availability: Availability::available(),
            conflicts: vec![],
            preference_weight: 0.8,
        }
    }

    struct Harness {
        router: ExecutionRouter,
        catalog: Arc<Catalog>,
        events: EventBus,
        registry: Arc<ProviderRegistry>,
    }

    fn harness(providers: Vec<Arc<dyn ToolProvider>>) -> Harness {
        let registry = Arc::new(ProviderRegistry::new());
        for provider in providers {
            registry.register(provider);
        }
        let catalog = Arc::new(Catalog::new());
        let events = EventBus::new(64);
        let monitor = Arc::new(PerformanceMonitor::new(
            PerformanceThresholds::default(),
            events.clone(),
        ));
        let preferences = Arc::new(PreferenceManager::load(Arc::new(MemoryStore::new())));
        let router = ExecutionRouter::new(
            Arc::clone(&registry),
            Arc::clone(&catalog),
            monitor,
            preferences,
            events.clone(),
        );
        Harness {
            router,
            catalog,
            events,
            registry,
        }
    }

    fn drain_events(rx: &mut tokio::sync::broadcast::Receiver<RouterEvent>) -> Vec<RouterEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_successful_execution() {
        let provider = StaticProvider::builder("builtin", SourceKind::Builtin)
            .tool(ToolDescriptor::new("echo", "Echo"), |params| async move {
                Ok(params)
            })
            .build();
        let h = harness(vec![Arc::new(provider)]);
        let tool = unified("builtin", SourceKind::Builtin, "echo");
        h.catalog.publish(vec![tool.clone()]);

        let result = h
            .router
            .execute(tool, json!({"x": 1}), RequestContext::new("s", "r1"))
            .await;

        assert!(result.success);
        assert_eq!(result.output, Some(json!({"x": 1})));
        assert_eq!(result.state, ExecutionState::Completed);
        assert!(!result.fallback_used);

        // Usage stats flowed back into the catalog.
        let updated = h.catalog.get("builtin:echo").unwrap();
        assert_eq!(updated.usage.usage_count, 1);
        assert!(updated.usage.last_used.is_some());
    }

    #[tokio::test]
    async fn test_validation_fails_before_dispatch() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let provider = StaticProvider::builder("builtin", SourceKind::Builtin)
            .tool(ToolDescriptor::new("read", "Read"), move |_| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(json!(null))
                }
            })
            .build();
        let h = harness(vec![Arc::new(provider)]);
        let mut tool = unified("builtin", SourceKind::Builtin, "read");
        tool.input_schema =
            InputSchema::new(vec![ParameterSpec::required("path", ParameterKind::String)]);
        h.catalog.publish(vec![tool.clone()]);

        let result = h
            .router
            .execute(tool, json!({}), RequestContext::new("s", "r1"))
            .await;

        assert!(!result.success);
        let error = result.error.unwrap();
        assert_eq!(error.kind, crate::error::ExecutionErrorKind::Validation);
        assert!(error.message.contains("path"));
        // The provider was never contacted.
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_classified_and_token_observed() {
        let provider = StaticProvider::builder("builtin", SourceKind::Builtin)
            .tool(ToolDescriptor::new("hang", "Hangs"), |_| async move {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(json!(null))
            })
            .build();
        let h = harness(vec![Arc::new(provider)]);
        let tool = unified("builtin", SourceKind::Builtin, "hang");
        h.catalog.publish(vec![tool.clone()]);

        let ctx = RequestContext::new("s", "r1").with_timeout(Duration::from_millis(200));
        let started = tokio::time::Instant::now();
        let result = h.router.execute(tool, json!({}), ctx).await;

        assert!(!result.success);
        let error = result.error.unwrap();
        assert_eq!(error.kind, crate::error::ExecutionErrorKind::Timeout);
        // Returned promptly after the timeout, not after the hang.
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_dedup_single_provider_invocation() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let provider = StaticProvider::builder("builtin", SourceKind::Builtin)
            .tool(ToolDescriptor::new("slow", "Slow"), move |_| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok(json!("done"))
                }
            })
            .build();
        let h = harness(vec![Arc::new(provider)]);
        let tool = unified("builtin", SourceKind::Builtin, "slow");
        h.catalog.publish(vec![tool.clone()]);

        let ctx = RequestContext::new("s", "same-request");
        let (a, b) = tokio::join!(
            h.router.execute(tool.clone(), json!({}), ctx.clone()),
            h.router.execute(tool.clone(), json!({}), ctx.clone()),
        );

        assert!(a.success && b.success);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        // The dedup entry is cleaned up afterwards.
        assert_eq!(h.router.in_flight(), 0);

        // A fresh request id dispatches again.
        let c = h
            .router
            .execute(tool, json!({}), RequestContext::new("s", "other-request"))
            .await;
        assert!(c.success);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fallback_to_same_normalized_name() {
        let failing = StaticProvider::builder("ext", SourceKind::External)
            .tool(ToolDescriptor::new("readFile", "Read"), |_| async move {
                Err(ProviderError::Connection("connection reset".into()))
            })
            .build();
        let working = StaticProvider::builder("builtin", SourceKind::Builtin)
            .tool(ToolDescriptor::new("read_file", "Read"), |_| async move {
                Ok(json!("file contents"))
            })
            .build();
        let h = harness(vec![Arc::new(failing), Arc::new(working)]);
        let primary = unified("ext", SourceKind::External, "readFile");
        let alternative = unified("builtin", SourceKind::Builtin, "read_file");
        h.catalog.publish(vec![primary.clone(), alternative]);

        let mut rx = h.events.subscribe();
        let result = h
            .router
            .execute(primary, json!({}), RequestContext::new("s", "r1"))
            .await;

        assert!(result.success);
        assert!(result.fallback_used);
        assert_eq!(result.tool_id, "builtin:read_file");
        assert_eq!(result.output, Some(json!("file contents")));

        let fallback_events = drain_events(&mut rx)
            .into_iter()
            .filter(|e| matches!(e, RouterEvent::FallbackTriggered { .. }))
            .count();
        assert_eq!(fallback_events, 1);
    }

    #[tokio::test]
    async fn test_no_fallback_when_disabled() {
        let failing = StaticProvider::builder("ext", SourceKind::External)
            .tool(ToolDescriptor::new("readFile", "Read"), |_| async move {
                Err(ProviderError::Connection("connection reset".into()))
            })
            .build();
        let working = StaticProvider::builder("builtin", SourceKind::Builtin)
            .tool(ToolDescriptor::new("read_file", "Read"), |_| async move {
                Ok(json!("file contents"))
            })
            .build();
        let h = harness(vec![Arc::new(failing), Arc::new(working)]);
        let primary = unified("ext", SourceKind::External, "readFile");
        let alternative = unified("builtin", SourceKind::Builtin, "read_file");
        h.catalog.publish(vec![primary.clone(), alternative]);

        // max_fallbacks = 0 disables fallback for this call.
        let mut rx = h.events.subscribe();
        let result = h
            .router
            .execute(
                primary,
                json!({}),
                RequestContext::new("s", "r1").with_max_fallbacks(0),
            )
            .await;

        assert!(!result.success);
        assert!(!result.fallback_used);
        assert_eq!(result.tool_id, "ext:readFile");
        let fallback_events = drain_events(&mut rx)
            .into_iter()
            .filter(|e| matches!(e, RouterEvent::FallbackTriggered { .. }))
            .count();
        assert_eq!(fallback_events, 0);
    }

    #[tokio::test]
    async fn test_non_recoverable_error_skips_fallback() {
        let denied = StaticProvider::builder("ext", SourceKind::External)
            .tool(ToolDescriptor::new("readFile", "Read"), |_| async move {
                Err(ProviderError::PermissionDenied("no api key".into()))
            })
            .build();
        let working = StaticProvider::builder("builtin", SourceKind::Builtin)
            .tool(ToolDescriptor::new("read_file", "Read"), |_| async move {
                Ok(json!("file contents"))
            })
            .build();
        let h = harness(vec![Arc::new(denied), Arc::new(working)]);
        let primary = unified("ext", SourceKind::External, "readFile");
        let alternative = unified("builtin", SourceKind::Builtin, "read_file");
        h.catalog.publish(vec![primary.clone(), alternative]);

        let result = h
            .router
            .execute(primary, json!({}), RequestContext::new("s", "r1"))
            .await;

        assert!(!result.success);
        assert!(!result.fallback_used);
        let error = result.error.unwrap();
        assert_eq!(error.kind, crate::error::ExecutionErrorKind::Permission);
        assert!(!error.recoverable);
    }

    #[tokio::test]
    async fn test_unavailable_fallback_target_skipped() {
        let failing = StaticProvider::builder("ext", SourceKind::External)
            .tool(ToolDescriptor::new("readFile", "Read"), |_| async move {
                Err(ProviderError::Connection("connection reset".into()))
            })
            .build();
        let h = harness(vec![Arc::new(failing)]);
        let primary = unified("ext", SourceKind::External, "readFile");
        let mut alternative = unified("builtin", SourceKind::Builtin, "read_file");
        alternative.availability = Availability::unavailable();
        h.catalog.publish(vec![primary.clone(), alternative]);

        let result = h
            .router
            .execute(primary, json!({}), RequestContext::new("s", "r1"))
            .await;

        // The only alternative is unavailable; the primary failure stands.
        assert!(!result.success);
        assert!(!result.fallback_used);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_active_executions() {
        let provider = StaticProvider::builder("builtin", SourceKind::Builtin)
            .tool(ToolDescriptor::new("hang", "Hangs"), |_| async move {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(json!(null))
            })
            .build();
        let h = harness(vec![Arc::new(provider)]);
        let tool = unified("builtin", SourceKind::Builtin, "hang");
        h.catalog.publish(vec![tool.clone()]);

        let router = h.router.clone();
        let task = tokio::spawn(async move {
            router
                .execute(
                    tool,
                    json!({}),
                    RequestContext::new("s", "r1").with_timeout(Duration::from_secs(600)),
                )
                .await
        });

        // Let the execution reach the provider, then shut down.
        tokio::time::sleep(Duration::from_millis(50)).await;
        h.router.shutdown();

        let result = task.await.unwrap();
        assert!(!result.success);
        assert_eq!(
            result.error.unwrap().kind,
            crate::error::ExecutionErrorKind::Timeout
        );
    }

    #[tokio::test]
    async fn test_missing_provider_fails_cleanly() {
        let h = harness(vec![]);
        let tool = unified("ghost", SourceKind::External, "phantom");
        h.catalog.publish(vec![tool.clone()]);

        let result = h
            .router
            .execute(tool, json!({}), RequestContext::new("s", "r1"))
            .await;
        assert!(!result.success);
        assert!(result
            .error
            .unwrap()
            .message
            .contains("no provider registered"));
        let _ = h.registry;
    }
}
