//! The unified tool router facade.
//!
//! Composes discovery, conflict resolution, relevance scoring, search,
//! preferences, performance monitoring, and execution behind one
//! object with a catalog lifecycle (initialize, refresh, shutdown) and
//! a request lifecycle (search, execute).
//!
//! # Examples
//!
//! ```rust,no_run
//! use tool_router::router::UnifiedToolRouter;
//! use tool_router::provider::{StaticProvider, ToolDescriptor};
//! use tool_router::catalog::SourceKind;
//! use tool_router::context::RequestContext;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> tool_router::error::Result<()> {
//! let provider = StaticProvider::builder("builtin", SourceKind::Builtin)
//!     .tool(ToolDescriptor::new("echo", "Echoes input"), |params| async move {
//!         Ok(params)
//!     })
//!     .build();
//!
//! let router = UnifiedToolRouter::builder()
//!     .provider(Arc::new(provider))
//!     .build();
//! router.initialize().await?;
//!
//! let ctx = RequestContext::new("session", "request-1");
//! let hits = router.search_tools("echo", &ctx, None);
//! let result = router
//!     .execute_tool(&hits[0].tool.id, json!({"text": "hi"}), ctx)
//!     .await?;
//! assert!(result.success);
//! router.shutdown();
//! # Ok(())
//! # }
//! ```

use crate::analyzer::ContextAnalyzer;
use crate::catalog::{Catalog, ToolCategory, UnifiedTool, UsageStats};
use crate::config::RouterConfig;
use crate::conflict::ConflictResolver;
use crate::context::{RequestContext, DEFAULT_TIMEOUT};
use crate::discovery::DiscoveryService;
use crate::error::{Result, RouterError};
use crate::events::{EventBus, RouterEvent};
use crate::executor::{ExecutionRouter, ToolExecutionResult};
use crate::monitor::{PerformanceMetrics, PerformanceMonitor};
use crate::preferences::{MemoryStore, PreferenceManager, PreferenceStore};
use crate::provider::{ProviderRegistry, ToolProvider};
use crate::search::{SearchHit, SearchIndex, SearchOptions};
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Everything a presentation layer needs to preview one tool.
#[derive(Debug, Clone)]
pub struct ToolPreview {
    /// The catalog entry.
    pub tool: UnifiedTool,
    /// Usage statistics as of the current snapshot.
    pub recent_usage: UsageStats,
    /// Performance metrics, when the tool has execution history.
    pub performance: Option<PerformanceMetrics>,
    /// Tools similar to this one.
    pub similar_tools: Vec<UnifiedTool>,
}

/// Builder for [`UnifiedToolRouter`].
pub struct UnifiedToolRouterBuilder {
    config: RouterConfig,
    providers: Vec<Arc<dyn ToolProvider>>,
    store: Option<Arc<dyn PreferenceStore>>,
}

impl UnifiedToolRouterBuilder {
    /// Registers a tool provider.
    pub fn provider(mut self, provider: Arc<dyn ToolProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Sets the preference persistence backend. Defaults to an
    /// in-memory store.
    pub fn preference_store(mut self, store: Arc<dyn PreferenceStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Replaces the configuration.
    pub fn config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    /// Assembles the router. Call
    /// [`initialize`](UnifiedToolRouter::initialize) before use.
    pub fn build(self) -> UnifiedToolRouter {
        let events = EventBus::new(self.config.event_capacity);
        let registry = Arc::new(ProviderRegistry::new());
        for provider in self.providers {
            registry.register(provider);
        }
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()) as Arc<dyn PreferenceStore>);
        let preferences = Arc::new(PreferenceManager::load(store));
        let catalog = Arc::new(Catalog::new());
        let monitor = Arc::new(PerformanceMonitor::new(
            self.config.thresholds.clone(),
            events.clone(),
        ));
        let discovery = DiscoveryService::new(
            Arc::clone(&registry),
            self.config.classifier.clone(),
            events.clone(),
        );
        let executor = ExecutionRouter::new(
            Arc::clone(&registry),
            Arc::clone(&catalog),
            Arc::clone(&monitor),
            Arc::clone(&preferences),
            events.clone(),
        );

        UnifiedToolRouter {
            inner: Arc::new(RouterInner {
                config: self.config,
                providers: registry,
                catalog,
                discovery,
                analyzer: ContextAnalyzer::new(),
                index: RwLock::new(SearchIndex::new()),
                preferences,
                monitor,
                executor,
                events,
                refresh_guard: tokio::sync::Mutex::new(()),
                refresh_task: Mutex::new(None),
                shutdown: CancellationToken::new(),
            }),
        }
    }
}

struct RouterInner {
    config: RouterConfig,
    providers: Arc<ProviderRegistry>,
    catalog: Arc<Catalog>,
    discovery: DiscoveryService,
    analyzer: ContextAnalyzer,
    index: RwLock<SearchIndex>,
    preferences: Arc<PreferenceManager>,
    monitor: Arc<PerformanceMonitor>,
    executor: ExecutionRouter,
    events: EventBus,
    refresh_guard: tokio::sync::Mutex<()>,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
    shutdown: CancellationToken,
}

/// The composed router. Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct UnifiedToolRouter {
    inner: Arc<RouterInner>,
}

impl UnifiedToolRouter {
    /// Starts building a router.
    pub fn builder() -> UnifiedToolRouterBuilder {
        UnifiedToolRouterBuilder {
            config: RouterConfig::default(),
            providers: Vec::new(),
            store: None,
        }
    }

    /// Runs the first catalog refresh and, when configured, spawns the
    /// periodic refresh task.
    pub async fn initialize(&self) -> Result<()> {
        let count = self.refresh().await;
        info!(tool_count = count, "tool router initialized");

        if self.inner.config.periodic_refresh {
            let router = self.clone();
            let interval = self.inner.config.refresh_interval;
            let shutdown = self.inner.shutdown.clone();
            let task = tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(interval) => {
                            router.refresh().await;
                        }
                    }
                }
            });
            *self.inner.refresh_task.lock() = Some(task);
        }
        Ok(())
    }

    /// Runs one full catalog refresh cycle: discover, enrich with
    /// preference weights, resolve conflicts, publish, rebuild the
    /// index.
    ///
    /// Re-entrant-guarded: a refresh already in progress short-circuits
    /// this call to the size of the most recent snapshot.
    pub async fn refresh(&self) -> usize {
        let Ok(_guard) = self.inner.refresh_guard.try_lock() else {
            debug!("refresh already in progress, returning current snapshot");
            return self.inner.catalog.len();
        };

        let mut tools = self.inner.discovery.discover_all().await;
        tools.retain(|t| self.inner.preferences.source_enabled(&t.source.id));
        for tool in &mut tools {
            tool.preference_weight = self.inner.preferences.source_weight(&tool.source.id);
        }

        let resolver = ConflictResolver::new(
            self.inner.preferences.conflict_rules(),
            self.inner.events.clone(),
        );
        let resolved = resolver.resolve(tools);
        let count = resolved.len();

        self.inner.catalog.publish(resolved.clone());
        self.inner.index.write().rebuild(resolved);
        self.inner
            .events
            .emit(RouterEvent::CatalogUpdated { tool_count: count });
        count
    }

    /// Re-discovers one provider and folds its tools into the catalog
    /// through a full resolve/publish cycle.
    pub async fn refresh_source(&self, source_id: &str) -> Result<usize> {
        self.inner
            .discovery
            .discover_source(source_id)
            .await
            .map_err(RouterError::Provider)?;
        Ok(self.refresh().await)
    }

    /// Registers a provider at runtime. Takes effect at the next
    /// refresh.
    pub fn register_provider(&self, provider: Arc<dyn ToolProvider>) {
        self.inner.providers.register(provider);
    }

    /// Unregisters a provider; its tools disappear at the next refresh.
    pub fn unregister_provider(&self, source_id: &str) -> bool {
        self.inner.providers.unregister(source_id)
    }

    /// Ranked search over the current catalog.
    ///
    /// Non-empty queries blend fuzzy field matching with context
    /// relevance; an empty query returns most-recently-used tools.
    pub fn search_tools(
        &self,
        query: &str,
        ctx: &RequestContext,
        options: Option<SearchOptions>,
    ) -> Vec<SearchHit> {
        let options = options.unwrap_or_else(|| self.inner.config.search_defaults.clone());
        let now = Utc::now();
        let index = self.inner.index.read();
        let mut hits = index.search(query, &options);

        // The index only sees usage stats as of the last rebuild;
        // executions mutate the catalog in between. Hits carry the live
        // entry's stats so recency and relevance stay current.
        let live = self.inner.catalog.snapshot();
        let recency_ordered = query.trim().is_empty();
        for hit in &mut hits {
            if let Some(entry) = live.get(&hit.tool.id) {
                hit.tool.usage = entry.usage.clone();
                hit.tool.availability = entry.availability.clone();
                hit.tool.preference_weight = entry.preference_weight;
            }
            let relevance = self
                .inner
                .analyzer
                .relevance_snapshot(&hit.tool, ctx, now);
            if !recency_ordered {
                hit.score = hit.score * 0.75 + relevance.score * 0.25;
            }
            hit.tool.relevance = Some(relevance);
        }
        if recency_ordered {
            hits.sort_by(|a, b| {
                b.tool
                    .usage
                    .last_used
                    .cmp(&a.tool.usage.last_used)
                    .then_with(|| a.tool.id.cmp(&b.tool.id))
            });
        } else {
            hits.sort_by(|a, b| {
                b.score
                    .partial_cmp(&a.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.tool.id.cmp(&b.tool.id))
            });
        }
        hits
    }

    /// Executes a catalog tool by id.
    ///
    /// A caller that left the context timeout at the built-in default
    /// gets the user's global `max_execution_time_ms` policy instead;
    /// an explicitly-set timeout always wins.
    pub async fn execute_tool(
        &self,
        tool_id: &str,
        params: Value,
        mut ctx: RequestContext,
    ) -> Result<ToolExecutionResult> {
        if ctx.timeout == DEFAULT_TIMEOUT {
            ctx.timeout = self.inner.preferences.max_execution_time();
        }
        let tool = self
            .inner
            .catalog
            .get(tool_id)
            .ok_or_else(|| RouterError::ToolNotFound(tool_id.to_string()))?;
        Ok(self.inner.executor.execute(tool, params, ctx).await)
    }

    /// All tools in one category, ordered by usage.
    pub fn tools_by_category(&self, category_id: &str) -> Vec<UnifiedTool> {
        self.inner.index.read().by_category(category_id)
    }

    /// Distinct categories present in the catalog, ordered by priority.
    pub fn available_categories(&self) -> Vec<ToolCategory> {
        let snapshot = self.inner.catalog.snapshot();
        let mut categories: Vec<ToolCategory> = Vec::new();
        for tool in snapshot.values() {
            if !categories.iter().any(|c| c.id == tool.category.id) {
                categories.push(tool.category.clone());
            }
        }
        categories.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));
        categories
    }

    /// Preview payload for one tool: the entry itself, usage, metrics,
    /// and similar tools.
    pub fn tool_preview(&self, tool_id: &str) -> Result<ToolPreview> {
        let tool = self
            .inner
            .catalog
            .get(tool_id)
            .ok_or_else(|| RouterError::ToolNotFound(tool_id.to_string()))?;
        let similar_tools = self.inner.index.read().similar(&tool, 5);
        Ok(ToolPreview {
            recent_usage: tool.usage.clone(),
            performance: self.inner.monitor.metrics(tool_id),
            similar_tools,
            tool,
        })
    }

    /// Current catalog snapshot size.
    pub fn tool_count(&self) -> usize {
        self.inner.catalog.len()
    }

    /// Looks up one tool in the current snapshot.
    pub fn get_tool(&self, tool_id: &str) -> Option<UnifiedTool> {
        self.inner.catalog.get(tool_id)
    }

    /// Health snapshot recorded at the source's last discovery attempt.
    pub fn source_health(&self, source_id: &str) -> Option<crate::catalog::SourceHealth> {
        self.inner.discovery.source_health(source_id)
    }

    /// Subscribes to router events.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<RouterEvent> {
        self.inner.events.subscribe()
    }

    /// Runs the periodic performance analysis pass.
    pub fn analyze_performance(&self) -> Vec<String> {
        self.inner.monitor.analyze()
    }

    /// Stops the periodic refresh task and cancels every in-flight
    /// execution.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
        if let Some(task) = self.inner.refresh_task.lock().take() {
            task.abort();
        }
        self.inner.executor.shutdown();
        info!("tool router shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SourceKind;
    use crate::provider::{StaticProvider, ToolDescriptor};
    use serde_json::json;

    fn builtin_provider() -> Arc<dyn ToolProvider> {
        Arc::new(
            StaticProvider::builder("builtin", SourceKind::Builtin)
                .tool(
                    ToolDescriptor::new("read_file", "Read a file from disk"),
                    |_| async move { Ok(json!("contents")) },
                )
                .tool(
                    ToolDescriptor::new("calculator", "Calculate math expressions"),
                    |params| async move { Ok(params) },
                )
                .build(),
        )
    }

    async fn initialized_router() -> UnifiedToolRouter {
        let router = UnifiedToolRouter::builder()
            .provider(builtin_provider())
            .config(RouterConfig::default().with_periodic_refresh(false))
            .build();
        router.initialize().await.unwrap();
        router
    }

    #[tokio::test]
    async fn test_initialize_populates_catalog() {
        let router = initialized_router().await;
        assert_eq!(router.tool_count(), 2);
        assert!(router.get_tool("builtin:read_file").is_some());
        router.shutdown();
    }

    #[tokio::test]
    async fn test_search_and_execute_lifecycle() {
        let router = initialized_router().await;
        let ctx = RequestContext::new("s", "r1");

        let hits = router.search_tools("read file", &ctx, None);
        assert!(!hits.is_empty());
        assert_eq!(hits[0].tool.id, "builtin:read_file");

        let result = router
            .execute_tool(&hits[0].tool.id, json!({}), ctx)
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.output, Some(json!("contents")));
        router.shutdown();
    }

    #[tokio::test]
    async fn test_execute_unknown_tool() {
        let router = initialized_router().await;
        let err = router
            .execute_tool("ghost:tool", json!({}), RequestContext::new("s", "r"))
            .await
            .unwrap_err();
        assert!(matches!(err, RouterError::ToolNotFound(_)));
        router.shutdown();
    }

    #[tokio::test]
    async fn test_available_categories_sorted_by_priority() {
        let router = initialized_router().await;
        let categories = router.available_categories();
        assert_eq!(categories.len(), 2);
        // mathematics (10) sorts before files (50).
        assert_eq!(categories[0].id, "mathematics");
        assert_eq!(categories[1].id, "files");
        router.shutdown();
    }

    #[tokio::test]
    async fn test_tool_preview() {
        let router = initialized_router().await;
        let ctx = RequestContext::new("s", "r1");
        router
            .execute_tool("builtin:read_file", json!({}), ctx)
            .await
            .unwrap();

        let preview = router.tool_preview("builtin:read_file").unwrap();
        assert_eq!(preview.tool.id, "builtin:read_file");
        assert_eq!(preview.recent_usage.usage_count, 1);
        assert!(preview.performance.is_some());
        router.shutdown();
    }

    #[tokio::test]
    async fn test_global_timeout_policy_applies_to_default_context() {
        let store: Arc<dyn PreferenceStore> = Arc::new(MemoryStore::new());
        PreferenceManager::load(Arc::clone(&store))
            .update(|prefs| prefs.max_execution_time_ms = 100);

        let provider = StaticProvider::builder("builtin", SourceKind::Builtin)
            .tool(
                ToolDescriptor::new("stall", "Stalls until cancelled"),
                |_| async move {
                    tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
                    Ok(json!(null))
                },
            )
            .build();
        let router = UnifiedToolRouter::builder()
            .provider(Arc::new(provider))
            .preference_store(store)
            .config(RouterConfig::default().with_periodic_refresh(false))
            .build();
        router.initialize().await.unwrap();

        // The context timeout was never set, so the 100ms policy applies.
        let result = router
            .execute_tool("builtin:stall", json!({}), RequestContext::new("s", "r1"))
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(
            result.error.unwrap().kind,
            crate::error::ExecutionErrorKind::Timeout
        );
        router.shutdown();
    }

    #[tokio::test]
    async fn test_unregister_provider_removes_tools_on_refresh() {
        let router = initialized_router().await;
        assert!(router.unregister_provider("builtin"));
        router.refresh().await;
        assert_eq!(router.tool_count(), 0);
        router.shutdown();
    }

    #[tokio::test]
    async fn test_catalog_updated_event_on_refresh() {
        let router = initialized_router().await;
        let mut rx = router.subscribe();
        router.refresh().await;
        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type(), "catalog_updated");
        router.shutdown();
    }

    #[tokio::test]
    async fn test_execution_updates_search_ranking_inputs() {
        let router = initialized_router().await;
        let ctx = RequestContext::new("s", "r1");
        // "builtin:read_file" sorts after "builtin:calculator" by id, so
        // it can only lead the empty-query results through live recency.
        router
            .execute_tool("builtin:read_file", json!({}), ctx.clone())
            .await
            .unwrap();

        let hits = router.search_tools("", &ctx, None);
        assert_eq!(hits[0].tool.id, "builtin:read_file");
        assert_eq!(hits[0].tool.usage.usage_count, 1);
        assert!(hits[0].tool.usage.last_used.is_some());
        router.shutdown();
    }
}
