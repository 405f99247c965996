//! # tool-router
//!
//! A unified tool router: a runtime catalog that merges callable tools
//! exposed by multiple independent providers, ranks them by contextual
//! relevance, resolves naming conflicts between providers, and executes
//! the chosen tool with timeout, cancellation, and single-level
//! fallback semantics.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │                  UnifiedToolRouter                    │
//! │  ┌───────────┐  ┌──────────┐  ┌────────────────────┐  │
//! │  │ Discovery │→ │ Conflict │→ │  Catalog snapshot  │  │
//! │  └───────────┘  │ Resolver │  └─────────┬──────────┘  │
//! │                 └──────────┘            │             │
//! │  ┌───────────┐  ┌──────────┐  ┌─────────▼──────────┐  │
//! │  │ Analyzer  │→ │  Search  │← │    SearchIndex     │  │
//! │  └───────────┘  └──────────┘  └────────────────────┘  │
//! │  ┌───────────┐  ┌──────────┐  ┌────────────────────┐  │
//! │  │ Prefs     │↔ │ Executor │↔ │ PerformanceMonitor │  │
//! │  └───────────┘  └──────────┘  └────────────────────┘  │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! Discovery queries every registered [`provider::ToolProvider`]
//! concurrently and fault-isolated, the conflict resolver deduplicates
//! tools that normalize to the same name, and the result is published
//! as an atomic catalog snapshot that search and execution read without
//! locking against refreshes.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use tool_router::{
//!     catalog::SourceKind,
//!     context::RequestContext,
//!     provider::{StaticProvider, ToolDescriptor},
//!     router::UnifiedToolRouter,
//! };
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
//! let result = router.execute_tool("builtin:echo", json!({"x": 1}), ctx).await?;
//! assert!(result.success);
//! router.shutdown();
//! # Ok(())
//! # }
//! ```

pub mod analyzer;
pub mod catalog;
pub mod classify;
pub mod config;
pub mod conflict;
pub mod context;
pub mod discovery;
pub mod error;
pub mod events;
pub mod executor;
pub mod monitor;
pub mod preferences;
pub mod provider;
pub mod router;
pub mod search;

pub use analyzer::ContextAnalyzer;
pub use catalog::{Catalog, UnifiedTool};
pub use config::RouterConfig;
pub use conflict::{ConflictResolver, ConflictRule, ResolutionStrategy};
pub use context::{ProjectContext, RequestContext};
pub use error::{ExecutionError, ExecutionErrorKind, ProviderError, Result, RouterError};
pub use events::{EventBus, RouterEvent};
pub use executor::{ExecutionRouter, ExecutionState, ToolExecutionResult};
pub use monitor::{PerformanceMetrics, PerformanceMonitor, PerformanceThresholds};
pub use preferences::{
    FileStore, MemoryStore, PreferenceManager, PreferenceStore, UserToolPreferences,
};
pub use provider::{StaticProvider, ToolDescriptor, ToolProvider};
pub use router::{ToolPreview, UnifiedToolRouter, UnifiedToolRouterBuilder};
pub use search::{SearchHit, SearchIndex, SearchOptions};
