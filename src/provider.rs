//! Tool provider interface.
//!
//! A provider is a source of tools: either the embedded/builtin
//! implementation or an externally registered one. The router never
//! assumes a transport; providers are dependency-injected
//! `Arc<dyn ToolProvider>` implementations, which also makes them
//! trivially mockable in tests.
//!
//! [`StaticProvider`] is a ready-made in-memory implementation backed by
//! descriptor/handler pairs. It doubles as the embedded provider for
//! simple deployments and as the standard test fixture.

use crate::catalog::{InputSchema, SourceHealth, SourceKind};
use crate::error::ProviderError;
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Raw tool descriptor as reported by a provider.
///
/// Discovery normalizes descriptors into catalog entries; providers
/// only describe what they expose.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescriptor {
    /// Tool name, unique within the provider.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Parameter schema.
    pub input_schema: InputSchema,
    /// Optional output schema.
    pub output_schema: Option<InputSchema>,
}

impl ToolDescriptor {
    /// Descriptor with an empty schema.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: InputSchema::empty(),
            output_schema: None,
        }
    }

    /// Sets the input schema.
    pub fn with_input_schema(mut self, schema: InputSchema) -> Self {
        self.input_schema = schema;
        self
    }
}

/// A source of callable tools.
///
/// The capability set is deliberately small: list, call, health. Calls
/// receive a [`CancellationToken`]; implementations must observe it and
/// stop work when it fires, returning [`ProviderError::Cancelled`].
///
/// # Examples
///
/// ```rust
/// use tool_router::provider::{StaticProvider, ToolDescriptor, ToolProvider};
/// use tool_router::catalog::SourceKind;
/// use serde_json::json;
/// use tokio_util::sync::CancellationToken;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let provider = StaticProvider::builder("builtin", SourceKind::Builtin)
///     .tool(ToolDescriptor::new("echo", "Echoes input"), |params| async move {
///         Ok(params)
///     })
///     .build();
///
/// let tools = provider.list_tools().await.unwrap();
/// assert_eq!(tools.len(), 1);
///
/// let out = provider
///     .call_tool("echo", json!({"a": 1}), CancellationToken::new())
///     .await
///     .unwrap();
/// assert_eq!(out["a"], 1);
/// # }
/// ```
#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// Stable source identifier.
    fn id(&self) -> &str;

    /// Display name of the provider.
    fn display_name(&self) -> &str {
        self.id()
    }

    /// Builtin or external.
    fn kind(&self) -> SourceKind;

    /// Lists the tools this provider currently exposes.
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ProviderError>;

    /// Calls a tool by name.
    ///
    /// Implementations must observe `cancel` and abandon work when it
    /// fires.
    async fn call_tool(
        &self,
        name: &str,
        params: Value,
        cancel: CancellationToken,
    ) -> Result<Value, ProviderError>;

    /// Current connectivity/health snapshot.
    async fn health(&self) -> SourceHealth {
        SourceHealth::healthy()
    }
}

/// Boxed async handler backing one [`StaticProvider`] tool.
pub type ToolHandler =
    Arc<dyn Fn(Value) -> BoxFuture<'static, Result<Value, ProviderError>> + Send + Sync>;

/// In-memory provider backed by descriptor/handler pairs.
///
/// Handlers run under a `select!` against the cancellation token, so
/// cancellation is observed even when a handler never resolves.
pub struct StaticProvider {
    id: String,
    display_name: String,
    kind: SourceKind,
    descriptors: Vec<ToolDescriptor>,
    handlers: HashMap<String, ToolHandler>,
}

impl StaticProvider {
    /// Starts building a provider with the given id and kind.
    pub fn builder(id: impl Into<String>, kind: SourceKind) -> StaticProviderBuilder {
        let id = id.into();
        StaticProviderBuilder {
            display_name: id.clone(),
            id,
            kind,
            descriptors: Vec::new(),
            handlers: HashMap::new(),
        }
    }
}

impl std::fmt::Debug for StaticProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticProvider")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("tools", &self.descriptors.len())
            .finish()
    }
}

#[async_trait]
impl ToolProvider for StaticProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ProviderError> {
        Ok(self.descriptors.clone())
    }

    async fn call_tool(
        &self,
        name: &str,
        params: Value,
        cancel: CancellationToken,
    ) -> Result<Value, ProviderError> {
        let handler = self
            .handlers
            .get(name)
            .ok_or_else(|| ProviderError::ToolNotFound(name.to_string()))?;

        let call = handler(params);
        tokio::select! {
            _ = cancel.cancelled() => Err(ProviderError::Cancelled),
            result = call => result,
        }
    }
}

/// Builder for [`StaticProvider`].
pub struct StaticProviderBuilder {
    id: String,
    display_name: String,
    kind: SourceKind,
    descriptors: Vec<ToolDescriptor>,
    handlers: HashMap<String, ToolHandler>,
}

impl StaticProviderBuilder {
    /// Sets the display name (defaults to the id).
    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    /// Registers a tool with an async handler.
    pub fn tool<F, Fut>(mut self, descriptor: ToolDescriptor, handler: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<Value, ProviderError>> + Send + 'static,
    {
        let name = descriptor.name.clone();
        self.descriptors.push(descriptor);
        self.handlers
            .insert(name, Arc::new(move |params| Box::pin(handler(params))));
        self
    }

    /// Finishes the build.
    pub fn build(self) -> StaticProvider {
        StaticProvider {
            id: self.id,
            display_name: self.display_name,
            kind: self.kind,
            descriptors: self.descriptors,
            handlers: self.handlers,
        }
    }
}

/// Thread-safe registry of providers, keyed by source id.
///
/// Shared between discovery (listing) and the execution router
/// (dispatch) so both always agree on the live provider set.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: dashmap::DashMap<String, Arc<dyn ToolProvider>>,
}

impl ProviderRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a provider, replacing any previous one with the same id.
    pub fn register(&self, provider: Arc<dyn ToolProvider>) {
        self.providers.insert(provider.id().to_string(), provider);
    }

    /// Removes a provider by id, returning whether it existed.
    pub fn unregister(&self, source_id: &str) -> bool {
        self.providers.remove(source_id).is_some()
    }

    /// Looks up a provider by id.
    pub fn get(&self, source_id: &str) -> Option<Arc<dyn ToolProvider>> {
        self.providers.get(source_id).map(|p| Arc::clone(&p))
    }

    /// Snapshot of all registered providers.
    pub fn all(&self) -> Vec<Arc<dyn ToolProvider>> {
        self.providers.iter().map(|p| Arc::clone(&p)).collect()
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether no providers are registered.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.providers.len())
            .finish()
    }
}
