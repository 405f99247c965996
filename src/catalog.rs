//! Unified tool catalog model.
//!
//! The catalog is the shared data model of the router: one
//! [`UnifiedTool`] per logically-distinct callable, combining the
//! provider's raw descriptor with computed metadata (category,
//! relevance, availability, usage statistics, conflict records).
//!
//! The [`Catalog`] itself is a snapshot store: refresh cycles publish a
//! whole new map atomically, so concurrent readers never observe a
//! half-built catalog. Readers hold an `Arc` to the snapshot they
//! started with; absence of a tool from the next snapshot is removal.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Health classification of a tool source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// The source answers discovery and calls normally.
    Healthy,
    /// The source answers but with elevated error rates or latency.
    Degraded,
    /// The source answers discovery but calls are mostly failing.
    Unhealthy,
    /// The source did not answer at all.
    Offline,
}

/// Point-in-time health snapshot of a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceHealth {
    /// Current classification.
    pub status: HealthStatus,
    /// When the source was last checked.
    pub last_check: DateTime<Utc>,
    /// Observed error rate in `[0, 1]`.
    pub error_rate: f64,
}

impl SourceHealth {
    /// A healthy snapshot taken now.
    pub fn healthy() -> Self {
        Self {
            status: HealthStatus::Healthy,
            last_check: Utc::now(),
            error_rate: 0.0,
        }
    }

    /// An offline snapshot taken now.
    pub fn offline() -> Self {
        Self {
            status: HealthStatus::Offline,
            last_check: Utc::now(),
            error_rate: 1.0,
        }
    }

    /// Numeric score used by performance-based conflict resolution.
    pub fn score(&self) -> f64 {
        match self.status {
            HealthStatus::Healthy => 1.0,
            HealthStatus::Degraded => 0.6,
            HealthStatus::Unhealthy => 0.3,
            HealthStatus::Offline => 0.0,
        }
    }
}

/// Whether a source is the embedded provider or externally registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// The embedded/builtin provider.
    Builtin,
    /// Any externally-registered provider.
    External,
}

/// Identity and health of the provider a tool came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSource {
    /// Stable source identifier (unique across registered providers).
    pub id: String,
    /// Display name of the provider.
    pub name: String,
    /// Builtin or external.
    pub kind: SourceKind,
    /// Health snapshot taken at the last discovery cycle.
    pub health: SourceHealth,
}

/// Classification assigned to a tool at discovery time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCategory {
    /// Stable category identifier, e.g. `"programming"`.
    pub id: String,
    /// Human-readable name.
    pub display_name: String,
    /// Icon hint for presentation layers.
    pub icon: String,
    /// Ordering priority (lower sorts first).
    pub priority: u32,
    /// Domain modes this category is relevant to.
    pub domain_modes: Vec<String>,
}

impl ToolCategory {
    /// The default category for tools no keyword rule matched.
    pub fn general() -> Self {
        Self {
            id: "general".to_string(),
            display_name: "General".to_string(),
            icon: "toolbox".to_string(),
            priority: 100,
            domain_modes: Vec::new(),
        }
    }
}

/// Parameter value types understood by the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    /// UTF-8 string.
    String,
    /// Integer or float.
    Number,
    /// Boolean flag.
    Boolean,
    /// JSON array.
    Array,
    /// JSON object.
    Object,
}

/// Optional constraints on a single parameter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterConstraints {
    /// Closed set of allowed values, if any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_values: Vec<Value>,
    /// Inclusive minimum for numbers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Inclusive maximum for numbers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Regex pattern strings must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

/// Structural description of a single tool parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    /// Parameter name.
    pub name: String,
    /// Value type.
    pub kind: ParameterKind,
    /// Whether the parameter must be present.
    pub required: bool,
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Extra validation constraints.
    #[serde(default)]
    pub constraints: ParameterConstraints,
}

impl ParameterSpec {
    /// A required parameter of the given kind.
    pub fn required(name: impl Into<String>, kind: ParameterKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
            description: None,
            constraints: ParameterConstraints::default(),
        }
    }

    /// An optional parameter of the given kind.
    pub fn optional(name: impl Into<String>, kind: ParameterKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            description: None,
            constraints: ParameterConstraints::default(),
        }
    }
}

/// Structural parameter schema used for UI generation and
/// pre-execution validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputSchema {
    /// The declared parameters.
    pub parameters: Vec<ParameterSpec>,
}

impl InputSchema {
    /// Schema with no parameters.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Schema from a list of parameter specs.
    pub fn new(parameters: Vec<ParameterSpec>) -> Self {
        Self { parameters }
    }

    /// Names of required parameters missing from `params`.
    ///
    /// `params` is expected to be a JSON object; any other shape leaves
    /// every required parameter missing.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tool_router::catalog::{InputSchema, ParameterKind, ParameterSpec};
    /// use serde_json::json;
    ///
    /// let schema = InputSchema::new(vec![
    ///     ParameterSpec::required("path", ParameterKind::String),
    ///     ParameterSpec::optional("encoding", ParameterKind::String),
    /// ]);
    ///
    /// assert!(schema.missing_required(&json!({"path": "/tmp/a"})).is_empty());
    /// assert_eq!(schema.missing_required(&json!({})), vec!["path".to_string()]);
    /// ```
    pub fn missing_required(&self, params: &Value) -> Vec<String> {
        let object = params.as_object();
        self.parameters
            .iter()
            .filter(|spec| spec.required)
            .filter(|spec| {
                object
                    .and_then(|map| map.get(&spec.name))
                    .map(|value| value.is_null())
                    .unwrap_or(true)
            })
            .map(|spec| spec.name.clone())
            .collect()
    }
}

/// Mutable usage statistics, updated after every execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageStats {
    /// Total recorded executions.
    pub usage_count: u64,
    /// Mean execution time over the capped history, in milliseconds.
    pub average_execution_time_ms: f64,
    /// Success percentage in `[0, 100]`, recomputed from counts.
    pub success_rate: f64,
    /// When the tool last ran.
    pub last_used: Option<DateTime<Utc>>,
    /// Optional user rating in `[0, 5]`.
    pub user_rating: Option<f64>,
}

impl Default for UsageStats {
    fn default() -> Self {
        Self {
            usage_count: 0,
            average_execution_time_ms: 0.0,
            success_rate: 100.0,
            last_used: None,
            user_rating: None,
        }
    }
}

/// Last-computed context relevance snapshot.
///
/// Recomputed per search call; not persisted as ground truth.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextRelevance {
    /// Project types this tool applies to.
    pub project_types: Vec<String>,
    /// Domain modes this tool applies to.
    pub domain_modes: Vec<String>,
    /// File extensions this tool applies to.
    pub file_types: Vec<String>,
    /// Keywords that contributed to the score.
    pub keywords: Vec<String>,
    /// Weighted composite score in `[0, 1]`.
    pub score: f64,
}

/// Dispatch eligibility of a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AvailabilityStatus {
    /// Ready to dispatch.
    Available,
    /// Temporarily busy; a wait estimate may be present.
    Busy,
    /// Must not be dispatched except as a re-checked fallback target.
    Unavailable,
    /// The last availability check itself failed.
    Error,
}

/// Current dispatch eligibility snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Availability {
    /// Current status.
    pub status: AvailabilityStatus,
    /// When the status was last checked.
    pub last_checked: DateTime<Utc>,
    /// Estimated wait in milliseconds when busy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_wait_ms: Option<u64>,
    /// Error message when status is `Error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Availability {
    /// An `Available` snapshot taken now.
    pub fn available() -> Self {
        Self {
            status: AvailabilityStatus::Available,
            last_checked: Utc::now(),
            estimated_wait_ms: None,
            error: None,
        }
    }

    /// An `Unavailable` snapshot taken now.
    pub fn unavailable() -> Self {
        Self {
            status: AvailabilityStatus::Unavailable,
            last_checked: Utc::now(),
            estimated_wait_ms: None,
            error: None,
        }
    }

    /// Whether the tool may be dispatched right now.
    pub fn is_dispatchable(&self) -> bool {
        self.status == AvailabilityStatus::Available
    }
}

/// Record of a resolved naming conflict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictRecord {
    /// Catalog ids of the candidates this tool was resolved against.
    pub competitor_ids: Vec<String>,
    /// Strategy tag that picked the winner.
    pub strategy: String,
    /// When the resolution happened.
    pub resolved_at: DateTime<Utc>,
}

/// One catalog entry per logically-distinct callable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedTool {
    /// Stable id, derived as `"{source_id}:{name}"`.
    pub id: String,
    /// Tool name as exposed by its provider.
    pub name: String,
    /// Tool description.
    pub description: String,
    /// Owning provider identity and health.
    pub source: ToolSource,
    /// Discovery-time classification.
    pub category: ToolCategory,
    /// Parameter schema.
    pub input_schema: InputSchema,
    /// Optional output schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<InputSchema>,
    /// Free-text keywords extracted from name/description.
    pub tags: Vec<String>,
    /// Mutable usage statistics.
    pub usage: UsageStats,
    /// Last-computed relevance snapshot, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance: Option<ContextRelevance>,
    /// Current dispatch eligibility.
    pub availability: Availability,
    /// Conflicts this tool was resolved against.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<ConflictRecord>,
    /// User/source trust weight, clamped to `[0.1, 1.0]`.
    pub preference_weight: f64,
}

impl UnifiedTool {
    /// Derives the stable catalog id for a source/tool pair.
    pub fn derive_id(source_id: &str, name: &str) -> String {
        format!("{source_id}:{name}")
    }
}

/// Atomic snapshot store over the live tool map.
///
/// `publish` replaces the entire map in one swap; `snapshot` hands out
/// the current `Arc`, so readers are never blocked by a refresh and
/// never see partial state. Point mutations (usage stats after an
/// execution) go through [`Catalog::update_tool`], which copies the map,
/// applies the closure, and swaps — cheap at catalog sizes and it keeps
/// the "readers see whole snapshots" property.
#[derive(Debug)]
pub struct Catalog {
    tools: RwLock<Arc<HashMap<String, UnifiedTool>>>,
}

impl Catalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self {
            tools: RwLock::new(Arc::new(HashMap::new())),
        }
    }

    /// Atomically replaces the live map with the given tools.
    ///
    /// Later entries win on id collisions; conflict resolution upstream
    /// guarantees name-level uniqueness before this point.
    pub fn publish(&self, tools: Vec<UnifiedTool>) {
        let map: HashMap<String, UnifiedTool> = tools
            .into_iter()
            .map(|tool| (tool.id.clone(), tool))
            .collect();
        *self.tools.write() = Arc::new(map);
    }

    /// Returns the current snapshot.
    pub fn snapshot(&self) -> Arc<HashMap<String, UnifiedTool>> {
        Arc::clone(&self.tools.read())
    }

    /// Looks up a tool by id in the current snapshot.
    pub fn get(&self, id: &str) -> Option<UnifiedTool> {
        self.tools.read().get(id).cloned()
    }

    /// Number of tools in the current snapshot.
    pub fn len(&self) -> usize {
        self.tools.read().len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Applies a point mutation to one tool, publishing a new snapshot.
    ///
    /// Returns `false` when the id is not present (e.g. the tool was
    /// dropped by a refresh that completed while the execution ran).
    pub fn update_tool<F>(&self, id: &str, mutate: F) -> bool
    where
        F: FnOnce(&mut UnifiedTool),
    {
        let mut guard = self.tools.write();
        if !guard.contains_key(id) {
            return false;
        }
        let mut map: HashMap<String, UnifiedTool> = (**guard).clone();
        if let Some(tool) = map.get_mut(id) {
            mutate(tool);
        }
        *guard = Arc::new(map);
        true
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}
