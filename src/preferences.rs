//! User preferences and adaptive source weights.
//!
//! The preference document holds per-source trust weights, conflict
//! rule overrides, category visibility, and global execution policy.
//! It is loaded once at startup (any load failure falls back to
//! defaults with a warning, never blocks) and re-persisted in full
//! after every mutation.
//!
//! Source weights adapt slowly to observed outcomes: `+0.001` per
//! success, `-0.002` per failure, clamped to `[0.1, 1.0]`. The
//! asymmetry penalizes failure twice as fast as success rewards.

use crate::conflict::ConflictRule;
use crate::error::PreferenceError;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Weight assigned to a source the user has expressed no opinion on.
pub const DEFAULT_SOURCE_WEIGHT: f64 = 0.8;

const WEIGHT_MIN: f64 = 0.1;
const WEIGHT_MAX: f64 = 1.0;
const SUCCESS_NUDGE: f64 = 0.001;
const FAILURE_NUDGE: f64 = 0.002;

/// Trust and enablement of one tool source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcePreference {
    /// Source identifier.
    pub source_id: String,
    /// Trust weight in `[0.1, 1.0]`.
    pub weight: f64,
    /// Whether the source's tools are offered at all.
    pub enabled: bool,
}

/// Visibility of one category in presentation layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryVisibility {
    /// Category identifier.
    pub category_id: String,
    /// Whether the category is shown.
    pub visible: bool,
    /// Display ordering priority.
    pub priority: u32,
}

/// The versioned preference document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserToolPreferences {
    /// Document schema version.
    pub version: u32,
    /// Per-source trust weights.
    pub sources: Vec<SourcePreference>,
    /// Conflict rule overrides, kept sorted by descending priority.
    pub conflict_rules: Vec<ConflictRule>,
    /// Category visibility settings.
    pub categories: Vec<CategoryVisibility>,
    /// Global execution timeout in milliseconds.
    pub max_execution_time_ms: u64,
    /// Whether failed executions may fall back to an alternative tool.
    pub enable_fallbacks: bool,
    /// Whether tool previews are shown before execution.
    pub show_preview: bool,
}

impl Default for UserToolPreferences {
    fn default() -> Self {
        Self {
            version: 1,
            sources: Vec::new(),
            conflict_rules: ConflictRule::default_rules(),
            categories: Vec::new(),
            max_execution_time_ms: 30_000,
            enable_fallbacks: true,
            show_preview: true,
        }
    }
}

impl UserToolPreferences {
    fn sort_rules(&mut self) {
        self.conflict_rules.sort_by(|a, b| b.priority.cmp(&a.priority));
    }
}

/// Persistence backend for the preference document.
///
/// The storage medium is the collaborator's concern; the router only
/// requires whole-document load and save.
pub trait PreferenceStore: Send + Sync {
    /// Loads the stored document, `None` when nothing was ever saved.
    fn load(&self) -> Result<Option<UserToolPreferences>, PreferenceError>;

    /// Persists the full document.
    fn save(&self, prefs: &UserToolPreferences) -> Result<(), PreferenceError>;
}

/// In-memory store, used in tests and ephemeral deployments.
#[derive(Debug, Default)]
pub struct MemoryStore {
    document: Mutex<Option<UserToolPreferences>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryStore {
    fn load(&self) -> Result<Option<UserToolPreferences>, PreferenceError> {
        Ok(self.document.lock().clone())
    }

    fn save(&self, prefs: &UserToolPreferences) -> Result<(), PreferenceError> {
        *self.document.lock() = Some(prefs.clone());
        Ok(())
    }
}

/// JSON file store.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Store backed by the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PreferenceStore for FileStore {
    fn load(&self) -> Result<Option<UserToolPreferences>, PreferenceError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn save(&self, prefs: &UserToolPreferences) -> Result<(), PreferenceError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(prefs)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}

/// Owns the live preference document and its adaptive weights.
pub struct PreferenceManager {
    store: Arc<dyn PreferenceStore>,
    prefs: RwLock<UserToolPreferences>,
}

impl PreferenceManager {
    /// Creates a manager over the given store, loading the stored
    /// document or falling back to defaults on any failure.
    pub fn load(store: Arc<dyn PreferenceStore>) -> Self {
        let prefs = match store.load() {
            Ok(Some(mut prefs)) => {
                prefs.sort_rules();
                debug!(sources = prefs.sources.len(), "loaded user preferences");
                prefs
            }
            Ok(None) => UserToolPreferences::default(),
            Err(error) => {
                warn!(error = %error, "failed to load preferences, using defaults");
                UserToolPreferences::default()
            }
        };
        Self {
            store,
            prefs: RwLock::new(prefs),
        }
    }

    /// Snapshot of the current document.
    pub fn document(&self) -> UserToolPreferences {
        self.prefs.read().clone()
    }

    /// Trust weight of a source; unknown sources get the default.
    pub fn source_weight(&self, source_id: &str) -> f64 {
        self.prefs
            .read()
            .sources
            .iter()
            .find(|s| s.source_id == source_id)
            .map(|s| s.weight)
            .unwrap_or(DEFAULT_SOURCE_WEIGHT)
    }

    /// Whether a source is enabled; unknown sources are enabled.
    pub fn source_enabled(&self, source_id: &str) -> bool {
        self.prefs
            .read()
            .sources
            .iter()
            .find(|s| s.source_id == source_id)
            .map(|s| s.enabled)
            .unwrap_or(true)
    }

    /// Whether fallback execution is enabled.
    pub fn fallbacks_enabled(&self) -> bool {
        self.prefs.read().enable_fallbacks
    }

    /// Global execution timeout policy.
    pub fn max_execution_time(&self) -> Duration {
        Duration::from_millis(self.prefs.read().max_execution_time_ms)
    }

    /// Current conflict rule list, sorted by descending priority.
    pub fn conflict_rules(&self) -> Vec<ConflictRule> {
        self.prefs.read().conflict_rules.clone()
    }

    /// Applies a mutation to the document, re-sorts conflict rules, and
    /// persists synchronously before returning.
    pub fn update<F>(&self, mutate: F)
    where
        F: FnOnce(&mut UserToolPreferences),
    {
        let snapshot = {
            let mut prefs = self.prefs.write();
            mutate(&mut prefs);
            prefs.sort_rules();
            prefs.clone()
        };
        self.persist(&snapshot);
    }

    /// Adds a conflict rule override.
    pub fn add_conflict_rule(&self, rule: ConflictRule) {
        self.update(|prefs| prefs.conflict_rules.push(rule));
    }

    /// Enables or disables a source.
    pub fn set_source_enabled(&self, source_id: &str, enabled: bool) {
        self.update(|prefs| {
            entry(&mut prefs.sources, source_id).enabled = enabled;
        });
    }

    /// Nudges the owning source's weight after an execution outcome and
    /// persists the document.
    pub fn record_tool_usage(&self, source_id: &str, success: bool) {
        self.update(|prefs| {
            let source = entry(&mut prefs.sources, source_id);
            let nudge = if success { SUCCESS_NUDGE } else { -FAILURE_NUDGE };
            source.weight = (source.weight + nudge).clamp(WEIGHT_MIN, WEIGHT_MAX);
        });
    }

    fn persist(&self, prefs: &UserToolPreferences) {
        if let Err(error) = self.store.save(prefs) {
            warn!(error = %error, "failed to persist preferences");
        }
    }
}

impl std::fmt::Debug for PreferenceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreferenceManager")
            .field("prefs", &*self.prefs.read())
            .finish()
    }
}

/// Existing source entry, or a fresh default-weight one.
fn entry<'a>(sources: &'a mut Vec<SourcePreference>, source_id: &str) -> &'a mut SourcePreference {
    let index = match sources.iter().position(|s| s.source_id == source_id) {
        Some(index) => index,
        None => {
            sources.push(SourcePreference {
                source_id: source_id.to_string(),
                weight: DEFAULT_SOURCE_WEIGHT,
                enabled: true,
            });
            sources.len() - 1
        }
    };
    &mut sources[index]
}
