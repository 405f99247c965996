//! Caller-supplied request context.
//!
//! Every search and execute call carries a [`RequestContext`]: who is
//! asking (session/request ids), what they are doing (domain mode,
//! project metadata, current file), and the execution policy for this
//! call (timeout, fallback budget). The router never invents context; a
//! missing optional field simply drops the corresponding relevance
//! factor.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default per-call execution timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Project metadata supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectContext {
    /// Project type, e.g. `"rust"`, `"web"`, `"data-science"`.
    pub project_type: String,
    /// Primary language.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Framework in use, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,
    /// Declared dependency names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    /// Files currently open in the caller's editor.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub open_files: Vec<String>,
    /// The file currently focused, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_file: Option<String>,
}

/// Situational data attached to one search or execute call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestContext {
    /// Caller session identifier.
    pub session_id: String,
    /// Caller request identifier; part of the execution dedup key.
    pub request_id: String,
    /// Active subject/domain mode, e.g. `"programming"`.
    pub domain_mode: String,
    /// Optional project metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectContext>,
    /// Per-call execution timeout.
    #[serde(with = "duration_millis")]
    pub timeout: Duration,
    /// Maximum fallback attempts (the router honors at most 1).
    pub max_fallbacks: u32,
}

impl RequestContext {
    /// Context with default policy (30s timeout, one fallback allowed).
    pub fn new(session_id: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            request_id: request_id.into(),
            domain_mode: "general".to_string(),
            project: None,
            timeout: DEFAULT_TIMEOUT,
            max_fallbacks: 1,
        }
    }

    /// Sets the domain mode.
    pub fn with_domain_mode(mut self, mode: impl Into<String>) -> Self {
        self.domain_mode = mode.into();
        self
    }

    /// Attaches project metadata.
    pub fn with_project(mut self, project: ProjectContext) -> Self {
        self.project = Some(project);
        self
    }

    /// Sets the execution timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the fallback budget.
    pub fn with_max_fallbacks(mut self, max_fallbacks: u32) -> Self {
        self.max_fallbacks = max_fallbacks;
        self
    }

    /// Extension of the currently focused file, lowercased.
    pub fn current_file_extension(&self) -> Option<String> {
        let file = self.project.as_ref()?.current_file.as_deref()?;
        let ext = file.rsplit_once('.')?.1;
        if ext.is_empty() || ext.contains('/') {
            return None;
        }
        Some(ext.to_lowercase())
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
