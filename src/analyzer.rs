//! Context relevance scoring.
//!
//! Scores how well a tool fits the caller's current situation as a
//! weighted average of five bounded factors: domain-mode match (0.30),
//! project-context match (0.25), current-file-type match (0.20), usage
//! recency (0.15), and time-of-day fit (0.10).
//!
//! Missing optional context omits the factor's weight from both the
//! numerator and denominator, so the composite stays a proper weighted
//! average over the factors that actually apply. A tool that has never
//! run carries no recency signal either way, so that factor is omitted
//! too.

use crate::catalog::{ContextRelevance, UnifiedTool};
use crate::context::RequestContext;
use chrono::{DateTime, Timelike, Utc};
use std::collections::HashMap;

/// Composite score above which a tool counts as relevant to a context.
pub const RELEVANCE_THRESHOLD: f64 = 0.3;

const DOMAIN_WEIGHT: f64 = 0.30;
const PROJECT_WEIGHT: f64 = 0.25;
const FILE_WEIGHT: f64 = 0.20;
const RECENCY_WEIGHT: f64 = 0.15;
const TIME_WEIGHT: f64 = 0.10;

/// Scores tool relevance against a [`RequestContext`].
#[derive(Debug, Clone)]
pub struct ContextAnalyzer {
    threshold: f64,
    /// Category id -> file extensions that category typically touches.
    extensions: HashMap<String, Vec<&'static str>>,
}

impl Default for ContextAnalyzer {
    fn default() -> Self {
        let mut extensions: HashMap<String, Vec<&'static str>> = HashMap::new();
        extensions.insert(
            "programming".to_string(),
            vec!["rs", "py", "js", "ts", "java", "c", "cpp", "go", "rb", "sh"],
        );
        extensions.insert(
            "files".to_string(),
            vec!["txt", "csv", "json", "yaml", "toml", "log"],
        );
        extensions.insert("web".to_string(), vec!["html", "css", "js", "ts", "json"]);
        extensions.insert("mathematics".to_string(), vec!["ipynb", "m", "csv"]);
        extensions.insert("language".to_string(), vec!["md", "txt", "tex"]);
        Self {
            threshold: RELEVANCE_THRESHOLD,
            extensions,
        }
    }
}

impl ContextAnalyzer {
    /// Analyzer with the default threshold and extension table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the relevance threshold.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Composite relevance of `tool` to `ctx`, in `[0, 1]`.
    pub fn score(&self, tool: &UnifiedTool, ctx: &RequestContext) -> f64 {
        self.score_at(tool, ctx, Utc::now())
    }

    /// Like [`score`](Self::score) but against an explicit clock, so
    /// time-dependent factors are testable deterministically.
    pub fn score_at(&self, tool: &UnifiedTool, ctx: &RequestContext, now: DateTime<Utc>) -> f64 {
        let mut numerator = 0.0;
        let mut denominator = 0.0;
        let mut add = |weight: f64, factor: Option<f64>| {
            if let Some(value) = factor {
                numerator += weight * value.clamp(0.0, 1.0);
                denominator += weight;
            }
        };

        add(DOMAIN_WEIGHT, Some(self.domain_factor(tool, ctx)));
        add(PROJECT_WEIGHT, self.project_factor(tool, ctx));
        add(FILE_WEIGHT, self.file_factor(tool, ctx));
        add(RECENCY_WEIGHT, Self::recency_factor(tool, now));
        add(TIME_WEIGHT, Some(Self::time_of_day_factor(tool, now)));

        if denominator == 0.0 {
            return 0.0;
        }
        (numerator / denominator).clamp(0.0, 1.0)
    }

    /// Whether `tool` clears the relevance threshold for `ctx`.
    pub fn is_relevant(&self, tool: &UnifiedTool, ctx: &RequestContext) -> bool {
        self.score(tool, ctx) > self.threshold
    }

    /// Builds the relevance snapshot stored on a tool after scoring.
    pub fn relevance_snapshot(
        &self,
        tool: &UnifiedTool,
        ctx: &RequestContext,
        now: DateTime<Utc>,
    ) -> ContextRelevance {
        ContextRelevance {
            project_types: ctx
                .project
                .as_ref()
                .map(|p| vec![p.project_type.clone()])
                .unwrap_or_default(),
            domain_modes: vec![ctx.domain_mode.clone()],
            file_types: ctx.current_file_extension().into_iter().collect(),
            keywords: tool.tags.clone(),
            score: self.score_at(tool, ctx, now),
        }
    }

    /// Domain-mode match: exact category match 1.0, declared mode 0.8,
    /// tag overlap scaled by ratio, else a low floor.
    fn domain_factor(&self, tool: &UnifiedTool, ctx: &RequestContext) -> f64 {
        let mode = ctx.domain_mode.to_lowercase();
        if tool.category.id == mode {
            return 1.0;
        }
        if tool
            .category
            .domain_modes
            .iter()
            .any(|m| m.to_lowercase() == mode)
        {
            return 0.8;
        }
        if !tool.tags.is_empty() {
            let overlap = tool
                .tags
                .iter()
                .filter(|tag| mode.contains(tag.as_str()) || tag.contains(&mode))
                .count();
            if overlap > 0 {
                return 0.3 + 0.4 * (overlap as f64 / tool.tags.len() as f64);
            }
        }
        0.1
    }

    /// Project match tiers: project type > language > framework >
    /// dependency name, matched as substrings of the tool's text.
    fn project_factor(&self, tool: &UnifiedTool, ctx: &RequestContext) -> Option<f64> {
        let project = ctx.project.as_ref()?;
        let haystack = format!(
            "{} {} {}",
            tool.name.to_lowercase(),
            tool.description.to_lowercase(),
            tool.tags.join(" ")
        );

        let declared = tool
            .relevance
            .as_ref()
            .map(|r| &r.project_types)
            .map(|types| {
                types
                    .iter()
                    .any(|t| t.to_lowercase() == project.project_type.to_lowercase())
            })
            .unwrap_or(false);
        if declared || haystack.contains(&project.project_type.to_lowercase()) {
            return Some(1.0);
        }
        if let Some(language) = &project.language {
            if haystack.contains(&language.to_lowercase()) {
                return Some(0.8);
            }
        }
        if let Some(framework) = &project.framework {
            if haystack.contains(&framework.to_lowercase()) {
                return Some(0.7);
            }
        }
        if project
            .dependencies
            .iter()
            .any(|dep| haystack.contains(&dep.to_lowercase()))
        {
            return Some(0.5);
        }
        Some(0.2)
    }

    /// File-type match against the tool's declared file types, then the
    /// category extension table.
    fn file_factor(&self, tool: &UnifiedTool, ctx: &RequestContext) -> Option<f64> {
        let ext = ctx.current_file_extension()?;
        let declared = tool
            .relevance
            .as_ref()
            .map(|r| r.file_types.iter().any(|t| t.to_lowercase() == ext))
            .unwrap_or(false);
        if declared {
            return Some(1.0);
        }
        let in_table = self
            .extensions
            .get(&tool.category.id)
            .map(|exts| exts.contains(&ext.as_str()))
            .unwrap_or(false);
        Some(if in_table { 0.9 } else { 0.1 })
    }

    /// Recency buckets by hours since last use, with a usage-count
    /// floor for frequently-used tools. `None` when the tool has never
    /// run, which drops the factor from the average entirely.
    fn recency_factor(tool: &UnifiedTool, now: DateTime<Utc>) -> Option<f64> {
        if tool.usage.usage_count == 0 && tool.usage.last_used.is_none() {
            return None;
        }
        let base: f64 = match tool.usage.last_used {
            Some(last_used) => {
                let hours = (now - last_used).num_minutes() as f64 / 60.0;
                if hours < 1.0 {
                    1.0
                } else if hours < 24.0 {
                    0.8
                } else if hours < 24.0 * 7.0 {
                    0.5
                } else if hours < 24.0 * 30.0 {
                    0.3
                } else {
                    0.1
                }
            }
            None => 0.1,
        };
        let floored = if tool.usage.usage_count >= 10 {
            base.max(0.4)
        } else {
            base
        };
        Some(floored)
    }

    /// Category-specific time-of-day heuristic over the UTC hour.
    fn time_of_day_factor(tool: &UnifiedTool, now: DateTime<Utc>) -> f64 {
        let hour = now.hour();
        match tool.category.id.as_str() {
            "programming" => {
                if (9..18).contains(&hour) {
                    0.8
                } else {
                    0.5
                }
            }
            "mathematics" | "science" | "language" => {
                if (8..22).contains(&hour) {
                    0.7
                } else {
                    0.5
                }
            }
            _ => 0.5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{
        Availability, InputSchema, SourceHealth, SourceKind, ToolCategory, ToolSource, UsageStats,
    };
    use crate::context::ProjectContext;
    use chrono::TimeZone;

    fn tool_in_category(category_id: &str) -> UnifiedTool {
        let mut category = ToolCategory::general();
        if category_id != "general" {
            category.id = category_id.to_string();
            category.display_name = category_id.to_string();
        }
        UnifiedTool {
            id: format!("builtin:{category_id}"),
            name: category_id.to_string(),
            description: String::new(),
            source: ToolSource {
                id: "builtin".into(),
                name: "builtin".into(),
                kind: SourceKind::Builtin,
                health: SourceHealth::healthy(),
            },
            category,
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

    fn two_pm() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 3, 14, 0, 0).unwrap()
    }

    #[test]
    fn test_programming_tool_outscores_general_in_programming_mode() {
        let analyzer = ContextAnalyzer::new();
        let ctx = RequestContext::new("s", "r").with_domain_mode("programming");

        let programming = analyzer.score_at(&tool_in_category("programming"), &ctx, two_pm());
        let general = analyzer.score_at(&tool_in_category("general"), &ctx, two_pm());

        assert!(programming >= 0.9, "programming scored {programming}");
        assert!(general < 0.3, "general scored {general}");
    }

    #[test]
    fn test_declared_domain_mode_scores_below_exact_match() {
        let analyzer = ContextAnalyzer::new();
        let ctx = RequestContext::new("s", "r").with_domain_mode("physics");

        let mut math = tool_in_category("mathematics");
        math.category.domain_modes = vec!["mathematics".into(), "physics".into()];

        let declared = analyzer.score_at(&math, &ctx, two_pm());
        let exact = analyzer.score_at(
            &tool_in_category("mathematics"),
            &RequestContext::new("s", "r").with_domain_mode("mathematics"),
            two_pm(),
        );
        assert!(declared < exact);
        assert!(declared > 0.3);
    }

    #[test]
    fn test_project_factor_tiers() {
        let analyzer = ContextAnalyzer::new();
        let ctx = |project: ProjectContext| RequestContext::new("s", "r").with_project(project);

        let mut tool = tool_in_category("programming");
        tool.description = "Formats rust source files with cargo".into();

        // Project type is a direct substring hit.
        let by_type = analyzer.project_factor(
            &tool,
            &ctx(ProjectContext {
                project_type: "rust".into(),
                ..ProjectContext::default()
            }),
        );
        assert_eq!(by_type, Some(1.0));

        // Only the dependency name matches.
        let by_dep = analyzer.project_factor(
            &tool,
            &ctx(ProjectContext {
                project_type: "embedded".into(),
                dependencies: vec!["cargo".into()],
                ..ProjectContext::default()
            }),
        );
        assert_eq!(by_dep, Some(0.5));

        // Nothing matches.
        let none = analyzer.project_factor(
            &tool,
            &ctx(ProjectContext {
                project_type: "android".into(),
                ..ProjectContext::default()
            }),
        );
        assert_eq!(none, Some(0.2));
    }

    #[test]
    fn test_missing_project_omits_factor() {
        let analyzer = ContextAnalyzer::new();
        let tool = tool_in_category("programming");
        assert!(analyzer
            .project_factor(&tool, &RequestContext::new("s", "r"))
            .is_none());
    }

    #[test]
    fn test_file_factor_uses_category_table() {
        let analyzer = ContextAnalyzer::new();
        let ctx = RequestContext::new("s", "r").with_project(ProjectContext {
            project_type: "rust".into(),
            current_file: Some("src/lib.rs".into()),
            ..ProjectContext::default()
        });

        let programming = analyzer.file_factor(&tool_in_category("programming"), &ctx);
        assert_eq!(programming, Some(0.9));

        let general = analyzer.file_factor(&tool_in_category("general"), &ctx);
        assert_eq!(general, Some(0.1));
    }

    #[test]
    fn test_recency_buckets_decrease() {
        let now = two_pm();
        let mut tool = tool_in_category("general");
        tool.usage.usage_count = 1;

        tool.usage.last_used = Some(now - chrono::Duration::minutes(30));
        let fresh = ContextAnalyzer::recency_factor(&tool, now).unwrap();

        tool.usage.last_used = Some(now - chrono::Duration::days(2));
        let stale = ContextAnalyzer::recency_factor(&tool, now).unwrap();

        tool.usage.last_used = Some(now - chrono::Duration::days(90));
        let ancient = ContextAnalyzer::recency_factor(&tool, now).unwrap();

        assert!(fresh > stale && stale > ancient);
        assert_eq!(fresh, 1.0);
        assert_eq!(ancient, 0.1);
    }

    #[test]
    fn test_recency_usage_count_floor() {
        let now = two_pm();
        let mut tool = tool_in_category("general");
        tool.usage.usage_count = 50;
        tool.usage.last_used = Some(now - chrono::Duration::days(90));
        assert_eq!(ContextAnalyzer::recency_factor(&tool, now), Some(0.4));
    }

    #[test]
    fn test_never_used_tool_has_no_recency_factor() {
        let tool = tool_in_category("general");
        assert!(ContextAnalyzer::recency_factor(&tool, two_pm()).is_none());
    }

    #[test]
    fn test_score_bounded() {
        let analyzer = ContextAnalyzer::new();
        let now = two_pm();
        let ctx = RequestContext::new("s", "r")
            .with_domain_mode("programming")
            .with_project(ProjectContext {
                project_type: "rust".into(),
                current_file: Some("src/lib.rs".into()),
                ..ProjectContext::default()
            });

        let mut tool = tool_in_category("programming");
        tool.description = "rust tooling".into();
        tool.usage.usage_count = 5;
        tool.usage.last_used = Some(now - chrono::Duration::minutes(5));

        let score = analyzer.score_at(&tool, &ctx, now);
        assert!((0.0..=1.0).contains(&score));
        assert!(score > 0.9);
    }

    #[test]
    fn test_is_relevant_threshold() {
        let analyzer = ContextAnalyzer::new();
        let ctx = RequestContext::new("s", "r").with_domain_mode("programming");
        assert!(analyzer.is_relevant(&tool_in_category("programming"), &ctx));
        assert!(!analyzer.is_relevant(&tool_in_category("general"), &ctx));
    }

    #[test]
    fn test_relevance_snapshot_carries_score() {
        let analyzer = ContextAnalyzer::new();
        let ctx = RequestContext::new("s", "r").with_domain_mode("programming");
        let snapshot =
            analyzer.relevance_snapshot(&tool_in_category("programming"), &ctx, two_pm());
        assert_eq!(snapshot.domain_modes, vec!["programming".to_string()]);
        assert!(snapshot.score >= 0.9);
    }
}
