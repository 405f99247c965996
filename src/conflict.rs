//! Naming-conflict resolution between providers.
//!
//! Two providers exposing tools that normalize to the same logical name
//! (`read_file`, `readFile`, `ReadFileTool` all normalize to
//! `readfile`) is a conflict. Resolution walks an ordered rule list:
//! each rule is a regex over the normalized name plus a strategy, and
//! the highest-priority matching rule decides. A catch-all `.*` rule
//! always sits last, so every conflict resolves (or is explicitly
//! deferred by `UserChoice`).
//!
//! Resolution is deterministic: candidates are considered in id order
//! and score ties break on id, so the same input set with the same
//! rules always produces the same winner.

use crate::catalog::{ConflictRecord, SourceKind, UnifiedTool};
use crate::events::{EventBus, RouterEvent};
use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// How a naming conflict is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    /// Pick a builtin-sourced candidate when one exists.
    PreferBuiltin,
    /// Pick an externally-sourced candidate when one exists.
    PreferExternal,
    /// Pick the candidate with the best composite performance score.
    PerformanceBased,
    /// Keep all candidates; the caller decides.
    UserChoice,
}

impl ResolutionStrategy {
    /// Stable string tag, used in events and conflict records.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionStrategy::PreferBuiltin => "prefer_builtin",
            ResolutionStrategy::PreferExternal => "prefer_external",
            ResolutionStrategy::PerformanceBased => "performance_based",
            ResolutionStrategy::UserChoice => "user_choice",
        }
    }
}

/// One prioritized resolution rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictRule {
    /// Regex matched against the normalized tool name.
    pub pattern: String,
    /// Strategy applied when the pattern matches.
    pub strategy: ResolutionStrategy,
    /// Higher priority wins; the catch-all carries priority 0.
    pub priority: u32,
}

impl ConflictRule {
    /// Creates a rule.
    pub fn new(pattern: impl Into<String>, strategy: ResolutionStrategy, priority: u32) -> Self {
        Self {
            pattern: pattern.into(),
            strategy,
            priority,
        }
    }

    /// The default rule set: a single catch-all preferring builtins.
    pub fn default_rules() -> Vec<ConflictRule> {
        vec![ConflictRule::new(".*", ResolutionStrategy::PreferBuiltin, 0)]
    }
}

/// Normalizes a tool name for conflict grouping: lowercase, separators
/// stripped, trailing `tool`/`command` suffixes removed.
pub fn normalize_name(name: &str) -> String {
    let mut normalized: String = name
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect();
    for suffix in ["command", "tool"] {
        if let Some(stripped) = normalized.strip_suffix(suffix) {
            if !stripped.is_empty() {
                normalized = stripped.to_string();
            }
        }
    }
    normalized
}

struct CompiledRule {
    rule: ConflictRule,
    regex: Regex,
}

/// Applies the rule set to a discovered tool set.
pub struct ConflictResolver {
    rules: Vec<CompiledRule>,
    events: EventBus,
}

impl ConflictResolver {
    /// Builds a resolver from a rule list.
    ///
    /// Rules are kept sorted by descending priority; rules whose
    /// pattern fails to compile are dropped with a warning.
    pub fn new(rules: Vec<ConflictRule>, events: EventBus) -> Self {
        let mut compiled: Vec<CompiledRule> = rules
            .into_iter()
            .filter_map(|rule| match Regex::new(&rule.pattern) {
                Ok(regex) => Some(CompiledRule { rule, regex }),
                Err(error) => {
                    warn!(pattern = %rule.pattern, error = %error, "dropping invalid conflict rule");
                    None
                }
            })
            .collect();
        compiled.sort_by(|a, b| b.rule.priority.cmp(&a.rule.priority));
        Self {
            rules: compiled,
            events,
        }
    }

    /// Resolver with the default catch-all rule.
    pub fn with_defaults(events: EventBus) -> Self {
        Self::new(ConflictRule::default_rules(), events)
    }

    /// Resolves name conflicts, returning a set with at most one entry
    /// per normalized name (except where `UserChoice` defers).
    pub fn resolve(&self, tools: Vec<UnifiedTool>) -> Vec<UnifiedTool> {
        let mut groups: BTreeMap<String, Vec<UnifiedTool>> = BTreeMap::new();
        for tool in tools {
            groups.entry(normalize_name(&tool.name)).or_default().push(tool);
        }

        let mut resolved = Vec::new();
        for (normalized, mut candidates) in groups {
            if candidates.len() == 1 {
                resolved.append(&mut candidates);
                continue;
            }
            candidates.sort_by(|a, b| a.id.cmp(&b.id));

            self.events.emit(RouterEvent::ConflictDetected {
                normalized_name: normalized.clone(),
                candidate_ids: candidates.iter().map(|t| t.id.clone()).collect(),
            });

            let strategy = self.matching_strategy(&normalized);
            debug!(
                normalized_name = %normalized,
                candidates = candidates.len(),
                strategy = strategy.as_str(),
                "resolving tool name conflict"
            );

            if strategy == ResolutionStrategy::UserChoice {
                resolved.append(&mut candidates);
                continue;
            }

            let winner = self.pick_winner(strategy, &candidates);
            let mut winner_tool = candidates[winner].clone();
            winner_tool.conflicts.push(ConflictRecord {
                competitor_ids: candidates
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != winner)
                    .map(|(_, t)| t.id.clone())
                    .collect(),
                strategy: strategy.as_str().to_string(),
                resolved_at: Utc::now(),
            });

            self.events.emit(RouterEvent::ConflictResolved {
                normalized_name: normalized,
                winner_id: winner_tool.id.clone(),
                strategy: strategy.as_str().to_string(),
            });
            resolved.push(winner_tool);
        }
        resolved
    }

    /// Highest-priority rule whose pattern matches the normalized name.
    fn matching_strategy(&self, normalized: &str) -> ResolutionStrategy {
        self.rules
            .iter()
            .find(|c| c.regex.is_match(normalized))
            .map(|c| c.rule.strategy)
            .unwrap_or(ResolutionStrategy::PreferBuiltin)
    }

    /// Index of the winning candidate. Candidates arrive sorted by id
    /// and scores compare with strict `>`, so ties keep the earliest id.
    fn pick_winner(&self, strategy: ResolutionStrategy, candidates: &[UnifiedTool]) -> usize {
        let pool: Vec<usize> = match strategy {
            ResolutionStrategy::PreferBuiltin => {
                let builtins: Vec<usize> = indices_of_kind(candidates, SourceKind::Builtin);
                if builtins.is_empty() {
                    (0..candidates.len()).collect()
                } else {
                    builtins
                }
            }
            ResolutionStrategy::PreferExternal => {
                let externals: Vec<usize> = indices_of_kind(candidates, SourceKind::External);
                if externals.is_empty() {
                    (0..candidates.len()).collect()
                } else {
                    externals
                }
            }
            ResolutionStrategy::PerformanceBased => {
                return best_by(candidates, &(0..candidates.len()).collect::<Vec<_>>(), |t| {
                    performance_score(t)
                });
            }
            ResolutionStrategy::UserChoice => unreachable!("deferred before winner selection"),
        };
        best_by(candidates, &pool, select_best_score)
    }
}

fn indices_of_kind(candidates: &[UnifiedTool], kind: SourceKind) -> Vec<usize> {
    candidates
        .iter()
        .enumerate()
        .filter(|(_, t)| t.source.kind == kind)
        .map(|(i, _)| i)
        .collect()
}

/// First index in `pool` with the strictly greatest score.
fn best_by<F: Fn(&UnifiedTool) -> f64>(
    candidates: &[UnifiedTool],
    pool: &[usize],
    score: F,
) -> usize {
    let mut best = pool[0];
    let mut best_score = score(&candidates[best]);
    for &index in &pool[1..] {
        let s = score(&candidates[index]);
        if s > best_score {
            best = index;
            best_score = s;
        }
    }
    best
}

/// Composite performance score: success rate 0.4, inverse latency 0.3,
/// source health 0.2, usage count 0.1.
pub fn performance_score(tool: &UnifiedTool) -> f64 {
    let success = tool.usage.success_rate / 100.0;
    let latency = 1_000.0 / (1_000.0 + tool.usage.average_execution_time_ms.max(0.0));
    let health = tool.source.health.score();
    let usage = (tool.usage.usage_count.min(100) as f64) / 100.0;
    success * 0.4 + latency * 0.3 + health * 0.2 + usage * 0.1
}

/// General fallback scorer: performance 0.5, availability 0.25,
/// preference weight 0.15, user rating 0.1.
pub fn select_best_score(tool: &UnifiedTool) -> f64 {
    let availability = if tool.availability.is_dispatchable() {
        1.0
    } else {
        0.0
    };
    let rating = tool.usage.user_rating.unwrap_or(0.0) / 5.0;
    performance_score(tool) * 0.5
        + availability * 0.25
        + tool.preference_weight * 0.15
        + rating * 0.1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{
        Availability, InputSchema, SourceHealth, ToolCategory, ToolSource, UsageStats,
    };

    fn tool(source_id: &str, kind: SourceKind, name: &str) -> UnifiedTool {
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

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("read_file"), "readfile");
        assert_eq!(normalize_name("ReadFile"), "readfile");
        assert_eq!(normalize_name("read-file-tool"), "readfile");
        assert_eq!(normalize_name("ReadFileCommand"), "readfile");
        // Suffix stripping never empties a name.
        assert_eq!(normalize_name("tool"), "tool");
    }

    #[test]
    fn test_no_conflict_passes_through() {
        let resolver = ConflictResolver::with_defaults(EventBus::default());
        let resolved = resolver.resolve(vec![
            tool("builtin", SourceKind::Builtin, "read_file"),
            tool("builtin", SourceKind::Builtin, "write_file"),
        ]);
        assert_eq!(resolved.len(), 2);
        assert!(resolved.iter().all(|t| t.conflicts.is_empty()));
    }

    #[test]
    fn test_prefer_builtin_picks_builtin() {
        let resolver = ConflictResolver::with_defaults(EventBus::default());
        let resolved = resolver.resolve(vec![
            tool("ext", SourceKind::External, "readFile"),
            tool("builtin", SourceKind::Builtin, "read_file"),
        ]);

        assert_eq!(resolved.len(), 1);
        let winner = &resolved[0];
        assert_eq!(winner.id, "builtin:read_file");
        assert_eq!(winner.conflicts.len(), 1);
        assert_eq!(winner.conflicts[0].strategy, "prefer_builtin");
        assert_eq!(winner.conflicts[0].competitor_ids, vec!["ext:readFile"]);
    }

    #[test]
    fn test_prefer_external_picks_external() {
        let resolver = ConflictResolver::new(
            vec![ConflictRule::new(
                ".*",
                ResolutionStrategy::PreferExternal,
                0,
            )],
            EventBus::default(),
        );
        let resolved = resolver.resolve(vec![
            tool("builtin", SourceKind::Builtin, "read_file"),
            tool("ext", SourceKind::External, "readFile"),
        ]);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].id, "ext:readFile");
    }

    #[test]
    fn test_performance_based_picks_higher_score() {
        let resolver = ConflictResolver::new(
            vec![ConflictRule::new(
                ".*",
                ResolutionStrategy::PerformanceBased,
                0,
            )],
            EventBus::default(),
        );
        let mut fast = tool("a", SourceKind::External, "search");
        fast.usage.success_rate = 99.0;
        fast.usage.average_execution_time_ms = 50.0;
        let mut slow = tool("b", SourceKind::External, "Search");
        slow.usage.success_rate = 40.0;
        slow.usage.average_execution_time_ms = 4_000.0;

        let resolved = resolver.resolve(vec![slow, fast]);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].id, "a:search");
    }

    #[test]
    fn test_user_choice_defers() {
        let resolver = ConflictResolver::new(
            vec![ConflictRule::new(".*", ResolutionStrategy::UserChoice, 0)],
            EventBus::default(),
        );
        let resolved = resolver.resolve(vec![
            tool("a", SourceKind::External, "search"),
            tool("b", SourceKind::External, "Search"),
        ]);
        assert_eq!(resolved.len(), 2);
        assert!(resolved.iter().all(|t| t.conflicts.is_empty()));
    }

    #[test]
    fn test_higher_priority_rule_wins() {
        let resolver = ConflictResolver::new(
            vec![
                ConflictRule::new(".*", ResolutionStrategy::PreferBuiltin, 0),
                ConflictRule::new("^search$", ResolutionStrategy::PreferExternal, 10),
            ],
            EventBus::default(),
        );
        let resolved = resolver.resolve(vec![
            tool("builtin", SourceKind::Builtin, "search"),
            tool("ext", SourceKind::External, "Search"),
        ]);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].id, "ext:Search");
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let resolver = ConflictResolver::with_defaults(EventBus::default());
        let input = vec![
            tool("ext_a", SourceKind::External, "readFile"),
            tool("ext_b", SourceKind::External, "read-file"),
            tool("builtin", SourceKind::Builtin, "read_file"),
        ];

        let first = resolver.resolve(input.clone());
        let second = resolver.resolve(input);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].id, second[0].id);
    }

    #[test]
    fn test_deterministic_tie_break_by_id() {
        // Identical stats; the lexicographically-smallest id wins.
        let resolver = ConflictResolver::new(
            vec![ConflictRule::new(
                ".*",
                ResolutionStrategy::PerformanceBased,
                0,
            )],
            EventBus::default(),
        );
        let resolved = resolver.resolve(vec![
            tool("zeta", SourceKind::External, "search"),
            tool("alpha", SourceKind::External, "Search"),
        ]);
        assert_eq!(resolved[0].id, "alpha:Search");
    }

    #[test]
    fn test_invalid_rule_is_dropped() {
        let resolver = ConflictResolver::new(
            vec![
                ConflictRule::new("[unclosed", ResolutionStrategy::PreferExternal, 10),
                ConflictRule::new(".*", ResolutionStrategy::PreferBuiltin, 0),
            ],
            EventBus::default(),
        );
        let resolved = resolver.resolve(vec![
            tool("builtin", SourceKind::Builtin, "search"),
            tool("ext", SourceKind::External, "Search"),
        ]);
        assert_eq!(resolved[0].id, "builtin:search");
    }

    #[tokio::test]
    async fn test_conflict_events_emitted() {
        let events = EventBus::new(16);
        let mut rx = events.subscribe();
        let resolver = ConflictResolver::with_defaults(events);

        resolver.resolve(vec![
            tool("builtin", SourceKind::Builtin, "read_file"),
            tool("ext", SourceKind::External, "readFile"),
        ]);

        let detected = rx.recv().await.unwrap();
        assert_eq!(detected.event_type(), "conflict_detected");
        let resolved = rx.recv().await.unwrap();
        match resolved {
            RouterEvent::ConflictResolved {
                winner_id, strategy, ..
            } => {
                assert_eq!(winner_id, "builtin:read_file");
                assert_eq!(strategy, "prefer_builtin");
            }
            other => panic!("expected ConflictResolved, got {}", other.event_type()),
        }
    }
}
