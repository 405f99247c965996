//! Fuzzy tool search.
//!
//! The index is rebuilt from the catalog after every refresh cycle and
//! answers ranked free-text queries over normalized terms from four
//! fields, weighted name 0.4, description 0.3, tags 0.2, category 0.1.
//! Match coverage is blended with normalized usage count and success
//! rate into the final ordering. An empty query degrades to
//! most-recently-used ordering instead of returning nothing.
//!
//! Besides free-text search the index answers category-scoped listing,
//! tag-overlap search, similar-tool queries seeded from an existing
//! entry, and prefix autocomplete over names and tags.

use crate::catalog::UnifiedTool;
use std::collections::BTreeSet;

const NAME_WEIGHT: f64 = 0.4;
const DESCRIPTION_WEIGHT: f64 = 0.3;
const TAGS_WEIGHT: f64 = 0.2;
const CATEGORY_WEIGHT: f64 = 0.1;

/// Share of the final score contributed by field matching; the rest is
/// split between normalized usage count and success rate.
const MATCH_BLEND: f64 = 0.7;
const USAGE_BLEND: f64 = 0.15;
const SUCCESS_BLEND: f64 = 0.15;

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "as", "at", "by", "for", "from", "in", "into", "is", "it", "of", "on", "or",
    "the", "to", "with",
];

/// Options controlling one search call.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Maximum number of results.
    pub limit: usize,
    /// Restrict results to one category id.
    pub category: Option<String>,
    /// Drop results scoring below this value.
    pub min_score: f64,
    /// Include tools that are not currently dispatchable.
    pub include_unavailable: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 20,
            category: None,
            min_score: 0.0,
            include_unavailable: true,
        }
    }
}

/// One ranked search hit.
#[derive(Debug, Clone)]
pub struct SearchHit {
    /// The matched tool.
    pub tool: UnifiedTool,
    /// Blended ranking score.
    pub score: f64,
}

#[derive(Debug, Clone)]
struct IndexedTool {
    tool: UnifiedTool,
    name_terms: Vec<String>,
    description_terms: Vec<String>,
    tag_terms: Vec<String>,
    category_terms: Vec<String>,
}

/// Rebuildable search index over the tool catalog.
#[derive(Debug, Default)]
pub struct SearchIndex {
    entries: Vec<IndexedTool>,
}

impl SearchIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the index from the given corpus, replacing all state.
    pub fn rebuild(&mut self, corpus: Vec<UnifiedTool>) {
        self.entries = corpus
            .into_iter()
            .map(|tool| {
                let name_terms = tokenize(&tool.name);
                let description_terms = tokenize(&tool.description)
                    .into_iter()
                    .filter(|w| !STOP_WORDS.contains(&w.as_str()))
                    .collect();
                let tag_terms = tool.tags.iter().flat_map(|t| tokenize(t)).collect();
                let category_terms = tokenize(&tool.category.display_name)
                    .into_iter()
                    .chain(tokenize(&tool.category.id))
                    .collect();
                IndexedTool {
                    tool,
                    name_terms,
                    description_terms,
                    tag_terms,
                    category_terms,
                }
            })
            .collect();
    }

    /// Number of indexed tools.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ranked free-text search.
    ///
    /// An empty (or all-whitespace) query returns tools ordered by
    /// recency of use instead.
    pub fn search(&self, query: &str, options: &SearchOptions) -> Vec<SearchHit> {
        let words = tokenize(query);
        if words.is_empty() {
            return self.most_recently_used(options);
        }

        let mut hits: Vec<SearchHit> = self
            .entries
            .iter()
            .filter(|entry| self.passes_filters(entry, options))
            .filter_map(|entry| {
                let coverage = entry.match_coverage(&words);
                if coverage <= 0.0 {
                    return None;
                }
                let usage = (entry.tool.usage.usage_count.min(100) as f64) / 100.0;
                let success = entry.tool.usage.success_rate / 100.0;
                let score =
                    coverage * MATCH_BLEND + usage * USAGE_BLEND + success * SUCCESS_BLEND;
                (score >= options.min_score).then(|| SearchHit {
                    tool: entry.tool.clone(),
                    score,
                })
            })
            .collect();

        sort_hits(&mut hits);
        hits.truncate(options.limit);
        hits
    }

    /// All tools in one category, ordered by usage count descending.
    pub fn by_category(&self, category_id: &str) -> Vec<UnifiedTool> {
        let mut tools: Vec<UnifiedTool> = self
            .entries
            .iter()
            .filter(|e| e.tool.category.id == category_id)
            .map(|e| e.tool.clone())
            .collect();
        tools.sort_by(|a, b| {
            b.usage
                .usage_count
                .cmp(&a.usage.usage_count)
                .then_with(|| a.id.cmp(&b.id))
        });
        tools
    }

    /// Tools sharing at least one of the given tags, ranked by overlap
    /// count.
    pub fn by_tags(&self, tags: &[String]) -> Vec<UnifiedTool> {
        let wanted: BTreeSet<String> = tags.iter().map(|t| t.to_lowercase()).collect();
        let mut scored: Vec<(usize, UnifiedTool)> = self
            .entries
            .iter()
            .filter_map(|entry| {
                let overlap = entry
                    .tool
                    .tags
                    .iter()
                    .filter(|t| wanted.contains(&t.to_lowercase()))
                    .count();
                (overlap > 0).then(|| (overlap, entry.tool.clone()))
            })
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.id.cmp(&b.1.id)));
        scored.into_iter().map(|(_, tool)| tool).collect()
    }

    /// Tools similar to the seed, queried from the seed's own name and
    /// tags; the seed itself is excluded.
    pub fn similar(&self, seed: &UnifiedTool, limit: usize) -> Vec<UnifiedTool> {
        let query = format!("{} {}", seed.name, seed.tags.join(" "));
        let options = SearchOptions {
            limit: limit + 1,
            ..SearchOptions::default()
        };
        self.search(&query, &options)
            .into_iter()
            .map(|hit| hit.tool)
            .filter(|tool| tool.id != seed.id)
            .take(limit)
            .collect()
    }

    /// Prefix autocomplete over tool names and tags.
    pub fn suggest(&self, prefix: &str, limit: usize) -> Vec<String> {
        let prefix = prefix.to_lowercase();
        if prefix.is_empty() {
            return Vec::new();
        }
        let mut suggestions: BTreeSet<String> = BTreeSet::new();
        for entry in &self.entries {
            if entry.tool.name.to_lowercase().starts_with(&prefix) {
                suggestions.insert(entry.tool.name.clone());
            }
            for tag in &entry.tool.tags {
                if tag.to_lowercase().starts_with(&prefix) {
                    suggestions.insert(tag.clone());
                }
            }
        }
        suggestions.into_iter().take(limit).collect()
    }

    fn most_recently_used(&self, options: &SearchOptions) -> Vec<SearchHit> {
        let mut tools: Vec<UnifiedTool> = self
            .entries
            .iter()
            .filter(|entry| self.passes_filters(entry, options))
            .map(|e| e.tool.clone())
            .collect();
        // Never-used tools sort last; ties break on id for determinism.
        tools.sort_by(|a, b| {
            b.usage
                .last_used
                .cmp(&a.usage.last_used)
                .then_with(|| a.id.cmp(&b.id))
        });
        tools
            .into_iter()
            .take(options.limit)
            .map(|tool| SearchHit { tool, score: 0.0 })
            .collect()
    }

    fn passes_filters(&self, entry: &IndexedTool, options: &SearchOptions) -> bool {
        if let Some(category) = &options.category {
            if &entry.tool.category.id != category {
                return false;
            }
        }
        if !options.include_unavailable && !entry.tool.availability.is_dispatchable() {
            return false;
        }
        true
    }
}

impl IndexedTool {
    /// Field-weighted match coverage of the query words, in `[0, 1]`.
    fn match_coverage(&self, words: &[String]) -> f64 {
        field_coverage(words, &self.name_terms) * NAME_WEIGHT
            + field_coverage(words, &self.description_terms) * DESCRIPTION_WEIGHT
            + field_coverage(words, &self.tag_terms) * TAGS_WEIGHT
            + field_coverage(words, &self.category_terms) * CATEGORY_WEIGHT
    }
}

/// Mean best-match score of each query word against the field terms.
fn field_coverage(words: &[String], terms: &[String]) -> f64 {
    if words.is_empty() || terms.is_empty() {
        return 0.0;
    }
    let total: f64 = words
        .iter()
        .map(|word| {
            terms
                .iter()
                .map(|term| word_match(word, term))
                .fold(0.0, f64::max)
        })
        .sum();
    total / words.len() as f64
}

/// Score for one query word against one indexed term.
///
/// Exact matches beat prefix matches (word-boundary bonus), which beat
/// substring containment, which beat bounded-edit-distance fuzz.
fn word_match(word: &str, term: &str) -> f64 {
    if word == term {
        return 1.0;
    }
    if term.starts_with(word) {
        return 0.85;
    }
    if term.contains(word) || word.contains(term) {
        return 0.7;
    }
    let budget = (word.len().max(term.len()) / 4).max(1);
    if word.len().abs_diff(term.len()) <= budget && edit_distance(word, term) <= budget {
        return 0.6;
    }
    0.0
}

/// Normalizes text into lowercase alphanumeric words.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Classic Levenshtein distance over chars.
fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

fn sort_hits(hits: &mut [SearchHit]) {
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.tool.id.cmp(&b.tool.id))
    });
}
