//! Discovery-time classification.
//!
//! Pure keyword-pattern classification of raw tool descriptors into
//! categories and tags. The keyword tables live in
//! [`ClassifierConfig`] as data, not control flow, so vocabularies can
//! be extended without touching the matching logic.

use crate::catalog::ToolCategory;
use std::collections::HashSet;

/// One category plus the vocabulary that selects it.
#[derive(Debug, Clone)]
pub struct CategoryRule {
    /// The category assigned when a keyword matches.
    pub category: ToolCategory,
    /// Keywords matched against `name + description` (lowercased).
    pub keywords: Vec<&'static str>,
}

/// Keyword tables driving category and tag assignment.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Ordered category rules; first match wins.
    pub categories: Vec<CategoryRule>,
    /// Action verbs extracted as tags.
    pub action_words: Vec<&'static str>,
    /// Domain vocabulary extracted as tags.
    pub domain_words: Vec<&'static str>,
    /// Maximum number of tags per tool.
    pub max_tags: usize,
}

fn category(
    id: &str,
    display_name: &str,
    icon: &str,
    priority: u32,
    domain_modes: &[&str],
) -> ToolCategory {
    ToolCategory {
        id: id.to_string(),
        display_name: display_name.to_string(),
        icon: icon.to_string(),
        priority,
        domain_modes: domain_modes.iter().map(|m| m.to_string()).collect(),
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            categories: vec![
                CategoryRule {
                    category: category(
                        "mathematics",
                        "Mathematics",
                        "sigma",
                        10,
                        &["mathematics", "physics"],
                    ),
                    keywords: vec![
                        "math", "calculat", "equation", "algebra", "geometry", "statistic",
                        "solve", "integral", "derivative", "matrix",
                    ],
                },
                CategoryRule {
                    category: category(
                        "programming",
                        "Programming",
                        "code",
                        20,
                        &["programming", "engineering"],
                    ),
                    keywords: vec![
                        "code", "program", "compile", "debug", "refactor", "lint", "script",
                        "function", "repository", "git",
                    ],
                },
                CategoryRule {
                    category: category(
                        "science",
                        "Science",
                        "flask",
                        30,
                        &["science", "chemistry", "biology", "physics"],
                    ),
                    keywords: vec![
                        "science", "chemistry", "biology", "physics", "experiment", "molecule",
                        "simulation",
                    ],
                },
                CategoryRule {
                    category: category(
                        "language",
                        "Language",
                        "globe-alt",
                        40,
                        &["language", "writing"],
                    ),
                    keywords: vec![
                        "translat", "grammar", "spell", "language", "vocabulary", "summariz",
                        "writing",
                    ],
                },
                CategoryRule {
                    category: category("files", "File Operations", "folder", 50, &[]),
                    keywords: vec![
                        "file", "directory", "folder", "path", "read", "write", "save", "open",
                    ],
                },
                CategoryRule {
                    category: category("web", "Web", "globe", 60, &[]),
                    keywords: vec![
                        "web", "http", "url", "browser", "search", "fetch", "download", "scrape",
                    ],
                },
            ],
            action_words: vec![
                "read", "write", "create", "delete", "search", "analyze", "convert", "format",
                "generate", "run", "list", "fetch", "parse", "plot", "solve", "translate",
            ],
            domain_words: vec![
                "file", "code", "math", "web", "text", "image", "data", "document", "graph",
                "language", "science",
            ],
            max_tags: 8,
        }
    }
}

/// Assigns a category by keyword match over `name + description`.
///
/// A keyword matches when it starts a word, so stems like `calculat`
/// cover "calculator" and "calculations" without firing on unrelated
/// words that merely contain them. First rule with any matching
/// keyword wins; no match falls back to [`ToolCategory::general`].
///
/// # Examples
///
/// ```rust
/// use tool_router::classify::{classify_category, ClassifierConfig};
///
/// let config = ClassifierConfig::default();
/// let cat = classify_category(&config, "solve_equation", "Solves algebra equations");
/// assert_eq!(cat.id, "mathematics");
///
/// let cat = classify_category(&config, "frobnicate", "Does something nondescript");
/// assert_eq!(cat.id, "general");
/// ```
pub fn classify_category(config: &ClassifierConfig, name: &str, description: &str) -> ToolCategory {
    let haystack = format!("{name} {description}").to_lowercase();
    let words: Vec<&str> = haystack
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    for rule in &config.categories {
        if rule
            .keywords
            .iter()
            .any(|kw| words.iter().any(|w| w.starts_with(kw)))
        {
            return rule.category.clone();
        }
    }
    ToolCategory::general()
}

/// Extracts up to `max_tags` tags from `name + description`.
///
/// Action words are matched per-word, domain words by substring;
/// matches are deduplicated in table order.
pub fn extract_tags(config: &ClassifierConfig, name: &str, description: &str) -> Vec<String> {
    let haystack = format!("{name} {description}").to_lowercase();
    let words: HashSet<&str> = haystack
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    let mut tags: Vec<String> = Vec::new();
    for action in &config.action_words {
        if words.contains(action) {
            tags.push((*action).to_string());
        }
    }
    for domain in &config.domain_words {
        if haystack.contains(domain) && !tags.iter().any(|t| t == domain) {
            tags.push((*domain).to_string());
        }
    }

    tags.truncate(config.max_tags);
    tags
}
