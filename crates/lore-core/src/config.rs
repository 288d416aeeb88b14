use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::LoreError;
use crate::types::{InsightCategory, ManagementInsight, Priority};

/// Top-level configuration loaded from `.lore.toml`.
///
/// Every section is optional; an empty file yields the built-in tables.
///
/// # Examples
///
/// ```
/// use lore_core::LoreConfig;
///
/// let config = LoreConfig::default();
/// assert_eq!(config.insights.dormant_days, 90);
/// assert!(config.specializations.is_empty());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoreConfig {
    /// File ownership and change-frequency settings.
    #[serde(default)]
    pub ownership: OwnershipConfig,
    /// Team health settings.
    #[serde(default)]
    pub health: HealthConfig,
    /// Insight rule settings.
    #[serde(default)]
    pub insights: InsightsConfig,
    /// Specialization rules; when non-empty they replace the built-in table.
    #[serde(default)]
    pub specializations: Vec<SpecializationRule>,
}

impl LoreConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`LoreError::Io`] if the file cannot be read, or
    /// [`LoreError::Toml`] if the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use lore_core::LoreConfig;
    /// use std::path::Path;
    ///
    /// let config = LoreConfig::from_file(Path::new(".lore.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, LoreError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`LoreError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use lore_core::LoreConfig;
    ///
    /// let toml = r#"
    /// [insights]
    /// dormant_days = 30
    /// "#;
    /// let config = LoreConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.insights.dormant_days, 30);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, LoreError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }
}

/// Change-frequency tier cut points.
///
/// A file's percentile rank is the share of files with fewer touches
/// plus half the share with the same count. Ranks below `medium_from`
/// are low, below `high_from` medium, and the rest high.
///
/// # Examples
///
/// ```
/// use lore_core::OwnershipConfig;
///
/// let config = OwnershipConfig::default();
/// assert!(config.medium_from < config.high_from);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnershipConfig {
    /// Percentile rank at which files become medium frequency (default: 1/3).
    #[serde(default = "default_medium_from")]
    pub medium_from: f64,
    /// Percentile rank at which files become high frequency (default: 2/3).
    #[serde(default = "default_high_from")]
    pub high_from: f64,
}

fn default_medium_from() -> f64 {
    1.0 / 3.0
}

fn default_high_from() -> f64 {
    2.0 / 3.0
}

impl Default for OwnershipConfig {
    fn default() -> Self {
        Self {
            medium_from: default_medium_from(),
            high_from: default_high_from(),
        }
    }
}

/// Team health configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Commit message keywords that mark a commit as collaborative.
    #[serde(default = "default_collaboration_keywords")]
    pub collaboration_keywords: Vec<String>,
}

/// Built-in collaboration keyword set.
pub fn default_collaboration_keywords() -> Vec<String> {
    ["review", "pair", "merge", "thanks", "helped", "co-authored"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            collaboration_keywords: default_collaboration_keywords(),
        }
    }
}

/// Insight synthesis configuration.
///
/// # Examples
///
/// ```
/// use lore_core::InsightsConfig;
///
/// let config = InsightsConfig::default();
/// assert_eq!(config.dormant_days, 90);
/// assert_eq!(config.dormant_min_expertise, 50);
/// assert!(config.rules.is_empty());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightsConfig {
    /// Days without commits, relative to the newest commit, before an
    /// expert counts as dormant (default: 90).
    #[serde(default = "default_dormant_days")]
    pub dormant_days: u32,
    /// Minimum expertise percent for a contributor to count as an expert (default: 50).
    #[serde(default = "default_dormant_min_expertise")]
    pub dormant_min_expertise: u8,
    /// Insight rules; when non-empty they replace the built-in table.
    #[serde(default)]
    pub rules: Vec<InsightRule>,
    /// Insights emitted when no rule fires; when non-empty they replace
    /// the built-in fallback set.
    #[serde(default)]
    pub fallback: Vec<InsightTemplate>,
}

fn default_dormant_days() -> u32 {
    90
}

fn default_dormant_min_expertise() -> u8 {
    50
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self {
            dormant_days: default_dormant_days(),
            dormant_min_expertise: default_dormant_min_expertise(),
            rules: Vec::new(),
            fallback: Vec::new(),
        }
    }
}

/// One row of the specialization table.
///
/// # Examples
///
/// ```
/// use lore_core::SpecializationRule;
///
/// let rule = SpecializationRule {
///     label: "Payments".into(),
///     keywords: vec!["stripe".into(), "invoice".into()],
///     paths: vec!["*/billing/*".into()],
/// };
/// assert_eq!(rule.label, "Payments");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecializationRule {
    /// Label attached to contributors with a matching commit.
    pub label: String,
    /// Case-insensitive keywords matched at the start of a word in the message.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Case-insensitive glob patterns matched against changed paths.
    #[serde(default)]
    pub paths: Vec<String>,
}

/// Signal an insight rule inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightMetric {
    /// Knowledge concentration risk, 0–100.
    RiskScore,
    /// Share of collaborative commits, 0–100.
    KnowledgeSharing,
    /// Number of contributors.
    ContributorCount,
    /// Share of files with exactly one contributor, 0–100.
    SingleOwnerFilesPercent,
    /// Experts whose last commit is outside the dormant window.
    DormantExperts,
    /// Share of contributors with no detected specialization, 0–100.
    UnspecializedPercent,
}

/// How a metric is compared against a rule threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    /// `value > threshold`.
    Above,
    /// `value < threshold`.
    Below,
    /// `value >= threshold`.
    AtLeast,
    /// `value <= threshold`.
    AtMost,
}

impl Comparison {
    /// Apply the comparison.
    ///
    /// # Examples
    ///
    /// ```
    /// use lore_core::Comparison;
    ///
    /// assert!(Comparison::Above.holds(71.0, 70.0));
    /// assert!(!Comparison::Above.holds(70.0, 70.0));
    /// assert!(Comparison::AtLeast.holds(70.0, 70.0));
    /// ```
    pub fn holds(self, value: f64, threshold: f64) -> bool {
        match self {
            Comparison::Above => value > threshold,
            Comparison::Below => value < threshold,
            Comparison::AtLeast => value >= threshold,
            Comparison::AtMost => value <= threshold,
        }
    }
}

/// Text and classification of an insight, without a guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsightTemplate {
    /// Insight category.
    pub category: InsightCategory,
    /// Insight priority.
    pub priority: Priority,
    /// Short headline.
    pub title: String,
    /// What was observed.
    #[serde(default)]
    pub description: String,
    /// When to act.
    #[serde(default)]
    pub timeline: String,
    /// Expected impact.
    #[serde(default)]
    pub impact: String,
    /// Ordered next steps.
    #[serde(default)]
    pub action_items: Vec<String>,
}

impl InsightTemplate {
    /// Materialize the insight this template describes.
    pub fn to_insight(&self) -> ManagementInsight {
        ManagementInsight {
            category: self.category,
            priority: self.priority,
            title: self.title.clone(),
            description: self.description.clone(),
            timeline: self.timeline.clone(),
            impact: self.impact.clone(),
            action_items: self.action_items.clone(),
        }
    }
}

/// A guarded insight: emitted when `metric <comparison> threshold` holds.
///
/// # Examples
///
/// ```
/// use lore_core::InsightRule;
///
/// let toml = r#"
/// metric = "risk_score"
/// comparison = "above"
/// threshold = 70.0
/// category = "Risk"
/// priority = "High"
/// title = "Single point of failure"
/// action_items = ["Pair on the core modules"]
/// "#;
/// let rule: InsightRule = toml::from_str(toml).unwrap();
/// assert_eq!(rule.template.title, "Single point of failure");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightRule {
    /// Metric inspected by the guard.
    pub metric: InsightMetric,
    /// Comparison applied to the metric.
    pub comparison: Comparison,
    /// Threshold the metric is compared against.
    pub threshold: f64,
    /// Insight emitted when the guard holds.
    #[serde(flatten)]
    pub template: InsightTemplate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = LoreConfig::default();
        assert!((config.ownership.medium_from - 1.0 / 3.0).abs() < f64::EPSILON);
        assert!((config.ownership.high_from - 2.0 / 3.0).abs() < f64::EPSILON);
        assert_eq!(config.health.collaboration_keywords.len(), 6);
        assert!(config
            .health
            .collaboration_keywords
            .contains(&"review".to_string()));
        assert_eq!(config.insights.dormant_days, 90);
        assert!(config.insights.rules.is_empty());
        assert!(config.insights.fallback.is_empty());
        assert!(config.specializations.is_empty());
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config = LoreConfig::from_toml("").unwrap();
        assert_eq!(config.insights.dormant_min_expertise, 50);
        assert_eq!(config.health.collaboration_keywords.len(), 6);
    }

    #[test]
    fn parse_full_toml() {
        let toml = r#"
[ownership]
medium_from = 0.25
high_from = 0.75

[health]
collaboration_keywords = ["review", "pairing"]

[insights]
dormant_days = 30

[[insights.rules]]
metric = "knowledge_sharing"
comparison = "below"
threshold = 20.0
category = "Opportunity"
priority = "Medium"
title = "Almost no reviews"
action_items = ["Require one reviewer per PR"]

[[insights.fallback]]
category = "Efficiency"
priority = "Low"
title = "All quiet"

[[specializations]]
label = "Payments"
keywords = ["stripe"]
paths = ["*/billing/*"]
"#;
        let config = LoreConfig::from_toml(toml).unwrap();
        assert_eq!(config.ownership.medium_from, 0.25);
        assert_eq!(config.health.collaboration_keywords, vec!["review", "pairing"]);
        assert_eq!(config.insights.dormant_days, 30);
        assert_eq!(config.insights.rules.len(), 1);

        let rule = &config.insights.rules[0];
        assert_eq!(rule.metric, InsightMetric::KnowledgeSharing);
        assert_eq!(rule.comparison, Comparison::Below);
        assert_eq!(rule.template.category, InsightCategory::Opportunity);
        assert!(rule.template.description.is_empty());

        assert_eq!(config.insights.fallback[0].title, "All quiet");
        assert_eq!(config.specializations[0].paths, vec!["*/billing/*"]);
    }

    #[test]
    fn invalid_toml_returns_error() {
        assert!(LoreConfig::from_toml("{{invalid}}").is_err());
    }

    #[test]
    fn unknown_metric_is_rejected() {
        let toml = r#"
[[insights.rules]]
metric = "vibes"
comparison = "above"
threshold = 1.0
category = "Risk"
priority = "Low"
title = "x"
"#;
        assert!(matches!(
            LoreConfig::from_toml(toml),
            Err(LoreError::Toml(_))
        ));
    }

    #[test]
    fn template_materializes_insight() {
        let template = InsightTemplate {
            category: InsightCategory::Growth,
            priority: Priority::Low,
            title: "t".into(),
            description: "d".into(),
            timeline: "q3".into(),
            impact: "i".into(),
            action_items: vec!["a".into(), "b".into()],
        };
        let insight = template.to_insight();
        assert_eq!(insight.title, "t");
        assert_eq!(insight.action_items, vec!["a", "b"]);
    }
}
