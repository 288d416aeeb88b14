use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Area a management insight speaks to.
///
/// # Examples
///
/// ```
/// use lore_core::InsightCategory;
///
/// let c: InsightCategory = "risk".parse().unwrap();
/// assert_eq!(c, InsightCategory::Risk);
/// assert_eq!(c.to_string(), "Risk");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InsightCategory {
    /// Something that can hurt delivery if left alone.
    Risk,
    /// Untapped potential in the team.
    Opportunity,
    /// Ways to work with less friction.
    Efficiency,
    /// Capability the team should build.
    Growth,
}

impl fmt::Display for InsightCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsightCategory::Risk => write!(f, "Risk"),
            InsightCategory::Opportunity => write!(f, "Opportunity"),
            InsightCategory::Efficiency => write!(f, "Efficiency"),
            InsightCategory::Growth => write!(f, "Growth"),
        }
    }
}

impl FromStr for InsightCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "risk" => Ok(InsightCategory::Risk),
            "opportunity" => Ok(InsightCategory::Opportunity),
            "efficiency" => Ok(InsightCategory::Efficiency),
            "growth" => Ok(InsightCategory::Growth),
            other => Err(format!("unknown insight category: {other}")),
        }
    }
}

/// Urgency of a management insight.
///
/// # Examples
///
/// ```
/// use lore_core::Priority;
///
/// let p: Priority = serde_json::from_str("\"High\"").unwrap();
/// assert_eq!(p, Priority::High);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    /// Act this sprint.
    High,
    /// Plan for this quarter.
    Medium,
    /// Keep an eye on it.
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::High => write!(f, "High"),
            Priority::Medium => write!(f, "Medium"),
            Priority::Low => write!(f, "Low"),
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}

/// A prioritized, rule-derived recommendation.
///
/// # Examples
///
/// ```
/// use lore_core::{InsightCategory, ManagementInsight, Priority};
///
/// let insight = ManagementInsight {
///     category: InsightCategory::Risk,
///     priority: Priority::High,
///     title: "Single point of failure".into(),
///     description: "One person holds most of the history.".into(),
///     timeline: "Next sprint".into(),
///     impact: "Delivery stalls if they are away.".into(),
///     action_items: vec!["Pair on the core modules".into()],
/// };
/// let json = serde_json::to_value(&insight).unwrap();
/// assert!(json.get("actionItems").is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagementInsight {
    /// Area the insight speaks to.
    pub category: InsightCategory,
    /// Urgency.
    pub priority: Priority,
    /// Short headline.
    pub title: String,
    /// What was observed.
    pub description: String,
    /// When to act.
    pub timeline: String,
    /// What happens if nothing is done, or what is gained.
    pub impact: String,
    /// Concrete next steps, in order.
    pub action_items: Vec<String>,
}

/// Output format for CLI subcommands.
///
/// Implements [`FromStr`] so it can be used directly with `clap` argument parsing.
///
/// # Examples
///
/// ```
/// use lore_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
///
/// let fmt: OutputFormat = "md".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Markdown);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable tables and summaries.
    #[default]
    Text,
    /// Machine-readable JSON with camelCase keys.
    Json,
    /// Markdown-formatted output.
    Markdown,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}
