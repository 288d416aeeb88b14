//! Rule-driven management insights.
//!
//! Every rule is a guard over one [`InsightSignals`] metric plus the
//! insight it emits. All rules whose guard holds fire, in table order; if
//! none fires the fallback set is emitted so the result is never empty.

use chrono::{DateTime, Utc};
use lore_core::{
    Comparison, InsightCategory, InsightMetric, InsightRule, InsightTemplate, InsightsConfig,
    LoreError, ManagementInsight, Priority,
};
use serde::{Deserialize, Serialize};

use crate::analysis::CoreProfile;
use crate::health::TeamHealthMetrics;
use crate::ownership::FileExpertise;

/// When a high-expertise contributor counts as dormant.
///
/// # Examples
///
/// ```
/// use chrono::{Duration, TimeZone, Utc};
/// use lore_expertise::insights::DormancyPolicy;
///
/// let policy = DormancyPolicy::default();
/// let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
/// assert!(policy.is_dormant(80, now - Duration::days(90), now));
/// assert!(!policy.is_dormant(80, now - Duration::days(89), now));
/// assert!(!policy.is_dormant(40, now - Duration::days(365), now));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DormancyPolicy {
    /// Days of silence before an expert is dormant.
    pub window_days: u32,
    /// Minimum expertise percent to count as an expert.
    pub min_expertise: u8,
}

impl Default for DormancyPolicy {
    fn default() -> Self {
        Self {
            window_days: 90,
            min_expertise: 50,
        }
    }
}

impl DormancyPolicy {
    /// Build a policy from the `[insights]` configuration section.
    pub fn from_config(config: &InsightsConfig) -> Self {
        Self {
            window_days: config.dormant_days,
            min_expertise: config.dormant_min_expertise,
        }
    }

    /// Whether a contributor with `expertise_percent` whose last commit was
    /// at `last_commit` is dormant as of `reference`.
    pub fn is_dormant(
        &self,
        expertise_percent: u8,
        last_commit: DateTime<Utc>,
        reference: DateTime<Utc>,
    ) -> bool {
        expertise_percent >= self.min_expertise
            && (reference - last_commit).num_days() >= i64::from(self.window_days)
    }
}

/// The metrics insight rules are evaluated against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightSignals {
    /// Knowledge concentration risk, 0–100.
    pub risk_score: u8,
    /// Share of collaborative commits, 0–100.
    pub knowledge_sharing: u8,
    /// Number of contributors.
    pub contributor_count: usize,
    /// Share of files with exactly one contributor, 0–100.
    pub single_owner_files_percent: f64,
    /// Experts whose last commit is outside the dormant window.
    pub dormant_experts: usize,
    /// Share of contributors with no detected specialization, 0–100.
    pub unspecialized_percent: f64,
}

impl InsightSignals {
    /// Derive signals from the assembled components.
    ///
    /// Dormancy is measured against `reference`, normally the newest
    /// commit timestamp in the snapshot.
    pub fn collect(
        health: &TeamHealthMetrics,
        profiles: &[CoreProfile],
        files: &[FileExpertise],
        dormancy: &DormancyPolicy,
        reference: DateTime<Utc>,
    ) -> Self {
        let single_owner = files.iter().filter(|f| f.experts.len() == 1).count();
        let unspecialized = profiles
            .iter()
            .filter(|p| p.specializations.is_empty())
            .count();
        let dormant_experts = profiles
            .iter()
            .filter(|p| dormancy.is_dormant(p.expertise_percent, p.last_commit, reference))
            .count();

        Self {
            risk_score: health.knowledge_distribution.risk_score,
            knowledge_sharing: health.collaboration_metrics.knowledge_sharing,
            contributor_count: profiles.len(),
            single_owner_files_percent: percent(single_owner, files.len()),
            dormant_experts,
            unspecialized_percent: percent(unspecialized, profiles.len()),
        }
    }

    /// Value of `metric` as compared by rule guards.
    pub fn value(&self, metric: InsightMetric) -> f64 {
        match metric {
            InsightMetric::RiskScore => f64::from(self.risk_score),
            InsightMetric::KnowledgeSharing => f64::from(self.knowledge_sharing),
            InsightMetric::ContributorCount => self.contributor_count as f64,
            InsightMetric::SingleOwnerFilesPercent => self.single_owner_files_percent,
            InsightMetric::DormantExperts => self.dormant_experts as f64,
            InsightMetric::UnspecializedPercent => self.unspecialized_percent,
        }
    }
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        100.0 * part as f64 / whole as f64
    }
}

/// A validated rule table plus its fallback set.
///
/// # Examples
///
/// ```
/// use lore_expertise::insights::{InsightSignals, InsightTable};
///
/// let signals = InsightSignals {
///     risk_score: 85,
///     knowledge_sharing: 60,
///     contributor_count: 5,
///     single_owner_files_percent: 10.0,
///     dormant_experts: 0,
///     unspecialized_percent: 0.0,
/// };
/// let insights = InsightTable::builtin().synthesize(&signals);
/// assert_eq!(insights.len(), 1);
/// assert_eq!(insights[0].title, "Knowledge concentrated in one contributor");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct InsightTable {
    rules: Vec<InsightRule>,
    fallback: Vec<InsightTemplate>,
}

impl Default for InsightTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl InsightTable {
    /// The built-in rules and fallback set.
    pub fn builtin() -> Self {
        Self {
            rules: default_rules(),
            fallback: default_fallback(),
        }
    }

    /// Build a caller-supplied table.
    ///
    /// # Errors
    ///
    /// Returns [`LoreError::Config`] for a non-finite threshold, an empty
    /// title, a template without action items, or an empty fallback set.
    pub fn new(rules: Vec<InsightRule>, fallback: Vec<InsightTemplate>) -> Result<Self, LoreError> {
        if fallback.is_empty() {
            return Err(LoreError::Config(
                "insight fallback set must not be empty".into(),
            ));
        }
        for rule in &rules {
            if !rule.threshold.is_finite() {
                return Err(LoreError::Config(format!(
                    "insight rule `{}` has a non-finite threshold",
                    rule.template.title
                )));
            }
            validate_template(&rule.template)?;
        }
        for template in &fallback {
            validate_template(template)?;
        }
        Ok(Self { rules, fallback })
    }

    /// Build the table from the `[insights]` section. Empty rule or
    /// fallback lists keep the built-in ones.
    ///
    /// # Errors
    ///
    /// See [`InsightTable::new`].
    pub fn from_config(config: &InsightsConfig) -> Result<Self, LoreError> {
        let rules = if config.rules.is_empty() {
            default_rules()
        } else {
            config.rules.clone()
        };
        let fallback = if config.fallback.is_empty() {
            default_fallback()
        } else {
            config.fallback.clone()
        };
        Self::new(rules, fallback)
    }

    /// The rules, in evaluation order.
    pub fn rules(&self) -> &[InsightRule] {
        &self.rules
    }

    /// Evaluate every rule against `signals`.
    ///
    /// Returns the insights of all firing rules in table order, or the
    /// fallback set when none fires.
    pub fn synthesize(&self, signals: &InsightSignals) -> Vec<ManagementInsight> {
        let fired: Vec<ManagementInsight> = self
            .rules
            .iter()
            .filter(|rule| {
                rule.comparison
                    .holds(signals.value(rule.metric), rule.threshold)
            })
            .map(|rule| rule.template.to_insight())
            .collect();

        if fired.is_empty() {
            self.fallback.iter().map(InsightTemplate::to_insight).collect()
        } else {
            fired
        }
    }
}

fn validate_template(template: &InsightTemplate) -> Result<(), LoreError> {
    if template.title.trim().is_empty() {
        return Err(LoreError::Config("insight title must not be empty".into()));
    }
    if template.action_items.is_empty() {
        return Err(LoreError::Config(format!(
            "insight `{}` has no action items",
            template.title
        )));
    }
    Ok(())
}

fn template(
    category: InsightCategory,
    priority: Priority,
    title: &str,
    description: &str,
    timeline: &str,
    impact: &str,
    action_items: &[&str],
) -> InsightTemplate {
    InsightTemplate {
        category,
        priority,
        title: title.into(),
        description: description.into(),
        timeline: timeline.into(),
        impact: impact.into(),
        action_items: action_items.iter().map(|s| (*s).to_string()).collect(),
    }
}

fn rule(
    metric: InsightMetric,
    comparison: Comparison,
    threshold: f64,
    template: InsightTemplate,
) -> InsightRule {
    InsightRule {
        metric,
        comparison,
        threshold,
        template,
    }
}

/// The built-in insight rules, in evaluation order.
pub fn default_rules() -> Vec<InsightRule> {
    use Comparison::{Above, AtLeast, Below};
    use InsightCategory::{Efficiency, Growth, Opportunity, Risk};
    use InsightMetric::*;
    use Priority::{High, Low, Medium};

    vec![
        rule(
            RiskScore,
            Above,
            70.0,
            template(
                Risk,
                High,
                "Knowledge concentrated in one contributor",
                "Most of the commit history comes from a single person.",
                "Next 2 sprints",
                "Delivery stalls if the top contributor becomes unavailable.",
                &[
                    "Pair the top contributor with a second owner on core modules",
                    "Route reviews of hot files to other team members",
                    "Document the areas only one person has touched",
                ],
            ),
        ),
        rule(
            KnowledgeSharing,
            Below,
            50.0,
            template(
                Opportunity,
                Medium,
                "Collaboration gap",
                "Few commits mention reviews, pairing, or merged work.",
                "This quarter",
                "Knowledge stays with whoever wrote the code.",
                &[
                    "Require at least one reviewer per change",
                    "Schedule regular pairing sessions",
                ],
            ),
        ),
        rule(
            SingleOwnerFilesPercent,
            Above,
            60.0,
            template(
                Risk,
                Medium,
                "Knowledge silos",
                "Most files have only ever been changed by one person.",
                "This quarter",
                "Changes to siloed files depend on a single reviewer.",
                &[
                    "Rotate ownership of single-owner files",
                    "Add a second reviewer for siloed areas",
                ],
            ),
        ),
        rule(
            DormantExperts,
            AtLeast,
            1.0,
            template(
                Risk,
                High,
                "Dormant experts",
                "Contributors with deep expertise have not committed recently.",
                "Next sprint",
                "Their knowledge may already be out of reach.",
                &[
                    "Schedule knowledge-transfer sessions with dormant experts",
                    "Identify successors for the files they own",
                ],
            ),
        ),
        rule(
            ContributorCount,
            Below,
            3.0,
            template(
                Growth,
                Medium,
                "Small team",
                "Fewer than three people contribute to this repository.",
                "Next 6 months",
                "Absences and turnover hit a small team hardest.",
                &[
                    "Onboard additional contributors",
                    "Invite neighbouring teams to review changes",
                ],
            ),
        ),
        rule(
            UnspecializedPercent,
            Above,
            50.0,
            template(
                Growth,
                Low,
                "Unclear focus areas",
                "Most contributors show no clear specialization.",
                "Next 6 months",
                "Ownership of domains is hard to assign.",
                &[
                    "Agree on domain owners",
                    "Tag commits with the area they change",
                ],
            ),
        ),
        rule(
            RiskScore,
            Below,
            30.0,
            template(
                Efficiency,
                Low,
                "Balanced ownership",
                "Commit history is spread evenly across the team.",
                "Ongoing",
                "The team can absorb absences without slowing down.",
                &["Keep rotating reviewers", "Recognise shared ownership in planning"],
            ),
        ),
    ]
}

/// Insights emitted when no rule fires.
pub fn default_fallback() -> Vec<InsightTemplate> {
    vec![template(
        InsightCategory::Efficiency,
        Priority::Low,
        "No acute signals",
        "Ownership, collaboration, and activity are within normal ranges.",
        "Ongoing",
        "Current practices are working.",
        &[
            "Re-run the analysis after the next release",
            "Watch for new single-owner files",
        ],
    )]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::{CollaborationMetrics, KnowledgeDistribution};
    use chrono::TimeZone;
    use lore_core::ContributorId;

    fn quiet() -> InsightSignals {
        InsightSignals {
            risk_score: 50,
            knowledge_sharing: 70,
            contributor_count: 5,
            single_owner_files_percent: 20.0,
            dormant_experts: 0,
            unspecialized_percent: 10.0,
        }
    }

    fn titles(insights: &[ManagementInsight]) -> Vec<&str> {
        insights.iter().map(|i| i.title.as_str()).collect()
    }

    #[test]
    fn quiet_signals_emit_fallback() {
        let insights = InsightTable::builtin().synthesize(&quiet());
        assert_eq!(titles(&insights), vec!["No acute signals"]);
    }

    #[test]
    fn all_matching_rules_fire_in_order() {
        let signals = InsightSignals {
            risk_score: 90,
            knowledge_sharing: 10,
            contributor_count: 2,
            single_owner_files_percent: 80.0,
            dormant_experts: 1,
            unspecialized_percent: 100.0,
        };
        let insights = InsightTable::builtin().synthesize(&signals);
        assert_eq!(
            titles(&insights),
            vec![
                "Knowledge concentrated in one contributor",
                "Collaboration gap",
                "Knowledge silos",
                "Dormant experts",
                "Small team",
                "Unclear focus areas",
            ]
        );
        assert_eq!(insights[0].category, InsightCategory::Risk);
        assert_eq!(insights[0].priority, Priority::High);
    }

    #[test]
    fn thresholds_are_strict_where_stated() {
        let mut signals = quiet();
        signals.risk_score = 70;
        signals.knowledge_sharing = 50;
        signals.single_owner_files_percent = 60.0;
        assert_eq!(
            titles(&InsightTable::builtin().synthesize(&signals)),
            vec!["No acute signals"]
        );
    }

    #[test]
    fn balanced_team_gets_efficiency_insight() {
        let mut signals = quiet();
        signals.risk_score = 10;
        let insights = InsightTable::builtin().synthesize(&signals);
        assert_eq!(titles(&insights), vec!["Balanced ownership"]);
        assert_eq!(insights[0].category, InsightCategory::Efficiency);
    }

    #[test]
    fn every_builtin_template_is_valid() {
        let table = InsightTable::builtin();
        assert!(InsightTable::new(table.rules.clone(), table.fallback.clone()).is_ok());
        assert_eq!(table.rules().len(), 7);
    }

    #[test]
    fn invalid_tables_are_rejected() {
        let fallback = default_fallback();

        assert!(matches!(
            InsightTable::new(default_rules(), vec![]),
            Err(LoreError::Config(_))
        ));

        let mut nan = default_rules();
        nan[0].threshold = f64::NAN;
        assert!(InsightTable::new(nan, fallback.clone()).is_err());

        let mut untitled = default_rules();
        untitled[1].template.title = "  ".into();
        assert!(InsightTable::new(untitled, fallback.clone()).is_err());

        let mut no_actions = default_rules();
        no_actions[2].template.action_items.clear();
        assert!(InsightTable::new(no_actions, fallback).is_err());
    }

    #[test]
    fn config_without_rules_uses_builtin() {
        let table = InsightTable::from_config(&InsightsConfig::default()).unwrap();
        assert_eq!(table, InsightTable::builtin());
    }

    #[test]
    fn config_rules_replace_builtin() {
        let config: InsightsConfig = toml::from_str(
            r#"
[[rules]]
metric = "contributor_count"
comparison = "at_most"
threshold = 1.0
category = "Risk"
priority = "High"
title = "Solo project"
action_items = ["Find a co-maintainer"]
"#,
        )
        .unwrap();
        let table = InsightTable::from_config(&config).unwrap();
        let mut signals = quiet();
        signals.contributor_count = 1;
        assert_eq!(titles(&table.synthesize(&signals)), vec!["Solo project"]);
        signals.contributor_count = 4;
        assert_eq!(titles(&table.synthesize(&signals)), vec!["No acute signals"]);
    }

    fn profile(name: &str, percent: u8, last: i64, specs: &[&str]) -> CoreProfile {
        let email = format!("{name}@e.com");
        CoreProfile {
            identity: ContributorId::from_email(&email),
            name: name.into(),
            email,
            expertise_percent: percent,
            contributions: 1,
            last_commit: Utc.timestamp_opt(last, 0).unwrap(),
            specializations: specs.iter().map(|s| (*s).to_string()).collect(),
            team_role: None,
        }
    }

    #[test]
    fn signals_count_dormant_experts_and_unspecialized() {
        let day = 86_400;
        let reference = Utc.timestamp_opt(200 * day, 0).unwrap();
        let health = TeamHealthMetrics {
            knowledge_distribution: KnowledgeDistribution {
                risk_score: 40,
                top_contributor_share: 0.5,
            },
            collaboration_metrics: CollaborationMetrics {
                knowledge_sharing: 20,
                collaborative_commits: 2,
            },
        };
        let profiles = vec![
            profile("old-expert", 100, 100 * day, &["Backend"]),
            profile("old-novice", 10, 0, &[]),
            profile("recent", 60, 199 * day, &[]),
            profile("edge", 50, 110 * day, &["Testing"]),
        ];

        let signals =
            InsightSignals::collect(&health, &profiles, &[], &DormancyPolicy::default(), reference);
        assert_eq!(signals.dormant_experts, 2);
        assert_eq!(signals.unspecialized_percent, 50.0);
        assert_eq!(signals.contributor_count, 4);
        assert_eq!(signals.single_owner_files_percent, 0.0);
        assert_eq!(signals.value(InsightMetric::KnowledgeSharing), 20.0);
    }
}
