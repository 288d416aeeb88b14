//! Team-level knowledge concentration and collaboration metrics.

use lore_core::RepositoryActivity;
use serde::{Deserialize, Serialize};

use crate::keywords::KeywordSet;
use crate::scoring::ExpertiseScores;

/// How concentrated commit history is in a single contributor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeDistribution {
    /// 0 when commits are spread evenly, 100 when one person made them all.
    pub risk_score: u8,
    /// Top contributor's share of all commits, 0–1.
    pub top_contributor_share: f64,
}

/// How often commit messages mention collaborative work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollaborationMetrics {
    /// Percent of commits whose message matches a collaboration keyword.
    pub knowledge_sharing: u8,
    /// Number of such commits.
    pub collaborative_commits: u32,
}

/// Team health summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamHealthMetrics {
    /// Knowledge concentration.
    pub knowledge_distribution: KnowledgeDistribution,
    /// Collaboration signals.
    pub collaboration_metrics: CollaborationMetrics,
}

/// Evaluate team health for a snapshot.
///
/// The risk score measures how far the top contributor's share sits
/// between an even split and owning everything:
/// `100 * (top_share - fair_share) / (1 - fair_share)`, clamped and
/// rounded. A lone contributor is always 100; a snapshot with no commits
/// is 0.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use lore_core::{AuthorIdentity, CommitRecord, RepositoryActivity};
/// use lore_expertise::health::evaluate_team_health;
/// use lore_expertise::keywords::KeywordSet;
/// use lore_expertise::scoring::score_contributors;
///
/// let mut activity = RepositoryActivity::new("acme/web");
/// for (i, msg) in ["Fixed bug", "Reviewed Alice's PR", "Merged feature"].iter().enumerate() {
///     activity.record_commit(CommitRecord::new(
///         AuthorIdentity::new("bob", "bob@example.com"),
///         *msg,
///         Utc.timestamp_opt(1_700_000_000 + i as i64, 0).unwrap(),
///         ["src/lib.rs"],
///     ));
/// }
/// let scores = score_contributors(&activity).unwrap();
/// let health = evaluate_team_health(&activity, &scores, &KeywordSet::collaboration());
/// assert_eq!(health.collaboration_metrics.knowledge_sharing, 67);
/// assert_eq!(health.knowledge_distribution.risk_score, 100);
/// ```
pub fn evaluate_team_health(
    activity: &RepositoryActivity,
    scores: &ExpertiseScores,
    collaboration: &KeywordSet,
) -> TeamHealthMetrics {
    TeamHealthMetrics {
        knowledge_distribution: knowledge_distribution(scores),
        collaboration_metrics: collaboration_metrics(activity, collaboration),
    }
}

fn knowledge_distribution(scores: &ExpertiseScores) -> KnowledgeDistribution {
    let total = scores.total_contributions();
    if total == 0 {
        return KnowledgeDistribution {
            risk_score: 0,
            top_contributor_share: 0.0,
        };
    }

    let top_share = f64::from(scores.max_contributions()) / total as f64;
    let risk_score = if scores.len() <= 1 {
        100
    } else {
        let fair_share = 1.0 / scores.len() as f64;
        let raw = 100.0 * (top_share - fair_share) / (1.0 - fair_share);
        raw.round().clamp(0.0, 100.0) as u8
    };

    KnowledgeDistribution {
        risk_score,
        top_contributor_share: top_share,
    }
}

fn collaboration_metrics(
    activity: &RepositoryActivity,
    collaboration: &KeywordSet,
) -> CollaborationMetrics {
    let collaborative = activity
        .commits
        .iter()
        .filter(|c| collaboration.matches(&c.message))
        .count();

    let knowledge_sharing = if activity.commits.is_empty() {
        0
    } else {
        (100.0 * collaborative as f64 / activity.commits.len() as f64).round() as u8
    };

    CollaborationMetrics {
        knowledge_sharing,
        collaborative_commits: u32::try_from(collaborative).unwrap_or(u32::MAX),
    }
}
