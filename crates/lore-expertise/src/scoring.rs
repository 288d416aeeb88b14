//! Per-contributor expertise scoring.
//!
//! Expertise is commit volume normalized to the top contributor:
//! `round(100 * commits / max_commits)`.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use lore_core::{ContributorId, LoreError, RepositoryActivity};
use serde::{Deserialize, Serialize};

/// Score for a single contributor.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use lore_core::ContributorId;
/// use lore_expertise::scoring::ContributorScore;
///
/// let score = ContributorScore {
///     identity: ContributorId::from_email("alice@example.com"),
///     contributions: 150,
///     expertise_percent: 100,
///     last_commit: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
/// };
/// assert_eq!(score.expertise_percent, 100);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributorScore {
    /// Contributor key.
    pub identity: ContributorId,
    /// Absolute commit count.
    pub contributions: u32,
    /// Commit volume relative to the top contributor, 0–100.
    pub expertise_percent: u8,
    /// Most recent commit.
    pub last_commit: DateTime<Utc>,
}

/// Scores for every contributor in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpertiseScores {
    scores: BTreeMap<ContributorId, ContributorScore>,
    max_contributions: u32,
    total_contributions: u64,
}

impl ExpertiseScores {
    /// Score for `id`, if it is a known contributor.
    pub fn get(&self, id: &ContributorId) -> Option<&ContributorScore> {
        self.scores.get(id)
    }

    /// Expertise percent for `id`, or 0 for unknown contributors.
    pub fn percent(&self, id: &ContributorId) -> u8 {
        self.scores.get(id).map_or(0, |s| s.expertise_percent)
    }

    /// Number of scored contributors.
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Whether no contributors were scored. Never true for a value
    /// returned by [`score_contributors`].
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Largest commit count in the snapshot.
    pub fn max_contributions(&self) -> u32 {
        self.max_contributions
    }

    /// Sum of all commit counts.
    pub fn total_contributions(&self) -> u64 {
        self.total_contributions
    }

    /// Scores in identity order.
    pub fn iter(&self) -> impl Iterator<Item = &ContributorScore> {
        self.scores.values()
    }

    /// Scores in display order: expertise, then contributions, then most
    /// recent commit, then identity.
    pub fn ranked(&self) -> Vec<&ContributorScore> {
        let mut ranked: Vec<&ContributorScore> = self.scores.values().collect();
        ranked.sort_by(|a, b| display_order(a, b));
        ranked
    }
}

/// Total display order over contributor scores.
pub(crate) fn display_order(a: &ContributorScore, b: &ContributorScore) -> Ordering {
    b.expertise_percent
        .cmp(&a.expertise_percent)
        .then_with(|| b.contributions.cmp(&a.contributions))
        .then_with(|| recency_then_identity(a.last_commit, &a.identity, b.last_commit, &b.identity))
}

/// Tiebreak shared by every ranking: more recent first, then identity ascending.
pub(crate) fn recency_then_identity(
    a_last: DateTime<Utc>,
    a_id: &ContributorId,
    b_last: DateTime<Utc>,
    b_id: &ContributorId,
) -> Ordering {
    b_last.cmp(&a_last).then_with(|| a_id.cmp(b_id))
}

/// Score every contributor in `activity`.
///
/// # Errors
///
/// Returns [`LoreError::EmptyActivity`] if the snapshot has no contributors.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use lore_core::{AuthorIdentity, CommitRecord, ContributorId, RepositoryActivity};
/// use lore_expertise::scoring::score_contributors;
///
/// let mut activity = RepositoryActivity::new("acme/web");
/// for (name, n) in [("alice", 4), ("bob", 2)] {
///     for i in 0..n {
///         activity.record_commit(CommitRecord::new(
///             AuthorIdentity::new(name, format!("{name}@example.com")),
///             "change",
///             Utc.timestamp_opt(1_700_000_000 + i, 0).unwrap(),
///             Vec::<String>::new(),
///         ));
///     }
/// }
/// let scores = score_contributors(&activity).unwrap();
/// assert_eq!(scores.percent(&ContributorId::from_email("bob@example.com")), 50);
/// ```
pub fn score_contributors(activity: &RepositoryActivity) -> Result<ExpertiseScores, LoreError> {
    let max_contributions = activity
        .contributors
        .values()
        .map(|s| s.commit_count)
        .max()
        .ok_or(LoreError::EmptyActivity)?;

    let mut scores = BTreeMap::new();
    let mut total_contributions = 0u64;

    for (id, stats) in &activity.contributors {
        total_contributions += u64::from(stats.commit_count);
        scores.insert(
            id.clone(),
            ContributorScore {
                identity: id.clone(),
                contributions: stats.commit_count,
                expertise_percent: relative_percent(stats.commit_count, max_contributions),
                last_commit: stats.last_commit_timestamp,
            },
        );
    }

    Ok(ExpertiseScores {
        scores,
        max_contributions,
        total_contributions,
    })
}

/// `round(100 * value / max)` in integer arithmetic, half rounding up.
fn relative_percent(value: u32, max: u32) -> u8 {
    if max == 0 {
        return 0;
    }
    let value = u64::from(value.min(max));
    let max = u64::from(max);
    ((200 * value + max) / (2 * max)) as u8
}
