//! Per-file ownership and change-frequency tiers.
//!
//! Ranks the contributors of every file by their global expertise
//! weighted with their share of the file's touches, and classifies each
//! file's change frequency relative to the rest of the repository.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use lore_core::{ContributorId, LoreError, OwnershipConfig, RepositoryActivity};
use serde::{Deserialize, Serialize};

use crate::scoring::{recency_then_identity, ExpertiseScores};

/// Coarse change-frequency tier.
///
/// # Examples
///
/// ```
/// use lore_expertise::ownership::ChangeFrequency;
///
/// assert_eq!(ChangeFrequency::High.to_string(), "high");
/// assert_eq!(serde_json::to_string(&ChangeFrequency::Low).unwrap(), "\"low\"");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeFrequency {
    /// Bottom of the touch-count distribution.
    Low,
    /// Middle of the distribution.
    Medium,
    /// Top of the distribution.
    High,
}

impl fmt::Display for ChangeFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            ChangeFrequency::Low => "low",
            ChangeFrequency::Medium => "medium",
            ChangeFrequency::High => "high",
        })
    }
}

/// Percentile cut points for [`ChangeFrequency`].
///
/// A file's rank is its midrank in the touch-count distribution: the
/// share of files with fewer touches plus half the share with the same
/// count. Files with equal touch counts share a tier, more touches never
/// lowers a tier, and the most-touched of two files is already `High`.
///
/// # Examples
///
/// ```
/// use lore_expertise::ownership::{ChangeFrequency, FrequencyTiers};
///
/// let tiers = FrequencyTiers::default();
/// assert_eq!(tiers.tier_for_rank(0.0), ChangeFrequency::Low);
/// assert_eq!(tiers.tier_for_rank(0.5), ChangeFrequency::Medium);
/// assert_eq!(tiers.tier_for_rank(0.9), ChangeFrequency::High);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencyTiers {
    medium_from: f64,
    high_from: f64,
}

impl Default for FrequencyTiers {
    fn default() -> Self {
        Self {
            medium_from: 1.0 / 3.0,
            high_from: 2.0 / 3.0,
        }
    }
}

impl FrequencyTiers {
    /// Build tiers from explicit cut points.
    ///
    /// # Errors
    ///
    /// Returns [`LoreError::Config`] unless `0 <= medium_from <= high_from <= 1`.
    pub fn new(medium_from: f64, high_from: f64) -> Result<Self, LoreError> {
        let in_range = |v: f64| v.is_finite() && (0.0..=1.0).contains(&v);
        if !in_range(medium_from) || !in_range(high_from) || medium_from > high_from {
            return Err(LoreError::Config(format!(
                "change-frequency cut points must satisfy 0 <= medium_from <= high_from <= 1 \
                 (got {medium_from}, {high_from})"
            )));
        }
        Ok(Self {
            medium_from,
            high_from,
        })
    }

    /// Build tiers from the `[ownership]` configuration section.
    ///
    /// # Errors
    ///
    /// See [`FrequencyTiers::new`].
    pub fn from_config(config: &OwnershipConfig) -> Result<Self, LoreError> {
        Self::new(config.medium_from, config.high_from)
    }

    /// Tier for a percentile rank in `(0, 1)`.
    pub fn tier_for_rank(&self, rank: f64) -> ChangeFrequency {
        if rank < self.medium_from {
            ChangeFrequency::Low
        } else if rank < self.high_from {
            ChangeFrequency::Medium
        } else {
            ChangeFrequency::High
        }
    }
}

/// One contributor's standing on a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileExpert {
    /// Contributor key; resolve against the analysis profiles for details.
    pub identity: ContributorId,
    /// Display name at analysis time.
    pub name: String,
    /// Global expertise weighted by share of this file's touches, 0–100.
    pub score: f64,
    /// Commits by this contributor that changed the file.
    pub touches: u32,
}

/// Ownership summary for a single file.
///
/// # Examples
///
/// ```
/// use lore_expertise::ownership::{ChangeFrequency, FileExpertise};
///
/// let file = FileExpertise {
///     file_path: "src/auth/session.rs".into(),
///     file_name: "session.rs".into(),
///     touches: 12,
///     experts: vec![],
///     change_frequency: ChangeFrequency::High,
/// };
/// assert_eq!(file.file_name, "session.rs");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileExpertise {
    /// Path relative to the repository root.
    pub file_path: String,
    /// Last path component.
    pub file_name: String,
    /// Total commits touching the file by its listed contributors.
    pub touches: u32,
    /// Contributors ranked by score, best first.
    pub experts: Vec<FileExpert>,
    /// Change-frequency tier.
    pub change_frequency: ChangeFrequency,
}

/// Build one [`FileExpertise`] per path in the snapshot's file map, in
/// path order.
///
/// A contributor's score on a file is their expertise percent times the
/// share of the file's touches they made. Files whose contributors have
/// no recorded touches split the weight evenly. Ties rank the more
/// recently active contributor first, then by identity.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use lore_core::{AuthorIdentity, CommitRecord, RepositoryActivity};
/// use lore_expertise::ownership::{map_file_ownership, FrequencyTiers};
/// use lore_expertise::scoring::score_contributors;
///
/// let mut activity = RepositoryActivity::new("acme/web");
/// activity.record_commit(CommitRecord::new(
///     AuthorIdentity::new("alice", "alice@example.com"),
///     "init",
///     Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
///     ["src/main.rs"],
/// ));
/// let scores = score_contributors(&activity).unwrap();
/// let files = map_file_ownership(&activity, &scores, &FrequencyTiers::default());
/// assert_eq!(files[0].experts[0].score, 100.0);
/// ```
pub fn map_file_ownership(
    activity: &RepositoryActivity,
    scores: &ExpertiseScores,
    tiers: &FrequencyTiers,
) -> Vec<FileExpertise> {
    // Key: file path, Value: contributor -> commits touching it
    let mut file_touches: BTreeMap<&str, BTreeMap<&ContributorId, u32>> = BTreeMap::new();
    let authors: Vec<ContributorId> = activity.commits.iter().map(|c| c.author.id()).collect();

    for (commit, author) in activity.commits.iter().zip(&authors) {
        for path in &commit.changed_paths {
            let Some(listed) = activity.files.get(path) else {
                continue;
            };
            if !listed.contains(author) {
                continue;
            }
            *file_touches
                .entry(path.as_str())
                .or_default()
                .entry(author)
                .or_default() += 1;
        }
    }

    let totals: Vec<u32> = activity
        .files
        .keys()
        .map(|path| {
            file_touches
                .get(path.as_str())
                .map_or(0, |per_author| per_author.values().sum())
        })
        .collect();

    let mut sorted_totals = totals.clone();
    sorted_totals.sort_unstable();
    let file_count = sorted_totals.len();

    let mut files = Vec::with_capacity(file_count);
    for ((path, contributors), total) in activity.files.iter().zip(totals) {
        let per_author = file_touches.get(path.as_str());

        let mut experts: Vec<(FileExpert, DateTime<Utc>)> = contributors
            .iter()
            .map(|id| {
                let touches = per_author
                    .and_then(|m| m.get(id))
                    .copied()
                    .unwrap_or(0);
                let share = if total == 0 {
                    1.0 / contributors.len() as f64
                } else {
                    f64::from(touches) / f64::from(total)
                };
                let stats = activity.contributors.get(id);
                let expert = FileExpert {
                    identity: id.clone(),
                    name: stats.map(|s| s.display_name.clone()).unwrap_or_default(),
                    score: round2(f64::from(scores.percent(id)) * share),
                    touches,
                };
                let last = scores
                    .get(id)
                    .map(|s| s.last_commit)
                    .unwrap_or(DateTime::<Utc>::MIN_UTC);
                (expert, last)
            })
            .collect();

        experts.sort_by(|(a, a_last), (b, b_last)| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| recency_then_identity(*a_last, &a.identity, *b_last, &b.identity))
        });

        let below = sorted_totals.partition_point(|t| *t < total);
        let through = sorted_totals.partition_point(|t| *t <= total);
        let rank = (below + through) as f64 / (2 * file_count) as f64;

        files.push(FileExpertise {
            file_path: path.clone(),
            file_name: file_name(path).to_string(),
            touches: total,
            experts: experts.into_iter().map(|(e, _)| e).collect(),
            change_frequency: tiers.tier_for_rank(rank),
        });
    }

    files
}

fn file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
