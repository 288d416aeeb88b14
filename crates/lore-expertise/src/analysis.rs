//! The assembled expertise analysis and its entry point, [`assemble`].

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use lore_core::{
    CommitRecord, ContributorId, LoreConfig, LoreError, ManagementInsight, RepositoryActivity,
};
use serde::{Deserialize, Serialize};

use crate::health::{evaluate_team_health, TeamHealthMetrics};
use crate::insights::{DormancyPolicy, InsightSignals, InsightTable};
use crate::keywords::KeywordSet;
use crate::ownership::{map_file_ownership, FileExpert, FileExpertise, FrequencyTiers};
use crate::scoring::{score_contributors, ContributorScore};
use crate::specialization::SpecializationTable;

/// Coarse role derived from expertise percent.
///
/// # Examples
///
/// ```
/// use lore_expertise::analysis::TeamRole;
///
/// assert_eq!(TeamRole::from_expertise(100), TeamRole::Lead);
/// assert_eq!(TeamRole::from_expertise(57), TeamRole::Core);
/// assert_eq!(TeamRole::from_expertise(30), TeamRole::Regular);
/// assert_eq!(TeamRole::from_expertise(5), TeamRole::Occasional);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamRole {
    /// At the top of the expertise ranking.
    Lead,
    /// At least half the top contributor's volume.
    Core,
    /// Steady but smaller contributor.
    Regular,
    /// Drive-by contributor.
    Occasional,
}

impl TeamRole {
    /// Role for an expertise percent.
    pub fn from_expertise(percent: u8) -> Self {
        match percent {
            100.. => TeamRole::Lead,
            50..=99 => TeamRole::Core,
            15..=49 => TeamRole::Regular,
            _ => TeamRole::Occasional,
        }
    }
}

impl fmt::Display for TeamRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TeamRole::Lead => write!(f, "lead"),
            TeamRole::Core => write!(f, "core"),
            TeamRole::Regular => write!(f, "regular"),
            TeamRole::Occasional => write!(f, "occasional"),
        }
    }
}

/// Deterministic per-contributor profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoreProfile {
    /// Contributor key.
    pub identity: ContributorId,
    /// Display name.
    pub name: String,
    /// Email as first seen.
    pub email: String,
    /// Commit volume relative to the top contributor, 0–100.
    pub expertise_percent: u8,
    /// Absolute commit count.
    pub contributions: u32,
    /// Most recent commit.
    pub last_commit: DateTime<Utc>,
    /// Detected specializations, in detection order.
    pub specializations: Vec<String>,
    /// Role derived from expertise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_role: Option<TeamRole>,
}

/// Root aggregate produced by [`assemble`].
///
/// Contributors are referenced by [`ContributorId`] throughout; resolve
/// them with [`ExpertiseAnalysis::profile`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpertiseAnalysis {
    /// Repository identifier.
    pub repository: String,
    /// Number of distinct file paths.
    pub total_files: usize,
    /// Profiles in display order.
    pub expert_profiles: Vec<CoreProfile>,
    /// Per-file ownership, sorted by path.
    pub file_expertise: Vec<FileExpertise>,
    /// Team health metrics.
    pub team_health_metrics: TeamHealthMetrics,
    /// Insights; never empty.
    pub management_insights: Vec<ManagementInsight>,
}

impl ExpertiseAnalysis {
    /// Parse a saved analysis from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`LoreError::Serialization`] if the JSON does not match.
    pub fn from_json(content: &str) -> Result<Self, LoreError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Read a saved analysis from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`LoreError::FileNotFound`] if `path` does not exist,
    /// [`LoreError::Io`] if it cannot be read, or
    /// [`LoreError::Serialization`] on invalid JSON.
    pub fn from_file(path: &Path) -> Result<Self, LoreError> {
        if !path.exists() {
            return Err(LoreError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Profile for `id`, if present.
    pub fn profile(&self, id: &ContributorId) -> Option<&CoreProfile> {
        self.expert_profiles.iter().find(|p| p.identity == *id)
    }

    /// Ranked experts for an exact, already-normalized `path`.
    pub fn experts_for_file(&self, path: &str) -> Option<&[FileExpert]> {
        self.file_expertise
            .iter()
            .find(|f| f.file_path == path)
            .map(|f| f.experts.as_slice())
    }
}

/// Everything [`assemble`] can be tuned with.
#[derive(Debug, Clone, Default)]
pub struct AnalysisOptions {
    /// Specialization rules.
    pub specializations: SpecializationTable,
    /// Change-frequency cut points.
    pub tiers: FrequencyTiers,
    /// Keywords marking a commit as collaborative.
    pub collaboration: KeywordSet,
    /// Insight rules and fallback.
    pub insights: InsightTable,
    /// Dormant-expert window.
    pub dormancy: DormancyPolicy,
}

impl AnalysisOptions {
    /// Build and validate options from a loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LoreError::Config`] if any table or cut point is invalid.
    ///
    /// # Examples
    ///
    /// ```
    /// use lore_core::LoreConfig;
    /// use lore_expertise::analysis::AnalysisOptions;
    ///
    /// let config = LoreConfig::from_toml("[ownership]\nmedium_from = 0.9\nhigh_from = 0.1\n").unwrap();
    /// assert!(AnalysisOptions::from_config(&config).is_err());
    /// ```
    pub fn from_config(config: &LoreConfig) -> Result<Self, LoreError> {
        let specializations = if config.specializations.is_empty() {
            SpecializationTable::builtin()
        } else {
            SpecializationTable::from_rules(&config.specializations)?
        };

        Ok(Self {
            specializations,
            tiers: FrequencyTiers::from_config(&config.ownership)?,
            collaboration: KeywordSet::from_config(&config.health)?,
            insights: InsightTable::from_config(&config.insights)?,
            dormancy: DormancyPolicy::from_config(&config.insights),
        })
    }
}

/// Run the full pipeline over a snapshot.
///
/// The snapshot is validated first. The result is a pure function of
/// `activity` and `options`.
///
/// # Errors
///
/// Returns [`LoreError::EmptyActivity`] or [`LoreError::MalformedActivity`]
/// for snapshots that fail validation.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use lore_core::{AuthorIdentity, CommitRecord, RepositoryActivity};
/// use lore_expertise::analysis::{assemble, AnalysisOptions};
///
/// let mut activity = RepositoryActivity::new("acme/web");
/// activity.record_commit(CommitRecord::new(
///     AuthorIdentity::new("alice", "alice@example.com"),
///     "Add login form",
///     Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
///     ["web/src/Login.tsx"],
/// ));
/// let analysis = assemble(&activity, &AnalysisOptions::default()).unwrap();
/// assert_eq!(analysis.expert_profiles[0].expertise_percent, 100);
/// assert_eq!(analysis.total_files, 1);
/// assert!(!analysis.management_insights.is_empty());
/// ```
pub fn assemble(
    activity: &RepositoryActivity,
    options: &AnalysisOptions,
) -> Result<ExpertiseAnalysis, LoreError> {
    activity.validate()?;
    let scores = score_contributors(activity)?;

    let mut by_author: BTreeMap<ContributorId, Vec<&CommitRecord>> = BTreeMap::new();
    for commit in &activity.commits {
        by_author.entry(commit.author.id()).or_default().push(commit);
    }

    let expert_profiles: Vec<CoreProfile> = scores
        .ranked()
        .into_iter()
        .filter_map(|score| {
            let commits = by_author.get(&score.identity).map_or(&[][..], Vec::as_slice);
            build_profile(activity, score, commits, &options.specializations)
        })
        .collect();

    let file_expertise = map_file_ownership(activity, &scores, &options.tiers);
    let team_health_metrics = evaluate_team_health(activity, &scores, &options.collaboration);

    let signals = InsightSignals::collect(
        &team_health_metrics,
        &expert_profiles,
        &file_expertise,
        &options.dormancy,
        reference_time(activity),
    );
    let management_insights = options.insights.synthesize(&signals);

    Ok(ExpertiseAnalysis {
        repository: activity.repository_id.clone(),
        total_files: activity.files.len(),
        expert_profiles,
        file_expertise,
        team_health_metrics,
        management_insights,
    })
}

fn build_profile(
    activity: &RepositoryActivity,
    score: &ContributorScore,
    commits: &[&CommitRecord],
    specializations: &SpecializationTable,
) -> Option<CoreProfile> {
    let stats = activity.contributors.get(&score.identity)?;
    Some(CoreProfile {
        identity: score.identity.clone(),
        name: stats.display_name.clone(),
        email: stats.email.clone(),
        expertise_percent: score.expertise_percent,
        contributions: score.contributions,
        last_commit: score.last_commit,
        specializations: specializations.detect(commits.iter().copied()),
        team_role: Some(TeamRole::from_expertise(score.expertise_percent)),
    })
}

/// Newest timestamp anywhere in the snapshot, commits or precomputed stats.
fn reference_time(activity: &RepositoryActivity) -> DateTime<Utc> {
    let newest_stat = activity
        .contributors
        .values()
        .map(|s| s.last_commit_timestamp)
        .max();
    activity
        .newest_commit_timestamp()
        .into_iter()
        .chain(newest_stat)
        .max()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Look up the ranked experts for `path` in a finished analysis.
///
/// Backslashes are treated as separators and a leading `./` is ignored.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use lore_core::{AuthorIdentity, CommitRecord, RepositoryActivity};
/// use lore_expertise::analysis::{assemble, find_experts_for_file, AnalysisOptions};
///
/// let mut activity = RepositoryActivity::new("acme/web");
/// activity.record_commit(CommitRecord::new(
///     AuthorIdentity::new("alice", "alice@example.com"),
///     "init",
///     Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
///     ["src/main.rs"],
/// ));
/// let analysis = assemble(&activity, &AnalysisOptions::default()).unwrap();
///
/// let experts = find_experts_for_file(&analysis, ".\\src\\main.rs").unwrap();
/// assert_eq!(experts[0].name, "alice");
/// assert!(find_experts_for_file(&analysis, "src/other.rs").is_none());
/// ```
pub fn find_experts_for_file<'a>(
    analysis: &'a ExpertiseAnalysis,
    path: &str,
) -> Option<&'a [FileExpert]> {
    analysis.experts_for_file(&normalize_path(path))
}

fn normalize_path(path: &str) -> String {
    let mut normalized = path.trim().replace('\\', "/");
    while let Some(rest) = normalized.strip_prefix("./") {
        normalized = rest.to_string();
    }
    normalized
}
