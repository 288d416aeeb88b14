//! Optional narrative enrichment of a finished analysis.
//!
//! An enricher adds free-text fields on top of the deterministic
//! profiles. It never changes numbers, and a failing enricher only
//! leaves the narrative fields empty.

use lore_core::Result;
use serde::{Deserialize, Serialize};

use crate::analysis::{CoreProfile, ExpertiseAnalysis};

/// Free-text fields an enricher may fill in for one profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileNarrative {
    /// How the contributor communicates in commits and reviews.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub communication_style: Option<String>,
    /// Current load, e.g. "stretched across three areas".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workload_indicator: Option<String>,
    /// How the contributor works with others.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collaboration_style: Option<String>,
    /// One-paragraph summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl ProfileNarrative {
    /// Whether every field is absent.
    pub fn is_empty(&self) -> bool {
        self.communication_style.is_none()
            && self.workload_indicator.is_none()
            && self.collaboration_style.is_none()
            && self.summary.is_none()
    }
}

/// A core profile with its narrative fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedProfile {
    /// The deterministic profile, unchanged.
    #[serde(flatten)]
    pub profile: CoreProfile,
    /// Narrative fields; all absent when enrichment was skipped or failed.
    #[serde(flatten)]
    pub narrative: ProfileNarrative,
}

/// An analysis plus one enriched profile per core profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedAnalysis {
    /// The deterministic analysis, unchanged.
    #[serde(flatten)]
    pub analysis: ExpertiseAnalysis,
    /// Enriched profiles, in the same order as `analysis.expert_profiles`.
    pub enriched_profiles: Vec<EnrichedProfile>,
    /// Team-level summary, if the enricher produced one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_summary: Option<String>,
}

/// Source of narrative text, typically backed by a language model.
pub trait NarrativeEnricher {
    /// Describe one contributor.
    fn enrich_profile(
        &self,
        profile: &CoreProfile,
        analysis: &ExpertiseAnalysis,
    ) -> Result<ProfileNarrative>;

    /// Summarize the team as a whole.
    fn team_summary(&self, _analysis: &ExpertiseAnalysis) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Enricher that adds nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEnricher;

impl NarrativeEnricher for NoopEnricher {
    fn enrich_profile(
        &self,
        _profile: &CoreProfile,
        _analysis: &ExpertiseAnalysis,
    ) -> Result<ProfileNarrative> {
        Ok(ProfileNarrative::default())
    }
}

/// Attach narratives to every profile of `analysis`.
///
/// Never fails. Enricher errors are logged at `warn` and leave the
/// affected fields empty.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use lore_core::{AuthorIdentity, CommitRecord, RepositoryActivity};
/// use lore_expertise::analysis::{assemble, AnalysisOptions};
/// use lore_expertise::enrich::{enrich, NoopEnricher};
///
/// let mut activity = RepositoryActivity::new("acme/web");
/// activity.record_commit(CommitRecord::new(
///     AuthorIdentity::new("alice", "alice@example.com"),
///     "init",
///     Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
///     ["README.md"],
/// ));
/// let analysis = assemble(&activity, &AnalysisOptions::default()).unwrap();
/// let enriched = enrich(analysis, &NoopEnricher);
/// assert!(enriched.enriched_profiles[0].narrative.is_empty());
/// assert!(enriched.team_summary.is_none());
/// ```
pub fn enrich(analysis: ExpertiseAnalysis, enricher: &dyn NarrativeEnricher) -> EnrichedAnalysis {
    let enriched_profiles: Vec<EnrichedProfile> = analysis
        .expert_profiles
        .iter()
        .map(|profile| {
            let narrative = match enricher.enrich_profile(profile, &analysis) {
                Ok(narrative) => narrative,
                Err(e) => {
                    tracing::warn!(
                        contributor = %profile.identity,
                        error = %e,
                        "profile enrichment failed"
                    );
                    ProfileNarrative::default()
                }
            };
            EnrichedProfile {
                profile: profile.clone(),
                narrative,
            }
        })
        .collect();

    let team_summary = match enricher.team_summary(&analysis) {
        Ok(summary) => summary,
        Err(e) => {
            tracing::warn!(error = %e, "team summary enrichment failed");
            None
        }
    };

    EnrichedAnalysis {
        analysis,
        enriched_profiles,
        team_summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{assemble, AnalysisOptions};
    use chrono::{TimeZone, Utc};
    use lore_core::{AuthorIdentity, CommitRecord, LoreError, RepositoryActivity};

    fn analysis() -> ExpertiseAnalysis {
        let mut activity = RepositoryActivity::new("acme/web");
        for (name, secs) in [("alice", 1), ("alice", 2), ("bob", 3)] {
            activity.record_commit(CommitRecord::new(
                AuthorIdentity::new(name, format!("{name}@e.com")),
                "change",
                Utc.timestamp_opt(secs, 0).unwrap(),
                ["src/lib.rs"],
            ));
        }
        assemble(&activity, &AnalysisOptions::default()).unwrap()
    }

    struct Scripted;

    impl NarrativeEnricher for Scripted {
        fn enrich_profile(
            &self,
            profile: &CoreProfile,
            _analysis: &ExpertiseAnalysis,
        ) -> Result<ProfileNarrative> {
            if profile.name == "bob" {
                return Err(LoreError::Enrichment("model timed out".into()));
            }
            Ok(ProfileNarrative {
                summary: Some(format!("{} leads the core modules", profile.name)),
                ..ProfileNarrative::default()
            })
        }

        fn team_summary(&self, analysis: &ExpertiseAnalysis) -> Result<Option<String>> {
            Ok(Some(format!("{} contributors", analysis.expert_profiles.len())))
        }
    }

    struct Failing;

    impl NarrativeEnricher for Failing {
        fn enrich_profile(
            &self,
            _profile: &CoreProfile,
            _analysis: &ExpertiseAnalysis,
        ) -> Result<ProfileNarrative> {
            Err(LoreError::Enrichment("unavailable".into()))
        }

        fn team_summary(&self, _analysis: &ExpertiseAnalysis) -> Result<Option<String>> {
            Err(LoreError::Enrichment("unavailable".into()))
        }
    }

    #[test]
    fn noop_leaves_core_untouched() {
        let core = analysis();
        let enriched = enrich(core.clone(), &NoopEnricher);
        assert_eq!(enriched.analysis, core);
        assert_eq!(enriched.enriched_profiles.len(), 2);
        assert!(enriched
            .enriched_profiles
            .iter()
            .all(|p| p.narrative.is_empty()));
    }

    #[test]
    fn per_profile_failures_are_isolated() {
        let enriched = enrich(analysis(), &Scripted);
        let alice = &enriched.enriched_profiles[0];
        assert_eq!(alice.profile.name, "alice");
        assert_eq!(
            alice.narrative.summary.as_deref(),
            Some("alice leads the core modules")
        );
        assert!(enriched.enriched_profiles[1].narrative.is_empty());
        assert_eq!(enriched.team_summary.as_deref(), Some("2 contributors"));
    }

    #[test]
    fn total_failure_still_returns_analysis() {
        let core = analysis();
        let enriched = enrich(core.clone(), &Failing);
        assert_eq!(enriched.analysis, core);
        assert!(enriched.team_summary.is_none());
    }

    #[test]
    fn absent_narrative_fields_are_omitted_from_json() {
        let enriched = enrich(analysis(), &Scripted);
        let json = serde_json::to_value(&enriched).unwrap();
        let bob = &json["enrichedProfiles"][1];
        assert_eq!(bob["name"], "bob");
        assert!(bob.get("summary").is_none());
        assert!(bob.get("communicationStyle").is_none());
        assert_eq!(
            json["enrichedProfiles"][0]["summary"],
            "alice leads the core modules"
        );
        assert!(json.get("expertProfiles").is_some());
    }
}
