//! Expertise aggregation: who knows what in a repository.
//!
//! Turns a normalized [`lore_core::RepositoryActivity`] snapshot into an
//! [`ExpertiseAnalysis`]: per-contributor expertise and specializations,
//! per-file ownership with change-frequency tiers, team health metrics,
//! and rule-driven management insights. Everything here is pure and
//! deterministic; narrative enrichment is an optional step on top.

pub mod analysis;
pub mod enrich;
pub mod health;
pub mod insights;
pub mod keywords;
pub mod ownership;
pub mod scoring;
pub mod specialization;

pub use analysis::{
    assemble, find_experts_for_file, AnalysisOptions, CoreProfile, ExpertiseAnalysis, TeamRole,
};
pub use enrich::{enrich, EnrichedAnalysis, EnrichedProfile, NarrativeEnricher, NoopEnricher};
