//! Core types, configuration, and error handling for lore.
//!
//! This crate provides the shared foundation used by the engine and the CLI:
//! - [`LoreError`]: unified error type using `thiserror`
//! - [`LoreConfig`]: configuration loaded from `.lore.toml`
//! - The activity model: [`RepositoryActivity`], [`CommitRecord`],
//!   [`ContributorStats`], [`ContributorId`]
//! - Shared output types: [`ManagementInsight`], [`InsightCategory`],
//!   [`Priority`], [`OutputFormat`]

mod activity;
mod config;
mod error;
mod types;

pub use activity::{
    ActivityFingerprint, AuthorIdentity, CommitRecord, ContributorId, ContributorStats,
    RepositoryActivity,
};
pub use config::{
    default_collaboration_keywords, Comparison, HealthConfig, InsightMetric, InsightRule,
    InsightTemplate, InsightsConfig, LoreConfig, OwnershipConfig, SpecializationRule,
};
pub use error::LoreError;
pub use types::{InsightCategory, ManagementInsight, OutputFormat, Priority};

/// A convenience `Result` type for lore operations.
pub type Result<T> = std::result::Result<T, LoreError>;
