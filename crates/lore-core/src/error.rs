use std::path::PathBuf;

/// Errors that can occur across the lore workspace.
///
/// The engine only ever produces [`LoreError::EmptyActivity`],
/// [`LoreError::MalformedActivity`] and [`LoreError::Config`]; the
/// remaining variants belong to enrichment, loading and the CLI. The binary
/// converts to `miette` diagnostics at the boundary.
///
/// # Examples
///
/// ```
/// use lore_core::LoreError;
///
/// let err = LoreError::MalformedActivity("file `a.rs` lists unknown contributor".into());
/// assert!(err.to_string().contains("a.rs"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum LoreError {
    /// The activity snapshot has no contributors; no analysis can be produced.
    #[error("activity snapshot has no contributors")]
    EmptyActivity,

    /// A structural invariant of the activity snapshot is violated.
    #[error("malformed activity: {0}")]
    MalformedActivity(String),

    /// Invalid or missing configuration, including caller-supplied rule tables.
    #[error("configuration error: {0}")]
    Config(String),

    /// The optional narrative enricher failed; never fatal to an analysis.
    #[error("enrichment error: {0}")]
    Enrichment(String),

    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A required file was not found.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
}
