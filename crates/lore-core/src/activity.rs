use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::marker::PhantomData;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};

use crate::error::LoreError;

/// Stable key identifying one contributor across commits.
///
/// Built from the author's email, trimmed and lower-cased, so that
/// `Alice@Example.com` and `alice@example.com` are the same person.
///
/// # Examples
///
/// ```
/// use lore_core::ContributorId;
///
/// let id = ContributorId::from_email("  Alice@Example.COM ");
/// assert_eq!(id.as_str(), "alice@example.com");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ContributorId(String);

impl ContributorId {
    /// Normalize an email address into a contributor key.
    pub fn from_email(email: &str) -> Self {
        Self(email.trim().to_lowercase())
    }

    /// The normalized email this identity wraps.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ContributorId {
    fn from(value: String) -> Self {
        Self::from_email(&value)
    }
}

impl From<ContributorId> for String {
    fn from(value: ContributorId) -> Self {
        value.0
    }
}

impl fmt::Display for ContributorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

/// Commit author as recorded by version control.
///
/// # Examples
///
/// ```
/// use lore_core::AuthorIdentity;
///
/// let author = AuthorIdentity::new("Alice", "ALICE@example.com");
/// assert_eq!(author.id().as_str(), "alice@example.com");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorIdentity {
    /// Author display name.
    pub name: String,
    /// Author email as written in the commit.
    pub email: String,
}

impl AuthorIdentity {
    /// Create an author from a name and email.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    /// Contributor key for this author.
    pub fn id(&self) -> ContributorId {
        ContributorId::from_email(&self.email)
    }
}

/// A single normalized commit.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use lore_core::{AuthorIdentity, CommitRecord};
///
/// let commit = CommitRecord::new(
///     AuthorIdentity::new("alice", "alice@example.com"),
///     "fix: auth bug",
///     Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
///     ["src/auth.rs"],
/// );
/// assert!(commit.touches("src/auth.rs"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRecord {
    /// Commit author.
    pub author: AuthorIdentity,
    /// Free-text commit message.
    pub message: String,
    /// When the commit was authored.
    pub timestamp: DateTime<Utc>,
    /// Paths changed by the commit; empty for metadata-only commits.
    #[serde(default)]
    pub changed_paths: BTreeSet<String>,
}

impl CommitRecord {
    /// Build a commit record from its parts.
    pub fn new<I, P>(
        author: AuthorIdentity,
        message: impl Into<String>,
        timestamp: DateTime<Utc>,
        changed_paths: I,
    ) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Self {
            author,
            message: message.into(),
            timestamp,
            changed_paths: changed_paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether this commit changed `path`.
    pub fn touches(&self, path: &str) -> bool {
        self.changed_paths.contains(path)
    }
}

/// Precomputed per-contributor totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributorStats {
    /// Contributor key; must equal the key this entry is stored under.
    pub identity: ContributorId,
    /// Human-readable name.
    pub display_name: String,
    /// Email as first seen.
    pub email: String,
    /// Number of commits; always at least 1.
    pub commit_count: u32,
    /// Most recent commit by this contributor.
    pub last_commit_timestamp: DateTime<Utc>,
    /// Lines added, when the adapter provides them.
    #[serde(default)]
    pub additions: u64,
    /// Lines deleted, when the adapter provides them.
    #[serde(default)]
    pub deletions: u64,
}

/// Immutable snapshot of repository activity, the engine's only input.
///
/// Commit order carries no meaning; recency is always derived from
/// each commit's timestamp.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use lore_core::{AuthorIdentity, CommitRecord, RepositoryActivity};
///
/// let mut activity = RepositoryActivity::new("acme/web");
/// activity.record_commit(CommitRecord::new(
///     AuthorIdentity::new("alice", "alice@example.com"),
///     "init",
///     Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
///     ["README.md"],
/// ));
/// assert_eq!(activity.contributors.len(), 1);
/// assert_eq!(activity.files.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawActivity")]
pub struct RepositoryActivity {
    /// Repository identifier, e.g. `owner/name`.
    pub repository_id: String,
    /// All commits in the snapshot, in adapter order.
    #[serde(default)]
    pub commits: Vec<CommitRecord>,
    /// Per-contributor totals keyed by identity.
    #[serde(default)]
    pub contributors: BTreeMap<ContributorId, ContributorStats>,
    /// Contributors that touched each file.
    #[serde(default)]
    pub files: BTreeMap<String, BTreeSet<ContributorId>>,
}

impl RepositoryActivity {
    /// Create an empty snapshot for `repository_id`.
    pub fn new(repository_id: impl Into<String>) -> Self {
        Self {
            repository_id: repository_id.into(),
            commits: Vec::new(),
            contributors: BTreeMap::new(),
            files: BTreeMap::new(),
        }
    }

    /// Parse a snapshot from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`LoreError::Serialization`] if the JSON does not match the
    /// model, or [`LoreError::MalformedActivity`] if two keys name the same
    /// contributor or file once normalized.
    pub fn from_json(content: &str) -> Result<Self, LoreError> {
        let raw: RawActivity = serde_json::from_str(content)?;
        raw.try_into()
    }

    /// Read and parse a snapshot from a JSON file.
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

    /// Append a commit and fold it into the contributor and file maps.
    ///
    /// This is the accumulation an adapter performs; snapshots built this
    /// way always satisfy [`RepositoryActivity::validate`].
    pub fn record_commit(&mut self, commit: CommitRecord) {
        let id = commit.author.id();

        let stats = self
            .contributors
            .entry(id.clone())
            .or_insert_with(|| ContributorStats {
                identity: id.clone(),
                display_name: commit.author.name.clone(),
                email: commit.author.email.clone(),
                commit_count: 0,
                last_commit_timestamp: commit.timestamp,
                additions: 0,
                deletions: 0,
            });
        stats.commit_count += 1;
        if commit.timestamp > stats.last_commit_timestamp {
            stats.last_commit_timestamp = commit.timestamp;
        }

        for path in &commit.changed_paths {
            self.files
                .entry(path.clone())
                .or_default()
                .insert(id.clone());
        }

        self.commits.push(commit);
    }

    /// Timestamp of the newest commit, if any.
    pub fn newest_commit_timestamp(&self) -> Option<DateTime<Utc>> {
        self.commits.iter().map(|c| c.timestamp).max()
    }

    /// Check the structural invariants the engine relies on.
    ///
    /// # Errors
    ///
    /// Returns [`LoreError::EmptyActivity`] when there are no contributors,
    /// or [`LoreError::MalformedActivity`] naming the first violation found.
    pub fn validate(&self) -> Result<(), LoreError> {
        if self.contributors.is_empty() {
            return Err(LoreError::EmptyActivity);
        }

        for (id, stats) in &self.contributors {
            if stats.identity != *id {
                return Err(LoreError::MalformedActivity(format!(
                    "contributor stored under `{id}` carries identity `{}`",
                    stats.identity
                )));
            }
            if stats.commit_count == 0 {
                return Err(LoreError::MalformedActivity(format!(
                    "contributor `{id}` has zero commits"
                )));
            }
        }

        for (path, ids) in &self.files {
            if ids.is_empty() {
                return Err(LoreError::MalformedActivity(format!(
                    "file `{path}` has no contributors"
                )));
            }
            if let Some(unknown) = ids.iter().find(|id| !self.contributors.contains_key(*id)) {
                return Err(LoreError::MalformedActivity(format!(
                    "file `{path}` references unknown contributor `{unknown}`"
                )));
            }
        }

        for commit in &self.commits {
            let id = commit.author.id();
            if !self.contributors.contains_key(&id) {
                return Err(LoreError::MalformedActivity(format!(
                    "commit `{}` is authored by unknown contributor `{id}`",
                    commit.message.lines().next().unwrap_or_default()
                )));
            }
        }

        Ok(())
    }

    /// Content fingerprint for caching layers built outside the engine.
    pub fn fingerprint(&self) -> ActivityFingerprint {
        ActivityFingerprint::of(self)
    }
}

/// Snapshot as written on the wire, before contributor keys are
/// normalized. Keeps every map entry so repeated keys can be reported
/// instead of silently overwritten.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawActivity {
    repository_id: String,
    #[serde(default)]
    commits: Vec<CommitRecord>,
    #[serde(default)]
    contributors: RawEntries<ContributorStats>,
    #[serde(default)]
    files: RawEntries<Vec<String>>,
}

impl TryFrom<RawActivity> for RepositoryActivity {
    type Error = LoreError;

    fn try_from(raw: RawActivity) -> Result<Self, LoreError> {
        // Key: normalized identity, Value: key as written
        let mut spellings: BTreeMap<ContributorId, String> = BTreeMap::new();
        let mut contributors = BTreeMap::new();
        for (key, stats) in raw.contributors.0 {
            let id = ContributorId::from_email(&key);
            if let Some(first) = spellings.insert(id.clone(), key.clone()) {
                return Err(LoreError::MalformedActivity(format!(
                    "contributor keys `{first}` and `{key}` both normalize to `{id}`"
                )));
            }
            contributors.insert(id, stats);
        }

        let mut files = BTreeMap::new();
        for (path, emails) in raw.files.0 {
            let mut ids = BTreeSet::new();
            for email in &emails {
                if !ids.insert(ContributorId::from_email(email)) {
                    return Err(LoreError::MalformedActivity(format!(
                        "file `{path}` lists contributor `{email}` more than once"
                    )));
                }
            }
            if files.insert(path.clone(), ids).is_some() {
                return Err(LoreError::MalformedActivity(format!(
                    "file `{path}` appears more than once"
                )));
            }
        }

        Ok(Self {
            repository_id: raw.repository_id,
            commits: raw.commits,
            contributors,
            files,
        })
    }
}

/// JSON object read as an ordered list of entries, duplicates included.
struct RawEntries<V>(Vec<(String, V)>);

impl<V> Default for RawEntries<V> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for RawEntries<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for EntriesVisitor<V> {
            type Value = RawEntries<V>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, V>()? {
                    entries.push(entry);
                }
                Ok(RawEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor(PhantomData))
    }
}

/// SHA-256 digest summarizing a snapshot's content.
///
/// Two snapshots with the same repository, commit count, newest commit,
/// contributor totals and file set share a fingerprint, so a cache keyed
/// on it can skip recomputing an identical analysis.
///
/// # Examples
///
/// ```
/// use lore_core::RepositoryActivity;
///
/// let a = RepositoryActivity::new("acme/web");
/// let b = RepositoryActivity::new("acme/web");
/// assert_eq!(a.fingerprint(), b.fingerprint());
/// assert_ne!(a.fingerprint(), RepositoryActivity::new("acme/api").fingerprint());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityFingerprint(String);

impl ActivityFingerprint {
    /// Compute the fingerprint of `activity`.
    pub fn of(activity: &RepositoryActivity) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(activity.repository_id.as_bytes());
        hasher.update((activity.commits.len() as u64).to_le_bytes());
        if let Some(newest) = activity.newest_commit_timestamp() {
            hasher.update(newest.timestamp().to_le_bytes());
        }
        for (id, stats) in &activity.contributors {
            hasher.update(id.as_str().as_bytes());
            hasher.update(stats.commit_count.to_le_bytes());
            hasher.update(stats.last_commit_timestamp.timestamp().to_le_bytes());
        }
        for path in activity.files.keys() {
            hasher.update(path.as_bytes());
            hasher.update([0u8]);
        }
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Hex-encoded digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActivityFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn commit(name: &str, email: &str, secs: i64, paths: &[&str]) -> CommitRecord {
        CommitRecord::new(
            AuthorIdentity::new(name, email),
            "change",
            ts(secs),
            paths.iter().copied(),
        )
    }

    #[test]
    fn record_commit_accumulates_stats() {
        let mut activity = RepositoryActivity::new("acme/web");
        activity.record_commit(commit("alice", "alice@e.com", 2000, &["a.rs"]));
        activity.record_commit(commit("Alice", "ALICE@e.com", 1000, &["b.rs"]));

        let id = ContributorId::from_email("alice@e.com");
        let stats = &activity.contributors[&id];
        assert_eq!(stats.commit_count, 2);
        assert_eq!(stats.last_commit_timestamp, ts(2000));
        assert_eq!(stats.display_name, "alice");
        assert_eq!(activity.files.len(), 2);
        assert!(activity.validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_snapshot() {
        let activity = RepositoryActivity::new("acme/web");
        assert!(matches!(activity.validate(), Err(LoreError::EmptyActivity)));
    }

    #[test]
    fn validate_rejects_unknown_file_contributor() {
        let mut activity = RepositoryActivity::new("acme/web");
        activity.record_commit(commit("alice", "alice@e.com", 1000, &["a.rs"]));
        activity
            .files
            .get_mut("a.rs")
            .unwrap()
            .insert(ContributorId::from_email("ghost@e.com"));

        let err = activity.validate().unwrap_err();
        assert!(matches!(err, LoreError::MalformedActivity(_)));
        assert!(err.to_string().contains("ghost@e.com"));
    }

    #[test]
    fn validate_rejects_zero_commit_contributor() {
        let mut activity = RepositoryActivity::new("acme/web");
        activity.record_commit(commit("alice", "alice@e.com", 1000, &[]));
        activity
            .contributors
            .values_mut()
            .for_each(|s| s.commit_count = 0);

        assert!(matches!(
            activity.validate(),
            Err(LoreError::MalformedActivity(_))
        ));
    }

    #[test]
    fn validate_rejects_commit_by_unknown_author() {
        let mut activity = RepositoryActivity::new("acme/web");
        activity.record_commit(commit("alice", "alice@e.com", 1000, &[]));
        activity
            .commits
            .push(commit("mallory", "mallory@e.com", 1500, &[]));

        let err = activity.validate().unwrap_err();
        assert!(err.to_string().contains("mallory@e.com"));
    }

    #[test]
    fn validate_rejects_empty_file_contributor_set() {
        let mut activity = RepositoryActivity::new("acme/web");
        activity.record_commit(commit("alice", "alice@e.com", 1000, &[]));
        activity.files.insert("orphan.rs".into(), BTreeSet::new());

        let err = activity.validate().unwrap_err();
        assert!(err.to_string().contains("orphan.rs"));
    }

    #[test]
    fn json_keys_are_normalized_and_camel_case() {
        let json = r#"{
            "repositoryId": "acme/web",
            "commits": [],
            "contributors": {
                "Alice@Example.com": {
                    "identity": "alice@example.com",
                    "displayName": "Alice",
                    "email": "Alice@Example.com",
                    "commitCount": 3,
                    "lastCommitTimestamp": "2024-05-01T12:00:00Z"
                }
            },
            "files": { "src/lib.rs": ["ALICE@example.com"] }
        }"#;
        let activity = RepositoryActivity::from_json(json).unwrap();
        let id = ContributorId::from_email("alice@example.com");
        assert!(activity.contributors.contains_key(&id));
        assert!(activity.files["src/lib.rs"].contains(&id));
        assert_eq!(activity.contributors[&id].additions, 0);
        assert!(activity.validate().is_ok());
    }

    #[test]
    fn contributor_keys_differing_only_in_case_are_rejected() {
        let json = r#"{
            "repositoryId": "acme/web",
            "contributors": {
                "bob@x.com": {
                    "identity": "bob@x.com", "displayName": "Bob", "email": "bob@x.com",
                    "commitCount": 40, "lastCommitTimestamp": "2024-05-01T12:00:00Z"
                },
                "Bob@X.com": {
                    "identity": "bob@x.com", "displayName": "Bob", "email": "Bob@X.com",
                    "commitCount": 2, "lastCommitTimestamp": "2024-05-02T12:00:00Z"
                },
                "alice@x.com": {
                    "identity": "alice@x.com", "displayName": "Alice", "email": "alice@x.com",
                    "commitCount": 10, "lastCommitTimestamp": "2024-05-03T12:00:00Z"
                }
            }
        }"#;
        let err = RepositoryActivity::from_json(json).unwrap_err();
        assert!(matches!(err, LoreError::MalformedActivity(_)));
        assert!(err.to_string().contains("Bob@X.com"));

        // the derived Deserialize goes through the same check
        assert!(serde_json::from_str::<RepositoryActivity>(json).is_err());
    }

    #[test]
    fn file_listing_a_contributor_twice_is_rejected() {
        let json = r#"{
            "repositoryId": "acme/web",
            "contributors": {
                "alice@x.com": {
                    "identity": "alice@x.com", "displayName": "Alice", "email": "alice@x.com",
                    "commitCount": 1, "lastCommitTimestamp": "2024-05-03T12:00:00Z"
                }
            },
            "files": { "src/lib.rs": ["alice@x.com", "ALICE@x.com"] }
        }"#;
        let err = RepositoryActivity::from_json(json).unwrap_err();
        assert!(matches!(err, LoreError::MalformedActivity(_)));
        assert!(err.to_string().contains("src/lib.rs"));
    }

    #[test]
    fn validate_rejects_identity_differing_from_key() {
        let mut activity = RepositoryActivity::new("acme/web");
        activity.record_commit(commit("alice", "alice@e.com", 1000, &[]));
        activity
            .contributors
            .values_mut()
            .for_each(|s| s.identity = ContributorId::from_email("bob@e.com"));

        let err = activity.validate().unwrap_err();
        assert!(matches!(err, LoreError::MalformedActivity(_)));
        assert!(err.to_string().contains("bob@e.com"));
    }

    #[test]
    fn from_file_reports_missing_path() {
        let err = RepositoryActivity::from_file(Path::new("/nonexistent/activity.json"))
            .unwrap_err();
        assert!(matches!(err, LoreError::FileNotFound(_)));
    }

    #[test]
    fn fingerprint_changes_with_new_commit() {
        let mut activity = RepositoryActivity::new("acme/web");
        activity.record_commit(commit("alice", "alice@e.com", 1000, &["a.rs"]));
        let before = activity.fingerprint();
        activity.record_commit(commit("bob", "bob@e.com", 2000, &["a.rs"]));
        let after = activity.fingerprint();

        assert_ne!(before, after);
        assert_eq!(after.as_str().len(), 64);
        assert_eq!(after, activity.clone().fingerprint());
    }
}
