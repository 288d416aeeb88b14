//! Specialization detection from commit messages and touched paths.
//!
//! A single declarative table maps keywords and path globs to labels.
//! Commits are scanned oldest to newest; a label is recorded the first
//! time any of its patterns match and never repeated.

use std::collections::HashSet;

use glob::{MatchOptions, Pattern};
use lore_core::{CommitRecord, LoreError, SpecializationRule};

use crate::keywords::KeywordSet;

const PATH_MATCH: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// The built-in specialization table, in evaluation order.
///
/// # Examples
///
/// ```
/// use lore_expertise::specialization::default_rules;
///
/// let rules = default_rules();
/// assert_eq!(rules[0].label, "Authentication");
/// assert!(rules.iter().any(|r| r.label == "Frontend"));
/// ```
pub fn default_rules() -> Vec<SpecializationRule> {
    fn rule(label: &str, keywords: &[&str], dirs: &[&str], globs: &[&str]) -> SpecializationRule {
        // a directory segment matches at the root or below any parent
        let paths = dirs
            .iter()
            .flat_map(|d| [format!("{d}/*"), format!("*/{d}/*")])
            .chain(globs.iter().map(|g| (*g).to_string()))
            .collect();
        SpecializationRule {
            label: label.into(),
            keywords: keywords.iter().map(|k| (*k).to_string()).collect(),
            paths,
        }
    }

    vec![
        rule(
            "Authentication",
            &["auth", "oauth", "login", "logout", "session", "password", "jwt", "sso"],
            &["auth"],
            &["*auth.*", "*login*"],
        ),
        rule(
            "Frontend",
            &["frontend", "css", "styling", "component", "layout", "responsive", "react"],
            &["ui", "components"],
            &["*.tsx", "*.jsx", "*.vue", "*.svelte", "*.css", "*.scss", "*.html"],
        ),
        rule(
            "Backend",
            &["backend", "api", "endpoint", "server", "handler", "middleware"],
            &["api", "server", "handlers", "routes"],
            &[],
        ),
        rule(
            "Database",
            &["database", "db", "migration", "schema", "sql", "query"],
            &["migrations", "db"],
            &["*.sql", "*schema*"],
        ),
        rule(
            "Testing",
            &["test", "coverage", "e2e", "fixture", "mock"],
            &["tests", "test", "__tests__"],
            &["*_test.*", "*.test.*", "*.spec.*"],
        ),
        rule(
            "DevOps",
            &["deploy", "docker", "pipeline", "release", "infra", "kubernetes", "helm", "terraform"],
            &[".github", "k8s", "helm"],
            &["*Dockerfile*", "*docker-compose*", "*.tf", "*.gitlab-ci.yml", "*Jenkinsfile"],
        ),
        rule(
            "Documentation",
            &["docs", "readme", "documentation", "changelog", "typo"],
            &["docs"],
            &["*.md", "*.rst"],
        ),
        rule(
            "Performance",
            &["perf", "optimi", "cache", "caching", "latency", "speedup", "benchmark"],
            &["benches"],
            &["*bench*"],
        ),
        rule(
            "Security",
            &["security", "secure", "vulnerab", "cve", "xss", "csrf", "sanitiz", "encrypt"],
            &["security", "crypto"],
            &[],
        ),
        rule(
            "Bug Fixing",
            &["fix", "bug", "hotfix", "regression", "crash"],
            &[],
            &[],
        ),
    ]
}

#[derive(Debug, Clone)]
struct CompiledRule {
    label: String,
    keywords: KeywordSet,
    paths: Vec<Pattern>,
}

impl CompiledRule {
    fn matches(&self, lowered_message: &str, paths: &[&str]) -> bool {
        if self.keywords.matches_lowered(lowered_message) {
            return true;
        }
        paths.iter().any(|path| {
            self.paths
                .iter()
                .any(|pattern| pattern.matches_with(path, PATH_MATCH))
        })
    }
}

/// Compiled specialization table.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use lore_core::{AuthorIdentity, CommitRecord};
/// use lore_expertise::specialization::SpecializationTable;
///
/// let table = SpecializationTable::builtin();
/// let commit = CommitRecord::new(
///     AuthorIdentity::new("alice", "alice@example.com"),
///     "Add auth middleware",
///     Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
///     ["web/src/components/Login.tsx"],
/// );
/// let labels = table.detect([&commit]);
/// assert_eq!(labels, vec!["Authentication", "Frontend", "Backend"]);
/// ```
#[derive(Debug, Clone)]
pub struct SpecializationTable {
    rules: Vec<CompiledRule>,
}

impl Default for SpecializationTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl SpecializationTable {
    /// The built-in table from [`default_rules`].
    pub fn builtin() -> Self {
        match Self::from_rules(&default_rules()) {
            Ok(table) => table,
            Err(e) => unreachable!("built-in specialization table is invalid: {e}"),
        }
    }

    /// Compile a caller-supplied table that supersedes the built-in one.
    ///
    /// # Errors
    ///
    /// Returns [`LoreError::Config`] when the table is empty, a label is
    /// blank or repeated, a rule has neither keywords nor paths, a keyword
    /// is blank, or a path is not a valid glob.
    pub fn from_rules(rules: &[SpecializationRule]) -> Result<Self, LoreError> {
        if rules.is_empty() {
            return Err(LoreError::Config(
                "specialization table must contain at least one rule".into(),
            ));
        }

        let mut seen = HashSet::new();
        let mut compiled = Vec::with_capacity(rules.len());

        for rule in rules {
            let label = rule.label.trim();
            if label.is_empty() {
                return Err(LoreError::Config(
                    "specialization label must not be blank".into(),
                ));
            }
            if !seen.insert(label.to_string()) {
                return Err(LoreError::Config(format!(
                    "duplicate specialization label `{label}`"
                )));
            }
            if rule.keywords.is_empty() && rule.paths.is_empty() {
                return Err(LoreError::Config(format!(
                    "specialization `{label}` has no keywords or paths"
                )));
            }

            let keywords = KeywordSet::new(&rule.keywords)
                .map_err(|e| LoreError::Config(format!("specialization `{label}`: {e}")))?;
            let mut paths = Vec::with_capacity(rule.paths.len());
            for pat in &rule.paths {
                let pattern = Pattern::new(pat).map_err(|e| {
                    LoreError::Config(format!(
                        "specialization `{label}`: invalid path pattern `{pat}`: {e}"
                    ))
                })?;
                paths.push(pattern);
            }

            compiled.push(CompiledRule {
                label: label.to_string(),
                keywords,
                paths,
            });
        }

        Ok(Self { rules: compiled })
    }

    /// Labels in evaluation order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.label.as_str())
    }

    /// Detect specializations across one contributor's commits.
    ///
    /// Commits are visited oldest first (input order breaks timestamp
    /// ties); within a commit, labels follow table order. No match yields
    /// an empty list.
    pub fn detect<'a, I>(&self, commits: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a CommitRecord>,
    {
        let mut ordered: Vec<&CommitRecord> = commits.into_iter().collect();
        ordered.sort_by_key(|c| c.timestamp);

        let mut labels: Vec<String> = Vec::new();
        for commit in ordered {
            if labels.len() == self.rules.len() {
                break;
            }
            let message = commit.message.to_lowercase();
            let paths: Vec<&str> = commit.changed_paths.iter().map(String::as_str).collect();

            for rule in &self.rules {
                if labels.iter().any(|l| *l == rule.label) {
                    continue;
                }
                if rule.matches(&message, &paths) {
                    labels.push(rule.label.clone());
                }
            }
        }
        labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use lore_core::AuthorIdentity;

    fn commit(secs: i64, message: &str, paths: &[&str]) -> CommitRecord {
        CommitRecord::new(
            AuthorIdentity::new("alice", "alice@example.com"),
            message,
            Utc.timestamp_opt(secs, 0).unwrap(),
            paths.iter().copied(),
        )
    }

    #[test]
    fn builtin_table_compiles_every_rule() {
        let table = SpecializationTable::builtin();
        let labels: Vec<&str> = table.labels().collect();
        assert_eq!(
            labels,
            vec![
                "Authentication",
                "Frontend",
                "Backend",
                "Database",
                "Testing",
                "DevOps",
                "Documentation",
                "Performance",
                "Security",
                "Bug Fixing",
            ]
        );
        assert!(SpecializationTable::from_rules(&default_rules()).is_ok());
    }

    #[test]
    fn message_keyword_detects_authentication() {
        let table = SpecializationTable::builtin();
        let commits = [commit(1, "Harden session expiry", &[])];
        assert_eq!(table.detect(&commits), vec!["Authentication"]);
    }

    #[test]
    fn path_patterns_detect_frontend() {
        let table = SpecializationTable::builtin();
        for path in [
            "web/App.tsx",
            "src/widgets/Button.JSX",
            "src/ui/theme.rs",
            "app/components/nav/menu.ts",
        ] {
            let commits = [commit(1, "update", &[path])];
            assert_eq!(table.detect(&commits), vec!["Frontend"], "path {path}");
        }
    }

    #[test]
    fn labels_follow_chronological_first_occurrence() {
        let table = SpecializationTable::builtin();
        // supplied newest first; detection must still scan oldest first
        let commits = [
            commit(300, "Add login form", &[]),
            commit(200, "Write migration for users", &[]),
            commit(100, "Update docs", &["docs/guide.md"]),
        ];
        assert_eq!(
            table.detect(&commits),
            vec!["Documentation", "Database", "Authentication"]
        );
    }

    #[test]
    fn labels_are_deduplicated() {
        let table = SpecializationTable::builtin();
        let commits = [
            commit(1, "fix crash", &[]),
            commit(2, "another bug fix", &[]),
        ];
        assert_eq!(table.detect(&commits), vec!["Bug Fixing"]);
    }

    #[test]
    fn no_match_is_empty() {
        let table = SpecializationTable::builtin();
        let commits = [commit(1, "chore: bump version", &["Cargo.lock"])];
        assert!(table.detect(&commits).is_empty());
        assert!(table.detect(&[]).is_empty());
    }

    #[test]
    fn word_start_matching_avoids_false_positives() {
        let table = SpecializationTable::builtin();
        let commits = [commit(1, "pull latest upstream", &[])];
        assert!(table.detect(&commits).is_empty());
    }

    #[test]
    fn custom_table_supersedes_builtin() {
        let rules = vec![SpecializationRule {
            label: "Payments".into(),
            keywords: vec!["stripe".into()],
            paths: vec!["*/billing/*".into()],
        }];
        let table = SpecializationTable::from_rules(&rules).unwrap();
        let commits = [
            commit(1, "fix auth bug", &[]),
            commit(2, "refactor", &["src/billing/invoice.rs"]),
        ];
        assert_eq!(table.detect(&commits), vec!["Payments"]);
    }

    #[test]
    fn invalid_tables_are_configuration_errors() {
        let bad_glob = vec![SpecializationRule {
            label: "X".into(),
            keywords: vec![],
            paths: vec!["a/***/b".into()],
        }];
        let no_patterns = vec![SpecializationRule {
            label: "Empty".into(),
            keywords: vec![],
            paths: vec![],
        }];
        let duplicate = vec![
            SpecializationRule {
                label: "A".into(),
                keywords: vec!["a".into()],
                paths: vec![],
            },
            SpecializationRule {
                label: "A".into(),
                keywords: vec!["b".into()],
                paths: vec![],
            },
        ];
        let blank_label = vec![SpecializationRule {
            label: "  ".into(),
            keywords: vec!["a".into()],
            paths: vec![],
        }];

        for rules in [bad_glob, no_patterns, duplicate, blank_label, vec![]] {
            assert!(matches!(
                SpecializationTable::from_rules(&rules),
                Err(LoreError::Config(_))
            ));
        }
    }
}
