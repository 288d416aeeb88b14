//! Case-insensitive keyword matching for commit messages.
//!
//! A keyword matches when it occurs at the start of a word: `review`
//! matches "Reviewed" and `auth` matches "Authentication" but not "OAuth";
//! likewise `test` does not match "latest".

use lore_core::{default_collaboration_keywords, HealthConfig, LoreError};

/// A set of lower-cased keywords matched at word starts.
///
/// # Examples
///
/// ```
/// use lore_expertise::keywords::KeywordSet;
///
/// let set = KeywordSet::new(["review", "merge"]).unwrap();
/// assert!(set.matches("Reviewed Alice's PR"));
/// assert!(set.matches("Merged feature"));
/// assert!(!set.matches("Fixed bug"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordSet {
    keywords: Vec<String>,
}

impl Default for KeywordSet {
    fn default() -> Self {
        Self::collaboration()
    }
}

impl KeywordSet {
    /// Build a keyword set, trimming and lower-casing each entry.
    ///
    /// # Errors
    ///
    /// Returns [`LoreError::Config`] if any keyword is blank.
    pub fn new<I, S>(keywords: I) -> Result<Self, LoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized = Vec::new();
        for keyword in keywords {
            let keyword = keyword.as_ref().trim().to_lowercase();
            if keyword.is_empty() {
                return Err(LoreError::Config("keywords must not be blank".into()));
            }
            if !normalized.contains(&keyword) {
                normalized.push(keyword);
            }
        }
        Ok(Self {
            keywords: normalized,
        })
    }

    /// The built-in collaboration keywords: `review`, `pair`, `merge`,
    /// `thanks`, `helped`, `co-authored`.
    pub fn collaboration() -> Self {
        Self {
            keywords: default_collaboration_keywords(),
        }
    }

    /// Collaboration keywords from the `[health]` configuration section.
    ///
    /// # Errors
    ///
    /// Returns [`LoreError::Config`] if the list is empty or a keyword is
    /// blank.
    pub fn from_config(config: &HealthConfig) -> Result<Self, LoreError> {
        if config.collaboration_keywords.is_empty() {
            return Err(LoreError::Config(
                "collaboration_keywords must contain at least one keyword".into(),
            ));
        }
        Self::new(&config.collaboration_keywords)
    }

    /// The normalized keywords, in insertion order.
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Whether the set holds no keywords.
    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    /// Whether any keyword starts a word in `text`.
    pub fn matches(&self, text: &str) -> bool {
        if self.keywords.is_empty() {
            return false;
        }
        let lowered = text.to_lowercase();
        self.matches_lowered(&lowered)
    }

    /// Like [`KeywordSet::matches`] for text that is already lower-cased.
    pub(crate) fn matches_lowered(&self, lowered: &str) -> bool {
        self.keywords
            .iter()
            .any(|keyword| starts_word(lowered, keyword))
    }
}

fn starts_word(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(idx, _)| {
        haystack[..idx]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric())
    })
}
