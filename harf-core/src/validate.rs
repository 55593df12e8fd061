use async_trait::async_trait;
use harf_types::Category;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;

/// Normalize a submitted word for validation and scoring: trim, strip
/// one leading definite article, lowercase. All lookups and shared-word
/// grouping use this form, never the raw input.
pub fn normalize(word: &str) -> String {
    let trimmed = word.trim();
    let stripped = trimmed.strip_prefix("ال").unwrap_or(trimmed);
    stripped.to_lowercase()
}

/// Read-only local word list, shared across all rooms.
pub struct Dictionary {
    entries: HashSet<(String, Category)>,
}

impl Dictionary {
    /// Parse a word list in `word,category` line format. Blank lines
    /// and `#` comments are skipped, as are lines with an unknown
    /// category. Words are stored normalized.
    pub fn parse(contents: &str) -> Self {
        let entries = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| {
                let (word, category) = line.split_once(',')?;
                let category = Category::parse(category.trim())?;
                Some((normalize(word), category))
            })
            .filter(|(word, _)| !word.is_empty())
            .collect();

        Self { entries }
    }

    pub fn with_entries(entries: impl IntoIterator<Item = (String, Category)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(word, category)| (normalize(&word), category))
                .collect(),
        }
    }

    /// Exact membership test for a normalized (word, category) pair.
    pub fn contains(&self, normalized_word: &str, category: Category) -> bool {
        self.entries
            .contains(&(normalized_word.to_string(), category))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// External best-effort "does this word exist" lookup. Implementations
/// must be network-failure tolerant; the validator degrades any error
/// to a negative answer.
#[async_trait]
pub trait WordOracle: Send + Sync {
    async fn word_exists(&self, word: &str) -> anyhow::Result<bool>;
}

/// Where a verdict came from, kept for attribution at scoring time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerdictSource {
    /// Failed normalization or letter constraint; no lookup ran.
    Rejected,
    Dictionary,
    Oracle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub is_valid: bool,
    pub source: VerdictSource,
}

pub struct AnswerValidator {
    dictionary: Arc<Dictionary>,
    oracle: Arc<dyn WordOracle>,
}

impl AnswerValidator {
    pub fn new(dictionary: Arc<Dictionary>, oracle: Arc<dyn WordOracle>) -> Self {
        Self { dictionary, oracle }
    }

    /// Decide valid/invalid for one submitted word. The letter check is
    /// defensive; clients are expected to enforce it too. Lookup order:
    /// local dictionary for (word, category), then the oracle for the
    /// bare word. Oracle failure degrades to invalid rather than
    /// blocking the submission.
    pub async fn validate(&self, word: &str, category: Category, letter: char) -> Verdict {
        let cleaned = normalize(word);

        if cleaned.is_empty() || !cleaned.starts_with(letter) {
            return Verdict {
                is_valid: false,
                source: VerdictSource::Rejected,
            };
        }

        if self.dictionary.contains(&cleaned, category) {
            return Verdict {
                is_valid: true,
                source: VerdictSource::Dictionary,
            };
        }

        let exists = match self.oracle.word_exists(&cleaned).await {
            Ok(exists) => exists,
            Err(err) => {
                warn!("word oracle lookup failed for {:?}: {}", cleaned, err);
                false
            }
        };

        Verdict {
            is_valid: exists,
            source: VerdictSource::Oracle,
        }
    }
}
