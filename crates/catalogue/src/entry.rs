use lexi_store::models::{ExampleSentence, Translation, Word};
use serde::{Deserialize, Serialize};

/// A translation together with its example sentences, oldest first.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct TranslationEntry {
    #[serde(flatten)]
    pub translation: Translation,
    pub sentences: Vec<ExampleSentence>,
}

/// A word with its whole subtree: every translation and every example sentence.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct WordEntry {
    #[serde(flatten)]
    pub word: Word,
    pub translations: Vec<TranslationEntry>,
}

impl WordEntry {
    /// Number of example sentences across all translations.
    pub fn sentence_count(&self) -> usize {
        self.translations.iter().map(|t| t.sentences.len()).sum()
    }
}
