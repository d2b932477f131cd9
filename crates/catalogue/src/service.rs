use crate::entry::{TranslationEntry, WordEntry};
use crate::error::{ErrorKind, Result};
use crate::validate::validate;
use lexi_store::Repository;
use lexi_store::error::Result as StoreResult;
use lexi_store::models::{ExampleSentence, SentenceId, Translation, TranslationId, Word, WordId};
use tracing::instrument;

const WORD: &str = "word";
const TRANSLATION: &str = "translation";
const SENTENCE: &str = "example sentence";

/// Validated access to the catalogue.
///
/// All free text is sanitized and validated before anything touches the
/// store, so a rejected request never writes. Compound writes run in a single
/// transaction on the wrapped [`Repository`]; bind cancellation or a deadline
/// to that repository before handing it over.
#[derive(Clone, Debug)]
pub struct Catalogue {
    repo: Repository,
}

impl From<Repository> for Catalogue {
    fn from(repo: Repository) -> Self {
        Self::new(repo)
    }
}

impl Catalogue {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    // =========================================================================
    // Words
    // =========================================================================

    pub async fn create_word(&self, text: &str) -> Result<Word> {
        let text = validate(WORD, text)?;
        self.repo.get_or_create_word(&text).await.map_err(ErrorKind::store)
    }

    pub async fn rename_word(&self, id: WordId, text: &str) -> Result<Word> {
        let text = validate(WORD, text)?;
        self.repo.update_word(id, &text).await.map_err(ErrorKind::store)
    }

    /// Delete a word and everything beneath it.
    pub async fn delete_word(&self, id: WordId) -> Result<()> {
        self.repo.delete_word(id).await.map_err(ErrorKind::store)
    }

    pub async fn word(&self, id: WordId) -> Result<Word> {
        self.repo.get_word(id).await.map_err(ErrorKind::store)
    }

    /// Look a word up by text, sanitized the same way as on creation.
    pub async fn word_by_text(&self, text: &str) -> Result<Option<Word>> {
        let text = validate(WORD, text)?;
        self.repo.get_word_by_text(&text).await.map_err(ErrorKind::store)
    }

    pub async fn words(&self) -> Result<Vec<Word>> {
        self.repo.list_words().await.map_err(ErrorKind::store)
    }

    // =========================================================================
    // Translations
    // =========================================================================

    /// Add a translation (and optionally example sentences) to an existing word.
    ///
    /// Every piece is get-or-created, so repeating the call is harmless. The
    /// returned entry lists all of the translation's sentences, not just the
    /// ones passed in.
    #[instrument(skip(self, sentences))]
    pub async fn create_translation<S: AsRef<str>>(
        &self,
        word_id: WordId,
        text: &str,
        sentences: &[S],
    ) -> Result<TranslationEntry> {
        let text = validate(TRANSLATION, text)?;
        let sentences = validate_all(SENTENCE, sentences)?;
        self.repo
            .transaction(move |tx| async move {
                let translation = tx.get_or_create_translation(word_id, &text).await?;
                fill_translation(&tx, translation, &sentences).await
            })
            .await
            .map_err(ErrorKind::store)
    }

    /// Like [`create_translation`](Self::create_translation), but the word is
    /// identified by its text and created if needed, in the same transaction.
    #[instrument(skip(self, sentences))]
    pub async fn create_translation_with_word<S: AsRef<str>>(
        &self,
        word_text: &str,
        text: &str,
        sentences: &[S],
    ) -> Result<TranslationEntry> {
        let word_text = validate(WORD, word_text)?;
        let text = validate(TRANSLATION, text)?;
        let sentences = validate_all(SENTENCE, sentences)?;
        self.repo
            .transaction(move |tx| async move {
                let word = tx.get_or_create_word(&word_text).await?;
                let translation = tx.get_or_create_translation(word.id, &text).await?;
                fill_translation(&tx, translation, &sentences).await
            })
            .await
            .map_err(ErrorKind::store)
    }

    pub async fn update_translation(&self, id: TranslationId, text: &str) -> Result<Translation> {
        let text = validate(TRANSLATION, text)?;
        self.repo.update_translation(id, &text).await.map_err(ErrorKind::store)
    }

    pub async fn delete_translation(&self, id: TranslationId) -> Result<()> {
        self.repo.delete_translation(id).await.map_err(ErrorKind::store)
    }

    pub async fn translation(&self, id: TranslationId) -> Result<Translation> {
        self.repo.get_translation(id).await.map_err(ErrorKind::store)
    }

    pub async fn translations(&self, word_id: WordId) -> Result<Vec<Translation>> {
        self.repo.list_translations(word_id).await.map_err(ErrorKind::store)
    }

    // =========================================================================
    // Example sentences
    // =========================================================================

    pub async fn create_example_sentence(&self, translation_id: TranslationId, text: &str) -> Result<ExampleSentence> {
        let text = validate(SENTENCE, text)?;
        self.repo
            .get_or_create_example_sentence(translation_id, &text)
            .await
            .map_err(ErrorKind::store)
    }

    pub async fn update_example_sentence(&self, id: SentenceId, text: &str) -> Result<ExampleSentence> {
        let text = validate(SENTENCE, text)?;
        self.repo.update_example_sentence(id, &text).await.map_err(ErrorKind::store)
    }

    pub async fn delete_example_sentence(&self, id: SentenceId) -> Result<()> {
        self.repo.delete_example_sentence(id).await.map_err(ErrorKind::store)
    }

    pub async fn example_sentence(&self, id: SentenceId) -> Result<ExampleSentence> {
        self.repo.get_example_sentence(id).await.map_err(ErrorKind::store)
    }

    pub async fn example_sentences(&self, translation_id: TranslationId) -> Result<Vec<ExampleSentence>> {
        self.repo
            .list_example_sentences(translation_id)
            .await
            .map_err(ErrorKind::store)
    }

    // =========================================================================
    // Entries
    // =========================================================================

    /// Read a word with all of its translations and sentences as one
    /// consistent snapshot.
    #[instrument(skip(self))]
    pub async fn entry(&self, word_id: WordId) -> Result<WordEntry> {
        self.repo
            .transaction(move |tx| async move {
                let word = tx.get_word(word_id).await?;
                let mut translations = Vec::new();
                for translation in tx.list_translations(word.id).await? {
                    let sentences = tx.list_example_sentences(translation.id).await?;
                    translations.push(TranslationEntry { translation, sentences });
                }
                Ok(WordEntry { word, translations })
            })
            .await
            .map_err(ErrorKind::store)
    }
}

fn validate_all<S: AsRef<str>>(field: &'static str, inputs: &[S]) -> Result<Vec<String>> {
    inputs.iter().map(|input| validate(field, input.as_ref())).collect()
}

async fn fill_translation(
    tx: &Repository,
    translation: Translation,
    sentences: &[String],
) -> StoreResult<TranslationEntry> {
    for sentence in sentences {
        tx.get_or_create_example_sentence(translation.id, sentence).await?;
    }
    let sentences = tx.list_example_sentences(translation.id).await?;
    tracing::debug!(translation = %translation.id, sentences = sentences.len(), "translation ready");
    Ok(TranslationEntry { translation, sentences })
}
