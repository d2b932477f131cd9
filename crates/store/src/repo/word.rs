use super::Repository;
use crate::error::{ErrorKind, Result};
use crate::models::{Entity, Word, WordId, WordRow};
use tracing::instrument;

impl Repository {
    /// Get the word with the given text, creating it if it doesn't exist.
    ///
    /// Safe to call concurrently with the same text: exactly one row is ever
    /// created and every caller gets that row back.
    #[instrument(skip(self))]
    pub async fn get_or_create_word(&self, text: &str) -> Result<Word> {
        self.guard(async {
            let mut tx = self.begin().await?;
            let inserted = sqlx::query(include_str!("../../queries/insert_word.sql"))
                .bind(text)
                .execute(&mut *tx)
                .await
                .map_err(|e| ErrorKind::database(Entity::Word, e))?;
            if inserted.rows_affected() == 0 {
                tracing::debug!("word already exists");
            }
            let row: WordRow = sqlx::query_as(include_str!("../../queries/get_word_by_text.sql"))
                .bind(text)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| ErrorKind::database(Entity::Word, e))?;
            tx.commit().await?;
            Word::try_from(row)
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn get_word(&self, id: WordId) -> Result<Word> {
        self.guard(async {
            let key = id.key().ok_or_else(|| id.not_found())?;
            let mut conn = self.acquire().await?;
            let row: Option<WordRow> = sqlx::query_as(include_str!("../../queries/get_word_by_id.sql"))
                .bind(key)
                .fetch_optional(&mut *conn)
                .await
                .map_err(|e| ErrorKind::database(Entity::Word, e))?;
            row.ok_or_else(|| id.not_found())?.try_into()
        })
        .await
    }

    /// Look a word up by its exact text.
    #[instrument(skip(self))]
    pub async fn get_word_by_text(&self, text: &str) -> Result<Option<Word>> {
        self.guard(async {
            let mut conn = self.acquire().await?;
            let row: Option<WordRow> = sqlx::query_as(include_str!("../../queries/get_word_by_text.sql"))
                .bind(text)
                .fetch_optional(&mut *conn)
                .await
                .map_err(|e| ErrorKind::database(Entity::Word, e))?;
            row.map(Word::try_from).transpose()
        })
        .await
    }

    /// List every word, oldest first.
    pub async fn list_words(&self) -> Result<Vec<Word>> {
        self.guard(async {
            let mut conn = self.acquire().await?;
            let rows: Vec<WordRow> = sqlx::query_as(include_str!("../../queries/list_words.sql"))
                .fetch_all(&mut *conn)
                .await
                .map_err(|e| ErrorKind::database(Entity::Word, e))?;
            rows.into_iter().map(Word::try_from).collect()
        })
        .await
    }

    /// Replace a word's text.
    ///
    /// Fails with [`ErrorKind::Conflict`] if another word already has that
    /// text; the word is left unchanged.
    #[instrument(skip(self))]
    pub async fn update_word(&self, id: WordId, text: &str) -> Result<Word> {
        self.guard(async {
            let key = id.key().ok_or_else(|| id.not_found())?;
            let mut conn = self.acquire().await?;
            let row: Option<WordRow> = sqlx::query_as(include_str!("../../queries/update_word.sql"))
                .bind(text)
                .bind(key)
                .fetch_optional(&mut *conn)
                .await
                .map_err(|e| ErrorKind::database(Entity::Word, e))?;
            row.ok_or_else(|| id.not_found())?.try_into()
        })
        .await
    }

    /// Delete a word together with all of its translations and their example
    /// sentences, atomically.
    #[instrument(skip(self))]
    pub async fn delete_word(&self, id: WordId) -> Result<()> {
        self.guard(async {
            let key = id.key().ok_or_else(|| id.not_found())?;
            let mut tx = self.begin().await?;
            let sentences = sqlx::query(include_str!("../../queries/delete_sentences_for_word.sql"))
                .bind(key)
                .execute(&mut *tx)
                .await
                .map_err(|e| ErrorKind::database(Entity::ExampleSentence, e))?
                .rows_affected();
            let translations = sqlx::query(include_str!("../../queries/delete_translations_for_word.sql"))
                .bind(key)
                .execute(&mut *tx)
                .await
                .map_err(|e| ErrorKind::database(Entity::Translation, e))?
                .rows_affected();
            let deleted = sqlx::query(include_str!("../../queries/delete_word.sql"))
                .bind(key)
                .execute(&mut *tx)
                .await
                .map_err(|e| ErrorKind::database(Entity::Word, e))?
                .rows_affected();
            if deleted == 0 {
                // Dropping the uncommitted transaction rolls it back.
                return Err(id.not_found());
            }
            tx.commit().await?;
            tracing::debug!(translations, sentences, "deleted word");
            Ok(())
        })
        .await
    }
}
