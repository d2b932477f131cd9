use super::Repository;
use crate::error::{ErrorKind, Result};
use crate::models::{Entity, ExampleSentence, SentenceId, SentenceRow, TranslationId};
use tracing::instrument;

impl Repository {
    /// Get the example sentence of `translation_id` with the given text,
    /// creating it if it doesn't exist.
    ///
    /// Fails with [`ErrorKind::NotFound`] for the translation if
    /// `translation_id` does not exist.
    #[instrument(skip(self))]
    pub async fn get_or_create_example_sentence(
        &self,
        translation_id: TranslationId,
        text: &str,
    ) -> Result<ExampleSentence> {
        self.guard(async {
            let translation_key = translation_id.key().ok_or_else(|| translation_id.not_found())?;
            let mut tx = self.begin().await?;
            let inserted = sqlx::query(include_str!("../../queries/insert_sentence.sql"))
                .bind(translation_key)
                .bind(text)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    ErrorKind::missing_parent(Entity::ExampleSentence, Entity::Translation, translation_id.get(), e)
                })?;
            if inserted.rows_affected() == 0 {
                tracing::debug!("example sentence already exists");
            }
            let row: SentenceRow = sqlx::query_as(include_str!("../../queries/get_sentence_by_key.sql"))
                .bind(translation_key)
                .bind(text)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| ErrorKind::database(Entity::ExampleSentence, e))?;
            tx.commit().await?;
            ExampleSentence::try_from(row)
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn get_example_sentence(&self, id: SentenceId) -> Result<ExampleSentence> {
        self.guard(async {
            let key = id.key().ok_or_else(|| id.not_found())?;
            let mut conn = self.acquire().await?;
            let row: Option<SentenceRow> = sqlx::query_as(include_str!("../../queries/get_sentence_by_id.sql"))
                .bind(key)
                .fetch_optional(&mut *conn)
                .await
                .map_err(|e| ErrorKind::database(Entity::ExampleSentence, e))?;
            row.ok_or_else(|| id.not_found())?.try_into()
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn list_example_sentences(&self, translation_id: TranslationId) -> Result<Vec<ExampleSentence>> {
        self.guard(async {
            let Some(translation_key) = translation_id.key() else {
                return Ok(Vec::new());
            };
            let mut conn = self.acquire().await?;
            let rows: Vec<SentenceRow> = sqlx::query_as(include_str!("../../queries/list_sentences.sql"))
                .bind(translation_key)
                .fetch_all(&mut *conn)
                .await
                .map_err(|e| ErrorKind::database(Entity::ExampleSentence, e))?;
            rows.into_iter().map(ExampleSentence::try_from).collect()
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn update_example_sentence(&self, id: SentenceId, text: &str) -> Result<ExampleSentence> {
        self.guard(async {
            let key = id.key().ok_or_else(|| id.not_found())?;
            let mut conn = self.acquire().await?;
            let row: Option<SentenceRow> = sqlx::query_as(include_str!("../../queries/update_sentence.sql"))
                .bind(text)
                .bind(key)
                .fetch_optional(&mut *conn)
                .await
                .map_err(|e| ErrorKind::database(Entity::ExampleSentence, e))?;
            row.ok_or_else(|| id.not_found())?.try_into()
        })
        .await
    }

    /// Delete a single example sentence. Nothing else references it.
    #[instrument(skip(self))]
    pub async fn delete_example_sentence(&self, id: SentenceId) -> Result<()> {
        self.guard(async {
            let key = id.key().ok_or_else(|| id.not_found())?;
            let mut conn = self.acquire().await?;
            let deleted = sqlx::query(include_str!("../../queries/delete_sentence.sql"))
                .bind(key)
                .execute(&mut *conn)
                .await
                .map_err(|e| ErrorKind::database(Entity::ExampleSentence, e))?
                .rows_affected();
            if deleted == 0 {
                return Err(id.not_found());
            }
            Ok(())
        })
        .await
    }
}
