use super::Repository;
use crate::error::{ErrorKind, Result};
use crate::models::{Entity, Translation, TranslationId, TranslationRow, WordId};
use tracing::instrument;

impl Repository {
    /// Get the translation of `word_id` with the given text, creating it if
    /// it doesn't exist.
    ///
    /// Fails with [`ErrorKind::NotFound`] for the word if `word_id` does not
    /// exist. Concurrent calls with the same arguments converge on one row.
    #[instrument(skip(self))]
    pub async fn get_or_create_translation(&self, word_id: WordId, text: &str) -> Result<Translation> {
        self.guard(async {
            let word_key = word_id.key().ok_or_else(|| word_id.not_found())?;
            let mut tx = self.begin().await?;
            let inserted = sqlx::query(include_str!("../../queries/insert_translation.sql"))
                .bind(word_key)
                .bind(text)
                .execute(&mut *tx)
                .await
                .map_err(|e| ErrorKind::missing_parent(Entity::Translation, Entity::Word, word_id.get(), e))?;
            if inserted.rows_affected() == 0 {
                tracing::debug!("translation already exists");
            }
            let row: TranslationRow = sqlx::query_as(include_str!("../../queries/get_translation_by_key.sql"))
                .bind(word_key)
                .bind(text)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| ErrorKind::database(Entity::Translation, e))?;
            tx.commit().await?;
            Translation::try_from(row)
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn get_translation(&self, id: TranslationId) -> Result<Translation> {
        self.guard(async {
            let key = id.key().ok_or_else(|| id.not_found())?;
            let mut conn = self.acquire().await?;
            let row: Option<TranslationRow> = sqlx::query_as(include_str!("../../queries/get_translation_by_id.sql"))
                .bind(key)
                .fetch_optional(&mut *conn)
                .await
                .map_err(|e| ErrorKind::database(Entity::Translation, e))?;
            row.ok_or_else(|| id.not_found())?.try_into()
        })
        .await
    }

    /// List the translations of a word, oldest first.
    ///
    /// An unknown word simply has no translations.
    #[instrument(skip(self))]
    pub async fn list_translations(&self, word_id: WordId) -> Result<Vec<Translation>> {
        self.guard(async {
            let Some(word_key) = word_id.key() else {
                return Ok(Vec::new());
            };
            let mut conn = self.acquire().await?;
            let rows: Vec<TranslationRow> = sqlx::query_as(include_str!("../../queries/list_translations.sql"))
                .bind(word_key)
                .fetch_all(&mut *conn)
                .await
                .map_err(|e| ErrorKind::database(Entity::Translation, e))?;
            rows.into_iter().map(Translation::try_from).collect()
        })
        .await
    }

    /// Replace a translation's text.
    ///
    /// Fails with [`ErrorKind::Conflict`] if a sibling translation (same word)
    /// already has that text; the translation is left unchanged.
    #[instrument(skip(self))]
    pub async fn update_translation(&self, id: TranslationId, text: &str) -> Result<Translation> {
        self.guard(async {
            let key = id.key().ok_or_else(|| id.not_found())?;
            let mut conn = self.acquire().await?;
            let row: Option<TranslationRow> = sqlx::query_as(include_str!("../../queries/update_translation.sql"))
                .bind(text)
                .bind(key)
                .fetch_optional(&mut *conn)
                .await
                .map_err(|e| ErrorKind::database(Entity::Translation, e))?;
            row.ok_or_else(|| id.not_found())?.try_into()
        })
        .await
    }

    /// Delete a translation together with its example sentences, atomically.
    #[instrument(skip(self))]
    pub async fn delete_translation(&self, id: TranslationId) -> Result<()> {
        self.guard(async {
            let key = id.key().ok_or_else(|| id.not_found())?;
            let mut tx = self.begin().await?;
            let sentences = sqlx::query(include_str!("../../queries/delete_sentences_for_translation.sql"))
                .bind(key)
                .execute(&mut *tx)
                .await
                .map_err(|e| ErrorKind::database(Entity::ExampleSentence, e))?
                .rows_affected();
            let deleted = sqlx::query(include_str!("../../queries/delete_translation.sql"))
                .bind(key)
                .execute(&mut *tx)
                .await
                .map_err(|e| ErrorKind::database(Entity::Translation, e))?
                .rows_affected();
            if deleted == 0 {
                return Err(id.not_found());
            }
            tx.commit().await?;
            tracing::debug!(sentences, "deleted translation");
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ErrorKind;
    use crate::models::{Entity, TranslationId, WordId};
    use crate::{Database, Repository};

    async fn setup() -> (Database, Repository) {
        let db = Database::connect_in_memory().await.unwrap();
        let repo = Repository::from(&db);
        (db, repo)
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let (db, repo) = setup().await;
        let word = repo.get_or_create_word("kot").await.unwrap();
        let first = repo.get_or_create_translation(word.id, "cat").await.unwrap();
        let second = repo.get_or_create_translation(word.id, "cat").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.word_id, word.id);
        db.close().await;
    }

    #[tokio::test]
    async fn test_same_text_under_different_words() {
        let (db, repo) = setup().await;
        let zamek = repo.get_or_create_word("zamek").await.unwrap();
        let klodka = repo.get_or_create_word("kłódka").await.unwrap();
        let a = repo.get_or_create_translation(zamek.id, "lock").await.unwrap();
        let b = repo.get_or_create_translation(klodka.id, "lock").await.unwrap();
        assert_ne!(a.id, b.id);
        db.close().await;
    }

    #[tokio::test]
    async fn test_missing_parent_word() {
        let (db, repo) = setup().await;
        let err = repo.get_or_create_translation(WordId::new(77), "ghost").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(Entity::Word, 77)));
        db.close().await;
    }

    #[tokio::test]
    async fn test_list_translations() {
        let (db, repo) = setup().await;
        let word = repo.get_or_create_word("zamek").await.unwrap();
        assert!(repo.list_translations(word.id).await.unwrap().is_empty());
        let castle = repo.get_or_create_translation(word.id, "castle").await.unwrap();
        let lock = repo.get_or_create_translation(word.id, "lock").await.unwrap();
        assert_eq!(repo.list_translations(word.id).await.unwrap(), vec![castle, lock]);
        assert!(repo.list_translations(WordId::new(999)).await.unwrap().is_empty());
        db.close().await;
    }

    #[tokio::test]
    async fn test_update_translation_conflict_leaves_rows_unchanged() {
        let (db, repo) = setup().await;
        let word = repo.get_or_create_word("zamek").await.unwrap();
        let castle = repo.get_or_create_translation(word.id, "castle").await.unwrap();
        let lock = repo.get_or_create_translation(word.id, "lock").await.unwrap();

        let err = repo.update_translation(castle.id, "lock").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Conflict(Entity::Translation)));
        assert_eq!(repo.get_translation(castle.id).await.unwrap().text, "castle");
        assert_eq!(repo.get_translation(lock.id).await.unwrap().text, "lock");

        let updated = repo.update_translation(castle.id, "fortress").await.unwrap();
        assert_eq!(updated.text, "fortress");
        assert_eq!(updated.word_id, word.id);
        db.close().await;
    }

    #[tokio::test]
    async fn test_missing_translation_is_not_found() {
        let (db, repo) = setup().await;
        let missing = TranslationId::new(5);
        assert!(matches!(
            &*repo.get_translation(missing).await.unwrap_err(),
            ErrorKind::NotFound(Entity::Translation, 5)
        ));
        assert!(matches!(
            &*repo.update_translation(missing, "x").await.unwrap_err(),
            ErrorKind::NotFound(Entity::Translation, 5)
        ));
        assert!(matches!(
            &*repo.delete_translation(missing).await.unwrap_err(),
            ErrorKind::NotFound(Entity::Translation, 5)
        ));
        db.close().await;
    }

    #[tokio::test]
    async fn test_delete_translation_only_removes_its_own_sentences() {
        let (db, repo) = setup().await;
        let word = repo.get_or_create_word("zamek").await.unwrap();
        let castle = repo.get_or_create_translation(word.id, "castle").await.unwrap();
        let lock = repo.get_or_create_translation(word.id, "lock").await.unwrap();
        let doomed = repo.get_or_create_example_sentence(castle.id, "The castle is old.").await.unwrap();
        let kept = repo.get_or_create_example_sentence(lock.id, "The lock is broken.").await.unwrap();

        repo.delete_translation(castle.id).await.unwrap();

        assert!(matches!(
            &*repo.get_example_sentence(doomed.id).await.unwrap_err(),
            ErrorKind::NotFound(Entity::ExampleSentence, _)
        ));
        assert_eq!(repo.list_translations(word.id).await.unwrap(), vec![lock.clone()]);
        assert_eq!(repo.list_example_sentences(lock.id).await.unwrap(), vec![kept]);
        assert_eq!(repo.get_word(word.id).await.unwrap(), word);
        db.close().await;
    }

    #[tokio::test]
    async fn test_delete_translation_without_sentences() {
        let (db, repo) = setup().await;
        let word = repo.get_or_create_word("kot").await.unwrap();
        let cat = repo.get_or_create_translation(word.id, "cat").await.unwrap();
        repo.delete_translation(cat.id).await.unwrap();
        assert!(repo.list_translations(word.id).await.unwrap().is_empty());
        db.close().await;
    }
}
