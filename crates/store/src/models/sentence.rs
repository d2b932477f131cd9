use super::{Entity, TranslationId};
use crate::error::Error;
use serde::{Deserialize, Serialize};

surrogate_key!(
    /// Surrogate key of an [`ExampleSentence`].
    SentenceId,
    Entity::ExampleSentence
);

/// A usage example attached to a [`Translation`](super::Translation).
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ExampleSentence {
    pub id: SentenceId,
    pub translation_id: TranslationId,
    pub text: String,
}

#[derive(sqlx::FromRow)]
pub(crate) struct SentenceRow {
    sentence_id: i64,
    translation_id: i64,
    text: String,
}
impl TryFrom<SentenceRow> for ExampleSentence {
    type Error = Error;
    fn try_from(row: SentenceRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: SentenceId::from_column(row.sentence_id, "sentence id")?,
            translation_id: TranslationId::from_column(row.translation_id, "translation id")?,
            text: row.text,
        })
    }
}
