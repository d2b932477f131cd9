use super::Entity;
use crate::error::Error;
use serde::{Deserialize, Serialize};

surrogate_key!(
    /// Surrogate key of a [`Word`].
    WordId,
    Entity::Word
);

/// A source-language lemma. The text is unique across all words.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub id: WordId,
    pub text: String,
}

#[derive(sqlx::FromRow)]
pub(crate) struct WordRow {
    word_id: i64,
    text: String,
}
impl TryFrom<WordRow> for Word {
    type Error = Error;
    fn try_from(row: WordRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: WordId::from_column(row.word_id, "word id")?,
            text: row.text,
        })
    }
}
