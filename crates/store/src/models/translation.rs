use super::{Entity, WordId};
use crate::error::Error;
use serde::{Deserialize, Serialize};

surrogate_key!(
    /// Surrogate key of a [`Translation`].
    TranslationId,
    Entity::Translation
);

/// A target-language rendering of a [`Word`](super::Word).
///
/// The text is unique among the translations of the same word.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    pub id: TranslationId,
    pub word_id: WordId,
    pub text: String,
}

#[derive(sqlx::FromRow)]
pub(crate) struct TranslationRow {
    translation_id: i64,
    word_id: i64,
    text: String,
}
impl TryFrom<TranslationRow> for Translation {
    type Error = Error;
    fn try_from(row: TranslationRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: TranslationId::from_column(row.translation_id, "translation id")?,
            word_id: WordId::from_column(row.word_id, "word id")?,
            text: row.text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_row_to_model() {
        let row = TranslationRow { translation_id: 4, word_id: 1, text: "dog".to_string() };
        let translation = Translation::try_from(row).unwrap();
        assert_eq!(translation.id, TranslationId::new(4));
        assert_eq!(translation.word_id, WordId::new(1));
    }

    #[test]
    fn test_corrupt_parent_column() {
        let row = TranslationRow { translation_id: 4, word_id: -8, text: "dog".to_string() };
        let err = Translation::try_from(row).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidData("word id")));
    }
}
