use derive_more::Display;

/// The three record types stored in the catalogue, used to label errors.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum Entity {
    #[display("word")]
    Word,
    #[display("translation")]
    Translation,
    #[display("example sentence")]
    ExampleSentence,
}

/// Declares an opaque, storage-assigned surrogate key.
///
/// Keys are unsigned in the public API and stored as SQLite's signed 64-bit
/// `INTEGER`. A key above `i64::MAX` can never have been assigned, so
/// [`key`](WordId::key) returns `None` and lookups report it as not found.
macro_rules! surrogate_key {
    ($(#[$meta:meta])* $name:ident, $entity:expr) => {
        $(#[$meta])*
        #[derive(
            Clone,
            Copy,
            Debug,
            ::derive_more::Display,
            ::derive_more::From,
            Eq,
            Hash,
            Ord,
            PartialEq,
            PartialOrd,
            ::serde::Serialize,
            ::serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            pub const fn get(self) -> u64 {
                self.0
            }

            pub(crate) fn key(self) -> Option<i64> {
                i64::try_from(self.0).ok()
            }

            #[track_caller]
            pub(crate) fn not_found(self) -> $crate::error::Error {
                ::exn::Exn::new($crate::error::ErrorKind::NotFound($entity, self.0))
            }

            pub(crate) fn from_column(column: i64, name: &'static str) -> $crate::error::Result<Self> {
                use ::exn::ResultExt;
                let id = u64::try_from(column).or_raise(|| $crate::error::ErrorKind::InvalidData(name))?;
                Ok(Self(id))
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = ::std::num::ParseIntError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<u64>().map(Self)
            }
        }
    };
}

mod sentence;
mod translation;
mod word;

pub use self::sentence::{ExampleSentence, SentenceId};
pub(crate) use self::sentence::SentenceRow;
pub use self::translation::{Translation, TranslationId};
pub(crate) use self::translation::TranslationRow;
pub use self::word::{Word, WordId};
pub(crate) use self::word::WordRow;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, Some(0))]
    #[case(42, Some(42))]
    #[case(i64::MAX as u64, Some(i64::MAX))]
    #[case(u64::MAX, None)]
    fn test_key_range(#[case] id: u64, #[case] expected: Option<i64>) {
        assert_eq!(WordId::new(id).key(), expected);
    }

    #[test]
    fn test_negative_column_is_invalid() {
        assert!(TranslationId::from_column(-1, "translation id").is_err());
        assert_eq!(TranslationId::from_column(3, "translation id").unwrap(), TranslationId::new(3));
    }

    #[rstest]
    #[case("12", Some(12))]
    #[case("0", Some(0))]
    #[case("-1", None)]
    #[case("abc", None)]
    #[case("", None)]
    fn test_parse(#[case] input: &str, #[case] expected: Option<u64>) {
        assert_eq!(input.parse::<SentenceId>().ok().map(SentenceId::get), expected);
    }

    #[test]
    fn test_not_found_carries_entity() {
        let err = SentenceId::new(9).not_found();
        assert!(matches!(&*err, crate::error::ErrorKind::NotFound(Entity::ExampleSentence, 9)));
    }
}
