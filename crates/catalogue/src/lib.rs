//! Caller-facing operations over the dictionary catalogue.
//!
//! [`Catalogue`] wraps a [`Repository`](lexi_store::Repository) with input
//! sanitizing, validation and the compound operations a user interface
//! needs, such as adding a translation with its example sentences in one
//! step or reading a word's whole [`WordEntry`].

mod entry;
pub mod error;
mod service;
mod validate;

pub use crate::entry::{TranslationEntry, WordEntry};
pub use crate::service::Catalogue;
pub use crate::validate::{MAX_TEXT_LENGTH, parse_id, sanitize, validate};
