//! SQLite storage for the dictionary catalogue.
//!
//! The catalogue is a three-level hierarchy: a [`Word`](models::Word) (source
//! language lemma) has [`Translation`](models::Translation)s, and each
//! translation has [`ExampleSentence`](models::ExampleSentence)s.
//!
//! # Architecture
//! - [`Database`] owns the process-wide connection pool and runs the embedded
//!   migrations on connect. The entry point creates it and closes it.
//! - [`Repository`] is the only writer. Every entity can be get-or-created,
//!   fetched, listed, updated and deleted (with cascade). Compound writes are
//!   composed with [`Repository::transaction`].
//! - Uniqueness and referential integrity live in the schema. The repository
//!   never checks for existence before inserting.

mod db;
pub mod error;
pub mod models;
mod repo;

pub use crate::db::{Database, PoolSettings};
pub use crate::repo::Repository;
pub use tokio_util::sync::CancellationToken;
