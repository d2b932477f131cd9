//! Repository for words, translations and example sentences.
//!
//! The three entities form a strict hierarchy (word → translation → example
//! sentence), so they share one repository: deleting a parent has to reach
//! into the child tables anyway, and compound writes are composed through a
//! single [`Repository::transaction`] scope.
//!
//! # Concurrency
//!
//! The repository keeps no shared mutable state of its own. Racing
//! get-or-create calls converge because every insert is an
//! `INSERT ... ON CONFLICT DO NOTHING` against a UNIQUE constraint, followed
//! by a read of the row through that same unique key. Whoever loses the race
//! reads the winner's row.
//!
//! # Cancellation
//!
//! A repository value carries a [`CancellationToken`] and an optional
//! deadline. Every operation races against both and fails with
//! [`ErrorKind::Canceled`] when either fires first. Any transaction opened by
//! that operation is dropped without committing, which rolls it back.

mod sentence;
mod translation;
mod word;

use crate::Database;
use crate::error::{ErrorKind, Result};
use exn::Exn;
use sqlx::pool::PoolConnection;
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::fmt;
use std::future::Future;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

type SharedTransaction = Arc<Mutex<Option<Transaction<'static, Sqlite>>>>;

/// Writers take the lock up front: a deferred transaction that read first
/// cannot upgrade after another writer commits (`SQLITE_BUSY_SNAPSHOT`).
const BEGIN_WRITE: &str = "BEGIN IMMEDIATE";

#[derive(Clone)]
enum Handle {
    Pool(SqlitePool),
    /// Bound to a transaction opened by [`Repository::transaction`]. The slot
    /// is emptied when the scope commits or rolls back.
    Transaction(SharedTransaction),
}

/// A connection checked out for the duration of one operation.
enum Conn<'a> {
    Pooled(PoolConnection<Sqlite>),
    /// A transaction opened (and owned) by a single operation. Dropping it
    /// without calling [`Conn::commit`] rolls it back.
    Owned(Transaction<'static, Sqlite>),
    /// The enclosing [`Repository::transaction`] scope's connection.
    Joined(MappedMutexGuard<'a, Transaction<'static, Sqlite>>),
}
impl Conn<'_> {
    /// Commit if this operation owns its transaction. Joined scopes are
    /// committed by whoever opened them.
    async fn commit(self) -> Result<()> {
        match self {
            Self::Owned(tx) => tx.commit().await.map_err(|e| ErrorKind::storage(e)),
            Self::Pooled(_) | Self::Joined(_) => Ok(()),
        }
    }
}
impl Deref for Conn<'_> {
    type Target = SqliteConnection;
    fn deref(&self) -> &SqliteConnection {
        match self {
            Self::Pooled(conn) => &**conn,
            Self::Owned(tx) => &**tx,
            Self::Joined(tx) => &***tx,
        }
    }
}
impl DerefMut for Conn<'_> {
    fn deref_mut(&mut self) -> &mut SqliteConnection {
        match self {
            Self::Pooled(conn) => &mut **conn,
            Self::Owned(tx) => &mut **tx,
            Self::Joined(tx) => &mut ***tx,
        }
    }
}

/// Data access for the whole word → translation → example sentence hierarchy.
///
/// Cloning is cheap: a clone shares the same pool (or transaction) but can be
/// given its own cancellation token and deadline, which is how callers bind
/// a request's cancellation signal to the operations it issues.
#[derive(Clone)]
pub struct Repository {
    handle: Handle,
    cancel: CancellationToken,
    deadline: Option<Instant>,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self::new(db.pool().clone())
    }
}
impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("transaction", &self.in_transaction())
            .field("canceled", &self.cancel.is_cancelled())
            .field("deadline", &self.deadline)
            .finish()
    }
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            handle: Handle::Pool(pool),
            cancel: CancellationToken::new(),
            deadline: None,
        }
    }

    /// Bind a cancellation token; every subsequent operation on the returned
    /// repository fails with [`ErrorKind::Canceled`] once it is cancelled.
    pub fn with_cancellation(&self, cancel: CancellationToken) -> Self {
        Self { cancel, ..self.clone() }
    }

    /// Bind an absolute deadline. An earlier deadline already bound wins.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        };
        Self { deadline: Some(deadline), ..self.clone() }
    }

    /// Bind a deadline `timeout` from now.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Whether this repository is bound to a [`transaction`](Self::transaction) scope.
    pub fn in_transaction(&self) -> bool {
        matches!(self.handle, Handle::Transaction(_))
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Run `work` inside a single database transaction.
    ///
    /// `work` receives a repository bound to the transaction; use it (and only
    /// it) for every call that should be part of the unit. The transaction
    /// commits if `work` returns `Ok`, and rolls back if it returns an error,
    /// is cancelled, or runs past the deadline. Return
    /// [`ErrorKind::Rollback`] to discard the changes deliberately.
    ///
    /// Scopes do not nest: calling this on a transaction-bound repository runs
    /// `work` inside the existing transaction.
    pub async fn transaction<T, F, Fut>(&self, work: F) -> Result<T>
    where
        F: FnOnce(Repository) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let pool = match &self.handle {
            Handle::Pool(pool) => pool,
            Handle::Transaction(_) => return self.guard(work(self.clone())).await,
        };
        let tx = self
            .guard(async { pool.begin_with(BEGIN_WRITE).await.map_err(|e| ErrorKind::storage(e)) })
            .await?;
        let shared: SharedTransaction = Arc::new(Mutex::new(Some(tx)));
        let scoped = Self {
            handle: Handle::Transaction(Arc::clone(&shared)),
            ..self.clone()
        };
        let outcome = self.guard(work(scoped)).await;
        let tx = shared.lock().await.take().ok_or_else(|| Exn::new(ErrorKind::Closed))?;
        match outcome {
            Ok(value) => {
                tx.commit().await.map_err(|e| ErrorKind::storage(e))?;
                Ok(value)
            },
            Err(err) => {
                let kind: &ErrorKind = &err;
                tracing::debug!(error = %kind, "rolling back transaction");
                if let Err(rollback) = tx.rollback().await {
                    tracing::warn!(error = %rollback, "failed to roll back transaction");
                }
                Err(err)
            },
        }
    }

    // =========================================================================
    // Plumbing
    // =========================================================================

    /// Race `operation` against this repository's cancellation token and deadline.
    async fn guard<T>(&self, operation: impl Future<Output = Result<T>>) -> Result<T> {
        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => {
                tracing::debug!("operation canceled by caller");
                Err(Exn::new(ErrorKind::Canceled))
            },
            () = deadline => {
                tracing::debug!("operation exceeded its deadline");
                Err(Exn::new(ErrorKind::Canceled))
            },
            result = operation => result,
        }
    }

    /// Check out a connection for a single statement or a short sequence of
    /// statements that need no atomicity.
    async fn acquire(&self) -> Result<Conn<'_>> {
        match &self.handle {
            Handle::Pool(pool) => pool.acquire().await.map(Conn::Pooled).map_err(|e| ErrorKind::storage(e)),
            Handle::Transaction(shared) => MutexGuard::try_map(shared.lock().await, Option::as_mut)
                .map(Conn::Joined)
                .map_err(|_| Exn::new(ErrorKind::Closed)),
        }
    }

    /// Check out a connection whose statements apply atomically: a fresh
    /// transaction, or the enclosing scope's transaction when there is one.
    async fn begin(&self) -> Result<Conn<'_>> {
        match &self.handle {
            Handle::Pool(pool) => pool
                .begin_with(BEGIN_WRITE)
                .await
                .map(Conn::Owned)
                .map_err(|e| ErrorKind::storage(e)),
            Handle::Transaction(_) => self.acquire().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Entity, WordId};

    async fn setup() -> (Database, Repository) {
        let db = Database::connect_in_memory().await.unwrap();
        let repo = Repository::from(&db);
        (db, repo)
    }

    #[tokio::test]
    async fn test_transaction_commits() {
        let (db, repo) = setup().await;
        let word = repo
            .transaction(|tx| async move {
                assert!(tx.in_transaction());
                tx.get_or_create_word("kot").await
            })
            .await
            .unwrap();
        assert_eq!(repo.get_word(word.id).await.unwrap().text, "kot");
        db.close().await;
    }

    #[tokio::test]
    async fn test_transaction_rolls_back_on_sentinel() {
        let (db, repo) = setup().await;
        let result: Result<()> = repo
            .transaction(|tx| async move {
                tx.get_or_create_word("kot").await?;
                Err(Exn::new(ErrorKind::Rollback))
            })
            .await;
        assert!(matches!(&*result.unwrap_err(), ErrorKind::Rollback));
        assert_eq!(repo.get_word_by_text("kot").await.unwrap(), None);
        assert!(repo.list_words().await.unwrap().is_empty());
        db.close().await;
    }

    #[tokio::test]
    async fn test_transaction_rolls_back_on_failed_step() {
        let (db, repo) = setup().await;
        let result = repo
            .transaction(|tx| async move {
                let word = tx.get_or_create_word("kot").await?;
                tx.get_or_create_translation(word.id, "cat").await?;
                // Fails: the word does not exist.
                tx.get_or_create_translation(WordId::new(999), "dog").await
            })
            .await;
        assert!(matches!(&*result.unwrap_err(), ErrorKind::NotFound(Entity::Word, 999)));
        assert!(repo.list_words().await.unwrap().is_empty());
        db.close().await;
    }

    #[tokio::test]
    async fn test_transaction_reads_its_own_writes() {
        let (db, repo) = setup().await;
        repo.transaction(|tx| async move {
            let word = tx.get_or_create_word("pies").await?;
            let translation = tx.get_or_create_translation(word.id, "dog").await?;
            assert_eq!(tx.list_translations(word.id).await?, vec![translation]);
            Ok(())
        })
        .await
        .unwrap();
        db.close().await;
    }

    #[tokio::test]
    async fn test_nested_transaction_joins_outer() {
        let (db, repo) = setup().await;
        let result: Result<()> = repo
            .transaction(|outer| async move {
                outer
                    .transaction(|inner| async move {
                        assert!(inner.in_transaction());
                        inner.get_or_create_word("kot").await.map(drop)
                    })
                    .await?;
                Err(Exn::new(ErrorKind::Rollback))
            })
            .await;
        assert!(result.is_err());
        // The inner scope did not commit on its own.
        assert_eq!(repo.get_word_by_text("kot").await.unwrap(), None);
        db.close().await;
    }

    #[tokio::test]
    async fn test_scoped_repository_is_closed_after_scope() {
        let (db, repo) = setup().await;
        let leaked = repo.transaction(|tx| async move { Ok(tx) }).await.unwrap();
        let err = leaked.list_words().await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Closed));
        db.close().await;
    }

    #[tokio::test]
    async fn test_cancelled_token_fails_fast() {
        let (db, repo) = setup().await;
        let token = CancellationToken::new();
        token.cancel();
        let cancelled = repo.with_cancellation(token);
        let err = cancelled.get_or_create_word("kot").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Canceled));
        assert!(err.is_retryable());
        // Nothing was written, and the original handle is unaffected.
        assert_eq!(repo.get_word_by_text("kot").await.unwrap(), None);
        db.close().await;
    }

    #[tokio::test]
    async fn test_cancellation_rolls_back_transaction() {
        let (db, repo) = setup().await;
        let token = CancellationToken::new();
        let scoped = repo.with_cancellation(token.clone());
        let result: Result<()> = scoped
            .transaction(|tx| async move {
                tx.get_or_create_word("kot").await?;
                token.cancel();
                // Never resolves on its own; only cancellation ends the scope.
                std::future::pending::<()>().await;
                Ok(())
            })
            .await;
        assert!(matches!(&*result.unwrap_err(), ErrorKind::Canceled));
        assert_eq!(repo.get_word_by_text("kot").await.unwrap(), None);
        db.close().await;
    }

    #[tokio::test]
    async fn test_deadline_is_classified_as_canceled() {
        let (db, repo) = setup().await;
        let expired = repo.with_deadline(Instant::now() - Duration::from_millis(1));
        let err = expired.list_words().await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Canceled));
        db.close().await;
    }

    /// A file-backed database, so the pool really hands out several
    /// connections that can race each other.
    async fn setup_shared() -> (tempfile::TempDir, Database, Repository) {
        let dir = tempfile::tempdir().unwrap();
        let settings = crate::PoolSettings { max_connections: 8, ..crate::PoolSettings::default() };
        let db = Database::connect_with(dir.path().join("race.db"), settings).await.unwrap();
        let repo = Repository::from(&db);
        (dir, db, repo)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_get_or_create_converges() {
        let (_dir, db, repo) = setup_shared().await;
        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let repo = repo.clone();
                tokio::spawn(async move { repo.get_or_create_word("cat").await })
            })
            .collect();
        let mut ids = Vec::new();
        for task in tasks {
            ids.push(task.await.unwrap().unwrap().id);
        }
        let words = repo.list_words().await.unwrap();
        assert_eq!(words.len(), 1);
        assert!(ids.iter().all(|id| *id == words[0].id));
        db.close().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_children_converge() {
        let (_dir, db, repo) = setup_shared().await;
        let word_id = repo.get_or_create_word("kot").await.unwrap().id;
        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let repo = repo.clone();
                tokio::spawn(async move {
                    let translation = repo.get_or_create_translation(word_id, "cat").await?;
                    repo.get_or_create_example_sentence(translation.id, "The cat sleeps.").await
                })
            })
            .collect();
        let mut sentences = Vec::new();
        for task in tasks {
            sentences.push(task.await.unwrap().unwrap());
        }
        let translations = repo.list_translations(word_id).await.unwrap();
        assert_eq!(translations.len(), 1);
        let stored = repo.list_example_sentences(translations[0].id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert!(sentences.iter().all(|s| *s == stored[0]));
        db.close().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_read_then_write_scopes() {
        let (_dir, db, repo) = setup_shared().await;
        let word_id = repo.get_or_create_word("zamek").await.unwrap().id;
        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let repo = repo.clone();
                tokio::spawn(async move {
                    repo.transaction(|tx| async move {
                        let word = tx.get_word(word_id).await?;
                        let text = if i % 2 == 0 { "castle" } else { "lock" };
                        tx.get_or_create_translation(word.id, text).await
                    })
                    .await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        let texts: Vec<_> = repo.list_translations(word_id).await.unwrap().into_iter().map(|t| t.text).collect();
        assert_eq!(texts.len(), 2);
        assert!(texts.contains(&"castle".to_string()) && texts.contains(&"lock".to_string()));
        db.close().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_get_or_create_racing_delete_never_misses_its_row() {
        let (_dir, db, repo) = setup_shared().await;
        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let repo = repo.clone();
                tokio::spawn(async move {
                    for _ in 0..10 {
                        let word = repo.get_or_create_word("kot").await?;
                        assert_eq!(word.text, "kot");
                        match repo.delete_word(word.id).await {
                            Err(err) if !matches!(&*err, ErrorKind::NotFound(..)) => return Err(err),
                            _ => {},
                        }
                    }
                    Ok::<_, crate::error::Error>(())
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        db.close().await;
    }

    #[tokio::test]
    async fn test_lock_contention_is_retryable() {
        let dir = tempfile::tempdir().unwrap();
        let settings = crate::PoolSettings {
            max_connections: 2,
            busy_timeout: Duration::ZERO,
            ..crate::PoolSettings::default()
        };
        let db = Database::connect_with(dir.path().join("busy.db"), settings).await.unwrap();
        // Open both connections before the lock is taken.
        let (first, second) = tokio::join!(db.pool().acquire(), db.pool().acquire());
        drop((first.unwrap(), second.unwrap()));
        let repo = Repository::from(&db);

        let holder = db.pool().begin_with(BEGIN_WRITE).await.unwrap();
        let err = repo.get_or_create_word("kot").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Busy));
        assert!(err.is_retryable());

        holder.rollback().await.unwrap();
        assert_eq!(repo.get_or_create_word("kot").await.unwrap().text, "kot");
        db.close().await;
    }

    #[tokio::test]
    async fn test_earlier_deadline_wins() {
        let pool = SqlitePool::connect_lazy("sqlite::memory:").unwrap();
        let repo = Repository::new(pool);
        let soon = Instant::now() + Duration::from_secs(1);
        let later = soon + Duration::from_secs(60);
        assert_eq!(repo.with_deadline(soon).with_deadline(later).deadline, Some(soon));
        assert_eq!(repo.with_deadline(later).with_deadline(soon).deadline, Some(soon));
    }
}
