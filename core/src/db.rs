// Beerstock
// Copyright 2023 Julio Merino
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! Database access shared by the PostgreSQL and SQLite backends.
//!
//! The server stores its data in PostgreSQL while the unit tests use in-memory SQLite databases.
//! Query functions receive an `Executor` and match on it to issue the SQL dialect of each backend.

use crate::model::ModelError;
use async_trait::async_trait;
use sqlx::error::ErrorKind;
use sqlx::pool::PoolConnection;
use sqlx::{Database, Transaction};

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

/// SQLSTATE that PostgreSQL reports when it has no connection slots left.
const TOO_MANY_CONNECTIONS: &str = "53300";

/// Database errors.  Failures we do not know how to classify end up as `BackendError`.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum DbError {
    /// A row with the same key or unique value is already stored.
    #[error("Already exists")]
    AlreadyExists,

    /// Unexpected failure reported by the database.
    #[error("Database error: {0}")]
    BackendError(String),

    /// Stored data or data about to be stored violates a constraint of the schema or the model.
    #[error("Data integrity error: {0}")]
    DataIntegrityError(String),

    /// The requested row does not exist.
    #[error("Entity not found")]
    NotFound,

    /// The database cannot take more work right now.
    #[error("Unavailable")]
    Unavailable,
}

impl From<ModelError> for DbError {
    fn from(e: ModelError) -> Self {
        DbError::DataIntegrityError(e.to_string())
    }
}

/// Result type for this module.
pub type DbResult<T> = Result<T, DbError>;

/// Classifies an error returned by `sqlx` for any of the supported backends.
pub fn map_sqlx_error(e: sqlx::Error) -> DbError {
    match e {
        sqlx::Error::ColumnDecode { source, .. } => DbError::DataIntegrityError(source.to_string()),
        sqlx::Error::Database(e) => match e.kind() {
            ErrorKind::UniqueViolation => DbError::AlreadyExists,
            ErrorKind::ForeignKeyViolation => DbError::NotFound,
            ErrorKind::CheckViolation | ErrorKind::NotNullViolation => {
                DbError::DataIntegrityError(e.to_string())
            }
            _ if e.code().as_deref() == Some(TOO_MANY_CONNECTIONS) => DbError::Unavailable,
            _ => DbError::BackendError(e.to_string()),
        },
        sqlx::Error::PoolTimedOut => DbError::Unavailable,
        sqlx::Error::RowNotFound => DbError::NotFound,
        e => DbError::BackendError(e.to_string()),
    }
}

/// A connection handed out by one of the backends.
pub enum BackendExecutor<DB: Database> {
    /// A connection checked out of the pool.  Every statement commits on its own.
    Pooled(PoolConnection<DB>),

    /// An open transaction, rolled back on drop unless committed.
    Tx(Transaction<'static, DB>),
}

impl<DB: Database> BackendExecutor<DB> {
    /// Returns the connection to hand to `sqlx` queries.
    pub fn conn(&mut self) -> &mut DB::Connection {
        match self {
            BackendExecutor::Pooled(conn) => &mut **conn,
            BackendExecutor::Tx(tx) => &mut **tx,
        }
    }

    /// Commits the transaction behind this executor.
    ///
    /// Panics if the executor is a pooled connection: those are only reachable through `Db::ex`,
    /// which never returns a `TxExecutor`.
    async fn commit(self) -> DbResult<()> {
        match self {
            BackendExecutor::Pooled(_) => unreachable!("Pooled connections have nothing to commit"),
            BackendExecutor::Tx(tx) => tx.commit().await.map_err(map_sqlx_error),
        }
    }
}

/// Executor for whichever backend the `Db` was created for.
pub enum Executor {
    /// PostgreSQL connection.
    #[cfg(feature = "postgres")]
    Postgres(BackendExecutor<sqlx::Postgres>),

    /// SQLite connection.
    #[cfg(feature = "sqlite")]
    Sqlite(BackendExecutor<sqlx::Sqlite>),
}

/// An `Executor` bound to an open transaction.
pub struct TxExecutor(Executor);

impl TxExecutor {
    /// Returns the executor to run the statements of the transaction on.
    pub fn ex(&mut self) -> &mut Executor {
        &mut self.0
    }

    /// Commits the transaction.  Dropping a `TxExecutor` without calling this rolls it back.
    pub async fn commit(self) -> DbResult<()> {
        match self.0 {
            #[cfg(feature = "postgres")]
            Executor::Postgres(ex) => ex.commit().await,

            #[cfg(feature = "sqlite")]
            Executor::Sqlite(ex) => ex.commit().await,
        }
    }
}

/// A handle to the database, shared by all requests.
#[async_trait]
pub trait Db {
    /// Checks a connection out of the pool for statements that need no transaction.
    async fn ex(&self) -> DbResult<Executor>;

    /// Opens a transaction.
    async fn begin(&self) -> DbResult<TxExecutor>;

    /// Closes the pool once all checked out connections are returned.
    async fn close(&self);
}
