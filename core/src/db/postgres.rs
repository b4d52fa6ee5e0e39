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

//! PostgreSQL backend, used by the server.

use crate::db::{BackendExecutor, Db, DbError, DbResult, Executor, TxExecutor, map_sqlx_error};
use crate::env::{EnvResult, get_optional_var, get_required_var};
use async_trait::async_trait;
use derivative::Derivative;
use futures::Future;
use log::warn;
use sqlx::Postgres;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::time::Duration;

/// Executor for PostgreSQL queries.
pub type PostgresExecutor = BackendExecutor<Postgres>;

/// Attempts to reach an unavailable database before giving up when `MAX_RETRIES` is not set.
const DEFAULT_MAX_RETRIES: u16 = 60;

/// Time to wait for a free connection before considering the database unavailable.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(2);

/// Delays stop growing once they reach this value.
const MAX_GROWING_DELAY: Duration = Duration::from_secs(5);

/// Settings to reach a PostgreSQL server.
#[derive(Derivative)]
#[derivative(Debug, Default)]
#[cfg_attr(test, derivative(PartialEq))]
pub struct PostgresOptions {
    /// Name or address of the server.
    pub host: String,

    /// Port the server listens on.
    pub port: u16,

    /// Database to use within the server.
    pub database: String,

    /// Role to log in as.
    pub username: String,

    /// Password of the role.
    #[derivative(Debug = "ignore")]
    pub password: String,

    /// Connections the pool keeps open even when idle.
    pub min_connections: Option<u32>,

    /// Upper bound on the connections the pool opens.
    pub max_connections: Option<u32>,

    /// Attempts to reach an unavailable database before giving up.
    pub max_retries: u16,
}

impl PostgresOptions {
    /// Reads the settings from the `<prefix>_HOST`, `<prefix>_PORT`, `<prefix>_DATABASE`,
    /// `<prefix>_USERNAME` and `<prefix>_PASSWORD` variables, plus the optional
    /// `<prefix>_MIN_CONNECTIONS`, `<prefix>_MAX_CONNECTIONS` and `<prefix>_MAX_RETRIES`.
    pub fn from_env(prefix: &str) -> EnvResult<Self> {
        let max_retries = get_optional_var(prefix, "MAX_RETRIES")?;
        Ok(Self {
            host: get_required_var(prefix, "HOST")?,
            port: get_required_var(prefix, "PORT")?,
            database: get_required_var(prefix, "DATABASE")?,
            username: get_required_var(prefix, "USERNAME")?,
            password: get_required_var(prefix, "PASSWORD")?,
            min_connections: get_optional_var(prefix, "MIN_CONNECTIONS")?,
            max_connections: get_optional_var(prefix, "MAX_CONNECTIONS")?,
            max_retries: max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
        })
    }

    /// Sizing of the connection pool.
    fn pool_options(&self) -> PgPoolOptions {
        let mut options = PgPoolOptions::new().acquire_timeout(ACQUIRE_TIMEOUT);
        if let Some(n) = self.min_connections {
            options = options.min_connections(n);
        }
        if let Some(n) = self.max_connections {
            options = options.max_connections(n);
        }
        options
    }

    /// Parameters of every connection in the pool.
    fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .username(&self.username)
            .password(&self.password)
    }
}

/// Waits between attempts to reach a database that reports itself as unavailable.
///
/// The first delay is random between 100ms and 1s.  Each later delay adds up to one more second
/// of random jitter until the delay exceeds `MAX_GROWING_DELAY`.
struct Backoff {
    /// Delay to return on the next call to `next_delay`.
    delay: Duration,

    /// Remaining calls to `next_delay` that return a delay.
    retries_left: u16,
}

impl Backoff {
    /// Creates a backoff that allows `max_retries` retries.
    fn new(max_retries: u16) -> Self {
        let delay = Duration::from_millis(100 + u64::from(rand::random::<u16>() % 900));
        Self { delay, retries_left: max_retries }
    }

    /// Returns how long to wait before retrying, or `None` if no retries are left.
    fn next_delay(&mut self) -> Option<Duration> {
        if self.retries_left == 0 {
            return None;
        }
        self.retries_left -= 1;

        let delay = self.delay;
        if self.delay < MAX_GROWING_DELAY {
            self.delay += Duration::from_millis(u64::from(rand::random::<u16>() % 1000));
        }
        Some(delay)
    }
}

/// Runs `op` until it succeeds or fails with an error other than `DbError::Unavailable`, allowing
/// up to `max_retries` retries.
async fn with_retries<T, F, Fut>(max_retries: u16, op: F) -> DbResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, sqlx::Error>>,
{
    let mut backoff = Backoff::new(max_retries);
    loop {
        match op().await.map_err(map_sqlx_error) {
            Err(DbError::Unavailable) => match backoff.next_delay() {
                Some(delay) => {
                    warn!(
                        "Database unavailable; retrying in {}ms with {} retries left",
                        delay.as_millis(),
                        backoff.retries_left
                    );
                    tokio::time::sleep(delay).await;
                }
                None => return Err(DbError::Unavailable),
            },
            result => return result,
        }
    }
}

/// A database backed by a PostgreSQL server.
pub struct PostgresDb {
    /// Connections to the server.
    pool: PgPool,

    /// Attempts to reach an unavailable database before giving up.
    max_retries: u16,
}

impl PostgresDb {
    /// Sets up a pool of connections to the server described by `opts`.
    ///
    /// Connections open lazily, so this does not fail when the server is down.
    pub fn connect(opts: PostgresOptions) -> Self {
        let pool = opts.pool_options().connect_lazy_with(opts.connect_options());
        Self { pool, max_retries: opts.max_retries }
    }

    /// Checks a connection out of the pool.
    async fn acquire(&self) -> DbResult<PostgresExecutor> {
        let conn = with_retries(self.max_retries, || self.pool.acquire()).await?;
        Ok(BackendExecutor::Pooled(conn))
    }
}

impl Drop for PostgresDb {
    fn drop(&mut self) {
        if !self.pool.is_closed() {
            warn!("PostgreSQL pool dropped while still open; call close() first");
        }
    }
}

#[async_trait]
impl Db for PostgresDb {
    async fn ex(&self) -> DbResult<Executor> {
        Ok(Executor::Postgres(self.acquire().await?))
    }

    async fn begin(&self) -> DbResult<TxExecutor> {
        let tx = with_retries(self.max_retries, || self.pool.begin()).await?;
        Ok(TxExecutor(Executor::Postgres(BackendExecutor::Tx(tx))))
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// Runs all the `;`-separated statements in `schema`.
pub async fn run_schema(ex: &mut PostgresExecutor, schema: &str) -> DbResult<()> {
    sqlx::raw_sql(schema).execute(ex.conn()).await.map_err(map_sqlx_error)?;
    Ok(())
}

/// Test utilities for the PostgreSQL backend.
#[cfg(any(feature = "testutils", test))]
pub mod testutils {
    use super::*;

    /// Connects to the database described by the `PGSQL_TEST_*` variables.
    ///
    /// The pool holds a single connection whose `search_path` points to `pg_temp`, so the tables
    /// a test creates vanish when the pool closes.
    pub async fn setup() -> PostgresDb {
        let _can_fail = env_logger::builder().is_test(true).try_init();

        let opts = PostgresOptions {
            min_connections: Some(1),
            max_connections: Some(1),
            ..PostgresOptions::from_env("PGSQL_TEST").unwrap()
        };
        let db = PostgresDb::connect(opts);

        let mut ex = db.acquire().await.unwrap();
        sqlx::query("SET search_path TO pg_temp").execute(ex.conn()).await.unwrap();
        db
    }
}
