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

//! Database abstraction in terms of the operations needed by the service.

use crate::model::{Beer, BeerId, BeerName, BeerType, Brand, Quantity};
#[cfg(feature = "postgres")]
use beerstock_core::db::postgres;
#[cfg(any(feature = "sqlite", test))]
use beerstock_core::db::sqlite;
use beerstock_core::db::{DbError, DbResult, Executor, map_sqlx_error};
use futures::TryStreamExt;
use sqlx::Row;
#[cfg(feature = "postgres")]
use sqlx::postgres::PgRow;
#[cfg(any(feature = "sqlite", test))]
use sqlx::sqlite::SqliteRow;

#[cfg(test)]
mod tests;

/// Initializes the database schema.
pub async fn init_schema(ex: &mut Executor) -> DbResult<()> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => postgres::run_schema(ex, include_str!("postgres.sql")).await,

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => sqlite::run_schema(ex, include_str!("sqlite.sql")).await,

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Builds a `Beer` from the raw values of a row.
fn build_beer(
    id: i64,
    name: String,
    brand: String,
    beer_type: String,
    max_quantity: i32,
    quantity: i32,
) -> DbResult<Beer> {
    Ok(Beer::new(
        Some(BeerId::new(id)),
        BeerName::new(name)?,
        Brand::new(brand)?,
        BeerType::parse(&beer_type)?,
        Quantity::from_i32(max_quantity)?,
        Quantity::from_i32(quantity)?,
    ))
}

#[cfg(feature = "postgres")]
impl TryFrom<PgRow> for Beer {
    type Error = DbError;

    fn try_from(row: PgRow) -> DbResult<Self> {
        let id: i64 = row.try_get("id").map_err(map_sqlx_error)?;
        let name: String = row.try_get("name").map_err(map_sqlx_error)?;
        let brand: String = row.try_get("brand").map_err(map_sqlx_error)?;
        let beer_type: String = row.try_get("beer_type").map_err(map_sqlx_error)?;
        let max_quantity: i32 = row.try_get("max_quantity").map_err(map_sqlx_error)?;
        let quantity: i32 = row.try_get("quantity").map_err(map_sqlx_error)?;

        build_beer(id, name, brand, beer_type, max_quantity, quantity)
    }
}

#[cfg(any(feature = "sqlite", test))]
impl TryFrom<SqliteRow> for Beer {
    type Error = DbError;

    fn try_from(row: SqliteRow) -> DbResult<Self> {
        let id: i64 = row.try_get("id").map_err(map_sqlx_error)?;
        let name: String = row.try_get("name").map_err(map_sqlx_error)?;
        let brand: String = row.try_get("brand").map_err(map_sqlx_error)?;
        let beer_type: String = row.try_get("beer_type").map_err(map_sqlx_error)?;
        let max_quantity: i32 = row.try_get("max_quantity").map_err(map_sqlx_error)?;
        let quantity: i32 = row.try_get("quantity").map_err(map_sqlx_error)?;

        build_beer(id, name, brand, beer_type, max_quantity, quantity)
    }
}

/// Gets the beer named `name`, if any.
pub(crate) async fn find_beer_by_name(
    ex: &mut Executor,
    name: &BeerName,
) -> DbResult<Option<Beer>> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "SELECT * FROM beers WHERE name = $1";
            let maybe_row = sqlx::query(query_str)
                .bind(name.as_str())
                .fetch_optional(ex.conn())
                .await
                .map_err(map_sqlx_error)?;
            maybe_row.map(Beer::try_from).transpose()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "SELECT * FROM beers WHERE name = ?";
            let maybe_row = sqlx::query(query_str)
                .bind(name.as_str())
                .fetch_optional(ex.conn())
                .await
                .map_err(map_sqlx_error)?;
            maybe_row.map(Beer::try_from).transpose()
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Gets the beer identified by `id`, if any.
///
/// When issued within a transaction, the returned row stays locked until the transaction
/// completes so that read-modify-write sequences on the same beer are serialized.
pub(crate) async fn find_beer_by_id(ex: &mut Executor, id: BeerId) -> DbResult<Option<Beer>> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "SELECT * FROM beers WHERE id = $1 FOR UPDATE";
            let maybe_row = sqlx::query(query_str)
                .bind(id.as_i64())
                .fetch_optional(ex.conn())
                .await
                .map_err(map_sqlx_error)?;
            maybe_row.map(Beer::try_from).transpose()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "SELECT * FROM beers WHERE id = ?";
            let maybe_row = sqlx::query(query_str)
                .bind(id.as_i64())
                .fetch_optional(ex.conn())
                .await
                .map_err(map_sqlx_error)?;
            maybe_row.map(Beer::try_from).transpose()
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Gets all beers sorted by their identifier.
pub(crate) async fn find_all_beers(ex: &mut Executor) -> DbResult<Vec<Beer>> {
    let query_str = "SELECT * FROM beers ORDER BY id";
    let mut beers = vec![];
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let mut rows = sqlx::query(query_str).fetch(ex.conn());
            while let Some(row) = rows.try_next().await.map_err(map_sqlx_error)? {
                beers.push(Beer::try_from(row)?);
            }
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let mut rows = sqlx::query(query_str).fetch(ex.conn());
            while let Some(row) = rows.try_next().await.map_err(map_sqlx_error)? {
                beers.push(Beer::try_from(row)?);
            }
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
    Ok(beers)
}

/// Inserts `beer` as a new record and returns it with its identifier populated.
///
/// The database assigns the identifier when `beer` lacks one.  An existing record is never
/// replaced: inserting an identifier or a name that is already in use fails with
/// `DbError::AlreadyExists`.
pub(crate) async fn insert_beer(ex: &mut Executor, beer: Beer) -> DbResult<Beer> {
    let explicit_id = beer.id().as_ref().map(BeerId::as_i64);
    let id: i64 = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                INSERT INTO beers (id, name, brand, beer_type, max_quantity, quantity)
                VALUES (COALESCE($1, nextval('beers_id_seq')),
                    $2, $3, $4, $5, $6)
                RETURNING id
            ";
            let row = sqlx::query(query_str)
                .bind(explicit_id)
                .bind(beer.name().as_str())
                .bind(beer.brand().as_str())
                .bind(beer.beer_type().as_str())
                .bind(beer.max().as_i32())
                .bind(beer.quantity().as_i32())
                .fetch_one(ex.conn())
                .await
                .map_err(map_sqlx_error)?;
            let id: i64 = row.try_get("id").map_err(map_sqlx_error)?;

            if explicit_id.is_some() {
                // Only ever move the sequence forward, and only if its next value would collide.
                let query_str = "
                    SELECT setval('beers_id_seq', $1)
                    FROM beers_id_seq
                    WHERE CASE WHEN is_called THEN last_value + 1 ELSE last_value END <= $1
                ";
                sqlx::query(query_str)
                    .bind(id)
                    .execute(ex.conn())
                    .await
                    .map_err(map_sqlx_error)?;
            }

            id
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "
                INSERT INTO beers (id, name, brand, beer_type, max_quantity, quantity)
                VALUES (?, ?, ?, ?, ?, ?)
                RETURNING id
            ";
            let row = sqlx::query(query_str)
                .bind(explicit_id)
                .bind(beer.name().as_str())
                .bind(beer.brand().as_str())
                .bind(beer.beer_type().as_str())
                .bind(beer.max().as_i32())
                .bind(beer.quantity().as_i32())
                .fetch_one(ex.conn())
                .await
                .map_err(map_sqlx_error)?;
            row.try_get("id").map_err(map_sqlx_error)?
        }

        #[allow(unused)]
        _ => unreachable!(),
    };
    Ok(beer.with_id(BeerId::new(id)))
}

/// Overwrites the stored record that has the same identifier as `beer`.
///
/// Fails with `DbError::NotFound` if no such record exists.
pub(crate) async fn update_beer(ex: &mut Executor, beer: &Beer) -> DbResult<()> {
    let id = match beer.id() {
        Some(id) => id.as_i64(),
        None => {
            return Err(DbError::BackendError("Cannot update a beer without an id".to_owned()));
        }
    };
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                UPDATE beers
                SET name = $2, brand = $3, beer_type = $4, max_quantity = $5, quantity = $6
                WHERE id = $1
            ";
            let done = sqlx::query(query_str)
                .bind(id)
                .bind(beer.name().as_str())
                .bind(beer.brand().as_str())
                .bind(beer.beer_type().as_str())
                .bind(beer.max().as_i32())
                .bind(beer.quantity().as_i32())
                .execute(ex.conn())
                .await
                .map_err(map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "
                UPDATE beers
                SET name = ?2, brand = ?3, beer_type = ?4, max_quantity = ?5, quantity = ?6
                WHERE id = ?1
            ";
            let done = sqlx::query(query_str)
                .bind(id)
                .bind(beer.name().as_str())
                .bind(beer.brand().as_str())
                .bind(beer.beer_type().as_str())
                .bind(beer.max().as_i32())
                .bind(beer.quantity().as_i32())
                .execute(ex.conn())
                .await
                .map_err(map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    if rows_affected == 0 {
        return Err(DbError::NotFound);
    } else if rows_affected != 1 {
        return Err(DbError::BackendError("Update affected more than one row".to_owned()));
    }
    Ok(())
}

/// Deletes the beer identified by `id`.
pub(crate) async fn delete_beer(ex: &mut Executor, id: BeerId) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "DELETE FROM beers WHERE id = $1";
            let done = sqlx::query(query_str)
                .bind(id.as_i64())
                .execute(ex.conn())
                .await
                .map_err(map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "DELETE FROM beers WHERE id = ?";
            let done = sqlx::query(query_str)
                .bind(id.as_i64())
                .execute(ex.conn())
                .await
                .map_err(map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    if rows_affected == 0 {
        return Err(DbError::NotFound);
    } else if rows_affected != 1 {
        return Err(DbError::BackendError("Deletion affected more than one row".to_owned()));
    }
    Ok(())
}
