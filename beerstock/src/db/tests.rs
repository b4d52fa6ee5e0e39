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

//! Common tests for any database implementation.

use crate::db::*;
use beerstock_core::db::Db;
use std::sync::Arc;

/// Syntactic sugar to build a beer that has not been saved yet.
fn new_beer(name: &'static str, max: u16, quantity: u16) -> Beer {
    Beer::new(
        None,
        BeerName::from(name),
        Brand::from("The brand"),
        BeerType::Lager,
        Quantity::from(max),
        Quantity::from(quantity),
    )
}

/// Connects to `db` and initializes the schema, returning an executor for the tests to use.
async fn setup_schema(db: &Arc<dyn Db + Send + Sync>) -> Executor {
    let mut ex = db.ex().await.unwrap();
    init_schema(&mut ex).await.unwrap();
    ex
}

async fn test_insert_assigns_ids(db: Arc<dyn Db + Send + Sync>) {
    let mut ex = setup_schema(&db).await;

    let beer1 = insert_beer(&mut ex, new_beer("first", 10, 5)).await.unwrap();
    let beer2 = insert_beer(&mut ex, new_beer("second", 20, 0)).await.unwrap();

    let id1 = beer1.id().unwrap();
    let id2 = beer2.id().unwrap();
    assert_ne!(id1, id2);
    assert_eq!(new_beer("first", 10, 5).with_id(id1), beer1);
    assert_eq!(new_beer("second", 20, 0).with_id(id2), beer2);

    drop(ex);
    db.close().await;
}

async fn test_insert_with_id(db: Arc<dyn Db + Send + Sync>) {
    let mut ex = setup_schema(&db).await;

    let beer = new_beer("first", 10, 5).with_id(BeerId::new(100));
    assert_eq!(beer, insert_beer(&mut ex, beer.clone()).await.unwrap());
    assert_eq!(Some(beer), find_beer_by_id(&mut ex, BeerId::new(100)).await.unwrap());

    let other = insert_beer(&mut ex, new_beer("second", 10, 5)).await.unwrap();
    assert!(other.id().unwrap().as_i64() > 100);

    drop(ex);
    db.close().await;
}

async fn test_insert_with_non_positive_ids(db: Arc<dyn Db + Send + Sync>) {
    let mut ex = setup_schema(&db).await;

    let zero = new_beer("zero", 10, 5).with_id(BeerId::new(0));
    assert_eq!(zero, insert_beer(&mut ex, zero.clone()).await.unwrap());
    let negative = new_beer("negative", 10, 5).with_id(BeerId::new(-5));
    assert_eq!(negative, insert_beer(&mut ex, negative.clone()).await.unwrap());

    let other = insert_beer(&mut ex, new_beer("other", 10, 5)).await.unwrap();
    assert!(other.id().unwrap().as_i64() > 0);

    assert_eq!(vec![negative, zero, other], find_all_beers(&mut ex).await.unwrap());

    drop(ex);
    db.close().await;
}

async fn test_insert_with_lower_id_keeps_assigning_higher_ids(db: Arc<dyn Db + Send + Sync>) {
    let mut ex = setup_schema(&db).await;

    insert_beer(&mut ex, new_beer("a", 1, 1).with_id(BeerId::new(50))).await.unwrap();
    insert_beer(&mut ex, new_beer("b", 1, 1).with_id(BeerId::new(10))).await.unwrap();

    let other = insert_beer(&mut ex, new_beer("c", 1, 1)).await.unwrap();
    assert!(other.id().unwrap().as_i64() > 50);

    drop(ex);
    db.close().await;
}

async fn test_insert_existing_id_does_not_overwrite(db: Arc<dyn Db + Send + Sync>) {
    let mut ex = setup_schema(&db).await;

    let beer = new_beer("first", 10, 5).with_id(BeerId::new(7));
    insert_beer(&mut ex, beer.clone()).await.unwrap();

    let clash = new_beer("second", 30, 1).with_id(BeerId::new(7));
    assert_eq!(DbError::AlreadyExists, insert_beer(&mut ex, clash).await.unwrap_err());

    assert_eq!(vec![beer], find_all_beers(&mut ex).await.unwrap());

    drop(ex);
    db.close().await;
}

async fn test_insert_duplicate_name(db: Arc<dyn Db + Send + Sync>) {
    let mut ex = setup_schema(&db).await;

    insert_beer(&mut ex, new_beer("first", 10, 5)).await.unwrap();
    assert_eq!(
        DbError::AlreadyExists,
        insert_beer(&mut ex, new_beer("first", 30, 1)).await.unwrap_err()
    );

    drop(ex);
    db.close().await;
}

async fn test_update(db: Arc<dyn Db + Send + Sync>) {
    let mut ex = setup_schema(&db).await;

    let beer1 = insert_beer(&mut ex, new_beer("first", 10, 5)).await.unwrap();
    let beer2 = insert_beer(&mut ex, new_beer("second", 10, 5)).await.unwrap();

    let beer1 = beer1.with_quantity(Quantity::from(8));
    update_beer(&mut ex, &beer1).await.unwrap();
    assert_eq!(vec![beer1, beer2], find_all_beers(&mut ex).await.unwrap());

    drop(ex);
    db.close().await;
}

async fn test_update_missing(db: Arc<dyn Db + Send + Sync>) {
    let mut ex = setup_schema(&db).await;

    let beer = new_beer("first", 10, 5).with_id(BeerId::new(3));
    assert_eq!(DbError::NotFound, update_beer(&mut ex, &beer).await.unwrap_err());
    assert!(find_all_beers(&mut ex).await.unwrap().is_empty());

    match update_beer(&mut ex, &new_beer("first", 10, 5)).await {
        Err(DbError::BackendError(e)) => assert!(e.contains("without an id")),
        e => panic!("{:?}", e),
    }

    drop(ex);
    db.close().await;
}

async fn test_find_by_name(db: Arc<dyn Db + Send + Sync>) {
    let mut ex = setup_schema(&db).await;

    let beer = insert_beer(&mut ex, new_beer("first", 10, 5)).await.unwrap();
    insert_beer(&mut ex, new_beer("second", 10, 5)).await.unwrap();

    assert_eq!(Some(beer), find_beer_by_name(&mut ex, &BeerName::from("first")).await.unwrap());
    assert_eq!(None, find_beer_by_name(&mut ex, &BeerName::from("FIRST")).await.unwrap());
    assert_eq!(None, find_beer_by_name(&mut ex, &BeerName::from("third")).await.unwrap());

    drop(ex);
    db.close().await;
}

async fn test_find_by_id(db: Arc<dyn Db + Send + Sync>) {
    let mut ex = setup_schema(&db).await;

    let beer = insert_beer(&mut ex, new_beer("first", 10, 5)).await.unwrap();
    let id = beer.id().unwrap();

    assert_eq!(Some(beer), find_beer_by_id(&mut ex, id).await.unwrap());
    assert_eq!(None, find_beer_by_id(&mut ex, BeerId::new(id.as_i64() + 1)).await.unwrap());

    drop(ex);
    db.close().await;
}

async fn test_find_all_sorted_by_id(db: Arc<dyn Db + Send + Sync>) {
    let mut ex = setup_schema(&db).await;

    assert!(find_all_beers(&mut ex).await.unwrap().is_empty());

    let beer3 = insert_beer(&mut ex, new_beer("c", 1, 1).with_id(BeerId::new(30))).await.unwrap();
    let beer1 = insert_beer(&mut ex, new_beer("a", 1, 1).with_id(BeerId::new(10))).await.unwrap();
    let beer2 = insert_beer(&mut ex, new_beer("b", 1, 1).with_id(BeerId::new(20))).await.unwrap();

    assert_eq!(vec![beer1, beer2, beer3], find_all_beers(&mut ex).await.unwrap());

    drop(ex);
    db.close().await;
}

async fn test_delete(db: Arc<dyn Db + Send + Sync>) {
    let mut ex = setup_schema(&db).await;

    let beer1 = insert_beer(&mut ex, new_beer("first", 10, 5)).await.unwrap();
    let beer2 = insert_beer(&mut ex, new_beer("second", 10, 5)).await.unwrap();
    let id1 = beer1.id().unwrap();

    delete_beer(&mut ex, id1).await.unwrap();
    assert_eq!(None, find_beer_by_id(&mut ex, id1).await.unwrap());
    assert_eq!(vec![beer2], find_all_beers(&mut ex).await.unwrap());

    assert_eq!(DbError::NotFound, delete_beer(&mut ex, id1).await.unwrap_err());

    drop(ex);
    db.close().await;
}

async fn test_tx_rollback_keeps_quantity(db: Arc<dyn Db + Send + Sync>) {
    let mut ex = setup_schema(&db).await;
    let beer = insert_beer(&mut ex, new_beer("first", 10, 5)).await.unwrap();
    let id = beer.id().unwrap();
    drop(ex);

    {
        let mut tx = db.begin().await.unwrap();
        let beer = find_beer_by_id(tx.ex(), id).await.unwrap().unwrap();
        update_beer(tx.ex(), &beer.with_quantity(Quantity::from(9))).await.unwrap();
    }

    let mut ex = db.ex().await.unwrap();
    assert_eq!(Some(beer), find_beer_by_id(&mut ex, id).await.unwrap());

    drop(ex);
    db.close().await;
}

async fn test_corrupted_beer_type(db: Arc<dyn Db + Send + Sync>) {
    let mut ex = setup_schema(&db).await;

    let query_str = "
        INSERT INTO beers (id, name, brand, beer_type, max_quantity, quantity)
        VALUES (1, 'first', 'brand', 'PILSEN', 10, 5)
    ";
    match &mut ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            sqlx::query(query_str).execute(ex.conn()).await.unwrap();
        }

        Executor::Sqlite(ex) => {
            sqlx::query(query_str).execute(ex.conn()).await.unwrap();
        }
    }

    match find_beer_by_id(&mut ex, BeerId::new(1)).await {
        Err(DbError::DataIntegrityError(e)) => assert!(e.contains("PILSEN")),
        e => panic!("{:?}", e),
    }

    drop(ex);
    db.close().await;
}

/// Wraps the shared test `$name` in a `#[tokio::test]` that runs it against `$setup`.
///
/// Must be expanded in a child of this module.  The `extra` attribute, if any, is added to the
/// generated test.
macro_rules! db_test [
    ( $name:ident, $setup:expr $(, #[$extra:meta] )? ) => {
        #[tokio::test]
        $( #[$extra] )?
        async fn $name() {
            super::$name($setup).await;
        }
    }
];

/// Instantiates all shared tests against the database returned by `setup`.
macro_rules! generate_db_tests [
    ( $setup:expr $(, #[$extra:meta] )? ) => {
        db_test!(test_insert_assigns_ids, $setup $(, #[$extra])?);
        db_test!(test_insert_with_id, $setup $(, #[$extra])?);
        db_test!(test_insert_with_non_positive_ids, $setup $(, #[$extra])?);
        db_test!(test_insert_with_lower_id_keeps_assigning_higher_ids, $setup $(, #[$extra])?);
        db_test!(test_insert_existing_id_does_not_overwrite, $setup $(, #[$extra])?);
        db_test!(test_insert_duplicate_name, $setup $(, #[$extra])?);
        db_test!(test_update, $setup $(, #[$extra])?);
        db_test!(test_update_missing, $setup $(, #[$extra])?);
        db_test!(test_find_by_name, $setup $(, #[$extra])?);
        db_test!(test_find_by_id, $setup $(, #[$extra])?);
        db_test!(test_find_all_sorted_by_id, $setup $(, #[$extra])?);
        db_test!(test_delete, $setup $(, #[$extra])?);
        db_test!(test_tx_rollback_keeps_quantity, $setup $(, #[$extra])?);
        db_test!(test_corrupted_beer_type, $setup $(, #[$extra])?);
    }
];

#[cfg(feature = "postgres")]
mod postgres {
    use super::*;
    use beerstock_core::db::postgres::testutils;

    generate_db_tests!(
        Arc::new(testutils::setup().await),
        #[ignore = "Requires environment configuration and is expensive"]
    );
}

mod sqlite {
    use super::*;
    use beerstock_core::db::sqlite::testutils;

    generate_db_tests!(Arc::new(testutils::setup().await));
}
