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

//! Test utilities for the business layer.

use crate::db;
use crate::driver::Driver;
use crate::model::{Beer, BeerId, BeerName, BeerType, Brand, Quantity};
use beerstock_core::db::{Db, Executor};
use std::sync::Arc;

/// State of a running test.
pub(crate) struct TestContext {
    /// The database backing the driver.
    db: Arc<dyn Db + Send + Sync>,

    /// The driver under test.
    driver: Driver,
}

impl TestContext {
    /// Initializes the driver using an in-memory database.
    pub(crate) async fn setup() -> Self {
        let db: Arc<dyn Db + Send + Sync> =
            Arc::new(beerstock_core::db::sqlite::testutils::setup().await);
        db::init_schema(&mut db.ex().await.unwrap()).await.unwrap();
        let driver = Driver::new(db.clone());
        Self { db, driver }
    }

    /// Gets a direct executor against the database.
    pub(crate) async fn ex(&self) -> Executor {
        self.db.ex().await.unwrap()
    }

    /// Gets a copy of the driver in this test context.
    pub(crate) fn driver(&self) -> Driver {
        self.driver.clone()
    }

    /// Stores a new beer named `name` directly in the database and returns it.
    pub(crate) async fn insert_beer(&self, name: &'static str, max: u16, quantity: u16) -> Beer {
        let beer = Beer::new(
            None,
            BeerName::from(name),
            Brand::from("Ambev"),
            BeerType::Lager,
            Quantity::from(max),
            Quantity::from(quantity),
        );
        db::insert_beer(&mut self.ex().await, beer).await.unwrap()
    }

    /// Gets the beer identified by `id` directly from the database.
    pub(crate) async fn get_beer(&self, id: BeerId) -> Option<Beer> {
        db::find_beer_by_id(&mut self.ex().await, id).await.unwrap()
    }

    /// Gets all beers directly from the database.
    pub(crate) async fn all_beers(&self) -> Vec<Beer> {
        db::find_all_beers(&mut self.ex().await).await.unwrap()
    }
}
