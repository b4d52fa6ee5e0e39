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

//! Test utilities for the REST API.

use crate::driver::testutils::TestContext as DriverTestContext;
use crate::model::{Beer, BeerId};
use crate::rest::app;
use axum::Router;

/// State of a running test.
pub(crate) struct TestContext {
    /// Context of the business layer backing the app.
    context: DriverTestContext,

    /// The router for the app under test.
    app: Router,
}

impl TestContext {
    /// Initializes the app using an in-memory database.
    pub(crate) async fn setup() -> Self {
        let context = DriverTestContext::setup().await;
        let app = app(context.driver());
        Self { context, app }
    }

    /// Gets a copy of the router for the app under test.
    pub(crate) fn app(&self) -> Router {
        self.app.clone()
    }

    /// Consumes the context and returns the router for the app under test.
    pub(crate) fn into_app(self) -> Router {
        self.app
    }

    /// Stores a new beer named `name` directly in the database and returns it.
    pub(crate) async fn insert_beer(&self, name: &'static str, max: u16, quantity: u16) -> Beer {
        self.context.insert_beer(name, max, quantity).await
    }

    /// Gets the beer identified by `id` directly from the database.
    pub(crate) async fn get_beer(&self, id: BeerId) -> Option<Beer> {
        self.context.get_beer(id).await
    }

    /// Gets all beers directly from the database.
    pub(crate) async fn all_beers(&self) -> Vec<Beer> {
        self.context.all_beers().await
    }
}
