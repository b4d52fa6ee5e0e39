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

//! Entry point to the REST server.

use crate::driver::{Driver, DriverError};
use axum::Router;
use beerstock_core::rest::RestError;

mod beer_decrement_patch;
mod beer_delete;
mod beer_get;
mod beer_increment_patch;
mod beers_get;
mod beers_post;
#[cfg(test)]
mod testutils;

impl From<DriverError> for RestError {
    fn from(e: DriverError) -> Self {
        match e {
            DriverError::AlreadyRegistered(_) => RestError::InvalidRequest(e.to_string()),
            DriverError::BackendError(_) => RestError::InternalError(e.to_string()),
            DriverError::InvalidInput(_) => RestError::InvalidRequest(e.to_string()),
            DriverError::NotFound(_) => RestError::NotFound(e.to_string()),
            DriverError::StockDoesNotContain(_) => RestError::InvalidRequest(e.to_string()),
            DriverError::StockExceeded(_) => RestError::InvalidRequest(e.to_string()),
        }
    }
}

/// Creates the router for the application.
///
/// Routes that address a single beer share the same path pattern: lookups interpret the last
/// segment as a beer name while mutations interpret it as a beer identifier.
pub(crate) fn app(driver: Driver) -> Router {
    use axum::routing::{get, patch};
    Router::new()
        .route("/api/v1/beers", get(beers_get::handler).post(beers_post::handler))
        .route("/api/v1/beers/:beer", get(beer_get::handler).delete(beer_delete::handler))
        .route("/api/v1/beers/:beer/increment", patch(beer_increment_patch::handler))
        .route("/api/v1/beers/:beer/decrement", patch(beer_decrement_patch::handler))
        .with_state(driver)
}
