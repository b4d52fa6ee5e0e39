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

//! Operations on the whole catalog of beers.

use crate::db;
use crate::driver::{Driver, DriverResult};
use crate::mapper::to_dto;
use crate::model::BeerDto;

impl Driver {
    /// Gets all beers sorted by their identifier.
    pub(crate) async fn list_all(self) -> DriverResult<Vec<BeerDto>> {
        let beers = db::find_all_beers(&mut self.db.ex().await?).await?;
        Ok(beers.into_iter().map(to_dto).collect())
    }
}
