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

//! Operations on one beer.

use crate::db;
use crate::driver::{Driver, DriverError, DriverResult};
use crate::mapper::{to_dto, to_entity};
use crate::model::{Beer, BeerDto, BeerId, BeerName, Quantity};
use beerstock_core::db::TxExecutor;
use log::info;

/// Gets the beer identified by `id` within `tx`, locking it for the rest of the transaction.
async fn get_beer_for_update(tx: &mut TxExecutor, id: BeerId) -> DriverResult<Beer> {
    match db::find_beer_by_id(tx.ex(), id).await? {
        Some(beer) => Ok(beer),
        None => Err(DriverError::NotFound(format!("Beer with id {} not found in the system", id))),
    }
}

impl Driver {
    /// Registers a new beer described by `dto` and returns the stored version of it.
    pub(crate) async fn create_beer(self, dto: BeerDto) -> DriverResult<BeerDto> {
        if dto.quantity > dto.max {
            return Err(DriverError::InvalidInput(format!(
                "Quantity {} cannot exceed the max stock of {}",
                dto.quantity, dto.max
            )));
        }

        let mut tx = self.db.begin().await?;

        if db::find_beer_by_name(tx.ex(), &dto.name).await?.is_some() {
            return Err(DriverError::AlreadyRegistered(format!(
                "Beer with name {} already registered in the system",
                dto.name
            )));
        }
        if let Some(id) = dto.id {
            if db::find_beer_by_id(tx.ex(), id).await?.is_some() {
                return Err(DriverError::AlreadyRegistered(format!(
                    "Beer with id {} already registered in the system",
                    id
                )));
            }
        }

        let beer = db::insert_beer(tx.ex(), to_entity(dto)).await?;
        tx.commit().await?;

        let dto = to_dto(beer);
        if let Some(id) = dto.id {
            info!("Registered beer {} with id {}", dto.name, id);
        }
        Ok(dto)
    }

    /// Gets the beer named `name`.
    pub(crate) async fn find_by_name(self, name: BeerName) -> DriverResult<BeerDto> {
        let mut ex = self.db.ex().await?;
        match db::find_beer_by_name(&mut ex, &name).await? {
            Some(beer) => Ok(to_dto(beer)),
            None => Err(DriverError::NotFound(format!(
                "Beer with name {} not found in the system",
                name
            ))),
        }
    }

    /// Deletes the beer identified by `id`.
    pub(crate) async fn delete_by_id(self, id: BeerId) -> DriverResult<()> {
        let mut tx = self.db.begin().await?;
        get_beer_for_update(&mut tx, id).await?;
        db::delete_beer(tx.ex(), id).await?;
        tx.commit().await?;

        info!("Deleted beer with id {}", id);
        Ok(())
    }

    /// Adds `delta` units to the stock of the beer identified by `id`.
    pub(crate) async fn increment(self, id: BeerId, delta: Quantity) -> DriverResult<BeerDto> {
        let mut tx = self.db.begin().await?;
        let beer = get_beer_for_update(&mut tx, id).await?;

        let quantity = match beer.quantity().checked_add(delta) {
            Some(quantity) if quantity <= *beer.max() => quantity,
            _ => {
                return Err(DriverError::StockExceeded(format!(
                    "Beers with {} ID informed exceeds the max stock capacity: {}",
                    id, delta
                )));
            }
        };

        let beer = beer.with_quantity(quantity);
        db::update_beer(tx.ex(), &beer).await?;
        tx.commit().await?;

        info!("Incremented stock of beer with id {} by {} to {}", id, delta, quantity);
        Ok(to_dto(beer))
    }

    /// Removes `delta` units from the stock of the beer identified by `id`.
    pub(crate) async fn decrement(self, id: BeerId, delta: Quantity) -> DriverResult<BeerDto> {
        let mut tx = self.db.begin().await?;
        let beer = get_beer_for_update(&mut tx, id).await?;

        let quantity = match beer.quantity().checked_sub(delta) {
            Some(quantity) => quantity,
            None => {
                return Err(DriverError::StockDoesNotContain(format!(
                    "Beers with {} ID does not contain enough stock to decrement: {}",
                    id, delta
                )));
            }
        };

        let beer = beer.with_quantity(quantity);
        db::update_beer(tx.ex(), &beer).await?;
        tx.commit().await?;

        info!("Decremented stock of beer with id {} by {} to {}", id, delta, quantity);
        Ok(to_dto(beer))
    }
}
