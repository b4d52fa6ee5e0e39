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

//! Conversions between the transport and persistence representations of a beer.

use crate::model::{Beer, BeerDto};

/// Converts a transport object into a persistable entity.
pub(crate) fn to_entity(dto: BeerDto) -> Beer {
    Beer::new(dto.id, dto.name, dto.brand, dto.beer_type, dto.max, dto.quantity)
}

/// Converts a persisted entity into its transport representation.
pub(crate) fn to_dto(beer: Beer) -> BeerDto {
    BeerDto {
        id: *beer.id(),
        name: beer.name().clone(),
        brand: beer.brand().clone(),
        beer_type: *beer.beer_type(),
        max: *beer.max(),
        quantity: *beer.quantity(),
    }
}
