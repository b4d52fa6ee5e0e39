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

//! High-level data types.

use beerstock_core::model::{ModelError, ModelResult, check_length};
use derive_getters::Getters;
use derive_more::{AsRef, Constructor, Display};
use serde::de::Visitor;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of the textual fields of a beer as specified in the schema.
pub(crate) const MAX_TEXT_LENGTH: usize = 200;

/// Identifier of a beer record.
#[derive(Clone, Constructor, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
#[serde(transparent)]
pub struct BeerId(i64);

impl BeerId {
    /// Returns the raw value of the identifier.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

/// Generates a newtype that wraps a non-empty string of bounded length.
macro_rules! bounded_string [
    ( $name:ident, $what:expr, $doc:expr ) => {
        #[doc = $doc]
        #[derive(AsRef, Clone, Debug, Display, Eq, PartialEq, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new value from an untrusted string `s`, making sure it is valid.
            pub fn new<S: Into<String>>(s: S) -> ModelResult<Self> {
                let s = s.into();
                check_length($what, &s, MAX_TEXT_LENGTH)?;
                Ok(Self(s))
            }

            /// Returns a string view of the value.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        #[cfg(test)]
        impl From<&'static str> for $name {
            /// Creates a new value from a hardcoded string, which must be valid.
            fn from(s: &'static str) -> Self {
                $name::new(s).expect("Hardcoded values must be valid")
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                deserializer.deserialize_string(BoundedStringVisitor(|s: String| $name::new(s)))
            }
        }
    };
];

bounded_string!(BeerName, "Beer name", "Name of a beer, which is unique across the catalog.");
bounded_string!(Brand, "Brand", "Brand that produces a beer.");

/// A deserialization visitor for strings that must pass through a validating constructor.
struct BoundedStringVisitor<F>(F);

impl<T, F> Visitor<'_> for BoundedStringVisitor<F>
where
    F: FnOnce(String) -> ModelResult<T>,
{
    type Value = T;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a string")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        (self.0)(v.to_owned()).map_err(|e| E::custom(e.to_string()))
    }

    fn visit_string<E>(self, v: String) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        (self.0)(v).map_err(|e| E::custom(e.to_string()))
    }
}

/// Style of a beer.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BeerType {
    /// Lager.
    Lager,

    /// Malzbier.
    Malzbier,

    /// Witbier.
    Witbier,

    /// Weissbier.
    Weiss,

    /// Ale.
    Ale,

    /// India pale ale.
    Ipa,

    /// Stout.
    Stout,
}

impl BeerType {
    /// Returns the canonical name of the beer type as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            BeerType::Lager => "LAGER",
            BeerType::Malzbier => "MALZBIER",
            BeerType::Witbier => "WITBIER",
            BeerType::Weiss => "WEISS",
            BeerType::Ale => "ALE",
            BeerType::Ipa => "IPA",
            BeerType::Stout => "STOUT",
        }
    }

    /// Parses a beer type from its canonical name.
    pub fn parse(s: &str) -> ModelResult<Self> {
        match s {
            "LAGER" => Ok(BeerType::Lager),
            "MALZBIER" => Ok(BeerType::Malzbier),
            "WITBIER" => Ok(BeerType::Witbier),
            "WEISS" => Ok(BeerType::Weiss),
            "ALE" => Ok(BeerType::Ale),
            "IPA" => Ok(BeerType::Ipa),
            "STOUT" => Ok(BeerType::Stout),
            s => Err(ModelError(format!("Unknown beer type '{}'", s))),
        }
    }
}

/// A stock count.  We store this as an u32 but guarantee that it is usable in an i32 context
/// because the PostgreSQL database backend needs it.
#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(try_from = "u32")]
pub struct Quantity(u32);

impl Quantity {
    /// Creates a quantity from a `u32` with range validation.
    pub fn new(quantity: u32) -> ModelResult<Self> {
        match i32::try_from(quantity) {
            Ok(_) => Ok(Self(quantity)),
            Err(e) => {
                Err(ModelError(format!("Quantity {} cannot be represented: {}", quantity, e)))
            }
        }
    }

    /// Creates a quantity from an `i32` with range validation.
    pub fn from_i32(quantity: i32) -> ModelResult<Self> {
        match u32::try_from(quantity) {
            Ok(quantity) => Ok(Self(quantity)),
            Err(e) => {
                Err(ModelError(format!("Quantity {} cannot be represented: {}", quantity, e)))
            }
        }
    }

    /// Returns the quantity as an `i32`.
    pub fn as_i32(&self) -> i32 {
        // Cannot fail because `new` and `from_i32` keep the value within the i32 range.
        self.0 as i32
    }

    /// Returns the quantity as a `u32`.
    pub fn as_u32(&self) -> u32 {
        self.0
    }

    /// Adds `other` to this quantity, returning `None` if the result cannot be represented.
    pub fn checked_add(self, other: Quantity) -> Option<Quantity> {
        self.0.checked_add(other.0).and_then(|sum| Quantity::new(sum).ok())
    }

    /// Subtracts `other` from this quantity, returning `None` if the result would be negative.
    pub fn checked_sub(self, other: Quantity) -> Option<Quantity> {
        self.0.checked_sub(other.0).map(Quantity)
    }
}

impl TryFrom<u32> for Quantity {
    type Error = ModelError;

    fn try_from(value: u32) -> ModelResult<Self> {
        Quantity::new(value)
    }
}

#[cfg(test)]
impl From<u16> for Quantity {
    fn from(value: u16) -> Self {
        Quantity(u32::from(value))
    }
}

/// A beer record as persisted in the database.
#[derive(Clone, Constructor, Debug, Getters, PartialEq)]
pub struct Beer {
    /// Identifier of the record, or `None` if the record has not been saved yet.
    id: Option<BeerId>,

    /// Unique name of the beer.
    name: BeerName,

    /// Brand that produces the beer.
    brand: Brand,

    /// Style of the beer.
    beer_type: BeerType,

    /// Maximum number of units that may be in stock.
    max: Quantity,

    /// Number of units currently in stock.
    quantity: Quantity,
}

impl Beer {
    /// Replaces the identifier of the record.
    pub fn with_id(mut self, id: BeerId) -> Self {
        self.id = Some(id);
        self
    }

    /// Replaces the stock count of the record.
    pub fn with_quantity(mut self, quantity: Quantity) -> Self {
        self.quantity = quantity;
        self
    }
}

/// Transport representation of a beer.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct BeerDto {
    /// Identifier of the record.  Optional on creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<BeerId>,

    /// Unique name of the beer.
    pub name: BeerName,

    /// Brand that produces the beer.
    pub brand: Brand,

    /// Style of the beer.
    #[serde(rename = "type")]
    pub beer_type: BeerType,

    /// Maximum number of units that may be in stock.
    pub max: Quantity,

    /// Number of units currently in stock.
    pub quantity: Quantity,
}

/// Body of the requests that adjust the stock of a beer.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct QuantityDto {
    /// Number of units to add or remove.
    pub quantity: Quantity,
}
