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

//! Building blocks shared by the layers of the beer stock service.
//!
//! The service is split into `model`, `db`, `driver`, `rest` and `main` layers, each with its own
//! error type that converts into the one of the layer above via `?`.  This crate holds the parts
//! of those layers that do not know about beers:
//!
//! *   `model`: `ModelError` and the string validation helpers used by the domain newtypes.
//! *   `db`: the `Db` trait, the `Executor` that query functions match on, and the PostgreSQL
//!     and SQLite backends behind the `postgres` and `sqlite` features.
//! *   `rest`: `RestError`, the `EmptyBody` extractor and, behind the `testutils` feature, the
//!     helpers to drive a `Router` from tests.
//! *   `env`: typed reads of prefixed environment variables for `from_env` constructors.

// Keep these in sync with other top-level files.
#![warn(anonymous_parameters, bad_style, clippy::missing_docs_in_private_items, missing_docs)]
#![warn(unused, unused_extern_crates, unused_import_braces, unused_qualifications)]
#![warn(unsafe_code)]

pub mod db;
pub mod env;
pub mod model;
pub mod rest;
