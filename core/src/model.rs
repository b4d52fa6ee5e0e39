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

//! Generic types shared by the model layer of all services.
//!
//! Every service should define its own `model` module with the data types that represent concepts
//! in its domain.  Those types should validate their contents at construction time and report
//! problems via `ModelError` so that invalid values cannot exist past the boundaries of the app.

/// Model errors.  These indicate that a value does not satisfy the constraints of its type.
#[derive(Debug, PartialEq, thiserror::Error)]
#[error("{0}")]
pub struct ModelError(pub String);

/// Result type for this module.
pub type ModelResult<T> = Result<T, ModelError>;

/// Ensures that `s`, a value for the field `what`, has between 1 and `max_len` characters.
pub fn check_length(what: &str, s: &str, max_len: usize) -> ModelResult<()> {
    if s.is_empty() {
        return Err(ModelError(format!("{} cannot be empty", what)));
    }
    if s.chars().count() > max_len {
        return Err(ModelError(format!("{} cannot be longer than {} characters", what, max_len)));
    }
    Ok(())
}
