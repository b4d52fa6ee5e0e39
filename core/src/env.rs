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

//! Typed reads of the environment variables that configure the service.
//!
//! Related settings share a prefix, so `PGSQL_PROD_HOST` and `PGSQL_TEST_HOST` can point the
//! server and the tests at different databases.

use std::env::{self, VarError};
use std::fmt::Display;
use std::str::FromStr;

/// Problems found while reading the configuration from the environment.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum EnvError {
    /// A variable is set but its value does not parse as the requested type.
    #[error("Invalid value in environment variable {name}: {reason}")]
    Invalid {
        /// Full name of the variable.
        name: String,

        /// Why the value was rejected.
        reason: String,
    },

    /// A required variable is not set.
    #[error("Required environment variable {0} not present")]
    Missing(String),

    /// A variable is set to something that is not valid Unicode.
    #[error("Environment variable {0} is not valid Unicode")]
    NotUnicode(String),
}

/// Result type for this module.
pub type EnvResult<T> = Result<T, EnvError>;

/// Reads the variable `name` and parses it as a `T`, returning `None` if it is not set.
fn read_var<T>(name: String) -> EnvResult<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = match env::var(&name) {
        Ok(raw) => raw,
        Err(VarError::NotPresent) => return Ok(None),
        Err(VarError::NotUnicode(_)) => return Err(EnvError::NotUnicode(name)),
    };
    match raw.parse::<T>() {
        Ok(value) => Ok(Some(value)),
        Err(e) => Err(EnvError::Invalid { name, reason: e.to_string() }),
    }
}

/// Reads `<prefix>_<suffix>` as a `T`, returning `None` if it is not set.
pub fn get_optional_var<T>(prefix: &str, suffix: &str) -> EnvResult<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    read_var(format!("{}_{}", prefix, suffix))
}

/// Reads `<prefix>_<suffix>` as a `T`, failing if it is not set.
pub fn get_required_var<T>(prefix: &str, suffix: &str) -> EnvResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    let name = format!("{}_{}", prefix, suffix);
    match read_var(name.clone())? {
        Some(value) => Ok(value),
        None => Err(EnvError::Missing(name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;
    use std::net::{IpAddr, Ipv4Addr};
    use std::os::unix::ffi::OsStrExt;

    #[test]
    fn test_get_required_var_parses_types() {
        let vars = [
            ("CFG_NAME", Some("the name")),
            ("CFG_PORT", Some("5432")),
            ("CFG_ADDR", Some("10.0.0.1")),
        ];
        temp_env::with_vars(vars, || {
            assert_eq!("the name", get_required_var::<String>("CFG", "NAME").unwrap());
            assert_eq!(5432u16, get_required_var::<u16>("CFG", "PORT").unwrap());
            assert_eq!(
                IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)),
                get_required_var::<IpAddr>("CFG", "ADDR").unwrap()
            );
        });
    }

    #[test]
    fn test_get_required_var_missing() {
        temp_env::with_var_unset("CFG_MISSING", || {
            let err = get_required_var::<String>("CFG", "MISSING").unwrap_err();
            assert_eq!(EnvError::Missing("CFG_MISSING".to_owned()), err);
            assert_eq!("Required environment variable CFG_MISSING not present", err.to_string());
        });
    }

    #[test]
    fn test_get_required_var_not_unicode() {
        temp_env::with_var("CFG_BYTES", Some(OsStr::from_bytes(b"\xc3\x28")), || {
            assert_eq!(
                EnvError::NotUnicode("CFG_BYTES".to_owned()),
                get_required_var::<String>("CFG", "BYTES").unwrap_err()
            );
        });
    }

    #[test]
    fn test_get_optional_var() {
        temp_env::with_vars([("CFG_SET", Some("17")), ("CFG_UNSET", None)], || {
            assert_eq!(Some(17u32), get_optional_var::<u32>("CFG", "SET").unwrap());
            assert_eq!(None, get_optional_var::<u32>("CFG", "UNSET").unwrap());
        });
    }

    #[test]
    fn test_invalid_values_name_the_variable() {
        temp_env::with_vars([("CFG_NEGATIVE", Some("-5")), ("CFG_HOST", Some("10.0.0"))], || {
            match get_optional_var::<u32>("CFG", "NEGATIVE") {
                Err(EnvError::Invalid { name, .. }) => assert_eq!("CFG_NEGATIVE", name),
                e => panic!("{:?}", e),
            }

            let err = get_required_var::<IpAddr>("CFG", "HOST").unwrap_err();
            assert!(err.to_string().starts_with("Invalid value in environment variable CFG_HOST"));
        });
    }
}
