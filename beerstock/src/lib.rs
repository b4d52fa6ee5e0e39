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

//! Inventory service for a catalog of beers.
//!
//! The service keeps track of how many units of each beer are in stock and lets clients adjust
//! those counts within the bounds of each beer's maximum capacity.

// Keep these in sync with other top-level files.
#![warn(anonymous_parameters, bad_style, clippy::missing_docs_in_private_items, missing_docs)]
#![warn(unused, unused_extern_crates, unused_import_braces, unused_qualifications)]
#![warn(unsafe_code)]

use beerstock_core::db::Db;
use beerstock_core::env::{EnvResult, get_optional_var};
use log::info;
use std::error::Error;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

pub mod db;
pub mod driver;
use driver::Driver;
mod mapper;
pub mod model;
mod rest;
use rest::app;

/// Default port to listen on when none is configured.
const DEFAULT_PORT: u16 = 3000;

/// Configuration options for the HTTP server.
#[derive(Debug)]
#[cfg_attr(test, derive(PartialEq))]
pub struct ServerOptions {
    /// Address to bind to.
    pub address: IpAddr,

    /// Port to listen on.
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self { address: IpAddr::V4(Ipv4Addr::LOCALHOST), port: DEFAULT_PORT }
    }
}

impl ServerOptions {
    /// Initializes a set of options from environment variables whose name is prefixed with the
    /// given `prefix`.
    ///
    /// This will use variables such as `<prefix>_ADDRESS` and `<prefix>_PORT`, both of which are
    /// optional.
    pub fn from_env(prefix: &str) -> EnvResult<Self> {
        let defaults = Self::default();
        Ok(Self {
            address: get_optional_var(prefix, "ADDRESS")?.unwrap_or(defaults.address),
            port: get_optional_var(prefix, "PORT")?.unwrap_or(defaults.port),
        })
    }

    /// Returns the socket address to bind to.
    fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }
}

/// Instantiates all resources to serve the application and starts serving it until the server
/// terminates.
///
/// The `db` is expected to have been initialized with the service schema already.
pub async fn serve(
    opts: ServerOptions,
    db: Arc<dyn Db + Send + Sync>,
) -> Result<(), Box<dyn Error>> {
    let driver = Driver::new(db.clone());
    let app = app(driver);

    let listener = tokio::net::TcpListener::bind(opts.socket_addr()).await?;
    info!("Listening on {}", listener.local_addr()?);
    let result = axum::serve(listener, app).await;

    db.close().await;
    Ok(result?)
}
