// SPDX-License-Identifier: GPL-3.0

#![doc = include_str!("../README.md")]

/// Authenticated access to the fork-management API.
pub mod client;
/// Resolution of credentials from the process environment.
pub mod credentials;
mod errors;
/// The fork resource model.
pub mod fork;
/// Minimal JSON-RPC calls against provisioned endpoints.
pub mod rpc;

pub use client::TenderlyClient;
pub use errors::Error;
pub use fork::{Fork, ForkDetails};

pub(crate) static APP_USER_AGENT: &str =
	concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
