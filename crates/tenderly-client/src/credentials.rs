// SPDX-License-Identifier: GPL-3.0

//! Credentials for Tenderly services, resolved from the process environment.
//!
//! Each credential is independent: an access key can be present while a project name is
//! absent, and vice versa. Values are read on demand and treated as constants for the
//! process lifetime; there is no refresh.

use crate::Error;
use std::env;

/// Environment variable holding the access key for the fork-management API.
pub const ACCESS_KEY: &str = "TENDERLY_ACCESS_KEY";
/// Environment variable naming a pre-provisioned fork to attach to.
pub const FORK_ID: &str = "TENDERLY_FORK_ID";
/// Environment variable holding the access key for gateway JSON-RPC calls.
pub const GATEWAY_ACCESS_KEY: &str = "TENDERLY_GATEWAY_ACCESS_KEY";
/// Environment variable holding the project name scoping fork-management calls.
pub const PROJECT: &str = "TENDERLY_PROJECT";

/// Resolves a named credential from the process environment.
///
/// Empty values count as absent. Read-only: no caching beyond what the caller chooses.
///
/// # Arguments
/// * `name` - The environment variable expected to hold the credential.
pub fn resolve(name: &'static str) -> Result<String, Error> {
	match env::var(name) {
		Ok(value) if !value.is_empty() => Ok(value),
		_ => Err(Error::MissingCredential { name }),
	}
}
