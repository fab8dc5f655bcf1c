// SPDX-License-Identifier: GPL-3.0

//! The fork resource model used by the fork-management API.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Prefix used when naming newly provisioned forks.
pub(crate) const FORK_NAME_PREFIX: &str = "dev-fork-";
/// Description attached to newly provisioned forks.
pub(crate) const FORK_DESCRIPTION: &str = "Automatically provisioned development fork";

/// A provisioned remote sandbox, forked from a live network.
///
/// Every field is assigned by the service at creation and never changes for the lifetime
/// of the fork.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Fork {
	/// Opaque identifier assigned by the service.
	pub id: String,
	/// Chain identifier of the network this fork was created from.
	pub network_id: u64,
	/// Block height at which the fork was taken.
	pub block_number: u64,
	/// Additional fork details reported by the service.
	#[serde(default)]
	pub details: ForkDetails,
	/// JSON-RPC endpoint of the sandbox.
	pub json_rpc_url: String,
	/// Opaque configuration passed through from the service.
	#[serde(default)]
	pub config: Map<String, Value>,
}

/// Chain configuration details reported for a fork.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct ForkDetails {
	/// Opaque chain configuration of the forked network.
	#[serde(default)]
	pub chain_config: Map<String, Value>,
}

/// Request payload for provisioning a new fork.
#[derive(Debug, Serialize)]
pub(crate) struct CreateForkRequest {
	/// A generated name, derived from the chain id to avoid collisions.
	pub(crate) name: String,
	/// Human-readable description shown in the service dashboard.
	pub(crate) description: String,
	/// Chain identifier of the network to fork, as a string per the API contract.
	pub(crate) network_id: String,
}

impl CreateForkRequest {
	pub(crate) fn new(chain_id: u64) -> Self {
		Self {
			name: format!("{FORK_NAME_PREFIX}{chain_id}"),
			description: FORK_DESCRIPTION.into(),
			network_id: chain_id.to_string(),
		}
	}
}

/// Response payload of the fork-provisioning call.
#[derive(Debug, Deserialize)]
pub(crate) struct CreateForkResponse {
	pub(crate) fork: Fork,
}
