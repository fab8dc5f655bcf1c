// SPDX-License-Identifier: GPL-3.0

//! Plugin settings, deserialized by the host environment from its own configuration.

use serde::Deserialize;

/// Chains that began under proof-of-authority and need compatible block decoding for their
/// historical blocks: OP Mainnet and its retired Goerli testnet, Polygon PoS and Mumbai.
const DEFAULT_POA_CHAIN_IDS: &[u64] = &[10, 420, 137, 80_001];

/// Settings controlling provider behavior.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct TenderlyConfig {
	/// Whether forks provisioned by this process are deleted at disconnect.
	pub auto_remove_forks: bool,
	/// Chain identifiers that require the proof-of-authority compatibility layer.
	///
	/// Held in configuration so newly supported chains can be added without touching the
	/// comparison logic.
	pub poa_chain_ids: Vec<u64>,
}

impl Default for TenderlyConfig {
	fn default() -> Self {
		Self { auto_remove_forks: true, poa_chain_ids: DEFAULT_POA_CHAIN_IDS.to_vec() }
	}
}
