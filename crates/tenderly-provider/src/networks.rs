// SPDX-License-Identifier: GPL-3.0

//! The networks this plugin declares endpoints for.
//!
//! Each network is addressed as `{ecosystem}:{network}` by the host environment. A network
//! can be targeted directly (served through the gateway, when offered) or as a fork target
//! named `{network}-fork`, which provisions an ephemeral sandbox of that network.

use strum::VariantArray as _;
use strum_macros::{AsRefStr, Display, EnumString, VariantArray};

/// Suffix distinguishing fork targets from the real network they are created from.
pub const FORK_SUFFIX: &str = "-fork";

/// An ecosystem with networks served through Tenderly.
#[derive(AsRefStr, Clone, Copy, Debug, Display, EnumString, Eq, PartialEq, VariantArray)]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
pub enum Ecosystem {
	/// Ethereum and its testnets.
	Ethereum,
	/// Polygon PoS.
	Polygon,
	/// Arbitrum One.
	Arbitrum,
	/// OP Mainnet.
	Optimism,
	/// Base.
	Base,
	/// Avalanche C-Chain.
	Avalanche,
	/// Fantom Opera.
	Fantom,
}

/// A network within an ecosystem.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Network {
	/// The network name, as used by the host environment.
	pub name: &'static str,
	/// The chain identifier reported by the network.
	pub chain_id: u64,
	/// Whether the service offers a shared gateway endpoint for the network.
	pub gateway: bool,
}

const ETHEREUM_NETWORKS: &[Network] = &[
	Network { name: "mainnet", chain_id: 1, gateway: true },
	Network { name: "sepolia", chain_id: 11_155_111, gateway: true },
];

const POLYGON_NETWORKS: &[Network] = &[
	Network { name: "mainnet", chain_id: 137, gateway: true },
	Network { name: "amoy", chain_id: 80_002, gateway: true },
];

const ARBITRUM_NETWORKS: &[Network] = &[
	Network { name: "mainnet", chain_id: 42_161, gateway: false },
	Network { name: "sepolia", chain_id: 421_614, gateway: false },
];

const OPTIMISM_NETWORKS: &[Network] = &[
	Network { name: "mainnet", chain_id: 10, gateway: true },
	Network { name: "sepolia", chain_id: 11_155_420, gateway: true },
];

const BASE_NETWORKS: &[Network] = &[
	Network { name: "mainnet", chain_id: 8453, gateway: true },
	Network { name: "sepolia", chain_id: 84_532, gateway: true },
];

const AVALANCHE_NETWORKS: &[Network] =
	&[Network { name: "mainnet", chain_id: 43_114, gateway: false }];

const FANTOM_NETWORKS: &[Network] = &[Network { name: "opera", chain_id: 250, gateway: false }];

impl Ecosystem {
	/// Returns the networks served for the ecosystem.
	pub fn networks(&self) -> &'static [Network] {
		match self {
			Ecosystem::Ethereum => ETHEREUM_NETWORKS,
			Ecosystem::Polygon => POLYGON_NETWORKS,
			Ecosystem::Arbitrum => ARBITRUM_NETWORKS,
			Ecosystem::Optimism => OPTIMISM_NETWORKS,
			Ecosystem::Base => BASE_NETWORKS,
			Ecosystem::Avalanche => AVALANCHE_NETWORKS,
			Ecosystem::Fantom => FANTOM_NETWORKS,
		}
	}

	/// The primary network of the ecosystem.
	pub fn default_network(&self) -> &'static str {
		match self {
			Ecosystem::Fantom => "opera",
			_ => "mainnet",
		}
	}

	/// Resolves the chain identifier of a network, accepting fork targets.
	///
	/// # Arguments
	/// * `network` - The network name; a fork suffix is stripped before lookup.
	pub fn chain_id(&self, network: &str) -> Option<u64> {
		let network = base_network(network);
		self.networks().iter().find(|n| n.name == network).map(|n| n.chain_id)
	}
}

/// Recovers the real network name behind a fork target.
///
/// # Arguments
/// * `network` - The network name, with or without the fork suffix.
pub fn base_network(network: &str) -> &str {
	network.strip_suffix(FORK_SUFFIX).unwrap_or(network)
}

/// The kind of endpoint a declared network is served by.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProviderKind {
	/// An ephemeral fork sandbox, provisioned per connection.
	Fork,
	/// A long-lived shared gateway endpoint.
	Gateway,
}

/// Every `(ecosystem, network, kind)` combination declared by the plugin, for consumption
/// by the host environment's registration mechanism.
///
/// Gateway-capable networks are declared twice: once as a gateway target and once as a
/// fork target named `{network}-fork`. Networks without gateway support are fork-only.
pub fn registrations() -> impl Iterator<Item = (Ecosystem, String, ProviderKind)> {
	Ecosystem::VARIANTS.iter().flat_map(|ecosystem| {
		ecosystem.networks().iter().flat_map(move |network| {
			let fork =
				(*ecosystem, format!("{}{FORK_SUFFIX}", network.name), ProviderKind::Fork);
			network
				.gateway
				.then(|| (*ecosystem, network.name.to_string(), ProviderKind::Gateway))
				.into_iter()
				.chain(std::iter::once(fork))
		})
	})
}
