// SPDX-License-Identifier: GPL-3.0

//! Gateway endpoint resolution.
//!
//! Gateways are long-lived JSON-RPC endpoints served per network at a stable subdomain; no
//! provisioning call is needed to use one.

use crate::{Error, networks::Ecosystem};
use tenderly_client::credentials::{self, GATEWAY_ACCESS_KEY};
use url::Url;

/// Base domain of the gateway endpoints.
const GATEWAY_DOMAIN: &str = "gateway.tenderly.co";

/// Composes the gateway JSON-RPC URI for a network.
///
/// Pure composition, no network call: ethereum networks are served at their own name,
/// the primary network of any other ecosystem collapses to the ecosystem name, and every
/// remaining network is served at `{ecosystem}-{network}`. Fails before anything else when
/// the gateway access key is absent from the environment.
///
/// # Arguments
/// * `ecosystem` - The ecosystem of the target network.
/// * `network` - The network name.
pub fn gateway_rpc_uri(ecosystem: &Ecosystem, network: &str) -> Result<Url, Error> {
	let access_key = credentials::resolve(GATEWAY_ACCESS_KEY)?;
	let subdomain = match ecosystem {
		Ecosystem::Ethereum => network.to_string(),
		_ if network == ecosystem.default_network() => ecosystem.to_string(),
		_ => format!("{ecosystem}-{network}"),
	};
	Ok(Url::parse(&format!("https://{subdomain}.{GATEWAY_DOMAIN}/{access_key}"))?)
}
