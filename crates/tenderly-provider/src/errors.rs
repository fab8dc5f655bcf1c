// SPDX-License-Identifier: GPL-3.0

use crate::networks::Ecosystem;
use thiserror::Error;

/// An error raised while providing an endpoint.
#[derive(Error, Debug)]
pub enum Error {
	/// An error from the underlying service client.
	#[error("client error: {0}")]
	Client(#[from] tenderly_client::Error),
	/// No endpoint is live: `connect` has not completed, or the provider was disconnected.
	#[error("provider is not connected")]
	NotConnected,
	/// A composed endpoint URI was not valid.
	#[error("ParseError error: {0}")]
	ParseError(#[from] url::ParseError),
	/// No chain identifier is registered for the network.
	#[error("no chain id known for '{ecosystem}:{network}'")]
	UnknownNetwork {
		/// The ecosystem the lookup was made in.
		ecosystem: Ecosystem,
		/// The network name that failed to resolve.
		network: String,
	},
}
