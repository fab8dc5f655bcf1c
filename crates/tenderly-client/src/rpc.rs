// SPDX-License-Identifier: GPL-3.0

//! Minimal JSON-RPC calls against provisioned endpoints.

use crate::{APP_USER_AGENT, Error};
use serde_json::{Value, json};
use url::Url;

/// Queries the chain identifier reported by a JSON-RPC endpoint.
///
/// Issues a single `eth_chainId` call; the transport is attempted exactly once and any
/// failure is surfaced to the caller.
///
/// # Arguments
/// * `uri` - The JSON-RPC endpoint to query.
pub async fn chain_id(uri: &Url) -> Result<u64, Error> {
	let payload = json!({
		"jsonrpc": "2.0",
		"id": 0,
		"method": "eth_chainId",
		"params": [],
	});
	let response = reqwest::Client::new()
		.post(uri.clone())
		.header(reqwest::header::USER_AGENT, APP_USER_AGENT)
		.json(&payload)
		.send()
		.await
		.map_err(Error::Transport)?;
	let status = response.status();
	if !status.is_success() {
		let body = response.text().await.unwrap_or_default();
		return Err(Error::Api { status: status.as_u16(), body });
	}
	let status = status.as_u16();
	let body = response.text().await.map_err(Error::Transport)?;
	// The chain identifier is reported as a hex string, e.g. "0x1".
	let result: Value = serde_json::from_str(&body).unwrap_or_default();
	match result.get("result").and_then(Value::as_str) {
		Some(id) => u64::from_str_radix(id.trim_start_matches("0x"), 16)
			.map_err(|_| Error::Api { status, body }),
		None => Err(Error::Api { status, body }),
	}
}
