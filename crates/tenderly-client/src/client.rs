// SPDX-License-Identifier: GPL-3.0

//! Authenticated client for the fork-management API.

use crate::{
	APP_USER_AGENT, Error,
	credentials::{self, ACCESS_KEY, PROJECT},
	fork::{CreateForkRequest, CreateForkResponse, Fork},
};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

/// Header carrying the fork-management access key.
const ACCESS_KEY_HEADER: &str = "X-Access-Key";
/// Base domain of the fork-management API.
const API_DOMAIN: &str = "api.tenderly.co";

/// API client for managing the forks of a Tenderly project.
///
/// Every call is a single attempt: there are no internal retries, and timeouts belong to
/// the underlying transport.
#[derive(Clone)]
pub struct TenderlyClient {
	/// Access key used for authentication.
	access_key: String,
	/// The base URL of the project.
	base_url: String,
	/// HTTP client used for making API requests.
	client: Client,
}

impl TenderlyClient {
	/// Creates a new client from credentials in the process environment.
	///
	/// Fails with [`Error::MissingCredential`] before any request is made when the access
	/// key or project name is absent.
	pub fn new() -> Result<Self, Error> {
		let access_key = credentials::resolve(ACCESS_KEY)?;
		let project = credentials::resolve(PROJECT)?;
		Ok(Self::from_parts(format!("https://{API_DOMAIN}/api/v2/project/{project}"), access_key))
	}

	/// Creates a new client against an explicit API base URL, e.g. a dedicated deployment.
	///
	/// # Arguments
	/// * `base_url` - The project base URL, e.g. `https://api.tenderly.co/api/v2/project/dev`.
	/// * `access_key` - The access key used for authentication.
	pub fn from_parts(base_url: impl Into<String>, access_key: impl Into<String>) -> Self {
		Self { access_key: access_key.into(), base_url: base_url.into(), client: Client::new() }
	}

	/// Lists the forks currently provisioned for the project.
	///
	/// A project without forks yields an empty list, not an error.
	pub async fn forks(&self) -> Result<Vec<Fork>, Error> {
		let response = self.send(self.client.get(format!("{}/forks", self.base_url))).await?;
		Ok(Self::parse::<Option<Vec<Fork>>>(response).await?.unwrap_or_default())
	}

	/// Provisions a new fork of the given network.
	///
	/// Every call creates a new fork on the service; creation is not idempotent and must
	/// not be blindly retried.
	///
	/// # Arguments
	/// * `chain_id` - Chain identifier of the network to fork.
	pub async fn create_fork(&self, chain_id: u64) -> Result<Fork, Error> {
		log::debug!("creating fork of chain {chain_id}...");
		let request = self
			.client
			.post(format!("{}/forks", self.base_url))
			.json(&CreateForkRequest::new(chain_id));
		let response = self.send(request).await?;
		let fork = Self::parse::<CreateForkResponse>(response).await?.fork;
		log::debug!("created fork '{}' at block #{}", fork.id, fork.block_number);
		Ok(fork)
	}

	/// Deletes a provisioned fork.
	///
	/// Deleting a fork that no longer exists is rejected by the service and surfaces as
	/// [`Error::Api`]; the caller decides whether that matters.
	///
	/// # Arguments
	/// * `fork_id` - Identifier of the fork to delete.
	pub async fn delete_fork(&self, fork_id: &str) -> Result<(), Error> {
		log::debug!("deleting fork '{fork_id}'...");
		self.send(self.client.delete(format!("{}/forks/{fork_id}", self.base_url))).await?;
		Ok(())
	}

	// Attaches authentication and sends, distinguishing an unreachable service from a
	// rejected request.
	async fn send(&self, request: RequestBuilder) -> Result<Response, Error> {
		let response = request
			.header(ACCESS_KEY_HEADER, &self.access_key)
			.header(reqwest::header::USER_AGENT, APP_USER_AGENT)
			.send()
			.await
			.map_err(Error::Transport)?;
		let status = response.status();
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			return Err(Error::Api { status: status.as_u16(), body });
		}
		Ok(response)
	}

	// Parses a successful response body, reporting unexpected shapes as API errors.
	async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, Error> {
		let status = response.status().as_u16();
		let body = response.text().await.map_err(Error::Transport)?;
		serde_json::from_str(&body).map_err(|_| Error::Api { status, body })
	}
}
