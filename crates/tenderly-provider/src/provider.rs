// SPDX-License-Identifier: GPL-3.0

//! Provider lifecycle for fork, gateway and pre-provisioned fork endpoints.

use crate::{
	Error, TenderlyConfig,
	cleanup::{CleanupRegistry, CleanupToken},
	gateway::gateway_rpc_uri,
	networks::{Ecosystem, FORK_SUFFIX, base_network},
};
use tenderly_client::{Fork, TenderlyClient, credentials, rpc};
use url::Url;

/// Base domain of pre-provisioned fork endpoints.
const FORK_RPC_DOMAIN: &str = "rpc.tenderly.co";

/// A JSON-RPC endpoint ready for use by a web3 client.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Endpoint {
	/// The JSON-RPC URI.
	pub uri: Url,
	/// Whether proof-of-authority compatible block decoding must be layered onto the
	/// client connecting to this endpoint.
	pub requires_poa_middleware: bool,
}

/// Connection state of a provider.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
enum State {
	/// No endpoint has been requested yet.
	#[default]
	Unconnected,
	/// An endpoint is live and cached.
	Connected,
	/// The endpoint has been released.
	Disconnected,
}

/// The endpoint providers offered by this plugin, selected by network configuration.
pub enum Provider {
	/// An ephemeral sandbox, provisioned on connect and deleted on disconnect.
	Fork(ForkProvider),
	/// A long-lived shared endpoint, used without per-session provisioning.
	Gateway(GatewayProvider),
	/// A sandbox provisioned out-of-band and named by the environment.
	ExistingFork(ExistingForkProvider),
}

impl Provider {
	/// Creates the provider declared for a network: fork targets (`{network}-fork`)
	/// provision an ephemeral sandbox, anything else is served through the gateway.
	///
	/// # Arguments
	/// * `ecosystem` - The ecosystem of the target network.
	/// * `network` - The network name, as configured by the host.
	/// * `config` - The plugin settings.
	pub fn for_network(
		ecosystem: Ecosystem,
		network: impl Into<String>,
		config: TenderlyConfig,
	) -> Self {
		let network = network.into();
		if network.ends_with(FORK_SUFFIX) {
			Provider::Fork(ForkProvider::new(ecosystem, network, config))
		} else {
			Provider::Gateway(GatewayProvider::new(ecosystem, network, config))
		}
	}

	/// Creates the provider attaching to a fork provisioned out-of-band.
	pub fn existing_fork() -> Self {
		Provider::ExistingFork(ExistingForkProvider::new())
	}

	/// Establishes the endpoint.
	pub async fn connect(&mut self) -> Result<(), Error> {
		match self {
			Provider::Fork(provider) => provider.connect().await,
			Provider::Gateway(provider) => provider.connect().await,
			Provider::ExistingFork(provider) => provider.connect(),
		}
	}

	/// Releases the endpoint. Never fails: cleanup problems are logged, not raised.
	pub async fn disconnect(&mut self) {
		match self {
			Provider::Fork(provider) => provider.disconnect().await,
			Provider::Gateway(provider) => provider.disconnect(),
			Provider::ExistingFork(provider) => provider.disconnect(),
		}
	}

	/// The endpoint in use.
	pub fn endpoint(&self) -> Result<&Endpoint, Error> {
		match self {
			Provider::Fork(provider) => provider.endpoint(),
			Provider::Gateway(provider) => provider.endpoint(),
			Provider::ExistingFork(provider) => provider.endpoint(),
		}
	}

	/// The JSON-RPC URI of the endpoint in use.
	pub fn uri(&self) -> Result<&Url, Error> {
		self.endpoint().map(|endpoint| &endpoint.uri)
	}
}

/// Provides an ephemeral fork sandbox, owned exclusively by this instance.
///
/// At most one fork is live per instance: repeated connects reuse the cached fork, and a
/// connect after disconnect provisions a fresh fork rather than resurrecting the old one.
pub struct ForkProvider {
	ecosystem: Ecosystem,
	network: String,
	config: TenderlyConfig,
	client: Option<TenderlyClient>,
	/// The provisioned fork. Populated once by a successful connect and cleared again at
	/// disconnect, forcing the next connect to provision afresh.
	fork: Option<Fork>,
	endpoint: Option<Endpoint>,
	cleanup: Option<CleanupToken>,
	registry: &'static CleanupRegistry,
	state: State,
}

impl ForkProvider {
	/// Creates an unconnected fork provider resolving its credentials from the
	/// environment on first connect.
	///
	/// # Arguments
	/// * `ecosystem` - The ecosystem of the target network.
	/// * `network` - The fork target, e.g. `mainnet-fork`.
	/// * `config` - The plugin settings.
	pub fn new(ecosystem: Ecosystem, network: impl Into<String>, config: TenderlyConfig) -> Self {
		Self {
			ecosystem,
			network: network.into(),
			config,
			client: None,
			fork: None,
			endpoint: None,
			cleanup: None,
			registry: CleanupRegistry::global(),
			state: State::default(),
		}
	}

	/// Creates a fork provider backed by an explicit client, e.g. for a dedicated API
	/// deployment.
	///
	/// # Arguments
	/// * `ecosystem` - The ecosystem of the target network.
	/// * `network` - The fork target, e.g. `mainnet-fork`.
	/// * `config` - The plugin settings.
	/// * `client` - The client to provision through.
	pub fn with_client(
		ecosystem: Ecosystem,
		network: impl Into<String>,
		config: TenderlyConfig,
		client: TenderlyClient,
	) -> Self {
		Self { client: Some(client), ..Self::new(ecosystem, network, config) }
	}

	#[cfg(test)]
	fn with_registry(mut self, registry: &'static CleanupRegistry) -> Self {
		self.registry = registry;
		self
	}

	/// Provisions the fork and caches its endpoint.
	///
	/// Connecting while already connected is a no-op, so exactly one fork is created per
	/// connection. Failures are surfaced unretried; the caller decides whether to attempt
	/// the whole connect again.
	pub async fn connect(&mut self) -> Result<(), Error> {
		if self.state == State::Connected {
			return Ok(());
		}

		let network = base_network(&self.network);
		let chain_id = self.ecosystem.chain_id(network).ok_or_else(|| Error::UnknownNetwork {
			ecosystem: self.ecosystem,
			network: network.to_string(),
		})?;

		let client = match self.client.take() {
			Some(client) => client,
			None => TenderlyClient::new()?,
		};
		log::debug!("creating fork for '{}:{network}'...", self.ecosystem);
		let created = client.create_fork(chain_id).await;
		let cleanup_client = client.clone();
		self.client = Some(client);
		let fork = created?;
		log::info!("created fork '{}'", fork.id);

		self.endpoint = Some(Endpoint {
			uri: Url::parse(&fork.json_rpc_url)?,
			requires_poa_middleware: false,
		});
		// Covers the host never disconnecting explicitly: whatever is still registered
		// when the host shuts down deletes its fork then.
		if self.config.auto_remove_forks {
			self.cleanup = Some(register_cleanup(self.registry, cleanup_client, &fork));
		}
		self.fork = Some(fork);
		self.state = State::Connected;
		Ok(())
	}

	/// The endpoint of the provisioned fork.
	pub fn endpoint(&self) -> Result<&Endpoint, Error> {
		self.endpoint.as_ref().ok_or(Error::NotConnected)
	}

	/// The provisioned fork, while connected.
	pub fn fork(&self) -> Option<&Fork> {
		self.fork.as_ref()
	}

	/// Releases the fork.
	///
	/// Never fails: a cleanup problem is logged and swallowed so that releasing an
	/// endpoint cannot block the host's shutdown path. Guarded on state, not on the
	/// cached fork, so a repeated disconnect performs no second delete.
	pub async fn disconnect(&mut self) {
		if self.state != State::Connected {
			return;
		}
		self.state = State::Disconnected;
		if let Some(token) = self.cleanup.take() {
			self.registry.deregister(token);
		}
		let fork = self.fork.take();
		self.endpoint = None;

		let (Some(fork), Some(client)) = (fork, self.client.as_ref()) else {
			return;
		};
		if !self.config.auto_remove_forks {
			log::info!("not removing fork '{}'", fork.id);
			return;
		}
		log::debug!("removing fork '{}'...", fork.id);
		match client.delete_fork(&fork.id).await {
			Ok(()) => log::info!("removed fork '{}'", fork.id),
			Err(e) => log::error!("couldn't remove fork '{}': {e}", fork.id),
		}
	}
}

// Registers a best-effort closure deleting the fork at process shutdown.
fn register_cleanup(
	registry: &CleanupRegistry,
	client: TenderlyClient,
	fork: &Fork,
) -> CleanupToken {
	let fork_id = fork.id.clone();
	registry.register(move || {
		Box::pin(async move {
			if let Err(e) = client.delete_fork(&fork_id).await {
				log::error!("couldn't remove fork '{fork_id}': {e}");
			}
		})
	})
}

/// Provides the long-lived gateway endpoint of a real network.
pub struct GatewayProvider {
	ecosystem: Ecosystem,
	network: String,
	config: TenderlyConfig,
	endpoint: Option<Endpoint>,
	state: State,
	#[cfg(test)]
	uri_override: Option<Url>,
}

impl GatewayProvider {
	/// Creates an unconnected gateway provider.
	///
	/// # Arguments
	/// * `ecosystem` - The ecosystem of the target network.
	/// * `network` - The network name.
	/// * `config` - The plugin settings.
	pub fn new(ecosystem: Ecosystem, network: impl Into<String>, config: TenderlyConfig) -> Self {
		Self {
			ecosystem,
			network: network.into(),
			config,
			endpoint: None,
			state: State::default(),
			#[cfg(test)]
			uri_override: None,
		}
	}

	/// Resolves the gateway URI and probes the chain.
	///
	/// One `eth_chainId` call decides whether the endpoint needs the proof-of-authority
	/// compatibility layer; a failing probe is a fatal connect error.
	pub async fn connect(&mut self) -> Result<(), Error> {
		if self.state == State::Connected {
			return Ok(());
		}
		let uri = self.resolve_uri()?;
		let chain_id = rpc::chain_id(&uri).await?;
		// Chains that began under proof-of-authority still need compatible decoding for
		// their historical blocks, whatever consensus they run today.
		let requires_poa_middleware = self.config.poa_chain_ids.contains(&chain_id);
		log::debug!("connected to chain {chain_id} (poa middleware: {requires_poa_middleware})");
		self.endpoint = Some(Endpoint { uri, requires_poa_middleware });
		self.state = State::Connected;
		Ok(())
	}

	fn resolve_uri(&self) -> Result<Url, Error> {
		#[cfg(test)]
		if let Some(uri) = &self.uri_override {
			return Ok(uri.clone());
		}
		gateway_rpc_uri(&self.ecosystem, &self.network)
	}

	/// The gateway endpoint.
	pub fn endpoint(&self) -> Result<&Endpoint, Error> {
		self.endpoint.as_ref().ok_or(Error::NotConnected)
	}

	/// Releases the endpoint. Gateways provision nothing, so nothing is deleted.
	pub fn disconnect(&mut self) {
		if self.state != State::Connected {
			return;
		}
		self.endpoint = None;
		self.state = State::Disconnected;
	}
}

/// Attaches to a fork provisioned out-of-band, named by the `TENDERLY_FORK_ID`
/// environment variable.
pub struct ExistingForkProvider {
	endpoint: Option<Endpoint>,
	state: State,
}

impl ExistingForkProvider {
	/// Creates an unconnected provider.
	pub fn new() -> Self {
		Self { endpoint: None, state: State::default() }
	}

	/// Resolves the fork identifier and composes its endpoint.
	///
	/// A missing identifier is a fatal, named credential error.
	pub fn connect(&mut self) -> Result<(), Error> {
		if self.state == State::Connected {
			return Ok(());
		}
		let fork_id = credentials::resolve(credentials::FORK_ID)?;
		self.endpoint = Some(Endpoint {
			uri: Url::parse(&format!("https://{FORK_RPC_DOMAIN}/fork/{fork_id}"))?,
			requires_poa_middleware: false,
		});
		self.state = State::Connected;
		Ok(())
	}

	/// The endpoint of the attached fork.
	pub fn endpoint(&self) -> Result<&Endpoint, Error> {
		self.endpoint.as_ref().ok_or(Error::NotConnected)
	}

	/// Detaches from the fork; the fork itself is left untouched.
	pub fn disconnect(&mut self) {
		if self.state != State::Connected {
			return;
		}
		self.endpoint = None;
		self.state = State::Disconnected;
	}
}

impl Default for ExistingForkProvider {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use mockito::{Mock, Server, ServerGuard};
	use serde_json::json;
	use tenderly_client::Error as ClientError;

	const FORK_URL: &str = "https://rpc.tenderly.co/fork/f1";

	fn fork_provider(server: &ServerGuard, config: TenderlyConfig) -> ForkProvider {
		ForkProvider::with_client(
			Ecosystem::Ethereum,
			"mainnet-fork",
			config,
			TenderlyClient::from_parts(server.url(), "<ACCESS_KEY>"),
		)
	}

	async fn mock_create(server: &mut ServerGuard, hits: usize) -> Mock {
		server
			.mock("POST", "/forks")
			.with_status(200)
			.with_header("Content-Type", "application/json")
			.with_body(
				json!({
					"fork": {
						"id": "f1",
						"network_id": 1,
						"block_number": 100,
						"json_rpc_url": FORK_URL,
					}
				})
				.to_string(),
			)
			.expect(hits)
			.create_async()
			.await
	}

	async fn mock_delete(server: &mut ServerGuard, hits: usize) -> Mock {
		server.mock("DELETE", "/forks/f1").with_status(204).expect(hits).create_async().await
	}

	#[tokio::test]
	async fn connect_is_idempotent() -> anyhow::Result<()> {
		let mut server = Server::new_async().await;
		let create = mock_create(&mut server, 1).await;

		let mut provider = fork_provider(&server, TenderlyConfig::default());
		provider.connect().await?;
		provider.connect().await?;
		assert_eq!(provider.endpoint()?.uri.as_str(), FORK_URL);
		assert_eq!(provider.fork().map(|fork| fork.id.as_str()), Some("f1"));
		create.assert_async().await;
		Ok(())
	}

	#[tokio::test]
	async fn uri_before_connect_fails() {
		let server = Server::new_async().await;
		let provider = fork_provider(&server, TenderlyConfig::default());
		assert!(matches!(provider.endpoint(), Err(Error::NotConnected)));
	}

	#[tokio::test]
	async fn disconnect_removes_the_fork_once() -> anyhow::Result<()> {
		let _ = env_logger::builder().is_test(true).try_init();
		let mut server = Server::new_async().await;
		let create = mock_create(&mut server, 1).await;
		let delete = mock_delete(&mut server, 1).await;

		let mut provider = fork_provider(&server, TenderlyConfig::default());
		provider.connect().await?;
		provider.disconnect().await;
		// Guarded on state: no second delete.
		provider.disconnect().await;
		assert!(matches!(provider.endpoint(), Err(Error::NotConnected)));
		create.assert_async().await;
		delete.assert_async().await;
		Ok(())
	}

	#[tokio::test]
	async fn disconnect_leaves_the_fork_when_auto_remove_is_disabled() -> anyhow::Result<()> {
		let mut server = Server::new_async().await;
		let create = mock_create(&mut server, 1).await;
		let delete = mock_delete(&mut server, 0).await;

		let config = TenderlyConfig { auto_remove_forks: false, ..Default::default() };
		let mut provider = fork_provider(&server, config);
		provider.connect().await?;
		provider.disconnect().await;
		create.assert_async().await;
		delete.assert_async().await;
		Ok(())
	}

	#[tokio::test]
	async fn disconnect_swallows_cleanup_failures() -> anyhow::Result<()> {
		let mut server = Server::new_async().await;
		let create = mock_create(&mut server, 1).await;
		let delete = server.mock("DELETE", "/forks/f1").with_status(500).create_async().await;

		let mut provider = fork_provider(&server, TenderlyConfig::default());
		provider.connect().await?;
		provider.disconnect().await;
		assert!(matches!(provider.endpoint(), Err(Error::NotConnected)));
		create.assert_async().await;
		delete.assert_async().await;
		Ok(())
	}

	#[tokio::test]
	async fn connect_after_disconnect_provisions_a_fresh_fork() -> anyhow::Result<()> {
		let mut server = Server::new_async().await;
		let create = mock_create(&mut server, 2).await;
		let delete = mock_delete(&mut server, 1).await;

		let mut provider = fork_provider(&server, TenderlyConfig::default());
		provider.connect().await?;
		provider.disconnect().await;
		provider.connect().await?;
		assert_eq!(provider.endpoint()?.uri.as_str(), FORK_URL);
		create.assert_async().await;
		delete.assert_async().await;
		Ok(())
	}

	#[tokio::test]
	async fn unknown_network_fails_without_provisioning() -> anyhow::Result<()> {
		let mut server = Server::new_async().await;
		let create = mock_create(&mut server, 0).await;

		let mut provider = ForkProvider::with_client(
			Ecosystem::Ethereum,
			"goerli-fork",
			TenderlyConfig::default(),
			TenderlyClient::from_parts(server.url(), "<ACCESS_KEY>"),
		);
		assert!(matches!(
			provider.connect().await,
			Err(Error::UnknownNetwork { ecosystem: Ecosystem::Ethereum, network }) if network == "goerli"
		));
		create.assert_async().await;
		Ok(())
	}

	#[tokio::test]
	async fn abandoned_forks_are_removed_at_shutdown() -> anyhow::Result<()> {
		let mut server = Server::new_async().await;
		let create = mock_create(&mut server, 1).await;
		let delete = mock_delete(&mut server, 1).await;
		let registry: &'static CleanupRegistry = Box::leak(Box::new(CleanupRegistry::new()));

		let mut provider = fork_provider(&server, TenderlyConfig::default()).with_registry(registry);
		provider.connect().await?;
		// The host forgets to disconnect and shuts down through the registry.
		drop(provider);
		registry.run().await;
		create.assert_async().await;
		delete.assert_async().await;
		Ok(())
	}

	#[tokio::test]
	async fn explicit_disconnect_deregisters_the_shutdown_cleanup() -> anyhow::Result<()> {
		let mut server = Server::new_async().await;
		let create = mock_create(&mut server, 1).await;
		let delete = mock_delete(&mut server, 1).await;
		let registry: &'static CleanupRegistry = Box::leak(Box::new(CleanupRegistry::new()));

		let mut provider = fork_provider(&server, TenderlyConfig::default()).with_registry(registry);
		provider.connect().await?;
		provider.disconnect().await;
		// Only the explicit disconnect deleted; the registry has nothing left to do.
		registry.run().await;
		create.assert_async().await;
		delete.assert_async().await;
		Ok(())
	}

	fn gateway_provider(server: &ServerGuard, config: TenderlyConfig) -> GatewayProvider {
		let mut provider = GatewayProvider::new(Ecosystem::Polygon, "mainnet", config);
		provider.uri_override = Some(server.url().parse().unwrap());
		provider
	}

	async fn mock_chain_id(server: &mut ServerGuard, chain_id: u64) -> Mock {
		server
			.mock("POST", "/")
			.with_status(200)
			.with_header("Content-Type", "application/json")
			.with_body(
				json!({ "jsonrpc": "2.0", "id": 0, "result": format!("{chain_id:#x}") })
					.to_string(),
			)
			.create_async()
			.await
	}

	#[tokio::test]
	async fn gateway_flags_poa_chains() -> anyhow::Result<()> {
		let mut server = Server::new_async().await;
		let mock = mock_chain_id(&mut server, 137).await;

		let mut provider = gateway_provider(&server, TenderlyConfig::default());
		provider.connect().await?;
		assert!(provider.endpoint()?.requires_poa_middleware);
		mock.assert_async().await;
		Ok(())
	}

	#[tokio::test]
	async fn gateway_skips_poa_for_other_chains() -> anyhow::Result<()> {
		let mut server = Server::new_async().await;
		let mock = mock_chain_id(&mut server, 1).await;

		let mut provider = gateway_provider(&server, TenderlyConfig::default());
		provider.connect().await?;
		assert!(!provider.endpoint()?.requires_poa_middleware);
		mock.assert_async().await;
		Ok(())
	}

	#[tokio::test]
	async fn gateway_poa_set_is_configurable() -> anyhow::Result<()> {
		let mut server = Server::new_async().await;
		let mock = mock_chain_id(&mut server, 99).await;

		let config = TenderlyConfig { poa_chain_ids: vec![99], ..Default::default() };
		let mut provider = gateway_provider(&server, config);
		provider.connect().await?;
		assert!(provider.endpoint()?.requires_poa_middleware);
		mock.assert_async().await;
		Ok(())
	}

	#[tokio::test]
	async fn failing_probe_is_a_fatal_connect_error() -> anyhow::Result<()> {
		let mut server = Server::new_async().await;
		let mock = server.mock("POST", "/").with_status(503).create_async().await;

		let mut provider = gateway_provider(&server, TenderlyConfig::default());
		assert!(matches!(
			provider.connect().await,
			Err(Error::Client(ClientError::Api { status: 503, .. }))
		));
		assert!(matches!(provider.endpoint(), Err(Error::NotConnected)));
		mock.assert_async().await;
		Ok(())
	}

	#[tokio::test]
	async fn gateway_disconnect_drops_the_endpoint() -> anyhow::Result<()> {
		let mut server = Server::new_async().await;
		let _mock = mock_chain_id(&mut server, 1).await;

		let mut provider = gateway_provider(&server, TenderlyConfig::default());
		provider.connect().await?;
		provider.disconnect();
		assert!(matches!(provider.endpoint(), Err(Error::NotConnected)));
		Ok(())
	}

	#[test]
	fn existing_fork_resolves_from_the_environment() {
		temp_env::with_var(credentials::FORK_ID, Some("123abc"), || {
			let mut provider = ExistingForkProvider::new();
			provider.connect().unwrap();
			assert_eq!(
				provider.endpoint().unwrap().uri.as_str(),
				"https://rpc.tenderly.co/fork/123abc"
			);
		});
	}

	#[test]
	fn existing_fork_requires_the_identifier() {
		temp_env::with_var_unset(credentials::FORK_ID, || {
			let mut provider = ExistingForkProvider::new();
			assert!(matches!(
				provider.connect(),
				Err(Error::Client(ClientError::MissingCredential { name }))
					if name == credentials::FORK_ID
			));
			assert!(matches!(provider.endpoint(), Err(Error::NotConnected)));
		});
	}

	#[test]
	fn fork_targets_select_the_fork_provider() {
		let config = TenderlyConfig::default();
		assert!(matches!(
			Provider::for_network(Ecosystem::Ethereum, "mainnet-fork", config.clone()),
			Provider::Fork(_)
		));
		assert!(matches!(
			Provider::for_network(Ecosystem::Ethereum, "mainnet", config),
			Provider::Gateway(_)
		));
	}
}
