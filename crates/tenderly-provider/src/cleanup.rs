// SPDX-License-Identifier: GPL-3.0

//! Best-effort cleanup at process shutdown.
//!
//! Forks provisioned by this process should be deleted even when the host never calls
//! `disconnect`. Providers register a cleanup closure here on a successful connect and
//! deregister it again on explicit disconnect; whatever remains is run by the host as part
//! of its own shutdown sequence, via [`CleanupRegistry::run`] on the global instance.

use futures::future::BoxFuture;
use once_cell::sync::Lazy;
use std::sync::{
	Mutex, MutexGuard, PoisonError,
	atomic::{AtomicU64, Ordering},
};

/// The process-wide registry instance.
static GLOBAL: Lazy<CleanupRegistry> = Lazy::new(CleanupRegistry::new);

type CleanupFn = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

/// Identifies a registered cleanup closure so it can be deregistered.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CleanupToken(u64);

/// A registry of independent cleanup closures, run once at process shutdown.
///
/// Closures are independent and order-insensitive: cleaning up one fork never depends on
/// another having run first.
pub struct CleanupRegistry {
	next_token: AtomicU64,
	tasks: Mutex<Vec<(CleanupToken, CleanupFn)>>,
}

impl CleanupRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self { next_token: AtomicU64::new(0), tasks: Mutex::new(Vec::new()) }
	}

	/// Returns the process-wide registry.
	pub fn global() -> &'static CleanupRegistry {
		&GLOBAL
	}

	/// Registers a cleanup closure, returning a token for later deregistration.
	///
	/// # Arguments
	/// * `task` - The closure to run at shutdown, unless deregistered first.
	pub fn register(
		&self,
		task: impl FnOnce() -> BoxFuture<'static, ()> + Send + 'static,
	) -> CleanupToken {
		let token = CleanupToken(self.next_token.fetch_add(1, Ordering::Relaxed));
		self.tasks().push((token, Box::new(task)));
		token
	}

	/// Removes a previously registered closure without running it.
	///
	/// # Arguments
	/// * `token` - The token returned when the closure was registered.
	pub fn deregister(&self, token: CleanupToken) {
		self.tasks().retain(|(t, _)| *t != token);
	}

	/// Runs every remaining closure and empties the registry.
	///
	/// Failure handling is the closure's own responsibility; nothing is reported back and
	/// neighboring closures always run.
	pub async fn run(&self) {
		let tasks = std::mem::take(&mut *self.tasks());
		for (token, task) in tasks {
			log::debug!("running shutdown cleanup {token:?}");
			task().await;
		}
	}

	fn tasks(&self) -> MutexGuard<'_, Vec<(CleanupToken, CleanupFn)>> {
		self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
	}
}

impl Default for CleanupRegistry {
	fn default() -> Self {
		Self::new()
	}
}
