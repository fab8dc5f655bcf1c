// SPDX-License-Identifier: GPL-3.0

use thiserror::Error;

/// An error returned when provisioning or querying Tenderly resources.
#[derive(Error, Debug)]
pub enum Error {
	/// The service was reachable but rejected the request, or responded with a payload of an
	/// unexpected shape.
	#[error("request failed with status {status}: {body}")]
	Api {
		/// The HTTP status code of the response.
		status: u16,
		/// The raw response body.
		body: String,
	},
	/// A required credential was absent from the process environment.
	#[error("no value found for `{name}` in the environment")]
	MissingCredential {
		/// The environment variable expected to hold the credential.
		name: &'static str,
	},
	/// The service could not be reached at all.
	#[error("could not reach the service: {0}")]
	Transport(#[source] reqwest::Error),
}
