//! Error types for the authorization flow.

use thiserror::Error;

/// Result alias for authorization operations.
pub type AuthResult<T> = Result<T, AuthError>;

/// Errors that can occur during the authorization-code flow.
///
/// Every variant is recoverable at the session boundary: the flow returns to
/// a retryable state, and each display string is a single human-readable
/// message suitable for rendering against the domain input field.
#[derive(Debug, Error)]
pub enum AuthError {
	/// The entered domain is not a syntactically valid authority.
	#[error("invalid domain: {0:?}")]
	InvalidDomain(String),

	/// App registration with the instance failed (HTTP or transport).
	#[error("app registration failed: {0}")]
	Registration(String),

	/// No handler is available to open an external URL.
	#[error("no web browser available to open the login page")]
	NoBrowser,

	/// The authorization server redirected back with an error.
	#[error("authorization denied: {0}")]
	AuthorizationDenied(String),

	/// The redirect matched our callback but carried neither code nor error.
	#[error("unknown response from the authorization server")]
	UnknownResponse,

	/// Exchanging the authorization code for a token failed.
	#[error("failed to retrieve an access token: {0}")]
	TokenExchange(String),

	/// The credential store failed or is missing required state.
	#[error("credential storage error: {0}")]
	Storage(String),
}
