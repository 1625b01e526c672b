//! Network operations against a Mastodon-compatible instance.
//!
//! Two one-shot calls: app registration (once per instance, the caller
//! caches the result) and the authorization-code/token exchange. Neither
//! retries and neither touches persistence.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::domain::Domain;
use crate::error::{AuthError, AuthResult};

/// Path for one-time app registration.
pub const APPS_PATH: &str = "/api/v1/apps";
/// Path for exchanging an authorization code.
pub const TOKEN_PATH: &str = "/oauth/token";
/// Path the user's browser is sent to.
pub const AUTHORIZE_PATH: &str = "/oauth/authorize";

const TIMEOUT: Duration = Duration::from_secs(15);

/// Application credentials returned by registration.
///
/// Created once per domain; immutable and cached indefinitely thereafter.
#[derive(Debug, Clone, Deserialize)]
pub struct AppCredentials {
	/// OAuth client id identifying this app to the instance.
	pub client_id: String,
	/// OAuth client secret paired with the id.
	pub client_secret: String,
}

/// Opaque bearer token returned by the token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessToken {
	/// The bearer string itself.
	pub access_token: String,
}

/// Network operations needed by the authorization flow.
#[async_trait]
pub trait ApiClient: Send + Sync {
	/// `POST /api/v1/apps`: obtain client credentials for this app.
	async fn register_app(
		&self,
		domain: &Domain,
		app_name: &str,
		redirect_uri: &str,
		scopes: &str,
		website: &str,
	) -> AuthResult<AppCredentials>;

	/// `POST /oauth/token`: exchange an authorization code for a token.
	async fn obtain_token(
		&self,
		domain: &Domain,
		client_id: &str,
		client_secret: &str,
		redirect_uri: &str,
		code: &str,
	) -> AuthResult<AccessToken>;
}

/// Validate the domain as a URL authority and return the instance base URL.
///
/// Surfaces [`AuthError::InvalidDomain`] before any network I/O is attempted.
pub fn instance_base(domain: &Domain) -> AuthResult<Url> {
	if domain.is_empty() {
		return Err(AuthError::InvalidDomain(domain.to_string()));
	}
	let url = Url::parse(&format!("https://{domain}/"))
		.map_err(|_| AuthError::InvalidDomain(domain.to_string()))?;
	// A path or other junk in the input shifts the authority; userinfo is
	// never part of a bare domain.
	if !url.authority().eq_ignore_ascii_case(domain.as_str())
		|| !url.username().is_empty()
		|| url.password().is_some()
	{
		return Err(AuthError::InvalidDomain(domain.to_string()));
	}
	Ok(url)
}

fn endpoint(domain: &Domain, path: &str) -> AuthResult<Url> {
	let base = instance_base(domain)?;
	base.join(path.trim_start_matches('/'))
		.map_err(|_| AuthError::InvalidDomain(domain.to_string()))
}

fn http_client() -> reqwest::Result<Client> {
	Client::builder()
		.connect_timeout(TIMEOUT)
		.timeout(TIMEOUT)
		.build()
}

/// reqwest-backed [`ApiClient`].
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpApiClient;

impl HttpApiClient {
	/// A client with the standard 15s transport timeouts.
	pub fn new() -> Self {
		Self
	}
}

#[async_trait]
impl ApiClient for HttpApiClient {
	async fn register_app(
		&self,
		domain: &Domain,
		app_name: &str,
		redirect_uri: &str,
		scopes: &str,
		website: &str,
	) -> AuthResult<AppCredentials> {
		let url = endpoint(domain, APPS_PATH)?;
		debug!(domain = %domain, "registering application");

		let client = http_client().map_err(|e| AuthError::Registration(e.to_string()))?;
		let response = client
			.post(url)
			.form(&[
				("client_name", app_name),
				("redirect_uris", redirect_uri),
				("scopes", scopes),
				("website", website),
			])
			.send()
			.await
			.map_err(|e| AuthError::Registration(e.to_string()))?;

		if !response.status().is_success() {
			return Err(AuthError::Registration(format!(
				"status {}",
				response.status()
			)));
		}

		response
			.json()
			.await
			.map_err(|e| AuthError::Registration(format!("invalid response: {e}")))
	}

	async fn obtain_token(
		&self,
		domain: &Domain,
		client_id: &str,
		client_secret: &str,
		redirect_uri: &str,
		code: &str,
	) -> AuthResult<AccessToken> {
		let url = endpoint(domain, TOKEN_PATH)?;
		debug!(domain = %domain, "exchanging authorization code");

		let client = http_client().map_err(|e| AuthError::TokenExchange(e.to_string()))?;
		let response = client
			.post(url)
			.form(&[
				("client_id", client_id),
				("client_secret", client_secret),
				("redirect_uri", redirect_uri),
				("code", code),
				("grant_type", "authorization_code"),
			])
			.send()
			.await
			.map_err(|e| AuthError::TokenExchange(e.to_string()))?;

		if !response.status().is_success() {
			return Err(AuthError::TokenExchange(format!(
				"status {}",
				response.status()
			)));
		}

		response
			.json()
			.await
			.map_err(|e| AuthError::TokenExchange(format!("invalid response: {e}")))
	}
}
