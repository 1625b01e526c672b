//! The authorization state machine.
//!
//! Drives a single interactive login: decide whether the instance needs app
//! registration, hand the user to the instance's authorize page in an
//! external browser, interpret the redirect back into the app, exchange the
//! code for an access token, and checkpoint every step so the flow survives
//! the process being torn down while the browser is in the foreground.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::api::{ApiClient, AUTHORIZE_PATH};
use crate::domain::Domain;
use crate::error::{AuthError, AuthResult};
use crate::redirect::{AuthorizationOutcome, RedirectUri};
use crate::store::{
	self, CredentialStore, KEY_ACCESS_TOKEN, KEY_CLIENT_ID, KEY_CLIENT_SECRET, KEY_DOMAIN,
};

/// Scope string requested from every instance.
pub const OAUTH_SCOPES: &str = "read write follow";

/// Static application metadata: what registration sends to the instance, and
/// where the instance redirects back to.
#[derive(Debug, Clone)]
pub struct AppConfig {
	/// Name the instance shows on its authorize screen.
	pub app_name: String,
	/// Website registered alongside the app.
	pub website: String,
	/// Scheme of the callback URI.
	pub oauth_scheme: String,
	/// Host of the callback URI.
	pub oauth_redirect_host: String,
	/// Requested scopes.
	pub scopes: String,
}

impl AppConfig {
	/// Config with the given callback scheme/host and the default scopes.
	pub fn new(app_name: &str, website: &str, oauth_scheme: &str, oauth_redirect_host: &str) -> Self {
		Self {
			app_name: app_name.to_string(),
			website: website.to_string(),
			oauth_scheme: oauth_scheme.to_string(),
			oauth_redirect_host: oauth_redirect_host.to_string(),
			scopes: OAUTH_SCOPES.to_string(),
		}
	}

	/// The callback URI the instance redirects back to.
	pub fn redirect_uri(&self) -> RedirectUri {
		RedirectUri::new(&self.oauth_scheme, &self.oauth_redirect_host)
	}
}

/// Capability to hand a URL to an external browser.
pub trait UrlOpener: Send + Sync {
	/// Open the URL; `false` when no handler is available.
	fn open_url(&self, url: &str) -> bool;
}

/// [`UrlOpener`] backed by the system default browser.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBrowser;

impl UrlOpener for SystemBrowser {
	fn open_url(&self, url: &str) -> bool {
		webbrowser::open(url).is_ok()
	}
}

/// Where the state machine currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
	/// No login attempt in flight.
	Idle,
	/// Registering this app with the instance.
	Registering,
	/// Browser handed off; waiting for the redirect back.
	AwaitingRedirect,
	/// Exchanging the authorization code for a token.
	Exchanging,
	/// Login complete.
	Authenticated,
}

/// In-flight snapshot: everything needed to finish the flow after the
/// process is restarted between browser handoff and redirect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
	/// The instance being logged into.
	pub domain: Domain,
	/// Client id registered for that instance.
	pub client_id: String,
	/// Client secret paired with the id.
	pub client_secret: String,
}

/// What a resume event amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeOutcome {
	/// A previous login is still valid; the caller should navigate straight
	/// to the authenticated destination.
	AlreadyAuthenticated,
	/// The event had nothing to do with the flow; ignore it.
	Unrelated,
	/// The flow just completed and the access token is persisted.
	Authenticated,
}

/// One interactive authorization-code flow.
///
/// Collaborators are injected at construction. The session keeps only
/// transient copies of in-flight state; the store checkpoint is
/// authoritative, and [`AuthorizationSession::on_resume`] reloads from it
/// because the in-memory session rarely survives the browser round trip.
pub struct AuthorizationSession {
	config: AppConfig,
	store: Arc<dyn CredentialStore>,
	api: Arc<dyn ApiClient>,
	browser: Arc<dyn UrlOpener>,
	phase: SessionPhase,
	current: Option<SessionState>,
}

impl AuthorizationSession {
	/// A fresh session in [`SessionPhase::Idle`].
	pub fn new(
		config: AppConfig,
		store: Arc<dyn CredentialStore>,
		api: Arc<dyn ApiClient>,
		browser: Arc<dyn UrlOpener>,
	) -> Self {
		Self {
			config,
			store,
			api,
			browser,
			phase: SessionPhase::Idle,
			current: None,
		}
	}

	/// Current phase, for callers that render progress.
	pub fn phase(&self) -> SessionPhase {
		self.phase
	}

	/// Begin (or retry) a login against the entered domain.
	///
	/// Cached client credentials for the domain skip registration entirely;
	/// otherwise the app registers itself and caches the returned pair. On
	/// success the browser has been opened and the flow is parked in
	/// [`SessionPhase::AwaitingRedirect`] until [`Self::on_resume`] sees the
	/// redirect. Every error leaves the session retryable.
	pub async fn start(&mut self, raw_domain: &str) -> AuthResult<()> {
		let domain = Domain::normalize(raw_domain);
		if domain.is_empty() {
			return Err(AuthError::InvalidDomain(raw_domain.trim().to_string()));
		}

		let cached_id = self.store.get(&store::client_id_key(&domain))?;
		let cached_secret = self.store.get(&store::client_secret_key(&domain))?;

		let (client_id, client_secret) = match (cached_id, cached_secret) {
			(Some(id), Some(secret)) => {
				debug!(domain = %domain, "using cached client credentials");
				(id, secret)
			}
			_ => {
				self.phase = SessionPhase::Registering;
				let creds = match self.register(&domain).await {
					Ok(creds) => creds,
					Err(e) => {
						warn!(domain = %domain, error = %e, "app registration failed");
						self.phase = SessionPhase::Idle;
						return Err(e);
					}
				};
				(creds.client_id, creds.client_secret)
			}
		};

		self.enter_awaiting(SessionState {
			domain,
			client_id,
			client_secret,
		})
	}

	/// Feed a foreground event into the flow.
	///
	/// Called unconditionally every time the app comes to the foreground,
	/// whether or not a redirect URI arrived with it. The already-logged-in
	/// check runs first, so a stale or replayed redirect can never restart a
	/// finished flow; a URI outside the callback prefix is an ordinary
	/// foreground event and a no-op.
	pub async fn on_resume(&mut self, incoming: Option<&str>) -> AuthResult<ResumeOutcome> {
		let logged_in = self.store.get(KEY_ACCESS_TOKEN)?.is_some()
			&& self.store.get(KEY_DOMAIN)?.is_some();
		if logged_in {
			debug!("already authenticated, skipping redirect handling");
			return Ok(ResumeOutcome::AlreadyAuthenticated);
		}

		let Some(uri) = incoming else {
			return Ok(ResumeOutcome::Unrelated);
		};
		if !self.config.redirect_uri().matches(uri) {
			return Ok(ResumeOutcome::Unrelated);
		}

		match AuthorizationOutcome::parse(uri) {
			AuthorizationOutcome::Code(code) => self.exchange(&code).await,
			AuthorizationOutcome::Denied(reason) => {
				warn!(reason = %reason, "authorization denied by the instance");
				self.phase = SessionPhase::Idle;
				Err(AuthError::AuthorizationDenied(reason))
			}
			AuthorizationOutcome::Malformed => {
				warn!("redirect carried neither code nor error");
				self.phase = SessionPhase::Idle;
				Err(AuthError::UnknownResponse)
			}
		}
	}

	/// Snapshot the in-flight state for host-managed suspension.
	pub fn save(&self) -> Option<SessionState> {
		self.current.clone()
	}

	/// Rehydrate from a snapshot taken by [`Self::save`].
	pub fn restore(&mut self, state: SessionState) {
		self.current = Some(state);
		self.phase = SessionPhase::AwaitingRedirect;
	}

	async fn register(&self, domain: &Domain) -> AuthResult<crate::api::AppCredentials> {
		info!(domain = %domain, "registering application with instance");
		let redirect_uri = self.config.redirect_uri();
		let creds = self
			.api
			.register_app(
				domain,
				&self.config.app_name,
				redirect_uri.as_str(),
				&self.config.scopes,
				&self.config.website,
			)
			.await?;

		let id_key = store::client_id_key(domain);
		let secret_key = store::client_secret_key(domain);
		self.store.put_many(&[
			(id_key.as_str(), creds.client_id.as_str()),
			(secret_key.as_str(), creds.client_secret.as_str()),
		])?;
		Ok(creds)
	}

	/// Checkpoint the in-flight state, then hand the authorize URL to the
	/// browser. The checkpoint goes first: the process frequently dies while
	/// the browser is in the foreground.
	fn enter_awaiting(&mut self, state: SessionState) -> AuthResult<()> {
		self.store.put_many(&[
			(KEY_DOMAIN, state.domain.as_str()),
			(KEY_CLIENT_ID, state.client_id.as_str()),
			(KEY_CLIENT_SECRET, state.client_secret.as_str()),
		])?;

		let url = self.authorize_url(&state);
		let domain = state.domain.clone();
		self.current = Some(state);

		if !self.browser.open_url(&url) {
			warn!(domain = %domain, "no browser available to open authorize URL");
			self.phase = SessionPhase::Idle;
			return Err(AuthError::NoBrowser);
		}

		info!(domain = %domain, "browser opened, awaiting redirect");
		self.phase = SessionPhase::AwaitingRedirect;
		Ok(())
	}

	/// Restore the checkpoint and trade the code for an access token.
	///
	/// The in-memory session is usually gone by the time the redirect comes
	/// back, so the store checkpoint is authoritative here, not an
	/// optimization.
	async fn exchange(&mut self, code: &str) -> AuthResult<ResumeOutcome> {
		self.phase = SessionPhase::Exchanging;
		let state = self.restore_checkpoint()?;
		info!(domain = %state.domain, "exchanging authorization code for access token");

		let redirect_uri = self.config.redirect_uri();
		let token = match self
			.api
			.obtain_token(
				&state.domain,
				&state.client_id,
				&state.client_secret,
				redirect_uri.as_str(),
				code,
			)
			.await
		{
			Ok(token) => token,
			Err(e) => {
				warn!(domain = %state.domain, error = %e, "token exchange failed");
				self.phase = SessionPhase::Idle;
				return Err(e);
			}
		};

		self.store.put_many(&[
			(KEY_DOMAIN, state.domain.as_str()),
			(KEY_ACCESS_TOKEN, token.access_token.as_str()),
		])?;
		info!(domain = %state.domain, "login complete");
		self.phase = SessionPhase::Authenticated;
		Ok(ResumeOutcome::Authenticated)
	}

	fn restore_checkpoint(&mut self) -> AuthResult<SessionState> {
		let domain = self.store.get(KEY_DOMAIN)?;
		let client_id = self.store.get(KEY_CLIENT_ID)?;
		let client_secret = self.store.get(KEY_CLIENT_SECRET)?;

		match (domain, client_id, client_secret) {
			(Some(domain), Some(client_id), Some(client_secret)) => {
				let state = SessionState {
					domain: Domain::normalize(&domain),
					client_id,
					client_secret,
				};
				self.current = Some(state.clone());
				Ok(state)
			}
			_ => {
				self.phase = SessionPhase::Idle;
				Err(AuthError::Storage(
					"no session checkpoint to resume from".into(),
				))
			}
		}
	}

	/// `https://<domain>/oauth/authorize` with percent-encoded query values.
	fn authorize_url(&self, state: &SessionState) -> String {
		let redirect_uri = self.config.redirect_uri();
		let params = [
			("client_id", state.client_id.as_str()),
			("redirect_uri", redirect_uri.as_str()),
			("response_type", "code"),
			("scope", self.config.scopes.as_str()),
		];

		let query = params
			.into_iter()
			.map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
			.collect::<Vec<_>>()
			.join("&");

		format!("https://{}{AUTHORIZE_PATH}?{query}", state.domain)
	}
}
