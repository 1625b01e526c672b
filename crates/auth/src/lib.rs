//! OAuth2 authorization-code login for Mastodon-compatible instances.
//!
//! Given a user-entered server domain this crate registers the application
//! with that instance (once, cached per domain), sends the user to the
//! instance's authorize page in an external browser, interprets the redirect
//! back into the app, exchanges the authorization code for an access token,
//! and persists the result so later launches skip the whole flow.
//!
//! # Flow
//!
//! 1. Normalize the entered domain
//! 2. Reuse cached client credentials, or `POST /api/v1/apps` and cache them
//! 3. Checkpoint `{domain, client id, client secret}` to the store
//! 4. Open the browser at `/oauth/authorize`
//! 5. (the process may die here)
//! 6. On resume, match the incoming URI against the callback prefix
//! 7. Restore the checkpoint and `POST /oauth/token` with the code
//! 8. Persist `{domain, access token}` — the "logged in" record
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use pinion_auth::{
//! 	AppConfig, AuthorizationSession, FileStore, HttpApiClient, ResumeOutcome, SystemBrowser,
//! };
//!
//! let config = AppConfig::new("Pinion", "https://pinion.example", "pinion", "oauth");
//! let store = Arc::new(FileStore::new(FileStore::default_path()?));
//! let mut session = AuthorizationSession::new(
//! 	config,
//! 	store,
//! 	Arc::new(HttpApiClient::new()),
//! 	Arc::new(SystemBrowser),
//! );
//!
//! session.start("mastodon.social").await?;
//! // ... browser round trip; the process may be restarted here ...
//! match session.on_resume(Some("pinion://oauth/?code=...")).await? {
//! 	ResumeOutcome::Authenticated | ResumeOutcome::AlreadyAuthenticated => {
//! 		// navigate to the signed-in surface
//! 	}
//! 	ResumeOutcome::Unrelated => {}
//! }
//! ```

#![warn(missing_docs)]

mod api;
mod domain;
mod error;
mod migrate;
mod redirect;
mod session;
mod store;

pub use api::AccessToken;
pub use api::ApiClient;
pub use api::AppCredentials;
pub use api::HttpApiClient;
pub use api::instance_base;
pub use domain::Domain;
pub use error::AuthError;
pub use error::AuthResult;
pub use migrate::REDIRECT_FORMAT_VERSION;
pub use migrate::run_migrations;
pub use redirect::AuthorizationOutcome;
pub use redirect::RedirectUri;
pub use session::AppConfig;
pub use session::AuthorizationSession;
pub use session::OAUTH_SCOPES;
pub use session::ResumeOutcome;
pub use session::SessionPhase;
pub use session::SessionState;
pub use session::SystemBrowser;
pub use session::UrlOpener;
pub use store::CredentialStore;
pub use store::FileStore;
pub use store::KEY_ACCESS_TOKEN;
pub use store::KEY_CLIENT_ID;
pub use store::KEY_CLIENT_SECRET;
pub use store::KEY_DOMAIN;
pub use store::MemoryStore;
pub use store::client_id_key;
pub use store::client_secret_key;
