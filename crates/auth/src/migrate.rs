//! One-time startup migrations over the credential store.
//!
//! Runs once at startup, before any session is constructed. The session
//! itself never participates: it tolerates an empty store at any point.

use tracing::info;

use crate::error::AuthResult;
use crate::store::CredentialStore;

const KEY_LAST_UPDATE: &str = "lastUpdate";

/// Version at which the callback URI swapped its scheme and host. Client
/// id/secret pairs registered before it carry the old redirect URI and are
/// unusable, so crossing this version forces re-registration everywhere.
pub const REDIRECT_FORMAT_VERSION: u32 = 14;

/// Apply any pending store migrations, then stamp the current version.
pub fn run_migrations(store: &dyn CredentialStore, current_version: u32) -> AuthResult<()> {
	let last = store
		.get(KEY_LAST_UPDATE)?
		.and_then(|v| v.parse::<u32>().ok())
		.unwrap_or(0);

	if last == current_version {
		return Ok(());
	}

	if last < REDIRECT_FORMAT_VERSION && current_version >= REDIRECT_FORMAT_VERSION {
		info!(
			from = last,
			to = current_version,
			"clearing stored credentials for callback format change",
		);
		store.clear_all()?;
	}

	store.put(KEY_LAST_UPDATE, &current_version.to_string())
}
