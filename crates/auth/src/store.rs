//! Persistent key-value storage for credentials and session checkpoints.
//!
//! One flat string-keyed namespace holds three kinds of record:
//!
//! - `"<domain>/client_id"`, `"<domain>/client_secret"` — the per-domain app
//!   credential cache, written once per instance and reused forever
//! - `"domain"`, `"clientId"`, `"clientSecret"` — the in-flight session
//!   checkpoint, written before control leaves for the browser
//! - `"domain"`, `"accessToken"` — the authenticated record; the `domain` key
//!   intentionally collides with the checkpoint, and success overwrites it
//!   with the same value

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::debug;

use crate::domain::Domain;
use crate::error::{AuthError, AuthResult};

/// Checkpoint key for the in-flight (later: authenticated) domain.
pub const KEY_DOMAIN: &str = "domain";
/// Checkpoint key for the app's client id.
pub const KEY_CLIENT_ID: &str = "clientId";
/// Checkpoint key for the app's client secret.
pub const KEY_CLIENT_SECRET: &str = "clientSecret";
/// Key holding the bearer token once authenticated.
pub const KEY_ACCESS_TOKEN: &str = "accessToken";

/// Cache key for a domain's registered client id.
pub fn client_id_key(domain: &Domain) -> String {
	format!("{domain}/client_id")
}

/// Cache key for a domain's registered client secret.
pub fn client_secret_key(domain: &Domain) -> String {
	format!("{domain}/client_secret")
}

/// Durable string-keyed storage for client credentials and session state.
///
/// Writes must survive process termination. Operations are atomic per key;
/// nothing spans multiple keys, so callers only trust a record once every key
/// of it is present.
pub trait CredentialStore: Send + Sync {
	/// Fetch a stored value.
	fn get(&self, key: &str) -> AuthResult<Option<String>>;

	/// Store a single value, replacing any previous one.
	fn put(&self, key: &str, value: &str) -> AuthResult<()>;

	/// Store several values. Not transactional.
	fn put_many(&self, entries: &[(&str, &str)]) -> AuthResult<()>;

	/// Remove everything.
	fn clear_all(&self) -> AuthResult<()>;
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
	entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
	/// An empty store.
	pub fn new() -> Self {
		Self::default()
	}
}

fn poisoned<T>(_: T) -> AuthError {
	AuthError::Storage("credential store lock poisoned".into())
}

impl CredentialStore for MemoryStore {
	fn get(&self, key: &str) -> AuthResult<Option<String>> {
		Ok(self.entries.lock().map_err(poisoned)?.get(key).cloned())
	}

	fn put(&self, key: &str, value: &str) -> AuthResult<()> {
		self.entries
			.lock()
			.map_err(poisoned)?
			.insert(key.to_string(), value.to_string());
		Ok(())
	}

	fn put_many(&self, entries: &[(&str, &str)]) -> AuthResult<()> {
		let mut map = self.entries.lock().map_err(poisoned)?;
		for (key, value) in entries {
			map.insert((*key).to_string(), (*value).to_string());
		}
		Ok(())
	}

	fn clear_all(&self) -> AuthResult<()> {
		self.entries.lock().map_err(poisoned)?.clear();
		Ok(())
	}
}

/// JSON-file-backed store.
///
/// The whole map is rewritten on every mutation, which keeps individual key
/// writes atomic enough for this flow: one interactive user, strictly
/// sequential steps.
#[derive(Debug)]
pub struct FileStore {
	path: PathBuf,
}

impl FileStore {
	/// A store persisting to the given file. The file and its parent
	/// directories are created lazily on first write.
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	/// Default location under the platform data directory.
	pub fn default_path() -> AuthResult<PathBuf> {
		let dir = dirs::data_dir()
			.ok_or_else(|| AuthError::Storage("no platform data directory".into()))?;
		Ok(dir.join("pinion").join("credentials.json"))
	}

	fn load(&self) -> AuthResult<HashMap<String, String>> {
		match fs::read_to_string(&self.path) {
			Ok(text) => serde_json::from_str(&text).map_err(|e| {
				AuthError::Storage(format!("corrupt store at {}: {e}", self.path.display()))
			}),
			Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(HashMap::new()),
			Err(e) => Err(AuthError::Storage(format!(
				"read {}: {e}",
				self.path.display()
			))),
		}
	}

	fn save(&self, entries: &HashMap<String, String>) -> AuthResult<()> {
		if let Some(parent) = self.path.parent() {
			fs::create_dir_all(parent).map_err(|e| {
				AuthError::Storage(format!("create {}: {e}", parent.display()))
			})?;
		}
		let text = serde_json::to_string_pretty(entries)
			.map_err(|e| AuthError::Storage(format!("serialize store: {e}")))?;
		fs::write(&self.path, text)
			.map_err(|e| AuthError::Storage(format!("write {}: {e}", self.path.display())))?;
		debug!(path = %self.path.display(), keys = entries.len(), "credential store written");
		Ok(())
	}
}

impl CredentialStore for FileStore {
	fn get(&self, key: &str) -> AuthResult<Option<String>> {
		Ok(self.load()?.get(key).cloned())
	}

	fn put(&self, key: &str, value: &str) -> AuthResult<()> {
		let mut entries = self.load()?;
		entries.insert(key.to_string(), value.to_string());
		self.save(&entries)
	}

	fn put_many(&self, pairs: &[(&str, &str)]) -> AuthResult<()> {
		let mut entries = self.load()?;
		for (key, value) in pairs {
			entries.insert((*key).to_string(), (*value).to_string());
		}
		self.save(&entries)
	}

	fn clear_all(&self) -> AuthResult<()> {
		match fs::remove_file(&self.path) {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(AuthError::Storage(format!(
				"remove {}: {e}",
				self.path.display()
			))),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn domain_scoped_keys() {
		let domain = Domain::normalize("mastodon.social");
		assert_eq!(client_id_key(&domain), "mastodon.social/client_id");
		assert_eq!(client_secret_key(&domain), "mastodon.social/client_secret");
	}

	#[test]
	fn memory_store_round_trip() {
		let store = MemoryStore::new();
		assert_eq!(store.get("missing").unwrap(), None);

		store.put("a", "1").unwrap();
		store.put_many(&[("b", "2"), ("c", "3")]).unwrap();
		assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
		assert_eq!(store.get("c").unwrap().as_deref(), Some("3"));

		store.clear_all().unwrap();
		assert_eq!(store.get("a").unwrap(), None);
	}

	#[test]
	fn file_store_survives_reconstruction() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("credentials.json");

		let store = FileStore::new(&path);
		store
			.put_many(&[("domain", "mastodon.social"), ("accessToken", "T1")])
			.unwrap();
		drop(store);

		let reopened = FileStore::new(&path);
		assert_eq!(reopened.get("domain").unwrap().as_deref(), Some("mastodon.social"));
		assert_eq!(reopened.get("accessToken").unwrap().as_deref(), Some("T1"));
	}

	#[test]
	fn file_store_missing_file_reads_empty() {
		let dir = tempfile::tempdir().unwrap();
		let store = FileStore::new(dir.path().join("never-written.json"));
		assert_eq!(store.get("anything").unwrap(), None);
	}

	#[test]
	fn file_store_creates_parent_directories() {
		let dir = tempfile::tempdir().unwrap();
		let store = FileStore::new(dir.path().join("nested/deeper/credentials.json"));
		store.put("k", "v").unwrap();
		assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
	}

	#[test]
	fn file_store_clear_all_removes_everything() {
		let dir = tempfile::tempdir().unwrap();
		let store = FileStore::new(dir.path().join("credentials.json"));
		store.put("k", "v").unwrap();
		store.clear_all().unwrap();
		assert_eq!(store.get("k").unwrap(), None);
		// Clearing an already-empty store is fine.
		store.clear_all().unwrap();
	}

	#[test]
	fn file_store_rejects_corrupt_contents() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("credentials.json");
		fs::write(&path, "not json").unwrap();

		let store = FileStore::new(&path);
		assert!(matches!(store.get("k"), Err(AuthError::Storage(_))));
	}
}
