//! Instance domain normalization.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A normalized fully-qualified instance host.
///
/// Invariant: never carries a scheme prefix, surrounding whitespace, or a
/// trailing slash. This is the form every persisted key and every request URL
/// is built from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Domain(String);

impl Domain {
	/// Normalize user-entered text into a bare domain.
	///
	/// Strips one leading `http://` or `https://`, trims whitespace and any
	/// trailing slash. Normalizing an already-normalized value is a no-op.
	/// Whether the result names a real host is left to the network layer.
	pub fn normalize(input: &str) -> Self {
		let s = input.trim();
		let s = s.strip_prefix("http://").unwrap_or(s);
		let s = s.strip_prefix("https://").unwrap_or(s);
		Domain(s.trim().trim_end_matches('/').to_string())
	}

	/// The bare host string.
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Whether normalization left nothing behind.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl fmt::Display for Domain {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn strips_scheme_and_whitespace() {
		assert_eq!(Domain::normalize("http://example.social").as_str(), "example.social");
		assert_eq!(Domain::normalize("https://example.social").as_str(), "example.social");
		assert_eq!(Domain::normalize("  example.social\t").as_str(), "example.social");
		assert_eq!(Domain::normalize(" https://example.social ").as_str(), "example.social");
	}

	#[test]
	fn strips_trailing_slash() {
		assert_eq!(
			Domain::normalize("https://example.social/"),
			Domain::normalize("example.social"),
		);
	}

	#[test]
	fn normalization_is_idempotent() {
		for input in ["https://example.social/", " http://a.b ", "plain.host", "", "  "] {
			let once = Domain::normalize(input);
			assert_eq!(Domain::normalize(once.as_str()), once);
		}
	}

	#[test]
	fn plain_domain_is_untouched() {
		assert_eq!(Domain::normalize("mastodon.social").as_str(), "mastodon.social");
	}

	#[test]
	fn empty_input_yields_empty_domain() {
		assert!(Domain::normalize("   ").is_empty());
		assert!(Domain::normalize("https://").is_empty());
	}
}
