//! Callback URI construction and redirect interpretation.

use url::Url;

/// The application's registered OAuth callback URI.
///
/// The rendered string is used verbatim in two places: as the `redirect_uri`
/// value sent to the authorization endpoint, and as the prefix an inbound URI
/// must start with to be treated as part of the flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectUri {
	uri: String,
}

impl RedirectUri {
	/// Build the callback URI from the configured scheme and host.
	pub fn new(scheme: &str, host: &str) -> Self {
		Self {
			uri: format!("{scheme}://{host}/"),
		}
	}

	/// The exact callback string, `"<scheme>://<host>/"`.
	pub fn as_str(&self) -> &str {
		&self.uri
	}

	/// Case-sensitive prefix test against an inbound URI.
	///
	/// A prefix match rather than equality, because the server appends query
	/// parameters to the registered callback.
	pub fn matches(&self, incoming: &str) -> bool {
		incoming.starts_with(&self.uri)
	}
}

/// Result carried by a redirect that matched the callback prefix.
///
/// Parsed from the query parameters, consumed immediately, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationOutcome {
	/// The server granted an authorization code.
	Code(String),
	/// The server reported an error, e.g. the user denied access.
	Denied(String),
	/// Neither `code` nor `error` was present.
	Malformed,
}

impl AuthorizationOutcome {
	/// Interpret the query parameters of a matching redirect.
	///
	/// Exactly one of the three outcomes holds. When both `code` and `error`
	/// are present, `code` wins.
	pub fn parse(uri: &str) -> Self {
		let Ok(parsed) = Url::parse(uri) else {
			return Self::Malformed;
		};

		let mut code = None;
		let mut error = None;
		for (key, value) in parsed.query_pairs() {
			match key.as_ref() {
				"code" if code.is_none() => code = Some(value.into_owned()),
				"error" if error.is_none() => error = Some(value.into_owned()),
				_ => {}
			}
		}

		if let Some(code) = code {
			Self::Code(code)
		} else if let Some(error) = error {
			Self::Denied(error)
		} else {
			Self::Malformed
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn renders_scheme_host_slash() {
		let uri = RedirectUri::new("pinion", "oauth");
		assert_eq!(uri.as_str(), "pinion://oauth/");
	}

	#[test]
	fn matches_only_its_own_prefix() {
		let uri = RedirectUri::new("pinion", "oauth");
		assert!(uri.matches("pinion://oauth/?code=abc"));
		assert!(uri.matches("pinion://oauth/"));
		assert!(!uri.matches("https://attacker.evil/?code=x"));
		assert!(!uri.matches("pinion://other/?code=x"));
		// Case-sensitive.
		assert!(!uri.matches("PINION://oauth/?code=x"));
	}

	#[test]
	fn parses_code() {
		assert_eq!(
			AuthorizationOutcome::parse("pinion://oauth/?code=abc123"),
			AuthorizationOutcome::Code("abc123".into()),
		);
	}

	#[test]
	fn parses_error() {
		assert_eq!(
			AuthorizationOutcome::parse("pinion://oauth/?error=access_denied"),
			AuthorizationOutcome::Denied("access_denied".into()),
		);
	}

	#[test]
	fn code_wins_over_error() {
		assert_eq!(
			AuthorizationOutcome::parse("pinion://oauth/?error=denied&code=abc"),
			AuthorizationOutcome::Code("abc".into()),
		);
	}

	#[test]
	fn no_parameters_is_malformed() {
		assert_eq!(
			AuthorizationOutcome::parse("pinion://oauth/"),
			AuthorizationOutcome::Malformed,
		);
		assert_eq!(
			AuthorizationOutcome::parse("pinion://oauth/?foo=bar"),
			AuthorizationOutcome::Malformed,
		);
	}

	#[test]
	fn percent_encoded_values_are_decoded() {
		assert_eq!(
			AuthorizationOutcome::parse("pinion://oauth/?error=access%20denied"),
			AuthorizationOutcome::Denied("access denied".into()),
		);
	}
}
