//! Stub matching logic.
//!
//! Finds the first configured stub matching an incoming request by exact
//! path and method, optionally constrained by deep equality between the
//! request body and a referenced expected-body file.

use crate::config::Stub;
use serde_json::{Map, Value};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, warn};

/// Why a referenced expected-body file could not be used.
#[derive(Debug, Error)]
pub enum ExpectedBodyError {
    #[error("cannot read expected body {name:?}: {source}")]
    Unreadable {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse expected body {name:?}: {source}")]
    Parse {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Matches incoming requests against the configured stub list.
///
/// Expected-body files are read fresh from the static root on every match
/// attempt; nothing is cached across requests.
pub struct StubMatcher {
    static_root: PathBuf,
}

impl StubMatcher {
    pub fn new(static_root: impl Into<PathBuf>) -> Self {
        Self {
            static_root: static_root.into(),
        }
    }

    /// Find the first stub matching the request, in declaration order.
    ///
    /// A stub qualifies when its path and method equal the request's
    /// exactly. A stub without an expected-body reference then matches
    /// outright; one with a reference matches only if the request body and
    /// the referenced file both parse as JSON objects that are deep-equal.
    /// An unreadable or unparsable expected-body file disqualifies that stub
    /// and scanning continues.
    pub fn find_match<'a>(
        &self,
        stubs: &'a [Stub],
        method: &str,
        path: &str,
        body: &[u8],
    ) -> Option<&'a Stub> {
        let request_body = parse_request_body(body);

        for stub in stubs {
            if path != stub.request.path || method != stub.request.method {
                continue;
            }

            let Some(reference) = stub.request.expected_body_ref() else {
                return Some(stub);
            };

            match self.load_expected_body(reference) {
                Ok(expected) => {
                    if request_body.as_ref() == Some(&expected) {
                        return Some(stub);
                    }
                }
                Err(err) => {
                    warn!(error = %err, "Skipping stub with unusable expected body");
                }
            }
        }

        None
    }

    fn load_expected_body(&self, name: &str) -> Result<Map<String, Value>, ExpectedBodyError> {
        let bytes =
            std::fs::read(self.static_root.join(name)).map_err(|source| {
                ExpectedBodyError::Unreadable {
                    name: name.to_string(),
                    source,
                }
            })?;
        serde_json::from_slice(&bytes).map_err(|source| ExpectedBodyError::Parse {
            name: name.to_string(),
            source,
        })
    }
}

/// Parse the raw request body as a JSON object. A malformed or empty body
/// never aborts the request; it yields `None`, which cannot satisfy a
/// body-constrained stub but leaves unconstrained stubs unaffected.
fn parse_request_body(body: &[u8]) -> Option<Map<String, Value>> {
    match serde_json::from_slice(body) {
        Ok(map) => Some(map),
        Err(err) => {
            debug!(error = %err, "Request body is not a JSON object");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{StubRequest, StubResponse};
    use tempfile::TempDir;

    fn make_stub(path: &str, method: &str, expected_body: Option<&str>) -> Stub {
        Stub {
            request: StubRequest {
                path: path.to_string(),
                method: method.to_string(),
                expected_body: expected_body.map(str::to_string),
            },
            response: StubResponse::default(),
        }
    }

    fn fixture_root() -> TempDir {
        tempfile::tempdir().unwrap()
    }

    #[test]
    fn test_unconstrained_stub_matches_any_body() {
        let root = fixture_root();
        let matcher = StubMatcher::new(root.path());
        let stubs = vec![make_stub("/users", "GET", None)];

        assert!(matcher.find_match(&stubs, "GET", "/users", b"").is_some());
        assert!(matcher
            .find_match(&stubs, "GET", "/users", br#"{"any": "thing"}"#)
            .is_some());
        assert!(matcher
            .find_match(&stubs, "GET", "/users", b"not json at all")
            .is_some());
    }

    #[test]
    fn test_path_and_method_must_match_exactly() {
        let root = fixture_root();
        let matcher = StubMatcher::new(root.path());
        let stubs = vec![make_stub("/users", "GET", None)];

        assert!(matcher.find_match(&stubs, "POST", "/users", b"").is_none());
        assert!(matcher.find_match(&stubs, "GET", "/users/1", b"").is_none());
        assert!(matcher.find_match(&stubs, "GET", "/user", b"").is_none());
        assert!(matcher.find_match(&stubs, "get", "/users", b"").is_none());
    }

    #[test]
    fn test_expected_body_deep_equality_ignores_key_order() {
        let root = fixture_root();
        std::fs::write(
            root.path().join("create_user.json"),
            r#"{"name": "John", "role": "admin", "tags": ["a", "b"]}"#,
        )
        .unwrap();

        let matcher = StubMatcher::new(root.path());
        let stubs = vec![make_stub("/users", "POST", Some("create_user.json"))];

        let body = br#"{"tags": ["a", "b"], "role": "admin", "name": "John"}"#;
        assert!(matcher.find_match(&stubs, "POST", "/users", body).is_some());
    }

    #[test]
    fn test_expected_body_mismatch_rejects() {
        let root = fixture_root();
        std::fs::write(root.path().join("expected.json"), r#"{"name": "John"}"#).unwrap();

        let matcher = StubMatcher::new(root.path());
        let stubs = vec![make_stub("/users", "POST", Some("expected.json"))];

        let body = br#"{"name": "Jane"}"#;
        assert!(matcher.find_match(&stubs, "POST", "/users", body).is_none());

        // Same values but an extra key is not deep-equal either.
        let body = br#"{"name": "John", "extra": 1}"#;
        assert!(matcher.find_match(&stubs, "POST", "/users", body).is_none());
    }

    #[test]
    fn test_nested_structures_compare_recursively() {
        let root = fixture_root();
        std::fs::write(
            root.path().join("nested.json"),
            r#"{"user": {"name": "John", "address": {"city": "Lima"}}, "ids": [1, 2, 3]}"#,
        )
        .unwrap();

        let matcher = StubMatcher::new(root.path());
        let stubs = vec![make_stub("/orders", "PUT", Some("nested.json"))];

        let body = br#"{"ids": [1, 2, 3], "user": {"address": {"city": "Lima"}, "name": "John"}}"#;
        assert!(matcher.find_match(&stubs, "PUT", "/orders", body).is_some());

        // Array order is significant.
        let body = br#"{"ids": [3, 2, 1], "user": {"address": {"city": "Lima"}, "name": "John"}}"#;
        assert!(matcher.find_match(&stubs, "PUT", "/orders", body).is_none());
    }

    #[test]
    fn test_first_match_wins_by_declaration_order() {
        let root = fixture_root();
        std::fs::write(root.path().join("admin.json"), r#"{"role": "admin"}"#).unwrap();

        // Both stubs cover POST /users; the earlier one is unconstrained.
        let stubs = vec![
            make_stub("/users", "POST", None),
            make_stub("/users", "POST", Some("admin.json")),
        ];
        let matcher = StubMatcher::new(root.path());

        let matched = matcher
            .find_match(&stubs, "POST", "/users", br#"{"role": "admin"}"#)
            .unwrap();
        assert!(std::ptr::eq(matched, &stubs[0]));

        // Reversed, the body-constrained stub is evaluated first and wins
        // when it matches; otherwise the unconstrained one picks it up.
        let stubs = vec![
            make_stub("/users", "POST", Some("admin.json")),
            make_stub("/users", "POST", None),
        ];
        let matched = matcher
            .find_match(&stubs, "POST", "/users", br#"{"role": "admin"}"#)
            .unwrap();
        assert!(std::ptr::eq(matched, &stubs[0]));

        let matched = matcher
            .find_match(&stubs, "POST", "/users", br#"{"role": "guest"}"#)
            .unwrap();
        assert!(std::ptr::eq(matched, &stubs[1]));
    }

    #[test]
    fn test_malformed_request_body_is_no_match_by_body() {
        let root = fixture_root();
        std::fs::write(root.path().join("empty.json"), "{}").unwrap();

        let matcher = StubMatcher::new(root.path());
        let stubs = vec![make_stub("/users", "POST", Some("empty.json"))];

        // Even against an expected empty object, a body that fails to parse
        // does not satisfy a body constraint.
        assert!(matcher
            .find_match(&stubs, "POST", "/users", b"not json")
            .is_none());
        assert!(matcher.find_match(&stubs, "POST", "/users", b"").is_none());

        // An explicit empty object does.
        assert!(matcher.find_match(&stubs, "POST", "/users", b"{}").is_some());
    }

    #[test]
    fn test_unreadable_expected_body_skips_stub() {
        let root = fixture_root();
        let matcher = StubMatcher::new(root.path());

        let stubs = vec![
            make_stub("/users", "POST", Some("missing.json")),
            make_stub("/users", "POST", None),
        ];

        // The first stub references a file that does not exist; the scan
        // continues and the unconstrained stub matches.
        let matched = matcher.find_match(&stubs, "POST", "/users", b"{}").unwrap();
        assert!(std::ptr::eq(matched, &stubs[1]));
    }

    #[test]
    fn test_unparsable_expected_body_skips_stub() {
        let root = fixture_root();
        std::fs::write(root.path().join("broken.json"), "{ nope").unwrap();

        let matcher = StubMatcher::new(root.path());
        let stubs = vec![make_stub("/users", "POST", Some("broken.json"))];

        assert!(matcher.find_match(&stubs, "POST", "/users", b"{}").is_none());
    }

    #[test]
    fn test_no_stubs_means_no_match() {
        let root = fixture_root();
        let matcher = StubMatcher::new(root.path());
        assert!(matcher.find_match(&[], "GET", "/anything", b"").is_none());
    }
}
