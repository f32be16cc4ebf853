//! Wire models for the authentication endpoints

use serde::{Deserialize, Serialize};

/// Body of `POST token/refresh/`
#[derive(Debug, Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh: &'a str,
}

/// Token grant returned by the login and refresh endpoints.
///
/// `token` is accepted as an alias for `access`.
#[derive(Debug, Default, Deserialize)]
pub struct TokenGrant {
    #[serde(default)]
    pub access: Option<String>,

    #[serde(default)]
    pub token: Option<String>,

    #[serde(default)]
    pub refresh: Option<String>,
}

impl TokenGrant {
    /// Parse a grant from a response body, `None` when it is not a JSON object
    pub fn parse(body: &str) -> Option<Self> {
        serde_json::from_str(body).ok()
    }

    /// Usable access token, preferring `access` over the `token` alias
    pub fn access_token(&self) -> Option<&str> {
        [self.access.as_deref(), self.token.as_deref()]
            .into_iter()
            .flatten()
            .find(|t| !t.is_empty())
    }

    /// Rotated refresh token, if the server issued one
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh.as_deref().filter(|t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grant_with_access_and_refresh() {
        let grant = TokenGrant::parse(r#"{"access": "A1", "refresh": "R1"}"#).unwrap();
        assert_eq!(grant.access_token(), Some("A1"));
        assert_eq!(grant.refresh_token(), Some("R1"));
    }

    #[test]
    fn test_grant_token_alias() {
        let grant = TokenGrant::parse(r#"{"token": "T1"}"#).unwrap();
        assert_eq!(grant.access_token(), Some("T1"));
        assert_eq!(grant.refresh_token(), None);
    }

    #[test]
    fn test_grant_ignores_empty_values() {
        let grant = TokenGrant::parse(r#"{"access": "", "token": "T1", "refresh": ""}"#).unwrap();
        assert_eq!(grant.access_token(), Some("T1"));
        assert_eq!(grant.refresh_token(), None);
    }

    #[test]
    fn test_grant_null_fields() {
        let grant = TokenGrant::parse(r#"{"access": null}"#).unwrap();
        assert_eq!(grant.access_token(), None);
    }

    #[test]
    fn test_grant_rejects_non_object() {
        assert!(TokenGrant::parse("not json").is_none());
        assert!(TokenGrant::parse(r#""A1""#).is_none());
    }

    #[test]
    fn test_refresh_request_shape() {
        let body = serde_json::to_value(RefreshRequest { refresh: "R1" }).unwrap();
        assert_eq!(body, serde_json::json!({ "refresh": "R1" }));
    }
}
