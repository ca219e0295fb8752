//! Caller identity extraction.
//!
//! Authentication happens upstream; the trusted proxy forwards the caller's
//! stable id (and optionally a name and email) in request headers. This
//! extractor only parses them.

use crate::error::ApiError;
use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;
use std::str::FromStr;
use stepwise_core::UserId;

/// Header carrying the caller's stable user id.
pub const USER_ID_HEADER: &str = "x-user-id";
/// Header carrying the caller's display name (optional).
pub const USER_NAME_HEADER: &str = "x-user-name";
/// Header carrying the caller's email (optional).
pub const USER_EMAIL_HEADER: &str = "x-user-email";

/// The authenticated caller, as forwarded by the upstream auth layer.
#[derive(Debug, Clone)]
pub struct Identity {
    /// Stable user identifier.
    pub user_id: UserId,
    /// Display name, if forwarded.
    pub display_name: Option<String>,
    /// Email, if forwarded.
    pub email: Option<String>,
}

impl Identity {
    fn from_headers(headers: &HeaderMap) -> Result<Self, ApiError> {
        let raw_id = headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::MissingIdentity)?;

        let user_id = UserId::from_str(raw_id).map_err(|e| ApiError::InvalidId {
            id: raw_id.to_string(),
            reason: e.to_string(),
        })?;

        let header_string = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        Ok(Self {
            user_id,
            display_name: header_string(USER_NAME_HEADER),
            email: header_string(USER_EMAIL_HEADER),
        })
    }
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Identity::from_headers(&parts.headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_id(id: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_str(id).unwrap());
        headers
    }

    #[test]
    fn parses_user_id_header() {
        let user_id = UserId::new();
        let identity =
            Identity::from_headers(&headers_with_id(&user_id.to_string())).expect("identity");
        assert_eq!(identity.user_id, user_id);
        assert!(identity.display_name.is_none());
    }

    #[test]
    fn missing_id_header_is_rejected() {
        let err = Identity::from_headers(&HeaderMap::new()).expect_err("should fail");
        assert!(matches!(err, ApiError::MissingIdentity));
    }

    #[test]
    fn unparseable_id_is_rejected() {
        let err = Identity::from_headers(&headers_with_id("not-a-ulid")).expect_err("should fail");
        assert!(matches!(err, ApiError::InvalidId { .. }));
    }

    #[test]
    fn optional_headers_are_picked_up() {
        let user_id = UserId::new();
        let mut headers = headers_with_id(&user_id.to_string());
        headers.insert(USER_NAME_HEADER, HeaderValue::from_static("Jiwoo Park"));
        headers.insert(
            USER_EMAIL_HEADER,
            HeaderValue::from_static("jiwoo@example.com"),
        );

        let identity = Identity::from_headers(&headers).expect("identity");
        assert_eq!(identity.display_name.as_deref(), Some("Jiwoo Park"));
        assert_eq!(identity.email.as_deref(), Some("jiwoo@example.com"));
    }

    #[test]
    fn empty_optional_header_treated_as_absent() {
        let user_id = UserId::new();
        let mut headers = headers_with_id(&user_id.to_string());
        headers.insert(USER_NAME_HEADER, HeaderValue::from_static(""));

        let identity = Identity::from_headers(&headers).expect("identity");
        assert!(identity.display_name.is_none());
    }
}
