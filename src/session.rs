use std::fmt::{self, Debug};

use actix_web::dev::Payload;
use actix_web::http::header::{HeaderMap, AUTHORIZATION};
use actix_web::{FromRequest, HttpRequest};
use futures::future::{ready, Ready};

use crate::error::Error;

/// The caller's portal session. Extracted per request from the
/// `Authorization: Bearer <token>` header and passed explicitly to every
/// call made against the portal api on the caller's behalf.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    token: String,
}

impl Session {
    pub fn bearer(token: impl Into<String>) -> Session {
        Session {
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn authorization(&self) -> String {
        format!("Bearer {}", self.token)
    }

    pub fn from_headers(headers: &HeaderMap) -> Result<Session, Error> {
        let value = headers.get(AUTHORIZATION).ok_or(Error::MissingSession)?;
        let value = value.to_str().map_err(|_| Error::MalformedSession)?;

        let token = value
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(Error::MalformedSession)?;

        Ok(Session::bearer(token))
    }
}

impl Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session").field("token", &"<redacted>").finish()
    }
}

impl FromRequest for Session {
    type Error = Error;
    type Future = Ready<Result<Session, Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Session::from_headers(req.headers()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::header::HeaderValue;

    fn headers(value: Option<&'static str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(value) = value {
            headers.insert(AUTHORIZATION, HeaderValue::from_static(value));
        }
        headers
    }

    #[test]
    fn extracts_bearer_token() {
        let session = Session::from_headers(&headers(Some("Bearer abc.def.ghi"))).unwrap();

        assert_eq!(session.token(), "abc.def.ghi");
        assert_eq!(session.authorization(), "Bearer abc.def.ghi");
    }

    #[test]
    fn missing_header_is_missing_session() {
        assert_eq!(
            Session::from_headers(&headers(None)).unwrap_err(),
            Error::MissingSession
        );
    }

    #[test]
    fn non_bearer_header_is_malformed() {
        for value in ["Basic dXNlcjpwYXNz", "Bearer ", "abc"].iter().copied() {
            assert_eq!(
                Session::from_headers(&headers(Some(value))).unwrap_err(),
                Error::MalformedSession
            );
        }
    }

    #[test]
    fn debug_output_hides_token() {
        let session = Session::bearer("secret-token");

        assert!(!format!("{:?}", session).contains("secret-token"));
    }
}
