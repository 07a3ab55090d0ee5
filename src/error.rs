use std::fmt::{Debug, Display};
use std::io::Error as IoError;

use actix_web::error::{JsonPayloadError, PathError, PayloadError, QueryPayloadError};
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use awc::error::SendRequestError;
use derivative::Derivative;
use serde::{Serialize, Serializer};
use serde_json::Error as ParseError;

use crate::campaign::CampaignId;
use crate::countdown::views::CountdownViewId;

#[derive(Debug, Serialize, Derivative)]
#[derivative(PartialEq)]
#[serde(untagged)]
pub enum Error {
    // 400
    #[serde(serialize_with = "display")]
    InvalidJson(#[derivative(PartialEq = "ignore")] JsonPayloadError),
    #[serde(serialize_with = "display")]
    InvalidPath(#[derivative(PartialEq = "ignore")] PathError),
    #[serde(serialize_with = "display")]
    InvalidQuery(#[derivative(PartialEq = "ignore")] QueryPayloadError),
    InvalidField {
        field: &'static str,
        reason: &'static str,
    },

    // 401
    MissingSession,
    MalformedSession,

    // 404
    PathDoesNotExist,
    CampaignDoesNotExist {
        campaign_id: CampaignId,
    },
    CountdownViewDoesNotExist {
        view_id: CountdownViewId,
    },

    // 429
    TooManyCountdownViews {
        limit: usize,
    },

    // 502
    UpstreamRejected {
        status: u16,
        message: String,
    },
    #[serde(serialize_with = "display")]
    FailedUpstreamCall(#[derivative(PartialEq = "ignore")] SendRequestError),
    #[serde(serialize_with = "display")]
    FailedToReadUpstream(#[derivative(PartialEq = "ignore")] PayloadError),
    #[serde(serialize_with = "display")]
    FailedToParseUpstream(#[derivative(PartialEq = "ignore")] ParseError),

    // 500
    InvalidConfig {
        key: String,
        value: String,
    },
    #[serde(serialize_with = "display")]
    IoError(#[derivative(PartialEq = "ignore")] IoError),
}

impl Error {
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::InvalidJson(_) => "E4001000",
            Error::InvalidPath(_) => "E4001001",
            Error::InvalidQuery(_) => "E4001002",
            Error::InvalidField { .. } => "E4001003",
            Error::MissingSession => "E4011000",
            Error::MalformedSession => "E4011001",
            Error::PathDoesNotExist => "E4041000",
            Error::CampaignDoesNotExist { .. } => "E4041001",
            Error::CountdownViewDoesNotExist { .. } => "E4041002",
            Error::TooManyCountdownViews { .. } => "E4291000",
            Error::UpstreamRejected { .. } => "E5021000",
            Error::FailedUpstreamCall(_) => "E5021001",
            Error::FailedToReadUpstream(_) => "E5021002",
            Error::FailedToParseUpstream(_) => "E5021003",
            Error::InvalidConfig { .. } => "E5001000",
            Error::IoError(_) => "E5001001",
        }
    }

    pub fn error_message(&self) -> &'static str {
        match self {
            Error::InvalidJson(_) => "The given json could not be parsed",
            Error::InvalidPath(_) => "The given path could not be parsed",
            Error::InvalidQuery(_) => "The given query could not be parsed",
            Error::InvalidField { .. } => "A field of the request is invalid",
            Error::MissingSession => "The request does not carry a session",
            Error::MalformedSession => "The request's session is not a bearer token",
            Error::PathDoesNotExist => "The requested path does not exist",
            Error::CampaignDoesNotExist { .. } => "The requested campaign does not exist",
            Error::CountdownViewDoesNotExist { .. } => {
                "The requested countdown view does not exist"
            }
            Error::TooManyCountdownViews { .. } => {
                "Too many countdown views are open, delete one first"
            }
            Error::UpstreamRejected { .. } => "The portal api rejected the request",
            Error::FailedUpstreamCall(_) => "An error occurred when calling the portal api",
            Error::FailedToReadUpstream(_) => {
                "An error occurred when reading the portal api response"
            }
            Error::FailedToParseUpstream(_) => "The portal api response could not be parsed",
            Error::InvalidConfig { .. } => "The server is misconfigured",
            Error::IoError(_) => "An error occurred during an I/O operation",
        }
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidJson(_) => StatusCode::BAD_REQUEST,
            Error::InvalidPath(_) => StatusCode::BAD_REQUEST,
            Error::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            Error::InvalidField { .. } => StatusCode::BAD_REQUEST,
            Error::MissingSession => StatusCode::UNAUTHORIZED,
            Error::MalformedSession => StatusCode::UNAUTHORIZED,
            Error::PathDoesNotExist => StatusCode::NOT_FOUND,
            Error::CampaignDoesNotExist { .. } => StatusCode::NOT_FOUND,
            Error::CountdownViewDoesNotExist { .. } => StatusCode::NOT_FOUND,
            Error::TooManyCountdownViews { .. } => StatusCode::TOO_MANY_REQUESTS,
            // the caller's token is what the portal api refused
            Error::UpstreamRejected { status: 401, .. } => StatusCode::UNAUTHORIZED,
            Error::UpstreamRejected { status: 403, .. } => StatusCode::FORBIDDEN,
            Error::UpstreamRejected { .. } => StatusCode::BAD_GATEWAY,
            Error::FailedUpstreamCall(_) => StatusCode::BAD_GATEWAY,
            Error::FailedToReadUpstream(_) => StatusCode::BAD_GATEWAY,
            Error::FailedToParseUpstream(_) => StatusCode::BAD_GATEWAY,
            Error::InvalidConfig { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        #[derive(Serialize)]
        struct Dummy<'a> {
            error_code: &'static str,
            error_message: &'static str,
            error_meta: &'a Error,
        }

        HttpResponse::build(self.status_code()).json(&Dummy {
            error_code: self.error_code(),
            error_message: self.error_message(),
            error_meta: self,
        })
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        Debug::fmt(self, f)
    }
}

impl From<SendRequestError> for Error {
    fn from(error: SendRequestError) -> Error {
        Error::FailedUpstreamCall(error)
    }
}

impl From<PayloadError> for Error {
    fn from(error: PayloadError) -> Error {
        Error::FailedToReadUpstream(error)
    }
}

impl From<ParseError> for Error {
    fn from(error: ParseError) -> Error {
        Error::FailedToParseUpstream(error)
    }
}

impl From<IoError> for Error {
    fn from(error: IoError) -> Error {
        Error::IoError(error)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::InvalidJson(err) => Some(err),
            Error::InvalidPath(err) => Some(err),
            Error::InvalidQuery(err) => Some(err),
            Error::FailedUpstreamCall(err) => Some(err),
            Error::FailedToReadUpstream(err) => Some(err),
            Error::FailedToParseUpstream(err) => Some(err),
            Error::IoError(err) => Some(err),
            _ => None,
        }
    }
}

fn display<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Display,
    S: Serializer,
{
    serializer.collect_str(value)
}
