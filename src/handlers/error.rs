// src/handlers/error.rs
use std::fmt;
use warp::http::StatusCode;
use warp::reject::Reject;

use crate::models::InputError;
use crate::services::cache::CacheError;
use crate::services::property_tax::PropertyTaxError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ErrorKind {
    BadRequest,
    NotFound,
    MethodNotAllowed,
    PayloadTooLarge,
    External,
    Database,
    Internal,
}

#[derive(Debug, Clone)]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        ApiError {
            kind,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn external_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::External, message)
    }

    pub fn database_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    pub fn status(&self) -> StatusCode {
        match self.kind {
            ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ErrorKind::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorKind::External => StatusCode::BAD_GATEWAY,
            ErrorKind::Database | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}
impl Reject for ApiError {}

impl From<InputError> for ApiError {
    fn from(e: InputError) -> Self {
        ApiError::bad_request(e.to_string())
    }
}

impl From<CacheError> for ApiError {
    fn from(e: CacheError) -> Self {
        match e {
            CacheError::InvalidKey(_) => ApiError::bad_request(e.to_string()),
            CacheError::Store(_) => ApiError::database_error(e.to_string()),
            CacheError::Upstream(_) | CacheError::Timeout(_) | CacheError::InvalidPayload(_) => {
                ApiError::external_error(e.to_string())
            }
        }
    }
}

impl From<PropertyTaxError> for ApiError {
    fn from(e: PropertyTaxError) -> Self {
        let message = e.to_string();
        match e {
            PropertyTaxError::UnknownCity(_) => ApiError::not_found(message),
            PropertyTaxError::Input(_) => ApiError::bad_request(message),
        }
    }
}
