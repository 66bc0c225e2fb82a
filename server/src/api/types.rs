//! Shared API types
//!
//! Error responses follow the fixed wire shape `{type, message, code?}`.
//! Request-parameter failures are `InvalidRequestException` (400, or 404 for
//! missing resources); engine authorization denials pass through as
//! `AuthorizationException` (403); other engine failures surface as
//! `ProcessEngineException` (500) with their message and optional numeric
//! code intact.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::engine::EngineError;
use crate::query::ParamError;
use crate::query::pagination::{self, Window};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestError {
    InvalidRequest { status: StatusCode, message: String },
    Authorization { message: String },
    ProcessEngine { message: String, code: Option<i32> },
}

impl RestError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl From<ParamError> for RestError {
    fn from(e: ParamError) -> Self {
        Self::bad_request(e.0)
    }
}

impl From<EngineError> for RestError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::ProcessEngine { message, code } => Self::ProcessEngine { message, code },
            EngineError::Authorization(message) => Self::Authorization { message },
            EngineError::NotFound(message) => Self::not_found(message),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    #[serde(rename = "type")]
    exception_type: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<i32>,
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        let (status, exception_type, message, code) = match self {
            Self::InvalidRequest { status, message } => {
                (status, "InvalidRequestException", message, None)
            }
            Self::Authorization { message } => {
                (StatusCode::FORBIDDEN, "AuthorizationException", message, None)
            }
            Self::ProcessEngine { message, code } => {
                tracing::error!(error = %message, "engine error");
                (StatusCode::INTERNAL_SERVER_ERROR, "ProcessEngineException", message, code)
            }
        };
        (status, Json(ErrorBody { exception_type, message, code })).into_response()
    }
}

/// Wire shape of the `/count` resources.
#[derive(Debug, Serialize)]
pub struct CountResultDto {
    pub count: u64,
}

/// Pagination query parameters. These live in the query string for GET and
/// POST alike; the body of a POST query carries criteria only.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaginationDto {
    pub first_result: Option<i32>,
    pub max_results: Option<i32>,
}

impl PaginationDto {
    pub fn window(self) -> Window {
        pagination::resolve(self.first_result, self.max_results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_errors_become_400_invalid_request() {
        let e = RestError::from(ParamError::new("sortOrder parameter has invalid value: up"));
        assert_eq!(
            e,
            RestError::InvalidRequest {
                status: StatusCode::BAD_REQUEST,
                message: "sortOrder parameter has invalid value: up".to_string(),
            }
        );
    }

    #[test]
    fn engine_errors_keep_their_kind() {
        let e = RestError::from(EngineError::Authorization("denied".to_string()));
        assert_eq!(e, RestError::Authorization { message: "denied".to_string() });

        let e = RestError::from(EngineError::NotFound("task t1 doesn't exist".to_string()));
        assert_eq!(
            e,
            RestError::InvalidRequest {
                status: StatusCode::NOT_FOUND,
                message: "task t1 doesn't exist".to_string(),
            }
        );
    }
}
