use axum::{
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use persona_session::{LimitScope, RateLimited};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

pub const GENERIC_FAILURE: &str = "Something went wrong";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{message}")]
    RateLimited {
        message: String,
        retry_after_secs: u64,
    },

    #[error("Upstream completion failed: {0}")]
    Upstream(#[source] anyhow::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal server error")]
    Internal,
}

/// JSON body of every error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

impl From<RateLimited> for ApiError {
    fn from(limited: RateLimited) -> Self {
        let message = match limited.scope {
            LimitScope::Ip => format!(
                "Too many requests from this IP, please try again after {}",
                describe_wait(limited.retry_after_secs)
            ),
            LimitScope::Session => "Too many requests for this session, please slow down".to_string(),
        };
        ApiError::RateLimited {
            message,
            retry_after_secs: limited.retry_after_secs,
        }
    }
}

/// Wait time in words, e.g. "an hour" or "15 minutes"
fn describe_wait(secs: u64) -> String {
    match secs {
        3600 => "an hour".to_string(),
        60 => "a minute".to_string(),
        s if s > 3600 && s % 3600 == 0 => format!("{} hours", s / 3600),
        s if s > 60 && s % 60 == 0 => format!("{} minutes", s / 60),
        1 => "a second".to_string(),
        s => format!("{} seconds", s),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, retry_after) = match self {
            ApiError::BadRequest(message) => {
                tracing::warn!(error = %message, "Rejected invalid request");
                (StatusCode::BAD_REQUEST, message, None)
            }
            ApiError::RateLimited { message, retry_after_secs } => {
                tracing::warn!(retry_after_secs, "{}", message);
                (StatusCode::TOO_MANY_REQUESTS, message, Some(retry_after_secs))
            }
            ApiError::Upstream(ref e) => {
                tracing::error!("Upstream error: {:#}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, GENERIC_FAILURE.to_string(), None)
            }
            ApiError::Config(ref msg) => {
                tracing::error!("Config error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, GENERIC_FAILURE.to_string(), None)
            }
            ApiError::Internal => {
                tracing::error!("Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, GENERIC_FAILURE.to_string(), None)
            }
        };

        let mut response = (status, Json(ErrorBody { error: message })).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
