use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::progression::entitlements::GateError;
use crate::store::operations::catalog::CatalogError;
use crate::store::operations::subscriptions::UsageError;
use crate::store::StoreError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub success: bool,
    pub code: String,
    pub message: String,
    pub trace_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
    pub is_operational: bool,
}

impl AppError {
    pub fn bad_request(code: &str, message: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: code.to_string(),
            message: message.to_string(),
            is_operational: true,
        }
    }

    pub fn unauthorized(message: &str) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            code: "AUTH_UNAUTHORIZED".to_string(),
            message: message.to_string(),
            is_operational: true,
        }
    }

    pub fn forbidden(message: &str) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            code: "FORBIDDEN".to_string(),
            message: message.to_string(),
            is_operational: true,
        }
    }

    /// 402: the caller's plan does not cover the request; clients show an
    /// upgrade prompt.
    pub fn payment_required(code: &str, message: &str) -> Self {
        Self {
            status: StatusCode::PAYMENT_REQUIRED,
            code: code.to_string(),
            message: message.to_string(),
            is_operational: true,
        }
    }

    pub fn too_many_requests(message: &str) -> Self {
        Self {
            status: StatusCode::TOO_MANY_REQUESTS,
            code: "RATE_LIMITED".to_string(),
            message: message.to_string(),
            is_operational: true,
        }
    }

    pub fn internal(message: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "INTERNAL_ERROR".to_string(),
            message: message.to_string(),
            is_operational: false,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let exposed_message = if self.is_operational {
            self.message.clone()
        } else {
            "Internal server error".to_string()
        };

        if self.is_operational {
            tracing::warn!(status = %self.status, code = %self.code, error = %self.message, "API error");
        } else {
            tracing::error!(status = %self.status, code = %self.code, error = %self.message, "Internal API error");
        }

        (
            self.status,
            Json(ErrorBody {
                success: false,
                code: self.code,
                message: exposed_message,
                trace_id: None,
            }),
        )
            .into_response()
    }
}

/// Store failures are never the caller's fault: they become a 500 whose
/// detail is logged but not exposed.
impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        AppError::internal(&value.to_string())
    }
}

impl From<GateError> for AppError {
    fn from(value: GateError) -> Self {
        match &value {
            GateError::QuotaExceeded { .. } => {
                AppError::payment_required("QUOTA_EXCEEDED", &value.to_string())
            }
            GateError::FeatureNotIncluded { .. } => {
                AppError::payment_required("UPGRADE_REQUIRED", &value.to_string())
            }
            GateError::UnknownFeature(_) => {
                AppError::bad_request("UNKNOWN_FEATURE", &value.to_string())
            }
        }
    }
}

impl From<UsageError> for AppError {
    fn from(value: UsageError) -> Self {
        match value {
            UsageError::Gate(e) => e.into(),
            UsageError::Store(e) => e.into(),
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(value: CatalogError) -> Self {
        match value {
            CatalogError::Store(e) => e.into(),
            other => AppError::bad_request("INVALID_CATALOG", &other.to_string()),
        }
    }
}

pub fn ok<T: Serialize>(data: T) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(ApiResponse {
            success: true,
            data,
        }),
    )
}
