use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use thiserror::Error;

/// Handler error type. Status codes mirror the documented API contract:
/// missing rows answer 200 with an `error` field, and storage failures
/// answer 400 carrying the raw error message.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Invalid login request")]
    InvalidCredentials,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0} Not Found")]
    NotFound(&'static str),

    #[error("{0}")]
    Internal(String),
}

impl From<diesel::result::Error> for AppError {
    fn from(e: diesel::result::Error) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl From<r2d2::Error> for AppError {
    fn from(e: r2d2::Error) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl actix_web::ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidCredentials => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::OK,
            AppError::Internal(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let result = match self {
            AppError::Unauthorized => "Unauthorized",
            _ => "Invalid Request",
        };
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "result": result,
            "error": self.to_string(),
        }))
    }
}
