use actix_web::{web, HttpResponse};
use diesel::prelude::*;
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::token::{self, TokenPair};
use crate::config::Config;
use crate::db::DbPool;
use crate::errors::AppError;
use crate::models::customer::Customer;
use crate::responses::ApiResponse;
use crate::schema::customers;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// POST /login
///
/// The only unauthenticated route. Every failure past request binding —
/// unknown email, wrong password, signing problems — answers with the same
/// opaque "Invalid login request" so the response never reveals which step
/// rejected the attempt.
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Access and refresh tokens issued", body = TokenPair),
        (status = 422, description = "Validation failure or invalid credentials"),
    ),
    tag = "auth"
)]
pub async fn login(
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let email = body.email.clone();
    let customer = web::block(move || {
        let mut conn = pool.get().map_err(AppError::from)?;
        customers::table
            .filter(customers::email.eq(email))
            .filter(customers::deleted_at.is_null())
            .select(Customer::as_select())
            .first(&mut conn)
            .optional()
            .map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??
    .ok_or(AppError::InvalidCredentials)?;

    let password_ok = bcrypt::verify(&body.password, &customer.password_hash)
        .map_err(|_| AppError::InvalidCredentials)?;
    if !password_ok {
        return Err(AppError::InvalidCredentials);
    }

    let tokens = token::issue_token_pair(customer.id, &config)?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(tokens)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_request_rejects_malformed_email() {
        let req = LoginRequest {
            email: "not-an-email".to_string(),
            password: "123456".to_string(),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn login_request_rejects_empty_password() {
        let req = LoginRequest {
            email: "test@test.com".to_string(),
            password: String::new(),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn login_request_accepts_valid_credentials_shape() {
        let req = LoginRequest {
            email: "test@test.com".to_string(),
            password: "123456".to_string(),
        };
        assert!(req.validate().is_ok());
    }
}
