use std::future::Future;
use std::pin::Pin;

use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest};
use diesel::prelude::*;

use crate::auth::token;
use crate::config::Config;
use crate::db::DbPool;
use crate::errors::AppError;
use crate::schema::customers;

/// Identity resolved by the authorization gate. Taking this as a handler
/// argument is what protects a route: extraction either attaches the live
/// customer or terminates the request with a 401.
#[derive(Debug, Clone)]
pub struct CurrentCustomer {
    pub id: i64,
    pub name: String,
    pub email: String,
}

impl FromRequest for CurrentCustomer {
    type Error = AppError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            let header = req
                .headers()
                .get("Authorization")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("");

            if !header.contains("Bearer") {
                return Err(AppError::Unauthorized);
            }

            // A header that does not split into exactly two tokens leaves the
            // credential empty; token validation then rejects it.
            let parts: Vec<&str> = header.split_whitespace().collect();
            let credential = if parts.len() == 2 { parts[1] } else { "" };

            let config = req
                .app_data::<web::Data<Config>>()
                .ok_or(AppError::Unauthorized)?;
            let claims = token::validate_access_token(credential, &config.access_token_secret)?;

            let pool = req
                .app_data::<web::Data<DbPool>>()
                .ok_or(AppError::Unauthorized)?
                .clone();

            let lookup = web::block(move || {
                let mut conn = pool.get().map_err(AppError::from)?;
                customers::table
                    .filter(customers::id.eq(claims.customer_id))
                    .filter(customers::deleted_at.is_null())
                    .select((customers::id, customers::name, customers::email))
                    .first::<(i64, String, String)>(&mut conn)
                    .optional()
                    .map_err(AppError::from)
            })
            .await;

            // Any lookup failure is indistinguishable from a missing
            // customer: the caller only ever sees a 401.
            let (id, name, email) = match lookup {
                Ok(Ok(Some(row))) => row,
                _ => return Err(AppError::Unauthorized),
            };

            Ok(CurrentCustomer { id, name, email })
        })
    }
}

#[cfg(test)]
mod tests {
    use actix_web::test::TestRequest;

    use super::*;

    fn test_config() -> Config {
        Config {
            database_url: String::new(),
            host: "127.0.0.1".to_string(),
            port: 0,
            access_token_secret: "access-secret-for-tests".to_string(),
            refresh_token_secret: "refresh-secret-for-tests".to_string(),
        }
    }

    async fn extract(req: &HttpRequest) -> Result<CurrentCustomer, AppError> {
        CurrentCustomer::from_request(req, &mut Payload::None).await
    }

    #[actix_web::test]
    async fn missing_authorization_header_is_rejected() {
        let req = TestRequest::default().to_http_request();
        assert!(matches!(extract(&req).await, Err(AppError::Unauthorized)));
    }

    #[actix_web::test]
    async fn non_bearer_scheme_is_rejected() {
        let req = TestRequest::default()
            .insert_header(("Authorization", "Basic dGVzdDoxMjM0NTY="))
            .to_http_request();
        assert!(matches!(extract(&req).await, Err(AppError::Unauthorized)));
    }

    #[actix_web::test]
    async fn garbage_bearer_token_is_rejected() {
        let req = TestRequest::default()
            .insert_header(("Authorization", "Bearer not-a-jwt"))
            .app_data(web::Data::new(test_config()))
            .to_http_request();
        assert!(matches!(extract(&req).await, Err(AppError::Unauthorized)));
    }

    #[actix_web::test]
    async fn header_with_extra_tokens_yields_empty_credential() {
        // "Bearer a b" contains the scheme but splits into three tokens, so
        // the credential validated is the empty string.
        let req = TestRequest::default()
            .insert_header(("Authorization", "Bearer a b"))
            .app_data(web::Data::new(test_config()))
            .to_http_request();
        assert!(matches!(extract(&req).await, Err(AppError::Unauthorized)));
    }

    #[actix_web::test]
    async fn refresh_token_does_not_pass_the_gate() {
        let config = test_config();
        let pair = token::issue_token_pair(1, &config).expect("issue failed");
        let req = TestRequest::default()
            .insert_header((
                "Authorization",
                format!("Bearer {}", pair.refresh_token),
            ))
            .app_data(web::Data::new(config))
            .to_http_request();
        assert!(matches!(extract(&req).await, Err(AppError::Unauthorized)));
    }
}
