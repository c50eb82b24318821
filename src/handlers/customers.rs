use actix_web::{web, HttpResponse};
use chrono::Utc;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::CurrentCustomer;
use crate::db::DbPool;
use crate::errors::AppError;
use crate::models::customer::{Customer, NewCustomer};
use crate::pagination::PageParams;
use crate::responses::{format_timestamp, format_updated, ApiResponse};
use crate::schema::customers;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CustomerCreateRequest {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CustomerUpdateRequest {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Customer> for CustomerResponse {
    fn from(c: Customer) -> Self {
        Self {
            id: c.id,
            name: c.name,
            email: c.email,
            created_at: format_timestamp(c.created_at),
            updated_at: format_updated(c.updated_at),
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /api/customer
#[utoipa::path(
    get,
    path = "/api/customer",
    params(
        ("page" = Option<i64>, Query, description = "Page number (1-based, default 1)"),
        ("limit" = Option<i64>, Query, description = "Items per page (default 20)"),
    ),
    responses(
        (status = 200, description = "Paginated list of live customers", body = [CustomerResponse]),
        (status = 401, description = "Missing or invalid bearer token"),
    ),
    tag = "customers"
)]
pub async fn list_customers(
    _current: CurrentCustomer,
    pool: web::Data<DbPool>,
    query: web::Query<PageParams>,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();
    let offset = params.offset();
    let limit = params.limit;

    let (rows, total) = web::block(move || -> Result<(Vec<Customer>, i64), AppError> {
        let mut conn = pool.get()?;
        let total: i64 = customers::table
            .filter(customers::deleted_at.is_null())
            .count()
            .get_result(&mut conn)?;
        let rows = customers::table
            .filter(customers::deleted_at.is_null())
            .select(Customer::as_select())
            .order(customers::created_at.desc())
            .limit(limit)
            .offset(offset)
            .load(&mut conn)?;
        Ok((rows, total))
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    if rows.is_empty() {
        return Ok(HttpResponse::Ok().json(ApiResponse::empty_page(
            Vec::<CustomerResponse>::new(),
            "Customer",
        )));
    }

    let items: Vec<CustomerResponse> = rows.into_iter().map(CustomerResponse::from).collect();
    Ok(HttpResponse::Ok().json(ApiResponse::page(items, total, offset)))
}

/// POST /api/customer/create
#[utoipa::path(
    post,
    path = "/api/customer/create",
    request_body = CustomerCreateRequest,
    responses(
        (status = 200, description = "Customer created"),
        (status = 422, description = "Validation failure"),
        (status = 401, description = "Missing or invalid bearer token"),
    ),
    tag = "customers"
)]
pub async fn create_customer(
    _current: CurrentCustomer,
    pool: web::Data<DbPool>,
    body: web::Json<CustomerCreateRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let password_hash = bcrypt::hash(&body.password, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    web::block(move || -> Result<usize, AppError> {
        let mut conn = pool.get()?;
        diesel::insert_into(customers::table)
            .values(&NewCustomer {
                name: body.name,
                email: body.email,
                password_hash,
            })
            .execute(&mut conn)
            .map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(ApiResponse::ok("Successfully Create Customer")))
}

/// GET /api/customer/{customerId}
#[utoipa::path(
    get,
    path = "/api/customer/{customerId}",
    params(("customerId" = i64, Path, description = "Customer id")),
    responses(
        (status = 200, description = "Customer found, or error field when missing", body = CustomerResponse),
        (status = 401, description = "Missing or invalid bearer token"),
    ),
    tag = "customers"
)]
pub async fn get_customer(
    _current: CurrentCustomer,
    pool: web::Data<DbPool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let customer_id = path.into_inner();

    let customer = web::block(move || {
        let mut conn = pool.get().map_err(AppError::from)?;
        customers::table
            .filter(customers::id.eq(customer_id))
            .filter(customers::deleted_at.is_null())
            .select(Customer::as_select())
            .first(&mut conn)
            .optional()
            .map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??
    .ok_or(AppError::NotFound("Customer"))?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(CustomerResponse::from(customer))))
}

/// PUT /api/customer/update/{customerId}
#[utoipa::path(
    put,
    path = "/api/customer/update/{customerId}",
    params(("customerId" = i64, Path, description = "Customer id")),
    request_body = CustomerUpdateRequest,
    responses(
        (status = 200, description = "Customer updated, or error field when missing"),
        (status = 422, description = "Validation failure"),
        (status = 401, description = "Missing or invalid bearer token"),
    ),
    tag = "customers"
)]
pub async fn update_customer(
    _current: CurrentCustomer,
    pool: web::Data<DbPool>,
    path: web::Path<i64>,
    body: web::Json<CustomerUpdateRequest>,
) -> Result<HttpResponse, AppError> {
    let customer_id = path.into_inner();
    let body = body.into_inner();
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let affected = web::block(move || -> Result<usize, AppError> {
        let mut conn = pool.get()?;
        diesel::update(
            customers::table
                .filter(customers::id.eq(customer_id))
                .filter(customers::deleted_at.is_null()),
        )
        .set((
            customers::name.eq(body.name),
            customers::email.eq(body.email),
            customers::updated_at.eq(Some(Utc::now())),
        ))
        .execute(&mut conn)
        .map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    if affected == 0 {
        return Err(AppError::NotFound("Customer"));
    }

    Ok(HttpResponse::Ok().json(ApiResponse::ok("Successfully Customer Updated")))
}

/// DELETE /api/customer/delete/{customerId}
#[utoipa::path(
    delete,
    path = "/api/customer/delete/{customerId}",
    params(("customerId" = i64, Path, description = "Customer id")),
    responses(
        (status = 200, description = "Customer soft-deleted, or error field when missing"),
        (status = 401, description = "Missing or invalid bearer token"),
    ),
    tag = "customers"
)]
pub async fn delete_customer(
    _current: CurrentCustomer,
    pool: web::Data<DbPool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let customer_id = path.into_inner();

    let affected = web::block(move || -> Result<usize, AppError> {
        let mut conn = pool.get()?;
        diesel::update(
            customers::table
                .filter(customers::id.eq(customer_id))
                .filter(customers::deleted_at.is_null()),
        )
        .set(customers::deleted_at.eq(Some(Utc::now())))
        .execute(&mut conn)
        .map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    if affected == 0 {
        return Err(AppError::NotFound("Customer"));
    }

    Ok(HttpResponse::Ok().json(ApiResponse::ok("Successfully Customer Deleted")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_requires_all_fields_non_empty() {
        let req = CustomerCreateRequest {
            name: String::new(),
            email: "a@b.com".to_string(),
            password: "pw".to_string(),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn update_request_rejects_malformed_email() {
        let req = CustomerUpdateRequest {
            name: "test".to_string(),
            email: "nope".to_string(),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn response_renders_timestamps_as_text() {
        use chrono::TimeZone;
        let customer = Customer {
            id: 7,
            name: "test".to_string(),
            email: "test@test.com".to_string(),
            password_hash: "$2b$12$hash".to_string(),
            created_at: chrono::Utc.with_ymd_and_hms(2026, 8, 7, 10, 0, 0).unwrap(),
            updated_at: None,
            deleted_at: None,
        };
        let resp = CustomerResponse::from(customer);
        assert_eq!(resp.created_at, "2026-08-07 10:00:00");
        assert_eq!(resp.updated_at, "");
    }

    #[test]
    fn response_does_not_expose_the_password_hash() {
        let body = serde_json::to_value(CustomerResponse {
            id: 1,
            name: "test".to_string(),
            email: "test@test.com".to_string(),
            created_at: String::new(),
            updated_at: String::new(),
        })
        .unwrap();
        assert!(body.get("passwordHash").is_none());
        assert!(body.get("password_hash").is_none());
    }
}
