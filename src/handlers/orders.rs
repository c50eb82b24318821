use actix_web::{web, HttpResponse};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::CurrentCustomer;
use crate::db::DbPool;
use crate::errors::AppError;
use crate::models::order::{NewOrder, Order};
use crate::models::order_line::{NewOrderLine, OrderLine};
use crate::pagination::PageParams;
use crate::responses::{format_timestamp, format_updated, ApiResponse};
use crate::schema::{customers, order_lines, orders};

// ── Request / response DTOs ──────────────────────────────────────────────────

/// One submitted line. `qty` and `price` arrive as strings and are parsed
/// before anything touches the database; `id` is only meaningful on update,
/// where it marks the line as an in-place overwrite of an existing row.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct OrderLineRequest {
    #[serde(default)]
    pub id: Option<String>,
    pub item: String,
    pub qty: String,
    pub price: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct OrderRequest {
    #[validate(length(min = 1))]
    pub title: String,
    #[validate(length(min = 1))]
    pub note: String,
    #[serde(rename = "orderDetails")]
    #[validate(length(min = 1))]
    pub order_details: Vec<OrderLineRequest>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateOrderResponse {
    pub id: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct OrderListParams {
    /// Inclusive lower bound on creation date, `YYYY-MM-DD`.
    pub start_date: Option<String>,
    /// Inclusive upper bound on creation date, `YYYY-MM-DD`.
    pub end_date: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderListItem {
    pub id: i64,
    pub title: String,
    pub order_number: String,
    pub note: String,
    pub total: f64,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineResponse {
    pub id: i64,
    pub order_id: i64,
    pub item: String,
    pub qty: i64,
    pub price: f64,
    pub amount: f64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetailResponse {
    pub id: i64,
    pub customer_id: i64,
    pub title: String,
    pub order_number: String,
    pub note: String,
    pub total: f64,
    pub created_at: String,
    pub updated_at: String,
    pub order_details: Vec<OrderLineResponse>,
}

// ── Line parsing and aggregation ─────────────────────────────────────────────

#[derive(Debug, Clone)]
struct ParsedLine {
    id: Option<i64>,
    item: String,
    qty: i64,
    price: f64,
    amount: f64,
}

/// Parse every submitted line or reject the whole request: a single bad
/// `qty`, `price`, or `id` aborts before any persistence. The running total
/// is the plain floating-point sum of the line amounts.
fn parse_line_inputs(lines: &[OrderLineRequest]) -> Result<(Vec<ParsedLine>, f64), AppError> {
    let mut parsed = Vec::with_capacity(lines.len());
    let mut total = 0.0_f64;

    for line in lines {
        let qty: i64 = line
            .qty
            .parse()
            .map_err(|e| AppError::Validation(format!("invalid qty '{}': {}", line.qty, e)))?;
        let price: f64 = line
            .price
            .parse()
            .map_err(|e| AppError::Validation(format!("invalid price '{}': {}", line.price, e)))?;
        let id = match line.id.as_deref() {
            Some(raw) if !raw.is_empty() => Some(raw.parse::<i64>().map_err(|e| {
                AppError::Validation(format!("invalid order detail id '{raw}': {e}"))
            })?),
            _ => None,
        };

        let amount = qty as f64 * price;
        total += amount;
        parsed.push(ParsedLine {
            id,
            item: line.item.clone(),
            qty,
            price,
            amount,
        });
    }

    Ok((parsed, total))
}

/// Order numbers are "PO" + a microsecond-resolution timestamp. Practical
/// uniqueness only; no constraint is checked before insert.
fn make_order_number(now: DateTime<Utc>) -> String {
    format!("PO{}", now.format("%Y%m%d%H%M%S%.6f"))
}

fn parse_date_bound(raw: &str, time: NaiveTime) -> Result<DateTime<Utc>, AppError> {
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| AppError::Validation(format!("invalid date '{raw}': {e}")))?;
    Ok(date.and_time(time).and_utc())
}

fn range_start(raw: &str) -> Result<DateTime<Utc>, AppError> {
    parse_date_bound(raw, NaiveTime::MIN)
}

fn range_end(raw: &str) -> Result<DateTime<Utc>, AppError> {
    // The inclusive upper bound is 23:59:00, not 23:59:59.
    let end_of_day = NaiveTime::from_hms_opt(23, 59, 0).expect("valid time of day");
    parse_date_bound(raw, end_of_day)
}

fn line_response(line: OrderLine) -> OrderLineResponse {
    OrderLineResponse {
        id: line.id,
        order_id: line.order_id,
        item: line.item,
        qty: line.qty,
        price: line.price,
        amount: line.amount,
        created_at: format_timestamp(line.created_at),
        updated_at: format_updated(line.updated_at),
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /api/order/create
///
/// Persists the order header and all of its lines inside one database
/// transaction: a failure on either write rolls back both, so a header is
/// never visible without its lines.
#[utoipa::path(
    post,
    path = "/api/order/create",
    request_body = OrderRequest,
    responses(
        (status = 200, description = "Order created", body = CreateOrderResponse),
        (status = 422, description = "Validation failure"),
        (status = 401, description = "Missing or invalid bearer token"),
    ),
    tag = "orders"
)]
pub async fn create_order(
    current: CurrentCustomer,
    pool: web::Data<DbPool>,
    body: web::Json<OrderRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let (lines, total) = parse_line_inputs(&body.order_details)?;
    let customer_id = current.id;

    let order_id = web::block(move || {
        let mut conn = pool.get()?;
        conn.transaction::<_, AppError, _>(|conn| {
            let order_id: i64 = diesel::insert_into(orders::table)
                .values(&NewOrder {
                    customer_id,
                    title: body.title,
                    order_number: make_order_number(Utc::now()),
                    note: body.note,
                    total,
                })
                .returning(orders::id)
                .get_result(conn)?;

            let new_lines: Vec<NewOrderLine> = lines
                .into_iter()
                .map(|l| NewOrderLine {
                    order_id,
                    item: l.item,
                    qty: l.qty,
                    price: l.price,
                    amount: l.amount,
                })
                .collect();
            diesel::insert_into(order_lines::table)
                .values(&new_lines)
                .execute(conn)?;

            Ok(order_id)
        })
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(CreateOrderResponse { id: order_id })))
}

/// PUT /api/order/update/{orderId}
///
/// Lines carrying an id overwrite the existing row; lines without one are
/// inserted against the order. The header total is recomputed from the
/// submitted line set only — callers resubmit every line they intend to
/// keep. Header update, inserts, and per-line updates share one
/// transaction.
#[utoipa::path(
    put,
    path = "/api/order/update/{orderId}",
    params(("orderId" = i64, Path, description = "Order id")),
    request_body = OrderRequest,
    responses(
        (status = 200, description = "Order updated"),
        (status = 422, description = "Validation failure"),
        (status = 401, description = "Missing or invalid bearer token"),
    ),
    tag = "orders"
)]
pub async fn update_order(
    _current: CurrentCustomer,
    pool: web::Data<DbPool>,
    path: web::Path<i64>,
    body: web::Json<OrderRequest>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let body = body.into_inner();
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let (lines, total) = parse_line_inputs(&body.order_details)?;
    let (existing, new): (Vec<ParsedLine>, Vec<ParsedLine>) =
        lines.into_iter().partition(|l| l.id.is_some());

    web::block(move || {
        let mut conn = pool.get()?;
        conn.transaction::<_, AppError, _>(|conn| {
            let now = Some(Utc::now());

            diesel::update(
                orders::table
                    .filter(orders::id.eq(order_id))
                    .filter(orders::deleted_at.is_null()),
            )
            .set((
                orders::title.eq(body.title),
                orders::note.eq(body.note),
                orders::total.eq(total),
                orders::updated_at.eq(now),
            ))
            .execute(conn)?;

            if !new.is_empty() {
                let inserts: Vec<NewOrderLine> = new
                    .into_iter()
                    .map(|l| NewOrderLine {
                        order_id,
                        item: l.item,
                        qty: l.qty,
                        price: l.price,
                        amount: l.amount,
                    })
                    .collect();
                diesel::insert_into(order_lines::table)
                    .values(&inserts)
                    .execute(conn)?;
            }

            for line in existing {
                let Some(line_id) = line.id else { continue };
                diesel::update(order_lines::table.filter(order_lines::id.eq(line_id)))
                    .set((
                        order_lines::item.eq(line.item),
                        order_lines::qty.eq(line.qty),
                        order_lines::price.eq(line.price),
                        order_lines::amount.eq(line.amount),
                        order_lines::updated_at.eq(now),
                    ))
                    .execute(conn)?;
            }

            Ok(())
        })
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(ApiResponse::ok("Successfully Order Updated")))
}

/// DELETE /api/order/delete/{orderId}
///
/// Both soft-deletes run in one transaction: a NotFound on the line step
/// rolls the header delete back, so an order is never left half-deleted.
#[utoipa::path(
    delete,
    path = "/api/order/delete/{orderId}",
    params(("orderId" = i64, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order soft-deleted, or error field when missing"),
        (status = 401, description = "Missing or invalid bearer token"),
    ),
    tag = "orders"
)]
pub async fn delete_order(
    _current: CurrentCustomer,
    pool: web::Data<DbPool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();

    web::block(move || {
        let mut conn = pool.get()?;
        conn.transaction::<_, AppError, _>(|conn| {
            let now = Some(Utc::now());

            let headers = diesel::update(
                orders::table
                    .filter(orders::id.eq(order_id))
                    .filter(orders::deleted_at.is_null()),
            )
            .set(orders::deleted_at.eq(now))
            .execute(conn)?;
            if headers == 0 {
                return Err(AppError::NotFound("Order"));
            }

            let lines = diesel::update(
                order_lines::table
                    .filter(order_lines::order_id.eq(order_id))
                    .filter(order_lines::deleted_at.is_null()),
            )
            .set(order_lines::deleted_at.eq(now))
            .execute(conn)?;
            if lines == 0 {
                return Err(AppError::NotFound("Order"));
            }

            Ok(())
        })
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(ApiResponse::ok("Successfully Order Deleted")))
}

/// GET /api/order/{orderId}
#[utoipa::path(
    get,
    path = "/api/order/{orderId}",
    params(("orderId" = i64, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order with its lines, or error field when missing", body = OrderDetailResponse),
        (status = 401, description = "Missing or invalid bearer token"),
    ),
    tag = "orders"
)]
pub async fn get_order(
    _current: CurrentCustomer,
    pool: web::Data<DbPool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();

    let found = web::block(move || -> Result<Option<(Order, Vec<OrderLine>)>, AppError> {
        let mut conn = pool.get()?;

        let order = orders::table
            .filter(orders::id.eq(order_id))
            .filter(orders::deleted_at.is_null())
            .select(Order::as_select())
            .first(&mut conn)
            .optional()?;

        let Some(order) = order else {
            return Ok(None);
        };

        let lines = order_lines::table
            .filter(order_lines::order_id.eq(order.id))
            .filter(order_lines::deleted_at.is_null())
            .select(OrderLine::as_select())
            .load(&mut conn)?;

        Ok(Some((order, lines)))
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    let (order, lines) = found.ok_or(AppError::NotFound("Order"))?;

    let detail = OrderDetailResponse {
        id: order.id,
        customer_id: order.customer_id,
        title: order.title,
        order_number: order.order_number,
        note: order.note,
        total: order.total,
        created_at: format_timestamp(order.created_at),
        updated_at: format_updated(order.updated_at),
        order_details: lines.into_iter().map(line_response).collect(),
    };

    Ok(HttpResponse::Ok().json(ApiResponse::ok(detail)))
}

/// GET /api/order
///
/// Optional inclusive date range on creation time, left-joined with the
/// owning customer's name, offset-paginated with a separate total count.
#[utoipa::path(
    get,
    path = "/api/order",
    params(
        ("start_date" = Option<String>, Query, description = "Inclusive start date, YYYY-MM-DD"),
        ("end_date" = Option<String>, Query, description = "Inclusive end date, YYYY-MM-DD"),
        ("page" = Option<i64>, Query, description = "Page number (1-based, default 1)"),
        ("limit" = Option<i64>, Query, description = "Items per page (default 20)"),
    ),
    responses(
        (status = 200, description = "Paginated list of orders", body = [OrderListItem]),
        (status = 422, description = "Malformed date filter"),
        (status = 401, description = "Missing or invalid bearer token"),
    ),
    tag = "orders"
)]
pub async fn list_orders(
    _current: CurrentCustomer,
    pool: web::Data<DbPool>,
    filters: web::Query<OrderListParams>,
    page: web::Query<PageParams>,
) -> Result<HttpResponse, AppError> {
    let filters = filters.into_inner();
    let params = page.into_inner();
    let offset = params.offset();
    let limit = params.limit;

    let start = filters.start_date.as_deref().map(range_start).transpose()?;
    let end = filters.end_date.as_deref().map(range_end).transpose()?;

    let (rows, total) =
        web::block(move || -> Result<(Vec<(Order, Option<String>)>, i64), AppError> {
            let mut conn = pool.get()?;

            let mut count_query = orders::table
                .filter(orders::deleted_at.is_null())
                .count()
                .into_boxed();
            let mut page_query = orders::table
                .left_join(customers::table)
                .filter(orders::deleted_at.is_null())
                .select((Order::as_select(), customers::name.nullable()))
                .order(orders::created_at.desc())
                .into_boxed();

            if let Some(start) = start {
                count_query = count_query.filter(orders::created_at.ge(start));
                page_query = page_query.filter(orders::created_at.ge(start));
            }
            if let Some(end) = end {
                count_query = count_query.filter(orders::created_at.le(end));
                page_query = page_query.filter(orders::created_at.le(end));
            }

            let total: i64 = count_query.get_result(&mut conn)?;
            let rows = page_query.limit(limit).offset(offset).load(&mut conn)?;
            Ok((rows, total))
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    if rows.is_empty() {
        return Ok(HttpResponse::Ok().json(ApiResponse::empty_page(
            Vec::<OrderListItem>::new(),
            "Order",
        )));
    }

    let items: Vec<OrderListItem> = rows
        .into_iter()
        .map(|(order, customer_name)| OrderListItem {
            id: order.id,
            title: order.title,
            order_number: order.order_number,
            note: order.note,
            total: order.total,
            created_by: customer_name.unwrap_or_default(),
            created_at: format_timestamp(order.created_at),
            updated_at: format_updated(order.updated_at),
        })
        .collect();

    Ok(HttpResponse::Ok().json(ApiResponse::page(items, total, offset)))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn line(item: &str, qty: &str, price: &str) -> OrderLineRequest {
        OrderLineRequest {
            id: None,
            item: item.to_string(),
            qty: qty.to_string(),
            price: price.to_string(),
        }
    }

    #[test]
    fn total_is_the_exact_floating_point_sum_of_line_amounts() {
        let lines = vec![line("X", "2", "10.5"), line("Y", "3", "0.1")];

        let (parsed, total) = parse_line_inputs(&lines).expect("parse failed");

        assert_eq!(parsed[0].amount, 21.0);
        assert_eq!(parsed[1].amount, 3.0 * 0.1);
        assert_eq!(total, 21.0 + 3.0 * 0.1);
    }

    #[test]
    fn single_line_scenario_totals_21() {
        let lines = vec![line("X", "2", "10.5")];
        let (parsed, total) = parse_line_inputs(&lines).expect("parse failed");
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].qty, 2);
        assert_eq!(parsed[0].price, 10.5);
        assert_eq!(parsed[0].amount, 21.0);
        assert_eq!(total, 21.0);
    }

    #[test]
    fn bad_qty_rejects_the_whole_request() {
        let lines = vec![line("X", "2", "10.5"), line("Y", "two", "1.0")];
        let result = parse_line_inputs(&lines);
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn bad_price_rejects_the_whole_request() {
        let lines = vec![line("X", "2", "ten")];
        assert!(matches!(
            parse_line_inputs(&lines),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn line_id_is_parsed_when_present_and_non_empty() {
        let mut with_id = line("X", "1", "1.0");
        with_id.id = Some("5".to_string());
        let mut empty_id = line("Y", "1", "1.0");
        empty_id.id = Some(String::new());
        let without_id = line("Z", "1", "1.0");

        let (parsed, _) =
            parse_line_inputs(&[with_id, empty_id, without_id]).expect("parse failed");

        assert_eq!(parsed[0].id, Some(5));
        assert_eq!(parsed[1].id, None);
        assert_eq!(parsed[2].id, None);
    }

    #[test]
    fn malformed_line_id_rejects_the_request() {
        let mut bad = line("X", "1", "1.0");
        bad.id = Some("abc".to_string());
        assert!(matches!(
            parse_line_inputs(&[bad]),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn order_number_is_po_plus_microsecond_timestamp() {
        let now = Utc.with_ymd_and_hms(2026, 8, 7, 9, 5, 1).unwrap();
        let number = make_order_number(now);
        assert_eq!(number, "PO20260807090501.000000");
        assert_eq!(number.len(), 23);
    }

    #[test]
    fn range_start_is_midnight() {
        let start = range_start("2026-08-07").expect("parse failed");
        assert_eq!(
            start,
            Utc.with_ymd_and_hms(2026, 8, 7, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn range_end_is_2359_not_235959() {
        let end = range_end("2026-08-07").expect("parse failed");
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 8, 7, 23, 59, 0).unwrap());
    }

    #[test]
    fn malformed_date_is_a_validation_error() {
        assert!(matches!(
            range_start("07-08-2026"),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            range_end("yesterday"),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn order_request_requires_at_least_one_line() {
        let req = OrderRequest {
            title: "T".to_string(),
            note: "N".to_string(),
            order_details: vec![],
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn order_request_binds_camel_case_line_array() {
        let req: OrderRequest = serde_json::from_str(
            r#"{"title":"T","note":"N","orderDetails":[{"item":"X","qty":"2","price":"10.5"}]}"#,
        )
        .expect("deserialize failed");
        assert_eq!(req.order_details.len(), 1);
        assert_eq!(req.order_details[0].qty, "2");
    }
}
