pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod pagination;
pub mod responses;
pub mod schema;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel::prelude::*;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use config::Config;
pub use db::{create_pool, DbPool};

use errors::AppError;
use models::customer::NewCustomer;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) {
    let mut conn = pool
        .get()
        .expect("Failed to get DB connection for migrations");
    conn.run_pending_migrations(MIGRATIONS)
        .expect("Failed to run database migrations");
}

/// Insert the bootstrap customer when the database holds no live customer
/// yet, so a fresh deployment has an account that can log in.
pub fn seed_default_customer(pool: &DbPool) {
    use schema::customers;

    let mut conn = pool.get().expect("Failed to get DB connection for seeding");
    let live: i64 = customers::table
        .filter(customers::deleted_at.is_null())
        .count()
        .get_result(&mut conn)
        .expect("Failed to count customers");
    if live > 0 {
        return;
    }

    let password_hash =
        bcrypt::hash("123456", bcrypt::DEFAULT_COST).expect("Failed to hash seed password");
    diesel::insert_into(customers::table)
        .values(&NewCustomer {
            name: "test".to_string(),
            email: "test@test.com".to_string(),
            password_hash,
        })
        .execute(&mut conn)
        .expect("Failed to seed default customer");
    log::info!("Seeded bootstrap customer test@test.com");
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::login,
        handlers::customers::list_customers,
        handlers::customers::create_customer,
        handlers::customers::get_customer,
        handlers::customers::update_customer,
        handlers::customers::delete_customer,
        handlers::orders::list_orders,
        handlers::orders::create_order,
        handlers::orders::get_order,
        handlers::orders::update_order,
        handlers::orders::delete_order,
    ),
    components(schemas(
        handlers::auth::LoginRequest,
        auth::TokenPair,
        handlers::customers::CustomerCreateRequest,
        handlers::customers::CustomerUpdateRequest,
        handlers::customers::CustomerResponse,
        handlers::orders::OrderRequest,
        handlers::orders::OrderLineRequest,
        handlers::orders::CreateOrderResponse,
        handlers::orders::OrderListItem,
        handlers::orders::OrderLineResponse,
        handlers::orders::OrderDetailResponse,
        pagination::PageParams,
    )),
    tags(
        (name = "auth", description = "Login and token issuance"),
        (name = "customers", description = "Customer management"),
        (name = "orders", description = "Order management"),
    )
)]
pub struct ApiDoc;

/// Build and return an actix-web `Server` bound to the configured
/// host/port. The caller is responsible for `.await`-ing (or
/// `tokio::spawn`-ing) the returned server.
///
/// Every route except `/login` requires a bearer token; protection is
/// enforced by handlers taking a `CurrentCustomer` argument.
pub fn build_server(pool: DbPool, config: Config) -> std::io::Result<actix_web::dev::Server> {
    let host = config.host.clone();
    let port = config.port;

    Ok(HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(config.clone()))
            .app_data(web::JsonConfig::default().error_handler(|err, _req| {
                // Malformed or incomplete JSON bodies are validation
                // failures, not bad requests.
                AppError::Validation(err.to_string()).into()
            }))
            .wrap(Logger::default())
            .route("/login", web::post().to(handlers::auth::login))
            .service(
                web::scope("/api/customer")
                    .route("", web::get().to(handlers::customers::list_customers))
                    .route("/create", web::post().to(handlers::customers::create_customer))
                    .route(
                        "/{customerId}",
                        web::get().to(handlers::customers::get_customer),
                    )
                    .route(
                        "/update/{customerId}",
                        web::put().to(handlers::customers::update_customer),
                    )
                    .route(
                        "/delete/{customerId}",
                        web::delete().to(handlers::customers::delete_customer),
                    ),
            )
            .service(
                web::scope("/api/order")
                    .route("", web::get().to(handlers::orders::list_orders))
                    .route("/create", web::post().to(handlers::orders::create_order))
                    .route("/{orderId}", web::get().to(handlers::orders::get_order))
                    .route(
                        "/update/{orderId}",
                        web::put().to(handlers::orders::update_order),
                    )
                    .route(
                        "/delete/{orderId}",
                        web::delete().to(handlers::orders::delete_order),
                    ),
            )
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", ApiDoc::openapi()),
            )
    })
    .bind((host, port))?
    .run())
}
