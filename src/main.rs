use dotenvy::dotenv;
use order_backend::{build_server, create_pool, run_migrations, seed_default_customer, Config};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env();
    let pool = create_pool(&config.database_url);
    run_migrations(&pool);
    seed_default_customer(&pool);

    log::info!("Starting server at http://{}:{}", config.host, config.port);

    build_server(pool, config)?.await
}
