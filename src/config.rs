use std::env;

/// Runtime settings, read once at startup. `JWT_ACCESS_SECRET` and
/// `JWT_REFRESH_SECRET` are independent keys: access tokens and refresh
/// tokens never verify against each other's secret.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub access_token_secret: String,
    pub refresh_token_secret: String,
}

impl Config {
    /// Read configuration from the environment (after `dotenvy` has loaded
    /// any `.env` file). Missing required values abort startup.
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8081".to_string())
                .parse()
                .expect("PORT must be a valid number"),
            access_token_secret: env::var("JWT_ACCESS_SECRET")
                .expect("JWT_ACCESS_SECRET must be set"),
            refresh_token_secret: env::var("JWT_REFRESH_SECRET")
                .expect("JWT_REFRESH_SECRET must be set"),
        }
    }
}
