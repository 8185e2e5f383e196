use std::env;
use dotenvy::dotenv;

#[derive(Clone)]
pub struct Config {
    pub server_addr: String,
    pub database_url: String,

    /// "mysql" (default) or "memory" for local runs without a database.
    pub store_backend: String,

    // Rate limiting
    pub rate_punch_per_min: u32,
    pub rate_admin_per_min: u32,
    pub rate_query_per_min: u32,

    /// How long the admin fan-out list may be served from cache.
    pub admin_cache_ttl_secs: u64,

    pub api_prefix: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let store_backend = env::var("STORE_BACKEND").unwrap_or_else(|_| "mysql".to_string());
        let database_url = if store_backend == "memory" {
            env::var("DATABASE_URL").unwrap_or_default()
        } else {
            env::var("DATABASE_URL").expect("DATABASE_URL must be set")
        };

        Self {
            server_addr: env::var("SERVER_ADDR").expect("SERVER_ADDR must be set"),
            database_url,
            store_backend,

            rate_punch_per_min: env::var("RATE_PUNCH_PER_MIN")
                .unwrap_or_else(|_| "120".to_string())
                .parse()
                .unwrap(),
            rate_admin_per_min: env::var("RATE_ADMIN_PER_MIN")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .unwrap(),
            rate_query_per_min: env::var("RATE_QUERY_PER_MIN")
                .unwrap_or_else(|_| "600".to_string())
                .parse()
                .unwrap(),

            admin_cache_ttl_secs: env::var("ADMIN_CACHE_TTL_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .unwrap(),

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),
        }
    }
}
