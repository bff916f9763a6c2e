use std::sync::LazyLock;

pub static ENV: LazyLock<Env> = LazyLock::new(|| {
    dotenvy::dotenv().ok();
    log::info!("Environment variables loaded from .env file");
    Env::default()
});

pub struct Env {
    pub jwt_secret: String,
    pub database_url: String,
    pub frontend_url: String,
    pub ip: String,
    pub port: u16,
    pub append_retries: u32,
    pub lock_timeout_ms: u64,
    pub max_page_size: u32,
}

impl Env {
    fn new() -> Self {
        let jwt_secret = std::env::var("SECRET_KEY")
            .expect("SECRET_KEY must be set in .env file or environment variable");

        let database_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set in .env file or environment variable");

        let frontend_url =
            std::env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:5173".to_string());
        let ip = std::env::var("IP").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .expect("PORT must be a valid u16 integer");

        let append_retries = parsed_or("APPEND_RETRIES", 3);
        let lock_timeout_ms = parsed_or("LOCK_TIMEOUT_MS", 2000);
        let max_page_size = parsed_or("MAX_PAGE_SIZE", 100);

        Env {
            jwt_secret,
            database_url,
            frontend_url,
            ip,
            port,
            append_retries,
            lock_timeout_ms,
            max_page_size,
        }
    }
}

/// Engine tunables fall back to their defaults when unset.
fn parsed_or<T>(name: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("{name} must be a valid {}", std::any::type_name::<T>())),
        Err(_) => default,
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}
