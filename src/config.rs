// ABOUTME: Runtime configuration read from environment variables (optionally via a .env file)
// ABOUTME: Covers the listen address, database URL, paging sizes, and the house account new users follow

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// Sits per page in the social stream. Override with PER_PAGE.
    pub per_page: u64,
    /// How many sits a profile shows. Override with LATEST_SITS.
    pub latest_sits: u64,
    /// Username every new account follows on registration.
    pub welcome_account: Option<String>,
    pub cookie_secure: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:opensit.db?mode=rwc".to_string(),
            host: "0.0.0.0".to_string(),
            port: 3000,
            per_page: 10,
            latest_sits: 3,
            welcome_account: None,
            cookie_secure: false,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let database_url = std::env::var("DATABASE_URL").unwrap_or(defaults.database_url);
        let host = std::env::var("HOST").unwrap_or(defaults.host);
        let port = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.port);
        let per_page = std::env::var("PER_PAGE")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|n: &u64| *n > 0)
            .unwrap_or(defaults.per_page);
        let latest_sits = std::env::var("LATEST_SITS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.latest_sits);
        let welcome_account = std::env::var("WELCOME_ACCOUNT")
            .ok()
            .filter(|s| !s.trim().is_empty());
        let cookie_secure = std::env::var("COOKIE_SECURE")
            .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE"))
            .unwrap_or(false);

        Self {
            database_url,
            host,
            port,
            per_page,
            latest_sits,
            welcome_account,
            cookie_secure,
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
