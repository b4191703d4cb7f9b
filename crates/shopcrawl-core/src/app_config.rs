use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    /// Listing URL to crawl when the caller does not pass one explicitly.
    pub crawl_base_url: Option<String>,
    pub crawl_start_page: u32,
    pub crawl_max_pages: u32,
    pub inter_request_delay_ms: u64,
    /// Query parameter carrying the page number on listing URLs.
    pub page_param: String,
    /// YAML extraction profiles; `None` means the built-in generic profile.
    pub profiles_path: Option<PathBuf>,
    pub serp_search_url: String,
    pub serp_own_domain: Option<String>,
    pub serp_competitors: Vec<String>,
    pub import_max_concurrent_downloads: usize,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("crawl_base_url", &self.crawl_base_url)
            .field("crawl_start_page", &self.crawl_start_page)
            .field("crawl_max_pages", &self.crawl_max_pages)
            .field("inter_request_delay_ms", &self.inter_request_delay_ms)
            .field("page_param", &self.page_param)
            .field("profiles_path", &self.profiles_path)
            .field("serp_search_url", &self.serp_search_url)
            .field("serp_own_domain", &self.serp_own_domain)
            .field("serp_competitors", &self.serp_competitors)
            .field(
                "import_max_concurrent_downloads",
                &self.import_max_concurrent_downloads,
            )
            .finish()
    }
}
