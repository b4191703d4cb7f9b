use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// All parsing and validation lives here so tests can drive it with a plain
/// `HashMap` instead of mutating the process environment.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let database_url = require("DATABASE_URL")?;

    let env = parse_environment(&or_default("SHOPCRAWL_ENV", "development"))?;
    let log_level = or_default("SHOPCRAWL_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("SHOPCRAWL_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("SHOPCRAWL_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("SHOPCRAWL_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let request_timeout_secs = parse_u64("SHOPCRAWL_REQUEST_TIMEOUT_SECS", "30")?;
    let user_agent = or_default(
        "SHOPCRAWL_USER_AGENT",
        "shopcrawl/0.1 (+catalog-import)",
    );

    let crawl_base_url = optional("SHOPCRAWL_CRAWL_BASE_URL");
    let crawl_start_page = parse_u32("SHOPCRAWL_CRAWL_START_PAGE", "1")?;
    let crawl_max_pages = parse_u32("SHOPCRAWL_CRAWL_MAX_PAGES", "5")?;
    let inter_request_delay_ms = parse_u64("SHOPCRAWL_INTER_REQUEST_DELAY_MS", "3000")?;
    let page_param = or_default("SHOPCRAWL_PAGE_PARAM", "page");
    let profiles_path = optional("SHOPCRAWL_PROFILES_PATH").map(PathBuf::from);

    let serp_search_url = or_default(
        "SHOPCRAWL_SERP_SEARCH_URL",
        "https://www.google.com/search",
    );
    let serp_own_domain = optional("SHOPCRAWL_SERP_OWN_DOMAIN");
    let serp_competitors = parse_domain_list(&or_default("SHOPCRAWL_SERP_COMPETITORS", ""));

    let import_max_concurrent_downloads =
        parse_usize("SHOPCRAWL_IMPORT_MAX_CONCURRENT_DOWNLOADS", "4")?;

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        request_timeout_secs,
        user_agent,
        crawl_base_url,
        crawl_start_page,
        crawl_max_pages,
        inter_request_delay_ms,
        page_param,
        profiles_path,
        serp_search_url,
        serp_own_domain,
        serp_competitors,
        import_max_concurrent_downloads,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "SHOPCRAWL_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

/// Splits a comma-separated domain list, lowercasing and dropping blanks.
fn parse_domain_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|d| d.trim().trim_start_matches("www.").to_lowercase())
        .filter(|d| !d.is_empty())
        .collect()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
