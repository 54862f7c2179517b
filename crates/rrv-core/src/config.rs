use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

pub const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";
pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_USER_AGENT: &str = "RestaurantReviewApp/1.0 (rrv)";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if values are invalid or API keys are missing
/// outside development.
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
/// Returns `ConfigError` if values are invalid or API keys are missing
/// outside development.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Parsing is decoupled from the process environment so it can be tested
/// with a plain `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_coord = |var: &str, default: &str, bound: f64| -> Result<f64, ConfigError> {
        let value = or_default(var, default)
            .parse::<f64>()
            .map_err(|e| invalid(var, e.to_string()))?;
        if !value.is_finite() || value.abs() > bound {
            return Err(invalid(var, format!("must be within ±{bound}")));
        }
        Ok(value)
    };

    let env = parse_environment(&or_default("RRV_ENV", "development"))?;

    let bind_addr = parse_addr("RRV_BIND_ADDR", "0.0.0.0:5000")?;
    let log_level = or_default("RRV_LOG_LEVEL", "info");
    let static_dir = optional("RRV_STATIC_DIR").map(PathBuf::from);
    let database_url = optional("DATABASE_URL");

    let api_keys: Vec<String> = or_default("RRV_API_KEYS", "")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect();
    if api_keys.is_empty() && env != Environment::Development {
        return Err(ConfigError::MissingEnvVar("RRV_API_KEYS".to_string()));
    }

    let db_max_connections = parse_u32("RRV_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("RRV_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("RRV_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let overpass_url = or_default("RRV_OVERPASS_URL", DEFAULT_OVERPASS_URL);
    let nominatim_url = or_default("RRV_NOMINATIM_URL", DEFAULT_NOMINATIM_URL);
    let user_agent = or_default("RRV_USER_AGENT", DEFAULT_USER_AGENT);
    let http_timeout_secs = parse_u64("RRV_HTTP_TIMEOUT_SECS", "30")?;

    let search_center_lat = parse_coord("RRV_SEARCH_CENTER_LAT", "-29.5", 90.0)?;
    let search_center_lon = parse_coord("RRV_SEARCH_CENTER_LON", "28.5", 180.0)?;
    let search_radius_m = parse_u32("RRV_SEARCH_RADIUS_M", "200000")?;

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        static_dir,
        database_url,
        api_keys,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        overpass_url,
        nominatim_url,
        user_agent,
        http_timeout_secs,
        search_center_lat,
        search_center_lon,
        search_radius_m,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "RRV_ENV".to_string(),
            reason: format!("expected development, test, or production; got '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
