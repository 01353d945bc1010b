use std::net::SocketAddr;
use std::path::PathBuf;

use crate::app_config::AppConfig;
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value fails to parse.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the
/// process, without touching `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value fails to parse.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build the configuration through an injected env-var lookup, so the
/// parsing logic is testable against a plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let bind_addr = {
        let raw = or_default("TORIVAHTI_BIND_ADDR", "127.0.0.1:8787");
        raw.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: "TORIVAHTI_BIND_ADDR".to_string(),
                reason: e.to_string(),
            })?
    };

    let log_level = or_default("TORIVAHTI_LOG_LEVEL", "info");
    let data_dir = PathBuf::from(or_default("TORIVAHTI_DATA_DIR", "./data"));

    Ok(AppConfig {
        bind_addr,
        log_level,
        data_dir,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::env::VarError;

    use super::*;

    fn lookup_from_map<'a>(
        map: &'a HashMap<&'a str, &'a str>,
    ) -> impl Fn(&str) -> Result<String, VarError> + 'a {
        move |key| {
            map.get(key)
                .map(|v| (*v).to_string())
                .ok_or(VarError::NotPresent)
        }
    }

    #[test]
    fn empty_env_yields_defaults() {
        let map: HashMap<&str, &str> = HashMap::new();
        let cfg = build_app_config(lookup_from_map(&map)).expect("defaults must work");
        assert_eq!(cfg.bind_addr.to_string(), "127.0.0.1:8787");
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.data_dir, PathBuf::from("./data"));
    }

    #[test]
    fn bind_addr_override() {
        let mut map = HashMap::new();
        map.insert("TORIVAHTI_BIND_ADDR", "0.0.0.0:9000");
        let cfg = build_app_config(lookup_from_map(&map)).unwrap();
        assert_eq!(cfg.bind_addr.to_string(), "0.0.0.0:9000");
    }

    #[test]
    fn invalid_bind_addr_is_rejected() {
        let mut map = HashMap::new();
        map.insert("TORIVAHTI_BIND_ADDR", "not-a-socket-addr");
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "TORIVAHTI_BIND_ADDR"),
            "expected InvalidEnvVar(TORIVAHTI_BIND_ADDR), got: {result:?}"
        );
    }

    #[test]
    fn data_paths_derive_from_data_dir() {
        let mut map = HashMap::new();
        map.insert("TORIVAHTI_DATA_DIR", "/var/lib/torivahti");
        let cfg = build_app_config(lookup_from_map(&map)).unwrap();
        assert_eq!(
            cfg.products_path(),
            PathBuf::from("/var/lib/torivahti/products.json")
        );
        assert_eq!(
            cfg.settings_path(),
            PathBuf::from("/var/lib/torivahti/settings.json")
        );
        assert_eq!(cfg.images_dir(), PathBuf::from("/var/lib/torivahti/images"));
    }
}
