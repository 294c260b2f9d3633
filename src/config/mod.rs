// Configuration module entry point
// Loads server, logging, performance and HTTP settings

mod types;

use std::net::SocketAddr;

pub use types::{Config, HttpConfig, LoggingConfig, PerformanceConfig, ServerConfig};

/// Environment variable prefix, e.g. `TINYGIN_SERVER__PORT=9000`
const ENV_PREFIX: &str = "TINYGIN";

impl Config {
    /// Load configuration from the default `config` file (any format the
    /// `config` crate recognizes, e.g. `config.toml`) plus environment.
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from specified file path (without extension)
    ///
    /// The file is optional; missing keys fall back to [`Config::default`].
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Parse configuration from an in-memory TOML document
    pub fn from_toml_str(source: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    /// `server.host` and `server.port` as a socket address; the host must
    /// be an IP literal.
    pub fn get_socket_addr(&self) -> crate::Result<SocketAddr> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        addr.parse()
            .map_err(|e| crate::Error::Address(format!("{addr}: {e}")))
    }

    /// Whether route registration should be logged
    pub fn is_debug(&self) -> bool {
        self.logging.level.eq_ignore_ascii_case("debug")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.server.port, 8082);
        assert_eq!(cfg.logging.access_log_format, "combined");
        assert_eq!(cfg.http.max_body_size, 10_485_760);
        assert!(cfg.performance.max_connections.is_none());
        assert!(!cfg.is_debug());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let cfg = Config::from_toml_str(
            r#"
            [server]
            port = 9090

            [logging]
            level = "debug"
            access_log_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.server.port, 9090);
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert!(cfg.is_debug());
        assert_eq!(cfg.logging.access_log_format, "json");
        assert!(cfg.logging.access_log);
        assert_eq!(cfg.performance.read_timeout, 30);
    }

    #[test]
    fn test_socket_addr() {
        let mut cfg = Config::default();
        cfg.server.host = "0.0.0.0".to_string();
        cfg.server.port = 3000;
        assert_eq!(
            cfg.get_socket_addr().unwrap(),
            "0.0.0.0:3000".parse::<SocketAddr>().unwrap()
        );

        cfg.server.host = "not a host".to_string();
        assert!(matches!(
            cfg.get_socket_addr(),
            Err(crate::Error::Address(msg)) if msg.starts_with("not a host:3000")
        ));
    }

    #[test]
    fn test_missing_file_is_not_an_error() {
        let cfg = Config::load_from("definitely-not-a-config-file").unwrap();
        assert_eq!(cfg.http.server_name, Config::default().http.server_name);
    }
}
