//! Configuration loading and types for staticgate.
//!
//! Configuration is read from an optional YAML file and deserialized into
//! the [`Config`] struct.  Command-line flags and the `PORT` / `MINIO_*`
//! environment variables are then layered on top (see [`Overrides`]),
//! and the merged result is validated before the server starts.

use garde::Validate;
use serde::Deserialize;
use std::path::Path;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct Config {
    /// HTTP server settings.
    #[serde(default)]
    #[garde(dive)]
    pub server: ServerConfig,

    /// Object store settings.
    #[serde(default)]
    #[garde(dive)]
    pub storage: StorageConfig,

    /// Response settings for served content.
    #[serde(default)]
    #[garde(dive)]
    pub site: SiteConfig,

    /// Logging settings.
    #[serde(default)]
    #[garde(dive)]
    pub logging: LoggingConfig,

    /// Observability settings (metrics + health probe).
    #[serde(default)]
    #[garde(skip)]
    pub observability: ObservabilityConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ServerConfig {
    /// Bind host address.
    #[serde(default = "default_host")]
    #[garde(length(min = 1))]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    #[garde(range(min = 1))]
    pub port: u16,

    /// Deadline in seconds for resolving and opening an object.
    #[serde(default = "default_request_timeout")]
    #[garde(range(min = 1))]
    pub request_timeout_secs: u64,

    /// Graceful shutdown timeout in seconds.
    #[serde(default = "default_shutdown_timeout")]
    #[garde(skip)]
    pub shutdown_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

/// Object store configuration.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct StorageConfig {
    /// Backend type: `s3` or `memory`.
    #[serde(default = "default_storage_backend")]
    #[garde(pattern(r"^(s3|memory)$"))]
    pub backend: String,

    /// S3-compatible store configuration.
    #[serde(default)]
    #[garde(dive)]
    pub s3: S3StorageConfig,

    /// In-memory store configuration.
    #[serde(default)]
    #[garde(skip)]
    pub memory: MemoryStorageConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            s3: S3StorageConfig::default(),
            memory: MemoryStorageConfig::default(),
        }
    }
}

/// S3-compatible store configuration (MinIO, AWS S3, ...).
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct S3StorageConfig {
    /// Endpoint, either bare `host:port` or a full URL.
    #[serde(default = "default_endpoint")]
    #[garde(length(min = 1))]
    pub endpoint: String,

    /// Access key.
    #[serde(alias = "access_key_id", default)]
    #[garde(skip)]
    pub access_key: String,

    /// Secret key.
    #[serde(alias = "secret_access_key", default)]
    #[garde(skip)]
    pub secret_key: String,

    /// Use HTTPS when the endpoint has no scheme.
    #[serde(default)]
    #[garde(skip)]
    pub use_ssl: bool,

    /// Region to sign requests for.
    #[serde(default = "default_region")]
    #[garde(length(min = 1))]
    pub region: String,

    /// Force path-style URL addressing (required by most MinIO setups).
    #[serde(default = "default_true")]
    #[garde(skip)]
    pub force_path_style: bool,
}

impl Default for S3StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            access_key: String::new(),
            secret_key: String::new(),
            use_ssl: false,
            region: default_region(),
            force_path_style: true,
        }
    }
}

/// In-memory store configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemoryStorageConfig {
    /// Directory whose first-level subdirectories are loaded as buckets.
    #[serde(default)]
    pub seed_dir: Option<String>,
}

/// Response settings for served objects.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SiteConfig {
    /// `max-age` in seconds for the `Cache-Control` header.
    #[serde(default = "default_cache_max_age")]
    #[garde(range(min = 1))]
    pub cache_max_age: u32,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            cache_max_age: default_cache_max_age(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    #[garde(pattern(r"^(trace|debug|info|warn|error)$"))]
    pub level: String,

    /// Log format: text or json.
    #[serde(default = "default_log_format")]
    #[garde(pattern(r"^(text|json)$"))]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Observability settings.
///
/// Controls Prometheus metrics collection and the health probe.
/// Both are enabled by default.
#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    /// Enable Prometheus metrics collection and the `/_metrics` endpoint.
    #[serde(default = "default_true")]
    pub metrics: bool,

    /// Enable the `/_health` probe.
    #[serde(default = "default_true")]
    pub health_check: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics: true,
            health_check: true,
        }
    }
}

// -- Defaults ----------------------------------------------------------------

fn default_true() -> bool {
    true
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    15
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_storage_backend() -> String {
    "s3".to_string()
}

fn default_endpoint() -> String {
    "minio:9000".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_cache_max_age() -> u32 {
    3600
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

// -- Overrides ---------------------------------------------------------------

/// Values from the command line or environment that win over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub port: Option<u16>,
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub use_ssl: Option<bool>,
}

impl Config {
    /// Apply `overrides` on top of the loaded values.
    ///
    /// Empty strings are treated as unset, matching how the environment
    /// variables behave when exported without a value.
    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(endpoint) = non_empty(&overrides.endpoint) {
            self.storage.s3.endpoint = endpoint;
        }
        if let Some(access_key) = non_empty(&overrides.access_key) {
            self.storage.s3.access_key = access_key;
        }
        if let Some(secret_key) = non_empty(&overrides.secret_key) {
            self.storage.s3.secret_key = secret_key;
        }
        if let Some(use_ssl) = overrides.use_ssl {
            self.storage.s3.use_ssl = use_ssl;
        }
    }

    /// Validate the merged configuration.
    ///
    /// Beyond the per-field rules, the `s3` backend requires both an access
    /// key and a secret key.
    pub fn check(&self) -> anyhow::Result<()> {
        self.validate()
            .map_err(|report| anyhow::anyhow!("invalid configuration: {report}"))?;

        if self.storage.backend == "s3"
            && (self.storage.s3.access_key.is_empty() || self.storage.s3.secret_key.is_empty())
        {
            anyhow::bail!(
                "storage.s3.access_key and storage.s3.secret_key must be set (MINIO_ACCESS_KEY / MINIO_SECRET_KEY)"
            );
        }
        Ok(())
    }

    /// `host:port` to bind the listener to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}

/// Parse a boolean the way `MINIO_USE_SSL` has always been written:
/// `1`, `t`, `T`, `TRUE`, `true`, `True` and their false counterparts.
pub fn parse_bool_flag(value: &str) -> Result<bool, String> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        other => Err(format!("invalid boolean value: {other:?}")),
    }
}

// -- Loader ------------------------------------------------------------------

/// Load and parse configuration from a YAML file at `path`.
pub fn load_config<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    let config: Config = serde_yaml::from_str(&contents)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn valid_s3_config() -> Config {
        let mut config = Config::default();
        config.storage.s3.access_key = "minio".to_string();
        config.storage.s3.secret_key = "minio-secret".to_string();
        config
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.request_timeout_secs, 15);
        assert_eq!(config.storage.backend, "s3");
        assert_eq!(config.storage.s3.endpoint, "minio:9000");
        assert!(!config.storage.s3.use_ssl);
        assert!(config.storage.s3.force_path_style);
        assert_eq!(config.site.cache_max_age, 3600);
        assert_eq!(config.logging.format, "json");
        assert!(config.observability.metrics);
        assert!(config.observability.health_check);
    }

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.storage.s3.region, "us-east-1");
    }

    #[test]
    fn test_partial_yaml() {
        let yaml = r#"
server:
  port: 9000
storage:
  s3:
    endpoint: "https://s3.example.com"
    access_key_id: "AKIA"
    secret_access_key: "shh"
site:
  cache_max_age: 60
logging:
  format: text
observability:
  metrics: false
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.storage.s3.endpoint, "https://s3.example.com");
        assert_eq!(config.storage.s3.access_key, "AKIA");
        assert_eq!(config.storage.s3.secret_key, "shh");
        assert_eq!(config.site.cache_max_age, 60);
        assert_eq!(config.logging.format, "text");
        assert!(!config.observability.metrics);
        assert!(config.observability.health_check);
        assert!(config.check().is_ok());
    }

    #[test]
    fn test_memory_backend_yaml() {
        let yaml = r#"
storage:
  backend: memory
  memory:
    seed_dir: ./sites
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.storage.backend, "memory");
        assert_eq!(config.storage.memory.seed_dir.as_deref(), Some("./sites"));
        // No credentials needed for the memory backend.
        assert!(config.check().is_ok());
    }

    #[test]
    fn test_overrides_win() {
        let mut config = Config::default();
        config.apply_overrides(&Overrides {
            port: Some(3000),
            endpoint: Some("localhost:9000".to_string()),
            access_key: Some("ak".to_string()),
            secret_key: Some("sk".to_string()),
            use_ssl: Some(true),
        });
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.storage.s3.endpoint, "localhost:9000");
        assert_eq!(config.storage.s3.access_key, "ak");
        assert_eq!(config.storage.s3.secret_key, "sk");
        assert!(config.storage.s3.use_ssl);
        assert_eq!(config.bind_addr(), "0.0.0.0:3000");
    }

    #[test]
    fn test_empty_overrides_ignored() {
        let mut config = valid_s3_config();
        config.apply_overrides(&Overrides {
            endpoint: Some(String::new()),
            access_key: Some(String::new()),
            ..Overrides::default()
        });
        assert_eq!(config.storage.s3.endpoint, "minio:9000");
        assert_eq!(config.storage.s3.access_key, "minio");
    }

    #[test]
    fn test_s3_requires_credentials() {
        let config = Config::default();
        let err = config.check().unwrap_err();
        assert!(err.to_string().contains("access_key"));

        assert!(valid_s3_config().check().is_ok());

        let mut config = valid_s3_config();
        config.storage.s3.secret_key.clear();
        assert!(config.check().is_err());

        let mut config = Config::default();
        config.storage.backend = "memory".to_string();
        assert!(config.check().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = valid_s3_config();
        config.site.cache_max_age = 0;
        assert!(config.check().is_err());

        let mut config = valid_s3_config();
        config.storage.backend = "gcs".to_string();
        assert!(config.check().is_err());

        let mut config = valid_s3_config();
        config.logging.format = "xml".to_string();
        assert!(config.check().is_err());

        let mut config = valid_s3_config();
        config.server.port = 0;
        assert!(config.check().is_err());
    }

    #[test]
    fn test_parse_bool_flag() {
        for v in ["1", "t", "T", "TRUE", "true", "True"] {
            assert_eq!(parse_bool_flag(v), Ok(true), "{v}");
        }
        for v in ["0", "f", "F", "FALSE", "false", "False"] {
            assert_eq!(parse_bool_flag(v), Ok(false), "{v}");
        }
        assert!(parse_bool_flag("yes").is_err());
        assert!(parse_bool_flag("").is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("failed to create temp file");
        writeln!(file, "server:\n  port: 7070\nlogging:\n  level: debug").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.server.port, 7070);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_example_config_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("staticgate.example.yaml");
        let config = load_config(path).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.storage.backend, "s3");
        assert_eq!(config.storage.memory.seed_dir, None);
        assert_eq!(config.site.cache_max_age, 3600);
    }

    #[test]
    fn test_load_config_missing_file() {
        assert!(load_config("/nonexistent/staticgate.yaml").is_err());
    }

    #[test]
    fn test_load_config_malformed() {
        let mut file = tempfile::NamedTempFile::new().expect("failed to create temp file");
        writeln!(file, "server: [not, a, map").unwrap();
        assert!(load_config(file.path()).is_err());
    }
}
