//! Configuration management for the admission service.
//!
//! Values are layered: built-in defaults, then an optional YAML file, then
//! `TIPSCRIBE__`-prefixed environment variables (`__` separates sections, e.g.
//! `TIPSCRIBE__RATE_LIMITING__POLICIES__AI__MAX_REQUESTS=5`).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Result, TipscribeError};
use crate::ratelimit::{
    Clock, LimiterSet, PolicyConfig, AI_POLICY, GENERAL_POLICY, TRANSCRIPTION_POLICY,
};

const ENV_PREFIX: &str = "TIPSCRIBE";

/// Main configuration for the admission service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TipscribeConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limiting: RateLimitingConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// gRPC server address
    #[serde(default = "default_grpc_addr")]
    pub grpc_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            grpc_addr: default_grpc_addr(),
        }
    }
}

fn default_grpc_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, 8081))
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    /// How often expired client windows are pruned; 0 disables pruning
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Policies by name
    #[serde(default = "default_policies")]
    pub policies: BTreeMap<String, PolicySettings>,
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: default_sweep_interval(),
            policies: default_policies(),
        }
    }
}

impl RateLimitingConfig {
    /// Sweep interval, or `None` when sweeping is disabled.
    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_secs > 0).then(|| Duration::from_secs(self.sweep_interval_secs))
    }
}

fn default_sweep_interval() -> u64 {
    300
}

fn default_policies() -> BTreeMap<String, PolicySettings> {
    [
        (GENERAL_POLICY, PolicyConfig::general()),
        (AI_POLICY, PolicyConfig::ai()),
        (TRANSCRIPTION_POLICY, PolicyConfig::transcription()),
    ]
    .into_iter()
    .map(|(name, policy)| (name.to_string(), PolicySettings::from(&policy)))
    .collect()
}

/// One fixed-window policy as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySettings {
    /// Window length in milliseconds
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,

    /// Requests admitted per window
    pub max_requests: u32,

    /// Message returned on rejection
    #[serde(default = "default_message")]
    pub message: String,
}

fn default_window_ms() -> u64 {
    PolicyConfig::general().window_ms()
}

fn default_message() -> String {
    PolicyConfig::general().rejection_message().to_string()
}

impl From<&PolicyConfig> for PolicySettings {
    fn from(policy: &PolicyConfig) -> Self {
        Self {
            window_ms: policy.window_ms(),
            max_requests: policy.max_requests(),
            message: policy.rejection_message().to_string(),
        }
    }
}

impl TryFrom<&PolicySettings> for PolicyConfig {
    type Error = TipscribeError;

    fn try_from(settings: &PolicySettings) -> Result<Self> {
        PolicyConfig::new(settings.window_ms, settings.max_requests, settings.message.clone())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TipscribeConfig {
    /// Load configuration from defaults, an optional file and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Self::defaults_layer()?;

        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path).required(true));
        }

        Self::finish(builder)
    }

    /// Load configuration from a file path, with environment overrides.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load(Some(path.as_ref()))
    }

    /// Parse configuration from a YAML string.
    ///
    /// Layered exactly like [`TipscribeConfig::load`], with the string in
    /// place of the file.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let builder = Self::defaults_layer()?
            .add_source(::config::File::from_str(yaml, ::config::FileFormat::Yaml));

        Self::finish(builder)
    }

    fn defaults_layer() -> Result<::config::ConfigBuilder<::config::builder::DefaultState>> {
        Ok(::config::Config::builder()
            .add_source(::config::Config::try_from(&TipscribeConfig::default())?))
    }

    fn finish(builder: ::config::ConfigBuilder<::config::builder::DefaultState>) -> Result<Self> {
        let config: TipscribeConfig = builder
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate every policy and build the limiter set.
    pub fn build_limiters(&self, clock: Arc<dyn Clock>) -> Result<LimiterSet> {
        let policies = self
            .rate_limiting
            .policies
            .iter()
            .map(|(name, settings)| {
                PolicyConfig::try_from(settings)
                    .map(|policy| (name.clone(), policy))
                    .map_err(|e| TipscribeError::Config(format!("policy '{}': {}", name, e)))
            })
            .collect::<Result<Vec<_>>>()?;

        LimiterSet::new(policies, clock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::{Decision, ManualClock, SystemClock};
    use std::io::Write;
    use tempfile::NamedTempFile;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_defaults() {
        let config = TipscribeConfig::default();
        assert_eq!(config.server.grpc_addr, "127.0.0.1:8081".parse().unwrap());
        assert_eq!(config.rate_limiting.sweep_interval(), Some(Duration::from_secs(300)));
        assert_eq!(config.rate_limiting.policies.len(), 3);
        assert_eq!(config.rate_limiting.policies[GENERAL_POLICY].max_requests, 100);
        assert_eq!(config.rate_limiting.policies[AI_POLICY].max_requests, 10);
        assert_eq!(config.rate_limiting.policies[TRANSCRIPTION_POLICY].max_requests, 20);
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
server:
  grpc_addr: 0.0.0.0:9000
rate_limiting:
  sweep_interval_secs: 0
  policies:
    uploads:
      window_ms: 1000
      max_requests: 2
      message: Upload limit reached
logging:
  json: true
"#;
        let config = assert_ok!(TipscribeConfig::from_yaml(yaml));
        assert_eq!(config.server.grpc_addr.port(), 9000);
        assert_eq!(config.rate_limiting.sweep_interval(), None);
        // Built-in policies stay underneath the file's own.
        assert_eq!(config.rate_limiting.policies.len(), 4);
        assert!(config.rate_limiting.policies.contains_key(GENERAL_POLICY));
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.json);

        let uploads = &config.rate_limiting.policies["uploads"];
        assert_eq!(uploads.window_ms, 1000);
        assert_eq!(uploads.max_requests, 2);
        assert_eq!(uploads.message, "Upload limit reached");
    }

    #[test]
    fn test_policy_field_defaults() {
        let yaml = r#"
rate_limiting:
  policies:
    exports:
      max_requests: 4
"#;
        let config = assert_ok!(TipscribeConfig::from_yaml(yaml));
        let exports = &config.rate_limiting.policies["exports"];
        assert_eq!(exports.window_ms, 60_000);
        assert!(!exports.message.is_empty());
    }

    #[test]
    fn test_invalid_yaml() {
        assert_err!(TipscribeConfig::from_yaml("server: [unterminated"));
    }

    #[test]
    fn test_build_limiters_rejects_zero_cap() {
        let yaml = r#"
rate_limiting:
  policies:
    broken:
      max_requests: 0
"#;
        let config = TipscribeConfig::from_yaml(yaml).unwrap();
        let err = config.build_limiters(Arc::new(SystemClock)).unwrap_err();
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn test_build_limiters_from_config() {
        let config = TipscribeConfig::default();
        let limiters = config.build_limiters(Arc::new(ManualClock::new(0))).unwrap();

        assert_eq!(limiters.len(), 3);
        for _ in 0..10 {
            assert_eq!(limiters.limiter(AI_POLICY).unwrap().check("1.2.3.4", 0), Decision::Admit);
        }
        assert_eq!(
            limiters.limiter(AI_POLICY).unwrap().check("1.2.3.4", 0),
            Decision::Reject { retry_after_seconds: 60 }
        );
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = TipscribeConfig::load(None).unwrap();
        assert_eq!(config.rate_limiting.policies.len(), 3);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let result = TipscribeConfig::from_file("/nonexistent/tipscribe.yaml");
        assert!(matches!(result, Err(TipscribeError::Config(_))));
    }

    const OVERLAY_YAML: &str = r#"
rate_limiting:
  policies:
    uploads:
      window_ms: 1000
      max_requests: 2
    ai:
      max_requests: 5
"#;

    fn write_yaml(contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_file_and_string_loaders_agree() {
        let file = write_yaml(OVERLAY_YAML);

        let from_file = TipscribeConfig::from_file(file.path()).unwrap();
        let from_str = TipscribeConfig::from_yaml(OVERLAY_YAML).unwrap();

        let file_keys: Vec<_> = from_file.rate_limiting.policies.keys().collect();
        let str_keys: Vec<_> = from_str.rate_limiting.policies.keys().collect();
        assert_eq!(file_keys, vec!["ai", "general", "transcription", "uploads"]);
        assert_eq!(file_keys, str_keys);
        assert_eq!(
            from_file.rate_limiting.policies["uploads"],
            from_str.rate_limiting.policies["uploads"]
        );
    }

    #[test]
    fn test_file_merges_into_default_policy_fields() {
        let file = write_yaml(OVERLAY_YAML);
        let config = TipscribeConfig::load(Some(file.path())).unwrap();

        let ai = &config.rate_limiting.policies[AI_POLICY];
        let default_ai = PolicyConfig::ai();
        assert_eq!(ai.max_requests, 5);
        assert_eq!(ai.window_ms, default_ai.window_ms());
        assert_eq!(ai.message, default_ai.rejection_message());

        assert_eq!(config.rate_limiting.policies[GENERAL_POLICY].max_requests, 100);
        assert_eq!(config.rate_limiting.policies["uploads"].window_ms, 1000);
    }

    #[test]
    fn test_env_overrides_single_policy_field() {
        // Only touches a policy no other test asserts on.
        const VAR: &str = "TIPSCRIBE__RATE_LIMITING__POLICIES__TRANSCRIPTION__MAX_REQUESTS";
        std::env::set_var(VAR, "7");

        let file = write_yaml(OVERLAY_YAML);
        let from_file = TipscribeConfig::load(Some(file.path()));
        let from_str = TipscribeConfig::from_yaml(OVERLAY_YAML);
        std::env::remove_var(VAR);

        for config in [from_file.unwrap(), from_str.unwrap()] {
            let transcription = &config.rate_limiting.policies[TRANSCRIPTION_POLICY];
            assert_eq!(transcription.max_requests, 7);
            assert_eq!(transcription.window_ms, PolicyConfig::transcription().window_ms());
            assert_eq!(
                transcription.message,
                PolicyConfig::transcription().rejection_message()
            );
            assert_eq!(config.rate_limiting.policies[AI_POLICY].max_requests, 5);
        }
    }
}
