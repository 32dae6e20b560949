use std::collections::HashMap;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;

use super::defaults;

/// Top-level configuration for the probe-unmask service.
/// Deserializes from a TOML configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "defaults::default_server_config")]
    pub server: ServerConfig,

    #[serde(default = "defaults::default_detection_config")]
    pub detection: DetectionConfig,

    #[serde(default = "defaults::default_p0f_config")]
    pub p0f: P0fConfig,

    #[serde(default = "defaults::default_geoip_config")]
    pub geoip: GeoipConfig,

    #[serde(default = "defaults::default_logging_config")]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub vendor_rules: Vec<VendorRuleConfig>,
}

impl Settings {
    /// Load configuration from a TOML file at the given path.
    pub fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;
        Self::from_toml(&content).with_context(|| format!("Failed to parse config file: {}", path))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        for rule in &self.vendor_rules {
            // an empty needle would match every request carrying the field
            if rule.contains.trim().is_empty() {
                bail!("vendor rule '{}' has an empty `contains` pattern", rule.name);
            }
        }
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: defaults::default_server_config(),
            detection: defaults::default_detection_config(),
            p0f: defaults::default_p0f_config(),
            geoip: defaults::default_geoip_config(),
            logging: defaults::default_logging_config(),
            vendor_rules: Vec::new(),
        }
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "defaults::default_bind")]
    pub bind: String,
}

/// Inputs read by the detection rules on every evaluation.
#[derive(Debug, Clone, Deserialize)]
pub struct DetectionConfig {
    /// Reverse DNS sends traffic towards the client, so it is opt-in.
    #[serde(default)]
    pub allow_reverse_dns: bool,

    /// Browser family (as the UA parser names it) to lowest acceptable major version.
    #[serde(default = "defaults::default_min_browser_versions")]
    pub min_browser_versions_allowed: HashMap<String, u32>,

    #[serde(default = "defaults::default_blacklist_service_observed_timeout")]
    pub blacklist_service_observed_timeout: u64,
}

/// p0f daemon API socket and polling bounds.
#[derive(Debug, Clone, Deserialize)]
pub struct P0fConfig {
    #[serde(default = "defaults::default_p0f_socket_path")]
    pub socket_path: String,

    #[serde(default = "defaults::default_p0f_max_wait_ms")]
    pub max_wait_ms: u64,

    #[serde(default = "defaults::default_p0f_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl P0fConfig {
    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// GeoIP database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GeoipConfig {
    #[serde(default = "defaults::default_asn_db")]
    pub asn_db: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "defaults::default_log_level")]
    pub level: String,

    #[serde(default = "defaults::default_log_file")]
    pub file: String,
}

/// Which request attribute a vendor rule inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VendorField {
    Ptr,
    UserAgent,
}

/// An organization-specific rule: the field contains `contains`
/// (case-insensitive) and the declared OS disagrees with the observed one.
#[derive(Debug, Clone, Deserialize)]
pub struct VendorRuleConfig {
    pub name: String,
    pub field: VendorField,
    pub contains: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings.server.bind, "0.0.0.0:8080");
        assert!(!settings.detection.allow_reverse_dns);
        assert_eq!(settings.detection.blacklist_service_observed_timeout, 600);
        assert_eq!(settings.p0f.poll_interval(), Duration::from_millis(10));
        assert!(settings.vendor_rules.is_empty());
    }

    #[test]
    fn test_full_file() {
        let settings = Settings::from_toml(
            r#"
            [server]
            bind = "127.0.0.1:9000"

            [detection]
            allow_reverse_dns = true
            blacklist_service_observed_timeout = 30

            [detection.min_browser_versions_allowed]
            Chrome = 90

            [p0f]
            socket_path = "/tmp/p0f.sock"
            max_wait_ms = 500

            [[vendor_rules]]
            name = "vendor_a"
            field = "ptr"
            contains = "scanner.example"

            [[vendor_rules]]
            name = "vendor_b"
            field = "user_agent"
            contains = "VendorB"
            "#,
        )
        .unwrap();

        assert!(settings.detection.allow_reverse_dns);
        assert_eq!(settings.detection.blacklist_service_observed_timeout, 30);
        assert_eq!(settings.detection.min_browser_versions_allowed.len(), 1);
        assert_eq!(settings.detection.min_browser_versions_allowed["Chrome"], 90);
        assert_eq!(settings.p0f.socket_path, "/tmp/p0f.sock");
        assert_eq!(settings.p0f.max_wait(), Duration::from_millis(500));
        assert_eq!(settings.p0f.poll_interval_ms, 10);
        assert_eq!(settings.vendor_rules.len(), 2);
        assert_eq!(settings.vendor_rules[0].field, VendorField::Ptr);
        assert_eq!(settings.vendor_rules[1].field, VendorField::UserAgent);
    }

    #[test]
    fn test_rejects_unknown_vendor_field() {
        let result = Settings::from_toml(
            r#"
            [[vendor_rules]]
            name = "x"
            field = "cookie"
            contains = "y"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_empty_vendor_pattern() {
        for contains in ["", "   "] {
            let toml = format!(
                "[[vendor_rules]]\nname = \"vendor_a\"\nfield = \"ptr\"\ncontains = \"{}\"\n",
                contains
            );
            let err = Settings::from_toml(&toml).unwrap_err();
            assert!(err.to_string().contains("vendor_a"));
        }
    }

    #[test]
    fn test_load_missing_file_reports_path() {
        let err = Settings::load("/nonexistent/probe-unmask.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/probe-unmask.toml"));
    }
}
