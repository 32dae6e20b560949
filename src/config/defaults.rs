use std::collections::HashMap;

use super::settings::{DetectionConfig, GeoipConfig, LoggingConfig, P0fConfig, ServerConfig};

// ---------------------------------------------------------------------------
// Top-level struct defaults
// ---------------------------------------------------------------------------

pub fn default_server_config() -> ServerConfig {
    ServerConfig {
        bind: default_bind(),
    }
}

pub fn default_detection_config() -> DetectionConfig {
    DetectionConfig {
        allow_reverse_dns: false,
        min_browser_versions_allowed: default_min_browser_versions(),
        blacklist_service_observed_timeout: default_blacklist_service_observed_timeout(),
    }
}

pub fn default_p0f_config() -> P0fConfig {
    P0fConfig {
        socket_path: default_p0f_socket_path(),
        max_wait_ms: default_p0f_max_wait_ms(),
        poll_interval_ms: default_p0f_poll_interval_ms(),
    }
}

pub fn default_geoip_config() -> GeoipConfig {
    GeoipConfig {
        asn_db: default_asn_db(),
    }
}

pub fn default_logging_config() -> LoggingConfig {
    LoggingConfig {
        level: default_log_level(),
        file: default_log_file(),
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

pub fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

/// Empty by default: the obsolete-browser check only applies to families
/// an operator has listed.
pub fn default_min_browser_versions() -> HashMap<String, u32> {
    HashMap::new()
}

pub fn default_blacklist_service_observed_timeout() -> u64 {
    600
}

// ---------------------------------------------------------------------------
// p0f
// ---------------------------------------------------------------------------

pub fn default_p0f_socket_path() -> String {
    "/var/run/p0f.sock".to_string()
}

pub fn default_p0f_max_wait_ms() -> u64 {
    2000
}

pub fn default_p0f_poll_interval_ms() -> u64 {
    10
}

// ---------------------------------------------------------------------------
// GeoIP
// ---------------------------------------------------------------------------

pub fn default_asn_db() -> String {
    "/opt/probe-unmask/data/GeoLite2-ASN.mmdb".to_string()
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

pub fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_log_file() -> String {
    "/opt/probe-unmask/logs/probe-unmask.log".to_string()
}
