mod api;
mod config;
mod error;
mod models;
mod protection;
mod sources;
#[cfg(test)]
mod testing;

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::api::routes::AppState;
use crate::api::server::ApiServer;
use crate::config::settings::Settings;
use crate::protection::cooldown::DisclosureCooldown;
use crate::protection::enrichment::{Enricher, EnrichmentConfig};
use crate::protection::pipeline::ProtectionPipeline;
use crate::protection::rules::RuleSet;
use crate::sources::asn::MaxMindAsnLookup;
use crate::sources::p0f::P0fClient;
use crate::sources::reverse_dns::DigResolver;
use crate::sources::user_agent::BuiltinUaParser;

const DEFAULT_CONFIG_PATH: &str = "/opt/probe-unmask/config/probe-unmask.toml";

/// Config file named by `--config <path>` or `--config=<path>`, falling back
/// to [`DEFAULT_CONFIG_PATH`]. The last occurrence wins.
fn config_path_from(args: impl IntoIterator<Item = String>) -> String {
    let mut config_path = None;
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        if let Some(path) = arg.strip_prefix("--config=") {
            config_path = Some(path.to_string());
        } else if arg == "--config" {
            config_path = args.next().or(config_path);
        }
    }

    config_path.unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
}

/// Initialise the `tracing` subscriber with stdout and, when the log file
/// can be opened, file output.
fn init_tracing(level: &str, log_file: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},probe_unmask=debug", level)));

    let stdout_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true);

    if let Some(dir) = std::path::Path::new(log_file).parent() {
        let _ = std::fs::create_dir_all(dir);
    }
    let file_layer = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .ok()
        .map(|file| {
            fmt::layer()
                .with_writer(Arc::new(file))
                .with_ansi(false)
                .with_target(true)
        });

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ---------------------------------------------------------------
    // 1. Configuration
    // ---------------------------------------------------------------
    let config_path = config_path_from(std::env::args().skip(1));
    let settings = match Settings::load(&config_path) {
        Ok(s) => s,
        Err(e) if !std::path::Path::new(&config_path).exists() => {
            eprintln!("{:#}; continuing with defaults", e);
            Settings::default()
        }
        Err(e) => return Err(e),
    };
    let settings = Arc::new(settings);

    // ---------------------------------------------------------------
    // 2. Logging
    // ---------------------------------------------------------------
    init_tracing(&settings.logging.level, &settings.logging.file);

    info!("Starting probe-unmask");
    info!("Config loaded from {}", config_path);

    if settings.detection.min_browser_versions_allowed.is_empty() {
        warn!("No minimum browser versions configured; obsolete-browser check is inert");
    }

    // ---------------------------------------------------------------
    // 3. Signal sources
    // ---------------------------------------------------------------
    let asn_lookup = Arc::new(MaxMindAsnLookup::new(&settings.geoip.asn_db));
    let ptr_resolver = Arc::new(DigResolver::new());
    let p0f = Arc::new(P0fClient::new(&settings.p0f.socket_path));
    let ua_parser = Arc::new(BuiltinUaParser::new());

    info!(
        socket = %settings.p0f.socket_path,
        max_wait_ms = settings.p0f.max_wait_ms,
        asn_db = asn_lookup.has_asn_db(),
        reverse_dns = settings.detection.allow_reverse_dns,
        "Signal sources configured"
    );

    // ---------------------------------------------------------------
    // 4. Detection pipeline
    // ---------------------------------------------------------------
    let cooldown = Arc::new(DisclosureCooldown::new());

    let enricher = Arc::new(Enricher::new(
        asn_lookup,
        ptr_resolver,
        p0f,
        EnrichmentConfig::from(settings.as_ref()),
    ));

    let rules = Arc::new(
        RuleSet::new(settings.detection.clone(), cooldown.clone())
            .with_vendor_rules(&settings.vendor_rules),
    );
    info!(rules = ?rules.rule_names(), "Detection rules loaded");

    let pipeline = Arc::new(ProtectionPipeline::new(enricher, rules));

    // ---------------------------------------------------------------
    // 5. HTTP server
    // ---------------------------------------------------------------
    let state = AppState {
        pipeline,
        ua_parser,
        cooldown,
        settings: settings.clone(),
        start_time: Instant::now(),
    };
    let server = ApiServer::new(state, settings.server.bind.clone());

    let server_handle = tokio::spawn(async move {
        if let Err(e) = server.run().await {
            error!("HTTP server error: {}", e);
        }
    });

    info!("probe-unmask is running. Press Ctrl+C to shut down.");

    tokio::signal::ctrl_c().await?;
    info!("Shutting down probe-unmask...");
    server_handle.abort();

    info!("probe-unmask shut down gracefully");
    Ok(())
}
