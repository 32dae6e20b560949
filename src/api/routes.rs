use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{ConnectInfo, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use tracing::info;

use crate::config::settings::Settings;
use crate::models::request::PendingRequest;
use crate::protection::cooldown::DisclosureCooldown;
use crate::protection::normalizer::canonical_os;
use crate::protection::pipeline::ProtectionPipeline;
use crate::sources::UserAgentParser;

/// Shared application state passed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ProtectionPipeline>,
    pub ua_parser: Arc<dyn UserAgentParser>,
    pub cooldown: Arc<DisclosureCooldown>,
    pub settings: Arc<Settings>,
    pub start_time: Instant,
}

/// Run every check against the calling connection and report the verdict.
pub async fn check(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Response {
    let client_ip = peer.ip().to_canonical();
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let declared_identity = state.ua_parser.parse(user_agent.as_deref().unwrap_or(""));

    let pending = PendingRequest::new(client_ip, user_agent, declared_identity);

    match state.pipeline.do_checks(pending).await {
        Ok(verdict) => {
            if verdict.blacklisted {
                info!(ip = %client_ip, rules = ?verdict.fired_rules, "Request matches blacklist patterns");
            }
            let record = &verdict.record;
            Json(json!({
                "blacklisted": verdict.blacklisted,
                "fired_rules": verdict.fired_rules,
                "client_ip": record.client_ip.to_string(),
                "asn": record.asn,
                "ptr_record": record.ptr_record,
                "declared_identity": record.declared_identity,
                "passive_fingerprint": record.passive_fingerprint,
                "observed_os": canonical_os(record.passive_fingerprint.os_name()),
                "declared_os": canonical_os(&record.declared_identity.os_family),
            }))
            .into_response()
        }
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "error": "fingerprint_unavailable",
                "detail": e.to_string(),
                "client_ip": client_ip.to_string(),
            })),
        )
            .into_response(),
    }
}

/// Current state of the disclosure cooldown.
pub async fn get_cooldown(State(state): State<AppState>) -> Json<Value> {
    let now = chrono::Utc::now().timestamp();
    let window = state.settings.detection.blacklist_service_observed_timeout;
    let last = state.cooldown.last_disclosure_epoch();

    Json(json!({
        "last_disclosure_epoch": last,
        "window_secs": window,
        "active": state.cooldown.is_within_window(now, window),
        "uptime_secs": state.start_time.elapsed().as_secs(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::body::to_bytes;
    use axum::http::HeaderValue;

    use crate::protection::enrichment::{Enricher, EnrichmentConfig};
    use crate::protection::rules::RuleSet;
    use crate::sources::user_agent::BuiltinUaParser;
    use crate::sources::FingerprintSource;
    use crate::testing::{FixedAsn, FixedPtr, ScriptedSource};

    const FIREFOX_LINUX: &str =
        "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0";

    fn state(source: Arc<dyn FingerprintSource>) -> AppState {
        let settings = Arc::new(Settings::default());
        let cooldown = Arc::new(DisclosureCooldown::new());
        let enricher = Enricher::new(
            Arc::new(FixedAsn(Some("AS64500 Example".to_string()))),
            Arc::new(FixedPtr::failing()),
            source,
            EnrichmentConfig {
                allow_reverse_dns: false,
                max_wait: Duration::from_millis(50),
                poll_interval: Duration::from_millis(1),
            },
        );
        let rules = RuleSet::new(settings.detection.clone(), cooldown.clone());

        AppState {
            pipeline: Arc::new(ProtectionPipeline::new(Arc::new(enricher), Arc::new(rules))),
            ua_parser: Arc::new(BuiltinUaParser::new()),
            cooldown,
            settings,
            start_time: Instant::now(),
        }
    }

    fn headers(ua: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::USER_AGENT, HeaderValue::from_str(ua).unwrap());
        headers
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn peer() -> ConnectInfo<SocketAddr> {
        ConnectInfo("[::ffff:192.0.2.5]:51000".parse().unwrap())
    }

    #[tokio::test]
    async fn test_check_reports_mismatch() {
        let state = state(Arc::new(ScriptedSource::with_os("Windows")));

        let response = check(State(state.clone()), peer(), headers(FIREFOX_LINUX)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["blacklisted"], true);
        assert_eq!(body["fired_rules"][0], "os_mismatch");
        assert_eq!(body["client_ip"], "192.0.2.5");
        assert_eq!(body["observed_os"], "windows");
        assert_eq!(body["declared_os"], "linux");
        assert_eq!(body["passive_fingerprint"]["os_name"], "windows");

        let cooldown = json_body(get_cooldown(State(state)).await.into_response()).await;
        assert_eq!(cooldown["active"], true);
    }

    #[tokio::test]
    async fn test_check_passes_consistent_client() {
        let state = state(Arc::new(ScriptedSource::with_os("Linux")));

        let body = json_body(check(State(state), peer(), headers(FIREFOX_LINUX)).await).await;
        assert_eq!(body["blacklisted"], false);
        assert_eq!(body["asn"], "AS64500 Example");
        assert_eq!(body["declared_identity"]["browser_family"], "Firefox");
    }

    #[tokio::test]
    async fn test_check_without_fingerprint_is_503() {
        let state = state(Arc::new(ScriptedSource::never()));

        let response = check(State(state), peer(), HeaderMap::new()).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = json_body(response).await;
        assert_eq!(body["error"], "fingerprint_unavailable");
    }
}
