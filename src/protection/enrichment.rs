use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::settings::Settings;
use crate::error::FingerprintUnavailable;
use crate::models::request::{EnrichedRequest, PendingRequest, ASN_UNAVAILABLE};
use crate::sources::{AsnLookup, FingerprintSource, PtrResolver};

use super::poller;

/// Knobs the aggregator reads; a subset of [`Settings`].
#[derive(Debug, Clone)]
pub struct EnrichmentConfig {
    pub allow_reverse_dns: bool,
    pub max_wait: Duration,
    pub poll_interval: Duration,
}

impl From<&Settings> for EnrichmentConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            allow_reverse_dns: settings.detection.allow_reverse_dns,
            max_wait: settings.p0f.max_wait(),
            poll_interval: settings.p0f.poll_interval(),
        }
    }
}

/// Gathers ASN, optional PTR and the passive fingerprint for a request.
///
/// The three lookups run concurrently. ASN and PTR problems degrade the
/// record; only a missing fingerprint fails the whole enrichment.
pub struct Enricher {
    asn: Arc<dyn AsnLookup>,
    ptr: Arc<dyn PtrResolver>,
    fingerprints: Arc<dyn FingerprintSource>,
    config: EnrichmentConfig,
}

impl Enricher {
    pub fn new(
        asn: Arc<dyn AsnLookup>,
        ptr: Arc<dyn PtrResolver>,
        fingerprints: Arc<dyn FingerprintSource>,
        config: EnrichmentConfig,
    ) -> Self {
        Self {
            asn,
            ptr,
            fingerprints,
            config,
        }
    }

    pub async fn enrich(&self, pending: PendingRequest) -> Result<EnrichedRequest, FingerprintUnavailable> {
        let ip = pending.client_ip;

        let (asn, ptr_record, fingerprint) = tokio::join!(
            self.lookup_asn(ip),
            self.lookup_ptr(ip),
            poller::poll(
                self.fingerprints.as_ref(),
                ip,
                self.config.max_wait,
                self.config.poll_interval,
            ),
        );

        let passive_fingerprint = fingerprint.map_err(|e| {
            warn!(ip = %ip, error = %e, "Passive fingerprint unavailable");
            e
        })?;

        Ok(EnrichedRequest {
            client_ip: ip,
            user_agent: pending.user_agent,
            declared_identity: pending.declared_identity,
            asn,
            ptr_record,
            passive_fingerprint,
        })
    }

    async fn lookup_asn(&self, ip: IpAddr) -> String {
        debug!(ip = %ip, "Getting ASN data");
        match self.asn.resolve(ip).await {
            Ok(asn) => {
                debug!(ip = %ip, asn = %asn, "ASN data received");
                asn
            }
            Err(e) => {
                warn!(ip = %ip, error = %e, "Failed getting ASN data");
                ASN_UNAVAILABLE.to_string()
            }
        }
    }

    async fn lookup_ptr(&self, ip: IpAddr) -> Option<String> {
        if !self.config.allow_reverse_dns {
            return None;
        }

        debug!(ip = %ip, "Getting reverse DNS data");
        match self.ptr.resolve_ptr(ip).await {
            Ok(Some(name)) if !name.is_empty() => {
                debug!(ip = %ip, ptr = %name, "Reverse DNS data received");
                Some(name)
            }
            Ok(_) => {
                debug!(ip = %ip, "No PTR record");
                None
            }
            Err(e) => {
                warn!(ip = %ip, error = %e, "Reverse DNS lookup failed");
                None
            }
        }
    }
}
