use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::error::FingerprintUnavailable;
use crate::models::request::{EnrichedRequest, PendingRequest};

use super::enrichment::Enricher;
use super::rules::RuleSet;

/// Outcome of [`ProtectionPipeline::do_checks`].
#[derive(Debug, Clone, Serialize)]
pub struct Verdict {
    /// True iff the request matched any blacklist pattern.
    pub blacklisted: bool,
    pub fired_rules: Vec<String>,
    pub record: EnrichedRequest,
}

/// Enrichment followed by rule evaluation.
///
/// Rules only ever see a fully enriched record: the pending request is
/// consumed by enrichment, and evaluation starts after it returns.
pub struct ProtectionPipeline {
    pub enricher: Arc<Enricher>,
    pub rules: Arc<RuleSet>,
}

impl ProtectionPipeline {
    pub fn new(enricher: Arc<Enricher>, rules: Arc<RuleSet>) -> Self {
        Self { enricher, rules }
    }

    /// Decide whether `request` is a probe posing as a browser.
    ///
    /// Fails only when no passive fingerprint could be obtained in time;
    /// treating that as "no mismatch" would blind the OS check.
    pub async fn do_checks(&self, request: PendingRequest) -> Result<Verdict, FingerprintUnavailable> {
        let record = self.enricher.enrich(request).await?;
        let evaluation = self.rules.evaluate(&record);

        debug!(
            ip = %record.client_ip,
            asn = %record.asn,
            observed_os = record.passive_fingerprint.os_name(),
            declared_os = %record.declared_identity.os_family,
            blacklisted = evaluation.is_positive(),
            "Checks complete"
        );

        Ok(Verdict {
            blacklisted: evaluation.is_positive(),
            fired_rules: evaluation.fired,
            record,
        })
    }
}
