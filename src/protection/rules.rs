use std::sync::Arc;

use tracing::{debug, info};

use crate::config::settings::{DetectionConfig, VendorField, VendorRuleConfig};
use crate::models::request::EnrichedRequest;

use super::cooldown::{window_contains, DisclosureCooldown};
use super::normalizer::canonical_os;

pub const RECENT_DISCLOSURE: &str = "recent_disclosure";
pub const OBSOLETE_BROWSER: &str = "obsolete_browser";
pub const OS_MISMATCH: &str = "os_mismatch";

/// Everything a rule may look at for one evaluation.
pub struct RuleContext<'a> {
    pub request: &'a EnrichedRequest,
    pub config: &'a DetectionConfig,
    /// Evaluation time, epoch seconds.
    pub now: i64,
    /// Cooldown timer value read under the evaluation lock.
    pub last_disclosure_epoch: i64,
}

/// One independent predicate over an enriched request.
///
/// Rules must be pure: they run while the cooldown timer is locked.
pub trait DetectionRule: Send + Sync {
    fn name(&self) -> &str;
    fn check(&self, ctx: &RuleContext<'_>) -> bool;
}

/// True iff the declared OS and the TCP-observed OS disagree.
pub fn check_os_mismatches(request: &EnrichedRequest) -> bool {
    let observed = canonical_os(request.passive_fingerprint.os_name());
    let declared = canonical_os(&request.declared_identity.os_family);
    observed != declared
}

/// True iff the declared browser is older than the configured floor for
/// its family. Unlisted families and unparsable versions never fire.
pub fn check_obsolete_browser_version(request: &EnrichedRequest, config: &DetectionConfig) -> bool {
    let identity = &request.declared_identity;
    let Some(min_allowed) = config
        .min_browser_versions_allowed
        .get(&identity.browser_family)
    else {
        return false;
    };
    match identity.major_version() {
        Some(version) => version < *min_allowed,
        None => false,
    }
}

/// True iff a probe revealed itself less than `timeout_secs` ago.
pub fn check_recent_disclosure(now: i64, last_disclosure_epoch: i64, timeout_secs: u64) -> bool {
    window_contains(last_disclosure_epoch, now, timeout_secs)
}

pub struct RecentDisclosureRule;

impl DetectionRule for RecentDisclosureRule {
    fn name(&self) -> &str {
        RECENT_DISCLOSURE
    }

    fn check(&self, ctx: &RuleContext<'_>) -> bool {
        check_recent_disclosure(
            ctx.now,
            ctx.last_disclosure_epoch,
            ctx.config.blacklist_service_observed_timeout,
        )
    }
}

pub struct ObsoleteBrowserRule;

impl DetectionRule for ObsoleteBrowserRule {
    fn name(&self) -> &str {
        OBSOLETE_BROWSER
    }

    fn check(&self, ctx: &RuleContext<'_>) -> bool {
        check_obsolete_browser_version(ctx.request, ctx.config)
    }
}

pub struct OsMismatchRule;

impl DetectionRule for OsMismatchRule {
    fn name(&self) -> &str {
        OS_MISMATCH
    }

    fn check(&self, ctx: &RuleContext<'_>) -> bool {
        check_os_mismatches(ctx.request)
    }
}

/// Organization-specific rule: a known vendor marker in the PTR record or
/// User-Agent, combined with an OS mismatch.
pub struct VendorRule {
    name: String,
    field: VendorField,
    needle: String,
}

impl VendorRule {
    pub fn new(name: impl Into<String>, field: VendorField, needle: &str) -> Self {
        Self {
            name: name.into(),
            field,
            needle: needle.to_lowercase(),
        }
    }
}

impl From<&VendorRuleConfig> for VendorRule {
    fn from(config: &VendorRuleConfig) -> Self {
        Self::new(config.name.clone(), config.field, &config.contains)
    }
}

impl DetectionRule for VendorRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self, ctx: &RuleContext<'_>) -> bool {
        let haystack = match self.field {
            VendorField::Ptr => ctx.request.ptr_record.as_deref(),
            VendorField::UserAgent => ctx.request.user_agent.as_deref(),
        };
        match haystack {
            Some(value) => value.to_lowercase().contains(&self.needle) && check_os_mismatches(ctx.request),
            None => false,
        }
    }
}

/// Names of the rules that fired for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evaluation {
    pub fired: Vec<String>,
}

impl Evaluation {
    pub fn is_positive(&self) -> bool {
        !self.fired.is_empty()
    }
}

/// Registered detection rules sharing one cooldown timer.
///
/// The verdict is the OR of every rule. Reading the timer, running the
/// rules and, on a positive verdict, moving the timer to `now` happen
/// under a single lock so concurrent requests cannot interleave.
pub struct RuleSet {
    rules: Vec<Box<dyn DetectionRule>>,
    config: DetectionConfig,
    cooldown: Arc<DisclosureCooldown>,
}

impl RuleSet {
    /// An empty set. Only useful together with [`RuleSet::register`].
    pub fn empty(config: DetectionConfig, cooldown: Arc<DisclosureCooldown>) -> Self {
        Self {
            rules: Vec::new(),
            config,
            cooldown,
        }
    }

    /// The generic rules: recent disclosure, obsolete browser, OS mismatch.
    pub fn new(config: DetectionConfig, cooldown: Arc<DisclosureCooldown>) -> Self {
        let mut set = Self::empty(config, cooldown);
        set.register(RecentDisclosureRule);
        set.register(ObsoleteBrowserRule);
        set.register(OsMismatchRule);
        set
    }

    pub fn with_vendor_rules(mut self, vendor_rules: &[VendorRuleConfig]) -> Self {
        for config in vendor_rules {
            self.register(VendorRule::from(config));
        }
        self
    }

    pub fn register<R: DetectionRule + 'static>(&mut self, rule: R) {
        debug!(rule = rule.name(), "Detection rule registered");
        self.rules.push(Box::new(rule));
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    #[cfg(test)]
    pub fn cooldown(&self) -> &Arc<DisclosureCooldown> {
        &self.cooldown
    }

    pub fn evaluate(&self, request: &EnrichedRequest) -> Evaluation {
        self.evaluate_at(request, chrono::Utc::now().timestamp())
    }

    pub fn evaluate_at(&self, request: &EnrichedRequest, now: i64) -> Evaluation {
        let mut timer = self.cooldown.lock();

        let ctx = RuleContext {
            request,
            config: &self.config,
            now,
            last_disclosure_epoch: timer.last_disclosure_epoch(),
        };

        let fired: Vec<String> = self
            .rules
            .iter()
            .filter(|rule| rule.check(&ctx))
            .map(|rule| rule.name().to_string())
            .collect();

        if !fired.is_empty() {
            timer.observe_at(now);
            info!(ip = %request.client_ip, rules = ?fired, "Probe disclosed itself, cooldown reset");
        }

        Evaluation { fired }
    }
}
