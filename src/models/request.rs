use std::net::IpAddr;

use serde::Serialize;

use super::fingerprint::PassiveFingerprint;

/// Value stored in `EnrichedRequest::asn` when the ownership lookup failed.
pub const ASN_UNAVAILABLE: &str = "No ASN data is available";

/// Identity a client claims for itself through its User-Agent header.
///
/// Fields are whatever the parser managed to extract; a malformed header
/// leaves them empty rather than failing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeclaredIdentity {
    pub browser_family: String,
    pub browser_major_version: String,
    pub os_family: String,
}

impl DeclaredIdentity {
    #[cfg(test)]
    pub fn new(
        browser_family: impl Into<String>,
        browser_major_version: impl Into<String>,
        os_family: impl Into<String>,
    ) -> Self {
        Self {
            browser_family: browser_family.into(),
            browser_major_version: browser_major_version.into(),
            os_family: os_family.into(),
        }
    }

    /// Major version as a number, `None` when missing or not an integer.
    pub fn major_version(&self) -> Option<u32> {
        self.browser_major_version.trim().parse().ok()
    }
}

/// A request as it arrives, before any signal has been gathered.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    /// Address every lookup is keyed on.
    pub client_ip: IpAddr,

    /// Raw User-Agent header, if one was sent.
    pub user_agent: Option<String>,

    /// Parsed form of `user_agent`.
    pub declared_identity: DeclaredIdentity,
}

impl PendingRequest {
    pub fn new(client_ip: IpAddr, user_agent: Option<String>, declared_identity: DeclaredIdentity) -> Self {
        Self {
            client_ip,
            user_agent,
            declared_identity,
        }
    }
}

/// A request with every signal attached. Detection rules only ever see
/// this type, so they cannot run against a half-built record.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichedRequest {
    pub client_ip: IpAddr,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    pub declared_identity: DeclaredIdentity,

    /// Resolved network owner or [`ASN_UNAVAILABLE`].
    pub asn: String,

    /// Reverse DNS name, only looked up when enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ptr_record: Option<String>,

    pub passive_fingerprint: PassiveFingerprint,
}

impl EnrichedRequest {
    #[cfg(test)]
    pub fn has_asn(&self) -> bool {
        self.asn != ASN_UNAVAILABLE
    }
}
