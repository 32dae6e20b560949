//! External signal sources the detection core consumes.
//!
//! Each one sits behind a narrow trait so the pipeline can be driven by
//! in-memory fakes in tests and by the real daemons in production.

pub mod asn;
pub mod p0f;
pub mod reverse_dns;
pub mod user_agent;

use std::net::IpAddr;

use async_trait::async_trait;

use crate::error::LookupError;
use crate::models::fingerprint::RawFingerprint;
use crate::models::request::DeclaredIdentity;

/// Passive TCP/IP fingerprint provider.
///
/// `None` or an empty map means "nothing observed for this address yet".
/// There is no other failure mode; transport problems are reported the
/// same way so the caller keeps polling.
#[async_trait]
pub trait FingerprintSource: Send + Sync {
    async fn query(&self, client: IpAddr) -> Option<RawFingerprint>;
}

/// Network ownership lookup.
#[async_trait]
pub trait AsnLookup: Send + Sync {
    async fn resolve(&self, client: IpAddr) -> Result<String, LookupError>;
}

/// Reverse DNS lookup. `Ok(None)` means the address has no PTR record.
#[async_trait]
pub trait PtrResolver: Send + Sync {
    async fn resolve_ptr(&self, client: IpAddr) -> Result<Option<String>, LookupError>;
}

/// Turns a raw User-Agent header into a declared identity. Never fails;
/// whatever cannot be parsed is left empty.
pub trait UserAgentParser: Send + Sync {
    fn parse(&self, raw: &str) -> DeclaredIdentity;
}
