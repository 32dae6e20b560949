//! In-memory stand-ins for the external signal sources.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::LookupError;
use crate::models::fingerprint::{FieldValue, RawFingerprint};
use crate::sources::{AsnLookup, FingerprintSource, PtrResolver};

/// Answers empty for the first `empty_answers` queries, then with `fields`.
pub struct ScriptedSource {
    empty_answers: Option<u32>,
    fields: RawFingerprint,
    calls: AtomicU32,
}

impl ScriptedSource {
    pub fn ready_after(empty_answers: u32, fields: &[(&str, FieldValue)]) -> Self {
        Self {
            empty_answers: Some(empty_answers),
            fields: fields
                .iter()
                .map(|(k, v)| ((*k).to_string(), v.clone()))
                .collect(),
            calls: AtomicU32::new(0),
        }
    }

    pub fn with_os(os_name: &str) -> Self {
        Self::ready_after(0, &[("os_name", FieldValue::Bytes(format!("{}\0\0\0", os_name).into_bytes()))])
    }

    pub fn never() -> Self {
        Self {
            empty_answers: None,
            fields: HashMap::new(),
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FingerprintSource for ScriptedSource {
    async fn query(&self, _client: IpAddr) -> Option<RawFingerprint> {
        let previous = self.calls.fetch_add(1, Ordering::SeqCst);
        match self.empty_answers {
            Some(n) if previous >= n => Some(self.fields.clone()),
            Some(_) => Some(RawFingerprint::new()),
            None => None,
        }
    }
}

/// Never answers.
pub struct StalledSource;

#[async_trait]
impl FingerprintSource for StalledSource {
    async fn query(&self, _client: IpAddr) -> Option<RawFingerprint> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        None
    }
}

pub struct FixedAsn(pub Option<String>);

#[async_trait]
impl AsnLookup for FixedAsn {
    async fn resolve(&self, client: IpAddr) -> Result<String, LookupError> {
        self.0.clone().ok_or(LookupError::NotFound(client))
    }
}

/// PTR resolver that counts calls so tests can assert it was skipped.
pub struct FixedPtr {
    answer: Result<Option<String>, ()>,
    calls: AtomicU32,
}

impl FixedPtr {
    pub fn found(name: &str) -> Self {
        Self {
            answer: Ok(Some(name.to_string())),
            calls: AtomicU32::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            answer: Err(()),
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PtrResolver for FixedPtr {
    async fn resolve_ptr(&self, _client: IpAddr) -> Result<Option<String>, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer
            .clone()
            .map_err(|_| LookupError::Backend("resolver unreachable".to_string()))
    }
}
