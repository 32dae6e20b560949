use std::net::IpAddr;
use std::path::Path;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::LookupError;

use super::AsnLookup;

/// ASN lookup backed by a MaxMind GeoLite2-ASN database.
///
/// A missing or unreadable database is not fatal at startup; every lookup
/// then fails and the request carries the "unavailable" sentinel.
pub struct MaxMindAsnLookup {
    reader: Option<maxminddb::Reader<Vec<u8>>>,
}

#[derive(serde::Deserialize, Debug)]
struct GeoIpAsn {
    autonomous_system_number: Option<u32>,
    autonomous_system_organization: Option<String>,
}

impl MaxMindAsnLookup {
    pub fn new(asn_db: &str) -> Self {
        let reader = if Path::new(asn_db).exists() {
            match maxminddb::Reader::open_readfile(asn_db) {
                Ok(reader) => {
                    info!(path = asn_db, "GeoIP ASN database loaded successfully");
                    Some(reader)
                }
                Err(e) => {
                    warn!(path = asn_db, error = %e, "Failed to load GeoIP ASN database");
                    None
                }
            }
        } else {
            warn!(path = asn_db, "GeoIP ASN database file not found");
            None
        };

        Self { reader }
    }

    pub fn has_asn_db(&self) -> bool {
        self.reader.is_some()
    }

    fn lookup(&self, ip: IpAddr) -> Result<String, LookupError> {
        let reader = self.reader.as_ref().ok_or(LookupError::DatabaseMissing)?;

        match reader.lookup::<GeoIpAsn>(ip) {
            Ok(result) => {
                let number = result
                    .autonomous_system_number
                    .ok_or(LookupError::NotFound(ip))?;
                let org = result
                    .autonomous_system_organization
                    .unwrap_or_else(|| "Unknown".to_string());
                Ok(format_asn(number, &org))
            }
            Err(maxminddb::MaxMindDBError::AddressNotFoundError(_)) => Err(LookupError::NotFound(ip)),
            Err(e) => Err(LookupError::Backend(e.to_string())),
        }
    }
}

#[async_trait]
impl AsnLookup for MaxMindAsnLookup {
    async fn resolve(&self, client: IpAddr) -> Result<String, LookupError> {
        self.lookup(client)
    }
}

fn format_asn(number: u32, organization: &str) -> String {
    format!("AS{} {}", number, organization)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_database_fails_lookup() {
        let lookup = MaxMindAsnLookup::new("/nonexistent/GeoLite2-ASN.mmdb");
        assert!(!lookup.has_asn_db());

        let result = lookup.resolve("8.8.8.8".parse().unwrap()).await;
        assert!(matches!(result, Err(LookupError::DatabaseMissing)));
    }

    #[test]
    fn test_format_asn() {
        assert_eq!(format_asn(15169, "GOOGLE"), "AS15169 GOOGLE");
    }
}
