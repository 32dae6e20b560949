use std::net::IpAddr;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tracing::{debug, warn};

use crate::models::fingerprint::{FieldValue, RawFingerprint};

use super::FingerprintSource;

const QUERY_MAGIC: u32 = 0x5030_4601;
const RESPONSE_MAGIC: u32 = 0x5030_4602;

const STATUS_BADQUERY: u32 = 0x00;
const STATUS_OK: u32 = 0x10;
const STATUS_NOMATCH: u32 = 0x20;

const ADDR_IPV4: u8 = 4;
const ADDR_IPV6: u8 = 6;

pub const QUERY_LEN: usize = 21;
pub const RESPONSE_LEN: usize = 232;

const STR_LEN: usize = 32;

/// Fixed-width string fields of a p0f v3 API response, by offset.
const STRING_FIELDS: &[(&str, usize)] = &[
    ("os_name", 40),
    ("os_flavor", 72),
    ("http_name", 104),
    ("http_flavor", 136),
    ("link_type", 168),
    ("language", 200),
];

/// 32-bit counters and timestamps, by offset.
const U32_FIELDS: &[(&str, usize)] = &[
    ("first_seen", 8),
    ("last_seen", 12),
    ("total_conn", 16),
    ("uptime_min", 20),
    ("up_mod_days", 24),
    ("last_nat", 28),
    ("last_chg", 32),
];

/// Client for the p0f v3 daemon API (`p0f -s <socket>`).
///
/// One connection per query. Anything that goes wrong on the socket is
/// logged and reported as "no data yet"; the poller decides how long to
/// keep asking.
pub struct P0fClient {
    socket_path: PathBuf,
}

impl P0fClient {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    async fn exchange(&self, client: IpAddr) -> std::io::Result<[u8; RESPONSE_LEN]> {
        let mut stream = UnixStream::connect(&self.socket_path).await?;
        stream.write_all(&encode_query(client)).await?;

        let mut response = [0u8; RESPONSE_LEN];
        stream.read_exact(&mut response).await?;
        Ok(response)
    }
}

#[async_trait]
impl FingerprintSource for P0fClient {
    async fn query(&self, client: IpAddr) -> Option<RawFingerprint> {
        let response = match self.exchange(client).await {
            Ok(r) => r,
            Err(e) => {
                warn!(
                    ip = %client,
                    socket = %self.socket_path.display(),
                    error = %e,
                    "p0f query failed"
                );
                return None;
            }
        };

        match decode_response(&response) {
            Ok(Some(fields)) => Some(fields),
            Ok(None) => {
                debug!(ip = %client, "p0f has no data for client yet");
                None
            }
            Err(reason) => {
                warn!(ip = %client, reason = reason, "p0f rejected query");
                None
            }
        }
    }
}

pub fn encode_query(client: IpAddr) -> [u8; QUERY_LEN] {
    let mut query = [0u8; QUERY_LEN];
    query[0..4].copy_from_slice(&QUERY_MAGIC.to_ne_bytes());
    match client {
        IpAddr::V4(v4) => {
            query[4] = ADDR_IPV4;
            query[5..9].copy_from_slice(&v4.octets());
        }
        IpAddr::V6(v6) => {
            query[4] = ADDR_IPV6;
            query[5..21].copy_from_slice(&v6.octets());
        }
    }
    query
}

fn read_u32(buf: &[u8], offset: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&buf[offset..offset + 4]);
    u32::from_ne_bytes(word)
}

/// Decode a response. `Ok(None)` is p0f's "no match"; `Err` carries the
/// reason the answer was unusable.
pub fn decode_response(buf: &[u8; RESPONSE_LEN]) -> Result<Option<RawFingerprint>, &'static str> {
    if read_u32(buf, 0) != RESPONSE_MAGIC {
        return Err("bad response magic");
    }

    match read_u32(buf, 4) {
        STATUS_OK => {}
        STATUS_NOMATCH => return Ok(None),
        STATUS_BADQUERY => return Err("bad query"),
        _ => return Err("unknown status"),
    }

    let mut fields = RawFingerprint::new();

    for (name, offset) in U32_FIELDS {
        fields.insert(
            (*name).to_string(),
            FieldValue::Text(read_u32(buf, *offset).to_string()),
        );
    }

    // -1 means p0f could not work out the hop count
    let distance = i16::from_ne_bytes([buf[36], buf[37]]);
    let distance = if distance < 0 {
        FieldValue::Absent
    } else {
        FieldValue::Text(distance.to_string())
    };
    fields.insert("distance".to_string(), distance);
    fields.insert("bad_sw".to_string(), FieldValue::Text(buf[38].to_string()));
    fields.insert("os_match_q".to_string(), FieldValue::Text(buf[39].to_string()));

    for (name, offset) in STRING_FIELDS {
        fields.insert(
            (*name).to_string(),
            FieldValue::Bytes(buf[*offset..*offset + STR_LEN].to_vec()),
        );
    }

    Ok(Some(fields))
}
