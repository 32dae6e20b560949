use std::fmt;

use serde::Serialize;

use crate::models::fingerprint::{FieldValue, PassiveFingerprint, RawFingerprint};

/// Canonicalize one fingerprint field into lowercase trimmed text.
///
/// Bytes are decoded as UTF-8 and lose their trailing NUL padding first.
/// Absent and empty values come back empty. Normalizing an already
/// normalized value is a no-op.
pub fn normalize(raw: &FieldValue) -> String {
    match raw {
        FieldValue::Absent => String::new(),
        FieldValue::Text(text) => normalize_str(text),
        FieldValue::Bytes(bytes) => {
            let decoded = String::from_utf8_lossy(bytes);
            normalize_str(decoded.trim_end_matches('\0'))
        }
    }
}

fn normalize_str(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    text.to_lowercase().trim().to_string()
}

/// Normalize every field of a raw source answer.
pub fn normalize_fingerprint(raw: &RawFingerprint) -> PassiveFingerprint {
    raw.iter()
        .map(|(field, value)| (field.clone(), normalize(value)))
        .collect()
}

/// Shared OS vocabulary for passive fingerprints and User-Agent parses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OsFamily {
    Windows,
    Linux,
    MacOs,
    Ios,
    Android,
    Bsd,
    Unknown,
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OsFamily::Windows => "windows",
            OsFamily::Linux => "linux",
            OsFamily::MacOs => "macos",
            OsFamily::Ios => "ios",
            OsFamily::Android => "android",
            OsFamily::Bsd => "bsd",
            OsFamily::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

const LINUX_DISTROS: &[&str] = &[
    "linux", "ubuntu", "kubuntu", "debian", "fedora", "red hat", "redhat", "centos",
    "gentoo", "mint", "suse", "slackware", "mandriva", "arch",
];

/// Map an OS name from either vocabulary onto [`OsFamily`].
///
/// Covers p0f labels ("Windows", "Linux", "Mac OS X", "FreeBSD", "???")
/// and ua-parser families ("Windows 10", "Mac OS X", "Ubuntu",
/// "Chrome OS", "iOS"). Chrome OS folds into `Linux`. Anything
/// unrecognised lands in `Unknown`.
pub fn canonical_os(name: &str) -> OsFamily {
    let name = name.trim().to_lowercase();
    if name.is_empty() {
        return OsFamily::Unknown;
    }

    if name.contains("android") {
        return OsFamily::Android;
    }
    if name.contains("windows") || name.starts_with("win") {
        return OsFamily::Windows;
    }
    // p0f sees a Chromebook's TCP stack as plain Linux
    if name.contains("chrome os") || name.contains("chromeos") || name == "cros" {
        return OsFamily::Linux;
    }
    if name == "ios"
        || name.starts_with("ios ")
        || name.starts_with("iphone")
        || name.starts_with("ipad")
    {
        return OsFamily::Ios;
    }
    if name.contains("mac os")
        || name.starts_with("macos")
        || name.starts_with("os x")
        || name.contains("macintosh")
    {
        return OsFamily::MacOs;
    }
    if name.contains("bsd") {
        return OsFamily::Bsd;
    }
    if LINUX_DISTROS.iter().any(|distro| name.contains(distro)) {
        return OsFamily::Linux;
    }

    OsFamily::Unknown
}
