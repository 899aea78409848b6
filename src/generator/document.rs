//! Publication envelope: id, title extraction, formatting and hashing.
//!
//! Two digests exist per record. A 16-hex-character preview over the raw
//! completion is embedded in the document; the full digest over the
//! assembled document is stored next to it.

use chrono::{DateTime, SubsecRound, Utc};
use sha2::{Digest, Sha256};

use crate::storage::InventionRecord;

pub const FALLBACK_TITLE: &str = "Untitled Invention";
pub const TITLE_MARKER: &str = "TITLE:";
pub const HASH_PREVIEW_LEN: usize = 16;
pub const DEDICATION_NOTICE: &str = "This invention is published as prior art under Creative Commons CC0 1.0 Universal (Public Domain Dedication).";

/// Hex-encoded SHA-256 of `content`
pub fn sha256_hex(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

pub fn hash_preview(raw: &str) -> String {
    let mut digest = sha256_hex(raw);
    digest.truncate(HASH_PREVIEW_LEN);
    digest
}

/// `inv-YYYYMMDD-HHMMSS`; two generations in the same second share an id.
pub fn invention_id(timestamp: DateTime<Utc>) -> String {
    format!("inv-{}", timestamp.format("%Y%m%d-%H%M%S"))
}

/// ISO-8601 without offset; microseconds only when non-zero.
pub fn iso_timestamp(timestamp: DateTime<Utc>) -> String {
    if timestamp.timestamp_subsec_micros() == 0 {
        timestamp.format("%Y-%m-%dT%H:%M:%S").to_string()
    } else {
        timestamp.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
    }
}

/// First line starting with `TITLE:`, remainder trimmed.
///
/// A missing line and an empty `TITLE:` both fall back to "Untitled Invention".
pub fn extract_title(raw: &str) -> String {
    raw.lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix(TITLE_MARKER))
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| FALLBACK_TITLE.to_string())
}

pub fn format_invention(
    raw: &str,
    timestamp: DateTime<Utc>,
    invention_id: &str,
    domain_key: &str,
    domain_name: &str,
) -> String {
    let preview = hash_preview(raw);
    let date = iso_timestamp(timestamp);

    format!(
        "---\n\
title: {invention_id}\n\
domain: {domain_name}\n\
domain_key: {domain_key}\n\
date: {date}Z\n\
id: {invention_id}\n\
hash: sha256:{preview}...\n\
---\n\
\n\
# {domain_name} Invention\n\
\n\
{raw}\n\
\n\
---\n\
\n\
**Generated by Perpetual Ideas Machine**  \n\
Domain: {domain_name}  \n\
Publication Date: {date}Z  \n\
Verification Hash: sha256:{preview}...\n\
\n\
{DEDICATION_NOTICE}\n"
    )
}

/// Build the complete record for a raw completion.
pub fn assemble(
    raw: &str,
    timestamp: DateTime<Utc>,
    domain_key: &str,
    domain_name: &str,
) -> InventionRecord {
    let timestamp = timestamp.trunc_subsecs(6);
    let invention_id = invention_id(timestamp);
    let content = format_invention(raw, timestamp, &invention_id, domain_key, domain_name);
    let hash = sha256_hex(&content);

    InventionRecord {
        invention_id,
        domain_key: domain_key.to_string(),
        domain_name: domain_name.to_string(),
        title: extract_title(raw),
        content,
        hash,
        created_at: timestamp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, h, m, s).unwrap()
    }

    #[test]
    fn test_extract_title() {
        let raw = "Intro text\n  TITLE: Foo Bar  \nABSTRACT: x\nTITLE: Second";
        assert_eq!(extract_title(raw), "Foo Bar");
    }

    #[test]
    fn test_extract_title_fallback() {
        assert_eq!(extract_title("ABSTRACT: nothing here"), FALLBACK_TITLE);
        assert_eq!(extract_title("TITLE:   \nABSTRACT: x"), FALLBACK_TITLE);
        assert_eq!(extract_title("The TITLE: is mid-line"), FALLBACK_TITLE);
    }

    #[test]
    fn test_invention_id_format() {
        assert_eq!(invention_id(at(9, 5, 7)), "inv-20250314-090507");
    }

    #[test]
    fn test_iso_timestamp() {
        assert_eq!(iso_timestamp(at(9, 5, 7)), "2025-03-14T09:05:07");
        let with_micros = at(9, 5, 7) + chrono::Duration::microseconds(42);
        assert_eq!(iso_timestamp(with_micros), "2025-03-14T09:05:07.000042");
    }

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(sha256_hex("polymer"), sha256_hex("polymer"));
        assert_ne!(sha256_hex("polymer"), sha256_hex("Polymer"));
        assert_eq!(
            sha256_hex(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(hash_preview("").len(), HASH_PREVIEW_LEN);
    }

    #[test]
    fn test_format_layout() {
        let raw = "TITLE: Self-healing gasket\nABSTRACT: A gasket.";
        let doc = format_invention(raw, at(12, 0, 0), "inv-20250314-120000", "materials-science", "Materials Science");
        let preview = hash_preview(raw);

        assert!(doc.starts_with("---\ntitle: inv-20250314-120000\ndomain: Materials Science\n"));
        assert!(doc.contains("domain_key: materials-science\ndate: 2025-03-14T12:00:00Z\nid: inv-20250314-120000\n"));
        assert!(doc.contains(&format!("hash: sha256:{preview}...\n---\n\n# Materials Science Invention\n\n{raw}\n\n---\n")));
        assert!(doc.contains("Publication Date: 2025-03-14T12:00:00Z  \n"));
        assert!(doc.contains(&format!("Verification Hash: sha256:{preview}...\n")));
        assert!(doc.ends_with(&format!("{DEDICATION_NOTICE}\n")));
    }

    #[test]
    fn test_assemble_hashes_the_envelope() {
        let raw = "TITLE: Graded Lattice\nCLAIMS: 1.";
        let record = assemble(raw, at(1, 2, 3), "materials-science", "Materials Science");

        assert_eq!(record.invention_id, "inv-20250314-010203");
        assert_eq!(record.title, "Graded Lattice");
        assert_eq!(record.hash, sha256_hex(&record.content));
        assert_ne!(record.hash[..HASH_PREVIEW_LEN], hash_preview(raw));
        assert!(record.content.contains(&hash_preview(raw)));
        assert_eq!(record.created_at, at(1, 2, 3));
    }
}
