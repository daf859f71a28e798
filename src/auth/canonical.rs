//! Canonical request representation covered by the signature.
//!
//! Format: `METHOD|PATH|k1=v1&k2=v2|BODYHASH_HEX|TIMESTAMP|NONCE`

use ring::digest;

/// Field separator of the canonical string.
pub const SEPARATOR: char = '|';

/// Hex SHA-256 of `body`; the empty string for an empty body.
///
/// Bodiless requests (GET, DELETE) sign with an empty digest segment, e.g.
/// `GET|/events|a=1||1700000000|N`.
pub fn body_digest(body: &[u8]) -> String {
    if body.is_empty() {
        return String::new();
    }
    hex::encode(digest::digest(&digest::SHA256, body).as_ref())
}

/// Query pairs sorted by key (stable for repeated keys), joined as `k=v&k=v`.
pub fn canonical_query(pairs: &[(String, String)]) -> String {
    let mut sorted: Vec<&(String, String)> = pairs.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));
    sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// Build the signing string for a request.
pub fn canonicalize(
    method: &str,
    path: &str,
    query: &[(String, String)],
    body: &[u8],
    timestamp: u64,
    nonce: &str,
) -> String {
    canonicalize_with_digest(method, path, query, &body_digest(body), timestamp, nonce)
}

/// Build the signing string when the body digest is already known.
pub fn canonicalize_with_digest(
    method: &str,
    path: &str,
    query: &[(String, String)],
    body_digest: &str,
    timestamp: u64,
    nonce: &str,
) -> String {
    format!(
        "{method}{sep}{path}{sep}{query}{sep}{body_digest}{sep}{timestamp}{sep}{nonce}",
        method = method.to_uppercase(),
        path = path,
        query = canonical_query(query),
        body_digest = body_digest,
        timestamp = timestamp,
        nonce = nonce,
        sep = SEPARATOR,
    )
}
