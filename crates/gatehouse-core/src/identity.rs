//! Client identity derived from proxy headers.

/// Identity used when no proxy header names the client.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Picks the client identity: the first `X-Forwarded-For` hop, then
/// `X-Real-IP`, then [`UNKNOWN_CLIENT`].
///
/// Anonymous traffic shares the `"unknown"` counter rather than bypassing the
/// limiter.
pub fn client_identity(forwarded_for: Option<&str>, real_ip: Option<&str>) -> String {
    let first_hop = forwarded_for
        .and_then(|xff| xff.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty());

    first_hop
        .or_else(|| real_ip.map(str::trim).filter(|s| !s.is_empty()))
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}
