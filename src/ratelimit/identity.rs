//! Client identity resolution

use std::net::IpAddr;

use crate::{GatewayError, Result};

/// Determine the address a request is charged to.
///
/// Preference order: the first entry of `X-Forwarded-For`, then
/// `X-Real-IP`, then the connection's peer address. A request with none of
/// these cannot be rate limited and is refused.
pub fn resolve_client_identity(
    forwarded_for: Option<&str>,
    real_ip: Option<&str>,
    peer: Option<IpAddr>,
) -> Result<String> {
    let forwarded = forwarded_for
        .and_then(|header| header.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());
    if let Some(ip) = forwarded {
        return Ok(ip.to_string());
    }

    if let Some(ip) = real_ip.map(str::trim).filter(|ip| !ip.is_empty()) {
        return Ok(ip.to_string());
    }

    peer.map(|ip| ip.to_string())
        .ok_or(GatewayError::ClientIdentity)
}
