use std::{net::IpAddr, str::FromStr};

use actix_web::HttpRequest;
use log::{debug, trace};
use regex::Regex;

/// Get the remote IP address from the request. It uses 3 sources to determine the IP address, in decreasing order
/// of preference:
/// 1. The `X-Forwarded-For` header, iif `use_x_forwarded_for` is set to true in the configuration. When the header
///    lists a chain of proxies, the first (client) address is used.
/// 2. The `Forwarded` header, iif `use_forwarded` is set to true in the configuration.
/// 3. The peer address from the connection info.
pub fn get_remote_ip(req: &HttpRequest, use_x_forwarded_for: bool, use_forwarded: bool) -> Option<IpAddr> {
    let mut result = None;
    if use_x_forwarded_for {
        trace!("Checking X-Forwarded-For header");
        result = req
            .headers()
            .get("X-Forwarded-For")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| IpAddr::from_str(s.trim()).ok());
        if let Some(ip) = result {
            debug!("Using X-Forwarded-For header for remote address: {ip}");
        }
    }
    if use_forwarded && result.is_none() {
        trace!("Checking Forwarded header");
        result = req
            .headers()
            .get("Forwarded")
            .and_then(|v| v.to_str().ok())
            .and_then(forwarded_for);
        if let Some(ip) = result {
            debug!("Using Forwarded header for remote address: {ip}");
        }
    }
    result.or_else(|| {
        let peer_addr = req.connection_info().peer_addr().map(|a| a.to_string());
        trace!("Using Peer address for remote address: {:?}", peer_addr);
        peer_addr.and_then(|s| IpAddr::from_str(&s).ok())
    })
}

/// Extracts the `for=` address from a `Forwarded` header value
fn forwarded_for(header: &str) -> Option<IpAddr> {
    let re = Regex::new(r#"for="?\[?(?P<ip>[^;,"\]]+)"#).ok()?;
    re.captures(header)
        .and_then(|caps| caps.name("ip"))
        .map(|m| m.as_str().trim())
        .and_then(|s| IpAddr::from_str(s).ok())
}

/// Compares two byte strings in time that depends only on their lengths
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod test {
    use std::net::SocketAddr;

    use actix_web::test::TestRequest;

    use super::*;

    #[test]
    fn remote_ip_sources() {
        let peer: SocketAddr = "10.1.1.1:5000".parse().unwrap();
        let req = TestRequest::default()
            .peer_addr(peer)
            .insert_header(("X-Forwarded-For", "203.0.113.9, 10.0.0.2"))
            .insert_header(("Forwarded", "for=198.51.100.7;proto=https"))
            .to_http_request();
        assert_eq!(get_remote_ip(&req, true, true), Some("203.0.113.9".parse().unwrap()));
        assert_eq!(get_remote_ip(&req, false, true), Some("198.51.100.7".parse().unwrap()));
        assert_eq!(get_remote_ip(&req, false, false), Some("10.1.1.1".parse().unwrap()));
    }

    #[test]
    fn forwarded_header_variants() {
        assert_eq!(forwarded_for("for=192.0.2.60;proto=http;by=203.0.113.43"), Some("192.0.2.60".parse().unwrap()));
        assert_eq!(forwarded_for(r#"for="[2001:db8:cafe::17]""#), Some("2001:db8:cafe::17".parse().unwrap()));
        assert_eq!(forwarded_for("proto=https"), None);
    }

    #[test]
    fn token_comparison() {
        assert!(constant_time_eq(b"secret", b"secret"));
        assert!(!constant_time_eq(b"secret", b"secreT"));
        assert!(!constant_time_eq(b"secret", b"secrets"));
    }
}
