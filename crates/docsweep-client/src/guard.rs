use std::net::IpAddr;

use docsweep_core::error::AppError;
use url::Url;

/// Which hosts a loader may fetch from.
///
/// Crawl specs submitted to the server are untrusted, so loaders start out
/// refusing anything that resolves to a private or reserved address. Hosts
/// listed as trusted skip the address check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct HostGuard {
    allow_private: bool,
    trusted: Vec<String>,
}

impl HostGuard {
    pub(crate) fn allow_private(&mut self) {
        self.allow_private = true;
    }

    pub(crate) fn trust(&mut self, host: &str) {
        let host = host.trim().to_ascii_lowercase();
        if !host.is_empty() && !self.trusted.contains(&host) {
            self.trusted.push(host);
        }
    }

    /// Refuse non-HTTP schemes and hosts resolving to private or reserved addresses.
    pub(crate) async fn check(&self, url: &Url) -> Result<(), AppError> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AppError::HttpError(format!(
                "URL scheme '{}' is not allowed (only http/https)",
                url.scheme()
            )));
        }
        if self.allow_private {
            return Ok(());
        }
        let host = url
            .host_str()
            .ok_or_else(|| AppError::malformed_url(url.as_str(), "URL has no host"))?;
        if self.trusted.iter().any(|t| t.eq_ignore_ascii_case(host)) {
            return Ok(());
        }

        let addresses: Vec<IpAddr> = match host.trim_matches(['[', ']']).parse::<IpAddr>() {
            Ok(ip) => vec![ip],
            Err(_) => {
                let port = url.port_or_known_default().unwrap_or(80);
                tokio::net::lookup_host((host, port))
                    .await
                    .map_err(|e| {
                        AppError::NetworkError(format!("DNS resolution failed for {host}: {e}"))
                    })?
                    .map(|addr| addr.ip())
                    .collect()
            }
        };

        if addresses.is_empty() {
            return Err(AppError::NetworkError(format!(
                "DNS resolution returned no addresses for {host}"
            )));
        }
        if let Some(ip) = addresses.into_iter().find(|ip| !is_public_ip(*ip)) {
            return Err(AppError::HttpError(format!(
                "Refusing to crawl {host}: resolves to private or reserved address {ip}"
            )));
        }
        Ok(())
    }

    /// Check where a navigation ended up, when that differs from where it started.
    #[cfg_attr(not(feature = "browser"), allow(dead_code))]
    pub(crate) async fn check_landing(&self, requested: &str, landed: &str) -> Result<(), AppError> {
        if landed == requested {
            return Ok(());
        }
        let url = Url::parse(landed).map_err(|e| AppError::malformed_url(landed, e))?;
        self.check(&url).await
    }
}

fn is_public_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            let [a, b, ..] = v4.octets();
            let carrier_grade_nat = a == 100 && (b & 0xC0) == 64;
            !(v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
                || v4.is_documentation()
                || carrier_grade_nat)
        }
        IpAddr::V6(v6) => {
            if let Some(v4) = v6.to_ipv4_mapped() {
                return is_public_ip(IpAddr::V4(v4));
            }
            let first = v6.segments()[0];
            let link_local = (first & 0xFFC0) == 0xFE80;
            let unique_local = (first & 0xFE00) == 0xFC00;
            !(v6.is_loopback() || v6.is_unspecified() || link_local || unique_local)
        }
    }
}
