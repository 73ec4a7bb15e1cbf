use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{info, warn};

pub const UNKNOWN_IP: &str = "unknown";

pub const IPIFY_URL: &str = "https://api.ipify.org?format=json";

/// Public IP attributed to an analysis. `Unknown` disables usage limiting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ClientIp {
    Known(String),
    #[default]
    Unknown,
}

impl ClientIp {
    pub fn is_unknown(&self) -> bool {
        matches!(self, ClientIp::Unknown)
    }

    pub fn as_str(&self) -> &str {
        match self {
            ClientIp::Known(ip) => ip,
            ClientIp::Unknown => UNKNOWN_IP,
        }
    }
}

impl From<&str> for ClientIp {
    fn from(value: &str) -> Self {
        if value == UNKNOWN_IP {
            ClientIp::Unknown
        } else {
            ClientIp::Known(value.to_string())
        }
    }
}

impl From<String> for ClientIp {
    fn from(value: String) -> Self {
        ClientIp::from(value.as_str())
    }
}

impl From<ClientIp> for String {
    fn from(value: ClientIp) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ClientIp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolves the caller's public IP. Never fails: unresolvable means `Unknown`.
pub trait IpResolver {
    fn resolve(&self) -> ClientIp;
}

impl<R: IpResolver + ?Sized> IpResolver for Box<R> {
    fn resolve(&self) -> ClientIp {
        (**self).resolve()
    }
}

/// Always returns the same IP, e.g. one supplied on the command line.
#[derive(Debug, Clone)]
pub struct FixedIpResolver(pub ClientIp);

impl IpResolver for FixedIpResolver {
    fn resolve(&self) -> ClientIp {
        self.0.clone()
    }
}

#[derive(Deserialize)]
struct IpifyResponse {
    ip: String,
}

/// Looks up the public IP through the ipify JSON endpoint.
pub struct IpifyResolver {
    endpoint: String,
    timeout: Duration,
}

impl IpifyResolver {
    pub fn new(timeout: Duration) -> Self {
        Self {
            endpoint: IPIFY_URL.to_string(),
            timeout,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn lookup(&self) -> reqwest::Result<String> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()?;
        let response: IpifyResponse = client
            .get(&self.endpoint)
            .send()?
            .error_for_status()?
            .json()?;
        Ok(response.ip)
    }
}

impl IpResolver for IpifyResolver {
    fn resolve(&self) -> ClientIp {
        match self.lookup() {
            Ok(ip) => {
                let ip = ClientIp::from(ip);
                info!(action = "resolve", component = "ip_lookup", ip = %ip, "Resolved client IP");
                ip
            }
            Err(e) => {
                warn!(action = "resolve", component = "ip_lookup", endpoint = %self.endpoint, error = %e, "Failed to fetch IP, falling back to unknown");
                ClientIp::Unknown
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_exact_sentinel_parses_as_unknown() {
        assert_eq!(ClientIp::from("unknown"), ClientIp::Unknown);
        assert_eq!(ClientIp::from(""), ClientIp::Known(String::new()));
        assert_eq!(ClientIp::from(" unknown "), ClientIp::Known(" unknown ".to_string()));
        assert_eq!(
            ClientIp::from("1.2.3.4"),
            ClientIp::Known("1.2.3.4".to_string())
        );
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&ClientIp::Unknown).unwrap();
        assert_eq!(json, "\"unknown\"");

        let ip: ClientIp = serde_json::from_str("\"10.0.0.7\"").unwrap();
        assert_eq!(ip.as_str(), "10.0.0.7");
    }

    #[test]
    fn unreachable_endpoint_degrades_to_unknown() {
        // Port 9 on localhost is the discard port; nothing answers HTTP there.
        let resolver = IpifyResolver::new(Duration::from_millis(200))
            .with_endpoint("http://127.0.0.1:9/");
        assert!(resolver.resolve().is_unknown());
    }
}
