use http::Uri;
#[cfg(feature = "testing")]
use proptest::prelude::Strategy;
#[cfg(feature = "testing")]
use proptest_derive::Arbitrary;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub type HostName = String;

#[cfg(feature = "testing")]
fn arb_host_name() -> impl Strategy<Value = String> {
    use proptest::prelude::*;
    prop_oneof![
        Just("localhost".to_string()),
        (0..255u8, 0..255u8, 0..255u8, 0..255u8)
            .prop_map(|(a, b, c, d)| format!("{}.{}.{}.{}", a, b, c, d)),
        proptest::string::string_regex("[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?").unwrap()
    ]
}

#[cfg(feature = "testing")]
fn arb_path() -> impl Strategy<Value = Option<String>> {
    proptest::option::of(
        proptest::string::string_regex("(/[a-z][a-z0-9_]{0,11}){1,3}").unwrap(),
    )
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddrParseError {
    #[error("Invalid service address '{addr}': {reason}")]
    Invalid { addr: String, reason: String },

    #[error("Service address '{0}' has no host")]
    MissingHost(String),

    #[error("Service address '{0}' has no port")]
    MissingPort(String),

    #[error("Service address '{0}' uses port 0")]
    ZeroPort(String),
}

/// Location of the query service, e.g. `zk_host:2181/drill/cluster`.
///
/// The optional path selects a root or cluster below the host and is passed
/// through to the client untouched.
#[cfg_attr(feature = "testing", derive(Arbitrary))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceAddr {
    #[cfg_attr(feature = "testing", proptest(strategy = "arb_host_name()"))]
    pub host: HostName,
    #[cfg_attr(feature = "testing", proptest(strategy = "1..u16::MAX"))]
    pub port: u16,
    #[cfg_attr(feature = "testing", proptest(strategy = "arb_path()"))]
    pub path: Option<String>,
}

impl ServiceAddr {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        let host = host.into();
        assert!(!host.is_empty(), "Hostname cannot be empty");
        assert!(port > 0, "Port cannot be 0");
        Self {
            host,
            port,
            path: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        let trimmed = path.trim_matches('/');
        self.path = (!trimmed.is_empty()).then(|| format!("/{trimmed}"));
        self
    }
}

impl fmt::Display for ServiceAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)?;
        if let Some(path) = &self.path {
            f.write_str(path)?;
        }
        Ok(())
    }
}

impl FromStr for ServiceAddr {
    type Err = AddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Uri only recognizes the authority when a scheme is present
        let with_scheme = if s.contains("://") {
            s.to_string()
        } else {
            format!("http://{}", s)
        };
        let uri = with_scheme
            .parse::<Uri>()
            .map_err(|e| AddrParseError::Invalid {
                addr: s.to_string(),
                reason: e.to_string(),
            })?;

        let authority = uri
            .authority()
            .ok_or_else(|| AddrParseError::MissingHost(s.to_string()))?;
        let host = authority.host().to_string();
        if host.is_empty() {
            return Err(AddrParseError::MissingHost(s.to_string()));
        }
        let port = authority
            .port_u16()
            .ok_or_else(|| AddrParseError::MissingPort(s.to_string()))?;
        if port == 0 {
            return Err(AddrParseError::ZeroPort(s.to_string()));
        }

        Ok(ServiceAddr {
            host,
            port,
            path: None,
        }
        .with_path(uri.path()))
    }
}
