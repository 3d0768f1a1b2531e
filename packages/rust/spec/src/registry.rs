//! Registry URI records.
//!
//! A registry is given as `[scheme://]host[:port][/path][/vN]`. The executor
//! addresses it by the scheme-less part and talks to it using API version
//! `vN` (default `v1`).

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use reactorconf_shared::{DEFAULT_REGISTRY_VERSION, ReactorConfError, Result};

/// A parsed registry URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryUri {
    scheme: String,
    docker_uri: String,
    version: String,
}

impl RegistryUri {
    /// Parse a registry URI string.
    pub fn parse(raw: &str) -> Result<Self> {
        static REGISTRY_RE: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(
                r"^(?P<scheme>[A-Za-z][A-Za-z0-9+.\-]*://)?(?P<location>[^/]*(?:/[^/]+)*?)(?:/(?P<version>v\d+))?/?$",
            )
            .expect("valid regex")
        });

        let caps = REGISTRY_RE
            .captures(raw.trim())
            .ok_or_else(|| ReactorConfError::parse(format!("invalid registry URI '{raw}'")))?;

        let scheme = caps.name("scheme").map_or("", |m| m.as_str()).to_string();
        let docker_uri = caps.name("location").map_or("", |m| m.as_str()).to_string();
        let version = caps
            .name("version")
            .map_or(DEFAULT_REGISTRY_VERSION, |m| m.as_str())
            .to_string();

        if version == DEFAULT_REGISTRY_VERSION && !docker_uri.is_empty() {
            warn!(registry = %docker_uri, "registry v1 API is deprecated");
        }

        Ok(Self {
            scheme,
            docker_uri,
            version,
        })
    }

    /// Scheme plus docker URI; empty when no registry was given.
    pub fn uri(&self) -> String {
        format!("{}{}", self.scheme, self.docker_uri)
    }

    /// `host[:port][/path]`, the key the executor addresses the registry by.
    pub fn docker_uri(&self) -> &str {
        &self.docker_uri
    }

    /// Registry API version, e.g. `v2`.
    pub fn version(&self) -> &str {
        &self.version
    }
}

impl std::fmt::Display for RegistryUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}/{}", self.scheme, self.docker_uri, self.version)
    }
}

impl std::str::FromStr for RegistryUri {
    type Err = ReactorConfError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_stripped_and_version_defaulted() {
        let reg = RegistryUri::parse("https://example.one.com").expect("parse");
        assert_eq!(reg.docker_uri(), "example.one.com");
        assert_eq!(reg.version(), "v1");
        assert_eq!(reg.uri(), "https://example.one.com");
    }

    #[test]
    fn version_suffix_extracted() {
        let reg = RegistryUri::parse("https://example.two.com/v2").expect("parse");
        assert_eq!(reg.docker_uri(), "example.two.com");
        assert_eq!(reg.version(), "v2");

        let reg = RegistryUri::parse("registry.local:5000/team/images/v2/").expect("parse");
        assert_eq!(reg.docker_uri(), "registry.local:5000/team/images");
        assert_eq!(reg.version(), "v2");
        assert_eq!(reg.uri(), "registry.local:5000/team/images");
    }

    #[test]
    fn non_version_path_is_kept() {
        let reg = RegistryUri::parse("http://example.com:8080/mirror").expect("parse");
        assert_eq!(reg.docker_uri(), "example.com:8080/mirror");
        assert_eq!(reg.version(), "v1");

        let reg = RegistryUri::parse("example.com/v2beta").expect("parse");
        assert_eq!(reg.docker_uri(), "example.com/v2beta");
        assert_eq!(reg.version(), "v1");
    }

    #[test]
    fn empty_uri_parses_to_nothing() {
        let reg = RegistryUri::parse("").expect("parse");
        assert!(reg.uri().is_empty());

        let reg = RegistryUri::parse("https://").expect("parse");
        assert!(reg.docker_uri().is_empty());
        assert_eq!(reg.uri(), "https://");
    }

    #[test]
    fn malformed_uri_rejected() {
        assert!(RegistryUri::parse("https://example.com//v2").is_err());
        assert!("example.com".parse::<RegistryUri>().is_ok());
    }
}
