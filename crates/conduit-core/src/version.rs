//! API versions.
//!
//! Handlers of the same resource may exist in several `major.minor`
//! versions. A client asks for a version through a header of the form
//! `protocol=1.0,resource=2.1`; protocol adapters parse it with
//! [`AcceptApiVersion::parse`] and attach the result to the request context.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ResourceError, ResourceResult};

/// Name of the header carrying the requested API versions.
pub const ACCEPT_API_VERSION: &str = "Accept-API-Version";

/// Name of the header advising the API version actually used.
pub const CONTENT_API_VERSION: &str = "Content-API-Version";

/// A `major.minor` version, ordered by major then minor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    /// Major version.
    pub major: u32,
    /// Minor version.
    pub minor: u32,
}

impl Version {
    /// Creates a version.
    #[must_use]
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Returns true when a handler of this version can serve a request for
    /// `requested`: same major line, and a minor at least as new.
    ///
    /// # Example
    ///
    /// ```
    /// use conduit_core::Version;
    ///
    /// assert!(Version::new(1, 2).is_compatible_with(&Version::new(1, 1)));
    /// assert!(!Version::new(1, 0).is_compatible_with(&Version::new(1, 1)));
    /// assert!(!Version::new(2, 5).is_compatible_with(&Version::new(1, 1)));
    /// ```
    #[must_use]
    pub const fn is_compatible_with(&self, requested: &Self) -> bool {
        self.major == requested.major && self.minor >= requested.minor
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for Version {
    type Err = ResourceError;

    fn from_str(s: &str) -> ResourceResult<Self> {
        let malformed = || ResourceError::bad_request(format!("'{s}' is not a valid version"));
        let (major, minor) = match s.trim().split_once('.') {
            Some((major, minor)) => (major, minor),
            None => (s.trim(), "0"),
        };
        let parse = |part: &str| {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(malformed());
            }
            part.parse::<u32>().map_err(|_| malformed())
        };
        Ok(Self::new(parse(major)?, parse(minor)?))
    }
}

impl Serialize for Version {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Which version to use when a request does not name one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultVersionBehaviour {
    /// Use the highest registered version.
    #[default]
    Latest,
    /// Use the lowest registered version.
    Oldest,
    /// Reject the request.
    None,
}

/// The versions requested by a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AcceptApiVersion {
    /// Requested protocol version.
    pub protocol: Option<Version>,
    /// Requested resource version.
    pub resource: Option<Version>,
}

impl AcceptApiVersion {
    /// Creates an empty version request.
    #[must_use]
    pub const fn new(protocol: Option<Version>, resource: Option<Version>) -> Self {
        Self { protocol, resource }
    }

    /// Parses `type=major.minor[,type=major.minor]`, `type` being `protocol`
    /// or `resource`.
    ///
    /// # Example
    ///
    /// ```
    /// use conduit_core::{AcceptApiVersion, Version};
    ///
    /// let parsed = AcceptApiVersion::parse("protocol=1.0, resource=2.1").unwrap();
    /// assert_eq!(parsed.resource, Some(Version::new(2, 1)));
    /// assert!(AcceptApiVersion::parse("resource=two").is_err());
    /// ```
    pub fn parse(header: &str) -> ResourceResult<Self> {
        let mut result = Self::default();
        if header.trim().is_empty() {
            return Ok(result);
        }

        for part in header.split(',') {
            let (kind, version) = part.split_once('=').ok_or_else(|| {
                ResourceError::bad_request(format!(
                    "malformed {ACCEPT_API_VERSION} element '{}'",
                    part.trim()
                ))
            })?;
            let version: Version = version.parse()?;
            let slot = match kind.trim() {
                "protocol" => &mut result.protocol,
                "resource" => &mut result.resource,
                other => {
                    return Err(ResourceError::bad_request(format!(
                        "unknown {ACCEPT_API_VERSION} type '{other}'"
                    )))
                }
            };
            if slot.replace(version).is_some() {
                return Err(ResourceError::bad_request(format!(
                    "{ACCEPT_API_VERSION} names '{}' more than once",
                    kind.trim()
                )));
            }
        }
        Ok(result)
    }
}

impl fmt::Display for AcceptApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::with_capacity(2);
        if let Some(v) = self.protocol {
            parts.push(format!("protocol={v}"));
        }
        if let Some(v) = self.resource {
            parts.push(format!("resource={v}"));
        }
        f.write_str(&parts.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version() {
        assert_eq!("2.1".parse::<Version>().unwrap(), Version::new(2, 1));
        assert_eq!("3".parse::<Version>().unwrap(), Version::new(3, 0));
        assert!("1.x".parse::<Version>().unwrap_err().is_bad_request());
        assert!("".parse::<Version>().is_err());
        assert!("1.2.3".parse::<Version>().is_err());
        assert!("-1.0".parse::<Version>().is_err());
    }

    #[test]
    fn test_version_ordering() {
        let mut versions = vec![Version::new(2, 0), Version::new(1, 2), Version::new(1, 10)];
        versions.sort();
        assert_eq!(
            versions,
            vec![Version::new(1, 2), Version::new(1, 10), Version::new(2, 0)]
        );
    }

    #[test]
    fn test_version_serde() {
        let json = serde_json::to_string(&Version::new(1, 4)).unwrap();
        assert_eq!(json, "\"1.4\"");
        let back: Version = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Version::new(1, 4));
    }

    #[test]
    fn test_accept_api_version_parse() {
        let parsed = AcceptApiVersion::parse("resource=1.1").unwrap();
        assert_eq!(parsed.protocol, None);
        assert_eq!(parsed.resource, Some(Version::new(1, 1)));

        assert_eq!(AcceptApiVersion::parse("").unwrap(), AcceptApiVersion::default());
    }

    #[test]
    fn test_accept_api_version_rejects_malformed() {
        assert!(AcceptApiVersion::parse("resource").is_err());
        assert!(AcceptApiVersion::parse("schema=1.0").is_err());
        assert!(AcceptApiVersion::parse("resource=1.0,resource=2.0").is_err());
    }

    #[test]
    fn test_accept_api_version_display() {
        let header = AcceptApiVersion::new(Some(Version::new(1, 0)), Some(Version::new(2, 1)));
        assert_eq!(header.to_string(), "protocol=1.0,resource=2.1");
    }

    #[test]
    fn test_default_behaviour_serde() {
        let parsed: DefaultVersionBehaviour = serde_json::from_str("\"oldest\"").unwrap();
        assert_eq!(parsed, DefaultVersionBehaviour::Oldest);
        assert_eq!(DefaultVersionBehaviour::default(), DefaultVersionBehaviour::Latest);
    }
}
