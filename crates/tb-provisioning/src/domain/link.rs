//! Access link rendering and parsing.
//!
//! The access descriptor handed to the user is a URI of the form
//! `vless://<uuid>@<domain>:<port>?path=/vless&encryption=none&type=ws#<username>`
//! and must round-trip: parsing a rendered link recovers the credential
//! UUID, domain, port, and username.

use crate::domain::errors::ProvisioningError;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;
use uuid::Uuid;

/// Default websocket path on provisioned nodes.
pub const DEFAULT_PATH: &str = "/vless";

/// A parsed VPN access descriptor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccessLink {
    /// Credential UUID embedded in the remote config.
    pub credential_uuid: Uuid,
    /// Node hostname.
    pub domain: String,
    /// Listening port.
    pub port: u16,
    /// Websocket path.
    pub path: String,
    /// Remote username (link fragment, shown by clients as the label).
    pub username: String,
}

impl AccessLink {
    /// Build a link with the default path.
    pub fn new(credential_uuid: Uuid, domain: impl Into<String>, port: u16, username: impl Into<String>) -> Self {
        Self {
            credential_uuid,
            domain: domain.into(),
            port,
            path: DEFAULT_PATH.to_string(),
            username: username.into(),
        }
    }

    /// Render the wire form.
    pub fn render(&self) -> String {
        format!(
            "vless://{}@{}:{}?path={}&encryption=none&type=ws#{}",
            self.credential_uuid, self.domain, self.port, self.path, self.username
        )
    }

    /// Parse a wire-form link back into its parts.
    pub fn parse(raw: &str) -> Result<Self, ProvisioningError> {
        let url =
            Url::parse(raw).map_err(|e| ProvisioningError::MalformedLink(e.to_string()))?;

        if url.scheme() != "vless" {
            return Err(ProvisioningError::MalformedLink(format!(
                "unexpected scheme: {}",
                url.scheme()
            )));
        }

        let credential_uuid = Uuid::parse_str(url.username())
            .map_err(|e| ProvisioningError::MalformedLink(format!("bad credential uuid: {e}")))?;
        let domain = url
            .host_str()
            .ok_or_else(|| ProvisioningError::MalformedLink("missing domain".into()))?
            .to_string();
        let port = url
            .port()
            .ok_or_else(|| ProvisioningError::MalformedLink("missing port".into()))?;
        let path = url
            .query_pairs()
            .find(|(k, _)| k == "path")
            .map(|(_, v)| v.into_owned())
            .unwrap_or_else(|| DEFAULT_PATH.to_string());
        let username = url
            .fragment()
            .ok_or_else(|| ProvisioningError::MalformedLink("missing username fragment".into()))?
            .to_string();

        Ok(Self {
            credential_uuid,
            domain,
            port,
            path,
            username,
        })
    }
}

impl fmt::Display for AccessLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_shape() {
        let uuid = Uuid::parse_str("6ba7b810-9dad-41d1-80b4-00c04fd430c8").unwrap();
        let link = AccessLink::new(uuid, "vpn1.example.com", 443, "u-ord-1");
        assert_eq!(
            link.render(),
            "vless://6ba7b810-9dad-41d1-80b4-00c04fd430c8@vpn1.example.com:443?path=/vless&encryption=none&type=ws#u-ord-1"
        );
    }

    #[test]
    fn test_round_trip() {
        let link = AccessLink::new(Uuid::new_v4(), "vpn1.example.com", 80, "u-ord-20260201-a1b2c3");
        let parsed = AccessLink::parse(&link.render()).unwrap();
        assert_eq!(parsed, link);
    }

    #[test]
    fn test_wrong_scheme_rejected() {
        let err = AccessLink::parse("https://example.com:443#u").unwrap_err();
        assert!(matches!(err, ProvisioningError::MalformedLink(_)));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(AccessLink::parse("not a link").is_err());
        assert!(AccessLink::parse("vless://not-a-uuid@host:443#u").is_err());
    }
}
