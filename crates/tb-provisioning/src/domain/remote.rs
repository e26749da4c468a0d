//! Remote transport contract types.
//!
//! The remote side signals success with three labeled output fields
//! (`DOMAIN=`, `PORT=`, `EXP=`), "already exists" with a distinguished
//! exit code plus a marker token, and everything else through an
//! explicit exit-code table splitting retryable from fatal.

use crate::domain::errors::ProvisioningError;
use chrono::{DateTime, NaiveDate, Utc};
use shared_types::ServerProfile;
use uuid::Uuid;

/// Exit code the remote script uses for "username already present".
pub const EXIT_ALREADY_EXISTS: i32 = 3;
/// Marker token accompanying [`EXIT_ALREADY_EXISTS`].
pub const MARKER_ALREADY_EXISTS: &str = "ERR_USER_EXISTS";

/// Everything the transport needs to provision one credential.
#[derive(Clone, Debug)]
pub struct ProvisionRequest {
    /// Target node and its admin credentials.
    pub server: ServerProfile,
    /// Derived remote username.
    pub username: String,
    /// Derived credential UUID.
    pub credential_uuid: Uuid,
    /// Validity window in days.
    pub duration_days: u32,
}

/// Parsed successful remote output.
#[derive(Clone, Debug, PartialEq)]
pub struct RemoteGrant {
    /// Hostname the credential is reachable on.
    pub domain: String,
    /// Listening port.
    pub port: u16,
    /// Expiry date the remote recorded.
    pub expires_at: DateTime<Utc>,
}

/// Outcome of one remote invocation.
#[derive(Clone, Debug, PartialEq)]
pub enum RemoteOutcome {
    /// Credential created; labeled fields parsed.
    Created(RemoteGrant),
    /// The username already exists remotely. Read as success: a prior
    /// attempt's remote effect landed even though the local crash
    /// happened before recording it.
    AlreadyExists,
}

/// Classification of a remote exit code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitClass {
    /// Labeled output expected on stdout.
    Success,
    /// Distinguished already-exists code; confirm via the marker.
    AlreadyExists,
    /// Connectivity-shaped failure; retry with backoff.
    Retryable,
    /// Script or remote-state corruption; do not retry.
    Fatal,
}

impl ExitClass {
    /// The exit-code table.
    ///
    /// 124 is the conventional timeout code, 255 is ssh's own
    /// connection failure; anything else non-zero means the script
    /// itself aborted (missing config anchor, syntax error) which
    /// retrying will not fix.
    pub fn of(code: i32) -> Self {
        match code {
            0 => Self::Success,
            EXIT_ALREADY_EXISTS => Self::AlreadyExists,
            124 | 255 => Self::Retryable,
            _ => Self::Fatal,
        }
    }
}

/// Parse the labeled success output.
///
/// `EXP=` carries a bare date; the grant expires at that day's
/// midnight UTC.
pub fn parse_grant(stdout: &str) -> Result<RemoteGrant, ProvisioningError> {
    let field = |label: &str| {
        stdout
            .lines()
            .find_map(|line| line.trim().strip_prefix(label).map(str::to_string))
    };

    let domain = field("DOMAIN=")
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ProvisioningError::RemoteFatal("missing DOMAIN field".into()))?;
    let port: u16 = field("PORT=")
        .and_then(|s| s.trim().parse().ok())
        .ok_or_else(|| ProvisioningError::RemoteFatal("missing or bad PORT field".into()))?;
    let exp_raw = field("EXP=")
        .ok_or_else(|| ProvisioningError::RemoteFatal("missing EXP field".into()))?;
    let exp_date = NaiveDate::parse_from_str(exp_raw.trim(), "%Y-%m-%d")
        .map_err(|e| ProvisioningError::RemoteFatal(format!("bad EXP field: {e}")))?;
    let expires_at = exp_date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| ProvisioningError::RemoteFatal("bad EXP field".into()))?
        .and_utc();

    Ok(RemoteGrant {
        domain,
        port,
        expires_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_exit_code_table() {
        assert_eq!(ExitClass::of(0), ExitClass::Success);
        assert_eq!(ExitClass::of(3), ExitClass::AlreadyExists);
        assert_eq!(ExitClass::of(124), ExitClass::Retryable);
        assert_eq!(ExitClass::of(255), ExitClass::Retryable);
        assert_eq!(ExitClass::of(1), ExitClass::Fatal);
        assert_eq!(ExitClass::of(2), ExitClass::Fatal);
    }

    #[test]
    fn test_parse_grant() {
        let out = "DOMAIN=vpn1.example.com\nPORT=443\nEXP=2026-03-01\n";
        let grant = parse_grant(out).unwrap();
        assert_eq!(grant.domain, "vpn1.example.com");
        assert_eq!(grant.port, 443);
        assert_eq!(
            grant.expires_at,
            Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_grant_tolerates_noise_lines() {
        let out = "restarting service...\nDOMAIN=x.example.com\nPORT=80\nEXP=2026-03-01\ndone\n";
        assert!(parse_grant(out).is_ok());
    }

    #[test]
    fn test_parse_grant_missing_fields_fatal() {
        let err = parse_grant("DOMAIN=x\nPORT=80\n").unwrap_err();
        assert!(matches!(err, ProvisioningError::RemoteFatal(_)));

        let err = parse_grant("DOMAIN=x\nPORT=eighty\nEXP=2026-03-01").unwrap_err();
        assert!(matches!(err, ProvisioningError::RemoteFatal(_)));
    }
}
