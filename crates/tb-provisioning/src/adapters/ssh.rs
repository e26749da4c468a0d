//! SSH transport: runs the provisioning script on a remote node.
//!
//! The whole remote mutation rides in a single `ssh` invocation so
//! there is exactly one exit code to classify. The script itself is
//! written to be idempotent: it probes for the username first and
//! bails with [`EXIT_ALREADY_EXISTS`](crate::domain::remote::EXIT_ALREADY_EXISTS)
//! plus the marker token before touching anything.

use crate::domain::errors::ProvisioningError;
use crate::domain::remote::{
    parse_grant, ExitClass, ProvisionRequest, RemoteOutcome, MARKER_ALREADY_EXISTS,
};
use crate::ports::ProvisioningTransport;
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Knobs for the SSH invocation.
#[derive(Clone, Debug)]
pub struct SshConfig {
    /// TCP connect timeout passed to ssh itself.
    pub connect_timeout: Duration,
    /// Wall-clock bound on the whole invocation, script included.
    pub command_timeout: Duration,
    /// Path of the proxy config file on the remote node.
    pub remote_config_path: String,
    /// Name of the remote service to restart after the edit.
    pub remote_service: String,
    /// Port the proxy listens on; reported back in the grant.
    pub access_port: u16,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            command_timeout: Duration::from_secs(60),
            remote_config_path: "/etc/xray/config.json".into(),
            remote_service: "xray".into(),
            access_port: 443,
        }
    }
}

/// [`ProvisioningTransport`] over the system `ssh` binary.
pub struct SshTransport {
    config: SshConfig,
}

impl SshTransport {
    /// Build a transport with the given knobs.
    #[must_use]
    pub fn new(config: SshConfig) -> Self {
        Self { config }
    }

    /// The script executed remotely. Probe, insert, restart, report.
    fn build_script(&self, request: &ProvisionRequest) -> String {
        let expiry = (Utc::now() + ChronoDuration::days(i64::from(request.duration_days)))
            .format("%Y-%m-%d");
        let entry = format!(
            "### {username} {expiry}\\n{{\"id\": \"{uuid}\",\"email\": \"{username}\"}},",
            username = request.username,
            uuid = request.credential_uuid,
            expiry = expiry,
        );
        format!(
            concat!(
                "set -e\n",
                "CONFIG={config}\n",
                "if grep -qw {username} \"$CONFIG\"; then\n",
                "  echo {marker}\n",
                "  exit 3\n",
                "fi\n",
                "sed -i '/#entries$/a\\{entry}' \"$CONFIG\"\n",
                "systemctl restart {service}\n",
                "echo DOMAIN=$(hostname -f)\n",
                "echo PORT={port}\n",
                "echo EXP={expiry}\n",
            ),
            config = shell_quote(&self.config.remote_config_path),
            username = request.username,
            entry = entry,
            expiry = expiry,
            marker = MARKER_ALREADY_EXISTS,
            service = self.config.remote_service,
            port = self.config.access_port,
        )
    }
}

/// Single-quote a string for the remote shell.
fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

#[async_trait]
impl ProvisioningTransport for SshTransport {
    async fn provision(
        &self,
        request: &ProvisionRequest,
    ) -> Result<RemoteOutcome, ProvisioningError> {
        let server = &request.server;
        let script = self.build_script(request);

        debug!(
            server_id = %server.server_id,
            username = %request.username,
            "Invoking remote provisioning script"
        );

        let invocation = Command::new("ssh")
            .arg("-o")
            .arg("StrictHostKeyChecking=no")
            .arg("-o")
            .arg(format!(
                "ConnectTimeout={}",
                self.config.connect_timeout.as_secs()
            ))
            .arg("-o")
            .arg("BatchMode=yes")
            .arg("-i")
            .arg(&server.ssh_key_path)
            .arg("-p")
            .arg(server.ssh_port.to_string())
            .arg(format!("{}@{}", server.ssh_user, server.hostname))
            .arg(script)
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.config.command_timeout, invocation)
            .await
            .map_err(|_| {
                warn!(
                    server_id = %server.server_id,
                    username = %request.username,
                    "Remote provisioning timed out; effect may have landed"
                );
                ProvisioningError::RemoteTransient("ssh invocation timed out".into())
            })?
            .map_err(|e| ProvisioningError::RemoteTransient(format!("failed to spawn ssh: {e}")))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let code = output.status.code().unwrap_or(-1);

        match ExitClass::of(code) {
            ExitClass::Success => Ok(RemoteOutcome::Created(parse_grant(&stdout)?)),
            ExitClass::AlreadyExists if stdout.contains(MARKER_ALREADY_EXISTS) => {
                debug!(
                    server_id = %server.server_id,
                    username = %request.username,
                    "Remote credential already present"
                );
                Ok(RemoteOutcome::AlreadyExists)
            }
            // Exit 3 without the marker came from something else on the
            // remote side; treat it as the script aborting.
            ExitClass::AlreadyExists | ExitClass::Fatal => Err(ProvisioningError::RemoteFatal(
                format!("remote script exited {code}: {}", stderr.trim()),
            )),
            ExitClass::Retryable => Err(ProvisioningError::RemoteTransient(format!(
                "connection failure (exit {code}): {}",
                stderr.trim()
            ))),
        }
    }
}
