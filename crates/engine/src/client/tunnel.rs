//! SSH tunnel: forwards the remote Docker socket to a local unix socket
//! using the system `ssh` binary.
//!
//! Secrets never appear on the command line. Private keys are written to a
//! 0600 file inside a private temp dir, and passwords or passphrases are
//! answered by an askpass helper that reads them from the child's
//! environment.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStderr, Command};
use tracing::debug;

use super::error::RuntimeError;
use super::options::{SshCredential, SshParams};

const SECRET_ENV: &str = "FLEET_SSH_SECRET";
const ASKPASS_SCRIPT: &str = "#!/bin/sh\nprintf '%s\\n' \"$FLEET_SSH_SECRET\"\n";
const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct SshTunnel {
    // Killed on drop
    _child: Child,
    dir: TempDir,
    destination: String,
}

impl SshTunnel {
    /// Spawn the forward and wait until the local socket accepts files, the
    /// ssh process exits, or `timeout` elapses.
    pub async fn open(params: &SshParams, ssh_binary: &str, timeout: Duration) -> Result<Self, RuntimeError> {
        let dir = tempfile::Builder::new()
            .prefix("fleet-ssh-")
            .tempdir()
            .map_err(|e| RuntimeError::Tunnel(format!("cannot create tunnel dir: {}", e)))?;
        let local_socket = dir.path().join("docker.sock");

        let key_path = match &params.credential {
            SshCredential::Key { key, .. } => {
                let path = dir.path().join("id_key");
                write_private(&path, key.expose().as_bytes(), 0o600)?;
                Some(path)
            }
            SshCredential::Password(_) => None,
        };

        let secret = match &params.credential {
            SshCredential::Password(p) => Some(p.expose().to_string()),
            SshCredential::Key { passphrase, .. } => passphrase.as_ref().map(|p| p.expose().to_string()),
        };

        let mut cmd = Command::new(ssh_binary);
        cmd.args(ssh_args(params, &local_socket, key_path.as_deref()))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(secret) = secret {
            let askpass = dir.path().join("askpass.sh");
            write_private(&askpass, ASKPASS_SCRIPT.as_bytes(), 0o700)?;
            cmd.env("SSH_ASKPASS", &askpass)
                .env("SSH_ASKPASS_REQUIRE", "force")
                .env("DISPLAY", ":0")
                .env(SECRET_ENV, secret);
        }

        let destination = format!("{}@{}:{}", params.user, params.host, params.port);
        debug!(destination = %destination, "Opening ssh tunnel");

        let mut child = cmd
            .spawn()
            .map_err(|e| RuntimeError::Tunnel(format!("cannot spawn {}: {}", ssh_binary, e)))?;

        let ready = tokio::time::timeout(timeout, async {
            loop {
                if local_socket.exists() {
                    return Ok(());
                }
                if let Some(status) = child
                    .try_wait()
                    .map_err(|e| RuntimeError::Tunnel(e.to_string()))?
                {
                    let mut stderr = String::new();
                    if let Some(mut pipe) = child.stderr.take() {
                        let _ = pipe.read_to_string(&mut stderr).await;
                    }
                    return Err(RuntimeError::Tunnel(format!(
                        "ssh exited ({}): {}",
                        status,
                        stderr.trim()
                    )));
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        })
        .await;

        match ready {
            Ok(Ok(())) => {
                if let Some(stderr) = child.stderr.take() {
                    tokio::spawn(drain_stderr(stderr, destination.clone()));
                }
                Ok(Self { _child: child, dir, destination })
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(RuntimeError::Timeout {
                operation: format!("ssh tunnel to {}", destination),
                secs: timeout.as_secs(),
            }),
        }
    }

    pub fn local_socket(&self) -> PathBuf {
        self.dir.path().join("docker.sock")
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }
}

/// Arguments for `ssh`, excluding any secret material.
/// Keep reading ssh diagnostics so a chatty child never blocks on a full
/// pipe. Ends when the child exits.
async fn drain_stderr(stderr: ChildStderr, destination: String) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!(destination = %destination, "ssh: {}", line);
    }
}

pub fn ssh_args(params: &SshParams, local_socket: &Path, key_path: Option<&Path>) -> Vec<String> {
    let mut args = vec![
        "-N".to_string(),
        "-o".to_string(),
        "ExitOnForwardFailure=yes".to_string(),
        "-o".to_string(),
        "StreamLocalBindUnlink=yes".to_string(),
        "-o".to_string(),
        "StrictHostKeyChecking=accept-new".to_string(),
        "-o".to_string(),
        "NumberOfPasswordPrompts=1".to_string(),
        "-p".to_string(),
        params.port.to_string(),
        "-L".to_string(),
        format!("{}:{}", local_socket.display(), params.remote_socket),
    ];

    if params.force_ipv4 {
        args.push("-4".to_string());
    } else if params.force_ipv6 {
        args.push("-6".to_string());
    }
    if params.agent_forward {
        args.push("-A".to_string());
    }

    match (&params.credential, key_path) {
        (SshCredential::Key { .. }, Some(path)) => {
            args.extend([
                "-i".to_string(),
                path.display().to_string(),
                "-o".to_string(),
                "IdentitiesOnly=yes".to_string(),
                "-o".to_string(),
                "PreferredAuthentications=publickey".to_string(),
            ]);
        }
        _ => {
            let methods = if params.try_keyboard {
                "PreferredAuthentications=password,keyboard-interactive"
            } else {
                "PreferredAuthentications=password"
            };
            args.extend([
                "-o".to_string(),
                "PubkeyAuthentication=no".to_string(),
                "-o".to_string(),
                methods.to_string(),
            ]);
        }
    }

    args.push(format!("{}@{}", params.user, params.host));
    args
}

fn write_private(path: &Path, contents: &[u8], mode: u32) -> Result<(), RuntimeError> {
    std::fs::write(path, contents)
        .map_err(|e| RuntimeError::Tunnel(format!("cannot write {}: {}", path.display(), e)))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
            .map_err(|e| RuntimeError::Tunnel(format!("cannot chmod {}: {}", path.display(), e)))?;
    }
    #[cfg(not(unix))]
    let _ = mode;
    Ok(())
}
