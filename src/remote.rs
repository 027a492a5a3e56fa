//! Remote hosts reached over SSH.
//!
//! The [`RemoteShell`] trait is the seam between the menu workflows and the
//! network; [`OpenSshClient`] implements it with the system's `scp`, `ssh`
//! and `ssh-copy-id` binaries.

use anyhow::{bail, Result};
use std::fmt;
use std::path::Path;
use tracing::info;

use crate::error::PkiError;
use crate::process;

/// `user@host:port` target of a remote action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteHost {
    pub user: String,
    pub host: String,
    pub port: u16,
}

impl RemoteHost {
    pub fn new(user: &str, host: &str, port: u16) -> Result<Self> {
        let host = host.trim();
        let user = user.trim();
        if host.is_empty() {
            bail!("Remote host must not be empty");
        }
        if host.starts_with('-') || user.starts_with('-') {
            bail!("Remote host and user must not start with '-'");
        }
        if host.contains(char::is_whitespace) || user.contains(char::is_whitespace) {
            bail!("Remote host and user must not contain whitespace");
        }
        Ok(Self {
            user: user.to_string(),
            host: host.to_string(),
            port,
        })
    }

    /// `user@host`, or just `host` without a user.
    pub fn destination(&self) -> String {
        if self.user.is_empty() {
            self.host.clone()
        } else {
            format!("{}@{}", self.user, self.host)
        }
    }

    pub fn is_root(&self) -> bool {
        self.user == "root"
    }
}

impl fmt::Display for RemoteHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.destination(), self.port)
    }
}

/// Remote operations the deployment workflows depend on.
pub trait RemoteShell {
    /// Copy one local file to `remote_path` on the host.
    fn copy_file(&self, host: &RemoteHost, local: &Path, remote_path: &str) -> Result<()>;

    /// Run a shell command line on the host.
    fn execute(&self, host: &RemoteHost, command: &str) -> Result<()>;

    /// Append a public key to the host's authorized keys.
    fn install_public_key(&self, host: &RemoteHost, public_key: &Path) -> Result<()>;
}

/// [`RemoteShell`] backed by the OpenSSH client tools.
#[derive(Debug, Clone)]
pub struct OpenSshClient {
    scp: String,
    ssh: String,
    ssh_copy_id: String,
}

impl Default for OpenSshClient {
    fn default() -> Self {
        Self {
            scp: "scp".to_string(),
            ssh: "ssh".to_string(),
            ssh_copy_id: "ssh-copy-id".to_string(),
        }
    }
}

impl OpenSshClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn scp_args(host: &RemoteHost, local: &Path, remote_path: &str) -> Vec<String> {
        vec![
            "-P".to_string(),
            host.port.to_string(),
            local.display().to_string(),
            format!("{}:{}", host.destination(), remote_path),
        ]
    }

    pub(crate) fn ssh_args(host: &RemoteHost, command: &str) -> Vec<String> {
        vec![
            "-p".to_string(),
            host.port.to_string(),
            host.destination(),
            command.to_string(),
        ]
    }

    pub(crate) fn copy_id_args(host: &RemoteHost, public_key: &Path) -> Vec<String> {
        vec![
            "-i".to_string(),
            public_key.display().to_string(),
            "-p".to_string(),
            host.port.to_string(),
            host.destination(),
        ]
    }
}

impl RemoteShell for OpenSshClient {
    fn copy_file(&self, host: &RemoteHost, local: &Path, remote_path: &str) -> Result<()> {
        if !local.is_file() {
            return Err(PkiError::MissingSource(local.to_path_buf()).into());
        }
        process::run(&self.scp, &Self::scp_args(host, local, remote_path))?;
        info!(%host, local = %local.display(), remote_path, "Copied file to remote host");
        Ok(())
    }

    fn execute(&self, host: &RemoteHost, command: &str) -> Result<()> {
        process::run(&self.ssh, &Self::ssh_args(host, command))?;
        info!(%host, command, "Remote command completed");
        Ok(())
    }

    fn install_public_key(&self, host: &RemoteHost, public_key: &Path) -> Result<()> {
        if !public_key.is_file() {
            return Err(PkiError::MissingSource(public_key.to_path_buf()).into());
        }
        process::run(&self.ssh_copy_id, &Self::copy_id_args(host, public_key))?;
        info!(%host, key = %public_key.display(), "Public key installed");
        Ok(())
    }
}

/// Quote a string for a POSIX shell on the remote side.
pub fn shell_quote(value: &str) -> String {
    if !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "/._-=:".contains(c))
    {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Join a remote directory and a file name with exactly one slash.
pub fn remote_join(dir: &str, name: &str) -> String {
    format!("{}/{}", dir.trim_end_matches('/'), name)
}
