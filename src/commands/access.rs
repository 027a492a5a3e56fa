use anyhow::Result;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::Session;
use crate::error::PkiError;

/// Key files tried under `~/.ssh` when no public key is configured.
const DEFAULT_PUBLIC_KEYS: [&str; 2] = ["id_ed25519.pub", "id_rsa.pub"];

/// Pick the public key to install: the configured one, otherwise the first
/// default key that exists under `home`.
pub(crate) fn resolve_public_key(configured: Option<&Path>, home: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = configured {
        if !path.is_file() {
            return Err(PkiError::MissingSource(path.to_path_buf()).into());
        }
        return Ok(path.to_path_buf());
    }

    let ssh_dir = home
        .map(|h| h.join(".ssh"))
        .unwrap_or_else(|| PathBuf::from(".ssh"));
    let candidates: Vec<PathBuf> = DEFAULT_PUBLIC_KEYS.iter().map(|k| ssh_dir.join(k)).collect();
    for candidate in &candidates {
        debug!(path = %candidate.display(), "Looking for SSH public key");
        if candidate.is_file() {
            return Ok(candidate.clone());
        }
    }
    Err(PkiError::MissingSource(candidates[0].clone()).into())
}

/// Authorize this user's SSH public key on a remote host.
pub fn handle_copy_public_key<R: BufRead, W: Write>(session: &mut Session<'_, R, W>) -> Result<()> {
    let host = session.ask_remote_host()?;
    let home = std::env::var_os("HOME").map(PathBuf::from);
    let public_key = resolve_public_key(
        session.config.remote.public_key.as_deref(),
        home.as_deref(),
    )?;

    session.remote.install_public_key(&host, &public_key)?;
    println!("✓ {} authorized on {}", public_key.display(), host);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fake::{Call, RecordingRemote};
    use crate::commands::test_support::{config, session};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_prefers_ed25519() {
        let home = TempDir::new().unwrap();
        let ssh = home.path().join(".ssh");
        fs::create_dir_all(&ssh).unwrap();
        fs::write(ssh.join("id_rsa.pub"), "ssh-rsa AAAA").unwrap();

        let found = resolve_public_key(None, Some(home.path())).unwrap();
        assert_eq!(found, ssh.join("id_rsa.pub"));

        fs::write(ssh.join("id_ed25519.pub"), "ssh-ed25519 AAAA").unwrap();
        let found = resolve_public_key(None, Some(home.path())).unwrap();
        assert_eq!(found, ssh.join("id_ed25519.pub"));
    }

    #[test]
    fn test_resolve_without_any_key_fails() {
        let home = TempDir::new().unwrap();
        let err = resolve_public_key(None, Some(home.path())).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PkiError>(),
            Some(PkiError::MissingSource(_))
        ));

        let missing = home.path().join("configured.pub");
        let err = resolve_public_key(Some(&missing), Some(home.path())).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PkiError>(),
            Some(PkiError::MissingSource(p)) if *p == missing
        ));
    }

    #[test]
    fn test_copy_public_key_uses_configured_key() {
        let dir = TempDir::new().unwrap();
        let key = dir.path().join("deploy.pub");
        fs::write(&key, "ssh-ed25519 AAAA deploy").unwrap();
        let mut config = config(&dir);
        config.remote.public_key = Some(key.clone());
        let remote = RecordingRemote::default();

        handle_copy_public_key(&mut session(&config, &remote, "web01\nops\n", PathBuf::new()))
            .unwrap();

        assert_eq!(
            *remote.calls.borrow(),
            vec![Call::InstallKey {
                host: "ops@web01".to_string(),
                key,
            }]
        );
    }
}
