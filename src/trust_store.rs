//! System trust store: listing installed anchors and installing ours.

use anyhow::{bail, Context, Result};
use openssl::hash::MessageDigest;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::configs::TrustConfig;
use crate::error::PkiError;
use crate::process;
use crate::storage::read_certificates;
use crate::subject::describe_name;

/// One certificate found in the system trust bundle.
#[derive(Debug, Clone)]
pub struct TrustedCertificate {
    pub subject: String,
    pub sha256_fingerprint: String,
}

#[derive(Debug, Clone)]
pub struct TrustStore {
    anchor_dir: PathBuf,
    anchor_name: String,
    refresh_command: Vec<String>,
    system_bundle: PathBuf,
}

impl TrustStore {
    pub fn new(config: &TrustConfig) -> Self {
        Self {
            anchor_dir: config.anchor_dir.clone(),
            anchor_name: config.anchor_name.clone(),
            refresh_command: config.refresh_command.clone(),
            system_bundle: config.system_bundle.clone(),
        }
    }

    /// Where our bundle lives once installed.
    pub fn anchor_path(&self) -> PathBuf {
        self.anchor_dir.join(&self.anchor_name)
    }

    /// Subjects of every certificate in the system bundle.
    pub fn list(&self) -> Result<Vec<TrustedCertificate>> {
        let certificates = read_certificates(&self.system_bundle)?;
        let mut listed = Vec::with_capacity(certificates.len());
        for cert in &certificates {
            let fingerprint = match cert.digest(MessageDigest::sha256()) {
                Ok(digest) => digest
                    .iter()
                    .map(|b| format!("{:02X}", b))
                    .collect::<Vec<_>>()
                    .join(":"),
                Err(e) => {
                    warn!(error = %e, "Skipping certificate without a computable fingerprint");
                    continue;
                }
            };
            listed.push(TrustedCertificate {
                subject: describe_name(cert.subject_name()),
                sha256_fingerprint: fingerprint,
            });
        }
        Ok(listed)
    }

    /// Copy `bundle` into the anchor directory (when it exists locally) and
    /// refresh the system store.
    ///
    /// On a remote host the bundle was already copied straight into the
    /// anchor directory, so a missing local bundle with a present anchor
    /// only triggers the refresh.
    pub fn install(&self, bundle: &Path) -> Result<PathBuf> {
        let anchor = self.anchor_path();
        if bundle.is_file() {
            fs::create_dir_all(&self.anchor_dir)
                .with_context(|| format!("Failed to create {}", self.anchor_dir.display()))?;
            fs::copy(bundle, &anchor).with_context(|| {
                format!("Failed to copy {} to {}", bundle.display(), anchor.display())
            })?;
            info!(anchor = %anchor.display(), "CA bundle copied into trust anchors");
        } else if anchor.is_file() {
            info!(anchor = %anchor.display(), "Using already deployed CA bundle");
        } else {
            return Err(PkiError::MissingSource(bundle.to_path_buf()).into());
        }

        self.refresh()?;
        Ok(anchor)
    }

    /// Run the configured trust-store refresh command.
    pub fn refresh(&self) -> Result<()> {
        let Some((program, args)) = self.refresh_command.split_first() else {
            bail!("No trust store refresh command configured");
        };
        process::run(program, args).context("Failed to refresh the system trust store")?;
        info!("System trust store refreshed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate_root_ca::RsaRootCABuilder;
    use crate::storage::write_bundle;
    use crate::subject::Subject;
    use openssl::x509::X509Ref;
    use tempfile::TempDir;

    fn store(dir: &TempDir, refresh: &[&str]) -> TrustStore {
        TrustStore::new(&TrustConfig {
            anchor_dir: dir.path().join("anchors"),
            anchor_name: "test-ca.crt".to_string(),
            refresh_command: refresh.iter().map(|s| s.to_string()).collect(),
            system_bundle: dir.path().join("system.pem"),
        })
    }

    fn write_roots(path: &Path, names: &[&str]) {
        let certs: Vec<_> = names
            .iter()
            .map(|cn| {
                RsaRootCABuilder::new()
                    .subject(Subject {
                        common_name: cn.to_string(),
                        ..Subject::default()
                    })
                    .key_bits(2048)
                    .build()
                    .unwrap()
                    .1
            })
            .collect();
        let refs: Vec<&X509Ref> = certs.iter().map(|c| &**c).collect();
        write_bundle(path, &refs).unwrap();
    }

    #[test]
    fn test_list_reports_every_subject() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, &["true"]);
        write_roots(&dir.path().join("system.pem"), &["Alpha Root", "Beta Root"]);

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].subject, "CN=Alpha Root");
        assert_eq!(listed[1].subject, "CN=Beta Root");
        assert_eq!(listed[0].sha256_fingerprint.split(':').count(), 32);
    }

    #[test]
    fn test_list_missing_bundle() {
        let dir = TempDir::new().unwrap();
        assert!(store(&dir, &["true"]).list().is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_install_copies_bundle_and_refreshes() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, &["true"]);
        let bundle = dir.path().join("bundle.crt");
        write_roots(&bundle, &["Local Root"]);

        let anchor = store.install(&bundle).unwrap();
        assert_eq!(fs::read(&anchor).unwrap(), fs::read(&bundle).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn test_install_with_predeployed_anchor_only_refreshes() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, &["true"]);
        fs::create_dir_all(dir.path().join("anchors")).unwrap();
        write_roots(&store.anchor_path(), &["Deployed Root"]);

        assert!(store.install(&dir.path().join("absent.crt")).is_ok());
    }

    #[test]
    fn test_install_without_any_bundle_fails() {
        let dir = TempDir::new().unwrap();
        let err = store(&dir, &["true"])
            .install(&dir.path().join("absent.crt"))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PkiError>(),
            Some(PkiError::MissingSource(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_refresh_propagates_status() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, &["sh", "-c", "exit 3"]);
        let bundle = dir.path().join("bundle.crt");
        write_roots(&bundle, &["Local Root"]);

        let err = store.install(&bundle).unwrap_err();
        assert_eq!(crate::error::exit_code_for(&err), 3);
    }
}
