//! On-disk layout of the CA hierarchy and issued server material.
//!
//! ```text
//! <ca_dir>/ca.key              root private key (PKCS#8 PEM, 0600)
//! <ca_dir>/ca.crt              root certificate
//! <ca_dir>/intermediate.key    intermediate private key
//! <ca_dir>/intermediate.csr    intermediate signing request
//! <ca_dir>/intermediate.crt    intermediate certificate
//! <ca_dir>/ca-bundle.crt       root PEM followed by intermediate PEM
//! <certs_dir>/<fqdn>.{key,csr,crt}
//! ```

use anyhow::{anyhow, Context, Result};
use openssl::pkey::{PKey, PKeyRef, Private};
use openssl::x509::{X509Ref, X509ReqRef, X509};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::configs::PathsConfig;
use crate::error::PkiError;

const CA_KEY_FILE: &str = "ca.key";
const CA_CERT_FILE: &str = "ca.crt";
const INTERMEDIATE_KEY_FILE: &str = "intermediate.key";
const INTERMEDIATE_CSR_FILE: &str = "intermediate.csr";
const INTERMEDIATE_CERT_FILE: &str = "intermediate.crt";
const BUNDLE_FILE: &str = "ca-bundle.crt";

/// Paths of every file belonging to the CA hierarchy.
#[derive(Debug, Clone)]
pub struct CaPaths {
    pub ca_key: PathBuf,
    pub ca_cert: PathBuf,
    pub intermediate_key: PathBuf,
    pub intermediate_csr: PathBuf,
    pub intermediate_cert: PathBuf,
    pub bundle: PathBuf,
}

impl CaPaths {
    pub fn new(ca_dir: &Path) -> Self {
        Self {
            ca_key: ca_dir.join(CA_KEY_FILE),
            ca_cert: ca_dir.join(CA_CERT_FILE),
            intermediate_key: ca_dir.join(INTERMEDIATE_KEY_FILE),
            intermediate_csr: ca_dir.join(INTERMEDIATE_CSR_FILE),
            intermediate_cert: ca_dir.join(INTERMEDIATE_CERT_FILE),
            bundle: ca_dir.join(BUNDLE_FILE),
        }
    }
}

/// Paths of one issued server certificate.
#[derive(Debug, Clone)]
pub struct ServerPaths {
    pub key: PathBuf,
    pub csr: PathBuf,
    pub cert: PathBuf,
}

impl ServerPaths {
    pub fn new(certs_dir: &Path, fqdn: &str) -> Self {
        Self {
            key: certs_dir.join(format!("{}.key", fqdn)),
            csr: certs_dir.join(format!("{}.csr", fqdn)),
            cert: certs_dir.join(format!("{}.crt", fqdn)),
        }
    }
}

/// File-backed store for the CA hierarchy and server material.
#[derive(Debug, Clone)]
pub struct Storage {
    ca_dir: PathBuf,
    certs_dir: PathBuf,
}

impl Storage {
    pub fn new(paths: &PathsConfig) -> Self {
        Self {
            ca_dir: paths.ca_dir.clone(),
            certs_dir: paths.certs_dir.clone(),
        }
    }

    pub fn ca_paths(&self) -> CaPaths {
        CaPaths::new(&self.ca_dir)
    }

    pub fn server_paths(&self, fqdn: &str) -> ServerPaths {
        ServerPaths::new(&self.certs_dir, fqdn)
    }

    /// True when a root key is already on disk.
    pub fn ca_exists(&self) -> bool {
        self.ca_paths().ca_key.exists()
    }

    /// Write root and intermediate material and assemble the bundle.
    pub fn store_hierarchy(
        &self,
        ca_key: &PKeyRef<Private>,
        ca_cert: &X509Ref,
        intermediate_key: &PKeyRef<Private>,
        intermediate_csr: &X509ReqRef,
        intermediate_cert: &X509Ref,
    ) -> Result<CaPaths> {
        let paths = self.ca_paths();
        if paths.ca_key.exists() {
            return Err(PkiError::AlreadyExists(paths.ca_key).into());
        }
        fs::create_dir_all(&self.ca_dir)
            .with_context(|| format!("Failed to create {}", self.ca_dir.display()))?;

        write_private_key(&paths.ca_key, ca_key)?;
        write_pem(&paths.ca_cert, &ca_cert.to_pem()?)?;
        write_private_key(&paths.intermediate_key, intermediate_key)?;
        write_pem(&paths.intermediate_csr, &intermediate_csr.to_pem()?)?;
        write_pem(&paths.intermediate_cert, &intermediate_cert.to_pem()?)?;
        write_bundle(&paths.bundle, &[ca_cert, intermediate_cert])?;

        info!(dir = %self.ca_dir.display(), "CA hierarchy written");
        Ok(paths)
    }

    /// Write a server key, CSR and certificate.
    pub fn store_server(
        &self,
        fqdn: &str,
        key: &PKeyRef<Private>,
        csr: &X509ReqRef,
        cert: &X509Ref,
    ) -> Result<ServerPaths> {
        fs::create_dir_all(&self.certs_dir)
            .with_context(|| format!("Failed to create {}", self.certs_dir.display()))?;

        let paths = self.server_paths(fqdn);
        write_private_key(&paths.key, key)?;
        write_pem(&paths.csr, &csr.to_pem()?)?;
        write_pem(&paths.cert, &cert.to_pem()?)?;

        info!(fqdn, cert = %paths.cert.display(), "Server certificate written");
        Ok(paths)
    }

    /// Intermediate key and certificate used to sign server certificates.
    pub fn load_intermediate(&self) -> Result<(PKey<Private>, X509)> {
        let paths = self.ca_paths();
        let key = read_private_key(&paths.intermediate_key)?;
        let cert = read_certificate(&paths.intermediate_cert)?;
        Ok((key, cert))
    }

    pub fn load_bundle(&self) -> Result<Vec<X509>> {
        read_certificates(&self.ca_paths().bundle)
    }
}

fn require_file(path: &Path) -> Result<()> {
    if !path.is_file() {
        return Err(PkiError::MissingSource(path.to_path_buf()).into());
    }
    Ok(())
}

pub fn write_pem(path: &Path, pem: &[u8]) -> Result<()> {
    fs::write(path, pem).with_context(|| format!("Failed to write {}", path.display()))?;
    debug!(path = %path.display(), "Wrote PEM");
    Ok(())
}

/// Write an unencrypted PKCS#8 private key readable only by the owner.
pub fn write_private_key(path: &Path, key: &PKeyRef<Private>) -> Result<()> {
    let pem = key
        .private_key_to_pem_pkcs8()
        .map_err(|e| anyhow!("Failed to encode private key: {}", e))?;
    write_pem(path, &pem)?;
    restrict_permissions(path)
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
        .with_context(|| format!("Failed to restrict permissions on {}", path.display()))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

/// Concatenate certificates into one PEM file, in order.
pub fn write_bundle(path: &Path, certificates: &[&X509Ref]) -> Result<()> {
    let mut pem = Vec::new();
    for cert in certificates {
        pem.extend_from_slice(&cert.to_pem()?);
    }
    write_pem(path, &pem)
}

pub fn read_private_key(path: &Path) -> Result<PKey<Private>> {
    require_file(path)?;
    let pem = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    PKey::private_key_from_pem(&pem)
        .map_err(|e| anyhow!("Failed to parse private key {}: {}", path.display(), e))
}

pub fn read_certificate(path: &Path) -> Result<X509> {
    require_file(path)?;
    let pem = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    X509::from_pem(&pem)
        .map_err(|e| anyhow!("Failed to parse certificate {}: {}", path.display(), e))
}

/// Every certificate in a PEM file.
pub fn read_certificates(path: &Path) -> Result<Vec<X509>> {
    require_file(path)?;
    let pem = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    X509::stack_from_pem(&pem)
        .map_err(|e| anyhow!("Failed to parse certificates in {}: {}", path.display(), e))
}
